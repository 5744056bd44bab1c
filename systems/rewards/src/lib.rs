#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that splits a level's reward manifest across rooms and chests.

use room_crawler_core::{LevelDefinition, Purse, RewardEntry, RewardKind, RoomReward};
use tracing::{debug, warn};

/// Splits `value` into `parts` integer shares.
///
/// Every share receives `value / parts`; the remainder is added to the last
/// share only. Zero parts yield an empty vector.
#[must_use]
pub fn split_int_equally(value: u32, parts: usize) -> Vec<u32> {
    if parts == 0 {
        return Vec::new();
    }

    let divisor = u32::try_from(parts).unwrap_or(u32::MAX);
    let base = value / divisor;
    let remainder = value - base * divisor;

    let mut shares = vec![base; parts];
    if let Some(last) = shares.last_mut() {
        *last += remainder;
    }
    shares
}

/// Reward shares computed once per level load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardPlan {
    rooms: Vec<RoomReward>,
}

impl RewardPlan {
    /// Share assigned to the room at `index`.
    #[must_use]
    pub fn room(&self, index: usize) -> Option<&RoomReward> {
        self.rooms.get(index)
    }

    /// Shares of every room in play order.
    #[must_use]
    pub fn rooms(&self) -> &[RoomReward] {
        &self.rooms
    }

    /// Sum of `currency` across every room and chest share.
    #[must_use]
    pub fn total(&self, currency: room_crawler_core::Currency) -> u32 {
        self.rooms
            .iter()
            .map(|room| {
                let chests: u32 = room.chests.iter().map(|chest| chest.get(currency)).sum();
                room.currency.get(currency) + chests
            })
            .sum()
    }
}

/// Reward planner that reuses its chest slot buffer between levels.
#[derive(Debug, Default)]
pub struct RewardPlanner {
    chest_slots: Vec<ChestSlot>,
}

impl RewardPlanner {
    /// Creates a planner with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the per-room and per-chest shares of `level`'s manifest.
    ///
    /// Currency entries are split across `rooms + chests` slots, rooms first
    /// and then chests in room/chest encounter order. Non-currency entries are
    /// routed whole to the final room unless `is_unlocked` reports that the
    /// player already owns them.
    pub fn plan<F>(&mut self, level: &LevelDefinition, mut is_unlocked: F) -> RewardPlan
    where
        F: FnMut(&RewardEntry) -> bool,
    {
        self.prepare_chest_slots(level);

        let mut rooms: Vec<RoomReward> = level
            .rooms
            .iter()
            .map(|room| RoomReward {
                currency: Purse::new(),
                specials: Vec::new(),
                chests: vec![Purse::new(); room.chests.len()],
            })
            .collect();
        let room_count = rooms.len();
        let slot_count = room_count + self.chest_slots.len();

        for entry in &level.rewards {
            match &entry.kind {
                RewardKind::Currency(currency) => {
                    let shares = split_int_equally(entry.amount, slot_count);
                    if shares.is_empty() {
                        warn!(
                            currency = %currency,
                            amount = entry.amount,
                            "level has no rooms or chests to carry currency reward"
                        );
                        continue;
                    }

                    for (slot, share) in shares.into_iter().enumerate() {
                        if slot < room_count {
                            rooms[slot].currency.add(*currency, share);
                        } else {
                            let chest = self.chest_slots[slot - room_count];
                            rooms[chest.room].chests[chest.chest].add(*currency, share);
                        }
                    }
                }
                RewardKind::WeaponCard(card) => {
                    if is_unlocked(entry) {
                        debug!(card = %card, "skipping already unlocked reward");
                        continue;
                    }

                    match rooms.last_mut() {
                        Some(last) => last.specials.push(entry.clone()),
                        None => warn!(card = %card, "level has no rooms to carry special reward"),
                    }
                }
            }
        }

        RewardPlan { rooms }
    }

    fn prepare_chest_slots(&mut self, level: &LevelDefinition) {
        self.chest_slots.clear();
        self.chest_slots.reserve(level.chest_count());

        for (room_index, room) in level.rooms.iter().enumerate() {
            for chest_index in 0..room.chests.len() {
                self.chest_slots.push(ChestSlot {
                    room: room_index,
                    chest: chest_index,
                });
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ChestSlot {
    room: usize,
    chest: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_last_share() {
        assert_eq!(split_int_equally(100, 3), vec![33, 33, 34]);
        assert_eq!(split_int_equally(10, 4), vec![2, 2, 2, 4]);
    }

    #[test]
    fn zero_parts_yield_nothing() {
        assert!(split_int_equally(50, 0).is_empty());
    }

    #[test]
    fn fewer_units_than_parts_concentrates_on_last() {
        assert_eq!(split_int_equally(2, 5), vec![0, 0, 0, 0, 2]);
    }

    #[test]
    fn chest_slots_follow_encounter_order() {
        let mut planner = RewardPlanner::new();
        let level = LevelDefinition {
            rooms: vec![
                room_crawler_core::RoomDefinition {
                    chests: vec![Default::default(), Default::default()],
                    ..Default::default()
                },
                room_crawler_core::RoomDefinition::default(),
                room_crawler_core::RoomDefinition {
                    chests: vec![Default::default()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        planner.prepare_chest_slots(&level);

        assert_eq!(
            planner.chest_slots,
            vec![
                ChestSlot { room: 0, chest: 0 },
                ChestSlot { room: 0, chest: 1 },
                ChestSlot { room: 2, chest: 0 },
            ]
        );
    }
}
