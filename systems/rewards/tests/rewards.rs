use proptest::prelude::*;
use room_crawler_core::{
    ChestSpawnRecord, Currency, EnemySpawnRecord, LevelDefinition, RewardEntry, RoomDefinition,
};
use room_crawler_system_rewards::{split_int_equally, RewardPlanner};

fn enemy(kind: &str) -> EnemySpawnRecord {
    EnemySpawnRecord {
        kind: kind.to_owned(),
        transform: Default::default(),
        elite: false,
        patrol: Vec::new(),
    }
}

fn two_room_level(rewards: Vec<RewardEntry>) -> LevelDefinition {
    LevelDefinition {
        rooms: vec![
            RoomDefinition {
                enemies: vec![enemy("grunt"), enemy("grunt"), enemy("grunt")],
                chests: vec![ChestSpawnRecord::default()],
                ..Default::default()
            },
            RoomDefinition {
                enemies: vec![enemy("warden")],
                ..Default::default()
            },
        ],
        rewards,
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn shares_sum_to_value(value in 0u32..1_000_000, parts in 1usize..64) {
        let shares = split_int_equally(value, parts);
        prop_assert_eq!(shares.len(), parts);
        prop_assert_eq!(shares.iter().map(|share| u64::from(*share)).sum::<u64>(), u64::from(value));
    }

    #[test]
    fn only_last_share_absorbs_remainder(value in 0u32..1_000_000, parts in 1usize..64) {
        let shares = split_int_equally(value, parts);
        let floor = value / parts as u32;
        let (last, rest) = shares.split_last().expect("parts is non-zero");
        prop_assert!(rest.iter().all(|share| *share == floor));
        prop_assert_eq!(*last, floor + value % parts as u32);
    }
}

#[test]
fn coin_manifest_splits_rooms_then_chests() {
    let level = two_room_level(vec![RewardEntry::currency(Currency::Coins, 100)]);
    let plan = RewardPlanner::new().plan(&level, |_| false);

    let first = plan.room(0).expect("room 0 planned");
    let second = plan.room(1).expect("room 1 planned");
    assert_eq!(first.currency.get(Currency::Coins), 33);
    assert_eq!(second.currency.get(Currency::Coins), 33);
    assert_eq!(first.chests.len(), 1);
    assert_eq!(first.chests[0].get(Currency::Coins), 34);
    assert!(second.chests.is_empty());
    assert_eq!(plan.total(Currency::Coins), 100);
}

#[test]
fn each_currency_is_split_independently() {
    let level = two_room_level(vec![
        RewardEntry::currency(Currency::Coins, 10),
        RewardEntry::currency(Currency::Gems, 5),
    ]);
    let plan = RewardPlanner::new().plan(&level, |_| false);

    assert_eq!(plan.total(Currency::Coins), 10);
    assert_eq!(plan.total(Currency::Gems), 5);
    assert_eq!(plan.rooms()[0].currency.get(Currency::Gems), 1);
    assert_eq!(plan.rooms()[0].chests[0].get(Currency::Gems), 3);
}

#[test]
fn weapon_cards_go_whole_to_final_room() {
    let level = two_room_level(vec![RewardEntry::weapon_card("frost_bow", 1)]);
    let plan = RewardPlanner::new().plan(&level, |_| false);

    assert!(plan.rooms()[0].specials.is_empty());
    assert_eq!(
        plan.rooms()[1].specials,
        vec![RewardEntry::weapon_card("frost_bow", 1)]
    );
}

#[test]
fn unlocked_cards_are_skipped() {
    let level = two_room_level(vec![
        RewardEntry::weapon_card("frost_bow", 1),
        RewardEntry::weapon_card("storm_axe", 1),
    ]);
    let plan = RewardPlanner::new().plan(&level, |entry| {
        *entry == RewardEntry::weapon_card("frost_bow", 1)
    });

    assert_eq!(
        plan.rooms()[1].specials,
        vec![RewardEntry::weapon_card("storm_axe", 1)]
    );
}

#[test]
fn level_without_slots_drops_currency() {
    let level = LevelDefinition {
        rewards: vec![RewardEntry::currency(Currency::Coins, 40)],
        ..Default::default()
    };
    let plan = RewardPlanner::new().plan(&level, |_| false);

    assert!(plan.rooms().is_empty());
    assert_eq!(plan.total(Currency::Coins), 0);
}

#[test]
fn planner_reuse_does_not_leak_chest_slots() {
    let mut planner = RewardPlanner::new();
    let first = two_room_level(vec![RewardEntry::currency(Currency::Coins, 100)]);
    let _ = planner.plan(&first, |_| false);

    let second = LevelDefinition {
        rooms: vec![RoomDefinition::default()],
        rewards: vec![RewardEntry::currency(Currency::Coins, 9)],
        ..Default::default()
    };
    let plan = planner.plan(&second, |_| false);

    assert_eq!(plan.rooms().len(), 1);
    assert_eq!(plan.rooms()[0].currency.get(Currency::Coins), 9);
}
