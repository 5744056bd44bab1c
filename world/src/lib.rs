#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative state of the active room.
//!
//! [`RoomState`] is the sole owner of everything spawned for the room the
//! player is currently in. It instantiates handles from a
//! [`RoomDefinition`], answers bulk queries such as the all-dead check, and
//! tears every handle down again before the next room may load.

use glam::Vec3;
use room_crawler_core::{
    ChestId, ChestSpawnRecord, EnemyId, EnemyRank, EnemySpawnRecord, ExitId, ItemEffect, ItemId,
    ItemSpawnRecord, Loot, ObjectId, ObjectSpawnRecord, Purse, RoomDefinition, RoomReward,
    Transform, WorldDefinition,
};
use room_crawler_system_rewards::split_int_equally;
use thiserror::Error;
use tracing::{debug, warn};

mod entities;

use entities::{spawn_position, Chest, CustomObject, Enemy, ExitPoint, Item};

/// Reasons a room state operation may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoomStateError {
    /// A room is still loaded; it must be unloaded before the next one loads.
    #[error("a room is already loaded")]
    AlreadyLoaded,
    /// No enemy with the identifier exists in the room.
    #[error("enemy {0:?} does not exist in the active room")]
    UnknownEnemy(EnemyId),
    /// The enemy was already killed.
    #[error("enemy {0:?} is already dead")]
    EnemyAlreadyDead(EnemyId),
    /// No chest with the identifier exists in the room.
    #[error("chest {0:?} does not exist in the active room")]
    UnknownChest(ChestId),
    /// The chest was already opened.
    #[error("chest {0:?} is already open")]
    ChestAlreadyOpened(ChestId),
    /// No item with the identifier exists in the room.
    #[error("item {0:?} does not exist in the active room")]
    UnknownItem(ItemId),
    /// The item was already picked up.
    #[error("item {0:?} was already collected")]
    ItemAlreadyCollected(ItemId),
}

/// Item handed back when the player picks it up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectedItem {
    /// Identifier of the picked up item.
    pub id: ItemId,
    /// Registry key of the item.
    pub key: String,
    /// Effect the item applies.
    pub effect: ItemEffect,
}

/// Registry of every handle spawned for the active room.
#[derive(Debug, Default)]
pub struct RoomState {
    loaded: bool,
    spawn_point: Transform,
    exit_open: bool,
    enemies: Vec<Enemy>,
    items: Vec<Item>,
    chests: Vec<Chest>,
    exits: Vec<ExitPoint>,
    objects: Vec<CustomObject>,
    floor: Vec<Loot>,
    next_handle: u32,
}

impl RoomState {
    /// Creates an empty room state with nothing loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether a room is currently instantiated.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Instantiates every record of `room` in authoring order.
    ///
    /// Enemies receive `enemy_level`. Records whose key is not registered in
    /// `world` are skipped. Fails when the previous room was not unloaded.
    pub fn load(
        &mut self,
        room: &RoomDefinition,
        world: &WorldDefinition,
        enemy_level: u32,
    ) -> Result<(), RoomStateError> {
        if self.loaded {
            return Err(RoomStateError::AlreadyLoaded);
        }

        self.loaded = true;
        self.spawn_point = room.spawn_point;

        if let Some(exit) = room.exit {
            let _ = self.spawn_exit(exit);
        }
        for record in &room.enemies {
            let _ = self.spawn_enemy(record, world, enemy_level);
        }
        for record in &room.items {
            let _ = self.spawn_item(record, world);
        }
        for record in &room.chests {
            let _ = self.spawn_chest(record);
        }
        for record in &room.objects {
            let _ = self.spawn_custom_object(record);
        }

        debug!(
            enemies = self.enemies.len(),
            items = self.items.len(),
            chests = self.chests.len(),
            objects = self.objects.len(),
            "room loaded"
        );
        Ok(())
    }

    /// Spawns an enemy from its record, returning `None` for unknown kinds.
    pub fn spawn_enemy(
        &mut self,
        record: &EnemySpawnRecord,
        world: &WorldDefinition,
        enemy_level: u32,
    ) -> Option<EnemyId> {
        let Some(kind) = world.enemy_kind(&record.kind) else {
            warn!(kind = %record.kind, world = %world.name, "enemy kind not registered, skipping spawn");
            return None;
        };

        let rank = if kind.boss {
            EnemyRank::Boss
        } else if record.elite {
            EnemyRank::Elite
        } else {
            EnemyRank::Ordinary
        };

        let id = EnemyId::new(self.allocate_handle());
        self.enemies.push(Enemy {
            id,
            kind: record.kind.clone(),
            rank,
            position: spawn_position(record.transform.position, &record.patrol),
            level: enemy_level,
            patrol: record.patrol.clone(),
            dead: false,
            active: false,
            loot: Loot::default(),
        });
        Some(id)
    }

    /// Spawns an item from its record, returning `None` for unknown keys.
    pub fn spawn_item(
        &mut self,
        record: &ItemSpawnRecord,
        world: &WorldDefinition,
    ) -> Option<ItemId> {
        self.spawn_item_at(&record.key, record.transform.position, world)
    }

    /// Spawns the item registered as `key` at `position`.
    pub fn spawn_item_at(
        &mut self,
        key: &str,
        position: Vec3,
        world: &WorldDefinition,
    ) -> Option<ItemId> {
        let Some(definition) = world.item(key) else {
            warn!(key, world = %world.name, "item key not registered, skipping spawn");
            return None;
        };

        let id = ItemId::new(self.allocate_handle());
        self.items.push(Item {
            id,
            key: definition.key.clone(),
            effect: definition.effect,
            position,
            collected: false,
        });
        Some(id)
    }

    /// Spawns a closed, empty chest from its record.
    pub fn spawn_chest(&mut self, record: &ChestSpawnRecord) -> ChestId {
        let id = ChestId::new(self.allocate_handle());
        self.chests.push(Chest {
            id,
            variant: record.variant,
            position: record.transform.position,
            reward: Purse::new(),
            opened: false,
        });
        id
    }

    /// Spawns an ad-hoc object from its record.
    pub fn spawn_custom_object(&mut self, record: &ObjectSpawnRecord) -> ObjectId {
        let id = ObjectId::new(self.allocate_handle());
        self.objects.push(CustomObject {
            id,
            key: record.key.clone(),
            position: record.transform.position,
        });
        id
    }

    /// Spawns a closed exit point.
    pub fn spawn_exit(&mut self, transform: Transform) -> ExitId {
        let id = ExitId::new(self.allocate_handle());
        self.exits.push(ExitPoint {
            id,
            position: transform.position,
        });
        id
    }

    /// Where the character is placed on entering the room.
    #[must_use]
    pub fn spawn_point(&self) -> Transform {
        self.spawn_point
    }

    /// Identifiers of every enemy that is still alive, in spawn order.
    #[must_use]
    pub fn alive_enemies(&self) -> Vec<EnemyId> {
        self.enemies
            .iter()
            .filter(|enemy| !enemy.dead)
            .map(|enemy| enemy.id)
            .collect()
    }

    /// Reports whether no enemy of the room is alive.
    #[must_use]
    pub fn all_enemies_dead(&self) -> bool {
        self.enemies.iter().all(|enemy| enemy.dead)
    }

    /// Picks the enemy that carries the room's non-currency rewards.
    ///
    /// Bosses win over elites, elites over everyone else. Among the rest the
    /// enemy furthest along the forward axis wins, and ties keep the enemy
    /// spawned first.
    #[must_use]
    pub fn enemy_for_special_reward(&self) -> Option<EnemyId> {
        if let Some(boss) = self.enemies.iter().find(|enemy| enemy.rank == EnemyRank::Boss) {
            return Some(boss.id);
        }
        if let Some(elite) = self.enemies.iter().find(|enemy| enemy.rank == EnemyRank::Elite) {
            return Some(elite.id);
        }

        let mut furthest: Option<&Enemy> = None;
        for enemy in &self.enemies {
            match furthest {
                Some(current) if enemy.forward() <= current.forward() => {}
                _ => furthest = Some(enemy),
            }
        }
        furthest.map(|enemy| enemy.id)
    }

    /// Assigns the room's reward share to its enemies and chests.
    ///
    /// Every currency is split across all enemies in spawn order. Special
    /// entries go whole to [`Self::enemy_for_special_reward`]. Chest shares
    /// are matched to chests by spawn order.
    pub fn init_drop(&mut self, reward: &RoomReward) {
        for enemy in &mut self.enemies {
            enemy.loot = Loot::default();
        }
        for chest in &mut self.chests {
            chest.reward.clear();
        }

        for (currency, amount) in reward.currency.iter() {
            let shares = split_int_equally(amount, self.enemies.len());
            if shares.is_empty() {
                warn!(%currency, amount, "room has no enemies to carry currency share");
                continue;
            }
            for (enemy, share) in self.enemies.iter_mut().zip(shares) {
                enemy.loot.currency.add(currency, share);
            }
        }

        if !reward.specials.is_empty() {
            let carrier = self
                .enemy_for_special_reward()
                .and_then(|id| self.enemies.iter_mut().find(|enemy| enemy.id == id));
            match carrier {
                Some(enemy) => enemy.loot.specials.extend(reward.specials.iter().cloned()),
                None => warn!(
                    count = reward.specials.len(),
                    "room has no enemy to carry special rewards"
                ),
            }
        }

        if reward.chests.len() != self.chests.len() {
            warn!(
                planned = reward.chests.len(),
                spawned = self.chests.len(),
                "chest reward shares do not match spawned chests"
            );
        }
        for (chest, share) in self.chests.iter_mut().zip(&reward.chests) {
            chest.reward = share.clone();
        }
    }

    /// Switches every living enemy on, returning how many were activated.
    pub fn activate_enemies(&mut self) -> u32 {
        let mut activated = 0;
        for enemy in self.enemies.iter_mut().filter(|enemy| !enemy.dead) {
            if !enemy.active {
                enemy.active = true;
                activated += 1;
            }
        }
        activated
    }

    /// Marks an enemy dead and moves its loot onto the floor.
    pub fn kill_enemy(&mut self, id: EnemyId) -> Result<(), RoomStateError> {
        let enemy = self
            .enemies
            .iter_mut()
            .find(|enemy| enemy.id == id)
            .ok_or(RoomStateError::UnknownEnemy(id))?;
        if enemy.dead {
            return Err(RoomStateError::EnemyAlreadyDead(id));
        }

        enemy.dead = true;
        enemy.active = false;
        let loot = std::mem::take(&mut enemy.loot);
        if !loot.is_empty() {
            self.floor.push(loot);
        }
        Ok(())
    }

    /// Records an enemy's new position.
    pub fn move_enemy(&mut self, id: EnemyId, position: Vec3) -> Result<(), RoomStateError> {
        let enemy = self
            .enemies
            .iter_mut()
            .find(|enemy| enemy.id == id)
            .ok_or(RoomStateError::UnknownEnemy(id))?;
        enemy.position = position;
        Ok(())
    }

    /// Opens the room's exit, returning `true` if it was closed before.
    pub fn open_exits(&mut self) -> bool {
        let was_open = self.exit_open;
        self.exit_open = true;
        !was_open
    }

    /// Reports whether the room's exit is open.
    #[must_use]
    pub fn is_exit_open(&self) -> bool {
        self.exit_open
    }

    /// Position of the first exit point, if the room has one.
    #[must_use]
    pub fn exit_position(&self) -> Option<Vec3> {
        self.exits.first().map(|exit| exit.position)
    }

    /// Opens a chest and hands out its share.
    pub fn open_chest(&mut self, id: ChestId) -> Result<Purse, RoomStateError> {
        let chest = self
            .chests
            .iter_mut()
            .find(|chest| chest.id == id)
            .ok_or(RoomStateError::UnknownChest(id))?;
        if chest.opened {
            return Err(RoomStateError::ChestAlreadyOpened(id));
        }

        chest.opened = true;
        Ok(std::mem::take(&mut chest.reward))
    }

    /// Picks an item up.
    pub fn collect_item(&mut self, id: ItemId) -> Result<CollectedItem, RoomStateError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(RoomStateError::UnknownItem(id))?;
        if item.collected {
            return Err(RoomStateError::ItemAlreadyCollected(id));
        }

        item.collected = true;
        Ok(CollectedItem {
            id,
            key: item.key.clone(),
            effect: item.effect,
        })
    }

    /// Removes and merges every loot lying on the floor.
    pub fn take_floor_loot(&mut self) -> Loot {
        let mut collected = Loot::default();
        for loot in self.floor.drain(..) {
            collected.absorb(loot);
        }
        collected
    }

    /// Destroys every tracked handle. The next room may load afterwards.
    pub fn unload(&mut self) {
        debug!(
            enemies = self.enemies.len(),
            items = self.items.len(),
            chests = self.chests.len(),
            exits = self.exits.len(),
            objects = self.objects.len(),
            "room unloaded"
        );

        self.enemies.clear();
        self.items.clear();
        self.chests.clear();
        self.exits.clear();
        self.objects.clear();
        self.floor.clear();
        self.exit_open = false;
        self.spawn_point = Transform::default();
        self.loaded = false;
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        handle
    }
}

/// Query functions that provide read-only access to the room state.
pub mod query {
    use glam::Vec3;
    use room_crawler_core::{
        ChestId, ChestVariant, EnemyId, EnemySnapshot, EnemyView, ExitId, ItemId, Loot, ObjectId,
        Purse,
    };

    use super::RoomState;

    /// Captures a read-only view of the room's enemies.
    #[must_use]
    pub fn enemy_view(room: &RoomState) -> EnemyView {
        EnemyView::from_snapshots(
            room.enemies
                .iter()
                .map(|enemy| EnemySnapshot {
                    id: enemy.id,
                    position: enemy.position,
                    rank: enemy.rank,
                    dead: enemy.dead,
                    active: enemy.active,
                })
                .collect(),
        )
    }

    /// Describes the enemies in spawn order, including authored details.
    #[must_use]
    pub fn enemies(room: &RoomState) -> Vec<EnemyDetails<'_>> {
        room.enemies
            .iter()
            .map(|enemy| EnemyDetails {
                id: enemy.id,
                kind: &enemy.kind,
                level: enemy.level,
                patrol: &enemy.patrol,
                position: enemy.position,
            })
            .collect()
    }

    /// Loot currently carried by `enemy`.
    #[must_use]
    pub fn enemy_loot(room: &RoomState, enemy: EnemyId) -> Option<&Loot> {
        room.enemies
            .iter()
            .find(|candidate| candidate.id == enemy)
            .map(|candidate| &candidate.loot)
    }

    /// Loot released by dead enemies and not collected yet.
    #[must_use]
    pub fn floor_loot(room: &RoomState) -> &[Loot] {
        &room.floor
    }

    /// Describes the chests in spawn order.
    #[must_use]
    pub fn chests(room: &RoomState) -> Vec<ChestSnapshot> {
        room.chests
            .iter()
            .map(|chest| ChestSnapshot {
                id: chest.id,
                variant: chest.variant,
                position: chest.position,
                reward: chest.reward.clone(),
                opened: chest.opened,
            })
            .collect()
    }

    /// Describes the items in spawn order.
    #[must_use]
    pub fn items(room: &RoomState) -> Vec<ItemSnapshot<'_>> {
        room.items
            .iter()
            .map(|item| ItemSnapshot {
                id: item.id,
                key: &item.key,
                position: item.position,
                collected: item.collected,
            })
            .collect()
    }

    /// Describes the exit points in spawn order.
    #[must_use]
    pub fn exits(room: &RoomState) -> Vec<(ExitId, Vec3)> {
        room.exits
            .iter()
            .map(|exit| (exit.id, exit.position))
            .collect()
    }

    /// Describes the ad-hoc objects in spawn order.
    #[must_use]
    pub fn objects(room: &RoomState) -> Vec<(ObjectId, &str, Vec3)> {
        room.objects
            .iter()
            .map(|object| (object.id, object.key.as_str(), object.position))
            .collect()
    }

    /// Authored details of a spawned enemy.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct EnemyDetails<'a> {
        /// Identifier assigned to the enemy.
        pub id: EnemyId,
        /// Enemy kind key.
        pub kind: &'a str,
        /// Level stamped at spawn time.
        pub level: u32,
        /// Patrol waypoints.
        pub patrol: &'a [Vec3],
        /// Current position.
        pub position: Vec3,
    }

    /// Read-only description of a chest.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ChestSnapshot {
        /// Identifier assigned to the chest.
        pub id: ChestId,
        /// Variant of the chest.
        pub variant: ChestVariant,
        /// Placement of the chest.
        pub position: Vec3,
        /// Currency share waiting inside the chest.
        pub reward: Purse,
        /// Whether the chest was opened.
        pub opened: bool,
    }

    /// Read-only description of an item.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ItemSnapshot<'a> {
        /// Identifier assigned to the item.
        pub id: ItemId,
        /// Registry key of the item.
        pub key: &'a str,
        /// Placement of the item.
        pub position: Vec3,
        /// Whether the item was picked up.
        pub collected: bool,
    }
}
