#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Room Crawler session engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative room state, and the level session. Adapters submit
//! [`Command`] values describing what happened in the game (a kill, an exit
//! trigger, a tick), the session executes those commands via its `apply`
//! entry point, and then broadcasts [`Event`] values that presentation layers
//! react to. Authored level data lives in [`definitions`]; reward bookkeeping
//! types live in [`rewards`].

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub mod definitions;
pub mod rewards;

pub use definitions::{
    ChestSpawnRecord, ChestVariant, EnemyKindDefinition, EnemySpawnRecord, ItemDefinition,
    ItemEffect, ItemSpawnRecord, LevelCatalog, LevelDefinition, LevelMetadata, ObjectSpawnRecord,
    RoomDefinition, Transform, WorldDefinition,
};
pub use rewards::{
    Currency, Loot, Purse, RewardEntry, RewardEntryError, RewardKind, RoomReward,
};

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

handle_id!(
    /// Unique identifier assigned to an enemy spawned into the active room.
    EnemyId
);
handle_id!(
    /// Unique identifier assigned to an item spawned into the active room.
    ItemId
);
handle_id!(
    /// Unique identifier assigned to a chest spawned into the active room.
    ChestId
);
handle_id!(
    /// Unique identifier assigned to an exit point of the active room.
    ExitId
);
handle_id!(
    /// Unique identifier assigned to an ad-hoc object spawned into the active room.
    ObjectId
);

/// Addresses a single level inside the catalog by world and level index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelKey {
    world: u32,
    level: u32,
}

impl LevelKey {
    /// Creates a key for the level at `level` inside world `world`.
    #[must_use]
    pub const fn new(world: u32, level: u32) -> Self {
        Self { world, level }
    }

    /// Zero-based index of the world that contains the level.
    #[must_use]
    pub const fn world(&self) -> u32 {
        self.world
    }

    /// Zero-based index of the level inside its world.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

/// Selection rank of an enemy, used when picking the special reward carrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyRank {
    /// Regular enemy without any tag.
    Ordinary,
    /// Enemy authored with the elite flag.
    Elite,
    /// Enemy whose kind is registered as a boss.
    Boss,
}

/// Commands that express everything the outside world can report to a session.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the session load the addressed level.
    LoadLevel {
        /// Level to resolve from the catalog.
        level: LevelKey,
    },
    /// Requests that the loaded level begin gameplay.
    ActivateLevel,
    /// Reports the character's current position.
    MoveCharacter {
        /// World-space position of the character.
        position: Vec3,
    },
    /// Reports an enemy's current position as driven by its behaviour.
    MoveEnemy {
        /// Enemy that moved.
        enemy: EnemyId,
        /// World-space position the enemy moved to.
        position: Vec3,
    },
    /// Reports that an enemy was killed.
    EnemyKilled {
        /// Enemy that died.
        enemy: EnemyId,
    },
    /// Requests that the room's exit open, typically from a proxy exit point.
    OpenExit,
    /// Reports that the player opened a chest.
    OpenChest {
        /// Chest that was opened.
        chest: ChestId,
    },
    /// Reports that the player picked up an item.
    CollectItem {
        /// Item that was picked up.
        item: ItemId,
    },
    /// Requests that every drop lying on the floor be collected.
    CollectDrops,
    /// Reports that the player entered the open exit.
    PlayerExitLevel,
    /// Reports that the player character died.
    PlayerDied,
    /// Requests that the dead character be revived in the current room.
    ReviveCharacter {
        /// Whether the revived character receives a temporary invulnerability window.
        invulnerable: bool,
    },
    /// Requests that the level restart from its first room.
    ReloadRoom,
    /// Requests that the loaded level be torn down.
    UnloadLevel,
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces the level resolved from the persisted session record.
    LevelInitialised {
        /// Level the session will load.
        level: LevelKey,
    },
    /// Confirms that a level and its first room were loaded.
    LevelLoaded {
        /// Level that was loaded.
        level: LevelKey,
        /// Number of rooms authored for the level.
        rooms: u32,
    },
    /// Announces that gameplay started for the loaded level. Fires once per load.
    LevelStarted,
    /// Announces that the player entered a room.
    RoomStarted {
        /// Zero-based index of the room.
        room: u32,
    },
    /// Confirms that the room's enemies were switched on.
    EnemiesActivated {
        /// Number of enemies that were activated.
        count: u32,
    },
    /// Confirms that an enemy was marked dead.
    EnemyKilled {
        /// Enemy that died.
        enemy: EnemyId,
    },
    /// Announces that the room's exit opened.
    ExitOpened {
        /// Zero-based index of the room whose exit opened.
        room: u32,
    },
    /// Announces that a heal item was placed at the exit.
    HealSpawned {
        /// Identifier assigned to the spawned item.
        item: ItemId,
    },
    /// Reports that the player's nearest enemy changed.
    NearestEnemyChanged {
        /// Newly nearest enemy, or `None` when nothing is in range.
        nearest: Option<EnemyId>,
    },
    /// Reports currency credited to the economy.
    CurrencyCollected {
        /// Currency that was credited.
        currency: Currency,
        /// Amount that was credited.
        amount: u32,
    },
    /// Reports that a weapon card was unlocked.
    CardUnlocked {
        /// Key of the unlocked card.
        card: String,
    },
    /// Confirms that a chest was opened.
    ChestOpened {
        /// Chest that was opened.
        chest: ChestId,
    },
    /// Confirms that an item was picked up.
    ItemCollected {
        /// Item that was picked up.
        item: ItemId,
        /// Registry key of the item.
        key: String,
    },
    /// Announces that the player entered the exit of a room.
    PlayerExitLevel {
        /// Zero-based index of the room that was left.
        room: u32,
    },
    /// Announces that a fade transition toward the next room began.
    RoomTransitionStarted {
        /// Room that was left.
        from: u32,
        /// Room that will be loaded once the fade completes.
        to: u32,
    },
    /// Announces that the final room was cleared.
    LevelCompleted {
        /// Level that was completed.
        level: LevelKey,
        /// Experience granted for the level.
        xp: u32,
        /// Coins earned while playing the level.
        coins: u32,
    },
    /// Announces that the player character died.
    PlayerDied,
    /// Confirms that the character was revived.
    CharacterRevived {
        /// Whether an invulnerability window was granted.
        invulnerable: bool,
    },
    /// Announces that the revive invulnerability window elapsed.
    InvulnerabilityEnded,
    /// Confirms that the level restarted from its first room.
    RoomReloaded,
    /// Confirms that the level was torn down.
    LevelUnloaded {
        /// Level that was unloaded.
        level: LevelKey,
    },
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier assigned to the enemy.
    pub id: EnemyId,
    /// Current world-space position.
    pub position: Vec3,
    /// Selection rank of the enemy.
    pub rank: EnemyRank,
    /// Whether the enemy has been killed.
    pub dead: bool,
    /// Whether the enemy's behaviour has been switched on.
    pub active: bool,
}

/// Read-only snapshot describing all enemies of the active room.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot captured for `enemy`.
    #[must_use]
    pub fn get(&self, enemy: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots
            .binary_search_by_key(&enemy, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Reports whether the view captured no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::{EnemyId, EnemyRank, EnemySnapshot, EnemyView, LevelKey};
    use glam::Vec3;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    fn snapshot(id: u32, z: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            position: Vec3::new(0.0, 0.0, z),
            rank: EnemyRank::Ordinary,
            dead: false,
            active: true,
        }
    }

    #[test]
    fn enemy_id_round_trips_through_bincode() {
        assert_round_trip(&EnemyId::new(42));
    }

    #[test]
    fn level_key_round_trips_through_bincode() {
        assert_round_trip(&LevelKey::new(2, 7));
    }

    #[test]
    fn enemy_view_orders_snapshots_by_identifier() {
        let view = EnemyView::from_snapshots(vec![snapshot(5, 1.0), snapshot(2, 3.0)]);
        let ids: Vec<u32> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![2, 5]);
    }

    #[test]
    fn enemy_view_lookup_finds_captured_enemy() {
        let view = EnemyView::from_snapshots(vec![snapshot(3, 1.0), snapshot(9, 4.0)]);
        let found = view.get(EnemyId::new(9)).expect("enemy 9 captured");
        assert_eq!(found.position.z, 4.0);
        assert!(view.get(EnemyId::new(4)).is_none());
    }
}
