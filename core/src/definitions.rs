//! Authored level data.
//!
//! Everything in this module is immutable once loaded. The session shares a
//! single [`LevelCatalog`] and hands out references into it; room state never
//! copies a definition, it only instantiates handles from the records.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{rewards::RewardEntry, Currency, LevelKey};

/// Every world and level known to the game.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelCatalog {
    /// Worlds in unlock order.
    #[serde(default)]
    pub worlds: Vec<WorldDefinition>,
}

impl LevelCatalog {
    /// Returns the world stored at `world`.
    #[must_use]
    pub fn world(&self, world: u32) -> Option<&WorldDefinition> {
        self.worlds.get(usize::try_from(world).ok()?)
    }

    /// Returns the level addressed by `key`.
    #[must_use]
    pub fn level(&self, key: LevelKey) -> Option<&LevelDefinition> {
        let world = self.world(key.world())?;
        world.levels.get(usize::try_from(key.level()).ok()?)
    }

    /// Returns the level that follows `key`, crossing into the next world when
    /// the current one is exhausted.
    #[must_use]
    pub fn next_level(&self, key: LevelKey) -> Option<LevelKey> {
        let following = LevelKey::new(key.world(), key.level().saturating_add(1));
        if self.level(following).is_some() {
            return Some(following);
        }

        let next_world = LevelKey::new(key.world().saturating_add(1), 0);
        self.level(next_world).map(|_| next_world)
    }
}

/// Themed container of levels plus the registries its rooms refer to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldDefinition {
    /// Display name of the world.
    pub name: String,
    /// Key of the environment (art and audio set) loaded for the world.
    #[serde(default)]
    pub environment: String,
    /// Enemy kinds that rooms of this world may spawn.
    #[serde(default)]
    pub enemies: Vec<EnemyKindDefinition>,
    /// Item kinds that rooms of this world may spawn.
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
    /// Item key spawned at the exit when the heal roll succeeds.
    #[serde(default)]
    pub heal_item: Option<String>,
    /// Levels in play order.
    #[serde(default)]
    pub levels: Vec<LevelDefinition>,
}

impl WorldDefinition {
    /// Looks up a registered enemy kind.
    #[must_use]
    pub fn enemy_kind(&self, key: &str) -> Option<&EnemyKindDefinition> {
        self.enemies.iter().find(|kind| kind.key == key)
    }

    /// Looks up a registered item kind.
    #[must_use]
    pub fn item(&self, key: &str) -> Option<&ItemDefinition> {
        self.items.iter().find(|item| item.key == key)
    }
}

/// Registry entry describing an enemy kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyKindDefinition {
    /// Key referenced by spawn records.
    pub key: String,
    /// Whether enemies of this kind are bosses.
    #[serde(default)]
    pub boss: bool,
}

/// Registry entry describing an item kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Key referenced by spawn records.
    pub key: String,
    /// What picking the item up does.
    pub effect: ItemEffect,
}

/// Effect applied when an item is picked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    /// Restores character health. Applied by the character, not the session.
    Heal {
        /// Health restored.
        amount: u32,
    },
    /// Credits currency to the economy.
    Currency {
        /// Currency credited.
        currency: Currency,
        /// Amount credited.
        amount: u32,
    },
}

/// Ordered rooms, reward manifest, and metadata of one level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    /// Rooms in play order.
    #[serde(default)]
    pub rooms: Vec<RoomDefinition>,
    /// Rewards granted across the level.
    #[serde(default)]
    pub rewards: Vec<RewardEntry>,
    /// Tuning values of the level.
    #[serde(default)]
    pub metadata: LevelMetadata,
}

impl LevelDefinition {
    /// Total number of chests authored across every room.
    #[must_use]
    pub fn chest_count(&self) -> usize {
        self.rooms.iter().map(|room| room.chests.len()).sum()
    }
}

/// Tuning values attached to a level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelMetadata {
    /// Experience granted on completion.
    pub xp: u32,
    /// Upgrade tier the player is expected to own.
    pub required_upgrade_tier: u32,
    /// Level stamped onto every spawned enemy.
    pub enemy_level: u32,
    /// Chance in `[0, 1]` that a heal item appears when a room's exit opens.
    pub heal_spawn_probability: f32,
    /// When set, kills never open the exit; a proxy exit point must do so.
    pub manual_exit: bool,
}

impl Default for LevelMetadata {
    fn default() -> Self {
        Self {
            xp: 0,
            required_upgrade_tier: 0,
            enemy_level: 1,
            heal_spawn_probability: 0.0,
            manual_exit: false,
        }
    }
}

/// One discrete arena of a level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomDefinition {
    /// Where the character is placed on room entry.
    #[serde(default)]
    pub spawn_point: Transform,
    /// Where the exit point stands, if the room has one.
    #[serde(default)]
    pub exit: Option<Transform>,
    /// Enemies in authoring order.
    #[serde(default)]
    pub enemies: Vec<EnemySpawnRecord>,
    /// Items in authoring order.
    #[serde(default)]
    pub items: Vec<ItemSpawnRecord>,
    /// Chests in authoring order.
    #[serde(default)]
    pub chests: Vec<ChestSpawnRecord>,
    /// Ad-hoc decorative or scripted objects.
    #[serde(default)]
    pub objects: Vec<ObjectSpawnRecord>,
}

/// Position, rotation, and scale of an authored object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Transform {
    /// Creates an unrotated, unscaled transform at `position`.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Authored enemy placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawnRecord {
    /// Enemy kind key registered in the world.
    pub kind: String,
    /// Nominal placement.
    #[serde(default)]
    pub transform: Transform,
    /// Whether the enemy is elite.
    #[serde(default)]
    pub elite: bool,
    /// Patrol waypoints in visiting order.
    #[serde(default)]
    pub patrol: Vec<Vec3>,
}

/// Authored item placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSpawnRecord {
    /// Item key registered in the world.
    pub key: String,
    /// Placement.
    #[serde(default)]
    pub transform: Transform,
}

/// Visual and gameplay variant of a chest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChestVariant {
    /// Regular chest opened on touch.
    #[default]
    Standard,
    /// Bonus chest variant.
    AdBonus,
}

/// Authored chest placement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChestSpawnRecord {
    /// Variant of the chest.
    #[serde(default)]
    pub variant: ChestVariant,
    /// Placement.
    #[serde(default)]
    pub transform: Transform,
}

/// Authored ad-hoc object placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpawnRecord {
    /// Free-form key identifying the object.
    pub key: String,
    /// Placement.
    #[serde(default)]
    pub transform: Transform,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RewardKind;

    const CATALOG: &str = r#"
        [[worlds]]
        name = "Crypt"
        environment = "crypt"
        heal_item = "potion"
        enemies = [{ key = "skeleton" }, { key = "lich", boss = true }]
        items = [{ key = "potion", effect = { type = "heal", amount = 25 } }]

        [[worlds.levels]]
        rewards = [{ kind = "currency", payload = "coins", amount = 100 }]
        metadata = { xp = 40, enemy_level = 3 }

        [[worlds.levels.rooms]]
        spawn_point = { position = [0.0, 0.0, 0.0] }
        exit = { position = [0.0, 0.0, 20.0] }
        enemies = [{ kind = "skeleton", elite = true, patrol = [[0.0, 0.0, 2.0], [0.0, 0.0, 6.0]] }]
        chests = [{ variant = "ad_bonus" }]

        [[worlds.levels]]

        [[worlds]]
        name = "Forest"

        [[worlds.levels]]
    "#;

    #[test]
    fn catalog_parses_from_toml() {
        let catalog: LevelCatalog = toml::from_str(CATALOG).expect("catalog parses");
        let world = catalog.world(0).expect("first world");
        assert_eq!(world.name, "Crypt");
        assert!(world.enemy_kind("lich").expect("lich registered").boss);
        assert!(world.item("potion").is_some());

        let level = catalog.level(LevelKey::new(0, 0)).expect("first level");
        assert_eq!(level.metadata.xp, 40);
        assert_eq!(level.metadata.enemy_level, 3);
        assert!(!level.metadata.manual_exit);
        assert_eq!(level.rewards[0].kind, RewardKind::Currency(Currency::Coins));
        assert_eq!(level.chest_count(), 1);

        let room = &level.rooms[0];
        assert_eq!(room.exit, Some(Transform::at(Vec3::new(0.0, 0.0, 20.0))));
        assert_eq!(room.enemies[0].patrol.len(), 2);
        assert_eq!(room.chests[0].variant, ChestVariant::AdBonus);
    }

    #[test]
    fn next_level_crosses_world_boundary() {
        let catalog: LevelCatalog = toml::from_str(CATALOG).expect("catalog parses");
        assert_eq!(
            catalog.next_level(LevelKey::new(0, 0)),
            Some(LevelKey::new(0, 1))
        );
        assert_eq!(
            catalog.next_level(LevelKey::new(0, 1)),
            Some(LevelKey::new(1, 0))
        );
        assert_eq!(catalog.next_level(LevelKey::new(1, 0)), None);
    }
}
