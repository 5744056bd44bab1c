//! Live handles tracked by the room state.

use glam::Vec3;
use room_crawler_core::{
    ChestId, ChestVariant, EnemyId, EnemyRank, ExitId, ItemEffect, ItemId, Loot, ObjectId, Purse,
};

/// Enemy instantiated from a spawn record.
#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) id: EnemyId,
    pub(crate) kind: String,
    pub(crate) rank: EnemyRank,
    pub(crate) position: Vec3,
    pub(crate) level: u32,
    pub(crate) patrol: Vec<Vec3>,
    pub(crate) dead: bool,
    pub(crate) active: bool,
    pub(crate) loot: Loot,
}

impl Enemy {
    /// Coordinate along the level's forward axis.
    pub(crate) fn forward(&self) -> f32 {
        self.position.z
    }
}

/// Item lying in the room until picked up.
#[derive(Clone, Debug)]
pub(crate) struct Item {
    pub(crate) id: ItemId,
    pub(crate) key: String,
    pub(crate) effect: ItemEffect,
    pub(crate) position: Vec3,
    pub(crate) collected: bool,
}

/// Chest holding a pre-computed currency share.
#[derive(Clone, Debug)]
pub(crate) struct Chest {
    pub(crate) id: ChestId,
    pub(crate) variant: ChestVariant,
    pub(crate) position: Vec3,
    pub(crate) reward: Purse,
    pub(crate) opened: bool,
}

/// Exit point that lets the player leave once open.
#[derive(Clone, Debug)]
pub(crate) struct ExitPoint {
    pub(crate) id: ExitId,
    pub(crate) position: Vec3,
}

/// Ad-hoc object whose only lifecycle is spawn and unload.
#[derive(Clone, Debug)]
pub(crate) struct CustomObject {
    pub(crate) id: ObjectId,
    pub(crate) key: String,
    pub(crate) position: Vec3,
}

/// Position an enemy is placed at when spawned.
///
/// Enemies with a patrol route of two or more points start halfway along the
/// first segment instead of at their authored position.
pub(crate) fn spawn_position(nominal: Vec3, patrol: &[Vec3]) -> Vec3 {
    match patrol {
        [first, second, ..] => first.lerp(*second, 0.5),
        _ => nominal,
    }
}
