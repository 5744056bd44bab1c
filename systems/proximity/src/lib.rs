#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Throttled nearest-enemy tracking for a single observer.
//!
//! The tracker keeps the set of enemies inside the observer's detection
//! radius and caches the nearest one. Membership changes arrive as volume
//! enter/exit notifications, explicit additions for enemies that spawn
//! already overlapping the volume, and death notifications. While at most one
//! enemy is tracked the nearest is refreshed on every change; with two or more
//! the full recomputation runs at most once per configured delay.

use std::time::Duration;

use glam::Vec3;
use room_crawler_core::{EnemyId, EnemyView};
use tracing::debug;

/// Delay between throttled recomputations used when none is configured.
pub const DEFAULT_RECOMPUTE_DELAY: Duration = Duration::from_secs(1);
/// Detection radius used when none is configured.
pub const DEFAULT_RADIUS: f32 = 8.0;

/// Configuration parameters required to construct a tracker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    radius: f32,
    recompute_delay: Duration,
}

impl Config {
    /// Creates a configuration with the provided radius and recompute delay.
    #[must_use]
    pub const fn new(radius: f32, recompute_delay: Duration) -> Self {
        Self {
            radius,
            recompute_delay,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS, DEFAULT_RECOMPUTE_DELAY)
    }
}

/// Receives nearest-enemy changes from a [`ProximityTracker`].
pub trait NearestEnemyListener {
    /// Called whenever the nearest tracked enemy differs from the previous one.
    fn nearest_enemy_changed(&mut self, nearest: Option<EnemyId>);
}

impl<F> NearestEnemyListener for F
where
    F: FnMut(Option<EnemyId>),
{
    fn nearest_enemy_changed(&mut self, nearest: Option<EnemyId>) {
        self(nearest);
    }
}

/// Nearest-enemy tracker owned by one observing character.
#[derive(Debug)]
pub struct ProximityTracker {
    radius: f32,
    recompute_delay: Duration,
    since_recompute: Duration,
    members: Vec<EnemyId>,
    nearest: Option<EnemyId>,
}

impl ProximityTracker {
    /// Creates an empty tracker using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            radius: config.radius.max(0.0),
            recompute_delay: config.recompute_delay,
            since_recompute: Duration::ZERO,
            members: Vec::new(),
            nearest: None,
        }
    }

    /// Currently nearest tracked enemy.
    #[must_use]
    pub fn nearest(&self) -> Option<EnemyId> {
        self.nearest
    }

    /// Enemies currently inside the volume, in the order they entered.
    #[must_use]
    pub fn members(&self) -> &[EnemyId] {
        &self.members
    }

    /// Reports whether `enemy` is tracked.
    #[must_use]
    pub fn contains(&self, enemy: EnemyId) -> bool {
        self.members.contains(&enemy)
    }

    /// Detection radius in world units.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Adjusts the detection radius. Membership follows on the next volume sync.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
    }

    /// Handles an enemy entering the detection volume.
    pub fn on_enemy_entered(
        &mut self,
        enemy: EnemyId,
        observer: Vec3,
        enemies: &EnemyView,
        listener: &mut impl NearestEnemyListener,
    ) {
        if self.contains(enemy) || enemies.get(enemy).map_or(true, |snapshot| snapshot.dead) {
            return;
        }

        self.members.push(enemy);
        self.membership_changed(false, observer, enemies, listener);
    }

    /// Handles an enemy leaving the detection volume.
    pub fn on_enemy_exited(
        &mut self,
        enemy: EnemyId,
        observer: Vec3,
        enemies: &EnemyView,
        listener: &mut impl NearestEnemyListener,
    ) {
        if !self.remove(enemy) {
            return;
        }

        let force = self.nearest == Some(enemy);
        self.membership_changed(force, observer, enemies, listener);
    }

    /// Handles the death of an enemy, forcing an immediate recomputation.
    pub fn on_enemy_died(
        &mut self,
        enemy: EnemyId,
        observer: Vec3,
        enemies: &EnemyView,
        listener: &mut impl NearestEnemyListener,
    ) {
        if !self.remove(enemy) {
            return;
        }

        self.membership_changed(true, observer, enemies, listener);
    }

    /// Adds an enemy that spawned already overlapping the volume.
    ///
    /// Returns `true` when the enemy was within range and became tracked.
    pub fn try_add_closest_enemy(
        &mut self,
        enemy: EnemyId,
        observer: Vec3,
        enemies: &EnemyView,
        listener: &mut impl NearestEnemyListener,
    ) -> bool {
        let Some(snapshot) = enemies.get(enemy) else {
            return false;
        };

        if snapshot.dead || self.contains(enemy) || !self.in_range(observer, snapshot.position) {
            return false;
        }

        self.on_enemy_entered(enemy, observer, enemies, listener);
        true
    }

    /// Derives enter/exit notifications by testing every enemy against the radius.
    pub fn sync_volume(
        &mut self,
        observer: Vec3,
        enemies: &EnemyView,
        listener: &mut impl NearestEnemyListener,
    ) {
        let vanished: Vec<EnemyId> = self
            .members
            .iter()
            .copied()
            .filter(|member| enemies.get(*member).is_none())
            .collect();
        for enemy in vanished {
            self.on_enemy_exited(enemy, observer, enemies, listener);
        }

        for snapshot in enemies.iter() {
            let tracked = self.contains(snapshot.id);
            if snapshot.dead {
                if tracked {
                    self.on_enemy_died(snapshot.id, observer, enemies, listener);
                }
                continue;
            }

            let inside = self.in_range(observer, snapshot.position);
            if inside && !tracked {
                self.on_enemy_entered(snapshot.id, observer, enemies, listener);
            } else if !inside && tracked {
                self.on_enemy_exited(snapshot.id, observer, enemies, listener);
            }
        }
    }

    /// Advances the throttle clock and recomputes when the delay has elapsed.
    pub fn tick(
        &mut self,
        dt: Duration,
        observer: Vec3,
        enemies: &EnemyView,
        listener: &mut impl NearestEnemyListener,
    ) {
        self.since_recompute = self.since_recompute.saturating_add(dt);

        if self.members.len() >= 2 && self.since_recompute >= self.recompute_delay {
            self.recompute(observer, enemies, listener);
        }
    }

    /// Clears membership and the cached nearest enemy without notifying.
    pub fn reload(&mut self) {
        self.members.clear();
        self.nearest = None;
        self.since_recompute = Duration::ZERO;
    }

    fn in_range(&self, observer: Vec3, position: Vec3) -> bool {
        (position - observer).length_squared() <= self.radius * self.radius
    }

    fn remove(&mut self, enemy: EnemyId) -> bool {
        match self.members.iter().position(|member| *member == enemy) {
            Some(index) => {
                let _ = self.members.remove(index);
                true
            }
            None => false,
        }
    }

    fn membership_changed(
        &mut self,
        force: bool,
        observer: Vec3,
        enemies: &EnemyView,
        listener: &mut impl NearestEnemyListener,
    ) {
        if force || self.members.len() <= 1 {
            self.recompute(observer, enemies, listener);
        }
    }

    fn recompute(
        &mut self,
        observer: Vec3,
        enemies: &EnemyView,
        listener: &mut impl NearestEnemyListener,
    ) {
        self.since_recompute = Duration::ZERO;

        let mut best: Option<(EnemyId, f32)> = None;
        for member in &self.members {
            let Some(snapshot) = enemies.get(*member) else {
                continue;
            };
            if snapshot.dead {
                continue;
            }

            let distance_sq = (snapshot.position - observer).length_squared();
            match best {
                Some((_, best_sq)) if distance_sq >= best_sq => {}
                _ => best = Some((*member, distance_sq)),
            }
        }

        let nearest = best.map(|(enemy, _)| enemy);
        if nearest != self.nearest {
            debug!(?nearest, previous = ?self.nearest, "nearest enemy changed");
            self.nearest = nearest;
            listener.nearest_enemy_changed(nearest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_crawler_core::{EnemyRank, EnemySnapshot};

    fn view(entries: &[(u32, f32)]) -> EnemyView {
        EnemyView::from_snapshots(
            entries
                .iter()
                .map(|(id, x)| EnemySnapshot {
                    id: EnemyId::new(*id),
                    position: Vec3::new(*x, 0.0, 0.0),
                    rank: EnemyRank::Ordinary,
                    dead: false,
                    active: true,
                })
                .collect(),
        )
    }

    #[test]
    fn ties_keep_first_member() {
        let mut tracker = ProximityTracker::new(Config::default());
        let enemies = view(&[(1, 2.0), (2, -2.0)]);
        let mut changes = Vec::new();
        let mut listener = |nearest: Option<EnemyId>| changes.push(nearest);

        tracker.on_enemy_entered(EnemyId::new(2), Vec3::ZERO, &enemies, &mut listener);
        tracker.on_enemy_entered(EnemyId::new(1), Vec3::ZERO, &enemies, &mut listener);
        tracker.tick(DEFAULT_RECOMPUTE_DELAY, Vec3::ZERO, &enemies, &mut listener);

        assert_eq!(tracker.nearest(), Some(EnemyId::new(2)));
        assert_eq!(changes, vec![Some(EnemyId::new(2))]);
    }

    #[test]
    fn negative_radius_is_clamped() {
        let mut tracker = ProximityTracker::new(Config::new(-3.0, DEFAULT_RECOMPUTE_DELAY));
        assert_eq!(tracker.radius(), 0.0);
        tracker.set_radius(-1.0);
        assert_eq!(tracker.radius(), 0.0);
    }
}
