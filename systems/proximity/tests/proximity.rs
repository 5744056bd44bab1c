use std::time::Duration;

use glam::Vec3;
use room_crawler_core::{EnemyId, EnemyRank, EnemySnapshot, EnemyView};
use room_crawler_system_proximity::{Config, ProximityTracker};

const DELAY: Duration = Duration::from_secs(1);

fn snapshot(id: u32, x: f32, dead: bool) -> EnemySnapshot {
    EnemySnapshot {
        id: EnemyId::new(id),
        position: Vec3::new(x, 0.0, 0.0),
        rank: EnemyRank::Ordinary,
        dead,
        active: true,
    }
}

fn view(entries: &[(u32, f32)]) -> EnemyView {
    EnemyView::from_snapshots(
        entries
            .iter()
            .map(|(id, x)| snapshot(*id, *x, false))
            .collect(),
    )
}

fn tracker() -> ProximityTracker {
    ProximityTracker::new(Config::new(10.0, DELAY))
}

#[test]
fn empty_tracker_has_no_nearest() {
    let tracker = tracker();
    assert!(tracker.members().is_empty());
    assert_eq!(tracker.nearest(), None);
}

#[test]
fn single_member_updates_immediately() {
    let mut tracker = tracker();
    let enemies = view(&[(1, 4.0)]);
    let mut changes = Vec::new();

    tracker.on_enemy_entered(
        EnemyId::new(1),
        Vec3::ZERO,
        &enemies,
        &mut |nearest: Option<EnemyId>| changes.push(nearest),
    );

    assert_eq!(tracker.nearest(), Some(EnemyId::new(1)));
    assert_eq!(changes, vec![Some(EnemyId::new(1))]);
}

#[test]
fn last_member_leaving_clears_nearest_immediately() {
    let mut tracker = tracker();
    let enemies = view(&[(1, 4.0)]);
    let mut changes = Vec::new();
    let mut listener = |nearest: Option<EnemyId>| changes.push(nearest);

    tracker.on_enemy_entered(EnemyId::new(1), Vec3::ZERO, &enemies, &mut listener);
    tracker.on_enemy_exited(EnemyId::new(1), Vec3::ZERO, &enemies, &mut listener);

    assert_eq!(tracker.nearest(), None);
    assert_eq!(changes, vec![Some(EnemyId::new(1)), None]);
}

#[test]
fn second_member_waits_for_recompute_delay() {
    let mut tracker = tracker();
    let enemies = view(&[(1, 6.0), (2, 2.0)]);
    let mut changes = Vec::new();
    let mut listener = |nearest: Option<EnemyId>| changes.push(nearest);

    tracker.on_enemy_entered(EnemyId::new(1), Vec3::ZERO, &enemies, &mut listener);
    tracker.on_enemy_entered(EnemyId::new(2), Vec3::ZERO, &enemies, &mut listener);
    assert_eq!(
        tracker.nearest(),
        Some(EnemyId::new(1)),
        "closer enemy must not be picked before the delay elapses"
    );

    tracker.tick(Duration::from_millis(600), Vec3::ZERO, &enemies, &mut listener);
    assert_eq!(tracker.nearest(), Some(EnemyId::new(1)));

    tracker.tick(Duration::from_millis(400), Vec3::ZERO, &enemies, &mut listener);
    assert_eq!(tracker.nearest(), Some(EnemyId::new(2)));

    assert_eq!(changes, vec![Some(EnemyId::new(1)), Some(EnemyId::new(2))]);
}

#[test]
fn recompute_without_change_is_silent() {
    let mut tracker = tracker();
    let enemies = view(&[(1, 1.0), (2, 5.0)]);
    let mut notifications = 0;
    let mut listener = |_: Option<EnemyId>| notifications += 1;

    tracker.on_enemy_entered(EnemyId::new(1), Vec3::ZERO, &enemies, &mut listener);
    tracker.on_enemy_entered(EnemyId::new(2), Vec3::ZERO, &enemies, &mut listener);
    tracker.tick(DELAY, Vec3::ZERO, &enemies, &mut listener);
    tracker.tick(DELAY, Vec3::ZERO, &enemies, &mut listener);

    assert_eq!(notifications, 1);
}

#[test]
fn death_forces_recompute_before_delay() {
    let mut tracker = tracker();
    let alive = view(&[(1, 1.0), (2, 3.0), (3, 5.0)]);
    let mut changes = Vec::new();
    let mut listener = |nearest: Option<EnemyId>| changes.push(nearest);

    for id in 1..=3 {
        tracker.on_enemy_entered(EnemyId::new(id), Vec3::ZERO, &alive, &mut listener);
    }
    assert_eq!(tracker.nearest(), Some(EnemyId::new(1)));

    let after_death = EnemyView::from_snapshots(vec![
        snapshot(1, 1.0, true),
        snapshot(2, 3.0, false),
        snapshot(3, 5.0, false),
    ]);
    tracker.on_enemy_died(EnemyId::new(1), Vec3::ZERO, &after_death, &mut listener);

    assert_eq!(tracker.nearest(), Some(EnemyId::new(2)));
    assert_eq!(tracker.members(), &[EnemyId::new(2), EnemyId::new(3)]);
    assert_eq!(changes, vec![Some(EnemyId::new(1)), Some(EnemyId::new(2))]);
}

#[test]
fn dead_enemies_cannot_enter() {
    let mut tracker = tracker();
    let enemies = EnemyView::from_snapshots(vec![snapshot(1, 1.0, true)]);

    tracker.on_enemy_entered(EnemyId::new(1), Vec3::ZERO, &enemies, &mut |_: Option<EnemyId>| {});

    assert!(tracker.members().is_empty());
}

#[test]
fn try_add_respects_radius() {
    let mut tracker = tracker();
    let enemies = view(&[(1, 4.0), (2, 40.0)]);
    let mut listener = |_: Option<EnemyId>| {};

    assert!(tracker.try_add_closest_enemy(EnemyId::new(1), Vec3::ZERO, &enemies, &mut listener));
    assert!(!tracker.try_add_closest_enemy(EnemyId::new(1), Vec3::ZERO, &enemies, &mut listener));
    assert!(!tracker.try_add_closest_enemy(EnemyId::new(2), Vec3::ZERO, &enemies, &mut listener));
    assert_eq!(tracker.members(), &[EnemyId::new(1)]);
}

#[test]
fn sync_volume_tracks_radius_changes() {
    let mut tracker = tracker();
    let enemies = view(&[(1, 4.0), (2, 8.0)]);
    let mut listener = |_: Option<EnemyId>| {};

    tracker.sync_volume(Vec3::ZERO, &enemies, &mut listener);
    assert_eq!(tracker.members(), &[EnemyId::new(1), EnemyId::new(2)]);

    tracker.set_radius(5.0);
    tracker.sync_volume(Vec3::ZERO, &enemies, &mut listener);
    assert_eq!(tracker.members(), &[EnemyId::new(1)]);
    assert_eq!(tracker.nearest(), Some(EnemyId::new(1)));
}

#[test]
fn sync_volume_drops_enemies_missing_from_view() {
    let mut tracker = tracker();
    let mut listener = |_: Option<EnemyId>| {};
    tracker.sync_volume(Vec3::ZERO, &view(&[(1, 1.0)]), &mut listener);

    tracker.sync_volume(Vec3::ZERO, &EnemyView::default(), &mut listener);

    assert!(tracker.members().is_empty());
    assert_eq!(tracker.nearest(), None);
}

#[test]
fn reload_clears_without_notifying() {
    let mut tracker = tracker();
    let enemies = view(&[(1, 1.0), (2, 2.0)]);
    let mut notifications = 0;
    let mut listener = |_: Option<EnemyId>| notifications += 1;

    tracker.sync_volume(Vec3::ZERO, &enemies, &mut listener);
    tracker.reload();

    assert!(tracker.members().is_empty());
    assert_eq!(tracker.nearest(), None);
    assert_eq!(notifications, 1);
}
