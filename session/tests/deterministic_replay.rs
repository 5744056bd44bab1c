use std::{sync::Arc, time::Duration};

use glam::Vec3;
use room_crawler_core::{Command, Event, LevelKey};
use room_crawler_session::{
    parse_catalog, services::Services, LevelSession, SessionConfig, SessionState,
};
use room_crawler_world::query;

const CATALOG: &str = r#"
[[worlds]]
name = "Sewers"
heal_item = "flask"
enemies = [{ key = "rat" }, { key = "ogre", boss = true }]
items = [{ key = "flask", effect = { type = "heal", amount = 10 } }]

[[worlds.levels]]
rewards = [
    { kind = "currency", payload = "coins", amount = 57 },
    { kind = "currency", payload = "gems", amount = 5 },
]
metadata = { xp = 12, enemy_level = 2, heal_spawn_probability = 0.5 }

[[worlds.levels.rooms]]
exit = { position = [0.0, 0.0, 18.0] }
enemies = [
    { kind = "rat", transform = { position = [-3.0, 0.0, 5.0] } },
    { kind = "rat", transform = { position = [3.0, 0.0, 9.0] } },
]
chests = [{ transform = { position = [0.0, 0.0, 12.0] } }]

[[worlds.levels.rooms]]
exit = { position = [0.0, 0.0, 25.0] }
enemies = [
    { kind = "rat", transform = { position = [1.0, 0.0, 4.0] } },
    { kind = "ogre", elite = true, transform = { position = [0.0, 0.0, 20.0] } },
]
"#;

#[test]
fn deterministic_replay_produces_identical_logs() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert!(first
        .iter()
        .any(|event| matches!(event, Event::LevelCompleted { .. })));
}

fn replay() -> Vec<Event> {
    let catalog = Arc::new(parse_catalog(CATALOG).expect("catalog parses"));
    let config = SessionConfig {
        heal_seed: 7,
        ..SessionConfig::default()
    };
    let mut log = Vec::new();
    let mut session = LevelSession::init(catalog, config, Services::default(), &mut log);

    let frame = Duration::from_millis(50);
    run(
        &mut session,
        Command::LoadLevel {
            level: LevelKey::new(0, 0),
        },
        &mut log,
    );
    run(&mut session, Command::ActivateLevel, &mut log);

    for _ in 0..200 {
        match session.state() {
            SessionState::RoomActive => clear_room(&mut session, frame, &mut log),
            SessionState::RoomTransition => run(&mut session, Command::Tick { dt: frame }, &mut log),
            _ => break,
        }
    }

    log
}

fn clear_room(session: &mut LevelSession, frame: Duration, log: &mut Vec<Event>) {
    for chest in query::chests(session.room())
        .into_iter()
        .map(|chest| chest.id)
        .collect::<Vec<_>>()
    {
        run(session, Command::OpenChest { chest }, log);
    }

    for enemy in session.room().alive_enemies() {
        let position = query::enemy_view(session.room())
            .get(enemy)
            .map_or(Vec3::ZERO, |snapshot| snapshot.position);
        run(session, Command::MoveCharacter { position }, log);
        run(session, Command::Tick { dt: frame }, log);
        run(session, Command::EnemyKilled { enemy }, log);
    }

    run(session, Command::CollectDrops, log);
    run(session, Command::PlayerExitLevel, log);
}

fn run(session: &mut LevelSession, command: Command, log: &mut Vec<Event>) {
    session
        .apply(command, log)
        .expect("scripted command is accepted");
}
