#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays scripted Room Crawler sessions.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use glam::Vec3;
use room_crawler_core::{Command, Currency, Event, LevelCatalog, LevelKey};
use room_crawler_session::{
    load_catalog, parse_catalog,
    services::{
        Economy, LevelHook, MemoryEconomy, MemorySaveStore, SaveStore, Services,
        TracingPresentation,
    },
    FileSaveStore, LevelSession, SessionConfig, SessionState,
};
use room_crawler_world::query;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const SAMPLE_CATALOG: &str = include_str!("../assets/catalog.toml");
const MAX_FRAMES_PER_LEVEL: u32 = 100_000;

/// Plays scripted runs through the levels of a catalog.
#[derive(Debug, Parser)]
#[command(name = "room-crawler", version, about)]
struct Args {
    /// Level catalog to play. Defaults to the bundled sample catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Session configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// File that keeps the session record between runs.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Number of levels to play in a row.
    #[arg(long, default_value_t = 1)]
    levels: u32,
    /// Length of a simulated frame in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
}

/// Level hook that logs every lifecycle transition.
struct LoggingHook;

impl LevelHook for LoggingHook {
    fn on_level_loaded(&mut self, level: LevelKey) {
        info!(?level, "hook: level loaded");
    }

    fn on_level_started(&mut self, level: LevelKey) {
        info!(?level, "hook: level started");
    }

    fn on_level_completed(&mut self, level: LevelKey) {
        info!(?level, "hook: level completed");
    }

    fn on_room_entered(&mut self, _level: LevelKey, room: u32) {
        info!(room, "hook: room entered");
    }
}

/// Entry point for the Room Crawler command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let catalog = Arc::new(read_catalog(&args)?);
    let config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SessionConfig::default(),
    };

    let economy = MemoryEconomy::default();
    let save: Box<dyn SaveStore> = match &args.save {
        Some(path) => Box::new(FileSaveStore::new(path)),
        None => Box::new(MemorySaveStore::default()),
    };
    let services = Services {
        save,
        economy: Box::new(economy.clone()),
        presentation: Box::new(TracingPresentation),
        hooks: vec![Box::new(LoggingHook)],
        ..Services::default()
    };

    let mut events = Vec::new();
    let mut session = LevelSession::init(Arc::clone(&catalog), config, services, &mut events);
    report(&mut events);

    let frame = Duration::from_millis(args.frame_ms.max(1));
    let mut level = Some(session.level());
    for _ in 0..args.levels {
        let Some(current) = level else {
            info!("catalog exhausted");
            break;
        };
        play_level(&mut session, current, frame, &mut events)
            .with_context(|| format!("playing level {current:?}"))?;
        session
            .apply(Command::UnloadLevel, &mut events)
            .context("unloading level")?;
        report(&mut events);
        level = catalog.next_level(current);
    }

    info!(
        coins = economy.get(Currency::Coins),
        gems = economy.get(Currency::Gems),
        xp = economy.experience(),
        "run finished"
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn read_catalog(args: &Args) -> Result<LevelCatalog> {
    match &args.catalog {
        Some(path) => load_catalog(path)
            .with_context(|| format!("loading catalog from {}", path.display())),
        None => parse_catalog(SAMPLE_CATALOG).context("parsing bundled sample catalog"),
    }
}

fn play_level(
    session: &mut LevelSession,
    level: LevelKey,
    frame: Duration,
    events: &mut Vec<Event>,
) -> Result<()> {
    session.apply(Command::LoadLevel { level }, events)?;
    session.apply(Command::ActivateLevel, events)?;
    report(events);

    for _ in 0..MAX_FRAMES_PER_LEVEL {
        match session.state() {
            SessionState::RoomActive => clear_room(session, frame, events)?,
            SessionState::RoomTransition => session.apply(Command::Tick { dt: frame }, events)?,
            SessionState::LevelComplete => {
                report(events);
                return Ok(());
            }
            state => bail!("session stuck in {state:?}"),
        }
        report(events);
    }
    bail!("level did not complete within {MAX_FRAMES_PER_LEVEL} frames")
}

fn clear_room(session: &mut LevelSession, frame: Duration, events: &mut Vec<Event>) -> Result<()> {
    let chests: Vec<_> = query::chests(session.room())
        .into_iter()
        .filter(|chest| !chest.opened)
        .map(|chest| chest.id)
        .collect();
    for chest in chests {
        session.apply(Command::OpenChest { chest }, events)?;
    }

    let items: Vec<_> = query::items(session.room())
        .into_iter()
        .filter(|item| !item.collected)
        .map(|item| item.id)
        .collect();
    for item in items {
        session.apply(Command::CollectItem { item }, events)?;
    }

    for enemy in session.room().alive_enemies() {
        let position = query::enemy_view(session.room())
            .get(enemy)
            .map(|snapshot| snapshot.position)
            .unwrap_or(Vec3::ZERO);
        session.apply(Command::MoveCharacter { position }, events)?;
        session.apply(Command::Tick { dt: frame }, events)?;
        debug!(?enemy, nearest = ?session.nearest_enemy(), "engaging enemy");
        session.apply(Command::EnemyKilled { enemy }, events)?;
    }

    session.apply(Command::OpenExit, events)?;
    session.apply(Command::CollectDrops, events)?;
    session.apply(Command::PlayerExitLevel, events)?;
    Ok(())
}

fn report(events: &mut Vec<Event>) {
    for event in events.drain(..) {
        match event {
            Event::TimeAdvanced { .. } => {}
            Event::NearestEnemyChanged { nearest } => debug!(?nearest, "nearest enemy changed"),
            other => info!(event = ?other),
        }
    }
}
