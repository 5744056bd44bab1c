#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Room progression controller of the Room Crawler session engine.
//!
//! A [`LevelSession`] owns the level and room lifecycle: it loads a level
//! from the shared catalog, splits the level's reward manifest once, spawns
//! one room at a time into the [`RoomState`], opens the exit when the room is
//! cleared and walks the player through the remaining rooms until the level
//! completes or the player dies. Adapters drive it through [`LevelSession::apply`]
//! and react to the [`Event`] values it appends to their buffer.
//!
//! Every externally triggerable entry point checks its guard flag first and
//! flips it before doing any work, which makes repeated trigger callbacks
//! harmless.

use std::{sync::Arc, time::Duration};

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use room_crawler_core::{
    ChestId, Command, Currency, EnemyId, Event, ItemEffect, ItemId, LevelCatalog,
    LevelDefinition, LevelKey, Purse, RewardKind, WorldDefinition,
};
use room_crawler_system_proximity::{Config as ProximityConfig, ProximityTracker};
use room_crawler_system_rewards::{RewardPlan, RewardPlanner};
use room_crawler_world::{query, RoomState, RoomStateError};
use tracing::{debug, info, warn};

mod catalog;
mod config;
mod error;
mod save;
pub mod services;
mod timers;

pub use catalog::{load_catalog, parse_catalog, CatalogError};
pub use config::{ConfigError, SessionConfig};
pub use error::SessionError;
pub use save::{FileSaveStore, SaveRecord, SaveRecordError, RECORD_HEADER};
pub use timers::{TimerId, Timers};

use services::{Cue, Fade, LevelHook, Services};

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No level is loaded.
    Idle,
    /// A level is loaded but gameplay has not been activated yet.
    LevelLoading,
    /// The player is inside a room.
    RoomActive,
    /// The player left a room and the fade toward the next one is running.
    RoomTransition,
    /// The final room was cleared.
    LevelComplete,
    /// The player character died.
    LevelFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scheduled {
    CompleteTransition,
    EndInvulnerability,
}

/// Explicit session context driving one player through a level.
#[derive(Debug)]
pub struct LevelSession {
    catalog: Arc<LevelCatalog>,
    config: SessionConfig,
    services: Services,
    state: SessionState,
    level: LevelKey,
    room_index: u32,
    room_count: u32,
    manual_exit: bool,
    planner: RewardPlanner,
    plan: RewardPlan,
    room: RoomState,
    tracker: ProximityTracker,
    timers: Timers<Scheduled>,
    fired: Vec<Scheduled>,
    transition: Option<TimerId>,
    invulnerability: Option<TimerId>,
    character: Vec3,
    coins_earned: u32,
    is_level_loaded: bool,
    is_gameplay_active: bool,
    is_exit_entered: bool,
    input_enabled: bool,
    movement_enabled: bool,
    awaiting_navigation: bool,
    level_started: bool,
}

impl LevelSession {
    /// Creates a session and resolves the level to play from the persisted record.
    ///
    /// A missing, unreadable, or dangling record falls back to the first level
    /// of the first world.
    pub fn init(
        catalog: Arc<LevelCatalog>,
        config: SessionConfig,
        services: Services,
        out_events: &mut Vec<Event>,
    ) -> Self {
        let record = match services.save.load() {
            Ok(record) => record.unwrap_or_default(),
            Err(error) => {
                warn!(%error, "could not read session record, starting from the first level");
                SaveRecord::default()
            }
        };

        let mut level = record.level();
        if catalog.level(level).is_none() {
            warn!(?level, "persisted level is not in the catalog, starting from the first level");
            level = LevelKey::new(0, 0);
        }

        let tracker = ProximityTracker::new(ProximityConfig::new(
            config.proximity_radius,
            config.proximity_recompute_delay(),
        ));

        let mut session = Self {
            catalog,
            config,
            services,
            state: SessionState::Idle,
            level,
            room_index: 0,
            room_count: 0,
            manual_exit: false,
            planner: RewardPlanner::new(),
            plan: RewardPlan::default(),
            room: RoomState::new(),
            tracker,
            timers: Timers::new(),
            fired: Vec::new(),
            transition: None,
            invulnerability: None,
            character: Vec3::ZERO,
            coins_earned: 0,
            is_level_loaded: false,
            is_gameplay_active: false,
            is_exit_entered: false,
            input_enabled: false,
            movement_enabled: false,
            awaiting_navigation: false,
            level_started: false,
        };

        info!(?level, "session initialised");
        session.notify(|hook| hook.on_level_initialised(level));
        out_events.push(Event::LevelInitialised { level });
        session
    }

    /// Executes `command`, appending the resulting events to `out_events`.
    pub fn apply(
        &mut self,
        command: Command,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        match command {
            Command::Tick { dt } => self.tick(dt, out_events),
            Command::LoadLevel { level } => self.load_level(level, out_events),
            Command::ActivateLevel => self.activate_level(out_events),
            Command::MoveCharacter { position } => {
                self.move_character(position, out_events);
                Ok(())
            }
            Command::MoveEnemy { enemy, position } => self.move_enemy(enemy, position),
            Command::EnemyKilled { enemy } => self.on_enemy_killed(enemy, out_events),
            Command::OpenExit => self.open_exit(out_events).map(|_| ()),
            Command::OpenChest { chest } => self.open_chest(chest, out_events),
            Command::CollectItem { item } => self.collect_item(item, out_events),
            Command::CollectDrops => self.collect_drops(out_events),
            Command::PlayerExitLevel => self.on_player_exit_level(out_events),
            Command::PlayerDied => {
                self.on_player_died(out_events);
                Ok(())
            }
            Command::ReviveCharacter { invulnerable } => {
                self.revive_character(invulnerable, out_events)
            }
            Command::ReloadRoom => self.reload_room(out_events),
            Command::UnloadLevel => self.unload_level(out_events),
        }
    }

    /// Loads `level` and its first room. Does nothing if a level is already loaded.
    pub fn load_level(
        &mut self,
        level: LevelKey,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        if self.is_level_loaded {
            debug!(?level, loaded = ?self.level, "level already loaded");
            return Ok(());
        }

        let catalog = Arc::clone(&self.catalog);
        let (world, definition) = resolve(&catalog, level)?;
        if definition.rooms.is_empty() {
            return Err(SessionError::EmptyLevel(level));
        }

        self.is_level_loaded = true;
        self.state = SessionState::LevelLoading;
        self.level = level;
        self.room_count = count(definition.rooms.len());
        self.manual_exit = definition.metadata.manual_exit;
        self.coins_earned = 0;
        self.level_started = false;
        self.is_exit_entered = false;

        info!(
            ?level,
            world = %world.name,
            environment = %world.environment,
            enemy_level = definition.metadata.enemy_level,
            rooms = self.room_count,
            "loading level"
        );

        let cards = &self.services.cards;
        self.plan = self.planner.plan(definition, |entry| match &entry.kind {
            RewardKind::WeaponCard(card) => cards.is_unlocked(card),
            RewardKind::Currency(_) => false,
        });

        if let Err(error) = self.enter_room(world, definition, 0) {
            self.is_level_loaded = false;
            self.state = SessionState::Idle;
            return Err(error);
        }

        self.notify(|hook| hook.on_level_loaded(level));
        out_events.push(Event::LevelLoaded {
            level,
            rooms: self.room_count,
        });
        Ok(())
    }

    /// Enables gameplay for the loaded level.
    ///
    /// The character is placed at the room's spawn point immediately; movement,
    /// enemy activation, and [`Event::LevelStarted`] wait until navigation is
    /// ready, which may be on a later tick.
    pub fn activate_level(&mut self, out_events: &mut Vec<Event>) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }
        if self.is_gameplay_active {
            return Ok(());
        }

        self.is_gameplay_active = true;
        self.input_enabled = true;
        self.state = SessionState::RoomActive;
        self.character = self.room.spawn_point().position;
        self.request_activation(out_events);
        Ok(())
    }

    /// Marks `enemy` dead and, outside manual-exit levels, tries to open the exit.
    pub fn on_enemy_killed(
        &mut self,
        enemy: EnemyId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }

        match self.room.kill_enemy(enemy) {
            Ok(()) => {}
            Err(RoomStateError::EnemyAlreadyDead(_)) => {
                debug!(?enemy, "kill reported twice");
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        }
        out_events.push(Event::EnemyKilled { enemy });

        let view = query::enemy_view(&self.room);
        let mut listener =
            |nearest: Option<EnemyId>| out_events.push(Event::NearestEnemyChanged { nearest });
        self.tracker
            .on_enemy_died(enemy, self.character, &view, &mut listener);

        if !self.manual_exit {
            let _ = self.try_open_exit(out_events);
        }
        Ok(())
    }

    /// Opens the room's exit if every enemy is dead.
    ///
    /// Returns `true` when this call opened it. Used by manual-exit levels and
    /// proxy exit points.
    pub fn open_exit(&mut self, out_events: &mut Vec<Event>) -> Result<bool, SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }
        Ok(self.try_open_exit(out_events))
    }

    /// Handles the player entering the open exit.
    ///
    /// Collects the remaining floor drops, advances the room index by one and
    /// either starts the fade toward the next room or completes the level.
    pub fn on_player_exit_level(
        &mut self,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        if self.is_exit_entered {
            debug!("exit already entered");
            return Ok(());
        }
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }
        if !self.is_gameplay_active || !self.room.is_exit_open() {
            debug!(room = self.room_index, "exit is not usable");
            return Ok(());
        }

        self.is_exit_entered = true;
        self.collect_drops(out_events)?;
        self.input_enabled = false;

        let level = self.level;
        let from = self.room_index;
        info!(room = from, "player left room");
        out_events.push(Event::PlayerExitLevel { room: from });
        self.notify(|hook| hook.on_room_leaved(level, from));

        let to = from.saturating_add(1);
        self.room_index = to;
        if to < self.room_count {
            self.state = SessionState::RoomTransition;
            let fade = self.config.transition_fade();
            self.services.presentation.fade(Fade::Out, fade);
            let timer = self.timers.schedule(fade, Scheduled::CompleteTransition);
            self.transition = Some(timer);
            out_events.push(Event::RoomTransitionStarted { from, to });
        } else {
            let catalog = Arc::clone(&self.catalog);
            let (_, definition) = resolve(&catalog, level)?;
            self.finalize_level(definition, out_events);
        }
        Ok(())
    }

    /// Handles the death of the player character.
    ///
    /// Ignored unless gameplay is active, and ignored while the fade toward
    /// the next room runs.
    pub fn on_player_died(&mut self, out_events: &mut Vec<Event>) {
        if !self.is_gameplay_active {
            debug!("death reported while gameplay is inactive");
            return;
        }
        if self.state == SessionState::RoomTransition {
            debug!(room = self.room_index, "death reported during room transition");
            return;
        }
        if self.is_invulnerable() {
            debug!("death reported during invulnerability window");
            return;
        }

        self.is_gameplay_active = false;
        self.input_enabled = false;
        self.movement_enabled = false;
        self.state = SessionState::LevelFailed;

        self.tracker.reload();

        let level = self.level;
        info!(room = self.room_index, "player died");
        self.services.presentation.play_cue(Cue::LevelFailed);
        out_events.push(Event::PlayerDied);
        self.notify(|hook| hook.on_level_failed(level));
    }

    /// Brings the dead character back at the current room's spawn point.
    ///
    /// When `invulnerable` is set the character cannot die until the
    /// configured window elapses.
    pub fn revive_character(
        &mut self,
        invulnerable: bool,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }
        if self.is_gameplay_active || self.state != SessionState::LevelFailed {
            debug!(state = ?self.state, "revive ignored");
            return Ok(());
        }

        self.is_gameplay_active = true;
        self.input_enabled = true;
        self.movement_enabled = true;
        self.state = SessionState::RoomActive;
        self.character = self.room.spawn_point().position;

        if invulnerable {
            let window = self.config.revive_invulnerability();
            self.invulnerability = Some(self.timers.schedule(window, Scheduled::EndInvulnerability));
        }

        info!(invulnerable, "character revived");
        out_events.push(Event::CharacterRevived { invulnerable });
        self.sync_proximity(out_events);
        Ok(())
    }

    /// Restarts the level from its first room with fresh enemies and reward shares.
    pub fn reload_room(&mut self, out_events: &mut Vec<Event>) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }

        self.cancel_timers();
        let catalog = Arc::clone(&self.catalog);
        let (world, definition) = resolve(&catalog, self.level)?;
        self.enter_room(world, definition, 0)?;

        self.coins_earned = 0;
        self.is_exit_entered = false;
        self.is_gameplay_active = true;
        self.input_enabled = true;
        self.state = SessionState::RoomActive;

        let level = self.level;
        info!(?level, "level restarted from the first room");
        out_events.push(Event::RoomReloaded);
        self.notify(|hook| hook.on_room_entered(level, 0));
        out_events.push(Event::RoomStarted { room: 0 });
        self.request_activation(out_events);
        Ok(())
    }

    /// Tears the loaded level down and resets every session flag.
    pub fn unload_level(&mut self, out_events: &mut Vec<Event>) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }

        self.cancel_timers();
        self.room.unload();
        self.tracker.reload();
        self.plan = RewardPlan::default();
        self.state = SessionState::Idle;
        self.room_index = 0;
        self.room_count = 0;
        self.coins_earned = 0;
        self.is_level_loaded = false;
        self.is_gameplay_active = false;
        self.is_exit_entered = false;
        self.input_enabled = false;
        self.movement_enabled = false;
        self.awaiting_navigation = false;
        self.level_started = false;

        let level = self.level;
        info!(?level, "level unloaded");
        self.notify(|hook| hook.on_level_unloaded(level));
        out_events.push(Event::LevelUnloaded { level });
        Ok(())
    }

    /// Opens `chest` and credits its share.
    pub fn open_chest(
        &mut self,
        chest: ChestId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }

        let reward = self.room.open_chest(chest)?;
        self.credit_purse(&reward, out_events);
        self.services.presentation.play_cue(Cue::ChestOpened);
        out_events.push(Event::ChestOpened { chest });
        Ok(())
    }

    /// Picks `item` up, crediting currency items to the economy.
    ///
    /// Heal items are applied by the character when it sees [`Event::ItemCollected`].
    pub fn collect_item(
        &mut self,
        item: ItemId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }

        let collected = self.room.collect_item(item)?;
        if let ItemEffect::Currency { currency, amount } = collected.effect {
            self.credit(currency, amount, out_events);
        }
        out_events.push(Event::ItemCollected {
            item,
            key: collected.key,
        });
        Ok(())
    }

    /// Collects every drop lying on the floor of the room.
    pub fn collect_drops(&mut self, out_events: &mut Vec<Event>) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }

        let loot = self.room.take_floor_loot();
        if loot.is_empty() {
            return Ok(());
        }

        self.credit_purse(&loot.currency, out_events);
        for entry in loot.specials {
            match entry.kind {
                RewardKind::WeaponCard(card) => {
                    if self.services.cards.unlock(&card) {
                        info!(card = %card, "weapon card unlocked");
                        out_events.push(Event::CardUnlocked { card });
                    }
                }
                RewardKind::Currency(currency) => self.credit(currency, entry.amount, out_events),
            }
        }
        self.services.presentation.play_cue(Cue::DropsCollected);
        Ok(())
    }

    /// Records the character's position and refreshes proximity membership.
    pub fn move_character(&mut self, position: Vec3, out_events: &mut Vec<Event>) {
        self.character = position;
        self.sync_proximity(out_events);
    }

    /// Records an enemy's position. Proximity follows on the next tick.
    pub fn move_enemy(&mut self, enemy: EnemyId, position: Vec3) -> Result<(), SessionError> {
        if !self.is_level_loaded {
            return Err(SessionError::NoLevelLoaded);
        }
        self.room.move_enemy(enemy, position)?;
        Ok(())
    }

    /// Advances timers, resolves a pending navigation gate and refreshes proximity.
    pub fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) -> Result<(), SessionError> {
        out_events.push(Event::TimeAdvanced { dt });

        let mut fired = std::mem::take(&mut self.fired);
        self.timers.advance(dt, &mut fired);
        let outcome = fired
            .drain(..)
            .try_for_each(|action| self.run_scheduled(action, out_events));
        self.fired = fired;
        outcome?;

        self.resolve_navigation(out_events);

        if self.is_level_loaded && self.is_gameplay_active {
            let view = query::enemy_view(&self.room);
            let mut listener =
                |nearest: Option<EnemyId>| out_events.push(Event::NearestEnemyChanged { nearest });
            self.tracker
                .sync_volume(self.character, &view, &mut listener);
            self.tracker
                .tick(dt, self.character, &view, &mut listener);
        }
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Level the session resolved or loaded.
    #[must_use]
    pub fn level(&self) -> LevelKey {
        self.level
    }

    /// Zero-based index of the current room.
    #[must_use]
    pub fn room_index(&self) -> u32 {
        self.room_index
    }

    /// Number of rooms of the loaded level.
    #[must_use]
    pub fn room_count(&self) -> u32 {
        self.room_count
    }

    /// Reports whether a level is loaded.
    #[must_use]
    pub fn is_level_loaded(&self) -> bool {
        self.is_level_loaded
    }

    /// Reports whether gameplay is running.
    #[must_use]
    pub fn is_gameplay_active(&self) -> bool {
        self.is_gameplay_active
    }

    /// Reports whether the player entered the current room's exit.
    #[must_use]
    pub fn is_exit_entered(&self) -> bool {
        self.is_exit_entered
    }

    /// Reports whether player input is accepted.
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Reports whether the character may move.
    #[must_use]
    pub fn movement_enabled(&self) -> bool {
        self.movement_enabled
    }

    /// Reports whether a revive invulnerability window is running.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability.is_some()
    }

    /// Last known character position.
    #[must_use]
    pub fn character_position(&self) -> Vec3 {
        self.character
    }

    /// Enemy the character currently aims at.
    #[must_use]
    pub fn nearest_enemy(&self) -> Option<EnemyId> {
        self.tracker.nearest()
    }

    /// Coins credited since the level was loaded.
    #[must_use]
    pub fn coins_earned(&self) -> u32 {
        self.coins_earned
    }

    /// State of the active room.
    #[must_use]
    pub fn room(&self) -> &RoomState {
        &self.room
    }

    /// Reward shares computed for the loaded level.
    #[must_use]
    pub fn reward_plan(&self) -> &RewardPlan {
        &self.plan
    }

    /// Configuration the session runs with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn enter_room(
        &mut self,
        world: &WorldDefinition,
        definition: &LevelDefinition,
        index: u32,
    ) -> Result<(), SessionError> {
        let room = usize::try_from(index)
            .ok()
            .and_then(|slot| definition.rooms.get(slot))
            .ok_or(SessionError::EmptyLevel(self.level))?;

        if self.room.is_loaded() {
            self.room.unload();
        }
        self.tracker.reload();
        self.room
            .load(room, world, definition.metadata.enemy_level)?;

        match usize::try_from(index).ok().and_then(|slot| self.plan.room(slot)) {
            Some(reward) => self.room.init_drop(reward),
            None => warn!(room = index, "no reward share planned for room"),
        }

        self.room_index = index;
        self.character = self.room.spawn_point().position;
        self.services.presentation.room_reached(index, self.room_count);
        debug!(room = index, "room entered");
        Ok(())
    }

    fn complete_transition(&mut self, out_events: &mut Vec<Event>) -> Result<(), SessionError> {
        if self.transition.take().is_none() {
            return Ok(());
        }

        let catalog = Arc::clone(&self.catalog);
        let (world, definition) = resolve(&catalog, self.level)?;
        self.enter_room(world, definition, self.room_index)?;

        self.is_exit_entered = false;
        self.input_enabled = true;
        self.state = SessionState::RoomActive;

        let level = self.level;
        let room = self.room_index;
        info!(room, "room started");
        self.services
            .presentation
            .fade(Fade::In, self.config.transition_fade());
        self.notify(|hook| hook.on_room_entered(level, room));
        out_events.push(Event::RoomStarted { room });
        self.request_activation(out_events);
        Ok(())
    }

    fn finalize_level(&mut self, definition: &LevelDefinition, out_events: &mut Vec<Event>) {
        self.state = SessionState::LevelComplete;
        self.is_gameplay_active = false;
        self.movement_enabled = false;

        let level = self.level;
        let xp = definition.metadata.xp;
        let coins = self.coins_earned;
        self.services.economy.add_experience(xp);

        let next = self.catalog.next_level(level).unwrap_or(level);
        let record = SaveRecord {
            world_index: next.world(),
            level_index: next.level(),
            last_completed_level_coin_balance: coins,
        };
        if let Err(error) = self.services.save.store(&record) {
            warn!(%error, "could not persist session record");
        }

        info!(?level, xp, coins, ?next, "level completed");
        self.services.presentation.play_cue(Cue::LevelCompleted);
        self.notify(|hook| hook.on_level_completed(level));
        out_events.push(Event::LevelCompleted { level, xp, coins });
    }

    fn run_scheduled(
        &mut self,
        action: Scheduled,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        match action {
            Scheduled::CompleteTransition => self.complete_transition(out_events),
            Scheduled::EndInvulnerability => {
                if self.invulnerability.take().is_some() {
                    debug!("invulnerability window elapsed");
                    out_events.push(Event::InvulnerabilityEnded);
                }
                Ok(())
            }
        }
    }

    fn request_activation(&mut self, out_events: &mut Vec<Event>) {
        self.awaiting_navigation = true;
        self.resolve_navigation(out_events);
    }

    fn resolve_navigation(&mut self, out_events: &mut Vec<Event>) {
        if !self.awaiting_navigation || !self.is_gameplay_active {
            return;
        }
        if !self.services.navigation.is_ready() {
            debug!("waiting for navigation");
            return;
        }

        self.awaiting_navigation = false;
        self.movement_enabled = true;

        let count = self.room.activate_enemies();
        out_events.push(Event::EnemiesActivated { count });

        let view = query::enemy_view(&self.room);
        let mut listener =
            |nearest: Option<EnemyId>| out_events.push(Event::NearestEnemyChanged { nearest });
        for enemy in self.room.alive_enemies() {
            let _ = self
                .tracker
                .try_add_closest_enemy(enemy, self.character, &view, &mut listener);
        }

        if !self.level_started {
            self.level_started = true;
            let level = self.level;
            info!(?level, "level started");
            self.notify(|hook| hook.on_level_started(level));
            out_events.push(Event::LevelStarted);
        }

        if !self.manual_exit {
            let _ = self.try_open_exit(out_events);
        }
    }

    fn try_open_exit(&mut self, out_events: &mut Vec<Event>) -> bool {
        if !self.room.all_enemies_dead() || !self.room.open_exits() {
            return false;
        }

        let room = self.room_index;
        info!(room, "exit opened");
        self.services.presentation.play_cue(Cue::ExitOpened);
        out_events.push(Event::ExitOpened { room });
        self.roll_heal_spawn(out_events);
        true
    }

    fn roll_heal_spawn(&mut self, out_events: &mut Vec<Event>) {
        let catalog = Arc::clone(&self.catalog);
        let Ok((world, definition)) = resolve(&catalog, self.level) else {
            return;
        };

        let probability = definition.metadata.heal_spawn_probability;
        if probability <= 0.0 {
            return;
        }
        let Some(key) = world.heal_item.as_deref() else {
            debug!(world = %world.name, "world has no heal item");
            return;
        };
        let Some(position) = self.room.exit_position() else {
            return;
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.heal_seed());
        let roll: f32 = rng.gen();
        if roll >= probability {
            debug!(roll, probability, "heal roll failed");
            return;
        }

        if let Some(item) = self.room.spawn_item_at(key, position, world) {
            info!(?item, "heal item spawned at exit");
            out_events.push(Event::HealSpawned { item });
        }
    }

    fn heal_seed(&self) -> u64 {
        self.config.heal_seed
            ^ (u64::from(self.level.world()) << 40)
            ^ (u64::from(self.level.level()) << 20)
            ^ u64::from(self.room_index)
    }

    fn sync_proximity(&mut self, out_events: &mut Vec<Event>) {
        if !self.is_level_loaded || !self.is_gameplay_active {
            return;
        }

        let view = query::enemy_view(&self.room);
        let mut listener =
            |nearest: Option<EnemyId>| out_events.push(Event::NearestEnemyChanged { nearest });
        self.tracker
            .sync_volume(self.character, &view, &mut listener);
    }

    fn credit_purse(&mut self, purse: &Purse, out_events: &mut Vec<Event>) {
        for (currency, amount) in purse.iter() {
            self.credit(currency, amount, out_events);
        }
    }

    fn credit(&mut self, currency: Currency, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }

        self.services.economy.add(currency, amount);
        if currency == Currency::Coins {
            self.coins_earned = self.coins_earned.saturating_add(amount);
            let total = self.services.economy.get(Currency::Coins);
            self.services.presentation.coins_changed(total);
        }
        out_events.push(Event::CurrencyCollected { currency, amount });
    }

    fn cancel_timers(&mut self) {
        self.timers.clear();
        self.transition = None;
        self.invulnerability = None;
    }

    fn notify(&mut self, mut call: impl FnMut(&mut dyn LevelHook)) {
        for hook in &mut self.services.hooks {
            call(hook.as_mut());
        }
    }
}

fn resolve(
    catalog: &LevelCatalog,
    level: LevelKey,
) -> Result<(&WorldDefinition, &LevelDefinition), SessionError> {
    let world = catalog
        .world(level.world())
        .ok_or(SessionError::UnknownLevel(level))?;
    let definition = catalog
        .level(level)
        .ok_or(SessionError::UnknownLevel(level))?;
    Ok((world, definition))
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
