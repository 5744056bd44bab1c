//! Collaborators the session drives but does not own.
//!
//! Every collaborator is a trait so adapters can plug in their engine's
//! implementation. The in-memory implementations share their state between
//! clones, which lets a caller keep a handle while the session owns a boxed
//! copy.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    rc::Rc,
    time::Duration,
};

use room_crawler_core::{Currency, LevelKey, Purse};
use tracing::debug;

use crate::save::{SaveRecord, SaveRecordError};

/// Signals whether walkable-surface data is built for the current level.
pub trait NavigationReadiness {
    /// Reports whether agents may path on the current level.
    fn is_ready(&self) -> bool;
}

/// Reads and writes the persisted session record.
pub trait SaveStore {
    /// Loads the stored record, or `None` when nothing was stored yet.
    fn load(&self) -> Result<Option<SaveRecord>, SaveRecordError>;

    /// Replaces the stored record.
    fn store(&mut self, record: &SaveRecord) -> Result<(), SaveRecordError>;
}

/// Player balances.
pub trait Economy {
    /// Credits `amount` of `currency`.
    fn add(&mut self, currency: Currency, amount: u32);

    /// Debits `amount` of `currency`. Returns `false` and changes nothing when
    /// the balance is insufficient.
    fn subtract(&mut self, currency: Currency, amount: u32) -> bool;

    /// Current balance of `currency`.
    fn get(&self, currency: Currency) -> u32;

    /// Reports whether at least `amount` of `currency` is available.
    fn has_amount(&self, currency: Currency, amount: u32) -> bool {
        self.get(currency) >= amount
    }

    /// Credits experience points.
    fn add_experience(&mut self, amount: u32);
}

/// Weapon cards the player owns.
pub trait CardCollection {
    /// Reports whether `card` is already unlocked.
    fn is_unlocked(&self, card: &str) -> bool;

    /// Unlocks `card`. Returns `false` if it was already unlocked.
    fn unlock(&mut self, card: &str) -> bool;
}

/// Level-specific behaviour notified of lifecycle transitions.
///
/// Hooks are called in registration order. Every method defaults to doing
/// nothing.
pub trait LevelHook {
    /// The session resolved the level it will load.
    fn on_level_initialised(&mut self, _level: LevelKey) {}
    /// The level and its first room were loaded.
    fn on_level_loaded(&mut self, _level: LevelKey) {}
    /// The level was torn down.
    fn on_level_unloaded(&mut self, _level: LevelKey) {}
    /// Gameplay started for the level.
    fn on_level_started(&mut self, _level: LevelKey) {}
    /// The player character died.
    fn on_level_failed(&mut self, _level: LevelKey) {}
    /// The final room was cleared.
    fn on_level_completed(&mut self, _level: LevelKey) {}
    /// The player entered the room at `room`.
    fn on_room_entered(&mut self, _level: LevelKey, _room: u32) {}
    /// The player left the room at `room` through its exit.
    fn on_room_leaved(&mut self, _level: LevelKey, _room: u32) {}
}

/// Direction of a screen fade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fade {
    /// Fade to black.
    Out,
    /// Fade back from black.
    In,
}

/// Audio cues the session requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// The room's exit opened.
    ExitOpened,
    /// A chest was opened.
    ChestOpened,
    /// Floor drops were picked up.
    DropsCollected,
    /// The level was completed.
    LevelCompleted,
    /// The player character died.
    LevelFailed,
}

/// Fire-and-forget presentation notifications.
pub trait Presentation {
    /// The displayed coin balance changed.
    fn coins_changed(&mut self, total: u32);
    /// The player reached the room at `room` out of `rooms`.
    fn room_reached(&mut self, room: u32, rooms: u32);
    /// A fade of the given duration should start.
    fn fade(&mut self, fade: Fade, duration: Duration);
    /// An audio cue should play.
    fn play_cue(&mut self, cue: Cue);
}

/// Collaborators handed to a session.
pub struct Services {
    /// Navigation readiness gate.
    pub navigation: Box<dyn NavigationReadiness>,
    /// Persistence of the session record.
    pub save: Box<dyn SaveStore>,
    /// Player balances.
    pub economy: Box<dyn Economy>,
    /// Owned weapon cards.
    pub cards: Box<dyn CardCollection>,
    /// Presentation layer.
    pub presentation: Box<dyn Presentation>,
    /// Level hooks, notified in order.
    pub hooks: Vec<Box<dyn LevelHook>>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            navigation: Box::new(NavigationFlag::ready()),
            save: Box::new(MemorySaveStore::default()),
            economy: Box::new(MemoryEconomy::default()),
            cards: Box::new(MemoryCards::default()),
            presentation: Box::new(TracingPresentation),
            hooks: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

/// Navigation gate toggled by the caller.
#[derive(Clone, Debug, Default)]
pub struct NavigationFlag {
    ready: Rc<Cell<bool>>,
}

impl NavigationFlag {
    /// Creates a gate that is already open.
    #[must_use]
    pub fn ready() -> Self {
        let flag = Self::default();
        flag.set_ready(true);
        flag
    }

    /// Creates a gate that stays closed until [`Self::set_ready`] is called.
    #[must_use]
    pub fn pending() -> Self {
        Self::default()
    }

    /// Opens or closes the gate.
    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }
}

impl NavigationReadiness for NavigationFlag {
    fn is_ready(&self) -> bool {
        self.ready.get()
    }
}

/// Save store held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySaveStore {
    record: Rc<RefCell<Option<SaveRecord>>>,
}

impl MemorySaveStore {
    /// Creates a store that already holds `record`.
    #[must_use]
    pub fn with_record(record: SaveRecord) -> Self {
        Self {
            record: Rc::new(RefCell::new(Some(record))),
        }
    }

    /// Record currently stored.
    #[must_use]
    pub fn record(&self) -> Option<SaveRecord> {
        *self.record.borrow()
    }
}

impl SaveStore for MemorySaveStore {
    fn load(&self) -> Result<Option<SaveRecord>, SaveRecordError> {
        Ok(*self.record.borrow())
    }

    fn store(&mut self, record: &SaveRecord) -> Result<(), SaveRecordError> {
        *self.record.borrow_mut() = Some(*record);
        Ok(())
    }
}

/// Economy held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryEconomy {
    balances: Rc<RefCell<Purse>>,
    experience: Rc<Cell<u32>>,
}

impl MemoryEconomy {
    /// Experience credited so far.
    #[must_use]
    pub fn experience(&self) -> u32 {
        self.experience.get()
    }
}

impl Economy for MemoryEconomy {
    fn add(&mut self, currency: Currency, amount: u32) {
        self.balances.borrow_mut().add(currency, amount);
    }

    fn subtract(&mut self, currency: Currency, amount: u32) -> bool {
        self.balances.borrow_mut().subtract(currency, amount)
    }

    fn get(&self, currency: Currency) -> u32 {
        self.balances.borrow().get(currency)
    }

    fn add_experience(&mut self, amount: u32) {
        self.experience
            .set(self.experience.get().saturating_add(amount));
    }
}

/// Card collection held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryCards {
    unlocked: Rc<RefCell<BTreeSet<String>>>,
}

impl MemoryCards {
    /// Creates a collection that already owns `cards`.
    #[must_use]
    pub fn with_cards<I, S>(cards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unlocked: Rc::new(RefCell::new(cards.into_iter().map(Into::into).collect())),
        }
    }

    /// Cards owned, in key order.
    #[must_use]
    pub fn cards(&self) -> Vec<String> {
        self.unlocked.borrow().iter().cloned().collect()
    }
}

impl CardCollection for MemoryCards {
    fn is_unlocked(&self, card: &str) -> bool {
        self.unlocked.borrow().contains(card)
    }

    fn unlock(&mut self, card: &str) -> bool {
        self.unlocked.borrow_mut().insert(card.to_owned())
    }
}

/// Presentation that only logs what it is asked to show.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingPresentation;

impl Presentation for TracingPresentation {
    fn coins_changed(&mut self, total: u32) {
        debug!(total, "coin counter updated");
    }

    fn room_reached(&mut self, room: u32, rooms: u32) {
        debug!(room, rooms, "room indicator updated");
    }

    fn fade(&mut self, fade: Fade, duration: Duration) {
        debug!(?fade, ?duration, "fade requested");
    }

    fn play_cue(&mut self, cue: Cue) {
        debug!(?cue, "audio cue requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn economy_refuses_overdraft() {
        let mut economy = MemoryEconomy::default();
        economy.add(Currency::Coins, 10);

        assert!(!economy.subtract(Currency::Coins, 11));
        assert!(economy.subtract(Currency::Coins, 4));
        assert_eq!(economy.get(Currency::Coins), 6);
        assert!(economy.has_amount(Currency::Coins, 6));
        assert!(!economy.has_amount(Currency::Gems, 1));
    }

    #[test]
    fn clones_share_state() {
        let cards = MemoryCards::default();
        let mut owned = cards.clone();
        assert!(owned.unlock("frost_bow"));
        assert!(!owned.unlock("frost_bow"));
        assert!(cards.is_unlocked("frost_bow"));
    }

    #[test]
    fn navigation_flag_toggles() {
        let flag = NavigationFlag::pending();
        let gate = flag.clone();
        assert!(!gate.is_ready());
        flag.set_ready(true);
        assert!(gate.is_ready());
    }
}
