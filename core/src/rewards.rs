//! Reward manifest entries and the containers that carry shares of them.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Soft and hard currencies tracked by the economy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// Soft currency earned from enemies and chests.
    Coins,
    /// Hard currency.
    Gems,
}

impl Currency {
    /// Stable lowercase name used in authored data.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Gems => "gems",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = RewardEntryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "coins" => Ok(Self::Coins),
            "gems" => Ok(Self::Gems),
            other => Err(RewardEntryError::UnknownCurrency(other.to_owned())),
        }
    }
}

/// What a manifest entry grants.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RewardKind {
    /// An amount of currency, split across rooms and chests.
    Currency(Currency),
    /// A weapon card unlock, granted whole to a single carrier.
    WeaponCard(String),
}

/// Single line of a level's reward manifest.
///
/// Authored as `{ kind = "currency" | "weapon_card", payload = "...", amount = N }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AuthoredRewardEntry", into = "AuthoredRewardEntry")]
pub struct RewardEntry {
    /// What the entry grants.
    pub kind: RewardKind,
    /// How much of it.
    pub amount: u32,
}

impl RewardEntry {
    /// Creates a currency entry.
    #[must_use]
    pub const fn currency(currency: Currency, amount: u32) -> Self {
        Self {
            kind: RewardKind::Currency(currency),
            amount,
        }
    }

    /// Creates a weapon card entry.
    #[must_use]
    pub fn weapon_card(card: impl Into<String>, amount: u32) -> Self {
        Self {
            kind: RewardKind::WeaponCard(card.into()),
            amount,
        }
    }
}

/// Errors raised while reading authored reward entries.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RewardEntryError {
    /// The entry kind is not one of the supported kinds.
    #[error("unknown reward kind `{0}`")]
    UnknownKind(String),
    /// A currency entry named an unsupported currency.
    #[error("unknown currency `{0}`")]
    UnknownCurrency(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct AuthoredRewardEntry {
    kind: String,
    payload: String,
    amount: u32,
}

impl TryFrom<AuthoredRewardEntry> for RewardEntry {
    type Error = RewardEntryError;

    fn try_from(authored: AuthoredRewardEntry) -> Result<Self, Self::Error> {
        let kind = match authored.kind.as_str() {
            "currency" => RewardKind::Currency(authored.payload.parse()?),
            "weapon_card" => RewardKind::WeaponCard(authored.payload),
            other => return Err(RewardEntryError::UnknownKind(other.to_owned())),
        };
        Ok(Self {
            kind,
            amount: authored.amount,
        })
    }
}

impl From<RewardEntry> for AuthoredRewardEntry {
    fn from(entry: RewardEntry) -> Self {
        let (kind, payload) = match entry.kind {
            RewardKind::Currency(currency) => ("currency", currency.as_str().to_owned()),
            RewardKind::WeaponCard(card) => ("weapon_card", card),
        };
        Self {
            kind: kind.to_owned(),
            payload,
            amount: entry.amount,
        }
    }
}

/// Per-currency amounts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Purse {
    amounts: BTreeMap<Currency, u32>,
}

impl Purse {
    /// Creates an empty purse.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` of `currency`, saturating at `u32::MAX`.
    pub fn add(&mut self, currency: Currency, amount: u32) {
        if amount == 0 {
            return;
        }
        let slot = self.amounts.entry(currency).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    /// Removes `amount` of `currency`. Returns `false` and changes nothing
    /// when less than `amount` is held.
    pub fn subtract(&mut self, currency: Currency, amount: u32) -> bool {
        let held = self.get(currency);
        if held < amount {
            return false;
        }
        if held == amount {
            let _ = self.amounts.remove(&currency);
        } else {
            let _ = self.amounts.insert(currency, held - amount);
        }
        true
    }

    /// Amount of `currency` held.
    #[must_use]
    pub fn get(&self, currency: Currency) -> u32 {
        self.amounts.get(&currency).copied().unwrap_or(0)
    }

    /// Adds every amount held by `other`.
    pub fn merge(&mut self, other: &Purse) {
        for (currency, amount) in other.iter() {
            self.add(currency, amount);
        }
    }

    /// Iterates over non-zero amounts in currency order.
    pub fn iter(&self) -> impl Iterator<Item = (Currency, u32)> + '_ {
        self.amounts
            .iter()
            .map(|(currency, amount)| (*currency, *amount))
    }

    /// Reports whether the purse holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Empties the purse.
    pub fn clear(&mut self) {
        self.amounts.clear();
    }
}

/// Loot carried by an enemy and released when it dies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Loot {
    /// Currency share carried by the enemy.
    pub currency: Purse,
    /// Non-currency entries carried whole.
    pub specials: Vec<RewardEntry>,
}

impl Loot {
    /// Reports whether the loot carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currency.is_empty() && self.specials.is_empty()
    }

    /// Moves everything carried by `other` into this loot.
    pub fn absorb(&mut self, other: Loot) {
        self.currency.merge(&other.currency);
        self.specials.extend(other.specials);
    }
}

/// Share of a level's rewards assigned to a single room.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoomReward {
    /// Currency share split across the room's enemies.
    pub currency: Purse,
    /// Non-currency entries routed to the room's special reward carrier.
    pub specials: Vec<RewardEntry>,
    /// Currency share of each chest, in the room's chest order.
    pub chests: Vec<Purse>,
}
