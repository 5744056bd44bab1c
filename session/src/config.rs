//! Tuning values of a level session, authored in TOML.

use std::{fs, path::Path, time::Duration};

use room_crawler_system_proximity::{DEFAULT_RADIUS, DEFAULT_RECOMPUTE_DELAY};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session tuning. Every field falls back to its default when omitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Detection radius of the player's proximity tracker.
    pub proximity_radius: f32,
    /// Seconds between throttled nearest-enemy recomputations.
    pub proximity_recompute_secs: f32,
    /// Seconds the fade between two rooms lasts.
    pub transition_fade_secs: f32,
    /// Seconds of invulnerability granted by a revive.
    pub revive_invulnerability_secs: f32,
    /// Seed mixed into the heal-spawn roll of every room.
    pub heal_seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            proximity_radius: DEFAULT_RADIUS,
            proximity_recompute_secs: DEFAULT_RECOMPUTE_DELAY.as_secs_f32(),
            transition_fade_secs: 0.5,
            revive_invulnerability_secs: 3.0,
            heal_seed: 0,
        }
    }
}

impl SessionConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Throttle delay of the proximity tracker.
    #[must_use]
    pub fn proximity_recompute_delay(&self) -> Duration {
        seconds(self.proximity_recompute_secs)
    }

    /// Duration of the fade between rooms.
    #[must_use]
    pub fn transition_fade(&self) -> Duration {
        seconds(self.transition_fade_secs)
    }

    /// Duration of the revive invulnerability window.
    #[must_use]
    pub fn revive_invulnerability(&self) -> Duration {
        seconds(self.revive_invulnerability_secs)
    }
}

/// Negative, non-finite, or overflowing values collapse to zero.
fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}

/// Errors raised while reading a session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("could not read config `{path}`")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid TOML for [`SessionConfig`].
    #[error("could not parse config")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_use_defaults() {
        let config = SessionConfig::from_toml_str("heal_seed = 42\n").expect("valid toml");
        assert_eq!(config.heal_seed, 42);
        assert_eq!(config.proximity_radius, DEFAULT_RADIUS);
        assert_eq!(config.proximity_recompute_delay(), DEFAULT_RECOMPUTE_DELAY);
    }

    #[test]
    fn negative_durations_collapse_to_zero() {
        let config = SessionConfig {
            transition_fade_secs: -1.0,
            revive_invulnerability_secs: f32::NAN,
            ..SessionConfig::default()
        };
        assert_eq!(config.transition_fade(), Duration::ZERO);
        assert_eq!(config.revive_invulnerability(), Duration::ZERO);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(SessionConfig::from_toml_str("proximity_radius = \"far\"").is_err());
    }
}
