//! Persisted session record and its single-line text codec.
//!
//! Records are written as `session:v1:<payload>` where the payload is the
//! base64 encoding of the record's JSON form.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use room_crawler_core::LevelKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::SaveStore;

const RECORD_DOMAIN: &str = "session";
const RECORD_VERSION: &str = "v1";
/// Identifier prefix emitted before the encoded record payload.
pub const RECORD_HEADER: &str = "session:v1";
const FIELD_DELIMITER: char = ':';

/// Progress persisted between sessions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    /// World of the level the next session loads.
    pub world_index: u32,
    /// Level the next session loads, inside `world_index`.
    pub level_index: u32,
    /// Coins earned while playing the most recently completed level.
    pub last_completed_level_coin_balance: u32,
}

impl SaveRecord {
    /// Key of the level the record points at.
    #[must_use]
    pub const fn level(&self) -> LevelKey {
        LevelKey::new(self.world_index, self.level_index)
    }

    /// Encodes the record into a single line.
    pub fn encode(&self) -> Result<String, SaveRecordError> {
        let json = serde_json::to_vec(self).map_err(SaveRecordError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{RECORD_HEADER}{FIELD_DELIMITER}{encoded}"))
    }

    /// Decodes a record from its single-line form.
    pub fn decode(value: &str) -> Result<Self, SaveRecordError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SaveRecordError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(SaveRecordError::MissingPrefix)?;
        let version = parts.next().ok_or(SaveRecordError::MissingVersion)?;
        let payload = parts.next().ok_or(SaveRecordError::MissingPayload)?;
        if let Some(extra) = parts.next() {
            return Err(SaveRecordError::UnexpectedSegment(extra.to_owned()));
        }

        if domain != RECORD_DOMAIN {
            return Err(SaveRecordError::InvalidPrefix(domain.to_owned()));
        }
        if version != RECORD_VERSION {
            return Err(SaveRecordError::UnsupportedVersion(version.to_owned()));
        }

        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(SaveRecordError::InvalidEncoding)?;
        serde_json::from_slice(&bytes).map_err(SaveRecordError::InvalidPayload)
    }
}

/// Errors raised while reading or writing session records.
#[derive(Debug, Error)]
pub enum SaveRecordError {
    /// The provided string was empty or contained only whitespace.
    #[error("session record was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("session record is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("session record is missing the version")]
    MissingVersion,
    /// The payload segment was missing.
    #[error("session record is missing the payload")]
    MissingPayload,
    /// The record carried a segment after the payload.
    #[error("session record has an unexpected trailing segment '{0}'")]
    UnexpectedSegment(String),
    /// The record used an unexpected prefix.
    #[error("session record prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The record used an unsupported version.
    #[error("session record version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode session record payload")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The decoded payload could not be (de)serialised.
    #[error("could not parse session record payload")]
    InvalidPayload(#[source] serde_json::Error),
    /// The backing file could not be read or written.
    #[error("could not access session record `{path}`")]
    Io {
        /// Path of the backing file.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Save store backed by a single text file.
#[derive(Clone, Debug)]
pub struct FileSaveStore {
    path: PathBuf,
}

impl FileSaveStore {
    /// Creates a store that reads and writes `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SaveRecordError {
        SaveRecordError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SaveStore for FileSaveStore {
    fn load(&self) -> Result<Option<SaveRecord>, SaveRecordError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => SaveRecord::decode(&text).map(Some),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(self.io_error(error)),
        }
    }

    fn store(&mut self, record: &SaveRecord) -> Result<(), SaveRecordError> {
        let line = record.encode()?;
        fs::write(&self.path, format!("{line}\n")).map_err(|error| self.io_error(error))
    }
}
