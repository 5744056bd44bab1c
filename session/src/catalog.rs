//! Loading and validation of the authored level catalog.

use std::{fs, path::Path};

use room_crawler_core::{LevelCatalog, LevelKey};
use thiserror::Error;

/// Errors raised while reading a level catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("could not read catalog `{path}`")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The catalog text is not valid TOML for a [`LevelCatalog`].
    #[error("could not parse catalog")]
    Parse(#[from] toml::de::Error),
    /// The catalog declares no worlds.
    #[error("catalog declares no worlds")]
    Empty,
    /// A level declares no rooms.
    #[error("level {0:?} declares no rooms")]
    EmptyLevel(LevelKey),
}

/// Parses and validates a catalog from TOML text.
pub fn parse_catalog(text: &str) -> Result<LevelCatalog, CatalogError> {
    let catalog: LevelCatalog = toml::from_str(text)?;
    validate(&catalog)?;
    Ok(catalog)
}

/// Reads, parses, and validates the catalog file at `path`.
pub fn load_catalog(path: &Path) -> Result<LevelCatalog, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_catalog(&text)
}

fn validate(catalog: &LevelCatalog) -> Result<(), CatalogError> {
    if catalog.worlds.is_empty() {
        return Err(CatalogError::Empty);
    }

    for (world_index, world) in catalog.worlds.iter().enumerate() {
        for (level_index, level) in world.levels.iter().enumerate() {
            if level.rooms.is_empty() {
                return Err(CatalogError::EmptyLevel(LevelKey::new(
                    index(world_index),
                    index(level_index),
                )));
            }
        }
    }
    Ok(())
}

fn index(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
