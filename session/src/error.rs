use room_crawler_core::LevelKey;
use room_crawler_world::RoomStateError;
use thiserror::Error;

/// Reasons a session operation may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The catalog holds no level for the key.
    #[error("level {0:?} is not in the catalog")]
    UnknownLevel(LevelKey),
    /// The level declares no rooms.
    #[error("level {0:?} declares no rooms")]
    EmptyLevel(LevelKey),
    /// The operation needs a loaded level.
    #[error("no level is loaded")]
    NoLevelLoaded,
    /// The room state rejected the operation.
    #[error(transparent)]
    Room(#[from] RoomStateError),
}
