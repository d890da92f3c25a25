//! Error types for the room layer.

use tablesync_protocol::RoomId;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A room with this id already exists.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Every player seat is taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),
}
