//! Unified error type for the tablesync server.

use tablesync_cards::CardError;
use tablesync_protocol::ProtocolError;
use tablesync_room::RoomError;
use tablesync_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Encode/decode failure at the wire boundary.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Room-level failure (missing, full, duplicate).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Session-level failure (unknown session, dead channel).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Card sealing or opening failure.
    #[error(transparent)]
    Card(#[from] CardError),

    /// Listener or socket I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Websocket handshake or framing failure.
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
