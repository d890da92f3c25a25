//! Error types for the session layer.

use crate::SessionId;

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session is registered under this id.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session's outbound channel is closed; the socket task is gone.
    #[error("session {0} outbound channel closed")]
    ChannelClosed(SessionId),
}
