//! Connection sessions: one per live websocket, with a per-session
//! liveness watchdog.
//!
//! A session is the server's record of one connected socket. It knows which
//! room the socket is attached to, which player (if any) it has bound, when
//! it last showed signs of life, and how to push events back down the wire.
//! The watchdog probes each session on an interval and disconnects sockets
//! that go quiet past the liveness timeout.

mod error;
mod manager;
mod session;
mod watchdog;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionId, SessionOutbound};
pub use watchdog::run_watchdog;
