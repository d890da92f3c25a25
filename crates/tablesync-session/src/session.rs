//! Session types: the per-connection record and its configuration.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tablesync_protocol::{PlayerId, RoomId, ServerEvent};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Process-unique id for one websocket connection.
///
/// Distinct from [`PlayerId`]: a player who drops and reconnects gets a new
/// session id but keeps their player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

impl SessionId {
    /// Hands out the next id from a process-wide counter.
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionOutbound
// ---------------------------------------------------------------------------

/// What the server can push down a session's outbound channel.
///
/// The socket task owns the websocket writer; everything else reaches the
/// wire through this channel.
#[derive(Debug)]
pub enum SessionOutbound {
    /// Serialize and send this event.
    Event(ServerEvent),

    /// Close the websocket and end the socket task.
    Close,
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Liveness tuning for the per-session watchdog.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often the watchdog probes a session.
    pub probe_interval: Duration,

    /// How long a session may stay silent before it is disconnected.
    pub liveness_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(3),
            liveness_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One connected socket.
///
/// Created when the websocket handshake completes; destroyed on disconnect.
/// `player_id` stays `None` for sockets that never send a join.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub room_id: RoomId,
    pub player_id: Option<PlayerId>,
    /// Last time the socket showed signs of life (any inbound frame).
    pub last_seen: Instant,
    pub outbound: UnboundedSender<SessionOutbound>,
    /// Handle to this session's watchdog task, aborted on deregister.
    pub(crate) watchdog: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(
        id: SessionId,
        room_id: RoomId,
        outbound: UnboundedSender<SessionOutbound>,
    ) -> Self {
        Self {
            id,
            room_id,
            player_id: None,
            last_seen: Instant::now(),
            outbound,
            watchdog: None,
        }
    }
}
