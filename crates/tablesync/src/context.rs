//! Shared server state passed to every task.

use std::sync::Arc;

use tablesync_cards::CardKeyStore;
use tablesync_protocol::JsonCodec;
use tablesync_room::{RoomConfig, RoomRegistry};
use tablesync_session::{SessionConfig, SessionManager};
use tokio::sync::Mutex;

use crate::stores::{HandHistoryStore, RatingStore};

/// Everything the controller, socket tasks, and watchdogs share.
///
/// Wrapped in `Arc` by the server so it can be cheaply cloned across tasks.
/// Each store sits behind its own `Mutex`; tasks take at most one lock at a
/// time and never hold a lock across an await on another one, so no lock
/// ordering is needed.
///
/// `sessions` is separately `Arc`ed because watchdog tasks hold a handle to
/// it directly.
pub struct SyncContext {
    pub rooms: Mutex<RoomRegistry>,
    pub sessions: Arc<Mutex<SessionManager>>,
    pub keys: Mutex<CardKeyStore>,
    pub history: Mutex<HandHistoryStore>,
    pub ratings: Mutex<RatingStore>,
    pub codec: JsonCodec,
    pub session_config: SessionConfig,
}

impl SyncContext {
    pub fn new(room_config: RoomConfig, session_config: SessionConfig) -> Self {
        Self {
            rooms: Mutex::new(RoomRegistry::new(room_config)),
            sessions: Arc::new(Mutex::new(SessionManager::new())),
            keys: Mutex::new(CardKeyStore::new()),
            history: Mutex::new(HandHistoryStore::default()),
            ratings: Mutex::new(RatingStore::default()),
            codec: JsonCodec,
            session_config,
        }
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new(RoomConfig::default(), SessionConfig::default())
    }
}
