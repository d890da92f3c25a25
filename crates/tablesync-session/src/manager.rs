//! The session manager: tracks every live connection.
//!
//! # Concurrency note
//!
//! `SessionManager` is not thread-safe by itself — it uses plain `HashMap`s.
//! The server wraps one instance in `Arc<tokio::sync::Mutex<_>>` and every
//! task (socket loops, watchdogs, the controller) takes the lock for short,
//! non-awaiting critical sections.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tablesync_protocol::{PlayerId, RoomId, ServerEvent};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::{Session, SessionError, SessionId, SessionOutbound};

/// Registry of live sessions, with a room index for broadcasting.
#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    /// Which sessions belong to which room. Kept in sync with `sessions`.
    rooms: HashMap<RoomId, HashSet<SessionId>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh session attached to `room_id` and returns its id.
    pub fn register(
        &mut self,
        room_id: RoomId,
        outbound: UnboundedSender<SessionOutbound>,
    ) -> SessionId {
        let id = SessionId::next();
        let session = Session::new(id, room_id.clone(), outbound);
        self.sessions.insert(id, session);
        self.rooms.entry(room_id.clone()).or_default().insert(id);
        tracing::info!(session_id = %id, room_id = %room_id, "session registered");
        id
    }

    /// Attaches the watchdog task handle so deregistration can abort it.
    pub fn set_watchdog(&mut self, id: SessionId, handle: JoinHandle<()>) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.watchdog = Some(handle);
        } else {
            // Session vanished between spawn and attach; don't leak the task.
            handle.abort();
        }
    }

    /// Removes a session, aborts its watchdog, and returns the record so
    /// the caller can settle any room state the connection leaves behind.
    pub fn deregister(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        if let Some(members) = self.rooms.get_mut(&session.room_id) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(&session.room_id);
            }
        }
        if let Some(watchdog) = &session.watchdog {
            watchdog.abort();
        }
        tracing::info!(session_id = %id, room_id = %session.room_id, "session deregistered");
        Some(session)
    }

    /// Records inbound activity and returns the gap since the previous
    /// sign of life. `None` for an unknown session.
    pub fn touch(&mut self, id: SessionId) -> Option<Duration> {
        let session = self.sessions.get_mut(&id)?;
        let gap = session.last_seen.elapsed();
        session.last_seen = Instant::now();
        Some(gap)
    }

    /// How long the session has been silent. `None` for an unknown session.
    pub fn idle_for(&self, id: SessionId) -> Option<Duration> {
        self.sessions.get(&id).map(|s| s.last_seen.elapsed())
    }

    /// Binds a player identity to the session (the join path).
    pub fn bind_player(
        &mut self,
        id: SessionId,
        player_id: PlayerId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        session.player_id = Some(player_id);
        Ok(())
    }

    /// The player bound to this session, if it has joined.
    pub fn player_of(&self, id: SessionId) -> Option<PlayerId> {
        self.sessions.get(&id)?.player_id.clone()
    }

    /// The room this session is attached to.
    pub fn room_of(&self, id: SessionId) -> Option<RoomId> {
        self.sessions.get(&id).map(|s| s.room_id.clone())
    }

    /// Pushes one event to one session.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] — unknown session
    /// - [`SessionError::ChannelClosed`] — the socket task already exited
    pub fn send_to(
        &self,
        id: SessionId,
        event: ServerEvent,
    ) -> Result<(), SessionError> {
        let session = self.sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        session
            .outbound
            .send(SessionOutbound::Event(event))
            .map_err(|_| SessionError::ChannelClosed(id))
    }

    /// Tells the socket task to close the connection.
    pub fn close(&self, id: SessionId) -> Result<(), SessionError> {
        let session = self.sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        session
            .outbound
            .send(SessionOutbound::Close)
            .map_err(|_| SessionError::ChannelClosed(id))
    }

    /// Pushes one event to every session in a room, best effort.
    ///
    /// Sessions whose socket task has already exited are skipped; returns
    /// how many sessions the event reached.
    pub fn broadcast(&self, room_id: &RoomId, event: &ServerEvent) -> usize {
        let Some(members) = self.rooms.get(room_id) else {
            return 0;
        };
        let mut delivered = 0;
        for id in members {
            if let Some(session) = self.sessions.get(id) {
                if session
                    .outbound
                    .send(SessionOutbound::Event(event.clone()))
                    .is_ok()
                {
                    delivered += 1;
                }
            }
        }
        tracing::trace!(room_id = %room_id, delivered, "broadcast");
        delivered
    }

    /// Sessions currently attached to a room.
    pub fn sessions_in(&self, room_id: &RoomId) -> Vec<SessionId> {
        self.rooms
            .get(room_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
