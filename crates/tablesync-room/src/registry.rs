//! The room registry: creates, tracks, and tears down rooms.
//!
//! All room mutation flows through these operations, driven by the sync
//! controller one event at a time, so no read/write race exists on a single
//! `RoomState`.

use std::collections::HashMap;

use tablesync_protocol::{ActionRecord, HandId, PlayerId, RoomId, RoomPhase};

use crate::{Participant, RoomConfig, RoomError, RoomState};

/// Authoritative store of every live room.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomState>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry with the given per-room defaults.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Creates a room, generating an id when none is given.
    ///
    /// `max_players` of `None` uses the configured default.
    ///
    /// # Errors
    /// Returns [`RoomError::AlreadyExists`] if the id is taken.
    pub fn create_room(
        &mut self,
        id: Option<RoomId>,
        max_players: Option<usize>,
        metadata: HashMap<String, String>,
    ) -> Result<&RoomState, RoomError> {
        let id = id.unwrap_or_else(RoomId::generate);
        if self.rooms.contains_key(&id) {
            return Err(RoomError::AlreadyExists(id));
        }
        let max_players = max_players.unwrap_or(self.config.max_players);
        let room =
            RoomState::new(id.clone(), max_players, metadata, &self.config);
        tracing::info!(room_id = %id, max_players, "room created");
        Ok(self.rooms.entry(id).or_insert(room))
    }

    pub fn get_room(&self, id: &RoomId) -> Option<&RoomState> {
        self.rooms.get(id)
    }

    pub fn get_room_mut(&mut self, id: &RoomId) -> Option<&mut RoomState> {
        self.rooms.get_mut(id)
    }

    pub fn remove_room(&mut self, id: &RoomId) {
        if self.rooms.remove(id).is_some() {
            tracing::info!(room_id = %id, "room removed");
        }
    }

    /// Seats a participant as a player.
    ///
    /// A join with an id that is already seated is the reconnect path: the
    /// existing participant is refreshed in place and capacity is not
    /// re-checked. A fresh join seeds the starting stack, a zero bet, and a
    /// turn-order slot.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] — no such room
    /// - [`RoomError::RoomFull`] — all seats taken
    pub fn join_room(
        &mut self,
        id: &RoomId,
        participant: Participant,
    ) -> Result<&RoomState, RoomError> {
        let room = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| RoomError::NotFound(id.clone()))?;

        let pid = participant.id.clone();
        if let Some(existing) = room.players.get_mut(&pid) {
            existing.display_name = participant.display_name;
            existing.role = participant.role;
            existing.touch();
            tracing::debug!(room_id = %id, player_id = %pid, "player rejoined");
            return Ok(room);
        }

        if room.players.len() >= room.max_players {
            return Err(RoomError::RoomFull(id.clone()));
        }

        room.players.insert(pid.clone(), participant);
        room.stacks
            .entry(pid.clone())
            .or_insert(self.config.starting_stack);
        room.bets.entry(pid.clone()).or_insert(0);
        if !room.turn_order.contains(&pid) {
            room.turn_order.push(pid.clone());
        }
        tracing::info!(
            room_id = %id,
            player_id = %pid,
            players = room.players.len(),
            "player joined"
        );
        Ok(room)
    }

    /// Adds a watching participant without consuming a player seat.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] if no such room exists.
    pub fn add_spectator(
        &mut self,
        id: &RoomId,
        participant: Participant,
    ) -> Result<&RoomState, RoomError> {
        let room = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| RoomError::NotFound(id.clone()))?;
        let pid = participant.id.clone();
        room.spectators.insert(pid.clone(), participant);
        tracing::info!(room_id = %id, player_id = %pid, "spectator joined");
        Ok(room)
    }

    /// Removes a participant from both membership maps, the turn order, and
    /// the folded set. Deletes the room entirely once it is fully empty.
    ///
    /// Returns the surviving room, or `None` if the room was absent or has
    /// just been torn down.
    pub fn leave_room(
        &mut self,
        id: &RoomId,
        participant_id: &PlayerId,
    ) -> Option<&RoomState> {
        let room = self.rooms.get_mut(id)?;
        room.players.remove(participant_id);
        room.spectators.remove(participant_id);
        room.turn_order.retain(|pid| pid != participant_id);
        room.folded.remove(participant_id);
        tracing::info!(
            room_id = %id,
            player_id = %participant_id,
            players = room.players.len(),
            "participant left"
        );

        if room.is_empty() {
            self.remove_room(id);
            return None;
        }
        self.rooms.get(id)
    }

    /// Starts a fresh hand: new hand id, zeroed pot and bets, turn order
    /// rebuilt from current membership, cleared folds and warnings, phase
    /// forced to `playing`.
    pub fn reset_hand(&mut self, id: &RoomId) -> Option<&mut RoomState> {
        let room = self.rooms.get_mut(id)?;
        room.hand_id = HandId::generate();
        room.pot = 0;
        room.bets = room.players.keys().map(|pid| (pid.clone(), 0)).collect();
        // Rebuild the turn order from current membership, preserving seat
        // order for players that were already seated.
        let mut order: Vec<PlayerId> = room
            .turn_order
            .iter()
            .filter(|pid| room.players.contains_key(*pid))
            .cloned()
            .collect();
        for pid in room.players.keys() {
            if !order.contains(pid) {
                order.push(pid.clone());
            }
        }
        room.turn_order = order;
        room.current_turn_index = 0;
        room.phase = RoomPhase::Playing;
        room.folded.clear();
        room.clear_warnings();
        room.mark_action();
        tracing::debug!(
            room_id = %id,
            hand_id = %room.hand_id,
            players = room.turn_order.len(),
            "hand reset"
        );
        Some(room)
    }

    /// Appends to the room's bounded audit history and touches its
    /// last-activity time. A no-op for an unknown room.
    pub fn record_log(&mut self, id: &RoomId, entry: ActionRecord) {
        if let Some(room) = self.rooms.get_mut(id) {
            room.push_history(entry);
            room.mark_action();
        }
    }

    pub fn list_rooms(&self) -> impl Iterator<Item = &RoomState> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
