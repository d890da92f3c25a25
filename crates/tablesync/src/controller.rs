//! The sync controller: decodes inbound events and drives all room state.
//!
//! Every mutation of a room happens here, one event at a time, between a
//! decode and a broadcast. The controller takes at most one store lock at a
//! time and never holds one across an await on another, so socket tasks,
//! watchdogs, and the controller can interleave freely.

use std::sync::Arc;
use std::time::Duration;

use tablesync_cards::draw_distinct;
use tablesync_protocol::{
    server_timestamp, ActionKind, ActionRecord, ClientEvent, Codec, DealtCard,
    ErrorCode, PlayerId, Role, RoomId, RoomPhase, ServerEvent,
};
use tablesync_room::{Participant, RoomError, RoomState};
use tablesync_session::SessionId;

use crate::stores::HandRecord;
use crate::SyncContext;

/// An action arriving this soon after the session's previous inbound frame
/// is flagged as suspicious.
const MIN_ACTION_GAP: Duration = Duration::from_millis(150);

/// How many audit entries a `history` event carries.
const HISTORY_REPLAY_LEN: usize = 20;

/// How many warnings ride along on snapshots and showdowns.
const WARNING_SUMMARY_LEN: usize = 3;

/// Stateless event dispatcher over the shared [`SyncContext`].
///
/// Cheap to clone; the server builds one per socket task.
#[derive(Clone)]
pub struct SyncController {
    ctx: Arc<SyncContext>,
}

impl SyncController {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self { ctx }
    }

    /// Decodes and dispatches one inbound frame.
    ///
    /// Any frame counts as liveness for the session. An undecodable frame
    /// answers the sender with a recoverable `invalid_event` error; the
    /// connection stays open.
    pub async fn handle_event(&self, session_id: SessionId, raw: &str) {
        let inbound_gap = self.ctx.sessions.lock().await.touch(session_id);

        let event: ClientEvent = match self.ctx.codec.decode(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "undecodable frame");
                self.send_to(
                    session_id,
                    ServerEvent::error(
                        ErrorCode::InvalidEvent,
                        format!("could not decode event: {e}"),
                        true,
                    ),
                )
                .await;
                return;
            }
        };

        match event {
            ClientEvent::JoinRoom {
                player_id,
                display_name,
                role,
            } => {
                self.handle_join(session_id, player_id, display_name, role)
                    .await;
            }
            ClientEvent::LeaveRoom { player_id } => {
                self.handle_leave(session_id, player_id).await;
            }
            ClientEvent::Action {
                player_id,
                kind,
                amount,
            } => {
                self.handle_action(session_id, player_id, kind, amount, inbound_gap)
                    .await;
            }
            ClientEvent::Heartbeat {} => {
                self.send_to(
                    session_id,
                    ServerEvent::Heartbeat {
                        timestamp: server_timestamp(),
                        pending_actions: 0,
                    },
                )
                .await;
            }
        }
    }

    /// Replays the current room snapshot to a freshly connected session.
    ///
    /// Reuses the room's current sequence id without bumping it: this is a
    /// re-send of known state, not a new broadcast, so the broadcast
    /// sequence stays gapless for everyone else.
    pub async fn connect_snapshot(&self, session_id: SessionId) {
        let Some(room_id) = self.room_of(session_id).await else {
            return;
        };
        let snapshot = {
            let rooms = self.ctx.rooms.lock().await;
            rooms.get_room(&room_id).map(room_state_snapshot)
        };
        if let Some(event) = snapshot {
            self.send_to(session_id, event).await;
        }
    }

    // -- join / leave -------------------------------------------------------

    async fn handle_join(
        &self,
        session_id: SessionId,
        player_id: Option<PlayerId>,
        display_name: Option<String>,
        role: Option<Role>,
    ) {
        let Some(room_id) = self.room_of(session_id).await else {
            return;
        };
        let player_id = player_id.unwrap_or_else(PlayerId::generate);
        let display_name =
            display_name.unwrap_or_else(|| player_id.to_string());
        let role = role.unwrap_or_default();
        let participant =
            Participant::new(player_id.clone(), display_name, role);

        let join_result = {
            let mut rooms = self.ctx.rooms.lock().await;
            match role {
                Role::Spectator => {
                    rooms.add_spectator(&room_id, participant).map(|_| ())
                }
                Role::Player => {
                    rooms.join_room(&room_id, participant).map(|_| ())
                }
            }
        };
        match join_result {
            Ok(()) => {}
            Err(RoomError::NotFound(_)) => {
                self.send_to(
                    session_id,
                    ServerEvent::error(
                        ErrorCode::RoomMissing,
                        format!("room {room_id} does not exist"),
                        false,
                    ),
                )
                .await;
                return;
            }
            Err(RoomError::RoomFull(_)) => {
                self.send_to(
                    session_id,
                    ServerEvent::error(
                        ErrorCode::RoomFull,
                        format!("room {room_id} is full"),
                        true,
                    ),
                )
                .await;
                return;
            }
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "join failed");
                return;
            }
        }

        {
            let mut sessions = self.ctx.sessions.lock().await;
            let _ = sessions.bind_player(session_id, player_id.clone());
        }

        let (state_event, history_event, should_start) = {
            let mut rooms = self.ctx.rooms.lock().await;
            let Some(room) = rooms.get_room_mut(&room_id) else {
                return;
            };
            let history = ServerEvent::History {
                events: room.recent_history(HISTORY_REPLAY_LEN),
            };
            let should_start = room.phase == RoomPhase::Waiting
                && room.players.len() >= 2;
            (room_state_broadcast(room), history, should_start)
        };

        {
            let sessions = self.ctx.sessions.lock().await;
            sessions.broadcast(&room_id, &state_event);
            sessions.broadcast(&room_id, &history_event);
        }
        tracing::info!(
            room_id = %room_id,
            player_id = %player_id,
            ?role,
            "join handled"
        );

        if should_start {
            self.start_hand(&room_id).await;
        }
    }

    async fn handle_leave(
        &self,
        session_id: SessionId,
        player_id: Option<PlayerId>,
    ) {
        let (room_id, bound) = {
            let sessions = self.ctx.sessions.lock().await;
            (sessions.room_of(session_id), sessions.player_of(session_id))
        };
        let Some(room_id) = room_id else {
            return;
        };
        let Some(player_id) = player_id.or(bound) else {
            self.send_to(
                session_id,
                ServerEvent::error(
                    ErrorCode::MissingPlayer,
                    "leave without a player id on an unbound session",
                    false,
                ),
            )
            .await;
            return;
        };

        let (state_event, settle) = {
            let mut rooms = self.ctx.rooms.lock().await;
            rooms.leave_room(&room_id, &player_id);
            let Some(room) = rooms.get_room_mut(&room_id) else {
                // Room torn down with its last participant.
                return;
            };
            if room.players.len() < 2 {
                room.phase = RoomPhase::Waiting;
            }
            let settle = room.phase == RoomPhase::Playing
                && room.sole_active_player().is_some();
            (room_state_broadcast(room), settle)
        };

        self.ctx
            .sessions
            .lock()
            .await
            .broadcast(&room_id, &state_event);
        tracing::info!(room_id = %room_id, player_id = %player_id, "leave handled");

        if settle {
            self.finalize_hand(&room_id).await;
        }
    }

    /// Tears down a closed connection.
    ///
    /// The player keeps their seat (they may reconnect with the same id),
    /// but a player who vanishes mid-hand is auto-folded so the table never
    /// waits on a dead socket.
    pub async fn handle_disconnect(&self, session_id: SessionId) {
        let session = self.ctx.sessions.lock().await.deregister(session_id);
        let Some(session) = session else {
            return;
        };
        let Some(player_id) = session.player_id else {
            return;
        };
        let room_id = session.room_id;

        let outcome = {
            let mut rooms = self.ctx.rooms.lock().await;
            let Some(room) = rooms.get_room_mut(&room_id) else {
                return;
            };
            let in_hand = room.phase == RoomPhase::Playing
                && room.turn_order.contains(&player_id)
                && !room.folded.contains(&player_id);
            if !in_hand {
                None
            } else {
                if room.current_turn() == Some(&player_id) {
                    room.folded.insert(player_id.clone());
                    room.advance_turn();
                } else {
                    room.folded.insert(player_id.clone());
                }
                let record = ActionRecord {
                    player_id: player_id.clone(),
                    action: ActionKind::Fold,
                    amount: 0,
                    phase: room.phase,
                };
                room.push_history(record.clone());
                room.mark_action();
                let settle = room.sole_active_player().is_some();
                Some((updated_state_broadcast(room, Some(record)), settle))
            }
        };

        tracing::info!(
            room_id = %room_id,
            player_id = %player_id,
            session_id = %session_id,
            auto_folded = outcome.is_some(),
            "disconnect handled"
        );

        if let Some((event, settle)) = outcome {
            self.ctx.sessions.lock().await.broadcast(&room_id, &event);
            if settle {
                self.finalize_hand(&room_id).await;
            }
        }
    }

    // -- actions ------------------------------------------------------------

    async fn handle_action(
        &self,
        session_id: SessionId,
        player_id: Option<PlayerId>,
        kind: ActionKind,
        amount: Option<u64>,
        inbound_gap: Option<Duration>,
    ) {
        let (room_id, bound) = {
            let sessions = self.ctx.sessions.lock().await;
            (sessions.room_of(session_id), sessions.player_of(session_id))
        };
        let Some(room_id) = room_id else {
            return;
        };
        let Some(player_id) = player_id.or(bound) else {
            self.send_to(
                session_id,
                ServerEvent::error(
                    ErrorCode::MissingPlayer,
                    "action without a player id on an unbound session",
                    false,
                ),
            )
            .await;
            return;
        };

        let outcome = {
            let mut rooms = self.ctx.rooms.lock().await;
            let Some(room) = rooms.get_room_mut(&room_id) else {
                drop(rooms);
                self.reply_room_missing(session_id, &room_id).await;
                return;
            };
            let Some(participant) = room.players.get_mut(&player_id) else {
                drop(rooms);
                self.send_to(
                    session_id,
                    ServerEvent::error(
                        ErrorCode::MissingPlayer,
                        format!("{player_id} is not seated in {room_id}"),
                        false,
                    ),
                )
                .await;
                return;
            };

            // Anti-cheat: flag an action arriving implausibly fast after
            // the session's previous inbound frame. The action still
            // applies; the warning rides along on snapshots and the next
            // showdown.
            participant.touch();
            if let Some(gap) =
                inbound_gap.filter(|gap| *gap < MIN_ACTION_GAP)
            {
                room.push_warning(format!(
                    "{player_id} action too fast ({:.3}s)",
                    gap.as_secs_f64()
                ));
            }

            let mut record = ActionRecord {
                player_id: player_id.clone(),
                action: kind,
                amount: 0,
                phase: room.phase,
            };
            match kind {
                ActionKind::Fold => {
                    room.folded.insert(player_id.clone());
                }
                ActionKind::Call
                | ActionKind::Check
                | ActionKind::Bet
                | ActionKind::Raise => {
                    let stack =
                        room.stacks.get(&player_id).copied().unwrap_or(0);
                    // Never let a bet exceed the stack.
                    let spend = amount.unwrap_or(0).min(stack);
                    if spend > 0 {
                        if let Some(stack) = room.stacks.get_mut(&player_id) {
                            *stack -= spend;
                        }
                        *room.bets.entry(player_id.clone()).or_insert(0) +=
                            spend;
                        room.pot += spend;
                    }
                    record.amount = spend;
                }
            }

            room.push_history(record.clone());
            room.mark_action();
            room.advance_turn();

            let settle = room.phase == RoomPhase::Playing
                && room.sole_active_player().is_some();
            (updated_state_broadcast(room, Some(record)), settle)
        };

        let (event, settle) = outcome;
        self.ctx.sessions.lock().await.broadcast(&room_id, &event);
        tracing::debug!(
            room_id = %room_id,
            player_id = %player_id,
            action = %kind,
            "action handled"
        );

        if settle {
            self.finalize_hand(&room_id).await;
        }
    }

    // -- hand lifecycle -----------------------------------------------------

    /// Settles the current hand: credits the pot, writes history and
    /// ratings, broadcasts the showdown, and deals the next hand if the
    /// table still has enough players.
    async fn finalize_hand(&self, room_id: &RoomId) {
        let settled = {
            let mut rooms = self.ctx.rooms.lock().await;
            let Some(room) = rooms.get_room_mut(room_id) else {
                return;
            };
            room.phase = RoomPhase::Finishing;
            let winner = room.sole_active_player();
            let pot = room.pot;
            if let Some(winner) = &winner {
                if let Some(stack) = room.stacks.get_mut(winner) {
                    *stack += pot;
                }
                room.pot = 0;
            }
            (
                room.hand_id.clone(),
                winner,
                pot,
                room.turn_order.clone(),
                room.recent_warnings(WARNING_SUMMARY_LEN),
            )
        };
        let (hand_id, winner, pot, players, warnings) = settled;

        {
            let mut history = self.ctx.history.lock().await;
            history.record(
                room_id.clone(),
                HandRecord {
                    hand_id: hand_id.clone(),
                    winner: winner.clone(),
                    pot,
                    players: players.clone(),
                    warnings: warnings.clone(),
                },
            );
        }

        if let Some(winner) = &winner {
            let mut ratings = self.ctx.ratings.lock().await;
            ratings.apply_win(winner);
            for player in players.iter().filter(|p| *p != winner) {
                ratings.apply_loss(player);
            }
        }

        tracing::info!(
            room_id = %room_id,
            hand_id = %hand_id,
            winner = winner.as_ref().map(|w| w.as_str()).unwrap_or("-"),
            pot,
            "hand settled"
        );

        self.ctx.sessions.lock().await.broadcast(
            room_id,
            &ServerEvent::Showdown {
                hand_id,
                winner,
                pot,
                warnings,
            },
        );

        let enough_players = {
            let rooms = self.ctx.rooms.lock().await;
            rooms
                .get_room(room_id)
                .map(|room| room.players.len() >= 2)
                .unwrap_or(false)
        };
        if enough_players {
            self.start_hand(room_id).await;
        } else {
            let state_event = {
                let mut rooms = self.ctx.rooms.lock().await;
                rooms.get_room_mut(room_id).map(|room| {
                    room.phase = RoomPhase::Waiting;
                    room_state_broadcast(room)
                })
            };
            if let Some(event) = state_event {
                self.ctx.sessions.lock().await.broadcast(room_id, &event);
            }
        }
    }

    /// Deals a fresh hand: retires the previous hand's card key, resets the
    /// room, seals one card per seated player under the new key, and
    /// broadcasts the deal followed by the opening state delta.
    async fn start_hand(&self, room_id: &RoomId) {
        let reset = {
            let mut rooms = self.ctx.rooms.lock().await;
            let Some(room) = rooms.get_room(room_id) else {
                return;
            };
            let old_key_id = format!("{room_id}:{}", room.hand_id);
            let Some(room) = rooms.reset_hand(room_id) else {
                return;
            };
            (
                old_key_id,
                format!("{room_id}:{}", room.hand_id),
                room.hand_id.clone(),
                room.turn_order.clone(),
            )
        };
        let (old_key_id, key_id, hand_id, order) = reset;

        let cards = draw_distinct(order.len());
        let dealt = {
            let mut keys = self.ctx.keys.lock().await;
            keys.retire_key(&old_key_id);
            keys.create_card_key(key_id.clone());
            let mut dealt = Vec::with_capacity(order.len());
            for (idx, (player_id, card)) in
                order.iter().zip(cards.iter()).enumerate()
            {
                let mut token =
                    match keys.encrypt_card(&format!("{card}-{idx}"), &key_id)
                    {
                        Ok(token) => token,
                        Err(e) => {
                            tracing::error!(
                                room_id = %room_id,
                                error = %e,
                                "card sealing failed, hand not dealt"
                            );
                            return;
                        }
                    };
                token.slot = Some(format!("seat-{idx}"));
                dealt.push(DealtCard {
                    player_id: player_id.clone(),
                    card_token: token,
                });
            }
            dealt
        };

        let update = {
            let mut rooms = self.ctx.rooms.lock().await;
            let Some(room) = rooms.get_room_mut(room_id) else {
                return;
            };
            updated_state_broadcast(room, None)
        };

        tracing::info!(
            room_id = %room_id,
            hand_id = %hand_id,
            players = dealt.len(),
            "hand dealt"
        );

        let sessions = self.ctx.sessions.lock().await;
        sessions.broadcast(
            room_id,
            &ServerEvent::SecureDeal {
                hand_id,
                cards: dealt,
            },
        );
        sessions.broadcast(room_id, &update);
    }

    // -- helpers ------------------------------------------------------------

    async fn room_of(&self, session_id: SessionId) -> Option<RoomId> {
        self.ctx.sessions.lock().await.room_of(session_id)
    }

    async fn send_to(&self, session_id: SessionId, event: ServerEvent) {
        let _ = self.ctx.sessions.lock().await.send_to(session_id, event);
    }

    async fn reply_room_missing(&self, session_id: SessionId, room_id: &RoomId) {
        self.send_to(
            session_id,
            ServerEvent::error(
                ErrorCode::RoomMissing,
                format!("room {room_id} does not exist"),
                false,
            ),
        )
        .await;
    }
}

/// Builds a `room_state` snapshot from the room as-is, without touching the
/// sequence counter. Used for connect-time replays.
fn room_state_snapshot(room: &RoomState) -> ServerEvent {
    let mut spectators: Vec<PlayerId> =
        room.spectators.keys().cloned().collect();
    spectators.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    ServerEvent::RoomState {
        room_id: room.id.clone(),
        phase: room.phase,
        players: room.turn_order.clone(),
        spectators,
        sequence_id: room.sequence_id(),
        hand_id: room.hand_id.clone(),
        warnings: room.recent_warnings(WARNING_SUMMARY_LEN),
    }
}

/// Stamps a fresh sequence id and builds the `room_state` broadcast.
fn room_state_broadcast(room: &mut RoomState) -> ServerEvent {
    room.bump_sequence();
    room_state_snapshot(room)
}

/// Stamps a fresh sequence id and builds the `updated_state` broadcast.
fn updated_state_broadcast(
    room: &mut RoomState,
    last_action: Option<ActionRecord>,
) -> ServerEvent {
    ServerEvent::UpdatedState {
        sequence_id: room.bump_sequence(),
        hand_id: room.hand_id.clone(),
        phase: room.phase,
        bets: room.bets.clone(),
        pot: room.pot,
        stacks: room.stacks.clone(),
        last_action,
    }
}
