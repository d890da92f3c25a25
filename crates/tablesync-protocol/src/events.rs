//! The closed inbound and outbound event unions.
//!
//! Every frame on the wire is `{"event": "<kind>", "payload": {…}}` —
//! serde's adjacently tagged representation. Keeping the unions closed means
//! dispatch is an exhaustive `match`; an unknown `event` tag fails decoding,
//! and the connection handler answers with a recoverable `invalid_event`
//! error instead of closing the connection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    ActionKind, ActionRecord, CardToken, ErrorCode, HandId, PlayerId, Role,
    RoomId, RoomPhase,
};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Events a client may send.
///
/// Identity fields are optional everywhere: a join without a `playerId` gets
/// a synthesized one, and `leave_room`/`action` fall back to the id the
/// session was bound to on join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    JoinRoom {
        #[serde(default)]
        player_id: Option<PlayerId>,
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        role: Option<Role>,
    },
    LeaveRoom {
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    Action {
        #[serde(default)]
        player_id: Option<PlayerId>,
        #[serde(rename = "type", default)]
        kind: ActionKind,
        #[serde(default)]
        amount: Option<u64>,
    },
    Heartbeat {},
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// One sealed card paired with the player it was dealt to, inside a
/// `secure_deal` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealtCard {
    pub player_id: PlayerId,
    pub card_token: CardToken,
}

/// Events the server sends.
///
/// `room_state` and `updated_state` are the two sequence-stamped broadcasts;
/// `sequence_id` is strictly increasing and gapless per room across both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Full membership snapshot, sent on join/leave and on connect.
    RoomState {
        room_id: RoomId,
        phase: RoomPhase,
        players: Vec<PlayerId>,
        spectators: Vec<PlayerId>,
        sequence_id: u64,
        hand_id: HandId,
        warnings: Vec<String>,
    },
    /// The most recent audit-log entries.
    History { events: Vec<ActionRecord> },
    /// Per-action delta: chip movement and turn progress.
    UpdatedState {
        sequence_id: u64,
        hand_id: HandId,
        phase: RoomPhase,
        bets: HashMap<PlayerId, u64>,
        pot: u64,
        stacks: HashMap<PlayerId, u64>,
        last_action: Option<ActionRecord>,
    },
    /// Sealed cards for a freshly started hand, one per active player.
    SecureDeal {
        hand_id: HandId,
        cards: Vec<DealtCard>,
    },
    /// Hand settlement summary.
    Showdown {
        hand_id: HandId,
        winner: Option<PlayerId>,
        pot: u64,
        warnings: Vec<String>,
    },
    /// Liveness acknowledgment / probe.
    Heartbeat {
        timestamp: f64,
        pending_actions: u32,
    },
    /// Protocol-level failure, delivered only to the originating session.
    Error {
        code: ErrorCode,
        message: String,
        recoverable: bool,
    },
}

impl ServerEvent {
    /// Shorthand for building an `error` event.
    pub fn error(
        code: ErrorCode,
        message: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self::Error {
            code,
            message: message.into(),
            recoverable,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
