//! Core wire types: identities, action records, error codes, card tokens.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a participant.
///
/// Opaque string chosen by the client on join, or synthesized by the server
/// (`auto-…`) when the join payload omits one. Newtype wrapper so a player id
/// can't be confused with a room or hand id in a signature.
///
/// `#[serde(transparent)]` keeps the JSON representation a plain string, so
/// player-keyed maps (`stacks`, `bets`) serialize as ordinary objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Synthesizes an id for a join event that carried none.
    pub fn generate() -> Self {
        Self(format!("auto-{}", random_suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique identifier for a room (one table instance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("room-{}", random_suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque identifier for one deal-to-settlement cycle.
///
/// Regenerated exactly once per hand start; every settlement and history
/// record for a hand references the id in effect when the hand began.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandId(pub String);

impl HandId {
    pub fn generate() -> Self {
        Self(random_suffix())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 16 random hex characters (64 bits), enough to never collide in practice.
fn random_suffix() -> String {
    use rand::Rng;
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Roles and phases
// ---------------------------------------------------------------------------

/// What a participant is in a room: seated at the table, or watching.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Player,
    Spectator,
}

/// The lifecycle phase of a room.
///
/// ```text
/// Waiting ──(≥2 players)──→ Playing ──(one non-folded left)──→ Finishing
///    ↑                         ↑                                   │
///    │                         └──────────(reset_hand)─────────────┘
///    └────(membership drops below two players, from any phase)
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    /// Not enough players seated; no hand in progress.
    #[default]
    Waiting,
    /// A hand is being played.
    Playing,
    /// A hand is being settled; a new deal follows immediately.
    Finishing,
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finishing => write!(f, "finishing"),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The closed set of in-hand actions a player can send.
///
/// Everything except `Fold` moves chips: the requested amount is clamped to
/// the player's remaining stack by the controller. A missing `type` in the
/// payload is treated as a call, matching lenient clients.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fold,
    #[default]
    Call,
    Check,
    Bet,
    Raise,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "fold"),
            Self::Call => write!(f, "call"),
            Self::Check => write!(f, "check"),
            Self::Bet => write!(f, "bet"),
            Self::Raise => write!(f, "raise"),
        }
    }
}

/// One entry in a room's bounded audit history, and the `lastAction` payload
/// of an `updated_state` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub player_id: PlayerId,
    pub action: ActionKind,
    pub amount: u64,
    pub phase: RoomPhase,
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Stable codes carried by `error` events.
///
/// Clients branch on the code plus the `recoverable` flag: retry the same
/// operation, retry elsewhere, or force a resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unknown or undecodable event kind. Recoverable, sender-only.
    InvalidEvent,
    /// The addressed room does not exist. The client should resynchronize.
    RoomMissing,
    /// All player seats are taken. Recoverable; the client may retry elsewhere.
    RoomFull,
    /// The sender is not a registered room member. Signals desync.
    MissingPlayer,
    /// Liveness timeout; the server closes the connection after this notice.
    Timeout,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEvent => write!(f, "invalid_event"),
            Self::RoomMissing => write!(f, "room_missing"),
            Self::RoomFull => write!(f, "room_full"),
            Self::MissingPlayer => write!(f, "missing_player"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

// ---------------------------------------------------------------------------
// Card tokens
// ---------------------------------------------------------------------------

/// A sealed card: the tamper-evident representation of exactly one card
/// value, decipherable only by a holder of the key named by `key_id`.
///
/// All binary fields are base64. `slot` carries the seat index the card was
/// dealt to, purely informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardToken {
    pub key_id: String,
    pub iv: String,
    pub tag: String,
    pub ciphertext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Seconds since the Unix epoch, as carried by `heartbeat` payloads.
pub fn server_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

// =========================================================================
// Tests
// =========================================================================
