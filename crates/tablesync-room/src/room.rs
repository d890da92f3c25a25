//! Per-room state: participants, chips, turn order, and the audit log.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use tablesync_protocol::{
    ActionRecord, HandId, PlayerId, Role, RoomId, RoomPhase,
};

use crate::RoomConfig;

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A connected actor inside a room — player or spectator.
///
/// Created on join; refreshed when the same id joins again (the reconnect
/// path); removed on leave.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: PlayerId,
    pub display_name: String,
    pub role: Role,
    /// Optional seat hint supplied by the client; purely advisory.
    pub seat: Option<String>,
    pub ready: bool,
    /// Client-reported latency estimate in milliseconds, if any.
    pub latency_ms: Option<u32>,
    pub last_seen: Instant,
}

impl Participant {
    pub fn new(id: PlayerId, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            seat: None,
            ready: false,
            latency_ms: None,
            last_seen: Instant::now(),
        }
    }

    /// Refreshes the liveness timestamp.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The authoritative state of one table.
///
/// Invariants, maintained by the registry and the state helpers:
/// - `players.len() <= max_players`
/// - `turn_order ⊆ players`, `folded ⊆ turn_order`
/// - `sequence_id` strictly increases on every stamped broadcast
/// - `hand_id` changes exactly once per hand start
#[derive(Debug)]
pub struct RoomState {
    pub id: RoomId,
    pub created_at: Instant,
    pub players: HashMap<PlayerId, Participant>,
    pub spectators: HashMap<PlayerId, Participant>,
    pub max_players: usize,
    pub phase: RoomPhase,
    /// Free-form room metadata supplied at creation.
    pub metadata: HashMap<String, String>,
    sequence_id: u64,
    history: VecDeque<ActionRecord>,
    history_cap: usize,
    pub hand_id: HandId,
    pub last_action_at: Instant,
    pub stacks: HashMap<PlayerId, u64>,
    pub bets: HashMap<PlayerId, u64>,
    pub pot: u64,
    pub turn_order: Vec<PlayerId>,
    pub current_turn_index: usize,
    pub folded: HashSet<PlayerId>,
    warnings: VecDeque<String>,
    warning_cap: usize,
}

impl RoomState {
    pub(crate) fn new(
        id: RoomId,
        max_players: usize,
        metadata: HashMap<String, String>,
        config: &RoomConfig,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            players: HashMap::new(),
            spectators: HashMap::new(),
            max_players,
            phase: RoomPhase::Waiting,
            metadata,
            sequence_id: 0,
            history: VecDeque::new(),
            history_cap: config.history_cap,
            hand_id: HandId::generate(),
            last_action_at: now,
            stacks: HashMap::new(),
            bets: HashMap::new(),
            pot: 0,
            turn_order: Vec::new(),
            current_turn_index: 0,
            folded: HashSet::new(),
            warnings: VecDeque::new(),
            warning_cap: config.warning_cap,
        }
    }

    /// Increments and returns the sequence id.
    ///
    /// Called exactly once per stamped broadcast, which makes the broadcast
    /// sequence strictly increasing and gapless for this room.
    pub fn bump_sequence(&mut self) -> u64 {
        self.sequence_id += 1;
        self.sequence_id
    }

    /// The sequence id of the most recent stamped broadcast.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    /// Marks room activity for idle tracking.
    pub fn mark_action(&mut self) {
        self.last_action_at = Instant::now();
    }

    /// Appends to the bounded audit history, dropping the oldest entry
    /// when the cap is reached.
    pub fn push_history(&mut self, record: ActionRecord) {
        if self.history.len() == self.history_cap {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// The most recent `n` audit entries, oldest first.
    pub fn recent_history(&self, n: usize) -> Vec<ActionRecord> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// The most recent audit entry, if any.
    pub fn last_action(&self) -> Option<ActionRecord> {
        self.history.back().cloned()
    }

    /// Appends an anti-cheat advisory to the bounded warning log.
    pub fn push_warning(&mut self, warning: String) {
        if self.warnings.len() == self.warning_cap {
            self.warnings.pop_front();
        }
        self.warnings.push_back(warning);
    }

    /// The most recent `n` advisory warnings, oldest first.
    pub fn recent_warnings(&self, n: usize) -> Vec<String> {
        let skip = self.warnings.len().saturating_sub(n);
        self.warnings.iter().skip(skip).cloned().collect()
    }

    pub(crate) fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    /// Players still contesting the hand: turn order minus folded.
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.turn_order
            .iter()
            .filter(|pid| !self.folded.contains(*pid))
            .cloned()
            .collect()
    }

    /// The single remaining non-folded player, if the hand is down to one.
    pub fn sole_active_player(&self) -> Option<PlayerId> {
        let mut active = self
            .turn_order
            .iter()
            .filter(|pid| !self.folded.contains(*pid));
        let first = active.next()?;
        if active.next().is_none() {
            Some(first.clone())
        } else {
            None
        }
    }

    /// Advances the turn cursor to the next non-folded player, round-robin.
    ///
    /// The turn order itself is stable across folds (so `folded ⊆
    /// turn_order` always holds); only the cursor moves. A no-op when no
    /// active player remains.
    pub fn advance_turn(&mut self) {
        if self.turn_order.is_empty() || self.active_players().is_empty() {
            return;
        }
        let len = self.turn_order.len();
        for step in 1..=len {
            let idx = (self.current_turn_index + step) % len;
            if !self.folded.contains(&self.turn_order[idx]) {
                self.current_turn_index = idx;
                return;
            }
        }
    }

    /// The player whose turn it currently is, if any.
    pub fn current_turn(&self) -> Option<&PlayerId> {
        self.turn_order.get(self.current_turn_index)
    }

    /// True once every player and spectator has left.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.spectators.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn room_with_players(ids: &[&str]) -> RoomState {
        let mut room = RoomState::new(
            RoomId::new("r1"),
            6,
            HashMap::new(),
            &RoomConfig::default(),
        );
        for id in ids {
            room.players
                .insert(pid(id), Participant::new(pid(id), *id, Role::Player));
            room.turn_order.push(pid(id));
        }
        room
    }

    fn record(player: &str) -> ActionRecord {
        ActionRecord {
            player_id: pid(player),
            action: tablesync_protocol::ActionKind::Call,
            amount: 0,
            phase: RoomPhase::Playing,
        }
    }

    #[test]
    fn test_bump_sequence_strictly_increases_without_gaps() {
        let mut room = room_with_players(&[]);
        let seqs: Vec<u64> = (0..5).map(|_| room.bump_sequence()).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_push_history_drops_oldest_past_cap() {
        let config = RoomConfig {
            history_cap: 3,
            ..RoomConfig::default()
        };
        let mut room =
            RoomState::new(RoomId::new("r1"), 6, HashMap::new(), &config);
        for name in ["a", "b", "c", "d"] {
            room.push_history(record(name));
        }
        let recent = room.recent_history(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].player_id, pid("b"));
        assert_eq!(recent[2].player_id, pid("d"));
    }

    #[test]
    fn test_recent_warnings_returns_tail_in_order() {
        let mut room = room_with_players(&[]);
        for i in 0..5 {
            room.push_warning(format!("w{i}"));
        }
        assert_eq!(room.recent_warnings(2), vec!["w3", "w4"]);
    }

    #[test]
    fn test_advance_turn_skips_folded_players() {
        let mut room = room_with_players(&["a", "b", "c"]);
        room.folded.insert(pid("b"));

        assert_eq!(room.current_turn(), Some(&pid("a")));
        room.advance_turn();
        assert_eq!(room.current_turn(), Some(&pid("c")));
        room.advance_turn();
        assert_eq!(room.current_turn(), Some(&pid("a")));
    }

    #[test]
    fn test_advance_turn_keeps_turn_order_stable() {
        // Folding must never remove a player from the turn order, only
        // redirect the cursor, so `folded ⊆ turn_order` stays true.
        let mut room = room_with_players(&["a", "b", "c"]);
        room.folded.insert(pid("a"));
        room.advance_turn();
        assert_eq!(room.turn_order, vec![pid("a"), pid("b"), pid("c")]);
    }

    #[test]
    fn test_sole_active_player_with_one_left() {
        let mut room = room_with_players(&["a", "b", "c"]);
        room.folded.insert(pid("a"));
        room.folded.insert(pid("c"));
        assert_eq!(room.sole_active_player(), Some(pid("b")));
    }

    #[test]
    fn test_sole_active_player_with_two_left_is_none() {
        let mut room = room_with_players(&["a", "b", "c"]);
        room.folded.insert(pid("a"));
        assert_eq!(room.sole_active_player(), None);
    }

    #[test]
    fn test_sole_active_player_all_folded_is_none() {
        let mut room = room_with_players(&["a", "b"]);
        room.folded.insert(pid("a"));
        room.folded.insert(pid("b"));
        assert_eq!(room.sole_active_player(), None);
    }
}
