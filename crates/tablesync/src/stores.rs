//! Settlement stores: per-player ratings and per-room hand history.

use std::collections::HashMap;

use tablesync_protocol::{HandId, PlayerId, RoomId};

/// Every rating axis starts here.
pub const BASELINE_RATING: u32 = 1500;

/// Ratings never drop below this on a loss.
pub const RATING_FLOOR: u32 = 1200;

/// Retained hands per room; older records are dropped first.
const HISTORY_CAP_PER_ROOM: usize = 100;

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// One player's rating across the three tracked axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating {
    /// Skill rating: moves the most per result.
    pub skill: u32,
    /// Monthly ladder rating.
    pub monthly: u32,
    /// Global lifetime rating: moves the least.
    pub global: u32,
}

impl Default for Rating {
    fn default() -> Self {
        Self {
            skill: BASELINE_RATING,
            monthly: BASELINE_RATING,
            global: BASELINE_RATING,
        }
    }
}

impl Rating {
    /// A won hand: +5 skill, +3 monthly, +2 global.
    pub fn apply_win(&mut self) {
        self.skill += 5;
        self.monthly += 3;
        self.global += 2;
    }

    /// A lost hand: -2 skill, -1 monthly, -1 global, floored.
    pub fn apply_loss(&mut self) {
        self.skill = self.skill.saturating_sub(2).max(RATING_FLOOR);
        self.monthly = self.monthly.saturating_sub(1).max(RATING_FLOOR);
        self.global = self.global.saturating_sub(1).max(RATING_FLOOR);
    }
}

/// In-memory rating ledger. Players appear on their first settled hand.
#[derive(Debug, Default)]
pub struct RatingStore {
    ratings: HashMap<PlayerId, Rating>,
}

impl RatingStore {
    /// The player's current rating; baseline if they have never settled
    /// a hand.
    pub fn rating_of(&self, player_id: &PlayerId) -> Rating {
        self.ratings.get(player_id).copied().unwrap_or_default()
    }

    pub fn apply_win(&mut self, player_id: &PlayerId) -> Rating {
        let rating = self.ratings.entry(player_id.clone()).or_default();
        rating.apply_win();
        *rating
    }

    pub fn apply_loss(&mut self, player_id: &PlayerId) -> Rating {
        let rating = self.ratings.entry(player_id.clone()).or_default();
        rating.apply_loss();
        *rating
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Hand history
// ---------------------------------------------------------------------------

/// The settled outcome of one hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandRecord {
    pub hand_id: HandId,
    /// `None` when the hand ended without a decidable winner.
    pub winner: Option<PlayerId>,
    pub pot: u64,
    /// Everyone seated when the hand settled, in turn order.
    pub players: Vec<PlayerId>,
    /// Anti-cheat advisories attached at settlement.
    pub warnings: Vec<String>,
}

/// Settled hands, grouped by room and bounded per room.
#[derive(Debug, Default)]
pub struct HandHistoryStore {
    hands: HashMap<RoomId, Vec<HandRecord>>,
}

impl HandHistoryStore {
    pub fn record(&mut self, room_id: RoomId, record: HandRecord) {
        let hands = self.hands.entry(room_id).or_default();
        if hands.len() == HISTORY_CAP_PER_ROOM {
            hands.remove(0);
        }
        hands.push(record);
    }

    /// Settled hands for a room, oldest first.
    pub fn hands_for(&self, room_id: &RoomId) -> &[HandRecord] {
        self.hands.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_hands(&self) -> usize {
        self.hands.values().map(Vec::len).sum()
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

    #[test]
    fn test_rating_of_unknown_player_is_baseline() {
        let store = RatingStore::default();
        assert_eq!(store.rating_of(&pid("ghost")), Rating::default());
        assert_eq!(Rating::default().skill, BASELINE_RATING);
    }

    #[test]
    fn test_apply_win_moves_all_three_axes() {
        let mut store = RatingStore::default();
        let rating = store.apply_win(&pid("hero"));
        assert_eq!(rating.skill, 1505);
        assert_eq!(rating.monthly, 1503);
        assert_eq!(rating.global, 1502);
    }

    #[test]
    fn test_apply_loss_moves_all_three_axes() {
        let mut store = RatingStore::default();
        let rating = store.apply_loss(&pid("hero"));
        assert_eq!(rating.skill, 1498);
        assert_eq!(rating.monthly, 1499);
        assert_eq!(rating.global, 1499);
    }

    #[test]
    fn test_apply_loss_never_goes_below_floor() {
        let mut store = RatingStore::default();
        // 1500 → 1200 takes 150 skill losses; run plenty more.
        for _ in 0..500 {
            store.apply_loss(&pid("hero"));
        }
        let rating = store.rating_of(&pid("hero"));
        assert_eq!(rating.skill, RATING_FLOOR);
        assert_eq!(rating.monthly, RATING_FLOOR);
        assert_eq!(rating.global, RATING_FLOOR);
    }

    #[test]
    fn test_wins_and_losses_accumulate() {
        let mut store = RatingStore::default();
        store.apply_win(&pid("hero"));
        store.apply_win(&pid("hero"));
        store.apply_loss(&pid("hero"));
        let rating = store.rating_of(&pid("hero"));
        assert_eq!(rating.skill, 1500 + 5 + 5 - 2);
        assert_eq!(rating.monthly, 1500 + 3 + 3 - 1);
        assert_eq!(rating.global, 1500 + 2 + 2 - 1);
    }

    fn record(hand: &str, winner: &str) -> HandRecord {
        HandRecord {
            hand_id: HandId(hand.into()),
            winner: Some(pid(winner)),
            pot: 40,
            players: vec![pid("hero"), pid("villain")],
            warnings: vec![],
        }
    }

    #[test]
    fn test_record_groups_hands_by_room() {
        let mut store = HandHistoryStore::default();
        store.record(RoomId::new("a"), record("h1", "hero"));
        store.record(RoomId::new("a"), record("h2", "villain"));
        store.record(RoomId::new("b"), record("h3", "hero"));

        assert_eq!(store.hands_for(&RoomId::new("a")).len(), 2);
        assert_eq!(store.hands_for(&RoomId::new("b")).len(), 1);
        assert_eq!(store.total_hands(), 3);
        assert!(store.hands_for(&RoomId::new("ghost")).is_empty());
    }

    #[test]
    fn test_record_drops_oldest_past_cap() {
        let mut store = HandHistoryStore::default();
        for i in 0..(HISTORY_CAP_PER_ROOM + 5) {
            store.record(RoomId::new("a"), record(&format!("h{i}"), "hero"));
        }
        let hands = store.hands_for(&RoomId::new("a"));
        assert_eq!(hands.len(), HISTORY_CAP_PER_ROOM);
        assert_eq!(hands[0].hand_id, HandId("h5".into()));
    }
}
