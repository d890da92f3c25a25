//! Room configuration.

/// Settings applied to rooms created through a [`crate::RoomRegistry`].
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Maximum seated players per room (spectators are not counted).
    pub max_players: usize,

    /// Chips seeded to every player on their first join.
    pub starting_stack: u64,

    /// Upper bound on the retained audit history per room. Older entries
    /// are dropped first.
    pub history_cap: usize,

    /// Upper bound on retained anti-cheat advisory warnings per room.
    pub warning_cap: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 6,
            starting_stack: 1500,
            history_cap: 50,
            warning_cap: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 6);
        assert_eq!(config.starting_stack, 1500);
        assert!(config.history_cap > 0);
        assert!(config.warning_cap > 0);
    }
}
