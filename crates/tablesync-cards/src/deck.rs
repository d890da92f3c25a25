//! The standard 52-card deck.

use rand::seq::IndexedRandom;

/// Rank characters in deck order. Ten is `T` so every card stays two
/// characters wide.
pub const RANKS: &str = "A23456789TJQK";

/// Suit characters in deck order.
pub const SUITS: &str = "♠♥♦♣";

/// Number of cards in a full deck.
pub const DECK_SIZE: usize = 52;

/// Builds the full ordered deck, e.g. `"A♠"`, `"2♠"`, ... `"K♣"`.
pub fn full_deck() -> Vec<String> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for suit in SUITS.chars() {
        for rank in RANKS.chars() {
            deck.push(format!("{rank}{suit}"));
        }
    }
    deck
}

/// Draws `n` distinct cards from a fresh deck, at most one copy of each.
///
/// Asking for more than [`DECK_SIZE`] cards returns the whole deck.
pub fn draw_distinct(n: usize) -> Vec<String> {
    let deck = full_deck();
    deck.choose_multiple(&mut rand::rng(), n.min(DECK_SIZE))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_full_deck_has_52_unique_cards() {
        let deck = full_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        let unique: HashSet<&String> = deck.iter().collect();
        assert_eq!(unique.len(), DECK_SIZE);
    }

    #[test]
    fn test_full_deck_card_shape() {
        for card in full_deck() {
            let chars: Vec<char> = card.chars().collect();
            assert_eq!(chars.len(), 2, "card {card} should be rank + suit");
            assert!(RANKS.contains(chars[0]));
            assert!(SUITS.contains(chars[1]));
        }
    }

    #[test]
    fn test_draw_distinct_never_repeats() {
        let drawn = draw_distinct(10);
        assert_eq!(drawn.len(), 10);
        let unique: HashSet<&String> = drawn.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_draw_distinct_caps_at_deck_size() {
        assert_eq!(draw_distinct(500).len(), DECK_SIZE);
    }
}
