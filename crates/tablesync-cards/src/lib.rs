//! Deck handling and sealed card delivery.
//!
//! Cards are dealt server-side and never cross the wire in the clear: each
//! card is sealed with a per-hand ChaCha20-Poly1305 key held by the
//! [`CardKeyStore`], and only the resulting opaque token is broadcast.

mod deck;
mod error;
mod keystore;

pub use deck::{full_deck, draw_distinct, DECK_SIZE, RANKS, SUITS};
pub use error::CardError;
pub use keystore::CardKeyStore;
