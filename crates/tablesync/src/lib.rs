//! # tablesync
//!
//! Authoritative real-time synchronization for multiplayer card tables.
//!
//! Clients connect over websockets to `/ws/{room_id}` and exchange JSON
//! events. The server owns all table state: membership, chips, turn order,
//! sealed card dealing, liveness, and settlement into the rating and hand
//! history stores. Clients only ever see sequence-stamped snapshots and
//! deltas; per-hand card keys never leave the process.

mod context;
mod controller;
mod error;
mod server;
mod stores;

pub use context::SyncContext;
pub use controller::SyncController;
pub use error::SyncError;
pub use server::{TableServer, TableServerBuilder};
pub use stores::{
    HandHistoryStore, HandRecord, Rating, RatingStore, BASELINE_RATING,
    RATING_FLOOR,
};
