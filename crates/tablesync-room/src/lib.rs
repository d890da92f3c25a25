//! Room registry for Tablesync.
//!
//! The registry is the authoritative store of per-room state. Rooms are
//! created explicitly, mutated only through registry operations driven by the
//! sync controller (one event at a time per room), and destroyed
//! automatically once the last participant leaves.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — create/join/leave/reset operations over all rooms
//! - [`RoomState`] — one table: membership, chips, turn order, audit log
//! - [`Participant`] — a player or spectator inside a room
//! - [`RoomConfig`] — capacity, starting stack, log bounds

mod config;
mod error;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{Participant, RoomState};
