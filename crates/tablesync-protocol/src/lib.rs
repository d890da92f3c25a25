//! Wire protocol for Tablesync.
//!
//! This crate defines the "language" spoken over a room's persistent
//! connection:
//!
//! - **Types** ([`PlayerId`], [`RoomPhase`], [`ActionRecord`], [`CardToken`],
//!   etc.) — the structures that travel on the wire.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) — the closed set of
//!   inbound and outbound envelopes, `{"event": ..., "payload": ...}`.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events are converted
//!   to/from text frames.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding or
//!   decoding.
//!
//! The protocol layer knows nothing about connections, rooms, or card keys —
//! it only describes messages and how to serialize them.

mod codec;
mod error;
mod events;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use events::{ClientEvent, DealtCard, ServerEvent};
pub use types::{
    ActionKind, ActionRecord, CardToken, ErrorCode, HandId, PlayerId, Role,
    RoomId, RoomPhase, server_timestamp,
};
