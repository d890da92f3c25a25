//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound event failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// An inbound frame was malformed, carried an unknown event kind, or
    /// had a payload of the wrong shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
