//! Codec trait and the JSON implementation.
//!
//! The engine speaks JSON over websocket text frames, but nothing outside
//! this module needs to know that. The [`Codec`] seam keeps serialization
//! swappable and gives the connection handler a single error type to map to
//! `invalid_event`.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts events to and from text frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one outbound frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes one inbound frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the frame is malformed or its
    /// `event` tag is not a known kind.
    fn decode<T: DeserializeOwned>(
        &self,
        text: &str,
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        text: &str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientEvent, ServerEvent, server_timestamp};

    #[test]
    fn test_json_codec_round_trips_client_event() {
        let codec = JsonCodec;
        let event = ClientEvent::Heartbeat {};
        let text = codec.encode(&event).unwrap();
        let decoded: ClientEvent = codec.decode(&text).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_json_codec_round_trips_server_event() {
        let codec = JsonCodec;
        let event = ServerEvent::Heartbeat {
            timestamp: server_timestamp(),
            pending_actions: 0,
        };
        let text = codec.encode(&event).unwrap();
        let decoded: ServerEvent = codec.decode(&text).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_error() {
        let codec = JsonCodec;
        let result: Result<ClientEvent, _> = codec.decode("not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
