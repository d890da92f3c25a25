//! Error types for the card layer.

/// Errors that can occur while sealing or opening card tokens.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    /// No key is registered under this key id.
    #[error("no card key registered for {0}")]
    KeyNotFound(String),

    /// A token field is not valid base64 or has an impossible shape.
    #[error("malformed card token: {0}")]
    Malformed(String),

    /// Authentication failed: the token was altered or sealed under a
    /// different key.
    #[error("card token failed authentication")]
    Tamper,

    /// The cipher rejected the sealing request.
    #[error("sealing failed: {0}")]
    Seal(String),
}
