//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or the action were wrong, never
//! the network. Inbound decode failures are dropped by the room layer one
//! message at a time; nothing here is fatal.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an action into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The payload is not a well-formed action.
    ///
    /// Covers malformed JSON, an unknown `type` tag, and a payload that is
    /// missing a field its variant requires.
    #[cfg(feature = "json")]
    #[error("malformed action: {0}")]
    MalformedAction(serde_json::Error),

    /// The action parsed but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
