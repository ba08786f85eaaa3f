//! Codec trait and implementations for turning actions into broadcast
//! payloads and back.
//!
//! The room layer only talks to the [`Codec`] trait. [`JsonCodec`] is the
//! format every peer speaks today; another format would be a new
//! implementation, not a change to the callers.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Action, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds
///
/// - `Send + Sync`: the room manager lives inside a Tokio task and may be
///   polled on any worker thread, so its codec has to be shareable.
/// - `'static`: the codec owns everything it needs and is stored for the
///   whole life of the manager.
///
/// ## Generic and action-level methods
///
/// Implementors only write [`encode`](Self::encode) and
/// [`decode`](Self::decode), which work for any serde type. The room
/// layer calls [`encode_action`](Self::encode_action) and
/// [`decode_action`](Self::decode_action) instead; the latter also runs
/// [`Action::validate`], so a payload that parses but names an empty peer
/// id is still rejected.
///
/// `decode` asks for `DeserializeOwned` rather than `Deserialize<'de>`:
/// decoded actions outlive the broadcast buffer they came from.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::MalformedAction` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes one room action.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode_action(&self, action: &Action) -> Result<Vec<u8>, ProtocolError> {
        self.encode(action)
    }

    /// Decodes and validates one room action.
    ///
    /// # Errors
    /// Returns `ProtocolError::MalformedAction` for bytes that are not a
    /// known action (unknown `type`, missing payload fields, invalid
    /// JSON), and `ProtocolError::InvalidMessage` for an action that
    /// parses but breaks a protocol rule.
    fn decode_action(&self, data: &[u8]) -> Result<Action, ProtocolError> {
        let action: Action = self.decode(data)?;
        action.validate()?;
        Ok(action)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses UTF-8 JSON (via `serde_json`).
///
/// JSON is what every dchat peer speaks on the wire, so a peer built on
/// another codec would not understand the rest of the room. It is behind
/// the `json` feature (enabled by default).
///
/// ## Example
///
/// ```rust
/// use dchat_protocol::{Action, Codec, Identity, JsonCodec};
///
/// let codec = JsonCodec;
/// let action = Action::message(Identity::new("Ada", "plum"), "hi all");
///
/// let bytes = codec.encode_action(&action).unwrap();
/// assert_eq!(codec.decode_action(&bytes).unwrap(), action);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::MalformedAction)
    }
}
