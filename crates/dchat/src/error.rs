//! Unified error type for dchat.

use dchat_protocol::ProtocolError;
use dchat_room::RoomError;
use dchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DchatError {
    /// A transport-level error (subscribe, broadcast, closed channel).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, malformed action).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (unavailable, send rejected, no active room).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The client task has stopped and no longer takes commands.
    #[error("client is closed")]
    ClientClosed,
}

impl DchatError {
    /// The underlying room error, if this is one.
    pub fn as_room_error(&self) -> Option<&RoomError> {
        match self {
            Self::Room(e) => Some(e),
            _ => None,
        }
    }
}
