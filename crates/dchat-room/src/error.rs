//! Error types for the room layer.

use dchat_protocol::{PeerId, ProtocolError};

use crate::Generation;

/// Errors that can occur during room operations.
///
/// None of these are fatal. The worst outcome of the protocol is a
/// membership view that disagrees with another peer's.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The channel for the room could not be opened, or never confirmed
    /// the subscription.
    #[error("room {room} is unavailable: {reason}")]
    TransportUnavailable { room: String, reason: String },

    /// An inbound payload did not decode to a valid action. Dropped.
    #[error("dropped malformed action from {sender}: {source}")]
    MalformedAction {
        sender: PeerId,
        source: ProtocolError,
    },

    /// Sending needs at least one other known member.
    #[error("cannot send with {members} known member(s), at least 2 required")]
    SendPrecondition { members: usize },

    /// An event arrived from a channel superseded by a room switch. Dropped.
    #[error("dropped event from stale session {generation}")]
    StaleSessionEvent {
        generation: Generation,
        current: Option<Generation>,
    },

    /// Empty chat messages are not sent.
    #[error("cannot send an empty message")]
    EmptyMessage,

    /// There is no active room to act on.
    #[error("no active room")]
    NoActiveRoom,

    /// A broadcast on the live channel failed.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Encoding an outbound action failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl RoomError {
    /// Errors that only mean "this one event was dropped".
    pub fn is_dropped_event(&self) -> bool {
        matches!(
            self,
            Self::MalformedAction { .. } | Self::StaleSessionEvent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_precondition_message() {
        let err = RoomError::SendPrecondition { members: 1 };
        assert_eq!(
            err.to_string(),
            "cannot send with 1 known member(s), at least 2 required"
        );
    }

    #[test]
    fn test_dropped_event_classification() {
        let stale = RoomError::StaleSessionEvent {
            generation: Generation::new(1),
            current: Some(Generation::new(2)),
        };
        assert!(stale.is_dropped_event());
        assert!(!RoomError::NoActiveRoom.is_dropped_event());
        assert!(!RoomError::SendPrecondition { members: 0 }.is_dropped_event());
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let err = RoomError::Transport(Box::new(
            dchat_transport::TransportError::Shutdown,
        ));
        assert!(std::error::Error::source(&err).is_some());
    }
}
