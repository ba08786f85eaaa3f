//! Room configuration and session lifecycle state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The room every client starts in.
pub const DEFAULT_ROOM: &str = "General";

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for a room client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Room selected at startup.
    pub default_room: String,

    /// Rooms offered to the presentation layer.
    pub rooms: Vec<String>,

    /// How long a new session may wait for `subscribed()` before the room
    /// is reported unavailable.
    pub subscribe_timeout: Duration,

    /// When set, the local peer re-broadcasts its ConfirmJoin at this
    /// interval while the room is active. Peers that missed the original
    /// handshake pick it up from the repeat.
    pub reannounce_interval: Option<Duration>,

    /// Capacity of the command channel between handles and the client
    /// actor.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_room: DEFAULT_ROOM.to_string(),
            rooms: vec![DEFAULT_ROOM.to_string(), "Fun".to_string()],
            subscribe_timeout: Duration::from_secs(30),
            reannounce_interval: None,
            command_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of the room session.
///
/// ```text
/// Uninitialized → Joining → Active → Leaving → Closed
///                    │                  │
///                    │                  └──→ Joining (room switch)
///                    └──→ Unavailable ──→ Joining | Leaving | Closed
/// ```
///
/// - **Uninitialized**: no room selected yet.
/// - **Joining**: channel created, waiting for `subscribed()`.
/// - **Active**: subscribed; membership and chat log are live.
/// - **Leaving**: the old channel is being left. Its membership and chat
///   log are already gone.
/// - **Closed**: shut down for good.
/// - **Unavailable**: the transport could not subscribe, or never
///   confirmed the subscription in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Uninitialized,
    Joining,
    Active,
    Leaving,
    Closed,
    Unavailable,
}

impl SessionState {
    /// Returns `true` if membership and chat are live.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if moving to `target` is a valid transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Uninitialized, Joining)
                | (Uninitialized, Closed)
                | (Joining, Active)
                | (Joining, Unavailable)
                | (Joining, Leaving)
                | (Active, Leaving)
                | (Leaving, Joining)
                | (Leaving, Closed)
                | (Unavailable, Joining)
                | (Unavailable, Leaving)
                | (Unavailable, Closed)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Joining => write!(f, "Joining"),
            Self::Active => write!(f, "Active"),
            Self::Leaving => write!(f, "Leaving"),
            Self::Closed => write!(f, "Closed"),
            Self::Unavailable => write!(f, "Unavailable"),
        }
    }
}
