//! Wire types: the identity record and the three room actions.
//!
//! Every broadcast on a room channel is one [`Action`], serialized as an
//! adjacently tagged record:
//!
//! ```text
//! { "type": "join",         "payload": { "newPeerId": .., "knownMembers": { id: Identity } } }
//! { "type": "confirm-join", "payload": { "id": .., "identity": Identity } }
//! { "type": "message",      "payload": { "identity": Identity, "text": .. } }
//! ```
//!
//! There is no version field. A peer that does not recognise a `type`
//! rejects the whole payload.

use std::collections::BTreeMap;
use std::fmt;

use dchat_transport::PeerId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// How a peer presents itself: a display name and a color.
///
/// Chosen locally at startup and never negotiated. Fields are private so an
/// identity cannot change after it has been announced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    display_name: String,
    color: String,
}

impl Identity {
    /// Creates an identity.
    pub fn new(display_name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            color: color.into(),
        }
    }

    /// The name shown next to this peer's messages.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The color used to render this peer.
    pub fn color(&self) -> &str {
        &self.color
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.color)
    }
}

/// A sender's view of the room, as carried inside a Join.
///
/// Ordered by peer id so that the same membership always encodes to the
/// same bytes.
pub type KnownMembers = BTreeMap<PeerId, Identity>;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A room action. One broadcast carries exactly one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// "A new peer has appeared; here is who I already know."
    ///
    /// Broadcast by every existing member when its transport reports a new
    /// peer, so duplicates are normal.
    Join {
        new_peer_id: PeerId,
        known_members: KnownMembers,
    },

    /// "That new peer is me, and this is my identity."
    ConfirmJoin { id: PeerId, identity: Identity },

    /// A chat message. The sender's identity travels with every message.
    Message { identity: Identity, text: String },
}

impl Action {
    /// Builds a Join announcing `new_peer_id`.
    pub fn join(new_peer_id: PeerId, known_members: KnownMembers) -> Self {
        Self::Join {
            new_peer_id,
            known_members,
        }
    }

    /// Builds a ConfirmJoin for `id`.
    pub fn confirm_join(id: PeerId, identity: Identity) -> Self {
        Self::ConfirmJoin { id, identity }
    }

    /// Builds a chat Message.
    pub fn message(identity: Identity, text: impl Into<String>) -> Self {
        Self::Message {
            identity,
            text: text.into(),
        }
    }

    /// The wire tag of this action.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::ConfirmJoin { .. } => "confirm-join",
            Self::Message { .. } => "message",
        }
    }

    /// Checks rules the serde shape cannot express.
    ///
    /// Peer ids are opaque but never empty.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Join {
                new_peer_id,
                known_members,
            } => {
                if new_peer_id.as_str().is_empty() {
                    return Err(ProtocolError::InvalidMessage(
                        "join names an empty peer id".into(),
                    ));
                }
                if known_members.keys().any(|id| id.as_str().is_empty()) {
                    return Err(ProtocolError::InvalidMessage(
                        "join carries a member with an empty peer id".into(),
                    ));
                }
            }
            Self::ConfirmJoin { id, .. } => {
                if id.as_str().is_empty() {
                    return Err(ProtocolError::InvalidMessage(
                        "confirm-join names an empty peer id".into(),
                    ));
                }
            }
            Self::Message { .. } => {}
        }
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
