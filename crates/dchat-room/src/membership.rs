//! Membership and the join / confirm-join handshake.
//!
//! [`MembershipMachine`] is a plain reducer: feed it one [`RoomEvent`] at a
//! time and it updates [`Membership`] and tells you which action, if any,
//! to broadcast in response. It never touches the transport, so every
//! transition can be tested without a network.
//!
//! From the local peer's point of view a remote peer is either absent from
//! membership or present in it. "Announced but not yet confirmed" is never
//! stored; it only exists as a Join in flight.
//!
//! | Event | Effect on membership | Broadcast |
//! |---|---|---|
//! | `Subscribed` | reset to `{ local: identity }` | – |
//! | `PeerJoined(p)` | – | `Join { p, membership }` |
//! | Join naming us | merge `knownMembers` (incoming wins) | `ConfirmJoin { us }` |
//! | Join naming someone else | – | – |
//! | `ConfirmJoin { id, identity }` | upsert | – |
//! | `PeerLeft(p)` | remove `p` | – |

use std::collections::BTreeMap;

use dchat_protocol::{Action, Identity, KnownMembers, PeerId};

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// The local peer's current belief about who is in the room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    members: BTreeMap<PeerId, Identity>,
}

impl Membership {
    /// Creates an empty membership.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a member. Returns `true` if anything changed.
    pub fn upsert(&mut self, id: PeerId, identity: Identity) -> bool {
        match self.members.insert(id, identity.clone()) {
            Some(previous) => previous != identity,
            None => true,
        }
    }

    /// Unions `other` into this membership. On a key collision the
    /// incoming identity wins.
    pub fn merge(&mut self, other: &KnownMembers) {
        for (id, identity) in other {
            self.members.insert(id.clone(), identity.clone());
        }
    }

    /// Removes a member, returning its identity if it was present.
    pub fn remove(&mut self, id: &PeerId) -> Option<Identity> {
        self.members.remove(id)
    }

    /// Looks up a member's identity.
    pub fn get(&self, id: &PeerId) -> Option<&Identity> {
        self.members.get(id)
    }

    /// Returns `true` if `id` is a member.
    pub fn contains(&self, id: &PeerId) -> bool {
        self.members.contains_key(id)
    }

    /// Number of members, the local peer included.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if there are no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterates members in peer-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &Identity)> {
        self.members.iter()
    }

    /// The wire form carried inside a Join.
    pub fn to_known_members(&self) -> KnownMembers {
        self.members.clone()
    }

    fn clear(&mut self) {
        self.members.clear();
    }
}

// ---------------------------------------------------------------------------
// RoomEvent
// ---------------------------------------------------------------------------

/// An input to the membership machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// The channel is subscribed.
    Subscribed,
    /// The transport saw a peer arrive.
    PeerJoined(PeerId),
    /// The transport saw a peer leave.
    PeerLeft(PeerId),
    /// A decoded action from the channel.
    Inbound(Action),
}

// ---------------------------------------------------------------------------
// MembershipMachine
// ---------------------------------------------------------------------------

/// Drives [`Membership`] through the join handshake.
#[derive(Debug, Clone)]
pub struct MembershipMachine {
    local_id: PeerId,
    local_identity: Identity,
    members: Membership,
}

impl MembershipMachine {
    /// Creates a machine for the local peer. Membership stays empty until
    /// [`RoomEvent::Subscribed`].
    pub fn new(local_id: PeerId, local_identity: Identity) -> Self {
        Self {
            local_id,
            local_identity,
            members: Membership::new(),
        }
    }

    /// The local peer's id.
    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// The local peer's identity.
    pub fn local_identity(&self) -> &Identity {
        &self.local_identity
    }

    /// The current membership.
    pub fn members(&self) -> &Membership {
        &self.members
    }

    /// The ConfirmJoin announcing the local peer.
    pub fn confirm_join(&self) -> Action {
        Action::confirm_join(self.local_id.clone(), self.local_identity.clone())
    }

    /// Applies one event and returns the action to broadcast, if any.
    pub fn apply(&mut self, event: &RoomEvent) -> Option<Action> {
        match event {
            RoomEvent::Subscribed => {
                self.members.clear();
                self.members
                    .upsert(self.local_id.clone(), self.local_identity.clone());
                None
            }

            RoomEvent::PeerJoined(peer) => {
                if *peer == self.local_id {
                    return None;
                }
                tracing::debug!(peer_id = %peer, "announcing new peer");
                Some(Action::join(peer.clone(), self.members.to_known_members()))
            }

            RoomEvent::PeerLeft(peer) => {
                // The local peer stays a member for as long as it is
                // subscribed.
                if *peer == self.local_id {
                    return None;
                }
                if self.members.remove(peer).is_some() {
                    tracing::debug!(
                        peer_id = %peer,
                        members = self.members.len(),
                        "member left"
                    );
                }
                None
            }

            RoomEvent::Inbound(Action::Join {
                new_peer_id,
                known_members,
            }) => {
                if *new_peer_id != self.local_id {
                    return None;
                }
                self.members.merge(known_members);
                tracing::debug!(
                    known = known_members.len(),
                    members = self.members.len(),
                    "joined, confirming identity"
                );
                Some(self.confirm_join())
            }

            RoomEvent::Inbound(Action::ConfirmJoin { id, identity }) => {
                if self.members.upsert(id.clone(), identity.clone()) {
                    tracing::debug!(
                        peer_id = %id,
                        %identity,
                        members = self.members.len(),
                        "member confirmed"
                    );
                }
                None
            }

            RoomEvent::Inbound(Action::Message { .. }) => None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
