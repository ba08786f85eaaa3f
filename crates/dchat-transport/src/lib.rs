//! Transport abstraction layer for dchat.
//!
//! Provides the [`Transport`] and [`TransportChannel`] traits that abstract
//! over a broadcast-only publish/subscribe network. A channel is scoped to
//! one topic (a room name): everything broadcast on it reaches every peer
//! subscribed to the same topic, and presence changes arrive as
//! [`ChannelEvent`]s.
//!
//! Nothing here is ordered across peers. A channel only promises that its
//! own events come out of [`TransportChannel::recv`] in the order it
//! produced them.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process pub/sub network ([`MemoryNetwork`])

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{MemoryChannel, MemoryNetwork, MemoryTransport};

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a peer, assigned by the transport.
///
/// Unique per connected process for the lifetime of its transport
/// session. Not stable across reconnects.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Creates a new `PeerId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the underlying `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An event emitted by a [`TransportChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The local peer is now subscribed and can exchange messages.
    Subscribed,

    /// A peer appeared on the topic.
    PeerJoined(PeerId),

    /// A peer disappeared from the topic.
    PeerLeft(PeerId),

    /// A broadcast payload arrived.
    Message {
        /// Peer that broadcast the payload.
        sender: PeerId,
        /// Raw payload bytes.
        data: Vec<u8>,
    },
}

/// Opens channels on topics.
pub trait Transport: Send + Sync + 'static {
    /// The channel type produced by this transport.
    type Channel: TransportChannel;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The id other peers see for this process.
    fn local_peer_id(&self) -> PeerId;

    /// Subscribes to `topic` and returns the channel for it.
    ///
    /// The returned channel emits [`ChannelEvent::Subscribed`] once it is
    /// ready. A channel that never becomes ready is indistinguishable from a
    /// slow one, so callers should bound the wait themselves.
    fn subscribe(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Self::Channel, Self::Error>> + Send;
}

/// A subscription to a single topic.
pub trait TransportChannel: Send + Sync + 'static {
    /// The error type for channel operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The topic this channel is subscribed to.
    fn topic(&self) -> &str;

    /// Broadcasts a payload to every peer on the topic.
    fn broadcast(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next event.
    ///
    /// Returns `Ok(None)` once the channel has been left or closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<ChannelEvent>, Self::Error>> + Send;

    /// Leaves the topic. Remaining peers observe a `PeerLeft`.
    fn leave(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Peers currently known on the topic. Diagnostic only.
    fn peers(&self) -> Vec<PeerId>;
}
