//! In-process pub/sub network.
//!
//! [`MemoryNetwork`] is a shared hub keyed by topic. Every
//! [`MemoryTransport`] created from the same network can reach every other
//! one, which makes it a stand-in for a real peer-to-peer swarm in tests
//! and demos.
//!
//! Delivery rules mirror a gossip pub/sub room:
//!
//! - subscribing emits `Subscribed` to the newcomer first, then
//!   `PeerJoined` in both directions between the newcomer and every peer
//!   already on the topic;
//! - `broadcast` reaches every subscriber, the sender included;
//! - leaving (or dropping the channel) emits `PeerLeft` to the rest and
//!   closes the leaver's event stream;
//! - subscribing again to a topic the peer is still on replaces the old
//!   subscription instead of failing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use tokio::sync::mpsc;

use crate::{ChannelEvent, PeerId, Transport, TransportChannel, TransportError};

type EventSender = mpsc::UnboundedSender<ChannelEvent>;

/// Identifies one subscription on the hub.
///
/// A peer may subscribe to a topic again before its earlier channel has
/// finished leaving. The id lets the hub tell the two apart, so the late
/// leave of the old channel cannot detach the new one.
type SubscriptionId = u64;

struct Subscriber {
    id: SubscriptionId,
    sender: EventSender,
}

#[derive(Default)]
struct Hub {
    topics: HashMap<String, HashMap<PeerId, Subscriber>>,
    /// Senders for subscriptions that will never become ready.
    held: HashMap<SubscriptionId, EventSender>,
    next_id: SubscriptionId,
    hold_subscriptions: bool,
    shut_down: bool,
}

impl Hub {
    fn allocate_id(&mut self) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Shared in-memory pub/sub hub. Cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    hub: Arc<Mutex<Hub>>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node with a freshly generated peer id.
    pub fn node(&self) -> MemoryTransport {
        self.node_with_id(generate_peer_id())
    }

    /// Creates a node with a fixed peer id.
    pub fn node_with_id(&self, id: impl Into<PeerId>) -> MemoryTransport {
        MemoryTransport {
            network: self.clone(),
            local: id.into(),
        }
    }

    /// When `true`, new subscriptions never emit `Subscribed` and never
    /// become visible to other peers.
    pub fn hold_subscriptions(&self, hold: bool) {
        self.lock().hold_subscriptions = hold;
    }

    /// Closes every channel and rejects further subscriptions.
    pub fn shutdown(&self) {
        let mut hub = self.lock();
        hub.shut_down = true;
        hub.topics.clear();
        hub.held.clear();
        tracing::debug!("memory network shut down");
    }

    /// Peers currently subscribed to `topic`.
    pub fn subscribers(&self, topic: &str) -> Vec<PeerId> {
        let hub = self.lock();
        let mut peers: Vec<PeerId> = hub
            .topics
            .get(topic)
            .map(|subs| subs.keys().cloned().collect())
            .unwrap_or_default();
        peers.sort();
        peers
    }

    // A panic while holding the lock cannot leave the maps half-updated,
    // so a poisoned hub is still usable.
    fn lock(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes subscription `id`. Returns `false` if it was already gone
    /// or has been replaced by a newer subscription of the same peer.
    fn detach(&self, topic: &str, peer: &PeerId, id: SubscriptionId) -> bool {
        let mut hub = self.lock();
        if hub.held.remove(&id).is_some() {
            return true;
        }

        let Some(subs) = hub.topics.get_mut(topic) else {
            return false;
        };
        if !subs.get(peer).is_some_and(|sub| sub.id == id) {
            return false;
        }
        subs.remove(peer);
        for sub in subs.values() {
            let _ = sub.sender.send(ChannelEvent::PeerLeft(peer.clone()));
        }
        if subs.is_empty() {
            hub.topics.remove(topic);
        }
        true
    }
}

/// A node on a [`MemoryNetwork`].
pub struct MemoryTransport {
    network: MemoryNetwork,
    local: PeerId,
}

impl Transport for MemoryTransport {
    type Channel = MemoryChannel;
    type Error = TransportError;

    fn local_peer_id(&self) -> PeerId {
        self.local.clone()
    }

    /// Subscribes to `topic`.
    ///
    /// If this peer is still registered on the topic through an earlier
    /// channel, that registration is replaced: the others see `PeerLeft`
    /// and then `PeerJoined`, and the earlier channel's stream ends.
    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<MemoryChannel, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut hub = self.network.lock();
            if hub.shut_down {
                return Err(TransportError::SubscribeFailed(format!(
                    "network is shut down, cannot subscribe to {topic}"
                )));
            }

            let id = hub.allocate_id();
            if hub.hold_subscriptions {
                hub.held.insert(id, tx);
                tracing::debug!(topic, peer_id = %self.local, "subscription held");
            } else {
                let subs = hub.topics.entry(topic.to_string()).or_default();
                if subs.remove(&self.local).is_some() {
                    for sub in subs.values() {
                        let _ = sub
                            .sender
                            .send(ChannelEvent::PeerLeft(self.local.clone()));
                    }
                    tracing::debug!(
                        topic,
                        peer_id = %self.local,
                        "replaced earlier subscription"
                    );
                }

                let _ = tx.send(ChannelEvent::Subscribed);
                for (peer, sub) in subs.iter() {
                    let _ = sub
                        .sender
                        .send(ChannelEvent::PeerJoined(self.local.clone()));
                    let _ = tx.send(ChannelEvent::PeerJoined(peer.clone()));
                }
                subs.insert(self.local.clone(), Subscriber { id, sender: tx });
                tracing::debug!(
                    topic,
                    peer_id = %self.local,
                    peers = subs.len(),
                    "subscribed"
                );
            }
            id
        };

        Ok(MemoryChannel {
            network: self.network.clone(),
            topic: topic.to_string(),
            local: self.local.clone(),
            id,
            events: tokio::sync::Mutex::new(rx),
        })
    }
}

/// A subscription to one topic on a [`MemoryNetwork`].
///
/// Dropping the channel leaves the topic, like closing a socket would.
pub struct MemoryChannel {
    network: MemoryNetwork,
    topic: String,
    local: PeerId,
    id: SubscriptionId,
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<ChannelEvent>>,
}

impl TransportChannel for MemoryChannel {
    type Error = TransportError;

    fn topic(&self) -> &str {
        &self.topic
    }

    async fn broadcast(&self, data: &[u8]) -> Result<(), TransportError> {
        let hub = self.network.lock();
        if hub.shut_down {
            return Err(TransportError::Shutdown);
        }
        let subs = hub
            .topics
            .get(&self.topic)
            .filter(|subs| subs.get(&self.local).is_some_and(|sub| sub.id == self.id))
            .ok_or_else(|| TransportError::Closed(self.topic.clone()))?;

        for sub in subs.values() {
            let _ = sub.sender.send(ChannelEvent::Message {
                sender: self.local.clone(),
                data: data.to_vec(),
            });
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Option<ChannelEvent>, TransportError> {
        Ok(self.events.lock().await.recv().await)
    }

    async fn leave(&self) -> Result<(), TransportError> {
        if self.network.detach(&self.topic, &self.local, self.id) {
            tracing::debug!(topic = %self.topic, peer_id = %self.local, "left topic");
        }
        Ok(())
    }

    fn peers(&self) -> Vec<PeerId> {
        self.network
            .subscribers(&self.topic)
            .into_iter()
            .filter(|peer| *peer != self.local)
            .collect()
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.network.detach(&self.topic, &self.local, self.id);
    }
}

/// Generates an IPFS-looking peer id: `Qm` followed by 32 hex characters.
fn generate_peer_id() -> PeerId {
    let bytes: [u8; 16] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    PeerId::new(format!("Qm{hex}"))
}
