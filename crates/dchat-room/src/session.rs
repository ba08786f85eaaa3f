//! One room session: a channel, its membership, and its chat log.
//!
//! A session is tagged with a [`Generation`]. Its channel's events are
//! pumped into the manager's single queue as [`SessionEvent`]s carrying that
//! generation, so once a newer session exists the manager can recognise and
//! drop anything still trickling in from the old channel.

use std::fmt;
use std::sync::Arc;

use dchat_protocol::{Action, Codec, Identity, PeerId};
use dchat_transport::{ChannelEvent, TransportChannel};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{ChatLog, Membership, MembershipMachine, RoomError, RoomEvent};

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Monotonically increasing session counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Creates a generation from a raw counter value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The generation after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the underlying counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// A channel event stamped with the generation of the session it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub generation: Generation,
    pub event: ChannelEvent,
}

// ---------------------------------------------------------------------------
// RoomSession
// ---------------------------------------------------------------------------

/// The state of one subscribed room.
///
/// Owned exclusively by the manager. Dropping a session stops its pump;
/// [`close`](Self::close) additionally leaves the channel.
pub struct RoomSession<C: TransportChannel> {
    room_name: String,
    generation: Generation,
    channel: Arc<C>,
    machine: MembershipMachine,
    chat_log: ChatLog,
    pump: JoinHandle<()>,
}

impl<C: TransportChannel> RoomSession<C> {
    /// Wraps a freshly subscribed channel and starts pumping its events
    /// into `events`.
    pub(crate) fn open(
        room_name: String,
        generation: Generation,
        channel: C,
        local_id: PeerId,
        identity: Identity,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let channel = Arc::new(channel);
        let pump = spawn_pump(generation, Arc::clone(&channel), events);
        Self {
            room_name,
            generation,
            channel,
            machine: MembershipMachine::new(local_id, identity),
            chat_log: ChatLog::new(),
            pump,
        }
    }

    /// The topic this session is subscribed to.
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// The generation stamped on every event this session's pump queues.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Who this peer currently believes is in the room, itself included
    /// once the channel is subscribed.
    pub fn members(&self) -> &Membership {
        self.machine.members()
    }

    /// Messages delivered on this channel, newest first.
    pub fn chat_log(&self) -> &ChatLog {
        &self.chat_log
    }

    /// Peers the channel currently sees. Diagnostic only.
    pub fn peers(&self) -> Vec<PeerId> {
        self.channel.peers()
    }

    /// The ConfirmJoin announcing the local peer in this room.
    pub(crate) fn confirm_join(&self) -> Action {
        self.machine.confirm_join()
    }

    /// The live channel, for broadcasting effects.
    pub(crate) fn channel(&self) -> &C {
        &self.channel
    }

    /// Applies one channel event and returns the action to broadcast, if
    /// any.
    ///
    /// Messages go to the chat log; everything else goes through the
    /// membership machine. A payload that does not decode is rejected
    /// without touching either.
    pub fn handle(
        &mut self,
        event: ChannelEvent,
        codec: &impl Codec,
    ) -> Result<Option<Action>, RoomError> {
        let room_event = match event {
            ChannelEvent::Subscribed => RoomEvent::Subscribed,
            ChannelEvent::PeerJoined(peer) => RoomEvent::PeerJoined(peer),
            ChannelEvent::PeerLeft(peer) => RoomEvent::PeerLeft(peer),
            ChannelEvent::Message { sender, data } => {
                let action = codec
                    .decode_action(&data)
                    .map_err(|source| RoomError::MalformedAction { sender, source })?;
                match action {
                    Action::Message { identity, text } => {
                        self.chat_log.append_incoming(identity, text);
                        return Ok(None);
                    }
                    other => RoomEvent::Inbound(other),
                }
            }
        };
        Ok(self.machine.apply(&room_event))
    }

    /// Leaves the channel without waiting for it and stops the pump.
    pub(crate) fn close(self) {
        let channel = Arc::clone(&self.channel);
        let room = self.room_name.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            if let Err(e) = channel.leave().await {
                tracing::warn!(%room, %generation, error = %e, "leave failed");
            }
        });
        // Drop aborts the pump.
    }
}

impl<C: TransportChannel> Drop for RoomSession<C> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Forwards channel events into the session queue until the channel closes
/// or the queue is gone.
fn spawn_pump<C: TransportChannel>(
    generation: Generation,
    channel: Arc<C>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match channel.recv().await {
                Ok(Some(event)) => {
                    if events.send(SessionEvent { generation, event }).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!(
                        room = channel.topic(),
                        %generation,
                        "channel closed"
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        room = channel.topic(),
                        %generation,
                        error = %e,
                        "channel receive failed"
                    );
                    break;
                }
            }
        }
    })
}
