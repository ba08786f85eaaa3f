//! Room manager: owns the one active session and drives its lifecycle.

use dchat_protocol::{Action, Codec, Identity, JsonCodec, PeerId};
use dchat_transport::{ChannelEvent, Transport, TransportChannel};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::session::{RoomSession, SessionEvent};
use crate::{ChatEntry, ChatLog, Generation, Membership, RoomConfig, RoomError, SessionState};

/// A read-only view of the room for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSnapshot {
    /// The selected room, if any.
    pub room_name: Option<String>,
    /// Lifecycle state of the session.
    pub state: SessionState,
    /// This process's peer id.
    pub local_peer_id: PeerId,
    /// Members in peer-id order.
    pub members: Vec<(PeerId, Identity)>,
    /// Chat entries, newest first.
    pub chat: Vec<ChatEntry>,
}

/// Manages the active room session for the local peer.
///
/// Exactly one session exists at a time. Switching rooms tears the old one
/// down and starts the new one empty; nothing carries over.
///
/// All state changes happen in [`handle_event`](Self::handle_event), fed
/// from a single queue that every session's channel pumps into.
pub struct RoomManager<T: Transport, C: Codec = JsonCodec> {
    transport: T,
    codec: C,
    local_id: PeerId,
    identity: Identity,
    config: RoomConfig,
    state: SessionState,
    room_name: Option<String>,
    last_generation: Generation,
    session: Option<RoomSession<T::Channel>>,
    joining_deadline: Option<Instant>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl<T: Transport> RoomManager<T, JsonCodec> {
    /// Creates a manager speaking JSON. No room is selected yet.
    pub fn new(transport: T, identity: Identity, config: RoomConfig) -> Self {
        Self::with_codec(transport, JsonCodec, identity, config)
    }
}

impl<T: Transport, C: Codec> RoomManager<T, C> {
    /// Creates a manager with an explicit codec.
    pub fn with_codec(
        transport: T,
        codec: C,
        identity: Identity,
        config: RoomConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let local_id = transport.local_peer_id();
        Self {
            transport,
            codec,
            local_id,
            identity,
            config,
            state: SessionState::Uninitialized,
            room_name: None,
            last_generation: Generation::default(),
            session: None,
            joining_deadline: None,
            events_tx,
            events_rx,
        }
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Makes `name` the active room.
    ///
    /// Selecting the room that is already joining or active does nothing.
    /// Otherwise the current session is left (without waiting) and a new
    /// session with empty membership and chat log starts joining.
    pub async fn select_room(&mut self, name: &str) -> Result<(), RoomError> {
        if self.room_name.as_deref() == Some(name)
            && matches!(self.state, SessionState::Joining | SessionState::Active)
        {
            tracing::debug!(room = name, "room already selected");
            return Ok(());
        }

        self.leave_current();

        let generation = self.last_generation.next();
        self.last_generation = generation;
        self.room_name = Some(name.to_string());
        self.transition(SessionState::Joining);

        match self.transport.subscribe(name).await {
            Ok(channel) => {
                self.session = Some(RoomSession::open(
                    name.to_string(),
                    generation,
                    channel,
                    self.local_id.clone(),
                    self.identity.clone(),
                    self.events_tx.clone(),
                ));
                self.joining_deadline = Some(Instant::now() + self.config.subscribe_timeout);
                tracing::info!(room = name, %generation, "joining room");
                Ok(())
            }
            Err(e) => {
                self.transition(SessionState::Unavailable);
                tracing::warn!(room = name, %generation, error = %e, "subscribe failed");
                Err(RoomError::TransportUnavailable {
                    room: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Leaves the current room for good.
    pub fn shutdown(&mut self) {
        self.leave_current();
        self.transition(SessionState::Closed);
        tracing::info!("room manager closed");
    }

    /// When the current session is still joining, the instant after which
    /// it is given up on.
    pub fn joining_deadline(&self) -> Option<Instant> {
        match self.state {
            SessionState::Joining => self.joining_deadline,
            _ => None,
        }
    }

    /// Gives up on a session that has not confirmed its subscription in
    /// time. Returns `true` if the room was marked unavailable.
    pub fn expire_joining(&mut self) -> bool {
        let Some(deadline) = self.joining_deadline() else {
            return false;
        };
        if Instant::now() < deadline {
            return false;
        }

        if let Some(session) = self.session.take() {
            session.close();
        }
        self.joining_deadline = None;
        self.transition(SessionState::Unavailable);
        tracing::warn!(
            room = self.room_name.as_deref().unwrap_or_default(),
            timeout = ?self.config.subscribe_timeout,
            "room unavailable, never subscribed"
        );
        true
    }

    fn leave_current(&mut self) {
        self.joining_deadline = None;
        if let Some(session) = self.session.take() {
            self.transition(SessionState::Leaving);
            tracing::info!(
                room = session.room_name(),
                generation = %session.generation(),
                "leaving room"
            );
            session.close();
        }
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            tracing::debug!(from = %self.state, to = %next, "unusual session transition");
        }
        self.state = next;
    }

    // -- Events ------------------------------------------------------------

    /// Waits for the next queued event from any session.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Applies one event to the active session and broadcasts whatever the
    /// handshake calls for.
    ///
    /// Events from a superseded session and payloads that do not decode are
    /// rejected with an error that only means "dropped"; see
    /// [`RoomError::is_dropped_event`].
    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<(), RoomError> {
        let SessionEvent { generation, event } = event;
        let current = self.session.as_ref().map(|s| s.generation());
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.generation() == generation)
        else {
            return Err(RoomError::StaleSessionEvent {
                generation,
                current,
            });
        };

        let subscribed = matches!(event, ChannelEvent::Subscribed);
        let effect = session.handle(event, &self.codec)?;

        if subscribed && self.state == SessionState::Joining {
            self.joining_deadline = None;
            self.transition(SessionState::Active);
            tracing::info!(
                room = self.room_name.as_deref().unwrap_or_default(),
                %generation,
                "room active"
            );
        }

        if let Some(action) = effect {
            self.broadcast(&action).await?;
        }
        Ok(())
    }

    /// Waits for and handles the next event.
    pub async fn process_next(&mut self) -> Result<(), RoomError> {
        match self.next_event().await {
            Some(event) => self.handle_event(event).await,
            None => Ok(()),
        }
    }

    /// Handles every event already queued without waiting for more.
    ///
    /// Dropped events are logged and skipped. Returns how many events were
    /// taken off the queue.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            handled += 1;
            if let Err(e) = self.handle_event(event).await {
                log_event_error(&e);
            }
        }
        handled
    }

    // -- Outbound ----------------------------------------------------------

    /// Broadcasts a chat message under the local identity.
    ///
    /// Rejected without broadcasting when the text is empty, no room is
    /// active, or the local peer is the only known member. The message is
    /// not added to the local chat log here; it arrives like everyone
    /// else's when the channel delivers it back.
    pub async fn submit_message(&self, text: &str) -> Result<(), RoomError> {
        if text.is_empty() {
            return Err(RoomError::EmptyMessage);
        }
        let session = self
            .session
            .as_ref()
            .filter(|_| self.state.is_active())
            .ok_or(RoomError::NoActiveRoom)?;

        let members = session.members().len();
        if members < 2 {
            return Err(RoomError::SendPrecondition { members });
        }

        self.broadcast(&Action::message(self.identity.clone(), text))
            .await
    }

    /// Re-broadcasts the local ConfirmJoin while the room is active.
    pub async fn reannounce(&self) -> Result<(), RoomError> {
        let session = self
            .session
            .as_ref()
            .filter(|_| self.state.is_active())
            .ok_or(RoomError::NoActiveRoom)?;
        self.broadcast(&session.confirm_join()).await
    }

    async fn broadcast(&self, action: &Action) -> Result<(), RoomError> {
        let session = self.session.as_ref().ok_or(RoomError::NoActiveRoom)?;
        let bytes = self.codec.encode_action(action)?;
        session
            .channel()
            .broadcast(&bytes)
            .await
            .map_err(|e| RoomError::Transport(Box::new(e)))?;
        tracing::debug!(
            room = session.room_name(),
            kind = action.kind(),
            bytes = bytes.len(),
            "broadcast"
        );
        Ok(())
    }

    // -- Accessors ---------------------------------------------------------

    /// Lifecycle state of the current (or last) session.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The most recently selected room. Stays set while the room is
    /// unavailable so the presentation layer can show which one failed.
    pub fn room_name(&self) -> Option<&str> {
        self.room_name.as_deref()
    }

    /// This process's peer id, as the transport reports it.
    pub fn local_peer_id(&self) -> &PeerId {
        &self.local_id
    }

    /// The identity announced in ConfirmJoin and attached to messages.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Generation of the live session, if there is one.
    pub fn generation(&self) -> Option<Generation> {
        self.session.as_ref().map(|s| s.generation())
    }

    /// Membership of the live session.
    pub fn members(&self) -> Option<&Membership> {
        self.session.as_ref().map(|s| s.members())
    }

    /// Chat log of the live session.
    pub fn chat_log(&self) -> Option<&ChatLog> {
        self.session.as_ref().map(|s| s.chat_log())
    }

    /// Peers the transport sees in the current room. Diagnostic only.
    pub fn peers(&self) -> Vec<PeerId> {
        let peers = self
            .session
            .as_ref()
            .map(|s| s.peers())
            .unwrap_or_default();
        tracing::debug!(me = %self.local_id, peers = ?peers, "transport peers");
        peers
    }

    /// Copies out the current room view.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_name: self.room_name.clone(),
            state: self.state,
            local_peer_id: self.local_id.clone(),
            members: self
                .members()
                .map(|m| m.iter().map(|(id, who)| (id.clone(), who.clone())).collect())
                .unwrap_or_default(),
            chat: self.chat_log().map(ChatLog::to_vec).unwrap_or_default(),
        }
    }
}

/// Logs a non-fatal event error at the level it deserves.
pub fn log_event_error(error: &RoomError) {
    if error.is_dropped_event() {
        tracing::debug!(%error, "event dropped");
    } else {
        tracing::warn!(%error, "event handling failed");
    }
}
