//! `DchatClient` builder and the client actor loop.
//!
//! The actor owns the [`RoomManager`] and is the only thing that ever
//! touches room state. It serves four inputs from one `select!` loop:
//! commands from the presentation layer, the session event queue, the
//! joining deadline, and the optional re-announce timer.

use std::future;

use dchat_protocol::{Identity, PeerId};
use dchat_room::{RoomConfig, RoomManager, log_event_error};
use dchat_transport::Transport;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::handle::{ClientCommand, ClientHandle};

/// Color given to identities the builder makes up.
const FALLBACK_COLOR: &str = "gray";

/// Builder for configuring a chat client.
///
/// # Example
///
/// ```rust
/// use dchat::prelude::*;
///
/// # async fn demo() -> Result<(), DchatError> {
/// let network = MemoryNetwork::new();
/// let handle = DchatClientBuilder::new()
///     .identity(Identity::new("Ada", "purple"))
///     .build(network.node())
///     .spawn();
/// handle.submit_message("hello").await.ok();
/// handle.shutdown().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DchatClientBuilder {
    identity: Option<Identity>,
    config: RoomConfig,
}

impl DchatClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identity other peers will see.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets the room configuration.
    pub fn config(mut self, config: RoomConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds a client on `transport`.
    ///
    /// Without an explicit identity, the display name is the start of the
    /// local peer id.
    pub fn build<T: Transport>(self, transport: T) -> DchatClient<T> {
        let identity = self
            .identity
            .unwrap_or_else(|| fallback_identity(&transport.local_peer_id()));
        DchatClient {
            manager: RoomManager::new(transport, identity, self.config),
        }
    }
}

fn fallback_identity(peer_id: &PeerId) -> Identity {
    let name: String = peer_id.as_str().chars().take(8).collect();
    Identity::new(name, FALLBACK_COLOR)
}

/// A chat client that has not started yet.
///
/// Call [`spawn()`](Self::spawn) to start its actor task.
pub struct DchatClient<T: Transport> {
    manager: RoomManager<T>,
}

impl<T: Transport> DchatClient<T> {
    /// The peer id the transport assigned.
    pub fn local_peer_id(&self) -> &PeerId {
        self.manager.local_peer_id()
    }

    /// The identity other peers will see.
    pub fn identity(&self) -> &Identity {
        self.manager.identity()
    }

    /// Starts the actor task and returns a handle to it.
    ///
    /// The actor selects the configured default room as soon as it starts.
    pub fn spawn(self) -> ClientHandle {
        let (tx, rx) = mpsc::channel(self.manager.config().command_buffer.max(1));
        let handle = ClientHandle::new(self.manager.local_peer_id().clone(), tx);
        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(mut self, mut commands: mpsc::Receiver<ClientCommand>) {
        tracing::info!(
            peer_id = %self.manager.local_peer_id(),
            identity = %self.manager.identity(),
            "client started"
        );

        let default_room = self.manager.config().default_room.clone();
        if let Err(e) = self.manager.select_room(&default_room).await {
            tracing::warn!(room = %default_room, error = %e, "default room unavailable");
        }

        let mut reannounce = self.manager.config().reannounce_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            let deadline = self.manager.joining_deadline();

            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("all client handles dropped");
                        self.manager.shutdown();
                        break;
                    };
                    if self.handle_command(command).await {
                        break;
                    }
                }
                Some(event) = self.manager.next_event() => {
                    if let Err(e) = self.manager.handle_event(event).await {
                        log_event_error(&e);
                    }
                }
                _ = sleep_until(deadline) => {
                    self.manager.expire_joining();
                }
                _ = tick(&mut reannounce) => {
                    if let Err(e) = self.manager.reannounce().await {
                        tracing::debug!(error = %e, "re-announce skipped");
                    }
                }
            }
        }

        tracing::info!(peer_id = %self.manager.local_peer_id(), "client stopped");
    }

    /// Handles one command. Returns `true` when the actor should stop.
    async fn handle_command(&mut self, command: ClientCommand) -> bool {
        match command {
            ClientCommand::SelectRoom { name, reply } => {
                let result = self.manager.select_room(&name).await;
                let _ = reply.send(result);
            }
            ClientCommand::SubmitMessage { text, reply } => {
                let result = self.manager.submit_message(&text).await;
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "message rejected");
                }
                let _ = reply.send(result);
            }
            ClientCommand::Snapshot { reply } => {
                let _ = reply.send(self.manager.snapshot());
            }
            ClientCommand::Peers { reply } => {
                let _ = reply.send(self.manager.peers());
            }
            ClientCommand::Shutdown { reply } => {
                self.manager.shutdown();
                let _ = reply.send(());
                return true;
            }
        }
        false
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}
