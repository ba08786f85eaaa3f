//! The presentation layer's side of the client actor.

use dchat_protocol::PeerId;
use dchat_room::{RoomError, RoomSnapshot};
use tokio::sync::{mpsc, oneshot};

use crate::DchatError;

/// Commands sent to the client actor through its channel.
///
/// Every variant carries a reply channel; the caller waits on it for the
/// actor's answer.
pub(crate) enum ClientCommand {
    /// Switch to a room.
    SelectRoom {
        name: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Broadcast a chat message in the active room.
    SubmitMessage {
        text: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Copy out the current room view.
    Snapshot { reply: oneshot::Sender<RoomSnapshot> },

    /// List the peers the transport sees in the current room.
    Peers { reply: oneshot::Sender<Vec<PeerId>> },

    /// Leave the room and stop the actor.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Handle to a running client. Cheap to clone.
///
/// Once the actor has stopped, every call fails with
/// [`DchatError::ClientClosed`].
#[derive(Clone)]
pub struct ClientHandle {
    local_peer_id: PeerId,
    sender: mpsc::Sender<ClientCommand>,
}

impl ClientHandle {
    pub(crate) fn new(local_peer_id: PeerId, sender: mpsc::Sender<ClientCommand>) -> Self {
        Self {
            local_peer_id,
            sender,
        }
    }

    /// This client's peer id.
    pub fn local_peer_id(&self) -> &PeerId {
        &self.local_peer_id
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Makes `name` the active room. Selecting the current room is a no-op.
    pub async fn select_room(&self, name: impl Into<String>) -> Result<(), DchatError> {
        let name = name.into();
        self.request(|reply| ClientCommand::SelectRoom { name, reply })
            .await?
            .map_err(DchatError::from)
    }

    /// Sends a chat message to everyone in the active room.
    ///
    /// Fails with [`RoomError::SendPrecondition`] while this peer is the
    /// only known member.
    pub async fn submit_message(&self, text: impl Into<String>) -> Result<(), DchatError> {
        let text = text.into();
        self.request(|reply| ClientCommand::SubmitMessage { text, reply })
            .await?
            .map_err(DchatError::from)
    }

    /// The current room name, state, members, and chat log.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, DchatError> {
        self.request(|reply| ClientCommand::Snapshot { reply }).await
    }

    /// Peers the transport sees in the current room. Diagnostic only.
    pub async fn peers(&self) -> Result<Vec<PeerId>, DchatError> {
        self.request(|reply| ClientCommand::Peers { reply }).await
    }

    /// Leaves the current room and stops the actor.
    pub async fn shutdown(&self) -> Result<(), DchatError> {
        self.request(|reply| ClientCommand::Shutdown { reply }).await
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> ClientCommand,
    ) -> Result<R, DchatError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| DchatError::ClientClosed)?;
        reply_rx.await.map_err(|_| DchatError::ClientClosed)
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("local_peer_id", &self.local_peer_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_after_actor_gone_is_client_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = ClientHandle::new(PeerId::from("x"), tx);

        assert!(handle.is_closed());
        assert!(matches!(
            handle.snapshot().await,
            Err(DchatError::ClientClosed)
        ));
    }

    #[tokio::test]
    async fn test_dropped_reply_is_client_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = ClientHandle::new(PeerId::from("x"), tx);

        let actor = tokio::spawn(async move {
            // Take the command and drop it without replying.
            let _ = rx.recv().await;
        });

        assert!(matches!(
            handle.peers().await,
            Err(DchatError::ClientClosed)
        ));
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_room_errors_pass_through() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = ClientHandle::new(PeerId::from("x"), tx);

        tokio::spawn(async move {
            if let Some(ClientCommand::SubmitMessage { reply, .. }) = rx.recv().await {
                let _ = reply.send(Err(RoomError::EmptyMessage));
            }
        });

        let err = handle.submit_message("").await.unwrap_err();
        assert!(matches!(err, DchatError::Room(RoomError::EmptyMessage)));
    }
}
