/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The channel for this topic has been left or closed.
    #[error("channel closed: {0}")]
    Closed(String),

    /// Subscribing to a topic failed.
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
