//! # dchat
//!
//! Chat rooms with no server. Every room is a broadcast topic on a pub/sub
//! transport; peers find each other with a join / confirm-join handshake
//! and each keeps its own view of who is present and what was said.
//!
//! A [`DchatClient`] runs as a Tokio task that owns all room state. The
//! presentation layer talks to it through a cloneable [`ClientHandle`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dchat::prelude::*;
//!
//! # async fn demo() -> Result<(), DchatError> {
//! let network = MemoryNetwork::new();
//! let alice = DchatClientBuilder::new()
//!     .identity(Identity::new("Alice", "red"))
//!     .build(network.node())
//!     .spawn();
//!
//! let snapshot = alice.snapshot().await?;
//! println!("{:?} has {} member(s)", snapshot.room_name, snapshot.members.len());
//! alice.shutdown().await
//! # }
//! ```

mod client;
mod error;
mod handle;

pub use client::{DchatClient, DchatClientBuilder};
pub use error::DchatError;
pub use handle::ClientHandle;

pub use dchat_protocol as protocol;
pub use dchat_room as room;
pub use dchat_transport as transport;

pub mod prelude {
    pub use crate::{ClientHandle, DchatClient, DchatClientBuilder, DchatError};
    pub use dchat_protocol::{Action, Identity, PeerId};
    pub use dchat_room::{ChatEntry, RoomConfig, RoomError, RoomSnapshot, SessionState};
    pub use dchat_transport::{Transport, TransportChannel};

    #[cfg(feature = "memory")]
    pub use dchat_transport::MemoryNetwork;
}
