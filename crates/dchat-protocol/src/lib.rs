//! Wire protocol for dchat rooms.
//!
//! This crate defines what peers say to each other over a room channel:
//!
//! - **Types** ([`Identity`], [`Action`]): the join / confirm-join /
//!   message actions that travel as broadcast payloads.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how actions are turned
//!   into bytes and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing so.
//!
//! The protocol layer knows nothing about channels or membership. It sits
//! between raw broadcast bytes and the room state machine:
//!
//! ```text
//! Transport (bytes) → Protocol (Action) → Room (membership, chat log)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Action, Identity, KnownMembers};

pub use dchat_transport::PeerId;
