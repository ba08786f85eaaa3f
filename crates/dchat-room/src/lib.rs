//! Room membership, chat, and session lifecycle for dchat.
//!
//! A room is a broadcast topic with no server behind it. Every peer works
//! out for itself who else is there, using only the join / confirm-join
//! handshake carried over broadcasts, and keeps its own chat log of what it
//! has received.
//!
//! # Key types
//!
//! - [`MembershipMachine`]: the handshake as a pure reducer
//! - [`ChatLog`]: delivered messages, newest first
//! - [`RoomSession`]: one subscribed room tagged with a [`Generation`]
//! - [`RoomManager`]: selects rooms, feeds events, sends messages
//! - [`SessionState`]: lifecycle state machine
//! - [`RoomConfig`]: default room, timeouts, re-announce interval

mod chat;
mod config;
mod error;
mod manager;
mod membership;
mod session;

pub use chat::{ChatEntry, ChatLog};
pub use config::{DEFAULT_ROOM, RoomConfig, SessionState};
pub use error::RoomError;
pub use manager::{RoomManager, RoomSnapshot, log_event_error};
pub use membership::{Membership, MembershipMachine, RoomEvent};
pub use session::{Generation, RoomSession, SessionEvent};
