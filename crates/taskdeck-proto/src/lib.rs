//! Taskdeck wire protocol
//!
//! Text framing for the Socket.IO event channel used by the chat backend, and
//! the typed payloads carried over it.
//!
//! # Layers
//!
//! - [`EnginePacket`]: Engine.IO v4 transport packets (open, ping, message...)
//! - [`SocketPacket`]: Socket.IO v5 packets carried inside Engine.IO messages
//! - [`ServerEvent`] / [`ClientCommand`]: typed chat events, one per event name
//!
//! Only text packets are supported. The chat backend never sends binary
//! attachments, so binary packet types are rejected at decode time.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod packet;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use packet::{EnginePacket, PacketKind, SocketPacket};
pub use payloads::{
    ClientCommand, ServerEvent,
    chat::{Conversation, LastMessage, Message, MessageId, UserId},
};
