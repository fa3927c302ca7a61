//! Typed chat events.
//!
//! Socket.IO events are `[name, arg]` arrays. Each direction has one enum with
//! a variant per event name: [`ServerEvent`] for what the backend pushes and
//! [`ClientCommand`] for what the client emits.
//!
//! # Invariants
//!
//! - Each variant maps to exactly one event name (enforced by match
//!   exhaustiveness in `name()`).
//! - Unknown inbound names decode to [`ServerEvent::Unknown`] rather than an
//!   error, so a newer server cannot break an older client.

pub mod chat;
pub mod presence;
pub mod session;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use self::{
    chat::{Conversation, Message, PrivateMessage},
    presence::{ReadReceipt, TypingNotice, UserStatus, UserTyping},
    session::ErrorPayload,
};
use crate::{
    errors::{ProtocolError, Result},
    packet::{PacketKind, SocketPacket},
};

/// Decode the first event argument into a payload type.
fn decode_arg<T: DeserializeOwned>(name: &str, arg: Value) -> Result<T> {
    serde_json::from_value(arg).map_err(|e| ProtocolError::InvalidPayload {
        event: name.to_string(),
        reason: e.to_string(),
    })
}

/// Encode a payload into an event argument.
fn encode_arg<T: Serialize>(payload: &T) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| ProtocolError::JsonEncode(e.to_string()))
}

/// First argument of an EVENT packet, checking the packet kind.
fn event_parts(packet: &SocketPacket) -> Result<(&str, Value)> {
    if packet.kind != PacketKind::Event {
        return Err(ProtocolError::UnexpectedKind {
            expected: PacketKind::Event.name(),
            actual: packet.kind.name(),
        });
    }
    let name = packet.event_name().ok_or(ProtocolError::MissingEventName)?;
    let arg = packet.event_args().first().cloned().unwrap_or(Value::Null);
    Ok((name, arg))
}

/// Events pushed by the chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Full replacement of the conversation list.
    ConversationsUpdated(Vec<Conversation>),
    /// New message delivered (including the echo of our own sends).
    MessageReceived(Message),
    /// A message was read by its recipient.
    MessageRead(ReadReceipt),
    /// A user went online or offline.
    UserStatus(UserStatus),
    /// A user started or stopped typing to us.
    UserTyping(UserTyping),
    /// Server-side error for this socket.
    Error(ErrorPayload),
    /// Event name this client does not understand.
    Unknown {
        /// Raw event name.
        name: String,
    },
}

impl ServerEvent {
    /// `conversationsUpdated` event name.
    pub const CONVERSATIONS_UPDATED: &'static str = "conversationsUpdated";
    /// `messageReceived` event name.
    pub const MESSAGE_RECEIVED: &'static str = "messageReceived";
    /// `messageRead` event name.
    pub const MESSAGE_READ: &'static str = "messageRead";
    /// `userStatus` event name.
    pub const USER_STATUS: &'static str = "userStatus";
    /// `userTyping` event name.
    pub const USER_TYPING: &'static str = "userTyping";
    /// `error` event name.
    pub const ERROR: &'static str = "error";

    /// Wire name of this event.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ConversationsUpdated(_) => Self::CONVERSATIONS_UPDATED,
            Self::MessageReceived(_) => Self::MESSAGE_RECEIVED,
            Self::MessageRead(_) => Self::MESSAGE_READ,
            Self::UserStatus(_) => Self::USER_STATUS,
            Self::UserTyping(_) => Self::USER_TYPING,
            Self::Error(_) => Self::ERROR,
            Self::Unknown { name } => name.as_str(),
        }
    }

    /// Decode from a Socket.IO EVENT packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedKind` if the packet is not an EVENT
    /// - `ProtocolError::MissingEventName` if the body has no name
    /// - `ProtocolError::InvalidPayload` if the argument has the wrong shape
    pub fn from_packet(packet: &SocketPacket) -> Result<Self> {
        let (name, arg) = event_parts(packet)?;

        let event = match name {
            Self::CONVERSATIONS_UPDATED => Self::ConversationsUpdated(decode_arg(name, arg)?),
            Self::MESSAGE_RECEIVED => Self::MessageReceived(decode_arg(name, arg)?),
            Self::MESSAGE_READ => Self::MessageRead(decode_arg(name, arg)?),
            Self::USER_STATUS => Self::UserStatus(decode_arg(name, arg)?),
            Self::USER_TYPING => Self::UserTyping(decode_arg(name, arg)?),
            Self::ERROR => match arg {
                Value::String(message) => Self::Error(ErrorPayload { message }),
                other => Self::Error(decode_arg(name, other)?),
            },
            other => Self::Unknown { name: other.to_string() },
        };
        Ok(event)
    }

    /// Encode into a Socket.IO EVENT packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if the payload cannot be serialized
    pub fn to_packet(&self) -> Result<SocketPacket> {
        let arg = match self {
            Self::ConversationsUpdated(list) => Some(encode_arg(list)?),
            Self::MessageReceived(message) => Some(encode_arg(message)?),
            Self::MessageRead(receipt) => Some(encode_arg(receipt)?),
            Self::UserStatus(status) => Some(encode_arg(status)?),
            Self::UserTyping(typing) => Some(encode_arg(typing)?),
            Self::Error(error) => Some(encode_arg(error)?),
            Self::Unknown { .. } => None,
        };
        Ok(SocketPacket::event(self.name(), arg))
    }
}

/// Commands the client emits to the chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Send a private message.
    PrivateMessage(PrivateMessage),
    /// Typing indicator for a peer.
    Typing(TypingNotice),
    /// Read receipt for a message.
    MarkAsRead(ReadReceipt),
    /// Ask for the authoritative conversation list.
    GetConversations,
}

impl ClientCommand {
    /// `privateMessage` event name.
    pub const PRIVATE_MESSAGE: &'static str = "privateMessage";
    /// `typing` event name.
    pub const TYPING: &'static str = "typing";
    /// `markAsRead` event name.
    pub const MARK_AS_READ: &'static str = "markAsRead";
    /// `getConversations` event name.
    pub const GET_CONVERSATIONS: &'static str = "getConversations";

    /// Wire name of this command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PrivateMessage(_) => Self::PRIVATE_MESSAGE,
            Self::Typing(_) => Self::TYPING,
            Self::MarkAsRead(_) => Self::MARK_AS_READ,
            Self::GetConversations => Self::GET_CONVERSATIONS,
        }
    }

    /// Encode into a Socket.IO EVENT packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if the payload cannot be serialized
    pub fn to_packet(&self) -> Result<SocketPacket> {
        let arg = match self {
            Self::PrivateMessage(message) => Some(encode_arg(message)?),
            Self::Typing(notice) => Some(encode_arg(notice)?),
            Self::MarkAsRead(receipt) => Some(encode_arg(receipt)?),
            Self::GetConversations => None,
        };
        Ok(SocketPacket::event(self.name(), arg))
    }

    /// Decode from a Socket.IO EVENT packet (server side of the protocol).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedKind` if the packet is not an EVENT
    /// - `ProtocolError::MissingEventName` if the body has no name
    /// - `ProtocolError::InvalidPayload` for unknown names or bad arguments
    pub fn from_packet(packet: &SocketPacket) -> Result<Self> {
        let (name, arg) = event_parts(packet)?;

        match name {
            Self::PRIVATE_MESSAGE => Ok(Self::PrivateMessage(decode_arg(name, arg)?)),
            Self::TYPING => Ok(Self::Typing(decode_arg(name, arg)?)),
            Self::MARK_AS_READ => Ok(Self::MarkAsRead(decode_arg(name, arg)?)),
            Self::GET_CONVERSATIONS => Ok(Self::GetConversations),
            other => Err(ProtocolError::InvalidPayload {
                event: other.to_string(),
                reason: "unknown command".to_string(),
            }),
        }
    }
}
