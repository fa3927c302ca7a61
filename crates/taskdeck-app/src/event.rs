//! Application input events.
//!
//! This module defines [`AppEvent`], the comprehensive set of inputs that drive
//! the [`crate::App`] state machine.
//!
//! Events originate from two distinct sources:
//! - User interactions (Keyboard, Resize) and system ticks.
//! - Session notifications translated from the underlying client.

use taskdeck_client::ConnectionState;
use taskdeck_proto::{Conversation, Message, MessageId, UserId};

use crate::KeyInput;

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Connection state changed.
    ConnectionChanged(ConnectionState),

    /// Server replaced the conversation list.
    ConversationsChanged(Vec<Conversation>),

    /// History for a conversation was requested.
    HistoryLoading {
        /// Conversation being loaded.
        peer_id: UserId,
    },

    /// History arrived for the active conversation.
    HistoryReplaced {
        /// Active peer.
        peer_id: UserId,
        /// Full ordered log.
        messages: Vec<Message>,
    },

    /// History could not be loaded. The previous log stays.
    HistoryFailed {
        /// Error description.
        message: String,
    },

    /// Live message for the active conversation.
    MessageAppended(Message),

    /// A message in the active log was read.
    MessageRead {
        /// Message that flipped to read.
        message_id: MessageId,
    },

    /// A peer went online or offline.
    PresenceChanged {
        /// Affected peer.
        peer_id: UserId,
        /// New status.
        online: bool,
    },

    /// A peer started or stopped typing to us.
    TypingChanged {
        /// Affected peer.
        peer_id: UserId,
        /// New state.
        typing: bool,
    },

    /// Error occurred.
    Error {
        /// Error description.
        message: String,
    },
}
