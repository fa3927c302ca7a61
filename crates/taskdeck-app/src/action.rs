//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use taskdeck_proto::{Conversation, MessageId};

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Open the realtime channel with the stored token.
    Connect,

    /// Close the realtime channel.
    Disconnect,

    /// Open a conversation and load its history.
    SwitchConversation(Conversation),

    /// Send a message to the active conversation.
    SendMessage {
        /// Composer text as typed.
        text: String,
    },

    /// The composer text changed.
    Keystroke,

    /// Acknowledge a message as read.
    MarkAsRead {
        /// Message to acknowledge.
        message_id: MessageId,
    },

    /// End the session and exit.
    Logout,
}
