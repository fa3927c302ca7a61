//! Error types for rejected user commands.
//!
//! State machines in this crate never fail on inbound server data: unknown
//! or irrelevant events are ignored. The only errors are commands the local
//! user issues in a state where they cannot be honoured.

use thiserror::Error;

/// A user command was rejected before anything reached the wire.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Message text was empty after trimming whitespace.
    #[error("message is empty")]
    EmptyMessage,

    /// No conversation is open.
    #[error("no active conversation")]
    NoActiveConversation,

    /// The realtime channel is not connected.
    #[error("not connected")]
    NotConnected,
}
