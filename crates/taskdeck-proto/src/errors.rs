//! Protocol error types.
//!
//! Every decode path returns [`ProtocolError`] instead of panicking. Malformed
//! input from the network is expected and must never take down the client.

use thiserror::Error;

/// Errors produced while encoding or decoding wire packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet text was empty.
    #[error("empty packet")]
    EmptyPacket,

    /// Engine.IO packet type byte is not recognised.
    #[error("unknown engine packet type: {0:?}")]
    UnknownEngineType(char),

    /// Socket.IO packet type byte is not recognised.
    #[error("unknown socket packet type: {0:?}")]
    UnknownSocketType(char),

    /// Binary packets (Socket.IO types 5 and 6) are not supported.
    #[error("binary packets are not supported")]
    BinaryUnsupported,

    /// Ack id is present but does not fit in a `u64`.
    #[error("invalid ack id: {0}")]
    InvalidAckId(String),

    /// JSON body could not be parsed.
    #[error("JSON decode failed: {0}")]
    JsonDecode(String),

    /// JSON body could not be produced.
    #[error("JSON encode failed: {0}")]
    JsonEncode(String),

    /// Event packet data is not an array starting with the event name.
    #[error("event packet has no name")]
    MissingEventName,

    /// Packet is well-formed but of the wrong kind for the requested decode.
    #[error("unexpected packet kind: expected {expected}, got {actual}")]
    UnexpectedKind {
        /// Kind the caller asked for.
        expected: &'static str,
        /// Kind that was actually decoded.
        actual: &'static str,
    },

    /// Event data does not match the payload shape for its name.
    #[error("invalid payload for event {event}: {reason}")]
    InvalidPayload {
        /// Event name.
        event: String,
        /// Underlying serde error.
        reason: String,
    },
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
