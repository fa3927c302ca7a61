//! Connection handshake payloads.

use serde::{Deserialize, Serialize};

/// Engine.IO open handshake sent by the server as the first packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the connection may upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping interval in milliseconds.
    pub ping_interval: u64,
    /// Time the server waits for a pong, in milliseconds.
    pub ping_timeout: u64,
    /// Maximum packet size accepted by the server.
    #[serde(default)]
    pub max_payload: u64,
}

/// Auth object attached to the Socket.IO CONNECT packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAuth {
    /// Bearer token from the stored session.
    pub token: String,
}

/// Body of the server's CONNECT acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAck {
    /// Socket.IO session id.
    pub sid: String,
}

/// Body of CONNECT_ERROR packets and `error` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable reason.
    #[serde(default)]
    pub message: String,
}
