//! Engine.IO and Socket.IO text packets.
//!
//! The event channel is two framings deep. Each WebSocket text message is one
//! [`EnginePacket`]; Engine.IO `message` packets carry one [`SocketPacket`].
//!
//! ```text
//! "42[\"typing\",{\"isTyping\":true,\"receiverId\":\"u7\"}]"
//!  │└─ Socket.IO EVENT (2), default namespace, no ack id, JSON array body
//!  └── Engine.IO MESSAGE (4)
//! ```
//!
//! # Invariants
//!
//! - Decoding never panics. Any malformed text yields a [`ProtocolError`].
//! - The default namespace `/` is never written on the wire; a decoded packet
//!   without a namespace prefix reports `/`.

use std::fmt::Write as _;

use serde_json::Value;

use crate::{
    errors::{ProtocolError, Result},
    payloads::session::Handshake,
};

/// Namespace used when a packet carries no `/nsp,` prefix.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO v4 packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// Server handshake, first packet on a new connection.
    Open(Handshake),
    /// Transport is closing.
    Close,
    /// Heartbeat probe. The server pings, the client must pong.
    Ping(String),
    /// Heartbeat reply.
    Pong(String),
    /// Carries one Socket.IO packet.
    Message(String),
    /// Transport upgrade (unused over a direct WebSocket).
    Upgrade,
    /// No-op filler.
    Noop,
}

impl EnginePacket {
    /// Decode one Engine.IO packet from WebSocket text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EmptyPacket` for empty input
    /// - `ProtocolError::BinaryUnsupported` for base64 binary packets
    /// - `ProtocolError::UnknownEngineType` for any other leading byte
    /// - `ProtocolError::JsonDecode` if the open handshake is malformed
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::EmptyPacket)?;
        let body = chars.as_str();

        match kind {
            '0' => serde_json::from_str(body)
                .map(Self::Open)
                .map_err(|e| ProtocolError::JsonDecode(e.to_string())),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(body.to_string())),
            '3' => Ok(Self::Pong(body.to_string())),
            '4' => Ok(Self::Message(body.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            'b' => Err(ProtocolError::BinaryUnsupported),
            other => Err(ProtocolError::UnknownEngineType(other)),
        }
    }

    /// Encode to WebSocket text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if the handshake cannot be serialized
    pub fn encode(&self) -> Result<String> {
        let text = match self {
            Self::Open(handshake) => {
                let json = serde_json::to_string(handshake)
                    .map_err(|e| ProtocolError::JsonEncode(e.to_string()))?;
                format!("0{json}")
            },
            Self::Close => "1".to_string(),
            Self::Ping(probe) => format!("2{probe}"),
            Self::Pong(probe) => format!("3{probe}"),
            Self::Message(body) => format!("4{body}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        };
        Ok(text)
    }
}

/// Socket.IO packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Namespace connect request (client) or acknowledgement (server).
    Connect,
    /// Namespace disconnect.
    Disconnect,
    /// Named event with JSON arguments.
    Event,
    /// Acknowledgement of an event carrying an ack id.
    Ack,
    /// Namespace connect was refused (e.g. bad auth token).
    ConnectError,
}

impl PacketKind {
    /// Wire digit for this kind.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
        }
    }

    /// Human-readable name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
            Self::Event => "EVENT",
            Self::Ack => "ACK",
            Self::ConnectError => "CONNECT_ERROR",
        }
    }

    fn from_char(c: char) -> Result<Self> {
        match c {
            '0' => Ok(Self::Connect),
            '1' => Ok(Self::Disconnect),
            '2' => Ok(Self::Event),
            '3' => Ok(Self::Ack),
            '4' => Ok(Self::ConnectError),
            '5' | '6' => Err(ProtocolError::BinaryUnsupported),
            other => Err(ProtocolError::UnknownSocketType(other)),
        }
    }
}

/// Socket.IO v5 packet.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    /// Packet type.
    pub kind: PacketKind,
    /// Namespace, `/` when absent on the wire.
    pub namespace: String,
    /// Acknowledgement id. `None` if the sender does not expect an ack.
    pub ack_id: Option<u64>,
    /// JSON body. `None` if the packet carries no data.
    pub data: Option<Value>,
}

impl SocketPacket {
    /// Packet on the default namespace.
    #[must_use]
    pub fn new(kind: PacketKind, data: Option<Value>) -> Self {
        Self { kind, namespace: DEFAULT_NAMESPACE.to_string(), ack_id: None, data }
    }

    /// CONNECT with an optional auth object.
    #[must_use]
    pub fn connect(auth: Option<Value>) -> Self {
        Self::new(PacketKind::Connect, auth)
    }

    /// DISCONNECT on the default namespace.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(PacketKind::Disconnect, None)
    }

    /// CONNECT_ERROR with a `{"message": ...}` body.
    #[must_use]
    pub fn connect_error(message: &str) -> Self {
        Self::new(PacketKind::ConnectError, Some(serde_json::json!({ "message": message })))
    }

    /// EVENT with a name and at most one argument.
    #[must_use]
    pub fn event(name: &str, arg: Option<Value>) -> Self {
        let mut args = vec![Value::String(name.to_string())];
        args.extend(arg);
        Self::new(PacketKind::Event, Some(Value::Array(args)))
    }

    /// Event name. `None` if this is not a well-formed EVENT packet.
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        if self.kind != PacketKind::Event {
            return None;
        }
        match &self.data {
            Some(Value::Array(items)) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }

    /// Event arguments following the name. Empty for non-EVENT packets.
    #[must_use]
    pub fn event_args(&self) -> &[Value] {
        match (&self.kind, &self.data) {
            (PacketKind::Event, Some(Value::Array(items))) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// Decode from the body of an Engine.IO `message` packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EmptyPacket` for empty input
    /// - `ProtocolError::BinaryUnsupported` for binary event/ack types
    /// - `ProtocolError::UnknownSocketType` for any other leading byte
    /// - `ProtocolError::InvalidAckId` if the ack id overflows `u64`
    /// - `ProtocolError::JsonDecode` if the body is not valid JSON
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = PacketKind::from_char(chars.next().ok_or(ProtocolError::EmptyPacket)?)?;
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(idx) => {
                    let namespace = rest[..idx].to_string();
                    rest = &rest[idx + 1..];
                    namespace
                },
                None => std::mem::take(&mut rest).to_string(),
            }
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let (raw, tail) = rest.split_at(digits);
            rest = tail;
            Some(raw.parse::<u64>().map_err(|_| ProtocolError::InvalidAckId(raw.to_string()))?)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest).map_err(|e| ProtocolError::JsonDecode(e.to_string()))?)
        };

        Ok(Self { kind, namespace, ack_id, data })
    }

    /// Encode to the body of an Engine.IO `message` packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if the data cannot be serialized
    pub fn encode(&self) -> Result<String> {
        let mut out = String::new();
        out.push(self.kind.as_char());

        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }

        if let Some(ack_id) = self.ack_id {
            let _ = write!(out, "{ack_id}");
        }

        if let Some(data) = &self.data {
            let json =
                serde_json::to_string(data).map_err(|e| ProtocolError::JsonEncode(e.to_string()))?;
            out.push_str(&json);
        }

        Ok(out)
    }

    /// Wrap into an Engine.IO `message` packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if the data cannot be serialized
    pub fn into_engine(self) -> Result<EnginePacket> {
        self.encode().map(EnginePacket::Message)
    }
}
