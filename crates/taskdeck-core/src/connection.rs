//! Realtime connection lifecycle.
//!
//! Tracks the single authenticated channel to the chat backend. Uses the
//! action pattern: methods take transport notifications as input and return
//! actions for the driver to execute, so the machine itself never touches a
//! socket.
//!
//! # State Machine
//!
//! ```text
//!                  connect(token)              transport open
//! ┌──────────────┐ ─────────────> ┌────────────┐ ───────────> ┌───────────┐
//! │ Disconnected │                │ Connecting │              │ Connected │
//! └──────────────┘ <───────────── └────────────┘              └───────────┘
//!        ^           disconnect()        │ error / close             │
//!        │                               ↓                           │
//!        │         disconnect()     ┌─────────┐   error / close      │
//!        └──────────────────────────│ Errored │<─────────────────────┘
//!                                   └─────────┘
//! ```
//!
//! `Errored` is only left through an explicit `connect` or `disconnect`.
//! There is no automatic reconnect.

use taskdeck_proto::ClientCommand;
use tracing::{debug, warn};

/// Reason recorded when `connect` is called without a usable token.
pub const MISSING_TOKEN: &str = "missing auth token";

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a transport authenticated with this token.
    Open {
        /// Bearer token from the stored session.
        token: String,
    },

    /// Close the transport and release its resources.
    Close,

    /// Emit a command on the open channel.
    Send(ClientCommand),
}

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No channel and none requested.
    #[default]
    Disconnected,
    /// Transport requested, waiting for the server to accept it.
    Connecting,
    /// Server accepted the channel.
    Connected,
    /// The last attempt failed or the channel dropped.
    Errored {
        /// Human-readable reason.
        message: String,
    },
}

impl ConnectionState {
    /// Short lowercase label for status lines and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Errored { .. } => "error",
        }
    }
}

/// Connection state machine.
///
/// # Invariants
///
/// - At most one transport is ever requested: `connect` is a no-op while
///   `Connecting` or `Connected`.
/// - Entering `Connected` always requests the conversation list.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    state: ConnectionState,
}

impl Connection {
    /// Create a connection in [`ConnectionState::Disconnected`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// True while the server has accepted the channel.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Request a channel authenticated with `token`.
    ///
    /// A missing or blank token moves straight to `Errored` without opening
    /// anything.
    pub fn connect(&mut self, token: Option<&str>) -> Vec<ConnectionAction> {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected) {
            debug!(state = self.state.label(), "connect ignored, channel already requested");
            return Vec::new();
        }

        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => {
                self.state = ConnectionState::Connecting;
                vec![ConnectionAction::Open { token: token.to_string() }]
            },
            None => {
                warn!("connect requested without a session token");
                self.state = ConnectionState::Errored { message: MISSING_TOKEN.to_string() };
                Vec::new()
            },
        }
    }

    /// Tear the channel down. Safe to call in any state.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        let previous = std::mem::take(&mut self.state);
        match previous {
            ConnectionState::Disconnected => Vec::new(),
            _ => vec![ConnectionAction::Close],
        }
    }

    /// The server accepted the channel.
    ///
    /// Ignored unless an attempt is in flight, so a late acknowledgement for
    /// a torn-down attempt cannot resurrect it.
    pub fn on_open(&mut self) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting {
            debug!(state = self.state.label(), "ignoring open for stale attempt");
            return Vec::new();
        }

        self.state = ConnectionState::Connected;
        vec![ConnectionAction::Send(ClientCommand::GetConversations)]
    }

    /// The server rejected the handshake (Socket.IO `CONNECT_ERROR`).
    pub fn on_connect_error(&mut self, message: &str) -> Vec<ConnectionAction> {
        let reason = if message.is_empty() { "connection rejected" } else { message };
        self.on_error(reason)
    }

    /// Transport error or server `error` event.
    pub fn on_error(&mut self, message: impl Into<String>) -> Vec<ConnectionAction> {
        let message = message.into();
        warn!(state = self.state.label(), %message, "connection error");

        let had_transport =
            matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected);
        self.state = ConnectionState::Errored { message };

        if had_transport { vec![ConnectionAction::Close] } else { Vec::new() }
    }

    /// The transport closed.
    ///
    /// A close while `Connecting` or `Connected` was not asked for and moves
    /// to `Errored`. Any other close is the tail end of a teardown.
    pub fn on_closed(&mut self, reason: impl Into<String>) {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected) {
            let message = reason.into();
            warn!(%message, "channel closed unexpectedly");
            self.state = ConnectionState::Errored { message };
        }
    }
}
