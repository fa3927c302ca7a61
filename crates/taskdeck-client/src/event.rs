//! Client events and actions.

use taskdeck_core::{ConnectionState, HistoryRequest};
use taskdeck_proto::{ClientCommand, Conversation, Message, MessageId, ServerEvent, UserId};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Reporting transport lifecycle and inbound server events
/// - Delivering history fetch results
/// - Driving time forward via ticks
/// - Forwarding user intents (send, switch, keystrokes)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulated clocks.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// User asked to connect with the session token.
    Connect,

    /// User asked to disconnect.
    Disconnect,

    /// The server accepted the Socket.IO handshake.
    TransportOpened,

    /// The handshake was rejected or the transport failed.
    TransportFailed {
        /// Human-readable reason.
        message: String,
    },

    /// The transport closed.
    TransportClosed {
        /// Close reason reported by the transport.
        reason: String,
    },

    /// Typed event pushed by the server.
    EventReceived(ServerEvent),

    /// A history fetch resolved.
    HistoryFetched {
        /// Request id from [`ClientAction::FetchHistory`].
        request_id: u64,
        /// Peer the fetch was for.
        peer_id: UserId,
        /// Ordered history, or a reason on failure.
        result: Result<Vec<Message>, String>,
    },

    /// User opened a conversation.
    SwitchConversation(Conversation),

    /// User submitted the composer.
    SendMessage {
        /// Raw composer text, trimmed by the client.
        text: String,
    },

    /// User pressed a key in the composer.
    Keystroke,

    /// User explicitly marked a message as read.
    MarkAsRead {
        /// Message to acknowledge.
        message_id: MessageId,
    },

    /// Time tick for deadline processing.
    ///
    /// The caller should send ticks periodically so typing deadlines can
    /// fire.
    Tick {
        /// Current time from the environment.
        now: I,
    },
}

/// Category of a user-visible error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Handshake rejected or channel dropped. Recover with a new connect.
    Connection,
    /// History fetch failed. Recover by switching to the conversation again.
    Fetch,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open the realtime transport authenticated with `token`.
    OpenTransport {
        /// Bearer token.
        token: String,
    },

    /// Close the realtime transport.
    CloseTransport,

    /// Emit a command on the realtime channel.
    Send(ClientCommand),

    /// Fetch history and report back with [`ClientEvent::HistoryFetched`].
    FetchHistory(HistoryRequest),

    /// Connection state changed.
    ConnectionChanged(ConnectionState),

    /// The conversation list was replaced.
    ConversationsChanged(Vec<Conversation>),

    /// The active conversation's log was replaced by fetched history.
    HistoryReplaced {
        /// Active peer.
        peer_id: UserId,
        /// New log.
        messages: Vec<Message>,
    },

    /// A live message was appended to the active log.
    MessageAppended(Message),

    /// A logged message was marked read.
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

    /// A peer started or stopped typing.
    TypingChanged {
        /// Affected peer.
        peer_id: UserId,
        /// New state.
        typing: bool,
    },

    /// User-visible error.
    Error {
        /// Error category.
        kind: ErrorKind,
        /// Human-readable message.
        message: String,
    },
}

/// Notifications a transport produces.
///
/// Drivers collect these from the realtime channel and the history fetcher
/// and feed them to the client as [`ClientEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake accepted.
    Opened,
    /// Handshake rejected or transport error.
    Failed {
        /// Human-readable reason.
        message: String,
    },
    /// Transport closed.
    Closed {
        /// Close reason.
        reason: String,
    },
    /// Server event.
    Received(ServerEvent),
    /// History fetch resolved.
    HistoryFetched {
        /// The request being answered.
        request: HistoryRequest,
        /// Ordered history, or a reason on failure.
        result: Result<Vec<Message>, String>,
    },
}

impl<I> From<TransportEvent> for ClientEvent<I> {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Opened => Self::TransportOpened,
            TransportEvent::Failed { message } => Self::TransportFailed { message },
            TransportEvent::Closed { reason } => Self::TransportClosed { reason },
            TransportEvent::Received(event) => Self::EventReceived(event),
            TransportEvent::HistoryFetched { request, result } => Self::HistoryFetched {
                request_id: request.request_id,
                peer_id: request.peer_id,
                result,
            },
        }
    }
}
