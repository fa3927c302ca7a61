//! Conversation list and the active conversation's message log.
//!
//! The server owns every piece of data here. The client never edits the
//! conversation list, it only replaces it wholesale; the message log is
//! either replaced by a history fetch or appended to by live deliveries.
//!
//! # Stale fetches
//!
//! History fetches are asynchronous. A user who clicks through several
//! conversations quickly can have more than one fetch in flight, and they may
//! resolve in any order. Every fetch is tagged with a [`HistoryRequest`] and
//! only the most recent request for the currently active peer is applied.
//! Everything else is discarded as stale.

use taskdeck_proto::{Conversation, Message, MessageId, UserId, payloads::chat::PrivateMessage};
use tracing::{debug, trace};

use crate::error::CommandError;

/// Tag for one history fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryRequest {
    /// Monotonically increasing per store.
    pub request_id: u64,
    /// Conversation the fetch is for.
    pub peer_id: UserId,
}

/// What happened to a resolved history fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// The log was replaced.
    Applied,
    /// The fetch failed; the log is untouched.
    Failed(String),
    /// A newer fetch or a different conversation superseded this one.
    Stale,
}

/// Result of offering a live message to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingMessage {
    /// Appended to the active log.
    Appended {
        /// Set when the local user is the recipient of an unread message and
        /// a read receipt should be sent.
        mark_read: Option<MessageId>,
    },
    /// Not part of the active conversation. Unread counts for other
    /// conversations arrive through the conversation list instead.
    Ignored,
}

/// Client-side view of the chat data.
///
/// # Invariants
///
/// - Between history replacements the log only grows, by appending at the
///   end. Nothing is reordered or removed.
/// - `is_read` on a logged message only ever goes from `false` to `true`.
/// - At most one history request is outstanding, the latest one.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    me: UserId,
    conversations: Vec<Conversation>,
    active: Option<Conversation>,
    messages: Vec<Message>,
    next_request_id: u64,
    pending: Option<HistoryRequest>,
}

impl ConversationStore {
    /// Empty store for the local user `me`.
    #[must_use]
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            conversations: Vec::new(),
            active: None,
            messages: Vec::new(),
            next_request_id: 0,
            pending: None,
        }
    }

    /// Local user.
    #[must_use]
    pub fn me(&self) -> &UserId {
        &self.me
    }

    /// Server-ordered conversation list.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Conversation currently open, if any.
    #[must_use]
    pub fn active(&self) -> Option<&Conversation> {
        self.active.as_ref()
    }

    /// Peer of the open conversation.
    #[must_use]
    pub fn active_peer(&self) -> Option<&UserId> {
        self.active.as_ref().map(|c| &c.peer_id)
    }

    /// Message log of the open conversation.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a history fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace the conversation list with the server's.
    ///
    /// The open conversation keeps its identity but picks up the fresh
    /// snapshot (name, preview, unread count) when the peer is still listed.
    pub fn replace_conversations(&mut self, conversations: Vec<Conversation>) {
        trace!(count = conversations.len(), "conversation list replaced");
        self.conversations = conversations;

        if let Some(active) = &mut self.active
            && let Some(fresh) = self.conversations.iter().find(|c| c.peer_id == active.peer_id)
        {
            active.clone_from(fresh);
        }
    }

    /// Open `conversation` and tag a history fetch for it.
    ///
    /// Opening a different peer clears the visible log immediately. Re-opening
    /// the same peer keeps the current log on screen until the fetch resolves.
    pub fn switch_to(&mut self, conversation: Conversation) -> HistoryRequest {
        if self.active_peer() != Some(&conversation.peer_id) {
            self.messages.clear();
        }

        self.next_request_id += 1;
        let request = HistoryRequest {
            request_id: self.next_request_id,
            peer_id: conversation.peer_id.clone(),
        };

        debug!(peer = %request.peer_id, request_id = request.request_id, "switching conversation");
        self.active = Some(conversation);
        self.pending = Some(request.clone());
        request
    }

    /// Resolve a history fetch.
    pub fn on_history(
        &mut self,
        request: &HistoryRequest,
        result: Result<Vec<Message>, String>,
    ) -> HistoryOutcome {
        let current = self.pending.as_ref() == Some(request)
            && self.active_peer() == Some(&request.peer_id);
        if !current {
            debug!(
                peer = %request.peer_id,
                request_id = request.request_id,
                "discarding stale history"
            );
            return HistoryOutcome::Stale;
        }

        self.pending = None;
        match result {
            Ok(messages) => {
                trace!(count = messages.len(), "history applied");
                self.messages = messages;
                HistoryOutcome::Applied
            },
            Err(reason) => HistoryOutcome::Failed(reason),
        }
    }

    /// Offer a live `messageReceived` delivery.
    ///
    /// Appended only when it belongs to the open conversation. Our own sends
    /// come back through here too; that echo is the only way a sent message
    /// enters the log.
    pub fn on_message(&mut self, message: Message) -> IncomingMessage {
        let Some(peer) = self.active_peer() else {
            return IncomingMessage::Ignored;
        };
        if !message.is_between(&self.me, peer) {
            return IncomingMessage::Ignored;
        }

        let mark_read = (message.receiver_id == self.me && !message.is_read)
            .then(|| message.id.clone())
            .flatten();

        self.messages.push(message);
        IncomingMessage::Appended { mark_read }
    }

    /// Apply a `messageRead` receipt. Returns true if a logged message flipped
    /// to read.
    pub fn on_read(&mut self, message_id: &MessageId) -> bool {
        let Some(message) =
            self.messages.iter_mut().find(|m| m.id.as_ref() == Some(message_id) && !m.is_read)
        else {
            return false;
        };

        message.is_read = true;
        true
    }

    /// Validate a send and build its payload.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - `CommandError::EmptyMessage` if `text` is blank after trimming
    /// - `CommandError::NoActiveConversation` if nothing is open
    /// - `CommandError::NotConnected` if the channel is down
    pub fn check_send(&self, text: &str, connected: bool) -> Result<PrivateMessage, CommandError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::EmptyMessage);
        }
        let peer = self.active_peer().ok_or(CommandError::NoActiveConversation)?;
        if !connected {
            return Err(CommandError::NotConnected);
        }

        Ok(PrivateMessage { receiver_id: peer.clone(), text: text.to_string() })
    }

    /// Drop everything except the local user's identity.
    pub fn clear(&mut self) {
        self.conversations.clear();
        self.active = None;
        self.messages.clear();
        self.pending = None;
    }
}
