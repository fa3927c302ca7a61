//! In-memory chat backend for simulation.
//!
//! `SimServer` plays the part of the realtime server and the history API at
//! once. It authenticates tokens, tracks who is online, stores messages and
//! queues the [`TransportEvent`]s each connected user would receive. Tests
//! drive it synchronously through a [`SharedSimServer`] handle shared by all
//! simulated clients.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, TimeDelta, Utc};
use taskdeck_client::TransportEvent;
use taskdeck_proto::{
    ClientCommand, Conversation, LastMessage, Message, MessageId, ServerEvent, UserId,
    payloads::{
        chat::PrivateMessage,
        presence::{
            ReadReceipt, STATUS_OFFLINE, STATUS_ONLINE, TypingNotice, UserStatus, UserTyping,
        },
    },
};
use tracing::{debug, trace};

/// Shared handle to a simulation server.
pub type SharedSimServer = Arc<Mutex<SimServer>>;

/// Create a fresh server behind a shared handle.
pub fn create_shared_server() -> SharedSimServer {
    Arc::new(Mutex::new(SimServer::new()))
}

/// Registered account.
#[derive(Debug, Clone)]
struct Account {
    name: String,
    token: String,
}

/// Simulated chat backend.
///
/// Message ids are `m1`, `m2`, ... and message `n` is stamped `n` seconds
/// after the Unix epoch, so every run produces identical data.
#[derive(Debug, Default)]
pub struct SimServer {
    accounts: BTreeMap<UserId, Account>,
    online: BTreeSet<UserId>,
    messages: Vec<Message>,
    outboxes: HashMap<UserId, VecDeque<TransportEvent>>,
    history_failure: Option<String>,
}

impl SimServer {
    /// Create an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account that can authenticate with `token`.
    pub fn register(&mut self, user: &str, name: &str, token: &str) {
        self.accounts
            .insert(UserId::from(user), Account { name: name.to_string(), token: token.into() });
    }

    /// User owning `token`, if any.
    pub fn authenticate(&self, token: &str) -> Option<UserId> {
        self.accounts.iter().find(|(_, account)| account.token == token).map(|(id, _)| id.clone())
    }

    /// Accept a realtime connection.
    ///
    /// The user receives `Opened` followed by the presence of everyone
    /// already online; everyone else learns the user came online.
    ///
    /// # Errors
    ///
    /// Returns the rejection message for an unknown token.
    pub fn connect(&mut self, token: &str) -> Result<UserId, String> {
        let Some(user) = self.authenticate(token) else {
            debug!("rejecting unknown token");
            return Err("Authentication error".to_string());
        };

        self.online.insert(user.clone());
        self.outboxes.insert(user.clone(), VecDeque::from([TransportEvent::Opened]));

        let peers: Vec<UserId> = self.online.iter().filter(|u| **u != user).cloned().collect();
        for peer in &peers {
            self.push(&user, ServerEvent::UserStatus(status(peer, true)));
        }
        self.broadcast(&user, &ServerEvent::UserStatus(status(&user, true)));

        debug!(%user, "connected");
        Ok(user)
    }

    /// Client-initiated disconnect. Everyone else learns the user went
    /// offline.
    pub fn disconnect(&mut self, user: &UserId) {
        if !self.online.remove(user) {
            return;
        }
        self.outboxes.remove(user);
        self.broadcast(user, &ServerEvent::UserStatus(status(user, false)));
        debug!(%user, "disconnected");
    }

    /// Server-side drop of the user's channel.
    ///
    /// Pending deliveries are lost and the user's transport reports `Closed`.
    pub fn drop_connection(&mut self, user: &UserId, reason: &str) {
        if !self.online.contains(user) {
            return;
        }
        self.disconnect(user);
        self.outboxes
            .insert(user.clone(), VecDeque::from([TransportEvent::Closed { reason: reason.into() }]));
    }

    /// Whether `user` has a live channel.
    pub fn is_online(&self, user: &UserId) -> bool {
        self.online.contains(user)
    }

    /// Handle a command emitted by `from`.
    pub fn handle_command(&mut self, from: &UserId, command: ClientCommand) {
        trace!(%from, ?command, "command");
        if !self.online.contains(from) {
            debug!(%from, "command on closed channel dropped");
            return;
        }

        match command {
            ClientCommand::PrivateMessage(PrivateMessage { receiver_id, text }) => {
                let message = self.store(from, &receiver_id, &text);
                for user in [from, &receiver_id] {
                    self.push(user, ServerEvent::MessageReceived(message.clone()));
                }
                for user in [from, &receiver_id] {
                    let list = self.conversations_for(user);
                    self.push(user, ServerEvent::ConversationsUpdated(list));
                }
            },
            ClientCommand::Typing(TypingNotice { receiver_id, is_typing }) => {
                let event = UserTyping { user_id: from.clone(), is_typing };
                self.push(&receiver_id, ServerEvent::UserTyping(event));
            },
            ClientCommand::MarkAsRead(ReadReceipt { message_id }) => {
                self.mark_read(from, &message_id);
            },
            ClientCommand::GetConversations => {
                let list = self.conversations_for(from);
                self.push(from, ServerEvent::ConversationsUpdated(list));
            },
        }
    }

    /// Store a message without any deliveries, for seeding history.
    pub fn seed_message(&mut self, from: &str, to: &str, text: &str) -> Message {
        self.store(&UserId::from(from), &UserId::from(to), text)
    }

    /// Conversation list as `user` sees it, most recent first.
    pub fn conversations_for(&self, user: &UserId) -> Vec<Conversation> {
        let mut latest: BTreeMap<&UserId, &Message> = BTreeMap::new();
        let mut unread: BTreeMap<&UserId, u32> = BTreeMap::new();

        for message in &self.messages {
            let peer = if message.sender_id == *user {
                &message.receiver_id
            } else if message.receiver_id == *user {
                &message.sender_id
            } else {
                continue;
            };
            latest.insert(peer, message);
            if message.receiver_id == *user && !message.is_read {
                *unread.entry(peer).or_default() += 1;
            }
        }

        let mut list: Vec<Conversation> = latest
            .into_iter()
            .map(|(peer, last)| Conversation {
                peer_id: peer.clone(),
                name: self.accounts.get(peer).map(|a| a.name.clone()).unwrap_or_default(),
                color: None,
                last_message: Some(LastMessage {
                    text: last.text.clone(),
                    created_at: last.created_at,
                }),
                unread_count: unread.get(peer).copied().unwrap_or(0),
            })
            .collect();
        list.sort_by(|a, b| {
            let at = |c: &Conversation| c.last_message.as_ref().map(|m| m.created_at);
            at(b).cmp(&at(a))
        });
        list
    }

    /// History between `user` and `peer`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the configured failure when [`SimServer::set_history_failure`]
    /// is active.
    pub fn history(&self, user: &UserId, peer: &UserId) -> Result<Vec<Message>, String> {
        if let Some(reason) = &self.history_failure {
            return Err(reason.clone());
        }
        Ok(self.messages.iter().filter(|m| m.is_between(user, peer)).cloned().collect())
    }

    /// Make every history request fail with `reason`, or succeed again with
    /// `None`.
    pub fn set_history_failure(&mut self, reason: Option<&str>) {
        self.history_failure = reason.map(str::to_string);
    }

    /// Next queued delivery for `user`.
    pub fn pop_event(&mut self, user: &UserId) -> Option<TransportEvent> {
        self.outboxes.get_mut(user).and_then(VecDeque::pop_front)
    }

    /// Drain all queued deliveries for `user`.
    pub fn take_events(&mut self, user: &UserId) -> Vec<TransportEvent> {
        self.outboxes.get_mut(user).map(|queue| queue.drain(..).collect()).unwrap_or_default()
    }

    /// Every stored message, in send order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn store(&mut self, from: &UserId, to: &UserId, text: &str) -> Message {
        let n = self.messages.len() as i64 + 1;
        let message = Message {
            id: Some(MessageId::from(format!("m{n}").as_str())),
            sender_id: from.clone(),
            receiver_id: to.clone(),
            text: text.to_string(),
            created_at: DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(n),
            is_read: false,
        };
        self.messages.push(message.clone());
        message
    }

    fn mark_read(&mut self, reader: &UserId, message_id: &MessageId) {
        let Some(message) = self
            .messages
            .iter_mut()
            .find(|m| m.id.as_ref() == Some(message_id) && m.receiver_id == *reader)
        else {
            debug!(%reader, %message_id, "read receipt for unknown message");
            return;
        };
        if message.is_read {
            return;
        }
        message.is_read = true;
        let sender = message.sender_id.clone();

        let receipt = ReadReceipt { message_id: message_id.clone() };
        for user in [reader, &sender] {
            self.push(user, ServerEvent::MessageRead(receipt.clone()));
        }
        let list = self.conversations_for(reader);
        self.push(reader, ServerEvent::ConversationsUpdated(list));
    }

    /// Queue `event` for `user` if they are online.
    fn push(&mut self, user: &UserId, event: ServerEvent) {
        if !self.online.contains(user) {
            return;
        }
        self.outboxes.entry(user.clone()).or_default().push_back(TransportEvent::Received(event));
    }

    fn broadcast(&mut self, except: &UserId, event: &ServerEvent) {
        let targets: Vec<UserId> = self.online.iter().filter(|u| *u != except).cloned().collect();
        for user in &targets {
            self.push(user, event.clone());
        }
    }
}

fn status(user: &UserId, online: bool) -> UserStatus {
    let status = if online { STATUS_ONLINE } else { STATUS_OFFLINE };
    UserStatus { user_id: user.clone(), status: status.to_string() }
}
