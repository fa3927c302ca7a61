//! Client state machine.
//!
//! The `Client` is the session-scoped provider that owns every piece of chat
//! state for one signed-in user and coordinates the core machines:
//! connection lifecycle, presence, the conversation store and the outbound
//! typing debounce.

use taskdeck_core::{
    CommandError, Connection, ConnectionAction, ConnectionState, ConversationStore, Environment,
    HistoryOutcome, HistoryRequest, IncomingMessage, PresenceChange, PresenceTracker,
    TypingIndicator, TypingSignal,
};
use taskdeck_proto::{
    ClientCommand, Conversation, Message, MessageId, ServerEvent, UserId,
    payloads::presence::{ReadReceipt, TypingNotice},
};
use tracing::{debug, info, trace, warn};

use crate::{
    config::ClientConfig,
    error::ClientError,
    event::{ClientAction, ClientEvent, ErrorKind},
    session::{CurrentUser, Session},
};

/// Chat session client.
///
/// Created on login and dropped on logout. Call [`Client::shutdown`] first so
/// the transport is closed.
pub struct Client<E: Environment> {
    /// Clock for stamping inbound typing events and keystrokes.
    env: E,

    /// Token and signed-in user.
    session: Session,

    /// Realtime channel lifecycle.
    connection: Connection,

    /// Online and typing state of peers.
    presence: PresenceTracker<E::Instant>,

    /// Conversation list and active log.
    store: ConversationStore,

    /// Outbound typing debounce for the active conversation.
    typing: TypingIndicator<E::Instant>,
}

impl<E: Environment> Client<E> {
    /// Create a client for `session` with default timing.
    pub fn new(env: E, session: Session) -> Self {
        Self::with_config(env, session, ClientConfig::default())
    }

    /// Create a client with explicit timing configuration.
    pub fn with_config(env: E, session: Session, config: ClientConfig) -> Self {
        let store = ConversationStore::new(session.user.id.clone());
        Self {
            env,
            session,
            connection: Connection::new(),
            presence: PresenceTracker::new(config.typing_expiry),
            store,
            typing: TypingIndicator::new(config.typing_idle),
        }
    }

    /// Signed-in user.
    pub fn user(&self) -> &CurrentUser {
        &self.session.user
    }

    /// Current connection state.
    pub fn connection_state(&self) -> &ConnectionState {
        self.connection.state()
    }

    /// Server-ordered conversation list.
    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    /// Open conversation, if any.
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.store.active()
    }

    /// Message log of the open conversation.
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Whether a history fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// Last reported online status of `peer`.
    pub fn is_online(&self, peer: &UserId) -> bool {
        self.presence.is_online(peer)
    }

    /// Whether `peer` is currently typing to us.
    pub fn is_typing(&self, peer: &UserId) -> bool {
        self.presence.is_typing(peer)
    }

    /// Whether we have told the active peer that we are typing.
    pub fn is_composing(&self) -> bool {
        self.typing.is_active()
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// - `ClientError::Command` if a user command fails its preconditions. No
    ///   actions are produced in that case.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect => Ok(self.handle_connect()),
            ClientEvent::Disconnect => Ok(self.handle_disconnect()),
            ClientEvent::TransportOpened => Ok(self.with_connection(Connection::on_open)),
            ClientEvent::TransportFailed { message } => {
                Ok(self.with_connection(|conn| conn.on_connect_error(&message)))
            },
            ClientEvent::TransportClosed { reason } => Ok(self.with_connection(|conn| {
                conn.on_closed(reason);
                Vec::new()
            })),
            ClientEvent::EventReceived(event) => Ok(self.handle_server_event(event)),
            ClientEvent::HistoryFetched { request_id, peer_id, result } => {
                Ok(self.handle_history(HistoryRequest { request_id, peer_id }, result))
            },
            ClientEvent::SwitchConversation(conversation) => {
                Ok(self.handle_switch_conversation(conversation))
            },
            ClientEvent::SendMessage { text } => self.handle_send_message(&text),
            ClientEvent::Keystroke => Ok(self.handle_keystroke()),
            ClientEvent::MarkAsRead { message_id } => self.handle_mark_as_read(message_id),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
        }
    }

    /// Tear the session down.
    ///
    /// Drops every pending deadline and all cached chat state, and returns the
    /// action that closes the transport. Nothing fires after this.
    pub fn shutdown(&mut self) -> Vec<ClientAction> {
        info!(user = %self.session.user.id, "shutting down chat session");
        self.typing.reset();
        self.presence.clear();
        self.store.clear();

        let mut actions = self.with_connection(Connection::disconnect);
        if !actions.contains(&ClientAction::CloseTransport) {
            actions.push(ClientAction::CloseTransport);
        }
        actions
    }

    fn handle_connect(&mut self) -> Vec<ClientAction> {
        let token = self.session.token.clone();
        self.with_connection(|conn| conn.connect(Some(&token)))
    }

    fn handle_disconnect(&mut self) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        if let Some(signal) = self.typing.switch_away()
            && self.connection.is_connected()
        {
            actions.push(Self::typing_command(signal));
        }
        actions.extend(self.with_connection(Connection::disconnect));
        actions
    }

    /// Run a connection transition and report what changed.
    fn with_connection(
        &mut self,
        transition: impl FnOnce(&mut Connection) -> Vec<ConnectionAction>,
    ) -> Vec<ClientAction> {
        let before = self.connection.state().clone();
        let raw = transition(&mut self.connection);
        let mut actions: Vec<ClientAction> =
            raw.into_iter().map(|action| self.translate(action)).collect();

        let after = self.connection.state().clone();
        if after == before {
            return actions;
        }

        debug!(from = before.label(), to = after.label(), "connection state changed");
        if after != ConnectionState::Connected {
            // No channel to deliver the stop signal on; the peer's own expiry
            // clears the indicator.
            self.typing.reset();
        }
        if let ConnectionState::Errored { message } = &after {
            actions.push(ClientAction::Error {
                kind: ErrorKind::Connection,
                message: message.clone(),
            });
        }
        let connected = after == ConnectionState::Connected;
        actions.push(ClientAction::ConnectionChanged(after));

        // Messages may have arrived while the channel was down.
        if connected && let Some(active) = self.store.active().cloned() {
            info!(peer = %active.peer_id, "refreshing open conversation");
            actions.push(ClientAction::FetchHistory(self.store.switch_to(active)));
        }
        actions
    }

    fn translate(&self, action: ConnectionAction) -> ClientAction {
        match action {
            ConnectionAction::Open { token } => {
                info!(user = %self.session.user.id, "opening realtime channel");
                ClientAction::OpenTransport { token }
            },
            ConnectionAction::Close => ClientAction::CloseTransport,
            ConnectionAction::Send(command) => ClientAction::Send(command),
        }
    }

    fn handle_server_event(&mut self, event: ServerEvent) -> Vec<ClientAction> {
        trace!(event = event.name(), "server event");
        match event {
            ServerEvent::ConversationsUpdated(conversations) => {
                self.store.replace_conversations(conversations.clone());
                vec![ClientAction::ConversationsChanged(conversations)]
            },
            ServerEvent::MessageReceived(message) => self.handle_message_received(message),
            ServerEvent::MessageRead(receipt) => {
                if self.store.on_read(&receipt.message_id) {
                    vec![ClientAction::MessageRead { message_id: receipt.message_id }]
                } else {
                    Vec::new()
                }
            },
            ServerEvent::UserStatus(status) => {
                let online = status.is_online();
                self.presence
                    .on_status(status.user_id, online)
                    .map(Self::presence_action)
                    .into_iter()
                    .collect()
            },
            ServerEvent::UserTyping(typing) => {
                let now = self.env.now();
                self.presence
                    .on_typing(typing.user_id, typing.is_typing, now)
                    .map(Self::presence_action)
                    .into_iter()
                    .collect()
            },
            ServerEvent::Error(error) => {
                let message = if error.message.is_empty() {
                    "server error".to_string()
                } else {
                    error.message
                };
                if matches!(
                    self.connection.state(),
                    ConnectionState::Connecting | ConnectionState::Connected
                ) {
                    self.with_connection(|conn| conn.on_error(message))
                } else {
                    warn!(%message, "server error while not connected");
                    vec![ClientAction::Error { kind: ErrorKind::Connection, message }]
                }
            },
            ServerEvent::Unknown { name } => {
                debug!(%name, "ignoring unknown server event");
                Vec::new()
            },
        }
    }

    fn handle_message_received(&mut self, message: Message) -> Vec<ClientAction> {
        match self.store.on_message(message.clone()) {
            IncomingMessage::Appended { mark_read } => {
                let mut actions = vec![ClientAction::MessageAppended(message)];
                if let Some(message_id) = mark_read
                    && self.connection.is_connected()
                {
                    actions.push(ClientAction::Send(ClientCommand::MarkAsRead(ReadReceipt {
                        message_id,
                    })));
                }
                actions
            },
            IncomingMessage::Ignored => {
                trace!(sender = %message.sender_id, "message for inactive conversation");
                Vec::new()
            },
        }
    }

    fn handle_history(
        &mut self,
        request: HistoryRequest,
        result: Result<Vec<Message>, String>,
    ) -> Vec<ClientAction> {
        match self.store.on_history(&request, result) {
            HistoryOutcome::Applied => vec![ClientAction::HistoryReplaced {
                peer_id: request.peer_id,
                messages: self.store.messages().to_vec(),
            }],
            HistoryOutcome::Failed(reason) => {
                warn!(peer = %request.peer_id, %reason, "history fetch failed");
                vec![ClientAction::Error {
                    kind: ErrorKind::Fetch,
                    message: format!("could not load messages: {reason}"),
                }]
            },
            HistoryOutcome::Stale => Vec::new(),
        }
    }

    fn handle_switch_conversation(&mut self, conversation: Conversation) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        if let Some(signal) = self.typing.switch_away()
            && self.connection.is_connected()
        {
            actions.push(Self::typing_command(signal));
        }

        let request = self.store.switch_to(conversation);
        actions.push(ClientAction::FetchHistory(request));
        actions
    }

    fn handle_send_message(&mut self, text: &str) -> Result<Vec<ClientAction>, ClientError> {
        let payload = self.store.check_send(text, self.connection.is_connected())?;
        debug!(peer = %payload.receiver_id, "sending message");

        let mut actions = vec![ClientAction::Send(ClientCommand::PrivateMessage(payload))];
        if let Some(signal) = self.typing.message_sent() {
            actions.push(Self::typing_command(signal));
        }
        Ok(actions)
    }

    fn handle_keystroke(&mut self) -> Vec<ClientAction> {
        if !self.connection.is_connected() {
            return Vec::new();
        }
        let Some(peer) = self.store.active_peer().cloned() else {
            return Vec::new();
        };

        let now = self.env.now();
        self.typing.keystroke(&peer, now).map(Self::typing_command).into_iter().collect()
    }

    fn handle_mark_as_read(
        &mut self,
        message_id: MessageId,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !self.connection.is_connected() {
            return Err(CommandError::NotConnected.into());
        }
        Ok(vec![ClientAction::Send(ClientCommand::MarkAsRead(ReadReceipt { message_id }))])
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let mut actions = Vec::new();

        if let Some(signal) = self.typing.poll(now)
            && self.connection.is_connected()
        {
            actions.push(Self::typing_command(signal));
        }

        actions.extend(self.presence.expire(now).into_iter().map(Self::presence_action));
        actions
    }

    fn typing_command(signal: TypingSignal) -> ClientAction {
        ClientAction::Send(ClientCommand::Typing(TypingNotice {
            receiver_id: signal.peer,
            is_typing: signal.is_typing,
        }))
    }

    fn presence_action(change: PresenceChange) -> ClientAction {
        match change {
            PresenceChange::Online { peer, online } => {
                ClientAction::PresenceChanged { peer_id: peer, online }
            },
            PresenceChange::Typing { peer, typing } => {
                ClientAction::TypingChanged { peer_id: peer, typing }
            },
        }
    }
}
