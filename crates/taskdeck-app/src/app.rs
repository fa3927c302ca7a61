//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the application completely decoupled from I/O and protocol
//! mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Mirrors the session's conversation list, active log and presence as a
//!   read-only view model for rendering.
//! - Owns the composer buffer and the conversation selection cursor.
//! - Turns keys and slash commands into user intents. Validation of those
//!   intents happens in the client, and failures come back as errors.

use std::collections::BTreeSet;

use taskdeck_client::ConnectionState;
use taskdeck_proto::{Conversation, Message, MessageId, UserId};
use tracing::debug;

use crate::{
    AppAction, AppEvent, InputState, KeyInput, Presence,
    commands::{self, Command},
};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Signed-in user, for labelling our own messages.
    me: UserId,
    /// Connection state.
    state: ConnectionState,
    /// Server-ordered conversation list.
    conversations: Vec<Conversation>,
    /// Index into `conversations` highlighted in the sidebar.
    selected: usize,
    /// Open conversation. `None` until the user opens one.
    active: Option<Conversation>,
    /// Message log of the open conversation.
    messages: Vec<Message>,
    /// A history fetch for the open conversation is in flight.
    loading: bool,
    /// Peers last reported online.
    online: BTreeSet<UserId>,
    /// Peers currently typing to us.
    typing: BTreeSet<UserId>,
    /// Composer.
    input: InputState,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create an empty view model for `me`.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            state: ConnectionState::Disconnected,
            conversations: Vec::new(),
            selected: 0,
            active: None,
            messages: Vec::new(),
            loading: false,
            online: BTreeSet::new(),
            typing: BTreeSet::new(),
            input: InputState::new(),
            terminal_size: (80, 24),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::ConnectionChanged(state) => {
                self.state = state;
                vec![AppAction::Render]
            },
            AppEvent::ConversationsChanged(conversations) => {
                self.replace_conversations(conversations);
                vec![AppAction::Render]
            },
            AppEvent::HistoryLoading { peer_id } => {
                if self.active_peer() == Some(&peer_id) {
                    self.loading = true;
                }
                vec![AppAction::Render]
            },
            AppEvent::HistoryReplaced { peer_id, messages } => {
                if self.active_peer() == Some(&peer_id) {
                    self.messages = messages;
                    self.loading = false;
                }
                vec![AppAction::Render]
            },
            AppEvent::HistoryFailed { message } => {
                self.loading = false;
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
            AppEvent::MessageAppended(message) => {
                self.messages.push(message);
                vec![AppAction::Render]
            },
            AppEvent::MessageRead { message_id } => {
                if let Some(message) =
                    self.messages.iter_mut().find(|m| m.id.as_ref() == Some(&message_id))
                {
                    message.is_read = true;
                }
                vec![AppAction::Render]
            },
            AppEvent::PresenceChanged { peer_id, online } => {
                if online {
                    self.online.insert(peer_id);
                } else {
                    self.online.remove(&peer_id);
                }
                vec![AppAction::Render]
            },
            AppEvent::TypingChanged { peer_id, typing } => {
                if typing {
                    self.typing.insert(peer_id);
                } else {
                    self.typing.remove(&peer_id);
                }
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Open the realtime channel.
    pub fn connect(&self) -> Vec<AppAction> {
        vec![AppAction::Connect, AppAction::Render]
    }

    /// Close the realtime channel.
    pub fn disconnect(&self) -> Vec<AppAction> {
        vec![AppAction::Disconnect, AppAction::Render]
    }

    /// Open `conversation`.
    ///
    /// A different peer clears the visible log at once. Re-opening the same
    /// peer keeps it until fresh history arrives.
    pub fn open_conversation(&mut self, conversation: Conversation) -> Vec<AppAction> {
        if self.active_peer() != Some(&conversation.peer_id) {
            self.messages.clear();
        }
        if let Some(index) =
            self.conversations.iter().position(|c| c.peer_id == conversation.peer_id)
        {
            self.selected = index;
        }
        self.active = Some(conversation.clone());
        vec![AppAction::SwitchConversation(conversation), AppAction::Render]
    }

    /// Open the conversation highlighted in the sidebar.
    pub fn open_selected(&mut self) -> Vec<AppAction> {
        match self.conversations.get(self.selected).cloned() {
            Some(conversation) => self.open_conversation(conversation),
            None => vec![],
        }
    }

    /// Send `text` to the open conversation.
    pub fn send_message(&self, text: String) -> Vec<AppAction> {
        vec![AppAction::SendMessage { text }, AppAction::Render]
    }

    /// Mark a message as read.
    pub fn mark_as_read(&self, message_id: MessageId) -> Vec<AppAction> {
        vec![AppAction::MarkAsRead { message_id }, AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Drop the whole view model and end the session.
    pub fn logout(&mut self) -> Vec<AppAction> {
        *self = Self::new(self.me.clone());
        vec![AppAction::Logout]
    }

    /// Move the sidebar selection by `delta`, wrapping around.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.conversations.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected as isize + delta).rem_euclid(len as isize) as usize;
    }

    /// Signed-in user.
    pub fn me(&self) -> &UserId {
        &self.me
    }

    /// Current connection state.
    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// True while the realtime channel is up.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Server-ordered conversation list.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Index of the highlighted conversation.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Open conversation, if any.
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.as_ref()
    }

    /// Peer of the open conversation.
    pub fn active_peer(&self) -> Option<&UserId> {
        self.active.as_ref().map(|c| &c.peer_id)
    }

    /// Message log of the open conversation.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether the open conversation's history is still loading.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Availability of `peer` as the UI should show it.
    ///
    /// Without a live channel every peer is [`Presence::Unknown`].
    pub fn presence(&self, peer: &UserId) -> Presence {
        if !self.is_connected() {
            Presence::Unknown
        } else if self.online.contains(peer) {
            Presence::Online
        } else {
            Presence::Offline
        }
    }

    /// Whether `peer` is typing to us. Always false without a live channel.
    pub fn is_typing(&self, peer: &UserId) -> bool {
        self.is_connected() && self.typing.contains(peer)
    }

    /// Composer state.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    fn replace_conversations(&mut self, conversations: Vec<Conversation>) {
        let selected_peer = self.conversations.get(self.selected).map(|c| c.peer_id.clone());
        self.conversations = conversations;

        self.selected = selected_peer
            .and_then(|peer| self.conversations.iter().position(|c| c.peer_id == peer))
            .unwrap_or(0)
            .min(self.conversations.len().saturating_sub(1));

        if let Some(active) = &mut self.active
            && let Some(fresh) = self.conversations.iter().find(|c| c.peer_id == active.peer_id)
        {
            active.clone_from(fresh);
        }
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Char(c) => {
                self.input.insert(c);
                self.edited(true)
            },
            KeyInput::Backspace => {
                let changed = self.input.backspace();
                self.edited(changed)
            },
            KeyInput::Delete => {
                let changed = self.input.delete();
                self.edited(changed)
            },
            KeyInput::Left => {
                self.input.left();
                vec![AppAction::Render]
            },
            KeyInput::Right => {
                self.input.right();
                vec![AppAction::Render]
            },
            KeyInput::Home => {
                self.input.home();
                vec![AppAction::Render]
            },
            KeyInput::End => {
                self.input.end();
                vec![AppAction::Render]
            },
            KeyInput::Up => {
                self.move_selection(-1);
                vec![AppAction::Render]
            },
            KeyInput::Down => {
                self.move_selection(1);
                vec![AppAction::Render]
            },
            KeyInput::Tab => self.open_selected(),
            KeyInput::Enter => self.handle_enter(),
            KeyInput::Esc => self.quit(),
        }
    }

    /// Composer text changed. Slash commands never count as typing.
    fn edited(&self, changed: bool) -> Vec<AppAction> {
        if changed && !self.input.is_command() && !self.input.buffer().is_empty() {
            vec![AppAction::Keystroke, AppAction::Render]
        } else {
            vec![AppAction::Render]
        }
    }

    /// Handle Enter key - parse command and call App API.
    fn handle_enter(&mut self) -> Vec<AppAction> {
        let text = self.input.take();
        if text.trim().is_empty() {
            return vec![AppAction::Render];
        }

        match commands::parse(&text) {
            Command::Connect => self.connect(),
            Command::Disconnect => self.disconnect(),
            Command::Open { peer } => {
                let found = self
                    .conversations
                    .iter()
                    .find(|c| c.peer_id.as_str() == peer || c.name.eq_ignore_ascii_case(&peer))
                    .cloned();
                if let Some(conversation) = found {
                    self.open_conversation(conversation)
                } else {
                    debug!(%peer, "no such conversation");
                    self.set_status(format!("No conversation with {peer}"));
                    vec![AppAction::Render]
                }
            },
            Command::Read { message_id } => self.mark_as_read(MessageId::from(message_id.as_str())),
            Command::Logout => self.logout(),
            Command::Quit => self.quit(),
            Command::Message { text } => self.send_message(text),
            Command::Unknown { input } => {
                self.set_status(format!("Unknown command: {input}"));
                vec![AppAction::Render]
            },
            Command::InvalidArgs { command, error } => {
                self.set_status(format!("/{command}: {error}"));
                vec![AppAction::Render]
            },
        }
    }
}
