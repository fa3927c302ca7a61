//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture what one signed-in user can observe at a point in time:
//! the view model the UI renders from and, when available, the session state
//! underneath it. Invariants operate on snapshots rather than live state so
//! every check sees one consistent moment.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use taskdeck_app::App;
use taskdeck_client::{Client, ConnectionState, Environment};
use taskdeck_proto::{Message, UserId};

/// Snapshot of the entire simulated system.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemSnapshot {
    /// Per-user snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients }
    }
}

/// What one user's UI shows.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSnapshot {
    /// Signed-in user.
    pub user: UserId,
    /// The realtime channel is up.
    pub connected: bool,
    /// Peers of the conversation list, in server order.
    pub conversations: Vec<UserId>,
    /// Open conversation's peer.
    pub active_peer: Option<UserId>,
    /// Visible message log.
    pub messages: Vec<Message>,
    /// Presence label shown for each listed peer.
    pub presence: BTreeMap<UserId, &'static str>,
    /// Listed peers shown as typing.
    pub typing: BTreeSet<UserId>,
    /// Session state under the view model.
    #[serde(skip)]
    pub session: Option<SessionSnapshot>,
    /// Log at the previous check, when no history replacement or
    /// conversation switch happened since.
    #[serde(skip)]
    pub previous_log: Option<Vec<Message>>,
}

impl ClientSnapshot {
    /// Capture the view model.
    pub fn from_app(app: &App) -> Self {
        let peers: Vec<UserId> = app.conversations().iter().map(|c| c.peer_id.clone()).collect();
        Self {
            user: app.me().clone(),
            connected: app.is_connected(),
            presence: peers.iter().map(|p| (p.clone(), app.presence(p).label())).collect(),
            typing: peers.iter().filter(|p| app.is_typing(p)).cloned().collect(),
            conversations: peers,
            active_peer: app.active_peer().cloned(),
            messages: app.messages().to_vec(),
            session: None,
            previous_log: None,
        }
    }

    /// Attach the log seen at the previous check.
    #[must_use]
    pub fn with_previous_log(mut self, log: Vec<Message>) -> Self {
        self.previous_log = Some(log);
        self
    }

    /// Attach the session state.
    #[must_use]
    pub fn with_session(mut self, session: SessionSnapshot) -> Self {
        self.session = Some(session);
        self
    }
}

/// What the session behind the UI holds.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// The realtime channel is up.
    pub connected: bool,
    /// Peers of the conversation list, in server order.
    pub conversations: Vec<UserId>,
    /// Open conversation's peer.
    pub active_peer: Option<UserId>,
    /// Message log.
    pub messages: Vec<Message>,
    /// Listed peers the session believes are typing.
    pub typing: BTreeSet<UserId>,
}

impl SessionSnapshot {
    /// Capture a client's state.
    pub fn from_client<E: Environment>(client: &Client<E>) -> Self {
        let peers: Vec<UserId> =
            client.conversations().iter().map(|c| c.peer_id.clone()).collect();
        Self {
            connected: *client.connection_state() == ConnectionState::Connected,
            typing: peers.iter().filter(|p| client.is_typing(p)).cloned().collect(),
            conversations: peers,
            active_peer: client.active_conversation().map(|c| c.peer_id.clone()),
            messages: client.messages().to_vec(),
        }
    }
}
