//! Session-to-Application translation layer.
//!
//! The [`Bridge`] wraps the session-scoped [`taskdeck_client::Client`] and
//! adapts it to the high-level application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts high-level [`crate::AppAction`] into client events.
//! - Accumulates outgoing [`TransportRequest`]s to be executed by the driver
//!   in the next I/O cycle.
//! - Interprets results from the client and converts them back into
//!   [`crate::AppEvent`]s to update the UI.
//! - Manages time ticks generically to support both real-time execution and
//!   deterministic simulation.

use taskdeck_client::{
    Client, ClientAction, ClientConfig, ClientError, ClientEvent, Environment, ErrorKind,
    HistoryRequest, Session, TransportEvent,
};
use taskdeck_proto::ClientCommand;
use tracing::debug;

use crate::{AppAction, AppEvent};

/// I/O the driver must perform on behalf of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportRequest {
    /// Open the realtime channel with this bearer token.
    Open {
        /// Bearer token.
        token: String,
    },
    /// Close the realtime channel.
    Close,
    /// Emit a command on the realtime channel.
    Send(ClientCommand),
    /// Fetch history and report back with
    /// [`TransportEvent::HistoryFetched`].
    FetchHistory(HistoryRequest),
}

/// Bridge between App and Client session logic.
///
/// Generic over Environment to support both production and simulation.
/// The Instant type is determined by the Environment's associated type.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    outgoing: Vec<TransportRequest>,
}

impl<E: Environment> Bridge<E> {
    /// Create a new Bridge for `session` with default timing.
    pub fn new(env: E, session: Session) -> Self {
        Self::with_config(env, session, ClientConfig::default())
    }

    /// Create a new Bridge with explicit client timing.
    pub fn with_config(env: E, session: Session, config: ClientConfig) -> Self {
        Self { client: Client::with_config(env, session, config), outgoing: Vec::new() }
    }

    /// The wrapped client, for read-only inspection.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        let event = match action {
            AppAction::Connect => ClientEvent::Connect,
            AppAction::Disconnect => ClientEvent::Disconnect,
            AppAction::SwitchConversation(conversation) => {
                ClientEvent::SwitchConversation(conversation)
            },
            AppAction::SendMessage { text } => ClientEvent::SendMessage { text },
            AppAction::Keystroke => ClientEvent::Keystroke,
            AppAction::MarkAsRead { message_id } => ClientEvent::MarkAsRead { message_id },
            AppAction::Logout => return self.shutdown(),
            AppAction::Render | AppAction::Quit => return vec![],
        };

        let result = self.client.handle(event);
        self.handle_client_result(result)
    }

    /// Handle a notification from the transport.
    pub fn handle_transport(&mut self, event: TransportEvent) -> Vec<AppEvent> {
        let result = self.client.handle(event.into());
        self.handle_client_result(result)
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: E::Instant) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::Tick { now });
        self.handle_client_result(result)
    }

    /// Tear the session down. Queues the transport close.
    pub fn shutdown(&mut self) -> Vec<AppEvent> {
        let actions = self.client.shutdown();
        self.process_client_actions(actions)
    }

    /// Take pending transport requests.
    pub fn take_outgoing(&mut self) -> Vec<TransportRequest> {
        std::mem::take(&mut self.outgoing)
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(e) => {
                debug!(error = %e, "client rejected action");
                vec![AppEvent::Error { message: e.to_string() }]
            },
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ClientAction::OpenTransport { token } => {
                    self.outgoing.push(TransportRequest::Open { token });
                },
                ClientAction::CloseTransport => self.outgoing.push(TransportRequest::Close),
                ClientAction::Send(command) => self.outgoing.push(TransportRequest::Send(command)),
                ClientAction::FetchHistory(request) => {
                    events.push(AppEvent::HistoryLoading { peer_id: request.peer_id.clone() });
                    self.outgoing.push(TransportRequest::FetchHistory(request));
                },
                ClientAction::ConnectionChanged(state) => {
                    events.push(AppEvent::ConnectionChanged(state));
                },
                ClientAction::ConversationsChanged(conversations) => {
                    events.push(AppEvent::ConversationsChanged(conversations));
                },
                ClientAction::HistoryReplaced { peer_id, messages } => {
                    events.push(AppEvent::HistoryReplaced { peer_id, messages });
                },
                ClientAction::MessageAppended(message) => {
                    events.push(AppEvent::MessageAppended(message));
                },
                ClientAction::MessageRead { message_id } => {
                    events.push(AppEvent::MessageRead { message_id });
                },
                ClientAction::PresenceChanged { peer_id, online } => {
                    events.push(AppEvent::PresenceChanged { peer_id, online });
                },
                ClientAction::TypingChanged { peer_id, typing } => {
                    events.push(AppEvent::TypingChanged { peer_id, typing });
                },
                ClientAction::Error { kind: ErrorKind::Fetch, message } => {
                    events.push(AppEvent::HistoryFailed { message });
                },
                ClientAction::Error { kind: ErrorKind::Connection, message } => {
                    events.push(AppEvent::Error { message });
                },
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use std::{future::Future, time::Duration};

    use taskdeck_client::{ConnectionState, CurrentUser};
    use taskdeck_proto::{Conversation, UserId};

    use super::*;

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = Duration;

        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
            std::future::ready(())
        }
    }

    fn bridge() -> Bridge<TestEnv> {
        let user = CurrentUser { id: UserId::from("me"), name: "Me".into(), email: None };
        Bridge::new(TestEnv, Session::new("tok", user))
    }

    #[test]
    fn connect_queues_open() {
        let mut bridge = bridge();
        let events = bridge.process_app_action(AppAction::Connect);

        assert_eq!(events, vec![AppEvent::ConnectionChanged(ConnectionState::Connecting)]);
        assert_eq!(bridge.take_outgoing(), vec![TransportRequest::Open { token: "tok".into() }]);
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn switch_queues_history_fetch() {
        let mut bridge = bridge();
        let conversation = Conversation::new(UserId::from("bob"), "Bob");
        let events = bridge.process_app_action(AppAction::SwitchConversation(conversation));

        assert_eq!(events, vec![AppEvent::HistoryLoading { peer_id: UserId::from("bob") }]);
        assert!(matches!(bridge.take_outgoing().as_slice(), [TransportRequest::FetchHistory(_)]));
    }

    #[test]
    fn failed_send_produces_error() {
        let mut bridge = bridge();
        let events = bridge.process_app_action(AppAction::SendMessage { text: "hi".into() });

        assert_eq!(events, vec![AppEvent::Error { message: "no active conversation".into() }]);
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn logout_closes_transport() {
        let mut bridge = bridge();
        bridge.process_app_action(AppAction::Connect);
        bridge.take_outgoing();

        let events = bridge.process_app_action(AppAction::Logout);
        assert!(events.contains(&AppEvent::ConnectionChanged(ConnectionState::Disconnected)));
        assert_eq!(bridge.take_outgoing(), vec![TransportRequest::Close]);
    }
}
