//! Integration tests for App and Bridge behavior.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - App state reflects what the session holds
//! - Transport requests match what the server should see
//! - Messages land in the right conversation

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use taskdeck_app::{App, AppAction, AppEvent, Bridge, KeyInput, Presence, TransportRequest};
use taskdeck_client::{ConnectionState, CurrentUser, Environment, Session, TransportEvent};
use taskdeck_proto::{
    ClientCommand, Conversation, Message, MessageId, ServerEvent, UserId,
    payloads::presence::{ReadReceipt, STATUS_ONLINE, TypingNotice, UserStatus, UserTyping},
};

#[derive(Clone)]
struct FixedClock;

impl Environment for FixedClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }
}

fn me() -> UserId {
    UserId::from("me")
}

fn bob() -> UserId {
    UserId::from("bob")
}

fn message(id: &str, from: &UserId, to: &UserId, text: &str) -> Message {
    Message {
        id: Some(MessageId::from(id)),
        sender_id: from.clone(),
        receiver_id: to.clone(),
        text: text.to_string(),
        created_at: DateTime::<Utc>::UNIX_EPOCH,
        is_read: false,
    }
}

/// Process actions from App through Bridge and update App state.
fn process_actions<E: Environment>(
    app: &mut App,
    bridge: &mut Bridge<E>,
    actions: Vec<AppAction>,
) -> Vec<TransportRequest> {
    let mut pending = actions;
    while !pending.is_empty() {
        for action in std::mem::take(&mut pending) {
            match action {
                AppAction::Render | AppAction::Quit => {},
                action => {
                    for event in bridge.process_app_action(action) {
                        pending.extend(app.handle(event));
                    }
                },
            }
        }
    }
    bridge.take_outgoing()
}

/// Feed a transport notification through Bridge into App.
fn deliver<E: Environment>(
    app: &mut App,
    bridge: &mut Bridge<E>,
    event: TransportEvent,
) -> Vec<TransportRequest> {
    let mut actions = Vec::new();
    for event in bridge.handle_transport(event) {
        actions.extend(app.handle(event));
    }
    process_actions(app, bridge, actions)
}

fn type_line<E: Environment>(
    app: &mut App,
    bridge: &mut Bridge<E>,
    line: &str,
) -> Vec<TransportRequest> {
    let mut actions = Vec::new();
    for c in line.chars() {
        actions.extend(app.handle(AppEvent::Key(KeyInput::Char(c))));
    }
    actions.extend(app.handle(AppEvent::Key(KeyInput::Enter)));
    process_actions(app, bridge, actions)
}

/// A connected App and Bridge with Bob's conversation listed.
fn connected() -> (App, Bridge<FixedClock>) {
    let user = CurrentUser { id: me(), name: "Me".into(), email: None };
    let mut bridge = Bridge::new(FixedClock, Session::new("tok", user));
    let mut app = App::new(me());

    let actions = app.connect();
    let requests = process_actions(&mut app, &mut bridge, actions);
    assert_eq!(requests, vec![TransportRequest::Open { token: "tok".into() }]);

    let requests = deliver(&mut app, &mut bridge, TransportEvent::Opened);
    assert_eq!(requests, vec![TransportRequest::Send(ClientCommand::GetConversations)]);

    let list = vec![Conversation::new(bob(), "Bob")];
    deliver(&mut app, &mut bridge, TransportEvent::Received(ServerEvent::ConversationsUpdated(list)));
    (app, bridge)
}

fn sends(requests: &[TransportRequest]) -> Vec<&ClientCommand> {
    requests
        .iter()
        .filter_map(|r| match r {
            TransportRequest::Send(command) => Some(command),
            _ => None,
        })
        .collect()
}

#[test]
fn connect_then_list() {
    let (app, _bridge) = connected();

    assert!(app.is_connected());
    assert_eq!(app.conversations().len(), 1);
    assert_eq!(app.presence(&bob()), Presence::Offline);
}

#[test]
fn open_send_and_echo() {
    let (mut app, mut bridge) = connected();

    let actions = app.open_selected();
    let requests = process_actions(&mut app, &mut bridge, actions);
    let fetches: Vec<_> = requests
        .iter()
        .filter_map(|r| match r {
            TransportRequest::FetchHistory(request) => Some(request.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(fetches.len(), 1);
    assert_eq!(requests.len(), 1);
    assert!(app.is_loading());

    let history = vec![message("m1", &bob(), &me(), "hello")];
    deliver(&mut app, &mut bridge, TransportEvent::HistoryFetched {
        request: fetches[0].clone(),
        result: Ok(history),
    });
    assert!(!app.is_loading());
    assert_eq!(app.messages().len(), 1);

    let requests = type_line(&mut app, &mut bridge, "hi");
    let commands = sends(&requests);
    assert!(matches!(commands[0], ClientCommand::Typing(TypingNotice { is_typing: true, .. })));
    assert!(matches!(commands[1], ClientCommand::PrivateMessage(m) if m.text == "hi"));
    assert!(matches!(commands[2], ClientCommand::Typing(TypingNotice { is_typing: false, .. })));

    // Nothing is shown until the server echoes the message back
    assert_eq!(app.messages().len(), 1);
    let echo = message("m2", &me(), &bob(), "hi");
    let requests =
        deliver(&mut app, &mut bridge, TransportEvent::Received(ServerEvent::MessageReceived(echo)));
    assert!(requests.is_empty());
    assert_eq!(app.messages().last().map(|m| m.text.as_str()), Some("hi"));
}

#[test]
fn incoming_message_is_acknowledged() {
    let (mut app, mut bridge) = connected();
    let actions = app.open_selected();
    process_actions(&mut app, &mut bridge, actions);

    let incoming = message("m7", &bob(), &me(), "ping");
    let requests = deliver(
        &mut app,
        &mut bridge,
        TransportEvent::Received(ServerEvent::MessageReceived(incoming)),
    );
    assert_eq!(requests, vec![TransportRequest::Send(ClientCommand::MarkAsRead(ReadReceipt {
        message_id: MessageId::from("m7")
    }))]);

    let receipt = ReadReceipt { message_id: MessageId::from("m7") };
    deliver(&mut app, &mut bridge, TransportEvent::Received(ServerEvent::MessageRead(receipt)));
    assert!(app.messages()[0].is_read);
}

#[test]
fn presence_and_typing_are_mirrored() {
    let (mut app, mut bridge) = connected();

    let status = UserStatus { user_id: bob(), status: STATUS_ONLINE.into() };
    deliver(&mut app, &mut bridge, TransportEvent::Received(ServerEvent::UserStatus(status)));
    assert_eq!(app.presence(&bob()), Presence::Online);

    let typing = UserTyping { user_id: bob(), is_typing: true };
    deliver(&mut app, &mut bridge, TransportEvent::Received(ServerEvent::UserTyping(typing)));
    assert!(app.is_typing(&bob()));

    deliver(&mut app, &mut bridge, TransportEvent::Closed { reason: "transport close".into() });
    assert!(matches!(app.connection_state(), ConnectionState::Errored { .. }));
    assert_eq!(app.presence(&bob()), Presence::Unknown);
    assert!(!app.is_typing(&bob()));
    assert_eq!(app.status_message(), Some("Error: transport close"));
}

#[test]
fn read_command_needs_a_channel() {
    let (mut app, mut bridge) = connected();

    let requests = type_line(&mut app, &mut bridge, "/read m1");
    assert_eq!(requests, vec![TransportRequest::Send(ClientCommand::MarkAsRead(ReadReceipt {
        message_id: MessageId::from("m1")
    }))]);

    let requests = type_line(&mut app, &mut bridge, "/disconnect");
    assert_eq!(requests, vec![TransportRequest::Close]);
    assert_eq!(app.connection_state(), &ConnectionState::Disconnected);

    let requests = type_line(&mut app, &mut bridge, "/read m1");
    assert!(requests.is_empty());
    assert_eq!(app.status_message(), Some("Error: not connected"));
}

#[test]
fn logout_closes_and_forgets() {
    let (mut app, mut bridge) = connected();
    let actions = app.open_selected();
    process_actions(&mut app, &mut bridge, actions);

    let requests = type_line(&mut app, &mut bridge, "/logout");
    assert_eq!(requests, vec![TransportRequest::Close]);
    assert!(app.conversations().is_empty());
    assert!(bridge.client().conversations().is_empty());
    assert!(bridge.client().active_conversation().is_none());
}
