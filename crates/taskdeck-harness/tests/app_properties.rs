//! Property-based tests for the App state machine and full sessions.
//!
//! Tests verify that invariants hold under arbitrary event sequences.
//! This ensures behavioral correctness across all possible execution paths.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use proptest::prelude::*;
use taskdeck_app::{App, AppEvent, KeyInput, Runtime};
use taskdeck_client::{ConnectionState, CurrentUser, Session};
use taskdeck_harness::{
    ClientSnapshot, InvariantRegistry, SimDriver, SimEnv, SystemSnapshot, create_shared_server,
};
use taskdeck_proto::{
    ClientCommand, Conversation, Message, MessageId, UserId,
    payloads::{chat::PrivateMessage, presence::TypingNotice},
};

const PEERS: [&str; 3] = ["bob", "carol", "dave"];

fn me() -> UserId {
    UserId::from("alice")
}

/// Generate composer characters. No `/`, so random input never quits.
fn text_char() -> impl Strategy<Value = char> {
    prop_oneof![8 => prop::char::range('a', 'z'), 1 => Just(' ')]
}

/// Generate random key inputs. `Esc` quits and is left out.
fn key_strategy() -> impl Strategy<Value = KeyInput> {
    prop_oneof![
        6 => text_char().prop_map(KeyInput::Char),
        1 => Just(KeyInput::Enter),
        1 => Just(KeyInput::Backspace),
        1 => Just(KeyInput::Delete),
        1 => Just(KeyInput::Tab),
        1 => Just(KeyInput::Up),
        1 => Just(KeyInput::Down),
        1 => Just(KeyInput::Left),
        1 => Just(KeyInput::Right),
    ]
}

fn peer_strategy() -> impl Strategy<Value = UserId> {
    prop::sample::select(PEERS.to_vec()).prop_map(UserId::from)
}

/// The server never drops a conversation, only reorders the list.
fn list_strategy() -> impl Strategy<Value = Vec<Conversation>> {
    Just(PEERS.iter().map(|p| Conversation::new(UserId::from(*p), p.to_uppercase())).collect())
        .prop_shuffle()
}

fn history_strategy() -> impl Strategy<Value = (UserId, Vec<Message>)> {
    (peer_strategy(), 0usize..5).prop_map(|(peer, len)| {
        let messages = (0..len)
            .map(|i| Message {
                id: Some(MessageId::from(format!("{peer}-{i}").as_str())),
                sender_id: if i % 2 == 0 { peer.clone() } else { me() },
                receiver_id: if i % 2 == 0 { me() } else { peer.clone() },
                text: format!("message {i}"),
                created_at: DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(i as i64),
                is_read: i % 3 == 0,
            })
            .collect();
        (peer, messages)
    })
}

fn connection_strategy() -> impl Strategy<Value = ConnectionState> {
    prop_oneof![
        Just(ConnectionState::Disconnected),
        Just(ConnectionState::Connecting),
        Just(ConnectionState::Connected),
        Just(ConnectionState::Errored { message: "transport close".into() }),
    ]
}

/// Generate random app events, shaped like what the bridge can deliver.
fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        8 => key_strategy().prop_map(AppEvent::Key),
        1 => Just(AppEvent::Tick),
        1 => (1u16..200, 1u16..100).prop_map(|(c, r)| AppEvent::Resize(c, r)),
        1 => connection_strategy().prop_map(AppEvent::ConnectionChanged),
        2 => list_strategy().prop_map(AppEvent::ConversationsChanged),
        1 => history_strategy()
            .prop_map(|(peer_id, messages)| AppEvent::HistoryReplaced { peer_id, messages }),
        1 => (peer_strategy(), any::<bool>())
            .prop_map(|(peer_id, online)| AppEvent::PresenceChanged { peer_id, online }),
        1 => (peer_strategy(), any::<bool>())
            .prop_map(|(peer_id, typing)| AppEvent::TypingChanged { peer_id, typing }),
        1 => Just(AppEvent::Error { message: "boom".into() }),
    ]
}

/// Something that happens to a running session.
#[derive(Debug, Clone)]
enum Op {
    Key(KeyInput),
    Advance(u64),
    HoldHistory(bool),
    ReleaseHistory { reversed: bool },
    PeerMessage(usize),
    PeerTyping(usize, bool),
    DropChannel,
    Reconnect,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        10 => key_strategy().prop_map(Op::Key),
        3 => (0u64..4000).prop_map(Op::Advance),
        1 => any::<bool>().prop_map(Op::HoldHistory),
        2 => any::<bool>().prop_map(|reversed| Op::ReleaseHistory { reversed }),
        3 => (0..PEERS.len()).prop_map(Op::PeerMessage),
        2 => (0..PEERS.len(), any::<bool>()).prop_map(|(i, t)| Op::PeerTyping(i, t)),
        1 => Just(Op::DropChannel),
        1 => Just(Op::Reconnect),
    ]
}

proptest! {
    /// App invariants hold under arbitrary event sequences.
    #[test]
    fn prop_app_invariants_hold(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut app = App::new(me());
        let invariants = InvariantRegistry::standard();

        for event in events {
            let _ = app.handle(event.clone());

            let snapshot = SystemSnapshot::single(ClientSnapshot::from_app(&app));
            prop_assert!(
                invariants.check_all(&snapshot).is_ok(),
                "Invariant violated after {:?}", event
            );
        }
    }

    /// Selection stays in bounds whatever the list does.
    #[test]
    fn prop_selection_in_bounds(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut app = App::new(me());

        for event in events {
            let _ = app.handle(event);
            let len = app.conversations().len();
            prop_assert!(app.selected() < len.max(1));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whole sessions against the simulated server keep every invariant.
    #[test]
    fn prop_session_invariants_hold(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(run_session(ops));
    }
}

async fn run_session(ops: Vec<Op>) {
    let server = create_shared_server();
    let env = SimEnv::new();
    {
        let mut server = server.lock().unwrap();
        server.register("alice", "Alice", "tok-a");
        for peer in PEERS {
            server.register(peer, &peer.to_uppercase(), &format!("tok-{peer}"));
            server.seed_message(peer, "alice", "hi");
            server.connect(&format!("tok-{peer}")).unwrap();
        }
    }

    let driver = SimDriver::new(server.clone(), env.clone(), "tok-a")
        .with_invariants(InvariantRegistry::standard());
    let user = CurrentUser { id: me(), name: "Alice".into(), email: None };
    let mut runtime = Runtime::new(driver, env.clone(), Session::new("tok-a", user));
    runtime.start().await.unwrap();

    for op in ops {
        let context = format!("after {op:?}");
        match op {
            Op::Key(key) => runtime.driver().inject_event(AppEvent::Key(key)),
            Op::Advance(ms) => {
                env.advance(Duration::from_millis(ms));
            },
            Op::HoldHistory(hold) => runtime.driver().hold_history(hold),
            Op::ReleaseHistory { reversed: false } => runtime.driver().release_history(),
            Op::ReleaseHistory { reversed: true } => runtime.driver().release_history_reversed(),
            Op::PeerMessage(i) => {
                let command = ClientCommand::PrivateMessage(PrivateMessage {
                    receiver_id: me(),
                    text: "ping".into(),
                });
                server.lock().unwrap().handle_command(&UserId::from(PEERS[i]), command);
            },
            Op::PeerTyping(i, is_typing) => {
                let command = ClientCommand::Typing(TypingNotice { receiver_id: me(), is_typing });
                server.lock().unwrap().handle_command(&UserId::from(PEERS[i]), command);
            },
            Op::DropChannel => server.lock().unwrap().drop_connection(&me(), "transport close"),
            Op::Reconnect => {
                let typed = runtime.app().input().buffer().chars().count();
                let driver = runtime.driver();
                driver.inject_event(AppEvent::Key(KeyInput::End));
                for _ in 0..typed {
                    driver.inject_event(AppEvent::Key(KeyInput::Backspace));
                }
                driver.type_text("/connect");
                driver.inject_event(AppEvent::Key(KeyInput::Enter));
            },
        }

        loop {
            let quit = runtime.step().await.unwrap();
            assert!(!quit, "session quit {context}");
            runtime.driver().check_invariants(runtime.app(), runtime.bridge().client(), &context);
            if !runtime.driver().has_pending() {
                break;
            }
        }

        for peer in PEERS {
            server.lock().unwrap().take_events(&UserId::from(peer));
        }
    }
}
