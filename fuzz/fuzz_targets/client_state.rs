//! Fuzz target for the chat session state machine
//!
//! Drives a `Client` with arbitrary interleavings of user commands, transport
//! lifecycle, server pushes, history answers (current or stale) and time.
//!
//! # Invariants
//!
//! - Never panics, whatever the order of events
//! - The log only holds messages between us and the open conversation's peer
//! - Between history replacements and switches the log only grows at the end
//!   and read messages stay read
//! - Remote typing is never reported for more than the expiry window
//! - Nothing but shutdown's close leaves the client after shutdown

#![no_main]

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use arbitrary::Arbitrary;
use chrono::DateTime;
use libfuzzer_sys::fuzz_target;
use taskdeck_client::{
    Client, ClientAction, ClientConfig, ClientEvent, CurrentUser, Environment, HistoryRequest,
    Session,
};
use taskdeck_proto::{
    payloads::presence::{ReadReceipt, UserStatus, UserTyping},
    Conversation, Message, MessageId, ServerEvent, UserId,
};

const PEERS: u8 = 4;

/// Clock shared with the driving loop so server pushes see tick time.
#[derive(Clone, Default)]
struct FuzzEnv {
    millis: Arc<AtomicU64>,
}

impl FuzzEnv {
    fn advance(&self, millis: u16) -> Duration {
        let total = self.millis.fetch_add(u64::from(millis), Ordering::SeqCst) + u64::from(millis);
        Duration::from_millis(total)
    }
}

impl Environment for FuzzEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Connect,
    Disconnect,
    Opened,
    Failed,
    Closed,
    Conversations(Vec<u8>),
    Incoming { peer: u8, from_me: bool, id: u8, read: bool },
    Read { id: u8 },
    Status { peer: u8, online: bool },
    Typing { peer: u8, typing: bool },
    History { stale: bool, ok: bool, len: u8 },
    Switch { peer: u8 },
    Send { text: String },
    Keystroke,
    MarkAsRead { id: u8 },
    Advance { millis: u16 },
}

fn peer(n: u8) -> UserId {
    UserId::from(format!("p{}", n % PEERS).as_str())
}

fn message(id: u8, from: UserId, to: UserId, read: bool) -> Message {
    Message {
        id: Some(MessageId::from(format!("m{id}").as_str())),
        sender_id: from,
        receiver_id: to,
        text: format!("text {id}"),
        created_at: DateTime::UNIX_EPOCH,
        is_read: read,
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let me = UserId::from("me");
    let user = CurrentUser { id: me.clone(), name: "Me".into(), email: None };
    let env = FuzzEnv::default();
    let mut client =
        Client::with_config(env.clone(), Session::new("tok", user), ClientConfig::default());

    let mut requests: Vec<HistoryRequest> = Vec::new();
    let mut typing_since: Vec<(UserId, Duration)> = Vec::new();

    for op in ops {
        let before: Vec<Message> = client.messages().to_vec();
        let before_peer = client.active_conversation().map(|c| c.peer_id.clone());
        let mut replaced = false;
        let rearmed = match &op {
            Op::Typing { peer: n, typing: true } => Some(peer(*n)),
            _ => None,
        };

        let event = match op {
            Op::Connect => ClientEvent::Connect,
            Op::Disconnect => ClientEvent::Disconnect,
            Op::Opened => ClientEvent::TransportOpened,
            Op::Failed => ClientEvent::TransportFailed { message: "refused".into() },
            Op::Closed => ClientEvent::TransportClosed { reason: "transport close".into() },
            Op::Conversations(peers) => {
                let list = peers.into_iter().map(|n| Conversation::new(peer(n), "peer")).collect();
                ClientEvent::EventReceived(ServerEvent::ConversationsUpdated(list))
            },
            Op::Incoming { peer: n, from_me, id, read } => {
                let (from, to) = if from_me { (me.clone(), peer(n)) } else { (peer(n), me.clone()) };
                ClientEvent::EventReceived(ServerEvent::MessageReceived(message(id, from, to, read)))
            },
            Op::Read { id } => ClientEvent::EventReceived(ServerEvent::MessageRead(ReadReceipt {
                message_id: MessageId::from(format!("m{id}").as_str()),
            })),
            Op::Status { peer: n, online } => {
                let status = if online { "online" } else { "offline" };
                ClientEvent::EventReceived(ServerEvent::UserStatus(UserStatus {
                    user_id: peer(n),
                    status: status.into(),
                }))
            },
            Op::Typing { peer: n, typing } => {
                ClientEvent::EventReceived(ServerEvent::UserTyping(UserTyping {
                    user_id: peer(n),
                    is_typing: typing,
                }))
            },
            Op::History { stale, ok, len } => {
                let request = if stale { requests.first() } else { requests.last() };
                let Some(request) = request.cloned() else {
                    continue;
                };
                replaced = true;
                let result = if ok {
                    Ok((0..len % 8)
                        .map(|i| message(i, request.peer_id.clone(), me.clone(), false))
                        .collect())
                } else {
                    Err("HTTP status server error (500 Internal Server Error)".into())
                };
                ClientEvent::HistoryFetched {
                    request_id: request.request_id,
                    peer_id: request.peer_id,
                    result,
                }
            },
            Op::Switch { peer: n } => {
                ClientEvent::SwitchConversation(Conversation::new(peer(n), "peer"))
            },
            Op::Send { text } => ClientEvent::SendMessage { text },
            Op::Keystroke => ClientEvent::Keystroke,
            Op::MarkAsRead { id } => {
                ClientEvent::MarkAsRead { message_id: MessageId::from(format!("m{id}").as_str()) }
            },
            Op::Advance { millis } => ClientEvent::Tick { now: env.advance(millis) },
        };

        let Ok(actions) = client.handle(event) else {
            assert_eq!(client.messages(), before.as_slice());
            continue;
        };

        let now = env.now();
        if let Some(peer_id) = rearmed {
            if client.is_typing(&peer_id) {
                typing_since.retain(|(p, _)| *p != peer_id);
                typing_since.push((peer_id, now));
            }
        }

        for action in &actions {
            match action {
                ClientAction::FetchHistory(request) => requests.push(request.clone()),
                ClientAction::TypingChanged { peer_id, typing: true } => {
                    typing_since.retain(|(p, _)| p != peer_id);
                    typing_since.push((peer_id.clone(), now));
                },
                ClientAction::TypingChanged { peer_id, typing: false } => {
                    typing_since.retain(|(p, _)| p != peer_id);
                },
                _ => {},
            }
        }

        // Log belongs to the open conversation.
        match client.active_conversation() {
            Some(active) => {
                assert!(client.messages().iter().all(|m| m.is_between(&me, &active.peer_id)));
            },
            None => assert!(client.messages().is_empty()),
        }

        // Append-only and read monotonicity outside replacements.
        let after_peer = client.active_conversation().map(|c| c.peer_id.clone());
        if !replaced && before_peer == after_peer {
            let log = client.messages();
            assert!(log.len() >= before.len());
            for (old, new) in before.iter().zip(log) {
                assert_eq!(old.id, new.id);
                assert!(!old.is_read || new.is_read);
            }
        }

        // Typing expires after the configured window.
        let expiry = ClientConfig::default().typing_expiry;
        for (peer_id, since) in &typing_since {
            if now - *since >= expiry {
                assert!(!client.is_typing(peer_id), "typing outlived expiry");
            }
        }
    }

    let actions = client.shutdown();
    assert!(actions.contains(&ClientAction::CloseTransport));
    assert!(client.messages().is_empty());
    assert!(client.active_conversation().is_none());
});
