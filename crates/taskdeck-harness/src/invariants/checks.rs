//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::BTreeSet;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// The open conversation must be in the conversation list.
///
/// The list is only ever replaced by the server and never shrinks, and
/// conversations are only opened from it, so an unlisted active peer means
/// the view drifted from the data.
pub struct ActiveConversationListed;

impl Invariant for ActiveConversationListed {
    fn name(&self) -> &'static str {
        "active_conversation_listed"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if let Some(active) = &client.active_peer
                && !client.conversations.contains(active)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: active peer {active} not in {:?}",
                        client.user, client.conversations
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Between history replacements the log only grows at the end.
pub struct AppendOnlyLog;

impl Invariant for AppendOnlyLog {
    fn name(&self) -> &'static str {
        "append_only_log"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(previous) = &client.previous_log else {
                continue;
            };

            let kept = previous.len() <= client.messages.len()
                && previous.iter().zip(&client.messages).all(|(before, now)| {
                    before.id == now.id
                        && before.sender_id == now.sender_id
                        && before.text == now.text
                });
            if !kept {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: log of {} messages rewritten to {}",
                        client.user,
                        previous.len(),
                        client.messages.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A message shown as read never goes back to unread.
///
/// Only compared across checks with no history replacement in between.
pub struct ReadMonotonicity;

impl Invariant for ReadMonotonicity {
    fn name(&self) -> &'static str {
        "read_monotonicity"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(previous) = &client.previous_log else {
                continue;
            };

            let unread_again = previous
                .iter()
                .zip(&client.messages)
                .find(|(before, now)| before.is_read && !now.is_read);
            if let Some((message, _)) = unread_again {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: message {:?} went back to unread",
                        client.user, message.id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Every logged message belongs to the open conversation.
pub struct LogMatchesConversation;

impl Invariant for LogMatchesConversation {
    fn name(&self) -> &'static str {
        "log_matches_conversation"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(peer) = &client.active_peer else {
                if !client.messages.is_empty() {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{}: log without an open conversation", client.user),
                    });
                }
                continue;
            };

            if let Some(stray) = client.messages.iter().find(|m| !m.is_between(&client.user, peer))
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: message {} -> {} in conversation with {peer}",
                        client.user, stray.sender_id, stray.receiver_id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Without a live channel nobody is shown online or typing.
pub struct PresenceUnknownWhenDisconnected;

impl Invariant for PresenceUnknownWhenDisconnected {
    fn name(&self) -> &'static str {
        "presence_unknown_when_disconnected"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if client.connected {
                continue;
            }

            if let Some((peer, label)) =
                client.presence.iter().find(|(_, label)| **label != "unknown")
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{}: {peer} shown {label} while disconnected", client.user),
                });
            }

            if !client.typing.is_empty() {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: typing {:?} while disconnected",
                        client.user, client.typing
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A server message appears at most once in the log.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "unique_message_ids"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let mut seen = BTreeSet::new();
            for id in client.messages.iter().filter_map(|m| m.id.as_ref()) {
                if !seen.insert(id) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{}: message {id} logged twice", client.user),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The view model agrees with the session it mirrors.
///
/// Typing is compared only while connected; the view hides it otherwise.
/// Skipped for snapshots taken without session state.
pub struct ViewMatchesSession;

impl Invariant for ViewMatchesSession {
    fn name(&self) -> &'static str {
        "view_matches_session"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(session) = &client.session else {
                continue;
            };

            let mismatch = if client.connected != session.connected {
                Some("connection state")
            } else if client.conversations != session.conversations {
                Some("conversation list")
            } else if client.active_peer != session.active_peer {
                Some("active conversation")
            } else if client.messages != session.messages {
                Some("message log")
            } else if client.connected && client.typing != session.typing {
                Some("typing peers")
            } else {
                None
            };

            if let Some(what) = mismatch {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{}: {what} differs from session", client.user),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use taskdeck_proto::{Message, MessageId, UserId};

    use super::*;
    use crate::invariants::{ClientSnapshot, SessionSnapshot};

    fn client(user: &str) -> ClientSnapshot {
        ClientSnapshot {
            user: UserId::from(user),
            connected: true,
            conversations: vec![],
            active_peer: None,
            messages: vec![],
            presence: Default::default(),
            typing: BTreeSet::new(),
            session: None,
            previous_log: None,
        }
    }

    fn message(id: &str, from: &str, to: &str) -> Message {
        Message {
            id: Some(MessageId::from(id)),
            sender_id: UserId::from(from),
            receiver_id: UserId::from(to),
            text: String::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            is_read: false,
        }
    }

    #[test]
    fn unlisted_active_peer_violates() {
        let mut me = client("me");
        me.active_peer = Some(UserId::from("bob"));
        let state = SystemSnapshot::single(me.clone());
        assert!(ActiveConversationListed.check(&state).is_err());

        me.conversations.push(UserId::from("bob"));
        assert!(ActiveConversationListed.check(&SystemSnapshot::single(me)).is_ok());
    }

    #[test]
    fn foreign_message_in_log_violates() {
        let mut me = client("me");
        me.active_peer = Some(UserId::from("bob"));
        me.messages = vec![message("m1", "bob", "me"), message("m2", "carol", "me")];
        let err = LogMatchesConversation.check(&SystemSnapshot::single(me)).unwrap_err();
        assert_eq!(err.invariant, "log_matches_conversation");
    }

    #[test]
    fn log_without_conversation_violates() {
        let mut me = client("me");
        me.messages = vec![message("m1", "bob", "me")];
        assert!(LogMatchesConversation.check(&SystemSnapshot::single(me)).is_err());
    }

    #[test]
    fn presence_while_disconnected_violates() {
        let mut me = client("me");
        me.connected = false;
        me.presence.insert(UserId::from("bob"), "unknown");
        assert!(PresenceUnknownWhenDisconnected.check(&SystemSnapshot::single(me.clone())).is_ok());

        me.presence.insert(UserId::from("bob"), "online");
        assert!(PresenceUnknownWhenDisconnected.check(&SystemSnapshot::single(me)).is_err());
    }

    #[test]
    fn duplicate_ids_violate() {
        let mut me = client("me");
        me.active_peer = Some(UserId::from("bob"));
        me.messages = vec![message("m1", "bob", "me"), message("m1", "bob", "me")];
        assert!(UniqueMessageIds.check(&SystemSnapshot::single(me)).is_err());
    }

    #[test]
    fn rewritten_log_violates() {
        let me = client("me")
            .with_previous_log(vec![message("m1", "bob", "me"), message("m2", "me", "bob")]);
        let mut grown = me.clone();
        grown.messages =
            vec![message("m1", "bob", "me"), message("m2", "me", "bob"), message("m3", "bob", "me")];
        assert!(AppendOnlyLog.check(&SystemSnapshot::single(grown)).is_ok());

        let mut shrunk = me;
        shrunk.messages = vec![message("m2", "me", "bob")];
        assert!(AppendOnlyLog.check(&SystemSnapshot::single(shrunk)).is_err());
    }

    #[test]
    fn unread_after_read_violates() {
        let mut read = message("m1", "bob", "me");
        read.is_read = true;
        let mut me = client("me").with_previous_log(vec![read.clone()]);
        me.messages = vec![read];
        assert!(ReadMonotonicity.check(&SystemSnapshot::single(me.clone())).is_ok());

        me.messages = vec![message("m1", "bob", "me")];
        assert!(ReadMonotonicity.check(&SystemSnapshot::single(me)).is_err());
    }

    #[test]
    fn diverging_session_violates() {
        let mut me = client("me");
        let session = SessionSnapshot { connected: false, ..SessionSnapshot::default() };
        me = me.with_session(session);
        let err = ViewMatchesSession.check(&SystemSnapshot::single(me)).unwrap_err();
        assert!(err.message.contains("connection state"));
    }
}
