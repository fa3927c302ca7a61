//! Chat data model as it appears on the wire.
//!
//! The backend is a JSON API, so ids may arrive either as strings (document
//! ids) or as integers. Both decode into the same string-backed newtypes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Decode an id that may be a JSON string or a JSON integer.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Stable user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        id_string(deserializer).map(Self)
    }
}

impl UserId {
    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Server-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        id_string(deserializer).map(Self)
    }
}

impl MessageId {
    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Preview of the newest message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    /// Message text.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One entry of the server-owned conversation list.
///
/// Unique per peer. The client never creates or deletes these; the list is
/// replaced wholesale on every `conversationsUpdated` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// The other participant.
    #[serde(alias = "userId")]
    pub peer_id: UserId,
    /// Display name of the peer.
    #[serde(default)]
    pub name: String,
    /// Presentation colour or avatar key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Newest message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    /// Messages from the peer not yet read by the local user.
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// Conversation with no history.
    #[must_use]
    pub fn new(peer_id: UserId, name: impl Into<String>) -> Self {
        Self { peer_id, name: name.into(), color: None, last_message: None, unread_count: 0 }
    }
}

/// A private message between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server id. `None` until the server has accepted the message.
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Author.
    #[serde(alias = "sender")]
    pub sender_id: UserId,
    /// Recipient.
    #[serde(alias = "receiver")]
    pub receiver_id: UserId,
    /// Message body.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Recipient has read the message.
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    /// True if this message was exchanged between `a` and `b`, in either
    /// direction.
    #[must_use]
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        (self.sender_id == *a && self.receiver_id == *b)
            || (self.sender_id == *b && self.receiver_id == *a)
    }
}

/// `privateMessage` command body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessage {
    /// Recipient.
    pub receiver_id: UserId,
    /// Message body, already trimmed.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_accepts_document_style_fields() {
        let message: Message = serde_json::from_value(json!({
            "_id": "65f0",
            "sender": "u1",
            "receiver": "u2",
            "text": "hi",
            "createdAt": "2024-03-01T10:00:00Z",
        }))
        .unwrap();

        assert_eq!(message.id, Some(MessageId::from("65f0")));
        assert_eq!(message.sender_id, UserId::from("u1"));
        assert!(!message.is_read);
    }

    #[test]
    fn numeric_ids_decode_as_strings() {
        let message: Message = serde_json::from_value(json!({
            "id": 1,
            "senderId": 42,
            "receiverId": "u7",
            "text": "hi",
            "createdAt": "2024-03-01T10:00:00Z",
            "isRead": true,
        }))
        .unwrap();

        assert_eq!(message.id, Some(MessageId::from("1")));
        assert_eq!(message.sender_id, UserId::from("42"));
        assert!(message.is_read);
    }

    #[test]
    fn unsent_message_omits_id() {
        let message = Message {
            id: None,
            sender_id: "u1".into(),
            receiver_id: "u2".into(),
            text: "draft".into(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            is_read: false,
        };

        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["senderId"], "u1");
    }

    #[test]
    fn conversation_defaults_missing_fields() {
        let conversation: Conversation =
            serde_json::from_value(json!({ "peerId": "u42", "unreadCount": 3 })).unwrap();

        assert_eq!(conversation.peer_id, UserId::from("u42"));
        assert_eq!(conversation.unread_count, 3);
        assert!(conversation.last_message.is_none());
    }

    #[test]
    fn is_between_ignores_direction() {
        let message = Message {
            id: None,
            sender_id: "a".into(),
            receiver_id: "b".into(),
            text: String::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            is_read: false,
        };

        assert!(message.is_between(&"a".into(), &"b".into()));
        assert!(message.is_between(&"b".into(), &"a".into()));
        assert!(!message.is_between(&"a".into(), &"c".into()));
    }
}
