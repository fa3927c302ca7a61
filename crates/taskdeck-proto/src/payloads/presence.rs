//! Presence and delivery-state payloads.

use serde::{Deserialize, Serialize};

use super::chat::{MessageId, UserId};

/// Status string the server uses for a connected user.
pub const STATUS_ONLINE: &str = "online";

/// Status string the server uses for a disconnected user.
pub const STATUS_OFFLINE: &str = "offline";

/// `userStatus` event body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    /// User whose status changed.
    pub user_id: UserId,
    /// `"online"` or `"offline"`. Anything else counts as offline.
    pub status: String,
}

impl UserStatus {
    /// True only for the exact `"online"` status.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == STATUS_ONLINE
    }
}

/// `userTyping` event body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTyping {
    /// User who started or stopped typing.
    pub user_id: UserId,
    /// Typing state.
    pub is_typing: bool,
}

/// `typing` command body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    /// Peer to notify.
    pub receiver_id: UserId,
    /// Typing state.
    pub is_typing: bool,
}

/// `messageRead` event and `markAsRead` command body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    /// Message that was read.
    pub message_id: MessageId,
}
