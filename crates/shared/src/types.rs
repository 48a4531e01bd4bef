//! Common types used across CampusNet

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Participant Pairs
// =============================================================================

/// Order two user ids so an unordered pair has exactly one representation.
///
/// Chats and relationships are keyed by this pair; the storage layer enforces
/// uniqueness on it.
pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Kind of chat message content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
}

// =============================================================================
// Database Models
// =============================================================================

/// A direct conversation between exactly two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    /// Sorted participant pair, immutable after creation
    pub participant_ids: [Uuid; 2],
    pub last_message_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Chat {
    /// Build a fresh chat for two users with no messages yet
    pub fn new(a: Uuid, b: Uuid) -> Self {
        let (low, high) = ordered_pair(a, b);
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            participant_ids: [low, high],
            last_message_id: None,
            last_message_at: now,
            created_at: now,
        }
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }

    /// The participant that is not `user_id`, if `user_id` is one of them
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        match self.participant_ids {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }
}

/// One reader's acknowledgment of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub read_at: OffsetDateTime,
}

/// A persisted chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    /// Append-only, at most one entry per reader
    pub read_by: Vec<ReadReceipt>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Message {
    /// Build a new message; the sender counts as its first reader
    pub fn new(chat_id: Uuid, sender_id: Uuid, content: String, message_type: MessageType) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            content,
            message_type,
            read_by: vec![ReadReceipt {
                user_id: sender_id,
                read_at: now,
            }],
            created_at: now,
        }
    }

    pub fn is_read_by(&self, user_id: Uuid) -> bool {
        self.read_by.iter().any(|r| r.user_id == user_id)
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// One page of chat history, oldest first within the page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub page: u32,
    pub limit: u32,
    /// Whether an older page exists
    pub has_more: bool,
}
