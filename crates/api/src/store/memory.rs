//! In-process store
//!
//! Holds everything behind one `RwLock`; each operation takes the lock once,
//! so get-or-create and compare-and-set are atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use campusnet_shared::{ordered_pair, Chat, Message, ReadReceipt, RelationshipState, StoreError};

use super::{ChatStore, RelationshipStore, StoreResult};

#[derive(Default)]
struct MemoryData {
    chats: HashMap<Uuid, Chat>,
    /// Sorted participant pair -> chat id
    chat_pairs: HashMap<(Uuid, Uuid), Uuid>,
    /// chat id -> messages in insertion order
    messages: HashMap<Uuid, Vec<Message>>,
    relationships: HashMap<(Uuid, Uuid), RelationshipState>,
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of chats, for tests
    pub async fn chat_count(&self) -> usize {
        self.data.read().await.chats.len()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn get_chat(&self, chat_id: Uuid) -> StoreResult<Option<Chat>> {
        Ok(self.data.read().await.chats.get(&chat_id).cloned())
    }

    async fn get_or_create_chat(&self, a: Uuid, b: Uuid) -> StoreResult<Chat> {
        let pair = ordered_pair(a, b);
        let mut data = self.data.write().await;

        if let Some(chat) = data.chat_pairs.get(&pair).and_then(|id| data.chats.get(id)) {
            return Ok(chat.clone());
        }

        let chat = Chat::new(a, b);
        data.chat_pairs.insert(pair, chat.id);
        data.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Chat>> {
        let data = self.data.read().await;
        let mut chats: Vec<Chat> = data
            .chats
            .values()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(chats)
    }

    async fn append_message(&self, message: &Message) -> StoreResult<()> {
        let mut data = self.data.write().await;

        let chat = data
            .chats
            .get_mut(&message.chat_id)
            .ok_or_else(|| StoreError::NotFound(format!("chat {}", message.chat_id)))?;
        chat.last_message_id = Some(message.id);
        chat.last_message_at = message.created_at;

        let messages = data.messages.entry(message.chat_id).or_default();
        if !messages.iter().any(|m| m.id == message.id) {
            messages.push(message.clone());
        }
        Ok(())
    }

    async fn recent_messages(&self, chat_id: Uuid, skip: u64, take: u32) -> StoreResult<Vec<Message>> {
        let data = self.data.read().await;
        let messages = match data.messages.get(&chat_id) {
            Some(m) => m,
            None => return Ok(Vec::new()),
        };

        Ok(messages
            .iter()
            .rev()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(take as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, chat_id: Uuid, user_id: Uuid, read_at: OffsetDateTime) -> StoreResult<u64> {
        let mut data = self.data.write().await;
        let mut updated = 0;

        if let Some(messages) = data.messages.get_mut(&chat_id) {
            for message in messages.iter_mut().filter(|m| !m.is_read_by(user_id)) {
                message.read_by.push(ReadReceipt { user_id, read_at });
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn get_relationship(&self, a: Uuid, b: Uuid) -> StoreResult<Option<RelationshipState>> {
        let data = self.data.read().await;
        Ok(data.relationships.get(&ordered_pair(a, b)).copied())
    }

    async fn compare_and_set_relationship(
        &self,
        a: Uuid,
        b: Uuid,
        expected: Option<RelationshipState>,
        next: Option<RelationshipState>,
    ) -> StoreResult<bool> {
        let pair = ordered_pair(a, b);
        let mut data = self.data.write().await;

        if data.relationships.get(&pair).copied() != expected {
            return Ok(false);
        }
        match next {
            Some(state) => data.relationships.insert(pair, state),
            None => data.relationships.remove(&pair),
        };
        Ok(true)
    }

    async fn list_connected(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let data = self.data.read().await;
        Ok(data
            .relationships
            .iter()
            .filter(|(_, state)| **state == RelationshipState::Connected)
            .filter_map(|((low, high), _)| {
                if *low == user_id {
                    Some(*high)
                } else if *high == user_id {
                    Some(*low)
                } else {
                    None
                }
            })
            .collect())
    }
}
