//! Chat service
//!
//! Opening chats, reading history and sending messages. A message is
//! persisted before any push, so a recipient that misses the push still
//! finds it in history.

use std::sync::Arc;
use uuid::Uuid;

use campusnet_shared::{Chat, Message, MessagePage, MessageType};

use super::{participant_chat, ChatError, ChatResult, RelationshipService};
use crate::store::ChatStore;
use crate::websocket::delivery::{DeliveryReport, MessageRouter};

#[derive(Debug, Clone, Copy)]
pub struct ChatLimits {
    /// Maximum message length in characters
    pub message_max_length: usize,
    pub history_default_limit: u32,
    pub history_max_limit: u32,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            message_max_length: 5000,
            history_default_limit: 50,
            history_max_limit: 100,
        }
    }
}

/// A persisted message and how its push went
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub delivery: DeliveryReport,
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    relationships: RelationshipService,
    router: MessageRouter,
    limits: ChatLimits,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ChatStore>,
        relationships: RelationshipService,
        router: MessageRouter,
        limits: ChatLimits,
    ) -> Self {
        Self {
            store,
            relationships,
            router,
            limits,
        }
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    /// Chats of `user_id`, most recent activity first
    pub async fn list_chats(&self, user_id: Uuid) -> ChatResult<Vec<Chat>> {
        Ok(self.store.list_chats_for_user(user_id).await?)
    }

    /// Open (or create) the chat between `user_id` and `other`.
    ///
    /// Both users must be connected.
    pub async fn open_chat(&self, user_id: Uuid, other: Uuid) -> ChatResult<Chat> {
        if user_id == other {
            return Err(ChatError::SelfTarget);
        }
        if !self.relationships.is_connected(user_id, other).await? {
            return Err(ChatError::NotConnected);
        }

        let chat = self.store.get_or_create_chat(user_id, other).await?;
        tracing::debug!(chat_id = %chat.id, user_id = %user_id, other = %other, "Chat opened");
        Ok(chat)
    }

    /// A chat the user participates in
    pub async fn chat_for(&self, chat_id: Uuid, user_id: Uuid) -> ChatResult<Chat> {
        participant_chat(self.store.as_ref(), chat_id, user_id).await
    }

    /// One page of history. Page 1 holds the newest messages; within a page
    /// messages are oldest first.
    pub async fn history(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> ChatResult<MessagePage> {
        self.chat_for(chat_id, user_id).await?;

        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(self.limits.history_default_limit)
            .clamp(1, self.limits.history_max_limit);
        let skip = u64::from(page - 1) * u64::from(limit);

        // One extra row tells us whether an older page exists
        let mut messages = self
            .store
            .recent_messages(chat_id, skip, limit.saturating_add(1))
            .await?;
        let has_more = messages.len() > limit as usize;
        messages.truncate(limit as usize);
        messages.reverse();

        Ok(MessagePage {
            messages,
            page,
            limit,
            has_more,
        })
    }

    /// Validate, persist and push a message
    pub async fn send_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        content: String,
        message_type: MessageType,
    ) -> ChatResult<SentMessage> {
        self.validate_content(&content)?;
        let mut chat = self.chat_for(chat_id, sender_id).await?;

        let message = Message::new(chat_id, sender_id, content, message_type);
        self.store.append_message(&message).await?;

        chat.last_message_id = Some(message.id);
        chat.last_message_at = message.created_at;

        tracing::info!(
            chat_id = %chat_id,
            message_id = %message.id,
            sender_id = %sender_id,
            "Message persisted"
        );

        let delivery = self.router.deliver(&message, &chat).await;
        Ok(SentMessage { message, delivery })
    }

    fn validate_content(&self, content: &str) -> ChatResult<()> {
        if content.trim().is_empty() {
            return Err(ChatError::Validation("Message content cannot be empty".to_string()));
        }
        if content.chars().count() > self.limits.message_max_length {
            return Err(ChatError::Validation(format!(
                "Message content exceeds {} characters",
                self.limits.message_max_length
            )));
        }
        Ok(())
    }
}
