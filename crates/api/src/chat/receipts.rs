//! Read receipts
//!
//! Marking a chat read adds a receipt for the reader to every message that
//! lacks one. Repeating the call adds nothing. No realtime event is sent.

use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{participant_chat, ChatResult};
use crate::store::ChatStore;

#[derive(Clone)]
pub struct ReadReceiptTracker {
    store: Arc<dyn ChatStore>,
}

impl ReadReceiptTracker {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Returns the number of receipts added
    pub async fn mark_read(&self, chat_id: Uuid, user_id: Uuid) -> ChatResult<u64> {
        participant_chat(self.store.as_ref(), chat_id, user_id).await?;

        let updated = self
            .store
            .mark_read(chat_id, user_id, OffsetDateTime::now_utc())
            .await?;

        tracing::debug!(chat_id = %chat_id, user_id = %user_id, updated, "Chat marked read");
        Ok(updated)
    }
}
