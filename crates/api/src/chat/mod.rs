//! Chat lifecycle: connections, chats, messages and read receipts
//!
//! Services here sit between the HTTP/WebSocket surface and the stores.
//! They enforce who may talk to whom; the stores only persist.

pub mod receipts;
pub mod relationships;
pub mod service;

use campusnet_shared::{Chat, StoreError, TransitionError};
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::ChatStore;

pub use receipts::ReadReceiptTracker;
pub use relationships::RelationshipService;
pub use service::{ChatLimits, ChatService, SentMessage};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat not found")]
    ChatNotFound,
    #[error("Not a participant of this chat")]
    NotParticipant,
    #[error("Users must be connected to chat")]
    NotConnected,
    #[error("Cannot target yourself")]
    SelfTarget,
    #[error("{0}")]
    Validation(String),
    #[error("Relationship changed concurrently, retry")]
    Contended,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ChatResult<T> = Result<T, ChatError>;

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::ChatNotFound => ApiError::NotFound,
            ChatError::NotParticipant | ChatError::NotConnected => ApiError::AccessDenied(err.to_string()),
            ChatError::SelfTarget => ApiError::BadRequest(err.to_string()),
            ChatError::Validation(msg) => ApiError::Validation(msg),
            ChatError::Contended => ApiError::Conflict(err.to_string()),
            ChatError::Transition(e) => e.into(),
            ChatError::Store(e) => e.into(),
        }
    }
}

/// Load a chat and require `user_id` to be one of its participants
pub async fn participant_chat(store: &dyn ChatStore, chat_id: Uuid, user_id: Uuid) -> ChatResult<Chat> {
    let chat = store.get_chat(chat_id).await?.ok_or(ChatError::ChatNotFound)?;
    if !chat.has_participant(user_id) {
        tracing::warn!(chat_id = %chat_id, user_id = %user_id, "Non-participant accessed chat");
        return Err(ChatError::NotParticipant);
    }
    Ok(chat)
}
