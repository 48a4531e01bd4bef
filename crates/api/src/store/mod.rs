//! Storage collaborators for chats, messages and relationships
//!
//! The realtime layer treats storage as the system of record. Two backends
//! implement the traits below:
//!
//! - **postgres**: sqlx-backed store, uniqueness enforced by indexes
//! - **memory**: single-process store used by tests and `STORE_BACKEND=memory`
//!
//! [`RetryingStore`] wraps either backend with per-call timeouts and bounded
//! retries for transient failures.

pub mod memory;
pub mod postgres;
pub mod retry;

use async_trait::async_trait;
use campusnet_shared::{Chat, Message, RelationshipState, StoreError};
use time::OffsetDateTime;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use retry::{RetryPolicy, RetryingStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Chats and messages
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn get_chat(&self, chat_id: Uuid) -> StoreResult<Option<Chat>>;

    /// Return the chat for the unordered pair, creating it if absent.
    ///
    /// Concurrent calls for the same pair must resolve to one chat.
    async fn get_or_create_chat(&self, a: Uuid, b: Uuid) -> StoreResult<Chat>;

    /// Chats the user participates in, most recent activity first
    async fn list_chats_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Chat>>;

    /// Persist a message and move the chat's last-message pointer to it.
    ///
    /// Inserting the same message id twice is a no-op.
    async fn append_message(&self, message: &Message) -> StoreResult<()>;

    /// Messages of a chat, newest first, skipping `skip` and returning at most `take`
    async fn recent_messages(&self, chat_id: Uuid, skip: u64, take: u32) -> StoreResult<Vec<Message>>;

    /// Add a receipt for `user_id` to every message of the chat lacking one.
    ///
    /// Returns the number of receipts added.
    async fn mark_read(&self, chat_id: Uuid, user_id: Uuid, read_at: OffsetDateTime) -> StoreResult<u64>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> StoreResult<()>;
}

/// Connection relationships between users
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn get_relationship(&self, a: Uuid, b: Uuid) -> StoreResult<Option<RelationshipState>>;

    /// Replace the relationship state only if it still equals `expected`.
    ///
    /// `None` means no relationship. Returns whether the swap happened.
    async fn compare_and_set_relationship(
        &self,
        a: Uuid,
        b: Uuid,
        expected: Option<RelationshipState>,
        next: Option<RelationshipState>,
    ) -> StoreResult<bool>;

    /// Users connected to `user_id`
    async fn list_connected(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;
}
