//! Timeout and retry decorator for stores
//!
//! Every call is bounded by [`RetryPolicy::timeout`]. Timeouts and other
//! transient errors are retried with exponential backoff and jitter; once
//! retries run out the error becomes [`StoreError::Unavailable`]. Permanent
//! errors are returned immediately.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use time::OffsetDateTime;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use uuid::Uuid;

use campusnet_shared::{Chat, Message, RelationshipState, StoreError};

use super::{ChatStore, RelationshipStore, StoreResult};

/// Backoff grows 100ms, 200ms, 400ms... before jitter
const RETRY_BASE: u64 = 2;
const RETRY_FACTOR: u64 = 50;
const RETRY_MAX_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Upper bound for a single store call
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

/// Run `op` under the policy's timeout, retrying transient failures
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, operation: &'static str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let strategy = ExponentialBackoff::from_millis(RETRY_BASE)
        .factor(RETRY_FACTOR)
        .max_delay(RETRY_MAX_DELAY)
        .map(jitter)
        .take(policy.max_retries);

    let result = RetryIf::spawn(
        strategy,
        || {
            let fut = op();
            async move {
                match tokio::time::timeout(policy.timeout, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::Transient(format!(
                        "{} timed out after {}ms",
                        operation,
                        policy.timeout.as_millis()
                    ))),
                }
            }
        },
        |e: &StoreError| {
            let transient = e.is_transient();
            if transient {
                tracing::warn!(operation, error = %e, "Transient store error - will retry");
            }
            transient
        },
    )
    .await;

    match result {
        Err(StoreError::Transient(msg)) => {
            tracing::error!(operation, error = %msg, "Store retries exhausted");
            Err(StoreError::Unavailable(msg))
        }
        other => other,
    }
}

/// Store wrapper applying [`with_retry`] to every call
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: ChatStore> ChatStore for RetryingStore<S> {
    async fn get_chat(&self, chat_id: Uuid) -> StoreResult<Option<Chat>> {
        with_retry(self.policy, "get_chat", || self.inner.get_chat(chat_id)).await
    }

    async fn get_or_create_chat(&self, a: Uuid, b: Uuid) -> StoreResult<Chat> {
        with_retry(self.policy, "get_or_create_chat", || self.inner.get_or_create_chat(a, b)).await
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Chat>> {
        with_retry(self.policy, "list_chats_for_user", || {
            self.inner.list_chats_for_user(user_id)
        })
        .await
    }

    async fn append_message(&self, message: &Message) -> StoreResult<()> {
        with_retry(self.policy, "append_message", || self.inner.append_message(message)).await
    }

    async fn recent_messages(&self, chat_id: Uuid, skip: u64, take: u32) -> StoreResult<Vec<Message>> {
        with_retry(self.policy, "recent_messages", || {
            self.inner.recent_messages(chat_id, skip, take)
        })
        .await
    }

    async fn mark_read(&self, chat_id: Uuid, user_id: Uuid, read_at: OffsetDateTime) -> StoreResult<u64> {
        with_retry(self.policy, "mark_read", || {
            self.inner.mark_read(chat_id, user_id, read_at)
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        // Readiness probes want a fast answer, not retries
        match tokio::time::timeout(self.policy.timeout, self.inner.ping()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable("ping timed out".to_string())),
        }
    }
}

#[async_trait]
impl<S: RelationshipStore> RelationshipStore for RetryingStore<S> {
    async fn get_relationship(&self, a: Uuid, b: Uuid) -> StoreResult<Option<RelationshipState>> {
        with_retry(self.policy, "get_relationship", || self.inner.get_relationship(a, b)).await
    }

    async fn compare_and_set_relationship(
        &self,
        a: Uuid,
        b: Uuid,
        expected: Option<RelationshipState>,
        next: Option<RelationshipState>,
    ) -> StoreResult<bool> {
        with_retry(self.policy, "compare_and_set_relationship", || {
            self.inner.compare_and_set_relationship(a, b, expected, next)
        })
        .await
    }

    async fn list_connected(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        with_retry(self.policy, "list_connected", || self.inner.list_connected(user_id)).await
    }
}
