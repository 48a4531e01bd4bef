//! PostgreSQL store
//!
//! Schema lives in `migrations/`. Uniqueness of the participant pair is
//! enforced by `chats_participant_pair_idx`, and read receipts by the
//! `(message_id, user_id)` primary key of `message_reads`.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use campusnet_shared::{
    ordered_pair, Chat, Message, MessageType, ReadReceipt, RelationshipState, StoreError,
};

use super::{ChatStore, RelationshipStore, StoreResult};

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct ChatRow {
    id: Uuid,
    participant_low: Uuid,
    participant_high: Uuid,
    last_message_id: Option<Uuid>,
    last_message_at: OffsetDateTime,
    created_at: OffsetDateTime,
}

impl From<ChatRow> for Chat {
    fn from(row: ChatRow) -> Self {
        Chat {
            id: row.id,
            participant_ids: [row.participant_low, row.participant_high],
            last_message_id: row.last_message_id,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    chat_id: Uuid,
    sender_id: Uuid,
    content: String,
    message_type: MessageType,
    created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct ReadRow {
    message_id: Uuid,
    user_id: Uuid,
    read_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct RelationshipRow {
    state: String,
    requester_id: Option<Uuid>,
}

const CHAT_COLUMNS: &str =
    "id, participant_low, participant_high, last_message_id, last_message_at, created_at";

fn encode_state(state: RelationshipState) -> (&'static str, Option<Uuid>) {
    match state {
        RelationshipState::Pending { requester } => ("pending", Some(requester)),
        RelationshipState::Connected => ("connected", None),
    }
}

fn decode_state(row: RelationshipRow) -> StoreResult<RelationshipState> {
    match (row.state.as_str(), row.requester_id) {
        ("pending", Some(requester)) => Ok(RelationshipState::Pending { requester }),
        ("connected", _) => Ok(RelationshipState::Connected),
        (other, _) => Err(StoreError::Backend(format!(
            "invalid relationship state in database: {}",
            other
        ))),
    }
}

/// sqlx-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_chat_by_pair(&self, low: Uuid, high: Uuid) -> StoreResult<Option<Chat>> {
        let row: Option<ChatRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chats WHERE participant_low = $1 AND participant_high = $2",
            CHAT_COLUMNS
        ))
        .bind(low)
        .bind(high)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Chat::from))
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn get_chat(&self, chat_id: Uuid) -> StoreResult<Option<Chat>> {
        let row: Option<ChatRow> =
            sqlx::query_as(&format!("SELECT {} FROM chats WHERE id = $1", CHAT_COLUMNS))
                .bind(chat_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Chat::from))
    }

    async fn get_or_create_chat(&self, a: Uuid, b: Uuid) -> StoreResult<Chat> {
        let (low, high) = ordered_pair(a, b);

        if let Some(chat) = self.find_chat_by_pair(low, high).await? {
            return Ok(chat);
        }

        let candidate = Chat::new(low, high);
        let inserted: Option<ChatRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO chats (id, participant_low, participant_high, last_message_at, created_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (participant_low, participant_high) DO NOTHING
            RETURNING {}
            "#,
            CHAT_COLUMNS
        ))
        .bind(candidate.id)
        .bind(low)
        .bind(high)
        .bind(candidate.created_at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => {
                tracing::info!(chat_id = %row.id, "Chat created");
                Ok(row.into())
            }
            // Lost the insert race: read the winner's row
            None => self
                .find_chat_by_pair(low, high)
                .await?
                .ok_or_else(|| StoreError::Backend("chat vanished after conflict".to_string())),
        }
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Chat>> {
        let rows: Vec<ChatRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM chats
            WHERE participant_low = $1 OR participant_high = $1
            ORDER BY last_message_at DESC
            "#,
            CHAT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Chat::from).collect())
    }

    async fn append_message(&self, message: &Message) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, message_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(message.id)
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.message_type)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        for receipt in &message.read_by {
            sqlx::query(
                r#"
                INSERT INTO message_reads (message_id, user_id, read_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (message_id, user_id) DO NOTHING
                "#,
            )
            .bind(message.id)
            .bind(receipt.user_id)
            .bind(receipt.read_at)
            .execute(&mut *tx)
            .await?;
        }

        let touched = sqlx::query(
            "UPDATE chats SET last_message_id = $2, last_message_at = $3 WHERE id = $1",
        )
        .bind(message.chat_id)
        .bind(message.id)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if touched == 0 {
            return Err(StoreError::NotFound(format!("chat {}", message.chat_id)));
        }

        tx.commit().await?;

        tracing::debug!(
            message_id = %message.id,
            chat_id = %message.chat_id,
            duplicate = inserted == 0,
            "Message persisted"
        );

        Ok(())
    }

    async fn recent_messages(&self, chat_id: Uuid, skip: u64, take: u32) -> StoreResult<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, chat_id, sender_id, content, message_type, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY seq DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(chat_id)
        .bind(i64::try_from(skip).unwrap_or(i64::MAX))
        .bind(i64::from(take))
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let reads: Vec<ReadRow> = sqlx::query_as(
            r#"
            SELECT message_id, user_id, read_at
            FROM message_reads
            WHERE message_id = ANY($1)
            ORDER BY read_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut receipts: HashMap<Uuid, Vec<ReadReceipt>> = HashMap::new();
        for read in reads {
            receipts.entry(read.message_id).or_default().push(ReadReceipt {
                user_id: read.user_id,
                read_at: read.read_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|r| Message {
                read_by: receipts.remove(&r.id).unwrap_or_default(),
                id: r.id,
                chat_id: r.chat_id,
                sender_id: r.sender_id,
                content: r.content,
                message_type: r.message_type,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn mark_read(&self, chat_id: Uuid, user_id: Uuid, read_at: OffsetDateTime) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_reads (message_id, user_id, read_at)
            SELECT id, $2, $3 FROM messages WHERE chat_id = $1
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(read_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RelationshipStore for PgStore {
    async fn get_relationship(&self, a: Uuid, b: Uuid) -> StoreResult<Option<RelationshipState>> {
        let (low, high) = ordered_pair(a, b);
        let row: Option<RelationshipRow> = sqlx::query_as(
            "SELECT state, requester_id FROM user_connections WHERE user_low = $1 AND user_high = $2",
        )
        .bind(low)
        .bind(high)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_state).transpose()
    }

    async fn compare_and_set_relationship(
        &self,
        a: Uuid,
        b: Uuid,
        expected: Option<RelationshipState>,
        next: Option<RelationshipState>,
    ) -> StoreResult<bool> {
        let (low, high) = ordered_pair(a, b);

        let affected = match (expected, next) {
            (None, None) => return Ok(self.get_relationship(low, high).await?.is_none()),
            (None, Some(next)) => {
                let (state, requester) = encode_state(next);
                sqlx::query(
                    r#"
                    INSERT INTO user_connections (user_low, user_high, state, requester_id)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (user_low, user_high) DO NOTHING
                    "#,
                )
                .bind(low)
                .bind(high)
                .bind(state)
                .bind(requester)
                .execute(&self.pool)
                .await?
                .rows_affected()
            }
            (Some(expected), Some(next)) => {
                let (old_state, old_requester) = encode_state(expected);
                let (state, requester) = encode_state(next);
                sqlx::query(
                    r#"
                    UPDATE user_connections
                    SET state = $3, requester_id = $4, updated_at = NOW()
                    WHERE user_low = $1 AND user_high = $2
                      AND state = $5 AND requester_id IS NOT DISTINCT FROM $6
                    "#,
                )
                .bind(low)
                .bind(high)
                .bind(state)
                .bind(requester)
                .bind(old_state)
                .bind(old_requester)
                .execute(&self.pool)
                .await?
                .rows_affected()
            }
            (Some(expected), None) => {
                let (old_state, old_requester) = encode_state(expected);
                sqlx::query(
                    r#"
                    DELETE FROM user_connections
                    WHERE user_low = $1 AND user_high = $2
                      AND state = $3 AND requester_id IS NOT DISTINCT FROM $4
                    "#,
                )
                .bind(low)
                .bind(high)
                .bind(old_state)
                .bind(old_requester)
                .execute(&self.pool)
                .await?
                .rows_affected()
            }
        };

        Ok(affected == 1)
    }

    async fn list_connected(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT CASE WHEN user_low = $1 THEN user_high ELSE user_low END
            FROM user_connections
            WHERE (user_low = $1 OR user_high = $1) AND state = 'connected'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
