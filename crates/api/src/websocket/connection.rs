//! WebSocket connection management
//!
//! Represents one live socket: its handle (`session_id`), the authenticated
//! user behind it and the chat rooms it has joined.

use std::collections::HashSet;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::events::ServerEvent;

/// Represents an active WebSocket connection
#[derive(Debug)]
pub struct Connection {
    /// Connection handle, unique per socket
    pub session_id: Uuid,

    /// User authenticated by the upgrade token
    pub user_id: Uuid,

    /// Channel to send events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    /// Chat rooms this connection has joined
    pub rooms: Arc<RwLock<HashSet<Uuid>>>,

    pub connected_at: OffsetDateTime,
}

impl Connection {
    /// Create a new connection
    pub fn new(user_id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            sender,
            rooms: Arc::new(RwLock::new(HashSet::new())),
            connected_at: OffsetDateTime::now_utc(),
        }
    }

    /// Send an event to this connection
    ///
    /// Returns Ok(()) if sent successfully, Err if connection is closed
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed event
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }

    /// Whether the socket's writer task has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Record that this connection joined a room; returns false if already joined
    pub async fn track_room(&self, chat_id: Uuid) -> bool {
        self.rooms.write().await.insert(chat_id)
    }

    /// Record that this connection left a room; returns false if it was not a member
    pub async fn untrack_room(&self, chat_id: &Uuid) -> bool {
        self.rooms.write().await.remove(chat_id)
    }

    pub async fn in_room(&self, chat_id: &Uuid) -> bool {
        self.rooms.read().await.contains(chat_id)
    }

    /// Drain all joined rooms, used on disconnect
    pub async fn take_rooms(&self) -> HashSet<Uuid> {
        std::mem::take(&mut *self.rooms.write().await)
    }
}
