//! Chat room management for pub/sub
//!
//! Manages chat "rooms" for broadcasting ephemeral events (typing
//! indicators) to the connections that joined them. A room with no members
//! has no entry.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;

/// Manages chat "rooms" for broadcasting events
pub struct RoomManager {
    /// Map of chat_id -> member connections
    rooms: Arc<RwLock<HashMap<Uuid, Vec<Arc<Connection>>>>>,
}

impl RoomManager {
    /// Create a new room manager
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a connection to a chat room; joining twice is a no-op
    pub async fn join(&self, chat_id: Uuid, conn: Arc<Connection>) -> bool {
        // A socket that is already torn down must not reappear in a room
        if conn.is_closed() {
            tracing::debug!(session_id = %conn.session_id, "Ignoring join from closed connection");
            return false;
        }

        let joined = {
            let mut rooms = self.rooms.write().await;
            let members = rooms.entry(chat_id).or_default();
            if members.iter().any(|c| c.session_id == conn.session_id) {
                false
            } else {
                members.push(Arc::clone(&conn));
                tracing::debug!(
                    chat_id = %chat_id,
                    session_id = %conn.session_id,
                    room_size = members.len(),
                    "Connection joined chat room"
                );
                true
            }
        };

        conn.track_room(chat_id).await;
        joined
    }

    /// Remove a connection from a chat room; leaving a room one is not in is a no-op
    pub async fn leave(&self, chat_id: &Uuid, conn: &Connection) -> bool {
        let left = {
            let mut rooms = self.rooms.write().await;
            match rooms.get_mut(chat_id) {
                Some(members) => {
                    let before = members.len();
                    members.retain(|c| c.session_id != conn.session_id);
                    let left = members.len() < before;

                    if members.is_empty() {
                        rooms.remove(chat_id);
                        tracing::debug!(chat_id = %chat_id, "Removed empty chat room");
                    }
                    left
                }
                None => false,
            }
        };

        conn.untrack_room(chat_id).await;
        left
    }

    /// Broadcast an event to every member of a chat room except `exclude`
    ///
    /// Silently ignores send errors (closed connections are cleaned up on
    /// disconnect). Returns the number of connections reached.
    pub async fn broadcast(&self, chat_id: &Uuid, event: ServerEvent, exclude: Option<Uuid>) -> usize {
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(chat_id) else {
            tracing::debug!(chat_id = %chat_id, event_type = event.kind(), "No members in chat room");
            return 0;
        };

        let mut success_count = 0;
        let mut failed_count = 0;

        for conn in members.iter().filter(|c| Some(c.session_id) != exclude) {
            match conn.send(event.clone()) {
                Ok(()) => success_count += 1,
                Err(_) => {
                    failed_count += 1;
                    tracing::warn!(
                        session_id = %conn.session_id,
                        "Failed to send event to connection (likely closed)"
                    );
                }
            }
        }

        tracing::debug!(
            chat_id = %chat_id,
            event_type = event.kind(),
            recipients = success_count,
            failed = failed_count,
            "Broadcast event to chat room"
        );

        success_count
    }

    /// Remove a connection from every room it joined
    pub async fn remove_connection(&self, conn: &Connection) {
        let joined = conn.take_rooms().await;
        if joined.is_empty() {
            return;
        }

        let mut rooms = self.rooms.write().await;
        for chat_id in &joined {
            if let Some(members) = rooms.get_mut(chat_id) {
                members.retain(|c| c.session_id != conn.session_id);
                if members.is_empty() {
                    rooms.remove(chat_id);
                }
            }
        }

        tracing::debug!(
            session_id = %conn.session_id,
            room_count = joined.len(),
            "Removed connection from rooms"
        );
    }

    /// Session ids currently in a chat room
    pub async fn members(&self, chat_id: &Uuid) -> Vec<Uuid> {
        let rooms = self.rooms.read().await;
        rooms
            .get(chat_id)
            .map(|m| m.iter().map(|c| c.session_id).collect())
            .unwrap_or_default()
    }

    /// Get room size (number of connections) for a chat
    pub async fn get_room_size(&self, chat_id: &Uuid) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(chat_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Get total number of non-empty rooms
    pub async fn get_room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }

    /// Drop every room, used at shutdown
    pub async fn clear(&self) {
        self.rooms.write().await.clear();
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
