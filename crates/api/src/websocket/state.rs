//! Process-wide realtime state
//!
//! Owns every live connection, the session registry and the room tracker.
//! Created once at startup, shared through `AppState`, and cleared at
//! shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::delivery::MessageRouter;
use super::events::ServerEvent;
use super::registry::SessionRegistry;
use super::room::RoomManager;

/// Global WebSocket state shared across all connections
#[derive(Clone)]
pub struct WebSocketState {
    /// All active connections indexed by session_id, registered or not
    pub connections: Arc<RwLock<HashMap<Uuid, Arc<Connection>>>>,

    /// User -> live session bindings
    pub registry: Arc<SessionRegistry>,

    /// Room manager for chat subscriptions
    pub rooms: Arc<RoomManager>,

    /// Pushes persisted messages to online recipients
    pub router: MessageRouter,
}

impl WebSocketState {
    /// Create new WebSocket state
    pub fn new() -> Self {
        let registry = Arc::new(SessionRegistry::new());
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            router: MessageRouter::new(Arc::clone(&registry)),
            registry,
            rooms: Arc::new(RoomManager::new()),
        }
    }

    /// Add a connection
    pub async fn add_connection(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.session_id, Arc::clone(&conn));

        tracing::info!(
            session_id = %conn.session_id,
            user_id = %conn.user_id,
            total_connections = connections.len(),
            "WebSocket connection added"
        );

        conn
    }

    /// Tear down a connection: rooms, registry binding, presence broadcast.
    ///
    /// Safe to call more than once for the same handle. Returns the user
    /// that went offline, if the handle was registered.
    pub async fn remove_connection(&self, session_id: &Uuid) -> Option<Uuid> {
        let removed = {
            let mut connections = self.connections.write().await;
            let removed = connections.remove(session_id);
            if let Some(conn) = &removed {
                tracing::info!(
                    session_id = %session_id,
                    user_id = %conn.user_id,
                    remaining_connections = connections.len(),
                    "WebSocket connection removed"
                );
            }
            removed
        };

        if let Some(conn) = &removed {
            self.rooms.remove_connection(conn).await;
        }

        let offline = self.registry.unregister(session_id).await;
        if let Some(user_id) = offline {
            self.broadcast_all(ServerEvent::UserOffline { user_id }, Some(*session_id))
                .await;
        }
        offline
    }

    /// Handle a `register` event.
    ///
    /// A missing, empty or unparsable user id, or one that differs from the
    /// connection's authenticated user, is logged and ignored.
    pub async fn register(&self, raw_user_id: Option<&str>, conn: &Arc<Connection>) -> Option<Uuid> {
        let raw = raw_user_id.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            tracing::warn!(session_id = %conn.session_id, "Register without user id ignored");
            return None;
        }

        let user_id = match Uuid::parse_str(raw) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(session_id = %conn.session_id, error = %e, "Register with malformed user id ignored");
                return None;
            }
        };

        if user_id != conn.user_id {
            tracing::warn!(
                session_id = %conn.session_id,
                claimed = %user_id,
                authenticated = %conn.user_id,
                "Register for a different user ignored"
            );
            return None;
        }

        let registration = self.registry.register(user_id, Arc::clone(conn)).await;

        // Disconnect may have run while we were registering
        if !self.connections.read().await.contains_key(&conn.session_id) {
            tracing::debug!(session_id = %conn.session_id, "Connection closed during register");
            self.registry.unregister(&conn.session_id).await;
            return None;
        }

        if let Some(displaced) = registration.displaced_user {
            self.broadcast_all(ServerEvent::UserOffline { user_id: displaced }, Some(conn.session_id))
                .await;
        }
        self.broadcast_all(ServerEvent::UserOnline { user_id }, Some(conn.session_id))
            .await;
        let _ = conn.send(ServerEvent::OnlineUsers {
            user_ids: registration.online_users,
        });

        Some(user_id)
    }

    /// Send an event to every live connection except `exclude`
    pub async fn broadcast_all(&self, event: ServerEvent, exclude: Option<Uuid>) {
        let connections = self.connections.read().await;
        for conn in connections.values().filter(|c| Some(c.session_id) != exclude) {
            let _ = conn.send(event.clone());
        }
    }

    /// Online flag for each requested user
    pub async fn online_status(&self, user_ids: &[Uuid]) -> HashMap<Uuid, bool> {
        let mut statuses = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            statuses.insert(*user_id, self.registry.is_online(user_id).await);
        }
        statuses
    }

    /// Get total number of active connections
    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    /// Get statistics about the WebSocket state
    pub async fn get_stats(&self) -> WebSocketStats {
        WebSocketStats {
            active_connections: self.connection_count().await,
            active_rooms: self.rooms.get_room_count().await,
            online_users: self.registry.online_count().await,
        }
    }

    /// Drop all realtime state, used at shutdown
    pub async fn shutdown(&self) {
        let count = {
            let mut connections = self.connections.write().await;
            let count = connections.len();
            connections.clear();
            count
        };
        self.rooms.clear().await;
        self.registry.clear().await;

        tracing::info!(closed_connections = count, "Realtime state cleared");
    }
}

impl Default for WebSocketState {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about WebSocket connections
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketStats {
    /// Number of active connections
    pub active_connections: usize,
    /// Number of non-empty chat rooms
    pub active_rooms: usize,
    /// Number of registered users
    pub online_users: usize,
}
