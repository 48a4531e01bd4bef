//! Session registry
//!
//! Maps each user to at most one live connection (the most recent
//! registration wins) and keeps a reverse index from connection handle to
//! user so disconnects resolve in O(1). Both maps are only mutated together
//! under the same write guard, and no guard is held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;

/// A user's live session
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: Uuid,
    pub connection: Arc<Connection>,
    pub connected_at: OffsetDateTime,
}

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Handle previously bound to this user, now superseded
    pub replaced_handle: Option<Uuid>,
    /// User previously bound to this handle, now offline
    pub displaced_user: Option<Uuid>,
    /// All online users after the registration, sorted
    pub online_users: Vec<Uuid>,
}

#[derive(Default)]
struct Bindings {
    by_user: HashMap<Uuid, UserSession>,
    by_handle: HashMap<Uuid, Uuid>,
}

/// Registry of online users
#[derive(Default)]
pub struct SessionRegistry {
    bindings: RwLock<Bindings>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `user_id` to `conn`, replacing any earlier binding on either side
    pub async fn register(&self, user_id: Uuid, conn: Arc<Connection>) -> Registration {
        let handle = conn.session_id;
        let mut bindings = self.bindings.write().await;

        // The handle may have been registered as a different user before
        let displaced_user = match bindings.by_handle.get(&handle).copied() {
            Some(previous) if previous != user_id => {
                bindings.by_user.remove(&previous);
                Some(previous)
            }
            _ => None,
        };

        let replaced_handle = bindings
            .by_user
            .get(&user_id)
            .map(|s| s.connection.session_id)
            .filter(|h| *h != handle);
        if let Some(old) = replaced_handle {
            bindings.by_handle.remove(&old);
        }

        bindings.by_handle.insert(handle, user_id);
        bindings.by_user.insert(
            user_id,
            UserSession {
                user_id,
                connection: conn,
                connected_at: OffsetDateTime::now_utc(),
            },
        );

        let mut online_users: Vec<Uuid> = bindings.by_user.keys().copied().collect();
        online_users.sort();

        tracing::info!(
            user_id = %user_id,
            session_id = %handle,
            replaced = replaced_handle.is_some(),
            online = online_users.len(),
            "User registered"
        );

        Registration {
            replaced_handle,
            displaced_user,
            online_users,
        }
    }

    /// Drop the binding for `handle`, returning the user that went offline.
    ///
    /// Unknown or superseded handles are a no-op.
    pub async fn unregister(&self, handle: &Uuid) -> Option<Uuid> {
        let mut bindings = self.bindings.write().await;
        let user_id = bindings.by_handle.remove(handle)?;

        let bound_here = bindings
            .by_user
            .get(&user_id)
            .map(|s| s.connection.session_id == *handle)
            .unwrap_or(false);
        if !bound_here {
            return None;
        }
        bindings.by_user.remove(&user_id);

        tracing::info!(
            user_id = %user_id,
            session_id = %handle,
            online = bindings.by_user.len(),
            "User unregistered"
        );

        Some(user_id)
    }

    pub async fn is_online(&self, user_id: &Uuid) -> bool {
        self.bindings.read().await.by_user.contains_key(user_id)
    }

    /// Live connection for a user, if registered
    pub async fn session_for(&self, user_id: &Uuid) -> Option<Arc<Connection>> {
        let bindings = self.bindings.read().await;
        bindings.by_user.get(user_id).map(|s| Arc::clone(&s.connection))
    }

    pub async fn online_users(&self) -> Vec<Uuid> {
        let bindings = self.bindings.read().await;
        let mut users: Vec<Uuid> = bindings.by_user.keys().copied().collect();
        users.sort();
        users
    }

    pub async fn online_count(&self) -> usize {
        self.bindings.read().await.by_user.len()
    }

    /// Remove every binding, used at shutdown
    pub async fn clear(&self) {
        let mut bindings = self.bindings.write().await;
        bindings.by_user.clear();
        bindings.by_handle.clear();
    }

    #[cfg(test)]
    async fn assert_in_sync(&self) {
        let bindings = self.bindings.read().await;
        assert_eq!(bindings.by_user.len(), bindings.by_handle.len());
        for (handle, user) in &bindings.by_handle {
            let session = bindings.by_user.get(user).expect("handle points at missing user");
            assert_eq!(session.connection.session_id, *handle);
        }
    }
}
