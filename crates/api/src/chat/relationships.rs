//! Connection requests between users
//!
//! Every change reads the current state, applies the action through the
//! state machine and writes back with compare-and-set, so two concurrent
//! actions on the same pair cannot both succeed.

use std::sync::Arc;
use uuid::Uuid;

use campusnet_shared::{RelationshipAction, RelationshipState, ViewerStatus};

use super::{ChatError, ChatResult};
use crate::store::RelationshipStore;

#[derive(Clone)]
pub struct RelationshipService {
    store: Arc<dyn RelationshipStore>,
}

impl RelationshipService {
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self { store }
    }

    /// Relationship with `other` as seen by `viewer`
    pub async fn status(&self, viewer: Uuid, other: Uuid) -> ChatResult<ViewerStatus> {
        if viewer == other {
            return Err(ChatError::SelfTarget);
        }
        let state = self.store.get_relationship(viewer, other).await?;
        Ok(RelationshipState::status_for(state, viewer))
    }

    pub async fn is_connected(&self, a: Uuid, b: Uuid) -> ChatResult<bool> {
        Ok(self.store.get_relationship(a, b).await? == Some(RelationshipState::Connected))
    }

    /// Apply `action` by `actor` towards `other`, returning the actor's new view
    pub async fn act(&self, actor: Uuid, other: Uuid, action: RelationshipAction) -> ChatResult<ViewerStatus> {
        if actor == other {
            return Err(ChatError::SelfTarget);
        }

        let current = self.store.get_relationship(actor, other).await?;
        let next = RelationshipState::apply(current, action, actor)?;

        let swapped = self
            .store
            .compare_and_set_relationship(actor, other, current, next)
            .await?;
        if !swapped {
            tracing::info!(
                actor = %actor,
                other = %other,
                action = ?action,
                "Relationship changed between read and write"
            );
            return Err(ChatError::Contended);
        }

        tracing::info!(actor = %actor, other = %other, action = ?action, "Relationship updated");
        Ok(RelationshipState::status_for(next, actor))
    }

    /// Users connected to `user_id`
    pub async fn list_connected(&self, user_id: Uuid) -> ChatResult<Vec<Uuid>> {
        Ok(self.store.list_connected(user_id).await?)
    }
}
