//! Connection relationship state machine
//!
//! A relationship between two users is either absent, pending (with a known
//! requester) or connected. Every change goes through [`RelationshipState::apply`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Persisted state of a relationship; absence of a row means no relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RelationshipState {
    Pending { requester: Uuid },
    Connected,
}

/// Actions a user can take on a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipAction {
    Request,
    Accept,
    Reject,
    Disconnect,
}

/// Relationship status as seen by one of the two users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerStatus {
    None,
    PendingSent,
    PendingReceived,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A connection request is already pending")]
    AlreadyPending,
    #[error("Users are already connected")]
    AlreadyConnected,
    #[error("No pending connection request")]
    NoPendingRequest,
    #[error("Only the recipient can accept a connection request")]
    NotRecipient,
    #[error("Users are not connected")]
    NotConnected,
}

impl RelationshipState {
    /// Apply `action` taken by `actor` to the current state.
    ///
    /// Returns the next state, where `None` removes the relationship.
    pub fn apply(
        current: Option<RelationshipState>,
        action: RelationshipAction,
        actor: Uuid,
    ) -> Result<Option<RelationshipState>, TransitionError> {
        use RelationshipAction::*;

        match (current, action) {
            (None, Request) => Ok(Some(RelationshipState::Pending { requester: actor })),
            (Some(RelationshipState::Pending { .. }), Request) => Err(TransitionError::AlreadyPending),
            (Some(RelationshipState::Connected), Request) => Err(TransitionError::AlreadyConnected),

            (Some(RelationshipState::Pending { requester }), Accept) => {
                if requester == actor {
                    Err(TransitionError::NotRecipient)
                } else {
                    Ok(Some(RelationshipState::Connected))
                }
            }
            (Some(RelationshipState::Connected), Accept) => Err(TransitionError::AlreadyConnected),
            (None, Accept) => Err(TransitionError::NoPendingRequest),

            // Rejecting covers the requester withdrawing as well
            (Some(RelationshipState::Pending { .. }), Reject) => Ok(None),
            (_, Reject) => Err(TransitionError::NoPendingRequest),

            (Some(RelationshipState::Connected), Disconnect) => Ok(None),
            (_, Disconnect) => Err(TransitionError::NotConnected),
        }
    }

    /// View this state from `viewer`'s side
    pub fn status_for(state: Option<RelationshipState>, viewer: Uuid) -> ViewerStatus {
        match state {
            None => ViewerStatus::None,
            Some(RelationshipState::Connected) => ViewerStatus::Connected,
            Some(RelationshipState::Pending { requester }) if requester == viewer => {
                ViewerStatus::PendingSent
            }
            Some(RelationshipState::Pending { .. }) => ViewerStatus::PendingReceived,
        }
    }
}
