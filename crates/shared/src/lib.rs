//! CampusNet Shared Types and Utilities
//!
//! Domain types, storage errors and database helpers shared by the CampusNet
//! realtime service.

pub mod db;
pub mod error;
pub mod relationship;
pub mod types;

pub use db::*;
pub use error::*;
pub use relationship::{RelationshipAction, RelationshipState, TransitionError, ViewerStatus};
pub use types::*;
