//! Authentication module for CampusNet

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtError, JwtManager};
pub use middleware::{extract_token, require_auth, AuthState, AuthUser};
