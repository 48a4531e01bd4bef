//! CampusNet API Library
//!
//! Presence and direct-messaging core of the CampusNet backend: REST
//! endpoints over the chat store plus the realtime WebSocket layer.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;
pub mod state;
pub mod store;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
