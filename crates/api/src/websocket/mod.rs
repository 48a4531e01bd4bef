//! WebSocket support for real-time features
//!
//! Provides presence, chat-room typing indicators and live message delivery.
//!
//! # Architecture
//!
//! - **Connection**: one authenticated socket and the rooms it joined
//! - **Registry**: user -> live connection, plus the reverse index
//! - **Room**: chat-based pub/sub for typing indicators
//! - **Delivery**: pushes persisted messages to online recipients
//! - **State**: global WebSocket state shared across all connections
//! - **Handler**: Axum WebSocket route handler
//! - **Events**: type-safe event definitions for client/server communication

pub mod connection;
pub mod delivery;
pub mod events;
pub mod handler;
pub mod registry;
pub mod room;
pub mod state;

pub use handler::ws_handler;
pub use state::{WebSocketState, WebSocketStats};
