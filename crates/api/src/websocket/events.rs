//! WebSocket event types and serialization
//!
//! Defines all client-to-server and server-to-client event types
//! with type-safe serde serialization. Frames are JSON objects tagged by
//! `type` with camelCase names, e.g. `{"type":"joinChat","chatId":"..."}`.

use campusnet_shared::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Bind this connection as the user's live session.
    ///
    /// Kept as a raw string so an empty or malformed id reaches the
    /// registry, which drops it.
    Register {
        #[serde(default)]
        user_id: Option<String>,
    },

    /// Join a chat room for typing indicators
    JoinChat { chat_id: Uuid },

    /// Leave a chat room
    LeaveChat { chat_id: Uuid },

    /// Started typing in a chat
    Typing { chat_id: Uuid, user_id: Uuid },

    /// Stopped typing (sent by the client after a quiet period)
    StopTyping { chat_id: Uuid, user_id: Uuid },

    /// Ask which of the given users are online
    GetOnlineStatus { user_ids: Vec<Uuid> },

    /// Heartbeat ping to keep connection alive
    Ping,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Connection acknowledged
    Connected { session_id: Uuid },

    /// A message was persisted in one of the user's chats
    NewMessage { chat_id: Uuid, message: Message },

    /// A user registered a live session
    UserOnline { user_id: Uuid },

    /// A user's live session ended
    UserOffline { user_id: Uuid },

    /// Snapshot of online users, sent on registration
    OnlineUsers { user_ids: Vec<Uuid> },

    /// Someone in the room started typing
    UserTyping { chat_id: Uuid, user_id: Uuid },

    /// Someone in the room stopped typing
    UserStoppedTyping { chat_id: Uuid, user_id: Uuid },

    /// Reply to `getOnlineStatus`
    OnlineStatus { statuses: HashMap<Uuid, bool> },

    /// Heartbeat response
    Pong,

    /// Error message
    Error { message: String },
}

impl ServerEvent {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::NewMessage { .. } => "newMessage",
            ServerEvent::UserOnline { .. } => "userOnline",
            ServerEvent::UserOffline { .. } => "userOffline",
            ServerEvent::OnlineUsers { .. } => "onlineUsers",
            ServerEvent::UserTyping { .. } => "userTyping",
            ServerEvent::UserStoppedTyping { .. } => "userStoppedTyping",
            ServerEvent::OnlineStatus { .. } => "onlineStatus",
            ServerEvent::Pong => "pong",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}
