//! WebSocket handler for Axum
//!
//! Handles WebSocket connections, authentication, and event routing.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::extract_token;
use crate::chat::ChatError;
use crate::state::AppState;

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
};

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: Option<String>,
}

/// WebSocket handler - upgrades HTTP connection to WebSocket
///
/// Authenticates via `?token=` since browsers cannot set headers on the
/// upgrade request; falls back to the bearer header or `jwt` cookie.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(params): Query<WebSocketQuery>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let token = params
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| extract_token(&headers))
        .ok_or_else(|| {
            tracing::warn!("WebSocket auth failed: no token");
            StatusCode::UNAUTHORIZED
        })?;

    let user_id = match app_state.jwt_manager.validate_token(&token) {
        Ok(claims) => claims.sub,
        Err(e) => {
            tracing::warn!(error = ?e, "WebSocket auth failed: invalid token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    tracing::info!(user_id = %user_id, "WebSocket connection upgrade requested");

    // Upgrade the connection
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, app_state)))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Uuid, app_state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending events to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let ws_state = app_state.ws_state.clone();
    let conn = ws_state.add_connection(Connection::new(user_id, tx)).await;
    let session_id = conn.session_id;

    // Send connection acknowledgment
    let _ = conn.send(ServerEvent::Connected { session_id });

    // Spawn task to send messages to client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize WebSocket event");
                }
            }
        }
    });

    // Events from one socket are handled strictly in order
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = ?e, "WebSocket read failed");
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    handle_client_event(event, &conn, &app_state).await;
                }
                Err(e) => {
                    tracing::warn!(
                        error = ?e,
                        message = %text,
                        "Failed to parse client event"
                    );
                    let _ = conn.send(ServerEvent::error("Invalid event format"));
                }
            },
            Message::Close(_) => {
                tracing::info!(session_id = %session_id, "WebSocket close frame received");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Axum handles ping/pong automatically
            }
            _ => {} // Ignore binary messages
        }
    }

    // Cleanup on disconnect
    tracing::info!(session_id = %session_id, user_id = %user_id, "WebSocket connection closing");
    ws_state.remove_connection(&session_id).await;

    send_task.abort();
}

/// Handle client event
async fn handle_client_event(event: ClientEvent, conn: &Arc<Connection>, app_state: &AppState) {
    use ClientEvent::*;

    let ws_state = &app_state.ws_state;

    match event {
        Register { user_id } => {
            ws_state.register(user_id.as_deref(), conn).await;
        }

        JoinChat { chat_id } => match app_state.chats.chat_for(chat_id, conn.user_id).await {
            Ok(_) => {
                ws_state.rooms.join(chat_id, Arc::clone(conn)).await;
            }
            Err(ChatError::ChatNotFound | ChatError::NotParticipant) => {
                let _ = conn.send(ServerEvent::error("Access denied to chat"));
            }
            Err(e) => {
                tracing::error!(error = %e, chat_id = %chat_id, "Failed to verify chat access");
                let _ = conn.send(ServerEvent::error("Failed to verify access"));
            }
        },

        LeaveChat { chat_id } => {
            ws_state.rooms.leave(&chat_id, conn).await;
        }

        Typing { chat_id, user_id } => {
            if typing_allowed(conn, chat_id, user_id).await {
                ws_state
                    .rooms
                    .broadcast(
                        &chat_id,
                        ServerEvent::UserTyping { chat_id, user_id },
                        Some(conn.session_id),
                    )
                    .await;
            }
        }

        StopTyping { chat_id, user_id } => {
            if typing_allowed(conn, chat_id, user_id).await {
                ws_state
                    .rooms
                    .broadcast(
                        &chat_id,
                        ServerEvent::UserStoppedTyping { chat_id, user_id },
                        Some(conn.session_id),
                    )
                    .await;
            }
        }

        GetOnlineStatus { user_ids } => {
            let statuses = ws_state.online_status(&user_ids).await;
            let _ = conn.send(ServerEvent::OnlineStatus { statuses });
        }

        Ping => {
            let _ = conn.send(ServerEvent::Pong);
        }
    }
}

/// Typing events must name the socket's own user and a joined room
async fn typing_allowed(conn: &Connection, chat_id: Uuid, user_id: Uuid) -> bool {
    if user_id != conn.user_id {
        tracing::warn!(
            session_id = %conn.session_id,
            claimed = %user_id,
            "Typing event for another user ignored"
        );
        return false;
    }
    if !conn.in_room(&chat_id).await {
        tracing::debug!(session_id = %conn.session_id, chat_id = %chat_id, "Typing outside joined room ignored");
        return false;
    }
    true
}
