//! Realtime diagnostics

use axum::{extract::State, Json};

use crate::{state::AppState, websocket::WebSocketStats};

/// Live connection, room and online-user counts for this instance
pub async fn stats(State(state): State<AppState>) -> Json<WebSocketStats> {
    Json(state.ws_state.get_stats().await)
}
