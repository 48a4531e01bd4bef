//! API routes

pub mod chats;
pub mod connections;
pub mod extract;
pub mod health;
pub mod realtime;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    trace::TraceLayer,
};

use crate::{
    auth::require_auth, security::security_headers_middleware, state::AppState,
    websocket::ws_handler,
};

/// Chat payloads are small; this bounds a single request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// CORS for the web client; credentials allowed so the `jwt` cookie is sent
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Protected API routes (auth required) - under /api/v1
    let protected_api_routes = Router::new()
        // Chats
        .route("/chats", get(chats::list_chats))
        .route("/chats/user/:user_id", get(chats::chat_with_user))
        .route(
            "/chats/:chat_id/messages",
            get(chats::get_messages).post(chats::send_message),
        )
        .route("/chats/:chat_id/read", patch(chats::mark_read))
        // Connections
        .route("/connections", get(connections::list_connections))
        .route("/connections/:user_id/status", get(connections::get_status))
        .route("/connections/:user_id/request", post(connections::request))
        .route("/connections/:user_id/accept", post(connections::accept))
        .route("/connections/:user_id/reject", post(connections::reject))
        .route("/connections/:user_id", delete(connections::disconnect))
        // Realtime diagnostics
        .route("/realtime/stats", get(realtime::stats))
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    // WebSocket route (auth handled in handler via query parameter)
    let websocket_routes = Router::new().route("/ws", get(ws_handler));

    Router::new()
        .merge(health_routes)
        .merge(websocket_routes)
        .nest("/api/v1", protected_api_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.client_urls))
        .layer(TraceLayer::new_for_http())
        // Outermost so a panicking handler still yields a 500
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
