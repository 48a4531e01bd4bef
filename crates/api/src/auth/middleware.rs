//! Authentication middleware
//!
//! Accepts an `Authorization: Bearer <jwt>` header or a `jwt` cookie and
//! inserts [`AuthUser`] as a request extension for handlers.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use super::jwt::JwtManager;
use crate::error::ApiError;

/// Name of the cookie the web client stores its token in
pub const AUTH_COOKIE: &str = "jwt";

/// State needed by the auth middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: Arc<JwtManager>,
}

/// Authenticated caller, available to handlers via `Extension<AuthUser>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Pull the raw token from the request, header first
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

/// Reject the request with 401 unless it carries a valid token
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or(ApiError::Unauthorized)?;

    let claims = auth_state.jwt_manager.validate_token(&token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request token");
        ApiError::InvalidToken
    })?;

    request.extensions_mut().insert(AuthUser { user_id: claims.sub });
    Ok(next.run(request).await)
}
