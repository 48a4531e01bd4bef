//! Connection request routes

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use campusnet_shared::{RelationshipAction, ViewerStatus};

use super::extract::ApiPath;
use crate::{auth::AuthUser, error::ApiResult, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatusResponse {
    pub user_id: Uuid,
    pub status: ViewerStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionListResponse {
    pub user_ids: Vec<Uuid>,
}

/// Users connected to the caller
pub async fn list_connections(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<ConnectionListResponse>> {
    let user_ids = state.relationships.list_connected(auth_user.user_id).await?;
    Ok(Json(ConnectionListResponse { user_ids }))
}

pub async fn get_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<ConnectionStatusResponse>> {
    let status = state.relationships.status(auth_user.user_id, user_id).await?;
    Ok(Json(ConnectionStatusResponse { user_id, status }))
}

pub async fn request(
    state: State<AppState>,
    auth_user: Extension<AuthUser>,
    user_id: ApiPath<Uuid>,
) -> ApiResult<Json<ConnectionStatusResponse>> {
    apply(state, auth_user, user_id, RelationshipAction::Request).await
}

pub async fn accept(
    state: State<AppState>,
    auth_user: Extension<AuthUser>,
    user_id: ApiPath<Uuid>,
) -> ApiResult<Json<ConnectionStatusResponse>> {
    apply(state, auth_user, user_id, RelationshipAction::Accept).await
}

pub async fn reject(
    state: State<AppState>,
    auth_user: Extension<AuthUser>,
    user_id: ApiPath<Uuid>,
) -> ApiResult<Json<ConnectionStatusResponse>> {
    apply(state, auth_user, user_id, RelationshipAction::Reject).await
}

pub async fn disconnect(
    state: State<AppState>,
    auth_user: Extension<AuthUser>,
    user_id: ApiPath<Uuid>,
) -> ApiResult<Json<ConnectionStatusResponse>> {
    apply(state, auth_user, user_id, RelationshipAction::Disconnect).await
}

async fn apply(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(user_id): ApiPath<Uuid>,
    action: RelationshipAction,
) -> ApiResult<Json<ConnectionStatusResponse>> {
    let status = state
        .relationships
        .act(auth_user.user_id, user_id, action)
        .await?;
    Ok(Json(ConnectionStatusResponse { user_id, status }))
}
