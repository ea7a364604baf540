use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::NotificationView,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationView>,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<NotificationsResponse>> {
    let notifications = state
        .notifications
        .list(auth.0, params.offset.unwrap_or(0))
        .await?;
    Ok(Json(NotificationsResponse { notifications }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.notifications.mark_read(auth.0, id).await?;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}
