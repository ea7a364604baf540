use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Comment, CommentLikeOutcome, CommentPage},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(review_id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<CommentPage>> {
    let page = state
        .comments
        .list_comments(review_id, auth.0, params.page.unwrap_or(1), params.limit)
        .await?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(review_id): Path<i64>,
    Json(request): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .comments
        .post_comment(auth.0, review_id, &request.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<CommentLikeOutcome>> {
    let outcome = state.comments.toggle_comment_like(auth.0, comment_id).await?;
    Ok(Json(outcome))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.comments.delete_comment(auth.0, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
