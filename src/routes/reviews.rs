use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::{ReactionKind, ReactionStatus, Review, ReviewDetail},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: i16,
    pub review_text: String,
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ReviewDetail>> {
    let detail = state.reviews.get_review_detail(id).await?;
    Ok(Json(detail))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateReviewRequest>,
) -> AppResult<Json<Review>> {
    let review = state
        .reviews
        .update_review(auth.0, id, request.rating, &request.review_text)
        .await?;
    Ok(Json(review))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.reviews.delete_review(auth.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<Value>)> {
    state.reviews.react(auth.0, id, ReactionKind::Like).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Review liked" }))))
}

pub async fn unlike(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<Value>)> {
    state
        .reviews
        .react(auth.0, id, ReactionKind::Unlike)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review unliked" })),
    ))
}

pub async fn reaction_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ReactionStatus>> {
    let status = state.reviews.reaction_status(auth.0, id).await?;
    Ok(Json(status))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.reviews.remove_reaction(auth.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
