use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::{FollowState, FollowersPage, FollowingPage, UserProfile, UserReview, UserSummary},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct UserReviewsResponse {
    pub user_id: i64,
    pub total: usize,
    pub reviews: Vec<UserReview>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGenresRequest {
    pub favorite_genres: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ToggleFollowResponse {
    pub status: FollowState,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<UserSummary>>> {
    let users = state.users.search_users(&params.q).await?;
    Ok(Json(users))
}

pub async fn profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.users.get_profile(id).await?;
    Ok(Json(ProfileResponse { user }))
}

pub async fn user_reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserReviewsResponse>> {
    let reviews = state.users.user_reviews(id).await?;
    Ok(Json(UserReviewsResponse {
        user_id: id,
        total: reviews.len(),
        reviews,
    }))
}

pub async fn update_genres(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateGenresRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let user = state
        .users
        .update_favorite_genres(auth.0, request.favorite_genres)
        .await?;
    Ok(Json(ProfileResponse { user }))
}

pub async fn follow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.social.follow(auth.0, id).await?;
    Ok(Json(json!({ "message": "You are now following this user" })))
}

pub async fn unfollow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.social.unfollow(auth.0, id).await?;
    Ok(Json(json!({ "message": "You have unfollowed the user" })))
}

pub async fn toggle_follow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ToggleFollowResponse>> {
    let status = state.social.toggle_follow(auth.0, id).await?;
    Ok(Json(ToggleFollowResponse { status }))
}

pub async fn follow_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let is_following = state.social.is_following(auth.0, id).await?;
    Ok(Json(json!({ "is_following": is_following })))
}

pub async fn followers(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<FollowersPage>> {
    let page = state
        .social
        .followers(id, auth.0, params.page.unwrap_or(1), params.limit)
        .await?;
    Ok(Json(page))
}

pub async fn following(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<FollowingPage>> {
    let page = state
        .social
        .following(id, params.page.unwrap_or(1), params.limit)
        .await?;
    Ok(Json(page))
}
