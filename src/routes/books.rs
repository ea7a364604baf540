use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::{BookDetails, BookReview, CustomBook, Review},
    services::books::{CustomBooksPage, NewCustomBook},
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
pub struct BookDetailsResponse {
    #[serde(flatten)]
    pub book: BookDetails,
    pub review_count: i64,
    pub average_rating: f64,
}

#[derive(Debug, Serialize)]
pub struct BookReviewsResponse {
    pub reviews: Vec<BookReview>,
    pub review_count: i64,
    pub average_rating: f64,
}

#[derive(Debug, Serialize)]
pub struct MyReviewResponse {
    pub review: Option<BookReview>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i16,
    pub review_text: String,
}

/// Handler for combined catalog + custom book search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<BookDetails>>> {
    let results = state.catalog.search_books(&params.q).await?;
    Ok(Json(results))
}

/// Resolved book metadata plus review aggregates
pub async fn details(
    State(state): State<AppState>,
    Path(book_key): Path<String>,
) -> AppResult<Json<BookDetailsResponse>> {
    let book = state.resolver.resolve(&book_key).await?;
    let stats = state.reviews.get_stats(&book_key).await?;

    Ok(Json(BookDetailsResponse {
        book,
        review_count: stats.count,
        average_rating: stats.avg_rating,
    }))
}

pub async fn reviews(
    State(state): State<AppState>,
    Path(book_key): Path<String>,
) -> AppResult<Json<BookReviewsResponse>> {
    let reviews = state.reviews.list_reviews_for_book(&book_key).await?;
    let stats = state.reviews.get_stats(&book_key).await?;

    Ok(Json(BookReviewsResponse {
        reviews,
        review_count: stats.count,
        average_rating: stats.avg_rating,
    }))
}

pub async fn my_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(book_key): Path<String>,
) -> AppResult<Json<MyReviewResponse>> {
    let review = state.reviews.get_user_book_review(auth.0, &book_key).await?;
    Ok(Json(MyReviewResponse { review }))
}

pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(book_key): Path<String>,
    Json(request): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = state
        .reviews
        .create_review(auth.0, &book_key, request.rating, &request.review_text)
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn add_custom(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<NewCustomBook>,
) -> AppResult<(StatusCode, Json<CustomBook>)> {
    let book = state.catalog.add_custom_book(auth.0, request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn list_custom(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<CustomBooksPage>> {
    let page = state
        .catalog
        .list_custom_books(params.page.unwrap_or(1), params.limit)
        .await?;
    Ok(Json(page))
}

pub async fn get_custom(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CustomBook>> {
    let book = state.catalog.get_custom_book(id).await?;
    Ok(Json(book))
}
