use axum::{
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::state::AppState;

pub mod books;
pub mod comments;
pub mod dashboard;
pub mod feed;
pub mod notifications;
pub mod reviews;
pub mod users;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Books & catalog
        .route("/books/search", get(books::search))
        .route("/books/:book_key", get(books::details))
        .route(
            "/books/:book_key/reviews",
            get(books::reviews).post(books::create_review),
        )
        .route("/books/:book_key/my-review", get(books::my_review))
        .route(
            "/custom-books",
            get(books::list_custom).post(books::add_custom),
        )
        .route("/custom-books/:id", get(books::get_custom))
        // Reviews
        .route(
            "/reviews/:id",
            get(reviews::detail)
                .patch(reviews::update)
                .delete(reviews::remove),
        )
        .route("/reviews/:id/like", post(reviews::like))
        .route("/reviews/:id/unlike", post(reviews::unlike))
        .route(
            "/reviews/:id/reaction",
            get(reviews::reaction_status).delete(reviews::remove_reaction),
        )
        .route(
            "/reviews/:id/comments",
            get(comments::list).post(comments::create),
        )
        // Comments
        .route("/comments/:id/like", post(comments::toggle_like))
        .route("/comments/:id", delete(comments::remove))
        // Users & follow graph
        .route("/users/search", get(users::search))
        .route("/users/:id", get(users::profile))
        .route("/users/:id/reviews", get(users::user_reviews))
        .route(
            "/users/:id/follow",
            post(users::follow).delete(users::unfollow),
        )
        .route("/users/:id/follow/toggle", post(users::toggle_follow))
        .route("/users/:id/follow-status", get(users::follow_status))
        .route("/users/:id/followers", get(users::followers))
        .route("/users/:id/following", get(users::following))
        .route("/me/genres", put(users::update_genres))
        // Dashboard & feed
        .route("/dashboard/books", get(dashboard::books))
        .route("/dashboard/metrics", get(dashboard::metrics))
        .route("/feed", get(feed::community))
        // Notifications
        .route("/notifications", get(notifications::list))
        .route("/notifications/:id/read", patch(notifications::mark_read))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
