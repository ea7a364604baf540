use chrono::{DateTime, Utc};
use serde::Serialize;

/// A comment on a review
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A comment joined with its author and like state for the viewer
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentView {
    pub comment_id: i64,
    pub text: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub profile_img: Option<String>,
    pub likes_count: i64,
    pub liked_by_viewer: bool,
}

/// One page of comments for a review
#[derive(Debug, Serialize)]
pub struct CommentPage {
    pub comments: Vec<CommentView>,
    pub total_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Liked,
    Unliked,
}

/// Result of a comment-like toggle
#[derive(Debug, Serialize)]
pub struct CommentLikeOutcome {
    pub action: LikeAction,
    pub likes_count: i64,
    pub is_liked: bool,
}
