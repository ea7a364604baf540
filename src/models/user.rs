use chrono::{DateTime, Utc};
use serde::Serialize;

/// Public profile surface
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub profile_img: Option<String>,
    pub favorite_genres: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Compact user row for search results
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub profile_img: Option<String>,
    pub bio: Option<String>,
}
