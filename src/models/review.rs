use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BookSource;

/// A user's review of a book. At most one per `(user_id, book_id)`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    /// Book key within `book_source`
    pub book_id: String,
    pub book_source: BookSource,
    pub rating: i16,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-book review aggregates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, sqlx::FromRow)]
pub struct ReviewStats {
    pub count: i64,
    /// Rounded to one decimal; 0 when there are no reviews
    pub avg_rating: f64,
}

/// A user's reaction to a review. One row per `(user, review)`; liking
/// replaces an unlike and vice versa, so the two states are disjoint by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Unlike,
}

/// Current reaction state for one `(user, review)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionStatus {
    pub liked: bool,
    pub unliked: bool,
}

impl ReactionStatus {
    pub fn from_reaction(reaction: Option<ReactionKind>) -> Self {
        Self {
            liked: reaction == Some(ReactionKind::Like),
            unliked: reaction == Some(ReactionKind::Unlike),
        }
    }
}

/// A review joined with its author, for per-book listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookReview {
    pub id: i64,
    pub rating: i16,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub profile_img: Option<String>,
}

/// A single review joined with author, book metadata and reaction counts
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewDetail {
    pub id: i64,
    pub user_id: i64,
    pub book_id: String,
    pub book_source: BookSource,
    pub rating: i16,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub profile_img: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_img: Option<String>,
    pub genres: Vec<String>,
    pub likes: i64,
    pub unlikes: i64,
}

/// A review joined with book metadata, for profile listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserReview {
    pub id: i64,
    pub book_id: String,
    pub book_source: BookSource,
    pub rating: i16,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_img: Option<String>,
    pub genre: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_status_from_like() {
        let status = ReactionStatus::from_reaction(Some(ReactionKind::Like));
        assert!(status.liked);
        assert!(!status.unliked);
    }

    #[test]
    fn test_reaction_status_from_none() {
        let status = ReactionStatus::from_reaction(None);
        assert!(!status.liked);
        assert!(!status.unliked);
    }

    #[test]
    fn test_reaction_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ReactionKind::Like).unwrap(),
            "\"like\""
        );
        assert_eq!(
            serde_json::to_string(&ReactionKind::Unlike).unwrap(),
            "\"unlike\""
        );
    }
}
