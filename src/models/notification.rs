use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Social actions that fan out a notification.
///
/// Review and comment creation deliberately do not notify; only likes and
/// follow-graph changes do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    Unfollow,
    LikeReview,
    UnlikeReview,
    LikeComment,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Unfollow => "unfollow",
            NotificationKind::LikeReview => "like_review",
            NotificationKind::UnlikeReview => "unlike_review",
            NotificationKind::LikeComment => "like_comment",
        };
        write!(f, "{}", name)
    }
}

/// What a notification points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TargetType {
    Review,
    Comment,
}

/// A stored notification joined with its sender, for listing
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationView {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    #[sqlx(rename = "kind")]
    pub r#type: NotificationKind,
    pub message: String,
    pub target_type: Option<TargetType>,
    pub target_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub sender_username: String,
    pub sender_profile_img: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_matches_wire_names() {
        assert_eq!(NotificationKind::Follow.to_string(), "follow");
        assert_eq!(NotificationKind::LikeReview.to_string(), "like_review");
        assert_eq!(NotificationKind::UnlikeReview.to_string(), "unlike_review");
        assert_eq!(NotificationKind::LikeComment.to_string(), "like_comment");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationKind::LikeComment).unwrap(),
            "\"like_comment\""
        );
    }
}
