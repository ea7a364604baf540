use serde::Serialize;

/// Outcome of a follow toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowState {
    Followed,
    Unfollowed,
}

/// A follower of the viewed user, with the reverse-edge flag for the viewer
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FollowerEntry {
    pub user_id: i64,
    pub username: String,
    pub profile_img: Option<String>,
    pub is_following_you: bool,
}

#[derive(Debug, Serialize)]
pub struct FollowersPage {
    pub total_followers: i64,
    pub followers: Vec<FollowerEntry>,
}

/// A user the viewed user follows
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FollowingEntry {
    pub user_id: i64,
    pub username: String,
    pub profile_img: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowingPage {
    pub total_following: i64,
    pub following: Vec<FollowingEntry>,
}
