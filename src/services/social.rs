use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{FollowState, FollowerEntry, FollowersPage, FollowingEntry, FollowingPage,
        NotificationKind},
    services::notifications::NotificationDispatcher,
};

/// Default page size for follower/following listings
const DEFAULT_PAGE_SIZE: i64 = 12;

/// Follow-graph operations.
///
/// Following notifies both sides: the followee gets the social
/// notification, the actor gets a self-directed activity-log entry.
/// Unfollowing only leaves the actor's own entry.
pub struct SocialService {
    pool: PgPool,
    notifier: Arc<NotificationDispatcher>,
}

impl SocialService {
    pub fn new(pool: PgPool, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { pool, notifier }
    }

    pub async fn follow(&self, follower_id: i64, following_id: i64) -> AppResult<()> {
        if follower_id == following_id {
            return Err(AppError::InvalidInput(
                "You can't follow yourself".to_string(),
            ));
        }

        let target_exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)"#,
        )
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        if !target_exists {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        if self.is_following(follower_id, following_id).await? {
            return Err(AppError::Conflict(
                "Already following this user".to_string(),
            ));
        }

        sqlx::query(
            r#"INSERT INTO followers (follower_id, following_id) VALUES ($1, $2)"#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Already following this user"))?;

        let follower_name = super::display_name(&self.pool, follower_id).await;
        let followed_name = super::display_name(&self.pool, following_id).await;

        self.notifier
            .notify(
                follower_id,
                following_id,
                NotificationKind::Follow,
                &format!("{} started following you", follower_name),
                None,
            )
            .await;
        self.notifier
            .notify(
                follower_id,
                follower_id,
                NotificationKind::Follow,
                &format!("You are now following {}.", followed_name),
                None,
            )
            .await;

        tracing::info!(follower_id, following_id, "Follow edge created");

        Ok(())
    }

    pub async fn unfollow(&self, follower_id: i64, following_id: i64) -> AppResult<()> {
        if follower_id == following_id {
            return Err(AppError::InvalidInput(
                "You can't unfollow yourself".to_string(),
            ));
        }

        if !self.is_following(follower_id, following_id).await? {
            return Err(AppError::Conflict(
                "You are not following this user".to_string(),
            ));
        }

        sqlx::query(
            r#"DELETE FROM followers WHERE follower_id = $1 AND following_id = $2"#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;

        let unfollowed_name = super::display_name(&self.pool, following_id).await;
        self.notifier
            .notify(
                follower_id,
                follower_id,
                NotificationKind::Unfollow,
                &format!("You unfollowed {}", unfollowed_name),
                None,
            )
            .await;

        Ok(())
    }

    /// Follows when not following, unfollows when following
    pub async fn toggle_follow(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> AppResult<FollowState> {
        if self.is_following(follower_id, following_id).await? {
            self.unfollow(follower_id, following_id).await?;
            Ok(FollowState::Unfollowed)
        } else {
            self.follow(follower_id, following_id).await?;
            Ok(FollowState::Followed)
        }
    }

    pub async fn is_following(&self, follower_id: i64, following_id: i64) -> AppResult<bool> {
        let following: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM followers WHERE follower_id = $1 AND following_id = $2)"#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(following)
    }

    /// Followers of `user_id`, newest edges first, flagged with whether the
    /// viewer follows each one back
    pub async fn followers(
        &self,
        user_id: i64,
        viewer_id: i64,
        page: i64,
        limit: Option<i64>,
    ) -> AppResult<FollowersPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let offset = (page.max(1) - 1) * limit;

        let total_followers: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM followers WHERE following_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let followers = sqlx::query_as::<_, FollowerEntry>(
            r#"
            SELECT u.id AS user_id, u.username, u.profile_img,
                   EXISTS (
                       SELECT 1 FROM followers
                       WHERE follower_id = $1 AND following_id = u.id
                   ) AS is_following_you
            FROM followers f
            JOIN users u ON f.follower_id = u.id
            WHERE f.following_id = $2
            ORDER BY f.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(viewer_id)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(FollowersPage {
            total_followers,
            followers,
        })
    }

    /// Users `user_id` follows, newest edges first
    pub async fn following(
        &self,
        user_id: i64,
        page: i64,
        limit: Option<i64>,
    ) -> AppResult<FollowingPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let offset = (page.max(1) - 1) * limit;

        let total_following: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM followers WHERE follower_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let following = sqlx::query_as::<_, FollowingEntry>(
            r#"
            SELECT u.id AS user_id, u.username, u.profile_img
            FROM followers f
            JOIN users u ON f.following_id = u.id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(FollowingPage {
            total_following,
            following,
        })
    }
}
