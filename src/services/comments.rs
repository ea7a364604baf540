use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{
        Comment, CommentLikeOutcome, CommentPage, CommentView, LikeAction, NotificationKind,
        TargetType,
    },
    services::notifications::NotificationDispatcher,
};

/// Default page size for comment listings
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Hard cap on requested page size
const MAX_PAGE_SIZE: i64 = 100;

/// Comments on reviews and the idempotent comment-like toggle.
///
/// Posting a comment deliberately does not notify the review author; only
/// comment likes fan out, and never to the liker themselves.
pub struct CommentService {
    pool: PgPool,
    notifier: Arc<NotificationDispatcher>,
}

impl CommentService {
    pub fn new(pool: PgPool, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { pool, notifier }
    }

    pub async fn post_comment(
        &self,
        user_id: i64,
        review_id: i64,
        text: &str,
    ) -> AppResult<Comment> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Comment text is required".to_string(),
            ));
        }

        let review_exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM reviews WHERE id = $1)"#,
        )
        .bind(review_id)
        .fetch_one(&self.pool)
        .await?;

        if !review_exists {
            return Err(AppError::NotFound("Review not found".to_string()));
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (review_id, user_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, review_id, user_id, text, created_at
            "#,
        )
        .bind(review_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id, review_id, comment_id = comment.id, "Comment posted");

        Ok(comment)
    }

    /// One page of comments, newest first, with like counts and the
    /// viewer's own like state
    pub async fn list_comments(
        &self,
        review_id: i64,
        viewer_id: i64,
        page: i64,
        limit: Option<i64>,
    ) -> AppResult<CommentPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page.max(1) - 1) * limit;

        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id AS comment_id, c.text, c.user_id, c.created_at,
                   u.username, u.profile_img,
                   (SELECT COUNT(*) FROM comment_likes WHERE comment_id = c.id) AS likes_count,
                   EXISTS (
                       SELECT 1 FROM comment_likes
                       WHERE comment_id = c.id AND user_id = $2
                   ) AS liked_by_viewer
            FROM comments c
            JOIN users u ON c.user_id = u.id
            WHERE c.review_id = $1
            ORDER BY c.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(review_id)
        .bind(viewer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM comments WHERE review_id = $1"#,
        )
        .bind(review_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CommentPage {
            comments,
            total_count,
        })
    }

    /// Idempotent like toggle: likes when absent, unlikes when present.
    ///
    /// The comment author is notified on the like transition only, and not
    /// for likes on their own comment.
    pub async fn toggle_comment_like(
        &self,
        user_id: i64,
        comment_id: i64,
    ) -> AppResult<CommentLikeOutcome> {
        let author_id: i64 = sqlx::query_scalar(
            r#"SELECT user_id FROM comments WHERE id = $1"#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        let liked: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM comment_likes WHERE user_id = $1 AND comment_id = $2)"#,
        )
        .bind(user_id)
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await?;

        let action = if liked {
            sqlx::query(
                r#"DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2"#,
            )
            .bind(user_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

            LikeAction::Unliked
        } else {
            // A concurrent toggle can beat us to the insert; the conflict
            // clause keeps that race from surfacing as an error
            sqlx::query(
                r#"
                INSERT INTO comment_likes (user_id, comment_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, comment_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

            if user_id != author_id {
                let username = super::display_name(&self.pool, user_id).await;
                self.notifier
                    .notify(
                        user_id,
                        author_id,
                        NotificationKind::LikeComment,
                        &format!("{} liked your comment", username),
                        Some((TargetType::Comment, comment_id)),
                    )
                    .await;
            }

            LikeAction::Liked
        };

        let likes_count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1"#,
        )
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CommentLikeOutcome {
            action,
            likes_count,
            is_liked: action == LikeAction::Liked,
        })
    }

    /// Deletes a comment; owner-only
    pub async fn delete_comment(&self, user_id: i64, comment_id: i64) -> AppResult<()> {
        let author_id: i64 = sqlx::query_scalar(
            r#"SELECT user_id FROM comments WHERE id = $1"#,
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if author_id != user_id {
            return Err(AppError::Forbidden(
                "Not authorized to delete this comment".to_string(),
            ));
        }

        sqlx::query(r#"DELETE FROM comments WHERE id = $1"#)
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
