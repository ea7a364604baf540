use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    catalog::{BookResolver, CachedBookProvider},
    error::{AppError, AppResult},
    models::{
        BookReview, NotificationKind, ReactionKind, ReactionStatus, Review, ReviewDetail,
        ReviewStats, TargetType,
    },
    services::notifications::NotificationDispatcher,
};

/// Review CRUD, per-book aggregates and review reactions.
///
/// Creating a review resolves the book identity first and snapshots the
/// resolved details into `reviewed_books`; deleting the last review for a
/// book garbage-collects that snapshot.
pub struct ReviewService {
    pool: PgPool,
    resolver: BookResolver,
    notifier: Arc<NotificationDispatcher>,
}

impl ReviewService {
    pub fn new(pool: PgPool, resolver: BookResolver, notifier: Arc<NotificationDispatcher>) -> Self {
        Self {
            pool,
            resolver,
            notifier,
        }
    }

    /// Creates a review, resolving and snapshotting the book on the way.
    ///
    /// Fails with `Conflict` when the user already reviewed this book and
    /// `NotFound` when no source can resolve the key.
    pub async fn create_review(
        &self,
        user_id: i64,
        book_key: &str,
        rating: i16,
        review_text: &str,
    ) -> AppResult<Review> {
        validate_review_input(rating, review_text)?;

        let already_reviewed: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND book_id = $2)"#,
        )
        .bind(user_id)
        .bind(book_key)
        .fetch_one(&self.pool)
        .await?;

        if already_reviewed {
            return Err(AppError::Conflict(
                "You have already reviewed this book".to_string(),
            ));
        }

        let details = self.resolver.resolve(book_key).await?;

        // Write-once snapshot; an existing entry wins
        CachedBookProvider::snapshot(&self.pool, &details).await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (user_id, book_id, book_source, rating, review_text)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, book_id, book_source, rating, review_text, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(book_key)
        .bind(details.source)
        .bind(rating)
        .bind(review_text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "You have already reviewed this book"))?;

        tracing::info!(
            user_id,
            book_key = %book_key,
            source = %details.source,
            review_id = review.id,
            "Review created"
        );

        Ok(review)
    }

    /// Updates a review's rating and text; owner-only
    pub async fn update_review(
        &self,
        user_id: i64,
        review_id: i64,
        rating: i16,
        review_text: &str,
    ) -> AppResult<Review> {
        validate_review_input(rating, review_text)?;

        let review = self.fetch_review(review_id).await?;
        if review.user_id != user_id {
            return Err(AppError::Forbidden(
                "Not authorized to edit this review".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET rating = $1, review_text = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id, user_id, book_id, book_source, rating, review_text, created_at, updated_at
            "#,
        )
        .bind(rating)
        .bind(review_text)
        .bind(review_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Deletes a review; owner-only.
    ///
    /// When this was the last review for the book, the cached snapshot for
    /// that `(book_key, source)` is deleted too — the cache's lifetime is
    /// derived from review existence, not a TTL.
    pub async fn delete_review(&self, user_id: i64, review_id: i64) -> AppResult<()> {
        let review = self.fetch_review(review_id).await?;
        if review.user_id != user_id {
            return Err(AppError::Forbidden(
                "Not authorized to delete this review".to_string(),
            ));
        }

        sqlx::query(r#"DELETE FROM reviews WHERE id = $1"#)
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        let remaining: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM reviews WHERE book_id = $1)"#,
        )
        .bind(&review.book_id)
        .fetch_one(&self.pool)
        .await?;

        if !remaining {
            sqlx::query(r#"DELETE FROM reviewed_books WHERE book_key = $1 AND source = $2"#)
                .bind(&review.book_id)
                .bind(review.book_source)
                .execute(&self.pool)
                .await?;

            tracing::info!(
                book_key = %review.book_id,
                "Last review removed, snapshot deleted"
            );
        }

        Ok(())
    }

    /// Per-book review aggregates; zero count yields a zero average
    pub async fn get_stats(&self, book_key: &str) -> AppResult<ReviewStats> {
        let stats = sqlx::query_as::<_, ReviewStats>(
            r#"
            SELECT COUNT(*) AS count,
                   COALESCE(ROUND(AVG(NULLIF(rating, 0))::numeric, 1), 0)::float8 AS avg_rating
            FROM reviews
            WHERE book_id = $1
            "#,
        )
        .bind(book_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Applies a like or unlike to a review.
    ///
    /// One reaction row per `(user, review)`: reacting over the opposite
    /// state replaces it in a single upsert, repeating the same state is a
    /// `Conflict`. The review author is notified either way, including for
    /// reactions to their own review.
    pub async fn react(
        &self,
        user_id: i64,
        review_id: i64,
        reaction: ReactionKind,
    ) -> AppResult<()> {
        let author_id: i64 = sqlx::query_scalar(
            r#"SELECT user_id FROM reviews WHERE id = $1"#,
        )
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        let current = self.current_reaction(user_id, review_id).await?;
        ensure_transition(current, reaction)?;

        sqlx::query(
            r#"
            INSERT INTO review_reactions (user_id, review_id, reaction)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, review_id)
            DO UPDATE SET reaction = EXCLUDED.reaction, created_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(review_id)
        .bind(reaction)
        .execute(&self.pool)
        .await?;

        let username = super::display_name(&self.pool, user_id).await;
        let (kind, message) = reaction_notification(&username, reaction);
        self.notifier
            .notify(
                user_id,
                author_id,
                kind,
                &message,
                Some((TargetType::Review, review_id)),
            )
            .await;

        Ok(())
    }

    /// Clears any reaction by this user on the review
    pub async fn remove_reaction(&self, user_id: i64, review_id: i64) -> AppResult<()> {
        sqlx::query(
            r#"DELETE FROM review_reactions WHERE user_id = $1 AND review_id = $2"#,
        )
        .bind(user_id)
        .bind(review_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The viewer's current reaction state for a review
    pub async fn reaction_status(
        &self,
        user_id: i64,
        review_id: i64,
    ) -> AppResult<ReactionStatus> {
        let current = self.current_reaction(user_id, review_id).await?;
        Ok(ReactionStatus::from_reaction(current))
    }

    /// A single review with author, book metadata and reaction counts
    pub async fn get_review_detail(&self, review_id: i64) -> AppResult<ReviewDetail> {
        let detail = sqlx::query_as::<_, ReviewDetail>(
            r#"
            SELECT r.id, r.user_id, r.book_id, r.book_source, r.rating, r.review_text,
                   r.created_at,
                   u.username, u.profile_img,
                   COALESCE(rb.title, cb.title) AS title,
                   COALESCE(rb.author, cb.author) AS author,
                   COALESCE(rb.cover_img, cb.cover_img) AS cover_img,
                   COALESCE(rb.genre, cb.genre, ARRAY[]::text[]) AS genres,
                   (SELECT COUNT(*) FROM review_reactions x
                    WHERE x.review_id = r.id AND x.reaction = 'like') AS likes,
                   (SELECT COUNT(*) FROM review_reactions x
                    WHERE x.review_id = r.id AND x.reaction = 'unlike') AS unlikes
            FROM reviews r
            JOIN users u ON r.user_id = u.id
            LEFT JOIN reviewed_books rb ON r.book_id = rb.book_key
            LEFT JOIN custom_books cb ON r.book_source = 'custom' AND r.book_id = cb.book_key
            WHERE r.id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        Ok(detail)
    }

    /// All reviews for a book, newest first
    pub async fn list_reviews_for_book(&self, book_key: &str) -> AppResult<Vec<BookReview>> {
        let reviews = sqlx::query_as::<_, BookReview>(
            r#"
            SELECT r.id, r.rating, r.review_text, r.created_at,
                   u.username, u.profile_img
            FROM reviews r
            JOIN users u ON r.user_id = u.id
            WHERE r.book_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(book_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// The viewer's own review of a book, if any
    pub async fn get_user_book_review(
        &self,
        user_id: i64,
        book_key: &str,
    ) -> AppResult<Option<BookReview>> {
        let review = sqlx::query_as::<_, BookReview>(
            r#"
            SELECT r.id, r.rating, r.review_text, r.created_at,
                   u.username, u.profile_img
            FROM reviews r
            JOIN users u ON r.user_id = u.id
            WHERE r.book_id = $1 AND r.user_id = $2
            "#,
        )
        .bind(book_key)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn fetch_review(&self, review_id: i64) -> AppResult<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT id, user_id, book_id, book_source, rating, review_text, created_at, updated_at
            FROM reviews
            WHERE id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
    }

    async fn current_reaction(
        &self,
        user_id: i64,
        review_id: i64,
    ) -> AppResult<Option<ReactionKind>> {
        let current: Option<ReactionKind> = sqlx::query_scalar(
            r#"SELECT reaction FROM review_reactions WHERE user_id = $1 AND review_id = $2"#,
        )
        .bind(user_id)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(current)
    }

}

fn validate_review_input(rating: i16, review_text: &str) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::InvalidInput(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    if review_text.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Review text is required".to_string(),
        ));
    }
    Ok(())
}

/// Rejects a repeat of the same reaction; anything else is a valid
/// transition handled by the upsert
fn ensure_transition(current: Option<ReactionKind>, requested: ReactionKind) -> AppResult<()> {
    if current == Some(requested) {
        let message = match requested {
            ReactionKind::Like => "Already liked this review",
            ReactionKind::Unlike => "Already unliked this review",
        };
        return Err(AppError::Conflict(message.to_string()));
    }
    Ok(())
}

fn reaction_notification(username: &str, reaction: ReactionKind) -> (NotificationKind, String) {
    match reaction {
        ReactionKind::Like => (
            NotificationKind::LikeReview,
            format!("{} liked your review", username),
        ),
        ReactionKind::Unlike => (
            NotificationKind::UnlikeReview,
            format!("{} disliked your review", username),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(validate_review_input(1, "fine").is_ok());
        assert!(validate_review_input(5, "fine").is_ok());
        assert!(matches!(
            validate_review_input(0, "fine"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_review_input(6, "fine"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(matches!(
            validate_review_input(3, "   "),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fresh_reaction_is_allowed() {
        assert!(ensure_transition(None, ReactionKind::Like).is_ok());
        assert!(ensure_transition(None, ReactionKind::Unlike).is_ok());
    }

    #[test]
    fn test_flipping_reaction_is_allowed() {
        assert!(ensure_transition(Some(ReactionKind::Unlike), ReactionKind::Like).is_ok());
        assert!(ensure_transition(Some(ReactionKind::Like), ReactionKind::Unlike).is_ok());
    }

    #[test]
    fn test_repeating_reaction_conflicts() {
        assert!(matches!(
            ensure_transition(Some(ReactionKind::Like), ReactionKind::Like),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            ensure_transition(Some(ReactionKind::Unlike), ReactionKind::Unlike),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_reaction_notification_wording() {
        let (kind, message) = reaction_notification("frodo", ReactionKind::Like);
        assert_eq!(kind, NotificationKind::LikeReview);
        assert_eq!(message, "frodo liked your review");

        let (kind, message) = reaction_notification("frodo", ReactionKind::Unlike);
        assert_eq!(kind, NotificationKind::UnlikeReview);
        assert_eq!(message, "frodo disliked your review");
    }
}
