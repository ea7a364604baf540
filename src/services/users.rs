use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{UserProfile, UserReview, UserSummary},
};

/// Maximum results for user search
const SEARCH_LIMIT: i64 = 8;

/// Profile surface the feed and recommendation engines depend on
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_profile(&self, user_id: i64) -> AppResult<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, username, email, bio, profile_img, favorite_genres, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(profile)
    }

    /// Replaces the user's favorite genres, the input to dashboard and
    /// feed personalization
    pub async fn update_favorite_genres(
        &self,
        user_id: i64,
        genres: Vec<String>,
    ) -> AppResult<UserProfile> {
        let genres: Vec<String> = genres
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users
            SET favorite_genres = $1
            WHERE id = $2
            RETURNING id, username, email, bio, profile_img, favorite_genres, created_at
            "#,
        )
        .bind(&genres)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(profile)
    }

    pub async fn search_users(&self, keyword: &str) -> AppResult<Vec<UserSummary>> {
        if keyword.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search keyword is required".to_string(),
            ));
        }

        let pattern = format!("%{}%", keyword.to_lowercase());
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, profile_img, bio
            FROM users
            WHERE LOWER(username) LIKE $1 OR LOWER(email) LIKE $1
            LIMIT $2
            "#,
        )
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// A user's reviews joined with resolved book metadata, newest first
    pub async fn user_reviews(&self, user_id: i64) -> AppResult<Vec<UserReview>> {
        let reviews = sqlx::query_as::<_, UserReview>(
            r#"
            SELECT r.id, r.book_id, r.book_source, r.rating, r.review_text,
                   r.created_at, r.updated_at,
                   COALESCE(rb.title, cb.title) AS title,
                   COALESCE(rb.author, cb.author) AS author,
                   COALESCE(rb.cover_img, cb.cover_img) AS cover_img,
                   COALESCE(rb.genre, cb.genre) AS genre
            FROM reviews r
            LEFT JOIN reviewed_books rb ON r.book_id = rb.book_key
            LEFT JOIN custom_books cb ON r.book_source = 'custom' AND r.book_id = cb.book_key
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}
