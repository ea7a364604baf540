use sqlx::PgPool;

use crate::{
    catalog::BookProvider,
    error::AppResult,
    models::BookDetails,
};

/// Provider backed by the `reviewed_books` snapshot table.
///
/// Entries are written once, the first time a book is reviewed, and are
/// never refreshed from upstream; their lifetime is tied to review
/// existence, not a TTL.
pub struct CachedBookProvider {
    pool: PgPool,
}

impl CachedBookProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists resolved details on first review, existing entry wins.
    ///
    /// `ON CONFLICT DO NOTHING` makes the snapshot a write-once cache: a
    /// concurrent first review cannot overwrite what another request wrote.
    pub async fn snapshot(pool: &PgPool, details: &BookDetails) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviewed_books (book_key, title, author, cover_img, genre, description, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (book_key) DO NOTHING
            "#,
        )
        .bind(&details.book_key)
        .bind(&details.title)
        .bind(&details.author)
        .bind(&details.cover_img)
        .bind(&details.genre)
        .bind(&details.description)
        .bind(details.source)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl BookProvider for CachedBookProvider {
    async fn lookup(&self, book_key: &str) -> AppResult<Option<BookDetails>> {
        let details = sqlx::query_as::<_, BookDetails>(
            r#"
            SELECT book_key, title, author, cover_img, genre, description, source
            FROM reviewed_books
            WHERE book_key = $1
            "#,
        )
        .bind(book_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    fn name(&self) -> &'static str {
        "cached"
    }
}
