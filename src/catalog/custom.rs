use sqlx::PgPool;

use crate::{
    catalog::BookProvider,
    error::AppResult,
    models::BookDetails,
};

/// Provider backed by the admin-curated `custom_books` table
pub struct CustomBookProvider {
    pool: PgPool,
}

impl CustomBookProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BookProvider for CustomBookProvider {
    async fn lookup(&self, book_key: &str) -> AppResult<Option<BookDetails>> {
        let details = sqlx::query_as::<_, BookDetails>(
            r#"
            SELECT book_key, title, author, cover_img, genre, description, 'custom'::text AS source
            FROM custom_books
            WHERE book_key = $1
            "#,
        )
        .bind(book_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}
