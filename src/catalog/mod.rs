/// Book source abstraction
///
/// Book identity is resolved against three heterogeneous sources: the
/// lazily cached `reviewed_books` snapshot, the admin-curated
/// `custom_books` table, and the Open Library catalog. Each source is a
/// [`BookProvider`]; the resolver tries them in fixed priority order and
/// the first hit wins.
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::BookDetails,
};

pub mod cached;
pub mod custom;
pub mod openlibrary;

pub use cached::CachedBookProvider;
pub use custom::CustomBookProvider;
pub use openlibrary::{CatalogBookProvider, OpenLibraryGateway};

/// Books carry at most this many genre tags, whatever the source stored.
pub const MAX_GENRES: usize = 4;

/// A single book-metadata source
///
/// `lookup` returns `Ok(None)` for a miss so the resolver can fall through
/// to the next source; only infrastructure faults (storage errors) are
/// propagated as `Err`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BookProvider: Send + Sync {
    /// Look the book up in this source, `None` on a miss
    async fn lookup(&self, book_key: &str) -> AppResult<Option<BookDetails>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Resolves a book key to normalized metadata via the provider chain
#[derive(Clone)]
pub struct BookResolver {
    providers: Vec<Arc<dyn BookProvider>>,
}

impl BookResolver {
    pub fn new(providers: Vec<Arc<dyn BookProvider>>) -> Self {
        Self { providers }
    }

    /// Standard chain: cached snapshot, then custom books, then the catalog
    pub fn with_default_chain(pool: sqlx::PgPool, gateway: Arc<OpenLibraryGateway>) -> Self {
        Self::new(vec![
            Arc::new(CachedBookProvider::new(pool.clone())),
            Arc::new(CustomBookProvider::new(pool)),
            Arc::new(CatalogBookProvider::new(gateway)),
        ])
    }

    /// Resolves `book_key` against the chain.
    ///
    /// Fails with `NotFound` only when every source misses.
    pub async fn resolve(&self, book_key: &str) -> AppResult<BookDetails> {
        for provider in &self.providers {
            if let Some(mut details) = provider.lookup(book_key).await? {
                details.genre.truncate(MAX_GENRES);
                tracing::debug!(
                    book_key = %book_key,
                    provider = provider.name(),
                    "Book resolved"
                );
                return Ok(details);
            }
        }

        Err(AppError::NotFound("Book not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookSource;

    fn details(key: &str, source: BookSource) -> BookDetails {
        BookDetails {
            book_key: key.to_string(),
            title: "The Fellowship of the Ring".to_string(),
            author: "J. R. R. Tolkien".to_string(),
            cover_img: None,
            genre: vec!["fantasy".to_string()],
            description: None,
            source,
        }
    }

    fn mock_provider(
        result: Option<BookDetails>,
        name: &'static str,
    ) -> Arc<dyn BookProvider> {
        let mut mock = MockBookProvider::new();
        mock.expect_lookup().returning(move |_| Ok(result.clone()));
        mock.expect_name().return_const(name);
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_first_hit_short_circuits() {
        let mut second = MockBookProvider::new();
        second.expect_lookup().times(0);

        let resolver = BookResolver::new(vec![
            mock_provider(Some(details("OL1W", BookSource::Api)), "cached"),
            Arc::new(second),
        ]);

        let resolved = resolver.resolve("OL1W").await.unwrap();
        assert_eq!(resolved.source, BookSource::Api);
    }

    #[tokio::test]
    async fn test_falls_through_to_later_provider() {
        let resolver = BookResolver::new(vec![
            mock_provider(None, "cached"),
            mock_provider(Some(details("OL2W", BookSource::Custom)), "custom"),
        ]);

        let resolved = resolver.resolve("OL2W").await.unwrap();
        assert_eq!(resolved.source, BookSource::Custom);
    }

    #[tokio::test]
    async fn test_all_misses_is_not_found() {
        let resolver = BookResolver::new(vec![
            mock_provider(None, "cached"),
            mock_provider(None, "custom"),
            mock_provider(None, "catalog"),
        ]);

        let err = resolver.resolve("OL404W").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_genres_clamped_to_four() {
        let mut many = details("OL3W", BookSource::Api);
        many.genre = vec![
            "fantasy".to_string(),
            "adventure".to_string(),
            "epic".to_string(),
            "classics".to_string(),
            "fiction".to_string(),
        ];

        let resolver = BookResolver::new(vec![mock_provider(Some(many), "cached")]);

        let resolved = resolver.resolve("OL3W").await.unwrap();
        assert_eq!(resolved.genre.len(), MAX_GENRES);
        assert_eq!(resolved.genre[3], "classics");
    }
}
