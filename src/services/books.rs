use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{
    catalog::{openlibrary::strip_key_prefix, OpenLibraryGateway},
    error::{AppError, AppResult},
    models::{BookDetails, BookSource, CustomBook},
};

/// How many catalog docs a search requests
const SEARCH_API_LIMIT: usize = 12;

/// How many custom books a search merges in
const SEARCH_CUSTOM_LIMIT: i64 = 5;

/// Search results carry a shorter genre list than full details
const SEARCH_GENRES: usize = 3;

/// Default page size for custom-book listings
const DEFAULT_PAGE_SIZE: i64 = 9;

/// Catalog search and the admin-curated custom book collection
pub struct CatalogService {
    pool: PgPool,
    gateway: Arc<OpenLibraryGateway>,
}

/// Admin payload for a new custom book
#[derive(Debug, Deserialize)]
pub struct NewCustomBook {
    pub book_key: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: Vec<String>,
    pub description: Option<String>,
    pub cover_img: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct CustomBooksPage {
    pub books: Vec<CustomBook>,
    pub pagination: Pagination,
}

impl CatalogService {
    pub fn new(pool: PgPool, gateway: Arc<OpenLibraryGateway>) -> Self {
        Self { pool, gateway }
    }

    /// Searches the catalog and the custom collection, merged.
    ///
    /// Each catalog doc is enriched with a per-work lookup for subjects and
    /// description; docs whose enrichment fails are dropped rather than
    /// failing the search.
    pub async fn search_books(&self, query: &str) -> AppResult<Vec<BookDetails>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query is required".to_string(),
            ));
        }

        let docs = self.gateway.search(query, SEARCH_API_LIMIT).await?;

        let mut tasks = Vec::new();
        for doc in docs.into_iter().take(SEARCH_API_LIMIT) {
            let gateway = Arc::clone(&self.gateway);
            tasks.push(tokio::spawn(async move {
                let book_key = strip_key_prefix(&doc.key);

                let work = match gateway.fetch_work(&book_key).await {
                    Ok(work) => work,
                    Err(e) => {
                        tracing::debug!(book_key = %book_key, error = %e, "Dropped search result");
                        return None;
                    }
                };

                let mut genre = work.genre;
                genre.truncate(SEARCH_GENRES);

                Some(BookDetails {
                    book_key,
                    title: doc.title,
                    author: doc
                        .author_name
                        .as_ref()
                        .and_then(|names| names.first())
                        .cloned()
                        .unwrap_or_else(|| "Unknown".to_string()),
                    cover_img: doc.cover_i.map(|id| gateway.cover_url(id)),
                    genre,
                    description: work.description,
                    source: BookSource::Api,
                })
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Some(book)) => results.push(book),
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Search enrichment task failed"),
            }
        }

        let api_count = results.len();
        results.extend(self.search_custom_books(query).await?);

        tracing::info!(
            query = %query,
            api_results = api_count,
            custom_results = results.len() - api_count,
            "Book search completed"
        );

        Ok(results)
    }

    async fn search_custom_books(&self, query: &str) -> AppResult<Vec<BookDetails>> {
        let pattern = format!("%{}%", query);
        let mut books = sqlx::query_as::<_, BookDetails>(
            r#"
            SELECT book_key, title, author, cover_img, genre, description, 'custom'::text AS source
            FROM custom_books
            WHERE title ILIKE $1 OR author ILIKE $1
            LIMIT $2
            "#,
        )
        .bind(&pattern)
        .bind(SEARCH_CUSTOM_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        for book in &mut books {
            book.genre.truncate(SEARCH_GENRES);
        }

        Ok(books)
    }

    /// Adds a custom book; admin-only
    pub async fn add_custom_book(
        &self,
        user_id: i64,
        book: NewCustomBook,
    ) -> AppResult<CustomBook> {
        let is_admin: bool = sqlx::query_scalar(
            r#"SELECT is_admin FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !is_admin {
            return Err(AppError::Forbidden(
                "Only admins can add custom books".to_string(),
            ));
        }

        if book.book_key.trim().is_empty()
            || book.title.trim().is_empty()
            || book.author.trim().is_empty()
        {
            return Err(AppError::InvalidInput(
                "Book key, title and author are required".to_string(),
            ));
        }

        if let Some(url) = &book.cover_img {
            if !is_image_url(url) {
                return Err(AppError::InvalidInput(
                    "Invalid image URL. Must end with .jpg, .jpeg or .png".to_string(),
                ));
            }
        }

        let created = sqlx::query_as::<_, CustomBook>(
            r#"
            INSERT INTO custom_books (book_key, title, author, genre, description, cover_img, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, book_key, title, author, cover_img, genre, description, created_by, created_at
            "#,
        )
        .bind(&book.book_key)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(&book.cover_img)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "A book with this key already exists"))?;

        tracing::info!(
            book_key = %created.book_key,
            created_by = user_id,
            "Custom book added"
        );

        Ok(created)
    }

    pub async fn list_custom_books(
        &self,
        page: i64,
        limit: Option<i64>,
    ) -> AppResult<CustomBooksPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = page.max(1);
        let offset = (page - 1) * limit;

        let total_count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM custom_books"#)
            .fetch_one(&self.pool)
            .await?;

        let books = sqlx::query_as::<_, CustomBook>(
            r#"
            SELECT id, book_key, title, author, cover_img, genre, description, created_by, created_at
            FROM custom_books
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(CustomBooksPage {
            books,
            pagination: paginate(total_count, page, limit),
        })
    }

    pub async fn get_custom_book(&self, id: i64) -> AppResult<CustomBook> {
        let book = sqlx::query_as::<_, CustomBook>(
            r#"
            SELECT id, book_key, title, author, cover_img, genre, description, created_by, created_at
            FROM custom_books
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        Ok(book)
    }
}

/// Accepts only URLs whose path ends in a known image extension; a query
/// string after the extension is tolerated
fn is_image_url(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url).to_lowercase();
    path.ends_with(".jpg") || path.ends_with(".jpeg") || path.ends_with(".png")
}

fn paginate(total_count: i64, current_page: i64, limit: i64) -> Pagination {
    let total_pages = (total_count + limit - 1) / limit;
    Pagination {
        current_page,
        total_pages,
        total_count,
        has_next: current_page < total_pages,
        has_prev: current_page > 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_extensions() {
        assert!(is_image_url("https://example.com/cover.jpg"));
        assert!(is_image_url("https://example.com/cover.JPEG"));
        assert!(is_image_url("https://example.com/cover.png"));
        assert!(!is_image_url("https://example.com/cover.gif"));
        assert!(!is_image_url("https://example.com/cover"));
    }

    #[test]
    fn test_image_url_tolerates_query_string() {
        assert!(is_image_url("https://example.com/cover.jpg?size=large"));
        assert!(!is_image_url("https://example.com/page?file=cover.jpg"));
    }

    #[test]
    fn test_paginate_exact_fit() {
        let p = paginate(18, 2, 9);
        assert_eq!(p.total_pages, 2);
        assert!(!p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn test_paginate_with_remainder() {
        let p = paginate(19, 1, 9);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(!p.has_prev);
    }

    #[test]
    fn test_paginate_empty() {
        let p = paginate(0, 1, 9);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }
}
