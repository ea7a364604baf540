use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;

use crate::{
    catalog::OpenLibraryGateway,
    error::AppResult,
    models::{BookSource, DashboardBooks, RecommendedBook},
    services::history::HistoryStore,
};

/// Books per dashboard batch
pub const DEFAULT_LIMIT: usize = 5;

/// Below this many genre-matched candidates the batch counts as a fallback
const MIN_GENRE_MATCHED: usize = 4;

/// Subjects sampled when a user has no favorite genres left to mine
const FALLBACK_SUBJECTS: [&str; 5] = ["fiction", "science", "history", "romance", "fantasy"];

/// Per-user review metrics for the dashboard header
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_reviews: i64,
    pub avg_rating: f64,
}

/// Builds the personalized dashboard batch.
///
/// Candidates come from three tiers: genre-matched snapshot/custom rows,
/// genre-matched catalog works, and random fill. A rolling shown-history
/// (injected store) keeps consecutive batches from repeating; an injected
/// rng keeps selection uniform and tests deterministic.
pub struct RecommendationEngine {
    pool: PgPool,
    gateway: Arc<OpenLibraryGateway>,
    history: Arc<dyn HistoryStore>,
}

impl RecommendationEngine {
    pub fn new(pool: PgPool, gateway: Arc<OpenLibraryGateway>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            pool,
            gateway,
            history,
        }
    }

    /// Assembles the dashboard batch for one user.
    ///
    /// Never returns more than [`DEFAULT_LIMIT`] books, and never repeats a
    /// key from the user's recent shown-history unless every other source
    /// is exhausted.
    pub async fn dashboard_books<R: Rng>(
        &self,
        user_id: i64,
        rng: &mut R,
    ) -> AppResult<DashboardBooks> {
        let limit = DEFAULT_LIMIT;
        let favorite_genres = self.favorite_genres(user_id).await?;
        let excluded = self.history.get(user_id).excluded_keys();

        let mut recommended: Vec<RecommendedBook> = Vec::new();
        let mut used_fallback = false;

        if !favorite_genres.is_empty() {
            let fetch_limit = (limit * 2) as i64;
            let (reviewed, custom) = tokio::join!(
                self.genre_matched_reviewed(&favorite_genres, &excluded, fetch_limit),
                self.genre_matched_custom(&favorite_genres, &excluded, fetch_limit),
            );

            let mut matched = reviewed?;
            matched.extend(custom?);
            let matched = shuffle_take(matched, limit, rng);

            if matched.len() < MIN_GENRE_MATCHED {
                used_fallback = true;
            }
            recommended = matched;
        }

        if recommended.len() < limit {
            let needed = limit - recommended.len();

            let mut taken: HashSet<String> = excluded.iter().cloned().collect();
            taken.extend(recommended.iter().map(|b| b.book_key.clone()));

            let mut fallback = if favorite_genres.is_empty() {
                Vec::new()
            } else {
                self.catalog_books_by_genres(&favorite_genres, needed, &taken, rng)
                    .await
            };

            if fallback.len() < needed {
                taken.extend(fallback.iter().map(|b| b.book_key.clone()));
                let random = self
                    .random_fill(needed - fallback.len(), &taken, rng)
                    .await;
                fallback.extend(random);
                used_fallback = true;
            }

            recommended.extend(fallback);
        }

        recommended.truncate(limit);
        for book in &mut recommended {
            annotate(book);
        }

        // The featured slot gets the full catalog description when the pick
        // came straight from the API and only carries subject-level data
        if let Some(first) = recommended.first_mut() {
            if first.source == BookSource::Api {
                if let Some(description) = self.gateway.fetch_description(&first.book_key).await {
                    first.description = Some(description);
                }
            }
        }

        let shown: Vec<String> = recommended.iter().map(|b| b.book_key.clone()).collect();
        let mut history = self.history.get(user_id);
        history.record(&shown, Utc::now());
        self.history.put(user_id, history);

        tracing::info!(
            user_id,
            batch = recommended.len(),
            used_fallback,
            "Dashboard batch assembled"
        );

        let mut books = recommended.into_iter();
        let featured_book = books.next();
        let recommended_books: Vec<RecommendedBook> = books.collect();

        Ok(DashboardBooks {
            featured_book,
            recommended_books,
            used_fallback,
        })
    }

    /// Review count and average rating for the user's own reviews
    pub async fn dashboard_metrics(&self, user_id: i64) -> AppResult<DashboardMetrics> {
        let row: (i64, Option<f64>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), AVG(NULLIF(rating, 0))::float8
            FROM reviews
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardMetrics {
            total_reviews: row.0,
            avg_rating: row.1.map(round_rating).unwrap_or(0.0),
        })
    }

    async fn favorite_genres(&self, user_id: i64) -> AppResult<Vec<String>> {
        let genres: Option<Vec<String>> = sqlx::query_scalar(
            r#"SELECT favorite_genres FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(genres.unwrap_or_default())
    }

    async fn genre_matched_reviewed(
        &self,
        genres: &[String],
        exclude: &[String],
        fetch_limit: i64,
    ) -> AppResult<Vec<RecommendedBook>> {
        let books = sqlx::query_as::<_, RecommendedBook>(
            r#"
            SELECT rb.book_key, rb.title, rb.author, rb.cover_img, rb.genre,
                   rb.description, rb.source,
                   AVG(r.rating)::float8 AS avg_rating,
                   COUNT(r.id) AS review_count
            FROM reviewed_books rb
            LEFT JOIN reviews r ON rb.book_key = r.book_id
            WHERE rb.genre && $1 AND NOT (rb.book_key = ANY($2))
            GROUP BY rb.book_key
            ORDER BY random()
            LIMIT $3
            "#,
        )
        .bind(genres)
        .bind(exclude)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Custom books matching the genres, skipping any already present in
    /// the snapshot table (those rows would double-count)
    async fn genre_matched_custom(
        &self,
        genres: &[String],
        exclude: &[String],
        fetch_limit: i64,
    ) -> AppResult<Vec<RecommendedBook>> {
        let books = sqlx::query_as::<_, RecommendedBook>(
            r#"
            SELECT cb.book_key, cb.title, cb.author, cb.cover_img, cb.genre,
                   cb.description, 'custom'::text AS source,
                   AVG(r.rating)::float8 AS avg_rating,
                   COUNT(r.id) AS review_count
            FROM custom_books cb
            LEFT JOIN reviews r ON cb.book_key = r.book_id
            WHERE cb.genre && $1
              AND NOT EXISTS (SELECT 1 FROM reviewed_books rb WHERE rb.book_key = cb.book_key)
              AND NOT (cb.book_key = ANY($2))
            GROUP BY cb.id
            ORDER BY random()
            LIMIT $3
            "#,
        )
        .bind(genres)
        .bind(exclude)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn random_reviewed(
        &self,
        exclude: &[String],
        fetch_limit: i64,
    ) -> AppResult<Vec<RecommendedBook>> {
        let books = sqlx::query_as::<_, RecommendedBook>(
            r#"
            SELECT rb.book_key, rb.title, rb.author, rb.cover_img, rb.genre,
                   rb.description, rb.source,
                   AVG(r.rating)::float8 AS avg_rating,
                   COUNT(r.id) AS review_count
            FROM reviewed_books rb
            LEFT JOIN reviews r ON rb.book_key = r.book_id
            WHERE NOT (rb.book_key = ANY($1))
            GROUP BY rb.book_key
            ORDER BY random()
            LIMIT $2
            "#,
        )
        .bind(exclude)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn random_custom(
        &self,
        exclude: &[String],
        fetch_limit: i64,
    ) -> AppResult<Vec<RecommendedBook>> {
        let books = sqlx::query_as::<_, RecommendedBook>(
            r#"
            SELECT cb.book_key, cb.title, cb.author, cb.cover_img, cb.genre,
                   cb.description, 'custom'::text AS source,
                   AVG(r.rating)::float8 AS avg_rating,
                   COUNT(r.id) AS review_count
            FROM custom_books cb
            LEFT JOIN reviews r ON cb.book_key = r.book_id
            WHERE NOT (cb.book_key = ANY($1))
            GROUP BY cb.id
            ORDER BY random()
            LIMIT $2
            "#,
        )
        .bind(exclude)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Pulls genre-matched candidates from the catalog, one genre at a
    /// time in random order, until `limit` is reached or genres run out.
    ///
    /// Catalog failures degrade to a smaller pool, never an error.
    async fn catalog_books_by_genres<R: Rng>(
        &self,
        genres: &[String],
        limit: usize,
        exclude: &HashSet<String>,
        rng: &mut R,
    ) -> Vec<RecommendedBook> {
        let mut shuffled = genres.to_vec();
        shuffled.shuffle(rng);

        let mut results: Vec<RecommendedBook> = Vec::new();

        for genre in shuffled {
            if results.len() >= limit {
                break;
            }

            match self.gateway.books_by_subject(&genre, limit * 3).await {
                Ok(works) => {
                    let mut pool: Vec<RecommendedBook> = works
                        .into_iter()
                        .filter(|work| !exclude.contains(&work.book_key))
                        .filter(|work| !results.iter().any(|r| r.book_key == work.book_key))
                        .collect();
                    pool.shuffle(rng);

                    let remaining = limit - results.len();
                    results.extend(pool.into_iter().take(remaining));
                }
                Err(e) => {
                    tracing::warn!(genre = %genre, error = %e, "Subject fetch failed");
                }
            }
        }

        results
    }

    /// Last-resort fill: random snapshot rows, then random custom books,
    /// then arbitrary catalog subjects, each tier skipping keys already
    /// chosen. Tiers degrade independently so one failing source does not
    /// empty the dashboard.
    async fn random_fill<R: Rng>(
        &self,
        limit: usize,
        exclude: &HashSet<String>,
        rng: &mut R,
    ) -> Vec<RecommendedBook> {
        let mut exclude_keys: Vec<String> = exclude.iter().cloned().collect();

        let mut results = match self.random_reviewed(&exclude_keys, limit as i64).await {
            Ok(books) => books,
            Err(e) => {
                tracing::warn!(error = %e, "Random snapshot fill failed");
                Vec::new()
            }
        };

        if results.len() < limit {
            exclude_keys.extend(results.iter().map(|b| b.book_key.clone()));
            match self
                .random_custom(&exclude_keys, (limit - results.len()) as i64)
                .await
            {
                Ok(books) => results.extend(books),
                Err(e) => {
                    tracing::warn!(error = %e, "Random custom fill failed");
                }
            }
        }

        if results.len() < limit {
            let mut taken: HashSet<String> = exclude.clone();
            taken.extend(results.iter().map(|b| b.book_key.clone()));

            let subjects: Vec<String> =
                FALLBACK_SUBJECTS.iter().map(|s| s.to_string()).collect();
            let api_books = self
                .catalog_books_by_genres(&subjects, limit - results.len(), &taken, rng)
                .await;
            results.extend(api_books);
        }

        results.truncate(limit);
        results
    }
}

/// Uniform shuffle, then cap at `limit`
fn shuffle_take<R: Rng>(
    mut books: Vec<RecommendedBook>,
    limit: usize,
    rng: &mut R,
) -> Vec<RecommendedBook> {
    books.shuffle(rng);
    books.truncate(limit);
    books
}

/// Finalizes a candidate for display: one-decimal rating and the
/// new-arrival flag for unreviewed catalog books
fn annotate(book: &mut RecommendedBook) {
    book.avg_rating = book.avg_rating.map(round_rating);
    book.is_new = book.source == BookSource::Api && book.review_count == 0;
}

/// Rounds to one decimal place
pub fn round_rating(avg: f64) -> f64 {
    (avg * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn candidate(key: &str, source: BookSource) -> RecommendedBook {
        RecommendedBook {
            book_key: key.to_string(),
            title: format!("Title {}", key),
            author: "Author".to_string(),
            cover_img: None,
            genre: vec!["fantasy".to_string()],
            description: None,
            source,
            avg_rating: None,
            review_count: 0,
            is_new: false,
        }
    }

    #[test]
    fn test_round_rating_one_decimal() {
        assert_eq!(round_rating(4.4666), 4.5);
        assert_eq!(round_rating(4.44), 4.4);
        assert_eq!(round_rating(5.0), 5.0);
    }

    #[test]
    fn test_annotate_marks_unreviewed_api_books_new() {
        let mut book = candidate("OL1W", BookSource::Api);
        annotate(&mut book);
        assert!(book.is_new);
    }

    #[test]
    fn test_annotate_reviewed_api_book_is_not_new() {
        let mut book = candidate("OL1W", BookSource::Api);
        book.review_count = 3;
        book.avg_rating = Some(4.2333);
        annotate(&mut book);
        assert!(!book.is_new);
        assert_eq!(book.avg_rating, Some(4.2));
    }

    #[test]
    fn test_annotate_custom_book_is_never_new() {
        let mut book = candidate("local-1", BookSource::Custom);
        annotate(&mut book);
        assert!(!book.is_new);
    }

    #[test]
    fn test_shuffle_take_caps_at_limit() {
        let books: Vec<RecommendedBook> = (0..10)
            .map(|i| candidate(&format!("k{}", i), BookSource::Api))
            .collect();

        let mut rng = StdRng::seed_from_u64(42);
        let taken = shuffle_take(books, 5, &mut rng);
        assert_eq!(taken.len(), 5);
    }

    #[test]
    fn test_shuffle_take_is_a_permutation() {
        let books: Vec<RecommendedBook> = (0..6)
            .map(|i| candidate(&format!("k{}", i), BookSource::Api))
            .collect();

        let mut rng = StdRng::seed_from_u64(7);
        let taken = shuffle_take(books.clone(), 6, &mut rng);

        let mut original: Vec<String> = books.into_iter().map(|b| b.book_key).collect();
        let mut shuffled: Vec<String> = taken.into_iter().map(|b| b.book_key).collect();
        original.sort();
        shuffled.sort();
        assert_eq!(original, shuffled);
    }

    #[test]
    fn test_shuffle_take_is_deterministic_for_a_seed() {
        let books: Vec<RecommendedBook> = (0..8)
            .map(|i| candidate(&format!("k{}", i), BookSource::Api))
            .collect();

        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);

        let first = shuffle_take(books.clone(), 5, &mut rng_a);
        let second = shuffle_take(books, 5, &mut rng_b);
        assert_eq!(first, second);
    }

    #[test]
    fn test_shuffle_take_short_pool_stays_short() {
        let books = vec![candidate("only", BookSource::Custom)];
        let mut rng = StdRng::seed_from_u64(1);
        let taken = shuffle_take(books, 5, &mut rng);
        assert_eq!(taken.len(), 1);
    }
}
