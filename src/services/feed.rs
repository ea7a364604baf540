use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppResult;

/// How many recent reviews feed candidate selection
const FEED_POOL_SIZE: i64 = 30;

/// Minimum feed length before topping up with non-matching reviews
const MIN_FEED: usize = 7;

/// One community feed entry: a recent review with its author and resolved
/// book metadata
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeedEntry {
    pub review_id: i64,
    pub user_id: i64,
    pub username: String,
    pub profile_img: Option<String>,
    pub rating: i16,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_img: Option<String>,
    pub genre: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CommunityFeed {
    pub total: usize,
    pub feed: Vec<FeedEntry>,
}

/// Assembles the community feed: recent reviews matching the viewer's
/// favorite genres, topped up with a random sample of the rest.
///
/// Unlike the dashboard, the feed keeps no shown-history between calls.
pub struct FeedService {
    pool: PgPool,
}

impl FeedService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn community_feed<R: Rng>(
        &self,
        user_id: i64,
        rng: &mut R,
    ) -> AppResult<CommunityFeed> {
        let favorite_genres: Vec<String> = sqlx::query_scalar(
            r#"SELECT favorite_genres FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .unwrap_or_default();

        let rows = self.recent_reviews().await?;
        let feed = select_feed(rows, &favorite_genres, rng);

        Ok(CommunityFeed {
            total: feed.len(),
            feed,
        })
    }

    async fn recent_reviews(&self) -> AppResult<Vec<FeedEntry>> {
        let rows = sqlx::query_as::<_, FeedEntry>(
            r#"
            SELECT r.id AS review_id, r.user_id, u.username, u.profile_img,
                   r.rating, r.review_text, r.created_at,
                   COALESCE(rb.title, cb.title) AS title,
                   COALESCE(rb.author, cb.author) AS author,
                   COALESCE(rb.cover_img, cb.cover_img) AS cover_img,
                   COALESCE(rb.genre, cb.genre) AS genre
            FROM reviews r
            JOIN users u ON r.user_id = u.id
            LEFT JOIN reviewed_books rb ON r.book_source = 'api' AND r.book_id = rb.book_key
            LEFT JOIN custom_books cb ON r.book_source = 'custom' AND r.book_id = cb.book_key
            ORDER BY r.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(FEED_POOL_SIZE)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Splits the pool into genre matches and the rest, then tops the matches
/// up to [`MIN_FEED`] with a random sample of the rest.
///
/// Partitioning keeps the two halves disjoint by review id, so the top-up
/// can never duplicate an entry already in the feed.
fn select_feed<R: Rng>(
    rows: Vec<FeedEntry>,
    favorite_genres: &[String],
    rng: &mut R,
) -> Vec<FeedEntry> {
    let (mut feed, mut rest): (Vec<FeedEntry>, Vec<FeedEntry>) =
        rows.into_iter().partition(|row| {
            row.genre
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .any(|g| favorite_genres.contains(g))
        });

    if feed.len() < MIN_FEED {
        rest.shuffle(rng);
        let needed = MIN_FEED - feed.len();
        feed.extend(rest.into_iter().take(needed));
    }

    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(id: i64, genres: &[&str]) -> FeedEntry {
        FeedEntry {
            review_id: id,
            user_id: 1,
            username: "reader".to_string(),
            profile_img: None,
            rating: 4,
            review_text: "Loved it".to_string(),
            created_at: Utc::now(),
            title: Some("A Book".to_string()),
            author: Some("An Author".to_string()),
            cover_img: None,
            genre: if genres.is_empty() {
                None
            } else {
                Some(genres.iter().map(|g| g.to_string()).collect())
            },
        }
    }

    fn genres(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matches_come_first_untrimmed() {
        let rows: Vec<FeedEntry> = (0..10).map(|i| entry(i, &["fantasy"])).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let feed = select_feed(rows, &genres(&["fantasy"]), &mut rng);
        // All ten match; no cap is applied to matches
        assert_eq!(feed.len(), 10);
    }

    #[test]
    fn test_zero_matches_tops_up_to_seven() {
        let rows: Vec<FeedEntry> = (0..20).map(|i| entry(i, &["horror"])).collect();
        let mut rng = StdRng::seed_from_u64(2);

        let feed = select_feed(rows, &genres(&["fantasy"]), &mut rng);
        assert_eq!(feed.len(), MIN_FEED);
    }

    #[test]
    fn test_small_pool_returns_everything() {
        let rows: Vec<FeedEntry> = (0..4).map(|i| entry(i, &["horror"])).collect();
        let mut rng = StdRng::seed_from_u64(3);

        let feed = select_feed(rows, &genres(&["fantasy"]), &mut rng);
        assert_eq!(feed.len(), 4);
    }

    #[test]
    fn test_partial_match_tops_up_without_duplicates() {
        let mut rows: Vec<FeedEntry> = (0..3).map(|i| entry(i, &["fantasy"])).collect();
        rows.extend((3..15).map(|i| entry(i, &["horror"])));
        let mut rng = StdRng::seed_from_u64(4);

        let feed = select_feed(rows, &genres(&["fantasy"]), &mut rng);
        assert_eq!(feed.len(), MIN_FEED);

        let mut ids: Vec<i64> = feed.iter().map(|e| e.review_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), MIN_FEED);

        // The three genre matches are always kept
        for id in 0..3 {
            assert!(feed.iter().any(|e| e.review_id == id));
        }
    }

    #[test]
    fn test_missing_genre_rows_never_match() {
        let rows = vec![entry(1, &[]), entry(2, &["fantasy"])];
        let mut rng = StdRng::seed_from_u64(5);

        let feed = select_feed(rows, &genres(&["fantasy"]), &mut rng);
        // Both end up in the feed (top-up), but only id 2 matched
        assert_eq!(feed[0].review_id, 2);
    }
}
