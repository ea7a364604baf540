use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Shown-history window size
const HISTORY_CAP: usize = 20;

/// How many of the most recently shown keys to exclude from the next batch
const EXCLUDE_WINDOW: usize = 10;

/// Idle time after which the whole history resets
const IDLE_RESET_SECS: i64 = 3600;

/// Rolling record of which book keys a user was recently shown.
///
/// This is session-scoped optimization state, not identity: it reduces
/// repeats between consecutive dashboard loads and is allowed to vanish on
/// restart or go stale under concurrent requests (last write wins).
#[derive(Debug, Clone)]
pub struct RecommendationHistory {
    shown_books: Vec<String>,
    shown_count: HashMap<String, u32>,
    last_shown: DateTime<Utc>,
}

impl Default for RecommendationHistory {
    fn default() -> Self {
        Self {
            shown_books: Vec::new(),
            shown_count: HashMap::new(),
            last_shown: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl RecommendationHistory {
    /// Keys to exclude from the next recommendation batch
    pub fn excluded_keys(&self) -> Vec<String> {
        let start = self.shown_books.len().saturating_sub(EXCLUDE_WINDOW);
        self.shown_books[start..].to_vec()
    }

    /// Appends a shown batch, resetting first when the history sat idle
    /// for over an hour
    pub fn record(&mut self, book_keys: &[String], now: DateTime<Utc>) {
        if now - self.last_shown > Duration::seconds(IDLE_RESET_SECS) {
            self.shown_books.clear();
            self.shown_count.clear();
        }

        for key in book_keys {
            self.shown_books.push(key.clone());
            *self.shown_count.entry(key.clone()).or_insert(0) += 1;
        }

        let overflow = self.shown_books.len().saturating_sub(HISTORY_CAP);
        if overflow > 0 {
            self.shown_books.drain(..overflow);
        }

        self.last_shown = now;
    }

    /// How many times a key has been shown since the last reset
    pub fn shown_count(&self, book_key: &str) -> u32 {
        self.shown_count.get(book_key).copied().unwrap_or(0)
    }
}

/// Per-user session store for recommendation history.
///
/// Behind an interface so the process-local map can be swapped for a
/// distributed cache without touching the engine.
pub trait HistoryStore: Send + Sync {
    fn get(&self, user_id: i64) -> RecommendationHistory;
    fn put(&self, user_id: i64, history: RecommendationHistory);
}

/// Process-local store; state dies with the process
#[derive(Default)]
pub struct InMemoryHistoryStore {
    inner: Mutex<HashMap<i64, RecommendationHistory>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn get(&self, user_id: i64) -> RecommendationHistory {
        self.inner
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn put(&self, user_id: i64, history: RecommendationHistory) {
        self.inner.lock().unwrap().insert(user_id, history);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_empty_history_excludes_nothing() {
        let history = RecommendationHistory::default();
        assert!(history.excluded_keys().is_empty());
    }

    #[test]
    fn test_record_and_exclude() {
        let mut history = RecommendationHistory::default();
        history.record(&keys(&["a", "b", "c"]), at(0));

        assert_eq!(history.excluded_keys(), keys(&["a", "b", "c"]));
        assert_eq!(history.shown_count("a"), 1);
    }

    #[test]
    fn test_exclusion_is_last_ten() {
        let mut history = RecommendationHistory::default();
        let batch: Vec<String> = (0..15).map(|i| format!("k{}", i)).collect();
        history.record(&batch, at(0));

        let excluded = history.excluded_keys();
        assert_eq!(excluded.len(), EXCLUDE_WINDOW);
        assert_eq!(excluded[0], "k5");
        assert_eq!(excluded[9], "k14");
    }

    #[test]
    fn test_history_capped_at_twenty() {
        let mut history = RecommendationHistory::default();
        for batch in 0..5 {
            let batch_keys: Vec<String> =
                (0..5).map(|i| format!("b{}k{}", batch, i)).collect();
            history.record(&batch_keys, at(batch * 60));
        }

        // 25 recorded, only the last 20 retained
        assert_eq!(history.excluded_keys()[9], "b4k4");
        assert_eq!(history.shown_count("b0k0"), 1);
        let excluded = history.excluded_keys();
        assert!(!excluded.contains(&"b0k0".to_string()));
    }

    #[test]
    fn test_idle_reset_after_one_hour() {
        let mut history = RecommendationHistory::default();
        history.record(&keys(&["a", "b"]), at(0));

        // Just over an hour later the old window is gone
        history.record(&keys(&["c"]), at(3601));

        assert_eq!(history.excluded_keys(), keys(&["c"]));
        assert_eq!(history.shown_count("a"), 0);
    }

    #[test]
    fn test_no_reset_within_the_hour() {
        let mut history = RecommendationHistory::default();
        history.record(&keys(&["a"]), at(0));
        history.record(&keys(&["b"]), at(3599));

        assert_eq!(history.excluded_keys(), keys(&["a", "b"]));
    }

    #[test]
    fn test_repeat_key_increments_count() {
        let mut history = RecommendationHistory::default();
        history.record(&keys(&["a"]), at(0));
        history.record(&keys(&["a"]), at(10));

        assert_eq!(history.shown_count("a"), 2);
    }

    #[test]
    fn test_store_round_trip() {
        let store = InMemoryHistoryStore::new();
        let mut history = store.get(1);
        history.record(&keys(&["a"]), at(0));
        store.put(1, history);

        assert_eq!(store.get(1).excluded_keys(), keys(&["a"]));
        // Other users are unaffected
        assert!(store.get(2).excluded_keys().is_empty());
    }
}
