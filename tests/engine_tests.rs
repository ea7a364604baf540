use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use bookhive_api::catalog::{BookProvider, BookResolver};
use bookhive_api::error::{AppError, AppResult};
use bookhive_api::models::{BookDetails, BookSource};
use bookhive_api::push::PushRegistry;
use bookhive_api::services::history::{HistoryStore, InMemoryHistoryStore};

/// In-memory provider standing in for one of the three book sources
struct MapProvider {
    name: &'static str,
    books: HashMap<String, BookDetails>,
}

impl MapProvider {
    fn new(name: &'static str, books: Vec<BookDetails>) -> Self {
        Self {
            name,
            books: books.into_iter().map(|b| (b.book_key.clone(), b)).collect(),
        }
    }
}

#[async_trait::async_trait]
impl BookProvider for MapProvider {
    async fn lookup(&self, book_key: &str) -> AppResult<Option<BookDetails>> {
        Ok(self.books.get(book_key).cloned())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn book(key: &str, title: &str, source: BookSource) -> BookDetails {
    BookDetails {
        book_key: key.to_string(),
        title: title.to_string(),
        author: "Ursula K. Le Guin".to_string(),
        cover_img: None,
        genre: vec!["fantasy".to_string()],
        description: None,
        source,
    }
}

#[tokio::test]
async fn resolver_prefers_the_cached_snapshot() {
    // The same key exists in the snapshot and as a custom book; the
    // snapshot wins because it sits first in the chain
    let resolver = BookResolver::new(vec![
        Arc::new(MapProvider::new(
            "cached",
            vec![book("OL1W", "Snapshot Title", BookSource::Api)],
        )),
        Arc::new(MapProvider::new(
            "custom",
            vec![book("OL1W", "Custom Title", BookSource::Custom)],
        )),
    ]);

    let resolved = resolver.resolve("OL1W").await.unwrap();
    assert_eq!(resolved.title, "Snapshot Title");
    assert_eq!(resolved.source, BookSource::Api);
}

#[tokio::test]
async fn resolver_falls_back_through_the_chain() {
    let resolver = BookResolver::new(vec![
        Arc::new(MapProvider::new("cached", vec![])),
        Arc::new(MapProvider::new(
            "custom",
            vec![book("local-9", "A Wizard of Earthsea", BookSource::Custom)],
        )),
        Arc::new(MapProvider::new("catalog", vec![])),
    ]);

    let resolved = resolver.resolve("local-9").await.unwrap();
    assert_eq!(resolved.source, BookSource::Custom);

    let missing = resolver.resolve("nowhere").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[test]
fn history_excludes_recent_batches_across_requests() {
    let store = InMemoryHistoryStore::new();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    // First dashboard load shows five books
    let mut history = store.get(42);
    let first_batch: Vec<String> = (0..5).map(|i| format!("k{}", i)).collect();
    history.record(&first_batch, now);
    store.put(42, history);

    // The next load must see all five in its exclusion window
    let excluded = store.get(42).excluded_keys();
    for key in &first_batch {
        assert!(excluded.contains(key));
    }

    // A second batch five minutes later extends the window
    let mut history = store.get(42);
    let second_batch: Vec<String> = (5..10).map(|i| format!("k{}", i)).collect();
    history.record(&second_batch, now + chrono::Duration::minutes(5));
    store.put(42, history);

    let excluded = store.get(42).excluded_keys();
    assert_eq!(excluded.len(), 10);
    assert!(excluded.contains(&"k0".to_string()));
    assert!(excluded.contains(&"k9".to_string()));
}

#[test]
fn history_resets_after_an_idle_hour() {
    let store = InMemoryHistoryStore::new();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    let mut history = store.get(42);
    history.record(&["stale".to_string()], now);
    store.put(42, history);

    // Over an hour idle: the old window is cleared before extending
    let mut history = store.get(42);
    history.record(
        &["fresh".to_string()],
        now + chrono::Duration::seconds(3601),
    );
    store.put(42, history);

    let excluded = store.get(42).excluded_keys();
    assert_eq!(excluded, vec!["fresh".to_string()]);
}

#[test]
fn history_is_isolated_per_user() {
    let store = InMemoryHistoryStore::new();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    let mut history = store.get(1);
    history.record(&["a".to_string()], now);
    store.put(1, history);

    assert!(store.get(2).excluded_keys().is_empty());
}

#[tokio::test]
async fn push_is_delivered_to_the_receiver_only() {
    let registry = PushRegistry::new();
    let mut receiver = registry.register(2);
    let mut bystander = registry.register(3);

    registry.send(2, "notification", serde_json::json!({ "type": "follow" }));

    let message = receiver.recv().await.unwrap();
    assert_eq!(message.event, "notification");
    assert_eq!(message.payload["type"], "follow");
    assert!(bystander.try_recv().is_err());
}

#[tokio::test]
async fn push_to_offline_user_is_silently_dropped() {
    let registry = PushRegistry::new();
    registry.send(404, "notification", serde_json::json!({}));
}
