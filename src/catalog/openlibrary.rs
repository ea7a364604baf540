/// Open Library catalog gateway
///
/// Wraps the public Open Library endpoints used for book identity and
/// recommendation pools:
///
/// 1. Work lookup: /works/{key}.json → title, subjects, description, covers
/// 2. Author lookup: /authors/{key}.json → display name
/// 3. Subject listing: /subjects/{genre}.json → works for a genre
/// 4. Search: /search.json → matching docs
///
/// Responses are cached in Redis with per-endpoint TTLs. Every failure
/// degrades at the call site that treats the catalog as enrichment; only
/// identity resolution turns a total miss into NotFound.
use std::sync::Arc;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    cached,
    catalog::{BookProvider, MAX_GENRES},
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{BookDetails, BookSource, RecommendedBook},
};

const WORK_CACHE_TTL: u64 = 86400; // 1 day
const AUTHOR_CACHE_TTL: u64 = 604800; // 1 week
const SUBJECT_CACHE_TTL: u64 = 3600; // 1 hour
const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour

const UNKNOWN_AUTHOR: &str = "Unknown Author";

#[derive(Clone)]
pub struct OpenLibraryGateway {
    http_client: HttpClient,
    api_url: String,
    covers_url: String,
    cache: Cache,
}

/// Normalized work metadata before the author name is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub title: String,
    pub genre: Vec<String>,
    pub description: Option<String>,
    pub cover_img: Option<String>,
    pub author_key: Option<String>,
}

impl OpenLibraryGateway {
    pub fn new(cache: Cache, api_url: String, covers_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            covers_url,
            cache,
        }
    }

    /// Fetches and normalizes a single work by its key
    pub async fn fetch_work(&self, book_key: &str) -> AppResult<WorkRecord> {
        cached!(
            self.cache,
            CacheKey::Work(book_key.to_string()),
            WORK_CACHE_TTL,
            async move {
                let url = format!("{}/works/{}.json", self.api_url, book_key);

                let response = self.http_client.get(&url).send().await?;

                if !response.status().is_success() {
                    let status = response.status();
                    return Err(AppError::ExternalApi(format!(
                        "Open Library returned status {} for work {}",
                        status, book_key
                    )));
                }

                let work: WorkResponse = response.json().await?;
                Ok(normalize_work(work, &self.covers_url))
            }
        )
    }

    async fn fetch_author(&self, author_key: &str) -> AppResult<String> {
        cached!(
            self.cache,
            CacheKey::Author(author_key.to_string()),
            AUTHOR_CACHE_TTL,
            async move {
                let url = format!("{}/authors/{}.json", self.api_url, author_key);

                let response = self.http_client.get(&url).send().await?;

                if !response.status().is_success() {
                    return Err(AppError::ExternalApi(format!(
                        "Open Library returned status {} for author {}",
                        response.status(),
                        author_key
                    )));
                }

                let author: AuthorResponse = response.json().await?;
                Ok(author.name.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()))
            }
        )
    }

    /// Resolves an author key to a display name
    ///
    /// Any failure degrades to "Unknown Author"; author metadata is
    /// enrichment, never identity.
    pub async fn fetch_author_name(&self, author_key: &str) -> String {
        match self.fetch_author(author_key).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(author_key = %author_key, error = %e, "Author lookup failed");
                UNKNOWN_AUTHOR.to_string()
            }
        }
    }

    /// Full book lookup: work metadata plus the secondary author resolution
    pub async fn lookup_book(&self, book_key: &str) -> AppResult<BookDetails> {
        let work = self.fetch_work(book_key).await?;

        let author = match &work.author_key {
            Some(key) => self.fetch_author_name(key).await,
            None => UNKNOWN_AUTHOR.to_string(),
        };

        Ok(BookDetails {
            book_key: book_key.to_string(),
            title: work.title,
            author,
            cover_img: work.cover_img,
            genre: work.genre,
            description: work.description,
            source: BookSource::Api,
        })
    }

    /// Re-fetches just the description for display richness
    pub async fn fetch_description(&self, book_key: &str) -> Option<String> {
        match self.fetch_work(book_key).await {
            Ok(work) => work.description,
            Err(e) => {
                tracing::warn!(book_key = %book_key, error = %e, "Description re-fetch failed");
                None
            }
        }
    }

    /// Lists recommendation candidates for one genre
    ///
    /// Candidates start with no review aggregates; the engine annotates
    /// them after selection.
    pub async fn books_by_subject(
        &self,
        genre: &str,
        fetch_limit: usize,
    ) -> AppResult<Vec<RecommendedBook>> {
        let slug = subject_slug(genre);
        let works = self.subject_works(&slug, fetch_limit).await?;

        Ok(works
            .into_iter()
            .map(|work| subject_work_to_candidate(work, genre, &self.covers_url))
            .collect())
    }

    async fn subject_works(
        &self,
        slug: &str,
        fetch_limit: usize,
    ) -> AppResult<Vec<SubjectWork>> {
        cached!(
            self.cache,
            CacheKey::Subject(format!("{}:{}", slug, fetch_limit)),
            SUBJECT_CACHE_TTL,
            async move {
                let url = format!(
                    "{}/subjects/{}.json?limit={}",
                    self.api_url, slug, fetch_limit
                );

                let response = self.http_client.get(&url).send().await?;

                if !response.status().is_success() {
                    return Err(AppError::ExternalApi(format!(
                        "Open Library returned status {} for subject {}",
                        response.status(),
                        slug
                    )));
                }

                let subject: SubjectResponse = response.json().await?;
                Ok(subject.works)
            }
        )
    }

    /// Full-text catalog search
    pub async fn search(&self, query: &str, limit: usize) -> AppResult<Vec<SearchDoc>> {
        cached!(
            self.cache,
            CacheKey::Search(query.to_string()),
            SEARCH_CACHE_TTL,
            async move {
                let url = format!("{}/search.json", self.api_url);
                let limit_param = limit.to_string();

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("q", query), ("limit", limit_param.as_str())])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(AppError::ExternalApi(format!(
                        "Open Library returned status {} for search",
                        response.status()
                    )));
                }

                let results: SearchResponse = response.json().await?;
                Ok(results.docs)
            }
        )
    }

    /// Builds a cover image URL from an Open Library cover id
    pub fn cover_url(&self, cover_id: i64) -> String {
        cover_url(&self.covers_url, cover_id)
    }
}

/// Catalog-backed provider for the resolver chain
///
/// Gateway failures degrade to a miss so the chain can report NotFound
/// only when the catalog was the sole remaining source.
pub struct CatalogBookProvider {
    gateway: Arc<OpenLibraryGateway>,
}

impl CatalogBookProvider {
    pub fn new(gateway: Arc<OpenLibraryGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait::async_trait]
impl BookProvider for CatalogBookProvider {
    async fn lookup(&self, book_key: &str) -> AppResult<Option<BookDetails>> {
        match self.gateway.lookup_book(book_key).await {
            Ok(details) => Ok(Some(details)),
            Err(e) => {
                tracing::warn!(book_key = %book_key, error = %e, "Catalog lookup failed");
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "catalog"
    }
}

// ============================================================================
// Open Library response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct WorkResponse {
    title: Option<String>,
    #[serde(default)]
    subjects: Vec<String>,
    description: Option<DescriptionField>,
    #[serde(default)]
    authors: Vec<WorkAuthorRef>,
    #[serde(default)]
    covers: Vec<i64>,
}

/// Work descriptions arrive either as a plain string or wrapped in a
/// `{type, value}` object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptionField {
    Text(String),
    Wrapped { value: String },
}

impl DescriptionField {
    fn into_value(self) -> String {
        match self {
            DescriptionField::Text(text) => text,
            DescriptionField::Wrapped { value } => value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkAuthorRef {
    author: Option<KeyRef>,
}

#[derive(Debug, Deserialize)]
struct KeyRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct AuthorResponse {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubjectResponse {
    #[serde(default)]
    works: Vec<SubjectWork>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectWork {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<SubjectAuthor>,
    pub cover_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectAuthor {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDoc {
    pub key: String,
    pub title: String,
    pub author_name: Option<Vec<String>>,
    pub cover_i: Option<i64>,
}

// ============================================================================
// Normalization
// ============================================================================

/// Lowercases a genre and collapses whitespace runs into underscores, the
/// form the subjects endpoint expects
pub fn subject_slug(genre: &str) -> String {
    genre
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Strips the `/works/` (or `/authors/`) prefix from an Open Library key
pub fn strip_key_prefix(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

fn cover_url(covers_base: &str, cover_id: i64) -> String {
    format!("{}/b/id/{}-M.jpg", covers_base, cover_id)
}

fn normalize_work(work: WorkResponse, covers_base: &str) -> WorkRecord {
    let genre: Vec<String> = work.subjects.into_iter().take(MAX_GENRES).collect();

    let author_key = work
        .authors
        .into_iter()
        .find_map(|entry| entry.author)
        .map(|author| strip_key_prefix(&author.key));

    WorkRecord {
        title: work.title.unwrap_or_else(|| "Untitled".to_string()),
        genre,
        description: work.description.map(DescriptionField::into_value),
        cover_img: work.covers.first().map(|id| cover_url(covers_base, *id)),
        author_key,
    }
}

fn subject_work_to_candidate(
    work: SubjectWork,
    genre: &str,
    covers_base: &str,
) -> RecommendedBook {
    let author = work
        .authors
        .into_iter()
        .find_map(|author| author.name)
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    RecommendedBook {
        book_key: strip_key_prefix(&work.key),
        title: work.title,
        author,
        cover_img: work.cover_id.map(|id| cover_url(covers_base, id)),
        genre: vec![genre.to_string()],
        description: None,
        source: BookSource::Api,
        avg_rating: None,
        review_count: 0,
        is_new: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COVERS: &str = "https://covers.openlibrary.org";

    #[test]
    fn test_subject_slug_lowercases_and_underscores() {
        assert_eq!(subject_slug("Science Fiction"), "science_fiction");
        assert_eq!(subject_slug("fantasy"), "fantasy");
        assert_eq!(subject_slug("  Historical   Romance "), "historical_romance");
    }

    #[test]
    fn test_strip_key_prefix() {
        assert_eq!(strip_key_prefix("/works/OL45883W"), "OL45883W");
        assert_eq!(strip_key_prefix("/authors/OL23919A"), "OL23919A");
        assert_eq!(strip_key_prefix("OL45883W"), "OL45883W");
    }

    #[test]
    fn test_normalize_work_plain_description() {
        let work: WorkResponse = serde_json::from_str(
            r#"{
                "title": "The Hobbit",
                "subjects": ["Fantasy", "Adventure", "Dragons", "Wizards", "Maps"],
                "description": "In a hole in the ground there lived a hobbit.",
                "authors": [{"author": {"key": "/authors/OL26320A"}}],
                "covers": [6549486, 14625765]
            }"#,
        )
        .unwrap();

        let record = normalize_work(work, COVERS);
        assert_eq!(record.title, "The Hobbit");
        assert_eq!(record.genre.len(), 4);
        assert_eq!(record.genre[0], "Fantasy");
        assert_eq!(
            record.description.as_deref(),
            Some("In a hole in the ground there lived a hobbit.")
        );
        assert_eq!(record.author_key.as_deref(), Some("OL26320A"));
        assert_eq!(
            record.cover_img.as_deref(),
            Some("https://covers.openlibrary.org/b/id/6549486-M.jpg")
        );
    }

    #[test]
    fn test_normalize_work_wrapped_description() {
        let work: WorkResponse = serde_json::from_str(
            r#"{
                "title": "Dune",
                "description": {"type": "/type/text", "value": "Arrakis, the desert planet."}
            }"#,
        )
        .unwrap();

        let record = normalize_work(work, COVERS);
        assert_eq!(
            record.description.as_deref(),
            Some("Arrakis, the desert planet.")
        );
        assert!(record.genre.is_empty());
        assert_eq!(record.author_key, None);
        assert_eq!(record.cover_img, None);
    }

    #[test]
    fn test_normalize_work_missing_title() {
        let work: WorkResponse = serde_json::from_str("{}").unwrap();
        let record = normalize_work(work, COVERS);
        assert_eq!(record.title, "Untitled");
        assert_eq!(record.description, None);
    }

    #[test]
    fn test_subject_work_to_candidate() {
        let work: SubjectWork = serde_json::from_str(
            r#"{
                "key": "/works/OL27448W",
                "title": "The Lord of the Rings",
                "authors": [{"name": "J. R. R. Tolkien"}],
                "cover_id": 9255566
            }"#,
        )
        .unwrap();

        let candidate = subject_work_to_candidate(work, "fantasy", COVERS);
        assert_eq!(candidate.book_key, "OL27448W");
        assert_eq!(candidate.author, "J. R. R. Tolkien");
        assert_eq!(candidate.genre, vec!["fantasy".to_string()]);
        assert_eq!(candidate.source, BookSource::Api);
        assert_eq!(candidate.review_count, 0);
        assert_eq!(candidate.avg_rating, None);
    }

    #[test]
    fn test_subject_work_missing_author_defaults() {
        let work: SubjectWork = serde_json::from_str(
            r#"{"key": "/works/OL1W", "title": "Anonymous Work"}"#,
        )
        .unwrap();

        let candidate = subject_work_to_candidate(work, "history", COVERS);
        assert_eq!(candidate.author, UNKNOWN_AUTHOR);
        assert_eq!(candidate.cover_img, None);
    }

    #[test]
    fn test_search_doc_deserialization() {
        let doc: SearchDoc = serde_json::from_str(
            r#"{
                "key": "/works/OL82563W",
                "title": "Harry Potter and the Philosopher's Stone",
                "author_name": ["J. K. Rowling"],
                "cover_i": 10521270
            }"#,
        )
        .unwrap();

        assert_eq!(doc.key, "/works/OL82563W");
        assert_eq!(doc.author_name.unwrap()[0], "J. K. Rowling");
        assert_eq!(doc.cover_i, Some(10521270));
    }
}
