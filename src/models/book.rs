use serde::{Deserialize, Serialize};

/// Which catalog a book identity belongs to.
///
/// `book_key` is only unique within a source; the `(book_key, source)` pair
/// is the global identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookSource {
    /// Open Library (or its lazily cached snapshot)
    Api,
    /// Admin-curated custom book
    Custom,
}

impl std::fmt::Display for BookSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookSource::Api => write!(f, "api"),
            BookSource::Custom => write!(f, "custom"),
        }
    }
}

/// Normalized book metadata, regardless of which source resolved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookDetails {
    pub book_key: String,
    pub title: String,
    pub author: String,
    pub cover_img: Option<String>,
    /// At most four genre tags
    pub genre: Vec<String>,
    pub description: Option<String>,
    pub source: BookSource,
}

/// Admin-curated catalog entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomBook {
    pub id: i64,
    pub book_key: String,
    pub title: String,
    pub author: String,
    pub cover_img: Option<String>,
    pub genre: Vec<String>,
    pub description: Option<String>,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A recommendation candidate annotated with review aggregates.
///
/// Rows selected from the book tables carry `avg_rating` / `review_count`
/// from the join; candidates fetched from the catalog API start at
/// `None` / `0`. `is_new` is computed after annotation, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecommendedBook {
    pub book_key: String,
    pub title: String,
    pub author: String,
    pub cover_img: Option<String>,
    pub genre: Vec<String>,
    pub description: Option<String>,
    pub source: BookSource,
    pub avg_rating: Option<f64>,
    pub review_count: i64,
    #[sqlx(default)]
    #[serde(default)]
    pub is_new: bool,
}

/// Dashboard recommendation payload
#[derive(Debug, Serialize)]
pub struct DashboardBooks {
    pub featured_book: Option<RecommendedBook>,
    pub recommended_books: Vec<RecommendedBook>,
    pub used_fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&BookSource::Api).unwrap(), "\"api\"");
        assert_eq!(
            serde_json::to_string(&BookSource::Custom).unwrap(),
            "\"custom\""
        );
    }

    #[test]
    fn test_book_source_display() {
        assert_eq!(BookSource::Api.to_string(), "api");
        assert_eq!(BookSource::Custom.to_string(), "custom");
    }
}
