use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database errors, split by the stage that failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached or rejected the credentials
    #[error("Database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    /// Creating the articles table failed
    #[error("Schema setup failed: {0}")]
    Schema(#[source] sqlx::Error),

    /// Generic database error
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

/// One row of `news_articles`.
///
/// `(title, publication_timestamp)` is the dedup key: a record whose key is
/// already stored is ignored, never merged into the existing row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleRecord {
    pub title: String,
    /// Feed-provided timestamp text; empty when the feed omits it.
    pub publication_timestamp: String,
    pub weblink: String,
    /// Raw image bytes, `None` when there was no image or the download failed.
    pub picture: Option<Vec<u8>>,
    pub tags: Vec<String>,
    /// Empty when the feed omits it.
    pub summary: String,
}

impl ArticleRecord {
    /// The `(title, publication_timestamp)` pair that identifies the article.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.title, &self.publication_timestamp)
    }
}
