use std::future::Future;

use super::types::{ArticleRecord, StoreError};

/// A persistence backend that hands out one session per collector pass.
pub trait ArticleStore: Send + Sync {
    type Session: ArticleSession;

    /// Opens a session for a single pass.
    ///
    /// Sessions are never reused across passes.
    fn connect(&self) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;
}

/// An open session against the article table.
pub trait ArticleSession: Send {
    /// Inserts `article` unless a row with the same
    /// `(title, publication_timestamp)` exists.
    ///
    /// Returns `true` when a row was created and `false` when the article
    /// was already stored. Each insert is committed on its own.
    fn insert_if_absent(
        &mut self,
        article: &ArticleRecord,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Releases the session.
    fn close(self) -> impl Future<Output = ()> + Send;
}
