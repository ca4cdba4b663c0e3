use sqlx::postgres::PgConnection;
use sqlx::Connection;

use super::store::ArticleSession;
use super::types::{ArticleRecord, StoreError};

/// A single PostgreSQL connection used for the length of one pass.
pub struct PgSession {
    conn: PgConnection,
}

impl PgSession {
    pub(crate) fn new(conn: PgConnection) -> Self {
        Self { conn }
    }
}

impl ArticleSession for PgSession {
    /// Insert-or-ignore on the dedup key.
    ///
    /// Runs outside an explicit transaction, so PostgreSQL commits each
    /// statement as soon as it completes and a later failure in the same pass
    /// cannot undo it.
    async fn insert_if_absent(&mut self, article: &ArticleRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO news_articles (title, publication_timestamp, weblink, picture, tags, summary)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (title, publication_timestamp) DO NOTHING
        "#,
        )
        .bind(&article.title)
        .bind(&article.publication_timestamp)
        .bind(&article.weblink)
        .bind(article.picture.as_deref())
        .bind(&article.tags)
        .bind(&article.summary)
        .execute(&mut self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn close(self) {
        if let Err(e) = self.conn.close().await {
            tracing::warn!(error = %e, "Failed to close database connection cleanly");
        }
    }
}
