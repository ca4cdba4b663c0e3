use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::sync::atomic::{AtomicBool, Ordering};

use super::articles::PgSession;
use super::store::ArticleStore;
use super::types::StoreError;
use crate::config::DatabaseConfig;

// ============================================================================
// Schema
// ============================================================================

/// `news_articles` with the dedup key enforced by a unique constraint, so
/// `ON CONFLICT DO NOTHING` is atomic.
const CREATE_ARTICLES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS news_articles (
        title TEXT NOT NULL,
        publication_timestamp TEXT NOT NULL DEFAULT '',
        weblink TEXT NOT NULL DEFAULT '',
        picture BYTEA,
        tags TEXT[] NOT NULL DEFAULT '{}',
        summary TEXT,
        UNIQUE (title, publication_timestamp)
    )
"#;

// ============================================================================
// PostgreSQL Store
// ============================================================================

/// PostgreSQL-backed article store.
///
/// Opens a dedicated connection for every pass instead of holding a pool;
/// the collector polls every few minutes and needs one connection at a time.
pub struct PgStore {
    options: PgConnectOptions,
    schema_ready: AtomicBool,
}

impl PgStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(config.password.expose_secret())
            .database(&config.name);
        Self::with_options(options)
    }

    pub fn with_options(options: PgConnectOptions) -> Self {
        Self {
            options,
            schema_ready: AtomicBool::new(false),
        }
    }

    /// Create the articles table if it does not exist yet.
    ///
    /// Idempotent; runs on the first successful connection and again on
    /// later connections until it succeeds once.
    async fn ensure_schema(&self, conn: &mut PgConnection) -> Result<(), StoreError> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        sqlx::query(CREATE_ARTICLES_TABLE)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::Schema)?;

        self.schema_ready.store(true, Ordering::Release);
        tracing::debug!("Articles table ready");
        Ok(())
    }
}

impl ArticleStore for PgStore {
    type Session = PgSession;

    async fn connect(&self) -> Result<PgSession, StoreError> {
        let mut conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(StoreError::Connect)?;
        tracing::info!(
            host = %self.options.get_host(),
            database = ?self.options.get_database(),
            "Database connection successful"
        );

        if let Err(e) = self.ensure_schema(&mut conn).await {
            if let Err(close_err) = conn.close().await {
                tracing::warn!(error = %close_err, "Failed to close database connection cleanly");
            }
            return Err(e);
        }

        Ok(PgSession::new(conn))
    }
}
