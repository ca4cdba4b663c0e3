//! The poll loop: one fetch-normalize-persist pass per interval, forever.
//!
//! A pass opens a store session, fetches the feed, normalizes and inserts
//! each entry in document order, and closes the session on every exit path.
//! Pass failures are logged and absorbed; only the shutdown future ends the
//! loop.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::Config;
use crate::feed::{fetch_entries, normalize};
use crate::storage::{ArticleSession, ArticleStore, StoreError};

/// Why a pass stopped early.
#[derive(Debug, Error)]
pub enum PassError {
    /// No session could be opened; nothing was fetched or stored.
    #[error("Database unavailable: {0}")]
    Connect(#[source] StoreError),
    /// An insert failed. Rows inserted earlier in the pass stay committed and
    /// the remaining entries are left for the next pass.
    #[error("Failed to store article {title:?} after {inserted} new rows: {source}")]
    Insert {
        title: String,
        inserted: usize,
        #[source]
        source: StoreError,
    },
}

/// Counters for one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Entries in the fetched feed.
    pub entries: usize,
    /// Rows created.
    pub inserted: usize,
    /// Entries whose dedup key was already stored.
    pub duplicates: usize,
    /// Entries stored without a picture.
    pub without_picture: usize,
    /// The feed could not be fetched or parsed and was treated as empty.
    pub feed_unavailable: bool,
}

pub struct Collector<S> {
    config: Config,
    client: reqwest::Client,
    store: S,
}

impl<S: ArticleStore> Collector<S> {
    pub fn new(config: Config, client: reqwest::Client, store: S) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    /// Runs one fetch-normalize-persist pass.
    ///
    /// # Errors
    ///
    /// - [`PassError::Connect`] - The store could not open a session
    /// - [`PassError::Insert`] - An insert failed; the pass stops there
    ///
    /// A feed that cannot be fetched or parsed is not an error: the pass
    /// reports zero entries with `feed_unavailable` set.
    pub async fn run_pass(&self) -> Result<PassReport, PassError> {
        let mut session = self.store.connect().await.map_err(PassError::Connect)?;
        let result = self.process_feed(&mut session).await;
        session.close().await;
        result
    }

    async fn process_feed(&self, session: &mut S::Session) -> Result<PassReport, PassError> {
        let mut report = PassReport::default();

        let entries = match fetch_entries(&self.client, &self.config.feed_url).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    feed = %self.config.feed_url,
                    error = %e,
                    "Feed unavailable, processing zero entries this pass"
                );
                report.feed_unavailable = true;
                return Ok(report);
            }
        };
        report.entries = entries.len();

        for entry in &entries {
            let record = normalize(entry, &self.config.fields, &self.client).await;

            match session.insert_if_absent(&record).await {
                Ok(true) => {
                    report.inserted += 1;
                    if record.picture.is_none() {
                        report.without_picture += 1;
                    }
                }
                Ok(false) => {
                    report.duplicates += 1;
                    tracing::debug!(
                        title = %record.title,
                        published = %record.publication_timestamp,
                        "Article already stored"
                    );
                }
                Err(source) => {
                    return Err(PassError::Insert {
                        title: record.title,
                        inserted: report.inserted,
                        source,
                    })
                }
            }
        }

        Ok(report)
    }

    /// Polls until `shutdown` resolves.
    ///
    /// Waits the startup delay, then alternates passes and poll-interval
    /// sleeps. `shutdown` is raced against every wait and every pass; an
    /// interrupted pass drops its session, keeping rows already committed.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if !self.config.startup_delay.is_zero() {
            tracing::info!(
                delay_secs = self.config.startup_delay.as_secs(),
                "Waiting before first poll"
            );
            if !sleep_unless(self.config.startup_delay, shutdown.as_mut()).await {
                tracing::info!("Shutdown requested, stopping collector");
                return;
            }
        }

        loop {
            tracing::info!(feed = %self.config.feed_url, "Fetching RSS feed");
            let started = Instant::now();

            tokio::select! {
                biased;
                _ = shutdown.as_mut() => {
                    tracing::info!("Shutdown requested during pass, stopping collector");
                    return;
                }
                result = self.run_pass() => log_pass(result, started.elapsed()),
            }

            tracing::info!(
                secs = self.config.poll_interval.as_secs(),
                "Sleeping until next poll"
            );
            if !sleep_unless(self.config.poll_interval, shutdown.as_mut()).await {
                tracing::info!("Shutdown requested, stopping collector");
                return;
            }
        }
    }
}

/// Sleeps for `duration`; returns `false` if `shutdown` resolved first.
async fn sleep_unless<F>(duration: Duration, shutdown: Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = shutdown => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn log_pass(result: Result<PassReport, PassError>, elapsed: Duration) {
    match result {
        Ok(report) => tracing::info!(
            entries = report.entries,
            inserted = report.inserted,
            duplicates = report.duplicates,
            without_picture = report.without_picture,
            feed_unavailable = report.feed_unavailable,
            elapsed_ms = elapsed.as_millis() as u64,
            "Feed pass complete"
        ),
        Err(e @ PassError::Connect(_)) => tracing::error!(
            error = %e,
            "Skipping feed processing due to database connection failure"
        ),
        Err(e) => tracing::error!(
            error = %e,
            elapsed_ms = elapsed.as_millis() as u64,
            "Feed pass aborted"
        ),
    }
}
