//! Environment-driven configuration for the collector.
//!
//! Every option has a default, so an empty environment yields a usable
//! configuration. The only validation is numeric coercion of the poll
//! interval, startup delay and database port.
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable could not be coerced to the required range.
    #[error("Invalid value for {var}: {value:?} ({expected})")]
    InvalidNumber {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ============================================================================
// Defaults
// ============================================================================

const DEFAULT_DB_NAME: &str = "news_db";
const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_DB_PASSWORD: &str = "postgres";
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_FEED_URL: &str = "https://www.thehindu.com/feeder/default.rss";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;
/// Gives a database container time to come up before the first pass.
const DEFAULT_STARTUP_DELAY_SECS: u64 = 10;

// ============================================================================
// Configuration Structs
// ============================================================================

/// PostgreSQL connection settings.
///
/// The password is held as a [`SecretString`] so it never appears in
/// `Debug` output or log lines.
#[derive(Debug)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    pub password: SecretString,
    pub host: String,
    pub port: u16,
}

/// Entry keys used to pull each article field out of a parsed feed item.
///
/// These are runtime strings rather than fixed struct fields so a feed with
/// unusual element names can be mapped without a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPaths {
    pub title: String,
    pub timestamp: String,
    pub weblink: String,
    /// Key of the media list; its first element carries the image URL.
    pub image: String,
    /// Key of the URL inside the first media element.
    pub image_url: String,
    pub summary: String,
}

impl Default for FieldPaths {
    fn default() -> Self {
        Self {
            title: "title".to_string(),
            timestamp: "published".to_string(),
            weblink: "link".to_string(),
            image: "media_content".to_string(),
            image_url: "url".to_string(),
            summary: "summary".to_string(),
        }
    }
}

/// Top-level collector configuration, built once at process start.
#[derive(Debug)]
pub struct Config {
    pub database: DatabaseConfig,
    pub feed_url: String,
    pub fields: FieldPaths,
    /// Sleep between the end of one pass and the start of the next.
    pub poll_interval: Duration,
    /// Sleep before the very first pass.
    pub startup_delay: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Values are trimmed and an empty value is treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = match get("POSTGRES_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
                var: "POSTGRES_PORT",
                value: raw,
                expected: "a port number",
            })?,
            None => DEFAULT_DB_PORT,
        };

        let poll_interval_secs = match get("POLL_INTERVAL") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "POLL_INTERVAL",
                        value: raw,
                        expected: "a positive number of seconds",
                    })
                }
            },
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        let startup_delay_secs = match get("STARTUP_DELAY") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                var: "STARTUP_DELAY",
                value: raw,
                expected: "a non-negative number of seconds",
            })?,
            None => DEFAULT_STARTUP_DELAY_SECS,
        };

        let defaults = FieldPaths::default();
        let config = Self {
            database: DatabaseConfig {
                name: text("POSTGRES_DB", DEFAULT_DB_NAME),
                user: text("POSTGRES_USER", DEFAULT_DB_USER),
                password: SecretString::from(text("POSTGRES_PASSWORD", DEFAULT_DB_PASSWORD)),
                host: text("POSTGRES_HOST", DEFAULT_DB_HOST),
                port,
            },
            feed_url: text("RSS_FEED_URL", DEFAULT_FEED_URL),
            fields: FieldPaths {
                title: text("TITLE_PATH", &defaults.title),
                timestamp: text("TIMESTAMP_PATH", &defaults.timestamp),
                weblink: text("WEBLINK_PATH", &defaults.weblink),
                image: text("IMAGE_PATH", &defaults.image),
                image_url: text("IMAGE_URL_PATH", &defaults.image_url),
                summary: text("SUMMARY_PATH", &defaults.summary),
            },
            poll_interval: Duration::from_secs(poll_interval_secs),
            startup_delay: Duration::from_secs(startup_delay_secs),
        };

        tracing::debug!(
            feed_url = %config.feed_url,
            db_host = %config.database.host,
            db_port = config.database.port,
            db_name = %config.database.name,
            poll_interval_secs = poll_interval_secs,
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
