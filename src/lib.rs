//! Polls a single RSS/Atom feed and stores new articles, with their lead
//! image, in PostgreSQL.
//!
//! Articles are deduplicated on `(title, publication_timestamp)` with
//! insert-or-ignore semantics: the first pass that sees an article stores
//! it, later passes leave the row untouched.

pub mod collector;
pub mod config;
pub mod feed;
pub mod storage;
pub mod util;

pub use collector::{Collector, PassError, PassReport};
pub use config::{Config, ConfigError, DatabaseConfig, FieldPaths};
