//! Feed retrieval and entry normalization.
//!
//! - [`fetcher`] - HTTP retrieval of the feed document with a size limit
//! - [`parser`] - `feed-rs` model to key/value entry mappings
//! - [`image`] - Lead image download for a single entry
//! - [`normalizer`] - Entry mapping to [`ArticleRecord`](crate::storage::ArticleRecord)
//!
//! # Example
//!
//! ```ignore
//! use feed_collector::feed::{fetch_entries, normalize};
//!
//! for entry in fetch_entries(&client, &config.feed_url).await? {
//!     let record = normalize(&entry, &config.fields, &client).await;
//! }
//! ```

mod fetcher;
mod image;
mod normalizer;
mod parser;

pub use fetcher::{build_http_client, fetch_entries, FetchError};
pub use image::fetch_image;
pub use normalizer::{extract, flatten_tags, normalize, ExtractedEntry};
pub use parser::{parse_entries, Entry};
