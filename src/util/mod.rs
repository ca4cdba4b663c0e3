//! Utility functions shared by the feed and image fetchers.

mod url_validator;

pub use url_validator::{validate_http_url, UrlValidationError};
