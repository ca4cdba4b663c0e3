use thiserror::Error;
use url::Url;

/// Errors produced when a URL taken from feed content cannot be requested.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host to connect to.
    #[error("URL has no host")]
    MissingHost,
}

/// Parses a URL found in feed content and checks that it can be fetched
/// over HTTP.
///
/// Feed items are untrusted input: `file://`, `data:` and similar schemes
/// are rejected before any request is built.
///
/// # Examples
///
/// ```
/// use feed_collector::util::validate_http_url;
///
/// let url = validate_http_url("https://img.example.com/a.png").unwrap();
/// assert_eq!(url.host_str(), Some("img.example.com"));
///
/// assert!(validate_http_url("file:///etc/passwd").is_err());
/// assert!(validate_http_url("not a url").is_err());
/// ```
pub fn validate_http_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_http_url("https://example.com/image.jpg").is_ok());
        assert!(validate_http_url("http://127.0.0.1:8080/1.png").is_ok());
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let url = validate_http_url("  https://example.com/a.png\n").unwrap();
        assert_eq!(url.path(), "/a.png");
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_http_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_http_url("ftp://example.com/a.png").is_err());
        assert!(validate_http_url("data:image/png;base64,AAAA").is_err());
    }

    #[test]
    fn test_relative_url_rejected() {
        assert!(matches!(
            validate_http_url("/images/a.png"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
