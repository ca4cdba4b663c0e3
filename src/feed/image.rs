use crate::feed::fetcher::read_limited_bytes;
use crate::util::validate_http_url;
use reqwest::StatusCode;

const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Downloads the image at `url` and returns its raw bytes.
///
/// Returns `None` without a request when the URL is empty, and `None` after
/// logging when the URL is unusable, the request fails, the server answers
/// with anything other than 200, or the body exceeds 10MB. No retries and no
/// timeout beyond the client defaults.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
    if url.trim().is_empty() {
        return None;
    }

    let parsed = match validate_http_url(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Skipping image with unusable URL");
            return None;
        }
    };

    let response = match client.get(parsed).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Failed to fetch image");
            return None;
        }
    };

    if response.status() != StatusCode::OK {
        tracing::error!(
            url = %url,
            status = response.status().as_u16(),
            "Failed to fetch image, unexpected HTTP status"
        );
        return None;
    }

    match read_limited_bytes(response, MAX_IMAGE_SIZE).await {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Failed to read image body");
            None
        }
    }
}
