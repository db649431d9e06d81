use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Response bodies larger than this are abandoned (10MB).
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Errors from a single outbound GET.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connection, TLS or redirect-policy failure
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request plus body read exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Body exceeded [`MAX_BODY_SIZE`]
    #[error("Response too large")]
    ResponseTooLarge,
}

/// GETs `url` and returns the body, bounded by `timeout` and [`MAX_BODY_SIZE`].
///
/// The timeout covers the whole exchange, headers and body. There is no
/// retry: the next poll cycle is the retry.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    tokio::time::timeout(timeout, async {
        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_BODY_SIZE).await
    })
    .await
    .map_err(|_| FetchError::Timeout)?
}

/// [`fetch_bytes`], decoded as UTF-8 with invalid sequences replaced.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    let bytes = fetch_bytes(client, url, timeout).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
