use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Default limit on a single feed request
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving the feed.
///
/// Every variant is transient: the poll loop logs it, skips the rest of the
/// cycle and tries again after its normal sleep.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request or body read exceeded the fetch timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

impl FetchError {
    /// Returns true if the failure should be retried on the next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_)
            | FetchError::HttpStatus(_)
            | FetchError::Timeout
            | FetchError::ResponseTooLarge => true,
        }
    }
}

/// Source of raw feed text for one cycle.
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// Fetches the configured feed address over HTTP.
pub struct FeedFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedSource for FeedFetcher {
    /// Issue one GET and return the body as text.
    ///
    /// The timeout covers both the response headers and the body read.
    /// Invalid UTF-8 is replaced rather than rejected; the line scanner only
    /// looks for ASCII markers.
    async fn fetch(&self) -> Result<String, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, async {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(classify)?;

            if !response.status().is_success() {
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            read_limited_bytes(response, MAX_FEED_SIZE).await
        })
        .await
        .map_err(|_| FetchError::Timeout)??;

        tracing::debug!(feed = %self.url, bytes = bytes.len(), "Fetched feed");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
