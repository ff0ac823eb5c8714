use reqwest::header::ACCEPT;
use std::time::Duration;
use thiserror::Error;

/// Client label sent with every feed request
const CLIENT_LABEL: &str = concat!("graze/", env!("CARGO_PKG_VERSION"));

/// Per-request deadline covering both the response and its body
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while retrieving a feed document.
///
/// Each variant tags its cause at the point of failure; the ingestion cycle
/// uses the tag to classify its log line. There is no retry here — a failed
/// feed simply waits for the scheduler's next turn.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second deadline
    #[error("Request timed out")]
    Timeout,
}

/// Build the HTTP client shared by all fetches.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(CLIENT_LABEL)
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Retrieve the raw feed document at `url`.
///
/// Issues a single GET with an `application/xml` accept header. Any non-2xx
/// status, network error, or deadline overrun comes back as a tagged
/// [`FetchError`]; nothing is thrown past this boundary.
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let response = tokio::time::timeout(
        FETCH_TIMEOUT,
        client.get(url).header(ACCEPT, "application/xml").send(),
    )
    .await
    .map_err(|_| FetchError::Timeout)?
    .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    // The body read shares the deadline so a stalled server cannot hold a
    // cycle open indefinitely.
    let body = tokio::time::timeout(FETCH_TIMEOUT, response.text())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    Ok(body)
}
