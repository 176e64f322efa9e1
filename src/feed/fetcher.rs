use crate::config::Config;
use crate::feed::episode::EntryDefect;
use crate::feed::parser::{parse_channel, parse_entries, RawChannel, RawEntry};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default cap on a feed document's size (10MB)
pub const DEFAULT_MAX_FEED_SIZE: usize = 10 * 1024 * 1024;

/// Broad failure classes of feed ingestion.
///
/// Callers that only need to tell the failure kinds apart (e.g. to choose a
/// user-facing message) match on this instead of the detailed [`FeedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// The document could not be retrieved
    FeedUnavailable,
    /// The document was retrieved but is not a usable feed
    MalformedFeed,
    /// One entry of an otherwise valid feed could not be normalized
    MalformedEntry,
}

/// Errors that can occur while fetching a feed or deriving its episodes.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Local feed file could not be read
    #[error("Failed to read feed file: {0}")]
    Io(#[from] std::io::Error),
    /// Retrieval exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Document exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Content could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Channel lacks a required field
    #[error("Feed has no channel {0}")]
    MissingChannelField(&'static str),
    /// An entry could not be normalized and the batch was aborted
    #[error("Malformed entry at position {index}: {defect}")]
    MalformedEntry { index: usize, defect: EntryDefect },
}

impl FeedError {
    pub fn kind(&self) -> FeedErrorKind {
        match self {
            FeedError::Network(_)
            | FeedError::HttpStatus(_)
            | FeedError::Io(_)
            | FeedError::Timeout
            | FeedError::ResponseTooLarge
            | FeedError::IncompleteResponse { .. } => FeedErrorKind::FeedUnavailable,
            FeedError::Parse(_) | FeedError::MissingChannelField(_) => FeedErrorKind::MalformedFeed,
            FeedError::MalformedEntry { .. } => FeedErrorKind::MalformedEntry,
        }
    }
}

/// Retrieves feed documents and parses them into [`RawChannel`]s.
///
/// `http(s)` URLs go through the wrapped [`reqwest::Client`]. `file://` URLs
/// and strings that do not parse as a URL are read from the local filesystem.
/// Each call performs exactly one retrieval: there is no retry and no cache.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Option<Duration>,
    max_bytes: usize,
}

impl FeedFetcher {
    /// Creates a fetcher with no timeout and the default size limit.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
            max_bytes: DEFAULT_MAX_FEED_SIZE,
        }
    }

    /// Builds a client and fetcher from the user's configuration.
    pub fn from_config(config: &Config) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self::new(client)
            .with_timeout(config.fetch_timeout())
            .with_max_bytes(config.max_feed_bytes))
    }

    /// Bounds each fetch by `timeout`; `None` blocks until retrieval finishes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Fetches `url` and parses it into a [`RawChannel`].
    ///
    /// # Errors
    ///
    /// - [`FeedErrorKind::FeedUnavailable`] - transport, HTTP status, I/O,
    ///   timeout or size failures
    /// - [`FeedErrorKind::MalformedFeed`] - unparsable content, or a channel
    ///   without title or summary
    pub async fn fetch(&self, url: &str) -> Result<RawChannel, FeedError> {
        let bytes = self.fetch_bytes(url).await?;
        let channel = parse_channel(&bytes)?;
        tracing::debug!(
            url = %url,
            entries = channel.entries.len(),
            "Parsed feed"
        );
        Ok(channel)
    }

    /// Fetches `url` and parses only its entries.
    ///
    /// Unlike [`FeedFetcher::fetch`], a channel without title or summary is
    /// accepted; only unparsable content is [`FeedErrorKind::MalformedFeed`].
    pub async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>, FeedError> {
        let bytes = self.fetch_bytes(url).await?;
        let entries = parse_entries(&bytes)?;
        tracing::debug!(url = %url, entries = entries.len(), "Parsed feed entries");
        Ok(entries)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        tracing::debug!(url = %url, "Fetching feed");

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.retrieve(url))
                .await
                .map_err(|_| FeedError::Timeout)?,
            None => self.retrieve(url).await,
        }
    }

    async fn retrieve(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "file" => {
                let path = parsed.to_file_path().map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("not a local file path: {url}"),
                    )
                })?;
                read_local_file(&path, self.max_bytes).await
            }
            Ok(_) => self.download(url).await,
            Err(_) => read_local_file(Path::new(url), self.max_bytes).await,
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_bytes).await
    }
}

async fn read_local_file(path: &Path, limit: usize) -> Result<Vec<u8>, FeedError> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > limit as u64 {
        return Err(FeedError::ResponseTooLarge);
    }
    Ok(tokio::fs::read(path).await?)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FeedError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FeedError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FeedError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
