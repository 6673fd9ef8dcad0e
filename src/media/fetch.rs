//! Remote media download into scoped temporary files.
//!
//! [`MediaFetcher::download`] writes the response body into a
//! [`tempfile::NamedTempFile`] and hands back a [`DownloadedImage`] guard.
//! The file lives exactly as long as the guard: dropping it removes the file
//! whether the caller finished normally, returned early or bailed out with
//! an error.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while downloading media.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of image content for the elaborator.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Download `url` into a temporary file owned by the returned guard.
    async fn download(&self, url: &str) -> Result<DownloadedImage, FetchError>;
}

/// A downloaded image backed by a temporary file.
///
/// The file is deleted when the guard is dropped.
#[derive(Debug)]
pub struct DownloadedImage {
    file: NamedTempFile,
    content_type: Option<String>,
    file_name: String,
}

impl DownloadedImage {
    /// Write `bytes` to a fresh temporary file.
    pub fn from_bytes(
        bytes: &[u8],
        content_type: Option<String>,
        file_name: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let mut file = tempfile::Builder::new().prefix("alttoot-").tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self {
            file,
            content_type,
            file_name: file_name.into(),
        })
    }

    /// Local path of the downloaded content.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// MIME type reported by the remote server, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// File name derived from the remote URL, used when re-uploading.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Read the whole file back into memory.
    pub async fn read(&self) -> Result<Vec<u8>, FetchError> {
        Ok(tokio::fs::read(self.path()).await?)
    }
}

impl Drop for DownloadedImage {
    fn drop(&mut self) {
        tracing::debug!(path = %self.file.path().display(), "Removing downloaded image");
    }
}

/// HTTP media downloader.
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
}

impl MediaFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for MediaFetcher {
    async fn download(&self, url: &str) -> Result<DownloadedImage, FetchError> {
        let parsed = parse_media_url(url)?;
        tracing::debug!(url = %parsed, "Downloading image");

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(format!("failed to read body: {e}")))?;

        DownloadedImage::from_bytes(&bytes, content_type, file_name_from_url(&parsed))
    }
}

fn parse_media_url(raw: &str) -> Result<url::Url, FetchError> {
    let parsed =
        url::Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl(format!(
            "unsupported scheme \"{other}\" in {raw}"
        ))),
    }
}

/// Last path segment of the URL, or a generic fallback.
fn file_name_from_url(url: &url::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .unwrap_or_else(|| "image".to_string())
}
