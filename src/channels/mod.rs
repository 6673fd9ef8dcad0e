//! Social platform access
//!
//! Defines the operations the bot needs from a Mastodon-compatible server
//! and the entities it reads back. [`mastodon::MastodonClient`] is the HTTP
//! implementation; tests substitute in-memory fakes of [`SocialClient`].

pub mod mastodon;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::media::DownloadedImage;

pub use mastodon::MastodonClient;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur in channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Status identifier.
///
/// Mastodon ids are decimal snowflakes serialized as strings; ordering
/// compares length first and then the digits, so `"99" < "100"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(String);

impl StatusId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for StatusId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for StatusId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for StatusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media attachment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub acct: String,
}

/// A published status (toot).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Status {
    pub id: StatusId,
    #[serde(default)]
    pub uri: String,
    /// HTML body as rendered by the server.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default)]
    pub media_attachments: Vec<MediaAttachment>,
}

/// A media object attached to a status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaAttachment {
    pub id: MediaId,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    /// Alt text; `null` on the wire reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl MediaAttachment {
    /// An image that has no description yet.
    pub fn needs_description(&self) -> bool {
        self.kind == MediaKind::Image && self.description.is_empty()
    }
}

/// Kind of media attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Gifv,
    Audio,
    #[serde(other)]
    Unknown,
}

/// Filters for listing an account's statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusQuery {
    /// Only return statuses immediately newer than this id.
    ///
    /// Unlike `since_id`, the page starts right after the id instead of at
    /// the newest status, so consecutive pages never leave a gap.
    pub min_id: Option<StatusId>,
    /// Maximum number of statuses to return.
    pub limit: Option<u32>,
}

impl StatusQuery {
    pub fn latest(limit: u32) -> Self {
        Self {
            min_id: None,
            limit: Some(limit),
        }
    }

    pub fn after(id: StatusId, limit: u32) -> Self {
        Self {
            min_id: Some(id),
            limit: Some(limit),
        }
    }
}

/// Replacement content for an existing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: String,
    pub media_ids: Vec<MediaId>,
}

/// Operations the bot needs from the social platform.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Resolve the account that owns the access token.
    async fn verify_credentials(&self) -> ChannelResult<Account>;

    /// List an account's statuses, newest first.
    async fn account_statuses(
        &self,
        account: &AccountId,
        query: &StatusQuery,
    ) -> ChannelResult<Vec<Status>>;

    /// Upload an image with alt text and return the new media id.
    async fn upload_media(
        &self,
        image: &DownloadedImage,
        description: &str,
    ) -> ChannelResult<MediaId>;

    /// Replace the text and media of an existing status.
    async fn update_status(&self, id: &StatusId, update: &StatusUpdate) -> ChannelResult<()>;
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
