//! Mastodon Channel
//!
//! REST client for the handful of Mastodon endpoints the bot uses:
//!
//! - `GET /api/v1/accounts/verify_credentials`
//! - `GET /api/v1/accounts/:id/statuses`
//! - `POST /api/v2/media`
//! - `PUT /api/v1/statuses/:id`

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{
    Account, AccountId, ChannelError, ChannelResult, MediaId, SocialClient, Status, StatusId,
    StatusQuery, StatusUpdate,
};
use crate::config::MastodonConfig;
use crate::media::DownloadedImage;

/// Mastodon REST client authenticated with a user access token.
#[derive(Debug, Clone)]
pub struct MastodonClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(serde::Deserialize)]
struct UploadedMedia {
    id: MediaId,
}

impl MastodonClient {
    /// Create a client for the configured instance.
    pub fn new(config: &MastodonConfig) -> ChannelResult<Self> {
        let parsed = url::Url::parse(&config.instance_url).map_err(|e| {
            ChannelError::InvalidConfig(format!(
                "invalid instance URL \"{}\": {e}",
                config.instance_url
            ))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ChannelError::InvalidConfig(format!(
                "instance URL must use http or https scheme, got \"{}\"",
                parsed.scheme()
            )));
        }
        if config.access_token.trim().is_empty() {
            return Err(ChannelError::InvalidConfig(
                "access token is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(concat!("alttoot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChannelError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.instance_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// Returns the instance base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode a JSON body from a successful response.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ChannelResult<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ChannelError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(ChannelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ChannelError::Parse(e.to_string()))
    }
}

/// Query string pairs for the account statuses endpoint.
fn statuses_query(query: &StatusQuery) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(ref min_id) = query.min_id {
        pairs.push(("min_id", min_id.as_str().to_string()));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit", limit.to_string()));
    }
    pairs
}

#[async_trait]
impl SocialClient for MastodonClient {
    async fn verify_credentials(&self) -> ChannelResult<Account> {
        let url = self.endpoint("/api/v1/accounts/verify_credentials");
        self.send_json(self.client.get(url)).await
    }

    async fn account_statuses(
        &self,
        account: &AccountId,
        query: &StatusQuery,
    ) -> ChannelResult<Vec<Status>> {
        let url = self.endpoint(&format!("/api/v1/accounts/{account}/statuses"));
        let statuses: Vec<Status> = self
            .send_json(self.client.get(url).query(&statuses_query(query)))
            .await?;
        tracing::debug!(account = %account, count = statuses.len(), "Fetched statuses");
        Ok(statuses)
    }

    async fn upload_media(
        &self,
        image: &DownloadedImage,
        description: &str,
    ) -> ChannelResult<MediaId> {
        let bytes = image
            .read()
            .await
            .map_err(|e| ChannelError::Io(e.to_string()))?;

        let mut part = reqwest::multipart::Part::bytes(bytes).file_name(image.file_name().to_string());
        if let Some(mime) = image.content_type() {
            part = part
                .mime_str(mime)
                .map_err(|e| ChannelError::Request(format!("failed to build form part: {e}")))?;
        }

        let form = reqwest::multipart::Form::new()
            .text("description", description.to_string())
            .part("file", part);

        let uploaded: UploadedMedia = self
            .send_json(self.client.post(self.endpoint("/api/v2/media")).multipart(form))
            .await?;
        tracing::debug!(media_id = %uploaded.id, "Uploaded media");
        Ok(uploaded.id)
    }

    async fn update_status(&self, id: &StatusId, update: &StatusUpdate) -> ChannelResult<()> {
        let url = self.endpoint(&format!("/api/v1/statuses/{id}"));
        let _: serde_json::Value = self.send_json(self.client.put(url).json(update)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, token: &str) -> MastodonConfig {
        MastodonConfig {
            instance_url: url.to_string(),
            client_id: None,
            client_secret: None,
            access_token: token.to_string(),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = MastodonClient::new(&config("https://mastodon.example/", "t")).unwrap();
        assert_eq!(client.base_url(), "https://mastodon.example");
        assert_eq!(
            client.endpoint("/api/v2/media"),
            "https://mastodon.example/api/v2/media"
        );
    }

    #[test]
    fn test_rejects_missing_token() {
        let result = MastodonClient::new(&config("https://mastodon.example", ""));
        assert!(matches!(result, Err(ChannelError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let result = MastodonClient::new(&config("ws://mastodon.example", "t"));
        assert!(matches!(result, Err(ChannelError::InvalidConfig(_))));
    }

    #[test]
    fn test_statuses_query_pairs() {
        assert!(statuses_query(&StatusQuery::default()).is_empty());
        assert_eq!(
            statuses_query(&StatusQuery::latest(10)),
            vec![("limit", "10".to_string())]
        );
        assert_eq!(
            statuses_query(&StatusQuery::after(StatusId::new("123"), 40)),
            vec![("min_id", "123".to_string()), ("limit", "40".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unreachable_instance_is_request_error() {
        let client = MastodonClient::new(&config("http://127.0.0.1:1", "t")).unwrap();
        let result = client.verify_credentials().await;
        assert!(matches!(result, Err(ChannelError::Request(_))));
    }
}
