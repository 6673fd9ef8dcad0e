//! Ollama provider for local model inference.
//!
//! Talks to Ollama's native `/api/chat` endpoint with streaming disabled, so a
//! request resolves to a single JSON object. Images travel base64-encoded in
//! the `images` array of a message, which is how vision models such as llava
//! receive them.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use crate::agent::provider::*;
use crate::agent::AgentError;
use crate::config::DEFAULT_OLLAMA_HOST;

/// Ollama inference provider.
#[derive(Debug)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the default base URL.
    ///
    /// Only the connect phase is bounded; generation on a local model can
    /// take minutes.
    pub fn new() -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AgentError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: DEFAULT_OLLAMA_HOST.to_string(),
            api_key: None,
        })
    }

    /// Set a custom base URL for the Ollama server.
    ///
    /// Both `http` and `https` are accepted since Ollama usually runs locally
    /// over plain HTTP.
    pub fn with_base_url(mut self, url: String) -> Result<Self, AgentError> {
        let parsed = url::Url::parse(&url)
            .map_err(|e| AgentError::InvalidBaseUrl(format!("invalid URL \"{url}\": {e}")))?;
        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(AgentError::InvalidBaseUrl(format!(
                "base URL must use http or https scheme, got \"{scheme}\""
            )));
        }
        self.base_url = url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Set an optional API key for remote Ollama instances behind auth.
    pub fn with_api_key(mut self, api_key: String) -> Self {
        if api_key.trim().is_empty() {
            self.api_key = None;
        } else {
            self.api_key = Some(api_key);
        }
        self
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the JSON body for `/api/chat`.
    fn build_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(convert_message).collect();

        json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => builder.header("authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    /// Check connectivity to the Ollama server and return available models.
    ///
    /// Calls `GET /api/tags` which lists all locally available models.
    pub async fn check_connectivity(&self) -> Result<Vec<String>, AgentError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AgentError::Provider(format!("Ollama connectivity check failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(AgentError::ApiResponse {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::ParseResponse(format!("failed to read JSON: {e}")))?;

        Ok(extract_model_names(&body))
    }
}

fn convert_message(msg: &ChatMessage) -> Value {
    let mut value = json!({
        "role": msg.role,
        "content": msg.content,
    });
    if !msg.images.is_empty() {
        let images: Vec<String> = msg
            .images
            .iter()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
            .collect();
        value["images"] = json!(images);
    }
    value
}

/// Extract the assistant text from a non-streaming `/api/chat` response.
fn extract_message_content(response: &Value) -> Result<String, AgentError> {
    if let Some(error) = response.get("error").and_then(|e| e.as_str()) {
        return Err(AgentError::Provider(error.to_string()));
    }
    response
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(String::from)
        .ok_or_else(|| AgentError::ParseResponse("response missing message content".to_string()))
}

fn extract_model_names(body: &Value) -> Vec<String> {
    body.get("models")
        .and_then(|m| m.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m.get("name").and_then(|n| n.as_str()).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Whether `wanted` is among the installed models.
///
/// Ollama reports untagged models with an implicit `:latest` tag.
pub fn has_model(installed: &[String], wanted: &str) -> bool {
    installed.iter().any(|name| {
        name == wanted
            || (!wanted.contains(':') && name.strip_suffix(":latest") == Some(wanted))
    })
}

#[async_trait]
impl InferenceProvider for OllamaProvider {
    async fn chat(&self, request: ChatRequest) -> Result<String, AgentError> {
        let body = self.build_body(&request);
        let url = format!("{}/api/chat", self.base_url);

        tracing::debug!(model = %request.model, "Sending Ollama chat request");

        let response = self
            .authorize(self.client.post(&url))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Provider(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(AgentError::ApiResponse {
                status: status.as_u16(),
                body,
            });
        }

        let resp_body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::ParseResponse(format!("failed to read JSON: {e}")))?;

        extract_message_content(&resp_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_provider_default_base_url() {
        let provider = OllamaProvider::new().unwrap();
        assert_eq!(provider.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_custom_base_url_trailing_slash_stripped() {
        let provider = OllamaProvider::new()
            .unwrap()
            .with_base_url("http://gpu-box:11434/".to_string())
            .unwrap();
        assert_eq!(provider.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_base_url_rejects_invalid_scheme() {
        let result = OllamaProvider::new()
            .unwrap()
            .with_base_url("ftp://localhost:11434".to_string());
        assert!(matches!(result, Err(AgentError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_base_url_rejects_invalid_url() {
        let result = OllamaProvider::new()
            .unwrap()
            .with_base_url("not a url".to_string());
        assert!(matches!(result, Err(AgentError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_api_key_set_and_clear() {
        let provider = OllamaProvider::new().unwrap().with_api_key("secret".to_string());
        assert_eq!(provider.api_key.as_deref(), Some("secret"));

        let provider = provider.with_api_key("   ".to_string());
        assert!(provider.api_key.is_none());
    }

    #[test]
    fn test_build_body_text_only() {
        let provider = OllamaProvider::new().unwrap();
        let request = ChatRequest::new(
            "mistral-nemo",
            vec![ChatMessage::user("Translate to italian: a cat")],
        );

        let body = provider.build_body(&request);
        assert_eq!(body["model"], "mistral-nemo");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Translate to italian: a cat");
        assert!(body["messages"][0].get("images").is_none());
    }

    #[test]
    fn test_build_body_encodes_images() {
        let provider = OllamaProvider::new().unwrap();
        let request = ChatRequest::new(
            "llava:7b",
            vec![ChatMessage::user("Describe the image").with_image(b"png".to_vec())],
        );

        let body = provider.build_body(&request);
        assert_eq!(body["messages"][0]["images"][0], "cG5n");
    }

    #[test]
    fn test_extract_message_content() {
        let response = json!({
            "model": "llava:7b",
            "message": { "role": "assistant", "content": "A cat on a sofa." },
            "done": true
        });
        assert_eq!(extract_message_content(&response).unwrap(), "A cat on a sofa.");
    }

    #[test]
    fn test_extract_message_content_missing() {
        let response = json!({ "done": true });
        assert!(matches!(
            extract_message_content(&response),
            Err(AgentError::ParseResponse(_))
        ));
    }

    #[test]
    fn test_extract_message_content_error_field() {
        let response = json!({ "error": "model 'llava:7b' not found" });
        let err = extract_message_content(&response).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_extract_model_names() {
        let body = json!({
            "models": [
                { "name": "llava:7b" },
                { "name": "mistral-nemo:latest" },
                { "size": 12 }
            ]
        });
        assert_eq!(
            extract_model_names(&body),
            vec!["llava:7b".to_string(), "mistral-nemo:latest".to_string()]
        );
        assert!(extract_model_names(&json!({})).is_empty());
    }

    #[test]
    fn test_has_model_matches_implicit_latest() {
        let installed = vec!["llava:7b".to_string(), "mistral-nemo:latest".to_string()];
        assert!(has_model(&installed, "llava:7b"));
        assert!(has_model(&installed, "mistral-nemo"));
        assert!(has_model(&installed, "mistral-nemo:latest"));
        assert!(!has_model(&installed, "llava"));
        assert!(!has_model(&installed, "llava:13b"));
    }
}
