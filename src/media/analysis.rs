//! Image description via a vision model.
//!
//! Sends the downloaded image with a fixed prompt to the configured model and
//! returns its reply verbatim. There is no caching, retry or length check;
//! whatever the model answers becomes the alt text.

use std::sync::Arc;

use crate::agent::{AgentError, ChatMessage, ChatRequest, InferenceProvider};
use crate::config::DEFAULT_VISION_MODEL;
use crate::media::fetch::DownloadedImage;

/// Prompt sent along with every image.
pub const DESCRIBE_PROMPT: &str = "Describe the image";

/// Produces natural-language descriptions of images.
pub struct DescriptionGenerator {
    provider: Arc<dyn InferenceProvider>,
    model: String,
}

impl DescriptionGenerator {
    pub fn new(provider: Arc<dyn InferenceProvider>) -> Self {
        Self {
            provider,
            model: DEFAULT_VISION_MODEL.to_string(),
        }
    }

    /// Set a custom vision model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Describe the image stored in `image`.
    pub async fn describe(&self, image: &DownloadedImage) -> Result<String, AgentError> {
        tracing::debug!(path = %image.path().display(), "Extracting description from image");

        let data = image
            .read()
            .await
            .map_err(|e| AgentError::Io(format!("failed to read {}: {e}", image.path().display())))?;

        let request = ChatRequest::new(
            self.model.clone(),
            vec![ChatMessage::user(DESCRIBE_PROMPT).with_image(data)],
        );
        self.provider.chat(request).await
    }
}
