//! Description translation via a text model.

use std::sync::Arc;

use crate::agent::{AgentError, ChatMessage, ChatRequest, InferenceProvider};
use crate::config::{Language, DEFAULT_TRANSLATION_MODEL};

/// Translates generated descriptions into the configured language.
pub struct Translator {
    provider: Arc<dyn InferenceProvider>,
    model: String,
}

impl Translator {
    pub fn new(provider: Arc<dyn InferenceProvider>) -> Self {
        Self {
            provider,
            model: DEFAULT_TRANSLATION_MODEL.to_string(),
        }
    }

    /// Set a custom translation model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Translate `text` into `language`.
    ///
    /// Callers decide whether translation is wanted at all, see
    /// [`Language::needs_translation`].
    pub async fn translate(&self, text: &str, language: &Language) -> Result<String, AgentError> {
        tracing::debug!(language = %language, "Translating description");

        let request = ChatRequest::new(
            self.model.clone(),
            vec![ChatMessage::user(translation_prompt(text, language))],
        );
        self.provider.chat(request).await
    }
}

fn translation_prompt(text: &str, language: &Language) -> String {
    format!("Translate to {}: {}", language.name(), text)
}
