//! Inference provider trait and common types.

use async_trait::async_trait;
use serde::Serialize;

use crate::agent::AgentError;

/// Role of a message in a chat exchange.
///
/// The bot only ever sends single-turn user prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
}

/// A single chat message, optionally carrying images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Raw image bytes attached to the message.
    pub images: Vec<Vec<u8>>,
}

impl ChatMessage {
    /// A plain user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Attach an image to the message.
    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.images.push(image);
        self
    }
}

/// A non-streaming chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }
}

/// Trait for chat-style inference services.
///
/// Implementations send the whole request and return the assistant's reply
/// text once generation has finished.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<String, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_has_no_images() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "hello");
        assert!(msg.images.is_empty());
    }

    #[test]
    fn test_with_image_appends() {
        let msg = ChatMessage::user("look").with_image(vec![1, 2]).with_image(vec![3]);
        assert_eq!(msg.images, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ChatRole::User).unwrap(), "user");
    }
}
