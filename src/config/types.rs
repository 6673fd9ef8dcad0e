//! Typed configuration structures
//!
//! Provides strongly-typed access to the bot's settings with validation
//! and default values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default translation target when `LANGUAGE` is unset.
pub const DEFAULT_LANGUAGE: &str = "italian";

/// Language value that disables translation.
pub const NO_TRANSLATION: &str = "en";

/// Default Ollama base URL (local server).
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default model used to describe images.
pub const DEFAULT_VISION_MODEL: &str = "llava:7b";

/// Default model used to translate descriptions.
pub const DEFAULT_TRANSLATION_MODEL: &str = "mistral-nemo";

/// Default pause between two polls, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default number of statuses scanned at startup.
pub const DEFAULT_BACKLOG_LIMIT: u32 = 10;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Mastodon connection settings
    pub mastodon: MastodonConfig,

    /// Inference service settings
    pub inference: InferenceConfig,

    /// Target language for generated descriptions
    pub language: Language,

    /// Pause between two polls
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Number of statuses scanned during the backlog phase
    pub backlog_limit: u32,

    /// What to do when a status cannot be elaborated
    pub on_error: ErrorPolicy,
}

impl BotConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.mastodon.validate() {
            errors.push(ValidationError {
                path: "mastodon".to_string(),
                message: e,
            });
        }

        if let Err(e) = self.inference.validate() {
            errors.push(ValidationError {
                path: "inference".to_string(),
                message: e,
            });
        }

        if self.poll_interval.is_zero() {
            errors.push(ValidationError {
                path: "pollInterval".to_string(),
                message: "poll interval must be at least one second".to_string(),
            });
        }

        if self.backlog_limit == 0 {
            errors.push(ValidationError {
                path: "backlogLimit".to_string(),
                message: "backlog limit must be positive".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Mastodon instance and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MastodonConfig {
    /// Base URL of the instance, e.g. `https://mastodon.social`
    pub instance_url: String,

    /// OAuth application client id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth application client secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// User access token
    pub access_token: String,
}

impl MastodonConfig {
    fn validate(&self) -> Result<(), String> {
        validate_http_url(&self.instance_url)?;
        if self.access_token.trim().is_empty() {
            return Err("access token must not be empty".to_string());
        }
        Ok(())
    }
}

/// Inference service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Ollama base URL
    pub host: String,

    /// Model asked to describe images
    pub vision_model: String,

    /// Model asked to translate descriptions
    pub translation_model: String,

    /// Bearer token for Ollama servers behind an authenticating proxy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            translation_model: DEFAULT_TRANSLATION_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl InferenceConfig {
    fn validate(&self) -> Result<(), String> {
        validate_http_url(&self.host)?;
        if self.vision_model.trim().is_empty() || self.translation_model.trim().is_empty() {
            return Err("model names must not be empty".to_string());
        }
        Ok(())
    }
}

/// Target language for descriptions.
///
/// Free-form name handed to the translation model. The value `en` means the
/// generated description is published as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// Language name as passed to the translation prompt.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether descriptions should be sent through the translator.
    pub fn needs_translation(&self) -> bool {
        !self.0.eq_ignore_ascii_case(NO_TRANSLATION)
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl std::str::FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Policy applied when elaborating a single status fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Propagate the error and stop the bot.
    #[default]
    FailFast,
    /// Log the error and move on to the next status.
    SkipPost,
}

fn validate_http_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("invalid URL \"{raw}\": {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "URL must use http or https scheme, got \"{other}\""
        )),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
