//! CLI definitions and handlers.
//!
//! Uses clap derive. Every setting can be given as a long flag or through the
//! environment variable named next to it, which is how the bot is normally
//! deployed. Subcommands:
//! - `run` (default) -- scan the backlog, then poll forever
//! - `check` -- verify Mastodon credentials and Ollama models, then exit
//! - `config` -- print the resolved configuration (secrets redacted) as JSON
//! - `version` -- print the package version and platform

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::agent::ollama::{has_model, OllamaProvider};
use crate::channels::{MastodonClient, SocialClient};
use crate::config::{
    self, BotConfig, ConfigError, ErrorPolicy, InferenceConfig, Language, MastodonConfig,
    ValidationError, DEFAULT_BACKLOG_LIMIT, DEFAULT_LANGUAGE, DEFAULT_OLLAMA_HOST,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TRANSLATION_MODEL, DEFAULT_VISION_MODEL,
};
use crate::elaborate::Elaborator;
use crate::logging::LogFormat;
use crate::media::{DescriptionGenerator, MediaFetcher, Translator};
use crate::poller::{Poller, PollerConfig};

/// Mastodon bot that writes missing alt-text for your images.
#[derive(Parser, Debug)]
#[command(
    name = "alttoot",
    version = env!("CARGO_PKG_VERSION"),
    about = "Describe images missing alt-text on your Mastodon statuses"
)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Scan recent statuses, then poll for new ones (default).
    Run,

    /// Verify credentials and model availability, then exit.
    Check,

    /// Print the resolved configuration (secrets redacted) as JSON.
    Config,

    /// Print the package version and platform.
    Version,
}

/// Bot settings, each backed by an environment variable.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Base URL of the Mastodon instance.
    #[arg(long, env = "INSTANCE_URL", global = true)]
    pub instance_url: Option<String>,

    /// OAuth application client id.
    #[arg(long, env = "CLIENT_ID", global = true, hide_env_values = true)]
    pub client_id: Option<String>,

    /// OAuth application client secret.
    #[arg(long, env = "CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// User access token.
    #[arg(long, env = "ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Target language for descriptions; "en" disables translation.
    #[arg(long, env = "LANGUAGE", default_value = DEFAULT_LANGUAGE, global = true)]
    pub language: String,

    /// Ollama base URL.
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_HOST, global = true)]
    pub ollama_host: String,

    /// Bearer token for an authenticating proxy in front of Ollama.
    #[arg(long, env = "OLLAMA_API_KEY", global = true, hide_env_values = true)]
    pub ollama_api_key: Option<String>,

    /// Model used to describe images.
    #[arg(long, env = "VISION_MODEL", default_value = DEFAULT_VISION_MODEL, global = true)]
    pub vision_model: String,

    /// Model used to translate descriptions.
    #[arg(long, env = "TRANSLATION_MODEL", default_value = DEFAULT_TRANSLATION_MODEL, global = true)]
    pub translation_model: String,

    /// Seconds to wait between two polls.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS, global = true)]
    pub poll_interval_secs: u64,

    /// Number of recent statuses scanned at startup.
    #[arg(long, env = "BACKLOG_LIMIT", default_value_t = DEFAULT_BACKLOG_LIMIT, global = true)]
    pub backlog_limit: u32,

    /// What to do when a status cannot be processed.
    #[arg(long, env = "ON_ERROR", value_enum, default_value_t = ErrorPolicy::FailFast, global = true)]
    pub on_error: ErrorPolicy,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

impl Settings {
    /// Assemble and validate the bot configuration.
    pub fn to_config(&self) -> Result<BotConfig, ConfigError> {
        let mut missing = Vec::new();
        let instance_url = required(&self.instance_url, "INSTANCE_URL", &mut missing);
        let access_token = required(&self.access_token, "ACCESS_TOKEN", &mut missing);
        if !missing.is_empty() {
            return Err(ConfigError::Invalid(missing));
        }

        let config = BotConfig {
            mastodon: MastodonConfig {
                instance_url,
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
                access_token,
            },
            inference: InferenceConfig {
                host: self.ollama_host.clone(),
                vision_model: self.vision_model.clone(),
                translation_model: self.translation_model.clone(),
                api_key: self.ollama_api_key.clone(),
            },
            language: Language::new(self.language.as_str()),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            backlog_limit: self.backlog_limit,
            on_error: self.on_error,
        };
        config::ensure_valid(&config)?;
        Ok(config)
    }
}

fn required(value: &Option<String>, var: &str, missing: &mut Vec<ValidationError>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(ValidationError {
                path: var.to_string(),
                message: "must be set".to_string(),
            });
            String::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["apikey", "api_key", "token", "secret", "password"];

fn build_ollama(config: &InferenceConfig) -> Result<OllamaProvider, Box<dyn std::error::Error>> {
    let mut provider = OllamaProvider::new()?.with_base_url(config.host.clone())?;
    if let Some(ref key) = config.api_key {
        provider = provider.with_api_key(key.clone());
    }
    Ok(provider)
}

/// Run the `run` subcommand: backlog pass, then poll until interrupted.
pub async fn handle_run(config: BotConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting the bot...");

    let social: Arc<dyn SocialClient> = Arc::new(MastodonClient::new(&config.mastodon)?);
    let provider = Arc::new(build_ollama(&config.inference)?);

    let elaborator = Elaborator::new(
        social.clone(),
        Arc::new(MediaFetcher::new()?),
        DescriptionGenerator::new(provider.clone()).with_model(&config.inference.vision_model),
        Translator::new(provider).with_model(&config.inference.translation_model),
        config.language.clone(),
    );

    let poller_config = PollerConfig {
        interval: config.poll_interval,
        backlog_limit: config.backlog_limit,
        on_error: config.on_error,
    };
    let mut poller = Poller::connect(social, elaborator, poller_config).await?;

    tokio::select! {
        result = poller.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }
    Ok(())
}

/// Run the `check` subcommand.
pub async fn handle_check(config: &BotConfig) -> Result<(), Box<dyn std::error::Error>> {
    let social = MastodonClient::new(&config.mastodon)?;
    let account = social.verify_credentials().await?;
    println!("Mastodon: authenticated as {} (id {})", account.acct, account.id);

    let provider = build_ollama(&config.inference)?;
    let installed = provider.check_connectivity().await?;
    println!("Ollama:   {} reachable, {} models installed", provider.base_url(), installed.len());

    let mut missing = Vec::new();
    for model in [&config.inference.vision_model, &config.inference.translation_model] {
        let present = has_model(&installed, model);
        println!("  {:<24} {}", model, if present { "ok" } else { "missing" });
        if !present {
            missing.push(model.as_str());
        }
    }
    if !config.language.needs_translation() {
        println!("Translation disabled (language = {})", config.language);
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("models not installed: {}", missing.join(", ")).into())
    }
}

/// Run the `config` subcommand.
pub fn handle_config_show(config: &BotConfig) -> Result<(), Box<dyn std::error::Error>> {
    let redacted = redact_secrets(serde_json::to_value(config)?);
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("{}", version_info());
}

fn version_info() -> String {
    format!(
        "alttoot {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    map.insert(key, Value::String("[REDACTED]".to_string()));
                } else if let Some(child) = map.remove(&key) {
                    map.insert(key, redact_secrets(child));
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}
