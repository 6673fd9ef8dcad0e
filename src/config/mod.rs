//! Bot configuration
//!
//! Settings are sourced from the environment (optionally seeded from a
//! `.env` file) and command-line flags, see [`crate::cli`]. This module holds
//! the typed result and its validation.

pub mod types;

pub use types::*;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {}", format_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a configuration, turning field errors into a [`ConfigError`].
pub fn ensure_valid(config: &BotConfig) -> Result<(), ConfigError> {
    config.validate().map_err(ConfigError::Invalid)
}

/// Load a `.env` file from the working directory if present.
///
/// Variables already set in the process environment win. Returns the path
/// of the file that was loaded, if any.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
