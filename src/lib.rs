//! alttoot library
//!
//! Watches a Mastodon account, generates descriptions for images posted
//! without alt-text using a local Ollama vision model, optionally translates
//! them, and edits the statuses to attach the descriptions.

pub mod agent;
pub mod channels;
pub mod cli;
pub mod config;
pub mod elaborate;
pub mod logging;
pub mod media;
pub mod poller;
