//! Provider module for BeeChat
//!
//! This module contains the completion provider abstraction, the
//! OpenAI-compatible HTTP implementation and the opt-in replay cache.

pub mod base;
pub mod cache;
pub mod openai;

pub use base::{CompletionRequest, CompletionResponse, Provider, TokenUsage};
pub use cache::CachingProvider;
pub use openai::OpenAiProvider;

use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Create the completion provider described by the configuration
///
/// # Arguments
///
/// * `config` - Full application configuration
///
/// # Returns
///
/// Returns a shared provider instance, wrapped in the replay cache when
/// `provider.replay_cache.enabled` is set
///
/// # Errors
///
/// Returns `MissingCredentials` if the API key variable is unset, or an error
/// if the HTTP client cannot be initialized
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let api_key = config.api_key()?;
    create_provider_with_key(config, api_key)
}

/// Create the configured provider with an explicit API key
///
/// # Errors
///
/// Returns error if the key is blank or the HTTP client cannot be built
pub fn create_provider_with_key(
    config: &Config,
    api_key: impl Into<String>,
) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::new(&config.provider, api_key)?);

    let cache = &config.provider.replay_cache;
    if cache.enabled {
        return Ok(Arc::new(CachingProvider::new(
            provider,
            Duration::from_secs(cache.ttl_seconds),
            cache.max_entries,
        )));
    }

    Ok(provider)
}
