//! Configuration management for BeeChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Precedence, lowest to highest: built-in defaults, YAML file, `BEECHAT_*`
//! environment variables, command-line flags.

use crate::chat::{ContextPolicy, ModelId, Tone, TurnConfig};
use crate::error::{BeeChatError, Result};
use crate::persona::PersonaTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure for BeeChat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion service settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Default turn settings and context policy
    #[serde(default)]
    pub chat: ChatConfig,

    /// Custom personas, merged over the built-in table
    #[serde(default)]
    pub personas: BTreeMap<String, String>,

    /// Durable message log settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the chat-completions API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Name of the environment variable that holds the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Wall-clock budget for a single completion call (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Opt-in replay cache for identical requests
    #[serde(default)]
    pub replay_cache: ReplayCacheConfig,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout_seconds(),
            replay_cache: ReplayCacheConfig::default(),
        }
    }
}

/// Replay cache configuration
///
/// Disabled by default: identical requests normally deserve fresh replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayCacheConfig {
    /// Whether identical requests are answered from the cache
    #[serde(default)]
    pub enabled: bool,

    /// How long a cached reply stays valid (seconds)
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Maximum number of cached replies
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_cache_entries() -> usize {
    128
}

impl Default for ReplayCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

/// Chat defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Turn settings used until the user changes them
    #[serde(flatten)]
    pub turn: TurnConfig,

    /// How much history accompanies each request
    #[serde(default)]
    pub context: ContextConfig,
}

/// Context window policy name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextPolicyKind {
    /// Whole conversation
    #[default]
    Full,
    /// Only the most recent messages
    Recent,
}

/// Context window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Which policy to apply
    #[serde(default)]
    pub policy: ContextPolicyKind,

    /// Prior messages kept by the `recent` policy
    #[serde(default = "default_recent_messages")]
    pub recent_messages: usize,
}

fn default_recent_messages() -> usize {
    5
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            policy: ContextPolicyKind::default(),
            recent_messages: default_recent_messages(),
        }
    }
}

impl ContextConfig {
    /// Resolved context policy
    pub fn policy(&self) -> ContextPolicy {
        match self.policy {
            ContextPolicyKind::Full => ContextPolicy::Full,
            ContextPolicyKind::Recent => ContextPolicy::Recent(self.recent_messages),
        }
    }
}

/// Durable message log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Mirror every successful turn into the SQLite log
    #[serde(default = "default_storage_enabled")]
    pub enabled: bool,

    /// Database path; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_storage_enabled() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_storage_enabled(),
            path: None,
        }
    }
}

/// Per-invocation overrides for the default turn settings
#[derive(Debug, Clone, Default)]
pub struct TurnOverrides {
    /// Model identifier
    pub model: Option<String>,
    /// Persona key
    pub persona: Option<String>,
    /// Tone label
    pub tone: Option<String>,
    /// Reply token limit
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Nucleus sampling mass
    pub top_p: Option<f32>,
}

impl Config {
    /// Load configuration from file with environment overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BeeChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| BeeChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_base) = std::env::var("BEECHAT_API_BASE") {
            self.provider.api_base = api_base;
        }

        if let Ok(timeout) = std::env::var("BEECHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid BEECHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(model) = std::env::var("BEECHAT_MODEL") {
            match model.parse::<ModelId>() {
                Ok(value) => self.chat.turn.model = value,
                Err(e) => tracing::warn!("Ignoring BEECHAT_MODEL: {}", e),
            }
        }

        if let Ok(persona) = std::env::var("BEECHAT_PERSONA") {
            self.chat.turn.persona = persona;
        }

        if let Ok(tone) = std::env::var("BEECHAT_TONE") {
            match tone.parse::<Tone>() {
                Ok(value) => self.chat.turn.tone = value,
                Err(e) => tracing::warn!("Ignoring BEECHAT_TONE: {}", e),
            }
        }

        if let Ok(max_tokens) = std::env::var("BEECHAT_MAX_TOKENS") {
            if let Ok(value) = max_tokens.parse() {
                self.chat.turn.max_tokens = value;
            } else {
                tracing::warn!("Invalid BEECHAT_MAX_TOKENS: {}", max_tokens);
            }
        }

        if let Ok(temperature) = std::env::var("BEECHAT_TEMPERATURE") {
            if let Ok(value) = temperature.parse() {
                self.chat.turn.temperature = value;
            } else {
                tracing::warn!("Invalid BEECHAT_TEMPERATURE: {}", temperature);
            }
        }

        if let Ok(top_p) = std::env::var("BEECHAT_TOP_P") {
            if let Ok(value) = top_p.parse() {
                self.chat.turn.top_p = value;
            } else {
                tracing::warn!("Invalid BEECHAT_TOP_P: {}", top_p);
            }
        }

        if let Ok(db_path) = std::env::var("BEECHAT_HISTORY_DB") {
            tracing::debug!(db_path = %db_path, "Env override: BEECHAT_HISTORY_DB");
            self.storage.path = Some(PathBuf::from(db_path));
        }
    }

    /// Apply command-line overrides to the default turn settings
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a model or tone label is not recognized
    pub fn apply_overrides(&mut self, overrides: &TurnOverrides) -> Result<()> {
        if let Some(model) = &overrides.model {
            self.chat.turn.model = model.parse()?;
        }
        if let Some(persona) = &overrides.persona {
            self.chat.turn.persona = persona.clone();
        }
        if let Some(tone) = &overrides.tone {
            self.chat.turn.tone = tone.parse()?;
        }
        if let Some(max_tokens) = overrides.max_tokens {
            self.chat.turn.max_tokens = max_tokens;
        }
        if let Some(temperature) = overrides.temperature {
            self.chat.turn.temperature = temperature;
        }
        if let Some(top_p) = overrides.top_p {
            self.chat.turn.top_p = top_p;
        }
        Ok(())
    }

    /// Persona table: built-ins merged with the `personas` section
    pub fn persona_table(&self) -> Result<PersonaTable> {
        Ok(PersonaTable::with_overrides(&self.personas)?)
    }

    /// Read the API key from the configured environment variable
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` if the variable is unset or blank
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.provider.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(BeeChatError::MissingCredentials(format!(
                "{} environment variable not set",
                self.provider.api_key_env
            ))
            .into()),
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error naming the first failing check
    pub fn validate(&self) -> Result<()> {
        let api_base = self.provider.api_base.trim();
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(BeeChatError::Config(format!(
                "provider.api_base must be an http(s) URL, got '{}'",
                self.provider.api_base
            ))
            .into());
        }

        if self.provider.api_key_env.trim().is_empty() {
            return Err(
                BeeChatError::Config("provider.api_key_env cannot be empty".to_string()).into(),
            );
        }

        if self.provider.timeout_seconds == 0 {
            return Err(BeeChatError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        let cache = &self.provider.replay_cache;
        if cache.enabled && (cache.ttl_seconds == 0 || cache.max_entries == 0) {
            return Err(BeeChatError::Config(
                "provider.replay_cache ttl_seconds and max_entries must be greater than 0"
                    .to_string(),
            )
            .into());
        }

        self.chat
            .turn
            .validate()
            .map_err(|e| BeeChatError::Config(format!("chat: {}", e)))?;

        if self.chat.context.policy == ContextPolicyKind::Recent
            && self.chat.context.recent_messages == 0
        {
            return Err(BeeChatError::Config(
                "chat.context.recent_messages must be greater than 0".to_string(),
            )
            .into());
        }

        let personas = self.persona_table()?;
        if !personas.contains(&self.chat.turn.persona) {
            return Err(BeeChatError::Config(format!(
                "chat.persona '{}' is not a known persona",
                self.chat.turn.persona
            ))
            .into());
        }

        Ok(())
    }
}
