//! # Orchestrator Configuration
//!
//! Configuration can come from three places, all producing the same
//! [`OrchestratorConfigBuilder`]:
//!
//! - Environment variables ([`OrchestratorConfigBuilder::from_env`])
//! - An options map handed over by the presentation layer
//!   ([`OrchestratorConfigBuilder::with_options`]); unrecognized keys are
//!   ignored
//! - A TOML file ([`OrchestratorConfigBuilder::load_from_file`])
//!
//! ## Environment Variables
//! - `MAESTRO_DEFAULT_TIMEOUT_MS` - Model call timeout in ms (default: 30000)
//! - `MAESTRO_TOOL_TIMEOUT_MS` - Per-tool timeout in ms (default: 30000)
//! - `MAESTRO_PERSIST_TIMEOUT_MS` - Bound on persisting one interaction in ms (default: 5000)
//! - `MAESTRO_ENABLED_TOOLS` - Comma-separated tool names; unset enables all
//! - `MAESTRO_KNOWLEDGE_LIMIT` - Knowledge snippets per request (default: 10)
//! - `MAESTRO_RELEVANCE_THRESHOLD` - Minimum relevance 0.0-1.0 (default: 0.3)
//! - `MAESTRO_WORKING_DIRECTORY` - Working directory handed to tools
//! - `MAESTRO_EVENT_CAPACITY` - Lifecycle event buffer per subscriber (default: 256)

use maestro_core::RequestKind;
use maestro_memory::{DEFAULT_KNOWLEDGE_LIMIT, DEFAULT_RELEVANCE_THRESHOLD};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{env, time::Duration};

use crate::profiles::{ProfileOverride, ProfileTable};

/// Default model call timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default per-tool timeout.
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 30_000;
/// Default bound on persisting one interaction.
pub const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 5_000;
/// Default per-subscriber event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

const MAX_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Invalid option '{key}': {message}")]
    InvalidOption { key: String, message: String },

    #[error("Failed to read config file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse TOML config: {0}")]
    Parse(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Validated orchestrator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub default_timeout: Duration,
    pub tool_timeout: Duration,
    /// How long a response waits on persisting its interaction.
    pub persist_timeout: Duration,
    /// `None` enables every registered tool.
    pub enabled_tools: Option<Vec<String>>,
    /// Provider name → model used when only the provider is preferred.
    pub default_models: HashMap<String, String>,
    pub knowledge_limit: usize,
    pub relevance_threshold: f64,
    pub working_directory: PathBuf,
    pub event_capacity: usize,
    pub profiles: ProfileTable,
    /// Replacement model preference lists per kind.
    pub model_preferences: HashMap<RequestKind, Vec<String>>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            tool_timeout: Duration::from_millis(DEFAULT_TOOL_TIMEOUT_MS),
            persist_timeout: Duration::from_millis(DEFAULT_PERSIST_TIMEOUT_MS),
            enabled_tools: None,
            default_models: HashMap::new(),
            knowledge_limit: DEFAULT_KNOWLEDGE_LIMIT,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            working_directory: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            profiles: ProfileTable::default(),
            model_preferences: HashMap::new(),
        }
    }
}

impl OrchestratorConfig {
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::new()
    }
}

/// On-disk shape of the TOML configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    default_timeout_ms: Option<u64>,
    tool_timeout_ms: Option<u64>,
    persist_timeout_ms: Option<u64>,
    enabled_tools: Option<Vec<String>>,
    #[serde(default)]
    default_models: HashMap<String, String>,
    knowledge_limit: Option<usize>,
    relevance_threshold: Option<f64>,
    working_directory: Option<PathBuf>,
    event_capacity: Option<usize>,
    #[serde(default)]
    profiles: HashMap<String, ProfileOverride>,
    #[serde(default)]
    model_preferences: HashMap<String, Vec<String>>,
}

fn parse_kind(section: &str, key: &str) -> Result<RequestKind, ConfigError> {
    key.parse::<RequestKind>()
        .map_err(|e| ConfigError::Parse(format!("[{section}]: {e}")))
}

/// Builder for [`OrchestratorConfig`] with environment variable support
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    /// Create a new builder with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        if let Some(ms) = get_env_u64("MAESTRO_DEFAULT_TIMEOUT_MS")? {
            builder = builder.default_timeout_ms(ms);
        }
        if let Some(ms) = get_env_u64("MAESTRO_TOOL_TIMEOUT_MS")? {
            builder = builder.tool_timeout_ms(ms);
        }
        if let Some(ms) = get_env_u64("MAESTRO_PERSIST_TIMEOUT_MS")? {
            builder = builder.persist_timeout_ms(ms);
        }
        if let Some(tools) = get_env_string("MAESTRO_ENABLED_TOOLS") {
            builder = builder.enabled_tools(split_list(&tools));
        }
        if let Some(limit) = get_env_usize("MAESTRO_KNOWLEDGE_LIMIT")? {
            builder = builder.knowledge_limit(limit);
        }
        if let Some(threshold) = get_env_f64("MAESTRO_RELEVANCE_THRESHOLD")? {
            builder = builder.relevance_threshold(threshold);
        }
        if let Some(dir) = get_env_string("MAESTRO_WORKING_DIRECTORY") {
            builder = builder.working_directory(dir);
        }
        if let Some(capacity) = get_env_usize("MAESTRO_EVENT_CAPACITY")? {
            builder = builder.event_capacity(capacity);
        }

        Ok(builder)
    }

    /// Apply a presentation-layer options map on top of the current values.
    ///
    /// Recognized keys: `default_timeout_ms`, `tool_timeout_ms`,
    /// `persist_timeout_ms`, `enabled_tools` (array or comma-separated string), `default_models`
    /// (object of provider → model), `knowledge_limit`,
    /// `relevance_threshold`, `working_directory`, `event_capacity`.
    /// Anything else is ignored.
    pub fn with_options(
        mut self,
        options: &HashMap<String, serde_json::Value>,
    ) -> Result<Self, ConfigError> {
        for (key, value) in options {
            match key.as_str() {
                "default_timeout_ms" => {
                    self = self.default_timeout_ms(option_u64(key, value)?);
                }
                "tool_timeout_ms" => {
                    self = self.tool_timeout_ms(option_u64(key, value)?);
                }
                "persist_timeout_ms" => {
                    self = self.persist_timeout_ms(option_u64(key, value)?);
                }
                "enabled_tools" => {
                    self = self.enabled_tools(option_list(key, value)?);
                }
                "default_models" => {
                    let map = value.as_object().ok_or_else(|| invalid(key, "expected an object"))?;
                    for (provider, model) in map {
                        let model = model
                            .as_str()
                            .ok_or_else(|| invalid(key, "model names must be strings"))?;
                        self = self.default_model(provider.clone(), model);
                    }
                }
                "knowledge_limit" => {
                    self = self.knowledge_limit(option_u64(key, value)? as usize);
                }
                "relevance_threshold" => {
                    let threshold = value
                        .as_f64()
                        .ok_or_else(|| invalid(key, "expected a number"))?;
                    self = self.relevance_threshold(threshold);
                }
                "working_directory" => {
                    let dir = value
                        .as_str()
                        .ok_or_else(|| invalid(key, "expected a string"))?;
                    self = self.working_directory(dir);
                }
                "event_capacity" => {
                    self = self.event_capacity(option_u64(key, value)? as usize);
                }
                other => {
                    tracing::debug!(key = other, "Ignoring unrecognized option");
                }
            }
        }
        Ok(self)
    }

    /// Parse a TOML document on top of the current values.
    pub fn with_toml_str(mut self, content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(ms) = file.default_timeout_ms {
            self = self.default_timeout_ms(ms);
        }
        if let Some(ms) = file.tool_timeout_ms {
            self = self.tool_timeout_ms(ms);
        }
        if let Some(ms) = file.persist_timeout_ms {
            self = self.persist_timeout_ms(ms);
        }
        if let Some(tools) = file.enabled_tools {
            self = self.enabled_tools(tools);
        }
        for (provider, model) in file.default_models {
            self = self.default_model(provider, model);
        }
        if let Some(limit) = file.knowledge_limit {
            self = self.knowledge_limit(limit);
        }
        if let Some(threshold) = file.relevance_threshold {
            self = self.relevance_threshold(threshold);
        }
        if let Some(dir) = file.working_directory {
            self = self.working_directory(dir);
        }
        if let Some(capacity) = file.event_capacity {
            self = self.event_capacity(capacity);
        }
        for (key, patch) in &file.profiles {
            let kind = parse_kind("profiles", key)?;
            self.config.profiles = self.config.profiles.with_override(kind, patch);
        }
        for (key, names) in file.model_preferences {
            let kind = parse_kind("model_preferences", &key)?;
            self = self.model_preferences(kind, names);
        }
        Ok(self)
    }

    /// Read and parse a TOML file on top of the current values.
    pub fn load_from_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.with_toml_str(&content)
    }

    /// Set the model call timeout in milliseconds
    #[must_use]
    pub fn default_timeout_ms(mut self, ms: u64) -> Self {
        self.config.default_timeout = Duration::from_millis(ms);
        self
    }

    /// Set the per-tool timeout in milliseconds
    #[must_use]
    pub fn tool_timeout_ms(mut self, ms: u64) -> Self {
        self.config.tool_timeout = Duration::from_millis(ms);
        self
    }

    /// Set the bound on persisting one interaction in milliseconds
    #[must_use]
    pub fn persist_timeout_ms(mut self, ms: u64) -> Self {
        self.config.persist_timeout = Duration::from_millis(ms);
        self
    }

    /// Restrict dispatch to the named tools
    #[must_use]
    pub fn enabled_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.enabled_tools = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn default_model(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.config
            .default_models
            .insert(provider.into(), model.into());
        self
    }

    #[must_use]
    pub fn knowledge_limit(mut self, limit: usize) -> Self {
        self.config.knowledge_limit = limit;
        self
    }

    #[must_use]
    pub fn relevance_threshold(mut self, threshold: f64) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    #[must_use]
    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_directory = dir.into();
        self
    }

    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    #[must_use]
    pub fn profiles(mut self, profiles: ProfileTable) -> Self {
        self.config.profiles = profiles;
        self
    }

    #[must_use]
    pub fn model_preferences<I, S>(mut self, kind: RequestKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .model_preferences
            .insert(kind, names.into_iter().map(Into::into).collect());
        self
    }

    /// Validate configuration and build [`OrchestratorConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<OrchestratorConfig, ConfigError> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let config = &self.config;

        for (name, timeout) in [
            ("default_timeout_ms", config.default_timeout),
            ("tool_timeout_ms", config.tool_timeout),
            ("persist_timeout_ms", config.persist_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be greater than 0"
                )));
            }
            if timeout.as_millis() > u128::from(MAX_TIMEOUT_MS) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be <= {MAX_TIMEOUT_MS} (10 minutes)"
                )));
            }
        }

        if !(0.0..=1.0).contains(&config.relevance_threshold) {
            return Err(ConfigError::ValidationError(
                "relevance_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if config.event_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "event_capacity must be greater than 0".to_string(),
            ));
        }

        if let Some(tools) = &config.enabled_tools
            && tools.iter().any(|t| t.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "enabled_tools cannot contain empty names".to_string(),
            ));
        }

        for (kind, profile) in config.profiles.iter() {
            if !(0.0..=2.0).contains(&profile.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "profiles.{kind}.temperature must be between 0.0 and 2.0"
                )));
            }
            if profile.max_tokens == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "profiles.{kind}.max_tokens must be greater than 0"
                )));
            }
        }

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidOption {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn option_u64(key: &str, value: &serde_json::Value) -> Result<u64, ConfigError> {
    value
        .as_u64()
        .ok_or_else(|| invalid(key, "expected a non-negative integer"))
}

fn option_list(key: &str, value: &serde_json::Value) -> Result<Vec<String>, ConfigError> {
    match value {
        serde_json::Value::String(s) => Ok(split_list(s)),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(key, "expected an array of strings"))
            })
            .collect(),
        _ => Err(invalid(key, "expected an array or comma-separated string")),
    }
}

// Environment variable helper functions

fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid usize value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn get_env_f64(key: &str) -> Result<Option<f64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<f64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid f64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
