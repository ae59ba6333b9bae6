//! Configuration loading, validation, and management for chatmem.
//!
//! Loads configuration from `~/.chatmem/config.toml` with environment
//! variable overrides. Validates all settings at startup. The resulting
//! [`AppConfig`] is constructed once and handed to every component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chatmem_core::provider::SamplingProfile;

/// The root configuration structure.
///
/// Maps directly to `~/.chatmem/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion endpoint settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Consolidation and storage settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Per-turn pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Optional bearer token; local vLLM deployments usually need none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for calls that expect a JSON object back
    #[serde(default = "default_structured_temperature")]
    pub structured_temperature: f32,

    /// Temperature for final answer generation
    #[serde(default = "default_open_temperature")]
    pub open_temperature: f32,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/v1".into()
}
fn default_model() -> String {
    "meta-llama/Meta-Llama-3-8B-Instruct".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_structured_temperature() -> f32 {
    0.1
}
fn default_open_temperature() -> f32 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            structured_temperature: default_structured_temperature(),
            open_temperature: default_open_temperature(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("structured_temperature", &self.structured_temperature)
            .field("open_temperature", &self.open_temperature)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Estimated history size at which consolidation fires
    #[serde(default = "default_threshold_tokens")]
    pub threshold_tokens: usize,

    /// Directory holding one `<session>_memory.json` per session
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,

    /// Directory holding JSONL conversation fixtures
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: PathBuf,
}

fn default_threshold_tokens() -> usize {
    1000
}
fn default_session_dir() -> PathBuf {
    AppConfig::config_dir().join("sessions")
}
fn default_fixtures_dir() -> PathBuf {
    AppConfig::config_dir().join("test_data")
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            threshold_tokens: default_threshold_tokens(),
            session_dir: default_session_dir(),
            fixtures_dir: default_fixtures_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Recent turns shown to query resolution
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Recent turns replayed into final answer generation
    #[serde(default = "default_answer_window")]
    pub answer_window: usize,

    /// Confidence below which the assistant asks instead of answering
    #[serde(default = "default_clarification_threshold")]
    pub clarification_threshold: f64,
}

fn default_history_window() -> usize {
    5
}
fn default_answer_window() -> usize {
    15
}
fn default_clarification_threshold() -> f64 {
    chatmem_core::CLARIFICATION_THRESHOLD
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            answer_window: default_answer_window(),
            clarification_threshold: default_clarification_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatmem/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `LLM_API_BASE_URL`
    /// - `CHATMEM_MODEL`
    /// - `CHATMEM_API_KEY`
    /// - `MEMORY_THRESHOLD_TOKENS`
    /// - `CHATMEM_SESSION_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LLM_API_BASE_URL") {
            self.llm.api_base_url = url;
        }
        if let Some(model) = lookup("CHATMEM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("CHATMEM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(raw) = lookup("MEMORY_THRESHOLD_TOKENS") {
            self.memory.threshold_tokens = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "MEMORY_THRESHOLD_TOKENS must be a positive integer, got {raw:?}"
                ))
            })?;
        }
        if let Some(dir) = lookup("CHATMEM_SESSION_DIR") {
            self.memory.session_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatmem")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.threshold_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "memory.threshold_tokens must be > 0".into(),
            ));
        }

        for (name, t) in [
            ("llm.structured_temperature", self.llm.structured_temperature),
            ("llm.open_temperature", self.llm.open_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "llm.timeout_secs must be > 0".into(),
            ));
        }

        if self.pipeline.history_window == 0 || self.pipeline.answer_window == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline windows must be > 0".into(),
            ));
        }

        let threshold = self.pipeline.clarification_threshold;
        if !(chatmem_core::CLARIFICATION_THRESHOLD..=1.0).contains(&threshold) {
            return Err(ConfigError::ValidationError(format!(
                "pipeline.clarification_threshold must be between {} and 1.0",
                chatmem_core::CLARIFICATION_THRESHOLD
            )));
        }

        Ok(())
    }

    /// Sampling parameters for the completion service.
    pub fn sampling(&self) -> SamplingProfile {
        SamplingProfile {
            model: self.llm.model.clone(),
            structured_temperature: self.llm.structured_temperature,
            open_temperature: self.llm.open_temperature,
            max_tokens: self.llm.max_tokens,
        }
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for chatmem_core::error::Error {
    fn from(e: ConfigError) -> Self {
        Self::config(e.to_string())
    }
}
