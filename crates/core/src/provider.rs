//! Provider trait — the abstraction over the remote completion service.
//!
//! A Provider knows how to send an ordered list of turns to a chat-completion
//! endpoint and get generated text back. The model itself is a black box;
//! callers must assume its output can be malformed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Turn;

/// How the caller intends to use the generated text.
///
/// The completion API offers no real constrained decoding, so structured
/// mode only lowers the sampling temperature. Callers still have to validate
/// whatever comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// A JSON object is expected (low temperature)
    Structured,
    /// Free-form answer generation
    Open,
}

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "meta-llama/Meta-Llama-3-8B-Instruct")
    pub model: String,

    /// The conversation turns, in order
    pub messages: Vec<Turn>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// Sampling parameters applied per [`CompletionMode`].
#[derive(Debug, Clone)]
pub struct SamplingProfile {
    pub model: String,
    pub structured_temperature: f32,
    pub open_temperature: f32,
    pub max_tokens: u32,
}

impl SamplingProfile {
    /// Build a request for `messages` using the temperature of `mode`.
    pub fn request(&self, messages: Vec<Turn>, mode: CompletionMode) -> ProviderRequest {
        let temperature = match mode {
            CompletionMode::Structured => self.structured_temperature,
            CompletionMode::Open => self.open_temperature,
        };
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens: Some(self.max_tokens),
        }
    }
}

impl Default for SamplingProfile {
    fn default() -> Self {
        Self {
            model: "meta-llama/Meta-Llama-3-8B-Instruct".into(),
            structured_temperature: 0.1,
            open_temperature: default_temperature(),
            max_tokens: 2048,
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub content: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// Each call is a single blocking request bounded by the provider's timeout.
/// There is no retry at this layer.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "vllm", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
