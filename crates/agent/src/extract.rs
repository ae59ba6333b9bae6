//! Structured-output extraction from raw model text.
//!
//! The completion endpoint has no constrained decoding, so JSON answers come
//! back wrapped in prose, Markdown fences, or not at all. [`extract`] digs
//! out the outermost `{ ... }` span and validates it against the target
//! type. When that fails, the type's fallback object is returned instead, so
//! callers see low-confidence data rather than an error. Only a target with
//! no fallback, or a fallback that does not itself validate, surfaces as
//! [`ExtractError`].

use chatmem_core::analysis::QueryAnalysis;
use chatmem_core::error::ExtractError;
use chatmem_core::memory::SessionMemory;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

/// Maximum characters of raw output echoed into a fallback object.
pub const FALLBACK_ECHO_CHARS: usize = 200;

/// A type the extractor can produce from model output.
pub trait StructuredOutput: DeserializeOwned {
    /// Schema name used in logs and errors.
    const SCHEMA: &'static str;

    /// Sentinel object used when `cleaned` holds no valid instance.
    ///
    /// `None` means the type has no safe default.
    fn fallback(cleaned: &str) -> Option<Value>;
}

impl StructuredOutput for QueryAnalysis {
    const SCHEMA: &'static str = "QueryAnalysis";

    fn fallback(cleaned: &str) -> Option<Value> {
        let echo: String = cleaned.chars().take(FALLBACK_ECHO_CHARS).collect();
        Some(json!({
            "original_query": "Unknown",
            "is_ambiguous": true,
            "ambiguity_reasons": ["System Format Error"],
            "rewritten_query": echo,
            "augmented_context": "Raw output could not be parsed.",
            "confidence_score": 0.1,
            "requires_clarification": true,
        }))
    }
}

impl StructuredOutput for SessionMemory {
    const SCHEMA: &'static str = "SessionMemory";

    fn fallback(_cleaned: &str) -> Option<Value> {
        None
    }
}

/// Remove Markdown code-fence markers and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// The span from the first `{` to the last `}`, inclusive.
pub fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Extract a `T` from raw model output, degrading to `T::fallback`.
pub fn extract<T: StructuredOutput>(raw: &str) -> Result<T, ExtractError> {
    let cleaned = strip_code_fences(raw);

    let reason = match json_object_span(&cleaned) {
        Some(candidate) => match serde_json::from_str::<T>(candidate) {
            Ok(parsed) => {
                debug!(schema = T::SCHEMA, "Structured output parsed");
                return Ok(parsed);
            }
            Err(e) => {
                warn!(schema = T::SCHEMA, error = %e, "Found {{...}} but content is invalid");
                format!("invalid JSON object: {e}")
            }
        },
        None => {
            warn!(schema = T::SCHEMA, "No JSON braces {{...}} found in response");
            "no JSON object found".to_string()
        }
    };

    let Some(fallback) = T::fallback(&cleaned) else {
        return Err(ExtractError::NoFallback {
            schema: T::SCHEMA,
            reason,
        });
    };

    warn!(schema = T::SCHEMA, "Using fallback object due to parsing failure");
    serde_json::from_value(fallback).map_err(|e| {
        error!(schema = T::SCHEMA, error = %e, "Fallback object failed validation");
        ExtractError::Fatal {
            schema: T::SCHEMA,
            reason: e.to_string(),
        }
    })
}
