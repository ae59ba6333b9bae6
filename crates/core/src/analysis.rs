//! Query analysis — the verdict of query resolution for one user turn.

use serde::{Deserialize, Serialize};

/// Confidence below which an answer must not be generated without asking.
pub const CLARIFICATION_THRESHOLD: f64 = 0.9;

/// Result of resolving one user query against history and memory.
///
/// Every field defaults, and unknown fields are ignored, so any JSON object
/// the model emits validates. Transient: recomputed every turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAnalysis {
    pub original_query: String,
    pub is_ambiguous: bool,
    pub ambiguity_reasons: Vec<String>,
    pub rewritten_query: String,
    /// Keys of the session summary the answer depends on
    pub needed_context_from_memory: Vec<String>,
    pub augmented_context: String,
    pub clarifying_questions: Vec<String>,
    pub confidence_score: f64,
    pub requires_clarification: bool,
}

impl QueryAnalysis {
    /// The verdict used when resolution itself broke (transport failure,
    /// unusable model output).
    pub fn system_error(query: &str) -> Self {
        Self {
            original_query: query.to_string(),
            is_ambiguous: true,
            ambiguity_reasons: vec!["System Processing Error".into()],
            rewritten_query: query.to_string(),
            augmented_context: "System error.".into(),
            confidence_score: 0.1,
            requires_clarification: true,
            ..Self::default()
        }
    }

    /// Force `requires_clarification` whenever confidence is below `threshold`.
    ///
    /// `threshold` can only be raised: anything under
    /// [`CLARIFICATION_THRESHOLD`] is treated as that floor.
    pub fn enforce_clarification(&mut self, threshold: f64) {
        if self.confidence_score < threshold.max(CLARIFICATION_THRESHOLD) {
            self.requires_clarification = true;
        }
    }
}
