//! Query resolution — rewrite or flag the user's query before answering.
//!
//! One structured completion per turn resolves pronouns against recent
//! history and long-term memory and scores how sure the model is. The stage
//! never fails: transport errors and unusable output both become a
//! low-confidence verdict that asks the user to clarify.

use std::sync::Arc;

use chatmem_core::analysis::{CLARIFICATION_THRESHOLD, QueryAnalysis};
use chatmem_core::message::Turn;
use chatmem_core::provider::{CompletionMode, Provider, SamplingProfile};
use tracing::{debug, error, info};

use crate::extract::extract;

/// Placeholder context when the model resolved nothing from history.
pub const NO_RESOLVED_CONTEXT: &str = "No specific context resolved from history.";

/// Appended to rewritten implementation or how-to queries.
pub const CODE_EXAMPLES_DIRECTIVE: &str = "Please include concrete code examples.";

const ANALYST_PROMPT: &str = r#"You are an expert Query Analyst for a RAG system.

YOUR GOAL:
1. Resolve pronouns and references (he, she, it, that, this) in the USER QUERY using CHAT HISTORY and LONG TERM MEMORY.
2. Decide whether the query is ambiguous and list the reasons.
3. If the query asks how to implement, build, configure or write something, append this sentence to 'rewritten_query': "{code_directive}"
4. Assign a 'confidence_score' based on the RUBRIC below.

=== SCORE RUBRIC (How to judge confidence) ===
- 1.0 (Certain): The query names specific entities (e.g., "FastAPI", "PostgreSQL"), explicitly asks for code, or is a clear greeting or self-introduction. Or the context resolves 'it' uniquely without any doubt.
- 0.8 (Likely): You inferred the target from context, but there is a small chance of error (e.g., user switched topics recently).
- 0.5 (Unsure): The pronoun could refer to multiple things in history.
- 0.1 (Guessing): No context available to resolve the ambiguity.

EXAMPLE INPUT:
History: [{"role": "user", "content": "I use Llama 3."}]
Query: "Is it fast?"

EXAMPLE OUTPUT (JSON):
{
    "original_query": "Is it fast?",
    "is_ambiguous": true,
    "rewritten_query": "Is Llama 3 fast?",
    "confidence_score": 0.9,
    "requires_clarification": false,
    "ambiguity_reasons": ["'it' refers to Llama 3"],
    "needed_context_from_memory": [],
    "augmented_context": "The user runs Llama 3.",
    "clarifying_questions": []
}

RESPONSE RULES:
- Output STRICT JSON only.
- ALL fields are required.
- If 'confidence_score' < 0.9, you MUST set 'requires_clarification' to true."#;

/// Produces a [`QueryAnalysis`] for each incoming query.
pub struct QueryResolver {
    provider: Arc<dyn Provider>,
    sampling: SamplingProfile,
    history_window: usize,
    clarification_threshold: f64,
}

impl QueryResolver {
    pub fn new(provider: Arc<dyn Provider>, sampling: SamplingProfile) -> Self {
        Self {
            provider,
            sampling,
            history_window: 5,
            clarification_threshold: CLARIFICATION_THRESHOLD,
        }
    }

    /// Number of most recent turns shown to the analyst.
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Raise the confidence a query needs to skip clarification. Values
    /// below [`CLARIFICATION_THRESHOLD`] are clamped up to it.
    pub fn with_clarification_threshold(mut self, threshold: f64) -> Self {
        self.clarification_threshold = threshold.max(CLARIFICATION_THRESHOLD);
        self
    }

    pub fn clarification_threshold(&self) -> f64 {
        self.clarification_threshold
    }

    /// Analyze `query` against recent history and the memory context.
    pub async fn analyze(&self, query: &str, history: &[Turn], memory_context: &str) -> QueryAnalysis {
        info!(query, "Processing query");

        let messages = vec![
            Turn::system(ANALYST_PROMPT.replace("{code_directive}", CODE_EXAMPLES_DIRECTIVE)),
            Turn::user(self.user_prompt(query, history, memory_context)),
        ];
        let request = self.sampling.request(messages, CompletionMode::Structured);

        let raw = match self.provider.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                error!(provider = self.provider.name(), error = %e, "Query analysis request failed");
                return QueryAnalysis::system_error(query);
            }
        };

        let mut analysis = match extract::<QueryAnalysis>(&raw) {
            Ok(analysis) => analysis,
            Err(e) => {
                error!(error = %e, "Query analysis output unusable");
                return QueryAnalysis::system_error(query);
            }
        };

        repair(&mut analysis, query);
        analysis.confidence_score = analysis.confidence_score.clamp(0.0, 1.0);
        analysis.enforce_clarification(self.clarification_threshold);

        debug!(
            rewritten = %analysis.rewritten_query,
            confidence = analysis.confidence_score,
            ambiguous = analysis.is_ambiguous,
            clarify = analysis.requires_clarification,
            "Query analyzed"
        );
        analysis
    }

    fn user_prompt(&self, query: &str, history: &[Turn], memory_context: &str) -> String {
        let start = history.len().saturating_sub(self.history_window);
        let recent = &history[start..];
        let history_text = if recent.is_empty() {
            "[]".to_string()
        } else {
            serde_json::to_string(recent).unwrap_or_else(|_| "[]".to_string())
        };

        format!(
            "=== LONG TERM MEMORY ===\n{memory_context}\n\n\
             === CHAT HISTORY (Most Recent) ===\n{history_text}\n\n\
             === CURRENT USER QUERY ===\n\"{query}\"\n\n\
             OUTPUT JSON:"
        )
    }
}

/// Patch fields the model commonly leaves blank.
fn repair(analysis: &mut QueryAnalysis, query: &str) {
    if analysis.rewritten_query.trim().is_empty() {
        analysis.rewritten_query = query.to_string();
    }
    if analysis.augmented_context.trim().is_empty() {
        analysis.augmented_context = NO_RESOLVED_CONTEXT.to_string();
    }
    if analysis.confidence_score == 0.0 {
        analysis.confidence_score = 0.5;
        analysis.is_ambiguous = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider};
    use chatmem_core::message::Role;

    fn resolver(provider: Arc<dyn Provider>) -> QueryResolver {
        QueryResolver::new(provider, SamplingProfile::default())
    }

    #[tokio::test]
    async fn resolves_pronoun_from_fenced_output() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            "Sure! ```json\n{\"original_query\":\"Is it fast?\",\"is_ambiguous\":true,\"rewritten_query\":\"Is Llama 3 fast?\",\"confidence_score\":0.9,\"requires_clarification\":false,\"ambiguity_reasons\":[],\"needed_context_from_memory\":[],\"clarifying_questions\":[]}\n```",
        ));
        let history = vec![Turn::user("I use Llama 3.")];

        let analysis = resolver(provider.clone())
            .analyze("Is it fast?", &history, "")
            .await;

        assert_eq!(analysis.rewritten_query, "Is Llama 3 fast?");
        assert!(!analysis.requires_clarification);
        assert_eq!(analysis.augmented_context, NO_RESOLVED_CONTEXT);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn request_carries_memory_history_and_query() {
        let provider = Arc::new(SequentialMockProvider::single_text("{}"));
        let history: Vec<Turn> = (0..8).map(|i| Turn::user(format!("turn-{i}"))).collect();

        resolver(provider.clone())
            .analyze("What about that?", &history, "{\"key_facts\": [\"likes Rust\"]}")
            .await;

        let request = &provider.requests()[0];
        assert!((request.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("SCORE RUBRIC"));
        assert!(request.messages[0].content.contains(CODE_EXAMPLES_DIRECTIVE));

        let prompt = &request.messages[1].content;
        assert!(prompt.contains("likes Rust"));
        assert!(prompt.contains("\"What about that?\""));
        assert!(!prompt.contains("turn-2"));
        assert!(prompt.contains("turn-3"));
        assert!(prompt.contains("turn-7"));
    }

    #[tokio::test]
    async fn empty_history_is_rendered_as_empty_array() {
        let provider = Arc::new(SequentialMockProvider::single_text("{}"));
        resolver(provider.clone()).analyze("Hello!", &[], "").await;
        let prompt = &provider.requests()[0].messages[1].content;
        assert!(prompt.contains("=== CHAT HISTORY (Most Recent) ===\n[]"));
    }

    #[tokio::test]
    async fn blank_fields_are_repaired() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            r#"{"rewritten_query": "   ", "augmented_context": "", "confidence_score": 0}"#,
        ));
        let analysis = resolver(provider).analyze("Deploy it", &[], "").await;

        assert_eq!(analysis.rewritten_query, "Deploy it");
        assert_eq!(analysis.augmented_context, NO_RESOLVED_CONTEXT);
        assert!((analysis.confidence_score - 0.5).abs() < f64::EPSILON);
        assert!(analysis.is_ambiguous);
        assert!(analysis.requires_clarification);
    }

    #[tokio::test]
    async fn low_confidence_forces_clarification() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            r#"{"rewritten_query": "Is the database fast?", "confidence_score": 0.8, "requires_clarification": false}"#,
        ));
        let analysis = resolver(provider).analyze("Is it fast?", &[], "").await;
        assert!(analysis.requires_clarification);
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_clamped() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"{"confidence_score": 7.5}"#,
            r#"{"confidence_score": -2.0}"#,
        ]));
        let resolver = resolver(provider);

        let high = resolver.analyze("Tell me about FastAPI", &[], "").await;
        assert!((high.confidence_score - 1.0).abs() < f64::EPSILON);
        assert!(!high.requires_clarification);

        let low = resolver.analyze("and that?", &[], "").await;
        assert_eq!(low.confidence_score, 0.0);
        assert!(low.requires_clarification);
    }

    #[tokio::test]
    async fn refusal_degrades_to_fallback_verdict() {
        let provider = Arc::new(SequentialMockProvider::single_text("I'm sorry, I cannot comply."));
        let analysis = resolver(provider).analyze("Is it fast?", &[], "").await;

        assert!((analysis.confidence_score - 0.1).abs() < f64::EPSILON);
        assert!(analysis.requires_clarification);
        assert_eq!(analysis.ambiguity_reasons, vec!["System Format Error"]);
    }

    #[tokio::test]
    async fn transport_failure_yields_system_error() {
        let analysis = resolver(Arc::new(FailingProvider))
            .analyze("Is it fast?", &[], "")
            .await;

        assert_eq!(analysis, QueryAnalysis::system_error("Is it fast?"));
    }

    #[tokio::test]
    async fn custom_threshold_is_enforced() {
        let provider = Arc::new(SequentialMockProvider::single_text(r#"{"confidence_score": 0.95}"#));
        let analysis = resolver(provider)
            .with_clarification_threshold(0.99)
            .analyze("Is FastAPI fast?", &[], "")
            .await;
        assert!(analysis.requires_clarification);
    }

    #[tokio::test]
    async fn lower_threshold_cannot_loosen_clarification() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            r#"{"confidence_score": 0.85, "requires_clarification": false}"#,
        ));
        let resolver = resolver(provider).with_clarification_threshold(0.5);
        assert_eq!(resolver.clarification_threshold(), CLARIFICATION_THRESHOLD);

        let analysis = resolver.analyze("Is it fast?", &[], "").await;
        assert!((analysis.confidence_score - 0.85).abs() < f64::EPSILON);
        assert!(analysis.requires_clarification);
    }
}
