//! The per-turn pipeline: consolidate, resolve, then clarify or answer.
//!
//! # Flow
//!
//! 1. Consolidate the turns recorded so far against the session threshold
//! 2. Render the session summary as long-term-memory context
//! 3. Resolve the query and apply the clarification override
//! 4. Either ask a clarifying question, or assemble the final prompt and
//!    generate an answer
//! 5. Record the user turn and the reply

use std::path::Path;
use std::sync::Arc;

use chatmem_config::AppConfig;
use chatmem_core::analysis::{CLARIFICATION_THRESHOLD, QueryAnalysis};
use chatmem_core::error::Result;
use chatmem_core::memory::{SessionMemory, SessionStore};
use chatmem_core::message::{SessionId, Turn};
use chatmem_core::provider::{CompletionMode, Provider, SamplingProfile};
use chatmem_memory::load_turn_fixture;
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};

use crate::stages::{MemoryConsolidator, QueryResolver};

/// Reply used when a clarification is required but no question was given.
pub const DEFAULT_CLARIFICATION: &str = "Could you please clarify?";

const NO_CONTEXT_FOUND: &str = "No specific context found.";

/// Step name logged when consolidation produced a new memory.
pub const STEP_MEMORY_TRIGGERED: &str = "Memory Triggered";
/// Step name logged for every query analysis.
pub const STEP_QUERY_ANALYSIS: &str = "Query Analysis";

/// Tunables of the pipeline, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub threshold_tokens: usize,
    pub history_window: usize,
    pub answer_window: usize,
    pub clarification_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            threshold_tokens: config.memory.threshold_tokens,
            history_window: config.pipeline.history_window,
            answer_window: config.pipeline.answer_window,
            clarification_threshold: config.pipeline.clarification_threshold,
        }
    }
}

/// One inspectable pipeline event.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineLogEntry {
    pub step: String,
    pub details: serde_json::Value,
}

impl PipelineLogEntry {
    fn new(step: &str, details: &impl Serialize) -> Self {
        Self {
            step: step.to_string(),
            details: serde_json::to_value(details).unwrap_or_default(),
        }
    }
}

/// Result of handling one user query.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The text shown to the user
    pub reply: String,
    /// Whether the reply asks the user to clarify
    pub is_clarification: bool,
    pub analysis: QueryAnalysis,
    /// Memory produced by consolidation at the start of this turn
    pub consolidated: Option<SessionMemory>,
}

/// A chat session driven turn by turn.
pub struct TurnPipeline {
    provider: Arc<dyn Provider>,
    store: Arc<dyn SessionStore>,
    sampling: SamplingProfile,
    settings: PipelineSettings,
    resolver: QueryResolver,
    consolidator: MemoryConsolidator,
    turns: Vec<Turn>,
    log: Vec<PipelineLogEntry>,
}

impl TurnPipeline {
    /// Open `session_id`, loading its stored memory.
    pub async fn open(
        session_id: SessionId,
        provider: Arc<dyn Provider>,
        store: Arc<dyn SessionStore>,
        sampling: SamplingProfile,
        settings: PipelineSettings,
    ) -> Self {
        let resolver = QueryResolver::new(provider.clone(), sampling.clone())
            .with_history_window(settings.history_window)
            .with_clarification_threshold(settings.clarification_threshold);
        let consolidator =
            MemoryConsolidator::open(session_id, provider.clone(), store.clone(), sampling.clone()).await;

        Self {
            provider,
            store,
            sampling,
            settings,
            resolver,
            consolidator,
            turns: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Open `session_id` with sampling and tunables from `config`.
    pub async fn from_config(
        session_id: SessionId,
        provider: Arc<dyn Provider>,
        store: Arc<dyn SessionStore>,
        config: &AppConfig,
    ) -> Self {
        Self::open(session_id, provider, store, config.sampling(), PipelineSettings::from(config)).await
    }

    pub fn session_id(&self) -> &SessionId {
        self.consolidator.session_id()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn pipeline_log(&self) -> &[PipelineLogEntry] {
        &self.log
    }

    pub fn threshold(&self) -> usize {
        self.settings.threshold_tokens
    }

    pub fn set_threshold(&mut self, threshold_tokens: usize) {
        self.settings.threshold_tokens = threshold_tokens;
    }

    pub async fn current_memory(&self) -> Option<SessionMemory> {
        self.consolidator.current().await
    }

    /// Switch to another session: in-memory turns and the log are dropped
    /// and the new session's stored memory is loaded.
    pub async fn switch_session(&mut self, session_id: SessionId) {
        info!(from = %self.session_id(), to = %session_id, "Switching session");
        self.consolidator = MemoryConsolidator::open(
            session_id,
            self.provider.clone(),
            self.store.clone(),
            self.sampling.clone(),
        )
        .await;
        self.turns.clear();
        self.log.clear();
    }

    /// Replace the transcript with pre-recorded turns and consolidate them.
    pub async fn load_turns(&mut self, turns: Vec<Turn>) -> Option<SessionMemory> {
        info!(session_id = %self.session_id(), count = turns.len(), "Loaded conversation");
        self.turns = turns;
        let summary = self
            .consolidator
            .consolidate(&self.turns, self.settings.threshold_tokens)
            .await;
        if let Some(memory) = &summary {
            self.log.push(PipelineLogEntry::new(STEP_MEMORY_TRIGGERED, memory));
        }
        summary
    }

    /// Load a JSON-lines conversation fixture, then consolidate it.
    pub async fn load_fixture(&mut self, path: &Path) -> Result<Option<SessionMemory>> {
        let turns = load_turn_fixture(path).await?;
        Ok(self.load_turns(turns).await)
    }

    /// Handle one user query.
    ///
    /// Only a failed final answer generation is an error; the turn is not
    /// recorded in that case.
    pub async fn handle(&mut self, query: &str) -> Result<TurnOutcome> {
        let user_turn = Turn::user(query);

        let consolidated = self
            .consolidator
            .consolidate(&self.turns, self.settings.threshold_tokens)
            .await;
        if let Some(memory) = &consolidated {
            self.log.push(PipelineLogEntry::new(STEP_MEMORY_TRIGGERED, memory));
        }

        let memory_context = self.consolidator.context_string().await;
        let mut analysis = self.resolver.analyze(query, &self.turns, &memory_context).await;
        apply_clarification_override(&mut analysis, query, self.settings.clarification_threshold);
        self.log.push(PipelineLogEntry::new(STEP_QUERY_ANALYSIS, &analysis));

        let reply_turn = if analysis.requires_clarification {
            let question = analysis
                .clarifying_questions
                .first()
                .map(String::as_str)
                .unwrap_or(DEFAULT_CLARIFICATION);
            info!(confidence = analysis.confidence_score, "Ambiguous request, asking for clarification");
            Turn::clarification(question)
        } else {
            let messages = self.final_prompt(&analysis).await;
            let request = self.sampling.request(messages, CompletionMode::Open);
            let response = self.provider.complete(request).await?;
            debug!(model = %response.model, "Answer generated");
            let mut turn = Turn::assistant(response.content);
            turn.is_clarification = Some(false);
            turn
        };

        let outcome = TurnOutcome {
            reply: reply_turn.content.clone(),
            is_clarification: reply_turn.is_clarification(),
            analysis,
            consolidated,
        };
        self.turns.push(user_turn);
        self.turns.push(reply_turn);
        Ok(outcome)
    }

    /// System instructions, the recent window of plain turns, then the
    /// rewritten query.
    async fn final_prompt(&self, analysis: &QueryAnalysis) -> Vec<Turn> {
        let mut system = format!(
            "You are a helpful AI assistant.\nCurrent Date: {}\n\n=== USER INFORMATION ===\n",
            Local::now().format("%Y-%m-%d")
        );
        if let Some(memory) = self.consolidator.current().await {
            let facts = serde_json::to_string(&memory.session_summary.key_facts).unwrap_or_default();
            system.push_str(&format!("User Profile/Facts: {facts}\n"));
        }
        let context = if analysis.augmented_context.trim().is_empty() {
            NO_CONTEXT_FOUND
        } else {
            analysis.augmented_context.as_str()
        };
        system.push_str(&format!(
            "\n=== CONTEXT ===\n{context}\n\n\
             INSTRUCTIONS:\n\
             - Answer the user's question using the CONTEXT.\n\
             - Maintain a helpful tone."
        ));

        let start = self.turns.len().saturating_sub(self.settings.answer_window);
        let mut messages = Vec::with_capacity(self.turns.len() - start + 2);
        messages.push(Turn::system(system));
        messages.extend(
            self.turns[start..]
                .iter()
                .map(|t| Turn { timestamp: None, is_clarification: None, ..t.clone() }),
        );
        messages.push(Turn::user(analysis.rewritten_query.clone()));
        messages
    }
}

/// Force clarification for ambiguous, low-confidence verdicts and make sure
/// there is a question to ask.
pub fn apply_clarification_override(analysis: &mut QueryAnalysis, query: &str, threshold: f64) {
    if analysis.is_ambiguous && analysis.confidence_score < threshold.max(CLARIFICATION_THRESHOLD) {
        analysis.requires_clarification = true;
        if analysis.clarifying_questions.is_empty() {
            analysis.clarifying_questions = vec![
                format!("I'm not 100% sure what '{query}' refers to in this context. Could you clarify?"),
                format!("Are you asking about {}?", analysis.rewritten_query),
            ];
        }
    }
}
