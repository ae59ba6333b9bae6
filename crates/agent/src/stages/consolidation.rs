//! Memory consolidation — threshold-triggered compression of a session.
//!
//! Once the estimated token cost of the transcript reaches the threshold, the
//! whole history is sent to the model with a fixed summary schema. A valid
//! summary replaces the session's memory wholesale and is persisted; any
//! failure leaves the previous memory exactly as it was.
//!
//! Readers of [`MemoryConsolidator::current`] never observe a half-written
//! record: the slot is swapped under its write lock only after the store has
//! finished, and concurrent consolidations of one session are serialized.

use std::sync::Arc;

use chatmem_core::memory::{SessionMemory, SessionStore};
use chatmem_core::message::{SessionId, Turn};
use chatmem_core::provider::{CompletionMode, Provider, SamplingProfile};
use chrono::Local;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::extract::extract;
use crate::token::{estimate_tokens, estimate_turns_tokens};

const SUMMARY_PROMPT: &str = r#"You are a Memory Manager AI. Your goal is to condense conversation history into a structured JSON summary.
Capture user profiles, key facts, decisions, open questions, and todos.
OUTPUT MUST BE VALID JSON ONLY. NO EXPLANATION.
Schema:
{
  "session_summary": {
    "user_profile": {"preferences": [], "constraints": []},
    "key_facts": [],
    "decisions": [],
    "open_questions": [],
    "todos": []
  },
  "message_range_summarized": {
    "from_index": <int>,
    "to_index": <int>,
    "total_messages": <int>,
    "timestamp": "<iso_str>"
  },
  "metadata": {
    "summary_version": "1.0",
    "tokens_saved": <int>,
    "compression_ratio": <float>
  }
}"#;

/// Owns the memory slot of one session and refreshes it from the transcript.
pub struct MemoryConsolidator {
    session_id: SessionId,
    provider: Arc<dyn Provider>,
    store: Arc<dyn SessionStore>,
    sampling: SamplingProfile,
    current: RwLock<Option<SessionMemory>>,
    writer: Mutex<()>,
}

impl MemoryConsolidator {
    /// Open the consolidator for `session_id`, loading any stored memory.
    ///
    /// A store that cannot be read is treated as holding no memory.
    pub async fn open(
        session_id: SessionId,
        provider: Arc<dyn Provider>,
        store: Arc<dyn SessionStore>,
        sampling: SamplingProfile,
    ) -> Self {
        let current = match store.load(&session_id).await {
            Ok(memory) => {
                debug!(session_id = %session_id, found = memory.is_some(), "Session memory loaded");
                memory
            }
            Err(e) => {
                warn!(session_id = %session_id, store = store.name(), error = %e, "Could not load session memory, starting empty");
                None
            }
        };

        Self {
            session_id,
            provider,
            store,
            sampling,
            current: RwLock::new(current),
            writer: Mutex::new(()),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Snapshot of the current memory.
    pub async fn current(&self) -> Option<SessionMemory> {
        self.current.read().await.clone()
    }

    /// The summary body as pretty JSON, or an empty string without memory.
    pub async fn context_string(&self) -> String {
        self.current
            .read()
            .await
            .as_ref()
            .map(SessionMemory::context_string)
            .unwrap_or_default()
    }

    /// Summarize `turns` if their estimated cost reaches `threshold`.
    ///
    /// Returns the new memory, or `None` when below threshold or when the
    /// summary could not be produced.
    pub async fn consolidate(&self, turns: &[Turn], threshold: usize) -> Option<SessionMemory> {
        let tokens_before = estimate_turns_tokens(turns);
        info!(session_id = %self.session_id, tokens = tokens_before, threshold, "Current context tokens");

        if tokens_before == 0 || tokens_before < threshold {
            return None;
        }

        let _writer = self.writer.lock().await;
        info!(session_id = %self.session_id, "Threshold exceeded, summarizing");

        let mut memory = self.summarize(turns).await?;

        let serialized = match serde_json::to_string(&memory) {
            Ok(s) => s,
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Summary could not be measured");
                return None;
            }
        };
        let tokens_after = estimate_tokens(&serialized);
        memory.metadata.tokens_saved = tokens_before as i64 - tokens_after as i64;
        memory.metadata.compression_ratio = round2(tokens_after as f64 / tokens_before as f64);

        let mut slot = self.current.write().await;
        if let Err(e) = self.store.save(&self.session_id, &memory).await {
            warn!(session_id = %self.session_id, store = self.store.name(), error = %e, "Session memory not persisted");
        }
        *slot = Some(memory.clone());

        info!(
            session_id = %self.session_id,
            tokens_before,
            tokens_after,
            tokens_saved = memory.metadata.tokens_saved,
            compression_ratio = memory.metadata.compression_ratio,
            "Session memory consolidated"
        );
        Some(memory)
    }

    async fn summarize(&self, turns: &[Turn]) -> Option<SessionMemory> {
        let transcript = match serde_json::to_string(turns) {
            Ok(t) => t,
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Transcript could not be serialized");
                return None;
            }
        };
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        let messages = vec![
            Turn::system(SUMMARY_PROMPT),
            Turn::user(format!(
                "Current Date & Time: {now}\n\nSummarize these messages into JSON:\n{transcript}"
            )),
        ];
        let request = self.sampling.request(messages, CompletionMode::Structured);

        let raw = match self.provider.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Summarization request failed");
                return None;
            }
        };

        match extract::<SessionMemory>(&raw) {
            Ok(memory) => Some(memory),
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Summarization failed");
                None
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
