//! Session memory — the durable compressed state of a conversation.
//!
//! A [`SessionMemory`] replaces raw turns once a session grows past its token
//! threshold. There is at most one per session id, and consolidation always
//! replaces it wholesale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::StorageError;
use crate::message::SessionId;

/// Stable facts about the user gathered during the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub preferences: Vec<String>,

    #[serde(default)]
    pub constraints: Vec<String>,
}

/// The summary body. Every list defaults to empty so partial model output
/// still validates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub user_profile: UserProfile,

    #[serde(default)]
    pub key_facts: Vec<String>,

    #[serde(default)]
    pub decisions: Vec<String>,

    #[serde(default)]
    pub open_questions: Vec<String>,

    #[serde(default)]
    pub todos: Vec<String>,
}

/// Which slice of the transcript a summary covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRange {
    pub from_index: i64,
    pub to_index: i64,
    pub total_messages: i64,
    pub timestamp: String,
}

/// Compression bookkeeping, recomputed locally after every consolidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetadata {
    #[serde(default = "default_summary_version")]
    pub summary_version: String,

    /// `tokens_before - tokens_after`; negative when the summary grew
    pub tokens_saved: i64,

    /// `tokens_after / tokens_before`, rounded to two decimals
    pub compression_ratio: f64,
}

fn default_summary_version() -> String {
    "1.0".into()
}

/// The durable structured memory of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMemory {
    pub session_summary: SessionSummary,
    pub message_range_summarized: MessageRange,
    pub metadata: SummaryMetadata,
}

impl SessionMemory {
    /// Render the summary body as the long-term-memory context handed to
    /// query resolution (pretty JSON, two-space indent).
    pub fn context_string(&self) -> String {
        serde_json::to_string_pretty(&self.session_summary).unwrap_or_default()
    }
}

/// Durable key-value persistence of one [`SessionMemory`] per session.
///
/// Writes are whole-record, last-writer-wins overwrites.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Persist `memory` for `session_id`, replacing any previous record.
    async fn save(&self, session_id: &SessionId, memory: &SessionMemory) -> std::result::Result<(), StorageError>;

    /// Load the record for `session_id`, if one exists.
    async fn load(&self, session_id: &SessionId) -> std::result::Result<Option<SessionMemory>, StorageError>;

    /// Remove the record for `session_id`. Returns whether one existed.
    async fn delete(&self, session_id: &SessionId) -> std::result::Result<bool, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionMemory {
        SessionMemory {
            session_summary: SessionSummary {
                user_profile: UserProfile {
                    preferences: vec!["Prefers Rust".into()],
                    constraints: vec![],
                },
                key_facts: vec!["Deploys on Kubernetes".into()],
                ..SessionSummary::default()
            },
            message_range_summarized: MessageRange {
                from_index: 0,
                to_index: 41,
                total_messages: 42,
                timestamp: "2026-10-19 09:00:00".into(),
            },
            metadata: SummaryMetadata {
                summary_version: "1.0".into(),
                tokens_saved: 900,
                compression_ratio: 0.25,
            },
        }
    }

    #[test]
    fn partial_summary_fills_defaults() {
        let json = r#"{
            "session_summary": {"key_facts": ["uses Llama 3"]},
            "message_range_summarized": {"from_index": 0, "to_index": 3, "total_messages": 4, "timestamp": "now"},
            "metadata": {"tokens_saved": 0, "compression_ratio": 0.0},
            "extra": "ignored"
        }"#;
        let memory: SessionMemory = serde_json::from_str(json).unwrap();
        assert_eq!(memory.session_summary.key_facts, vec!["uses Llama 3"]);
        assert!(memory.session_summary.user_profile.preferences.is_empty());
        assert_eq!(memory.metadata.summary_version, "1.0");
    }

    #[test]
    fn missing_range_is_rejected() {
        let json = r#"{"session_summary": {}, "metadata": {"tokens_saved": 0, "compression_ratio": 0.5}}"#;
        assert!(serde_json::from_str::<SessionMemory>(json).is_err());
    }

    #[test]
    fn context_string_is_pretty_summary() {
        let ctx = sample().context_string();
        assert!(ctx.contains("\n  \"user_profile\""));
        assert!(ctx.contains("Deploys on Kubernetes"));
        assert!(!ctx.contains("compression_ratio"));
    }
}
