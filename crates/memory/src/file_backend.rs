//! File-based session store — one JSON document per session.
//!
//! Storage location: `<session_dir>/<session_id>_memory.json`, pretty-printed
//! so records stay human-inspectable. Every save rewrites the whole document
//! (written to a sibling temp file, then renamed into place), so readers see
//! either the previous record or the new one, never a mix.

use async_trait::async_trait;
use chatmem_core::error::StorageError;
use chatmem_core::memory::{SessionMemory, SessionStore};
use chatmem_core::message::SessionId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A directory of per-session JSON memory records.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File session store opened");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `session_id`.
    ///
    /// The id is percent-encoded: only `[A-Za-z0-9._~-]` survive as-is, so
    /// distinct ids never share a file and none can leave the directory.
    pub fn record_path(&self, session_id: &SessionId) -> PathBuf {
        let encoded = urlencoding::encode(session_id.as_str());
        self.dir.join(format!("{encoded}_memory.json"))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, session_id: &SessionId, memory: &SessionMemory) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let path = self.record_path(session_id);
        let content = serde_json::to_string_pretty(memory)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content.as_bytes())
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        info!(session_id = %session_id, path = %path.display(), "Saved session memory");
        Ok(())
    }

    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionMemory>, StorageError> {
        let path = self.record_path(session_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        let memory = serde_json::from_str::<SessionMemory>(&content).map_err(|e| {
            StorageError::Corrupt {
                session_id: session_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!(session_id = %session_id, "Loaded session memory");
        Ok(Some(memory))
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, StorageError> {
        let path = self.record_path(session_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmem_core::memory::{MessageRange, SessionSummary, SummaryMetadata, UserProfile};

    fn sample_memory() -> SessionMemory {
        SessionMemory {
            session_summary: SessionSummary {
                user_profile: UserProfile {
                    preferences: vec!["Likes concise answers".into()],
                    constraints: vec!["Budget under $50/month".into()],
                },
                key_facts: vec!["Runs Llama 3 8B on vLLM".into()],
                decisions: vec!["Use PostgreSQL".into()],
                open_questions: vec!["Which region?".into()],
                todos: vec!["Benchmark latency".into()],
            },
            message_range_summarized: MessageRange {
                from_index: 0,
                to_index: 29,
                total_messages: 30,
                timestamp: "2026-10-19 10:15:00".into(),
            },
            metadata: SummaryMetadata {
                summary_version: "1.0".into(),
                tokens_saved: 1042,
                compression_ratio: 0.13,
            },
        }
    }

    #[tokio::test]
    async fn save_and_reload_roundtrips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let id = SessionId::from("demo_session_01");
        let memory = sample_memory();

        let store = FileSessionStore::new(dir.path().join("sessions"));
        store.save(&id, &memory).await.unwrap();

        // Reload through a fresh store instance
        let store2 = FileSessionStore::new(dir.path().join("sessions"));
        let loaded = store2.load(&id).await.unwrap();
        assert_eq!(loaded, Some(memory));
    }

    #[tokio::test]
    async fn record_lives_at_expected_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = SessionId::from("alpha");
        store.save(&id, &sample_memory()).await.unwrap();

        let path = dir.path().join("alpha_memory.json");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"compression_ratio\": 0.13"));
        assert!(!dir.path().join("alpha_memory.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = SessionId::from("s1");

        store.save(&id, &sample_memory()).await.unwrap();
        let mut replacement = sample_memory();
        replacement.session_summary.key_facts = vec!["Switched to Mistral".into()];
        store.save(&id, &replacement).await.unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.session_summary.key_facts, vec!["Switched to Mistral"]);
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.load(&SessionId::from("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupted_record_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken_memory.json"), "{ not json").unwrap();
        let store = FileSessionStore::new(dir.path());
        let err = store.load(&SessionId::from("broken")).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.save(&SessionId::from("a"), &sample_memory()).await.unwrap();
        assert!(store.load(&SessionId::from("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = SessionId::from("gone");
        store.save(&id, &sample_memory()).await.unwrap();

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(store.load(&id).await.unwrap().is_none());
    }

    #[test]
    fn path_traversal_is_neutralized() {
        let store = FileSessionStore::new("/var/chatmem/sessions");
        let path = store.record_path(&SessionId::from("../../etc/passwd"));
        assert_eq!(path.parent(), Some(Path::new("/var/chatmem/sessions")));
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "..%2F..%2Fetc%2Fpasswd_memory.json"
        );
    }

    #[tokio::test]
    async fn lookalike_ids_keep_separate_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let mut alice = sample_memory();
        alice.session_summary.key_facts = vec!["alice secret".into()];
        store.save(&SessionId::from("team/alice"), &alice).await.unwrap();

        for other in ["team_alice", "team%2Falice", "team:alice", "team alice"] {
            assert!(
                store.load(&SessionId::from(other)).await.unwrap().is_none(),
                "{other} resolved to another session's record"
            );
        }

        store.save(&SessionId::from("team_alice"), &sample_memory()).await.unwrap();
        let reloaded = store.load(&SessionId::from("team/alice")).await.unwrap().unwrap();
        assert_eq!(reloaded.session_summary.key_facts, vec!["alice secret"]);
    }

    #[test]
    fn non_ascii_ids_are_encoded() {
        let store = FileSessionStore::new("/s");
        let path = store.record_path(&SessionId::from("café"));
        assert_eq!(path.file_name().unwrap().to_string_lossy(), "caf%C3%A9_memory.json");
    }
}
