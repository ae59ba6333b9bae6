//! In-memory session store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chatmem_core::error::StorageError;
use chatmem_core::memory::{SessionMemory, SessionStore};
use chatmem_core::message::SessionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A session store that keeps records in a map.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Clone)]
pub struct InMemorySessionStore {
    records: Arc<RwLock<HashMap<SessionId, SessionMemory>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn save(&self, session_id: &SessionId, memory: &SessionMemory) -> Result<(), StorageError> {
        self.records
            .write()
            .await
            .insert(session_id.clone(), memory.clone());
        Ok(())
    }

    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionMemory>, StorageError> {
        Ok(self.records.read().await.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, StorageError> {
        Ok(self.records.write().await.remove(session_id).is_some())
    }
}
