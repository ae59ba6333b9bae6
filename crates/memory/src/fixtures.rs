//! Conversation fixtures — pre-recorded turns in JSON-lines form.
//!
//! Used to seed long conversations that push a session over its
//! consolidation threshold. Each non-blank line is either a bare turn
//! (`{"role": ..., "content": ...}`) or a wrapped one
//! (`{"message": {"role": ..., "content": ...}, ...}`).

use chatmem_core::error::StorageError;
use chatmem_core::message::Turn;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureLine {
    Wrapped { message: Turn },
    Bare(Turn),
}

impl FixtureLine {
    fn into_turn(self) -> Turn {
        match self {
            FixtureLine::Wrapped { message } => message,
            FixtureLine::Bare(turn) => turn,
        }
    }
}

/// Parse fixture content. Corrupted lines are skipped with a warning.
pub fn parse_turn_fixture(content: &str) -> Vec<Turn> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<FixtureLine>(line) {
            Ok(parsed) => Some(parsed.into_turn()),
            Err(e) => {
                warn!(line = idx + 1, error = %e, "Skipping corrupted fixture line");
                None
            }
        })
        .collect()
}

/// Load an ordered sequence of turns from a JSONL fixture file.
pub async fn load_turn_fixture(path: &Path) -> Result<Vec<Turn>, StorageError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StorageError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let turns = parse_turn_fixture(&content);
    debug!(path = %path.display(), count = turns.len(), "Loaded conversation fixture");
    Ok(turns)
}
