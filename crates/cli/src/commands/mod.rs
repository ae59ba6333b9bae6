pub mod ask;
pub mod chat;
pub mod doctor;
pub mod memory;
pub mod onboard;
pub mod replay;

use std::sync::Arc;

use chatmem_agent::TurnPipeline;
use chatmem_config::AppConfig;
use chatmem_core::error::Error;
use chatmem_core::message::SessionId;
use chatmem_memory::FileSessionStore;
use chatmem_providers::OpenAiCompatProvider;

pub(crate) type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) fn load_config() -> Result<AppConfig, Error> {
    Ok(AppConfig::load()?)
}

/// Build the pipeline for `session` (a fresh id when `None`).
pub(crate) async fn open_pipeline(
    config: &AppConfig,
    session: Option<String>,
    threshold: Option<usize>,
) -> Result<TurnPipeline, Box<dyn std::error::Error>> {
    if threshold == Some(0) {
        return Err(Error::config("--threshold must be greater than 0").into());
    }

    let provider = OpenAiCompatProvider::from_config(&config.llm)?;
    let store = FileSessionStore::new(config.memory.session_dir.clone());
    let session_id = session.map(|s| SessionId::from(&s)).unwrap_or_default();

    let mut pipeline =
        TurnPipeline::from_config(session_id, Arc::new(provider), Arc::new(store), config).await;
    if let Some(threshold) = threshold {
        pipeline.set_threshold(threshold);
    }
    Ok(pipeline)
}
