//! `chatmem replay` — Load a long conversation and trigger memory.

use std::path::PathBuf;

use super::{CmdResult, load_config, open_pipeline};

const DEFAULT_FIXTURE: &str = "long_conversation.jsonl";

pub async fn run(fixture: Option<PathBuf>, session: Option<String>, threshold: Option<usize>) -> CmdResult {
    let config = load_config()?;
    let path = fixture.unwrap_or_else(|| config.memory.fixtures_dir.join(DEFAULT_FIXTURE));
    let mut pipeline = open_pipeline(&config, session, threshold).await?;

    let summary = pipeline.load_fixture(&path).await?;
    println!(
        "📂 Loaded {} messages from {} into session {}",
        pipeline.turns().len(),
        path.display(),
        pipeline.session_id()
    );

    match summary {
        Some(memory) => {
            println!("🧠 Threshold ({} tokens) exceeded, session memory updated:\n", pipeline.threshold());
            println!("{}", serde_json::to_string_pretty(&memory)?);
        }
        None => println!("   Below threshold ({} tokens) or summarization failed; memory unchanged.", pipeline.threshold()),
    }
    Ok(())
}
