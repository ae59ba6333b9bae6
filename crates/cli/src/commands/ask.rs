//! `chatmem ask` — Single-message mode.

use super::{CmdResult, load_config, open_pipeline};

pub async fn run(message: &str, session: Option<String>) -> CmdResult {
    let config = load_config()?;
    let mut pipeline = open_pipeline(&config, session, None).await?;

    eprint!("  Thinking...");
    let outcome = pipeline.handle(message).await;
    eprint!("\r              \r");

    let outcome = outcome?;
    println!("{}", outcome.reply);
    if outcome.is_clarification {
        eprintln!("  (clarification requested, session: {})", pipeline.session_id());
    }
    Ok(())
}
