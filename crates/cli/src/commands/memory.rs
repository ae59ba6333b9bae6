//! `chatmem memory` — Inspect stored session memory.

use chatmem_core::memory::SessionStore;
use chatmem_core::message::SessionId;
use chatmem_memory::FileSessionStore;

use super::{CmdResult, load_config};

pub async fn show(session: &str) -> CmdResult {
    let config = load_config()?;
    let store = FileSessionStore::new(config.memory.session_dir.clone());
    let id = SessionId::from(session);

    match store.load(&id).await? {
        Some(memory) => {
            println!("🧠 Session memory: {id}");
            println!("   File: {}\n", store.record_path(&id).display());
            println!("{}", serde_json::to_string_pretty(&memory)?);
        }
        None => println!("   No summary generated yet for session {id}."),
    }
    Ok(())
}

pub async fn clear(session: &str) -> CmdResult {
    let config = load_config()?;
    let store = FileSessionStore::new(config.memory.session_dir.clone());
    let id = SessionId::from(session);

    if store.delete(&id).await? {
        println!("🗑️  Deleted memory for session {id}.");
    } else {
        println!("   No stored memory for session {id}.");
    }
    Ok(())
}
