//! `chatmem onboard` — First-time setup.

use chatmem_config::AppConfig;

use super::CmdResult;

pub async fn run() -> CmdResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let defaults = AppConfig::default();

    println!("🧠 chatmem — First-Time Setup");
    println!("=============================\n");

    for dir in [&config_dir, &defaults.memory.session_dir, &defaults.memory.fixtures_dir] {
        if dir.exists() {
            println!("  Directory exists: {}", dir.display());
        } else {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created directory: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Point llm.api_base_url at your OpenAI-compatible server");
        println!("   2. Run: chatmem doctor");
        println!("   3. Run: chatmem chat\n");
    }

    println!("🎉 Setup complete! Run `chatmem chat` to start chatting.\n");
    Ok(())
}
