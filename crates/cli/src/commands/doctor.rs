//! `chatmem doctor` — Diagnose configuration and endpoint health.

use chatmem_config::AppConfig;
use chatmem_core::provider::Provider;
use chatmem_providers::OpenAiCompatProvider;

use super::CmdResult;

pub async fn run() -> CmdResult {
    println!("🩺 chatmem Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `chatmem onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    println!("     Endpoint:   {}", config.llm.api_base_url);
    println!("     Model:      {}", config.llm.model);
    println!("     Threshold:  {} tokens", config.memory.threshold_tokens);
    println!("     Sessions:   {}", config.memory.session_dir.display());

    if config.memory.session_dir.exists() {
        println!("  ✅ Session directory exists");
    } else {
        println!("  ⚠️  Session directory missing (created on first consolidation)");
    }

    match OpenAiCompatProvider::from_config(&config.llm) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Completion endpoint reachable: {}", provider.base_url()),
            Ok(false) => {
                println!("  ❌ Completion endpoint answered with an error status");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Completion endpoint unreachable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ HTTP client could not be built: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
