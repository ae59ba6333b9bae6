//! `chatmem chat` — Interactive chat mode.

use std::io::Write;

use chatmem_agent::TurnPipeline;
use chatmem_core::message::SessionId;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use super::{CmdResult, load_config, open_pipeline};

/// A line typed at the prompt.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Exit,
    Session(&'a str),
    ShowMemory,
    ShowLog,
    Unknown(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    match line {
        "/exit" | "/quit" | "exit" | "quit" => Input::Exit,
        "/memory" => Input::ShowMemory,
        "/log" => Input::ShowLog,
        _ => match line.strip_prefix("/session ") {
            Some(rest) if !rest.trim().is_empty() => Input::Session(rest.trim()),
            _ if line.starts_with('/') => Input::Unknown(line),
            _ => Input::Message(line),
        },
    }
}

pub async fn run(session: Option<String>, threshold: Option<usize>) -> CmdResult {
    let config = load_config()?;
    let mut pipeline = open_pipeline(&config, session, threshold).await?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║         chatmem — Interactive Mode           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Endpoint:  {}", config.llm.api_base_url);
    println!("  Model:     {}", config.llm.model);
    println!("  Session:   {}", pipeline.session_id());
    println!("  Threshold: {} tokens", pipeline.threshold());
    println!(
        "  Memory:    {}",
        if pipeline.current_memory().await.is_some() { "loaded" } else { "none yet" }
    );
    println!();
    println!("  Commands: /session <id>, /memory, /log, /exit");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }

        match parse_input(line) {
            Input::Exit => break,
            Input::Session(id) => {
                pipeline.switch_session(SessionId::from(id)).await;
                let status = if pipeline.current_memory().await.is_some() {
                    "memory loaded"
                } else {
                    "no memory yet"
                };
                println!("  Switched to session {id} ({status})\n");
            }
            Input::ShowMemory => print_memory(&pipeline).await?,
            Input::ShowLog => print_log(&pipeline)?,
            Input::Unknown(cmd) => println!("  Unknown command: {cmd}\n"),
            Input::Message(text) => {
                eprint!("  ...");
                let result = pipeline.handle(text).await;
                eprint!("\r     \r");

                match result {
                    Ok(outcome) => {
                        println!();
                        if outcome.consolidated.is_some() {
                            println!("  [Threshold exceeded, history summarized]");
                        }
                        for line in outcome.reply.lines() {
                            println!("  Assistant > {line}");
                        }
                        if outcome.is_clarification {
                            println!("  (I need a bit more detail to answer accurately.)");
                        }
                        println!();
                    }
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

async fn print_memory(pipeline: &TurnPipeline) -> CmdResult {
    match pipeline.current_memory().await {
        Some(memory) => println!("{}\n", serde_json::to_string_pretty(&memory)?),
        None => println!("  No summary generated yet.\n"),
    }
    Ok(())
}

fn print_log(pipeline: &TurnPipeline) -> CmdResult {
    let log = pipeline.pipeline_log();
    if log.is_empty() {
        println!("  Pipeline log is empty.\n");
    }
    for entry in log.iter().rev() {
        println!("  ── {} ──", entry.step);
        println!("{}\n", serde_json::to_string_pretty(&entry.details)?);
    }
    Ok(())
}
