//! `orderdesk ask`: answer one question on a thread, or finish a turn that
//! stopped after committing tool results (`--resume`).

use orderdesk_core::event::EventBus;
use orderdesk_core::message::ThreadId;
use std::path::Path;
use std::sync::Arc;

use super::{BoxError, build_agent, load_config};

pub async fn run(config_path: Option<&Path>, thread: &str, question: Option<&str>) -> Result<(), BoxError> {
    let config = load_config(config_path)?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ORDERDESK_API_KEY=...");
        eprintln!("    ANTHROPIC_API_KEY=...");
        eprintln!();
        eprintln!("  Or add api_key to {}", orderdesk_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let (agent, host) = build_agent(&config, Arc::new(EventBus::default())).await?;

    eprint!("  Thinking...");
    let thread_id = ThreadId::new(thread);
    let result = match question {
        Some(question) => agent.run_turn(&thread_id, question).await,
        None => agent.resume(&thread_id).await,
    };
    eprint!("\r              \r");
    host.shutdown().await;

    let outcome = result?;
    println!("{}", outcome.answer);
    Ok(())
}
