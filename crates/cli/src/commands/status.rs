//! `orderdesk status`: show configuration and health.

use orderdesk_config::AppConfig;
use std::path::Path;

use super::{BoxError, load_config};

pub async fn run(config_path: Option<&Path>) -> Result<(), BoxError> {
    let config = load_config(config_path)?;

    println!("📦 orderdesk Status");
    println!("==================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Provider:       {}", config.model.provider);
    println!("  Model:          {}", config.model.model);
    println!("  Temperature:    {}", config.model.temperature);
    println!("  Max iterations: {}", config.agent.max_iterations);
    println!("  Gateway:        {}:{}", config.gateway.host, config.gateway.port);
    println!("  Checkpoints:    {}", config.checkpoint.backend);
    println!("  Database:       {}", config.store.database.display());
    println!();

    let mut issues = 0;

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key configured: set ORDERDESK_API_KEY or ANTHROPIC_API_KEY");
        issues += 1;
    }

    if config.store.database.exists() {
        println!("  ✅ Shop database found");
    } else {
        println!("  ⚠️  No shop database: run `orderdesk seed`");
        issues += 1;
    }

    match orderdesk_memory::build_from_config(&config.checkpoint).await {
        Ok(store) => match store.list_threads().await {
            Ok(threads) => println!("  ✅ Checkpoint store ({}): {} thread(s)", store.name(), threads.len()),
            Err(e) => {
                println!("  ❌ Checkpoint store unreadable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Checkpoint store unavailable: {e}");
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
