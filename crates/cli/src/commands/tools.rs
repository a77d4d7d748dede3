//! `orderdesk tools`: list what the tool host advertises.

use orderdesk_core::event::EventBus;
use std::path::Path;
use std::sync::Arc;

use super::{BoxError, load_config, start_tool_host};

pub async fn run(config_path: Option<&Path>) -> Result<(), BoxError> {
    let config = load_config(config_path)?;
    let host = start_tool_host(&config, Arc::new(EventBus::default())).await?;

    let declarations = host.declarations().await;
    println!("🔧 {} tool(s)", declarations.len());
    for tool in &declarations {
        println!();
        println!("  {}", tool.name);
        println!("    {}", tool.description);
        for param in tool.input_schema.params() {
            println!(
                "    - {} ({:?}{})",
                param.name,
                param.kind,
                if param.required { ", required" } else { "" }
            );
        }
    }

    host.shutdown().await;
    Ok(())
}
