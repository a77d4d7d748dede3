//! Subcommand implementations and the wiring they share.

pub mod ask;
pub mod seed;
pub mod serve;
pub mod status;
pub mod tool_host;
pub mod tools;

use orderdesk_agent::AgentLoop;
use orderdesk_config::AppConfig;
use orderdesk_core::event::EventBus;
use orderdesk_mcp::{HostOptions, ProcessConnector, ToolHost};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Load configuration from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, BoxError> {
    let loaded = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    loaded.map_err(|e| format!("Failed to load config: {e}").into())
}

/// This binary, re-invoked as `tool-host`, unless configured otherwise.
fn default_host_command(config: &AppConfig) -> Result<(PathBuf, Vec<String>), BoxError> {
    let exe = std::env::current_exe()?;
    let args = vec![
        "tool-host".to_string(),
        "--db".to_string(),
        config.store.database.display().to_string(),
    ];
    Ok((exe, args))
}

/// Spawn the tool host and discover its tools.
pub async fn start_tool_host(config: &AppConfig, events: Arc<EventBus>) -> Result<Arc<ToolHost>, BoxError> {
    let connector = ProcessConnector::from_config(&config.tool_host, default_host_command(config)?);
    let host = Arc::new(
        ToolHost::new(Arc::new(connector), HostOptions::from(&config.tool_host)).with_events(events),
    );
    let tools = host.start().await?;
    info!(
        tools = %tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", "),
        "Tools loaded"
    );
    Ok(host)
}

/// Build the full orchestrator: provider, tool host, checkpoint store.
pub async fn build_agent(
    config: &AppConfig,
    events: Arc<EventBus>,
) -> Result<(Arc<AgentLoop>, Arc<ToolHost>), BoxError> {
    let provider = orderdesk_providers::build_from_config(config)?;
    let host = start_tool_host(config, Arc::clone(&events)).await?;
    host.spawn_supervisor();

    let tools = Arc::new(host.registry().await);
    let checkpoints = orderdesk_memory::build_from_config(&config.checkpoint).await?;
    info!(backend = checkpoints.name(), "Checkpoint store ready");

    let agent = AgentLoop::from_config(config, provider, tools, checkpoints, events);
    Ok((Arc::new(agent), host))
}
