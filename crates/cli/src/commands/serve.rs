//! `orderdesk serve`: start the HTTP server.

use orderdesk_core::event::{DomainEvent, EventBus};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{BoxError, build_agent, load_config};

pub async fn run(config_path: Option<&Path>, port: Option<u16>) -> Result<(), BoxError> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if !config.has_api_key() {
        warn!("No API key configured; set ORDERDESK_API_KEY or ANTHROPIC_API_KEY");
    }

    println!("📦 orderdesk");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model.model);
    println!("   Database:  {}", config.store.database.display());

    let events = Arc::new(EventBus::default());
    spawn_event_logger(&events);

    let gateway = config.gateway.clone();
    let init = async move {
        let (agent, _host) = build_agent(&config, events).await?;
        Ok::<_, BoxError>(agent)
    };
    orderdesk_gateway::start(&gateway, init).await.map_err(|e| e.to_string())?;
    Ok(())
}

/// Log domain events as they happen.
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    DomainEvent::TurnStarted { thread_id, question_preview, .. } => {
                        debug!(thread_id = %thread_id, question = %question_preview, "event: turn started");
                    }
                    DomainEvent::ToolExecuted { thread_id, tool_name, is_error, duration_ms, .. } => {
                        info!(thread_id = %thread_id, tool = %tool_name, is_error, duration_ms, "event: tool executed");
                    }
                    DomainEvent::TurnCompleted { thread_id, iterations, tool_calls, .. } => {
                        info!(thread_id = %thread_id, iterations, tool_calls, "event: turn completed");
                    }
                    DomainEvent::TurnFailed { thread_id, error_kind, .. } => {
                        warn!(thread_id = %thread_id, kind = %error_kind, "event: turn failed");
                    }
                    DomainEvent::ToolHostRestarted { attempt, reason, .. } => {
                        warn!(attempt, reason = %reason, "event: tool host restarted");
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
