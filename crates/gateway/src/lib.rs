//! HTTP front door for orderdesk.
//!
//! - `GET  /`       liveness probe
//! - `GET  /health` whether the agent has finished initializing
//! - `POST /chat`   `{ question, threadId }` → `{ response }`
//!
//! The listener comes up before the agent is ready: initialization (tool
//! host spawn, discovery) runs in the background and `/health` reports
//! `initializing` until it completes.

pub mod chat;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use orderdesk_agent::AgentLoop;
use orderdesk_config::GatewayConfig;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{RwLock, oneshot};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub use chat::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse};

/// Request body limit.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state: the agent, once initialized.
#[derive(Default)]
pub struct GatewayState {
    agent: RwLock<Option<Arc<AgentLoop>>>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready(agent: Arc<AgentLoop>) -> Self {
        Self {
            agent: RwLock::new(Some(agent)),
        }
    }

    pub async fn agent(&self) -> Option<Arc<AgentLoop>> {
        self.agent.read().await.clone()
    }

    pub async fn set_agent(&self, agent: Arc<AgentLoop>) {
        *self.agent.write().await = Some(agent);
    }
}

/// Build the router with all routes and layers.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(chat::root_handler))
        .route("/health", get(chat::health_handler))
        .route("/chat", post(chat::chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Serve until Ctrl-C, initializing the agent in the background.
///
/// If initialization fails the server shuts down and the error is returned.
pub async fn start<F, E>(config: &GatewayConfig, init: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = Result<Arc<AgentLoop>, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let state: SharedState = Arc::new(GatewayState::new());
    let app = build_router(Arc::clone(&state));

    let (failed_tx, failed_rx) = oneshot::channel::<String>();
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            info!("Initializing agent and tool host");
            match init.await {
                Ok(agent) => {
                    state.set_agent(agent).await;
                    info!("Agent ready");
                }
                Err(e) => {
                    error!(error = %e, "Failed to initialize agent");
                    let _ = failed_tx.send(e.to_string());
                }
            }
        });
    }

    let failure = Arc::new(RwLock::new(None::<String>));
    let shutdown = {
        let failure = Arc::clone(&failure);
        async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutting down"),
                reason = failed_rx => match reason {
                    Ok(reason) => *failure.write().await = Some(reason),
                    // Initialization succeeded; keep serving
                    Err(_) => std::future::pending::<()>().await,
                },
            }
        }
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Server running");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    match failure.read().await.clone() {
        Some(reason) => Err(format!("agent initialization failed: {reason}").into()),
        None => Ok(()),
    }
}
