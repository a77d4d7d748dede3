//! Tool host lifecycle: spawn, handshake, discovery, health check, restart.
//!
//! [`ToolHost`] owns at most one live [`Connection`]. Calls borrow it; when
//! it is found broken the next caller reconnects (bounded attempts with
//! linear backoff). A supervisor task pings the host on an interval and
//! restarts it when the ping fails, keeping that work off the call path.

use async_trait::async_trait;
use chrono::Utc;
use orderdesk_config::ToolHostConfig;
use orderdesk_core::error::TransportError;
use orderdesk_core::event::{DomainEvent, EventBus};
use orderdesk_core::tool::{ToolDeclaration, ToolRegistry};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::protocol::{CallToolParams, CallToolResult, ListToolsResult, PROTOCOL_VERSION, method};
use crate::remote_tool::RemoteTool;

/// A freshly opened byte stream to a tool host.
pub struct Connected {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
    /// The child process, when the host is one.
    pub child: Option<Child>,
}

/// Opens streams to a tool host. The production connector spawns a child
/// process; tests connect to an in-process server.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connected, TransportError>;

    /// Human-readable target, for logs.
    fn describe(&self) -> String;
}

/// Spawns the tool host as a child process speaking over stdin/stdout.
#[derive(Debug, Clone)]
pub struct ProcessConnector {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl ProcessConnector {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Build from configuration. An empty command means `fallback`.
    pub fn from_config(config: &ToolHostConfig, fallback: (PathBuf, Vec<String>)) -> Self {
        let (program, args) = match config.command.split_first() {
            Some((program, args)) => (PathBuf::from(program), args.to_vec()),
            None => fallback,
        };
        Self::new(program, args).with_env(config.env.clone())
    }
}

#[async_trait]
impl Connector for ProcessConnector {
    async fn connect(&self) -> Result<Connected, TransportError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // Host logs go to our stderr
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| TransportError::SpawnFailed(format!("{}: {e}", self.describe())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::SpawnFailed("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::SpawnFailed("child stdout unavailable".into()))?;

        Ok(Connected {
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            child: Some(child),
        })
    }

    fn describe(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Timeouts and restart policy.
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub call_timeout: Duration,
    pub max_restarts: u32,
    pub restart_backoff: Duration,
    /// Zero disables the supervisor.
    pub health_interval: Duration,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self::from(&ToolHostConfig::default())
    }
}

impl From<&ToolHostConfig> for HostOptions {
    fn from(config: &ToolHostConfig) -> Self {
        Self {
            call_timeout: config.call_timeout(),
            max_restarts: config.max_restarts,
            restart_backoff: config.restart_backoff(),
            health_interval: Duration::from_secs(config.health_interval_secs),
        }
    }
}

struct Live {
    connection: Arc<Connection>,
    child: Option<Child>,
    /// How the child exited, shared with callers still holding the connection.
    exit: Arc<OnceLock<String>>,
}

impl Live {
    fn handle(&self) -> LiveHandle {
        LiveHandle {
            connection: Arc::clone(&self.connection),
            exit: Arc::clone(&self.exit),
        }
    }

    /// The child's exit status, once it has exited. Recorded the first time
    /// it is seen so it outlives this `Live`.
    fn exit_status(&mut self) -> Option<String> {
        if let Some(status) = self.exit.get() {
            return Some(status.clone());
        }
        let status = self.child.as_mut()?.try_wait().ok()??.to_string();
        Some(self.exit.get_or_init(|| status).clone())
    }
}

/// What one caller holds of a `Live` while it talks to the host.
struct LiveHandle {
    connection: Arc<Connection>,
    exit: Arc<OnceLock<String>>,
}

/// Client handle to the tool host.
pub struct ToolHost {
    connector: Arc<dyn Connector>,
    options: HostOptions,
    live: Mutex<Option<Live>>,
    declarations: RwLock<Vec<ToolDeclaration>>,
    restarts: AtomicU32,
    events: Option<Arc<EventBus>>,
}

impl ToolHost {
    pub fn new(connector: Arc<dyn Connector>, options: HostOptions) -> Self {
        Self {
            connector,
            options,
            live: Mutex::new(None),
            declarations: RwLock::new(Vec::new()),
            restarts: AtomicU32::new(0),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Connect, handshake, and discover tools. The declarations are cached
    /// for the life of this host; restarts do not re-discover.
    pub async fn start(&self) -> Result<Vec<ToolDeclaration>, TransportError> {
        let mut live = self.live.lock().await;
        let fresh = self.open().await?;

        let listed = fresh
            .connection
            .request(method::TOOLS_LIST, Some(json!({})))
            .await?;
        let listed: ListToolsResult = serde_json::from_value(listed)
            .map_err(|e| TransportError::MalformedFrame(format!("tools/list result: {e}")))?;

        info!(
            host = %self.connector.describe(),
            tools = listed.tools.len(),
            "Tool host started"
        );

        *self.declarations.write().await = listed.tools.clone();
        *live = Some(fresh);
        Ok(listed.tools)
    }

    /// The cached tool declarations, in host order.
    pub async fn declarations(&self) -> Vec<ToolDeclaration> {
        self.declarations.read().await.clone()
    }

    /// Build a registry of proxies for the cached declarations.
    pub async fn registry(self: &Arc<Self>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for declaration in self.declarations().await {
            registry.register(Box::new(RemoteTool::new(declaration, Arc::clone(self))));
        }
        registry
    }

    /// Invoke one tool on the host.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, TransportError> {
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(|e| TransportError::MalformedFrame(format!("cannot encode call: {e}")))?;

        let handle = self.connection().await?;
        let raw = match handle.connection.request(method::TOOLS_CALL, Some(params)).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.classify(e, &handle).await),
        };
        serde_json::from_value(raw)
            .map_err(|e| TransportError::MalformedFrame(format!("tools/call result: {e}")))
    }

    /// Ping the host.
    pub async fn health_check(&self) -> Result<(), TransportError> {
        let connection = self.current().await.ok_or(TransportError::Closed)?;
        connection
            .request(method::PING, None)
            .await
            .map(|_| ())
            .map_err(|e| {
                debug!(error = %e, "Tool host health check failed");
                e
            })
    }

    /// Whether a live connection exists right now.
    pub async fn is_connected(&self) -> bool {
        self.current().await.is_some()
    }

    /// Number of restarts performed so far.
    pub fn restart_count(&self) -> u32 {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Replace the current connection with a fresh one.
    pub async fn restart(&self, reason: &str) -> Result<(), TransportError> {
        let mut live = self.live.lock().await;
        self.reconnect(&mut live, reason).await
    }

    /// Run health checks on the configured interval until the host is dropped.
    pub fn spawn_supervisor(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.options.health_interval.is_zero() {
            return None;
        }
        let host = Arc::downgrade(self);
        let interval = self.options.health_interval;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(host) = host.upgrade() else { break };
                if let Err(e) = host.health_check().await {
                    warn!(error = %e, "Tool host unhealthy, restarting");
                    if let Err(e) = host.restart(&format!("health check failed: {e}")).await {
                        error!(error = %e, "Tool host restart failed");
                    }
                }
            }
        }))
    }

    /// Close the connection and stop the child.
    pub async fn shutdown(&self) {
        if let Some(mut live) = self.live.lock().await.take() {
            live.connection.close().await;
            if let Some(mut child) = live.child.take() {
                let _ = child.kill().await;
            }
            info!("Tool host stopped");
        }
    }

    async fn current(&self) -> Option<Arc<Connection>> {
        let live = self.live.lock().await;
        live.as_ref()
            .filter(|l| l.connection.is_alive())
            .map(|l| Arc::clone(&l.connection))
    }

    /// A usable connection, reconnecting if the current one is broken.
    async fn connection(&self) -> Result<LiveHandle, TransportError> {
        let mut live = self.live.lock().await;
        if let Some(ref current) = *live {
            if current.connection.is_alive() {
                return Ok(current.handle());
            }
        }
        let reason = match live.as_ref() {
            Some(dead) => dead
                .connection
                .broken_reason()
                .await
                .map(|e| e.to_string())
                .unwrap_or_else(|| "connection lost".into()),
            None => "not started".into(),
        };
        self.reconnect(&mut live, &reason).await?;
        live.as_ref().map(Live::handle).ok_or(TransportError::Closed)
    }

    async fn reconnect(&self, live: &mut Option<Live>, reason: &str) -> Result<(), TransportError> {
        if let Some(mut old) = live.take() {
            if let Some(status) = old.exit_status() {
                debug!(status = %status, "Replacing exited tool host");
            }
            old.connection.close().await;
            if let Some(mut child) = old.child.take() {
                let _ = child.kill().await;
            }
        }

        let attempts = self.options.max_restarts.max(1);
        let mut last_error = TransportError::Closed;
        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.options.restart_backoff * (attempt - 1)).await;
            }
            match self.open().await {
                Ok(fresh) => {
                    let total = self.restarts.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(attempt, total, reason, "Tool host restarted");
                    if let Some(ref events) = self.events {
                        events.publish(DomainEvent::ToolHostRestarted {
                            attempt,
                            reason: reason.to_string(),
                            timestamp: Utc::now(),
                        });
                    }
                    *live = Some(fresh);
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Tool host restart attempt failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    /// Open a stream and perform the initialize handshake.
    async fn open(&self) -> Result<Live, TransportError> {
        let Connected {
            reader,
            writer,
            child,
        } = self.connector.connect().await?;
        let connection = Arc::new(Connection::new(reader, writer, self.options.call_timeout));

        let init = connection
            .request(
                method::INITIALIZE,
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "orderdesk",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                })),
            )
            .await?;
        debug!(response = %init, "Tool host initialized");
        connection.notify(method::INITIALIZED, Some(json!({}))).await?;

        Ok(Live {
            connection,
            child,
            exit: Arc::new(OnceLock::new()),
        })
    }

    /// A closed stream whose child has exited is reported as an exit.
    ///
    /// Only the `Live` behind `handle` is consulted; if another caller has
    /// already replaced it, the status recorded on the way out is used.
    async fn classify(&self, error: TransportError, handle: &LiveHandle) -> TransportError {
        if !matches!(error, TransportError::Closed) {
            return error;
        }
        let status = {
            let mut live = self.live.lock().await;
            match live.as_mut() {
                Some(current) if Arc::ptr_eq(&current.connection, &handle.connection) => current.exit_status(),
                _ => handle.exit.get().cloned(),
            }
        };
        match status {
            Some(status) => TransportError::ProcessExited(status),
            None => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ToolServer;
    use orderdesk_core::error::ToolError;
    use orderdesk_core::schema::{InputSchema, ParamKind};
    use orderdesk_core::tool::{Tool, ToolResult};
    use std::sync::Mutex as StdMutex;

    struct Lookup;

    #[async_trait]
    impl Tool for Lookup {
        fn name(&self) -> &str {
            "consult_order_status"
        }
        fn description(&self) -> &str {
            "Look up an order"
        }
        fn input_schema(&self) -> InputSchema {
            InputSchema::new().required("order_id", ParamKind::Integer, "")
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success(format!("Order {} not found", arguments["order_id"])))
        }
    }

    /// Serves a fresh in-process host per connect; keeps the server tasks
    /// so a test can kill one.
    #[derive(Default)]
    struct DuplexConnector {
        servers: StdMutex<Vec<JoinHandle<()>>>,
        fail_connects: AtomicU32,
    }

    impl DuplexConnector {
        fn kill_current(&self) {
            if let Some(task) = self.servers.lock().unwrap().last() {
                task.abort();
            }
        }
    }

    #[async_trait]
    impl Connector for DuplexConnector {
        async fn connect(&self) -> Result<Connected, TransportError> {
            if self.fail_connects.load(Ordering::SeqCst) > 0 {
                self.fail_connects.fetch_sub(1, Ordering::SeqCst);
                return Err(TransportError::SpawnFailed("simulated".into()));
            }
            let (client, server) = tokio::io::duplex(64 * 1024);
            let (server_read, server_write) = tokio::io::split(server);
            let mut registry = ToolRegistry::new();
            registry.register(Box::new(Lookup));
            let server = ToolServer::new(Arc::new(registry));
            let task = tokio::spawn(async move {
                let _ = server.serve(server_read, server_write).await;
            });
            self.servers.lock().unwrap().push(task);

            let (reader, writer) = tokio::io::split(client);
            Ok(Connected {
                reader: Box::new(reader),
                writer: Box::new(writer),
                child: None,
            })
        }

        fn describe(&self) -> String {
            "duplex".into()
        }
    }

    fn options() -> HostOptions {
        HostOptions {
            call_timeout: Duration::from_secs(5),
            max_restarts: 3,
            restart_backoff: Duration::from_millis(1),
            health_interval: Duration::ZERO,
        }
    }

    async fn wait_disconnected(host: &ToolHost) {
        for _ in 0..100 {
            if !host.is_connected().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("host never noticed the disconnect");
    }

    #[tokio::test]
    async fn start_discovers_and_caches_tools() {
        let host = Arc::new(ToolHost::new(Arc::new(DuplexConnector::default()), options()));
        let tools = host.start().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "consult_order_status");

        let registry = host.registry().await;
        assert_eq!(registry.names(), vec!["consult_order_status"]);
        host.health_check().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_of_a_replaced_child_is_still_reported() {
        let host = ToolHost::new(Arc::new(DuplexConnector::default()), options());
        host.start().await.unwrap();

        let mut child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        child.wait().await.unwrap();
        let handle = {
            let mut live = host.live.lock().await;
            let live = live.as_mut().unwrap();
            live.child = Some(child);
            live.handle()
        };

        // Another caller reconnects before this one classifies its failure
        host.restart("replaced").await.unwrap();
        assert!(host.is_connected().await);

        match host.classify(TransportError::Closed, &handle).await {
            TransportError::ProcessExited(status) => assert!(status.contains('3'), "{status}"),
            other => panic!("expected process exit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_without_a_child_stays_closed() {
        let host = ToolHost::new(Arc::new(DuplexConnector::default()), options());
        host.start().await.unwrap();
        let handle = host.connection().await.unwrap();
        assert!(matches!(
            host.classify(TransportError::Closed, &handle).await,
            TransportError::Closed
        ));
    }

    #[tokio::test]
    async fn call_tool_round_trip() {
        let host = ToolHost::new(Arc::new(DuplexConnector::default()), options());
        host.start().await.unwrap();
        let result = host
            .call_tool("consult_order_status", json!({"order_id": 999}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.joined_text(), "Order 999 not found");
    }

    #[tokio::test]
    async fn crashed_host_is_restarted_on_next_call() {
        let connector = Arc::new(DuplexConnector::default());
        let events = Arc::new(EventBus::default());
        let mut rx = events.subscribe();
        let host = ToolHost::new(connector.clone(), options()).with_events(events);
        host.start().await.unwrap();

        connector.kill_current();
        wait_disconnected(&host).await;
        assert!(host.health_check().await.is_err());

        let result = host
            .call_tool("consult_order_status", json!({"order_id": 1}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(host.restart_count(), 1);

        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::ToolHostRestarted { attempt, .. } => assert_eq!(*attempt, 1),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn restart_retries_with_backoff_then_gives_up() {
        let connector = Arc::new(DuplexConnector::default());
        let host = ToolHost::new(connector.clone(), options());
        host.start().await.unwrap();

        connector.fail_connects.store(2, Ordering::SeqCst);
        host.restart("manual").await.unwrap();
        assert_eq!(host.restart_count(), 1);

        connector.fail_connects.store(5, Ordering::SeqCst);
        let err = host.restart("manual").await.unwrap_err();
        assert!(matches!(err, TransportError::SpawnFailed(_)));
        assert!(!host.is_connected().await);
    }

    #[tokio::test]
    async fn supervisor_restores_a_dead_host() {
        let connector = Arc::new(DuplexConnector::default());
        let host = Arc::new(ToolHost::new(
            connector.clone(),
            HostOptions {
                health_interval: Duration::from_millis(20),
                ..options()
            },
        ));
        host.start().await.unwrap();
        let supervisor = host.spawn_supervisor().unwrap();

        connector.kill_current();
        for _ in 0..200 {
            if host.restart_count() > 0 && host.is_connected().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(host.restart_count() >= 1);
        assert!(host.is_connected().await);
        supervisor.abort();
    }

    #[tokio::test]
    async fn missing_program_is_spawn_failure() {
        let connector = ProcessConnector::new("/definitely/not/a/real/binary", vec![]);
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, TransportError::SpawnFailed(_)));
    }

    #[test]
    fn process_connector_uses_fallback_for_empty_command() {
        let config = ToolHostConfig::default();
        let connector = ProcessConnector::from_config(
            &config,
            (PathBuf::from("/usr/bin/orderdesk"), vec!["tool-host".into()]),
        );
        assert_eq!(connector.describe(), "/usr/bin/orderdesk tool-host");

        let config = ToolHostConfig {
            command: vec!["node".into(), "server.js".into()],
            ..ToolHostConfig::default()
        };
        let connector = ProcessConnector::from_config(&config, (PathBuf::new(), vec![]));
        assert_eq!(connector.describe(), "node server.js");
    }
}
