//! Tool host side of the protocol: serve a [`ToolRegistry`] over a line
//! stream (stdin/stdout in production).
//!
//! Each `tools/call` runs on its own task, so a slow lookup does not hold up
//! the calls behind it. Responses share one writer and may go out in any
//! order; the client matches them by id.

use orderdesk_core::message::ToolCall;
use orderdesk_core::tool::ToolRegistry;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION, method,
};

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

#[derive(Clone)]
pub struct ToolServer {
    registry: Arc<ToolRegistry>,
    name: String,
    version: String,
}

impl ToolServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            name: "orderdesk-tool-host".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    pub fn with_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches EOF. In-flight calls are allowed to
    /// finish before returning.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: SharedWriter = Arc::new(Mutex::new(Box::new(writer)));
        let mut lines = BufReader::new(reader).lines();
        let mut in_flight = JoinSet::new();

        info!(tools = self.registry.len(), "Tool server listening");

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(line) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Unparseable request");
                    let reply = JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"));
                    send(&writer, &reply).await?;
                    continue;
                }
            };

            if request.is_notification() {
                debug!(method = %request.method, "Notification");
                continue;
            }

            if request.method == method::TOOLS_CALL {
                let server = self.clone();
                let writer = Arc::clone(&writer);
                in_flight.spawn(async move {
                    let reply = server.call_tool(request).await;
                    if let Err(e) = send(&writer, &reply).await {
                        warn!(error = %e, "Failed to write tool reply");
                    }
                });
            } else {
                let reply = self.handle(request);
                send(&writer, &reply).await?;
            }

            // Reap finished calls so the set does not grow unbounded
            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        info!("Tool server input closed");
        Ok(())
    }

    fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.unwrap_or(Value::Null);
        if request.jsonrpc != crate::protocol::JSONRPC_VERSION {
            return JsonRpcResponse::failure(id, INVALID_REQUEST, "jsonrpc must be \"2.0\"");
        }

        match request.method.as_str() {
            method::INITIALIZE => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": self.name, "version": self.version },
                }),
            ),
            method::PING => JsonRpcResponse::success(id, json!({})),
            method::TOOLS_LIST => {
                let listed = ListToolsResult {
                    tools: self.registry.list(),
                };
                match serde_json::to_value(listed) {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
                }
            }
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        }
    }

    async fn call_tool(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.unwrap_or(Value::Null);
        let params: CallToolParams = match request.params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {e}")),
            None => return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params"),
        };

        let call = ToolCall {
            id: id.to_string(),
            name: params.name,
            arguments: if params.arguments.is_null() { json!({}) } else { params.arguments },
        };
        debug!(tool = %call.name, "tools/call");

        let result = match self.registry.invoke(&call).await {
            Ok(result) => CallToolResult::text(result.content, result.is_error),
            Err(e) => return JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
        };
        match serde_json::to_value(result) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
        }
    }
}

async fn send(writer: &SharedWriter, response: &JsonRpcResponse) -> std::io::Result<()> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    let mut writer = writer.lock().await;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
