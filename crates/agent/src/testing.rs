//! Shared test doubles for agent tests.

use async_trait::async_trait;
use orderdesk_core::error::{ProviderError, ToolError, TransportError};
use orderdesk_core::message::{Message, ToolCall};
use orderdesk_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use orderdesk_core::schema::{InputSchema, ParamKind};
use orderdesk_core::tool::{Tool, ToolResult};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A provider that returns a scripted sequence of replies.
///
/// Panics when the script runs out, unless a repeating reply is set.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<Message, ProviderError>>>,
    repeat: Option<Message>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            ..Self::new(vec![])
        }
    }

    /// Answer every call with `reply`.
    pub fn repeating(reply: Message) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new(vec![])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        let message = match (next, &self.repeat) {
            (Some(reply), _) => reply?,
            (None, Some(repeat)) => repeat.clone(),
            (None, None) => panic!("ScriptedProvider: no reply scripted for call #{call}"),
        };
        Ok(ProviderResponse {
            message,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments,
    }
}

pub fn calls(calls: Vec<ToolCall>) -> Message {
    Message::assistant_with_tool_calls(None, calls)
}

/// Looks up a fake order after `delay_ms`, counting invocations.
#[derive(Default)]
pub struct FakeOrders {
    pub invocations: AtomicUsize,
}

impl FakeOrders {
    pub fn count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for FakeOrders {
    fn name(&self) -> &str {
        "consult_order_status"
    }

    fn description(&self) -> &str {
        "Look up an order by id"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required("order_id", ParamKind::Integer, "Order id")
            .optional("delay_ms", ParamKind::Integer, "Artificial latency")
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let delay = arguments["delay_ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let id = arguments["order_id"].as_i64().unwrap_or_default();
        match id {
            1 => Ok(ToolResult::success(
                json!({"id": 1, "product": "Barbeador", "status": "IN_TRANSPORT"}).to_string(),
            )),
            500 => Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: "store unavailable".into(),
            }),
            _ => Ok(ToolResult::success(format!("Order {id} not found"))),
        }
    }
}

/// A remote tool whose host is gone.
pub struct Unplugged;

#[async_trait]
impl Tool for Unplugged {
    fn name(&self) -> &str {
        "unplugged"
    }

    fn description(&self) -> &str {
        "Always fails at the transport"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::Transport(TransportError::ProcessExited(
            "exit status: 1".into(),
        )))
    }
}
