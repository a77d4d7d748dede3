//! The execution step: run a batch of tool calls against the registry.

use chrono::Utc;
use futures::future::join_all;
use orderdesk_core::error::TransportError;
use orderdesk_core::event::{DomainEvent, EventBus};
use orderdesk_core::message::{ThreadId, ToolCall};
use orderdesk_core::tool::{ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct ExecutionStep {
    tools: Arc<ToolRegistry>,
    events: Arc<EventBus>,
    concurrent: bool,
}

impl ExecutionStep {
    pub fn new(tools: Arc<ToolRegistry>, events: Arc<EventBus>) -> Self {
        Self {
            tools,
            events,
            concurrent: true,
        }
    }

    /// Dispatch calls one at a time instead of all at once.
    pub fn sequential(mut self) -> Self {
        self.concurrent = false;
        self
    }

    /// Run every call and return one result per call, in request order.
    ///
    /// Tool-level failures are error results and do not stop the batch. A
    /// transport failure on any call fails the whole batch; when calls run
    /// concurrently the others still finish first.
    pub async fn execute(
        &self,
        thread_id: &ThreadId,
        calls: &[ToolCall],
    ) -> Result<Vec<ToolResult>, TransportError> {
        debug!(thread_id = %thread_id, count = calls.len(), concurrent = self.concurrent, "Executing tool calls");

        if self.concurrent {
            join_all(calls.iter().map(|call| self.invoke(thread_id, call)))
                .await
                .into_iter()
                .collect()
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.invoke(thread_id, call).await?);
            }
            Ok(results)
        }
    }

    async fn invoke(&self, thread_id: &ThreadId, call: &ToolCall) -> Result<ToolResult, TransportError> {
        let start = Instant::now();
        let outcome = self.tools.invoke(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(result) => {
                if result.is_error {
                    debug!(tool = %call.name, call_id = %call.id, error = %result.content, "Tool returned an error result");
                }
                self.events.publish(DomainEvent::ToolExecuted {
                    thread_id: thread_id.to_string(),
                    tool_name: call.name.clone(),
                    call_id: call.id.clone(),
                    is_error: result.is_error,
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, duration_ms, "Tool host transport failed");
            }
        }
        outcome
    }
}
