//! The agent loop.
//!
//! A turn starts from the thread's committed history plus the new question
//! and alternates between the decision step and the execution step until the
//! model answers without tool calls. See [`LoopState`] for the transitions.
//!
//! History is committed in units that never split a tool call from its
//! results:
//!
//! 1. the question, together with whatever the first decision produced;
//! 2. each continuation as `[assistant message with calls, results…]`;
//! 3. the final assistant message.
//!
//! A turn that fails before its first unit commits leaves the thread exactly
//! as it was.

use chrono::Utc;
use orderdesk_config::AppConfig;
use orderdesk_core::checkpoint::CheckpointStore;
use orderdesk_core::error::Error;
use orderdesk_core::event::{DomainEvent, EventBus};
use orderdesk_core::message::{Message, Role, ThreadId};
use orderdesk_core::provider::Provider;
use orderdesk_core::tool::{ToolDeclaration, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::decision::{Decision, DecisionStep, ModelSettings};
use crate::execution::ExecutionStep;
use crate::state::LoopState;
use crate::thread_lock::ThreadLocks;

/// Default ceiling on decision steps per turn.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// What a completed turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// The final answer, trimmed
    pub answer: String,
    /// Decision steps taken
    pub iterations: u32,
    /// Tool calls executed
    pub tool_calls: usize,
}

/// Mutable state of one in-flight turn.
struct Turn {
    thread_id: ThreadId,
    /// Committed history plus everything appended this turn
    history: Vec<Message>,
    /// Committed message count
    version: u64,
    /// Appended but not yet committed
    pending: Vec<Message>,
    iterations: u32,
    tool_calls: usize,
}

/// Orchestrates decision and execution steps over persisted threads.
///
/// Built once per process and shared behind an `Arc`.
pub struct AgentLoop {
    decision: DecisionStep,
    execution: ExecutionStep,
    declarations: Vec<ToolDeclaration>,
    checkpoints: Arc<dyn CheckpointStore>,
    events: Arc<EventBus>,
    locks: ThreadLocks,
    max_iterations: u32,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        settings: ModelSettings,
        tools: Arc<ToolRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
        events: Arc<EventBus>,
    ) -> Self {
        let declarations = tools.list();
        Self {
            decision: DecisionStep::new(provider, settings),
            execution: ExecutionStep::new(tools, Arc::clone(&events)),
            declarations,
            checkpoints,
            events,
            locks: ThreadLocks::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Build from configuration: model settings, iteration ceiling, and
    /// whether a batch runs concurrently.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
        events: Arc<EventBus>,
    ) -> Self {
        let agent = Self::new(provider, ModelSettings::from(config), tools, checkpoints, events)
            .with_max_iterations(config.agent.max_iterations);
        if config.agent.concurrent_tool_calls {
            agent
        } else {
            agent.with_sequential_tools()
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_sequential_tools(mut self) -> Self {
        self.execution = self.execution.sequential();
        self
    }

    /// The tool catalogue advertised to the model.
    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// The committed history of a thread (empty for unseen ids).
    pub async fn history(&self, thread_id: &ThreadId) -> Result<Vec<Message>, Error> {
        Ok(self.checkpoints.load_or_empty(thread_id).await?.messages)
    }

    /// Answer `question` on `thread_id`.
    pub async fn run_turn(&self, thread_id: &ThreadId, question: &str) -> Result<TurnOutcome, Error> {
        if thread_id.as_str().trim().is_empty() {
            return Err(Error::Validation("thread id must not be empty".into()));
        }
        if question.trim().is_empty() {
            return Err(Error::Validation("question must not be empty".into()));
        }

        let _guard = self.locks.lock(thread_id).await;
        let mut turn = self.open(thread_id).await?;

        // A turn that stopped after committing a batch gets its decision first
        if ends_with_tool_result(&turn.history) {
            info!(thread_id = %thread_id, "Finishing interrupted turn before the new question");
            self.drive(&mut turn).await?;
            turn.iterations = 0;
            turn.tool_calls = 0;
        }

        info!(thread_id = %thread_id, history = turn.history.len(), "Turn started");
        self.events.publish(DomainEvent::TurnStarted {
            thread_id: thread_id.to_string(),
            question_preview: question.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        let question = Message::user(question);
        turn.history.push(question.clone());
        turn.pending.push(question);

        self.drive(&mut turn).await
    }

    /// Continue a thread whose last committed message is a tool result,
    /// as left by a turn that stopped after committing a batch.
    pub async fn resume(&self, thread_id: &ThreadId) -> Result<TurnOutcome, Error> {
        let _guard = self.locks.lock(thread_id).await;
        let mut turn = self.open(thread_id).await?;

        if !ends_with_tool_result(&turn.history) {
            return Err(Error::Validation(format!(
                "thread {thread_id} has no unanswered tool results to resume from"
            )));
        }

        info!(thread_id = %thread_id, history = turn.history.len(), "Resuming turn");
        self.drive(&mut turn).await
    }

    async fn open(&self, thread_id: &ThreadId) -> Result<Turn, Error> {
        let checkpoint = self.checkpoints.load_or_empty(thread_id).await?;
        Ok(Turn {
            thread_id: thread_id.clone(),
            history: checkpoint.messages,
            version: checkpoint.version,
            pending: Vec::new(),
            iterations: 0,
            tool_calls: 0,
        })
    }

    /// Run the state machine to a final state.
    async fn drive(&self, turn: &mut Turn) -> Result<TurnOutcome, Error> {
        let mut state = LoopState::AwaitingDecision;
        while !state.is_final() {
            debug!(thread_id = %turn.thread_id, state = state.name(), iteration = turn.iterations, "Loop step");
            state = self.step(turn, state).await;
        }

        match state {
            LoopState::Terminated(answer) => {
                info!(
                    thread_id = %turn.thread_id,
                    iterations = turn.iterations,
                    tool_calls = turn.tool_calls,
                    "Turn completed"
                );
                self.events.publish(DomainEvent::TurnCompleted {
                    thread_id: turn.thread_id.to_string(),
                    iterations: turn.iterations,
                    tool_calls: turn.tool_calls,
                    timestamp: Utc::now(),
                });
                Ok(TurnOutcome {
                    answer,
                    iterations: turn.iterations,
                    tool_calls: turn.tool_calls,
                })
            }
            LoopState::Failed(error) => {
                warn!(
                    thread_id = %turn.thread_id,
                    kind = error.kind(),
                    error = %error,
                    iterations = turn.iterations,
                    "Turn failed"
                );
                self.events.publish(DomainEvent::TurnFailed {
                    thread_id: turn.thread_id.to_string(),
                    error_kind: error.kind().to_string(),
                    error_message: error.to_string(),
                    timestamp: Utc::now(),
                });
                Err(error)
            }
            LoopState::AwaitingDecision | LoopState::ExecutingTools(_) => Err(Error::Internal(
                "agent loop stopped in a non-final state".into(),
            )),
        }
    }

    async fn step(&self, turn: &mut Turn, state: LoopState) -> LoopState {
        match state {
            LoopState::AwaitingDecision => {
                if turn.iterations >= self.max_iterations {
                    return LoopState::Failed(Error::LoopBudgetExceeded {
                        max_iterations: self.max_iterations,
                    });
                }
                turn.iterations += 1;

                let decision = match self.decision.decide(&turn.history, &self.declarations).await {
                    Ok(decision) => decision,
                    Err(e) => return LoopState::Failed(e.into()),
                };

                match decision {
                    Decision::Terminal(message) => {
                        let answer = message.text().trim().to_string();
                        turn.history.push(message.clone());
                        turn.pending.push(message);
                        match self.commit(turn).await {
                            Ok(()) => LoopState::Terminated(answer),
                            Err(e) => LoopState::Failed(e),
                        }
                    }
                    Decision::Continuation(message) => {
                        let calls = message.tool_calls.clone();
                        debug!(
                            thread_id = %turn.thread_id,
                            tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                            "Model requested tools"
                        );
                        turn.history.push(message.clone());
                        turn.pending.push(message);
                        LoopState::ExecutingTools(calls)
                    }
                }
            }

            LoopState::ExecutingTools(calls) => {
                let results = match self.execution.execute(&turn.thread_id, &calls).await {
                    Ok(results) => results,
                    Err(e) => return LoopState::Failed(e.into()),
                };
                turn.tool_calls += results.len();
                for result in &results {
                    let message = Message::tool_result(result);
                    turn.history.push(message.clone());
                    turn.pending.push(message);
                }
                match self.commit(turn).await {
                    Ok(()) => LoopState::AwaitingDecision,
                    Err(e) => LoopState::Failed(e),
                }
            }

            done @ (LoopState::Terminated(_) | LoopState::Failed(_)) => done,
        }
    }

    /// Append the pending unit at the turn's known version.
    async fn commit(&self, turn: &mut Turn) -> Result<(), Error> {
        if turn.pending.is_empty() {
            return Ok(());
        }
        let committed = self
            .checkpoints
            .append(&turn.thread_id, turn.version, &turn.pending)
            .await?;
        debug!(
            thread_id = %turn.thread_id,
            messages = turn.pending.len(),
            version = committed.version,
            "Checkpoint committed"
        );
        turn.version = committed.version;
        turn.pending.clear();
        Ok(())
    }
}

fn ends_with_tool_result(history: &[Message]) -> bool {
    history.last().is_some_and(|m| m.role == Role::Tool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeOrders, ScriptedProvider, Unplugged, call, calls};
    use orderdesk_core::error::ProviderError;
    use orderdesk_core::message::tool_calls_resolved;
    use orderdesk_memory::InMemoryCheckpointStore;
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        agent: Arc<AgentLoop>,
        provider: Arc<ScriptedProvider>,
        orders: Arc<FakeOrders>,
        store: Arc<InMemoryCheckpointStore>,
    }

    /// Registry tools must be boxed, so the harness shares the counter
    /// through a thin forwarding tool.
    struct SharedOrders(Arc<FakeOrders>);

    #[async_trait::async_trait]
    impl orderdesk_core::tool::Tool for SharedOrders {
        fn name(&self) -> &str {
            self.0.name()
        }
        fn description(&self) -> &str {
            self.0.description()
        }
        fn input_schema(&self) -> orderdesk_core::schema::InputSchema {
            self.0.input_schema()
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> Result<orderdesk_core::tool::ToolResult, orderdesk_core::error::ToolError> {
            self.0.execute(arguments).await
        }
    }

    fn harness(provider: ScriptedProvider) -> Harness {
        let provider = Arc::new(provider);
        let orders = Arc::new(FakeOrders::default());
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(SharedOrders(Arc::clone(&orders))));
        tools.register(Box::new(Unplugged));
        let store = Arc::new(InMemoryCheckpointStore::new());

        let agent = AgentLoop::new(
            provider.clone(),
            ModelSettings {
                model: "mock-model".into(),
                system: None,
                temperature: 0.0,
                max_tokens: Some(512),
                timeout: Duration::from_secs(5),
            },
            Arc::new(tools),
            store.clone(),
            Arc::new(EventBus::default()),
        )
        .with_max_iterations(4);

        Harness {
            agent: Arc::new(agent),
            provider,
            orders,
            store,
        }
    }

    fn lookup(id: &str, order_id: i64) -> Message {
        calls(vec![call(id, "consult_order_status", json!({"order_id": order_id}))])
    }

    #[tokio::test]
    async fn terminal_decision_never_touches_tools() {
        let h = harness(ScriptedProvider::new(vec![Message::assistant("  Hello! How can I help?\n")]));
        let t = ThreadId::new("t1");

        let outcome = h.agent.run_turn(&t, "Hello!").await.unwrap();
        assert_eq!(outcome.answer, "Hello! How can I help?");
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.tool_calls, 0);
        assert_eq!(h.orders.count(), 0);

        let history = h.agent.history(&t).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn tool_results_are_appended_in_request_order() {
        let batch = calls(vec![
            call("slow", "consult_order_status", json!({"order_id": 1, "delay_ms": 60})),
            call("fast", "consult_order_status", json!({"order_id": 2, "delay_ms": 1})),
            call("mid", "consult_order_status", json!({"order_id": 3, "delay_ms": 30})),
        ]);
        let h = harness(ScriptedProvider::new(vec![batch, Message::assistant("done")]));
        let t = ThreadId::new("t1");

        let outcome = h.agent.run_turn(&t, "orders 1, 2, 3?").await.unwrap();
        assert_eq!(outcome.tool_calls, 3);

        let history = h.agent.history(&t).await.unwrap();
        let result_ids: Vec<_> = history
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(result_ids, ["slow", "fast", "mid"]);
        assert!(tool_calls_resolved(&history));

        // The second decision saw the assistant message and all three results
        let requests = h.provider.requests();
        assert_eq!(requests[1].messages.len(), 5);
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back_and_batch_continues() {
        let batch = calls(vec![
            call("a", "cancel_order", json!({"order_id": 1})),
            call("b", "consult_order_status", json!({"order_id": 1})),
        ]);
        let h = harness(ScriptedProvider::new(vec![batch, Message::assistant("I cannot cancel orders.")]));
        let t = ThreadId::new("t1");

        let outcome = h.agent.run_turn(&t, "cancel order 1").await.unwrap();
        assert_eq!(outcome.answer, "I cannot cancel orders.");
        assert_eq!(h.orders.count(), 1);

        let history = h.agent.history(&t).await.unwrap();
        let unknown = &history[2];
        assert!(unknown.is_error);
        assert!(unknown.text().contains("Unknown tool"));
        assert!(!history[3].is_error);

        let seen = &h.provider.requests()[1].messages;
        assert!(seen.iter().any(|m| m.is_error));
    }

    #[tokio::test]
    async fn same_thread_turns_observe_each_other() {
        let h = harness(ScriptedProvider::new(vec![
            lookup("c1", 1),
            Message::assistant("Order 1 is IN_TRANSPORT."),
            lookup("c2", 999),
            Message::assistant("Order 999 was not found."),
        ]));
        let t = ThreadId::new("t1");

        let first = h.agent.run_turn(&t, "What is the status of order 1?").await.unwrap();
        assert!(first.answer.contains("IN_TRANSPORT"));
        let second = h.agent.run_turn(&t, "And order 999?").await.unwrap();
        assert!(second.answer.contains("not found"));

        let requests = h.provider.requests();
        // Turn 2's first decision sees all four committed messages of turn 1
        assert_eq!(requests[2].messages.len(), 5);
        assert_eq!(requests[2].messages[..4], h.agent.history(&t).await.unwrap()[..4]);

        let history = h.agent.history(&t).await.unwrap();
        assert_eq!(history.len(), 8);
        assert_eq!(history[2].text(), r#"{"id":1,"product":"Barbeador","status":"IN_TRANSPORT"}"#);
        assert_eq!(history[6].text(), "Order 999 not found");
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_thread_do_not_interleave() {
        let h = harness(
            ScriptedProvider::new(vec![
                lookup("c1", 1),
                Message::assistant("first"),
                lookup("c2", 2),
                Message::assistant("second"),
            ])
            .with_delay(Duration::from_millis(10)),
        );
        let t = ThreadId::new("shared");

        let a = {
            let agent = Arc::clone(&h.agent);
            let t = t.clone();
            tokio::spawn(async move { agent.run_turn(&t, "one").await })
        };
        let b = {
            let agent = Arc::clone(&h.agent);
            let t = t.clone();
            tokio::spawn(async move { agent.run_turn(&t, "two").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let history = h.agent.history(&t).await.unwrap();
        assert_eq!(history.len(), 8);
        let roles: Vec<_> = history.iter().map(|m| m.role).collect();
        let turn = [Role::User, Role::Assistant, Role::Tool, Role::Assistant];
        assert_eq!(roles[..4], turn);
        assert_eq!(roles[4..], turn);
        assert!(tool_calls_resolved(&history));
    }

    #[tokio::test]
    async fn transport_failure_leaves_history_unchanged() {
        let h = harness(ScriptedProvider::new(vec![
            Message::assistant("hi"),
            calls(vec![
                call("a", "consult_order_status", json!({"order_id": 1})),
                call("b", "unplugged", json!({})),
            ]),
        ]));
        let t = ThreadId::new("t1");
        h.agent.run_turn(&t, "hello").await.unwrap();
        let before = h.agent.history(&t).await.unwrap();

        let err = h.agent.run_turn(&t, "order 1?").await.unwrap_err();
        assert_eq!(err.kind(), "TransportError");
        assert!(err.to_string().contains("exit status"));

        let after = h.agent.history(&t).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn model_failure_fails_the_turn_without_retry() {
        let h = harness(ScriptedProvider::failing(ProviderError::ApiError {
            status_code: 529,
            message: "overloaded".into(),
        }));
        let t = ThreadId::new("t1");

        let err = h.agent.run_turn(&t, "hello").await.unwrap_err();
        assert_eq!(err.kind(), "ModelInvocationError");
        assert!(!err.is_retryable());
        assert_eq!(h.provider.requests().len(), 1);
        assert!(h.store.load(&t).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn endless_tool_requests_hit_the_budget() {
        let h = harness(ScriptedProvider::repeating(lookup("again", 1)));
        let t = ThreadId::new("t1");

        let err = h.agent.run_turn(&t, "loop forever").await.unwrap_err();
        assert!(matches!(err, Error::LoopBudgetExceeded { max_iterations: 4 }));
        assert_eq!(h.provider.requests().len(), 4);
        assert_eq!(h.orders.count(), 4);

        // Every committed call has its result
        let history = h.agent.history(&t).await.unwrap();
        assert_eq!(history.len(), 1 + 4 * 2);
        assert!(tool_calls_resolved(&history));
    }

    #[tokio::test]
    async fn resume_continues_after_a_committed_batch() {
        let h = harness(ScriptedProvider::new(vec![
            lookup("c1", 1),
            Message::assistant("Order 1 is IN_TRANSPORT."),
        ]));
        let t = ThreadId::new("t1");

        // Simulate a crash between committing a batch and the next decision
        let mut question = vec![Message::user("order 1?")];
        question.push(lookup("c0", 1));
        question.push(Message::tool_result(
            &orderdesk_core::tool::ToolResult::success("{\"id\":1}").with_call_id("c0"),
        ));
        h.store.append(&t, 0, &question).await.unwrap();

        let outcome = h.agent.resume(&t).await.unwrap();
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.answer, "Order 1 is IN_TRANSPORT.");
        assert_eq!(h.agent.history(&t).await.unwrap().len(), 3 + 3);
    }

    #[tokio::test]
    async fn next_question_finishes_a_turn_cut_short_by_the_budget() {
        let mut replies: Vec<Message> = (0..4).map(|i| lookup(&format!("c{i}"), 1)).collect();
        replies.push(Message::assistant("Order 1 is IN_TRANSPORT."));
        replies.push(Message::assistant("Order 2 was delivered."));
        let h = harness(ScriptedProvider::new(replies));
        let t = ThreadId::new("t1");

        let err = h.agent.run_turn(&t, "order 1?").await.unwrap_err();
        assert!(matches!(err, Error::LoopBudgetExceeded { .. }));
        let cut = h.agent.history(&t).await.unwrap();
        assert_eq!(cut.last().unwrap().role, Role::Tool);

        let outcome = h.agent.run_turn(&t, "and order 2?").await.unwrap();
        assert_eq!(outcome.answer, "Order 2 was delivered.");
        assert_eq!(outcome.iterations, 1);

        // The interrupted turn got its answer before the new question
        let history = h.agent.history(&t).await.unwrap();
        assert_eq!(history.len(), cut.len() + 3);
        assert_eq!(history[cut.len()].text(), "Order 1 is IN_TRANSPORT.");
        assert_eq!(history[cut.len() + 1].text(), "and order 2?");
        assert_eq!(history[cut.len() + 1].role, Role::User);

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 6);
        assert_eq!(requests[4].messages.last().unwrap().role, Role::Tool);
    }

    #[tokio::test]
    async fn resume_requires_pending_tool_results() {
        let h = harness(ScriptedProvider::new(vec![Message::assistant("hi")]));
        let t = ThreadId::new("t1");
        h.agent.run_turn(&t, "hello").await.unwrap();

        let err = h.agent.resume(&t).await.unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(matches!(h.agent.resume(&ThreadId::new("new")).await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected_before_the_loop() {
        let h = harness(ScriptedProvider::new(vec![]));
        let err = h.agent.run_turn(&ThreadId::new("t1"), "   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = h.agent.run_turn(&ThreadId::new(""), "hi").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(h.provider.requests().is_empty());
    }

    #[tokio::test]
    async fn lifecycle_events_are_published() {
        let events = Arc::new(EventBus::default());
        let mut rx = events.subscribe();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(FakeOrders::default()));
        let agent = AgentLoop::new(
            Arc::new(ScriptedProvider::new(vec![lookup("c1", 1), Message::assistant("ok")])),
            ModelSettings {
                model: "mock-model".into(),
                system: None,
                temperature: 0.0,
                max_tokens: None,
                timeout: Duration::from_secs(5),
            },
            Arc::new(tools),
            Arc::new(InMemoryCheckpointStore::new()),
            events,
        );

        agent.run_turn(&ThreadId::new("t1"), "order 1?").await.unwrap();

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(match event.as_ref() {
                DomainEvent::TurnStarted { .. } => "started",
                DomainEvent::ToolExecuted { .. } => "tool",
                DomainEvent::TurnCompleted { iterations: 2, tool_calls: 1, .. } => "completed",
                other => panic!("unexpected event {other:?}"),
            });
        }
        assert_eq!(names, ["started", "tool", "completed"]);
    }

    #[test]
    fn from_config_applies_agent_settings() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 7;
        config.agent.concurrent_tool_calls = false;
        let agent = AgentLoop::from_config(
            &config,
            Arc::new(ScriptedProvider::new(vec![])),
            Arc::new(ToolRegistry::new()),
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(EventBus::default()),
        );
        assert_eq!(agent.max_iterations(), 7);
        assert!(agent.declarations().is_empty());
    }
}
