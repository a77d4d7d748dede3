//! States of one turn.

use orderdesk_core::Error;
use orderdesk_core::message::ToolCall;

/// Where a turn is in its decide/execute alternation.
///
/// ```text
///   AwaitingDecision --Terminal--------> Terminated
///   AwaitingDecision --Continuation----> ExecutingTools
///   ExecutingTools   --all resolved----> AwaitingDecision
///   any              --fatal / budget--> Failed
/// ```
#[derive(Debug)]
pub enum LoopState {
    AwaitingDecision,
    ExecutingTools(Vec<ToolCall>),
    Terminated(String),
    Failed(Error),
}

impl LoopState {
    pub fn is_final(&self) -> bool {
        matches!(self, LoopState::Terminated(_) | LoopState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoopState::AwaitingDecision => "awaiting_decision",
            LoopState::ExecutingTools(_) => "executing_tools",
            LoopState::Terminated(_) => "terminated",
            LoopState::Failed(_) => "failed",
        }
    }
}
