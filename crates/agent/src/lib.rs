//! The orderdesk agent loop.
//!
//! A turn alternates between two steps until the model stops asking for
//! tools:
//!
//! 1. **Decide**: send the thread's history and the tool catalogue to the
//!    model ([`DecisionStep`])
//! 2. **Execute**: run every requested tool call and append one result per
//!    call, in request order ([`ExecutionStep`])
//!
//! [`AgentLoop`] sequences the two, persists history through a
//! [`CheckpointStore`](orderdesk_core::CheckpointStore), serializes turns per
//! thread, and fails the turn once the iteration ceiling is reached.

pub mod decision;
pub mod execution;
pub mod loop_runner;
pub mod state;
pub mod thread_lock;

#[cfg(test)]
pub(crate) mod testing;

pub use decision::{Decision, DecisionStep, ModelSettings};
pub use execution::ExecutionStep;
pub use loop_runner::{AgentLoop, DEFAULT_MAX_ITERATIONS, TurnOutcome};
pub use state::LoopState;
pub use thread_lock::ThreadLocks;
