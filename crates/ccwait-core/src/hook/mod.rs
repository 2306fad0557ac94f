//! One-shot Stop hook: output schema and the wait-then-continue decision.

mod engine;
mod schema;

pub use engine::{HookConfig, HookEngine, CONTINUE_REASON, MAX_WAIT_SECS};
pub use schema::{validate_hook_output, Decision, HookOutput, HookOutputError, VALID_FIELDS};
