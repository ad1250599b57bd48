//! Stock commands and command-side helpers.
//!
//! These cover the node conventions that need engine-adjacent logic:
//! native function execution for tool calls, causally ordered context
//! assembly for model calls, and tool-boundary event recording.
//! Actual model and retrieval adapters live outside this workspace
//! and plug in through the same [`Command`](crate::Command) trait.

mod function_call;
mod llm_context;
mod recorded;

pub use function_call::FunctionCallCommand;
pub use llm_context::assemble_context;
pub use recorded::Recorded;
