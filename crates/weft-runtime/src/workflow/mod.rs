//! Workflow graph assembly and the dispatch engine.

mod builder;
mod engine;
mod output;

pub use builder::{WorkflowBuilder, FUNCTION_CALL_NODE_TYPE, LLM_NODE_TYPE};
pub use engine::{DispatchMode, WorkflowEngine, ASSISTANT_CONSUMER};
