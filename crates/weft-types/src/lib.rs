//! Core types for the weft workflow engine.
//!
//! This crate is the leaf of the workspace: identifier newtypes, the
//! conversational [`Message`] unit, the request-scoped
//! [`InvokeContext`], function metadata, and the [`ErrorCode`] trait
//! shared by every error type in the workspace.
//!
//! # Crate layering
//!
//! ```text
//! weft-types      : ids, Message, InvokeContext, FunctionSpec   ◄── HERE
//! weft-event      : event taxonomy, event store, ancestor graph
//! weft-node       : subscription DSL, Command boundary, Node
//! weft-runtime    : topics, workflow engine, dispatch
//! ```
//!
//! Nothing here knows about topics, nodes, or the engine; these types
//! are pure data and safe to put on the wire.

mod context;
mod error;
mod function_spec;
mod id;
mod message;

pub use context::InvokeContext;
pub use error::{assert_error_code, ErrorCode};
pub use function_spec::{FunctionSpec, ParameterSchema, ParametersSchema};
pub use id::{
    ConversationId, EventId, InvokeId, MessageId, NodeId, RequestId, WorkflowId,
};
pub use message::{Content, FunctionCall, Message, Messages, Role, ToolCall};
