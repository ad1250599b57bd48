//! Topics and the event-driven workflow engine.
//!
//! This crate is the runtime layer of the weft workspace: it owns the
//! offset-tracked topics nodes communicate through and the engine
//! that decides when nodes run.
//!
//! # Crate layering
//!
//! ```text
//! weft-types      : ids, Message, InvokeContext, FunctionSpec
//! weft-event      : event taxonomy, event store, ancestor graph
//! weft-node       : subscription DSL, Command boundary, Node
//! weft-runtime    : topics, workflow engine, dispatch  ◄── HERE
//! ```
//!
//! # Execution model
//!
//! Nodes never talk to each other directly. A node publishes message
//! batches into topics; per-consumer offsets track what each
//! subscriber has read; a node becomes ready when its subscription
//! expression is satisfied by the topics holding unread events for
//! it. The engine pops ready nodes off a FIFO queue, records every
//! step in the event store, and terminates when the queue drains.
//!
//! Because topics are append-only and offsets only move forward,
//! graphs may contain cycles: each pass through a cycle appends new
//! offsets, so the event history stays linear and replayable.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use weft_node::{flatten_input, topic, Command, CommandError, Node};
//! use weft_runtime::{WorkflowBuilder, AGENT_INPUT_TOPIC, AGENT_OUTPUT_TOPIC};
//! use weft_event::ConsumeEvent;
//! use weft_types::{InvokeContext, Message, Messages};
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Command for Greet {
//!     async fn invoke(
//!         &self,
//!         _ctx: &InvokeContext,
//!         _input: &[ConsumeEvent],
//!     ) -> Result<Messages, CommandError> {
//!         Ok(vec![Message::assistant("hi")])
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = WorkflowBuilder::new("greeter")
//!     .node(
//!         Node::builder()
//!             .name("greet")
//!             .subscribe(topic(AGENT_INPUT_TOPIC))
//!             .publish_to(AGENT_OUTPUT_TOPIC)
//!             .command(Arc::new(Greet))
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let ctx = InvokeContext::new("user-1");
//! let output = engine.invoke(ctx, vec![Message::user("hello")]).await.unwrap();
//! assert_eq!(output[0].text(), Some("hi"));
//! # }
//! ```

mod error;
mod topic;
mod workflow;

pub use error::{EngineError, GraphError};
pub use topic::{
    AdmissionPredicate, HumanRequestTopic, OutputTopic, StandardTopic, Topic, AGENT_INPUT_TOPIC,
    AGENT_OUTPUT_TOPIC, AGENT_STREAM_OUTPUT_TOPIC, HUMAN_REQUEST_TOPIC,
};
pub use workflow::{
    DispatchMode, WorkflowBuilder, WorkflowEngine, ASSISTANT_CONSUMER, FUNCTION_CALL_NODE_TYPE,
    LLM_NODE_TYPE,
};
