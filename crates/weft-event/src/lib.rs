//! Event taxonomy and event store for the weft workflow engine.
//!
//! Everything a workflow does is recorded as an [`Event`]: topic
//! publishes and consumes, node dispatches, workflow lifecycle, tool
//! executions. The append-only per-request history is what makes runs
//! idempotent and restorable; in-memory topic state is a projection of
//! it.
//!
//! # Crate layering
//!
//! ```text
//! weft-types      : ids, Message, InvokeContext, FunctionSpec
//! weft-event      : event taxonomy, event store, ancestor graph  ◄── HERE
//! weft-node       : subscription DSL, Command boundary, Node
//! weft-runtime    : topics, workflow engine, dispatch
//! ```
//!
//! # Contents
//!
//! - [`PublishEvent`], [`ConsumeEvent`] - topic traffic records
//! - [`Event`] - the tagged union persisted by the store
//! - [`EventStore`] - append/query contract, with
//!   [`InMemoryEventStore`] as the reference backend
//! - [`AncestorGraph`] - causally ordered ancestry of a consume
//!   frontier, used to rebuild model context

mod error;
mod graph;
mod lifecycle;
mod store;
mod topic;

pub use error::EventError;
pub use graph::AncestorGraph;
pub use lifecycle::{
    Event, NodeFailedEvent, NodeInvokeEvent, NodeRef, NodeRespondEvent, ToolFailedEvent,
    ToolInvokeEvent, ToolRespondEvent, WorkflowFailedEvent, WorkflowInvokeEvent, WorkflowRef,
    WorkflowRespondEvent,
};
pub use store::{EventStore, InMemoryEventStore};
pub use topic::{ConsumeEvent, PublishEvent};
