//! Runtime error taxonomy.
//!
//! Two families, split by when they can occur:
//!
//! - [`GraphError`] - construction-time defects in the workflow
//!   graph. Fatal at build; a workflow that validates never fails at
//!   runtime for a wiring reason.
//! - [`EngineError`] - runtime failures of a single request:
//!   protocol violations of the topic contract, data-integrity
//!   errors, store failures. Surfaced as a WorkflowFailed event.
//!
//! Command failures are deliberately *not* here: they are captured as
//! NodeFailed events and stop propagation along that path without
//! failing the request.

use thiserror::Error;
use weft_event::EventError;
use weft_types::{ErrorCode, EventId};

/// Workflow graph defects, detected at construction.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Two nodes share a name.
    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    /// The workflow has no nodes.
    #[error("workflow has no nodes")]
    Empty,

    /// No node subscribes to the reserved input topic, so no input
    /// could ever be consumed.
    #[error("no node subscribes to '{0}'")]
    NoInputSubscriber(&'static str),

    /// A node subscribes to a reserved output channel; those are
    /// consumed by the facade only.
    #[error("node '{node}' may not subscribe to reserved output topic '{topic}'")]
    OutputTopicSubscription {
        /// Offending node.
        node: String,
        /// Reserved topic it subscribed to.
        topic: String,
    },
}

impl ErrorCode for GraphError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateNode(_) => "GRAPH_DUPLICATE_NODE",
            Self::Empty => "GRAPH_EMPTY",
            Self::NoInputSubscriber(_) => "GRAPH_NO_INPUT_SUBSCRIBER",
            Self::OutputTopicSubscription { .. } => "GRAPH_OUTPUT_TOPIC_SUBSCRIPTION",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Runtime failure of one request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A user reply referenced a parent event the topic has never
    /// published.
    #[error("unknown parent event {0} for user input")]
    UnknownParent(EventId),

    /// A user reply arrived for a request the assistant has not been
    /// shown yet.
    #[error("parent event {0} has not been delivered to the assistant")]
    ParentNotDelivered(EventId),

    /// The operation is only valid on a human-request topic.
    #[error("topic '{0}' does not accept user input")]
    NotHumanRequest(String),

    /// A topic name resolved to nothing at runtime. Graph validation
    /// makes this unreachable for well-formed engines.
    #[error("topic '{0}' is not part of this workflow")]
    MissingTopic(String),

    /// Event-layer failure (store, serialization, dangling ancestry).
    #[error(transparent)]
    Event(#[from] EventError),

    /// A parallel worker task failed to join.
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownParent(_) => "ENGINE_UNKNOWN_PARENT",
            Self::ParentNotDelivered(_) => "ENGINE_PARENT_NOT_DELIVERED",
            Self::NotHumanRequest(_) => "ENGINE_NOT_HUMAN_REQUEST",
            Self::MissingTopic(_) => "ENGINE_MISSING_TOPIC",
            Self::Event(_) => "ENGINE_EVENT",
            Self::Worker(_) => "ENGINE_WORKER",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Event(inner) => inner.is_recoverable(),
            Self::Worker(_) => true,
            _ => false,
        }
    }
}
