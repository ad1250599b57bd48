//! Lifecycle event records and the unified [`Event`] sum type.
//!
//! Three Invoke/Respond/Failed triples cover the participants of a
//! run: nodes, the workflow itself, and tools behind the command
//! boundary. Together with the topic records they form the complete
//! append-only history of a request.
//!
//! | Family | Invoke carries | Respond adds | Failed adds |
//! |--------|----------------|--------------|-------------|
//! | Node | consumed input events | output messages | error text |
//! | Workflow | the seeding publish | output messages | error text |
//! | Tool | input messages | output messages | error text |

use crate::{ConsumeEvent, PublishEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weft_types::{EventId, InvokeContext, Messages, NodeId, WorkflowId};

/// Identity and wiring of the node a lifecycle event concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRef {
    /// Node instance id.
    pub node_id: NodeId,
    /// Node name, unique within the workflow.
    pub node_name: String,
    /// Node kind label.
    pub node_type: String,
    /// Topics the node's subscription references.
    pub subscribed_topics: Vec<String>,
    /// Topics the node publishes to.
    pub publish_to_topics: Vec<String>,
}

/// A node was dispatched with the given consumed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInvokeEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    #[serde(flatten)]
    pub node: NodeRef,
    /// The consume records handed to the node's command.
    pub input_data: Vec<ConsumeEvent>,
}

/// A node's command completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRespondEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    #[serde(flatten)]
    pub node: NodeRef,
    pub input_data: Vec<ConsumeEvent>,
    /// Messages the command produced.
    pub output_data: Messages,
}

/// A node's command failed.
///
/// Consumer offsets are not advanced on failure, so a later
/// restoration re-dispatches the node with the same input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFailedEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    #[serde(flatten)]
    pub node: NodeRef,
    pub input_data: Vec<ConsumeEvent>,
    pub error: String,
}

/// Identity of the workflow a lifecycle event concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub workflow_type: String,
}

/// A workflow run started; carries the publish that seeded the input
/// topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInvokeEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    #[serde(flatten)]
    pub workflow: WorkflowRef,
    pub input_data: PublishEvent,
}

/// A workflow run completed and produced output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRespondEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    #[serde(flatten)]
    pub workflow: WorkflowRef,
    pub output_data: Messages,
}

/// A workflow run failed or was cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFailedEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    #[serde(flatten)]
    pub workflow: WorkflowRef,
    pub error: String,
}

/// A tool behind the command boundary was invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvokeEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    pub tool_name: String,
    pub tool_type: String,
    pub input_data: Messages,
}

/// A tool completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRespondEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    pub tool_name: String,
    pub tool_type: String,
    pub input_data: Messages,
    pub output_data: Messages,
}

/// A tool failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailedEvent {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub invoke_context: InvokeContext,
    pub tool_name: String,
    pub tool_type: String,
    pub input_data: Messages,
    pub error: String,
}

/// The unified event record persisted by the event store.
///
/// Serialized with an `event_type` discriminator; every variant
/// round-trips structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum Event {
    PublishToTopic(PublishEvent),
    /// A publish restricted to the output and human-request channels.
    OutputTopic(PublishEvent),
    ConsumeFromTopic(ConsumeEvent),
    NodeInvoke(NodeInvokeEvent),
    NodeRespond(NodeRespondEvent),
    NodeFailed(NodeFailedEvent),
    WorkflowInvoke(WorkflowInvokeEvent),
    WorkflowRespond(WorkflowRespondEvent),
    WorkflowFailed(WorkflowFailedEvent),
    ToolInvoke(ToolInvokeEvent),
    ToolRespond(ToolRespondEvent),
    ToolFailed(ToolFailedEvent),
}

impl Event {
    /// Returns the event's identity.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        match self {
            Self::PublishToTopic(e) | Self::OutputTopic(e) => e.event_id,
            Self::ConsumeFromTopic(e) => e.event_id,
            Self::NodeInvoke(e) => e.event_id,
            Self::NodeRespond(e) => e.event_id,
            Self::NodeFailed(e) => e.event_id,
            Self::WorkflowInvoke(e) => e.event_id,
            Self::WorkflowRespond(e) => e.event_id,
            Self::WorkflowFailed(e) => e.event_id,
            Self::ToolInvoke(e) => e.event_id,
            Self::ToolRespond(e) => e.event_id,
            Self::ToolFailed(e) => e.event_id,
        }
    }

    /// Returns the event's creation time.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::PublishToTopic(e) | Self::OutputTopic(e) => e.timestamp,
            Self::ConsumeFromTopic(e) => e.timestamp,
            Self::NodeInvoke(e) => e.timestamp,
            Self::NodeRespond(e) => e.timestamp,
            Self::NodeFailed(e) => e.timestamp,
            Self::WorkflowInvoke(e) => e.timestamp,
            Self::WorkflowRespond(e) => e.timestamp,
            Self::WorkflowFailed(e) => e.timestamp,
            Self::ToolInvoke(e) => e.timestamp,
            Self::ToolRespond(e) => e.timestamp,
            Self::ToolFailed(e) => e.timestamp,
        }
    }

    /// Returns the request correlation context.
    #[must_use]
    pub fn invoke_context(&self) -> &InvokeContext {
        match self {
            Self::PublishToTopic(e) | Self::OutputTopic(e) => &e.invoke_context,
            Self::ConsumeFromTopic(e) => &e.invoke_context,
            Self::NodeInvoke(e) => &e.invoke_context,
            Self::NodeRespond(e) => &e.invoke_context,
            Self::NodeFailed(e) => &e.invoke_context,
            Self::WorkflowInvoke(e) => &e.invoke_context,
            Self::WorkflowRespond(e) => &e.invoke_context,
            Self::WorkflowFailed(e) => &e.invoke_context,
            Self::ToolInvoke(e) => &e.invoke_context,
            Self::ToolRespond(e) => &e.invoke_context,
            Self::ToolFailed(e) => &e.invoke_context,
        }
    }

    /// Returns the inner publish record for publish-shaped variants.
    #[must_use]
    pub fn as_publish(&self) -> Option<&PublishEvent> {
        match self {
            Self::PublishToTopic(e) | Self::OutputTopic(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` for the output-channel publish variant.
    #[must_use]
    pub fn is_output(&self) -> bool {
        matches!(self, Self::OutputTopic(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::Message;

    fn ctx() -> InvokeContext {
        InvokeContext::new("user")
    }

    fn publish() -> PublishEvent {
        PublishEvent::new(
            ctx(),
            "inbox",
            "facade",
            "user",
            vec![Message::user("hello")],
            vec![],
        )
    }

    fn node_ref() -> NodeRef {
        NodeRef {
            node_id: NodeId::new(),
            node_name: "answer".into(),
            node_type: "llm".into(),
            subscribed_topics: vec!["inbox".into()],
            publish_to_topics: vec!["outbox".into()],
        }
    }

    fn round_trip(event: Event) {
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn publish_round_trips() {
        round_trip(Event::PublishToTopic(publish()));
    }

    #[test]
    fn output_round_trips_and_is_output() {
        let event = Event::OutputTopic(publish());
        assert!(event.is_output());
        round_trip(event);
    }

    #[test]
    fn consume_round_trips() {
        let consume = ConsumeEvent::of(&publish(), "answer", "llm");
        round_trip(Event::ConsumeFromTopic(consume));
    }

    #[test]
    fn node_triple_round_trips() {
        let input = vec![ConsumeEvent::of(&publish(), "answer", "llm")];
        round_trip(Event::NodeInvoke(NodeInvokeEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            node: node_ref(),
            input_data: input.clone(),
        }));
        round_trip(Event::NodeRespond(NodeRespondEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            node: node_ref(),
            input_data: input.clone(),
            output_data: vec![Message::assistant("hi")],
        }));
        round_trip(Event::NodeFailed(NodeFailedEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            node: node_ref(),
            input_data: input,
            error: "tool unreachable".into(),
        }));
    }

    #[test]
    fn workflow_triple_round_trips() {
        let wf = WorkflowRef {
            workflow_id: WorkflowId::new(),
            workflow_name: "assistant".into(),
            workflow_type: "event_driven".into(),
        };
        round_trip(Event::WorkflowInvoke(WorkflowInvokeEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            workflow: wf.clone(),
            input_data: publish(),
        }));
        round_trip(Event::WorkflowRespond(WorkflowRespondEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            workflow: wf.clone(),
            output_data: vec![Message::assistant("done")],
        }));
        round_trip(Event::WorkflowFailed(WorkflowFailedEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            workflow: wf,
            error: "cancelled".into(),
        }));
    }

    #[test]
    fn tool_triple_round_trips() {
        round_trip(Event::ToolInvoke(ToolInvokeEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            tool_name: "search".into(),
            tool_type: "function".into(),
            input_data: vec![Message::user("q")],
        }));
        round_trip(Event::ToolRespond(ToolRespondEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            tool_name: "search".into(),
            tool_type: "function".into(),
            input_data: vec![Message::user("q")],
            output_data: vec![Message::assistant("a")],
        }));
        round_trip(Event::ToolFailed(ToolFailedEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx(),
            tool_name: "search".into(),
            tool_type: "function".into(),
            input_data: vec![Message::user("q")],
            error: "timeout".into(),
        }));
    }

    #[test]
    fn discriminator_is_snake_case() {
        let json = serde_json::to_value(Event::PublishToTopic(publish())).unwrap();
        assert_eq!(json["event_type"], "publish_to_topic");
    }
}
