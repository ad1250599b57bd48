//! Topic event records.
//!
//! Two record shapes cover all topic traffic:
//!
//! - [`PublishEvent`] - a batch of messages appended to a topic at a
//!   specific offset, naming the events it consumed as causal parents.
//! - [`ConsumeEvent`] - one publish observed by one consumer.
//!
//! A publish to the output or human-request channel is the same record
//! carried under the `OutputTopic` discriminator; the payload may have
//! been assembled from a message stream before it was persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weft_types::{EventId, InvokeContext, Messages};

/// A batch of messages appended to a topic.
///
/// The offset is assigned by the topic at publish time and equals the
/// event's index in the topic log. `consumed_event_ids` lists the
/// events whose consumption produced this publish; following those
/// references backwards reconstructs the causal ancestry of any
/// message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEvent {
    /// Unique event identity.
    pub event_id: EventId,
    /// Creation time, strictly after every parent event.
    pub timestamp: DateTime<Utc>,
    /// Request correlation.
    pub invoke_context: InvokeContext,
    /// Target topic.
    pub topic_name: String,
    /// Index in the topic log, assigned at publish.
    pub offset: usize,
    /// Who published.
    pub publisher_name: String,
    /// Publisher kind ("node", "workflow", "user", ...).
    pub publisher_type: String,
    /// Causal parents: the events consumed to produce this publish.
    pub consumed_event_ids: Vec<EventId>,
    /// The published messages, in order.
    pub data: Messages,
}

impl PublishEvent {
    /// Creates a publish record. The offset is a placeholder until the
    /// topic assigns the real one on append.
    #[must_use]
    pub fn new(
        invoke_context: InvokeContext,
        topic_name: impl Into<String>,
        publisher_name: impl Into<String>,
        publisher_type: impl Into<String>,
        data: Messages,
        consumed_event_ids: Vec<EventId>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context,
            topic_name: topic_name.into(),
            offset: 0,
            publisher_name: publisher_name.into(),
            publisher_type: publisher_type.into(),
            consumed_event_ids,
            data,
        }
    }
}

/// One publish observed by one consumer.
///
/// Offset mirrors the publish being consumed; the data is carried so
/// that downstream processing never has to re-resolve the topic log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeEvent {
    /// Unique event identity.
    pub event_id: EventId,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Request correlation.
    pub invoke_context: InvokeContext,
    /// Source topic.
    pub topic_name: String,
    /// Offset of the publish being consumed.
    pub offset: usize,
    /// Who consumed.
    pub consumer_name: String,
    /// Consumer kind.
    pub consumer_type: String,
    /// The consumed messages.
    pub data: Messages,
}

impl ConsumeEvent {
    /// Records that `consumer` observed `publish`.
    #[must_use]
    pub fn of(
        publish: &PublishEvent,
        consumer_name: impl Into<String>,
        consumer_type: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: publish.invoke_context.clone(),
            topic_name: publish.topic_name.clone(),
            offset: publish.offset,
            consumer_name: consumer_name.into(),
            consumer_type: consumer_type.into(),
            data: publish.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::Message;

    fn ctx() -> InvokeContext {
        InvokeContext::new("user")
    }

    #[test]
    fn consume_mirrors_publish() {
        let mut publish = PublishEvent::new(
            ctx(),
            "inbox",
            "facade",
            "user",
            vec![Message::user("hello")],
            vec![],
        );
        publish.offset = 3;

        let consume = ConsumeEvent::of(&publish, "reader", "node");
        assert_eq!(consume.topic_name, "inbox");
        assert_eq!(consume.offset, 3);
        assert_eq!(consume.data, publish.data);
        assert_ne!(consume.event_id, publish.event_id);
    }
}
