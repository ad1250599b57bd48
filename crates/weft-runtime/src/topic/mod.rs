//! Topics: ordered, offset-tracked message channels.
//!
//! A topic is an append-only FIFO log of publish events with one read
//! cursor per consumer and an admission predicate gating what gets
//! in. Three variants share the same core:
//!
//! | Variant | Publishes as | Extra behavior |
//! |---------|--------------|----------------|
//! | Standard | `PublishToTopic` | none |
//! | Output | `OutputTopic` | facade-only consumption, streamed payloads |
//! | Human request | `OutputTopic` + user replies | [`HumanRequestTopic::append_user_input`] |
//!
//! Rejected publishes leave no trace: no offset is burned, no event
//! exists to restore.

mod human;
mod log;

pub use human::HumanRequestTopic;

use self::log::EventLog;
use crate::EngineError;
use std::sync::Arc;
use tracing::debug;
use weft_event::{Event, PublishEvent};
use weft_types::{EventId, InvokeContext, Messages};

/// Reserved topic fed by the facade with the initial user messages.
pub const AGENT_INPUT_TOPIC: &str = "agent_input_topic";
/// Reserved topic carrying user-facing final content; consumed by the
/// facade only.
pub const AGENT_OUTPUT_TOPIC: &str = "agent_output_topic";
/// Reserved variant of the output topic for incremental output.
pub const AGENT_STREAM_OUTPUT_TOPIC: &str = "agent_stream_output_topic";
/// Reserved topic for ask-the-user requests and their replies.
pub const HUMAN_REQUEST_TOPIC: &str = "human_request_topic";

/// Pure predicate a topic applies to every candidate payload.
pub type AdmissionPredicate = Arc<dyn Fn(&Messages) -> bool + Send + Sync>;

/// Shared state of every topic variant.
pub(crate) struct TopicCore {
    name: String,
    admission: Option<AdmissionPredicate>,
    log: EventLog,
}

impl TopicCore {
    fn new(name: String) -> Self {
        Self {
            name,
            admission: None,
            log: EventLog::new(),
        }
    }

    fn admits(&self, data: &Messages) -> bool {
        self.admission.as_ref().map_or(true, |pred| pred(data))
    }
}

/// A topic of one of the three variants.
///
/// All mutation is serialized by the underlying log's lock, so a
/// `Topic` is shared freely across worker tasks.
pub enum Topic {
    /// Node-to-node traffic.
    Standard(StandardTopic),
    /// Facade-facing output channel.
    Output(OutputTopic),
    /// Ask-the-user channel accepting replies.
    HumanRequest(HumanRequestTopic),
}

/// The plain node-to-node topic variant.
pub struct StandardTopic {
    pub(crate) core: TopicCore,
}

/// The facade-facing output variant.
///
/// Only the facade consumes it; the engine never fans its publishes
/// out to node subscribers. Payloads may have been assembled from a
/// message stream before publishing.
pub struct OutputTopic {
    pub(crate) core: TopicCore,
}

impl Topic {
    /// Creates a standard topic.
    #[must_use]
    pub fn standard(name: impl Into<String>) -> Self {
        Self::Standard(StandardTopic {
            core: TopicCore::new(name.into()),
        })
    }

    /// Creates an output topic.
    #[must_use]
    pub fn output(name: impl Into<String>) -> Self {
        Self::Output(OutputTopic {
            core: TopicCore::new(name.into()),
        })
    }

    /// Creates a human-request topic.
    #[must_use]
    pub fn human_request(name: impl Into<String>) -> Self {
        Self::HumanRequest(HumanRequestTopic::new(TopicCore::new(name.into())))
    }

    /// Creates the right variant for a topic name: reserved output
    /// names get the output variant, the reserved human-request name
    /// its variant, everything else is standard.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        match name {
            AGENT_OUTPUT_TOPIC | AGENT_STREAM_OUTPUT_TOPIC => Self::output(name),
            HUMAN_REQUEST_TOPIC => Self::human_request(name),
            _ => Self::standard(name),
        }
    }

    /// Installs an admission predicate.
    #[must_use]
    pub fn with_admission(mut self, predicate: AdmissionPredicate) -> Self {
        self.core_mut().admission = Some(predicate);
        self
    }

    fn core(&self) -> &TopicCore {
        match self {
            Self::Standard(t) => &t.core,
            Self::Output(t) => &t.core,
            Self::HumanRequest(t) => &t.core,
        }
    }

    fn core_mut(&mut self) -> &mut TopicCore {
        match self {
            Self::Standard(t) => &mut t.core,
            Self::Output(t) => &mut t.core,
            Self::HumanRequest(t) => &mut t.core,
        }
    }

    /// The topic name, unique within a workflow.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core().name
    }

    /// Whether publishes here are facade-facing and bypass subscriber
    /// fan-out.
    #[must_use]
    pub fn is_output_channel(&self) -> bool {
        matches!(self, Self::Output(_))
    }

    /// Publishes a message batch.
    ///
    /// The admission predicate is evaluated first; on rejection
    /// nothing happens and `None` is returned. On acceptance the
    /// event gets the next offset and is appended.
    pub fn publish(
        &self,
        invoke_context: &InvokeContext,
        publisher_name: &str,
        publisher_type: &str,
        data: Messages,
        consumed_event_ids: Vec<EventId>,
    ) -> Option<Event> {
        let core = self.core();
        if !core.admits(&data) {
            debug!(topic = %core.name, publisher = publisher_name, "publish rejected by admission predicate");
            return None;
        }
        let event = PublishEvent::new(
            invoke_context.clone(),
            core.name.clone(),
            publisher_name,
            publisher_type,
            data,
            consumed_event_ids,
        );
        Some(match self {
            Self::Standard(t) => Event::PublishToTopic(t.core.log.append(event, false)),
            Self::Output(t) => Event::OutputTopic(t.core.log.append(event, true)),
            // A node publishing here is asking the user something.
            Self::HumanRequest(t) => Event::OutputTopic(t.core.log.append(event, true)),
        })
    }

    /// Whether the consumer has unread node-visible events.
    ///
    /// On the human-request variant, facade-facing requests are not
    /// node-visible; only user replies count.
    #[must_use]
    pub fn can_consume(&self, consumer: &str) -> bool {
        self.core().log.has_unread(consumer, false)
    }

    /// Takes every unread node-visible publish and advances the
    /// consumer's cursor to the end of the log.
    #[must_use]
    pub fn consume(&self, consumer: &str) -> Vec<PublishEvent> {
        self.core().log.take_unread(consumer, false)
    }

    /// Takes every unread facade-facing publish for the consumer.
    ///
    /// On the human-request variant this additionally marks the taken
    /// requests as delivered, unlocking
    /// [`HumanRequestTopic::append_user_input`] for them.
    #[must_use]
    pub fn consume_outputs(&self, consumer: &str) -> Vec<PublishEvent> {
        let taken = self.core().log.take_unread_outputs(consumer);
        if let Self::HumanRequest(t) = self {
            t.mark_delivered(taken.iter().map(|e| e.event_id));
        }
        taken
    }

    /// Replays one stored event into the in-memory state.
    ///
    /// Publish events are re-appended verbatim (offsets preserved);
    /// consume events advance the named consumer's cursor. Other
    /// event kinds are ignored.
    pub fn restore(&self, event: &Event) {
        match event {
            Event::PublishToTopic(publish) => {
                self.core().log.restore(publish.clone(), false);
            }
            Event::OutputTopic(publish) => {
                self.core().log.restore(publish.clone(), true);
                if let Self::HumanRequest(t) = self {
                    // A persisted request was rendered by the facade
                    // before the run ended; replies to it are valid.
                    t.mark_delivered(std::iter::once(publish.event_id));
                }
            }
            Event::ConsumeFromTopic(consume) => {
                self.core().log.advance(&consume.consumer_name, consume.offset);
            }
            _ => {}
        }
    }

    /// Drops all records, cursors and variant state.
    pub fn reset(&self) {
        self.core().log.reset();
        if let Self::HumanRequest(t) = self {
            t.reset();
        }
    }

    /// Number of publishes in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core().log.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access to human-request-specific operations.
    #[must_use]
    pub fn as_human_request(&self) -> Option<&HumanRequestTopic> {
        match self {
            Self::HumanRequest(t) => Some(t),
            _ => None,
        }
    }

    /// Appends a user reply on the human-request variant.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotHumanRequest`] on any other variant, plus
    /// the protocol errors documented on
    /// [`HumanRequestTopic::append_user_input`].
    pub fn append_user_input(
        &self,
        invoke_context: &InvokeContext,
        parent: EventId,
        data: Messages,
    ) -> Result<Option<Event>, EngineError> {
        match self {
            Self::HumanRequest(t) => t.append_user_input(invoke_context, parent, data),
            _ => Err(EngineError::NotHumanRequest(self.name().to_string())),
        }
    }
}
