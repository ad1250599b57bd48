//! The human-request topic variant.

use super::TopicCore;
use crate::EngineError;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;
use weft_event::{Event, PublishEvent};
use weft_types::{EventId, InvokeContext, Messages};

/// Topic for asking the user something mid-workflow.
///
/// Nodes publish ask-the-user messages here; they surface to the
/// facade as output events. When the ready queue then drains, the
/// workflow simply returns with the request unanswered. A later call
/// appends the user's reply via [`append_user_input`], which lands as
/// an ordinary publish causally linked to the request, and downstream
/// subscribers become ready.
///
/// The topic tracks which requests the facade has actually been
/// shown. Appending a reply to a request the assistant never saw is a
/// protocol violation, not a race to tolerate.
///
/// [`append_user_input`]: Self::append_user_input
pub struct HumanRequestTopic {
    pub(crate) core: TopicCore,
    delivered: Mutex<HashSet<EventId>>,
}

impl HumanRequestTopic {
    pub(crate) fn new(core: TopicCore) -> Self {
        Self {
            core,
            delivered: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn mark_delivered(&self, ids: impl Iterator<Item = EventId>) {
        self.delivered.lock().extend(ids);
    }

    pub(crate) fn reset(&self) {
        self.delivered.lock().clear();
    }

    /// The newest ask-the-user request without a linked reply.
    #[must_use]
    pub fn pending_request(&self) -> Option<PublishEvent> {
        let records = self.core.log.records();
        let mut answered: HashSet<EventId> = HashSet::new();
        for record in &records {
            if !record.output {
                answered.extend(record.event.consumed_event_ids.iter().copied());
            }
        }
        records
            .into_iter()
            .rev()
            .find(|r| r.output && !answered.contains(&r.event.event_id))
            .map(|r| r.event)
    }

    /// Whether a reply could be appended right now: there is a
    /// pending request and the facade has seen it.
    #[must_use]
    pub fn can_append_user_input(&self) -> bool {
        self.pending_request()
            .is_some_and(|request| self.delivered.lock().contains(&request.event_id))
    }

    /// Takes the consumer's unread requests that still await a reply
    /// and marks everything taken as delivered.
    ///
    /// Requests answered in a previous run are filtered out so a
    /// resumed workflow does not re-surface questions the user has
    /// already dealt with.
    #[must_use]
    pub fn take_unanswered_requests(&self, consumer: &str) -> Vec<PublishEvent> {
        let mut answered: HashSet<EventId> = HashSet::new();
        for record in self.core.log.records() {
            if !record.output {
                answered.extend(record.event.consumed_event_ids.iter().copied());
            }
        }
        let taken = self.core.log.take_unread_outputs(consumer);
        self.mark_delivered(taken.iter().map(|e| e.event_id));
        taken
            .into_iter()
            .filter(|e| !answered.contains(&e.event_id))
            .collect()
    }

    /// Appends the user's reply to the request identified by
    /// `parent`.
    ///
    /// The reply is published with `consumed_event_ids = [parent]`,
    /// so the ancestor graph threads the conversation through the
    /// question. Admission applies as on any publish; a rejected
    /// reply returns `Ok(None)` with no trace.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownParent`] - `parent` was never
    ///   published on this topic.
    /// - [`EngineError::ParentNotDelivered`] - the request exists but
    ///   was never delivered to the assistant.
    pub fn append_user_input(
        &self,
        invoke_context: &InvokeContext,
        parent: EventId,
        data: Messages,
    ) -> Result<Option<Event>, EngineError> {
        let known = self
            .core
            .log
            .records()
            .iter()
            .any(|r| r.output && r.event.event_id == parent);
        if !known {
            return Err(EngineError::UnknownParent(parent));
        }
        if !self.delivered.lock().contains(&parent) {
            return Err(EngineError::ParentNotDelivered(parent));
        }
        if !self.core.admits(&data) {
            debug!(topic = %self.core.name, "user input rejected by admission predicate");
            return Ok(None);
        }

        let event = PublishEvent::new(
            invoke_context.clone(),
            self.core.name.clone(),
            invoke_context.user_id.clone(),
            "user",
            data,
            vec![parent],
        );
        Ok(Some(Event::PublishToTopic(
            self.core.log.append(event, false),
        )))
    }
}
