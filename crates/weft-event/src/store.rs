//! Event store contract and the in-memory reference implementation.
//!
//! The store is the source of truth for a request: topics and
//! consumer offsets are in-memory conveniences that can be rebuilt
//! from the stored history at any time. Backends must provide atomic,
//! ordered-per-request appends; everything else is a query.

use crate::{Event, EventError};
use parking_lot::Mutex;
use std::collections::HashMap;
use weft_types::{ConversationId, EventId, RequestId};

/// Append-only event persistence keyed by request id.
///
/// # Contract
///
/// - `append` is atomic and preserves per-request order.
/// - `events_for_request` returns the complete history in append
///   order.
/// - `has_events_for_request` decides fresh-run vs. restoration.
///
/// Implementations must be `Send + Sync`; the engine appends from
/// whichever task executed the node.
pub trait EventStore: Send + Sync {
    /// Appends one event.
    fn append(&self, event: Event) -> Result<(), EventError>;

    /// Appends a batch. Ordering within the batch is preserved;
    /// atomicity across the batch is backend-dependent.
    fn append_batch(&self, events: Vec<Event>) -> Result<(), EventError> {
        for event in events {
            self.append(event)?;
        }
        Ok(())
    }

    /// Complete history for one request, in append order.
    fn events_for_request(&self, request_id: RequestId) -> Result<Vec<Event>, EventError>;

    /// Whether any event exists for the request.
    fn has_events_for_request(&self, request_id: RequestId) -> Result<bool, EventError>;

    /// Complete history for a conversation, in append order.
    fn events_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Event>, EventError>;

    /// Looks up a single event by id.
    fn event(&self, event_id: EventId) -> Result<Option<Event>, EventError>;

    /// Request ids whose WorkflowInvoke has no matching
    /// WorkflowRespond or WorkflowFailed, in first-seen order.
    fn unfinished_requests(&self) -> Result<Vec<RequestId>, EventError>;
}

#[derive(Default)]
struct StoreInner {
    events: Vec<Event>,
    by_id: HashMap<EventId, usize>,
    by_request: HashMap<RequestId, Vec<usize>>,
    by_conversation: HashMap<ConversationId, Vec<usize>>,
    request_order: Vec<RequestId>,
}

/// In-memory [`EventStore`] for tests and single-process deployments.
///
/// All state lives behind one lock; appends are O(1) and queries
/// return clones so callers never hold the lock.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events, across all requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// Whether the store holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: Event) -> Result<(), EventError> {
        let mut inner = self.inner.lock();
        let index = inner.events.len();
        let request_id = event.invoke_context().assistant_request_id;
        let conversation_id = event.invoke_context().conversation_id;

        inner.by_id.insert(event.event_id(), index);
        if !inner.by_request.contains_key(&request_id) {
            inner.request_order.push(request_id);
        }
        inner.by_request.entry(request_id).or_default().push(index);
        inner
            .by_conversation
            .entry(conversation_id)
            .or_default()
            .push(index);
        inner.events.push(event);
        Ok(())
    }

    fn events_for_request(&self, request_id: RequestId) -> Result<Vec<Event>, EventError> {
        let inner = self.inner.lock();
        Ok(inner
            .by_request
            .get(&request_id)
            .map(|indices| indices.iter().map(|&i| inner.events[i].clone()).collect())
            .unwrap_or_default())
    }

    fn has_events_for_request(&self, request_id: RequestId) -> Result<bool, EventError> {
        Ok(self.inner.lock().by_request.contains_key(&request_id))
    }

    fn events_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Event>, EventError> {
        let inner = self.inner.lock();
        Ok(inner
            .by_conversation
            .get(&conversation_id)
            .map(|indices| indices.iter().map(|&i| inner.events[i].clone()).collect())
            .unwrap_or_default())
    }

    fn event(&self, event_id: EventId) -> Result<Option<Event>, EventError> {
        let inner = self.inner.lock();
        Ok(inner.by_id.get(&event_id).map(|&i| inner.events[i].clone()))
    }

    fn unfinished_requests(&self) -> Result<Vec<RequestId>, EventError> {
        let inner = self.inner.lock();
        let mut unfinished = Vec::new();
        for request_id in &inner.request_order {
            let Some(indices) = inner.by_request.get(request_id) else {
                continue;
            };
            let mut invoked = false;
            let mut finished = false;
            for &i in indices {
                match &inner.events[i] {
                    Event::WorkflowInvoke(_) => invoked = true,
                    Event::WorkflowRespond(_) | Event::WorkflowFailed(_) => finished = true,
                    _ => {}
                }
            }
            if invoked && !finished {
                unfinished.push(*request_id);
            }
        }
        Ok(unfinished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PublishEvent, WorkflowInvokeEvent, WorkflowRef, WorkflowRespondEvent};
    use chrono::Utc;
    use weft_types::{InvokeContext, Message, WorkflowId};

    fn publish(ctx: &InvokeContext) -> PublishEvent {
        PublishEvent::new(
            ctx.clone(),
            "inbox",
            "facade",
            "user",
            vec![Message::user("hello")],
            vec![],
        )
    }

    fn workflow_ref() -> WorkflowRef {
        WorkflowRef {
            workflow_id: WorkflowId::new(),
            workflow_name: "assistant".into(),
            workflow_type: "event_driven".into(),
        }
    }

    fn invoke(ctx: &InvokeContext) -> Event {
        Event::WorkflowInvoke(WorkflowInvokeEvent {
            event_id: weft_types::EventId::new(),
            timestamp: Utc::now(),
            invoke_context: ctx.clone(),
            workflow: workflow_ref(),
            input_data: publish(ctx),
        })
    }

    #[test]
    fn append_and_query_by_request() {
        let store = InMemoryEventStore::new();
        let ctx = InvokeContext::new("u");
        let other = InvokeContext::new("u");

        store.append(Event::PublishToTopic(publish(&ctx))).unwrap();
        store.append(Event::PublishToTopic(publish(&other))).unwrap();
        store.append(Event::PublishToTopic(publish(&ctx))).unwrap();

        let events = store.events_for_request(ctx.assistant_request_id).unwrap();
        assert_eq!(events.len(), 2);
        assert!(store.has_events_for_request(ctx.assistant_request_id).unwrap());
        assert!(!store
            .has_events_for_request(weft_types::RequestId::new())
            .unwrap());
    }

    #[test]
    fn append_preserves_order() {
        let store = InMemoryEventStore::new();
        let ctx = InvokeContext::new("u");

        let mut ids = Vec::new();
        for _ in 0..5 {
            let event = Event::PublishToTopic(publish(&ctx));
            ids.push(event.event_id());
            store.append(event).unwrap();
        }

        let stored: Vec<_> = store
            .events_for_request(ctx.assistant_request_id)
            .unwrap()
            .iter()
            .map(Event::event_id)
            .collect();
        assert_eq!(stored, ids);
    }

    #[test]
    fn lookup_by_event_id() {
        let store = InMemoryEventStore::new();
        let ctx = InvokeContext::new("u");
        let event = Event::PublishToTopic(publish(&ctx));
        let id = event.event_id();

        store.append(event.clone()).unwrap();
        assert_eq!(store.event(id).unwrap(), Some(event));
        assert_eq!(store.event(weft_types::EventId::new()).unwrap(), None);
    }

    #[test]
    fn conversation_queries_span_requests() {
        let store = InMemoryEventStore::new();
        let first = InvokeContext::new("u");
        let second = first.next_request();

        store.append(Event::PublishToTopic(publish(&first))).unwrap();
        store.append(Event::PublishToTopic(publish(&second))).unwrap();

        let events = store.events_for_conversation(first.conversation_id).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn unfinished_requests_need_invoke_without_close() {
        let store = InMemoryEventStore::new();
        let open = InvokeContext::new("u");
        let closed = InvokeContext::new("u");
        let never_invoked = InvokeContext::new("u");

        store.append(invoke(&open)).unwrap();
        store.append(invoke(&closed)).unwrap();
        store
            .append(Event::WorkflowRespond(WorkflowRespondEvent {
                event_id: weft_types::EventId::new(),
                timestamp: Utc::now(),
                invoke_context: closed.clone(),
                workflow: workflow_ref(),
                output_data: vec![],
            }))
            .unwrap();
        store
            .append(Event::PublishToTopic(publish(&never_invoked)))
            .unwrap();

        assert_eq!(
            store.unfinished_requests().unwrap(),
            vec![open.assistant_request_id]
        );
    }
}
