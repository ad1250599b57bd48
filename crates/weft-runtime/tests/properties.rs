//! Invariant checks over complete execution histories.

mod common;

use common::{invoked_nodes, Echo, Reply};
use std::collections::HashMap;
use std::sync::Arc;
use weft_event::{Event, EventStore, InMemoryEventStore};
use weft_node::{topic, Node};
use weft_runtime::{
    DispatchMode, WorkflowBuilder, WorkflowEngine, AGENT_INPUT_TOPIC, AGENT_OUTPUT_TOPIC,
};
use weft_types::{InvokeContext, Message, Messages};

fn ctx() -> InvokeContext {
    InvokeContext::new("prop-user")
}

/// Offsets per topic are contiguous from zero, in publish order.
fn assert_offset_contiguity(events: &[Event]) {
    let mut next: HashMap<&str, usize> = HashMap::new();
    for event in events {
        if let Some(publish) = event.as_publish() {
            let expected = next.entry(publish.topic_name.as_str()).or_insert(0);
            assert_eq!(
                publish.offset, *expected,
                "offset gap on topic {}",
                publish.topic_name
            );
            *expected += 1;
        }
    }
}

/// Consume offsets per (topic, consumer) are strictly increasing.
fn assert_consumer_monotonicity(events: &[Event]) {
    let mut last: HashMap<(String, String), usize> = HashMap::new();
    for event in events {
        if let Event::ConsumeFromTopic(consume) = event {
            let key = (consume.topic_name.clone(), consume.consumer_name.clone());
            if let Some(previous) = last.get(&key) {
                assert!(
                    consume.offset > *previous,
                    "consumer {} re-read offset {} on {}",
                    consume.consumer_name,
                    consume.offset,
                    consume.topic_name
                );
            }
            last.insert(key, consume.offset);
        }
    }
}

/// Every causal parent reference points at a strictly earlier event.
fn assert_causal_ancestry(events: &[Event]) {
    let position: HashMap<_, _> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (e.event_id(), i))
        .collect();
    for (index, event) in events.iter().enumerate() {
        if let Some(publish) = event.as_publish() {
            for parent in &publish.consumed_event_ids {
                let parent_position = position
                    .get(parent)
                    .unwrap_or_else(|| panic!("dangling parent {parent}"));
                assert!(
                    *parent_position < index,
                    "parent {parent} does not precede its child"
                );
            }
        }
    }
}

fn diamond(store: Arc<InMemoryEventStore>, mode: DispatchMode) -> WorkflowEngine {
    WorkflowBuilder::new("diamond")
        .event_store(store)
        .dispatch_mode(mode)
        .node(
            Node::builder()
                .name("left")
                .subscribe(topic(AGENT_INPUT_TOPIC))
                .publish_to("l")
                .command(Arc::new(Reply("left")))
                .build()
                .unwrap(),
        )
        .node(
            Node::builder()
                .name("right")
                .subscribe(topic(AGENT_INPUT_TOPIC))
                .publish_to("r")
                .command(Arc::new(Reply("right")))
                .build()
                .unwrap(),
        )
        .node(
            Node::builder()
                .name("join")
                .subscribe(topic("l").and(topic("r")))
                .publish_to(AGENT_OUTPUT_TOPIC)
                .command(Arc::new(Reply("joined")))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn sequential_diamond_history_upholds_invariants() {
    let store = Arc::new(InMemoryEventStore::new());
    let engine = diamond(store.clone(), DispatchMode::Sequential);

    let ctx = ctx();
    let output = engine
        .invoke(ctx.clone(), vec![Message::user("go")])
        .await
        .unwrap();
    assert_eq!(output[0].text(), Some("joined"));

    let events = store.events_for_request(ctx.assistant_request_id).unwrap();
    assert_offset_contiguity(&events);
    assert_consumer_monotonicity(&events);
    assert_causal_ancestry(&events);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_diamond_upholds_invariants_and_single_firing() {
    let store = Arc::new(InMemoryEventStore::new());
    let engine = diamond(store.clone(), DispatchMode::Parallel { workers: 4 });

    let ctx = ctx();
    let output = engine
        .invoke(ctx.clone(), vec![Message::user("go")])
        .await
        .unwrap();
    assert_eq!(output[0].text(), Some("joined"));

    let events = store.events_for_request(ctx.assistant_request_id).unwrap();
    assert_offset_contiguity(&events);
    assert_consumer_monotonicity(&events);
    assert_causal_ancestry(&events);

    // The joiner consumed both branches in exactly one firing.
    let joins = invoked_nodes(&events)
        .iter()
        .filter(|n| *n == "join")
        .count();
    assert_eq!(joins, 1);
}

#[tokio::test]
async fn no_publish_bypasses_admission() {
    let store = Arc::new(InMemoryEventStore::new());
    let accepts = |data: &Messages| data.iter().all(|m| m.text() != Some("reject"));
    let engine = WorkflowBuilder::new("admission")
        .event_store(store.clone())
        .admission("filtered", Arc::new(accepts))
        .node(
            Node::builder()
                .name("emit_bad")
                .subscribe(topic(AGENT_INPUT_TOPIC))
                .publish_to("filtered")
                .command(Arc::new(Reply("reject")))
                .build()
                .unwrap(),
        )
        .node(
            Node::builder()
                .name("emit_good")
                .subscribe(topic(AGENT_INPUT_TOPIC))
                .publish_to("filtered")
                .command(Arc::new(Reply("fine")))
                .build()
                .unwrap(),
        )
        .node(
            Node::builder()
                .name("relay")
                .subscribe(topic("filtered"))
                .publish_to(AGENT_OUTPUT_TOPIC)
                .command(Arc::new(Echo))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let ctx = ctx();
    let output = engine
        .invoke(ctx.clone(), vec![Message::user("go")])
        .await
        .unwrap();
    assert_eq!(output.len(), 1);
    assert_eq!(output[0].text(), Some("fine"));

    let events = store.events_for_request(ctx.assistant_request_id).unwrap();
    for event in &events {
        if let Some(publish) = event.as_publish() {
            if publish.topic_name == "filtered" {
                assert!(accepts(&publish.data), "stored publish violates admission");
            }
        }
    }
    assert_offset_contiguity(&events);
}

#[tokio::test]
async fn rejected_initial_input_leaves_no_trace() {
    let store = Arc::new(InMemoryEventStore::new());
    let engine = WorkflowBuilder::new("gate")
        .event_store(store.clone())
        .admission(
            AGENT_INPUT_TOPIC,
            Arc::new(|data: &Messages| {
                data.iter().any(|m| m.text().is_some_and(|t| !t.is_empty()))
            }),
        )
        .node(
            Node::builder()
                .name("answer")
                .subscribe(topic(AGENT_INPUT_TOPIC))
                .publish_to(AGENT_OUTPUT_TOPIC)
                .command(Arc::new(Reply("hi")))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let ctx = ctx();
    let output = engine
        .invoke(ctx.clone(), vec![Message::user("")])
        .await
        .unwrap();

    assert!(output.is_empty());
    assert!(!store.has_events_for_request(ctx.assistant_request_id).unwrap());
}

#[tokio::test]
async fn stop_request_halts_dispatch_and_records_failure() {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weft_event::ConsumeEvent;
    use weft_node::{Command, CommandError};

    // A self-looping node with no admission bound; the command pulls
    // the brake after three runs.
    struct StopAfter {
        engine: Arc<Mutex<Option<WorkflowEngine>>>,
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Command for StopAfter {
        async fn invoke(
            &self,
            _ctx: &InvokeContext,
            _input: &[ConsumeEvent],
        ) -> Result<Messages, CommandError> {
            if self.runs.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                if let Some(engine) = self.engine.lock().as_ref() {
                    engine.stop();
                }
            }
            Ok(vec![Message::assistant("again")])
        }
    }

    let handle = Arc::new(Mutex::new(None));
    let store = Arc::new(InMemoryEventStore::new());
    let engine = WorkflowBuilder::new("stoppable")
        .event_store(store.clone())
        .node(
            Node::builder()
                .name("spinner")
                .subscribe(topic(AGENT_INPUT_TOPIC).or(topic("loop")))
                .publish_to("loop")
                .command(Arc::new(StopAfter {
                    engine: handle.clone(),
                    runs: AtomicUsize::new(0),
                }))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    *handle.lock() = Some(engine.clone());

    let ctx = ctx();
    engine
        .invoke(ctx.clone(), vec![Message::user("go")])
        .await
        .unwrap();

    let events = store.events_for_request(ctx.assistant_request_id).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::WorkflowFailed(f) if f.error.contains("stop"))));
    let spins = invoked_nodes(&events).len();
    assert!((3..=4).contains(&spins), "ran {spins} times before stopping");
}
