//! Streamed output coalescing at the output boundary.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use weft_event::{ConsumeEvent, Event, EventStore, InMemoryEventStore};
use weft_node::{topic, Command, CommandError, Node};
use weft_runtime::{WorkflowBuilder, AGENT_INPUT_TOPIC, AGENT_STREAM_OUTPUT_TOPIC};
use weft_types::{InvokeContext, Message, Messages};

/// Streams three chunks, then closes.
struct ChunkedReply;

#[async_trait]
impl Command for ChunkedReply {
    async fn invoke(
        &self,
        _ctx: &InvokeContext,
        _input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError> {
        // The engine uses the streaming entry point for this node;
        // the plain one is unreachable.
        Err(CommandError::Failed("invoke() on a streaming command".into()))
    }

    async fn invoke_stream(
        &self,
        _ctx: &InvokeContext,
        _input: &[ConsumeEvent],
    ) -> Result<mpsc::Receiver<Message>, CommandError> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for chunk in ["stre", "amed ", "reply"] {
                if tx.send(Message::assistant(chunk).streaming()).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

#[tokio::test]
async fn stream_chunks_are_coalesced_before_persistence() {
    let store = Arc::new(InMemoryEventStore::new());
    let engine = WorkflowBuilder::new("streamer")
        .event_store(store.clone())
        .node(
            Node::builder()
                .name("stream")
                .subscribe(topic(AGENT_INPUT_TOPIC))
                .publish_to(AGENT_STREAM_OUTPUT_TOPIC)
                .command(Arc::new(ChunkedReply))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let ctx = InvokeContext::new("stream-user");
    let output = engine
        .invoke(ctx.clone(), vec![Message::user("talk to me")])
        .await
        .unwrap();

    // The facade sees exactly one terminal message.
    assert_eq!(output.len(), 1);
    assert_eq!(output[0].text(), Some("streamed reply"));
    assert!(!output[0].is_streaming);

    // So does the store: chunks are never persisted individually.
    let events = store.events_for_request(ctx.assistant_request_id).unwrap();
    let stream_publishes: Vec<_> = events
        .iter()
        .filter(|e| e.is_output())
        .filter_map(Event::as_publish)
        .filter(|p| p.topic_name == AGENT_STREAM_OUTPUT_TOPIC)
        .collect();
    assert_eq!(stream_publishes.len(), 1);
    assert_eq!(stream_publishes[0].data.len(), 1);
    assert_eq!(stream_publishes[0].data[0].text(), Some("streamed reply"));
    assert!(!stream_publishes[0].data[0].is_streaming);
}
