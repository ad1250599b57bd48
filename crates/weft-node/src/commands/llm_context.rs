//! Context assembly for model-calling commands.
//!
//! A model call needs "the conversation so far" in an order the model
//! can follow. Two sources contribute:
//!
//! 1. Earlier requests in the same conversation: their workflow
//!    inputs and outputs, ordered by message timestamp.
//! 2. The current request: the causal ancestry of the node's consume
//!    frontier, ordered by the ancestor graph.
//!
//! Finally tool responses are re-seated directly after the assistant
//! message that requested them, because chat APIs require call and
//! response to be adjacent regardless of when the response was
//! actually published.

use crate::CommandError;
use std::collections::HashMap;
use tracing::warn;
use weft_event::{AncestorGraph, ConsumeEvent, Event, EventStore};
use weft_types::{InvokeContext, Message, MessageId, Messages, Role};

/// Assembles the ordered message context for a model call.
///
/// # Errors
///
/// Fails when the store cannot be read or the current request's
/// event history is causally incomplete (a dangling parent
/// reference).
pub fn assemble_context(
    store: &dyn EventStore,
    invoke_context: &InvokeContext,
    input: &[ConsumeEvent],
) -> Result<Messages, CommandError> {
    // Prior requests in this conversation.
    let conversation = store.events_for_conversation(invoke_context.conversation_id)?;
    let mut history = Messages::new();
    for event in &conversation {
        if event.invoke_context().assistant_request_id == invoke_context.assistant_request_id {
            continue;
        }
        match event {
            Event::WorkflowInvoke(e) => history.extend(e.input_data.data.iter().cloned()),
            Event::WorkflowRespond(e) => history.extend(e.output_data.iter().cloned()),
            _ => {}
        }
    }
    history.sort_by_key(|message| message.timestamp);

    // Current request: causal ancestry of the consume frontier.
    let request_events = store.events_for_request(invoke_context.assistant_request_id)?;
    let graph = AncestorGraph::build(input, &request_events)?;
    history.extend(pair_tool_responses(graph.messages()));

    Ok(history)
}

/// Moves each tool response directly after the assistant message that
/// requested it.
///
/// A call with no recorded response gets an empty placeholder so the
/// sequence stays well-formed for the model.
fn pair_tool_responses(messages: Messages) -> Messages {
    let mut responses: HashMap<String, Message> = HashMap::new();
    let mut ordered = Messages::new();
    for message in messages {
        match &message.tool_call_id {
            Some(call_id) => {
                responses.insert(call_id.clone(), message);
            }
            None => ordered.push(message),
        }
    }

    let mut out = Messages::with_capacity(ordered.len() + responses.len());
    for message in ordered {
        let calls = message.tool_calls.clone();
        out.push(message);
        for call in calls.iter().flatten() {
            match responses.remove(&call.id) {
                Some(response) => out.push(response),
                None => {
                    warn!(call_id = %call.id, "no tool response recorded, inserting placeholder");
                    out.push(Message {
                        message_id: MessageId::new(),
                        timestamp: 0,
                        role: Role::Tool,
                        content: None,
                        tool_call_id: Some(call.id.clone()),
                        tool_calls: None,
                        name: None,
                        is_streaming: false,
                    });
                }
            }
        }
    }
    out
}
