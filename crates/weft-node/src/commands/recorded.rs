//! Tool-boundary event recording.

use crate::{flatten_input, Command, CommandError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use weft_event::{
    ConsumeEvent, Event, EventStore, ToolFailedEvent, ToolInvokeEvent, ToolRespondEvent,
};
use weft_types::{EventId, InvokeContext, Messages};

/// Wraps a command so every execution leaves a ToolInvoke and a
/// ToolRespond (or ToolFailed) record in the event store.
///
/// The engine only sees node lifecycle; this wrapper is how the tool
/// behind a command shows up in the history. Recording failures are
/// surfaced as command errors: a history with holes is worse than a
/// failed call.
pub struct Recorded<C> {
    inner: C,
    tool_name: String,
    tool_type: String,
    store: Arc<dyn EventStore>,
}

impl<C: Command> Recorded<C> {
    /// Wraps `inner`, recording under the given tool identity.
    #[must_use]
    pub fn new(
        inner: C,
        tool_name: impl Into<String>,
        tool_type: impl Into<String>,
        store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            inner,
            tool_name: tool_name.into(),
            tool_type: tool_type.into(),
            store,
        }
    }
}

#[async_trait]
impl<C: Command> Command for Recorded<C> {
    async fn invoke(
        &self,
        invoke_context: &InvokeContext,
        input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError> {
        let input_messages = flatten_input(input);
        self.store
            .append(Event::ToolInvoke(ToolInvokeEvent {
                event_id: EventId::new(),
                timestamp: Utc::now(),
                invoke_context: invoke_context.clone(),
                tool_name: self.tool_name.clone(),
                tool_type: self.tool_type.clone(),
                input_data: input_messages.clone(),
            }))
            .map_err(CommandError::from)?;

        match self.inner.invoke(invoke_context, input).await {
            Ok(output) => {
                self.store
                    .append(Event::ToolRespond(ToolRespondEvent {
                        event_id: EventId::new(),
                        timestamp: Utc::now(),
                        invoke_context: invoke_context.clone(),
                        tool_name: self.tool_name.clone(),
                        tool_type: self.tool_type.clone(),
                        input_data: input_messages,
                        output_data: output.clone(),
                    }))
                    .map_err(CommandError::from)?;
                Ok(output)
            }
            Err(err) => {
                self.store
                    .append(Event::ToolFailed(ToolFailedEvent {
                        event_id: EventId::new(),
                        timestamp: Utc::now(),
                        invoke_context: invoke_context.clone(),
                        tool_name: self.tool_name.clone(),
                        tool_type: self.tool_type.clone(),
                        input_data: input_messages,
                        error: err.to_string(),
                    }))
                    .map_err(CommandError::from)?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_event::InMemoryEventStore;
    use weft_types::Message;

    struct Fixed(Result<Messages, String>);

    #[async_trait]
    impl Command for Fixed {
        async fn invoke(
            &self,
            _ctx: &InvokeContext,
            _input: &[ConsumeEvent],
        ) -> Result<Messages, CommandError> {
            self.0.clone().map_err(CommandError::Failed)
        }
    }

    #[tokio::test]
    async fn success_records_invoke_and_respond() {
        let store = Arc::new(InMemoryEventStore::new());
        let cmd = Recorded::new(
            Fixed(Ok(vec![Message::assistant("out")])),
            "search",
            "function",
            store.clone(),
        );
        let ctx = InvokeContext::new("u");

        cmd.invoke(&ctx, &[]).await.unwrap();

        let events = store.events_for_request(ctx.assistant_request_id).unwrap();
        assert!(matches!(events[0], Event::ToolInvoke(_)));
        assert!(matches!(events[1], Event::ToolRespond(_)));
    }

    #[tokio::test]
    async fn failure_records_tool_failed() {
        let store = Arc::new(InMemoryEventStore::new());
        let cmd = Recorded::new(
            Fixed(Err("backend down".into())),
            "search",
            "function",
            store.clone(),
        );
        let ctx = InvokeContext::new("u");

        let err = cmd.invoke(&ctx, &[]).await.unwrap_err();
        assert!(matches!(err, CommandError::Failed(_)));

        let events = store.events_for_request(ctx.assistant_request_id).unwrap();
        assert!(matches!(events[0], Event::ToolInvoke(_)));
        let Event::ToolFailed(failed) = &events[1] else {
            panic!("expected ToolFailed");
        };
        assert!(failed.error.contains("backend down"));
    }
}
