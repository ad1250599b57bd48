//! The command boundary.
//!
//! A [`Command`] is the opaque execution capability a node owns: the
//! engine hands it the consumed input events and takes back messages
//! (or an error). Language-model adapters, retrieval backends and
//! native functions all sit behind this one trait; the engine never
//! looks inside.

use crate::CommandError;
use async_trait::async_trait;
use tokio::sync::mpsc;
use weft_event::ConsumeEvent;
use weft_types::{InvokeContext, Message, Messages};

/// Opaque execution capability consumed by a node.
///
/// # Contract
///
/// `invoke` receives the request context and the consume events the
/// node just read, and returns the produced messages or fails. The
/// streaming variant yields zero or more messages and then
/// terminates; its default implementation runs `invoke` and replays
/// the result as a finite stream.
///
/// Commands hold no per-request state; anything request-scoped
/// belongs in topics, the event store, or the context.
///
/// Cancellation is the command's own responsibility: the engine lets
/// an in-flight command finish and acts on its result.
#[async_trait]
pub trait Command: Send + Sync {
    /// Executes against the consumed input, producing messages.
    async fn invoke(
        &self,
        invoke_context: &InvokeContext,
        input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError>;

    /// Streaming variant: yields messages as they become available,
    /// then closes the channel.
    ///
    /// Chunks should carry [`Message::is_streaming`] until the
    /// terminal message; the output boundary coalesces the chunks
    /// before persisting.
    async fn invoke_stream(
        &self,
        invoke_context: &InvokeContext,
        input: &[ConsumeEvent],
    ) -> Result<mpsc::Receiver<Message>, CommandError> {
        let messages = self.invoke(invoke_context, input).await?;
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for message in messages {
            // Capacity covers the whole batch; the only send failure
            // is a dropped receiver, which means nobody is listening.
            if tx.try_send(message).is_err() {
                break;
            }
        }
        Ok(rx)
    }
}

/// Flattens consume events into one ordered message list.
///
/// The default input shape for simple commands: topic order as
/// consumed, message order as published. Commands that need causal
/// ordering across topics use the ancestor graph instead.
#[must_use]
pub fn flatten_input(input: &[ConsumeEvent]) -> Messages {
    input
        .iter()
        .flat_map(|event| event.data.iter().cloned())
        .collect()
}
