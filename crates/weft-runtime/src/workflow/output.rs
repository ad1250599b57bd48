//! Output-boundary message shaping.

use weft_types::{Message, Messages};

/// Coalesces streamed partial chunks into one terminal message.
///
/// Non-streaming messages pass through in order. All streaming chunks
/// are concatenated into a single message carrying the first chunk's
/// role, appended after the non-streaming ones. Chunks are never
/// persisted individually; this runs before any streamed payload
/// reaches a topic or the facade.
pub(crate) fn coalesce_streaming(messages: Messages) -> Messages {
    let mut out = Messages::new();
    let mut chunks: Vec<Message> = Vec::new();
    for message in messages {
        if message.is_streaming {
            chunks.push(message);
        } else {
            out.push(message);
        }
    }
    if let Some(first) = chunks.first() {
        let content: String = chunks
            .iter()
            .filter_map(|m| m.text())
            .collect::<Vec<_>>()
            .concat();
        out.push(Message::new(first.role, content));
    }
    out
}
