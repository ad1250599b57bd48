//! Conversational message unit.
//!
//! A [`Message`] is the immutable payload that flows through topics.
//! Messages are created once (by the input boundary or by a command)
//! and then only ever copied into events; nothing mutates a message
//! after creation.

use crate::MessageId;
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Instructions injected by the application.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// A tool's response to an assistant tool call.
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// Message content: plain text or an arbitrary structured payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content.
    Text(String),
    /// Structured content (tool results, multimodal parts).
    Structured(serde_json::Value),
}

impl Content {
    /// Returns the content as text when it is plain text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Structured(_) => None,
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call.
    pub name: String,
    /// JSON-encoded arguments, as produced by the model.
    pub arguments: String,
}

/// One entry of a message's `tool_calls` list.
///
/// The `id` is echoed back by the responding tool message's
/// [`Message::tool_call_id`], which is how calls and responses are
/// paired when conversational context is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id for this call.
    pub id: String,
    /// The requested function invocation.
    pub function: FunctionCall,
}

/// An immutable conversational message.
///
/// # Invariants
///
/// - `message_id` is stable across serialization.
/// - `timestamp` is nanoseconds since the Unix epoch, taken at
///   creation; messages produced by the same clock are strictly
///   ordered by it.
///
/// # Tool-use conventions
///
/// A message with a non-empty [`tool_calls`](Self::tool_calls) list
/// signals "call these functions next". A message carrying a
/// [`tool_call_id`](Self::tool_call_id) is a tool response keyed to
/// the original call.
///
/// # Example
///
/// ```
/// use weft_types::{Message, Role};
///
/// let m = Message::user("hello");
/// assert_eq!(m.role, Role::User);
/// assert_eq!(m.text(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique, serialization-stable identity.
    pub message_id: MessageId,
    /// Nanoseconds since the Unix epoch, assigned at creation.
    pub timestamp: i64,
    /// Who produced the message.
    pub role: Role,
    /// Payload; `None` for pure tool-call requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// Back-reference to the tool call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Function invocations requested by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Optional source or function identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Marks a partial chunk of a streamed response.
    ///
    /// Streamed chunks are coalesced into a single terminal message at
    /// the output boundary before persistence.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_streaming: bool,
}

/// An ordered batch of messages, the unit a topic publish carries.
pub type Messages = Vec<Message>;

impl Message {
    /// Creates a message with the given role and content.
    #[must_use]
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            message_id: MessageId::new(),
            timestamp: now_nanos(),
            role,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
            name: None,
            is_streaming: false,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates an assistant message that requests tool calls.
    #[must_use]
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            message_id: MessageId::new(),
            timestamp: now_nanos(),
            role: Role::Assistant,
            content: None,
            tool_call_id: None,
            tool_calls: Some(calls),
            name: None,
            is_streaming: false,
        }
    }

    /// Creates a tool response keyed to the originating call.
    #[must_use]
    pub fn tool_response(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<Content>,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            timestamp: now_nanos(),
            role: Role::Tool,
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
            name: Some(name.into()),
            is_streaming: false,
        }
    }

    /// Marks this message as a streamed partial chunk.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.is_streaming = true;
        self
    }

    /// Returns the content as plain text, if it is text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(Content::as_text)
    }

    /// Returns `true` if this message requests at least one tool call.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Nanoseconds since the Unix epoch.
///
/// Saturates at `i64::MAX` on the (year-2262) overflow rather than
/// failing message creation.
fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_roles() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("hi").role, Role::Assistant);
        assert_eq!(Message::system("hi").role, Role::System);
    }

    #[test]
    fn timestamps_are_monotonic_per_clock() {
        let a = Message::user("first");
        let b = Message::user("second");
        assert!(a.timestamp <= b.timestamp);
    }

    #[test]
    fn tool_call_round_trip_pairing() {
        let call = ToolCall {
            id: "call-1".into(),
            function: FunctionCall {
                name: "lookup".into(),
                arguments: r#"{"q":"weather"}"#.into(),
            },
        };
        let request = Message::tool_calls(vec![call]);
        assert!(request.has_tool_calls());
        assert!(request.content.is_none());

        let response = Message::tool_response("call-1", "lookup", "sunny");
        assert_eq!(response.role, Role::Tool);
        assert_eq!(response.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn message_id_survives_serialization() {
        let m = Message::assistant("stable");
        let json = serde_json::to_string(&m).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(m.message_id, back.message_id);
        assert_eq!(m, back);
    }

    #[test]
    fn structured_content_round_trips() {
        let mut m = Message::user("x");
        m.content = Some(Content::Structured(serde_json::json!({"k": [1, 2]})));
        let json = serde_json::to_string(&m).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn streaming_flag_defaults_off() {
        let m = Message::assistant("chunk");
        assert!(!m.is_streaming);
        assert!(m.streaming().is_streaming);
    }
}
