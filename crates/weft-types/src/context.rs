//! Request-scoped correlation context.

use crate::{ConversationId, InvokeId, RequestId};
use serde::{Deserialize, Serialize};

/// The correlation bundle attached to every event produced while
/// serving one assistant request.
///
/// # Correlation keys
///
/// | Field | Scope | Used for |
/// |-------|-------|----------|
/// | `assistant_request_id` | One request | Event store queries, fresh-vs-restore decision |
/// | `conversation_id` | Many requests | Cross-request conversation history |
/// | `invoke_id` | One invoke | Distinguishing retries of the same request |
/// | `user_id` | External | Attribution; opaque to the engine |
///
/// The context is cheap to clone and is carried by value on events.
///
/// # Example
///
/// ```
/// use weft_types::InvokeContext;
///
/// let ctx = InvokeContext::new("user-1");
/// assert_eq!(ctx.user_id, "user-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeContext {
    /// Primary correlation key for the request being served.
    pub assistant_request_id: RequestId,
    /// The conversation this request belongs to.
    pub conversation_id: ConversationId,
    /// The individual invoke within the conversation.
    pub invoke_id: InvokeId,
    /// External identity of the requesting user.
    pub user_id: String,
}

impl InvokeContext {
    /// Creates a context with fresh ids for a new request.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            assistant_request_id: RequestId::new(),
            conversation_id: ConversationId::new(),
            invoke_id: InvokeId::new(),
            user_id: user_id.into(),
        }
    }

    /// Creates a follow-up context in the same conversation.
    ///
    /// The request and invoke ids are fresh; the conversation id and
    /// user identity carry over, so history assembled per conversation
    /// spans both requests.
    #[must_use]
    pub fn next_request(&self) -> Self {
        Self {
            assistant_request_id: RequestId::new(),
            conversation_id: self.conversation_id,
            invoke_id: InvokeId::new(),
            user_id: self.user_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_request_keeps_conversation() {
        let first = InvokeContext::new("u");
        let second = first.next_request();

        assert_eq!(first.conversation_id, second.conversation_id);
        assert_eq!(first.user_id, second.user_id);
        assert_ne!(first.assistant_request_id, second.assistant_request_id);
        assert_ne!(first.invoke_id, second.invoke_id);
    }

    #[test]
    fn context_round_trips() {
        let ctx = InvokeContext::new("u");
        let json = serde_json::to_string(&ctx).unwrap();
        let back: InvokeContext = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx, back);
    }
}
