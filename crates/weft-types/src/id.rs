//! Identifier types for weft.
//!
//! All identifiers are UUID-based so they stay unique across processes
//! and can be persisted alongside events without coordination.
//!
//! Each newtype carries its own `Display` prefix (`msg:`, `evt:`, ...)
//! so log lines and stored records stay unambiguous.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    (
        $(#[$doc:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new identifier with a random UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the inner UUID.
            #[must_use]
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier for a single [`Message`](crate::Message).
    ///
    /// Stable across serialization: a message keeps its id through any
    /// number of store/restore round trips.
    MessageId,
    "msg"
);

uuid_id!(
    /// Identifier for an event record.
    ///
    /// Event ids are the edges of the causal graph: publish events name
    /// the events they consumed via their `consumed_event_ids` list, so
    /// an `EventId` must never be reused within a request.
    EventId,
    "evt"
);

uuid_id!(
    /// Identifier for a node instance inside a workflow.
    ///
    /// Distinct from the node *name*: names are unique per workflow and
    /// used for routing, ids survive serialization of lifecycle events.
    NodeId,
    "node"
);

uuid_id!(
    /// Identifier for a workflow instance.
    WorkflowId,
    "wf"
);

uuid_id!(
    /// Identifier for one assistant request.
    ///
    /// This is the primary correlation key: every event produced while
    /// serving a request carries it, and the event store is queried by
    /// it to decide between a fresh run and a restoration.
    RequestId,
    "req"
);

uuid_id!(
    /// Identifier for a conversation spanning multiple requests.
    ConversationId,
    "conv"
);

uuid_id!(
    /// Identifier for a single invoke within a conversation.
    InvokeId,
    "inv"
);

impl RequestId {
    /// Derives a deterministic request id from an external key.
    ///
    /// Useful when the caller already has a stable request identity
    /// (an HTTP request id, a queue message id) and wants replays of
    /// the same key to land on the same event history.
    ///
    /// # Example
    ///
    /// ```
    /// use weft_types::RequestId;
    ///
    /// let a = RequestId::derived("queue-message-42");
    /// let b = RequestId::derived("queue-message-42");
    /// assert_eq!(a, b);
    /// ```
    #[must_use]
    pub fn derived(key: &str) -> Self {
        Self(Uuid::new_v5(&WEFT_NAMESPACE, key.as_bytes()))
    }
}

/// Namespace UUID for deterministic UUID v5 derivation.
const WEFT_NAMESPACE: Uuid = uuid::uuid!("4f1c2c57-8b3a-4f0e-9e55-1d2ab1c0d9e3");
