//! Event layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EventError::DanglingParent`] | `EVENT_DANGLING_PARENT` | No |
//! | [`EventError::MissingPublish`] | `EVENT_MISSING_PUBLISH` | No |
//! | [`EventError::Serialization`] | `EVENT_SERIALIZATION` | No |
//! | [`EventError::Store`] | `EVENT_STORE` | Yes |

use thiserror::Error;
use weft_types::{ErrorCode, EventId};

/// Errors from the event taxonomy, the ancestor graph, and the store.
#[derive(Debug, Error)]
pub enum EventError {
    /// A publish names a causal parent that is not in the history.
    ///
    /// This is a data-integrity violation: ancestry must never be
    /// silently truncated, so graph construction fails instead of
    /// skipping the reference.
    #[error("publish references unknown parent event {0}")]
    DanglingParent(EventId),

    /// A consume record points at a (topic, offset) with no publish.
    #[error("no publish found for topic '{topic}' at offset {offset}")]
    MissingPublish {
        /// Topic the consume named.
        topic: String,
        /// Offset the consume named.
        offset: usize,
    },

    /// Parent references form a cycle, which publish-time ordering
    /// rules out for well-formed histories.
    #[error("cyclic ancestry detected in event history")]
    CyclicAncestry,

    /// An event failed to (de)serialize.
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store rejected an operation.
    #[error("event store failure: {0}")]
    Store(String),
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::DanglingParent(_) => "EVENT_DANGLING_PARENT",
            Self::MissingPublish { .. } => "EVENT_MISSING_PUBLISH",
            Self::CyclicAncestry => "EVENT_CYCLIC_ANCESTRY",
            Self::Serialization(_) => "EVENT_SERIALIZATION",
            Self::Store(_) => "EVENT_STORE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
