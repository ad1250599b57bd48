//! Node and command layer errors.

use thiserror::Error;
use weft_event::EventError;
use weft_types::ErrorCode;

/// Errors from node construction.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The builder was finalized without a name.
    #[error("node has no name")]
    MissingName,

    /// The builder was finalized without a subscription expression.
    #[error("node '{0}' has no subscription")]
    MissingSubscription(String),

    /// The builder was finalized without a command.
    #[error("node '{0}' has no command")]
    MissingCommand(String),
}

impl ErrorCode for NodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingName => "NODE_MISSING_NAME",
            Self::MissingSubscription(_) => "NODE_MISSING_SUBSCRIPTION",
            Self::MissingCommand(_) => "NODE_MISSING_COMMAND",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Errors from command execution.
///
/// A command error is captured by the engine as a NodeFailed event;
/// consumer offsets are not advanced, so a later restoration replays
/// the node with the same input.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command (or the tool behind it) failed.
    #[error("command failed: {0}")]
    Failed(String),

    /// The command exceeded its own deadline.
    #[error("command timed out after {0} ms")]
    Timeout(u64),

    /// A function-call command received input whose last message
    /// carries no tool-call request.
    #[error("input carries no tool calls")]
    NoToolCalls,

    /// Event-layer failure while assembling context.
    #[error(transparent)]
    Event(#[from] EventError),
}

impl ErrorCode for CommandError {
    fn code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "CMD_FAILED",
            Self::Timeout(_) => "CMD_TIMEOUT",
            Self::NoToolCalls => "CMD_NO_TOOL_CALLS",
            Self::Event(_) => "CMD_EVENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::assert_error_code;

    #[test]
    fn node_codes_follow_convention() {
        assert_error_code(&NodeError::MissingName, "NODE_");
        assert_error_code(&NodeError::MissingSubscription("n".into()), "NODE_");
        assert_error_code(&NodeError::MissingCommand("n".into()), "NODE_");
    }

    #[test]
    fn command_codes_follow_convention() {
        assert_error_code(&CommandError::Failed("x".into()), "CMD_");
        assert_error_code(&CommandError::Timeout(100), "CMD_");
        assert_error_code(&CommandError::NoToolCalls, "CMD_");
    }

    #[test]
    fn timeouts_are_recoverable() {
        assert!(CommandError::Timeout(100).is_recoverable());
        assert!(!CommandError::NoToolCalls.is_recoverable());
    }
}
