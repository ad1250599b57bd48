//! Native function execution behind the command boundary.

use crate::{flatten_input, Command, CommandError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use weft_event::ConsumeEvent;
use weft_types::{FunctionSpec, InvokeContext, Message, Messages};

type NativeFn = Arc<dyn Fn(&str) -> Result<String, CommandError> + Send + Sync>;

struct Registered {
    spec: FunctionSpec,
    call: NativeFn,
}

/// A command that executes registered native functions in response to
/// model tool calls.
///
/// The command matches on the *last* message of its input: that
/// message must carry tool-call requests, and each request whose name
/// is registered here is executed. Requests for names registered
/// elsewhere are skipped so that several function nodes can serve one
/// model.
///
/// Each result becomes a `tool`-role message keyed by the originating
/// call id.
///
/// # Example
///
/// ```
/// use weft_node::FunctionCallCommand;
/// use weft_types::FunctionSpec;
///
/// let cmd = FunctionCallCommand::new().register(
///     FunctionSpec::new("now", "Current unix time"),
///     |_args| Ok("1700000000".to_string()),
/// );
/// assert_eq!(cmd.specs().len(), 1);
/// ```
#[derive(Default)]
pub struct FunctionCallCommand {
    functions: HashMap<String, Registered>,
}

impl FunctionCallCommand {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under its spec's name.
    ///
    /// The function receives the model's JSON-encoded arguments
    /// verbatim and returns the text handed back as the tool
    /// response.
    #[must_use]
    pub fn register(
        mut self,
        spec: FunctionSpec,
        call: impl Fn(&str) -> Result<String, CommandError> + Send + Sync + 'static,
    ) -> Self {
        self.functions.insert(
            spec.name.clone(),
            Registered {
                spec,
                call: Arc::new(call),
            },
        );
        self
    }

    /// Specs of every registered function, for upstream
    /// advertisement.
    #[must_use]
    pub fn specs(&self) -> Vec<FunctionSpec> {
        let mut specs: Vec<_> = self.functions.values().map(|r| r.spec.clone()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}

#[async_trait]
impl Command for FunctionCallCommand {
    async fn invoke(
        &self,
        _invoke_context: &InvokeContext,
        input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError> {
        let messages = flatten_input(input);
        let last = messages.last().ok_or(CommandError::NoToolCalls)?;
        let calls = last
            .tool_calls
            .as_ref()
            .filter(|calls| !calls.is_empty())
            .ok_or(CommandError::NoToolCalls)?;

        let mut responses = Messages::new();
        for call in calls {
            let Some(registered) = self.functions.get(&call.function.name) else {
                debug!(function = %call.function.name, "tool call not registered here, skipping");
                continue;
            };
            let result = (registered.call)(&call.function.arguments)?;
            responses.push(Message::tool_response(
                call.id.clone(),
                call.function.name.clone(),
                result,
            ));
        }
        Ok(responses)
    }
}
