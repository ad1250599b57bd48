//! Shared stub commands and assertion helpers for the integration
//! suites.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use weft_event::{ConsumeEvent, Event};
use weft_node::{flatten_input, Command, CommandError};
use weft_types::{InvokeContext, Message, Messages};

/// Replies with one fixed assistant message.
pub struct Reply(pub &'static str);

#[async_trait]
impl Command for Reply {
    async fn invoke(
        &self,
        _ctx: &InvokeContext,
        _input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError> {
        Ok(vec![Message::assistant(self.0)])
    }
}

/// Echoes its flattened input unchanged.
pub struct Echo;

#[async_trait]
impl Command for Echo {
    async fn invoke(
        &self,
        _ctx: &InvokeContext,
        input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError> {
        Ok(flatten_input(input))
    }
}

/// Records every input frontier it is dispatched with.
pub struct Capture {
    pub seen: Arc<Mutex<Vec<Vec<ConsumeEvent>>>>,
    reply: &'static str,
}

impl Capture {
    pub fn new(reply: &'static str) -> (Self, Arc<Mutex<Vec<Vec<ConsumeEvent>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                seen: seen.clone(),
                reply,
            },
            seen,
        )
    }
}

#[async_trait]
impl Command for Capture {
    async fn invoke(
        &self,
        _ctx: &InvokeContext,
        input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError> {
        self.seen.lock().push(input.to_vec());
        Ok(vec![Message::assistant(self.reply)])
    }
}

/// Appends one "x" to the incoming content until three are reached,
/// then emits "stop".
pub struct Grow;

#[async_trait]
impl Command for Grow {
    async fn invoke(
        &self,
        _ctx: &InvokeContext,
        input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError> {
        let content = flatten_input(input)
            .last()
            .and_then(|m| m.text().map(str::to_string))
            .unwrap_or_default();
        let next = if content.len() >= 3 {
            "stop".to_string()
        } else {
            format!("{content}x")
        };
        Ok(vec![Message::assistant(next)])
    }
}

/// Always fails.
pub struct Broken;

#[async_trait]
impl Command for Broken {
    async fn invoke(
        &self,
        _ctx: &InvokeContext,
        _input: &[ConsumeEvent],
    ) -> Result<Messages, CommandError> {
        Err(CommandError::Failed("deliberately broken".into()))
    }
}

/// Short discriminator name for sequence assertions.
pub fn kind(event: &Event) -> &'static str {
    match event {
        Event::PublishToTopic(_) => "publish",
        Event::OutputTopic(_) => "output",
        Event::ConsumeFromTopic(_) => "consume",
        Event::NodeInvoke(_) => "node_invoke",
        Event::NodeRespond(_) => "node_respond",
        Event::NodeFailed(_) => "node_failed",
        Event::WorkflowInvoke(_) => "workflow_invoke",
        Event::WorkflowRespond(_) => "workflow_respond",
        Event::WorkflowFailed(_) => "workflow_failed",
        Event::ToolInvoke(_) => "tool_invoke",
        Event::ToolRespond(_) => "tool_respond",
        Event::ToolFailed(_) => "tool_failed",
    }
}

/// All event kinds for a request, in append order.
pub fn kinds(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(kind).collect()
}

/// Node names of every NodeInvoke in the history.
pub fn invoked_nodes(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::NodeInvoke(e) => Some(e.node.node_name.clone()),
            _ => None,
        })
        .collect()
}
