//! Node: a named participant binding subscription, publish targets
//! and a command.

use crate::{Command, NodeError, SubscriptionExpr};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use weft_event::NodeRef;
use weft_types::{FunctionSpec, NodeId};

/// A processing node in a workflow graph.
///
/// A node is pure wiring: it owns no per-request state. Readiness is
/// a function of its subscription expression and the topics' unread
/// state; all mutation happens in topics and the event store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use weft_node::{topic, Command, CommandError, Node};
/// use weft_event::ConsumeEvent;
/// use weft_types::{InvokeContext, Message, Messages};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Command for Echo {
///     async fn invoke(
///         &self,
///         _ctx: &InvokeContext,
///         input: &[ConsumeEvent],
///     ) -> Result<Messages, CommandError> {
///         Ok(weft_node::flatten_input(input))
///     }
/// }
///
/// let node = Node::builder()
///     .name("echo")
///     .subscribe(topic("agent_input_topic"))
///     .publish_to("agent_output_topic")
///     .command(Arc::new(Echo))
///     .build()
///     .unwrap();
///
/// assert_eq!(node.name, "echo");
/// ```
#[derive(Clone)]
pub struct Node {
    /// Instance identity, carried on lifecycle events.
    pub node_id: NodeId,
    /// Name, unique within the workflow; the routing key.
    pub name: String,
    /// Kind label ("llm", "function_call", "retrieval", ...).
    pub node_type: String,
    /// When the node is ready to run.
    pub subscription: SubscriptionExpr,
    /// Topics the node's results are broadcast to.
    ///
    /// May be empty: the node's output is then observable only
    /// through its NodeRespond event in the store.
    pub publish_to: Vec<String>,
    /// The execution capability.
    pub command: Arc<dyn Command>,
    /// Function metadata advertised to upstream model-calling nodes.
    pub function_specs: Vec<FunctionSpec>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("node_id", &self.node_id)
            .field("name", &self.name)
            .field("node_type", &self.node_type)
            .field("subscription", &self.subscription)
            .field("publish_to", &self.publish_to)
            .field("function_specs", &self.function_specs.len())
            .finish()
    }
}

impl Node {
    /// Starts building a node.
    #[must_use]
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    /// All distinct topic names the subscription references.
    #[must_use]
    pub fn subscribed_topics(&self) -> BTreeSet<String> {
        self.subscription.topics()
    }

    /// Whether the node should run, given which of its topics
    /// currently hold unread events for it.
    #[must_use]
    pub fn ready(&self, fresh: &HashSet<String>) -> bool {
        self.subscription.evaluate(fresh)
    }

    /// Identity block for lifecycle events.
    #[must_use]
    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            node_id: self.node_id,
            node_name: self.name.clone(),
            node_type: self.node_type.clone(),
            subscribed_topics: self.subscribed_topics().into_iter().collect(),
            publish_to_topics: self.publish_to.clone(),
        }
    }

    /// Attaches function metadata discovered at graph-build time.
    pub fn add_function_specs(&mut self, specs: &[FunctionSpec]) {
        for spec in specs {
            if !self.function_specs.iter().any(|s| s.name == spec.name) {
                self.function_specs.push(spec.clone());
            }
        }
    }
}

/// Fluent builder for [`Node`].
///
/// Multiple `subscribe` calls are combined conjunctively: the node
/// fires only when every added expression is satisfied.
#[derive(Default)]
pub struct NodeBuilder {
    name: Option<String>,
    node_type: Option<String>,
    subscription: Option<SubscriptionExpr>,
    publish_to: Vec<String>,
    command: Option<Arc<dyn Command>>,
    function_specs: Vec<FunctionSpec>,
}

impl NodeBuilder {
    /// Sets the node name (required).
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the kind label. Defaults to `"node"`.
    #[must_use]
    pub fn node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    /// Adds a subscription expression (required at least once).
    #[must_use]
    pub fn subscribe(mut self, expr: SubscriptionExpr) -> Self {
        self.subscription = Some(match self.subscription.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Adds a publish target.
    #[must_use]
    pub fn publish_to(mut self, topic_name: impl Into<String>) -> Self {
        self.publish_to.push(topic_name.into());
        self
    }

    /// Sets the command (required).
    #[must_use]
    pub fn command(mut self, command: Arc<dyn Command>) -> Self {
        self.command = Some(command);
        self
    }

    /// Advertises function metadata upstream.
    #[must_use]
    pub fn function_specs(mut self, specs: Vec<FunctionSpec>) -> Self {
        self.function_specs = specs;
        self
    }

    /// Finalizes the node.
    ///
    /// # Errors
    ///
    /// Fails when the name, subscription, or command is missing.
    pub fn build(self) -> Result<Node, NodeError> {
        let name = self.name.ok_or(NodeError::MissingName)?;
        let subscription = self
            .subscription
            .ok_or_else(|| NodeError::MissingSubscription(name.clone()))?;
        let command = self
            .command
            .ok_or_else(|| NodeError::MissingCommand(name.clone()))?;

        Ok(Node {
            node_id: NodeId::new(),
            name,
            node_type: self.node_type.unwrap_or_else(|| "node".to_string()),
            subscription,
            publish_to: self.publish_to,
            command,
            function_specs: self.function_specs,
        })
    }
}
