//! Workflow graph assembly and validation.

use crate::topic::{
    AdmissionPredicate, Topic, AGENT_INPUT_TOPIC, AGENT_OUTPUT_TOPIC, AGENT_STREAM_OUTPUT_TOPIC,
};
use crate::workflow::engine::{DispatchMode, EngineInner, WorkflowEngine};
use crate::GraphError;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use weft_event::{EventStore, InMemoryEventStore};
use weft_node::Node;
use weft_types::WorkflowId;

/// Node kind label that advertises function specs upstream.
pub const FUNCTION_CALL_NODE_TYPE: &str = "function_call";
/// Node kind label that receives advertised function specs.
pub const LLM_NODE_TYPE: &str = "llm";

/// Fluent builder for a [`WorkflowEngine`].
///
/// Topics are registered automatically from node subscriptions and
/// publish targets; the reserved input and output topics always
/// exist. Graph defects are reported at [`build`](Self::build), never
/// at runtime.
///
/// # Example
///
/// ```no_run
/// use weft_runtime::{WorkflowBuilder, AGENT_INPUT_TOPIC, AGENT_OUTPUT_TOPIC};
/// use weft_node::{topic, Node};
/// # fn node() -> Node { unimplemented!() }
///
/// let engine = WorkflowBuilder::new("assistant")
///     .node(node())
///     .build()
///     .unwrap();
/// ```
pub struct WorkflowBuilder {
    name: String,
    workflow_type: String,
    nodes: Vec<Node>,
    admissions: HashMap<String, AdmissionPredicate>,
    store: Option<Arc<dyn EventStore>>,
    mode: DispatchMode,
}

impl WorkflowBuilder {
    /// Starts a builder for a workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workflow_type: "event_driven".to_string(),
            nodes: Vec::new(),
            admissions: HashMap::new(),
            store: None,
            mode: DispatchMode::Sequential,
        }
    }

    /// Sets the workflow kind label.
    #[must_use]
    pub fn workflow_type(mut self, workflow_type: impl Into<String>) -> Self {
        self.workflow_type = workflow_type.into();
        self
    }

    /// Adds a node. Duplicate names are rejected at build.
    #[must_use]
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Installs an admission predicate on the named topic.
    #[must_use]
    pub fn admission(mut self, topic_name: impl Into<String>, predicate: AdmissionPredicate) -> Self {
        self.admissions.insert(topic_name.into(), predicate);
        self
    }

    /// Injects the event store. Defaults to an
    /// [`InMemoryEventStore`].
    #[must_use]
    pub fn event_store(mut self, store: Arc<dyn EventStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Chooses the dispatch mode. Defaults to
    /// [`DispatchMode::Sequential`].
    #[must_use]
    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validates the graph and produces the engine.
    ///
    /// # Errors
    ///
    /// - [`GraphError::Empty`] - no nodes.
    /// - [`GraphError::DuplicateNode`] - two nodes share a name.
    /// - [`GraphError::NoInputSubscriber`] - nothing consumes the
    ///   reserved input topic, so no run could ever start.
    /// - [`GraphError::OutputTopicSubscription`] - a node subscribes
    ///   to a facade-only output channel.
    pub fn build(mut self) -> Result<WorkflowEngine, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        // Uniqueness and the reserved-topic rules.
        let mut seen = BTreeSet::new();
        let mut input_subscribed = false;
        for node in &self.nodes {
            if !seen.insert(node.name.clone()) {
                return Err(GraphError::DuplicateNode(node.name.clone()));
            }
            for topic_name in node.subscribed_topics() {
                if topic_name == AGENT_OUTPUT_TOPIC || topic_name == AGENT_STREAM_OUTPUT_TOPIC {
                    return Err(GraphError::OutputTopicSubscription {
                        node: node.name.clone(),
                        topic: topic_name,
                    });
                }
                if topic_name == AGENT_INPUT_TOPIC {
                    input_subscribed = true;
                }
            }
        }
        if !input_subscribed {
            return Err(GraphError::NoInputSubscriber(AGENT_INPUT_TOPIC));
        }

        // Function-spec attachment: a model-calling node that feeds a
        // function-call node learns the callable surface once, here.
        let spec_sources: Vec<(BTreeSet<String>, Vec<weft_types::FunctionSpec>)> = self
            .nodes
            .iter()
            .filter(|n| n.node_type == FUNCTION_CALL_NODE_TYPE)
            .map(|n| (n.subscribed_topics(), n.function_specs.clone()))
            .collect();
        for node in &mut self.nodes {
            if node.node_type != LLM_NODE_TYPE {
                continue;
            }
            for (function_topics, specs) in &spec_sources {
                if node
                    .publish_to
                    .iter()
                    .any(|topic| function_topics.contains(topic))
                {
                    node.add_function_specs(specs);
                }
            }
        }

        // Register every referenced topic; reserved input and output
        // always exist.
        let mut topic_names: BTreeSet<String> = BTreeSet::new();
        topic_names.insert(AGENT_INPUT_TOPIC.to_string());
        topic_names.insert(AGENT_OUTPUT_TOPIC.to_string());
        for node in &self.nodes {
            topic_names.extend(node.subscribed_topics());
            topic_names.extend(node.publish_to.iter().cloned());
        }
        let mut topics: HashMap<String, Arc<Topic>> = HashMap::new();
        for name in topic_names {
            let mut topic = Topic::for_name(&name);
            if let Some(predicate) = self.admissions.remove(&name) {
                topic = topic.with_admission(predicate);
            }
            topics.insert(name, Arc::new(topic));
        }

        // Inverse index: topic name -> subscriber node names.
        let mut subscribers: HashMap<String, Vec<String>> = HashMap::new();
        for node in &self.nodes {
            for topic_name in node.subscribed_topics() {
                subscribers
                    .entry(topic_name)
                    .or_default()
                    .push(node.name.clone());
            }
        }

        let node_order: Vec<String> = self.nodes.iter().map(|n| n.name.clone()).collect();
        let nodes: HashMap<String, Arc<Node>> = self
            .nodes
            .into_iter()
            .map(|n| (n.name.clone(), Arc::new(n)))
            .collect();

        info!(
            workflow = %self.name,
            nodes = nodes.len(),
            topics = topics.len(),
            "workflow graph validated"
        );

        Ok(WorkflowEngine::from_inner(EngineInner {
            workflow_id: WorkflowId::new(),
            name: self.name,
            workflow_type: self.workflow_type,
            nodes,
            node_order,
            topics,
            subscribers,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryEventStore::new())),
            mode: self.mode,
            stop: AtomicBool::new(false),
        }))
    }
}
