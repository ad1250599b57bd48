//! The event-driven dispatch engine.
//!
//! One engine instance serves one request at a time:
//!
//! ```text
//! invoke(ctx, input)
//!     │
//!     ├─ fresh request?  publish input → agent_input_topic,
//!     │                  record WorkflowInvoke, seed ready queue
//!     ├─ known request?  replay stored events into topics,
//!     │                  append a pending user reply if one fits,
//!     │                  enqueue every node the restored state readies
//!     │
//!     ├─ loop: pop node → still ready? → consume input → NodeInvoke
//!     │        → command → Consume* + NodeRespond → publishes
//!     │        → fan out readiness to subscribers
//!     │
//!     └─ drain output topics → WorkflowRespond (unless a human
//!        request is still open) → return messages
//! ```
//!
//! Termination is queue drain, nothing else. A workflow paused on an
//! unanswered human request simply has no ready nodes; passing the
//! same context back later resumes it.

use crate::topic::{
    Topic, AGENT_INPUT_TOPIC, AGENT_OUTPUT_TOPIC, AGENT_STREAM_OUTPUT_TOPIC, HUMAN_REQUEST_TOPIC,
};
use crate::workflow::output::coalesce_streaming;
use crate::EngineError;
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use weft_event::{
    ConsumeEvent, Event, EventStore, NodeFailedEvent, NodeInvokeEvent, NodeRespondEvent,
    WorkflowFailedEvent, WorkflowInvokeEvent, WorkflowRef, WorkflowRespondEvent,
};
use weft_node::Node;
use weft_types::{EventId, InvokeContext, Messages, WorkflowId};

/// Consumer name under which the facade drains output channels.
pub const ASSISTANT_CONSUMER: &str = "assistant";

/// How nodes are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One node at a time, run to completion on the caller's task.
    Sequential,
    /// Up to `workers` nodes concurrently. Topics serialize their own
    /// mutations; at most one instance of a given node name runs at
    /// once.
    Parallel {
        /// Maximum concurrently executing nodes.
        workers: usize,
    },
}

enum RunEnd {
    Drained,
    Stopped,
}

struct NodeInput {
    consumes: Vec<ConsumeEvent>,
    parents: Vec<EventId>,
}

pub(crate) struct EngineInner {
    pub(crate) workflow_id: WorkflowId,
    pub(crate) name: String,
    pub(crate) workflow_type: String,
    pub(crate) nodes: HashMap<String, Arc<Node>>,
    pub(crate) node_order: Vec<String>,
    pub(crate) topics: HashMap<String, Arc<Topic>>,
    pub(crate) subscribers: HashMap<String, Vec<String>>,
    pub(crate) store: Arc<dyn EventStore>,
    pub(crate) mode: DispatchMode,
    pub(crate) stop: AtomicBool,
}

/// The event-driven workflow engine.
///
/// Built by [`WorkflowBuilder`](crate::WorkflowBuilder). Clones are
/// cheap handles onto the same shared state, so a facade can keep one
/// while a control surface holds another for [`stop`](Self::stop).
#[derive(Clone)]
pub struct WorkflowEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine").finish_non_exhaustive()
    }
}

impl WorkflowEngine {
    pub(crate) fn from_inner(inner: EngineInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The injected event store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn EventStore> {
        self.inner.store.clone()
    }

    /// Looks up a topic by name.
    #[must_use]
    pub fn topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.inner.topics.get(name).cloned()
    }

    /// Looks up a node by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<Arc<Node>> {
        self.inner.nodes.get(name).cloned()
    }

    /// Requests a cooperative stop of the running dispatch loop.
    ///
    /// The in-flight command finishes; nothing further is dispatched
    /// and the run is recorded as WorkflowFailed.
    pub fn stop(&self) {
        info!(workflow = %self.inner.name, "stop requested");
        self.inner.stop.store(true, Ordering::SeqCst);
    }

    /// Appends a user reply to the pending human request of the
    /// request served most recently by this engine instance, and
    /// records it.
    ///
    /// In-memory topic state must still hold the paused request;
    /// across process restarts, pass the reply as the `input` of a
    /// resuming [`invoke`](Self::invoke) instead.
    ///
    /// # Errors
    ///
    /// Protocol errors per
    /// [`HumanRequestTopic::append_user_input`](crate::HumanRequestTopic::append_user_input);
    /// [`EngineError::NotHumanRequest`] when the workflow has no
    /// human-request topic.
    pub fn append_user_input(
        &self,
        invoke_context: &InvokeContext,
        parent: EventId,
        messages: Messages,
    ) -> Result<(), EngineError> {
        let topic = self
            .inner
            .topics
            .get(HUMAN_REQUEST_TOPIC)
            .ok_or_else(|| EngineError::MissingTopic(HUMAN_REQUEST_TOPIC.to_string()))?;
        if let Some(event) = topic.append_user_input(invoke_context, parent, messages)? {
            self.inner.store.append(event)?;
        }
        Ok(())
    }

    /// Runs the workflow for one request.
    ///
    /// A request id never seen before starts fresh: the input is
    /// published to the reserved input topic. A known request id is
    /// restored from its stored history first; a non-empty `input`
    /// then answers the pending human request, if one is open.
    ///
    /// Returns the messages drained from the output channels,
    /// including any newly raised ask-the-user requests.
    ///
    /// # Errors
    ///
    /// Protocol and store failures; these are also recorded as a
    /// WorkflowFailed event. Command failures are *not* errors here:
    /// they surface as NodeFailed events and the run continues on
    /// other paths.
    pub async fn invoke(
        &self,
        invoke_context: InvokeContext,
        input: Messages,
    ) -> Result<Messages, EngineError> {
        let inner = &self.inner;
        inner.stop.store(false, Ordering::SeqCst);
        for topic in inner.topics.values() {
            topic.reset();
        }

        let result = self.run(&invoke_context, input).await;
        match result {
            Ok(messages) => Ok(messages),
            Err(err) => {
                warn!(workflow = %inner.name, error = %err, "workflow failed");
                let _ = inner.store.append(Event::WorkflowFailed(WorkflowFailedEvent {
                    event_id: EventId::new(),
                    timestamp: Utc::now(),
                    invoke_context,
                    workflow: inner.workflow_ref(),
                    error: err.to_string(),
                }));
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        invoke_context: &InvokeContext,
        input: Messages,
    ) -> Result<Messages, EngineError> {
        let inner = &self.inner;
        let queue = inner.initialize(invoke_context, input)?;
        if !inner
            .store
            .has_events_for_request(invoke_context.assistant_request_id)?
        {
            // The initial publish was rejected by admission; the
            // request never started and leaves no trace.
            return Ok(Messages::new());
        }

        let end = match inner.mode {
            DispatchMode::Sequential => inner.run_sequential(invoke_context, queue).await?,
            DispatchMode::Parallel { workers } => {
                EngineInner::run_parallel(inner.clone(), invoke_context, queue, workers).await?
            }
        };

        let (output, asks) = inner.drain_outputs();

        match end {
            RunEnd::Stopped => {
                inner.store.append(Event::WorkflowFailed(WorkflowFailedEvent {
                    event_id: EventId::new(),
                    timestamp: Utc::now(),
                    invoke_context: invoke_context.clone(),
                    workflow: inner.workflow_ref(),
                    error: "stop requested".to_string(),
                }))?;
            }
            RunEnd::Drained => {
                if inner.open_human_request() {
                    debug!(workflow = %inner.name, "run paused awaiting user input");
                } else {
                    inner.store.append(Event::WorkflowRespond(WorkflowRespondEvent {
                        event_id: EventId::new(),
                        timestamp: Utc::now(),
                        invoke_context: invoke_context.clone(),
                        workflow: inner.workflow_ref(),
                        output_data: output.clone(),
                    }))?;
                }
            }
        }

        let mut messages = output;
        messages.extend(asks);
        Ok(messages)
    }
}

impl EngineInner {
    fn workflow_ref(&self) -> WorkflowRef {
        WorkflowRef {
            workflow_id: self.workflow_id,
            workflow_name: self.name.clone(),
            workflow_type: self.workflow_type.clone(),
        }
    }

    /// Seeds the run: fresh publish or restoration replay. Returns
    /// the initial ready queue.
    fn initialize(
        &self,
        invoke_context: &InvokeContext,
        input: Messages,
    ) -> Result<VecDeque<String>, EngineError> {
        let mut queue = VecDeque::new();
        let mut queued = HashSet::new();

        if !self
            .store
            .has_events_for_request(invoke_context.assistant_request_id)?
        {
            let input_topic = self
                .topics
                .get(AGENT_INPUT_TOPIC)
                .ok_or_else(|| EngineError::MissingTopic(AGENT_INPUT_TOPIC.to_string()))?;

            let Some(event) =
                input_topic.publish(invoke_context, &self.name, "workflow", input, vec![])
            else {
                debug!(workflow = %self.name, "initial input rejected by admission predicate");
                return Ok(queue);
            };
            let Some(publish) = event.as_publish().cloned() else {
                return Ok(queue);
            };

            self.store.append(Event::WorkflowInvoke(WorkflowInvokeEvent {
                event_id: EventId::new(),
                timestamp: Utc::now(),
                invoke_context: invoke_context.clone(),
                workflow: self.workflow_ref(),
                input_data: publish,
            }))?;
            self.store.append(event.clone())?;
            self.fan_out(&event, &mut queue, &mut queued);
            info!(workflow = %self.name, "fresh request initialized");
        } else {
            let events = self
                .store
                .events_for_request(invoke_context.assistant_request_id)?;
            for event in &events {
                let topic_name = match event {
                    Event::PublishToTopic(e) | Event::OutputTopic(e) => Some(&e.topic_name),
                    Event::ConsumeFromTopic(e) => Some(&e.topic_name),
                    _ => None,
                };
                if let Some(topic) = topic_name.and_then(|name| self.topics.get(name)) {
                    topic.restore(event);
                }
            }
            info!(workflow = %self.name, events = events.len(), "request restored from store");

            // A non-empty resume input answers the pending human
            // request, if the facade has been shown one.
            if !input.is_empty() {
                if let Some(topic) = self.topics.get(HUMAN_REQUEST_TOPIC) {
                    if let Some(human) = topic.as_human_request() {
                        if human.can_append_user_input() {
                            if let Some(parent) = human.pending_request() {
                                if let Some(reply) = topic.append_user_input(
                                    invoke_context,
                                    parent.event_id,
                                    input,
                                )? {
                                    self.store.append(reply)?;
                                }
                            }
                        } else {
                            debug!(workflow = %self.name, "resume input ignored, no deliverable request pending");
                        }
                    }
                }
            }

            for name in &self.node_order {
                if let Some(node) = self.nodes.get(name) {
                    if self.node_ready(node) && queued.insert(name.clone()) {
                        queue.push_back(name.clone());
                    }
                }
            }
        }
        Ok(queue)
    }

    fn node_ready(&self, node: &Node) -> bool {
        let fresh: HashSet<String> = node
            .subscribed_topics()
            .into_iter()
            .filter(|name| {
                self.topics
                    .get(name)
                    .is_some_and(|topic| topic.can_consume(&node.name))
            })
            .collect();
        node.ready(&fresh)
    }

    /// Consumes every fresh subscribed topic for the node.
    fn collect_input(&self, node: &Node) -> NodeInput {
        let mut consumes = Vec::new();
        let mut parents = Vec::new();
        for topic_name in node.subscribed_topics() {
            let Some(topic) = self.topics.get(&topic_name) else {
                continue;
            };
            for publish in topic.consume(&node.name) {
                parents.push(publish.event_id);
                consumes.push(ConsumeEvent::of(&publish, &node.name, &node.node_type));
            }
        }
        NodeInput { consumes, parents }
    }

    /// Dispatches one node: consume, invoke, record, publish.
    ///
    /// Returns the publish events needing readiness fan-out. A
    /// command failure is recorded as NodeFailed and returns no
    /// publishes; store failures propagate.
    async fn execute_node(
        &self,
        invoke_context: &InvokeContext,
        node: &Arc<Node>,
    ) -> Result<Vec<Event>, EngineError> {
        // Readiness may have been observed stale; consuming under the
        // topic locks is the authoritative re-check.
        let input = self.collect_input(node);
        if input.consumes.is_empty() {
            return Ok(Vec::new());
        }

        let node_ref = node.node_ref();
        self.store.append(Event::NodeInvoke(NodeInvokeEvent {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            invoke_context: invoke_context.clone(),
            node: node_ref.clone(),
            input_data: input.consumes.clone(),
        }))?;
        debug!(node = %node.name, inputs = input.consumes.len(), "dispatching node");

        let streams_output = node
            .publish_to
            .iter()
            .any(|name| name == AGENT_STREAM_OUTPUT_TOPIC);
        let result = if streams_output {
            match node.command.invoke_stream(invoke_context, &input.consumes).await {
                Ok(mut rx) => {
                    let mut chunks = Messages::new();
                    while let Some(message) = rx.recv().await {
                        chunks.push(message);
                    }
                    Ok(coalesce_streaming(chunks))
                }
                Err(err) => Err(err),
            }
        } else {
            node.command.invoke(invoke_context, &input.consumes).await
        };

        match result {
            Ok(output) => {
                for consume in &input.consumes {
                    self.store
                        .append(Event::ConsumeFromTopic(consume.clone()))?;
                }
                self.store.append(Event::NodeRespond(NodeRespondEvent {
                    event_id: EventId::new(),
                    timestamp: Utc::now(),
                    invoke_context: invoke_context.clone(),
                    node: node_ref,
                    input_data: input.consumes,
                    output_data: output.clone(),
                }))?;

                let mut published = Vec::new();
                for topic_name in &node.publish_to {
                    let Some(topic) = self.topics.get(topic_name) else {
                        continue;
                    };
                    if let Some(event) = topic.publish(
                        invoke_context,
                        &node.name,
                        &node.node_type,
                        output.clone(),
                        input.parents.clone(),
                    ) {
                        self.store.append(event.clone())?;
                        published.push(event);
                    }
                }
                Ok(published)
            }
            Err(err) => {
                warn!(node = %node.name, error = %err, "command failed");
                self.store.append(Event::NodeFailed(NodeFailedEvent {
                    event_id: EventId::new(),
                    timestamp: Utc::now(),
                    invoke_context: invoke_context.clone(),
                    node: node_ref,
                    input_data: input.consumes,
                    error: err.to_string(),
                }))?;
                Ok(Vec::new())
            }
        }
    }

    /// Evaluates subscriber readiness after a publish and enqueues
    /// newly ready nodes. Output-channel publishes bypass this: only
    /// the facade consumes them.
    fn fan_out(&self, event: &Event, queue: &mut VecDeque<String>, queued: &mut HashSet<String>) {
        if event.is_output() {
            return;
        }
        let Some(publish) = event.as_publish() else {
            return;
        };
        let Some(subscriber_names) = self.subscribers.get(&publish.topic_name) else {
            return;
        };
        for name in subscriber_names {
            if queued.contains(name) {
                continue;
            }
            if let Some(node) = self.nodes.get(name) {
                if self.node_ready(node) {
                    queued.insert(name.clone());
                    queue.push_back(name.clone());
                }
            }
        }
    }

    async fn run_sequential(
        &self,
        invoke_context: &InvokeContext,
        mut queue: VecDeque<String>,
    ) -> Result<RunEnd, EngineError> {
        let mut queued: HashSet<String> = queue.iter().cloned().collect();
        while let Some(name) = queue.pop_front() {
            queued.remove(&name);
            if self.stop.load(Ordering::SeqCst) {
                return Ok(RunEnd::Stopped);
            }
            let Some(node) = self.nodes.get(&name) else {
                continue;
            };
            if !self.node_ready(node) {
                continue;
            }
            let published = self.execute_node(invoke_context, node).await?;
            for event in &published {
                self.fan_out(event, &mut queue, &mut queued);
            }
        }
        Ok(RunEnd::Drained)
    }

    async fn run_parallel(
        inner: Arc<Self>,
        invoke_context: &InvokeContext,
        mut queue: VecDeque<String>,
        workers: usize,
    ) -> Result<RunEnd, EngineError> {
        let workers = workers.max(1);
        let mut queued: HashSet<String> = queue.iter().cloned().collect();
        let mut in_flight: HashSet<String> = HashSet::new();
        let mut tasks: JoinSet<(String, Result<Vec<Event>, EngineError>)> = JoinSet::new();

        loop {
            if inner.stop.load(Ordering::SeqCst) {
                // Let in-flight commands complete, dispatch nothing new.
                while tasks.join_next().await.is_some() {}
                return Ok(RunEnd::Stopped);
            }

            // Fill worker slots, skipping node names already running:
            // at most one instance of a node executes at once.
            while tasks.len() < workers {
                let Some(position) = queue.iter().position(|name| !in_flight.contains(name))
                else {
                    break;
                };
                let Some(name) = queue.remove(position) else {
                    break;
                };
                queued.remove(&name);
                let Some(node) = inner.nodes.get(&name).cloned() else {
                    continue;
                };
                if !inner.node_ready(&node) {
                    continue;
                }
                in_flight.insert(name);
                let task_inner = inner.clone();
                let task_context = invoke_context.clone();
                tasks.spawn(async move {
                    let outcome = task_inner.execute_node(&task_context, &node).await;
                    (node.name.clone(), outcome)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                if queue.is_empty() {
                    break;
                }
                continue;
            };
            match joined {
                Ok((name, outcome)) => {
                    in_flight.remove(&name);
                    let published = outcome?;
                    for event in &published {
                        inner.fan_out(event, &mut queue, &mut queued);
                    }
                }
                Err(join_error) => {
                    return Err(EngineError::Worker(join_error.to_string()));
                }
            }

            if queue.is_empty() && tasks.is_empty() {
                break;
            }
        }
        Ok(RunEnd::Drained)
    }

    /// Drains the facade-facing channels: final output, streamed
    /// output, and newly raised human requests.
    fn drain_outputs(&self) -> (Messages, Messages) {
        let mut output = Messages::new();
        for name in [AGENT_OUTPUT_TOPIC, AGENT_STREAM_OUTPUT_TOPIC] {
            if let Some(topic) = self.topics.get(name) {
                for publish in topic.consume_outputs(ASSISTANT_CONSUMER) {
                    output.extend(publish.data);
                }
            }
        }
        let mut asks = Messages::new();
        if let Some(human) = self
            .topics
            .get(HUMAN_REQUEST_TOPIC)
            .and_then(|topic| topic.as_human_request())
        {
            for publish in human.take_unanswered_requests(ASSISTANT_CONSUMER) {
                asks.extend(publish.data);
            }
        }
        (coalesce_streaming(output), asks)
    }

    /// Whether an ask-the-user request is still awaiting its reply.
    fn open_human_request(&self) -> bool {
        self.topics
            .get(HUMAN_REQUEST_TOPIC)
            .and_then(|topic| topic.as_human_request())
            .is_some_and(|human| human.pending_request().is_some())
    }
}
