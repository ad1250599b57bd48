//! Ancestor event graph.
//!
//! Given the consume frontier a node is about to process, this module
//! reconstructs "the conversation so far as seen from here": every
//! publish reachable backwards through `consumed_event_ids`, ordered
//! so that causal parents come before their children and, within one
//! dependency layer, older events come before newer ones.
//!
//! The graph is a DAG, never a tree: OR subscriptions produce diamond
//! shapes where two branches share an ancestor. It is acyclic because
//! parent references always point at strictly earlier events.

use crate::{ConsumeEvent, Event, EventError, PublishEvent};
use std::collections::{HashMap, VecDeque};
use weft_types::{EventId, Messages};

/// The causally ordered ancestry of a consume frontier.
#[derive(Debug)]
pub struct AncestorGraph {
    ordered: Vec<PublishEvent>,
}

impl AncestorGraph {
    /// Builds the ancestry of `seeds` out of a request's history.
    ///
    /// Roots are the publishes the seeds consumed, located by
    /// (topic, offset). From each root, `consumed_event_ids` is
    /// followed until no unresolved parents remain.
    ///
    /// # Errors
    ///
    /// - [`EventError::MissingPublish`] when a seed names a
    ///   (topic, offset) with no publish in the history.
    /// - [`EventError::DanglingParent`] when a publish references an
    ///   event id absent from the history. Ancestry is never silently
    ///   truncated.
    pub fn build(seeds: &[ConsumeEvent], history: &[Event]) -> Result<Self, EventError> {
        let mut by_id: HashMap<EventId, &PublishEvent> = HashMap::new();
        let mut by_slot: HashMap<(&str, usize), &PublishEvent> = HashMap::new();
        for event in history {
            if let Some(publish) = event.as_publish() {
                by_id.insert(publish.event_id, publish);
                by_slot.insert((publish.topic_name.as_str(), publish.offset), publish);
            }
        }

        // Roots: the publishes the frontier consumed.
        let mut members: HashMap<EventId, &PublishEvent> = HashMap::new();
        let mut queue: VecDeque<EventId> = VecDeque::new();
        for seed in seeds {
            let publish: &PublishEvent = by_slot
                .get(&(seed.topic_name.as_str(), seed.offset))
                .copied()
                .ok_or_else(|| EventError::MissingPublish {
                    topic: seed.topic_name.clone(),
                    offset: seed.offset,
                })?;
            if members.insert(publish.event_id, publish).is_none() {
                queue.push_back(publish.event_id);
            }
        }

        // Walk parent references until the frontier closes.
        while let Some(id) = queue.pop_front() {
            let publish: &PublishEvent = members[&id];
            for parent_id in &publish.consumed_event_ids {
                let parent: &PublishEvent = by_id
                    .get(parent_id)
                    .copied()
                    .ok_or(EventError::DanglingParent(*parent_id))?;
                if members.insert(*parent_id, parent).is_none() {
                    queue.push_back(*parent_id);
                }
            }
        }

        // Layer by longest path from the frontier: a node is processed
        // once every in-graph child (consumer) has a depth, so every
        // parent lands strictly deeper than all of its children.
        let mut pending_children: HashMap<EventId, usize> =
            members.keys().map(|&id| (id, 0)).collect();
        for publish in members.values() {
            for parent_id in &publish.consumed_event_ids {
                *pending_children.entry(*parent_id).or_insert(0) += 1;
            }
        }

        let mut depth: HashMap<EventId, usize> = HashMap::new();
        let mut ready: VecDeque<EventId> = pending_children
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&id, _)| id)
            .collect();
        for &id in &ready {
            depth.insert(id, 0);
        }

        let mut max_depth = 0;
        let mut processed = 0usize;
        while let Some(id) = ready.pop_front() {
            processed += 1;
            let child_depth = depth[&id];
            max_depth = max_depth.max(child_depth);
            for parent_id in &members[&id].consumed_event_ids {
                let parent_depth = depth.entry(*parent_id).or_insert(0);
                *parent_depth = (*parent_depth).max(child_depth + 1);
                if let Some(pending) = pending_children.get_mut(parent_id) {
                    *pending -= 1;
                    if *pending == 0 {
                        ready.push_back(*parent_id);
                    }
                }
            }
        }

        // Every member must have been layered; a leftover means the
        // parent references loop, which only corrupt data can do.
        if processed != members.len() {
            return Err(EventError::CyclicAncestry);
        }

        // Assemble newest layer first, newest event first within each
        // layer, then reverse: parents precede children and timestamps
        // ascend overall.
        let mut layers: Vec<Vec<&PublishEvent>> = vec![Vec::new(); max_depth + 1];
        for (&id, &publish) in &members {
            layers[depth[&id]].push(publish);
        }
        let mut assembled: Vec<&PublishEvent> = Vec::with_capacity(members.len());
        for layer in &mut layers {
            layer.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            assembled.extend(layer.iter().copied());
        }
        assembled.reverse();

        Ok(Self {
            ordered: assembled.into_iter().cloned().collect(),
        })
    }

    /// The ancestor publishes, causal parents first.
    #[must_use]
    pub fn events(&self) -> &[PublishEvent] {
        &self.ordered
    }

    /// Concatenated payloads of the ordered ancestry.
    #[must_use]
    pub fn messages(&self) -> Messages {
        self.ordered
            .iter()
            .flat_map(|publish| publish.data.iter().cloned())
            .collect()
    }
}
