//! Subscription expressions.
//!
//! A node declares when it is ready to run with a small algebraic
//! expression over topic names:
//!
//! ```text
//! Expr := Topic(name) | And(Expr, Expr) | Or(Expr, Expr)
//! ```
//!
//! Expressions are evaluated against the set of topics that currently
//! hold unread events for the node. There is no parser; trees are
//! built programmatically:
//!
//! ```
//! use weft_node::topic;
//!
//! let expr = topic("queries").and(topic("context").or(topic("cache")));
//! assert_eq!(expr.topics().len(), 3);
//! ```
//!
//! # OR branches do not wait
//!
//! `Or(a, b)` makes the node ready as soon as either branch has
//! unread events. Whatever happens to be unread on the other branch
//! at dispatch time is included in the input; nothing waits for the
//! slower branch. This trades determinism for latency: if both
//! orderings matter to you, split the node or use `And`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A tree of topic references combined with AND/OR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionExpr {
    /// Satisfied when the named topic has unread events.
    Topic(String),
    /// Satisfied when both operands are satisfied.
    And(Box<SubscriptionExpr>, Box<SubscriptionExpr>),
    /// Satisfied when either operand is satisfied (eager, see module
    /// docs).
    Or(Box<SubscriptionExpr>, Box<SubscriptionExpr>),
}

/// Creates a leaf expression referencing one topic.
#[must_use]
pub fn topic(name: impl Into<String>) -> SubscriptionExpr {
    SubscriptionExpr::Topic(name.into())
}

impl SubscriptionExpr {
    /// Combines two expressions conjunctively.
    #[must_use]
    pub fn and(self, other: SubscriptionExpr) -> SubscriptionExpr {
        SubscriptionExpr::And(Box::new(self), Box::new(other))
    }

    /// Combines two expressions disjunctively.
    #[must_use]
    pub fn or(self, other: SubscriptionExpr) -> SubscriptionExpr {
        SubscriptionExpr::Or(Box::new(self), Box::new(other))
    }

    /// Evaluates the expression against the set of topic names that
    /// currently have unread events for the consumer being checked.
    #[must_use]
    pub fn evaluate(&self, fresh: &HashSet<String>) -> bool {
        match self {
            Self::Topic(name) => fresh.contains(name),
            Self::And(l, r) => l.evaluate(fresh) && r.evaluate(fresh),
            Self::Or(l, r) => l.evaluate(fresh) || r.evaluate(fresh),
        }
    }

    /// All distinct topic names the expression references.
    ///
    /// Duplicate references collapse; the result drives the
    /// workflow's inverse topic-to-subscribers index.
    #[must_use]
    pub fn topics(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_topics(&mut out);
        out
    }

    fn collect_topics(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Topic(name) => {
                out.insert(name.clone());
            }
            Self::And(l, r) | Self::Or(l, r) => {
                l.collect_topics(out);
                r.collect_topics(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn topic_leaf_checks_membership() {
        let expr = topic("a");
        assert!(expr.evaluate(&fresh(&["a", "b"])));
        assert!(!expr.evaluate(&fresh(&["b"])));
        assert!(!expr.evaluate(&fresh(&[])));
    }

    #[test]
    fn and_needs_both() {
        let expr = topic("a").and(topic("b"));
        assert!(expr.evaluate(&fresh(&["a", "b"])));
        assert!(!expr.evaluate(&fresh(&["a"])));
        assert!(!expr.evaluate(&fresh(&["b"])));
    }

    #[test]
    fn or_fires_on_either() {
        let expr = topic("a").or(topic("b"));
        assert!(expr.evaluate(&fresh(&["a"])));
        assert!(expr.evaluate(&fresh(&["b"])));
        assert!(!expr.evaluate(&fresh(&["c"])));
    }

    #[test]
    fn nested_expressions_compose() {
        let expr = topic("a").and(topic("b").or(topic("c")));
        assert!(expr.evaluate(&fresh(&["a", "c"])));
        assert!(expr.evaluate(&fresh(&["a", "b"])));
        assert!(!expr.evaluate(&fresh(&["b", "c"])));
    }

    #[test]
    fn topics_collapse_duplicates() {
        let expr = topic("a").and(topic("a").or(topic("b")));
        let topics = expr.topics();
        assert_eq!(topics.len(), 2);
        assert!(topics.contains("a"));
        assert!(topics.contains("b"));
    }

    #[test]
    fn expression_round_trips() {
        let expr = topic("a").and(topic("b").or(topic("c")));
        let json = serde_json::to_string(&expr).unwrap();
        let back: SubscriptionExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, back);
    }
}
