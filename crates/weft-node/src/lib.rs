//! Nodes, subscriptions and the command boundary for the weft
//! workflow engine.
//!
//! A [`Node`] binds three things: a [`SubscriptionExpr`] deciding
//! when it runs, a set of publish-to topics deciding where its output
//! goes, and a [`Command`] doing the actual work. Nodes hold no
//! per-request state; the engine owns dispatch and the topics own
//! message state.
//!
//! # Crate layering
//!
//! ```text
//! weft-types      : ids, Message, InvokeContext, FunctionSpec
//! weft-event      : event taxonomy, event store, ancestor graph
//! weft-node       : subscription DSL, Command boundary, Node  ◄── HERE
//! weft-runtime    : topics, workflow engine, dispatch
//! ```

mod command;
mod commands;
mod error;
mod node;
mod subscription;

pub use command::{flatten_input, Command};
pub use commands::{assemble_context, FunctionCallCommand, Recorded};
pub use error::{CommandError, NodeError};
pub use node::{Node, NodeBuilder};
pub use subscription::{topic, SubscriptionExpr};
