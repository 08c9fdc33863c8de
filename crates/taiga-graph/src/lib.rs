//! Graph and history engine for the taiga data store.
//!
//! Two DAGs live here. The *node graph* is the tree of a single commit:
//! [`NodeGraph`] walks, updates and closes over it with copy-on-write
//! re-hashing. The *commit graph* is history: [`History`] computes lowest
//! common ancestors, three-way merges of branch heads, ancestry tests and
//! bounded traversals, memoising nothing beyond what the append-only
//! commit store already guarantees to be stable.
//!
//! Merging is built per-step: [`NodeMerger`] lifts the contents and
//! metadata combinators over node entries and recurses through subtrees,
//! prefixing the offending path into every conflict it propagates.

pub mod error;
pub mod history;
pub mod node_graph;
pub mod node_merge;

pub use error::{GraphError, GraphResult};
pub use history::{History, LcaOutcome};
pub use node_graph::NodeGraph;
pub use node_merge::NodeMerger;
