//! Tree staging for the taiga data store.
//!
//! A [`StagingTree`] is an in-memory, lazily materialised partial mirror
//! of a commit's tree. Reads fetch one node level at a time from the
//! store and cache it; writes mutate only the in-memory graph, so
//! successive edits coalesce and only the final state of each path is
//! persisted when [`StagingTree::flush`] runs. Flushing is idempotent: a
//! second flush performs no writes.

pub mod concrete;
pub mod diff;
pub mod error;
pub mod tree;

pub use concrete::ConcreteTree;
pub use diff::TreeDiff;
pub use error::{TreeError, TreeResult};
pub use tree::{EntryKind, StagingTree};
