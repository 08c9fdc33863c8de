//! Merge engine for the taiga data store.
//!
//! Implements three-way merge with conflict detection as a compositional
//! algebra: a [`Merge<T>`] reconciles two sides against a lazily computed
//! common ancestor, and combinators build merges for compound values out
//! of merges for their parts. Conflicts are ordinary values ([`Conflict`]),
//! never panics, and propagate through the combinators unchanged.

pub mod ancestor;
pub mod conflict;
pub mod merge;

pub use ancestor::Ancestor;
pub use conflict::{Conflict, MergeResult};
pub use merge::{pair, Merge};
