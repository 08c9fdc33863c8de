//! Foundation types for the taiga data store.
//!
//! This crate provides the kernel types shared by every taiga layer: the
//! content-addressed hash, hierarchical paths, branch names, commit
//! provenance, and the typed configuration bag. Every other taiga crate
//! depends on `taiga-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (BLAKE3 hash)
//! - [`ContentHasher`] — Domain-separated hasher deriving [`ObjectId`]s
//! - [`Step`] / [`Path`] — Hierarchical addressing of tree entries
//! - [`Branch`] — Validated, named mutable pointer
//! - [`Task`] — Provenance record attached to a commit
//! - [`Config`] — Typed key-value bag of backend options

pub mod branch;
pub mod config;
pub mod error;
pub mod hash;
pub mod object;
pub mod path;
pub mod task;

pub use branch::Branch;
pub use config::{Config, ConfigKey, DEFAULT_BRANCH, LCA_MAX_COUNT, LCA_MAX_DEPTH, ROOT};
pub use error::TypeError;
pub use hash::ContentHasher;
pub use object::ObjectId;
pub use path::{Path, Step};
pub use task::Task;
