//! Backend kernel for the taiga data store.
//!
//! Three primitive store shapes, deliberately minimal so that many
//! physical backends (in-memory, on-disk, remote) can implement them:
//!
//! - [`AppendOnlyStore`] — content-addressed, immutable, idempotent
//! - [`LinkStore`] — certifies alternative keys for existing objects
//! - [`ReadWriteStore`] — mutable branch heads with atomic compare-and-swap
//!   and watch notification
//!
//! All three extend [`ReadOnlyStore`]; absence is `Ok(None)`, never an
//! error. The crate ships `RwLock`-based in-memory backends suitable for
//! tests and embedding.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryBranchStore, MemoryLinkStore, MemoryObjectStore};
pub use object::{ObjectKind, RawObject};
pub use traits::{AppendOnlyStore, LinkStore, ReadOnlyStore, ReadWriteStore};
