//! Watch/notification for mutable keyed state.
//!
//! A [`WatchSet`] fans state transitions out to registered handlers as
//! [`Diff`]s. Deliveries to a single handler are serialised: the next
//! invocation does not start until the previous one returned. Handlers
//! that panic are logged and dropped so one bad observer can never wedge
//! a store.
//!
//! The crate also provides the [`LockManager`] used by layers above to
//! serialise mutations of the same key without blocking unrelated keys.

pub mod dispatch;
pub mod lock;

pub use dispatch::{Diff, WatchHandle, WatchSet};
pub use lock::{KeyGuard, LockManager};
