use taiga_types::ObjectId;
use thiserror::Error;

/// Errors from backend kernel operations.
///
/// Every kernel operation either succeeds or fails with one of these; no
/// partial application is observable.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `add_link` named a target that is not in the backing store.
    #[error("link target {dst} not present (aliasing {src})")]
    LinkTargetMissing { src: ObjectId, dst: ObjectId },

    /// Opaque backend I/O failure; callers may retry.
    #[error("backend i/o error: {0}")]
    Io(String),
}

/// Convenience alias for kernel operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
