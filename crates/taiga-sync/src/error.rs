use taiga_objects::ObjectError;
use thiserror::Error;

/// Errors from synchronisation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The branch being pushed has no head locally.
    #[error("branch {0:?} has no head")]
    NoHead(String),

    /// A typed-store operation failed on one of the endpoints.
    #[error(transparent)]
    Object(#[from] ObjectError),

    /// Opaque transport failure; callers may retry.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Convenience alias for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
