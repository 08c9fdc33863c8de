use taiga_store::{ObjectKind, StoreError};
use thiserror::Error;

/// Errors from the typed object stores.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// The backend kernel failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A referenced object is absent from its store.
    ///
    /// Only raised by operations that require presence (`get`-style
    /// lookups, closure walks); plain `find` reports absence as `None`.
    #[error("{kind} object not found: {id}")]
    NotFound { kind: ObjectKind, id: String },

    /// Encoding or decoding a typed value failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// A key resolved to an object of the wrong kind.
    #[error("expected {expected} object, got {actual}")]
    KindMismatch {
        expected: ObjectKind,
        actual: ObjectKind,
    },
}

impl ObjectError {
    /// Build the `NotFound` case from a kind and key.
    pub fn not_found(kind: ObjectKind, id: &taiga_types::ObjectId) -> Self {
        Self::NotFound {
            kind,
            id: id.to_hex(),
        }
    }
}

/// Convenience alias for typed-store operations.
pub type ObjectResult<T> = std::result::Result<T, ObjectError>;
