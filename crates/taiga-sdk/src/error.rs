use taiga_graph::GraphError;
use taiga_merge::Conflict;
use taiga_objects::ObjectError;
use taiga_store::StoreError;
use taiga_tree::TreeError;
use taiga_types::TypeError;
use thiserror::Error;

/// Errors from the repository and store-handle API.
#[derive(Debug, Error)]
pub enum SdkError {
    /// A foundation type failed to validate or parse.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The backend kernel failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A typed-store operation failed.
    #[error(transparent)]
    Object(#[from] ObjectError),

    /// Graph navigation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A staging-tree operation failed.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A merge could not be reconciled.
    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// The operation needs a head and the position has none.
    #[error("branch {0:?} has no head")]
    NoHead(String),

    /// A caller error: `get` on an absent path, mutating through a
    /// detached handle, and similar misuse.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias for SDK operations.
pub type SdkResult<T> = std::result::Result<T, SdkError>;
