use taiga_objects::ObjectError;
use thiserror::Error;

/// Errors from graph navigation.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A typed-store operation failed.
    #[error(transparent)]
    Object(#[from] ObjectError),

    /// An attempt to bind contents at the empty path.
    ///
    /// The path of length zero addresses the tree itself, never a value.
    #[error("the root of a tree cannot be contents")]
    RootContents,
}

/// Convenience alias for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
