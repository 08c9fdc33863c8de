use taiga_objects::ObjectError;
use thiserror::Error;

/// Errors from staging-tree operations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A typed-store operation failed during materialisation or flush.
    #[error(transparent)]
    Object(#[from] ObjectError),

    /// An attempt to bind contents at the empty path.
    #[error("the root of a tree cannot be contents")]
    RootContents,
}

/// Convenience alias for staging-tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;
