use thiserror::Error;

/// Errors from constructing or parsing foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Invalid hex string for ObjectId parsing.
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// A hash had the wrong number of bytes.
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A path step violated the step grammar.
    #[error("invalid step {step:?}: {reason}")]
    InvalidStep { step: String, reason: String },

    /// A branch name violated the branch grammar.
    #[error("invalid branch name {name:?}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// A configuration value failed to parse under its key's codec.
    #[error("invalid value for config key {key:?}: {reason}")]
    InvalidConfigValue { key: String, reason: String },
}

/// Convenience alias for fallible foundation-type operations.
pub type Result<T> = std::result::Result<T, TypeError>;
