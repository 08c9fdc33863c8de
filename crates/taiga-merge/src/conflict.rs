use thiserror::Error;

/// A merge that could not be reconciled.
///
/// Conflicts carry a human-readable reason and travel through the merge
/// algebra as values; nothing in the algebra panics or raises. Layers that
/// merge structured values prefix the offending path into the reason as
/// the conflict propagates upward.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("conflict: {reason}")]
pub struct Conflict {
    /// Why the merge failed.
    pub reason: String,
}

impl Conflict {
    /// A conflict with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Prefix a location into the reason, e.g. a tree path.
    pub fn at(self, location: impl std::fmt::Display) -> Self {
        Self {
            reason: format!("{location}: {}", self.reason),
        }
    }
}

/// The outcome of running a merge: a value, or a [`Conflict`].
pub type MergeResult<T> = Result<T, Conflict>;
