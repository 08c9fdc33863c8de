//! Branch name validation.
//!
//! Valid branch names:
//! - Must be non-empty
//! - May contain only alphanumerics and `-`, `_`, `.`, `/`
//! - Components between slashes must be non-empty

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The name of the default branch, present in every repository.
pub const MASTER: &str = "master";

/// A validated branch name: a named, mutable pointer to a commit.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Branch(String);

impl Branch {
    /// Validate and wrap a branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_branch_name(&name)?;
        Ok(Self(name))
    }

    /// The distinguished default branch, `master`.
    pub fn master() -> Self {
        Self(MASTER.to_string())
    }

    /// Returns `true` for the default branch.
    pub fn is_master(&self) -> bool {
        self.0 == MASTER
    }

    /// The branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Branch({:?})", self.0)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Branch {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, TypeError> {
        Self::new(s)
    }
}

/// Validate a branch name, returning `Ok(())` if valid.
pub fn validate_branch_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(TypeError::InvalidBranchName {
            name: name.to_string(),
            reason: "branch name must not be empty".into(),
        });
    }

    for ch in name.chars() {
        if !ch.is_ascii_alphanumeric() && !matches!(ch, '-' | '_' | '.' | '/') {
            return Err(TypeError::InvalidBranchName {
                name: name.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    // Path components between slashes must be non-empty; this also rejects
    // leading and trailing slashes.
    for component in name.split('/') {
        if component.is_empty() {
            return Err(TypeError::InvalidBranchName {
                name: name.to_string(),
                reason: "path components must not be empty".into(),
            });
        }
    }

    Ok(())
}
