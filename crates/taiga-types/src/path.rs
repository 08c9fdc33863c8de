//! Hierarchical addressing: [`Step`] segments and [`Path`] sequences.
//!
//! A path addresses a subtree or a contents leaf. The empty path addresses
//! the root node itself; it never addresses a value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// One segment of a [`Path`].
///
/// Steps are non-empty and must not contain `/` (the printed separator).
/// The derived ordering is total and matches the printed form, which fixes
/// the canonical enumeration order of node entries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Step(String);

impl Step {
    /// Validate and wrap a step segment.
    pub fn new(segment: impl Into<String>) -> Result<Self, TypeError> {
        let segment = segment.into();
        if segment.is_empty() {
            return Err(TypeError::InvalidStep {
                step: segment,
                reason: "step must not be empty".into(),
            });
        }
        if segment.contains('/') {
            return Err(TypeError::InvalidStep {
                step: segment,
                reason: "step must not contain '/'".into(),
            });
        }
        Ok(Self(segment))
    }

    /// The step as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step({:?})", self.0)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Step {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, TypeError> {
        Self::new(s)
    }
}

/// A finite ordered sequence of steps.
///
/// Two paths are equal iff their step sequences are equal. Printed form is
/// `/a/b/c`; the root prints as `/`.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path(Vec<Step>);

impl Path {
    /// The empty path, addressing the tree root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from pre-validated steps.
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    /// Parse a `/`-separated path. A leading `/` is accepted; empty
    /// segments are rejected. `"/"` and `""` both parse to the root.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let steps = trimmed
            .split('/')
            .map(Step::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(steps))
    }

    /// Returns `true` for the empty path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the path has no steps.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The steps in order.
    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    /// Extend the path with one more step.
    pub fn child(&self, step: Step) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    /// Split off the first step, if any, returning it and the remainder.
    pub fn split_first(&self) -> Option<(&Step, Path)> {
        let (head, tail) = self.0.split_first()?;
        Some((head, Path(tail.to_vec())))
    }

    /// Split off the last step, if any, returning the prefix and the step.
    pub fn split_last(&self) -> Option<(Path, &Step)> {
        let (last, init) = self.0.split_last()?;
        Some((Path(init.to_vec()), last))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for step in &self.0 {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for Path {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, TypeError> {
        Self::parse(s)
    }
}

impl FromIterator<Step> for Path {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
