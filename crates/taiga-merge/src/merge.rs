//! The [`Merge`] combinator type and its built-in instances.
//!
//! A merge function reconciles two sides (`a`, `b`) against a lazy common
//! ancestor. `None` encodes absence on any of the three positions, so the
//! same combinator handles additions and deletions as well as updates.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::ancestor::Ancestor;
use crate::conflict::{Conflict, MergeResult};

type MergeFn<T> =
    dyn for<'a> Fn(&Ancestor<'a, T>, Option<&T>, Option<&T>) -> MergeResult<Option<T>>
        + Send
        + Sync;

/// A three-way merge combinator over `Option<T>`.
pub struct Merge<T> {
    run: Arc<MergeFn<T>>,
}

impl<T> Clone for Merge<T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Merge<T> {
    /// Wrap a merge function.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&Ancestor<'a, T>, Option<&T>, Option<&T>) -> MergeResult<Option<T>>
            + Send
            + Sync
            + 'static,
    {
        Self { run: Arc::new(f) }
    }

    /// Run the merge.
    pub fn run(&self, old: &Ancestor<'_, T>, a: Option<&T>, b: Option<&T>) -> MergeResult<Option<T>> {
        (self.run)(old, a, b)
    }

    /// Try `mergers` in order; the first non-conflicting result wins.
    ///
    /// An empty sequence always conflicts.
    pub fn seq(mergers: Vec<Merge<T>>) -> Self {
        Self::new(move |old, a, b| {
            let mut last = Conflict::new("seq: no merge combinator supplied");
            for merger in &mergers {
                match merger.run(old, a, b) {
                    Ok(value) => return Ok(value),
                    Err(conflict) => last = conflict,
                }
            }
            Err(last)
        })
    }

    /// Transport this combinator across a codec.
    ///
    /// `to` converts the outer type into the merged type, `of` converts
    /// back. Conversion failures and panics both surface as conflicts, so
    /// a faulty user conversion can never take down the algebra.
    pub fn like<U, F, G>(self, to: F, of: G) -> Merge<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&U) -> MergeResult<T> + Send + Sync + 'static,
        G: Fn(&T) -> MergeResult<U> + Send + Sync + 'static,
    {
        Merge::new(move |old, a, b| {
            let a = match a {
                None => None,
                Some(u) => Some(guarded(|| to(u))?),
            };
            let b = match b {
                None => None,
                Some(u) => Some(guarded(|| to(u))?),
            };
            let inner_old = Ancestor::new(|| match old.resolve()? {
                None => Ok(None),
                Some(u) => guarded(|| to(&u)).map(Some),
            });
            match self.run(&inner_old, a.as_ref(), b.as_ref())? {
                None => Ok(None),
                Some(t) => guarded(|| of(&t)).map(Some),
            }
        })
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Merge<T> {
    /// The default merge: equal sides agree; a side that still equals the
    /// ancestor yields to the other; two distinct changes conflict.
    ///
    /// The ancestor is only forced when the sides disagree.
    pub fn idempotent() -> Self {
        Self::new(|old, a, b| {
            if a == b {
                return Ok(a.cloned());
            }
            let old = old.resolve()?;
            if old.as_ref() == a {
                Ok(b.cloned())
            } else if old.as_ref() == b {
                Ok(a.cloned())
            } else {
                Err(Conflict::new(
                    "default: both sides changed and the values differ",
                ))
            }
        })
    }
}

impl Merge<i64> {
    /// Additive counter merge: both deltas against the ancestor apply.
    ///
    /// Absence counts as zero on every position, so `merge(old, old+da,
    /// old+db) = old+da+db` holds through additions and removals alike.
    pub fn counter() -> Self {
        Self::new(|old, a, b| {
            let old = old.resolve()?.unwrap_or(0);
            let a = a.copied().unwrap_or(0);
            let b = b.copied().unwrap_or(0);
            Ok(Some(a + b - old))
        })
    }
}

/// Merge a pair component-wise.
///
/// Both halves must agree on presence: a merge where one half resolves to
/// a value and the other to absence conflicts.
pub fn pair<A, B>(first: Merge<A>, second: Merge<B>) -> Merge<(A, B)>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    Merge::new(move |old, a, b| {
        let old_first = Ancestor::new(|| Ok(old.resolve()?.map(|(x, _)| x)));
        let merged_first = first.run(&old_first, a.map(|p| &p.0), b.map(|p| &p.0))?;

        let old_second = Ancestor::new(|| Ok(old.resolve()?.map(|(_, y)| y)));
        let merged_second = second.run(&old_second, a.map(|p| &p.1), b.map(|p| &p.1))?;

        match (merged_first, merged_second) {
            (Some(x), Some(y)) => Ok(Some((x, y))),
            (None, None) => Ok(None),
            _ => Err(Conflict::new("pair: halves disagree on absence")),
        }
    })
}

/// Run a fallible closure, converting a panic into a [`Conflict`].
fn guarded<R>(f: impl FnOnce() -> MergeResult<R>) -> MergeResult<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(_) => Err(Conflict::new("conversion function panicked")),
    }
}
