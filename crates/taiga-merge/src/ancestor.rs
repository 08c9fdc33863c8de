use std::cell::OnceCell;

use crate::conflict::MergeResult;

/// The lazily computed common ancestor handed to a merge function.
///
/// Computing the ancestor can itself require a recursive merge (when two
/// commits have several lowest common ancestors), so it is deferred behind
/// a thunk. The thunk runs at most once; its result, conflict included, is
/// memoised and cloned out on every later resolve.
pub struct Ancestor<'a, T> {
    thunk: Box<dyn Fn() -> MergeResult<Option<T>> + 'a>,
    cache: OnceCell<MergeResult<Option<T>>>,
}

impl<'a, T: Clone> Ancestor<'a, T> {
    /// Defer the ancestor behind `thunk`.
    pub fn new(thunk: impl Fn() -> MergeResult<Option<T>> + 'a) -> Self {
        Self {
            thunk: Box::new(thunk),
            cache: OnceCell::new(),
        }
    }

    /// An already-known ancestor value.
    pub fn of_value(value: Option<T>) -> Self {
        let cache = OnceCell::new();
        let _ = cache.set(Ok(value));
        Self {
            thunk: Box::new(|| unreachable!("pre-resolved ancestor")),
            cache,
        }
    }

    /// Force the thunk (first call only) and return the ancestor.
    pub fn resolve(&self) -> MergeResult<Option<T>> {
        self.cache.get_or_init(|| (self.thunk)()).clone()
    }
}
