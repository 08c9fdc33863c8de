use taiga_types::{Branch, ObjectId};
use taiga_watch::WatchSet;

use crate::error::StoreResult;
use crate::object::RawObject;

/// Read-only keyed lookup.
///
/// Lookups are idempotent and absence is not an error: a missing key is
/// `Ok(None)` from `find` and `Ok(false)` from `contains`.
pub trait ReadOnlyStore<K, V>: Send + Sync {
    /// Check whether a key resolves.
    fn contains(&self, key: &K) -> StoreResult<bool>;

    /// Read the value bound to a key.
    fn find(&self, key: &K) -> StoreResult<Option<V>>;
}

/// Content-addressed append-only store.
///
/// Implementations must satisfy these invariants:
/// - The key of every stored object equals [`RawObject::compute_id`] of
///   its bytes; the store never invents keys.
/// - Entries never change or disappear once added.
/// - `add` is idempotent: re-adding identical bytes returns the existing
///   key and does not duplicate storage.
pub trait AppendOnlyStore: ReadOnlyStore<ObjectId, RawObject> {
    /// Persist an object and return its content-addressed key.
    fn add(&self, object: &RawObject) -> StoreResult<ObjectId>;
}

/// Verified-link store: maps alternative keys onto existing objects.
///
/// Used to certify that an alternative hashing or representation of a
/// value resolves to the same logical object. The target must already be
/// present in the backing object store when the link is added.
pub trait LinkStore: ReadOnlyStore<ObjectId, ObjectId> {
    /// Assert that `src` is an alias resolving to the pre-existing `dst`.
    fn add_link(&self, src: ObjectId, dst: ObjectId) -> StoreResult<()>;
}

/// Mutable branch-head store with atomic updates and watch delivery.
///
/// Keys are validated [`Branch`] names (the empty name is unrepresentable
/// by construction). All write operations are linearisable against
/// concurrent writers, and every observed transition is routed through the
/// store's [`WatchSet`].
pub trait ReadWriteStore: ReadOnlyStore<Branch, ObjectId> {
    /// Bind a branch to a commit hash, replacing any previous binding.
    fn set(&self, key: &Branch, value: ObjectId) -> StoreResult<()>;

    /// Atomic compare-and-swap.
    ///
    /// `test = None` means the key must not currently exist; `set = None`
    /// removes the binding. Returns `false` (not an error) when the
    /// current value does not match `test`.
    fn test_and_set(
        &self,
        key: &Branch,
        test: Option<&ObjectId>,
        set: Option<&ObjectId>,
    ) -> StoreResult<bool>;

    /// Remove a binding. Removing an absent key is a no-op.
    fn remove(&self, key: &Branch) -> StoreResult<()>;

    /// All bound branch names, sorted.
    fn list(&self) -> StoreResult<Vec<Branch>>;

    /// The watch state fed by this store's mutations.
    fn watches(&self) -> &WatchSet<Branch, ObjectId>;
}
