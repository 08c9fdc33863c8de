//! In-memory, `RwLock`-backed kernel stores.
//!
//! Intended for tests and embedding. Objects are cloned on read/write;
//! data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use taiga_types::{Branch, ObjectId};
use taiga_watch::WatchSet;

use crate::error::{StoreError, StoreResult};
use crate::object::RawObject;
use crate::traits::{AppendOnlyStore, LinkStore, ReadOnlyStore, ReadWriteStore};

// ---------------------------------------------------------------------------
// Append-only object store
// ---------------------------------------------------------------------------

/// In-memory append-only object store.
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, RawObject>>,
}

impl MemoryObjectStore {
    /// A new empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("store lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("store lock poisoned")
            .values()
            .map(RawObject::size)
            .sum()
    }

    /// All object keys, in byte-lexicographic order.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().expect("store lock poisoned");
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOnlyStore<ObjectId, RawObject> for MemoryObjectStore {
    fn contains(&self, key: &ObjectId) -> StoreResult<bool> {
        Ok(self
            .objects
            .read()
            .expect("store lock poisoned")
            .contains_key(key))
    }

    fn find(&self, key: &ObjectId) -> StoreResult<Option<RawObject>> {
        Ok(self
            .objects
            .read()
            .expect("store lock poisoned")
            .get(key)
            .cloned())
    }
}

impl AppendOnlyStore for MemoryObjectStore {
    fn add(&self, object: &RawObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let mut map = self.objects.write().expect("store lock poisoned");
        // Idempotent: identical bytes hash to the same key, so a present
        // entry is already the value being added.
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }
}

impl std::fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Link store
// ---------------------------------------------------------------------------

/// In-memory link store, aliasing keys of a backing object store.
pub struct MemoryLinkStore {
    backing: Arc<dyn AppendOnlyStore>,
    links: RwLock<HashMap<ObjectId, ObjectId>>,
}

impl MemoryLinkStore {
    /// A link store whose targets must exist in `backing`.
    pub fn new(backing: Arc<dyn AppendOnlyStore>) -> Self {
        Self {
            backing,
            links: RwLock::new(HashMap::new()),
        }
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.read().expect("link lock poisoned").len()
    }

    /// Returns `true` if no links are recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReadOnlyStore<ObjectId, ObjectId> for MemoryLinkStore {
    fn contains(&self, key: &ObjectId) -> StoreResult<bool> {
        Ok(self
            .links
            .read()
            .expect("link lock poisoned")
            .contains_key(key))
    }

    fn find(&self, key: &ObjectId) -> StoreResult<Option<ObjectId>> {
        Ok(self
            .links
            .read()
            .expect("link lock poisoned")
            .get(key)
            .copied())
    }
}

impl LinkStore for MemoryLinkStore {
    fn add_link(&self, src: ObjectId, dst: ObjectId) -> StoreResult<()> {
        if !self.backing.contains(&dst)? {
            return Err(StoreError::LinkTargetMissing { src, dst });
        }
        self.links
            .write()
            .expect("link lock poisoned")
            .insert(src, dst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Read-write branch store
// ---------------------------------------------------------------------------

/// In-memory mutable branch store with watch delivery.
///
/// A dedicated delivery mutex is held across each `update map + notify`
/// pair, so transitions reach watchers in the order they took effect.
/// Handlers must not mutate the store they observe.
pub struct MemoryBranchStore {
    heads: RwLock<HashMap<Branch, ObjectId>>,
    watches: WatchSet<Branch, ObjectId>,
    delivery: Mutex<()>,
}

impl MemoryBranchStore {
    /// A new store with no branches bound.
    pub fn new() -> Self {
        Self {
            heads: RwLock::new(HashMap::new()),
            watches: WatchSet::new(),
            delivery: Mutex::new(()),
        }
    }

    /// Current bindings as a sorted list, for watch initialisation.
    pub fn bindings(&self) -> Vec<(Branch, ObjectId)> {
        let map = self.heads.read().expect("branch lock poisoned");
        let mut all: Vec<(Branch, ObjectId)> =
            map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

impl Default for MemoryBranchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOnlyStore<Branch, ObjectId> for MemoryBranchStore {
    fn contains(&self, key: &Branch) -> StoreResult<bool> {
        Ok(self
            .heads
            .read()
            .expect("branch lock poisoned")
            .contains_key(key))
    }

    fn find(&self, key: &Branch) -> StoreResult<Option<ObjectId>> {
        Ok(self
            .heads
            .read()
            .expect("branch lock poisoned")
            .get(key)
            .copied())
    }
}

impl ReadWriteStore for MemoryBranchStore {
    fn set(&self, key: &Branch, value: ObjectId) -> StoreResult<()> {
        let _order = self.delivery.lock().expect("delivery lock poisoned");
        {
            let mut map = self.heads.write().expect("branch lock poisoned");
            map.insert(key.clone(), value);
        }
        debug!(branch = %key, head = %value.short_hex(), "set branch head");
        self.watches.notify(key, Some(&value));
        Ok(())
    }

    fn test_and_set(
        &self,
        key: &Branch,
        test: Option<&ObjectId>,
        set: Option<&ObjectId>,
    ) -> StoreResult<bool> {
        let _order = self.delivery.lock().expect("delivery lock poisoned");
        {
            let mut map = self.heads.write().expect("branch lock poisoned");
            if map.get(key) != test {
                return Ok(false);
            }
            match set {
                Some(value) => {
                    map.insert(key.clone(), *value);
                }
                None => {
                    map.remove(key);
                }
            }
        }
        debug!(branch = %key, "test-and-set applied");
        self.watches.notify(key, set);
        Ok(true)
    }

    fn remove(&self, key: &Branch) -> StoreResult<()> {
        let _order = self.delivery.lock().expect("delivery lock poisoned");
        let removed = {
            let mut map = self.heads.write().expect("branch lock poisoned");
            map.remove(key)
        };
        if removed.is_some() {
            debug!(branch = %key, "removed branch");
            self.watches.notify(key, None);
        }
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<Branch>> {
        let map = self.heads.read().expect("branch lock poisoned");
        let mut names: Vec<Branch> = map.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn watches(&self) -> &WatchSet<Branch, ObjectId> {
        &self.watches
    }
}

impl std::fmt::Debug for MemoryBranchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.heads.read().expect("branch lock poisoned").len();
        f.debug_struct("MemoryBranchStore")
            .field("branch_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    fn raw(data: &[u8]) -> RawObject {
        RawObject::new(ObjectKind::Contents, data.to_vec())
    }

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_hash([byte; 32])
    }

    fn branch(name: &str) -> Branch {
        Branch::new(name).unwrap()
    }

    // -----------------------------------------------------------------
    // Append-only store
    // -----------------------------------------------------------------

    #[test]
    fn add_and_find() {
        let store = MemoryObjectStore::new();
        let obj = raw(b"hello");
        let id = store.add(&obj).unwrap();
        assert!(store.contains(&id).unwrap());
        assert_eq!(store.find(&id).unwrap(), Some(obj));
    }

    #[test]
    fn find_missing_is_none() {
        let store = MemoryObjectStore::new();
        assert_eq!(store.find(&oid(9)).unwrap(), None);
        assert!(!store.contains(&oid(9)).unwrap());
    }

    #[test]
    fn add_is_idempotent() {
        let store = MemoryObjectStore::new();
        let id1 = store.add(&raw(b"dup")).unwrap();
        let id2 = store.add(&raw(b"dup")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn key_is_the_domain_hash() {
        let store = MemoryObjectStore::new();
        let obj = raw(b"addressed");
        let id = store.add(&obj).unwrap();
        assert_eq!(id, obj.compute_id());
    }

    #[test]
    fn utility_surface() {
        let store = MemoryObjectStore::new();
        assert!(store.is_empty());
        store.add(&raw(b"12345")).unwrap();
        store.add(&raw(b"123456789")).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 14);
        let ids = store.all_ids();
        assert!(ids.windows(2).all(|w| w[0] <= w[1]));
    }

    // -----------------------------------------------------------------
    // Link store
    // -----------------------------------------------------------------

    #[test]
    fn link_to_existing_object() {
        let backing = Arc::new(MemoryObjectStore::new());
        let dst = backing.add(&raw(b"canonical")).unwrap();
        let links = MemoryLinkStore::new(backing);

        links.add_link(oid(1), dst).unwrap();
        assert_eq!(links.find(&oid(1)).unwrap(), Some(dst));
    }

    #[test]
    fn link_to_missing_object_fails() {
        let backing = Arc::new(MemoryObjectStore::new());
        let links = MemoryLinkStore::new(backing);
        let err = links.add_link(oid(1), oid(2)).unwrap_err();
        assert!(matches!(err, StoreError::LinkTargetMissing { .. }));
        assert!(links.is_empty());
    }

    // -----------------------------------------------------------------
    // Branch store
    // -----------------------------------------------------------------

    #[test]
    fn set_and_find_branch() {
        let store = MemoryBranchStore::new();
        store.set(&branch("master"), oid(1)).unwrap();
        assert_eq!(store.find(&branch("master")).unwrap(), Some(oid(1)));
    }

    #[test]
    fn remove_branch_is_idempotent() {
        let store = MemoryBranchStore::new();
        store.set(&branch("dev"), oid(1)).unwrap();
        store.remove(&branch("dev")).unwrap();
        assert_eq!(store.find(&branch("dev")).unwrap(), None);
        store.remove(&branch("dev")).unwrap();
    }

    #[test]
    fn list_is_sorted() {
        let store = MemoryBranchStore::new();
        store.set(&branch("zeta"), oid(1)).unwrap();
        store.set(&branch("alpha"), oid(2)).unwrap();
        let names = store.list().unwrap();
        assert_eq!(names, vec![branch("alpha"), branch("zeta")]);
    }

    #[test]
    fn test_and_set_create() {
        let store = MemoryBranchStore::new();
        // test = None: key must not exist.
        assert!(store
            .test_and_set(&branch("master"), None, Some(&oid(1)))
            .unwrap());
        assert_eq!(store.find(&branch("master")).unwrap(), Some(oid(1)));
        // Re-creating fails: key now exists.
        assert!(!store
            .test_and_set(&branch("master"), None, Some(&oid(2)))
            .unwrap());
    }

    #[test]
    fn test_and_set_swing_and_remove() {
        let store = MemoryBranchStore::new();
        store.set(&branch("master"), oid(1)).unwrap();

        // Wrong expectation: no-op, returns false.
        assert!(!store
            .test_and_set(&branch("master"), Some(&oid(9)), Some(&oid(2)))
            .unwrap());
        assert_eq!(store.find(&branch("master")).unwrap(), Some(oid(1)));

        // Matching expectation advances the head.
        assert!(store
            .test_and_set(&branch("master"), Some(&oid(1)), Some(&oid(2)))
            .unwrap());

        // set = None removes the binding.
        assert!(store
            .test_and_set(&branch("master"), Some(&oid(2)), None)
            .unwrap());
        assert_eq!(store.find(&branch("master")).unwrap(), None);
    }

    #[test]
    fn mutations_reach_watchers_in_order() {
        use std::sync::Mutex as StdMutex;
        use taiga_watch::Diff;

        let store = MemoryBranchStore::new();
        let log: Arc<StdMutex<Vec<Diff<ObjectId>>>> = Arc::default();
        {
            let log = Arc::clone(&log);
            store
                .watches()
                .watch(vec![], move |_, d| log.lock().unwrap().push(d.clone()));
        }

        store.set(&branch("master"), oid(1)).unwrap();
        store.set(&branch("master"), oid(2)).unwrap();
        store.remove(&branch("master")).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                Diff::Added(oid(1)),
                Diff::Updated(oid(1), oid(2)),
                Diff::Removed(oid(2)),
            ]
        );
    }

    #[test]
    fn failed_cas_does_not_notify() {
        let store = MemoryBranchStore::new();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        {
            let count = Arc::clone(&count);
            store.watches().watch(vec![], move |_, _| {
                count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            });
        }

        assert!(!store
            .test_and_set(&branch("master"), Some(&oid(1)), Some(&oid(2)))
            .unwrap());
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
