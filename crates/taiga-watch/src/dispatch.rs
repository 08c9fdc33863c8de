//! The watch dispatcher: handler registration and diff delivery.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::warn;

/// A state transition as seen by one handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diff<V> {
    /// The key was unbound and is now bound to this value.
    Added(V),
    /// The key was bound to this value and is now unbound.
    Removed(V),
    /// The binding changed from the first value to the second.
    Updated(V, V),
}

/// Opaque registration token returned by `watch`/`watch_key`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(u64);

type Callback<K, V> = dyn Fn(&K, &Diff<V>) + Send + Sync;

/// Per-handler delivery state: the last value delivered for each key.
///
/// Holding this mutex for the whole delivery is what serialises
/// invocations of a single handler. Intermediate states may be coalesced
/// away, but the last delivered value always matches the most recent
/// observed state.
struct DeliveryState<K, V> {
    seen: HashMap<K, V>,
}

struct Handler<K, V> {
    /// `None` for global handlers, `Some(k)` for key-scoped ones.
    key: Option<K>,
    callback: Box<Callback<K, V>>,
    delivery: Mutex<DeliveryState<K, V>>,
}

/// Watch state for one mutable store: global and per-key handlers.
pub struct WatchSet<K, V> {
    handlers: RwLock<HashMap<WatchHandle, Arc<Handler<K, V>>>>,
    next_handle: AtomicU64,
}

impl<K, V> Default for WatchSet<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> WatchSet<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// An empty watch set.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().expect("watch lock poisoned").len()
    }

    /// Returns `true` if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install a global handler.
    ///
    /// `init` seeds the handler's last-seen snapshot: the first
    /// notification for a key is diffed against the initial binding (or
    /// against absence when the key is not in `init`).
    pub fn watch<F>(&self, init: Vec<(K, V)>, callback: F) -> WatchHandle
    where
        F: Fn(&K, &Diff<V>) + Send + Sync + 'static,
    {
        self.register(None, init, callback)
    }

    /// Install a handler scoped to a single key.
    ///
    /// Scoped handlers skip the dispatch work for unrelated keys.
    pub fn watch_key<F>(&self, key: K, init: Option<V>, callback: F) -> WatchHandle
    where
        F: Fn(&K, &Diff<V>) + Send + Sync + 'static,
    {
        let init = init.map(|v| (key.clone(), v)).into_iter().collect();
        self.register(Some(key), init, callback)
    }

    fn register<F>(&self, key: Option<K>, init: Vec<(K, V)>, callback: F) -> WatchHandle
    where
        F: Fn(&K, &Diff<V>) + Send + Sync + 'static,
    {
        let handle = WatchHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let handler = Arc::new(Handler {
            key,
            callback: Box::new(callback),
            delivery: Mutex::new(DeliveryState {
                seen: init.into_iter().collect(),
            }),
        });
        self.handlers
            .write()
            .expect("watch lock poisoned")
            .insert(handle, handler);
        handle
    }

    /// Cancel a handler. Blocks until any in-flight delivery to that
    /// handler has completed, so no invocation starts after this returns.
    ///
    /// Returns `false` if the handle was unknown.
    pub fn unwatch(&self, handle: WatchHandle) -> bool {
        let removed = self
            .handlers
            .write()
            .expect("watch lock poisoned")
            .remove(&handle);
        match removed {
            Some(handler) => {
                // Wait out a delivery that was already running.
                drop(handler.delivery.lock().expect("delivery lock poisoned"));
                true
            }
            None => false,
        }
    }

    /// Deliver a state transition: `new = None` means the key was removed.
    ///
    /// Each interested handler receives the diff against its own last
    /// delivered value; a handler observing no net change is skipped.
    pub fn notify(&self, key: &K, new: Option<&V>) {
        let interested: Vec<(WatchHandle, Arc<Handler<K, V>>)> = {
            let handlers = self.handlers.read().expect("watch lock poisoned");
            handlers
                .iter()
                .filter(|(_, h)| match &h.key {
                    Some(k) => k == key,
                    None => true,
                })
                .map(|(handle, h)| (*handle, Arc::clone(h)))
                .collect()
        };

        let mut dead = Vec::new();
        for (handle, handler) in interested {
            let mut delivery = handler.delivery.lock().expect("delivery lock poisoned");
            let diff = match (delivery.seen.get(key), new) {
                (None, Some(v)) => Some(Diff::Added(v.clone())),
                (Some(o), None) => Some(Diff::Removed(o.clone())),
                (Some(o), Some(v)) if o != v => Some(Diff::Updated(o.clone(), v.clone())),
                _ => None,
            };
            let Some(diff) = diff else { continue };

            match new {
                Some(v) => {
                    delivery.seen.insert(key.clone(), v.clone());
                }
                None => {
                    delivery.seen.remove(key);
                }
            }

            let outcome = catch_unwind(AssertUnwindSafe(|| (handler.callback)(key, &diff)));
            drop(delivery);
            if outcome.is_err() {
                warn!(?key, "watch handler panicked, dropping it");
                dead.push(handle);
            }
        }

        if !dead.is_empty() {
            let mut handlers = self.handlers.write().expect("watch lock poisoned");
            for handle in dead {
                handlers.remove(&handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    type Log = Arc<StdMutex<Vec<(String, Diff<String>)>>>;

    fn recording(log: &Log) -> impl Fn(&String, &Diff<String>) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |k, d| log.lock().unwrap().push((k.clone(), d.clone()))
    }

    // -----------------------------------------------------------------
    // Delivery basics
    // -----------------------------------------------------------------

    #[test]
    fn global_handler_sees_added_then_updated() {
        let watches: WatchSet<String, String> = WatchSet::new();
        let log: Log = Arc::default();
        watches.watch(vec![], recording(&log));

        watches.notify(&"p".to_string(), Some(&"v1".to_string()));
        watches.notify(&"p".to_string(), Some(&"v2".to_string()));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].1, Diff::Added("v1".into()));
        assert_eq!(log[1].1, Diff::Updated("v1".into(), "v2".into()));
    }

    #[test]
    fn removal_delivers_removed() {
        let watches: WatchSet<String, String> = WatchSet::new();
        let log: Log = Arc::default();
        watches.watch(vec![], recording(&log));

        watches.notify(&"k".to_string(), Some(&"v".to_string()));
        watches.notify(&"k".to_string(), None);

        let log = log.lock().unwrap();
        assert_eq!(log[1].1, Diff::Removed("v".into()));
    }

    #[test]
    fn no_net_change_is_not_delivered() {
        let watches: WatchSet<String, String> = WatchSet::new();
        let log: Log = Arc::default();
        watches.watch(vec![], recording(&log));

        watches.notify(&"k".to_string(), Some(&"v".to_string()));
        watches.notify(&"k".to_string(), Some(&"v".to_string()));

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn init_binding_suppresses_equal_state() {
        let watches: WatchSet<String, String> = WatchSet::new();
        let log: Log = Arc::default();
        watches.watch(
            vec![("k".to_string(), "v".to_string())],
            recording(&log),
        );

        // Same value as init: nothing to deliver.
        watches.notify(&"k".to_string(), Some(&"v".to_string()));
        assert!(log.lock().unwrap().is_empty());

        // A different value diffs against the init binding.
        watches.notify(&"k".to_string(), Some(&"w".to_string()));
        assert_eq!(
            log.lock().unwrap()[0].1,
            Diff::Updated("v".into(), "w".into())
        );
    }

    // -----------------------------------------------------------------
    // Key scoping
    // -----------------------------------------------------------------

    #[test]
    fn key_handler_ignores_other_keys() {
        let watches: WatchSet<String, String> = WatchSet::new();
        let log: Log = Arc::default();
        watches.watch_key("mine".to_string(), None, recording(&log));

        watches.notify(&"other".to_string(), Some(&"x".to_string()));
        assert!(log.lock().unwrap().is_empty());

        watches.notify(&"mine".to_string(), Some(&"x".to_string()));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    // -----------------------------------------------------------------
    // Unwatch
    // -----------------------------------------------------------------

    #[test]
    fn unwatch_stops_delivery() {
        let watches: WatchSet<String, String> = WatchSet::new();
        let log: Log = Arc::default();
        let handle = watches.watch(vec![], recording(&log));

        assert!(watches.unwatch(handle));
        watches.notify(&"k".to_string(), Some(&"v".to_string()));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unwatch_unknown_handle_is_false() {
        let watches: WatchSet<String, String> = WatchSet::new();
        let handle = watches.watch(vec![], |_, _| {});
        watches.unwatch(handle);
        assert!(!watches.unwatch(handle));
    }

    // -----------------------------------------------------------------
    // Failure isolation
    // -----------------------------------------------------------------

    #[test]
    fn panicking_handler_is_dropped_others_survive() {
        let watches: WatchSet<String, String> = WatchSet::new();
        let log: Log = Arc::default();
        watches.watch(vec![], |_, _| panic!("bad observer"));
        watches.watch(vec![], recording(&log));
        assert_eq!(watches.len(), 2);

        watches.notify(&"k".to_string(), Some(&"v".to_string()));
        assert_eq!(watches.len(), 1);
        assert_eq!(log.lock().unwrap().len(), 1);

        // The dead handler stays gone.
        watches.notify(&"k".to_string(), Some(&"w".to_string()));
        assert_eq!(watches.len(), 1);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    // -----------------------------------------------------------------
    // Per-handler serialisation
    // -----------------------------------------------------------------

    #[test]
    fn deliveries_to_one_handler_never_overlap() {
        use std::thread;

        let watches: Arc<WatchSet<String, i64>> = Arc::new(WatchSet::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicUsize::new(0));

        {
            let inside = Arc::clone(&inside);
            let overlapped = Arc::clone(&overlapped);
            watches.watch(vec![], move |_, _| {
                if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                    overlapped.fetch_add(1, Ordering::SeqCst);
                }
                thread::yield_now();
                inside.fetch_sub(1, Ordering::SeqCst);
            });
        }

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let watches = Arc::clone(&watches);
                thread::spawn(move || {
                    for j in 0..50 {
                        watches.notify(&"k".to_string(), Some(&(i * 100 + j)));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(overlapped.load(Ordering::SeqCst), 0);
    }
}
