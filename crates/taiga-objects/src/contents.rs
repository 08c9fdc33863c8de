use std::marker::PhantomData;
use std::sync::Arc;

use taiga_merge::{Ancestor, Conflict, Merge, MergeResult};
use taiga_store::{AppendOnlyStore, ObjectKind, RawObject};
use taiga_types::ObjectId;

use crate::error::{ObjectError, ObjectResult};

/// User-defined payload stored at the leaves of a tree.
///
/// Three capabilities are required: a deterministic byte codec (the hash
/// of the encoding is the storage key), a diagnostic print/parse
/// round-trip, and a three-way merge combinator over `Option<Self>`.
pub trait Contents: Clone + PartialEq + Send + Sync + 'static {
    /// Deterministic byte encoding; equal values encode to equal bytes.
    fn encode(&self) -> Vec<u8>;

    /// Decode from the byte encoding.
    fn decode(data: &[u8]) -> ObjectResult<Self>;

    /// Human-readable rendering, for diagnostics.
    fn print(&self) -> String;

    /// Parse the rendering produced by [`Contents::print`].
    fn parse(s: &str) -> ObjectResult<Self>;

    /// The three-way merge combinator for this contents type.
    fn merge() -> Merge<Self>;
}

/// Typed store for [`Contents`] values over an append-only kernel store.
pub struct ContentsStore<C> {
    inner: Arc<dyn AppendOnlyStore>,
    _contents: PhantomData<fn() -> C>,
}

impl<C> Clone for ContentsStore<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _contents: PhantomData,
        }
    }
}

impl<C: Contents> ContentsStore<C> {
    /// Wrap an append-only kernel store.
    pub fn new(inner: Arc<dyn AppendOnlyStore>) -> Self {
        Self {
            inner,
            _contents: PhantomData,
        }
    }

    /// Persist a value; returns the content-addressed key. Idempotent.
    pub fn add(&self, value: &C) -> ObjectResult<ObjectId> {
        let raw = RawObject::new(ObjectKind::Contents, value.encode());
        Ok(self.inner.add(&raw)?)
    }

    /// Read a value back by key; absence is `None`.
    pub fn find(&self, id: &ObjectId) -> ObjectResult<Option<C>> {
        match self.inner.find(id)? {
            None => Ok(None),
            Some(raw) => {
                if raw.kind != ObjectKind::Contents {
                    return Err(ObjectError::KindMismatch {
                        expected: ObjectKind::Contents,
                        actual: raw.kind,
                    });
                }
                C::decode(&raw.data).map(Some)
            }
        }
    }

    /// Check whether a key resolves.
    pub fn contains(&self, id: &ObjectId) -> ObjectResult<bool> {
        Ok(self.inner.contains(id)?)
    }

    /// Key-level three-way merge.
    ///
    /// Reads the values named by `old`, `a` and `b`, runs the user's
    /// value merge, and persists the result, yielding its key. A key that
    /// fails to read (absent or undecodable) surfaces as a conflict, as
    /// does a value-level conflict.
    pub fn merge_keys(
        &self,
        old: &Ancestor<'_, ObjectId>,
        a: Option<&ObjectId>,
        b: Option<&ObjectId>,
    ) -> MergeResult<Option<ObjectId>> {
        // Equal keys mean equal bytes; skip the reads entirely.
        if a == b {
            return Ok(a.copied());
        }

        let va = self.read_for_merge(a)?;
        let vb = self.read_for_merge(b)?;
        let old_values = Ancestor::new(|| match old.resolve()? {
            None => Ok(None),
            Some(id) => self.read_for_merge(Some(&id)),
        });

        match C::merge().run(&old_values, va.as_ref(), vb.as_ref())? {
            None => Ok(None),
            Some(merged) => {
                let id = self
                    .add(&merged)
                    .map_err(|e| Conflict::new(format!("failed to store merged contents: {e}")))?;
                Ok(Some(id))
            }
        }
    }

    /// Read one side of a merge; an absent key position is absence, but a
    /// key that does not resolve is a conflict.
    fn read_for_merge(&self, id: Option<&ObjectId>) -> MergeResult<Option<C>> {
        let Some(id) = id else { return Ok(None) };
        match self.find(id) {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => Err(Conflict::new(format!(
                "contents {} not present in store",
                id.short_hex()
            ))),
            Err(e) => Err(Conflict::new(format!(
                "failed to read contents {}: {e}",
                id.short_hex()
            ))),
        }
    }
}
