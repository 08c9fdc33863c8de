use serde::{Deserialize, Serialize};

use taiga_store::{AppendOnlyStore, ObjectKind, RawObject};
use taiga_types::ObjectId;

use crate::error::{ObjectError, ObjectResult};

/// A transferable, self-contained bundle of objects.
///
/// Slices carry raw objects grouped by kind, keyed by their content hash,
/// and are the unit of bulk export/import and of the generic sync
/// fallback. A slice is data, not a view: applying it to a store verifies
/// every key against the bytes it names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    /// Contents objects, `(key, raw)`.
    pub contents: Vec<(ObjectId, RawObject)>,
    /// Node objects, `(key, raw)`.
    pub nodes: Vec<(ObjectId, RawObject)>,
    /// Commit objects, `(key, raw)`.
    pub commits: Vec<(ObjectId, RawObject)>,
}

impl Slice {
    /// An empty slice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bundled objects.
    pub fn len(&self) -> usize {
        self.contents.len() + self.nodes.len() + self.commits.len()
    }

    /// Returns `true` if nothing is bundled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add one raw object under its computed key, routed by kind.
    ///
    /// Duplicate keys are skipped, so assembling a slice from overlapping
    /// closures stays set-like.
    pub fn insert(&mut self, raw: RawObject) {
        let id = raw.compute_id();
        let bucket = match raw.kind {
            ObjectKind::Contents => &mut self.contents,
            ObjectKind::Node => &mut self.nodes,
            ObjectKind::Commit => &mut self.commits,
        };
        if bucket.iter().any(|(existing, _)| *existing == id) {
            return;
        }
        bucket.push((id, raw));
    }

    /// Sort each bucket by key, fixing the canonical transfer order.
    pub fn canonicalize(&mut self) {
        self.contents.sort_by_key(|(id, _)| *id);
        self.nodes.sort_by_key(|(id, _)| *id);
        self.commits.sort_by_key(|(id, _)| *id);
    }

    /// Write every bundled object into `store`, verifying keys.
    ///
    /// Contents land first, then nodes, then commits, so the store's
    /// closure invariant holds at every prefix of the import. Returns the
    /// number of objects written (idempotent re-imports still count).
    pub fn apply(&self, store: &dyn AppendOnlyStore) -> ObjectResult<usize> {
        let buckets = [&self.contents, &self.nodes, &self.commits];
        let mut written = 0;
        for bucket in buckets {
            for (id, raw) in bucket {
                if raw.compute_id() != *id {
                    return Err(ObjectError::Codec(format!(
                        "slice entry {} does not hash to its key",
                        id.short_hex()
                    )));
                }
                store.add(raw)?;
                written += 1;
            }
        }
        Ok(written)
    }
}
