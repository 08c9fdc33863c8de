//! Per-step three-way merge of tree nodes.
//!
//! Node merge is the per-step lift of the child merges: contents entries
//! run the user's contents and metadata combinators, node entries recurse.
//! A step added on one side is kept; a step deleted on one side and
//! unchanged on the other is deleted; a step modified on both sides is
//! merged recursively. Conflicts propagate upward verbatim, with the
//! offending path prefixed into the reason.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use taiga_merge::{Ancestor, Conflict, MergeResult};
use taiga_objects::{Contents, ContentsStore, Metadata, Node, NodeEntry, NodeStore};
use taiga_types::{ObjectId, Path, Step};

/// Merges node keys against a store, per step.
pub struct NodeMerger<'a, C, M> {
    nodes: &'a NodeStore,
    contents: &'a ContentsStore<C>,
    _metadata: PhantomData<fn() -> M>,
}

impl<'a, C: Contents, M: Metadata> NodeMerger<'a, C, M> {
    /// A merger over the given stores.
    pub fn new(nodes: &'a NodeStore, contents: &'a ContentsStore<C>) -> Self {
        Self {
            nodes,
            contents,
            _metadata: PhantomData,
        }
    }

    /// Three-way merge of optional node keys; `None` is an absent subtree.
    ///
    /// Yields the key of the merged node, or `None` when the merge leaves
    /// no entries (the subtree vanishes).
    pub fn merge_nodes(
        &self,
        old: Option<&ObjectId>,
        a: Option<&ObjectId>,
        b: Option<&ObjectId>,
    ) -> MergeResult<Option<ObjectId>> {
        self.merge_at(&Path::root(), old, a, b)
    }

    fn merge_at(
        &self,
        path: &Path,
        old: Option<&ObjectId>,
        a: Option<&ObjectId>,
        b: Option<&ObjectId>,
    ) -> MergeResult<Option<ObjectId>> {
        // Equal keys mean equal subtrees.
        if a == b {
            return Ok(a.copied());
        }

        let node_old = self.read_node(path, old)?;
        let node_a = self.read_node(path, a)?;
        let node_b = self.read_node(path, b)?;

        let mut steps: BTreeSet<Step> = BTreeSet::new();
        for node in [&node_old, &node_a, &node_b].into_iter().flatten() {
            steps.extend(node.steps().cloned());
        }

        let mut merged: BTreeMap<Step, NodeEntry> = BTreeMap::new();
        for step in steps {
            let child_path = path.child(step.clone());
            let entry = self.merge_entry(
                &child_path,
                node_old.as_ref().and_then(|n| n.get(&step)),
                node_a.as_ref().and_then(|n| n.get(&step)),
                node_b.as_ref().and_then(|n| n.get(&step)),
            )?;
            if let Some(entry) = entry {
                merged.insert(step, entry);
            }
        }

        if merged.is_empty() {
            return Ok(None);
        }
        let id = self
            .nodes
            .add(&Node::new(merged))
            .map_err(|e| Conflict::new(format!("failed to store merged node: {e}")).at(path))?;
        Ok(Some(id))
    }

    fn merge_entry(
        &self,
        path: &Path,
        old: Option<&NodeEntry>,
        a: Option<&NodeEntry>,
        b: Option<&NodeEntry>,
    ) -> MergeResult<Option<NodeEntry>> {
        if a == b {
            return Ok(a.cloned());
        }

        // The two sides must agree on the entry's kind.
        let node_slot = match (a, b) {
            (Some(NodeEntry::Node(_)), Some(NodeEntry::Contents { .. }))
            | (Some(NodeEntry::Contents { .. }), Some(NodeEntry::Node(_))) => {
                return Err(Conflict::new(
                    "one side has a subtree, the other has contents",
                )
                .at(path));
            }
            (Some(NodeEntry::Node(_)), _) | (_, Some(NodeEntry::Node(_))) => true,
            _ => false,
        };

        if node_slot {
            // An old entry of the other kind contributes nothing.
            let old_id = match old {
                Some(NodeEntry::Node(id)) => Some(*id),
                _ => None,
            };
            let a_id = match a {
                Some(NodeEntry::Node(id)) => Some(*id),
                _ => None,
            };
            let b_id = match b {
                Some(NodeEntry::Node(id)) => Some(*id),
                _ => None,
            };
            let merged = self.merge_at(path, old_id.as_ref(), a_id.as_ref(), b_id.as_ref())?;
            return Ok(merged.map(NodeEntry::Node));
        }

        let (old_cid, old_meta) = split_contents(old);
        let (a_cid, a_meta) = split_contents(a);
        let (b_cid, b_meta) = split_contents(b);

        let old_anc = Ancestor::of_value(old_cid);
        let merged_cid = self
            .contents
            .merge_keys(&old_anc, a_cid.as_ref(), b_cid.as_ref())
            .map_err(|c| c.at(path))?;

        match merged_cid {
            None => Ok(None),
            Some(id) => {
                let metadata = self
                    .merge_metadata(path, old_meta, a_meta, b_meta)?
                    .unwrap_or_else(M::default_value);
                Ok(Some(NodeEntry::Contents {
                    id,
                    metadata: metadata.encode(),
                }))
            }
        }
    }

    fn merge_metadata(
        &self,
        path: &Path,
        old: Option<&[u8]>,
        a: Option<&[u8]>,
        b: Option<&[u8]>,
    ) -> MergeResult<Option<M>> {
        let decode = |bytes: Option<&[u8]>| -> MergeResult<Option<M>> {
            match bytes {
                None => Ok(None),
                Some(bytes) => M::decode(bytes)
                    .map(Some)
                    .map_err(|e| Conflict::new(format!("undecodable metadata: {e}")).at(path)),
            }
        };
        let va = decode(a)?;
        let vb = decode(b)?;
        let old_values = Ancestor::new(move || decode(old));
        M::merge()
            .run(&old_values, va.as_ref(), vb.as_ref())
            .map_err(|c| c.at(path))
    }

    fn read_node(&self, path: &Path, id: Option<&ObjectId>) -> MergeResult<Option<Node>> {
        let Some(id) = id else { return Ok(None) };
        match self.nodes.find(id) {
            Ok(Some(node)) => Ok(Some(node)),
            Ok(None) => Err(Conflict::new(format!(
                "node {} not present in store",
                id.short_hex()
            ))
            .at(path)),
            Err(e) => Err(Conflict::new(format!(
                "failed to read node {}: {e}",
                id.short_hex()
            ))
            .at(path)),
        }
    }
}

fn split_contents(entry: Option<&NodeEntry>) -> (Option<ObjectId>, Option<&[u8]>) {
    match entry {
        Some(NodeEntry::Contents { id, metadata }) => (Some(*id), Some(metadata.as_slice())),
        _ => (None, None),
    }
}
