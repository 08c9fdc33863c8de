use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use taiga_store::{AppendOnlyStore, ObjectKind, RawObject};
use taiga_types::{ObjectId, Step};

use crate::error::{ObjectError, ObjectResult};

/// One child of a node: a subtree or a contents leaf.
///
/// Contents entries carry their metadata as encoded bytes, so a node stays
/// a plain value regardless of the metadata type in use; typed access goes
/// through the [`Metadata`] codec one layer up.
///
/// [`Metadata`]: crate::metadata::Metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEntry {
    /// A child node, by key.
    Node(ObjectId),
    /// A contents leaf, by key, with its encoded metadata.
    Contents { id: ObjectId, metadata: Vec<u8> },
}

impl NodeEntry {
    /// The referenced object key.
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Node(id) => *id,
            Self::Contents { id, .. } => *id,
        }
    }

    /// Returns `true` for subtree entries.
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }

    /// Returns `true` for contents entries.
    pub fn is_contents(&self) -> bool {
        matches!(self, Self::Contents { .. })
    }
}

/// An immutable mapping from step to child entry.
///
/// Entries are kept sorted by step (a `BTreeMap`), which fixes the
/// canonical serialisation and therefore the node's hash. The empty node
/// is valid; it is how an empty tree is persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    entries: BTreeMap<Step, NodeEntry>,
}

impl Node {
    /// The node with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A node over the given entries.
    pub fn new(entries: BTreeMap<Step, NodeEntry>) -> Self {
        Self { entries }
    }

    /// Look up one step.
    pub fn get(&self, step: &Step) -> Option<&NodeEntry> {
        self.entries.get(step)
    }

    /// Copy-on-write insert: this node with `step` bound to `entry`.
    pub fn with_entry(&self, step: Step, entry: NodeEntry) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(step, entry);
        Self { entries }
    }

    /// Copy-on-write removal: this node without `step`.
    pub fn without_entry(&self, step: &Step) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(step);
        Self { entries }
    }

    /// The entries in canonical (step) order.
    pub fn entries(&self) -> impl Iterator<Item = (&Step, &NodeEntry)> {
        self.entries.iter()
    }

    /// All steps present, in canonical order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.entries.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` for the empty node.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical serialisation for storage and hashing.
    pub fn to_raw(&self) -> ObjectResult<RawObject> {
        let data =
            bincode::serialize(self).map_err(|e| ObjectError::Codec(e.to_string()))?;
        Ok(RawObject::new(ObjectKind::Node, data))
    }

    /// Decode from kernel storage, checking the kind tag.
    pub fn from_raw(raw: &RawObject) -> ObjectResult<Self> {
        if raw.kind != ObjectKind::Node {
            return Err(ObjectError::KindMismatch {
                expected: ObjectKind::Node,
                actual: raw.kind,
            });
        }
        bincode::deserialize(&raw.data).map_err(|e| ObjectError::Codec(e.to_string()))
    }
}

/// Typed store for [`Node`]s over an append-only kernel store.
#[derive(Clone)]
pub struct NodeStore {
    inner: Arc<dyn AppendOnlyStore>,
}

impl NodeStore {
    /// Wrap an append-only kernel store.
    pub fn new(inner: Arc<dyn AppendOnlyStore>) -> Self {
        Self { inner }
    }

    /// Persist a node; hash-consing makes this idempotent.
    pub fn add(&self, node: &Node) -> ObjectResult<ObjectId> {
        let raw = node.to_raw()?;
        Ok(self.inner.add(&raw)?)
    }

    /// Read a node by key; absence is `None`.
    pub fn find(&self, id: &ObjectId) -> ObjectResult<Option<Node>> {
        match self.inner.find(id)? {
            None => Ok(None),
            Some(raw) => Node::from_raw(&raw).map(Some),
        }
    }

    /// Read a node that must exist.
    pub fn get(&self, id: &ObjectId) -> ObjectResult<Node> {
        self.find(id)?
            .ok_or_else(|| ObjectError::not_found(ObjectKind::Node, id))
    }

    /// Check whether a key resolves.
    pub fn contains(&self, id: &ObjectId) -> ObjectResult<bool> {
        Ok(self.inner.contains(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taiga_store::MemoryObjectStore;

    fn step(s: &str) -> Step {
        Step::new(s).unwrap()
    }

    fn oid(b: u8) -> ObjectId {
        ObjectId::from_hash([b; 32])
    }

    fn store() -> NodeStore {
        NodeStore::new(Arc::new(MemoryObjectStore::new()))
    }

    #[test]
    fn empty_node_is_valid_and_storable() {
        let store = store();
        let id = store.add(&Node::empty()).unwrap();
        let back = store.get(&id).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn add_find_roundtrip() {
        let store = store();
        let node = Node::empty()
            .with_entry(step("a"), NodeEntry::Node(oid(1)))
            .with_entry(
                step("b"),
                NodeEntry::Contents {
                    id: oid(2),
                    metadata: vec![],
                },
            );
        let id = store.add(&node).unwrap();
        assert_eq!(store.find(&id).unwrap(), Some(node));
    }

    #[test]
    fn hash_consing_is_idempotent() {
        let store = store();
        let node = Node::empty().with_entry(step("x"), NodeEntry::Node(oid(1)));
        let id1 = store.add(&node).unwrap();
        let id2 = store.add(&node).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn entry_order_does_not_affect_the_hash() {
        let a = Node::empty()
            .with_entry(step("x"), NodeEntry::Node(oid(1)))
            .with_entry(step("a"), NodeEntry::Node(oid(2)));
        let b = Node::empty()
            .with_entry(step("a"), NodeEntry::Node(oid(2)))
            .with_entry(step("x"), NodeEntry::Node(oid(1)));
        assert_eq!(
            a.to_raw().unwrap().compute_id(),
            b.to_raw().unwrap().compute_id()
        );
    }

    #[test]
    fn entries_enumerate_in_step_order() {
        let node = Node::empty()
            .with_entry(step("z"), NodeEntry::Node(oid(1)))
            .with_entry(step("a"), NodeEntry::Node(oid(2)))
            .with_entry(step("m"), NodeEntry::Node(oid(3)));
        let steps: Vec<&str> = node.steps().map(Step::as_str).collect();
        assert_eq!(steps, vec!["a", "m", "z"]);
    }

    #[test]
    fn without_entry_removes() {
        let node = Node::empty().with_entry(step("a"), NodeEntry::Node(oid(1)));
        let removed = node.without_entry(&step("a"));
        assert!(removed.is_empty());
        // Removing an absent step is a no-op.
        assert_eq!(removed.without_entry(&step("a")), removed);
    }

    #[test]
    fn get_missing_node_is_an_error() {
        let store = store();
        let err = store.get(&oid(9)).unwrap_err();
        assert!(matches!(err, ObjectError::NotFound { .. }));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let raw = RawObject::new(ObjectKind::Contents, b"not a node".to_vec());
        let err = Node::from_raw(&raw).unwrap_err();
        assert!(matches!(err, ObjectError::KindMismatch { .. }));
    }
}
