//! The staging tree proper: lazy reads, coalescing writes, flush.

use std::collections::BTreeMap;

use tracing::debug;

use taiga_merge::{Conflict, MergeResult};
use taiga_objects::{Contents, ContentsStore, Metadata, Node, NodeEntry, NodeStore};
use taiga_types::{ObjectId, Path, Step};

use taiga_graph::NodeMerger;

use crate::error::{TreeError, TreeResult};

/// What a path resolves to, without reading the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// A subtree.
    Node,
    /// A contents leaf.
    Contents,
}

/// One position in the in-memory tree graph.
///
/// `Node` and `LazyContents` are hash-only mirrors of persisted state;
/// `Buffer` and `Contents` carry pending in-memory state. Reads promote
/// the former to the latter one level at a time.
#[derive(Clone, Debug)]
pub(crate) enum TreeNode<C, M> {
    /// Absent subtree.
    Empty,
    /// Unmaterialised subtree, by node key.
    Node(ObjectId),
    /// Materialised level holding pending children.
    Buffer(BTreeMap<Step, TreeNode<C, M>>),
    /// Persisted leaf, value not yet read.
    LazyContents { id: ObjectId, metadata: M },
    /// In-memory leaf.
    Contents { value: C, metadata: M },
}

/// An in-memory, lazily materialised partial mirror of a commit's tree.
///
/// The tree borrows nothing: it holds cheap handles to the node and
/// contents stores for lazy reads, and owns its in-memory graph. Writes
/// never touch the stores until [`StagingTree::flush`].
pub struct StagingTree<C, M> {
    nodes: NodeStore,
    contents: ContentsStore<C>,
    pub(crate) root: TreeNode<C, M>,
}

impl<C, M> std::fmt::Debug for StagingTree<C, M>
where
    TreeNode<C, M>: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingTree").field("root", &self.root).finish()
    }
}

impl<C: Clone, M: Clone> Clone for StagingTree<C, M> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            contents: self.contents.clone(),
            root: self.root.clone(),
        }
    }
}

impl<C: Contents, M: Metadata> StagingTree<C, M> {
    /// An empty staging tree.
    pub fn empty(nodes: NodeStore, contents: ContentsStore<C>) -> Self {
        Self {
            nodes,
            contents,
            root: TreeNode::Empty,
        }
    }

    /// A staging tree mirroring the persisted node `id`.
    pub fn of_hash(nodes: NodeStore, contents: ContentsStore<C>, id: ObjectId) -> Self {
        Self {
            nodes,
            contents,
            root: TreeNode::Node(id),
        }
    }

    pub(crate) fn of_root(
        nodes: NodeStore,
        contents: ContentsStore<C>,
        root: TreeNode<C, M>,
    ) -> Self {
        Self {
            nodes,
            contents,
            root,
        }
    }

    pub(crate) fn node_store(&self) -> &NodeStore {
        &self.nodes
    }

    pub(crate) fn contents_store(&self) -> &ContentsStore<C> {
        &self.contents
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Read the contents value at `path`, if any.
    ///
    /// Materialises the levels along the path. A path addressing a
    /// subtree, or nothing, is `None`.
    pub fn find(&mut self, path: &Path) -> TreeResult<Option<(C, M)>> {
        let nodes = self.nodes.clone();
        let contents = self.contents.clone();
        let Some(target) = walk(&nodes, &mut self.root, path)? else {
            return Ok(None);
        };
        load_value(&contents, target)
    }

    /// Returns `true` if `path` resolves to a contents value.
    pub fn mem(&mut self, path: &Path) -> TreeResult<bool> {
        Ok(self.find(path)?.is_some())
    }

    /// The kind of entry at `path`, without reading any value.
    pub fn kind(&mut self, path: &Path) -> TreeResult<Option<EntryKind>> {
        let nodes = self.nodes.clone();
        let Some(target) = walk(&nodes, &mut self.root, path)? else {
            return Ok(None);
        };
        Ok(match target {
            TreeNode::Empty => None,
            TreeNode::Node(_) | TreeNode::Buffer(_) => Some(EntryKind::Node),
            TreeNode::LazyContents { .. } | TreeNode::Contents { .. } => {
                Some(EntryKind::Contents)
            }
        })
    }

    /// List the entries of the node at `path`, in step order.
    ///
    /// A path resolving to contents or to nothing lists as empty.
    pub fn list(&mut self, path: &Path) -> TreeResult<Vec<(Step, EntryKind)>> {
        let nodes = self.nodes.clone();
        let Some(target) = walk(&nodes, &mut self.root, path)? else {
            return Ok(Vec::new());
        };
        materialise(&nodes, target)?;
        let TreeNode::Buffer(map) = target else {
            return Ok(Vec::new());
        };
        Ok(map
            .iter()
            .map(|(step, child)| {
                let kind = match child {
                    TreeNode::Node(_) | TreeNode::Buffer(_) | TreeNode::Empty => EntryKind::Node,
                    TreeNode::LazyContents { .. } | TreeNode::Contents { .. } => {
                        EntryKind::Contents
                    }
                };
                (step.clone(), kind)
            })
            .collect())
    }

    /// Clone the subtree at `path` as its own staging tree.
    pub fn subtree(&mut self, path: &Path) -> TreeResult<Self> {
        let nodes = self.nodes.clone();
        let root = match walk(&nodes, &mut self.root, path)? {
            Some(target) => target.clone(),
            None => TreeNode::Empty,
        };
        Ok(Self::of_root(nodes, self.contents.clone(), root))
    }

    // -----------------------------------------------------------------
    // Writes (in-memory only)
    // -----------------------------------------------------------------

    /// Bind a contents value at `path`.
    ///
    /// Intermediate levels are buffered as needed; a contents entry on
    /// the way is replaced by a fresh subtree. The empty path is
    /// rejected: the root addresses the tree, never a value.
    pub fn add(&mut self, path: &Path, value: C, metadata: Option<M>) -> TreeResult<()> {
        let Some((parent, leaf)) = path.split_last() else {
            return Err(TreeError::RootContents);
        };
        let nodes = self.nodes.clone();
        let map = buffer_for_write(&nodes, &mut self.root, &parent)?;
        map.insert(
            leaf.clone(),
            TreeNode::Contents {
                value,
                metadata: metadata.unwrap_or_else(M::default_value),
            },
        );
        Ok(())
    }

    /// Graft a whole subtree at `path`, replacing whatever was there.
    ///
    /// Grafting at the root replaces the tree; a contents-rooted graft at
    /// the root is rejected.
    pub fn graft(&mut self, path: &Path, subtree: StagingTree<C, M>) -> TreeResult<()> {
        let Some((parent, leaf)) = path.split_last() else {
            if matches!(
                subtree.root,
                TreeNode::Contents { .. } | TreeNode::LazyContents { .. }
            ) {
                return Err(TreeError::RootContents);
            }
            self.root = subtree.root;
            return Ok(());
        };
        let nodes = self.nodes.clone();
        let map = buffer_for_write(&nodes, &mut self.root, &parent)?;
        match subtree.root {
            TreeNode::Empty => {
                map.remove(leaf);
            }
            root => {
                map.insert(leaf.clone(), root);
            }
        }
        Ok(())
    }

    /// Unbind `path`. Removing a path that does not resolve is a no-op;
    /// removing the empty path clears the tree. Emptied buffers along the
    /// way are pruned.
    pub fn remove(&mut self, path: &Path) -> TreeResult<()> {
        let nodes = self.nodes.clone();
        remove_in(&nodes, &mut self.root, path)
    }

    // -----------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------

    /// Persist every pending edit, bottom-up, and return the root node
    /// key. Contents land in the contents store before the nodes that
    /// reference them. Idempotent: a second flush performs no writes.
    pub fn flush(&mut self) -> TreeResult<ObjectId> {
        let nodes = self.nodes.clone();
        let contents = self.contents.clone();
        match flush_node(&nodes, &contents, &mut self.root)? {
            Some(NodeEntry::Node(id)) => Ok(id),
            Some(NodeEntry::Contents { .. }) => Err(TreeError::RootContents),
            None => {
                let id = nodes.add(&Node::empty())?;
                self.root = TreeNode::Node(id);
                Ok(id)
            }
        }
    }

    // -----------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------

    /// Tree-level three-way merge: the per-step lift of node merge, with
    /// an empty tree treated as an absent sub-node.
    ///
    /// The three trees are flushed and merged through the node store;
    /// the result mirrors the merged root. Store failures surface as
    /// conflicts, like every failure inside the merge algebra.
    pub fn merge(
        old: Option<&mut StagingTree<C, M>>,
        ours: &mut StagingTree<C, M>,
        theirs: &mut StagingTree<C, M>,
    ) -> MergeResult<StagingTree<C, M>> {
        let flush = |t: &mut StagingTree<C, M>| -> MergeResult<ObjectId> {
            t.flush()
                .map_err(|e| Conflict::new(format!("failed to flush tree for merge: {e}")))
        };
        let old_id = match old {
            None => None,
            Some(t) => Some(flush(t)?),
        };
        let a_id = flush(ours)?;
        let b_id = flush(theirs)?;

        debug!(
            a = %a_id.short_hex(),
            b = %b_id.short_hex(),
            "tree merge"
        );

        let merger: NodeMerger<'_, C, M> = NodeMerger::new(&ours.nodes, &ours.contents);
        let merged = merger.merge_nodes(old_id.as_ref(), Some(&a_id), Some(&b_id))?;
        Ok(match merged {
            Some(id) => StagingTree::of_hash(ours.nodes.clone(), ours.contents.clone(), id),
            None => StagingTree::empty(ours.nodes.clone(), ours.contents.clone()),
        })
    }
}

// ---------------------------------------------------------------------------
// Internal walking machinery
// ---------------------------------------------------------------------------

/// Materialise a hash-only node into a buffer, one level deep.
pub(crate) fn materialise<C: Contents, M: Metadata>(
    nodes: &NodeStore,
    node: &mut TreeNode<C, M>,
) -> TreeResult<()> {
    if let TreeNode::Node(id) = node {
        let persisted = nodes.get(id)?;
        let mut map = BTreeMap::new();
        for (step, entry) in persisted.entries() {
            let child = match entry {
                NodeEntry::Node(child_id) => TreeNode::Node(*child_id),
                NodeEntry::Contents { id, metadata } => TreeNode::LazyContents {
                    id: *id,
                    metadata: M::decode(metadata)?,
                },
            };
            map.insert(step.clone(), child);
        }
        *node = TreeNode::Buffer(map);
    }
    Ok(())
}

/// Load a leaf's value, caching the decoded contents in place.
pub(crate) fn load_value<C: Contents, M: Metadata>(
    contents: &ContentsStore<C>,
    node: &mut TreeNode<C, M>,
) -> TreeResult<Option<(C, M)>> {
    match node {
        TreeNode::LazyContents { id, metadata } => {
            let value = contents.find(id)?.ok_or_else(|| {
                taiga_objects::ObjectError::not_found(taiga_store::ObjectKind::Contents, id)
            })?;
            let metadata = metadata.clone();
            *node = TreeNode::Contents {
                value: value.clone(),
                metadata: metadata.clone(),
            };
            Ok(Some((value, metadata)))
        }
        TreeNode::Contents { value, metadata } => Ok(Some((value.clone(), metadata.clone()))),
        _ => Ok(None),
    }
}

/// Walk to the node at `path`, materialising levels on the way.
///
/// `None` when the path does not resolve (missing step, or contents in
/// the middle of the path).
pub(crate) fn walk<'t, C: Contents, M: Metadata>(
    nodes: &NodeStore,
    root: &'t mut TreeNode<C, M>,
    path: &Path,
) -> TreeResult<Option<&'t mut TreeNode<C, M>>> {
    let mut current = root;
    for step in path.steps() {
        materialise(nodes, current)?;
        match current {
            TreeNode::Buffer(map) => match map.get_mut(step) {
                Some(child) => current = child,
                None => return Ok(None),
            },
            _ => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Walk to the buffer at `path` for writing, creating levels as needed.
fn buffer_for_write<'t, C: Contents, M: Metadata>(
    nodes: &NodeStore,
    root: &'t mut TreeNode<C, M>,
    path: &Path,
) -> TreeResult<&'t mut BTreeMap<Step, TreeNode<C, M>>> {
    let mut current = root;
    for step in path.steps() {
        let map = ensure_buffer(nodes, current)?;
        current = map.entry(step.clone()).or_insert(TreeNode::Empty);
    }
    ensure_buffer(nodes, current)
}

/// Turn any position into a writable buffer.
///
/// Hash-only nodes materialise; contents and absence become a fresh
/// empty level (a write through contents replaces it with a subtree).
fn ensure_buffer<'t, C: Contents, M: Metadata>(
    nodes: &NodeStore,
    node: &'t mut TreeNode<C, M>,
) -> TreeResult<&'t mut BTreeMap<Step, TreeNode<C, M>>> {
    materialise(nodes, node)?;
    if !matches!(node, TreeNode::Buffer(_)) {
        *node = TreeNode::Buffer(BTreeMap::new());
    }
    match node {
        TreeNode::Buffer(map) => Ok(map),
        _ => unreachable!("just installed a buffer"),
    }
}

fn remove_in<C: Contents, M: Metadata>(
    nodes: &NodeStore,
    node: &mut TreeNode<C, M>,
    path: &Path,
) -> TreeResult<()> {
    let Some((step, rest)) = path.split_first() else {
        *node = TreeNode::Empty;
        return Ok(());
    };
    materialise(nodes, node)?;
    let TreeNode::Buffer(map) = node else {
        // Contents or absence on the way: nothing to remove.
        return Ok(());
    };
    if rest.is_root() {
        map.remove(step);
    } else if let Some(child) = map.get_mut(step) {
        remove_in(nodes, child, &rest)?;
        let prune = match child {
            TreeNode::Empty => true,
            TreeNode::Buffer(inner) => inner.is_empty(),
            _ => false,
        };
        if prune {
            map.remove(step);
        }
    }
    Ok(())
}

fn flush_node<C: Contents, M: Metadata>(
    nodes: &NodeStore,
    contents: &ContentsStore<C>,
    node: &mut TreeNode<C, M>,
) -> TreeResult<Option<NodeEntry>> {
    match node {
        TreeNode::Empty => Ok(None),
        TreeNode::Node(id) => Ok(Some(NodeEntry::Node(*id))),
        TreeNode::LazyContents { id, metadata } => Ok(Some(NodeEntry::Contents {
            id: *id,
            metadata: metadata.encode(),
        })),
        TreeNode::Contents { value, metadata } => {
            let id = contents.add(value)?;
            let entry = NodeEntry::Contents {
                id,
                metadata: metadata.encode(),
            };
            *node = TreeNode::LazyContents {
                id,
                metadata: metadata.clone(),
            };
            Ok(Some(entry))
        }
        TreeNode::Buffer(map) => {
            let mut entries = BTreeMap::new();
            let mut dead: Vec<Step> = Vec::new();
            for (step, child) in map.iter_mut() {
                match flush_node(nodes, contents, child)? {
                    Some(entry) => {
                        entries.insert(step.clone(), entry);
                    }
                    None => dead.push(step.clone()),
                }
            }
            for step in dead {
                map.remove(&step);
            }
            if entries.is_empty() {
                *node = TreeNode::Empty;
                return Ok(None);
            }
            let id = nodes.add(&Node::new(entries))?;
            *node = TreeNode::Node(id);
            Ok(Some(NodeEntry::Node(id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taiga_objects::{Text, UnitMetadata};
    use taiga_store::{MemoryObjectStore, ReadOnlyStore};

    type Tree = StagingTree<Text, UnitMetadata>;

    struct Fixture {
        backing: Arc<MemoryObjectStore>,
        nodes: NodeStore,
        contents: ContentsStore<Text>,
    }

    impl Fixture {
        fn new() -> Self {
            let backing = Arc::new(MemoryObjectStore::new());
            Self {
                nodes: NodeStore::new(backing.clone()),
                contents: ContentsStore::new(backing.clone()),
                backing,
            }
        }

        fn tree(&self) -> Tree {
            StagingTree::empty(self.nodes.clone(), self.contents.clone())
        }
    }

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn text(s: &str) -> Text {
        Text::new(s)
    }

    // -----------------------------------------------------------------
    // Writes and reads
    // -----------------------------------------------------------------

    #[test]
    fn add_then_find() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a/b"), text("hi"), None).unwrap();

        let (value, _) = tree.find(&path("/a/b")).unwrap().unwrap();
        assert_eq!(value, text("hi"));
        assert!(tree.mem(&path("/a/b")).unwrap());
        assert!(!tree.mem(&path("/a")).unwrap());
    }

    #[test]
    fn writes_do_not_touch_the_store() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a"), text("x"), None).unwrap();
        tree.add(&path("/b/c"), text("y"), None).unwrap();
        assert!(fx.backing.is_empty());
    }

    #[test]
    fn add_at_root_is_rejected() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        let err = tree.add(&Path::root(), text("x"), None).unwrap_err();
        assert!(matches!(err, TreeError::RootContents));
    }

    #[test]
    fn kind_distinguishes_nodes_and_contents() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/dir/leaf"), text("v"), None).unwrap();

        assert_eq!(tree.kind(&path("/dir")).unwrap(), Some(EntryKind::Node));
        assert_eq!(
            tree.kind(&path("/dir/leaf")).unwrap(),
            Some(EntryKind::Contents)
        );
        assert_eq!(tree.kind(&path("/missing")).unwrap(), None);
    }

    #[test]
    fn list_root() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/z"), text("1"), None).unwrap();
        tree.add(&path("/a/b"), text("2"), None).unwrap();

        let listed = tree.list(&Path::root()).unwrap();
        let rendered: Vec<(String, EntryKind)> = listed
            .into_iter()
            .map(|(s, k)| (s.as_str().to_string(), k))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("a".to_string(), EntryKind::Node),
                ("z".to_string(), EntryKind::Contents),
            ]
        );
    }

    #[test]
    fn write_through_contents_replaces_it_with_a_subtree() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a"), text("leaf"), None).unwrap();
        tree.add(&path("/a/b"), text("deeper"), None).unwrap();

        assert_eq!(tree.find(&path("/a")).unwrap(), None);
        let (value, _) = tree.find(&path("/a/b")).unwrap().unwrap();
        assert_eq!(value, text("deeper"));
    }

    // -----------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------

    #[test]
    fn remove_unbinds_and_prunes() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a/b"), text("v"), None).unwrap();
        tree.remove(&path("/a/b")).unwrap();

        assert!(!tree.mem(&path("/a/b")).unwrap());
        assert_eq!(tree.kind(&path("/a")).unwrap(), None);
    }

    #[test]
    fn remove_missing_is_a_noop() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a"), text("v"), None).unwrap();
        tree.remove(&path("/nope")).unwrap();
        tree.remove(&path("/a/deep/er")).unwrap();
        assert!(tree.mem(&path("/a")).unwrap());
    }

    #[test]
    fn remove_root_clears() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a"), text("v"), None).unwrap();
        tree.remove(&Path::root()).unwrap();
        assert!(!tree.mem(&path("/a")).unwrap());
    }

    // -----------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------

    #[test]
    fn flush_persists_and_reads_back() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a/b"), text("hi"), None).unwrap();
        let root = tree.flush().unwrap();

        let mut reopened: Tree = StagingTree::of_hash(fx.nodes.clone(), fx.contents.clone(), root);
        let (value, _) = reopened.find(&path("/a/b")).unwrap().unwrap();
        assert_eq!(value, text("hi"));
    }

    #[test]
    fn flush_is_idempotent() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a"), text("1"), None).unwrap();
        tree.add(&path("/b/c"), text("2"), None).unwrap();

        let first = tree.flush().unwrap();
        let objects_after_first = fx.backing.len();
        let second = tree.flush().unwrap();

        assert_eq!(first, second);
        assert_eq!(fx.backing.len(), objects_after_first);
    }

    #[test]
    fn successive_writes_coalesce() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/k"), text("first"), None).unwrap();
        tree.add(&path("/k"), text("second"), None).unwrap();
        tree.add(&path("/k"), text("final"), None).unwrap();
        let root = tree.flush().unwrap();

        // Only the final value was ever written to the contents store.
        let mut reopened: Tree = StagingTree::of_hash(fx.nodes.clone(), fx.contents.clone(), root);
        let (value, _) = reopened.find(&path("/k")).unwrap().unwrap();
        assert_eq!(value, text("final"));
        assert!(!fx
            .backing
            .contains(&taiga_store::RawObject::new(
                taiga_store::ObjectKind::Contents,
                text("first").encode()
            )
            .compute_id())
            .unwrap());
    }

    #[test]
    fn empty_tree_flushes_to_the_empty_node() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        let root = tree.flush().unwrap();
        assert_eq!(root, fx.nodes.add(&Node::empty()).unwrap());
    }

    #[test]
    fn lazy_reads_fetch_one_level() {
        let fx = Fixture::new();
        let mut tree = fx.tree();
        tree.add(&path("/a/b"), text("deep"), None).unwrap();
        tree.add(&path("/top"), text("shallow"), None).unwrap();
        let root = tree.flush().unwrap();

        let mut reopened: Tree = StagingTree::of_hash(fx.nodes.clone(), fx.contents.clone(), root);
        // Reading /top materialises the root level but not /a's level.
        let (value, _) = reopened.find(&path("/top")).unwrap().unwrap();
        assert_eq!(value, text("shallow"));
        let TreeNode::Buffer(map) = &reopened.root else {
            panic!("root should be materialised");
        };
        assert!(matches!(
            map.get(&Step::new("a").unwrap()),
            Some(TreeNode::Node(_))
        ));
    }

    // -----------------------------------------------------------------
    // Graft
    // -----------------------------------------------------------------

    #[test]
    fn graft_inserts_a_subtree() {
        let fx = Fixture::new();
        let mut sub = fx.tree();
        sub.add(&path("/x"), text("1"), None).unwrap();

        let mut tree = fx.tree();
        tree.graft(&path("/sub"), sub).unwrap();
        let (value, _) = tree.find(&path("/sub/x")).unwrap().unwrap();
        assert_eq!(value, text("1"));
    }

    #[test]
    fn graft_contents_at_root_is_rejected() {
        let fx = Fixture::new();
        let mut leaf = fx.tree();
        leaf.root = TreeNode::Contents {
            value: text("v"),
            metadata: UnitMetadata,
        };
        let mut tree = fx.tree();
        let err = tree.graft(&Path::root(), leaf).unwrap_err();
        assert!(matches!(err, TreeError::RootContents));
    }

    // -----------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------

    #[test]
    fn tree_merge_unions_disjoint_changes() {
        let fx = Fixture::new();
        let mut old = fx.tree();
        let mut ours = fx.tree();
        ours.add(&path("/x"), text("1"), None).unwrap();
        let mut theirs = fx.tree();
        theirs.add(&path("/y"), text("2"), None).unwrap();

        let mut merged = StagingTree::merge(Some(&mut old), &mut ours, &mut theirs).unwrap();
        assert_eq!(merged.find(&path("/x")).unwrap().unwrap().0, text("1"));
        assert_eq!(merged.find(&path("/y")).unwrap().unwrap().0, text("2"));
    }

    #[test]
    fn tree_merge_conflict_carries_the_path() {
        let fx = Fixture::new();
        let mut old = fx.tree();
        old.add(&path("/k"), text("base"), None).unwrap();
        let mut ours = fx.tree();
        ours.add(&path("/k"), text("left"), None).unwrap();
        let mut theirs = fx.tree();
        theirs.add(&path("/k"), text("right"), None).unwrap();

        let err = StagingTree::merge(Some(&mut old), &mut ours, &mut theirs).unwrap_err();
        assert!(err.reason.contains("/k"));
    }
}
