//! Navigation and copy-on-write editing of the node DAG.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use taiga_objects::{Node, NodeEntry, NodeStore};
use taiga_types::{ObjectId, Path, Step};

use crate::error::{GraphError, GraphResult};

/// Repository-scoped handle over the node store.
///
/// All editing is copy-on-write: an update re-hashes every node along the
/// path from the root, leaving previous versions untouched (they remain
/// reachable from older commits).
#[derive(Clone)]
pub struct NodeGraph {
    nodes: NodeStore,
}

impl NodeGraph {
    /// Wrap a node store.
    pub fn new(nodes: NodeStore) -> Self {
        Self { nodes }
    }

    /// The underlying node store.
    pub fn store(&self) -> &NodeStore {
        &self.nodes
    }

    /// Persist the empty node and return its key.
    pub fn empty(&self) -> GraphResult<ObjectId> {
        Ok(self.nodes.add(&Node::empty())?)
    }

    /// Hash-cons a node from entries.
    pub fn v(&self, entries: BTreeMap<Step, NodeEntry>) -> GraphResult<ObjectId> {
        Ok(self.nodes.add(&Node::new(entries))?)
    }

    /// Read one node's entries, in canonical step order.
    pub fn list(&self, id: &ObjectId) -> GraphResult<Vec<(Step, NodeEntry)>> {
        let node = self.nodes.get(id)?;
        Ok(node
            .entries()
            .map(|(s, e)| (s.clone(), e.clone()))
            .collect())
    }

    /// Walk a path from `id`.
    ///
    /// The empty path yields the node itself. A walk that runs into a
    /// contents entry while steps remain yields `None`, as does a missing
    /// step.
    pub fn find(&self, id: &ObjectId, path: &Path) -> GraphResult<Option<NodeEntry>> {
        let Some((step, rest)) = path.split_first() else {
            return Ok(Some(NodeEntry::Node(*id)));
        };
        let node = self.nodes.get(id)?;
        match node.get(step) {
            None => Ok(None),
            Some(entry) if rest.is_root() => Ok(Some(entry.clone())),
            Some(NodeEntry::Node(child)) => self.find(child, &rest),
            Some(NodeEntry::Contents { .. }) => Ok(None),
        }
    }

    /// Bind `entry` at `path` below `id`, returning the new root key.
    ///
    /// Intermediate nodes are created as needed; a contents entry on the
    /// way is overwritten by a fresh subtree. Binding a contents entry at
    /// the empty path is rejected; binding a node entry there replaces
    /// the root wholesale.
    pub fn update(&self, id: &ObjectId, path: &Path, entry: NodeEntry) -> GraphResult<ObjectId> {
        let Some((step, rest)) = path.split_first() else {
            return match entry {
                NodeEntry::Node(root) => Ok(root),
                NodeEntry::Contents { .. } => Err(GraphError::RootContents),
            };
        };
        let node = self.nodes.get(id)?;
        let new_entry = if rest.is_root() {
            entry
        } else {
            // Descend into an existing subtree, or grow a fresh one.
            let child = match node.get(step) {
                Some(NodeEntry::Node(child)) => *child,
                _ => self.empty()?,
            };
            NodeEntry::Node(self.update(&child, &rest, entry)?)
        };
        Ok(self.nodes.add(&node.with_entry(step.clone(), new_entry))?)
    }

    /// Unbind `path` below `id`, returning the new root key.
    ///
    /// Removing a path that does not resolve is a no-op returning `id`
    /// unchanged. Subtrees left empty by the removal are pruned. Removing
    /// the empty path clears the tree.
    pub fn remove(&self, id: &ObjectId, path: &Path) -> GraphResult<ObjectId> {
        let Some((step, rest)) = path.split_first() else {
            return self.empty();
        };
        let node = self.nodes.get(id)?;
        let updated = if rest.is_root() {
            match node.get(step) {
                None => return Ok(*id),
                Some(_) => node.without_entry(step),
            }
        } else {
            match node.get(step) {
                Some(NodeEntry::Node(child)) => {
                    let new_child = self.remove(child, &rest)?;
                    if new_child == *child {
                        return Ok(*id);
                    }
                    if self.nodes.get(&new_child)?.is_empty() {
                        node.without_entry(step)
                    } else {
                        node.with_entry(step.clone(), NodeEntry::Node(new_child))
                    }
                }
                // The path dead-ends in contents or nothing: no-op.
                _ => return Ok(*id),
            }
        };
        Ok(self.nodes.add(&updated)?)
    }

    /// Nodes reachable from `max`, pruned below `min`.
    ///
    /// Both frontiers are included in the result when reached; traversal
    /// does not continue past a node in `min`. Contents entries are not
    /// part of the node closure. The result is sorted by key.
    pub fn closure(&self, min: &[ObjectId], max: &[ObjectId]) -> GraphResult<Vec<ObjectId>> {
        let stop: HashSet<ObjectId> = min.iter().copied().collect();
        let mut seen: BTreeSet<ObjectId> = BTreeSet::new();
        let mut queue: VecDeque<ObjectId> = VecDeque::new();

        for root in max {
            if self.nodes.contains(root)? && seen.insert(*root) {
                queue.push_back(*root);
            }
        }

        while let Some(current) = queue.pop_front() {
            if stop.contains(&current) {
                continue;
            }
            let node = self.nodes.get(&current)?;
            for (_, entry) in node.entries() {
                if let NodeEntry::Node(child) = entry {
                    if seen.insert(*child) {
                        queue.push_back(*child);
                    }
                }
            }
        }

        Ok(seen.into_iter().collect())
    }
}
