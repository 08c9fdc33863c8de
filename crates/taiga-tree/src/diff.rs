//! Pairwise tree diff with hash short-circuiting.

use taiga_objects::{Contents, ContentsStore, Metadata, NodeStore};
use taiga_types::{Path, Step};

use crate::error::TreeResult;
use crate::tree::{load_value, materialise, StagingTree, TreeNode};

/// One observed change between two trees.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeDiff<C, M> {
    /// The path is bound in the new tree only.
    Added(C, M),
    /// The path was bound in the old tree only.
    Removed(C, M),
    /// The binding changed.
    Updated((C, M), (C, M)),
}

impl<C: Contents, M: Metadata> StagingTree<C, M> {
    /// Compare this tree (the "old" side) against `other` (the "new"
    /// side), yielding changes in path order.
    ///
    /// Identical sub-hashes short-circuit: structural equality by hash
    /// implies value equality, so unchanged persisted subtrees cost one
    /// comparison regardless of size.
    pub fn diff(
        &mut self,
        other: &mut StagingTree<C, M>,
    ) -> TreeResult<Vec<(Path, TreeDiff<C, M>)>> {
        let old_nodes = self.node_store().clone();
        let old_contents = self.contents_store().clone();
        let new_nodes = other.node_store().clone();
        let new_contents = other.contents_store().clone();
        let mut out = Vec::new();
        diff_at(
            &Walker {
                nodes: old_nodes,
                contents: old_contents,
            },
            &Walker {
                nodes: new_nodes,
                contents: new_contents,
            },
            &Path::root(),
            &mut self.root,
            &mut other.root,
            &mut out,
        )?;
        Ok(out)
    }
}

struct Walker<C> {
    nodes: NodeStore,
    contents: ContentsStore<C>,
}

/// Rough shape of a position, decided without any store reads.
enum Shape {
    Absent,
    Value,
    Branch,
}

fn shape<C, M>(node: &TreeNode<C, M>) -> Shape {
    match node {
        TreeNode::Empty => Shape::Absent,
        TreeNode::Node(_) | TreeNode::Buffer(_) => Shape::Branch,
        TreeNode::LazyContents { .. } | TreeNode::Contents { .. } => Shape::Value,
    }
}

fn diff_at<C: Contents, M: Metadata>(
    old_side: &Walker<C>,
    new_side: &Walker<C>,
    path: &Path,
    old: &mut TreeNode<C, M>,
    new: &mut TreeNode<C, M>,
    out: &mut Vec<(Path, TreeDiff<C, M>)>,
) -> TreeResult<()> {
    // Hash short-circuits: equal keys are equal subtrees or equal leaves.
    match (&*old, &*new) {
        (TreeNode::Node(a), TreeNode::Node(b)) if a == b => return Ok(()),
        (
            TreeNode::LazyContents { id: a, metadata: ma },
            TreeNode::LazyContents { id: b, metadata: mb },
        ) if a == b && ma == mb => return Ok(()),
        _ => {}
    }

    match (shape(old), shape(new)) {
        (Shape::Absent, Shape::Absent) => Ok(()),

        (Shape::Value, Shape::Value) => {
            let (va, ma) = load_value(&old_side.contents, old)?.expect("value position");
            let (vb, mb) = load_value(&new_side.contents, new)?.expect("value position");
            if va != vb || ma != mb {
                out.push((path.clone(), TreeDiff::Updated((va, ma), (vb, mb))));
            }
            Ok(())
        }

        (Shape::Value, Shape::Absent) => {
            let (value, metadata) =
                load_value(&old_side.contents, old)?.expect("value position");
            out.push((path.clone(), TreeDiff::Removed(value, metadata)));
            Ok(())
        }

        (Shape::Absent, Shape::Value) => {
            let (value, metadata) =
                load_value(&new_side.contents, new)?.expect("value position");
            out.push((path.clone(), TreeDiff::Added(value, metadata)));
            Ok(())
        }

        (Shape::Branch, Shape::Branch) => {
            materialise(&old_side.nodes, old)?;
            materialise(&new_side.nodes, new)?;
            let (TreeNode::Buffer(old_map), TreeNode::Buffer(new_map)) = (old, new) else {
                unreachable!("materialise left a buffer");
            };
            let steps: Vec<Step> = old_map
                .keys()
                .chain(new_map.keys())
                .cloned()
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();
            for step in steps {
                let child_path = path.child(step.clone());
                let mut absent_old = TreeNode::Empty;
                let mut absent_new = TreeNode::Empty;
                let old_child = old_map.get_mut(&step).unwrap_or(&mut absent_old);
                let new_child = new_map.get_mut(&step).unwrap_or(&mut absent_new);
                diff_at(old_side, new_side, &child_path, old_child, new_child, out)?;
            }
            Ok(())
        }

        // Kind changed: the old side disappears, the new side appears.
        (Shape::Value, Shape::Branch) => {
            let (value, metadata) =
                load_value(&old_side.contents, old)?.expect("value position");
            out.push((path.clone(), TreeDiff::Removed(value, metadata)));
            let mut absent = TreeNode::Empty;
            diff_at(old_side, new_side, path, &mut absent, new, out)
        }
        (Shape::Branch, Shape::Value) => {
            let mut absent = TreeNode::Empty;
            diff_at(old_side, new_side, path, old, &mut absent, out)?;
            let (value, metadata) =
                load_value(&new_side.contents, new)?.expect("value position");
            out.push((path.clone(), TreeDiff::Added(value, metadata)));
            Ok(())
        }

        (Shape::Branch, Shape::Absent) => {
            materialise(&old_side.nodes, old)?;
            let TreeNode::Buffer(map) = old else {
                unreachable!("materialise left a buffer");
            };
            for (step, child) in map.iter_mut() {
                let child_path = path.child(step.clone());
                let mut absent = TreeNode::Empty;
                diff_at(old_side, new_side, &child_path, child, &mut absent, out)?;
            }
            Ok(())
        }
        (Shape::Absent, Shape::Branch) => {
            materialise(&new_side.nodes, new)?;
            let TreeNode::Buffer(map) = new else {
                unreachable!("materialise left a buffer");
            };
            for (step, child) in map.iter_mut() {
                let child_path = path.child(step.clone());
                let mut absent = TreeNode::Empty;
                diff_at(old_side, new_side, &child_path, &mut absent, child, out)?;
            }
            Ok(())
        }
    }
}
