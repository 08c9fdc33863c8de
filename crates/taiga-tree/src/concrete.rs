//! Total materialisation of staging trees to pure literals and back.

use std::collections::BTreeMap;

use taiga_objects::{Contents, ContentsStore, Metadata, NodeStore};
use taiga_types::Step;

use crate::error::{TreeError, TreeResult};
use crate::tree::{load_value, materialise, StagingTree, TreeNode};

/// A fully expanded tree literal: no hashes, no store handles.
///
/// The inverse pair [`StagingTree::to_concrete`] / `of_concrete`
/// round-trips exactly, including empty subtrees.
#[derive(Clone, Debug, PartialEq)]
pub enum ConcreteTree<C, M> {
    /// A subtree with its entries in step order.
    Tree(Vec<(Step, ConcreteTree<C, M>)>),
    /// A contents leaf.
    Contents(C, M),
}

impl<C, M> ConcreteTree<C, M> {
    /// The empty tree literal.
    pub fn empty() -> Self {
        Self::Tree(Vec::new())
    }
}

impl<C: Contents, M: Metadata> StagingTree<C, M> {
    /// Fully expand this tree into a pure literal, materialising every
    /// level and reading every leaf.
    pub fn to_concrete(&mut self) -> TreeResult<ConcreteTree<C, M>> {
        let nodes = self.node_store().clone();
        let contents = self.contents_store().clone();
        expand(&nodes, &contents, &mut self.root)
    }

    /// Build a staging tree from a pure literal. No store writes happen;
    /// the literal becomes pending in-memory state.
    ///
    /// A contents-rooted literal is rejected: the root addresses the
    /// tree, never a value.
    pub fn of_concrete(
        nodes: NodeStore,
        contents: ContentsStore<C>,
        concrete: ConcreteTree<C, M>,
    ) -> TreeResult<Self> {
        match concrete {
            ConcreteTree::Contents(..) => Err(TreeError::RootContents),
            tree => Ok(Self::of_root(nodes, contents, build(tree))),
        }
    }
}

fn expand<C: Contents, M: Metadata>(
    nodes: &NodeStore,
    contents: &ContentsStore<C>,
    node: &mut TreeNode<C, M>,
) -> TreeResult<ConcreteTree<C, M>> {
    materialise(nodes, node)?;
    match node {
        TreeNode::Empty => Ok(ConcreteTree::empty()),
        TreeNode::Buffer(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (step, child) in map.iter_mut() {
                entries.push((step.clone(), expand(nodes, contents, child)?));
            }
            Ok(ConcreteTree::Tree(entries))
        }
        leaf @ (TreeNode::LazyContents { .. } | TreeNode::Contents { .. }) => {
            let (value, metadata) = load_value(contents, leaf)?
                .expect("contents position always loads a value");
            Ok(ConcreteTree::Contents(value, metadata))
        }
        TreeNode::Node(_) => unreachable!("materialise removed the hash case"),
    }
}

fn build<C: Contents, M: Metadata>(concrete: ConcreteTree<C, M>) -> TreeNode<C, M> {
    match concrete {
        ConcreteTree::Contents(value, metadata) => TreeNode::Contents { value, metadata },
        ConcreteTree::Tree(entries) => {
            let map: BTreeMap<Step, TreeNode<C, M>> = entries
                .into_iter()
                .map(|(step, child)| (step, build(child)))
                .collect();
            TreeNode::Buffer(map)
        }
    }
}
