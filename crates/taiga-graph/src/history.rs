//! Commit history: LCA search, three-way merges and bounded traversal.
//!
//! The engine keeps no graph structure of its own; it walks `parents`
//! edges on demand. The commit store is append-only, so every traversal
//! sees a consistent snapshot of the DAG.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::marker::PhantomData;

use tracing::debug;

use taiga_merge::{Conflict, MergeResult};
use taiga_objects::{
    Commit, CommitStore, Contents, ContentsStore, Metadata, Node, NodeStore, ObjectResult,
};
use taiga_types::{ObjectId, Task};

use crate::node_merge::NodeMerger;

/// Result of a lowest-common-ancestor search.
///
/// The bounds are reported as values, not errors: hitting them is an
/// answer about the shape of the history, not a failure of the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LcaOutcome {
    /// The set of lowest common ancestors, sorted by key. Empty for
    /// disjoint histories.
    Found(Vec<ObjectId>),
    /// The search frontier was still live when the depth cap was hit.
    MaxDepthReached,
    /// More lowest common ancestors than the configured bound.
    TooManyLcas,
}

const SIDE_A: u8 = 0b01;
const SIDE_B: u8 = 0b10;
const BOTH: u8 = SIDE_A | SIDE_B;

/// History engine over the typed stores.
pub struct History<C, M> {
    commits: CommitStore,
    nodes: NodeStore,
    contents: ContentsStore<C>,
    _metadata: PhantomData<fn() -> M>,
}

impl<C: Contents, M: Metadata> History<C, M> {
    /// An engine over the given stores.
    pub fn new(commits: CommitStore, nodes: NodeStore, contents: ContentsStore<C>) -> Self {
        Self {
            commits,
            nodes,
            contents,
            _metadata: PhantomData,
        }
    }

    /// The underlying commit store.
    pub fn commits(&self) -> &CommitStore {
        &self.commits
    }

    // -----------------------------------------------------------------
    // Lowest common ancestors
    // -----------------------------------------------------------------

    /// Compute the set of lowest common ancestors of two commits.
    ///
    /// Breadth-first from both sides simultaneously. A commit seen from
    /// both sides is a candidate, and the search never expands past a
    /// candidate: anything above it is a common ancestor but cannot be
    /// lowest. A final pairwise ancestry filter removes candidates that
    /// reach each other through one-sided paths.
    ///
    /// `max_depth = None` means unbounded depth, `max_count = None` means
    /// unbounded result size.
    pub fn lcas(
        &self,
        a: &ObjectId,
        b: &ObjectId,
        max_depth: Option<u64>,
        max_count: Option<usize>,
    ) -> ObjectResult<LcaOutcome> {
        if a == b {
            return Ok(LcaOutcome::Found(vec![*a]));
        }

        let mut marks: HashMap<ObjectId, u8> = HashMap::new();
        marks.insert(*a, SIDE_A);
        marks.insert(*b, SIDE_B);

        let mut candidates: BTreeSet<ObjectId> = BTreeSet::new();
        let mut layer: Vec<(ObjectId, u8)> = vec![(*a, SIDE_A), (*b, SIDE_B)];
        let mut depth: u64 = 0;

        while !layer.is_empty() {
            if let Some(cap) = max_depth {
                if depth >= cap {
                    debug!(depth, "lca search hit the depth cap with a live frontier");
                    return Ok(LcaOutcome::MaxDepthReached);
                }
            }

            let mut next: Vec<(ObjectId, u8)> = Vec::new();
            for (id, side) in layer {
                // Everything above a candidate is common but not lowest.
                if candidates.contains(&id) {
                    continue;
                }
                for parent in self.parents_of(&id)? {
                    let mark = marks.entry(parent).or_insert(0);
                    if *mark & side != 0 {
                        continue;
                    }
                    *mark |= side;
                    if *mark == BOTH {
                        candidates.insert(parent);
                    } else {
                        next.push((parent, side));
                    }
                }
            }
            depth += 1;
            layer = next;
        }

        // Drop candidates that are strict ancestors of other candidates.
        let all: Vec<ObjectId> = candidates.iter().copied().collect();
        let mut lowest: Vec<ObjectId> = Vec::new();
        'candidates: for c in &all {
            for other in &all {
                if c != other && self.is_ancestor(c, other)? {
                    continue 'candidates;
                }
            }
            lowest.push(*c);
        }

        if let Some(cap) = max_count {
            if lowest.len() > cap {
                return Ok(LcaOutcome::TooManyLcas);
            }
        }
        Ok(LcaOutcome::Found(lowest))
    }

    /// Returns `true` if `ancestor` lies on a parent path from
    /// `descendant` (inclusive: every commit is its own ancestor).
    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> ObjectResult<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut queue: VecDeque<ObjectId> = VecDeque::new();
        seen.insert(*descendant);
        queue.push_back(*descendant);
        while let Some(current) = queue.pop_front() {
            for parent in self.parents_of(&current)? {
                if parent == *ancestor {
                    return Ok(true);
                }
                if seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(false)
    }

    // -----------------------------------------------------------------
    // Three-way merge
    // -----------------------------------------------------------------

    /// Merge two commits, emitting a commit with parents `[a, b]`.
    ///
    /// The LCA set is reduced to a single virtual ancestor by pairwise
    /// recursive merging; the branch trees are then node-merged against
    /// that ancestor's tree. The supplied task is attached verbatim. Any
    /// recursive conflict, and either LCA bound, surfaces as a conflict.
    pub fn three_way_merge(
        &self,
        a: &ObjectId,
        b: &ObjectId,
        task: &Task,
        max_depth: Option<u64>,
        max_count: Option<usize>,
    ) -> MergeResult<ObjectId> {
        if a == b {
            return Ok(*a);
        }

        let lca_set = match self
            .lcas(a, b, max_depth, max_count)
            .map_err(|e| Conflict::new(format!("lca search failed: {e}")))?
        {
            LcaOutcome::Found(set) => set,
            LcaOutcome::MaxDepthReached => {
                return Err(Conflict::new("merge aborted: lca search hit the depth bound"))
            }
            LcaOutcome::TooManyLcas => {
                return Err(Conflict::new("merge aborted: too many lowest common ancestors"))
            }
        };

        let ancestor = self.reduce_lcas(lca_set, task, max_depth, max_count)?;
        let old_node = match ancestor {
            None => None,
            Some(id) => Some(self.commit_for_merge(&id)?.node),
        };
        let node_a = self.commit_for_merge(a)?.node;
        let node_b = self.commit_for_merge(b)?.node;

        debug!(
            a = %a.short_hex(),
            b = %b.short_hex(),
            ancestor = ?ancestor.map(|id| id.short_hex()),
            "three-way merge"
        );

        let merger: NodeMerger<'_, C, M> = NodeMerger::new(&self.nodes, &self.contents);
        let merged = merger.merge_nodes(old_node.as_ref(), Some(&node_a), Some(&node_b))?;
        let node_id = match merged {
            Some(id) => id,
            None => self
                .nodes
                .add(&Node::empty())
                .map_err(|e| Conflict::new(format!("failed to store empty node: {e}")))?,
        };

        let commit = Commit::new(node_id, vec![*a, *b], task.clone());
        self.commits
            .add(&commit)
            .map_err(|e| Conflict::new(format!("failed to store merge commit: {e}")))
    }

    /// Reduce an LCA set to one virtual ancestor by pairwise merging.
    fn reduce_lcas(
        &self,
        set: Vec<ObjectId>,
        task: &Task,
        max_depth: Option<u64>,
        max_count: Option<usize>,
    ) -> MergeResult<Option<ObjectId>> {
        let mut iter = set.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut acc = first;
        for next in iter {
            acc = self.three_way_merge(&acc, &next, task, max_depth, max_count)?;
        }
        Ok(Some(acc))
    }

    // -----------------------------------------------------------------
    // Bounded traversal
    // -----------------------------------------------------------------

    /// The commit DAG reachable from `max`, truncated at `depth` levels
    /// and at any commit in `min`. Both frontiers are included when
    /// reached. Sorted by key.
    pub fn history(
        &self,
        depth: Option<u64>,
        min: &[ObjectId],
        max: &[ObjectId],
    ) -> ObjectResult<Vec<ObjectId>> {
        let stop: HashSet<ObjectId> = min.iter().copied().collect();
        let mut seen: BTreeSet<ObjectId> = BTreeSet::new();
        let mut layer: Vec<ObjectId> = Vec::new();

        for head in max {
            if self.commits.contains(head)? && seen.insert(*head) {
                layer.push(*head);
            }
        }

        let mut level: u64 = 0;
        while !layer.is_empty() {
            if let Some(cap) = depth {
                if level >= cap {
                    break;
                }
            }
            let mut next: Vec<ObjectId> = Vec::new();
            for id in layer {
                if stop.contains(&id) {
                    continue;
                }
                for parent in self.parents_of(&id)? {
                    if seen.insert(parent) {
                        next.push(parent);
                    }
                }
            }
            level += 1;
            layer = next;
        }

        Ok(seen.into_iter().collect())
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Parents of a commit; a commit truncated away by a bounded export
    /// reads as a root.
    fn parents_of(&self, id: &ObjectId) -> ObjectResult<Vec<ObjectId>> {
        match self.commits.find(id)? {
            Some(commit) => Ok(commit.parents),
            None => {
                debug!(commit = %id.short_hex(), "commit absent, treating as root");
                Ok(Vec::new())
            }
        }
    }

    fn commit_for_merge(&self, id: &ObjectId) -> MergeResult<Commit> {
        match self.commits.find(id) {
            Ok(Some(commit)) => Ok(commit),
            Ok(None) => Err(Conflict::new(format!(
                "commit {} not present in store",
                id.short_hex()
            ))),
            Err(e) => Err(Conflict::new(format!(
                "failed to read commit {}: {e}",
                id.short_hex()
            ))),
        }
    }
}
