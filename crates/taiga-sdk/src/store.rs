use tracing::debug;

use taiga_graph::LcaOutcome;
use taiga_objects::{Commit, Contents, Metadata};
use taiga_store::{ReadOnlyStore, ReadWriteStore};
use taiga_tree::{EntryKind, StagingTree, TreeResult};
use taiga_types::{Branch, ObjectId, Path, Step, Task};
use taiga_watch::{Diff, WatchHandle};

use crate::error::{SdkError, SdkResult};
use crate::repository::Repository;

/// Where a store handle currently points.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Position {
    /// Follow a branch head.
    Branch(Branch),
    /// Pinned to a commit (`None` = fresh, no history at all).
    Detached(Option<ObjectId>),
}

/// Presentable position of a handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Following this branch.
    Branch(Branch),
    /// Detached at this commit.
    Commit(ObjectId),
    /// Fresh handle with no history.
    Empty,
}

/// A cheap view over a repository plus a current position.
///
/// Branch handles read through the branch head and may commit; detached
/// handles are read-only with respect to branch state.
pub struct Store<C, M> {
    repo: Repository<C, M>,
    position: Position,
}

impl<C: Contents, M: Metadata> Store<C, M> {
    // -----------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------

    /// A fresh handle with no history and an empty tree.
    pub fn empty(repo: &Repository<C, M>) -> Self {
        Self {
            repo: repo.clone(),
            position: Position::Detached(None),
        }
    }

    /// A handle following the default branch.
    pub fn master(repo: &Repository<C, M>) -> Self {
        Self::of_branch(repo, Branch::master())
    }

    /// A handle following `branch`.
    pub fn of_branch(repo: &Repository<C, M>, branch: Branch) -> Self {
        Self {
            repo: repo.clone(),
            position: Position::Branch(branch),
        }
    }

    /// A handle pinned to `commit`.
    pub fn of_commit(repo: &Repository<C, M>, commit: ObjectId) -> Self {
        Self {
            repo: repo.clone(),
            position: Position::Detached(Some(commit)),
        }
    }

    /// The repository this handle views.
    pub fn repo(&self) -> &Repository<C, M> {
        &self.repo
    }

    /// The handle's position.
    pub fn status(&self) -> Status {
        match &self.position {
            Position::Branch(branch) => Status::Branch(branch.clone()),
            Position::Detached(Some(commit)) => Status::Commit(*commit),
            Position::Detached(None) => Status::Empty,
        }
    }

    /// The commit this handle currently sees, if any.
    pub fn head(&self) -> SdkResult<Option<ObjectId>> {
        match &self.position {
            Position::Branch(branch) => Ok(self.repo.branch_store().find(branch)?),
            Position::Detached(commit) => Ok(*commit),
        }
    }

    /// The head as an error-on-absence lookup.
    pub fn get_head(&self) -> SdkResult<ObjectId> {
        self.head()?.ok_or_else(|| {
            SdkError::InvalidArgument(format!("{:?} has no head", self.status()))
        })
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// The current tree as a staging tree.
    pub fn tree(&self) -> SdkResult<StagingTree<C, M>> {
        let head = self.head()?;
        self.tree_at(head)
    }

    /// The kind of entry at `path`.
    pub fn kind(&self, path: &Path) -> SdkResult<Option<EntryKind>> {
        Ok(self.tree()?.kind(path)?)
    }

    /// List the entries of the node at `path`.
    pub fn list(&self, path: &Path) -> SdkResult<Vec<(Step, EntryKind)>> {
        Ok(self.tree()?.list(path)?)
    }

    /// Returns `true` if `path` holds a contents value.
    pub fn mem(&self, path: &Path) -> SdkResult<bool> {
        Ok(self.tree()?.mem(path)?)
    }

    /// Read the value at `path`; absence is `None`.
    pub fn find(&self, path: &Path) -> SdkResult<Option<C>> {
        Ok(self.tree()?.find(path)?.map(|(value, _)| value))
    }

    /// Read the value and metadata at `path`; absence is `None`.
    pub fn getv(&self, path: &Path) -> SdkResult<Option<(C, M)>> {
        Ok(self.tree()?.find(path)?)
    }

    /// Read the value at `path`; absence is an invalid-argument error.
    pub fn get(&self, path: &Path) -> SdkResult<C> {
        self.find(path)?
            .ok_or_else(|| SdkError::InvalidArgument(format!("no value at {path}")))
    }

    // -----------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------

    /// Bind `value` at `path` and commit.
    ///
    /// Returns the new head. Concurrent writers to the same branch are
    /// serialised by the branch lock; a lost compare-and-swap race
    /// re-applies the edit against the new head.
    pub fn set(
        &self,
        task: &Task,
        path: &Path,
        value: C,
        metadata: Option<M>,
    ) -> SdkResult<ObjectId> {
        self.commit_edit(task, None, |tree| {
            tree.add(path, value.clone(), metadata.clone())
        })
    }

    /// Like [`Store::set`], with an explicit parent override.
    pub fn set_with_parents(
        &self,
        task: &Task,
        parents: Vec<ObjectId>,
        path: &Path,
        value: C,
        metadata: Option<M>,
    ) -> SdkResult<ObjectId> {
        self.commit_edit(task, Some(parents), |tree| {
            tree.add(path, value.clone(), metadata.clone())
        })
    }

    /// Graft a whole subtree at `path` and commit.
    pub fn set_tree(
        &self,
        task: &Task,
        path: &Path,
        subtree: StagingTree<C, M>,
    ) -> SdkResult<ObjectId> {
        self.commit_edit(task, None, |tree| tree.graft(path, subtree.clone()))
    }

    /// Unbind `path` and commit.
    pub fn remove(&self, task: &Task, path: &Path) -> SdkResult<ObjectId> {
        self.commit_edit(task, None, |tree| tree.remove(path))
    }

    /// Copy this handle's head onto `dst`, creating or resetting it.
    pub fn clone_into(&self, dst: &Branch) -> SdkResult<ObjectId> {
        let head = self.get_head()?;
        self.repo.branch_store().set(dst, head)?;
        Ok(head)
    }

    // -----------------------------------------------------------------
    // Merging
    // -----------------------------------------------------------------

    /// Merge this handle's head into `dst`'s branch.
    pub fn merge_into(&self, task: &Task, dst: &Store<C, M>) -> SdkResult<ObjectId> {
        let ours = self.get_head()?;
        dst.merge_with_commit(task, ours)
    }

    /// Merge another branch's head into this handle's branch.
    pub fn merge_with_branch(&self, task: &Task, other: &Branch) -> SdkResult<ObjectId> {
        let theirs = self
            .repo
            .branch_store()
            .find(other)?
            .ok_or_else(|| SdkError::NoHead(other.as_str().to_string()))?;
        self.merge_with_commit(task, theirs)
    }

    /// Merge a commit into this handle's branch.
    ///
    /// The merge commit lists this branch's head first, then `other`;
    /// the task is attached verbatim. An unborn branch adopts `other`
    /// directly.
    pub fn merge_with_commit(&self, task: &Task, other: ObjectId) -> SdkResult<ObjectId> {
        let branch = self.require_branch()?;
        let (max_depth, max_count) = self.repo.lca_bounds()?;
        let history = self.repo.history();
        loop {
            let _guard = self.repo.locks().lock(branch.clone());
            let head = self.repo.branch_store().find(&branch)?;
            let new_head = match head {
                None => other,
                Some(ours) => {
                    history.three_way_merge(&ours, &other, task, max_depth, max_count)?
                }
            };
            if self
                .repo
                .branch_store()
                .test_and_set(&branch, head.as_ref(), Some(&new_head))?
            {
                debug!(branch = %branch, head = %new_head.short_hex(), "merged");
                return Ok(new_head);
            }
        }
    }

    /// Advance the branch to `target` iff the current head is a strict
    /// ancestor of it. Returns whether the branch moved.
    pub fn fast_forward(&self, target: ObjectId) -> SdkResult<bool> {
        let branch = self.require_branch()?;
        let history = self.repo.history();
        loop {
            let _guard = self.repo.locks().lock(branch.clone());
            let head = self.repo.branch_store().find(&branch)?;
            let applies = match head {
                None => true,
                Some(current) => {
                    current != target && history.is_ancestor(&current, &target)?
                }
            };
            if !applies {
                return Ok(false);
            }
            if self
                .repo
                .branch_store()
                .test_and_set(&branch, head.as_ref(), Some(&target))?
            {
                return Ok(true);
            }
        }
    }

    // -----------------------------------------------------------------
    // History
    // -----------------------------------------------------------------

    /// Lowest common ancestors of this head and another branch's head.
    pub fn lcas_with_branch(
        &self,
        other: &Branch,
        max_depth: Option<u64>,
        max_count: Option<usize>,
    ) -> SdkResult<LcaOutcome> {
        let theirs = self
            .repo
            .branch_store()
            .find(other)?
            .ok_or_else(|| SdkError::NoHead(other.as_str().to_string()))?;
        self.lcas_with_commit(theirs, max_depth, max_count)
    }

    /// Lowest common ancestors of this head and a commit.
    pub fn lcas_with_commit(
        &self,
        other: ObjectId,
        max_depth: Option<u64>,
        max_count: Option<usize>,
    ) -> SdkResult<LcaOutcome> {
        let ours = self.get_head()?;
        Ok(self
            .repo
            .history()
            .lcas(&ours, &other, max_depth, max_count)?)
    }

    /// The commit DAG reachable from this head, truncated at `depth`
    /// and at any commit in `min`.
    pub fn history(&self, depth: Option<u64>, min: &[ObjectId]) -> SdkResult<Vec<ObjectId>> {
        let head = self.get_head()?;
        Ok(self.repo.history().history(depth, min, &[head])?)
    }

    // -----------------------------------------------------------------
    // Watching
    // -----------------------------------------------------------------

    /// Watch every branch of the repository.
    ///
    /// `init` seeds the handler's baseline. Any current binding that
    /// already differs from the baseline is delivered immediately, so a
    /// watcher installed with recorded state catches up on what it
    /// missed.
    pub fn watch<F>(&self, init: Vec<(Branch, ObjectId)>, callback: F) -> SdkResult<WatchHandle>
    where
        F: Fn(&Branch, &Diff<ObjectId>) + Send + Sync + 'static,
    {
        let handle = self.repo.watches().watch(init, callback);
        // First activation: handlers whose baseline matches the current
        // state observe nothing (per-handler diffs are empty).
        for branch in self.repo.branches()? {
            if let Some(head) = self.repo.branch_store().find(&branch)? {
                self.repo.watches().notify(&branch, Some(&head));
            }
        }
        Ok(handle)
    }

    /// Watch this handle's branch only.
    ///
    /// The handler's baseline is the branch's current head, so only
    /// future transitions are delivered.
    pub fn watch_key<F>(&self, callback: F) -> SdkResult<WatchHandle>
    where
        F: Fn(&Branch, &Diff<ObjectId>) + Send + Sync + 'static,
    {
        let branch = self.require_branch()?;
        let init = self.repo.branch_store().find(&branch)?;
        Ok(self.repo.watches().watch_key(branch, init, callback))
    }

    /// Cancel a watcher. Returns `false` for an unknown handle.
    pub fn unwatch(&self, handle: WatchHandle) -> bool {
        self.repo.watches().unwatch(handle)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn require_branch(&self) -> SdkResult<Branch> {
        match &self.position {
            Position::Branch(branch) => Ok(branch.clone()),
            Position::Detached(_) => Err(SdkError::InvalidArgument(
                "detached handles cannot update branch state".into(),
            )),
        }
    }

    fn tree_at(&self, head: Option<ObjectId>) -> SdkResult<StagingTree<C, M>> {
        let nodes = self.repo.node_store().clone();
        let contents = self.repo.contents_store().clone();
        match head {
            None => Ok(StagingTree::empty(nodes, contents)),
            Some(commit) => {
                let commit = self.repo.commit_store().get(&commit)?;
                Ok(StagingTree::of_hash(nodes, contents, commit.node))
            }
        }
    }

    /// Apply an edit to the branch's tree and commit it atomically.
    ///
    /// The branch lock serialises same-branch commits; the CAS retry
    /// re-reads the head and re-applies the edit if an unlocked writer
    /// slipped in between.
    fn commit_edit<F>(
        &self,
        task: &Task,
        parents: Option<Vec<ObjectId>>,
        edit: F,
    ) -> SdkResult<ObjectId>
    where
        F: Fn(&mut StagingTree<C, M>) -> TreeResult<()>,
    {
        let branch = self.require_branch()?;
        loop {
            let _guard = self.repo.locks().lock(branch.clone());
            let head = self.repo.branch_store().find(&branch)?;
            let mut tree = self.tree_at(head)?;
            edit(&mut tree)?;
            let node = tree.flush()?;
            let commit_parents = match &parents {
                Some(explicit) => explicit.clone(),
                None => head.into_iter().collect(),
            };
            let commit_id = self
                .repo
                .commit_store()
                .add(&Commit::new(node, commit_parents, task.clone()))?;
            if self
                .repo
                .branch_store()
                .test_and_set(&branch, head.as_ref(), Some(&commit_id))?
            {
                debug!(branch = %branch, head = %commit_id.short_hex(), "committed");
                return Ok(commit_id);
            }
        }
    }
}
