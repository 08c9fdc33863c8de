use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use taiga_graph::{History, NodeGraph};
use taiga_objects::{
    CommitStore, Contents, ContentsStore, Metadata, NodeEntry, NodeStore, Slice,
};
use taiga_store::{
    AppendOnlyStore, MemoryBranchStore, MemoryLinkStore, MemoryObjectStore, ReadOnlyStore,
    ReadWriteStore,
};
use taiga_sync::{SyncEndpoint, SyncError, SyncResult};
use taiga_types::{Branch, Config, ObjectId, Task, LCA_MAX_COUNT, LCA_MAX_DEPTH};
use taiga_watch::{LockManager, WatchSet};

use crate::error::SdkResult;

/// A taiga repository: the typed stores, watch state and lock manager
/// assembled over a backend.
///
/// Cloning a repository yields another view over the same state; all
/// handles are cheap. Store handles ([`Store`]) are built from such
/// views.
///
/// [`Store`]: crate::store::Store
pub struct Repository<C, M> {
    config: Config,
    objects: Arc<MemoryObjectStore>,
    links: Arc<MemoryLinkStore>,
    branches: Arc<MemoryBranchStore>,
    contents: ContentsStore<C>,
    nodes: NodeStore,
    commits: CommitStore,
    locks: Arc<LockManager<Branch>>,
    _metadata: PhantomData<fn() -> M>,
}

impl<C, M> Clone for Repository<C, M> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            objects: Arc::clone(&self.objects),
            links: Arc::clone(&self.links),
            branches: Arc::clone(&self.branches),
            contents: self.contents.clone(),
            nodes: self.nodes.clone(),
            commits: self.commits.clone(),
            locks: Arc::clone(&self.locks),
            _metadata: PhantomData,
        }
    }
}

impl<C: Contents, M: Metadata> Repository<C, M> {
    /// Open a repository over the in-memory backend.
    pub fn open(config: Config) -> SdkResult<Self> {
        let objects: Arc<MemoryObjectStore> = Arc::new(MemoryObjectStore::new());
        let kernel: Arc<dyn AppendOnlyStore> = objects.clone();
        Ok(Self {
            config,
            links: Arc::new(MemoryLinkStore::new(kernel.clone())),
            branches: Arc::new(MemoryBranchStore::new()),
            contents: ContentsStore::new(kernel.clone()),
            nodes: NodeStore::new(kernel.clone()),
            commits: CommitStore::new(kernel),
            locks: Arc::new(LockManager::new()),
            objects,
            _metadata: PhantomData,
        })
    }

    /// Release the repository. In-memory state dies with the last view.
    pub fn close(self) {}

    /// The configuration this repository was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // -----------------------------------------------------------------
    // Store accessors
    // -----------------------------------------------------------------

    /// The typed contents store.
    pub fn contents_store(&self) -> &ContentsStore<C> {
        &self.contents
    }

    /// The typed node store.
    pub fn node_store(&self) -> &NodeStore {
        &self.nodes
    }

    /// The typed commit store.
    pub fn commit_store(&self) -> &CommitStore {
        &self.commits
    }

    /// The mutable branch store.
    pub fn branch_store(&self) -> &dyn ReadWriteStore {
        self.branches.as_ref()
    }

    /// The link store certifying alternative keys.
    pub fn link_store(&self) -> &MemoryLinkStore {
        &self.links
    }

    /// A node-graph handle over this repository.
    pub fn graph(&self) -> NodeGraph {
        NodeGraph::new(self.nodes.clone())
    }

    /// A history engine over this repository.
    pub fn history(&self) -> History<C, M> {
        History::new(
            self.commits.clone(),
            self.nodes.clone(),
            self.contents.clone(),
        )
    }

    /// The per-branch lock manager.
    pub fn locks(&self) -> &LockManager<Branch> {
        &self.locks
    }

    /// The watch state fed by branch mutations.
    pub fn watches(&self) -> &WatchSet<Branch, ObjectId> {
        self.branches.watches()
    }

    /// The branch named by the `default-branch` config key.
    pub fn default_branch(&self) -> SdkResult<Branch> {
        let name = self.config.get(&taiga_types::DEFAULT_BRANCH)?;
        Ok(Branch::new(name)?)
    }

    /// The configured LCA search bounds (`None` = unbounded).
    pub fn lca_bounds(&self) -> SdkResult<(Option<u64>, Option<usize>)> {
        let depth = self.config.get(&LCA_MAX_DEPTH)?;
        let count = self.config.get(&LCA_MAX_COUNT)?;
        Ok((
            (depth != 0).then_some(depth),
            (count != 0).then_some(count as usize),
        ))
    }

    // -----------------------------------------------------------------
    // Repository-wide queries
    // -----------------------------------------------------------------

    /// All branch names, sorted.
    pub fn branches(&self) -> SdkResult<Vec<Branch>> {
        Ok(self.branches.list()?)
    }

    /// The commit hashes of all branch heads, in branch-name order.
    pub fn heads(&self) -> SdkResult<Vec<ObjectId>> {
        let mut heads = Vec::new();
        for branch in self.branches.list()? {
            if let Some(head) = self.branches.find(&branch)? {
                heads.push(head);
            }
        }
        Ok(heads)
    }

    /// The task attached to a commit, when the commit exists.
    pub fn task_of_commit(&self, id: &ObjectId) -> SdkResult<Option<Task>> {
        Ok(self.commits.task_of(id)?)
    }

    // -----------------------------------------------------------------
    // Bulk transfer
    // -----------------------------------------------------------------

    /// Export a slice of the repository.
    ///
    /// `max` defaults to all branch heads; `depth` truncates history and
    /// `min` prunes it. With `full` (the default posture), the commits'
    /// trees and contents travel too; without it the slice carries
    /// history only.
    pub fn export(
        &self,
        depth: Option<u64>,
        min: &[ObjectId],
        max: Option<Vec<ObjectId>>,
        full: bool,
    ) -> SdkResult<Slice> {
        let max = match max {
            Some(heads) => heads,
            None => self.heads()?,
        };
        let history = self.history();
        let commit_ids = history.history(depth, min, &max)?;

        let mut slice = Slice::new();
        let mut tree_roots = Vec::new();
        for id in &commit_ids {
            if let Some(commit) = self.commits.find(id)? {
                tree_roots.push(commit.node);
                slice.insert(commit.to_raw()?);
            }
        }

        if full {
            let graph = self.graph();
            for node_id in graph.closure(&[], &tree_roots)? {
                let node = self.nodes.get(&node_id)?;
                for (_, entry) in node.entries() {
                    if let NodeEntry::Contents { id, .. } = entry {
                        if let Some(raw) = self.objects.find(id)? {
                            slice.insert(raw);
                        }
                    }
                }
                slice.insert(node.to_raw()?);
            }
        }

        slice.canonicalize();
        debug!(objects = slice.len(), full, "exported slice");
        Ok(slice)
    }

    /// Import a slice, verifying every key. Returns the number of
    /// objects written.
    pub fn import(&self, slice: &Slice) -> SdkResult<usize> {
        Ok(slice.apply(self.objects.as_ref())?)
    }
}

// ---------------------------------------------------------------------------
// Sync endpoint
// ---------------------------------------------------------------------------

impl<C: Contents, M: Metadata> SyncEndpoint for Repository<C, M> {
    fn export_branch(
        &self,
        branch: &Branch,
        depth: Option<u64>,
    ) -> SyncResult<Option<(ObjectId, Slice)>> {
        let head = self
            .branches
            .find(branch)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let Some(head) = head else {
            return Ok(None);
        };
        let slice = self
            .export(depth, &[], Some(vec![head]), true)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(Some((head, slice)))
    }

    fn import_objects(&self, slice: &Slice) -> SyncResult<usize> {
        Ok(slice.apply(self.objects.as_ref())?)
    }

    fn publish(&self, branch: &Branch, head: ObjectId, slice: &Slice) -> SyncResult<()> {
        slice.apply(self.objects.as_ref())?;
        self.branches
            .set(branch, head)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taiga_objects::{Text, UnitMetadata};
    use taiga_sync::{FetchOutcome, Remote, SliceRemote};
    use taiga_types::Path;

    use crate::store::Store;

    type Repo = Repository<Text, UnitMetadata>;

    fn repo() -> Repo {
        Repository::open(Config::new()).unwrap()
    }

    fn task(msg: &str) -> Task {
        Task::new(1_700_000_000, "tester", 1).with_message(msg)
    }

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn fresh_repository_is_empty() {
        let repo = repo();
        assert!(repo.branches().unwrap().is_empty());
        assert!(repo.heads().unwrap().is_empty());
    }

    #[test]
    fn default_branch_follows_the_config() {
        let repo = repo();
        assert!(repo.default_branch().unwrap().is_master());

        let mut config = Config::new();
        config.set(&taiga_types::DEFAULT_BRANCH, &"trunk".to_string());
        let repo: Repo = Repository::open(config).unwrap();
        assert_eq!(repo.default_branch().unwrap().as_str(), "trunk");
    }

    #[test]
    fn heads_follow_commits() {
        let repo = repo();
        let store = Store::master(&repo);
        let c1 = store
            .set(&task("one"), &path("/a"), Text::new("1"), None)
            .unwrap();

        assert_eq!(repo.branches().unwrap(), vec![Branch::master()]);
        assert_eq!(repo.heads().unwrap(), vec![c1]);
    }

    #[test]
    fn task_of_commit_roundtrips() {
        let repo = repo();
        let store = Store::master(&repo);
        let t = task("the provenance");
        let c = store.set(&t, &path("/a"), Text::new("1"), None).unwrap();

        assert_eq!(repo.task_of_commit(&c).unwrap(), Some(t));
        assert_eq!(
            repo.task_of_commit(&ObjectId::from_hash([0; 32])).unwrap(),
            None
        );
    }

    // -----------------------------------------------------------------
    // Export / import
    // -----------------------------------------------------------------

    #[test]
    fn export_import_transfers_state() {
        let src = repo();
        let store = Store::master(&src);
        let head = store
            .set(&task("one"), &path("/a/b"), Text::new("hi"), None)
            .unwrap();

        let slice = src.export(None, &[], None, true).unwrap();
        assert!(!slice.is_empty());

        let dst = repo();
        dst.import(&slice).unwrap();
        dst.branch_store().set(&Branch::master(), head).unwrap();

        let mirrored = Store::master(&dst);
        assert_eq!(mirrored.get(&path("/a/b")).unwrap(), Text::new("hi"));
    }

    #[test]
    fn partial_export_skips_trees() {
        let repo = repo();
        let store = Store::master(&repo);
        store
            .set(&task("one"), &path("/a"), Text::new("1"), None)
            .unwrap();

        let full = repo.export(None, &[], None, true).unwrap();
        let history_only = repo.export(None, &[], None, false).unwrap();

        assert!(full.nodes.len() > 0);
        assert!(full.contents.len() > 0);
        assert_eq!(history_only.nodes.len(), 0);
        assert_eq!(history_only.contents.len(), 0);
        assert_eq!(history_only.commits.len(), full.commits.len());
    }

    #[test]
    fn export_depth_truncates_history() {
        let repo = repo();
        let store = Store::master(&repo);
        store
            .set(&task("one"), &path("/a"), Text::new("1"), None)
            .unwrap();
        store
            .set(&task("two"), &path("/a"), Text::new("2"), None)
            .unwrap();
        store
            .set(&task("three"), &path("/a"), Text::new("3"), None)
            .unwrap();

        let all = repo.export(None, &[], None, false).unwrap();
        let shallow = repo.export(Some(1), &[], None, false).unwrap();
        assert_eq!(all.commits.len(), 3);
        assert_eq!(shallow.commits.len(), 2);
    }

    // -----------------------------------------------------------------
    // Remote fallback
    // -----------------------------------------------------------------

    #[test]
    fn fetch_and_fast_forward_from_a_remote_repository() {
        let origin = repo();
        let origin_store = Store::master(&origin);
        let head = origin_store
            .set(&task("publish"), &path("/x"), Text::new("1"), None)
            .unwrap();

        let local = repo();
        let remote = SliceRemote::new(origin.clone());
        let outcome = remote.fetch(&local, &Branch::master(), None).unwrap();
        let FetchOutcome::Head { head: fetched, .. } = outcome else {
            panic!("expected a head");
        };
        assert_eq!(fetched, head);

        // The caller decides how to advance; fast-forward succeeds here.
        let local_store = Store::master(&local);
        assert!(local_store.fast_forward(fetched).unwrap());
        assert_eq!(local_store.get(&path("/x")).unwrap(), Text::new("1"));
    }

    #[test]
    fn push_publishes_to_a_remote_repository() {
        let local = repo();
        let local_store = Store::master(&local);
        let head = local_store
            .set(&task("work"), &path("/y"), Text::new("2"), None)
            .unwrap();

        let origin = repo();
        let remote = SliceRemote::new(origin.clone());
        let report = remote.push(&local, &Branch::master(), None).unwrap();
        assert_eq!(report.head, head);

        let origin_store = Store::master(&origin);
        assert_eq!(origin_store.get(&path("/y")).unwrap(), Text::new("2"));
    }
}
