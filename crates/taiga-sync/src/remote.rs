use taiga_objects::Slice;
use taiga_types::{Branch, ObjectId};

use crate::error::SyncResult;

/// The slice-level surface a repository offers to synchronisation.
///
/// Both ends of a sync implement this; a wire protocol is just a way of
/// carrying these three calls to another machine.
pub trait SyncEndpoint: Send + Sync {
    /// Export a branch: its head and the closure slice reaching it,
    /// truncated at `depth` levels of history. `None` when the branch
    /// has no head.
    fn export_branch(
        &self,
        branch: &Branch,
        depth: Option<u64>,
    ) -> SyncResult<Option<(ObjectId, Slice)>>;

    /// Apply a slice's objects; branch state is untouched. Returns the
    /// number of objects written.
    fn import_objects(&self, slice: &Slice) -> SyncResult<usize>;

    /// Apply a slice's objects, then advance `branch` to `head`.
    fn publish(&self, branch: &Branch, head: ObjectId, slice: &Slice) -> SyncResult<()>;
}

/// Outcome of a fetch: the remote's head for the branch, or nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The remote had a head; its closure is now in the local stores.
    Head {
        head: ObjectId,
        objects_received: usize,
    },
    /// The remote has no head for that branch.
    NoHead,
}

/// Outcome of a successful push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushReport {
    /// The head the remote branch now points at.
    pub head: ObjectId,
    /// Number of objects sent.
    pub objects_sent: usize,
}

/// A remote repository reachable from this process.
///
/// `fetch` brings the remote's objects into `local` without moving any
/// local branch (advancing is the caller's decision: fast-forward or
/// merge). `push` publishes the local branch, objects first, head last.
pub trait Remote: Send + Sync {
    /// Fetch `branch` from the remote into `local`.
    fn fetch(
        &self,
        local: &dyn SyncEndpoint,
        branch: &Branch,
        depth: Option<u64>,
    ) -> SyncResult<FetchOutcome>;

    /// Push the local `branch` to the remote.
    fn push(
        &self,
        local: &dyn SyncEndpoint,
        branch: &Branch,
        depth: Option<u64>,
    ) -> SyncResult<PushReport>;
}
