use std::sync::Arc;

use serde::{Deserialize, Serialize};

use taiga_store::{AppendOnlyStore, ObjectKind, RawObject};
use taiga_types::{ObjectId, Task};

use crate::error::{ObjectError, ObjectResult};

/// An immutable commit: a root node, ordered parents, and a task.
///
/// Parent order is significant and preserved verbatim: the first parent
/// is the privileged "main" parent in traversal, and a merge commit lists
/// the "into" branch first. Acyclicity is structural: a parent's hash is
/// known strictly before the child can be built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root of the committed tree.
    pub node: ObjectId,
    /// Parent commits, in order. Empty for a root commit.
    pub parents: Vec<ObjectId>,
    /// Provenance record.
    pub task: Task,
}

impl Commit {
    /// Build a commit.
    pub fn new(node: ObjectId, parents: Vec<ObjectId>, task: Task) -> Self {
        Self {
            node,
            parents,
            task,
        }
    }

    /// Returns `true` for a commit with no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Canonical serialisation for storage and hashing.
    pub fn to_raw(&self) -> ObjectResult<RawObject> {
        let data =
            bincode::serialize(self).map_err(|e| ObjectError::Codec(e.to_string()))?;
        Ok(RawObject::new(ObjectKind::Commit, data))
    }

    /// Decode from kernel storage, checking the kind tag.
    pub fn from_raw(raw: &RawObject) -> ObjectResult<Self> {
        if raw.kind != ObjectKind::Commit {
            return Err(ObjectError::KindMismatch {
                expected: ObjectKind::Commit,
                actual: raw.kind,
            });
        }
        bincode::deserialize(&raw.data).map_err(|e| ObjectError::Codec(e.to_string()))
    }
}

/// Typed store for [`Commit`]s over an append-only kernel store.
#[derive(Clone)]
pub struct CommitStore {
    inner: Arc<dyn AppendOnlyStore>,
}

impl CommitStore {
    /// Wrap an append-only kernel store.
    pub fn new(inner: Arc<dyn AppendOnlyStore>) -> Self {
        Self { inner }
    }

    /// Persist a commit; returns its content-addressed key.
    pub fn add(&self, commit: &Commit) -> ObjectResult<ObjectId> {
        let raw = commit.to_raw()?;
        Ok(self.inner.add(&raw)?)
    }

    /// Read a commit by key; absence is `None`.
    pub fn find(&self, id: &ObjectId) -> ObjectResult<Option<Commit>> {
        match self.inner.find(id)? {
            None => Ok(None),
            Some(raw) => Commit::from_raw(&raw).map(Some),
        }
    }

    /// Read a commit that must exist.
    pub fn get(&self, id: &ObjectId) -> ObjectResult<Commit> {
        self.find(id)?
            .ok_or_else(|| ObjectError::not_found(ObjectKind::Commit, id))
    }

    /// Check whether a key resolves.
    pub fn contains(&self, id: &ObjectId) -> ObjectResult<bool> {
        Ok(self.inner.contains(id)?)
    }

    /// The task of a commit, when the commit exists.
    pub fn task_of(&self, id: &ObjectId) -> ObjectResult<Option<Task>> {
        Ok(self.find(id)?.map(|c| c.task))
    }
}
