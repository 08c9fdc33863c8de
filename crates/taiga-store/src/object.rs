use serde::{Deserialize, Serialize};
use taiga_types::{ContentHasher, ObjectId};

/// The kind of a stored object, selecting its hash domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// User contents (tree leaves).
    Contents,
    /// Tree node: a mapping from step to child entry.
    Node,
    /// Commit: root node, parents and task.
    Commit,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contents => write!(f, "contents"),
            Self::Node => write!(f, "node"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// A stored object: kind tag plus canonical serialised bytes.
///
/// `RawObject` is the unit of kernel storage. The kernel never interprets
/// the bytes; typed decoding happens one layer up. The key of a raw object
/// is fully determined by its kind and bytes, which is what makes `add`
/// idempotent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObject {
    /// The object's kind, selecting the hash domain.
    pub kind: ObjectKind,
    /// Canonical serialised bytes.
    pub data: Vec<u8>,
}

impl RawObject {
    /// Wrap serialised bytes under a kind tag.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// The content-addressed key: the domain-separated hash of the bytes.
    pub fn compute_id(&self) -> ObjectId {
        let hasher = match self.kind {
            ObjectKind::Contents => &ContentHasher::CONTENTS,
            ObjectKind::Node => &ContentHasher::NODE,
            ObjectKind::Commit => &ContentHasher::COMMIT,
        };
        hasher.hash(&self.data)
    }

    /// Size of the serialised payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
