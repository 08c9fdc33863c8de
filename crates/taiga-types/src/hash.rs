use crate::object::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"taiga-node-v1"`) that is
/// prepended to every hash computation. This prevents cross-kind hash
/// collisions: a contents value and a node with identical serialised bytes
/// produce different keys, so a key can never be resolved in the wrong
/// store.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for user contents values.
    pub const CONTENTS: Self = Self {
        domain: "taiga-contents-v1",
    };
    /// Hasher for tree nodes.
    pub const NODE: Self = Self {
        domain: "taiga-node-v1",
    };
    /// Hasher for commits.
    pub const COMMIT: Self = Self {
        domain: "taiga-commit-v1",
    };

    /// A hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash serialised bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Check that `data` hashes to `expected` under this domain.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
