use taiga_merge::Merge;

use crate::error::ObjectResult;

/// Per-contents attribute stored at the parent node entry.
///
/// Because metadata lives on the entry rather than inside the contents
/// value, renaming an entry preserves it. Implementations supply a byte
/// codec, a default used when a value is first added, and a merge
/// combinator run alongside the contents merge.
pub trait Metadata: Clone + PartialEq + Send + Sync + 'static {
    /// Deterministic byte encoding.
    fn encode(&self) -> Vec<u8>;

    /// Decode from the byte encoding.
    fn decode(data: &[u8]) -> ObjectResult<Self>;

    /// The metadata attached when none is given.
    fn default_value() -> Self;

    /// The three-way merge combinator for this metadata type.
    fn merge() -> Merge<Self>;
}
