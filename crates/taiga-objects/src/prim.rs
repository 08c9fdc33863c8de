//! Ready-made capability implementations.
//!
//! [`Text`] and [`Counter`] cover the two common leaf shapes (opaque
//! strings with last-reconcilable-writer semantics, and additive
//! integers), and [`UnitMetadata`] is the trivial metadata for
//! applications that do not use per-entry attributes.

use taiga_merge::Merge;

use crate::contents::Contents;
use crate::error::{ObjectError, ObjectResult};
use crate::metadata::Metadata;

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// UTF-8 string contents merged with the default combinator: a one-sided
/// edit wins, a double edit conflicts.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Text(pub String);

impl Text {
    /// Wrap a string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Text {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Contents for Text {
    fn encode(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    fn decode(data: &[u8]) -> ObjectResult<Self> {
        String::from_utf8(data.to_vec())
            .map(Self)
            .map_err(|e| ObjectError::Codec(e.to_string()))
    }

    fn print(&self) -> String {
        self.0.clone()
    }

    fn parse(s: &str) -> ObjectResult<Self> {
        Ok(Self(s.to_string()))
    }

    fn merge() -> Merge<Self> {
        Merge::idempotent()
    }
}

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

/// A signed 64-bit counter whose merge adds both sides' deltas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Counter(pub i64);

impl Counter {
    /// Wrap a value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The counter value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Counter {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Contents for Counter {
    fn encode(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }

    fn decode(data: &[u8]) -> ObjectResult<Self> {
        let bytes: [u8; 8] = data
            .try_into()
            .map_err(|_| ObjectError::Codec(format!("counter needs 8 bytes, got {}", data.len())))?;
        Ok(Self(i64::from_be_bytes(bytes)))
    }

    fn print(&self) -> String {
        self.0.to_string()
    }

    fn parse(s: &str) -> ObjectResult<Self> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| ObjectError::Codec(e.to_string()))
    }

    fn merge() -> Merge<Self> {
        Merge::counter().like(
            |c: &Counter| Ok(c.0),
            |n: &i64| Ok(Counter(*n)),
        )
    }
}

// ---------------------------------------------------------------------------
// UnitMetadata
// ---------------------------------------------------------------------------

/// The trivial metadata: carries nothing and always merges cleanly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UnitMetadata;

impl Metadata for UnitMetadata {
    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }

    fn decode(data: &[u8]) -> ObjectResult<Self> {
        if !data.is_empty() {
            return Err(ObjectError::Codec(format!(
                "unit metadata must be empty, got {} bytes",
                data.len()
            )));
        }
        Ok(Self)
    }

    fn default_value() -> Self {
        Self
    }

    fn merge() -> Merge<Self> {
        Merge::new(|_, _, _| Ok(Some(UnitMetadata)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taiga_merge::Ancestor;

    // ---- Text ----

    #[test]
    fn text_codec_roundtrip() {
        let t = Text::new("héllo");
        assert_eq!(Text::decode(&t.encode()).unwrap(), t);
        assert_eq!(Text::parse(&t.print()).unwrap(), t);
    }

    #[test]
    fn text_decode_rejects_invalid_utf8() {
        assert!(matches!(
            Text::decode(&[0xFF, 0xFE]),
            Err(ObjectError::Codec(_))
        ));
    }

    #[test]
    fn text_merge_conflicts_on_double_edit() {
        let m = Text::merge();
        let old = Ancestor::of_value(Some(Text::new("base")));
        let a = Text::new("left");
        let b = Text::new("right");
        assert!(m.run(&old, Some(&a), Some(&b)).is_err());
    }

    #[test]
    fn text_merge_takes_the_single_edit() {
        let m = Text::merge();
        let old = Ancestor::of_value(Some(Text::new("base")));
        let base = Text::new("base");
        let edited = Text::new("edited");
        assert_eq!(
            m.run(&old, Some(&base), Some(&edited)).unwrap(),
            Some(edited)
        );
    }

    // ---- Counter ----

    #[test]
    fn counter_codec_roundtrip() {
        let c = Counter::new(-42);
        assert_eq!(Counter::decode(&c.encode()).unwrap(), c);
        assert_eq!(Counter::parse(&c.print()).unwrap(), c);
    }

    #[test]
    fn counter_decode_rejects_bad_length() {
        assert!(Counter::decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn counter_merge_adds_deltas() {
        let m = Counter::merge();
        let old = Ancestor::of_value(Some(Counter::new(5)));
        let a = Counter::new(7);
        let b = Counter::new(4);
        assert_eq!(
            m.run(&old, Some(&a), Some(&b)).unwrap(),
            Some(Counter::new(6))
        );
    }

    #[test]
    fn counter_parse_rejects_garbage() {
        assert!(matches!(
            Counter::parse("not a number"),
            Err(ObjectError::Codec(_))
        ));
    }

    // ---- UnitMetadata ----

    #[test]
    fn unit_metadata_codec() {
        assert!(UnitMetadata.encode().is_empty());
        assert_eq!(UnitMetadata::decode(&[]).unwrap(), UnitMetadata);
        assert!(UnitMetadata::decode(&[1]).is_err());
    }

    #[test]
    fn unit_metadata_always_merges() {
        let m = UnitMetadata::merge();
        let old = Ancestor::of_value(None);
        assert_eq!(
            m.run(&old, Some(&UnitMetadata), None).unwrap(),
            Some(UnitMetadata)
        );
    }
}
