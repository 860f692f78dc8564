//! Byte ranges for ordered key scans.

use bytes::Bytes;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::ops::{Bound, RangeBounds};

/// A range over byte sequences, compared lexicographically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesRange {
    pub start: Bound<Bytes>,
    pub end: Bound<Bytes>,
}

impl BytesRange {
    pub fn new(start: Bound<Bytes>, end: Bound<Bytes>) -> Self {
        Self { start, end }
    }

    /// Creates the half-open range `[lower, upper)`.
    pub fn half_open(lower: Bytes, upper: Bytes) -> Self {
        Self {
            start: Included(lower),
            end: Excluded(upper),
        }
    }

    /// Creates a range that scans everything.
    pub fn unbounded() -> Self {
        Self {
            start: Unbounded,
            end: Unbounded,
        }
    }

    pub fn contains(&self, k: &[u8]) -> bool {
        (match &self.start {
            Included(s) => k >= s.as_ref(),
            Excluded(s) => k > s.as_ref(),
            Unbounded => true,
        }) && (match &self.end {
            Included(e) => k <= e.as_ref(),
            Excluded(e) => k < e.as_ref(),
            Unbounded => true,
        })
    }

    /// Returns true if no key can fall inside the range.
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Included(s), Included(e)) => s > e,
            (Included(s), Excluded(e))
            | (Excluded(s), Included(e))
            | (Excluded(s), Excluded(e)) => s >= e,
            _ => false,
        }
    }
}

impl RangeBounds<Bytes> for BytesRange {
    fn start_bound(&self) -> Bound<&Bytes> {
        self.start.as_ref()
    }
    fn end_bound(&self) -> Bound<&Bytes> {
        self.end.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn should_contain_exactly_keys_between_bounds(
            lower: Vec<u8>,
            upper: Vec<u8>,
            key: Vec<u8>
        ) {
            let range =
                BytesRange::half_open(Bytes::from(lower.clone()), Bytes::from(upper.clone()));

            prop_assert_eq!(range.contains(&key), key >= lower && key < upper);
        }
    }

    #[test]
    fn should_include_lower_and_exclude_upper() {
        let range = BytesRange::half_open(Bytes::from("b"), Bytes::from("d"));

        assert!(range.contains(b"b"));
        assert!(range.contains(b"c"));
        assert!(range.contains(b"c\xFF\xFF"));

        assert!(!range.contains(b"a"));
        assert!(!range.contains(b"d"));
        assert!(!range.contains(b"d\x00"));
    }

    #[test]
    fn should_treat_shorter_prefix_as_smaller() {
        let range = BytesRange::half_open(
            Bytes::from_static(&[0x05, 0x00]),
            Bytes::from_static(&[0x05, 0x00, 0xFF]),
        );

        assert!(!range.contains(&[0x05]));
        assert!(range.contains(&[0x05, 0x00]));
        assert!(range.contains(&[0x05, 0x00, 0x01, 0x02]));
        assert!(range.contains(&[0x05, 0x00, 0xFE, 0xFF]));
        assert!(!range.contains(&[0x05, 0x00, 0xFF]));
        assert!(!range.contains(&[0x05, 0x01]));
    }

    #[test]
    fn should_report_empty_ranges() {
        assert!(BytesRange::half_open(Bytes::from("b"), Bytes::from("b")).is_empty());
        assert!(BytesRange::half_open(Bytes::from("c"), Bytes::from("b")).is_empty());
        assert!(!BytesRange::half_open(Bytes::from("a"), Bytes::from("b")).is_empty());
        assert!(!BytesRange::unbounded().is_empty());
    }

    #[test]
    fn should_contain_everything_when_unbounded() {
        let range = BytesRange::unbounded();

        assert!(range.contains(b""));
        assert!(range.contains(b"anything"));
        assert!(range.contains(&[0xFF, 0xFF, 0xFF]));
    }
}
