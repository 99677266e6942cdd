//! Resident-range bookkeeping for a memory mapping.
//!
//! This module provides the FragmentSet structure that tracks which byte
//! ranges of a mapping are still physically backed. The mapping starts as a
//! single fragment covering the whole range and is subdivided as sub-ranges
//! are released. Keeping the splitting logic in an explicit collection makes
//! it testable independently of any platform call.

use std::ops::Range;

/// Sorted collection of disjoint, non-empty, half-open byte ranges.
///
/// Invariants, maintained by every operation:
/// - fragments never overlap and never touch (adjacent ranges stay separate
///   only when a released range lies between them)
/// - fragments are sorted by start offset
/// - the union of all fragments is a subset of `[0, len)` for the `len` the
///   set was created with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSet {
    fragments: Vec<Range<usize>>,
}

impl FragmentSet {
    /// Create a set covering `[0, len)` as a single fragment.
    ///
    /// A zero-length mapping starts (and stays) empty.
    pub fn new(len: usize) -> Self {
        let fragments = if len == 0 { Vec::new() } else { vec![0..len] };
        Self { fragments }
    }

    /// Remove `[start, end)` from every fragment it overlaps.
    ///
    /// For each existing fragment:
    /// - fully inside the released range: removed
    /// - straddling one edge: truncated
    /// - straddling both edges: split into two
    /// - disjoint: untouched
    ///
    /// An empty or inverted range is a no-op.
    pub fn release(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }

        let mut updated = Vec::with_capacity(self.fragments.len() + 1);
        for frag in self.fragments.drain(..) {
            if frag.start < start && frag.end > end {
                // Straddles both edges: split in two
                updated.push(frag.start..start);
                updated.push(end..frag.end);
            } else if frag.start < start && frag.end > start {
                // Straddles the left edge: keep the head
                updated.push(frag.start..start);
            } else if frag.start < end && frag.end > end {
                // Straddles the right edge: keep the tail
                updated.push(end..frag.end);
            } else if frag.start >= start && frag.end <= end {
                // Fully inside the released range: dropped
            } else {
                updated.push(frag);
            }
        }
        self.fragments = updated;
    }

    /// The remaining fragments, sorted by start offset.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.fragments
    }

    /// Total number of bytes still covered by fragments.
    pub fn covered_bytes(&self) -> usize {
        self.fragments.iter().map(|f| f.end - f.start).sum()
    }

    /// True once every byte has been released.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Align a release request to page boundaries.
///
/// Rounds `first` up and `last` down to `page_size` (which must be a power of
/// two). Returns `None` when the aligned range is empty or inverted, which
/// callers treat as a no-op.
pub fn align_release_range(first: usize, last: usize, page_size: usize) -> Option<(usize, usize)> {
    debug_assert!(page_size.is_power_of_two());

    let offset_in_page = first & (page_size - 1);
    let first = if offset_in_page == 0 {
        first
    } else {
        first.checked_add(page_size - offset_in_page)?
    };

    let last = last & !(page_size - 1);

    if last <= first {
        None
    } else {
        Some((first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PAGE: usize = 4096;

    #[test]
    fn test_new_single_fragment() {
        let set = FragmentSet::new(100);
        assert_eq!(set.ranges(), &[0..100]);
        assert_eq!(set.covered_bytes(), 100);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_new_zero_length() {
        let set = FragmentSet::new(0);
        assert!(set.is_empty());
        assert_eq!(set.covered_bytes(), 0);
    }

    #[test]
    fn test_release_middle_splits() {
        let mut set = FragmentSet::new(100);
        set.release(40, 60);
        assert_eq!(set.ranges(), &[0..40, 60..100]);
        assert_eq!(set.covered_bytes(), 80);
    }

    #[test]
    fn test_release_left_edge_truncates() {
        let mut set = FragmentSet::new(100);
        set.release(0, 30);
        assert_eq!(set.ranges(), &[30..100]);
    }

    #[test]
    fn test_release_right_edge_truncates() {
        let mut set = FragmentSet::new(100);
        set.release(70, 100);
        assert_eq!(set.ranges(), &[0..70]);
    }

    #[test]
    fn test_release_everything() {
        let mut set = FragmentSet::new(100);
        set.release(0, 100);
        assert!(set.is_empty());
    }

    #[test]
    fn test_release_fragment_fully_inside_range() {
        let mut set = FragmentSet::new(100);
        set.release(40, 60); // [0,40) [60,100)
        set.release(30, 80); // removes [60,80), truncates [0,40) to [0,30)
        assert_eq!(set.ranges(), &[0..30, 80..100]);
    }

    #[test]
    fn test_release_disjoint_is_untouched() {
        let mut set = FragmentSet::new(100);
        set.release(40, 60);
        set.release(40, 60); // releasing again changes nothing
        assert_eq!(set.ranges(), &[0..40, 60..100]);
    }

    #[test]
    fn test_release_empty_or_inverted_is_noop() {
        let mut set = FragmentSet::new(100);
        set.release(50, 50);
        set.release(60, 40);
        assert_eq!(set.ranges(), &[0..100]);
    }

    #[test]
    fn test_release_beyond_length_clips_to_existing() {
        let mut set = FragmentSet::new(100);
        set.release(90, 200);
        assert_eq!(set.ranges(), &[0..90]);
    }

    #[test]
    fn test_align_rounds_inward() {
        // Interior offsets shrink to the contained whole pages
        assert_eq!(
            align_release_range(1, 3 * PAGE + 5, PAGE),
            Some((PAGE, 3 * PAGE))
        );
        // Already aligned range is unchanged
        assert_eq!(
            align_release_range(PAGE, 2 * PAGE, PAGE),
            Some((PAGE, 2 * PAGE))
        );
    }

    #[test]
    fn test_align_empty_results() {
        // Sub-page range contains no whole page
        assert_eq!(align_release_range(1, PAGE - 1, PAGE), None);
        // Inverted input
        assert_eq!(align_release_range(2 * PAGE, PAGE, PAGE), None);
        // Empty input
        assert_eq!(align_release_range(PAGE, PAGE, PAGE), None);
    }

    #[test]
    fn test_align_rounding_overflow_is_noop() {
        assert_eq!(align_release_range(usize::MAX - 2, usize::MAX, PAGE), None);
    }

    proptest! {
        // Any sequence of releases keeps the set sorted, disjoint and
        // non-empty, with its union equal to [0, len) minus all released
        // bytes.
        #[test]
        fn release_preserves_invariants(
            len in 1usize..4096,
            ops in prop::collection::vec((0usize..5000, 0usize..5000), 0..16),
        ) {
            let mut set = FragmentSet::new(len);
            let mut resident = vec![true; len];

            for &(start, end) in &ops {
                set.release(start, end);
                for flag in resident.iter_mut().take(end.min(len)).skip(start.min(len)) {
                    *flag = false;
                }
            }

            // Sorted, disjoint, non-empty
            let ranges = set.ranges();
            for window in ranges.windows(2) {
                prop_assert!(window[0].end <= window[1].start);
            }
            for r in ranges {
                prop_assert!(r.start < r.end);
                prop_assert!(r.end <= len);
            }

            // Union matches the simulation
            let mut from_set = vec![false; len];
            for r in ranges {
                for flag in from_set.iter_mut().take(r.end).skip(r.start) {
                    *flag = true;
                }
            }
            prop_assert_eq!(from_set, resident);
        }
    }
}
