// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Closed intervals of tour positions.
//!
//! A `Segment` is the inclusive range `[start, end]` of positions in some
//! reference tour. Node subsets that are contiguous along the tour are stored
//! as one segment; arbitrary subsets as a short sorted list of disjoint,
//! non-adjacent segments.

use smallvec::SmallVec;
use std::iter::FusedIterator;

/// A closed interval `[start, end]` of tour positions.
///
/// # Invariants
/// `start <= end`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Segment {
    start: usize,
    end: usize,
}

/// An iterator over the positions of a `Segment`.
pub struct SegmentIterator {
    current: usize,
    end_exclusive: usize,
}

impl Iterator for SegmentIterator {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current < self.end_exclusive {
            let result = self.current;
            self.current += 1;
            Some(result)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end_exclusive.saturating_sub(self.current);
        (len, Some(len))
    }
}

impl DoubleEndedIterator for SegmentIterator {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.current < self.end_exclusive {
            self.end_exclusive -= 1;
            Some(self.end_exclusive)
        } else {
            None
        }
    }
}

impl ExactSizeIterator for SegmentIterator {}

impl FusedIterator for SegmentIterator {}

impl Segment {
    /// Creates a new segment.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use tourcut_core::math::segment::Segment;
    /// let s = Segment::new(2, 4);
    /// assert_eq!(s.len(), 3);
    /// ```
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Invalid segment: start must be less than or equal to end"
        );
        Self { start, end }
    }

    /// Creates a new segment, returning `None` if `start > end`.
    #[inline]
    pub fn try_new(start: usize, end: usize) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The segment holding only `position`.
    #[inline]
    pub fn single(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of positions covered; never zero.
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    #[inline]
    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position <= self.end
    }

    #[inline]
    pub fn contains_segment(&self, other: Segment) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns `true` if the segments share a position.
    #[inline]
    pub fn intersects(&self, other: Segment) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Returns `true` if the segments are disjoint but touch.
    #[inline]
    pub fn adjacent(&self, other: Segment) -> bool {
        self.end + 1 == other.start || other.end + 1 == self.start
    }

    #[inline]
    pub fn disjoint(&self, other: Segment) -> bool {
        !self.intersects(other)
    }

    /// The smallest segment covering both, if they overlap or touch.
    pub fn union(&self, other: Segment) -> Option<Segment> {
        if self.intersects(other) || self.adjacent(other) {
            Some(Segment {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            })
        } else {
            None
        }
    }

    /// The segment grown by one position at both ends, clipped to
    /// `[0, upper]`.
    pub fn widened(&self, upper: usize) -> Segment {
        Segment {
            start: self.start.saturating_sub(1),
            end: (self.end + 1).min(upper),
        }
    }

    #[inline]
    pub fn iter(&self) -> SegmentIterator {
        SegmentIterator {
            current: self.start,
            end_exclusive: self.end + 1,
        }
    }
}

impl IntoIterator for Segment {
    type Item = usize;
    type IntoIter = SegmentIterator;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Compresses positions into the minimal sorted list of disjoint,
/// non-adjacent segments. Duplicates are ignored.
pub fn segments_from_positions(positions: &[usize]) -> SmallVec<[Segment; 4]> {
    let mut sorted: SmallVec<[usize; 16]> = positions.iter().copied().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out: SmallVec<[Segment; 4]> = SmallVec::new();
    for p in sorted {
        match out.last_mut() {
            Some(last) if last.end + 1 == p => last.end = p,
            _ => out.push(Segment::single(p)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_len() {
        let s = Segment::new(3, 7);
        assert_eq!(s.start(), 3);
        assert_eq!(s.end(), 7);
        assert_eq!(s.len(), 5);
        assert_eq!(Segment::single(4).len(), 1);
        assert!(Segment::try_new(5, 4).is_none());
    }

    #[test]
    #[should_panic]
    fn test_new_panics_on_reversed() {
        let _ = Segment::new(5, 2);
    }

    #[test]
    fn test_relations() {
        let a = Segment::new(0, 3);
        let b = Segment::new(4, 6);
        let c = Segment::new(3, 5);
        assert!(a.adjacent(b));
        assert!(a.disjoint(b));
        assert!(a.intersects(c));
        assert!(!a.adjacent(c));
        assert!(a.contains(3));
        assert!(!a.contains(4));
        assert!(Segment::new(0, 6).contains_segment(c));
    }

    #[test]
    fn test_union_requires_contact() {
        let a = Segment::new(0, 3);
        assert_eq!(a.union(Segment::new(4, 6)), Some(Segment::new(0, 6)));
        assert_eq!(a.union(Segment::new(2, 9)), Some(Segment::new(0, 9)));
        assert_eq!(a.union(Segment::new(5, 6)), None);
    }

    #[test]
    fn test_widened_clips() {
        assert_eq!(Segment::new(0, 2).widened(9), Segment::new(0, 3));
        assert_eq!(Segment::new(4, 9).widened(9), Segment::new(3, 9));
    }

    #[test]
    fn test_iteration() {
        let s = Segment::new(2, 5);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        assert_eq!(s.iter().rev().collect::<Vec<_>>(), vec![5, 4, 3, 2]);
        assert_eq!(s.iter().len(), 4);
        assert_eq!(format!("{}", s), "[2, 5]");
    }

    #[test]
    fn test_segments_from_positions() {
        let segs = segments_from_positions(&[7, 1, 2, 3, 9, 8, 2]);
        assert_eq!(segs.as_slice(), &[Segment::new(1, 3), Segment::new(7, 9)]);
        let empty = segments_from_positions(&[]);
        assert!(empty.is_empty());
    }
}
