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

//! # Strongly Typed Indices
//!
//! LP columns, LP rows, clique and tooth handles, stored cuts and branch
//! nodes are all positions in some vector. `TypedIndex<T>` wraps the
//! position in a zero-cost newtype tagged by `T`, so an edge index cannot be
//! passed where a row index is expected.
//!
//! ```rust
//! use tourcut_core::utils::index::{TypedIndex, TypedIndexTag};
//!
//! #[derive(Clone)]
//! struct RowTag;
//! impl TypedIndexTag for RowTag { const NAME: &'static str = "RowIndex"; }
//!
//! type RowIndex = TypedIndex<RowTag>;
//! let r = RowIndex::new(3);
//! assert_eq!(r.get(), 3);
//! assert_eq!(r.to_string(), "RowIndex(3)");
//! ```

/// Names an index family in `Debug` and `Display` output.
pub trait TypedIndexTag: Clone {
    const NAME: &'static str;
}

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypedIndex<T> {
    index: usize,
    _tag: std::marker::PhantomData<T>,
}

impl<T> TypedIndex<T> {
    #[inline(always)]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            _tag: std::marker::PhantomData,
        }
    }

    #[inline(always)]
    pub const fn get(&self) -> usize {
        self.index
    }

    /// Follows a deletion map (`delstat[old] = Some(new)` for survivors).
    ///
    /// `None` if the index was deleted or lies past the end of the map.
    #[inline]
    pub fn renumbered(&self, delstat: &[Option<usize>]) -> Option<Self> {
        match delstat.get(self.index) {
            Some(&Some(new)) => Some(Self::new(new)),
            _ => None,
        }
    }
}

impl<T: TypedIndexTag> std::fmt::Debug for TypedIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl<T: TypedIndexTag> std::fmt::Display for TypedIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", T::NAME, self.index)
    }
}

impl<T> From<usize> for TypedIndex<T> {
    #[inline]
    fn from(index: usize) -> Self {
        Self::new(index)
    }
}

impl<T> From<TypedIndex<T>> for usize {
    #[inline]
    fn from(index: TypedIndex<T>) -> Self {
        index.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
    struct CutTag;

    impl TypedIndexTag for CutTag {
        const NAME: &'static str = "CutIndex";
    }

    type CutIndex = TypedIndex<CutTag>;

    #[test]
    fn test_usize_round_trip_and_order() {
        let a: CutIndex = 4.into();
        let b = CutIndex::new(9);
        assert_eq!(usize::from(a), 4);
        assert!(a < b);
        assert_eq!(a.to_string(), "CutIndex(4)");
        assert_eq!(format!("{:?}", b), "CutIndex(9)");
    }

    #[test]
    fn test_renumbered_follows_delstat() {
        // Rows 0 and 2 survive, row 1 was deleted.
        let delstat = vec![Some(0), None, Some(1)];
        assert_eq!(CutIndex::new(0).renumbered(&delstat), Some(CutIndex::new(0)));
        assert_eq!(CutIndex::new(1).renumbered(&delstat), None);
        assert_eq!(CutIndex::new(2).renumbered(&delstat), Some(CutIndex::new(1)));
        assert_eq!(CutIndex::new(9).renumbered(&delstat), None);
    }
}
