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

//! The clique bank.
//!
//! A clique is a node subset stored as the minimal sorted list of segments
//! of positions in the bank's saved tour. Because the saved tour never
//! changes, entries stay valid when the search moves to another reference
//! tour. Entries are content addressed: interning a subset that is already
//! present only bumps its reference count. Hash buckets hold every entry
//! with that hash and lookups compare the full segment list, so a collision
//! can never merge two distinct subsets.

use crate::index::CliqueRef;
use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tourcut_core::error::{Error, Result};
use tourcut_core::math::segment::{Segment, segments_from_positions};
use tourcut_model::tour::Tour;

/// A node subset as segments of saved-tour positions.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Clique {
    segments: SmallVec<[Segment; 4]>,
}

impl Clique {
    /// Builds the canonical clique of a set of positions.
    pub fn from_positions(positions: &[usize]) -> Self {
        Self {
            segments: segments_from_positions(positions),
        }
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    #[inline]
    pub fn contains_position(&self, position: usize) -> bool {
        self.segments.iter().any(|s| s.contains(position))
    }

    /// `h = h * 65537 + start * 4099 + end` over the segments.
    pub fn hash_key(&self) -> u64 {
        self.segments.iter().fold(0u64, |h, s| {
            h.wrapping_mul(65537)
                .wrapping_add((s.start() as u64).wrapping_mul(4099))
                .wrapping_add(s.end() as u64)
        })
    }

    /// The nodes of the clique, given the tour it was keyed against.
    pub fn nodes(&self, tour_nodes: &[usize]) -> Vec<usize> {
        let mut nodes: Vec<usize> = self
            .segments
            .iter()
            .flat_map(|s| s.iter())
            .map(|p| tour_nodes[p])
            .collect();
        nodes.sort_unstable();
        nodes
    }
}

#[derive(Clone, Debug)]
struct CliqueEntry {
    clique: Clique,
    ref_count: usize,
    key: u64,
}

#[derive(Clone, Debug)]
pub struct CliqueBank {
    saved_nodes: Vec<usize>,
    saved_perm: Vec<usize>,
    entries: Vec<Option<CliqueEntry>>,
    by_key: FxHashMap<u64, SmallVec<[CliqueRef; 2]>>,
    free: Vec<usize>,
    live: usize,
}

impl CliqueBank {
    /// Creates an empty bank keyed against `tour`.
    pub fn new(tour: &Tour) -> Self {
        Self {
            saved_nodes: tour.nodes().to_vec(),
            saved_perm: tour.perm().to_vec(),
            entries: Vec::new(),
            by_key: FxHashMap::default(),
            free: Vec::new(),
            live: 0,
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.saved_nodes.len()
    }

    /// Number of live cliques.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// The tour the bank was keyed against.
    #[inline]
    pub fn saved_nodes(&self) -> &[usize] {
        &self.saved_nodes
    }

    /// The canonical clique of a node subset.
    pub fn clique_of(&self, nodes: &[usize]) -> Result<Clique> {
        if nodes.is_empty() {
            return Err(Error::invalid_input("cannot build a clique of no nodes"));
        }
        let mut positions: SmallVec<[usize; 16]> = SmallVec::with_capacity(nodes.len());
        for &v in nodes {
            let p = self.saved_perm.get(v).copied().ok_or_else(|| {
                Error::invalid_input(format!(
                    "node {} is out of range for {} nodes",
                    v,
                    self.saved_perm.len()
                ))
            })?;
            positions.push(p);
        }
        Ok(Clique::from_positions(&positions))
    }

    /// Interns a node subset.
    pub fn intern(&mut self, nodes: &[usize]) -> Result<CliqueRef> {
        let clique = self.clique_of(nodes)?;
        Ok(self.intern_clique(clique))
    }

    /// Interns a canonical clique: an equal live entry gains a reference,
    /// otherwise a new entry with count one is created.
    pub fn intern_clique(&mut self, clique: Clique) -> CliqueRef {
        let key = clique.hash_key();
        if let Some(bucket) = self.by_key.get(&key) {
            for &r in bucket {
                if let Some(Some(entry)) = self.entries.get_mut(r.get())
                    && entry.clique == clique
                {
                    entry.ref_count += 1;
                    return r;
                }
            }
        }

        let entry = CliqueEntry {
            clique,
            ref_count: 1,
            key,
        };
        let r = match self.free.pop() {
            Some(slot) => {
                self.entries[slot] = Some(entry);
                CliqueRef::new(slot)
            }
            None => {
                self.entries.push(Some(entry));
                CliqueRef::new(self.entries.len() - 1)
            }
        };
        self.by_key.entry(key).or_default().push(r);
        self.live += 1;
        r
    }

    fn entry(&self, r: CliqueRef) -> Result<&CliqueEntry> {
        match self.entries.get(r.get()) {
            Some(Some(entry)) => Ok(entry),
            _ => Err(Error::cache_consistency(format!("{} is not a live clique", r))),
        }
    }

    /// Drops one reference; the entry is deleted when none remain.
    pub fn release(&mut self, r: CliqueRef) -> Result<()> {
        let Some(Some(entry)) = self.entries.get_mut(r.get()) else {
            return Err(Error::cache_consistency(format!(
                "release of dead clique {}",
                r
            )));
        };
        if entry.ref_count == 0 {
            return Err(Error::cache_consistency(format!(
                "reference count underflow on {}",
                r
            )));
        }
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return Ok(());
        }

        let key = entry.key;
        self.entries[r.get()] = None;
        if let Some(bucket) = self.by_key.get_mut(&key) {
            bucket.retain(|other| *other != r);
            if bucket.is_empty() {
                self.by_key.remove(&key);
            }
        }
        self.free.push(r.get());
        self.live -= 1;
        Ok(())
    }

    pub fn get(&self, r: CliqueRef) -> Result<&Clique> {
        self.entry(r).map(|e| &e.clique)
    }

    pub fn ref_count(&self, r: CliqueRef) -> Result<usize> {
        self.entry(r).map(|e| e.ref_count)
    }

    /// The sorted nodes of a live clique.
    pub fn nodes(&self, r: CliqueRef) -> Result<Vec<usize>> {
        Ok(self.get(r)?.nodes(&self.saved_nodes))
    }

    /// The nodes of a live clique as a bit set over all nodes.
    pub fn bitset(&self, r: CliqueRef) -> Result<FixedBitSet> {
        let clique = self.get(r)?;
        let mut set = FixedBitSet::with_capacity(self.node_count());
        for s in clique.segments() {
            for p in s.iter() {
                set.insert(self.saved_nodes[p]);
            }
        }
        Ok(set)
    }

    /// Checks the dedup invariant and the hash index.
    pub fn verify(&self) -> Result<()> {
        let mut seen: FxHashMap<&Clique, usize> = FxHashMap::default();
        let mut live = 0;
        for (slot, entry) in self.entries.iter().enumerate() {
            let Some(entry) = entry else {
                continue;
            };
            live += 1;
            if entry.ref_count == 0 {
                return Err(Error::cache_consistency(format!(
                    "clique slot {} is live with zero references",
                    slot
                )));
            }
            if entry.key != entry.clique.hash_key() {
                return Err(Error::cache_consistency(format!(
                    "clique slot {} has a stale hash key",
                    slot
                )));
            }
            if let Some(other) = seen.insert(&entry.clique, slot) {
                return Err(Error::cache_consistency(format!(
                    "clique slots {} and {} hold the same subset",
                    other, slot
                )));
            }
            let indexed = self
                .by_key
                .get(&entry.key)
                .is_some_and(|b| b.contains(&CliqueRef::new(slot)));
            if !indexed {
                return Err(Error::cache_consistency(format!(
                    "clique slot {} is missing from the hash index",
                    slot
                )));
            }
        }
        if live != self.live {
            return Err(Error::cache_consistency(format!(
                "clique bank counts {} live entries but holds {}",
                self.live, live
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_model::instance::MatrixInstance;

    fn bank(order: Vec<usize>) -> CliqueBank {
        let n = order.len();
        let inst = MatrixInstance::from_fn(n, |_, _| 1).unwrap();
        CliqueBank::new(&Tour::new(order, &inst).unwrap())
    }

    #[test]
    fn test_clique_is_canonical_segments() {
        let b = bank(vec![3, 0, 1, 4, 2, 5]);
        // Positions of 0, 1, 2 are 1, 2, 4.
        let c = b.clique_of(&[2, 1, 0]).unwrap();
        assert_eq!(c.segments(), &[Segment::new(1, 2), Segment::new(4, 4)]);
        assert_eq!(c.size(), 3);
        assert_eq!(c.nodes(b.saved_nodes()), vec![0, 1, 2]);
        assert!(c.contains_position(4));
        assert!(!c.contains_position(3));
    }

    #[test]
    fn test_intern_twice_then_release_twice() {
        let mut b = bank((0..8).collect());
        let r1 = b.intern(&[1, 2, 3]).unwrap();
        let r2 = b.intern(&[3, 2, 1]).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(b.ref_count(r1).unwrap(), 2);
        assert_eq!(b.len(), 1);

        b.release(r1).unwrap();
        assert_eq!(b.ref_count(r1).unwrap(), 1);
        b.release(r1).unwrap();
        assert!(b.is_empty());
        assert!(matches!(b.get(r1), Err(Error::CacheConsistency(_))));
        assert!(matches!(b.release(r1), Err(Error::CacheConsistency(_))));
        b.verify().unwrap();
    }

    #[test]
    fn test_free_slots_are_reused() {
        let mut b = bank((0..8).collect());
        let a = b.intern(&[0, 1]).unwrap();
        let c = b.intern(&[4, 5, 6]).unwrap();
        b.release(a).unwrap();
        let d = b.intern(&[2]).unwrap();
        assert_eq!(d, a);
        assert_ne!(c, d);
        assert_eq!(b.nodes(c).unwrap(), vec![4, 5, 6]);
        assert_eq!(b.bitset(c).unwrap().ones().collect::<Vec<_>>(), vec![4, 5, 6]);
        b.verify().unwrap();
    }

    #[test]
    fn test_colliding_keys_stay_distinct() {
        // Force two different cliques into one bucket.
        let mut b = bank((0..6).collect());
        let a = b.intern(&[0, 1]).unwrap();
        let other = Clique::from_positions(&[3, 4]);
        let key_a = b.get(a).unwrap().hash_key();
        b.entries.push(Some(CliqueEntry {
            clique: other.clone(),
            ref_count: 1,
            key: key_a,
        }));
        let forced = CliqueRef::new(b.entries.len() - 1);
        b.by_key.entry(key_a).or_default().push(forced);
        b.live += 1;

        // Interning {0, 1} must still find the first entry.
        assert_eq!(b.intern(&[0, 1]).unwrap(), a);
        assert_eq!(b.ref_count(forced).unwrap(), 1);
        // The forced entry carries a key that does not match its contents.
        assert!(matches!(b.verify(), Err(Error::CacheConsistency(_))));
    }

    #[test]
    fn test_out_of_range_nodes_are_rejected() {
        let mut b = bank((0..4).collect());
        assert!(matches!(b.intern(&[7]), Err(Error::InvalidInput(_))));
        assert!(matches!(b.intern(&[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_hash_key_formula() {
        let c = Clique::from_positions(&[2, 3, 7]);
        let expected = (2u64 * 4099 + 3) * 65537 + 7 * 4099 + 7;
        assert_eq!(c.hash_key(), expected);
    }
}
