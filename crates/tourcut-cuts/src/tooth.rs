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

//! The tooth bank.
//!
//! A simple tooth is a root node `t` and a body `S` that is a non-wrapping
//! interval of the current reference tour with `t` outside `S`. Its tooth
//! inequality is `2 x(E(S)) + x(E(t:S)) <= 2|S| - 1`; the slack of that
//! inequality is stored with the tooth. Teeth are light when the slack is
//! below one half.
//!
//! Everything here is relative to one reference tour. The bank carries an
//! epoch that changes with the tour, and a generation that changes with
//! every collection; handles and keys remember both and are rejected once
//! either moved on.

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tourcut_core::error::{Error, Result};
use tourcut_core::math::segment::Segment;
use tourcut_lp::support::SupportGraph;
use tourcut_model::tour::Tour;

/// Teeth with slack below this are light.
pub const LIGHT_SLACK: f64 = 0.5;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SimpleTooth {
    /// Tour position of the root.
    pub root: usize,
    /// Tour positions of the body.
    pub body: Segment,
    pub slack: f64,
}

/// Tour-relative identity of a tooth.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ToothKey {
    epoch: u64,
    root: usize,
    start: usize,
    end: usize,
}

impl ToothKey {
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Handle to a tooth of one collection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ToothRef {
    index: usize,
    epoch: u64,
    generation: u64,
}

impl ToothRef {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Clone, Debug)]
pub struct ToothBank {
    epoch: u64,
    generation: u64,
    source_epoch: Option<u64>,
    nodes: Vec<usize>,
    perm: Vec<usize>,
    teeth: Vec<SimpleTooth>,
    lookup: FxHashMap<(usize, usize, usize), usize>,
    by_root: Vec<SmallVec<[usize; 4]>>,
}

impl ToothBank {
    pub fn new(tour: &Tour) -> Self {
        Self {
            epoch: 0,
            generation: 0,
            source_epoch: None,
            nodes: tour.nodes().to_vec(),
            perm: tour.perm().to_vec(),
            teeth: Vec::new(),
            lookup: FxHashMap::default(),
            by_root: vec![SmallVec::new(); tour.node_count()],
        }
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.teeth.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.teeth.is_empty()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The tour the current epoch is relative to.
    #[inline]
    pub fn tour_nodes(&self) -> &[usize] {
        &self.nodes
    }

    #[inline]
    pub fn position(&self, node: usize) -> usize {
        self.perm[node]
    }

    /// Switches to a new reference tour: bumps the epoch and discards all
    /// teeth.
    pub fn rebuild(&mut self, tour: &Tour) {
        self.epoch += 1;
        self.generation += 1;
        self.nodes = tour.nodes().to_vec();
        self.perm = tour.perm().to_vec();
        self.clear_entries();
        self.by_root = vec![SmallVec::new(); tour.node_count()];
        log::trace!("tooth bank rebuilt for epoch {}", self.epoch);
    }

    /// Rebuilds if `tour_epoch` differs from the epoch last synced with.
    /// Returns `true` if a rebuild happened.
    pub fn sync(&mut self, tour: &Tour, tour_epoch: u64) -> bool {
        if self.source_epoch == Some(tour_epoch) && self.nodes == tour.nodes() {
            return false;
        }
        self.rebuild(tour);
        self.source_epoch = Some(tour_epoch);
        true
    }

    fn clear_entries(&mut self) {
        self.teeth.clear();
        self.lookup.clear();
        for list in &mut self.by_root {
            list.clear();
        }
    }

    /// Key of the tooth with root `root_node` and body `body_nodes`.
    ///
    /// The body must be a non-wrapping interval of the current tour that
    /// does not contain the root.
    pub fn key(&self, root_node: usize, body_nodes: &[usize]) -> Result<ToothKey> {
        let n = self.nodes.len();
        if root_node >= n || body_nodes.is_empty() || body_nodes.iter().any(|&v| v >= n) {
            return Err(Error::invalid_input("tooth nodes out of range"));
        }
        let mut positions: SmallVec<[usize; 16]> =
            body_nodes.iter().map(|&v| self.perm[v]).collect();
        positions.sort_unstable();
        positions.dedup();
        let (start, end) = (positions[0], positions[positions.len() - 1]);
        if end - start + 1 != positions.len() {
            return Err(Error::invalid_input(
                "tooth body is not an interval of the tour",
            ));
        }
        let root = self.perm[root_node];
        if start <= root && root <= end {
            return Err(Error::invalid_input("tooth root lies inside its body"));
        }
        Ok(ToothKey {
            epoch: self.epoch,
            root,
            start,
            end,
        })
    }

    /// The key of a stored tooth in the current epoch.
    #[inline]
    pub fn key_of(&self, tooth: &SimpleTooth) -> ToothKey {
        ToothKey {
            epoch: self.epoch,
            root: tooth.root,
            start: tooth.body.start(),
            end: tooth.body.end(),
        }
    }

    /// Looks up a key. Keys from an earlier epoch are rejected.
    pub fn find(&self, key: ToothKey) -> Result<Option<ToothRef>> {
        if key.epoch != self.epoch {
            return Err(Error::cache_consistency(format!(
                "tooth key from epoch {} used in epoch {}",
                key.epoch, self.epoch
            )));
        }
        Ok(self
            .lookup
            .get(&(key.root, key.start, key.end))
            .map(|&index| self.make_ref(index)))
    }

    #[inline]
    fn make_ref(&self, index: usize) -> ToothRef {
        ToothRef {
            index,
            epoch: self.epoch,
            generation: self.generation,
        }
    }

    /// Resolves a handle. Handles from an earlier epoch or collection are
    /// rejected.
    pub fn get(&self, r: ToothRef) -> Result<&SimpleTooth> {
        if r.epoch != self.epoch || r.generation != self.generation {
            return Err(Error::cache_consistency(format!(
                "stale tooth handle {} (epoch {}, current {})",
                r.index, r.epoch, self.epoch
            )));
        }
        self.teeth.get(r.index).ok_or_else(|| {
            Error::cache_consistency(format!("tooth handle {} out of range", r.index))
        })
    }

    /// Inserts a tooth; an existing tooth with the same key keeps the
    /// smaller slack.
    pub fn insert(&mut self, tooth: SimpleTooth) -> ToothRef {
        let id = (tooth.root, tooth.body.start(), tooth.body.end());
        if let Some(&index) = self.lookup.get(&id) {
            let stored = &mut self.teeth[index];
            stored.slack = stored.slack.min(tooth.slack);
            return self.make_ref(index);
        }
        let index = self.teeth.len();
        self.teeth.push(tooth);
        self.lookup.insert(id, index);
        self.by_root[tooth.root].push(index);
        self.make_ref(index)
    }

    #[inline]
    pub fn root_node(&self, tooth: &SimpleTooth) -> usize {
        self.nodes[tooth.root]
    }

    pub fn body_nodes(&self, tooth: &SimpleTooth) -> Vec<usize> {
        tooth.body.iter().map(|p| self.nodes[p]).collect()
    }

    pub fn body_set(&self, tooth: &SimpleTooth) -> FixedBitSet {
        let mut set = FixedBitSet::with_capacity(self.nodes.len());
        for p in tooth.body.iter() {
            set.insert(self.nodes[p]);
        }
        set
    }

    /// All teeth of the current collection with their handles.
    pub fn teeth(&self) -> impl Iterator<Item = (ToothRef, &SimpleTooth)> + '_ {
        self.teeth
            .iter()
            .enumerate()
            .map(|(i, t)| (self.make_ref(i), t))
    }

    /// Teeth rooted at the node `root_node`.
    pub fn teeth_with_root(&self, root_node: usize) -> impl Iterator<Item = &SimpleTooth> + '_ {
        self.by_root[self.perm[root_node]]
            .iter()
            .map(|&i| &self.teeth[i])
    }

    /// Replaces the collection with the light teeth of `support` whose body
    /// has at most `body_limit` nodes. Returns the number found.
    pub fn collect_light(&mut self, support: &SupportGraph, body_limit: usize) -> usize {
        self.generation += 1;
        self.clear_entries();

        let n = self.nodes.len();
        if n < 3 {
            return 0;
        }
        let max_body = body_limit.clamp(1, n - 2);
        let mut in_body = vec![false; n];
        let mut root_sums: FxHashMap<usize, f64> = FxHashMap::default();

        for start in 0..n {
            root_sums.clear();
            let mut inside = 0.0;
            let last = (start + max_body - 1).min(n - 1);
            for end in start..=last {
                let v = self.nodes[end];
                in_body[v] = true;
                root_sums.remove(&v);
                for &(w, x) in support.neighbors(v) {
                    if in_body[w] {
                        inside += x;
                    } else {
                        *root_sums.entry(w).or_insert(0.0) += x;
                    }
                }

                let size = (end - start + 1) as f64;
                let body = Segment::new(start, end);
                let mut found: SmallVec<[SimpleTooth; 8]> = SmallVec::new();
                for (&t, &root_sum) in &root_sums {
                    let slack = (2.0 * size - 1.0) - (2.0 * inside + root_sum);
                    if slack < LIGHT_SLACK - 1e-9 {
                        found.push(SimpleTooth {
                            root: self.perm[t],
                            body,
                            slack: slack.max(0.0),
                        });
                    }
                }
                for tooth in found {
                    self.insert(tooth);
                }
            }
            for p in start..=last {
                in_body[self.nodes[p]] = false;
            }
        }
        log::trace!(
            "collected {} light teeth in epoch {}",
            self.teeth.len(),
            self.epoch
        );
        self.teeth.len()
    }

    /// Checks the lookup tables against the stored teeth.
    pub fn verify(&self) -> Result<()> {
        if self.lookup.len() != self.teeth.len() {
            return Err(Error::cache_consistency(format!(
                "tooth bank indexes {} keys for {} teeth",
                self.lookup.len(),
                self.teeth.len()
            )));
        }
        for (i, t) in self.teeth.iter().enumerate() {
            if t.body.contains(t.root) {
                return Err(Error::cache_consistency(format!(
                    "tooth {} has its root inside the body",
                    i
                )));
            }
            if self.lookup.get(&(t.root, t.body.start(), t.body.end())) != Some(&i) {
                return Err(Error::cache_consistency(format!(
                    "tooth {} is missing from the lookup",
                    i
                )));
            }
            if !self.by_root[t.root].contains(&i) {
                return Err(Error::cache_consistency(format!(
                    "tooth {} is missing from its root list",
                    i
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_model::graph::{CoreGraph, EndPts};
    use tourcut_model::instance::MatrixInstance;

    fn tour(order: Vec<usize>) -> Tour {
        let inst = MatrixInstance::from_fn(order.len(), |_, _| 1).unwrap();
        Tour::new(order, &inst).unwrap()
    }

    /// Prism support: triangles at 1/2, connectors at 1.
    fn prism_support() -> SupportGraph {
        let mut g = CoreGraph::new(6);
        let mut x = Vec::new();
        for (u, v, val) in [
            (0, 1, 0.5),
            (1, 2, 0.5),
            (0, 2, 0.5),
            (3, 4, 0.5),
            (4, 5, 0.5),
            (3, 5, 0.5),
            (0, 3, 1.0),
            (1, 4, 1.0),
            (2, 5, 1.0),
        ] {
            g.add_edge(EndPts::new(u, v), 1);
            x.push(val);
        }
        SupportGraph::new(&g, &x)
    }

    #[test]
    fn test_key_validates_body() {
        let bank = ToothBank::new(&tour(vec![0, 1, 2, 3, 4, 5]));
        let key = bank.key(0, &[2, 3]).unwrap();
        assert_eq!(key.epoch(), 0);
        assert!(bank.key(2, &[2, 3]).is_err());
        assert!(bank.key(0, &[2, 4]).is_err());
        assert!(bank.key(9, &[2]).is_err());
    }

    #[test]
    fn test_stale_refs_and_keys_after_rebuild() {
        let t = tour(vec![0, 1, 2, 3, 4, 5]);
        let mut bank = ToothBank::new(&t);
        let r = bank.insert(SimpleTooth {
            root: 0,
            body: Segment::new(2, 3),
            slack: 0.25,
        });
        let key = bank.key(0, &[2, 3]).unwrap();
        assert_eq!(bank.find(key).unwrap(), Some(r));
        assert_eq!(bank.get(r).unwrap().slack, 0.25);

        bank.rebuild(&tour(vec![0, 2, 1, 3, 5, 4]));
        assert_eq!(bank.epoch(), 1);
        assert!(bank.is_empty());
        assert!(matches!(bank.get(r), Err(Error::CacheConsistency(_))));
        assert!(matches!(bank.find(key), Err(Error::CacheConsistency(_))));
    }

    #[test]
    fn test_insert_keeps_smaller_slack() {
        let mut bank = ToothBank::new(&tour(vec![0, 1, 2, 3]));
        let a = bank.insert(SimpleTooth {
            root: 0,
            body: Segment::new(1, 2),
            slack: 0.4,
        });
        let b = bank.insert(SimpleTooth {
            root: 0,
            body: Segment::new(1, 2),
            slack: 0.1,
        });
        assert_eq!(a, b);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get(a).unwrap().slack, 0.1);
        bank.verify().unwrap();
    }

    #[test]
    fn test_collect_light_teeth_on_prism() {
        let t = tour(vec![0, 1, 2, 5, 4, 3]);
        let mut bank = ToothBank::new(&t);
        let count = bank.collect_light(&prism_support(), 3);
        assert!(count > 0);
        bank.verify().unwrap();

        // Root 0 with body {3}: 2 * 0 + x(0, 3) = 1 = 2|S| - 1, slack 0.
        let key = bank.key(0, &[3]).unwrap();
        let r = bank.find(key).unwrap().unwrap();
        let tooth = *bank.get(r).unwrap();
        assert!(tooth.slack.abs() < 1e-9);
        assert_eq!(bank.root_node(&tooth), 0);
        assert_eq!(bank.body_nodes(&tooth), vec![3]);
        assert!(bank.teeth_with_root(0).any(|t| t.body == tooth.body));
        assert!(bank.teeth().all(|(_, t)| t.slack < LIGHT_SLACK));
    }

    #[test]
    fn test_new_collection_invalidates_refs() {
        let t = tour(vec![0, 1, 2, 5, 4, 3]);
        let mut bank = ToothBank::new(&t);
        bank.collect_light(&prism_support(), 2);
        let (r, _) = bank.teeth().next().unwrap();
        bank.collect_light(&prism_support(), 2);
        assert!(bank.get(r).is_err());
    }

    #[test]
    fn test_sync_rebuilds_once_per_epoch() {
        let t = tour(vec![0, 1, 2, 3]);
        let mut bank = ToothBank::new(&t);
        assert!(bank.sync(&t, 7));
        assert!(!bank.sync(&t, 7));
        assert!(bank.sync(&t, 8));
        assert_eq!(bank.epoch(), 2);
    }
}
