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

//! Branch tours.
//!
//! Every branch node carries a tour that respects all clamps on its path,
//! when one can be found. It is obtained from the parent's tour by local
//! search under a penalized cost, and stored compressed as runs of
//! consecutive positions in a fixed base tour.

use crate::tree::BranchDirection;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tourcut_core::error::{Error, Result};
use tourcut_model::graph::EndPts;
use tourcut_model::heuristics::local_search;
use tourcut_model::instance::Instance;
use tourcut_model::tour::Tour;

/// A maximal stretch of consecutive base-tour positions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Run {
    pub start: u32,
    pub len: u32,
    pub reversed: bool,
}

/// A tour as runs over a base tour, plus its length.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CompressedTour {
    runs: SmallVec<[Run; 8]>,
    length: i64,
}

impl CompressedTour {
    /// Compresses `tour` against a base tour; `base_perm` maps each node to
    /// its base position.
    pub fn compress(tour: &Tour, base_perm: &[usize]) -> Result<Self> {
        let n = base_perm.len();
        if tour.node_count() != n {
            return Err(Error::invalid_input(format!(
                "tour over {} nodes compressed against a base of {}",
                tour.node_count(),
                n
            )));
        }
        let mut runs: SmallVec<[Run; 8]> = SmallVec::new();
        for &node in tour.nodes() {
            let pos = base_perm[node];
            if let Some(run) = runs.last_mut() {
                let last = if run.reversed {
                    (run.start as usize + n - (run.len as usize - 1)) % n
                } else {
                    (run.start as usize + run.len as usize - 1) % n
                };
                let forward = (last + 1) % n == pos;
                let backward = (last + n - 1) % n == pos;
                if run.len == 1 && (forward || backward) {
                    run.reversed = backward && !forward;
                    run.len = 2;
                    continue;
                }
                if (run.reversed && backward) || (!run.reversed && forward) {
                    run.len += 1;
                    continue;
                }
            }
            runs.push(Run {
                start: pos as u32,
                len: 1,
                reversed: false,
            });
        }
        Ok(Self {
            runs,
            length: tour.length(),
        })
    }

    /// The node sequence, given the base order.
    pub fn expand(&self, base: &[usize]) -> Vec<usize> {
        let n = base.len();
        let mut nodes = Vec::with_capacity(n);
        for run in &self.runs {
            for k in 0..run.len as usize {
                let pos = if run.reversed {
                    (run.start as usize + n - k) % n
                } else {
                    (run.start as usize + k) % n
                };
                nodes.push(base[pos]);
            }
        }
        nodes
    }

    /// Rebuilds the tour, given the base order.
    pub fn to_tour(&self, base: &[usize]) -> Result<Tour> {
        Tour::with_length(self.expand(base), self.length)
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    #[inline]
    pub fn length(&self) -> i64 {
        self.length
    }
}

/// Finds a tour close to `parent` that uses every `Up` edge and no `Down`
/// edge of `clamps`. Returns `None` if local search cannot satisfy them.
pub fn repair<I>(
    parent: &Tour,
    clamps: &[(EndPts, BranchDirection)],
    instance: &I,
) -> Option<Tour>
where
    I: Instance + ?Sized,
{
    let satisfied = |tour: &Tour| {
        clamps.iter().all(|&(ends, dir)| match dir {
            BranchDirection::Up => tour.has_edge(ends),
            BranchDirection::Down => !tour.has_edge(ends),
        })
    };
    if satisfied(parent) {
        return Some(parent.clone());
    }

    let n = instance.node_count();
    let mut max_d = 0;
    for u in 0..n {
        for v in (u + 1)..n {
            max_d = max_d.max(instance.distance(u, v));
        }
    }
    let penalty = (n as i64).saturating_mul(max_d).saturating_add(1);
    let down: FxHashSet<EndPts> = clamps
        .iter()
        .filter(|c| c.1 == BranchDirection::Down)
        .map(|c| c.0)
        .collect();
    let up: FxHashSet<EndPts> = clamps
        .iter()
        .filter(|c| c.1 == BranchDirection::Up)
        .map(|c| c.0)
        .collect();
    let cost = |u: usize, v: usize| {
        let ends = EndPts::new(u, v);
        let mut c = instance.distance(u, v);
        if down.contains(&ends) {
            c += penalty;
        }
        if up.contains(&ends) {
            c -= penalty;
        }
        c
    };

    let mut nodes = parent.nodes().to_vec();
    local_search(&mut nodes, cost);
    let tour = Tour::new(nodes, instance).ok()?;
    if satisfied(&tour) {
        log::trace!("repaired branch tour of length {}", tour.length());
        Some(tour)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tourcut_model::instance::EuclideanInstance;

    fn identity_perm(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_identity_is_one_run() {
        let inst = EuclideanInstance::random(8, 100.0, 1);
        let tour = Tour::new((0..8).collect(), &inst).unwrap();
        let c = CompressedTour::compress(&tour, &identity_perm(8)).unwrap();
        assert_eq!(c.runs().len(), 1);
        assert_eq!(c.expand(&identity_perm(8)), tour.nodes());
        assert_eq!(c.length(), tour.length());
    }

    #[test]
    fn test_reversed_segment_and_wrap() {
        let inst = EuclideanInstance::random(8, 100.0, 2);
        let nodes = vec![6, 7, 0, 1, 5, 4, 3, 2];
        let tour = Tour::new(nodes.clone(), &inst).unwrap();
        let base = identity_perm(8);
        let c = CompressedTour::compress(&tour, &base).unwrap();
        assert_eq!(c.runs().len(), 2);
        assert!(!c.runs()[0].reversed);
        assert!(c.runs()[1].reversed);
        assert_eq!(c.expand(&base), nodes);
        assert_eq!(c.to_tour(&base).unwrap().length(), tour.length());
    }

    #[test]
    fn test_shuffled_tours_expand_back() {
        let inst = EuclideanInstance::random(20, 100.0, 3);
        let base_tour = Tour::new((0..20).rev().collect(), &inst).unwrap();
        let base = base_tour.nodes().to_vec();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..10 {
            let mut nodes: Vec<usize> = (0..20).collect();
            nodes.shuffle(&mut rng);
            let tour = Tour::new(nodes.clone(), &inst).unwrap();
            let c = CompressedTour::compress(&tour, base_tour.perm()).unwrap();
            assert_eq!(c.expand(&base), nodes);
        }
    }

    #[test]
    fn test_repair_honours_clamps() {
        let inst = EuclideanInstance::random(12, 100.0, 4);
        let parent = Tour::new((0..12).collect(), &inst).unwrap();
        let clamps = [
            (EndPts::new(0, 1), BranchDirection::Down),
            (EndPts::new(3, 8), BranchDirection::Up),
        ];
        let tour = repair(&parent, &clamps, &inst).unwrap();
        assert!(!tour.has_edge(EndPts::new(0, 1)));
        assert!(tour.has_edge(EndPts::new(3, 8)));
    }

    #[test]
    fn test_repair_keeps_satisfying_parent() {
        let inst = EuclideanInstance::random(6, 100.0, 5);
        let parent = Tour::new((0..6).collect(), &inst).unwrap();
        let clamps = [(EndPts::new(0, 1), BranchDirection::Up)];
        assert_eq!(repair(&parent, &clamps, &inst).unwrap(), parent);
    }

    #[test]
    fn test_repair_rejects_impossible_clamps() {
        let inst = EuclideanInstance::random(6, 100.0, 6);
        let parent = Tour::new((0..6).collect(), &inst).unwrap();
        let clamps = [
            (EndPts::new(0, 1), BranchDirection::Up),
            (EndPts::new(0, 2), BranchDirection::Up),
            (EndPts::new(0, 3), BranchDirection::Up),
        ];
        assert!(repair(&parent, &clamps, &inst).is_none());
    }
}
