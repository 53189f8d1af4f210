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

//! Starting tours and candidate edges.
//!
//! The branch-and-cut core only needs a reasonable reference tour and a
//! sparse candidate edge set to start from. Tours are built by randomized
//! nearest neighbour and improved by 2-opt and or-opt moves. The improvement
//! routines take an arbitrary cost closure so callers can bias them, e.g. to
//! repair a tour towards branching constraints.

use crate::graph::EndPts;
use crate::instance::Instance;
use crate::tour::Tour;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use tourcut_core::error::{Error, Result};

/// Greedy nearest-neighbour tour starting at `start`, ties by node index.
pub fn nearest_neighbor<I>(instance: &I, start: usize) -> Vec<usize>
where
    I: Instance + ?Sized,
{
    let n = instance.node_count();
    let mut visited = vec![false; n];
    let mut nodes = Vec::with_capacity(n);
    nodes.push(start);
    visited[start] = true;

    while nodes.len() < n {
        let Some(&current) = nodes.last() else {
            break;
        };
        let mut best: Option<(i64, usize)> = None;
        for (v, seen) in visited.iter().enumerate() {
            if *seen {
                continue;
            }
            let d = instance.distance(current, v);
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, v));
            }
        }
        if let Some((_, next)) = best {
            nodes.push(next);
            visited[next] = true;
        }
    }
    nodes
}

fn closed_length<F>(nodes: &[usize], cost: &F) -> i64
where
    F: Fn(usize, usize) -> i64,
{
    let n = nodes.len();
    (0..n).map(|i| cost(nodes[i], nodes[(i + 1) % n])).sum()
}

/// One best-improvement 2-opt pass. Returns `true` if a move was applied.
pub fn two_opt_pass<F>(nodes: &mut [usize], cost: &F) -> bool
where
    F: Fn(usize, usize) -> i64,
{
    let n = nodes.len();
    if n < 4 {
        return false;
    }

    let mut best_gain = 0;
    let mut best_move = None;
    for i in 0..(n - 2) {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a, b) = (nodes[i], nodes[i + 1]);
            let (c, d) = (nodes[j], nodes[(j + 1) % n]);
            let gain = cost(a, b) + cost(c, d) - cost(a, c) - cost(b, d);
            if gain > best_gain {
                best_gain = gain;
                best_move = Some((i, j));
            }
        }
    }

    match best_move {
        Some((i, j)) => {
            nodes[(i + 1)..=j].reverse();
            true
        }
        None => false,
    }
}

/// One or-opt pass: moves a segment of 1 to 3 nodes to its best position,
/// possibly reversed. Returns `true` if a move was applied.
pub fn or_opt_pass<F>(nodes: &mut Vec<usize>, cost: &F) -> bool
where
    F: Fn(usize, usize) -> i64,
{
    let n = nodes.len();
    if n < 5 {
        return false;
    }

    for seg_len in 1..=3usize.min(n - 3) {
        for start in 0..n {
            let prev = nodes[(start + n - 1) % n];
            let first = nodes[start];
            let last = nodes[(start + seg_len - 1) % n];
            let next = nodes[(start + seg_len) % n];
            let removal_gain = cost(prev, first) + cost(last, next) - cost(prev, next);

            for offset in 1..(n - seg_len) {
                let p = nodes[(start + seg_len + offset - 1) % n];
                let q = nodes[(start + seg_len + offset) % n];
                let forward = cost(p, first) + cost(last, q) - cost(p, q);
                let backward = cost(p, last) + cost(first, q) - cost(p, q);
                let (insert_cost, reverse) = if backward < forward {
                    (backward, true)
                } else {
                    (forward, false)
                };
                if insert_cost < removal_gain {
                    let mut rotated: Vec<usize> = (0..n).map(|k| nodes[(start + k) % n]).collect();
                    let mut segment: Vec<usize> = rotated.drain(..seg_len).collect();
                    if reverse {
                        segment.reverse();
                    }
                    // `p` now sits at position `offset - 1` of the remainder.
                    let at = offset;
                    rotated.splice(at..at, segment);
                    *nodes = rotated;
                    return true;
                }
            }
        }
    }
    false
}

/// Applies 2-opt and or-opt until neither improves. Returns the final cost.
pub fn local_search<F>(nodes: &mut Vec<usize>, cost: F) -> i64
where
    F: Fn(usize, usize) -> i64,
{
    loop {
        while two_opt_pass(nodes, &cost) {}
        if !or_opt_pass(nodes, &cost) {
            break;
        }
    }
    closed_length(nodes, &cost)
}

/// Best tour over `restarts` randomized nearest-neighbour starts, each
/// improved by local search.
pub fn initial_tour<I>(instance: &I, restarts: usize, seed: u64) -> Result<Tour>
where
    I: Instance + ?Sized,
{
    let n = instance.node_count();
    if n < 3 {
        return Err(Error::invalid_input(format!(
            "a tour needs at least 3 nodes, instance has {}",
            n
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut best: Option<(i64, Vec<usize>)> = None;
    for round in 0..restarts.max(1) {
        let start = if round == 0 { 0 } else { rng.random_range(0..n) };
        let mut nodes = nearest_neighbor(instance, start);
        let length = local_search(&mut nodes, |u, v| instance.distance(u, v));
        log::trace!("starting tour round {} has length {}", round, length);
        if best.as_ref().is_none_or(|(bl, _)| length < *bl) {
            best = Some((length, nodes));
        }
    }

    match best {
        Some((_, nodes)) => Tour::new(nodes, instance),
        None => Err(Error::invalid_input("no starting tour constructed")),
    }
}

/// The `k`-nearest-neighbour edge set together with the edges of `tour`,
/// sorted and without duplicates.
pub fn candidate_edges<I>(instance: &I, k: usize, tour: &Tour) -> Vec<EndPts>
where
    I: Instance + ?Sized,
{
    let mut set: FxHashSet<EndPts> = tour.edges().collect();
    for u in 0..instance.node_count() {
        for v in instance.nearest(u, k) {
            set.insert(EndPts::new(u, v));
        }
    }
    let mut edges: Vec<EndPts> = set.into_iter().collect();
    edges.sort_unstable();
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{EuclideanInstance, MatrixInstance};

    fn square() -> EuclideanInstance {
        EuclideanInstance::new(vec![(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)])
    }

    #[test]
    fn test_nearest_neighbor_visits_every_node() {
        let inst = EuclideanInstance::random(30, 100.0, 3);
        let mut nodes = nearest_neighbor(&inst, 5);
        assert_eq!(nodes[0], 5);
        nodes.sort_unstable();
        assert_eq!(nodes, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_two_opt_removes_crossing() {
        let inst = square();
        // 0 -> 1 -> 2 -> 3 crosses the diagonals.
        let mut nodes = vec![0, 1, 2, 3];
        let cost = |u, v| inst.distance(u, v);
        let before = closed_length(&nodes, &cost);
        assert!(two_opt_pass(&mut nodes, &cost));
        let after = closed_length(&nodes, &cost);
        assert!(after < before);
        assert_eq!(after, 40);
    }

    #[test]
    fn test_or_opt_relocates_single_node() {
        // Points on a line visited as 0, 2, 1, 3, 4.
        let inst = EuclideanInstance::new((0..5).map(|i| (i as f64, 0.0)).collect());
        let cost = |u, v| inst.distance(u, v);
        let mut nodes = vec![0, 2, 1, 3, 4];
        assert_eq!(closed_length(&nodes, &cost), 10);
        assert!(or_opt_pass(&mut nodes, &cost));
        assert!(closed_length(&nodes, &cost) < 10);
        let mut sorted = nodes.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_initial_tour_is_two_opt_optimal_on_square() {
        let inst = square();
        let tour = initial_tour(&inst, 3, 11).unwrap();
        assert_eq!(tour.length(), 40);
    }

    #[test]
    fn test_initial_tour_rejects_tiny_instances() {
        let inst = MatrixInstance::new(2, vec![0, 1, 1, 0]).unwrap();
        assert!(matches!(initial_tour(&inst, 1, 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_candidate_edges_contain_tour_edges() {
        let inst = EuclideanInstance::random(25, 100.0, 9);
        let tour = initial_tour(&inst, 2, 1).unwrap();
        let edges = candidate_edges(&inst, 3, &tour);
        for e in tour.edges() {
            assert!(edges.binary_search(&e).is_ok());
        }
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
        assert!(edges.len() >= 25);
    }
}
