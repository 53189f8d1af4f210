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

//! Exact subtour separation by Stoer-Wagner minimum cuts.
//!
//! Every cut-of-the-phase below 2 is reported, not only the global minimum,
//! so one call usually yields several subtour cuts.

use super::SeparationContext;
use crate::hypergraph::ExpandedCut;
use fixedbitset::FixedBitSet;
use tourcut_core::error::Result;
use tourcut_core::tolerance::EPS_CUT;

/// Phase cuts of the weighted graph `weights` (dense, symmetric) with value
/// below `threshold`, as node lists with their values.
pub(super) fn phase_cuts(weights: &[Vec<f64>], threshold: f64) -> Vec<(Vec<usize>, f64)> {
    let n = weights.len();
    let mut w: Vec<Vec<f64>> = weights.to_vec();
    let mut groups: Vec<Vec<usize>> = (0..n).map(|v| vec![v]).collect();
    let mut active: Vec<usize> = (0..n).collect();
    let mut out = Vec::new();

    while active.len() > 1 {
        let mut added = vec![false; n];
        let mut key = vec![0.0; n];
        let mut prev = active[0];
        let mut last = active[0];
        added[last] = true;
        for &v in &active {
            key[v] = w[last][v];
        }
        for _ in 1..active.len() {
            let mut next = usize::MAX;
            let mut best = f64::NEG_INFINITY;
            for &v in &active {
                if !added[v] && key[v] > best {
                    best = key[v];
                    next = v;
                }
            }
            added[next] = true;
            prev = last;
            last = next;
            for &v in &active {
                if !added[v] {
                    key[v] += w[next][v];
                }
            }
        }

        let value = key[last];
        if value < threshold {
            let mut nodes = groups[last].clone();
            nodes.sort_unstable();
            out.push((nodes, value));
        }

        // Merge `last` into `prev`.
        let moved = std::mem::take(&mut groups[last]);
        groups[prev].extend(moved);
        for &v in &active {
            let merged = w[prev][v] + w[last][v];
            w[prev][v] = merged;
            w[v][prev] = merged;
        }
        w[prev][prev] = 0.0;
        active.retain(|&v| v != last);
    }
    out
}

pub(super) fn separate(ctx: &SeparationContext<'_>) -> Result<Vec<(ExpandedCut, f64)>> {
    let n = ctx.node_count();
    if n < 4 {
        return Ok(Vec::new());
    }
    let mut weights = vec![vec![0.0; n]; n];
    for e in ctx.support.edges() {
        weights[e.ends.u()][e.ends.v()] += e.value;
        weights[e.ends.v()][e.ends.u()] += e.value;
    }

    let mut found = Vec::new();
    let mut seen: Vec<FixedBitSet> = Vec::new();
    for (nodes, value) in phase_cuts(&weights, 2.0 - EPS_CUT) {
        if nodes.len() < 2 || nodes.len() > n - 2 {
            continue;
        }
        let mut set = FixedBitSet::with_capacity(n);
        set.extend(nodes.iter().copied());
        let mut complement = set.clone();
        complement.toggle_range(..);
        if seen.iter().any(|s| *s == set || *s == complement) {
            continue;
        }
        seen.push(set);
        found.push((ExpandedCut::subtour(n, &nodes)?, 2.0 - value));
    }
    Ok(found)
}
