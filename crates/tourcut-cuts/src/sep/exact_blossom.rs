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

//! Exact blossom separation.
//!
//! Edge weights are `min(x, 1 - x)` and a node is odd when it meets an odd
//! number of edges above one half. A blossom with handle `H` is violated
//! exactly when `delta(H)` holds an odd number of odd nodes on one side and
//! weighs less than one; the lightest such cut lies among the cuts of a
//! Gomory-Hu tree, built here with Gusfield's method over augmenting-path
//! max flows. The teeth are the edges above one half that cross the cut.

use super::SeparationContext;
use crate::hypergraph::ExpandedCut;
use fixedbitset::FixedBitSet;
use std::collections::VecDeque;
use tourcut_core::error::Result;
use tourcut_core::tolerance::{EPS_CUT, EPS_ZERO};

#[derive(Clone, Copy, Debug)]
struct Arc {
    to: usize,
    rev: usize,
    cap: f64,
}

/// Undirected network for repeated max-flow runs.
#[derive(Clone, Debug)]
struct FlowNetwork {
    arcs: Vec<Vec<Arc>>,
}

impl FlowNetwork {
    fn new(node_count: usize) -> Self {
        Self {
            arcs: vec![Vec::new(); node_count],
        }
    }

    fn add_edge(&mut self, u: usize, v: usize, cap: f64) {
        let (ru, rv) = (self.arcs[v].len(), self.arcs[u].len());
        self.arcs[u].push(Arc { to: v, rev: ru, cap });
        self.arcs[v].push(Arc { to: u, rev: rv, cap });
    }

    /// Max flow from `s` to `t` and the source side of a minimum cut.
    fn min_cut(&self, s: usize, t: usize) -> (f64, FixedBitSet) {
        let n = self.arcs.len();
        let mut residual = self.arcs.clone();
        let mut flow = 0.0;
        loop {
            // Breadth-first search for a shortest augmenting path.
            let mut pred: Vec<Option<(usize, usize)>> = vec![None; n];
            let mut reached = FixedBitSet::with_capacity(n);
            reached.insert(s);
            let mut queue = VecDeque::from([s]);
            while let Some(u) = queue.pop_front() {
                if u == t {
                    break;
                }
                for (i, arc) in residual[u].iter().enumerate() {
                    if arc.cap > EPS_ZERO && !reached.put(arc.to) {
                        pred[arc.to] = Some((u, i));
                        queue.push_back(arc.to);
                    }
                }
            }
            if !reached.contains(t) {
                return (flow, reached);
            }
            let mut bottleneck = f64::INFINITY;
            let mut v = t;
            while let Some((u, i)) = pred[v] {
                bottleneck = bottleneck.min(residual[u][i].cap);
                v = u;
            }
            let mut v = t;
            while let Some((u, i)) = pred[v] {
                residual[u][i].cap -= bottleneck;
                let rev = residual[u][i].rev;
                residual[v][rev].cap += bottleneck;
                v = u;
            }
            flow += bottleneck;
        }
    }
}

/// Source sides of a Gomory-Hu tree: for every `s > 0`, the minimum cut
/// found between `s` and its parent and the subtree of `s` in the final
/// tree rooted at `0`.
fn gomory_hu_cuts(network: &FlowNetwork) -> Vec<(f64, FixedBitSet)> {
    let n = network.arcs.len();
    let mut parent = vec![0usize; n];
    let mut cuts = Vec::with_capacity(2 * n);
    let mut weight = vec![0.0; n];
    for s in 1..n {
        let (value, side) = network.min_cut(s, parent[s]);
        weight[s] = value;
        for j in (s + 1)..n {
            if side.contains(j) && parent[j] == parent[s] {
                parent[j] = s;
            }
        }
        cuts.push((value, side));
    }
    // Parents precede children, so a reverse sweep accumulates subtrees.
    let mut subtree: Vec<FixedBitSet> = (0..n)
        .map(|v| {
            let mut set = FixedBitSet::with_capacity(n);
            set.insert(v);
            set
        })
        .collect();
    for v in (1..n).rev() {
        let below = subtree[v].clone();
        subtree[parent[v]].union_with(&below);
        cuts.push((weight[v], below));
    }
    cuts
}

pub(super) fn separate(ctx: &SeparationContext<'_>) -> Result<Vec<(ExpandedCut, f64)>> {
    let n = ctx.node_count();
    let support = ctx.support;
    if n < 6 {
        return Ok(Vec::new());
    }

    let mut network = FlowNetwork::new(n);
    let mut odd = FixedBitSet::with_capacity(n);
    for e in support.edges() {
        let (u, v) = (e.ends.u(), e.ends.v());
        let weight = e.value.min(1.0 - e.value);
        if weight > EPS_ZERO {
            network.add_edge(u, v, weight);
        }
        if e.value > 0.5 {
            odd.toggle(u);
            odd.toggle(v);
        }
    }
    if odd.count_ones(..) == 0 {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut tried: Vec<FixedBitSet> = Vec::new();
    for (value, side) in gomory_hu_cuts(&network) {
        if value >= 1.0 - EPS_CUT {
            continue;
        }
        let mut inside = side.clone();
        inside.intersect_with(&odd);
        if inside.count_ones(..) % 2 == 0 {
            continue;
        }
        let size = side.count_ones(..);
        let handle = if 2 * size <= n {
            side
        } else {
            let mut complement = side;
            complement.toggle_range(..);
            complement
        };
        if handle.count_ones(..) < 2 || tried.contains(&handle) {
            continue;
        }

        let teeth: Vec<Vec<usize>> = support
            .edges()
            .iter()
            .filter(|e| e.value > 0.5 && handle.contains(e.ends.u()) != handle.contains(e.ends.v()))
            .map(|e| vec![e.ends.u(), e.ends.v()])
            .collect();
        let mut ends = FixedBitSet::with_capacity(n);
        let disjoint = teeth.iter().flatten().all(|&v| !ends.put(v));
        if teeth.len() >= 3 && disjoint {
            let nodes: Vec<usize> = handle.ones().collect();
            let cut = ExpandedCut::comb(n, &nodes, &teeth)?;
            let violation = cut.violation(support);
            found.push((cut, violation));
        }
        tried.push(handle);
    }
    Ok(found)
}
