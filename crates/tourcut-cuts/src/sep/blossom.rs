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

//! Fast blossoms from odd components.
//!
//! The handles are the components of the fractional subgraph. The teeth of
//! a handle are its boundary edges at one. When two teeth share an outer
//! node that node joins the handle and both teeth are dropped; this repeats
//! until the teeth are disjoint. A handle left with an odd number of at
//! least three teeth gives a blossom.

use super::SeparationContext;
use crate::hypergraph::ExpandedCut;
use fixedbitset::FixedBitSet;
use tourcut_core::error::Result;
use tourcut_core::tolerance::{EPS_INTEGRAL, is_one};

pub(super) fn separate(ctx: &SeparationContext<'_>) -> Result<Vec<(ExpandedCut, f64)>> {
    let n = ctx.node_count();
    let support = ctx.support;
    let mut found = Vec::new();

    for component in support.fractional_components() {
        let mut handle = FixedBitSet::with_capacity(n);
        handle.extend(component.iter().copied());

        let teeth = loop {
            let mut teeth: Vec<(usize, usize)> = Vec::new();
            for u in handle.ones() {
                for &(w, x) in support.neighbors(u) {
                    if !handle.contains(w) && is_one(x, EPS_INTEGRAL) {
                        teeth.push((u, w));
                    }
                }
            }
            let mut outer_seen = FixedBitSet::with_capacity(n);
            let mut shared = Vec::new();
            for &(_, w) in &teeth {
                if outer_seen.contains(w) {
                    shared.push(w);
                }
                outer_seen.insert(w);
            }
            if shared.is_empty() {
                break teeth;
            }
            for w in shared {
                handle.insert(w);
            }
        };

        let k = teeth.len();
        if k < 3 || k % 2 == 0 {
            continue;
        }
        let mut inner_seen = FixedBitSet::with_capacity(n);
        if teeth.iter().any(|&(u, _)| inner_seen.put(u)) {
            continue;
        }
        let handle_nodes: Vec<usize> = handle.ones().collect();
        let tooth_sets: Vec<Vec<usize>> = teeth.iter().map(|&(u, w)| vec![u, w]).collect();
        let cut = ExpandedCut::comb(n, &handle_nodes, &tooth_sets)?;
        let violation = cut.violation(support);
        found.push((cut, violation));
    }
    Ok(found)
}
