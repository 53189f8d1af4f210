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

//! Combs over tour intervals.
//!
//! Every interval of the reference tour with three to `n / 2` nodes is
//! tried as a handle. Candidate teeth are the edges above one half and the
//! subtour sets of stored and pooled cuts, each valued at `x(delta(T))`.
//! For a handle the lightest disjoint teeth that meet and leave it are taken
//! greedily while they weigh less than three; an even count drops the
//! heaviest.

use super::{SeparationConfig, SeparationContext};
use crate::hypergraph::{CutKind, ExpandedCut};
use fixedbitset::FixedBitSet;
use tourcut_core::error::Result;
use tourcut_core::tolerance::EPS_CUT;

#[derive(Clone, Debug)]
struct Tooth {
    nodes: FixedBitSet,
    value: f64,
}

impl Tooth {
    fn straddles(&self, handle: &FixedBitSet) -> bool {
        let size = self.nodes.count_ones(..);
        let inside = self.nodes.intersection(handle).count();
        inside > 0 && inside < size
    }
}

fn candidate_teeth(ctx: &SeparationContext<'_>) -> Vec<Tooth> {
    let n = ctx.node_count();
    let support = ctx.support;
    let mut teeth: Vec<Tooth> = support
        .edges()
        .iter()
        .filter(|e| e.value > 0.5)
        .map(|e| {
            let mut nodes = FixedBitSet::with_capacity(n);
            nodes.insert(e.ends.u());
            nodes.insert(e.ends.v());
            Tooth {
                value: support.cut_value(&nodes),
                nodes,
            }
        })
        .collect();

    let stored = ctx
        .store
        .iter_expanded()
        .map(|(_, cut)| cut.clone())
        .chain(ctx.pool.iter().filter_map(|r| ExpandedCut::from_record(n, r).ok()));
    for cut in stored {
        if cut.kind() != CutKind::Subtour {
            continue;
        }
        let nodes = cut.handle().clone();
        let size = nodes.count_ones(..);
        if size < 2 || size + 2 > n || teeth.iter().any(|t| t.nodes == nodes) {
            continue;
        }
        let value = support.cut_value(&nodes);
        if value < 3.0 - EPS_CUT {
            teeth.push(Tooth { nodes, value });
        }
    }
    teeth.sort_by(|a, b| a.value.total_cmp(&b.value));
    teeth
}

pub(super) fn separate(
    ctx: &SeparationContext<'_>,
    config: &SeparationConfig,
) -> Result<Vec<(ExpandedCut, f64)>> {
    let n = ctx.node_count();
    let support = ctx.support;
    let tour = ctx.tour;
    let max_size = (n / 2).min(config.handle_candidate_limit);
    if max_size < 3 {
        return Ok(Vec::new());
    }
    let teeth = candidate_teeth(ctx);
    if teeth.len() < 3 {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for start in 0..n {
        let mut handle = FixedBitSet::with_capacity(n);
        for size in 1..=max_size {
            handle.insert(tour.node_at((start + size - 1) % n));
            // Intervals of size n / 2 are met twice for even n.
            if size < 3 || (2 * size == n && start >= n / 2) {
                continue;
            }

            let mut used = FixedBitSet::with_capacity(n);
            let mut chosen: Vec<&Tooth> = Vec::new();
            for tooth in &teeth {
                if tooth.value >= 3.0 - EPS_CUT {
                    break;
                }
                if tooth.straddles(&handle) && tooth.nodes.is_disjoint(&used) {
                    used.union_with(&tooth.nodes);
                    chosen.push(tooth);
                }
            }
            if chosen.len() % 2 == 0 {
                chosen.pop();
            }
            if chosen.len() < 3 {
                continue;
            }
            let k = chosen.len() as f64;
            let slack = support.cut_value(&handle) + chosen.iter().map(|t| t.value).sum::<f64>();
            if slack >= 3.0 * k + 1.0 - EPS_CUT {
                continue;
            }

            let nodes: Vec<usize> = handle.ones().collect();
            let sets: Vec<Vec<usize>> = chosen.iter().map(|t| t.nodes.ones().collect()).collect();
            let cut = ExpandedCut::comb(n, &nodes, &sets)?;
            let violation = cut.violation(support);
            found.push((cut, violation));
        }
    }
    Ok(found)
}
