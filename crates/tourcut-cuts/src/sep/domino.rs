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

//! Simple domino-parity separation.
//!
//! For a candidate handle `H` the light teeth whose edges `E(t:S)` all
//! cross `delta(H)` are chosen greedily by gain `x(E(t:S)) - slack`, keeping
//! the bodies disjoint and the count odd. The resulting cut is the halved
//! and rounded sum of the degree equations of `H` and the tooth
//! inequalities; its violation is measured on the exact row.

use super::{SeparationConfig, SeparationContext};
use crate::hypergraph::ExpandedCut;
use crate::tooth::{SimpleTooth, ToothBank};
use fixedbitset::FixedBitSet;
use tourcut_core::error::Result;
use tourcut_core::tolerance::{EPS_CUT, EPS_ZERO};
use tourcut_lp::support::SupportGraph;

/// Which teeth may attach to a handle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandleTeeth {
    /// Root inside the handle and body outside it; `{t} + S` is a comb
    /// tooth and the teeth are node-disjoint.
    Comb,
    /// `E(t:S)` inside `delta(H)` in either orientation; bodies are
    /// disjoint and no root lies in another body.
    Domino,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ChosenTooth {
    pub root: usize,
    pub body: Vec<usize>,
    pub gain: f64,
}

/// `x(E(t:S))` for a tooth of `bank`.
fn root_weight(bank: &ToothBank, support: &SupportGraph, tooth: &SimpleTooth) -> f64 {
    support
        .neighbors(bank.root_node(tooth))
        .iter()
        .filter(|(w, _)| tooth.body.contains(bank.position(*w)))
        .map(|(_, x)| x)
        .sum()
}

/// Greedy tooth selection for `handle`, best gain first, with an odd
/// count. Returns no teeth if none qualify.
pub fn select_teeth(
    bank: &ToothBank,
    support: &SupportGraph,
    handle: &FixedBitSet,
    rule: HandleTeeth,
) -> Vec<ChosenTooth> {
    let n = bank.node_count();
    let mut candidates: Vec<(f64, &SimpleTooth)> = Vec::new();
    for (_, tooth) in bank.teeth() {
        let root_in = handle.contains(bank.root_node(tooth));
        let body_in = tooth
            .body
            .iter()
            .filter(|&p| handle.contains(bank.tour_nodes()[p]))
            .count();
        let fits = match rule {
            HandleTeeth::Comb => root_in && body_in == 0,
            HandleTeeth::Domino => {
                (root_in && body_in == 0) || (!root_in && body_in == tooth.body.len())
            }
        };
        if !fits {
            continue;
        }
        let gain = root_weight(bank, support, tooth) - tooth.slack;
        if gain > EPS_ZERO {
            candidates.push((gain, tooth));
        }
    }
    candidates.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| (a.1.root, a.1.body).cmp(&(b.1.root, b.1.body)))
    });

    let mut used = FixedBitSet::with_capacity(n);
    let mut roots = FixedBitSet::with_capacity(n);
    let mut chosen: Vec<ChosenTooth> = Vec::new();
    for (gain, tooth) in candidates {
        let root = bank.root_node(tooth);
        let body = bank.body_nodes(tooth);
        let ok = match rule {
            HandleTeeth::Comb => {
                !used.contains(root) && body.iter().all(|&v| !used.contains(v))
            }
            HandleTeeth::Domino => {
                !used.contains(root)
                    && body.iter().all(|&v| !used.contains(v) && !roots.contains(v))
            }
        };
        if !ok {
            continue;
        }
        used.extend(body.iter().copied());
        if rule == HandleTeeth::Comb {
            used.insert(root);
        }
        roots.insert(root);
        chosen.push(ChosenTooth { root, body, gain });
    }
    if chosen.len() % 2 == 0 {
        chosen.pop();
    }
    chosen
}

/// The handles worth trying: fractional components and the tour intervals
/// with the smallest boundary, at most `limit` of the latter.
pub(super) fn handle_candidates(ctx: &SeparationContext<'_>, limit: usize) -> Vec<FixedBitSet> {
    let n = ctx.node_count();
    let support = ctx.support;
    let nodes = ctx.tour.nodes();
    let mut out: Vec<FixedBitSet> = Vec::new();

    for component in support.fractional_components() {
        if component.len() < n - 1 {
            let mut set = FixedBitSet::with_capacity(n);
            set.extend(component);
            out.push(set);
        }
    }

    let mut intervals: Vec<(f64, usize, usize)> = Vec::new();
    let mut in_set = vec![false; n];
    let max_len = (n / 2).max(1);
    for start in 0..n {
        let mut cut = 0.0;
        let last = (start + max_len - 1).min(n - 1);
        for end in start..=last {
            let v = nodes[end];
            for &(w, x) in support.neighbors(v) {
                if in_set[w] {
                    cut -= x;
                } else {
                    cut += x;
                }
            }
            in_set[v] = true;
            if cut < 4.0 - EPS_CUT {
                intervals.push((cut, start, end));
            }
        }
        for p in start..=last {
            in_set[nodes[p]] = false;
        }
    }
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0).then((a.1, a.2).cmp(&(b.1, b.2))));
    for (_, start, end) in intervals.into_iter().take(limit) {
        let mut set = FixedBitSet::with_capacity(n);
        set.extend(nodes[start..=end].iter().copied());
        if !out.contains(&set) {
            out.push(set);
        }
    }
    out
}

/// The domino-parity cut of `handle` with greedily chosen teeth, if it is
/// violated.
pub(super) fn cut_for_handle(
    bank: &ToothBank,
    support: &SupportGraph,
    handle: &FixedBitSet,
) -> Result<Option<(ExpandedCut, f64)>> {
    let teeth = select_teeth(bank, support, handle, HandleTeeth::Domino);
    if teeth.is_empty() {
        return Ok(None);
    }
    let handle_nodes: Vec<usize> = handle.ones().collect();
    let legs: Vec<(usize, Vec<usize>)> = teeth.into_iter().map(|t| (t.root, t.body)).collect();
    let cut = ExpandedCut::domino(support.node_count(), &handle_nodes, &legs)?;
    let violation = cut.violation(support);
    Ok((violation > 0.0).then_some((cut, violation)))
}

pub(super) fn separate(
    ctx: &mut SeparationContext<'_>,
    config: &SeparationConfig,
) -> Result<Vec<(ExpandedCut, f64)>> {
    ctx.collect_teeth(config.tooth_body_limit)?;
    let mut found = Vec::new();
    for handle in handle_candidates(ctx, config.handle_candidate_limit) {
        if let Some(hit) = cut_for_handle(ctx.teeth(), ctx.support, &handle)? {
            found.push(hit);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{prism_support, tour};
    use super::super::{SeparationConfig, SeparationContext, SeparationEngine, Separator};
    use super::*;
    use crate::hypergraph::CutKind;
    use crate::pool::CutPool;
    use crate::store::CutStore;
    use tourcut_lp::relaxation::{NewEdge, PivType, Relaxation};
    use tourcut_model::graph::EndPts;
    use tourcut_model::instance::{Instance, MatrixInstance};
    use tourcut_model::tour::Tour;

    fn set(n: usize, nodes: &[usize]) -> FixedBitSet {
        let mut s = FixedBitSet::with_capacity(n);
        s.extend(nodes.iter().copied());
        s
    }

    #[test]
    fn test_select_teeth_on_prism_handle() {
        let t = tour(vec![0, 1, 2, 5, 4, 3]);
        let support = prism_support();
        let mut bank = ToothBank::new(&t);
        bank.collect_light(&support, 3);
        let teeth = select_teeth(&bank, &support, &set(6, &[0, 1, 2]), HandleTeeth::Domino);
        assert_eq!(teeth.len(), 3);
        let mut pairs: Vec<(usize, Vec<usize>)> =
            teeth.iter().map(|t| (t.root, t.body.clone())).collect();
        pairs.sort();
        assert_eq!(pairs, vec![(0, vec![3]), (1, vec![4]), (2, vec![5])]);
        assert!(teeth.iter().all(|t| (t.gain - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_teeth_count_is_odd() {
        let t = tour(vec![0, 1, 2, 5, 4, 3]);
        let support = prism_support();
        let mut bank = ToothBank::new(&t);
        bank.collect_light(&support, 3);
        // Handle {0, 1} admits (0, {3}) and (1, {4}); the even choice drops
        // one of them.
        let teeth = select_teeth(&bank, &support, &set(6, &[0, 1]), HandleTeeth::Comb);
        assert_eq!(teeth.len() % 2, 1);
    }

    #[test]
    fn test_domino_routine_finds_prism_cut() {
        let t = tour(vec![0, 1, 2, 5, 4, 3]);
        let support = prism_support();
        let store = CutStore::new(&t);
        let pool = CutPool::new();
        let mut bank = ToothBank::new(&t);
        let mut ctx = SeparationContext::new(&support, &t, &store, &pool, &mut bank);
        let engine = SeparationEngine::new(
            SeparationConfig::default().with_routines(vec![Separator::DominoParity]),
        );
        let found = engine.separate(&mut ctx).unwrap();
        assert!(!found.is_empty());
        assert!(found.iter().all(|c| c.cut.kind() == CutKind::DominoParity));
        assert!(found[0].violation >= 0.5 - 1e-9);
    }

    fn prism_relaxation() -> (Relaxation, Tour) {
        let inst = MatrixInstance::from_fn(6, |u, v| {
            if (u < 3) == (v < 3) {
                2
            } else if u.abs_diff(v) == 3 {
                1
            } else {
                10
            }
        })
        .unwrap();
        let tour = Tour::new(vec![0, 1, 2, 5, 4, 3], &inst).unwrap();
        let mut lp = Relaxation::new(6).unwrap();
        let mut edges: Vec<EndPts> = [
            (0, 1),
            (1, 2),
            (0, 2),
            (3, 4),
            (4, 5),
            (3, 5),
            (0, 3),
            (1, 4),
            (2, 5),
        ]
        .iter()
        .map(|&(u, v)| EndPts::new(u, v))
        .collect();
        edges.extend(lp.missing_tour_edges(&tour));
        let new: Vec<NewEdge> = edges
            .iter()
            .map(|&e| NewEdge::new(e, inst.distance(e.u(), e.v())))
            .collect();
        lp.add_edges(&new).unwrap();
        lp.instate_tour(tour.clone()).unwrap();
        (lp, tour)
    }

    #[test]
    fn test_one_domino_cut_resolves_prism() {
        let (mut lp, tour) = prism_relaxation();
        lp.primal_pivot().unwrap();
        assert_eq!(lp.classify().unwrap(), PivType::Frac);
        assert!((lp.objective_value() - 9.0).abs() < 1e-6);

        let support = lp.support();
        let mut store = CutStore::new(&tour);
        let pool = CutPool::new();
        let mut bank = ToothBank::new(&tour);
        let found = {
            let mut ctx = SeparationContext::new(&support, &tour, &store, &pool, &mut bank);
            SeparationEngine::new(
                SeparationConfig::default().with_routines(vec![Separator::DominoParity]),
            )
            .separate(&mut ctx)
            .unwrap()
        };

        let triangle = set(6, &[0, 1, 2]);
        let cut = &found
            .iter()
            .find(|c| *c.cut.handle() == triangle)
            .unwrap()
            .cut;
        assert!(cut.violation(&support) > 0.49);

        lp.pivot_back().unwrap();
        store.install(cut, &mut lp).unwrap();
        assert_eq!(lp.pivot().unwrap(), PivType::FathomedTour);
        assert!(lp.support().is_integral());
        assert!((lp.objective_value() - 10.0).abs() < 1e-6);
        store.verify(&lp).unwrap();
    }
}
