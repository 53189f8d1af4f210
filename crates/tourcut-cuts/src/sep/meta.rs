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

//! Meta-cuts: new cuts derived from the handles of stored cuts.
//!
//! - `Tighten` moves tour-adjacent nodes in or out of a handle while that
//!   lowers `x(delta(H))`.
//! - `Teething` picks fresh teeth for an unchanged handle.
//! - `Handling` grows or shrinks each tour segment of a handle by one
//!   position at either end.
//! - `Decker` merges the handles of two cuts that overlap or touch on the
//!   tour.
//!
//! `PoolTighten` runs `Tighten` over the handles of pooled cuts instead of
//! stored ones.

use super::{MetaKind, SeparationConfig, SeparationContext, comb, domino};
use crate::hypergraph::{CutKind, ExpandedCut};
use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use tourcut_core::error::Result;
use tourcut_core::math::segment::{Segment, segments_from_positions};
use tourcut_core::tolerance::EPS_CUT;
use tourcut_model::tour::Tour;

type Found = Vec<(ExpandedCut, f64)>;

fn handle_segments(tour: &Tour, handle: &FixedBitSet) -> SmallVec<[Segment; 4]> {
    let positions: SmallVec<[usize; 16]> = handle.ones().map(|v| tour.position(v)).collect();
    segments_from_positions(&positions)
}

fn set_of(tour: &Tour, n: usize, segments: &[Segment]) -> FixedBitSet {
    let mut set = FixedBitSet::with_capacity(n);
    for s in segments {
        set.extend(s.iter().map(|p| tour.node_at(p)));
    }
    set
}

/// Domino-parity and comb cuts for `handle`.
fn teeth_cuts(ctx: &SeparationContext<'_>, handle: &FixedBitSet, out: &mut Found) -> Result<()> {
    let size = handle.count_ones(..);
    if size == 0 || size >= ctx.node_count() - 1 {
        return Ok(());
    }
    if let Some(hit) = domino::cut_for_handle(ctx.teeth(), ctx.support, handle)? {
        out.push(hit);
    }
    if let Some(hit) = comb::cut_for_handle(ctx.teeth(), ctx.support, handle)? {
        out.push(hit);
    }
    Ok(())
}

fn stored_handles(ctx: &SeparationContext<'_>, limit: usize) -> Vec<(CutKind, FixedBitSet)> {
    ctx.store
        .iter_expanded()
        .take(limit)
        .map(|(_, cut)| (cut.kind(), cut.handle().clone()))
        .collect()
}

/// Handles of pooled cuts that fit the current node count.
fn pooled_handles(ctx: &SeparationContext<'_>, limit: usize) -> Vec<(CutKind, FixedBitSet)> {
    let n = ctx.node_count();
    ctx.pool
        .iter()
        .filter_map(|record| ExpandedCut::from_record(n, record).ok())
        .filter(|cut| !ctx.store.contains(cut))
        .take(limit)
        .map(|cut| (cut.kind(), cut.handle().clone()))
        .collect()
}

fn tighten(ctx: &SeparationContext<'_>, handles: Vec<(CutKind, FixedBitSet)>) -> Result<Found> {
    let n = ctx.node_count();
    let tour = ctx.tour;
    let support = ctx.support;
    let mut found = Vec::new();
    for (kind, original) in handles {
        let mut handle = original.clone();
        let mut value = support.cut_value(&handle);
        for _ in 0..n {
            let size = handle.count_ones(..);
            let mut best: Option<(usize, f64)> = None;
            for v in 0..n {
                let inside = handle.contains(v);
                let touches = [tour.prev(v), tour.next(v)]
                    .iter()
                    .any(|&w| handle.contains(w) != inside);
                if !touches || (inside && size <= 1) || (!inside && size + 2 >= n) {
                    continue;
                }
                handle.set(v, !inside);
                let moved = support.cut_value(&handle);
                handle.set(v, inside);
                if moved < value - EPS_CUT && best.is_none_or(|(_, b)| moved < b) {
                    best = Some((v, moved));
                }
            }
            let Some((v, moved)) = best else {
                break;
            };
            handle.toggle(v);
            value = moved;
        }
        if handle == original {
            continue;
        }
        if kind == CutKind::Subtour {
            if value < 2.0 - EPS_CUT {
                let nodes: Vec<usize> = handle.ones().collect();
                found.push((ExpandedCut::subtour(n, &nodes)?, 2.0 - value));
            }
        } else {
            teeth_cuts(ctx, &handle, &mut found)?;
        }
    }
    Ok(found)
}

fn teething(ctx: &SeparationContext<'_>, limit: usize) -> Result<Found> {
    let mut found = Vec::new();
    for (_, handle) in stored_handles(ctx, limit) {
        teeth_cuts(ctx, &handle, &mut found)?;
    }
    Ok(found)
}

fn handling(ctx: &SeparationContext<'_>, limit: usize) -> Result<Found> {
    let n = ctx.node_count();
    let tour = ctx.tour;
    let mut found = Vec::new();
    for (_, handle) in stored_handles(ctx, limit) {
        let segments = handle_segments(tour, &handle);
        for (i, seg) in segments.iter().enumerate() {
            let mut variants: SmallVec<[Segment; 4]> = SmallVec::new();
            if seg.start() > 0 {
                variants.push(Segment::new(seg.start() - 1, seg.end()));
            }
            if seg.end() + 1 < n {
                variants.push(Segment::new(seg.start(), seg.end() + 1));
            }
            if seg.len() > 1 {
                variants.push(Segment::new(seg.start() + 1, seg.end()));
                variants.push(Segment::new(seg.start(), seg.end() - 1));
            }
            for variant in variants {
                let mut changed = segments.clone();
                changed[i] = variant;
                let candidate = set_of(tour, n, &changed);
                teeth_cuts(ctx, &candidate, &mut found)?;
            }
        }
    }
    Ok(found)
}

fn decker(ctx: &SeparationContext<'_>, limit: usize) -> Result<Found> {
    let tour = ctx.tour;
    let handles: Vec<(FixedBitSet, SmallVec<[Segment; 4]>)> = stored_handles(ctx, limit)
        .into_iter()
        .map(|(_, h)| {
            let segs = handle_segments(tour, &h);
            (h, segs)
        })
        .collect();
    let mut found = Vec::new();
    let mut tried: Vec<FixedBitSet> = Vec::new();
    for i in 0..handles.len() {
        for j in i + 1..handles.len() {
            let (a, a_segs) = &handles[i];
            let (b, b_segs) = &handles[j];
            let meet = a_segs
                .iter()
                .any(|s| b_segs.iter().any(|t| s.union(*t).is_some()));
            if !meet {
                continue;
            }
            let mut merged = a.clone();
            merged.union_with(b);
            if merged == *a || merged == *b || tried.contains(&merged) {
                continue;
            }
            teeth_cuts(ctx, &merged, &mut found)?;
            tried.push(merged);
            if tried.len() >= limit {
                return Ok(found);
            }
        }
    }
    Ok(found)
}

pub(super) fn separate(
    kind: MetaKind,
    ctx: &mut SeparationContext<'_>,
    config: &SeparationConfig,
) -> Result<Found> {
    if ctx.store.is_empty() {
        return Ok(Vec::new());
    }
    ctx.collect_teeth(config.tooth_body_limit)?;
    let limit = config.handle_candidate_limit;
    match kind {
        MetaKind::Tighten => tighten(ctx, stored_handles(ctx, limit)),
        MetaKind::Teething => teething(ctx, limit),
        MetaKind::Handling => handling(ctx, limit),
        MetaKind::Decker => decker(ctx, limit),
    }
}

pub(super) fn separate_pool_tighten(
    ctx: &mut SeparationContext<'_>,
    config: &SeparationConfig,
) -> Result<Found> {
    if ctx.pool.is_empty() {
        return Ok(Vec::new());
    }
    ctx.collect_teeth(config.tooth_body_limit)?;
    let handles = pooled_handles(ctx, config.handle_candidate_limit);
    tighten(ctx, handles)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{prism_support, tour, two_triangles};
    use super::super::{SeparationEngine, Separator};
    use super::*;
    use crate::pool::CutPool;
    use crate::store::CutStore;
    use crate::tooth::ToothBank;
    use tourcut_lp::relaxation::{NewEdge, Relaxation};
    use tourcut_lp::support::SupportGraph;

    fn store_with(order: &[usize], subtours: &[&[usize]]) -> CutStore {
        let t = tour(order.to_vec());
        let mut lp = Relaxation::new(order.len()).unwrap();
        let edges: Vec<NewEdge> = t.edges().map(|e| NewEdge::new(e, 1)).collect();
        lp.add_edges(&edges).unwrap();
        let mut store = CutStore::new(&t);
        for nodes in subtours {
            let cut = ExpandedCut::subtour(order.len(), nodes).unwrap();
            store.install(&cut, &mut lp).unwrap();
        }
        store
    }

    fn run_meta(
        kind: MetaKind,
        support: &SupportGraph,
        order: &[usize],
        store: &CutStore,
    ) -> Vec<super::super::CandidateCut> {
        let t = tour(order.to_vec());
        let pool = CutPool::new();
        let mut bank = ToothBank::new(&t);
        let mut ctx = SeparationContext::new(support, &t, store, &pool, &mut bank);
        SeparationEngine::new(SeparationConfig::default().with_routines(vec![Separator::Meta(kind)]))
            .separate(&mut ctx)
            .unwrap()
    }

    #[test]
    fn test_tighten_grows_subtour_handle() {
        let order = [0, 1, 2, 3, 4, 5];
        let store = store_with(&order, &[&[0, 1]]);
        let found = run_meta(MetaKind::Tighten, &two_triangles(), &order, &store);
        assert_eq!(found.len(), 1);
        let handle: Vec<usize> = found[0].cut.handle().ones().collect();
        assert_eq!(handle, vec![0, 1, 2]);
        assert!((found[0].violation - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_pool_tighten_grows_pooled_handle() {
        let order = [0, 1, 2, 3, 4, 5];
        let t = tour(order.to_vec());
        let store = store_with(&order, &[]);
        let mut pool = CutPool::new();
        pool.add(ExpandedCut::subtour(6, &[0, 1]).unwrap().to_record());
        let support = two_triangles();
        let mut bank = ToothBank::new(&t);
        let mut ctx = SeparationContext::new(&support, &t, &store, &pool, &mut bank);

        // The pooled cut itself is tight and the store holds no handle.
        let plain = SeparationEngine::new(SeparationConfig::default().with_routines(vec![
            Separator::Pool,
            Separator::Meta(MetaKind::Tighten),
        ]))
        .separate(&mut ctx)
        .unwrap();
        assert!(plain.is_empty());

        let found = SeparationEngine::new(
            SeparationConfig::default().with_routines(vec![Separator::PoolTighten]),
        )
        .separate(&mut ctx)
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].routine, Separator::PoolTighten);
        let handle: Vec<usize> = found[0].cut.handle().ones().collect();
        assert_eq!(handle, vec![0, 1, 2]);
        assert!((found[0].violation - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_pool_tighten_with_empty_pool_is_empty() {
        let order = [0, 1, 2, 3, 4, 5];
        let store = store_with(&order, &[&[0, 1]]);
        let t = tour(order.to_vec());
        let pool = CutPool::new();
        let support = two_triangles();
        let mut bank = ToothBank::new(&t);
        let mut ctx = SeparationContext::new(&support, &t, &store, &pool, &mut bank);
        let found = separate_pool_tighten(&mut ctx, &SeparationConfig::default()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_teething_reuses_stored_handle() {
        let order = [0, 1, 2, 5, 4, 3];
        let store = store_with(&order, &[&[0, 1, 2]]);
        let found = run_meta(MetaKind::Teething, &prism_support(), &order, &store);
        assert!(found.iter().any(|c| c.cut.kind() == CutKind::DominoParity));
        assert!(found.iter().any(|c| c.cut.kind() == CutKind::Blossom));
    }

    #[test]
    fn test_handling_extends_handle() {
        let order = [0, 1, 2, 5, 4, 3];
        let store = store_with(&order, &[&[0, 1]]);
        let found = run_meta(MetaKind::Handling, &prism_support(), &order, &store);
        let triangle: Vec<usize> = vec![0, 1, 2];
        assert!(
            found
                .iter()
                .any(|c| c.cut.handle().ones().collect::<Vec<_>>() == triangle)
        );
    }

    #[test]
    fn test_decker_merges_touching_handles() {
        let order = [0, 1, 2, 5, 4, 3];
        let store = store_with(&order, &[&[0, 1], &[2]]);
        let found = run_meta(MetaKind::Decker, &prism_support(), &order, &store);
        assert!(!found.is_empty());
        let triangle: Vec<usize> = vec![0, 1, 2];
        assert!(
            found
                .iter()
                .all(|c| c.cut.handle().ones().collect::<Vec<_>>() == triangle)
        );
    }

    #[test]
    fn test_meta_without_stored_cuts_is_empty() {
        let order = [0, 1, 2, 5, 4, 3];
        let store = store_with(&order, &[]);
        for kind in [
            MetaKind::Tighten,
            MetaKind::Teething,
            MetaKind::Handling,
            MetaKind::Decker,
        ] {
            assert!(run_meta(kind, &prism_support(), &order, &store).is_empty());
        }
    }

    #[test]
    fn test_handle_segments_follow_tour() {
        let t = tour(vec![0, 1, 2, 5, 4, 3]);
        let mut h = FixedBitSet::with_capacity(6);
        h.extend([0, 2, 3]);
        let segs = handle_segments(&t, &h);
        assert_eq!(segs.as_slice(), &[Segment::new(0, 0), Segment::new(2, 2), Segment::new(5, 5)]);
        assert_eq!(set_of(&t, 6, &segs), h);
    }
}
