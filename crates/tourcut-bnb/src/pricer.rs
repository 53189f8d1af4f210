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

//! Column generation over the edges outside the core.
//!
//! The reduced cost of an edge `e = {u, v}` under LP duals `pi` is
//! `len(e) - pi_u - pi_v - sum_c pi_c * coef_c(e)`; the cut part comes from
//! the cut store, which can evaluate coefficients of edges without a
//! column. A partial scan covers a bounded neighbour list per node, a full
//! scan covers every pair.

use crate::config::PricingConfig;
use rustc_hash::FxHashSet;
use tourcut_core::error::Result;
use tourcut_core::tolerance::EPS_INTEGRAL;
use tourcut_cuts::store::CutStore;
use tourcut_lp::engine::{LpEngine, SolveStatus};
use tourcut_lp::relaxation::{NewEdge, Relaxation};
use tourcut_model::graph::EndPts;
use tourcut_model::instance::Instance;

/// How a pricing call ended.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ScanStat {
    /// The partial scan added edges.
    Partial,
    /// The partial scan found nothing; no full scan was run.
    PartOpt,
    /// The full scan added edges.
    Full,
    /// The full scan found nothing: the core is pricing-optimal.
    FullOpt,
}

impl std::fmt::Display for ScanStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStat::Partial => write!(f, "Partial"),
            ScanStat::PartOpt => write!(f, "PartOpt"),
            ScanStat::Full => write!(f, "Full"),
            ScanStat::FullOpt => write!(f, "FullOpt"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PriceOutcome {
    pub stat: ScanStat,
    /// Edges that received a column, most negative reduced cost first.
    pub added: Vec<EndPts>,
    /// `objval + sum min(0, rc)` over all non-core edges, when a full scan ran.
    pub lagrangian_bound: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct Pricer {
    config: PricingConfig,
    neighbors: Vec<Vec<usize>>,
}

impl Pricer {
    pub fn new<I>(instance: &I, config: PricingConfig) -> Self
    where
        I: Instance + ?Sized,
    {
        let neighbors = (0..instance.node_count())
            .map(|u| instance.nearest(u, config.partial_neighbors))
            .collect();
        Self { config, neighbors }
    }

    #[inline]
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn reduced_cost<I>(instance: &I, store: &CutStore, duals: &[f64], ends: EndPts) -> f64
    where
        I: Instance + ?Sized,
    {
        let (u, v) = (ends.u(), ends.v());
        instance.distance(u, v) as f64 - duals[u] - duals[v] - store.dual_sum(duals, ends)
    }

    /// Non-core neighbour-list edges with negative reduced cost.
    pub fn scan_partial<I, E>(
        &self,
        instance: &I,
        lp: &Relaxation<E>,
        store: &CutStore,
        duals: &[f64],
    ) -> Vec<(f64, EndPts)>
    where
        I: Instance + ?Sized,
        E: LpEngine,
    {
        let mut seen = FxHashSet::default();
        let mut found = Vec::new();
        for (u, list) in self.neighbors.iter().enumerate() {
            for &v in list {
                let ends = EndPts::new(u, v);
                if lp.graph().contains(ends) || !seen.insert(ends) {
                    continue;
                }
                let rc = Self::reduced_cost(instance, store, duals, ends);
                if rc < -EPS_INTEGRAL {
                    found.push((rc, ends));
                }
            }
        }
        found
    }

    /// All non-core edges with negative reduced cost, and the sum of
    /// `min(0, rc)` over all non-core edges.
    pub fn scan_full<I, E>(
        &self,
        instance: &I,
        lp: &Relaxation<E>,
        store: &CutStore,
        duals: &[f64],
    ) -> (Vec<(f64, EndPts)>, f64)
    where
        I: Instance + ?Sized,
        E: LpEngine,
    {
        let n = instance.node_count();
        let mut found = Vec::new();
        let mut penalty = 0.0;
        for u in 0..n {
            for v in (u + 1)..n {
                let ends = EndPts::new(u, v);
                if lp.graph().contains(ends) {
                    continue;
                }
                let rc = Self::reduced_cost(instance, store, duals, ends);
                if rc < 0.0 {
                    penalty += rc;
                }
                if rc < -EPS_INTEGRAL {
                    found.push((rc, ends));
                }
            }
        }
        (found, penalty)
    }

    /// The Lagrangian lower bound of the full problem at the current
    /// duals. The LP must be solved to optimality.
    pub fn lagrangian_bound<I, E>(&self, instance: &I, lp: &Relaxation<E>, store: &CutStore) -> f64
    where
        I: Instance + ?Sized,
        E: LpEngine,
    {
        let duals = lp.dual_values();
        let (_, penalty) = self.scan_full(instance, lp, store, &duals);
        lp.objective_value() + penalty
    }

    fn add<I, E>(
        &self,
        instance: &I,
        lp: &mut Relaxation<E>,
        store: &CutStore,
        mut found: Vec<(f64, EndPts)>,
    ) -> Result<Vec<EndPts>>
    where
        I: Instance + ?Sized,
        E: LpEngine,
    {
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.truncate(self.config.gen_max);
        let edges: Vec<NewEdge> = found
            .iter()
            .map(|&(_, ends)| {
                NewEdge::new(ends, instance.distance(ends.u(), ends.v()))
                    .with_cut_entries(store.column_entries(ends))
            })
            .collect();
        lp.add_edges(&edges)?;
        Ok(found.into_iter().map(|(_, ends)| ends).collect())
    }

    /// Prices the edges outside the core against the current duals and
    /// adds up to `gen_max` of the most negative ones. The LP must be solved
    /// to optimality.
    pub fn price<I, E>(
        &self,
        instance: &I,
        lp: &mut Relaxation<E>,
        store: &CutStore,
    ) -> Result<PriceOutcome>
    where
        I: Instance + ?Sized,
        E: LpEngine,
    {
        let duals = lp.dual_values();
        let partial = self.partial_with(instance, lp, store, &duals)?;
        if partial.stat == ScanStat::Partial {
            log::debug!("partial pricing added {} edges", partial.added.len());
            return Ok(partial);
        }

        let objective = lp.objective_value();
        let (full, penalty) = self.scan_full(instance, lp, store, &duals);
        let lagrangian_bound = Some(objective + penalty);
        if full.is_empty() {
            return Ok(PriceOutcome {
                stat: ScanStat::FullOpt,
                added: Vec::new(),
                lagrangian_bound,
            });
        }
        let added = self.add(instance, lp, store, full)?;
        log::debug!("full pricing added {} edges", added.len());
        Ok(PriceOutcome {
            stat: ScanStat::Full,
            added,
            lagrangian_bound,
        })
    }

    /// Runs the partial scan only.
    pub fn price_partial<I, E>(
        &self,
        instance: &I,
        lp: &mut Relaxation<E>,
        store: &CutStore,
    ) -> Result<PriceOutcome>
    where
        I: Instance + ?Sized,
        E: LpEngine,
    {
        let duals = lp.dual_values();
        self.partial_with(instance, lp, store, &duals)
    }

    fn partial_with<I, E>(
        &self,
        instance: &I,
        lp: &mut Relaxation<E>,
        store: &CutStore,
        duals: &[f64],
    ) -> Result<PriceOutcome>
    where
        I: Instance + ?Sized,
        E: LpEngine,
    {
        let partial = self.scan_partial(instance, lp, store, duals);
        if partial.is_empty() {
            return Ok(PriceOutcome {
                stat: ScanStat::PartOpt,
                added: Vec::new(),
                lagrangian_bound: None,
            });
        }
        let added = self.add(instance, lp, store, partial)?;
        Ok(PriceOutcome {
            stat: ScanStat::Partial,
            added,
            lagrangian_bound: None,
        })
    }

    /// Restores primal feasibility by adding edges priced with the
    /// phase-one duals. Returns `false` if the LP stays infeasible with no
    /// edge left to add, i.e. the node admits no tour.
    pub fn feas_recover<I, E>(
        &self,
        instance: &I,
        lp: &mut Relaxation<E>,
        store: &CutStore,
    ) -> Result<bool>
    where
        I: Instance + ?Sized,
        E: LpEngine,
    {
        let n = instance.node_count();
        loop {
            if lp.primal_recover()? != SolveStatus::Infeasible {
                return Ok(true);
            }
            let Some(farkas) = lp.farkas_duals() else {
                return Ok(false);
            };
            let mut found = Vec::new();
            for u in 0..n {
                for v in (u + 1)..n {
                    let ends = EndPts::new(u, v);
                    if lp.graph().contains(ends) {
                        continue;
                    }
                    let d = -(farkas[u] + farkas[v] + store.dual_sum(&farkas, ends));
                    if d < -EPS_INTEGRAL {
                        found.push((d, ends));
                    }
                }
            }
            if found.is_empty() {
                log::debug!("no edge repairs the infeasible LP");
                return Ok(false);
            }
            let added = self.add(instance, lp, store, found)?;
            log::debug!("feasibility recovery added {} edges", added.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_model::instance::{EuclideanInstance, MatrixInstance};
    use tourcut_model::tour::Tour;

    fn pentagon() -> EuclideanInstance {
        let points = (0..5)
            .map(|k| {
                let a = k as f64 * std::f64::consts::TAU / 5.0;
                (100.0 * a.cos(), 100.0 * a.sin())
            })
            .collect();
        EuclideanInstance::new(points)
    }

    /// The pentagon LP over every edge except the perimeter edge `{0, 1}`.
    fn pentagon_without_01() -> (EuclideanInstance, Relaxation, CutStore) {
        let inst = pentagon();
        let mut lp = Relaxation::new(5).unwrap();
        let mut edges = Vec::new();
        for u in 0..5 {
            for v in (u + 1)..5 {
                if (u, v) != (0, 1) {
                    edges.push(NewEdge::new(EndPts::new(u, v), inst.distance(u, v)));
                }
            }
        }
        lp.add_edges(&edges).unwrap();
        let tour = Tour::new(vec![0, 2, 1, 3, 4], &inst).unwrap();
        let store = CutStore::new(&tour);
        lp.instate_tour(tour).unwrap();
        (inst, lp, store)
    }

    #[test]
    fn test_price_finds_excluded_cheap_edge() {
        let (inst, mut lp, store) = pentagon_without_01();
        assert_eq!(lp.primal_pivot().unwrap(), SolveStatus::Optimal);
        let before = lp.objective_value();

        let pricer = Pricer::new(&inst, PricingConfig::default());
        let outcome = pricer.price(&inst, &mut lp, &store).unwrap();
        assert_eq!(outcome.stat, ScanStat::Partial);
        assert_eq!(outcome.added, vec![EndPts::new(0, 1)]);
        assert_eq!(lp.edge_count(), 10);

        assert_eq!(lp.primal_pivot().unwrap(), SolveStatus::Optimal);
        assert!(lp.objective_value() < before - 1e-6);
        let again = pricer.price(&inst, &mut lp, &store).unwrap();
        assert_eq!(again.stat, ScanStat::FullOpt);
        assert!(again.added.is_empty());
    }

    #[test]
    fn test_lagrangian_bound_never_exceeds_priced_optimum() {
        let (inst, mut lp, store) = pentagon_without_01();
        lp.primal_pivot().unwrap();
        let pricer = Pricer::new(&inst, PricingConfig::default().with_enabled(false));
        let unpriced = pricer.lagrangian_bound(&inst, &lp, &store);
        assert!(unpriced <= lp.objective_value() + 1e-9);

        let pricer = Pricer::new(&inst, PricingConfig::default());
        loop {
            let outcome = pricer.price(&inst, &mut lp, &store).unwrap();
            if outcome.stat == ScanStat::FullOpt {
                assert!(
                    (outcome.lagrangian_bound.unwrap() - lp.objective_value()).abs() < 1e-6
                );
                break;
            }
            lp.primal_pivot().unwrap();
        }
        assert!(unpriced <= lp.objective_value() + 1e-6);
    }

    #[test]
    fn test_partial_scan_respects_neighbor_lists() {
        let (inst, mut lp, store) = pentagon_without_01();
        lp.primal_pivot().unwrap();
        // Empty neighbour lists leave nothing for the partial scan.
        let pricer = Pricer::new(&inst, PricingConfig::default().with_partial_neighbors(0));
        let outcome = pricer.price_partial(&inst, &mut lp, &store).unwrap();
        assert_eq!(outcome.stat, ScanStat::PartOpt);
        assert_eq!(lp.edge_count(), 9);
    }

    #[test]
    fn test_feas_recover_adds_missing_edges() {
        let inst = MatrixInstance::from_fn(4, |u, v| (u as i64 - v as i64).abs()).unwrap();
        let mut lp = Relaxation::new(4).unwrap();
        let path: Vec<NewEdge> = [(0, 1), (1, 2), (2, 3)]
            .iter()
            .map(|&(u, v)| NewEdge::new(EndPts::new(u, v), inst.distance(u, v)))
            .collect();
        lp.add_edges(&path).unwrap();
        let store = CutStore::new(&Tour::new(vec![0, 1, 2, 3], &inst).unwrap());

        let pricer = Pricer::new(&inst, PricingConfig::default());
        assert!(pricer.feas_recover(&inst, &mut lp, &store).unwrap());
        assert!(lp.edge_count() > 3);
        assert!(lp.primal_feasible());
    }

    #[test]
    fn test_feas_recover_detects_impossible_clamps() {
        let inst = MatrixInstance::from_fn(4, |u, v| (u + v) as i64).unwrap();
        let mut lp = Relaxation::new(4).unwrap();
        let mut edges = Vec::new();
        for u in 0..4 {
            for v in (u + 1)..4 {
                edges.push(NewEdge::new(EndPts::new(u, v), inst.distance(u, v)));
            }
        }
        let indices = lp.add_edges(&edges).unwrap();
        // Three edges forced into node 0.
        for &index in &indices[..3] {
            lp.set_col_bounds(index, 1.0, 1.0).unwrap();
        }
        let store = CutStore::new(&Tour::new(vec![0, 1, 2, 3], &inst).unwrap());
        let pricer = Pricer::new(&inst, PricingConfig::default());
        assert!(!pricer.feas_recover(&inst, &mut lp, &store).unwrap());
    }
}
