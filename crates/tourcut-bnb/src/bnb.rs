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

//! Branch-and-cut driver.
//!
//! `BranchAndCut` owns the LP workspace across solves; each call to
//! [`BranchAndCut::solve`] opens a private search session that walks the
//! branch tree depth first. A node moves through
//!
//! `NeedsCut -> (NeedsRecover ->) NeedsPrice -> NeedsBranch -> Done`
//!
//! or ends `Pruned` when its bound reaches the incumbent, no tour satisfies
//! its clamps, or it runs out of budget. Pruned-for-budget nodes keep their
//! bound in the final report.
//!
//! Node entry applies the clamps of the path from the root. A node with a
//! branch tour instates it and cuts from its tour basis; a node without one
//! restores the parent's saved basis, restores feasibility by pricing and
//! cuts by plain re-optimization.

use crate::branch_tour::{self, CompressedTour};
use crate::branching::Brancher;
use crate::config::{BranchConfig, CuttingConfig, PricingConfig};
use crate::cutting::{CutLoop, CutOutcome, CutReport, PivotMode};
use crate::pricer::{Pricer, ScanStat};
use crate::tree::{BranchDirection, ChildSpec, NodeIndex, NodeStatus, SearchTree};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tourcut_core::error::{Error, Result};
use tourcut_core::tolerance::PRUNE_GAP;
use tourcut_cuts::pool::CutPool;
use tourcut_cuts::sep::{SeparationConfig, SeparationEngine};
use tourcut_lp::dense::DenseSimplex;
use tourcut_lp::engine::LpEngine;
use tourcut_lp::relaxation::Relaxation;
use tourcut_model::graph::EndPts;
use tourcut_model::instance::Instance;
use tourcut_search::incumbent::SharedIncumbent;
use tourcut_search::monitor::search_monitor::{
    PruneReason, SearchCommand, SearchMonitor, SearchProgress,
};
use tourcut_search::result::{SolverOutcome, TerminationReason};
use tourcut_search::stats::SolverStatistics;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BnbConfig {
    pub cutting: CuttingConfig,
    pub pricing: PricingConfig,
    pub branching: BranchConfig,
    pub separation: SeparationConfig,
}

impl BnbConfig {
    pub fn with_cutting(mut self, cutting: CuttingConfig) -> Self {
        self.cutting = cutting;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_branching(mut self, branching: BranchConfig) -> Self {
        self.branching = branching;
        self
    }

    pub fn with_separation(mut self, separation: SeparationConfig) -> Self {
        self.separation = separation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.cutting.validate()?;
        self.pricing.validate()?;
        self.branching.validate()?;
        self.separation.validate()
    }
}

/// A branch-and-cut solver over one LP relaxation.
#[derive(Debug)]
pub struct BranchAndCut<E: LpEngine = DenseSimplex> {
    config: BnbConfig,
    ws: Workspace<E>,
}

impl<E: LpEngine> BranchAndCut<E> {
    /// `lp` must carry a reference tour; `pool` seeds the pool separator.
    pub fn new(config: BnbConfig, lp: Relaxation<E>, pool: CutPool) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ws: Workspace::new(lp, pool)?,
        })
    }

    #[inline]
    pub fn config(&self) -> &BnbConfig {
        &self.config
    }

    #[inline]
    pub fn workspace(&self) -> &Workspace<E> {
        &self.ws
    }

    #[inline]
    pub fn pool(&self) -> &CutPool {
        &self.ws.pool
    }

    pub fn into_parts(self) -> (Relaxation<E>, CutPool) {
        self.ws.into_parts()
    }

    /// Solves `instance` to optimality or until `monitor` stops the run.
    ///
    /// `incumbent` may be shared with other solvers; the reference tour of
    /// the LP is offered to it first.
    pub fn solve<I, M>(
        &mut self,
        instance: &I,
        incumbent: &SharedIncumbent,
        monitor: &mut M,
    ) -> SolverOutcome
    where
        I: Instance + ?Sized,
        M: SearchMonitor + ?Sized,
    {
        let session = match SearchSession::new(self, instance, incumbent, monitor) {
            Ok(session) => session,
            Err(e) => {
                return SolverOutcome::unresolved(
                    incumbent.snapshot(),
                    f64::NEG_INFINITY,
                    TerminationReason::Failed(e.to_string()),
                    SolverStatistics::default(),
                );
            }
        };
        session.run()
    }
}

/// Feasibility recoveries allowed per node before it is left unresolved.
const MAX_RECOVERIES: usize = 16;

/// What became of a processed node.
enum NodeFate {
    Closed,
    Aborted(String),
}

struct SearchSession<'a, I, E, M>
where
    I: Instance + ?Sized,
    E: LpEngine,
    M: SearchMonitor + ?Sized,
{
    instance: &'a I,
    ws: &'a mut Workspace<E>,
    incumbent: &'a SharedIncumbent,
    monitor: &'a mut M,
    cut_loop: CutLoop,
    pricer: Pricer,
    brancher: Brancher,
    tree: SearchTree,
    /// Edges currently clamped in the LP.
    clamped: Vec<EndPts>,
    /// Bounds of nodes left unresolved.
    unresolved: Vec<f64>,
    stats: SolverStatistics,
    start_time: Instant,
}

impl<I, E, M> std::fmt::Display for SearchSession<'_, I, E, M>
where
    I: Instance + ?Sized,
    E: LpEngine,
    M: SearchMonitor + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SearchSession(upper_bound: {}, tree: {}, unresolved: {})",
            self.incumbent.upper_bound(),
            self.tree,
            self.unresolved.len()
        )
    }
}

impl<'a, I, E, M> SearchSession<'a, I, E, M>
where
    I: Instance + ?Sized,
    E: LpEngine,
    M: SearchMonitor + ?Sized,
{
    fn new(
        solver: &'a mut BranchAndCut<E>,
        instance: &'a I,
        incumbent: &'a SharedIncumbent,
        monitor: &'a mut M,
    ) -> Result<Self> {
        if instance.node_count() != solver.ws.lp.node_count() {
            return Err(Error::invalid_input(format!(
                "instance has {} nodes, the relaxation {}",
                instance.node_count(),
                solver.ws.lp.node_count()
            )));
        }
        let config = &solver.config;
        let tree = SearchTree::new(solver.ws.tour()?);
        Ok(Self {
            instance,
            cut_loop: CutLoop::new(
                config.cutting.clone(),
                SeparationEngine::new(config.separation.clone()),
            ),
            pricer: Pricer::new(instance, config.pricing.clone()),
            brancher: Brancher::new(config.branching.clone()),
            ws: &mut solver.ws,
            incumbent,
            monitor,
            tree,
            clamped: Vec::new(),
            unresolved: Vec::new(),
            stats: SolverStatistics::default(),
            start_time: Instant::now(),
        })
    }

    fn run(mut self) -> SolverOutcome {
        self.monitor
            .on_enter_search(self.instance.node_count(), &self.stats);

        if let Err(e) = self.initialize() {
            return self.finish(TerminationReason::Failed(e.to_string()));
        }

        let reason = loop {
            let Some(index) = self.tree.pop() else {
                break if self.unresolved.is_empty() {
                    TerminationReason::OptimalityProven
                } else {
                    TerminationReason::Aborted(format!(
                        "{} nodes left unresolved",
                        self.unresolved.len()
                    ))
                };
            };

            let progress = self.progress(index);
            self.monitor.on_step(&progress, &self.stats);
            if let SearchCommand::Terminate(reason) = self.monitor.search_command(&self.stats) {
                // The node was never processed; its bound stays in the report.
                self.unresolved.push(self.tree.node(index).bound);
                break TerminationReason::Aborted(reason);
            }

            let depth = self.tree.node(index).depth;
            let upper_bound = self.incumbent.upper_bound();
            let result = self.process_with_retry(index);
            self.stats.on_node_processed(depth);
            if self.incumbent.upper_bound() < upper_bound {
                self.prune_dominated();
            }
            match result {
                Ok(NodeFate::Closed) => {}
                Ok(NodeFate::Aborted(reason)) => break TerminationReason::Aborted(reason),
                Err(e) => {
                    log::error!("search failed: {}", e);
                    self.unresolved.push(self.tree.node(index).bound);
                    break TerminationReason::Failed(e.to_string());
                }
            }
        };
        self.finish(reason)
    }

    fn initialize(&mut self) -> Result<()> {
        let tour = self.ws.tour()?.clone();
        if self.incumbent.try_install(&tour) {
            self.stats.on_incumbent_update();
            self.monitor.on_incumbent_found(&tour, &self.stats);
        }
        let compressed = CompressedTour::compress(&tour, self.tree.base_perm())?;
        self.tree
            .push_root(f64::NEG_INFINITY, None, Some(compressed));
        Ok(())
    }

    fn finish(mut self, reason: TerminationReason) -> SolverOutcome {
        if let Err(e) = self.release_clamps() {
            log::warn!("could not release branching clamps: {}", e);
        }
        self.stats.set_total_time(self.start_time.elapsed());
        self.monitor.on_exit_search(&self.stats);

        let tour = self.incumbent.snapshot();
        if reason == TerminationReason::OptimalityProven
            && let Some(tour) = tour
        {
            log::info!("optimal tour of length {}", tour.length());
            return SolverOutcome::optimal(tour, self.stats);
        }
        let open = self.tree.min_open_bound().into_iter();
        let lower_bound = self
            .unresolved
            .iter()
            .copied()
            .chain(open)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(f64::NEG_INFINITY);
        SolverOutcome::unresolved(tour, lower_bound, reason, self.stats)
    }

    #[inline]
    fn upper_bound(&self) -> f64 {
        match self.incumbent.upper_bound() {
            i64::MAX => f64::INFINITY,
            ub => ub as f64,
        }
    }

    fn progress(&self, index: NodeIndex) -> SearchProgress {
        let bound = self.tree.node(index).bound;
        SearchProgress {
            depth: self.tree.node(index).depth,
            open_nodes: self.tree.open_count(),
            lower_bound: self.tree.min_open_bound().map_or(bound, |b| b.min(bound)),
            upper_bound: self.incumbent.upper_bound(),
        }
    }

    /// Processes a node, retrying once from the tour basis after an LP
    /// failure. Recoverable failures leave the node unresolved; fatal ones
    /// are returned.
    fn process_with_retry(&mut self, index: NodeIndex) -> Result<NodeFate> {
        let mut retried = false;
        loop {
            let mut error = match self.process_node(index) {
                Ok(fate) => return Ok(fate),
                Err(e) => e,
            };
            if matches!(error, Error::LpSolve { .. }) && !retried {
                retried = true;
                self.stats.on_lp_recovery();
                log::warn!("{} at node {}, retrying from the tour basis", error, index);
                match self.reset_lp() {
                    Ok(()) => continue,
                    Err(e) => error = e,
                }
            }
            if !error.is_node_recoverable() {
                return Err(error);
            }
            log::warn!("node {} left unresolved: {}", index, error);
            self.close_pruned(index, PruneReason::Budget);
            return Ok(NodeFate::Closed);
        }
    }

    fn reset_lp(&mut self) -> Result<()> {
        self.release_clamps()?;
        self.ws.pivot_back(self.instance)
    }

    /// Drops open nodes the incumbent now dominates.
    fn prune_dominated(&mut self) {
        let pruned = self.tree.prune_open(self.upper_bound() - PRUNE_GAP);
        for index in pruned {
            self.stats.on_pruning_bound();
            self.monitor
                .on_node_pruned(self.tree.node(index).depth, PruneReason::BoundDominated, &self.stats);
        }
    }

    fn close_pruned(&mut self, index: NodeIndex, reason: PruneReason) {
        let node = self.tree.node(index);
        let depth = node.depth;
        match reason {
            PruneReason::BoundDominated => self.stats.on_pruning_bound(),
            PruneReason::Infeasible => self.stats.on_pruning_infeasible(),
            PruneReason::Budget => {
                self.stats.on_pruning_budget();
                self.unresolved.push(node.bound);
            }
        }
        self.tree.close(index, NodeStatus::Pruned(reason));
        self.monitor.on_node_pruned(depth, reason, &self.stats);
    }

    fn release_clamps(&mut self) -> Result<()> {
        for ends in self.clamped.drain(..) {
            if let Some(j) = self.ws.lp.graph().find(ends) {
                self.ws.lp.set_col_bounds(j, 0.0, 1.0)?;
            }
        }
        Ok(())
    }

    /// Applies the clamps on the path to a node in place of the previous
    /// ones, adding clamped edges that left the core.
    fn apply_clamps(&mut self, clamps: &[(EndPts, BranchDirection)]) -> Result<()> {
        self.release_clamps()?;
        let missing: Vec<EndPts> = clamps
            .iter()
            .map(|c| c.0)
            .filter(|&e| !self.ws.lp.graph().contains(e))
            .collect();
        let added = self.ws.add_edges(self.instance, &missing)?;
        self.stats.on_edges_added(added as u64);
        for &(ends, direction) in clamps {
            let Some(j) = self.ws.lp.graph().find(ends) else {
                return Err(Error::cache_consistency(format!(
                    "clamped edge {} has no column",
                    ends
                )));
            };
            let (lb, ub) = direction.bounds();
            self.ws.lp.set_col_bounds(j, lb, ub)?;
            self.clamped.push(ends);
        }
        Ok(())
    }

    fn process_node(&mut self, index: NodeIndex) -> Result<NodeFate> {
        if self.tree.node(index).bound >= self.upper_bound() - PRUNE_GAP {
            self.close_pruned(index, PruneReason::BoundDominated);
            return Ok(NodeFate::Closed);
        }

        let clamps = self.tree.clamps(index);
        self.apply_clamps(&clamps)?;

        let (mut mode, needs_recover) = match self.tree.node(index).tour.clone() {
            Some(compressed) => {
                let tour = compressed.to_tour(self.tree.base())?;
                if self.incumbent.try_install(&tour) {
                    self.stats.on_incumbent_update();
                    self.monitor.on_incumbent_found(&tour, &self.stats);
                }
                if self.ws.tour()? != &tour {
                    self.ws.instate_tour(self.instance, tour)?;
                } else {
                    self.ws.pivot_back(self.instance)?;
                }
                (PivotMode::TourBasis, false)
            }
            None => {
                if let Some(basis) = self.tree.node(index).basis.clone() {
                    self.ws.lp.restore_basis(&basis)?;
                }
                (PivotMode::Optimize, true)
            }
        };
        if needs_recover && !self.recover(index)? {
            return Ok(NodeFate::Closed);
        }

        // Cut and price until the core is pricing-optimal.
        self.tree.node_mut(index).status = NodeStatus::NeedsCut;
        let mut recoveries = 0;
        let fathomed = loop {
            let outcome = {
                let mut report = CutReport {
                    incumbent: self.incumbent,
                    stats: &mut self.stats,
                    monitor: &mut *self.monitor,
                };
                self.cut_loop.run(self.instance, self.ws, mode, &mut report)?
            };
            let fathomed = match outcome {
                CutOutcome::Aborted(reason) => {
                    self.unresolved.push(self.tree.node(index).bound);
                    return Ok(NodeFate::Aborted(reason));
                }
                CutOutcome::Infeasible => {
                    recoveries += 1;
                    if recoveries > MAX_RECOVERIES {
                        return Err(Error::budget_exceeded(format!(
                            "LP still infeasible after {} recoveries",
                            MAX_RECOVERIES
                        )));
                    }
                    mode = PivotMode::Optimize;
                    if !self.recover(index)? {
                        return Ok(NodeFate::Closed);
                    }
                    continue;
                }
                CutOutcome::Fathomed => true,
                CutOutcome::Optimal => false,
            };

            self.tree.node_mut(index).status = NodeStatus::NeedsPrice;
            if self.pricer.is_enabled() {
                let priced = self.pricer.price(self.instance, &mut self.ws.lp, &self.ws.store)?;
                if let Some(bound) = priced.lagrangian_bound {
                    self.tree.raise_bound(index, bound);
                }
                if !priced.added.is_empty() {
                    self.stats.on_edges_added(priced.added.len() as u64);
                    self.tree.node_mut(index).status = NodeStatus::NeedsCut;
                    continue;
                }
                debug_assert_eq!(priced.stat, ScanStat::FullOpt);
                self.tree.raise_bound(index, self.ws.lp.objective_value());
            } else {
                let bound = self
                    .pricer
                    .lagrangian_bound(self.instance, &self.ws.lp, &self.ws.store);
                self.tree.raise_bound(index, bound);
            }
            break fathomed;
        };

        let bound = self.tree.node(index).bound;
        if self.tree.node(index).parent.is_none() {
            self.stats.set_root_lower_bound(bound);
        }
        log::info!(
            "node {} depth {}: bound {:.2}, incumbent {}, cuts {}, edges {}",
            index,
            self.tree.node(index).depth,
            bound,
            self.incumbent.upper_bound(),
            self.ws.store.len(),
            self.ws.lp.edge_count()
        );

        if bound >= self.upper_bound() - PRUNE_GAP {
            self.close_pruned(index, PruneReason::BoundDominated);
            return Ok(NodeFate::Closed);
        }
        if fathomed {
            // A tour optimal over the core only: nothing to branch on, and the
            // bound does not reach the incumbent.
            log::warn!(
                "node {} fathomed over the core with bound {:.2} below the incumbent",
                index,
                bound
            );
            self.close_pruned(index, PruneReason::Budget);
            return Ok(NodeFate::Closed);
        }

        self.tree.node_mut(index).status = NodeStatus::NeedsBranch;
        self.branch(index, &clamps)?;
        Ok(NodeFate::Closed)
    }

    /// Restores primal feasibility by pricing. Returns `false` and prunes
    /// the node if no tour satisfies its clamps.
    fn recover(&mut self, index: NodeIndex) -> Result<bool> {
        self.tree.node_mut(index).status = NodeStatus::NeedsRecover;
        let before = self.ws.lp.edge_count();
        let feasible = self
            .pricer
            .feas_recover(self.instance, &mut self.ws.lp, &self.ws.store)?;
        self.stats
            .on_edges_added(self.ws.lp.edge_count().saturating_sub(before) as u64);
        if !feasible {
            self.close_pruned(index, PruneReason::Infeasible);
        }
        Ok(feasible)
    }

    fn branch(&mut self, index: NodeIndex, clamps: &[(EndPts, BranchDirection)]) -> Result<()> {
        let Some(choice) = self.brancher.select(&self.ws.lp, &mut self.stats)? else {
            return Err(Error::budget_exceeded(
                "integral LP solution that is not a tour",
            ));
        };
        let ends = choice.candidate.ends;
        let depth = self.tree.node(index).depth;
        log::debug!(
            "branching on {} (x = {:.3}): down {:.3}, up {:.3}",
            ends,
            choice.candidate.x,
            choice.down,
            choice.up
        );

        let basis = self.ws.lp.save_basis();
        let parent_tour = match &self.tree.node(index).tour {
            Some(compressed) => compressed.to_tour(self.tree.base())?,
            None => self.ws.tour()?.clone(),
        };

        let mut children = Vec::with_capacity(2);
        for direction in [BranchDirection::Down, BranchDirection::Up] {
            let mut path = clamps.to_vec();
            path.push((ends, direction));
            let tour = match branch_tour::repair(&parent_tour, &path, self.instance) {
                Some(tour) => Some(CompressedTour::compress(&tour, self.tree.base_perm())?),
                None => None,
            };
            self.stats.on_basis_clone(basis.allocated_bytes());
            children.push(ChildSpec {
                branch: (ends, direction),
                estimate: choice.bound(direction),
                basis: Some(basis.clone()),
                tour,
            });
        }
        self.tree.push_children(index, children);
        self.stats.on_branch(2);
        self.monitor.on_branch(ends, depth, &self.stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use tourcut_cuts::sep::Separator;
    use tourcut_lp::relaxation::NewEdge;
    use tourcut_model::heuristics::{candidate_edges, initial_tour};
    use tourcut_model::instance::{EuclideanInstance, MatrixInstance};
    use tourcut_model::tour::Tour;
    use tourcut_search::monitor::no_op::NoOperationMonitor;
    use tourcut_search::monitor::node_limit::NodeLimitMonitor;
    use tourcut_search::result::SolverResult;

    fn build<I: Instance>(inst: &I, k: usize, config: BnbConfig) -> BranchAndCut {
        let tour = initial_tour(inst, 2, 7).unwrap();
        let core = candidate_edges(inst, k, &tour);
        build_with(inst, tour, &core, config)
    }

    /// A solver over exactly `core` plus whatever `tour` needs.
    fn build_with<I: Instance>(
        inst: &I,
        tour: Tour,
        core: &[EndPts],
        config: BnbConfig,
    ) -> BranchAndCut {
        let mut lp = Relaxation::new(inst.node_count()).unwrap();
        let edges: Vec<NewEdge> = core
            .iter()
            .map(|e| NewEdge::new(*e, inst.distance(e.u(), e.v())))
            .collect();
        lp.add_edges(&edges).unwrap();
        let missing: Vec<NewEdge> = lp
            .missing_tour_edges(&tour)
            .into_iter()
            .map(|e| NewEdge::new(e, inst.distance(e.u(), e.v())))
            .collect();
        lp.add_edges(&missing).unwrap();
        lp.instate_tour(tour).unwrap();
        BranchAndCut::new(config, lp, CutPool::new()).unwrap()
    }

    /// Brute force over all tours starting at node 0.
    fn brute_force<I: Instance>(inst: &I) -> i64 {
        fn permute<I: Instance>(
            inst: &I,
            rest: &mut Vec<usize>,
            path: &mut Vec<usize>,
            best: &mut i64,
        ) {
            if rest.is_empty() {
                let tour = Tour::new(path.clone(), inst).unwrap();
                *best = (*best).min(tour.length());
                return;
            }
            for i in 0..rest.len() {
                let node = rest.remove(i);
                path.push(node);
                permute(inst, rest, path, best);
                path.pop();
                rest.insert(i, node);
            }
        }
        let mut rest: Vec<usize> = (1..inst.node_count()).collect();
        let mut path = vec![0];
        let mut best = i64::MAX;
        permute(inst, &mut rest, &mut path, &mut best);
        best
    }

    fn pentagon() -> EuclideanInstance {
        let points = (0..5)
            .map(|k| {
                let a = k as f64 * std::f64::consts::TAU / 5.0;
                (100.0 * a.cos(), 100.0 * a.sin())
            })
            .collect();
        EuclideanInstance::new(points)
    }

    #[test]
    fn test_five_nodes_solved_at_the_root() {
        let inst = pentagon();
        let mut solver = build(&inst, 4, BnbConfig::default());
        let incumbent = SharedIncumbent::new();
        let mut monitor = NoOperationMonitor::new();
        let outcome = solver.solve(&inst, &incumbent, &mut monitor);

        let optimum: i64 = (0..5).map(|i| inst.distance(i, (i + 1) % 5)).sum();
        assert!(outcome.is_optimal(), "{}", outcome);
        assert_eq!(outcome.tour().unwrap().length(), optimum);
        assert_eq!(outcome.lower_bound, optimum as f64);
        assert_eq!(outcome.statistics.branch_nodes, 0);
    }

    #[test]
    fn test_random_instances_match_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for round in 0..3 {
            let inst = EuclideanInstance::random(8, 1000.0, rng.random::<u64>());
            let mut solver = build(&inst, 3, BnbConfig::default());
            let incumbent = SharedIncumbent::new();
            let mut monitor = NoOperationMonitor::new();
            let outcome = solver.solve(&inst, &incumbent, &mut monitor);
            assert!(outcome.is_optimal(), "round {}: {}", round, outcome);
            assert_eq!(outcome.tour().unwrap().length(), brute_force(&inst));
            assert!(outcome.lower_bound <= outcome.tour().unwrap().length() as f64);
        }
    }

    #[test]
    fn test_disabling_pricing_keeps_a_valid_bound() {
        let inst = EuclideanInstance::random(9, 1000.0, 5);
        let optimum = brute_force(&inst);
        let config =
            BnbConfig::default().with_pricing(PricingConfig::default().with_enabled(false));
        let mut solver = build(&inst, 2, config);
        let incumbent = SharedIncumbent::new();
        let mut monitor = NoOperationMonitor::new();
        let outcome = solver.solve(&inst, &incumbent, &mut monitor);
        assert!(outcome.lower_bound <= optimum as f64 + 1e-6);
        assert!(outcome.statistics.root_lower_bound <= optimum as f64 + 1e-6);
    }

    fn solve(solver: &mut BranchAndCut, inst: &impl Instance) -> SolverOutcome {
        let incumbent = SharedIncumbent::new();
        let mut monitor = NoOperationMonitor::new();
        solver.solve(inst, &incumbent, &mut monitor)
    }

    fn subtour_only() -> BnbConfig {
        BnbConfig::default().with_separation(
            SeparationConfig::default()
                .with_routines(vec![Separator::Connect, Separator::ExactSubtour]),
        )
    }

    fn prism() -> MatrixInstance {
        MatrixInstance::from_fn(6, |u, v| {
            if (u < 3) == (v < 3) {
                2
            } else if u % 3 == v % 3 {
                1
            } else {
                10
            }
        })
        .unwrap()
    }

    #[test]
    fn test_core_fathomed_node_without_pricing_is_not_proven() {
        let inst = pentagon();
        let perimeter: i64 = (0..5).map(|i| inst.distance(i, (i + 1) % 5)).sum();
        let core: Vec<EndPts> = (0..5)
            .flat_map(|u| ((u + 1)..5).map(move |v| EndPts::new(u, v)))
            .filter(|&e| e != EndPts::new(0, 1))
            .collect();
        let tour = Tour::new(vec![0, 2, 1, 3, 4], &inst).unwrap();
        let config =
            BnbConfig::default().with_pricing(PricingConfig::default().with_enabled(false));
        let mut solver = build_with(&inst, tour, &core, config);
        let outcome = solve(&mut solver, &inst);

        // The best tour over the core skips {0, 1} and is not optimal.
        assert!(outcome.tour().unwrap().length() > perimeter);
        assert!(!outcome.is_optimal(), "{}", outcome);
        assert!(matches!(outcome.reason, TerminationReason::Aborted(_)));
        assert!(outcome.lower_bound.is_finite());
        assert!(outcome.lower_bound <= perimeter as f64 + 1e-6);
    }

    #[test]
    fn test_adopted_tour_without_chord_does_not_fail_the_run() {
        let inst = EuclideanInstance::random(12, 1000.0, 460);
        let tour = Tour::new((0..12).collect(), &inst).unwrap();
        let core = candidate_edges(&inst, 2, &tour);
        let mut solver = build_with(&inst, tour, &core, BnbConfig::default());
        let outcome = solve(&mut solver, &inst);
        assert!(!matches!(outcome.reason, TerminationReason::Failed(_)), "{}", outcome);
        assert!(outcome.is_optimal(), "{}", outcome);
        assert_eq!(outcome.tour().unwrap().length(), 3573);
    }

    #[test]
    fn test_subtour_only_separation_still_proves_optimality() {
        for n in 10..=14 {
            for seed in [68, 94, 188] {
                let inst = EuclideanInstance::random(n, 1000.0, seed);
                let mut solver = build(&inst, 3, subtour_only());
                let outcome = solve(&mut solver, &inst);
                assert!(outcome.is_optimal(), "n {} seed {}: {}", n, seed, outcome);
                let length = outcome.tour().unwrap().length();
                assert_eq!(outcome.lower_bound, length as f64, "n {} seed {}", n, seed);
                if n == 10 {
                    assert_eq!(length, brute_force(&inst), "seed {}", seed);
                }
            }
        }
    }

    #[test]
    fn test_seeded_instances_match_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for n in 5..=9 {
            for _ in 0..2 {
                let seed = rng.random::<u64>();
                let inst = EuclideanInstance::random(n, 1000.0, seed);
                let optimum = brute_force(&inst);
                for config in [BnbConfig::default(), subtour_only()] {
                    let mut solver = build(&inst, 3, config);
                    let outcome = solve(&mut solver, &inst);
                    assert!(outcome.is_optimal(), "n {} seed {}: {}", n, seed, outcome);
                    assert_eq!(outcome.tour().unwrap().length(), optimum, "n {} seed {}", n, seed);
                }
            }
        }
    }

    #[test]
    fn test_child_bounds_never_drop_below_the_parent() {
        let inst = prism();
        let config = BnbConfig::default().with_separation(
            SeparationConfig::default().with_routines(vec![Separator::Connect]),
        );
        let mut solver = build(&inst, 5, config);
        let incumbent = SharedIncumbent::new();
        let mut monitor = NoOperationMonitor::new();
        let mut session = SearchSession::new(&mut solver, &inst, &incumbent, &mut monitor).unwrap();
        session.initialize().unwrap();

        let root = session.tree.pop().unwrap();
        assert!(matches!(session.process_with_retry(root), Ok(NodeFate::Closed)));
        // Subtour cuts alone stop at the half-integral prism.
        assert!(session.tree.node(root).bound < 10.0 - PRUNE_GAP);
        assert_eq!(session.tree.open_count(), 2);

        let mut processed = 0;
        while let Some(index) = session.tree.pop() {
            let parent = session.tree.node(index).parent.unwrap();
            let parent_bound = session.tree.node(parent).bound;
            assert!(session.tree.node(index).bound >= parent_bound);
            assert!(matches!(session.process_with_retry(index), Ok(NodeFate::Closed)));
            assert!(session.tree.node(index).bound >= parent_bound - 1e-9);
            processed += 1;
        }
        assert!(processed >= 2);
        assert!(session.unresolved.is_empty());
        assert_eq!(incumbent.upper_bound(), 10);
    }

    #[test]
    fn test_prism_needs_a_cut_not_a_branch() {
        let inst = prism();
        let mut solver = build(&inst, 5, BnbConfig::default());
        let incumbent = SharedIncumbent::new();
        let mut monitor = NoOperationMonitor::new();
        let outcome = solver.solve(&inst, &incumbent, &mut monitor);
        assert!(outcome.is_optimal(), "{}", outcome);
        assert_eq!(outcome.tour().unwrap().length(), 10);
        assert!(outcome.statistics.total_cuts_added() >= 1);
    }

    #[test]
    fn test_node_limit_reports_a_gap() {
        let inst = EuclideanInstance::random(12, 1000.0, 9);
        let mut solver = build(&inst, 4, BnbConfig::default());
        let incumbent = SharedIncumbent::new();
        let mut monitor = NodeLimitMonitor::new(0);
        let outcome = solver.solve(&inst, &incumbent, &mut monitor);
        assert!(!outcome.is_optimal());
        assert!(matches!(outcome.reason, TerminationReason::Aborted(_)));
        assert!(matches!(outcome.result, SolverResult::Feasible(_)));
        assert!(outcome.lower_bound <= outcome.tour().unwrap().length() as f64);
    }

    #[test]
    fn test_better_shared_incumbent_is_kept() {
        let inst = EuclideanInstance::random(7, 1000.0, 3);
        let optimum = brute_force(&inst);
        let mut solver = build(&inst, 6, BnbConfig::default());
        let incumbent = SharedIncumbent::new();
        let mut monitor = NoOperationMonitor::new();
        let first = solver.solve(&inst, &incumbent, &mut monitor);
        assert!(first.is_optimal());
        // A second solve with the optimum already shared prunes at the root.
        let second = solver.solve(&inst, &incumbent, &mut monitor);
        assert!(second.is_optimal());
        assert_eq!(second.tour().unwrap().length(), optimum);
    }

    #[test]
    fn test_mismatched_instance_fails() {
        let inst = pentagon();
        let mut solver = build(&inst, 4, BnbConfig::default());
        let other = EuclideanInstance::random(6, 10.0, 1);
        let incumbent = SharedIncumbent::new();
        let mut monitor = NoOperationMonitor::new();
        let outcome = solver.solve(&other, &incumbent, &mut monitor);
        assert!(matches!(outcome.reason, TerminationReason::Failed(_)));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = BnbConfig::default()
            .with_branching(BranchConfig::default().with_candidates(3));
        let json = serde_json::to_string(&config).unwrap();
        let back: BnbConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert!(BnbConfig::default().validate().is_ok());
    }
}
