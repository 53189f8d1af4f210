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

//! # Branch-and-Cut Solver
//!
//! The top-level entry point. A `Solver` turns an [`Instance`] into a
//! ready-to-search relaxation and runs [`BranchAndCut`] under the monitors
//! its configuration asks for.
//!
//! ## Run
//!
//! 1. Build a starting tour from randomized nearest-neighbour starts
//!    improved by local search.
//! 2. Seed the core edge set with the `candidate_k` nearest neighbours of
//!    every node plus the tour edges, and instate the tour basis.
//! 3. Load the cut pool file, if configured and present.
//! 4. Search with a composite monitor: periodic progress logging, the
//!    interrupt flag, and the optional time and node limits.
//! 5. Merge the live cuts into the pool and save it back.
//!
//! ## Sharing
//!
//! The incumbent is a [`SharedIncumbent`]; `solve_shared` lets several
//! solvers work against one bound. The interrupt flag can be raised from
//! any thread through [`Solver::interrupt`] and stays raised until cleared.
//!
//! ## Usage
//!
//! ```rust
//! use tourcut_model::instance::EuclideanInstance;
//! use tourcut_solver::config::SolverConfig;
//! use tourcut_solver::solver::SolverBuilder;
//!
//! let instance = EuclideanInstance::random(8, 1000.0, 1);
//! let solver = SolverBuilder::new()
//!     .with_config(SolverConfig::default().with_seed(1))
//!     .build()
//!     .unwrap();
//! let outcome = solver.solve(&instance).unwrap();
//! assert!(outcome.is_optimal());
//! ```

use crate::config::SolverConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tourcut_bnb::bnb::BranchAndCut;
use tourcut_core::error::Result;
use tourcut_cuts::pool::CutPool;
use tourcut_lp::relaxation::{NewEdge, Relaxation};
use tourcut_model::graph::EndPts;
use tourcut_model::heuristics::{candidate_edges, initial_tour};
use tourcut_model::instance::Instance;
use tourcut_model::tour::Tour;
use tourcut_search::incumbent::SharedIncumbent;
use tourcut_search::monitor::{
    composite::CompositeMonitor, interrupt::InterruptMonitor, log::LogMonitor,
    node_limit::NodeLimitMonitor, time_limit::TimeLimitMonitor,
};
use tourcut_search::result::SolverOutcome;

#[derive(Debug)]
pub struct Solver {
    config: SolverConfig,
    incumbent: SharedIncumbent,
    stop_signal: AtomicBool,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            incumbent: SharedIncumbent::new(),
            stop_signal: AtomicBool::new(false),
        })
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[inline]
    pub fn incumbent(&self) -> &SharedIncumbent {
        &self.incumbent
    }

    /// Asks a running search to stop at its next check.
    #[inline]
    pub fn interrupt(&self) {
        self.stop_signal.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_interrupt(&self) {
        self.stop_signal.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.stop_signal.load(Ordering::Relaxed)
    }

    /// Solves `instance` against the solver's own incumbent.
    ///
    /// Setup failures (too few nodes, an unreadable pool file) are returned
    /// as errors; failures during the search end up in the outcome.
    pub fn solve<I>(&self, instance: &I) -> Result<SolverOutcome>
    where
        I: Instance + ?Sized,
    {
        self.solve_shared(instance, &self.incumbent)
    }

    pub fn solve_shared<I>(
        &self,
        instance: &I,
        incumbent: &SharedIncumbent,
    ) -> Result<SolverOutcome>
    where
        I: Instance + ?Sized,
    {
        let n = instance.node_count();
        let tour = initial_tour(instance, self.config.restarts, self.config.seed)?;
        log::info!("starting tour over {} nodes has length {}", n, tour.length());

        let lp = self.build_relaxation(instance, tour)?;
        let pool = self.load_pool()?;
        let mut bnc = BranchAndCut::new(self.config.bnb_config(), lp, pool)?;

        let outcome = {
            let mut monitor = self.build_monitor();
            bnc.solve(instance, incumbent, &mut monitor)
        };
        log::info!("{}", outcome);

        self.save_pool(&bnc);
        Ok(outcome)
    }

    fn build_relaxation<I>(&self, instance: &I, tour: Tour) -> Result<Relaxation>
    where
        I: Instance + ?Sized,
    {
        let new_edge = |e: EndPts| NewEdge::new(e, instance.distance(e.u(), e.v()));
        let mut lp = Relaxation::new(instance.node_count())?;
        let edges: Vec<NewEdge> = candidate_edges(instance, self.config.candidate_k, &tour)
            .into_iter()
            .map(new_edge)
            .collect();
        lp.add_edges(&edges)?;
        // The tour basis of an even tour needs its chord.
        let chord: Vec<NewEdge> = lp
            .missing_tour_edges(&tour)
            .into_iter()
            .map(new_edge)
            .collect();
        lp.add_edges(&chord)?;
        log::debug!("initial core holds {} edges", lp.edge_count());
        lp.instate_tour(tour)?;
        Ok(lp)
    }

    fn load_pool(&self) -> Result<CutPool> {
        match &self.config.pool_path {
            Some(path) if path.exists() => {
                let pool = CutPool::load_json(path)?;
                log::info!("loaded {} pool cuts from {}", pool.len(), path.display());
                Ok(pool)
            }
            _ => Ok(CutPool::new()),
        }
    }

    /// A save failure is logged and does not discard the outcome.
    fn save_pool(&self, bnc: &BranchAndCut) {
        let Some(path) = &self.config.pool_path else {
            return;
        };
        let mut pool = bnc.pool().clone();
        let merged = pool.extend(bnc.workspace().store.records());
        log::debug!("merged {} live cuts into the pool", merged);
        if let Err(e) = pool.save_json(path) {
            log::error!("could not save the cut pool to {}: {}", path.display(), e);
        }
    }

    fn build_monitor(&self) -> CompositeMonitor<'_> {
        let mut monitor = CompositeMonitor::with_capacity(4);
        monitor.add_monitor(LogMonitor::new(self.config.log_interval()));
        monitor.add_monitor(InterruptMonitor::new(&self.stop_signal));
        if let Some(limit) = self.config.time_limit() {
            monitor.add_monitor(TimeLimitMonitor::new(limit));
        }
        if let Some(limit) = self.config.node_limit {
            monitor.add_monitor(NodeLimitMonitor::new(limit));
        }
        monitor
    }
}

#[derive(Debug, Default)]
pub struct SolverBuilder {
    config: SolverConfig,
    initial_tour: Option<Tour>,
}

impl SolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.config = self.config.with_time_limit(limit);
        self
    }

    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.config = self.config.with_node_limit(limit);
        self
    }

    /// A known tour the search starts from as its incumbent.
    pub fn with_initial_tour(mut self, tour: Tour) -> Self {
        self.initial_tour = Some(tour);
        self
    }

    pub fn build(self) -> Result<Solver> {
        let mut solver = Solver::new(self.config)?;
        if let Some(tour) = self.initial_tour {
            solver.incumbent = SharedIncumbent::with_tour(tour);
        }
        Ok(solver)
    }
}
