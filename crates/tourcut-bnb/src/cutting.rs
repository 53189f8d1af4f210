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

//! The cutting loop of one node.
//!
//! Pivots the LP, separates violated cuts from the pivoted solution, returns
//! to the tour basis, installs the cuts and pivots again. Routines are walked
//! in configured order; the walk restarts from the first routine when a pivot
//! yields a subtour, a disconnected support, or closes at least `ph_ratio`
//! of the gap between the first pivot and the tour. A pass over the routines
//! that still found cuts is repeated while it closed `first_last_ratio` of
//! that gap. Cut and edge aging happen on pivot-back.
//!
//! Nodes without a usable tour basis (a branch node whose parent tour could
//! not be repaired) run in [`PivotMode::Optimize`]: each pivot is a dual
//! simplex re-optimization and there is no pivot-back.

use crate::config::CuttingConfig;
use crate::workspace::Workspace;
use tourcut_core::error::{Error, Result};
use tourcut_core::tolerance::{EPS_INTEGRAL, EPS_ZERO};
use tourcut_cuts::sep::{
    AcceptancePolicy, CandidateCut, SeparationContext, SeparationEngine, Separator,
};
use tourcut_lp::engine::{LpEngine, SolveStatus};
use tourcut_lp::relaxation::PivType;
use tourcut_model::instance::Instance;
use tourcut_model::tour::Tour;
use tourcut_search::incumbent::SharedIncumbent;
use tourcut_search::monitor::search_monitor::{SearchCommand, SearchMonitor};
use tourcut_search::stats::SolverStatistics;

/// Return code of an unbounded re-optimization.
const CODE_UNBOUNDED: i32 = 12;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PivotMode {
    /// Non-degenerate pivots from the tour basis, pivot-back between rounds.
    TourBasis,
    /// Plain re-optimization from the current basis.
    Optimize,
}

#[derive(Clone, PartialEq, Debug)]
pub enum CutOutcome {
    /// The LP is optimal and no routine finds a cut worth another pass.
    Optimal,
    /// The LP optimum is a tour.
    Fathomed,
    /// The LP became infeasible.
    Infeasible,
    /// A monitor asked to stop.
    Aborted(String),
}

/// Objective values seen by the loop, relative to the tour length.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PivStats {
    initial: f64,
    previous: f64,
    current: f64,
    round_start: f64,
    lowest: f64,
    upper: f64,
}

impl PivStats {
    pub fn new(first: f64, upper: f64) -> Self {
        Self {
            initial: first,
            previous: first,
            current: first,
            round_start: first,
            lowest: first,
            upper,
        }
    }

    pub fn record(&mut self, value: f64) {
        self.previous = self.current;
        self.current = value;
        self.lowest = self.lowest.min(value);
    }

    #[inline]
    pub fn start_round(&mut self) {
        self.round_start = self.current;
    }

    #[inline]
    pub fn set_upper(&mut self, upper: f64) {
        self.upper = upper;
    }

    #[inline]
    fn gap(&self) -> f64 {
        (self.upper - self.initial).max(1.0)
    }

    /// Share of the gap closed by the last pivot.
    #[inline]
    pub fn delta_ratio(&self) -> f64 {
        (self.current - self.previous) / self.gap()
    }

    /// Share of the gap closed since the round started.
    #[inline]
    pub fn first_last_ratio(&self) -> f64 {
        (self.current - self.round_start) / self.gap()
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    #[inline]
    pub fn lowest(&self) -> f64 {
        self.lowest
    }
}

/// Observers and shared state a cutting loop reports to.
pub struct CutReport<'a, M: SearchMonitor + ?Sized> {
    pub incumbent: &'a SharedIncumbent,
    pub stats: &'a mut SolverStatistics,
    pub monitor: &'a mut M,
}

enum Pass {
    Done { found: bool },
    Stop(CutOutcome),
}

#[derive(Clone, Debug)]
pub struct CutLoop {
    config: CuttingConfig,
    engine: SeparationEngine,
}

impl CutLoop {
    pub fn new(config: CuttingConfig, engine: SeparationEngine) -> Self {
        Self { config, engine }
    }

    #[inline]
    pub fn config(&self) -> &CuttingConfig {
        &self.config
    }

    #[inline]
    pub fn separation(&self) -> &SeparationEngine {
        &self.engine
    }

    /// Routine groups walked by one pass: single routines under
    /// `FirstFound`, the whole list at once under `BestOfAll`.
    fn groups(&self) -> Vec<Vec<Separator>> {
        match self.engine.config().acceptance {
            AcceptancePolicy::FirstFound => {
                self.engine.routines().iter().map(|&r| vec![r]).collect()
            }
            AcceptancePolicy::BestOfAll => vec![self.engine.routines().to_vec()],
        }
    }

    /// Runs the loop until the LP is optimal with no further progress, the
    /// optimum is a tour, the LP turns infeasible, or a monitor stops it.
    ///
    /// On `Optimal` the engine holds an optimal basis, ready for pricing.
    pub fn run<I, E, M>(
        &self,
        instance: &I,
        ws: &mut Workspace<E>,
        mode: PivotMode,
        report: &mut CutReport<'_, M>,
    ) -> Result<CutOutcome>
    where
        I: Instance + ?Sized,
        E: LpEngine,
        M: SearchMonitor + ?Sized,
    {
        ws.sync_teeth()?;
        let mut rounds = 0usize;

        if let SearchCommand::Terminate(reason) = report.monitor.search_command(report.stats) {
            return Ok(CutOutcome::Aborted(reason));
        }
        let mut piv = match self.step(instance, ws, mode, report, &mut rounds)? {
            Some(piv) => piv,
            None => return Ok(CutOutcome::Infeasible),
        };
        if piv == PivType::FathomedTour {
            return Ok(CutOutcome::Fathomed);
        }
        let mut pstats = PivStats::new(ws.lp.objective_value(), ws.tour()?.length() as f64);

        loop {
            pstats.start_round();
            match self.pass(instance, ws, mode, report, &mut piv, &mut pstats, &mut rounds)? {
                Pass::Stop(outcome) => return Ok(outcome),
                Pass::Done { found: true }
                    if pstats.first_last_ratio() >= self.config.first_last_ratio =>
                {
                    continue;
                }
                Pass::Done { .. } => {}
            }

            if ws.lp.primal_feasible() && ws.lp.dual_feasible() {
                return Ok(CutOutcome::Optimal);
            }
            // The last pivot stopped at the objective limit; finish the LP and
            // walk the routines again over the true optimum.
            rounds += 1;
            if rounds > self.config.max_rounds {
                return Err(Error::budget_exceeded(format!(
                    "{} pivots without resolving the node",
                    self.config.max_rounds
                )));
            }
            let status = ws.lp.primal_pivot()?;
            report.stats.on_pivot();
            match status {
                SolveStatus::Infeasible => return Ok(CutOutcome::Infeasible),
                SolveStatus::Unbounded => {
                    return Err(Error::lp_solve("primal_pivot", CODE_UNBOUNDED));
                }
                _ => {}
            }
            report.monitor.on_pivot(ws.lp.objective_value(), report.stats);
            piv = ws.lp.classify()?;
            if matches!(piv, PivType::Tour | PivType::FathomedTour)
                && self.absorb_tour(instance, ws, report)? == PivType::FathomedTour
            {
                return Ok(CutOutcome::Fathomed);
            }
            pstats.record(ws.lp.objective_value());
        }
    }

    /// One walk over the routine groups starting from the current pivot.
    #[allow(clippy::too_many_arguments)]
    fn pass<I, E, M>(
        &self,
        instance: &I,
        ws: &mut Workspace<E>,
        mode: PivotMode,
        report: &mut CutReport<'_, M>,
        piv: &mut PivType,
        pstats: &mut PivStats,
        rounds: &mut usize,
    ) -> Result<Pass>
    where
        I: Instance + ?Sized,
        E: LpEngine,
        M: SearchMonitor + ?Sized,
    {
        let groups = self.groups();
        let mut found_any = false;
        let mut g = 0;
        while g < groups.len() {
            let cuts = self.separate(ws, &groups[g])?;
            if cuts.is_empty() {
                g += 1;
                continue;
            }
            found_any = true;

            if let SearchCommand::Terminate(reason) = report.monitor.search_command(report.stats) {
                return Ok(Pass::Stop(CutOutcome::Aborted(reason)));
            }
            self.pivot_back(instance, ws, mode, report)?;
            for cand in &cuts {
                ws.store.install(&cand.cut, &mut ws.lp)?;
                report.stats.on_cuts_added(cand.cut.kind().as_index(), 1);
            }
            report.stats.on_cut_round();
            report.monitor.on_cuts_added(cuts.len(), report.stats);

            *piv = match self.step(instance, ws, mode, report, rounds)? {
                Some(piv) => piv,
                None => return Ok(Pass::Stop(CutOutcome::Infeasible)),
            };
            if *piv == PivType::FathomedTour {
                return Ok(Pass::Stop(CutOutcome::Fathomed));
            }
            pstats.set_upper(ws.tour()?.length() as f64);
            pstats.record(ws.lp.objective_value());

            let restart = *piv == PivType::Subtour
                || !ws.lp.support().is_connected()
                || pstats.delta_ratio() >= self.config.ph_ratio;
            g = if restart { 0 } else { g + 1 };
        }
        Ok(Pass::Done { found: found_any })
    }

    fn separate<E: LpEngine>(
        &self,
        ws: &mut Workspace<E>,
        group: &[Separator],
    ) -> Result<Vec<CandidateCut>> {
        let support = ws.lp.support();
        let Some(tour) = ws.lp.tour() else {
            return Err(Error::invalid_input("the relaxation has no reference tour"));
        };
        let mut ctx = SeparationContext::new(&support, tour, &ws.store, &ws.pool, &mut ws.teeth);
        if group.len() == 1 {
            self.engine.run_routine(group[0], &mut ctx)
        } else {
            self.engine.separate(&mut ctx)
        }
    }

    /// Pivots once and classifies the vertex. `None` means the LP is
    /// infeasible.
    fn step<I, E, M>(
        &self,
        instance: &I,
        ws: &mut Workspace<E>,
        mode: PivotMode,
        report: &mut CutReport<'_, M>,
        rounds: &mut usize,
    ) -> Result<Option<PivType>>
    where
        I: Instance + ?Sized,
        E: LpEngine,
        M: SearchMonitor + ?Sized,
    {
        loop {
            *rounds += 1;
            if *rounds > self.config.max_rounds {
                return Err(Error::budget_exceeded(format!(
                    "{} pivots without resolving the node",
                    self.config.max_rounds
                )));
            }
            let piv = match mode {
                PivotMode::TourBasis => ws.lp.pivot()?,
                PivotMode::Optimize => match ws.lp.dual_pivot()? {
                    SolveStatus::Infeasible => return Ok(None),
                    SolveStatus::Unbounded => {
                        return Err(Error::lp_solve("dual_pivot", CODE_UNBOUNDED));
                    }
                    _ => ws.lp.classify()?,
                },
            };
            report.stats.on_pivot();
            report.monitor.on_pivot(ws.lp.objective_value(), report.stats);
            log::debug!(
                "pivot {}: {} at {:.4}",
                rounds,
                piv,
                ws.lp.objective_value()
            );
            match piv {
                PivType::Tour | PivType::FathomedTour => {
                    if self.absorb_tour(instance, ws, report)? == PivType::FathomedTour {
                        return Ok(Some(PivType::FathomedTour));
                    }
                }
                PivType::Frac | PivType::Subtour => return Ok(Some(piv)),
            }
        }
    }

    /// Handles an integral connected vertex: offers it to the incumbent and
    /// completes the reference tour if classification adopted it without a
    /// basis. Returns `FathomedTour` if the vertex is dual feasible over the
    /// completed core.
    fn absorb_tour<I, E, M>(
        &self,
        instance: &I,
        ws: &mut Workspace<E>,
        report: &mut CutReport<'_, M>,
    ) -> Result<PivType>
    where
        I: Instance + ?Sized,
        E: LpEngine,
        M: SearchMonitor + ?Sized,
    {
        let fathomed = ws.lp.dual_feasible();
        if let Some(nodes) = ws.lp.support().tour_from_integral() {
            let tour = Tour::new(nodes, instance)?;
            if report.incumbent.try_install(&tour) {
                report.stats.on_incumbent_update();
                report.monitor.on_incumbent_found(&tour, report.stats);
                log::info!("new incumbent of length {} from the LP", tour.length());
            }
        }
        if fathomed {
            // Keep the optimal basis; the tour gets its chord and basis behind it.
            if ws.lp.has_tour_basis() {
                ws.sync_teeth()?;
            } else {
                let optimal = ws.lp.save_basis();
                ws.complete_adopted_tour(instance)?;
                ws.lp.restore_basis(&optimal)?;
            }
            if ws.lp.dual_feasible() {
                return Ok(PivType::FathomedTour);
            }
            return Ok(PivType::Tour);
        }
        ws.complete_adopted_tour(instance)?;
        Ok(PivType::Tour)
    }

    /// Ages cuts and edges from the pivoted solution, returns to the tour
    /// basis and evicts what aged out.
    fn pivot_back<I, E, M>(
        &self,
        instance: &I,
        ws: &mut Workspace<E>,
        mode: PivotMode,
        report: &mut CutReport<'_, M>,
    ) -> Result<()>
    where
        I: Instance + ?Sized,
        E: LpEngine,
        M: SearchMonitor + ?Sized,
    {
        let slacks = ws.lp.row_slacks();
        ws.store.age_tick(&slacks, EPS_INTEGRAL);
        ws.age_edges(EPS_ZERO);
        if mode == PivotMode::TourBasis {
            ws.pivot_back(instance)?;
        }

        let pruned = ws.store.prune(self.config.cut_age_limit, &mut ws.lp)?;
        if !pruned.is_empty() {
            report.stats.on_cuts_pruned(pruned.len() as u64);
            ws.pool.extend(pruned);
        }
        if mode == PivotMode::TourBasis {
            let stale = ws.stale_edges(self.config.edge_age_limit);
            let removed = ws.remove_edges(&stale)?;
            if removed > 0 {
                report.stats.on_edges_removed(removed as u64);
                log::debug!("removed {} aged edges from the core", removed);
            }
        }
        Ok(())
    }
}
