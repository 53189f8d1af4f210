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

//! A dense bounded-variable simplex implementing [`LpEngine`].
//!
//! This is the reference engine behind the relaxation manager. It keeps an
//! explicit basis inverse that is rebuilt by Gauss-Jordan elimination every
//! `refactor_interval` pivots and updated by a product-form step in between.
//! Pricing is Dantzig's rule, switching to Bland's rule after a run of
//! degenerate pivots. Phase one minimizes the sum of bound violations of the
//! basic variables, stopping at the first breakpoint.
//!
//! The engine is sized for the few hundred rows and columns of a core LP on
//! small and medium instances; larger runs should plug in a sparse engine
//! through the same trait.

use crate::engine::{Basis, BasisStatus, LpEngine, Sense, SolveLimits, SolveStatus, SparseRow};
use tourcut_core::error::{Error, Result};

/// Return code: basis could not be factored even after repair.
pub const CODE_SINGULAR: i32 = 1;
/// Return code: argument dimensions do not match the model.
pub const CODE_DIMENSION: i32 = 2;
/// Return code: simplex exceeded its internal iteration ceiling.
pub const CODE_STALLED: i32 = 3;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DenseSimplexConfig {
    pub feasibility_tol: f64,
    pub optimality_tol: f64,
    pub pivot_tol: f64,
    pub refactor_interval: usize,
    /// Consecutive degenerate pivots before switching to Bland's rule.
    pub bland_after: usize,
}

impl Default for DenseSimplexConfig {
    fn default() -> Self {
        Self {
            feasibility_tol: 1e-9,
            optimality_tol: 1e-9,
            pivot_tol: 1e-9,
            refactor_interval: 50,
            bland_after: 40,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Var {
    Col(usize),
    Slack(usize),
}

#[derive(Clone, Debug)]
struct Column {
    obj: f64,
    lb: f64,
    ub: f64,
    entries: Vec<(usize, f64)>,
}

#[derive(Clone, Copy, Debug)]
struct Row {
    sense: Sense,
    rhs: f64,
}

enum Entering {
    None,
    Chosen { var: Var, increase: bool },
}

enum Step {
    Pivoted { length: f64 },
    Unbounded,
}

#[derive(Clone, Debug)]
pub struct DenseSimplex {
    cols: Vec<Column>,
    rows: Vec<Row>,
    col_status: Vec<BasisStatus>,
    row_status: Vec<BasisStatus>,
    col_values: Vec<f64>,
    row_values: Vec<f64>,
    head: Vec<Var>,
    binv: Vec<f64>,
    iterations: u64,
    pivots_since_refactor: usize,
    farkas: Option<Vec<f64>>,
    config: DenseSimplexConfig,
}

impl Default for DenseSimplex {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseSimplex {
    pub fn new() -> Self {
        Self::with_config(DenseSimplexConfig::default())
    }

    pub fn with_config(config: DenseSimplexConfig) -> Self {
        Self {
            cols: Vec::new(),
            rows: Vec::new(),
            col_status: Vec::new(),
            row_status: Vec::new(),
            col_values: Vec::new(),
            row_values: Vec::new(),
            head: Vec::new(),
            binv: Vec::new(),
            iterations: 0,
            pivots_since_refactor: 0,
            farkas: None,
            config,
        }
    }

    #[inline]
    fn m(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    fn bounds(&self, var: Var) -> (f64, f64) {
        match var {
            Var::Col(j) => (self.cols[j].lb, self.cols[j].ub),
            Var::Slack(i) => match self.rows[i].sense {
                Sense::Equal => (0.0, 0.0),
                Sense::GreaterEqual => (f64::NEG_INFINITY, 0.0),
                Sense::LessEqual => (0.0, f64::INFINITY),
            },
        }
    }

    #[inline]
    fn status(&self, var: Var) -> BasisStatus {
        match var {
            Var::Col(j) => self.col_status[j],
            Var::Slack(i) => self.row_status[i],
        }
    }

    #[inline]
    fn set_status(&mut self, var: Var, status: BasisStatus) {
        match var {
            Var::Col(j) => self.col_status[j] = status,
            Var::Slack(i) => self.row_status[i] = status,
        }
    }

    #[inline]
    fn value(&self, var: Var) -> f64 {
        match var {
            Var::Col(j) => self.col_values[j],
            Var::Slack(i) => self.row_values[i],
        }
    }

    #[inline]
    fn set_value(&mut self, var: Var, value: f64) {
        match var {
            Var::Col(j) => self.col_values[j] = value,
            Var::Slack(i) => self.row_values[i] = value,
        }
    }

    #[inline]
    fn cost(&self, var: Var) -> f64 {
        match var {
            Var::Col(j) => self.cols[j].obj,
            Var::Slack(_) => 0.0,
        }
    }

    fn vars(&self) -> impl Iterator<Item = Var> + use<> {
        let n = self.cols.len();
        let m = self.rows.len();
        (0..n).map(Var::Col).chain((0..m).map(Var::Slack))
    }

    /// `y . a_var`
    #[inline]
    fn col_dot(&self, y: &[f64], var: Var) -> f64 {
        match var {
            Var::Col(j) => self.cols[j].entries.iter().map(|&(r, a)| y[r] * a).sum(),
            Var::Slack(i) => y[i],
        }
    }

    /// `B^-1 a_var`
    fn ftran(&self, var: Var) -> Vec<f64> {
        let m = self.m();
        let mut w = vec![0.0; m];
        match var {
            Var::Col(j) => {
                for &(r, a) in &self.cols[j].entries {
                    for (k, wk) in w.iter_mut().enumerate() {
                        *wk += self.binv[k * m + r] * a;
                    }
                }
            }
            Var::Slack(i) => {
                for (k, wk) in w.iter_mut().enumerate() {
                    *wk = self.binv[k * m + i];
                }
            }
        }
        w
    }

    /// `c_B^T B^-1` for the given basic costs.
    fn btran(&self, basic_costs: &[f64]) -> Vec<f64> {
        let m = self.m();
        let mut y = vec![0.0; m];
        for (k, &c) in basic_costs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            let row = &self.binv[k * m..(k + 1) * m];
            for (yi, &b) in y.iter_mut().zip(row) {
                *yi += c * b;
            }
        }
        y
    }

    fn phase_two_duals(&self) -> Vec<f64> {
        let costs: Vec<f64> = self.head.iter().map(|&v| self.cost(v)).collect();
        self.btran(&costs)
    }

    /// Value a nonbasic variable takes for its status.
    fn nonbasic_value(&self, var: Var, status: BasisStatus) -> f64 {
        let (lb, ub) = self.bounds(var);
        match status {
            BasisStatus::AtUpper if ub.is_finite() => ub,
            _ if lb.is_finite() => lb,
            _ if ub.is_finite() => ub,
            _ => 0.0,
        }
    }

    /// Normalizes a nonbasic status so that it refers to a finite bound.
    fn normalized_status(&self, var: Var, status: BasisStatus) -> BasisStatus {
        let (lb, ub) = self.bounds(var);
        match status {
            BasisStatus::Basic => BasisStatus::Basic,
            BasisStatus::AtUpper if ub.is_finite() => BasisStatus::AtUpper,
            BasisStatus::AtLower if !lb.is_finite() && ub.is_finite() => BasisStatus::AtUpper,
            _ => BasisStatus::AtLower,
        }
    }

    fn place_nonbasic(&mut self) {
        for var in self.vars() {
            let status = self.status(var);
            if status != BasisStatus::Basic {
                let status = self.normalized_status(var, status);
                self.set_status(var, status);
                let value = self.nonbasic_value(var, status);
                self.set_value(var, value);
            }
        }
    }

    fn recompute_basic_values(&mut self) {
        let m = self.m();
        let mut r: Vec<f64> = self.rows.iter().map(|row| row.rhs).collect();
        for (j, col) in self.cols.iter().enumerate() {
            if self.col_status[j] == BasisStatus::Basic {
                continue;
            }
            let v = self.col_values[j];
            if v != 0.0 {
                for &(i, a) in &col.entries {
                    r[i] -= a * v;
                }
            }
        }
        for i in 0..m {
            if self.row_status[i] != BasisStatus::Basic {
                r[i] -= self.row_values[i];
            }
        }
        for k in 0..m {
            let row = &self.binv[k * m..(k + 1) * m];
            let value = row.iter().zip(&r).map(|(b, ri)| b * ri).sum();
            let var = self.head[k];
            self.set_value(var, value);
        }
    }

    fn column_dense(&self, var: Var, out: &mut [f64]) {
        out.iter_mut().for_each(|v| *v = 0.0);
        match var {
            Var::Col(j) => {
                for &(r, a) in &self.cols[j].entries {
                    out[r] += a;
                }
            }
            Var::Slack(i) => out[i] = 1.0,
        }
    }

    /// Selects a nonsingular basis from the variables marked basic, completes
    /// it with slacks, and rebuilds the inverse and the basic values.
    fn refactor(&mut self) -> Result<()> {
        let m = self.m();
        let candidates: Vec<Var> = self
            .vars()
            .filter(|&v| self.status(v) == BasisStatus::Basic)
            .collect();

        let c = candidates.len();
        let mut work = vec![0.0; m * c];
        let mut column = vec![0.0; m];
        for (k, &var) in candidates.iter().enumerate() {
            self.column_dense(var, &mut column);
            for r in 0..m {
                work[r * c + k] = column[r];
            }
        }

        let mut row_used = vec![false; m];
        let mut head = Vec::with_capacity(m);
        let mut rejected = Vec::new();
        for (k, &var) in candidates.iter().enumerate() {
            if head.len() == m {
                rejected.push(var);
                continue;
            }
            let mut pivot_row = None;
            let mut best = self.config.pivot_tol.max(1e-7);
            for r in 0..m {
                if !row_used[r] && work[r * c + k].abs() > best {
                    best = work[r * c + k].abs();
                    pivot_row = Some(r);
                }
            }
            let Some(p) = pivot_row else {
                rejected.push(var);
                continue;
            };
            row_used[p] = true;
            head.push(var);
            let pivot = work[p * c + k];
            for r in 0..m {
                if row_used[r] {
                    continue;
                }
                let factor = work[r * c + k] / pivot;
                if factor != 0.0 {
                    for kk in k..c {
                        work[r * c + kk] -= factor * work[p * c + kk];
                    }
                }
            }
        }

        for var in rejected {
            let value = self.value(var);
            let (lb, ub) = self.bounds(var);
            let status = if ub.is_finite() && (!lb.is_finite() || (ub - value) < (value - lb)) {
                BasisStatus::AtUpper
            } else {
                BasisStatus::AtLower
            };
            self.set_status(var, status);
        }
        for (r, used) in row_used.iter().enumerate() {
            if !used {
                self.row_status[r] = BasisStatus::Basic;
                head.push(Var::Slack(r));
            }
        }

        self.head = head;
        self.place_nonbasic();
        self.invert()?;
        self.recompute_basic_values();
        self.pivots_since_refactor = 0;
        Ok(())
    }

    /// Gauss-Jordan inversion of the basis matrix in head order.
    fn invert(&mut self) -> Result<()> {
        let m = self.m();
        let mut a = vec![0.0; m * m];
        let mut column = vec![0.0; m];
        for (k, &var) in self.head.iter().enumerate() {
            self.column_dense(var, &mut column);
            for r in 0..m {
                a[r * m + k] = column[r];
            }
        }
        let mut inv = vec![0.0; m * m];
        for i in 0..m {
            inv[i * m + i] = 1.0;
        }

        for col in 0..m {
            let mut p = col;
            let mut best = a[col * m + col].abs();
            for r in (col + 1)..m {
                if a[r * m + col].abs() > best {
                    best = a[r * m + col].abs();
                    p = r;
                }
            }
            if best < 1e-12 {
                return Err(Error::lp_solve("refactor", CODE_SINGULAR));
            }
            if p != col {
                for k in 0..m {
                    a.swap(p * m + k, col * m + k);
                    inv.swap(p * m + k, col * m + k);
                }
            }
            let pivot = a[col * m + col];
            for k in 0..m {
                a[col * m + k] /= pivot;
                inv[col * m + k] /= pivot;
            }
            for r in 0..m {
                if r == col {
                    continue;
                }
                let factor = a[r * m + col];
                if factor != 0.0 {
                    for k in 0..m {
                        a[r * m + k] -= factor * a[col * m + k];
                        inv[r * m + k] -= factor * inv[col * m + k];
                    }
                }
            }
        }
        // The inverse maps rows of `B x = b` to head positions.
        self.binv = inv;
        Ok(())
    }

    fn update_inverse(&mut self, w: &[f64], r: usize) {
        let m = self.m();
        let pivot = w[r];
        for k in 0..m {
            self.binv[r * m + k] /= pivot;
        }
        for i in 0..m {
            if i == r || w[i] == 0.0 {
                continue;
            }
            let factor = w[i];
            for k in 0..m {
                self.binv[i * m + k] -= factor * self.binv[r * m + k];
            }
        }
        self.pivots_since_refactor += 1;
    }

    fn infeasibility(&self, var: Var) -> f64 {
        let (lb, ub) = self.bounds(var);
        let v = self.value(var);
        if v < lb {
            lb - v
        } else if v > ub {
            v - ub
        } else {
            0.0
        }
    }

    fn primal_infeasibility(&self) -> f64 {
        self.head.iter().map(|&v| self.infeasibility(v)).sum()
    }

    fn phase_one_costs(&self) -> Vec<f64> {
        let tol = self.config.feasibility_tol;
        self.head
            .iter()
            .map(|&var| {
                let (lb, ub) = self.bounds(var);
                let v = self.value(var);
                if v < lb - tol {
                    -1.0
                } else if v > ub + tol {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn choose_entering(&self, y: &[f64], phase_one: bool, bland: bool) -> Entering {
        let tol = self.config.optimality_tol;
        let mut best: Option<(f64, Var, bool)> = None;
        for var in self.vars() {
            let status = self.status(var);
            if status == BasisStatus::Basic {
                continue;
            }
            let (lb, ub) = self.bounds(var);
            if lb == ub {
                continue;
            }
            let c = if phase_one { 0.0 } else { self.cost(var) };
            let d = c - self.col_dot(y, var);
            let free = !lb.is_finite() && !ub.is_finite();
            let candidate = match status {
                BasisStatus::AtLower if d < -tol => Some(true),
                BasisStatus::AtLower if free && d > tol => Some(false),
                BasisStatus::AtUpper if d > tol => Some(false),
                _ => None,
            };
            if let Some(increase) = candidate {
                if bland {
                    return Entering::Chosen { var, increase };
                }
                if best.is_none_or(|(bd, _, _)| d.abs() > bd) {
                    best = Some((d.abs(), var, increase));
                }
            }
        }
        match best {
            Some((_, var, increase)) => Entering::Chosen { var, increase },
            None => Entering::None,
        }
    }

    fn var_order(var: Var, n: usize) -> usize {
        match var {
            Var::Col(j) => j,
            Var::Slack(i) => n + i,
        }
    }

    /// Ratio test and update for an entering variable.
    fn primal_step(&mut self, entering: Var, increase: bool, phase_one: bool, bland: bool) -> Step {
        let tol = self.config.feasibility_tol;
        let piv_tol = self.config.pivot_tol;
        let n = self.cols.len();
        let dir = if increase { 1.0 } else { -1.0 };
        let w = self.ftran(entering);

        let mut t_max = f64::INFINITY;
        let mut leave: Option<(usize, f64, BasisStatus, f64)> = None;
        for (k, &var) in self.head.iter().enumerate() {
            let alpha = -dir * w[k];
            if alpha.abs() < piv_tol {
                continue;
            }
            let (lb, ub) = self.bounds(var);
            let x = self.value(var);
            let hit = if phase_one && x < lb - tol {
                (alpha > 0.0).then(|| ((lb - x) / alpha, lb, BasisStatus::AtLower))
            } else if phase_one && x > ub + tol {
                (alpha < 0.0).then(|| ((x - ub) / -alpha, ub, BasisStatus::AtUpper))
            } else if alpha < 0.0 && lb.is_finite() {
                Some(((x - lb).max(0.0) / -alpha, lb, BasisStatus::AtLower))
            } else if alpha > 0.0 && ub.is_finite() {
                Some(((ub - x).max(0.0) / alpha, ub, BasisStatus::AtUpper))
            } else {
                None
            };
            let Some((t, target, status)) = hit else {
                continue;
            };
            let better = match leave {
                None => true,
                Some((bk, _, _, balpha)) => {
                    if t < t_max - 1e-12 {
                        true
                    } else if (t - t_max).abs() <= 1e-12 {
                        if bland {
                            Self::var_order(var, n) < Self::var_order(self.head[bk], n)
                        } else {
                            alpha.abs() > balpha.abs()
                        }
                    } else {
                        false
                    }
                }
            };
            if better {
                t_max = t;
                leave = Some((k, target, status, alpha));
            }
        }

        let (lb_e, ub_e) = self.bounds(entering);
        let range = ub_e - lb_e;
        if range.is_finite() && range <= t_max {
            let status = if increase {
                BasisStatus::AtUpper
            } else {
                BasisStatus::AtLower
            };
            self.set_status(entering, status);
            self.set_value(entering, if increase { ub_e } else { lb_e });
            for k in 0..self.head.len() {
                let var = self.head[k];
                let v = self.value(var) - dir * w[k] * range;
                self.set_value(var, v);
            }
            return Step::Pivoted { length: range };
        }

        let Some((r, target, status, _)) = leave else {
            return Step::Unbounded;
        };
        let t = t_max;
        let entering_value = self.value(entering) + dir * t;
        for k in 0..self.head.len() {
            let var = self.head[k];
            let v = self.value(var) - dir * w[k] * t;
            self.set_value(var, v);
        }
        let leaving = self.head[r];
        self.set_value(leaving, target);
        let (lb_l, ub_l) = self.bounds(leaving);
        let status = if lb_l == ub_l { BasisStatus::AtLower } else { status };
        self.set_status(leaving, status);
        self.set_value(entering, entering_value);
        self.set_status(entering, BasisStatus::Basic);
        self.head[r] = entering;
        self.update_inverse(&w, r);
        Step::Pivoted { length: t }
    }

    fn max_iterations(&self) -> u64 {
        (100 * (self.cols.len() + self.rows.len()) + 1000) as u64
    }

    fn primal_loop(&mut self, limits: SolveLimits, phase_one_only: bool) -> Result<SolveStatus> {
        self.refactor()?;
        self.farkas = None;
        let tol = self.config.feasibility_tol;
        let mut degenerate_run = 0usize;
        let mut done = 0u64;
        let mut polish_rounds = 0;

        loop {
            if self.pivots_since_refactor >= self.config.refactor_interval {
                self.refactor()?;
            }
            let infeasible = self.primal_infeasibility() > tol;
            if !infeasible {
                if phase_one_only {
                    return Ok(SolveStatus::Optimal);
                }
                if let Some(limit) = limits.objective_lower_limit
                    && self.objective_value() < limit
                {
                    return Ok(SolveStatus::ObjectiveLimit);
                }
            }
            if limits.iteration_limit.is_some_and(|limit| done >= limit) {
                return Ok(SolveStatus::IterationLimit);
            }
            if done >= self.max_iterations() {
                return Err(Error::lp_solve("primal_opt", CODE_STALLED));
            }

            let bland = degenerate_run >= self.config.bland_after;
            let y = if infeasible {
                self.btran(&self.phase_one_costs())
            } else {
                self.phase_two_duals()
            };

            let Entering::Chosen { var, increase } = self.choose_entering(&y, infeasible, bland)
            else {
                // Confirm on a fresh factorization before declaring the outcome.
                if self.pivots_since_refactor > 0 && polish_rounds < 3 {
                    polish_rounds += 1;
                    self.refactor()?;
                    continue;
                }
                if infeasible {
                    self.farkas = Some(y);
                    return Ok(SolveStatus::Infeasible);
                }
                return Ok(SolveStatus::Optimal);
            };

            match self.primal_step(var, increase, infeasible, bland) {
                Step::Unbounded => return Ok(SolveStatus::Unbounded),
                Step::Pivoted { length } => {
                    self.iterations += 1;
                    done += 1;
                    if length < tol {
                        degenerate_run += 1;
                    } else {
                        degenerate_run = 0;
                    }
                }
            }
        }
    }

    fn dual_loop(&mut self, limits: SolveLimits) -> Result<SolveStatus> {
        self.refactor()?;
        if !self.is_dual_feasible() {
            return self.primal_loop(limits, false);
        }
        self.farkas = None;
        let tol = self.config.feasibility_tol;
        let piv_tol = self.config.pivot_tol;
        let mut done = 0u64;

        loop {
            if self.pivots_since_refactor >= self.config.refactor_interval {
                self.refactor()?;
            }
            if limits.iteration_limit.is_some_and(|limit| done >= limit) {
                return Ok(SolveStatus::IterationLimit);
            }
            if done >= self.max_iterations() {
                log::debug!("dual simplex stalled, continuing with primal");
                return self.primal_loop(limits, false);
            }

            let mut leave: Option<(usize, f64)> = None;
            for (k, &var) in self.head.iter().enumerate() {
                let infeas = self.infeasibility(var);
                if infeas > tol && leave.is_none_or(|(_, best)| infeas > best) {
                    leave = Some((k, infeas));
                }
            }
            let Some((r, _)) = leave else {
                // Primal feasible: clean up any drift with the primal simplex.
                return self.primal_loop(limits, false);
            };

            let leaving = self.head[r];
            let (lb_l, ub_l) = self.bounds(leaving);
            let below = self.value(leaving) < lb_l;
            let m = self.m();
            let rho: Vec<f64> = self.binv[r * m..(r + 1) * m].to_vec();
            let y = self.phase_two_duals();

            let mut best: Option<(f64, f64, Var)> = None;
            for var in self.vars() {
                let status = self.status(var);
                if status == BasisStatus::Basic {
                    continue;
                }
                let (lb, ub) = self.bounds(var);
                if lb == ub {
                    continue;
                }
                let alpha = self.col_dot(&rho, var);
                if alpha.abs() < piv_tol {
                    continue;
                }
                let d = self.cost(var) - self.col_dot(&y, var);
                let free = !lb.is_finite() && !ub.is_finite();
                let ratio = if free {
                    Some(d.abs() / alpha.abs())
                } else {
                    match (status, below) {
                        (BasisStatus::AtLower, true) if alpha < 0.0 => Some(d.max(0.0) / -alpha),
                        (BasisStatus::AtUpper, true) if alpha > 0.0 => Some((-d).max(0.0) / alpha),
                        (BasisStatus::AtLower, false) if alpha > 0.0 => Some(d.max(0.0) / alpha),
                        (BasisStatus::AtUpper, false) if alpha < 0.0 => {
                            Some((-d).max(0.0) / -alpha)
                        }
                        _ => None,
                    }
                };
                if let Some(ratio) = ratio {
                    let better = match best {
                        None => true,
                        Some((br, ba, _)) => {
                            ratio < br - 1e-12 || ((ratio - br).abs() <= 1e-12 && alpha.abs() > ba)
                        }
                    };
                    if better {
                        best = Some((ratio, alpha.abs(), var));
                    }
                }
            }

            let Some((_, _, entering)) = best else {
                // Dual unbounded: let phase one confirm and produce a certificate.
                return self.primal_loop(limits, false);
            };

            let w = self.ftran(entering);
            let target = if below { lb_l } else { ub_l };
            let delta = (self.value(leaving) - target) / w[r];
            let entering_value = self.value(entering) + delta;
            for k in 0..self.head.len() {
                let var = self.head[k];
                let v = self.value(var) - w[k] * delta;
                self.set_value(var, v);
            }
            self.set_value(leaving, target);
            let status = if below || lb_l == ub_l {
                BasisStatus::AtLower
            } else {
                BasisStatus::AtUpper
            };
            self.set_status(leaving, status);
            self.set_value(entering, entering_value);
            self.set_status(entering, BasisStatus::Basic);
            self.head[r] = entering;
            self.update_inverse(&w, r);
            self.iterations += 1;
            done += 1;
        }
    }
}

impl LpEngine for DenseSimplex {
    #[inline]
    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    fn num_cols(&self) -> usize {
        self.cols.len()
    }

    fn add_rows(&mut self, rows: &[SparseRow]) -> Result<()> {
        for row in rows {
            let i = self.rows.len();
            for (&j, &a) in row.indices.iter().zip(&row.values) {
                if j >= self.cols.len() {
                    return Err(Error::lp_solve("add_rows", CODE_DIMENSION));
                }
                if a != 0.0 {
                    self.cols[j].entries.push((i, a));
                }
            }
            self.rows.push(Row {
                sense: row.sense,
                rhs: row.rhs,
            });
            self.row_status.push(BasisStatus::Basic);
            self.row_values.push(0.0);
        }
        self.refactor()
    }

    fn add_col(&mut self, obj: f64, entries: &[(usize, f64)], lb: f64, ub: f64) -> Result<()> {
        if entries.iter().any(|&(r, _)| r >= self.rows.len()) {
            return Err(Error::lp_solve("add_col", CODE_DIMENSION));
        }
        self.cols.push(Column {
            obj,
            lb,
            ub,
            entries: entries.iter().copied().filter(|&(_, a)| a != 0.0).collect(),
        });
        let j = self.cols.len() - 1;
        let status = self.normalized_status(Var::Col(j), BasisStatus::AtLower);
        self.col_status.push(status);
        self.col_values.push(self.nonbasic_value(Var::Col(j), status));
        if self.col_values[j] != 0.0 {
            self.recompute_basic_values();
        }
        Ok(())
    }

    fn delete_rows(&mut self, delete: &[bool]) -> Result<Vec<Option<usize>>> {
        if delete.len() != self.rows.len() {
            return Err(Error::lp_solve("delete_rows", CODE_DIMENSION));
        }
        let mut delstat = Vec::with_capacity(delete.len());
        let mut next = 0;
        for &del in delete {
            if del {
                delstat.push(None);
            } else {
                delstat.push(Some(next));
                next += 1;
            }
        }
        for col in &mut self.cols {
            col.entries = col
                .entries
                .iter()
                .filter_map(|&(r, a)| delstat[r].map(|nr| (nr, a)))
                .collect();
        }
        let keep = |i: &usize| !delete[*i];
        self.rows = (0..self.rows.len()).filter(keep).map(|i| self.rows[i]).collect();
        self.row_status = (0..delete.len()).filter(keep).map(|i| self.row_status[i]).collect();
        self.row_values = (0..delete.len()).filter(keep).map(|i| self.row_values[i]).collect();
        self.refactor()?;
        Ok(delstat)
    }

    fn delete_cols(&mut self, delete: &[bool]) -> Result<Vec<Option<usize>>> {
        if delete.len() != self.cols.len() {
            return Err(Error::lp_solve("delete_cols", CODE_DIMENSION));
        }
        let mut delstat = Vec::with_capacity(delete.len());
        let mut next = 0;
        for &del in delete {
            if del {
                delstat.push(None);
            } else {
                delstat.push(Some(next));
                next += 1;
            }
        }
        let old_cols = std::mem::take(&mut self.cols);
        let old_status = std::mem::take(&mut self.col_status);
        let old_values = std::mem::take(&mut self.col_values);
        for (j, col) in old_cols.into_iter().enumerate() {
            if !delete[j] {
                self.cols.push(col);
                self.col_status.push(old_status[j]);
                self.col_values.push(old_values[j]);
            }
        }
        self.refactor()?;
        Ok(delstat)
    }

    fn set_col_bounds(&mut self, col: usize, lb: f64, ub: f64) -> Result<()> {
        if col >= self.cols.len() || lb > ub {
            return Err(Error::lp_solve("set_col_bounds", CODE_DIMENSION));
        }
        self.cols[col].lb = lb;
        self.cols[col].ub = ub;
        let var = Var::Col(col);
        let status = self.col_status[col];
        if status != BasisStatus::Basic {
            let status = self.normalized_status(var, status);
            self.col_status[col] = status;
            self.col_values[col] = self.nonbasic_value(var, status);
            self.recompute_basic_values();
        }
        Ok(())
    }

    #[inline]
    fn col_bounds(&self, col: usize) -> (f64, f64) {
        (self.cols[col].lb, self.cols[col].ub)
    }

    fn basis(&self) -> Basis {
        Basis {
            colstat: self.col_status.clone(),
            rowstat: self.row_status.clone(),
        }
    }

    fn set_basis(&mut self, basis: &Basis) -> Result<()> {
        if basis.colstat.len() != self.cols.len() || basis.rowstat.len() != self.rows.len() {
            return Err(Error::lp_solve("set_basis", CODE_DIMENSION));
        }
        self.col_status.clone_from(&basis.colstat);
        self.row_status.clone_from(&basis.rowstat);
        self.place_nonbasic();
        self.refactor()
    }

    fn primal_opt(&mut self, limits: SolveLimits) -> Result<SolveStatus> {
        self.primal_loop(limits, false)
    }

    fn dual_opt(&mut self, limits: SolveLimits) -> Result<SolveStatus> {
        self.dual_loop(limits)
    }

    fn primal_recover(&mut self) -> Result<SolveStatus> {
        self.primal_loop(SolveLimits::none(), true)
    }

    fn objective_value(&self) -> f64 {
        self.cols
            .iter()
            .zip(&self.col_values)
            .map(|(c, x)| c.obj * x)
            .sum()
    }

    fn x(&self) -> Vec<f64> {
        self.col_values.clone()
    }

    fn duals(&self) -> Vec<f64> {
        self.phase_two_duals()
    }

    fn reduced_costs(&self) -> Vec<f64> {
        let y = self.phase_two_duals();
        (0..self.cols.len())
            .map(|j| self.cols[j].obj - self.col_dot(&y, Var::Col(j)))
            .collect()
    }

    fn row_slacks(&self) -> Vec<f64> {
        self.row_values.clone()
    }

    fn farkas_duals(&self) -> Option<Vec<f64>> {
        self.farkas.clone()
    }

    fn is_primal_feasible(&self) -> bool {
        self.primal_infeasibility() <= self.config.feasibility_tol * (1 + self.m()) as f64
    }

    fn is_dual_feasible(&self) -> bool {
        let tol = self.config.optimality_tol * 10.0;
        let y = self.phase_two_duals();
        self.vars().all(|var| {
            let status = self.status(var);
            if status == BasisStatus::Basic {
                return true;
            }
            let (lb, ub) = self.bounds(var);
            if lb == ub {
                return true;
            }
            let d = self.cost(var) - self.col_dot(&y, var);
            match status {
                BasisStatus::AtLower if !lb.is_finite() && !ub.is_finite() => d.abs() <= tol,
                BasisStatus::AtLower => d >= -tol,
                BasisStatus::AtUpper => d <= tol,
                BasisStatus::Basic => true,
            }
        })
    }

    #[inline]
    fn iteration_count(&self) -> u64 {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-7
    }

    /// min -x0 - x1 s.t. x0 + 2 x1 <= 4, 3 x0 + x1 <= 6, 0 <= x <= 10.
    fn small_lp() -> DenseSimplex {
        let mut lp = DenseSimplex::new();
        lp.add_col(-1.0, &[], 0.0, 10.0).unwrap();
        lp.add_col(-1.0, &[], 0.0, 10.0).unwrap();
        lp.add_rows(&[
            SparseRow::new(vec![0, 1], vec![1.0, 2.0], Sense::LessEqual, 4.0),
            SparseRow::new(vec![0, 1], vec![3.0, 1.0], Sense::LessEqual, 6.0),
        ])
        .unwrap();
        lp
    }

    #[test]
    fn test_primal_opt_small_lp() {
        let mut lp = small_lp();
        assert_eq!(lp.primal_opt(SolveLimits::none()).unwrap(), SolveStatus::Optimal);
        let x = lp.x();
        assert!(approx(x[0], 1.6));
        assert!(approx(x[1], 1.2));
        assert!(approx(lp.objective_value(), -2.8));
        let y = lp.duals();
        assert!(approx(y[0], -0.4));
        assert!(approx(y[1], -0.2));
        assert!(lp.is_primal_feasible());
        assert!(lp.is_dual_feasible());
        assert!(lp.reduced_costs().iter().all(|d| d.abs() < 1e-7));
    }

    #[test]
    fn test_iteration_limit() {
        let mut lp = small_lp();
        let status = lp
            .primal_opt(SolveLimits::none().with_iteration_limit(1))
            .unwrap();
        assert_eq!(status, SolveStatus::IterationLimit);
        assert_eq!(lp.iteration_count(), 1);
    }

    #[test]
    fn test_objective_limit_stops_early() {
        let mut lp = small_lp();
        let status = lp
            .primal_opt(SolveLimits::none().with_objective_lower_limit(-1.5))
            .unwrap();
        assert_eq!(status, SolveStatus::ObjectiveLimit);
        assert!(approx(lp.objective_value(), -2.0));
    }

    #[test]
    fn test_equality_rows_need_phase_one() {
        // Degree equations of a triangle force every edge to one.
        let mut lp = DenseSimplex::new();
        for len in [3.0, 4.0, 5.0] {
            lp.add_col(len, &[], 0.0, 1.0).unwrap();
        }
        lp.add_rows(&[
            SparseRow::new(vec![0, 2], vec![1.0, 1.0], Sense::Equal, 2.0),
            SparseRow::new(vec![0, 1], vec![1.0, 1.0], Sense::Equal, 2.0),
            SparseRow::new(vec![1, 2], vec![1.0, 1.0], Sense::Equal, 2.0),
        ])
        .unwrap();
        assert!(!lp.is_primal_feasible());
        assert_eq!(lp.primal_opt(SolveLimits::none()).unwrap(), SolveStatus::Optimal);
        assert!(lp.x().iter().all(|&v| approx(v, 1.0)));
        assert!(approx(lp.objective_value(), 12.0));
    }

    #[test]
    fn test_infeasible_reports_farkas_duals() {
        let mut lp = DenseSimplex::new();
        lp.add_col(1.0, &[], 0.0, 1.0).unwrap();
        lp.add_col(1.0, &[], 0.0, 1.0).unwrap();
        lp.add_rows(&[SparseRow::new(vec![0, 1], vec![1.0, 1.0], Sense::GreaterEqual, 3.0)])
            .unwrap();
        assert_eq!(lp.primal_opt(SolveLimits::none()).unwrap(), SolveStatus::Infeasible);
        assert!(lp.farkas_duals().is_some());
        assert!(!lp.is_primal_feasible());
    }

    #[test]
    fn test_dual_opt_after_adding_cut() {
        let mut lp = small_lp();
        lp.primal_opt(SolveLimits::none()).unwrap();
        lp.add_rows(&[SparseRow::new(vec![0, 1], vec![1.0, 1.0], Sense::LessEqual, 2.0)])
            .unwrap();
        assert!(!lp.is_primal_feasible());
        assert!(lp.is_dual_feasible());
        assert_eq!(lp.dual_opt(SolveLimits::none()).unwrap(), SolveStatus::Optimal);
        assert!(approx(lp.objective_value(), -2.0));
    }

    #[test]
    fn test_delete_rows_restores_model() {
        let mut lp = small_lp();
        lp.primal_opt(SolveLimits::none()).unwrap();
        let before = lp.basis();
        lp.add_rows(&[SparseRow::new(vec![0, 1], vec![1.0, 1.0], Sense::LessEqual, 2.0)])
            .unwrap();
        assert_eq!(lp.num_rows(), 3);
        let delstat = lp.delete_rows(&[false, false, true]).unwrap();
        assert_eq!(delstat, vec![Some(0), Some(1), None]);
        assert_eq!(lp.num_rows(), 2);
        assert_eq!(lp.basis(), before);
        assert!(approx(lp.objective_value(), -2.8));
    }

    #[test]
    fn test_delete_cols_renumbers() {
        let mut lp = small_lp();
        lp.add_col(5.0, &[(0, 1.0)], 0.0, 1.0).unwrap();
        let delstat = lp.delete_cols(&[false, true, false]).unwrap();
        assert_eq!(delstat, vec![Some(0), None, Some(1)]);
        assert_eq!(lp.num_cols(), 2);
        assert_eq!(lp.col_bounds(1), (0.0, 1.0));
    }

    #[test]
    fn test_set_basis_repairs_surplus() {
        let mut lp = small_lp();
        lp.add_col(0.0, &[(0, 1.0), (1, 1.0)], 0.0, 1.0).unwrap();
        let basis = Basis {
            colstat: vec![BasisStatus::Basic; 3],
            rowstat: vec![BasisStatus::AtLower; 2],
        };
        lp.set_basis(&basis).unwrap();
        assert_eq!(lp.basis().basic_count(), 2);
        assert!(matches!(
            lp.set_basis(&Basis::default()),
            Err(Error::LpSolve { code: CODE_DIMENSION, .. })
        ));
    }

    #[test]
    fn test_bound_flip_without_basis_change() {
        let mut lp = DenseSimplex::new();
        lp.add_col(-1.0, &[], 0.0, 1.0).unwrap();
        lp.add_rows(&[SparseRow::new(vec![0], vec![1.0], Sense::LessEqual, 5.0)])
            .unwrap();
        assert_eq!(lp.primal_opt(SolveLimits::none()).unwrap(), SolveStatus::Optimal);
        assert!(approx(lp.x()[0], 1.0));
        assert_eq!(lp.basis().colstat[0], BasisStatus::AtUpper);
        assert!(approx(lp.row_slacks()[0], 4.0));
    }

    #[test]
    fn test_clamped_column_stays_fixed() {
        let mut lp = small_lp();
        lp.set_col_bounds(0, 0.0, 0.0).unwrap();
        assert_eq!(lp.primal_opt(SolveLimits::none()).unwrap(), SolveStatus::Optimal);
        assert!(approx(lp.x()[0], 0.0));
        assert!(approx(lp.x()[1], 2.0));
    }
}
