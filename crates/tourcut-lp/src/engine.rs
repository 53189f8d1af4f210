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

//! The narrow contract between the relaxation manager and an LP engine.
//!
//! Rows are `a x + s = rhs` with one logical (slack) variable per row whose
//! bounds encode the sense. Basis statuses are reported per structural column
//! and per row slack. Rows and columns are addressed by position; deleting
//! returns the renumbering so the caller can update its own index caches.

use serde::{Deserialize, Serialize};
use tourcut_core::error::Result;

/// Row sense of a constraint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Sense {
    /// `a x >= rhs`
    #[serde(rename = "G")]
    GreaterEqual,
    /// `a x <= rhs`
    #[serde(rename = "L")]
    LessEqual,
    /// `a x == rhs`
    #[serde(rename = "E")]
    Equal,
}

impl Sense {
    /// Single-character code: `G`, `L` or `E`.
    #[inline]
    pub fn as_char(&self) -> char {
        match self {
            Sense::GreaterEqual => 'G',
            Sense::LessEqual => 'L',
            Sense::Equal => 'E',
        }
    }
}

impl std::fmt::Display for Sense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Basis status of a column or row slack.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum BasisStatus {
    Basic,
    #[default]
    AtLower,
    AtUpper,
}

/// An opaque, cloneable basis snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Basis {
    pub colstat: Vec<BasisStatus>,
    pub rowstat: Vec<BasisStatus>,
}

impl Basis {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colstat.is_empty() && self.rowstat.is_empty()
    }

    /// Approximate heap footprint, used by the clone statistics.
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        (self.colstat.capacity() + self.rowstat.capacity()) * std::mem::size_of::<BasisStatus>()
    }

    /// Number of basic columns and slacks.
    pub fn basic_count(&self) -> usize {
        self.colstat
            .iter()
            .chain(&self.rowstat)
            .filter(|s| **s == BasisStatus::Basic)
            .count()
    }
}

/// A constraint in sparse form.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseRow {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
    pub sense: Sense,
    pub rhs: f64,
}

impl SparseRow {
    pub fn new(indices: Vec<usize>, values: Vec<f64>, sense: Sense, rhs: f64) -> Self {
        debug_assert_eq!(indices.len(), values.len());
        Self {
            indices,
            values,
            sense,
            rhs,
        }
    }

    /// `a x` for the given column values.
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&j, &a)| a * x[j])
            .sum()
    }

    /// Amount by which `x` violates the row (positive means violated).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let act = self.activity(x);
        match self.sense {
            Sense::GreaterEqual => self.rhs - act,
            Sense::LessEqual => act - self.rhs,
            Sense::Equal => (act - self.rhs).abs(),
        }
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// Outcome of an optimization call.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
    /// Primal simplex stopped after the objective dropped below the limit.
    ObjectiveLimit,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "Optimal"),
            SolveStatus::Infeasible => write!(f, "Infeasible"),
            SolveStatus::Unbounded => write!(f, "Unbounded"),
            SolveStatus::IterationLimit => write!(f, "IterationLimit"),
            SolveStatus::ObjectiveLimit => write!(f, "ObjectiveLimit"),
        }
    }
}

/// Limits for a single optimization call.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct SolveLimits {
    pub iteration_limit: Option<u64>,
    /// Primal simplex stops once the (feasible) objective is below this.
    pub objective_lower_limit: Option<f64>,
}

impl SolveLimits {
    #[inline]
    pub fn none() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_iteration_limit(mut self, limit: u64) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    #[inline]
    pub fn with_objective_lower_limit(mut self, limit: f64) -> Self {
        self.objective_lower_limit = Some(limit);
        self
    }
}

/// Solve/query/basis interface of an LP engine.
///
/// Implementations must keep a factorization consistent with `basis()` after
/// every mutating call, so that values can be queried without re-solving.
pub trait LpEngine: Clone + Send {
    fn num_rows(&self) -> usize;
    fn num_cols(&self) -> usize;

    /// Appends rows; each new slack enters the basis.
    fn add_rows(&mut self, rows: &[SparseRow]) -> Result<()>;
    /// Appends a column at its lower bound.
    fn add_col(&mut self, obj: f64, entries: &[(usize, f64)], lb: f64, ub: f64) -> Result<()>;
    /// Deletes rows flagged in `delete`; returns `delstat`.
    fn delete_rows(&mut self, delete: &[bool]) -> Result<Vec<Option<usize>>>;
    /// Deletes columns flagged in `delete`; returns `delstat`.
    fn delete_cols(&mut self, delete: &[bool]) -> Result<Vec<Option<usize>>>;

    fn set_col_bounds(&mut self, col: usize, lb: f64, ub: f64) -> Result<()>;
    fn col_bounds(&self, col: usize) -> (f64, f64);

    fn basis(&self) -> Basis;
    /// Installs a basis, repairing it with slacks if it is singular or has
    /// the wrong number of basic variables.
    fn set_basis(&mut self, basis: &Basis) -> Result<()>;

    fn primal_opt(&mut self, limits: SolveLimits) -> Result<SolveStatus>;
    fn dual_opt(&mut self, limits: SolveLimits) -> Result<SolveStatus>;
    /// Runs phase one only: stops as soon as the basis is primal feasible.
    fn primal_recover(&mut self) -> Result<SolveStatus>;

    fn objective_value(&self) -> f64;
    fn x(&self) -> Vec<f64>;
    fn duals(&self) -> Vec<f64>;
    fn reduced_costs(&self) -> Vec<f64>;
    /// `rhs - a x` per row.
    fn row_slacks(&self) -> Vec<f64>;
    /// Phase-one duals of the last infeasible solve, if any.
    fn farkas_duals(&self) -> Option<Vec<f64>>;

    fn is_primal_feasible(&self) -> bool;
    fn is_dual_feasible(&self) -> bool;
    fn iteration_count(&self) -> u64;
}
