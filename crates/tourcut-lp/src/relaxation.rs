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

//! The LP relaxation manager.
//!
//! `Relaxation` owns the core graph and the live LP. Columns are core edges
//! with bounds `[0, 1]` and their length as objective; the first
//! `node_count` rows are the degree equations `x(delta(v)) = 2`; every further
//! row is a cut. All mutations go through this type so that deletions can
//! renumber the graph, the tour vector and the tour basis in one place.
//!
//! # Tour basis
//!
//! The relaxation keeps a reference tour and a basis in which that tour is
//! the basic solution: tour edges basic, degree rows at lower, cut slacks
//! basic. The incidence matrix of an even cycle is singular, so for even
//! `n` the edge `(t[n-2], t[n-1])` is placed at its upper bound and the chord
//! `(t[0], t[n-2])` enters the basis at value zero.
//!
//! `pivot` runs the primal simplex from the tour basis until the objective
//! drops below the tour length (a non-degenerate pivot) or the LP is
//! optimal, and classifies the resulting vertex.

use crate::dense::DenseSimplex;
use crate::engine::{Basis, BasisStatus, LpEngine, Sense, SolveLimits, SolveStatus, SparseRow};
use crate::index::RowIndex;
use crate::support::SupportGraph;
use smallvec::SmallVec;
use tourcut_core::error::{Error, Result};
use tourcut_core::tolerance::EPS_INTEGRAL;
use tourcut_model::graph::{CoreGraph, EndPts};
use tourcut_model::index::EdgeIndex;
use tourcut_model::tour::Tour;

/// Return code of `pivot` when the tour basis is primal infeasible.
pub const CODE_PIVOT_INFEASIBLE: i32 = 10;
/// Return code of `pivot` when the LP is unbounded.
pub const CODE_PIVOT_UNBOUNDED: i32 = 11;

/// Classification of the vertex reached by `pivot`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PivType {
    /// Some edge value is fractional.
    Frac,
    /// Integral but disconnected.
    Subtour,
    /// Integral tour, LP not yet optimal.
    Tour,
    /// Integral tour proven optimal for the current LP.
    FathomedTour,
}

impl std::fmt::Display for PivType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PivType::Frac => write!(f, "Frac"),
            PivType::Subtour => write!(f, "Subtour"),
            PivType::Tour => write!(f, "Tour"),
            PivType::FathomedTour => write!(f, "FathomedTour"),
        }
    }
}

/// A column to add: endpoints, length and coefficients in existing cut rows.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEdge {
    pub ends: EndPts,
    pub len: i64,
    pub cut_entries: SmallVec<[(RowIndex, f64); 4]>,
}

impl NewEdge {
    #[inline]
    pub fn new(ends: EndPts, len: i64) -> Self {
        Self {
            ends,
            len,
            cut_entries: SmallVec::new(),
        }
    }

    #[inline]
    pub fn with_cut_entries(mut self, entries: SmallVec<[(RowIndex, f64); 4]>) -> Self {
        self.cut_entries = entries;
        self
    }
}

/// A basis snapshot tied to the point in the deletion history it was taken
/// at, so that it can follow later column and row deletions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedBasis {
    basis: Basis,
    version: usize,
}

impl SavedBasis {
    #[inline]
    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        self.basis.allocated_bytes()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Axis {
    Cols,
    Rows,
}

/// One deletion: the axis length before it and the deleted slots, ascending.
#[derive(Clone, Debug)]
struct Deletion {
    axis: Axis,
    len: usize,
    deleted: Vec<usize>,
}

#[derive(Clone, Debug)]
struct TourState {
    tour: Tour,
    x: Vec<f64>,
    basis: Basis,
}

#[derive(Clone, Debug)]
pub struct Relaxation<E = DenseSimplex>
where
    E: LpEngine,
{
    engine: E,
    graph: CoreGraph,
    tour: Option<TourState>,
    tour_epoch: u64,
    deletions: Vec<Deletion>,
    limits: SolveLimits,
}

impl Relaxation<DenseSimplex> {
    /// Creates the degree-only LP over `node_count` nodes and no edges.
    pub fn new(node_count: usize) -> Result<Self> {
        Self::with_engine(node_count, DenseSimplex::new())
    }
}

impl<E> Relaxation<E>
where
    E: LpEngine,
{
    /// Creates the degree-only LP on an empty engine.
    pub fn with_engine(node_count: usize, mut engine: E) -> Result<Self> {
        if engine.num_rows() != 0 || engine.num_cols() != 0 {
            return Err(Error::invalid_input("LP engine must start empty"));
        }
        let degree_rows: Vec<SparseRow> = (0..node_count)
            .map(|_| SparseRow::new(Vec::new(), Vec::new(), Sense::Equal, 2.0))
            .collect();
        engine.add_rows(&degree_rows)?;
        Ok(Self {
            engine,
            graph: CoreGraph::new(node_count),
            tour: None,
            tour_epoch: 0,
            deletions: Vec::new(),
            limits: SolveLimits::none(),
        })
    }

    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[inline]
    pub fn graph(&self) -> &CoreGraph {
        &self.graph
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.engine.num_rows()
    }

    #[inline]
    pub fn cut_row_count(&self) -> usize {
        self.engine.num_rows() - self.node_count()
    }

    /// The reference tour, if one was instated.
    #[inline]
    pub fn tour(&self) -> Option<&Tour> {
        self.tour.as_ref().map(|t| &t.tour)
    }

    /// The reference tour as an LP vector over the current columns.
    #[inline]
    pub fn tour_x(&self) -> Option<&[f64]> {
        self.tour.as_ref().map(|t| t.x.as_slice())
    }

    /// Incremented whenever the reference tour changes.
    #[inline]
    pub fn tour_epoch(&self) -> u64 {
        self.tour_epoch
    }

    /// Iteration limit applied to every simplex call.
    pub fn set_iteration_limit(&mut self, limit: Option<u64>) {
        self.limits.iteration_limit = limit;
    }

    /// Appends columns for edges not yet in the core. Edges already present
    /// keep their column and index.
    pub fn add_edges(&mut self, edges: &[NewEdge]) -> Result<Vec<EdgeIndex>> {
        let rows = self.engine.num_rows();
        let mut indices = Vec::with_capacity(edges.len());
        for edge in edges {
            if let Some(index) = self.graph.find(edge.ends) {
                indices.push(index);
                continue;
            }
            let mut entries: SmallVec<[(usize, f64); 8]> = SmallVec::new();
            entries.push((edge.ends.u(), 1.0));
            entries.push((edge.ends.v(), 1.0));
            for &(row, coef) in &edge.cut_entries {
                if row.get() < self.node_count() || row.get() >= rows {
                    return Err(Error::invalid_input(format!(
                        "cut entry for edge {} names {}, cut rows are {}..{}",
                        edge.ends,
                        row,
                        self.node_count(),
                        rows
                    )));
                }
                entries.push((row.get(), coef));
            }
            self.engine.add_col(edge.len as f64, &entries, 0.0, 1.0)?;
            let (index, _) = self.graph.add_edge(edge.ends, edge.len);
            if let Some(state) = self.tour.as_mut() {
                state.x.push(0.0);
                if !state.basis.is_empty() {
                    state.basis.colstat.push(BasisStatus::AtLower);
                }
            }
            indices.push(index);
        }
        Ok(indices)
    }

    /// Deletes the given columns and returns the column renumbering.
    ///
    /// Columns the tour basis relies on (tour edges, the even-`n` chord)
    /// cannot be deleted.
    pub fn remove_edges(&mut self, indices: &[EdgeIndex]) -> Result<Vec<Option<usize>>> {
        let mut delete = vec![false; self.edge_count()];
        for index in indices {
            let j = index.get();
            if j >= delete.len() {
                return Err(Error::invalid_input(format!(
                    "{} is out of range for {} columns",
                    index,
                    delete.len()
                )));
            }
            if let Some(state) = &self.tour
                && (state.x[j] > 0.5
                    || state
                        .basis
                        .colstat
                        .get(j)
                        .is_some_and(|s| *s != BasisStatus::AtLower))
            {
                return Err(Error::invalid_input(format!(
                    "{} {} is part of the tour basis",
                    index,
                    self.graph.edge(*index).ends
                )));
            }
            delete[j] = true;
        }

        let delstat = self.engine.delete_cols(&delete)?;
        let graph_delstat = self.graph.remove_edges(&delete);
        debug_assert_eq!(delstat, graph_delstat);
        self.log_deletion(Axis::Cols, &delete);
        if let Some(state) = self.tour.as_mut() {
            state.x = retain_unmarked(&state.x, &delete);
            state.basis.colstat = retain_unmarked(&state.basis.colstat, &delete);
        }
        Ok(delstat)
    }

    /// Appends cut rows over the current columns.
    pub fn add_cut_rows(&mut self, rows: &[SparseRow]) -> Result<Vec<RowIndex>> {
        let first = self.engine.num_rows();
        self.engine.add_rows(rows)?;
        if let Some(state) = self.tour.as_mut()
            && !state.basis.is_empty()
        {
            state
                .basis
                .rowstat
                .extend(std::iter::repeat_n(BasisStatus::Basic, rows.len()));
        }
        Ok((first..first + rows.len()).map(RowIndex::new).collect())
    }

    /// Deletes cut rows and returns the row renumbering.
    pub fn remove_cut_rows(&mut self, indices: &[RowIndex]) -> Result<Vec<Option<usize>>> {
        let mut delete = vec![false; self.engine.num_rows()];
        for index in indices {
            if index.get() < self.node_count() {
                return Err(Error::invalid_input(format!(
                    "{} is a degree row and cannot be deleted",
                    index
                )));
            }
            if index.get() >= delete.len() {
                return Err(Error::invalid_input(format!(
                    "{} is out of range for {} rows",
                    index,
                    delete.len()
                )));
            }
            delete[index.get()] = true;
        }
        let delstat = self.engine.delete_rows(&delete)?;
        self.log_deletion(Axis::Rows, &delete);
        if let Some(state) = self.tour.as_mut() {
            state.basis.rowstat = retain_unmarked(&state.basis.rowstat, &delete);
        }
        Ok(delstat)
    }

    #[inline]
    pub fn primal_pivot(&mut self) -> Result<SolveStatus> {
        self.engine.primal_opt(self.limits)
    }

    #[inline]
    pub fn dual_pivot(&mut self) -> Result<SolveStatus> {
        self.engine.dual_opt(self.limits)
    }

    /// Phase one only: restores primal feasibility without optimizing.
    #[inline]
    pub fn primal_recover(&mut self) -> Result<SolveStatus> {
        self.engine.primal_recover()
    }

    fn log_deletion(&mut self, axis: Axis, delete: &[bool]) {
        let deleted: Vec<usize> = delete
            .iter()
            .enumerate()
            .filter(|&(_, &del)| del)
            .map(|(i, _)| i)
            .collect();
        if !deleted.is_empty() {
            self.deletions.push(Deletion {
                axis,
                len: delete.len(),
                deleted,
            });
        }
    }

    #[inline]
    pub fn save_basis(&self) -> SavedBasis {
        SavedBasis {
            basis: self.engine.basis(),
            version: self.deletions.len(),
        }
    }

    /// Installs a saved basis. Statuses follow their columns and rows
    /// through every deletion since the save; columns appended since start
    /// at lower and appended rows are basic.
    pub fn restore_basis(&mut self, saved: &SavedBasis) -> Result<()> {
        let Some(later) = self.deletions.get(saved.version..) else {
            return Err(Error::invalid_input(format!(
                "basis saved at version {} is newer than the relaxation ({})",
                saved.version,
                self.deletions.len()
            )));
        };
        let mut basis = saved.basis.clone();
        for deletion in later {
            match deletion.axis {
                Axis::Cols => remap_statuses(
                    &mut basis.colstat,
                    deletion,
                    BasisStatus::AtLower,
                ),
                Axis::Rows => remap_statuses(&mut basis.rowstat, deletion, BasisStatus::Basic),
            }
        }
        basis
            .colstat
            .resize(self.engine.num_cols(), BasisStatus::AtLower);
        basis
            .rowstat
            .resize(self.engine.num_rows(), BasisStatus::Basic);
        self.engine.set_basis(&basis)
    }

    #[inline]
    pub fn reduced_costs(&self) -> Vec<f64> {
        self.engine.reduced_costs()
    }

    #[inline]
    pub fn dual_values(&self) -> Vec<f64> {
        self.engine.duals()
    }

    #[inline]
    pub fn farkas_duals(&self) -> Option<Vec<f64>> {
        self.engine.farkas_duals()
    }

    #[inline]
    pub fn primal_feasible(&self) -> bool {
        self.engine.is_primal_feasible()
    }

    #[inline]
    pub fn dual_feasible(&self) -> bool {
        self.engine.is_dual_feasible()
    }

    #[inline]
    pub fn objective_value(&self) -> f64 {
        self.engine.objective_value()
    }

    #[inline]
    pub fn x(&self) -> Vec<f64> {
        self.engine.x()
    }

    #[inline]
    pub fn row_slacks(&self) -> Vec<f64> {
        self.engine.row_slacks()
    }

    #[inline]
    pub fn iteration_count(&self) -> u64 {
        self.engine.iteration_count()
    }

    /// The support graph of the current LP solution.
    pub fn support(&self) -> SupportGraph {
        SupportGraph::new(&self.graph, &self.engine.x())
    }

    /// Sets the bounds of a column, e.g. to clamp a branching edge.
    pub fn set_col_bounds(&mut self, index: EdgeIndex, lb: f64, ub: f64) -> Result<()> {
        self.engine.set_col_bounds(index.get(), lb, ub)
    }

    #[inline]
    pub fn col_bounds(&self, index: EdgeIndex) -> (f64, f64) {
        self.engine.col_bounds(index.get())
    }

    /// Tour edges (and the even-`n` chord) that have no column yet.
    pub fn missing_tour_edges(&self, tour: &Tour) -> Vec<EndPts> {
        let mut missing: Vec<EndPts> = tour
            .edges()
            .filter(|&ends| !self.graph.contains(ends))
            .collect();
        if let Some(chord) = Self::chord(tour)
            && !self.graph.contains(chord)
        {
            missing.push(chord);
        }
        missing
    }

    fn chord(tour: &Tour) -> Option<EndPts> {
        let n = tour.node_count();
        (n >= 4 && n % 2 == 0).then(|| EndPts::new(tour.node_at(0), tour.node_at(n - 2)))
    }

    fn tour_basis(&self, tour: &Tour) -> Result<Basis> {
        let n = tour.node_count();
        let mut colstat = vec![BasisStatus::AtLower; self.edge_count()];
        let lookup = |ends: EndPts| {
            self.graph.find(ends).ok_or_else(|| {
                Error::invalid_input(format!("tour basis edge {} is not a core edge", ends))
            })
        };
        for ends in tour.edges() {
            colstat[lookup(ends)?.get()] = BasisStatus::Basic;
        }
        if let Some(chord) = Self::chord(tour) {
            let upper = EndPts::new(tour.node_at(n - 2), tour.node_at(n - 1));
            colstat[lookup(upper)?.get()] = BasisStatus::AtUpper;
            colstat[lookup(chord)?.get()] = BasisStatus::Basic;
        }
        let mut rowstat = vec![BasisStatus::AtLower; self.node_count()];
        rowstat.resize(self.engine.num_rows(), BasisStatus::Basic);
        Ok(Basis { colstat, rowstat })
    }

    /// Makes `tour` the reference tour and installs its basis.
    ///
    /// Every tour edge (and the chord for even `n`) must already be a core
    /// edge; see [`Relaxation::missing_tour_edges`].
    pub fn instate_tour(&mut self, tour: Tour) -> Result<()> {
        if tour.node_count() != self.node_count() {
            return Err(Error::invalid_input(format!(
                "tour has {} nodes, LP has {}",
                tour.node_count(),
                self.node_count()
            )));
        }
        let basis = self.tour_basis(&tour)?;
        let x = tour.edge_vector(&self.graph)?;
        self.engine.set_basis(&basis)?;
        self.tour = Some(TourState { tour, x, basis });
        self.tour_epoch += 1;
        log::debug!(
            "instated tour of length {} (epoch {})",
            self.tour.as_ref().map_or(0, |t| t.tour.length()),
            self.tour_epoch
        );
        Ok(())
    }

    /// Replaces the reference tour without touching the engine basis, so
    /// that the solution that produced it can still be read.
    fn adopt_tour(&mut self, nodes: Vec<usize>) -> Result<()> {
        let n = nodes.len();
        let mut length = 0;
        for i in 0..n {
            let ends = EndPts::new(nodes[i], nodes[(i + 1) % n]);
            let index = self.graph.find(ends).ok_or_else(|| {
                Error::cache_consistency(format!("support edge {} has no column", ends))
            })?;
            length += self.graph.edge(index).len;
        }
        let tour = Tour::with_length(nodes, length)?;
        if self.missing_tour_edges(&tour).is_empty() {
            let basis = self.tour_basis(&tour)?;
            let x = tour.edge_vector(&self.graph)?;
            log::debug!("augmenting tour of length {}", length);
            self.tour = Some(TourState { tour, x, basis });
            self.tour_epoch += 1;
        } else {
            // The chord is missing; the caller re-instates after adding it.
            log::debug!("augmenting tour of length {} lacks its chord", length);
            self.tour = Some(TourState {
                x: tour.edge_vector(&self.graph)?,
                basis: Basis::default(),
                tour,
            });
            self.tour_epoch += 1;
        }
        Ok(())
    }

    /// Returns `true` if the reference tour has a usable basis.
    pub fn has_tour_basis(&self) -> bool {
        self.tour.as_ref().is_some_and(|t| !t.basis.is_empty())
    }

    /// Classifies the current LP solution, adopting it as the new reference
    /// tour if it is a tour shorter than the current one.
    pub fn classify(&mut self) -> Result<PivType> {
        let support = self.support();
        if !support.is_integral() {
            return Ok(PivType::Frac);
        }
        let Some(nodes) = support.tour_from_integral() else {
            return Ok(PivType::Subtour);
        };
        let current = self.tour.as_ref().map(|t| t.tour.length() as f64);
        if current.is_none_or(|len| self.objective_value() < len - EPS_INTEGRAL) {
            self.adopt_tour(nodes)?;
        }
        if self.dual_feasible() {
            Ok(PivType::FathomedTour)
        } else {
            Ok(PivType::Tour)
        }
    }

    /// Primal simplex from the current basis, stopped once the objective is
    /// below the reference tour length.
    pub fn pivot(&mut self) -> Result<PivType> {
        let Some(state) = &self.tour else {
            return Err(Error::invalid_input("pivot called without a reference tour"));
        };
        let limit = state.tour.length() as f64 - EPS_INTEGRAL;
        let status = self
            .engine
            .primal_opt(self.limits.with_objective_lower_limit(limit))?;
        match status {
            SolveStatus::Infeasible => Err(Error::lp_solve("pivot", CODE_PIVOT_INFEASIBLE)),
            SolveStatus::Unbounded => Err(Error::lp_solve("pivot", CODE_PIVOT_UNBOUNDED)),
            _ => self.classify(),
        }
    }

    /// Returns the engine to the tour basis.
    pub fn pivot_back(&mut self) -> Result<()> {
        let Some(state) = &self.tour else {
            return Err(Error::invalid_input("pivot_back called without a reference tour"));
        };
        if state.basis.is_empty() {
            return Err(Error::invalid_input("reference tour has no basis yet"));
        }
        let basis = state.basis.clone();
        self.engine.set_basis(&basis)
    }
}

/// Pads `stat` for slots appended before `deletion` and drops the deleted
/// ones.
fn remap_statuses(stat: &mut Vec<BasisStatus>, deletion: &Deletion, fill: BasisStatus) {
    stat.resize(deletion.len, fill);
    let mut deleted = deletion.deleted.iter().peekable();
    let mut slot = 0;
    stat.retain(|_| {
        let keep = deleted.next_if_eq(&&slot).is_none();
        slot += 1;
        keep
    });
}

fn retain_unmarked<T: Copy>(values: &[T], delete: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(delete)
        .filter(|&(_, &del)| !del)
        .map(|(&v, _)| v)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_model::instance::{EuclideanInstance, Instance, MatrixInstance};

    fn complete<I: Instance>(instance: &I) -> Relaxation {
        let n = instance.node_count();
        let mut lp = Relaxation::new(n).unwrap();
        let mut edges = Vec::new();
        for u in 0..n {
            for v in (u + 1)..n {
                edges.push(NewEdge::new(EndPts::new(u, v), instance.distance(u, v)));
            }
        }
        lp.add_edges(&edges).unwrap();
        lp
    }

    /// Two triangles joined by three unit connectors.
    pub(crate) fn prism() -> MatrixInstance {
        MatrixInstance::from_fn(6, |u, v| {
            let same_side = (u < 3) == (v < 3);
            if same_side {
                2
            } else if v == u + 3 || u == v + 3 {
                1
            } else {
                10
            }
        })
        .unwrap()
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
    fn test_new_has_degree_rows_only() {
        let lp = Relaxation::new(5).unwrap();
        assert_eq!(lp.row_count(), 5);
        assert_eq!(lp.cut_row_count(), 0);
        assert_eq!(lp.edge_count(), 0);
        assert!(lp.tour().is_none());
    }

    #[test]
    fn test_add_edges_skips_known_edges() {
        let mut lp = Relaxation::new(4).unwrap();
        let a = lp
            .add_edges(&[NewEdge::new(EndPts::new(0, 1), 3), NewEdge::new(EndPts::new(1, 2), 4)])
            .unwrap();
        let b = lp
            .add_edges(&[NewEdge::new(EndPts::new(1, 0), 3), NewEdge::new(EndPts::new(2, 3), 1)])
            .unwrap();
        assert_eq!(a, vec![EdgeIndex::new(0), EdgeIndex::new(1)]);
        assert_eq!(b, vec![EdgeIndex::new(0), EdgeIndex::new(2)]);
        assert_eq!(lp.edge_count(), 3);
        assert_eq!(lp.engine().num_cols(), 3);
    }

    #[test]
    fn test_cut_entries_must_name_cut_rows() {
        let mut lp = Relaxation::new(4).unwrap();
        let edge = NewEdge::new(EndPts::new(0, 1), 3)
            .with_cut_entries(SmallVec::from_slice(&[(RowIndex::new(1), 1.0)]));
        assert!(matches!(lp.add_edges(&[edge]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_prism_root_lp_is_half_integral() {
        let mut lp = complete(&prism());
        assert_eq!(lp.primal_pivot().unwrap(), SolveStatus::Optimal);
        assert!((lp.objective_value() - 9.0).abs() < 1e-6);
        assert!(lp.dual_feasible());
        assert_eq!(lp.classify().unwrap(), PivType::Frac);
    }

    #[test]
    fn test_add_then_remove_cut_rows_restores_rows() {
        let inst = prism();
        let mut lp = complete(&inst);
        lp.primal_pivot().unwrap();
        let rows_before = lp.row_count();

        // x(E({0,1,2})) <= 2
        let inside: Vec<usize> = [(0, 1), (0, 2), (1, 2)]
            .iter()
            .filter_map(|&(u, v)| lp.graph().find(EndPts::new(u, v)))
            .map(|e| e.get())
            .collect();
        let row = SparseRow::new(inside.clone(), vec![1.0; 3], Sense::LessEqual, 2.0);
        let added = lp.add_cut_rows(&[row.clone(), row]).unwrap();
        assert_eq!(added, vec![RowIndex::new(6), RowIndex::new(7)]);
        assert_eq!(lp.cut_row_count(), 2);

        let delstat = lp.remove_cut_rows(&added).unwrap();
        assert_eq!(delstat.len(), 8);
        assert!(delstat[6].is_none() && delstat[7].is_none());
        assert_eq!(&delstat[..6], &[Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]);
        assert_eq!(lp.row_count(), rows_before);
    }

    #[test]
    fn test_degree_rows_cannot_be_removed() {
        let mut lp = Relaxation::new(4).unwrap();
        assert!(matches!(
            lp.remove_cut_rows(&[RowIndex::new(2)]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_pentagon_tour_is_fathomed() {
        let inst = pentagon();
        let mut lp = complete(&inst);
        let tour = Tour::new(vec![0, 1, 2, 3, 4], &inst).unwrap();
        let length = tour.length();
        lp.instate_tour(tour).unwrap();
        assert_eq!(lp.tour_epoch(), 1);
        assert!(lp.primal_feasible());
        assert!((lp.objective_value() - length as f64).abs() < 1e-6);

        assert_eq!(lp.pivot().unwrap(), PivType::FathomedTour);
        assert!((lp.objective_value() - length as f64).abs() < 1e-6);
        assert_eq!(lp.tour_epoch(), 1);
    }

    #[test]
    fn test_pivot_adopts_shorter_tour() {
        let inst = pentagon();
        let mut lp = complete(&inst);
        let star = Tour::new(vec![0, 2, 4, 1, 3], &inst).unwrap();
        let star_length = star.length();
        lp.instate_tour(star).unwrap();

        let piv = lp.pivot().unwrap();
        assert!(matches!(piv, PivType::Tour | PivType::FathomedTour));
        assert!(lp.tour().unwrap().length() < star_length);
        assert_eq!(lp.tour_epoch(), 2);
        lp.pivot_back().unwrap();
        assert!((lp.objective_value() - lp.tour().unwrap().length() as f64).abs() < 1e-6);
    }

    #[test]
    fn test_even_tour_basis_uses_chord() {
        let inst = EuclideanInstance::new(
            (0..6)
                .map(|k| {
                    let a = k as f64 * std::f64::consts::TAU / 6.0;
                    (50.0 * a.cos(), 50.0 * a.sin())
                })
                .collect(),
        );
        let mut lp = Relaxation::new(6).unwrap();
        let tour = Tour::new(vec![0, 1, 2, 3, 4, 5], &inst).unwrap();
        let missing = lp.missing_tour_edges(&tour);
        assert_eq!(missing.len(), 7);
        assert!(missing.contains(&EndPts::new(0, 4)));
        let edges: Vec<NewEdge> = missing
            .iter()
            .map(|&e| NewEdge::new(e, inst.distance(e.u(), e.v())))
            .collect();
        lp.add_edges(&edges).unwrap();
        lp.instate_tour(tour).unwrap();

        let saved = lp.save_basis();
        let basis = saved.basis();
        assert_eq!(basis.basic_count(), 6);
        let chord = lp.graph().find(EndPts::new(0, 4)).unwrap();
        assert_eq!(basis.colstat[chord.get()], BasisStatus::Basic);
        assert!(lp.x()[chord.get()].abs() < 1e-9);
        assert_eq!(lp.x().iter().filter(|&&v| (v - 1.0).abs() < 1e-9).count(), 6);
    }

    #[test]
    fn test_tour_basis_columns_cannot_be_removed() {
        let inst = pentagon();
        let mut lp = complete(&inst);
        lp.instate_tour(Tour::new(vec![0, 1, 2, 3, 4], &inst).unwrap())
            .unwrap();
        let tour_edge = lp.graph().find(EndPts::new(0, 1)).unwrap();
        assert!(lp.remove_edges(&[tour_edge]).is_err());

        let other = lp.graph().find(EndPts::new(0, 2)).unwrap();
        let delstat = lp.remove_edges(&[other]).unwrap();
        assert_eq!(delstat[other.get()], None);
        assert_eq!(lp.edge_count(), 9);
        assert_eq!(lp.tour_x().unwrap().len(), 9);
        lp.pivot_back().unwrap();
        assert_eq!(lp.pivot().unwrap(), PivType::FathomedTour);
    }

    #[test]
    fn test_two_far_triangles_are_a_subtour() {
        let inst = EuclideanInstance::new(vec![
            (0.0, 0.0),
            (3.0, 0.0),
            (0.0, 3.0),
            (200.0, 0.0),
            (203.0, 0.0),
            (200.0, 3.0),
        ]);
        let mut lp = complete(&inst);
        assert_eq!(lp.primal_pivot().unwrap(), SolveStatus::Optimal);
        assert_eq!(lp.classify().unwrap(), PivType::Subtour);
        assert!(!lp.support().is_connected());
    }

    #[test]
    fn test_restore_basis_extends_for_new_rows() {
        let inst = prism();
        let mut lp = complete(&inst);
        lp.primal_pivot().unwrap();
        let saved = lp.save_basis();
        let objective = lp.objective_value();

        let row = SparseRow::new(vec![0], vec![1.0], Sense::LessEqual, 1.0);
        lp.add_cut_rows(&[row]).unwrap();
        lp.restore_basis(&saved).unwrap();
        assert_eq!(lp.save_basis().basis().rowstat.len(), 7);
        assert_eq!(lp.primal_pivot().unwrap(), SolveStatus::Optimal);
        assert!(lp.objective_value() >= objective - 1e-6);
    }

    #[test]
    fn test_restored_basis_follows_deleted_columns_and_rows() {
        let inst = prism();
        let mut lp = complete(&inst);
        // Loose rows keep their slacks basic at every vertex.
        let rows: Vec<SparseRow> = [(0, 1), (0, 3), (1, 2)]
            .iter()
            .map(|&(u, v)| {
                let j = lp.graph().find(EndPts::new(u, v)).unwrap().get();
                SparseRow::new(vec![j], vec![1.0], Sense::LessEqual, 5.0)
            })
            .collect();
        lp.add_cut_rows(&rows).unwrap();
        assert_eq!(lp.primal_pivot().unwrap(), SolveStatus::Optimal);
        let saved = lp.save_basis();
        let before = saved.basis().clone();
        let ends_before: Vec<EndPts> = (0..lp.edge_count())
            .map(|j| lp.graph().edge(EdgeIndex::new(j)).ends)
            .collect();

        // A non-basic column in the middle, then the middle cut row.
        let middle = (1..lp.edge_count() - 1)
            .find(|&j| before.colstat[j] == BasisStatus::AtLower)
            .unwrap();
        lp.remove_edges(&[EdgeIndex::new(middle)]).unwrap();
        lp.remove_cut_rows(&[RowIndex::new(7)]).unwrap();

        lp.restore_basis(&saved).unwrap();
        let after = lp.save_basis();
        let after = after.basis();
        assert_eq!(after.colstat.len(), before.colstat.len() - 1);
        for j in 0..lp.edge_count() {
            let ends = lp.graph().edge(EdgeIndex::new(j)).ends;
            let old = ends_before.iter().position(|&e| e == ends).unwrap();
            assert_eq!(after.colstat[j], before.colstat[old], "column {}", ends);
        }
        assert_eq!(after.rowstat.len(), 8);
        assert_eq!(&after.rowstat[..7], &before.rowstat[..7]);
        assert_eq!(after.rowstat[7], before.rowstat[8]);
        assert_eq!(lp.primal_pivot().unwrap(), SolveStatus::Optimal);
    }

    #[test]
    fn test_foreign_basis_is_rejected() {
        let inst = prism();
        let mut lp = complete(&inst);
        let mut other = complete(&inst);
        let j = other.graph().find(EndPts::new(0, 1)).unwrap();
        other.remove_edges(&[j]).unwrap();
        let saved = other.save_basis();
        assert!(matches!(lp.restore_basis(&saved), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_set_col_bounds_clamps() {
        let inst = prism();
        let mut lp = complete(&inst);
        let connector = lp.graph().find(EndPts::new(0, 3)).unwrap();
        lp.set_col_bounds(connector, 0.0, 0.0).unwrap();
        assert_eq!(lp.col_bounds(connector), (0.0, 0.0));
        lp.primal_pivot().unwrap();
        assert!(lp.x()[connector.get()].abs() < 1e-9);
        assert!(lp.objective_value() > 9.0 - 1e-6);
    }
}
