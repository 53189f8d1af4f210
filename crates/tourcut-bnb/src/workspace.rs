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

//! The mutable state one solve threads through every node: the LP, the cut
//! store and pool, the tooth bank and per-column edge ages.
//!
//! Columns may be appended by anyone holding the LP (the pricer, branch
//! tours); `edge_ages` is grown lazily to match. Column deletions only happen
//! through [`Workspace::remove_edges`], which renumbers the ages.

use tourcut_core::error::{Error, Result};
use tourcut_cuts::pool::CutPool;
use tourcut_cuts::store::CutStore;
use tourcut_cuts::tooth::ToothBank;
use tourcut_lp::engine::LpEngine;
use tourcut_lp::relaxation::{NewEdge, Relaxation};
use tourcut_model::graph::EndPts;
use tourcut_model::index::EdgeIndex;
use tourcut_model::instance::Instance;
use tourcut_model::tour::Tour;

#[derive(Clone, Debug)]
pub struct Workspace<E: LpEngine> {
    pub lp: Relaxation<E>,
    pub store: CutStore,
    pub pool: CutPool,
    pub teeth: ToothBank,
    edge_ages: Vec<u32>,
}

impl<E: LpEngine> Workspace<E> {
    /// `lp` must already carry a reference tour.
    pub fn new(lp: Relaxation<E>, pool: CutPool) -> Result<Self> {
        let Some(tour) = lp.tour() else {
            return Err(Error::invalid_input(
                "the relaxation needs a reference tour before the search starts",
            ));
        };
        let store = CutStore::new(tour);
        let mut teeth = ToothBank::new(tour);
        teeth.sync(tour, lp.tour_epoch());
        let edge_ages = vec![0; lp.edge_count()];
        Ok(Self {
            lp,
            store,
            pool,
            teeth,
            edge_ages,
        })
    }

    /// The reference tour of the LP.
    pub fn tour(&self) -> Result<&Tour> {
        self.lp
            .tour()
            .ok_or_else(|| Error::invalid_input("the relaxation has no reference tour"))
    }

    #[inline]
    pub fn edge_age(&self, index: EdgeIndex) -> u32 {
        self.edge_ages.get(index.get()).copied().unwrap_or(0)
    }

    /// Adds columns for the edges in `ends` that are not yet in the core,
    /// with their coefficients in every installed cut. Returns how many were
    /// added.
    pub fn add_edges<I>(&mut self, instance: &I, ends: &[EndPts]) -> Result<usize>
    where
        I: Instance + ?Sized,
    {
        let edges: Vec<NewEdge> = ends
            .iter()
            .filter(|&&e| !self.lp.graph().contains(e))
            .map(|&e| {
                NewEdge::new(e, instance.distance(e.u(), e.v()))
                    .with_cut_entries(self.store.column_entries(e))
            })
            .collect();
        if edges.is_empty() {
            return Ok(0);
        }
        let added = self.lp.add_edges(&edges)?.len();
        self.edge_ages.resize(self.lp.edge_count(), 0);
        Ok(added)
    }

    /// Makes `tour` the reference tour: adds its missing edges (the chord
    /// included), installs its basis and resyncs the tooth bank.
    pub fn instate_tour<I>(&mut self, instance: &I, tour: Tour) -> Result<()>
    where
        I: Instance + ?Sized,
    {
        let missing = self.lp.missing_tour_edges(&tour);
        self.add_edges(instance, &missing)?;
        self.lp.instate_tour(tour)?;
        self.sync_teeth()
    }

    /// Completes a tour adopted by pivot classification without a basis.
    pub fn complete_adopted_tour<I>(&mut self, instance: &I) -> Result<()>
    where
        I: Instance + ?Sized,
    {
        if self.lp.has_tour_basis() {
            return self.sync_teeth();
        }
        let tour = self.tour()?.clone();
        self.instate_tour(instance, tour)
    }

    /// Returns the engine to the tour basis, completing an adopted tour
    /// first if it has none.
    pub fn pivot_back<I>(&mut self, instance: &I) -> Result<()>
    where
        I: Instance + ?Sized,
    {
        if self.lp.has_tour_basis() {
            self.lp.pivot_back()
        } else {
            self.complete_adopted_tour(instance)
        }
    }

    pub fn sync_teeth(&mut self) -> Result<()> {
        let Some(tour) = self.lp.tour() else {
            return Err(Error::invalid_input("the relaxation has no reference tour"));
        };
        if self.teeth.sync(tour, self.lp.tour_epoch()) {
            log::trace!("tooth bank rebuilt for epoch {}", self.lp.tour_epoch());
        }
        Ok(())
    }

    /// Advances edge ages from the current solution: a column at zero with
    /// positive reduced cost ages by one, any other column resets.
    pub fn age_edges(&mut self, eps: f64) {
        let x = self.lp.x();
        let rc = self.lp.reduced_costs();
        self.edge_ages.resize(self.lp.edge_count(), 0);
        for (j, age) in self.edge_ages.iter_mut().enumerate() {
            let value = x.get(j).copied().unwrap_or(0.0);
            let cost = rc.get(j).copied().unwrap_or(0.0);
            if value < eps && cost > eps {
                *age = age.saturating_add(1);
            } else {
                *age = 0;
            }
        }
    }

    /// Columns older than `age_limit` that may leave the core: not an edge
    /// of the reference tour, not its chord, and not clamped.
    pub fn stale_edges(&self, age_limit: u32) -> Vec<EdgeIndex> {
        let Some(tour) = self.lp.tour() else {
            return Vec::new();
        };
        let n = tour.node_count();
        let chord =
            (n >= 4 && n % 2 == 0).then(|| EndPts::new(tour.node_at(0), tour.node_at(n - 2)));
        self.edge_ages
            .iter()
            .enumerate()
            .filter(|&(_, &age)| age > age_limit)
            .map(|(j, _)| EdgeIndex::new(j))
            .filter(|&index| {
                let ends = self.lp.graph().edge(index).ends;
                !tour.has_edge(ends)
                    && Some(ends) != chord
                    && self.lp.col_bounds(index) == (0.0, 1.0)
            })
            .collect()
    }

    /// Deletes columns and renumbers the edge ages with the returned
    /// mapping.
    pub fn remove_edges(&mut self, indices: &[EdgeIndex]) -> Result<usize> {
        if indices.is_empty() {
            return Ok(0);
        }
        let delstat = self.lp.remove_edges(indices)?;
        let mut ages = vec![0; self.lp.edge_count()];
        for (old, new) in delstat.iter().enumerate() {
            if let Some(new) = new
                && let Some(slot) = ages.get_mut(*new)
            {
                *slot = self.edge_ages.get(old).copied().unwrap_or(0);
            }
        }
        self.edge_ages = ages;
        Ok(indices.len())
    }

    /// Splits the workspace back into the LP and the cut pool.
    pub fn into_parts(self) -> (Relaxation<E>, CutPool) {
        (self.lp, self.pool)
    }
}
