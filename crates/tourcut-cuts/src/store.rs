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

//! The hypergraph cut store.
//!
//! Holds the cuts that currently have an LP row. Cut `i` always sits at row
//! `node_count + i`: installing appends a row and a cut together, pruning
//! removes rows first and then compacts the cut list with the renumbering
//! the relaxation returned. Node subsets are interned in the clique bank so
//! equal handles across cuts share one entry.

use crate::clique::CliqueBank;
use crate::hypergraph::{CutForm, CutKey, CutKind, CutRecord, ExpandedCut};
use crate::index::{CliqueRef, CutIndex};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tourcut_core::error::{Error, Result};
use tourcut_lp::engine::{LpEngine, Sense, SparseRow};
use tourcut_lp::index::RowIndex;
use tourcut_lp::relaxation::Relaxation;
use tourcut_model::graph::{CoreGraph, EndPts};
use tourcut_model::tour::Tour;

/// How a stored cut refers to its cliques.
#[derive(Clone, PartialEq, Debug)]
pub enum HyperShape {
    Standard(SmallVec<[(CliqueRef, i32); 4]>),
    /// A handle and `(root, body)` clique pairs.
    Domino {
        handle: CliqueRef,
        teeth: SmallVec<[(CliqueRef, CliqueRef); 4]>,
    },
}

#[derive(Clone, PartialEq, Debug)]
pub struct HyperCut {
    pub kind: CutKind,
    pub sense: Sense,
    pub rhs: f64,
    pub shape: HyperShape,
    pub age: u32,
}

impl HyperCut {
    fn cliques(&self) -> SmallVec<[CliqueRef; 8]> {
        match &self.shape {
            HyperShape::Standard(sets) => sets.iter().map(|(r, _)| *r).collect(),
            HyperShape::Domino { handle, teeth } => std::iter::once(*handle)
                .chain(teeth.iter().flat_map(|(root, body)| [*root, *body]))
                .collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CutStore {
    node_count: usize,
    cuts: Vec<HyperCut>,
    expanded: Vec<ExpandedCut>,
    keys: FxHashSet<CutKey>,
    cliques: CliqueBank,
}

impl CutStore {
    /// An empty store whose clique bank is keyed against `tour`.
    pub fn new(tour: &Tour) -> Self {
        Self {
            node_count: tour.node_count(),
            cuts: Vec::new(),
            expanded: Vec::new(),
            keys: FxHashSet::default(),
            cliques: CliqueBank::new(tour),
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    #[inline]
    pub fn cliques(&self) -> &CliqueBank {
        &self.cliques
    }

    #[inline]
    pub fn get(&self, index: CutIndex) -> Option<&HyperCut> {
        self.cuts.get(index.get())
    }

    #[inline]
    pub fn expanded(&self, index: CutIndex) -> Option<&ExpandedCut> {
        self.expanded.get(index.get())
    }

    pub fn iter_expanded(&self) -> impl Iterator<Item = (CutIndex, &ExpandedCut)> + '_ {
        self.expanded
            .iter()
            .enumerate()
            .map(|(i, c)| (CutIndex::new(i), c))
    }

    /// LP row of cut `index`.
    #[inline]
    pub fn row_of(&self, index: CutIndex) -> RowIndex {
        RowIndex::new(self.node_count + index.get())
    }

    /// Returns `true` if an identical cut is already stored.
    pub fn contains(&self, cut: &ExpandedCut) -> bool {
        self.keys.contains(&cut.to_record().key())
    }

    fn intern_shape(&mut self, cut: &ExpandedCut) -> Result<HyperShape> {
        let node_list = |set: &fixedbitset::FixedBitSet| set.ones().collect::<Vec<_>>();
        match cut.form() {
            CutForm::Standard { sets } => {
                let mut refs = SmallVec::new();
                for (set, m) in sets {
                    refs.push((self.cliques.intern(&node_list(set))?, *m));
                }
                Ok(HyperShape::Standard(refs))
            }
            CutForm::Domino { handle, teeth } => {
                let handle = self.cliques.intern(&node_list(handle))?;
                let mut refs = SmallVec::new();
                for (root, body) in teeth {
                    let r = self.cliques.intern(&[*root])?;
                    let b = self.cliques.intern(&node_list(body))?;
                    refs.push((r, b));
                }
                Ok(HyperShape::Domino {
                    handle,
                    teeth: refs,
                })
            }
        }
    }

    /// Interns the cut's subsets, builds its row over the current core
    /// edges and appends it to the LP.
    pub fn install<E: LpEngine>(
        &mut self,
        cut: &ExpandedCut,
        lp: &mut Relaxation<E>,
    ) -> Result<RowIndex> {
        if lp.cut_row_count() != self.cuts.len() {
            return Err(Error::cache_consistency(format!(
                "cut store holds {} cuts but the LP has {} cut rows",
                self.cuts.len(),
                lp.cut_row_count()
            )));
        }
        if cut.node_count() != self.node_count {
            return Err(Error::invalid_input(format!(
                "cut over {} nodes installed into a store over {}",
                cut.node_count(),
                self.node_count
            )));
        }
        let row = cut.sparse_row(lp.graph());
        let shape = self.intern_shape(cut)?;
        let rows = lp.add_cut_rows(std::slice::from_ref(&row))?;
        self.keys.insert(cut.to_record().key());
        self.cuts.push(HyperCut {
            kind: cut.kind(),
            sense: cut.sense(),
            rhs: cut.rhs(),
            shape,
            age: 0,
        });
        self.expanded.push(cut.clone());
        log::trace!(
            "installed {} cut at {} with {} nonzeros",
            cut.kind(),
            rows[0],
            row.nnz()
        );
        Ok(rows[0])
    }

    /// Ages every cut by its row slack: loose cuts gain one, tight cuts
    /// reset to zero. `slacks` is indexed by LP row.
    pub fn age_tick(&mut self, slacks: &[f64], eps: f64) {
        for (i, cut) in self.cuts.iter_mut().enumerate() {
            let slack = slacks.get(self.node_count + i).copied().unwrap_or(0.0);
            if slack.abs() > eps {
                cut.age = cut.age.saturating_add(1);
            } else {
                cut.age = 0;
            }
        }
    }

    /// Removes cuts older than `age_threshold`: the LP rows go first, then
    /// the clique references, then the store is compacted. Returns the
    /// removed cuts as records.
    pub fn prune<E: LpEngine>(
        &mut self,
        age_threshold: u32,
        lp: &mut Relaxation<E>,
    ) -> Result<Vec<CutRecord>> {
        let doomed: Vec<usize> = (0..self.cuts.len())
            .filter(|&i| self.cuts[i].age > age_threshold)
            .collect();
        if doomed.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<RowIndex> = doomed
            .iter()
            .map(|&i| RowIndex::new(self.node_count + i))
            .collect();
        let delstat = lp.remove_cut_rows(&rows)?;

        let mut records = Vec::with_capacity(doomed.len());
        for &i in &doomed {
            for r in self.cuts[i].cliques() {
                self.cliques.release(r)?;
            }
            let record = self.expanded[i].to_record();
            self.keys.remove(&record.key());
            records.push(record);
        }

        let mut keep = vec![true; self.cuts.len()];
        for &i in &doomed {
            keep[i] = false;
        }
        let mut slot = 0;
        self.cuts.retain(|_| {
            slot += 1;
            keep[slot - 1]
        });
        slot = 0;
        self.expanded.retain(|_| {
            slot += 1;
            keep[slot - 1]
        });

        // The surviving cuts must have landed where the LP put their rows.
        for (old, &alive) in keep.iter().enumerate() {
            if !alive {
                continue;
            }
            let expected = RowIndex::new(self.node_count + old);
            if expected.renumbered(&delstat).is_none() {
                return Err(Error::cache_consistency(format!(
                    "row {} of a kept cut was deleted",
                    expected
                )));
            }
        }
        log::debug!("pruned {} cuts, {} remain", records.len(), self.cuts.len());
        Ok(records)
    }

    /// The coefficient of `ends` in cut `index`.
    #[inline]
    pub fn coefficient(&self, index: CutIndex, ends: EndPts) -> f64 {
        self.expanded
            .get(index.get())
            .map_or(0.0, |c| c.coefficient_of(ends))
    }

    /// The row of cut `index` over the columns of `graph`.
    pub fn to_lp_row(&self, index: CutIndex, graph: &CoreGraph) -> Option<SparseRow> {
        self.expanded.get(index.get()).map(|c| c.sparse_row(graph))
    }

    /// Nonzero cut-row coefficients for a new column `ends`.
    pub fn column_entries(&self, ends: EndPts) -> SmallVec<[(RowIndex, f64); 4]> {
        self.expanded
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let value = c.coefficient_of(ends);
                (value != 0.0).then(|| (RowIndex::new(self.node_count + i), value))
            })
            .collect()
    }

    /// `sum_c pi_c * coef_c(ends)` for the duals `pi` indexed by LP row.
    pub fn dual_sum(&self, duals: &[f64], ends: EndPts) -> f64 {
        self.expanded
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let pi = duals.get(self.node_count + i).copied().unwrap_or(0.0);
                if pi == 0.0 {
                    0.0
                } else {
                    pi * c.coefficient_of(ends)
                }
            })
            .sum()
    }

    /// Number of stored cuts of each kind, indexed by `CutKind::as_index`.
    pub fn kind_counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for cut in &self.cuts {
            counts[cut.kind.as_index()] += 1;
        }
        counts
    }

    pub fn records(&self) -> Vec<CutRecord> {
        self.expanded.iter().map(ExpandedCut::to_record).collect()
    }

    /// Checks row placement, clique liveness and that every cut rebuilt
    /// from its cliques equals the cached expansion.
    pub fn verify<E: LpEngine>(&self, lp: &Relaxation<E>) -> Result<()> {
        if lp.cut_row_count() != self.cuts.len() || self.expanded.len() != self.cuts.len() {
            return Err(Error::cache_consistency(format!(
                "cut store holds {} cuts but the LP has {} cut rows",
                self.cuts.len(),
                lp.cut_row_count()
            )));
        }
        self.cliques.verify()?;
        for (i, (cut, expanded)) in self.cuts.iter().zip(&self.expanded).enumerate() {
            let rebuilt = match &cut.shape {
                HyperShape::Standard(sets) => {
                    let mut lists = Vec::with_capacity(sets.len());
                    for (r, m) in sets {
                        lists.push((self.cliques.nodes(*r)?, *m));
                    }
                    ExpandedCut::standard(self.node_count, cut.kind, &lists, cut.rhs)
                }
                HyperShape::Domino { handle, teeth } => {
                    let mut legs = Vec::with_capacity(teeth.len());
                    for (root, body) in teeth {
                        let root_nodes = self.cliques.nodes(*root)?;
                        if root_nodes.len() != 1 {
                            return Err(Error::cache_consistency(format!(
                                "cut {} has a tooth root of {} nodes",
                                i,
                                root_nodes.len()
                            )));
                        }
                        legs.push((root_nodes[0], self.cliques.nodes(*body)?));
                    }
                    ExpandedCut::domino(self.node_count, &self.cliques.nodes(*handle)?, &legs)
                }
            };
            match rebuilt {
                Ok(rebuilt) if rebuilt == *expanded => {}
                _ => {
                    return Err(Error::cache_consistency(format!(
                        "cut {} does not match its cliques",
                        i
                    )));
                }
            }
        }
        Ok(())
    }
}
