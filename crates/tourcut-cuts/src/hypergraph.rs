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

//! Hypergraph cuts.
//!
//! A cut is described by node subsets rather than by edge coefficients, so
//! it can be evaluated on any edge, including edges that are not columns of
//! the LP yet. Two shapes exist:
//!
//! - standard: `sum_C m_C x(delta(C)) >= rhs` (subtour, blossom, comb);
//! - domino-parity: a handle `H` and an odd list of teeth `(t, S)`, giving
//!   `sum_e c_e x_e <= rhs` with `c_e` and `rhs` the halved and rounded down
//!   sum of the degree equations of `H` and the tooth inequalities.
//!
//! `ExpandedCut` holds the subsets as bitsets; `CutRecord` is the
//! tour-independent form written to the cut pool.

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};
use tourcut_core::error::{Error, Result};
use tourcut_lp::engine::{Sense, SparseRow};
use tourcut_lp::support::SupportGraph;
use tourcut_model::graph::{CoreGraph, EndPts};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum CutKind {
    Subtour,
    Blossom,
    Comb,
    DominoParity,
}

impl CutKind {
    pub const ALL: [CutKind; 4] = [
        CutKind::Subtour,
        CutKind::Blossom,
        CutKind::Comb,
        CutKind::DominoParity,
    ];

    #[inline]
    pub fn as_index(&self) -> usize {
        match self {
            CutKind::Subtour => 0,
            CutKind::Blossom => 1,
            CutKind::Comb => 2,
            CutKind::DominoParity => 3,
        }
    }
}

impl std::fmt::Display for CutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CutKind::Subtour => "subtour",
            CutKind::Blossom => "blossom",
            CutKind::Comb => "comb",
            CutKind::DominoParity => "domino-parity",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ToothRecord {
    pub root: usize,
    pub body: Vec<usize>,
}

/// The persisted form of a cut. Node lists are sorted.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CutRecord {
    pub kind: CutKind,
    pub sense: Sense,
    pub rhs: f64,
    pub handles: Vec<Vec<usize>>,
    pub coefficients: Vec<i32>,
    #[serde(default)]
    pub teeth: Vec<ToothRecord>,
}

/// Identity of a cut, independent of its right-hand side representation.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CutKey {
    kind: CutKind,
    handles: Vec<Vec<usize>>,
    coefficients: Vec<i32>,
    teeth: Vec<ToothRecord>,
}

impl CutRecord {
    pub fn key(&self) -> CutKey {
        CutKey {
            kind: self.kind,
            handles: self.handles.clone(),
            coefficients: self.coefficients.clone(),
            teeth: self.teeth.clone(),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum CutForm {
    Standard {
        sets: Vec<(FixedBitSet, i32)>,
    },
    Domino {
        handle: FixedBitSet,
        teeth: Vec<(usize, FixedBitSet)>,
    },
}

/// A cut with its node subsets expanded to bitsets over `0..node_count`.
#[derive(Clone, PartialEq, Debug)]
pub struct ExpandedCut {
    kind: CutKind,
    sense: Sense,
    rhs: f64,
    form: CutForm,
    node_count: usize,
}

fn node_set(routine: &'static str, node_count: usize, nodes: &[usize]) -> Result<FixedBitSet> {
    let mut set = FixedBitSet::with_capacity(node_count);
    for &v in nodes {
        if v >= node_count {
            return Err(Error::separation(
                routine,
                format!("node {} out of range for {} nodes", v, node_count),
            ));
        }
        set.insert(v);
    }
    Ok(set)
}

#[inline]
fn sorted_nodes(set: &FixedBitSet) -> Vec<usize> {
    set.ones().collect()
}

impl ExpandedCut {
    /// A standard cut `sum m_C x(delta(C)) >= rhs`.
    pub fn standard(
        node_count: usize,
        kind: CutKind,
        sets: &[(Vec<usize>, i32)],
        rhs: f64,
    ) -> Result<Self> {
        if kind == CutKind::DominoParity || sets.is_empty() {
            return Err(Error::separation("standard", "not a standard cut"));
        }
        let mut out = Vec::with_capacity(sets.len());
        for (nodes, m) in sets {
            let set = node_set("standard", node_count, nodes)?;
            let size = set.count_ones(..);
            if size == 0 || size == node_count {
                return Err(Error::separation(
                    "standard",
                    "a clique must be a proper non-empty subset",
                ));
            }
            out.push((set, *m));
        }
        Ok(Self {
            kind,
            sense: Sense::GreaterEqual,
            rhs,
            form: CutForm::Standard { sets: out },
            node_count,
        })
    }

    /// The subtour inequality `x(delta(S)) >= 2`.
    pub fn subtour(node_count: usize, nodes: &[usize]) -> Result<Self> {
        Self::standard(
            node_count,
            CutKind::Subtour,
            &[(nodes.to_vec(), 1)],
            2.0,
        )
    }

    /// The comb inequality `x(delta(H)) + sum x(delta(T_i)) >= 3k + 1`.
    ///
    /// Teeth must be pairwise disjoint, each must meet the handle and leave
    /// it, and their number must be odd and at least three. A comb whose
    /// teeth all have two nodes is reported as a blossom.
    pub fn comb(node_count: usize, handle: &[usize], teeth: &[Vec<usize>]) -> Result<Self> {
        let k = teeth.len();
        if k < 3 || k % 2 == 0 {
            return Err(Error::separation(
                "comb",
                format!("a comb needs an odd number of at least 3 teeth, got {}", k),
            ));
        }
        let h = node_set("comb", node_count, handle)?;
        let mut used = FixedBitSet::with_capacity(node_count);
        for tooth in teeth {
            let t = node_set("comb", node_count, tooth)?;
            if !t.is_disjoint(&used) {
                return Err(Error::separation("comb", "teeth overlap"));
            }
            let inside = t.intersection(&h).count();
            if inside == 0 || inside == t.count_ones(..) {
                return Err(Error::separation(
                    "comb",
                    "every tooth must meet the handle and leave it",
                ));
            }
            used.union_with(&t);
        }
        let kind = if teeth.iter().all(|t| t.len() == 2) {
            CutKind::Blossom
        } else {
            CutKind::Comb
        };
        let mut sets = Vec::with_capacity(k + 1);
        sets.push((handle.to_vec(), 1));
        sets.extend(teeth.iter().map(|t| (t.clone(), 1)));
        Self::standard(node_count, kind, &sets, (3 * k + 1) as f64)
    }

    /// A domino-parity cut from a handle and teeth `(root, body)`.
    pub fn domino(
        node_count: usize,
        handle: &[usize],
        teeth: &[(usize, Vec<usize>)],
    ) -> Result<Self> {
        if teeth.is_empty() || teeth.len() % 2 == 0 {
            return Err(Error::separation(
                "domino",
                format!("an odd number of teeth is required, got {}", teeth.len()),
            ));
        }
        let h = node_set("domino", node_count, handle)?;
        let h_size = h.count_ones(..);
        if h_size == 0 || h_size == node_count {
            return Err(Error::separation("domino", "handle must be a proper subset"));
        }
        let mut total = 2 * h_size as i64;
        let mut out = Vec::with_capacity(teeth.len());
        for (root, body) in teeth {
            let s = node_set("domino", node_count, body)?;
            let s_size = s.count_ones(..);
            if *root >= node_count || s_size == 0 || s.contains(*root) {
                return Err(Error::separation(
                    "domino",
                    "a tooth needs a non-empty body without its root",
                ));
            }
            total += 2 * s_size as i64 - 1;
            out.push((*root, s));
        }
        Ok(Self {
            kind: CutKind::DominoParity,
            sense: Sense::LessEqual,
            rhs: total.div_euclid(2) as f64,
            form: CutForm::Domino {
                handle: h,
                teeth: out,
            },
            node_count,
        })
    }

    /// Expands a persisted record.
    pub fn from_record(node_count: usize, record: &CutRecord) -> Result<Self> {
        match record.kind {
            CutKind::DominoParity => {
                let handle = record
                    .handles
                    .first()
                    .ok_or_else(|| Error::separation("pool", "domino record without handle"))?;
                let teeth: Vec<(usize, Vec<usize>)> = record
                    .teeth
                    .iter()
                    .map(|t| (t.root, t.body.clone()))
                    .collect();
                Self::domino(node_count, handle, &teeth)
            }
            kind => {
                if record.handles.len() != record.coefficients.len() {
                    return Err(Error::separation(
                        "pool",
                        "handle and coefficient counts differ",
                    ));
                }
                let sets: Vec<(Vec<usize>, i32)> = record
                    .handles
                    .iter()
                    .cloned()
                    .zip(record.coefficients.iter().copied())
                    .collect();
                Self::standard(node_count, kind, &sets, record.rhs)
            }
        }
    }

    pub fn to_record(&self) -> CutRecord {
        match &self.form {
            CutForm::Standard { sets } => CutRecord {
                kind: self.kind,
                sense: self.sense,
                rhs: self.rhs,
                handles: sets.iter().map(|(s, _)| sorted_nodes(s)).collect(),
                coefficients: sets.iter().map(|(_, m)| *m).collect(),
                teeth: Vec::new(),
            },
            CutForm::Domino { handle, teeth } => CutRecord {
                kind: self.kind,
                sense: self.sense,
                rhs: self.rhs,
                handles: vec![sorted_nodes(handle)],
                coefficients: Vec::new(),
                teeth: teeth
                    .iter()
                    .map(|(root, body)| ToothRecord {
                        root: *root,
                        body: sorted_nodes(body),
                    })
                    .collect(),
            },
        }
    }

    #[inline]
    pub fn kind(&self) -> CutKind {
        self.kind
    }

    #[inline]
    pub fn sense(&self) -> Sense {
        self.sense
    }

    #[inline]
    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    #[inline]
    pub fn form(&self) -> &CutForm {
        &self.form
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// The handle: the only set of a subtour, the first set of a comb, the
    /// handle of a domino-parity cut.
    pub fn handle(&self) -> &FixedBitSet {
        match &self.form {
            CutForm::Standard { sets } => &sets[0].0,
            CutForm::Domino { handle, .. } => handle,
        }
    }

    /// The coefficient of edge `{u, v}` in the LP row.
    pub fn coefficient(&self, u: usize, v: usize) -> f64 {
        match &self.form {
            CutForm::Standard { sets } => sets
                .iter()
                .filter(|(s, _)| s.contains(u) != s.contains(v))
                .map(|(_, m)| *m as f64)
                .sum(),
            CutForm::Domino { handle, teeth } => {
                let mut c = handle.contains(u) as i64 + handle.contains(v) as i64;
                for (root, body) in teeth {
                    let (bu, bv) = (body.contains(u), body.contains(v));
                    if bu && bv {
                        c += 2;
                    } else if (bu && v == *root) || (bv && u == *root) {
                        c += 1;
                    }
                }
                c.div_euclid(2) as f64
            }
        }
    }

    #[inline]
    pub fn coefficient_of(&self, ends: EndPts) -> f64 {
        self.coefficient(ends.u(), ends.v())
    }

    /// The LP row over the columns of `graph`.
    pub fn sparse_row(&self, graph: &CoreGraph) -> SparseRow {
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (j, edge) in graph.edges().iter().enumerate() {
            let c = self.coefficient_of(edge.ends);
            if c != 0.0 {
                indices.push(j);
                values.push(c);
            }
        }
        SparseRow::new(indices, values, self.sense, self.rhs)
    }

    pub fn activity(&self, support: &SupportGraph) -> f64 {
        support
            .edges()
            .iter()
            .map(|e| self.coefficient_of(e.ends) * e.value)
            .sum()
    }

    /// Positive when `support` violates the cut.
    pub fn violation(&self, support: &SupportGraph) -> f64 {
        let activity = self.activity(support);
        match self.sense {
            Sense::GreaterEqual => self.rhs - activity,
            Sense::LessEqual => activity - self.rhs,
            Sense::Equal => (activity - self.rhs).abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prism_support() -> SupportGraph {
        let mut g = CoreGraph::new(6);
        let mut x = Vec::new();
        for (u, v, val) in [
            (0, 1, 0.5),
            (1, 2, 0.5),
            (0, 2, 0.5),
            (3, 4, 0.5),
            (4, 5, 0.5),
            (3, 5, 0.5),
            (0, 3, 1.0),
            (1, 4, 1.0),
            (2, 5, 1.0),
        ] {
            g.add_edge(EndPts::new(u, v), 1);
            x.push(val);
        }
        SupportGraph::new(&g, &x)
    }

    #[test]
    fn test_subtour_coefficients() {
        let cut = ExpandedCut::subtour(6, &[0, 1, 2]).unwrap();
        assert_eq!(cut.kind(), CutKind::Subtour);
        assert_eq!(cut.coefficient(0, 3), 1.0);
        assert_eq!(cut.coefficient(0, 1), 0.0);
        assert_eq!(cut.coefficient(4, 5), 0.0);
        assert!((cut.violation(&prism_support()) + 1.0).abs() < 1e-12);
        assert!(ExpandedCut::subtour(3, &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_prism_blossom_is_violated() {
        let cut = ExpandedCut::comb(6, &[0, 1, 2], &[vec![0, 3], vec![1, 4], vec![2, 5]]).unwrap();
        assert_eq!(cut.kind(), CutKind::Blossom);
        assert_eq!(cut.rhs(), 10.0);
        // x(delta(H)) = 3, each tooth crosses 0.5 + 0.5 + 0.5 + 0.5 = 2.
        assert!((cut.violation(&prism_support()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_comb_rejects_bad_teeth() {
        assert!(ExpandedCut::comb(6, &[0, 1, 2], &[vec![0, 3], vec![1, 4]]).is_err());
        assert!(ExpandedCut::comb(6, &[0, 1, 2], &[vec![0, 3], vec![0, 4], vec![2, 5]]).is_err());
        assert!(ExpandedCut::comb(6, &[0, 1, 2], &[vec![0, 1], vec![1, 4], vec![2, 5]]).is_err());
    }

    #[test]
    fn test_prism_domino_cut() {
        let cut =
            ExpandedCut::domino(6, &[0, 1, 2], &[(0, vec![3]), (1, vec![4]), (2, vec![5])]).unwrap();
        assert_eq!(cut.sense(), Sense::LessEqual);
        assert_eq!(cut.rhs(), 4.0);
        assert_eq!(cut.coefficient(0, 1), 1.0);
        assert_eq!(cut.coefficient(0, 3), 1.0);
        assert_eq!(cut.coefficient(3, 4), 0.0);
        assert_eq!(cut.coefficient(0, 4), 0.0);
        assert!((cut.violation(&prism_support()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_domino_rejects_root_in_body() {
        assert!(ExpandedCut::domino(6, &[0, 1], &[(3, vec![3, 4])]).is_err());
        assert!(ExpandedCut::domino(6, &[0, 1], &[(2, vec![3]), (4, vec![5])]).is_err());
    }

    #[test]
    fn test_record_round_trip_preserves_rows() {
        let cut =
            ExpandedCut::domino(6, &[2, 0, 1], &[(0, vec![3]), (1, vec![4]), (2, vec![5])]).unwrap();
        let record = cut.to_record();
        assert_eq!(record.handles, vec![vec![0, 1, 2]]);
        let back = ExpandedCut::from_record(6, &record).unwrap();
        assert_eq!(back, cut);
        assert_eq!(back.to_record().key(), record.key());

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"sense\":\"L\""));
        assert!(json.contains("\"kind\":\"DominoParity\""));
    }

    #[test]
    fn test_sparse_row_skips_zero_coefficients() {
        let mut g = CoreGraph::new(4);
        for (u, v) in [(0, 1), (1, 2), (2, 3), (0, 3)] {
            g.add_edge(EndPts::new(u, v), 1);
        }
        let row = ExpandedCut::subtour(4, &[0, 1]).unwrap().sparse_row(&g);
        assert_eq!(row.indices, vec![1, 3]);
        assert_eq!(row.values, vec![1.0, 1.0]);
        assert_eq!(row.rhs, 2.0);
    }
}
