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

//! The core edge set.
//!
//! `CoreGraph` holds exactly the edges that currently have an LP column, in
//! column order. It is mutated only by the relaxation manager so that the
//! column numbering and the edge numbering can never drift apart.

use crate::index::EdgeIndex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// An unordered node pair, stored with `u < v`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EndPts {
    u: usize,
    v: usize,
}

impl EndPts {
    /// Creates a normalized endpoint pair.
    #[inline]
    pub fn new(a: usize, b: usize) -> Self {
        debug_assert!(
            a != b,
            "called `EndPts::new` with a loop at node {}",
            a
        );
        if a < b {
            Self { u: a, v: b }
        } else {
            Self { u: b, v: a }
        }
    }

    #[inline]
    pub fn u(&self) -> usize {
        self.u
    }

    #[inline]
    pub fn v(&self) -> usize {
        self.v
    }

    #[inline]
    pub fn contains(&self, node: usize) -> bool {
        self.u == node || self.v == node
    }

    /// The endpoint that is not `node`.
    #[inline]
    pub fn other(&self, node: usize) -> usize {
        if self.u == node { self.v } else { self.u }
    }
}

impl std::fmt::Display for EndPts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.u, self.v)
    }
}

/// A core edge with its length.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Edge {
    pub ends: EndPts,
    pub len: i64,
}

/// Adjacency entry: neighbour and the connecting edge.
pub type Incidence = (usize, EdgeIndex);

#[derive(Clone, Debug, Default)]
pub struct CoreGraph {
    node_count: usize,
    edges: Vec<Edge>,
    lookup: FxHashMap<EndPts, EdgeIndex>,
    adjacency: Vec<SmallVec<[Incidence; 8]>>,
}

impl CoreGraph {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            edges: Vec::new(),
            lookup: FxHashMap::default(),
            adjacency: vec![SmallVec::new(); node_count],
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the edge at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn edge(&self, index: EdgeIndex) -> &Edge {
        debug_assert!(
            index.get() < self.edges.len(),
            "called `CoreGraph::edge` with index out of bounds: the len is {} but the index is {}",
            self.edges.len(),
            index.get()
        );
        &self.edges[index.get()]
    }

    #[inline]
    pub fn find(&self, ends: EndPts) -> Option<EdgeIndex> {
        self.lookup.get(&ends).copied()
    }

    #[inline]
    pub fn contains(&self, ends: EndPts) -> bool {
        self.lookup.contains_key(&ends)
    }

    #[inline]
    pub fn neighbors(&self, node: usize) -> &[Incidence] {
        &self.adjacency[node]
    }

    /// Appends an edge unless it is already present.
    ///
    /// Returns the index of the edge and whether it was inserted.
    pub fn add_edge(&mut self, ends: EndPts, len: i64) -> (EdgeIndex, bool) {
        if let Some(index) = self.lookup.get(&ends) {
            return (*index, false);
        }
        let index = EdgeIndex::new(self.edges.len());
        self.edges.push(Edge { ends, len });
        self.lookup.insert(ends, index);
        self.adjacency[ends.u()].push((ends.v(), index));
        self.adjacency[ends.v()].push((ends.u(), index));
        (index, true)
    }

    /// Removes every edge whose entry in `delete` is `true`.
    ///
    /// Survivors keep their relative order. Returns `delstat`, mapping each
    /// old index to its new index (or `None` if deleted).
    pub fn remove_edges(&mut self, delete: &[bool]) -> Vec<Option<usize>> {
        debug_assert_eq!(delete.len(), self.edges.len());

        let mut delstat = Vec::with_capacity(self.edges.len());
        let mut kept = Vec::with_capacity(self.edges.len());
        for (edge, &del) in self.edges.iter().zip(delete) {
            if del {
                delstat.push(None);
            } else {
                delstat.push(Some(kept.len()));
                kept.push(*edge);
            }
        }
        self.edges = kept;
        self.rebuild_index();
        delstat
    }

    fn rebuild_index(&mut self) {
        self.lookup.clear();
        for list in &mut self.adjacency {
            list.clear();
        }
        for (i, edge) in self.edges.iter().enumerate() {
            let index = EdgeIndex::new(i);
            self.lookup.insert(edge.ends, index);
            self.adjacency[edge.ends.u()].push((edge.ends.v(), index));
            self.adjacency[edge.ends.v()].push((edge.ends.u(), index));
        }
    }
}
