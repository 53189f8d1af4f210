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

//! The support graph of an LP solution.
//!
//! Only edges with `x_e > EPS_INTEGRAL` are kept. Separation routines read
//! component structure and set cut values from here instead of walking the
//! full core graph.

use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use tourcut_core::{
    algorithm::DisjointSet,
    tolerance::{EPS_INTEGRAL, is_fractional, is_integral},
};
use tourcut_model::{graph::CoreGraph, graph::EndPts, index::EdgeIndex};

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SupportEdge {
    pub ends: EndPts,
    pub index: EdgeIndex,
    pub value: f64,
}

#[derive(Clone, Debug)]
pub struct SupportGraph {
    node_count: usize,
    edges: Vec<SupportEdge>,
    adjacency: Vec<SmallVec<[(usize, f64); 6]>>,
    labels: Vec<usize>,
    component_count: usize,
    integral: bool,
}

impl SupportGraph {
    /// Builds the support graph of `x` over the columns of `graph`.
    pub fn new(graph: &CoreGraph, x: &[f64]) -> Self {
        debug_assert_eq!(graph.edge_count(), x.len());
        let node_count = graph.node_count();
        let mut edges = Vec::new();
        let mut adjacency = vec![SmallVec::new(); node_count];
        let mut forest = DisjointSet::new(node_count);
        let mut integral = true;

        for (j, edge) in graph.edges().iter().enumerate() {
            let value = x[j];
            if value <= EPS_INTEGRAL {
                continue;
            }
            integral &= is_integral(value, EPS_INTEGRAL);
            let (u, v) = (edge.ends.u(), edge.ends.v());
            adjacency[u].push((v, value));
            adjacency[v].push((u, value));
            forest.union(u, v);
            edges.push(SupportEdge {
                ends: edge.ends,
                index: EdgeIndex::new(j),
                value,
            });
        }

        Self {
            node_count,
            edges,
            adjacency,
            component_count: forest.set_count(),
            labels: forest.labels(),
            integral,
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    pub fn edges(&self) -> &[SupportEdge] {
        &self.edges
    }

    /// Neighbours of `node` with the connecting edge value.
    #[inline]
    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }

    #[inline]
    pub fn component_of(&self, node: usize) -> usize {
        self.labels[node]
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        self.component_count
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.component_count <= 1
    }

    /// Returns `true` if every support value is within `EPS_INTEGRAL` of an
    /// integer.
    #[inline]
    pub fn is_integral(&self) -> bool {
        self.integral
    }

    /// Node lists of the connected components, in label order.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.component_count];
        for (node, &label) in self.labels.iter().enumerate() {
            out[label].push(node);
        }
        out
    }

    /// Components of the subgraph formed by the fractional edges. Nodes
    /// without a fractional edge are omitted.
    pub fn fractional_components(&self) -> Vec<Vec<usize>> {
        let mut forest = DisjointSet::new(self.node_count);
        let mut touched = FixedBitSet::with_capacity(self.node_count);
        for e in &self.edges {
            if is_fractional(e.value, EPS_INTEGRAL) {
                forest.union(e.ends.u(), e.ends.v());
                touched.insert(e.ends.u());
                touched.insert(e.ends.v());
            }
        }
        let labels = forest.labels();
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); forest.set_count()];
        for node in touched.ones() {
            groups[labels[node]].push(node);
        }
        groups.retain(|g| !g.is_empty());
        groups
    }

    /// `x(delta(S))` for the node set `S`.
    pub fn cut_value(&self, set: &FixedBitSet) -> f64 {
        self.edges
            .iter()
            .filter(|e| set.contains(e.ends.u()) != set.contains(e.ends.v()))
            .map(|e| e.value)
            .sum()
    }

    /// `x(E(S))` for the node set `S`.
    pub fn inside_value(&self, set: &FixedBitSet) -> f64 {
        self.edges
            .iter()
            .filter(|e| set.contains(e.ends.u()) && set.contains(e.ends.v()))
            .map(|e| e.value)
            .sum()
    }

    /// The node sequence of an integral, connected 2-regular support.
    pub fn tour_from_integral(&self) -> Option<Vec<usize>> {
        if !self.integral || !self.is_connected() || self.node_count < 3 {
            return None;
        }
        if self
            .adjacency
            .iter()
            .any(|adj| adj.len() != 2 || adj.iter().any(|&(_, x)| x < 0.5))
        {
            return None;
        }

        let mut nodes = Vec::with_capacity(self.node_count);
        let mut prev = usize::MAX;
        let mut current = 0;
        loop {
            nodes.push(current);
            let (a, b) = (self.adjacency[current][0].0, self.adjacency[current][1].0);
            let next = if a != prev { a } else { b };
            prev = current;
            current = next;
            if current == 0 || nodes.len() > self.node_count {
                break;
            }
        }
        (nodes.len() == self.node_count).then_some(nodes)
    }
}
