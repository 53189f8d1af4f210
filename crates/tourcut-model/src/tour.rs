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

use crate::graph::{CoreGraph, EndPts};
use crate::instance::Instance;
use tourcut_core::error::{Error, Result};

/// A Hamiltonian cycle as a node sequence plus its inverse permutation.
///
/// `perm[nodes[i]] == i` for every position `i`. The cycle closes from the
/// last node back to the first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tour {
    nodes: Vec<usize>,
    perm: Vec<usize>,
    length: i64,
}

impl Tour {
    /// Creates a tour from a node sequence, computing its length.
    ///
    /// Fails if `nodes` is not a permutation of `0..instance.node_count()`.
    pub fn new<I>(nodes: Vec<usize>, instance: &I) -> Result<Self>
    where
        I: Instance + ?Sized,
    {
        let node_count = instance.node_count();
        if nodes.len() != node_count {
            return Err(Error::invalid_input(format!(
                "tour visits {} nodes, instance has {}",
                nodes.len(),
                node_count
            )));
        }
        let perm = Self::inverse(&nodes)?;
        let length = Self::measure(&nodes, instance);
        Ok(Self {
            nodes,
            perm,
            length,
        })
    }

    /// Creates a tour with a length the caller already knows, e.g. summed
    /// from core edge lengths.
    pub fn with_length(nodes: Vec<usize>, length: i64) -> Result<Self> {
        let perm = Self::inverse(&nodes)?;
        Ok(Self {
            nodes,
            perm,
            length,
        })
    }

    fn inverse(nodes: &[usize]) -> Result<Vec<usize>> {
        let mut perm = vec![usize::MAX; nodes.len()];
        for (pos, &node) in nodes.iter().enumerate() {
            if node >= nodes.len() || perm[node] != usize::MAX {
                return Err(Error::invalid_input(format!(
                    "tour is not a permutation: node {} at position {}",
                    node, pos
                )));
            }
            perm[node] = pos;
        }
        Ok(perm)
    }

    fn measure<I>(nodes: &[usize], instance: &I) -> i64
    where
        I: Instance + ?Sized,
    {
        let n = nodes.len();
        (0..n)
            .map(|i| instance.distance(nodes[i], nodes[(i + 1) % n]))
            .sum()
    }

    #[inline]
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    #[inline]
    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    #[inline]
    pub fn length(&self) -> i64 {
        self.length
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn position(&self, node: usize) -> usize {
        self.perm[node]
    }

    #[inline]
    pub fn node_at(&self, position: usize) -> usize {
        self.nodes[position % self.nodes.len()]
    }

    #[inline]
    pub fn next(&self, node: usize) -> usize {
        self.node_at(self.perm[node] + 1)
    }

    #[inline]
    pub fn prev(&self, node: usize) -> usize {
        let n = self.nodes.len();
        self.node_at(self.perm[node] + n - 1)
    }

    /// The `n` tour edges, starting with `(nodes[0], nodes[1])`.
    pub fn edges(&self) -> impl Iterator<Item = EndPts> + '_ {
        let n = self.nodes.len();
        (0..n).map(move |i| EndPts::new(self.nodes[i], self.nodes[(i + 1) % n]))
    }

    #[inline]
    pub fn has_edge(&self, ends: EndPts) -> bool {
        self.next(ends.u()) == ends.v() || self.prev(ends.u()) == ends.v()
    }

    /// The tour as an LP vector over the columns of `graph`.
    ///
    /// Fails if some tour edge has no column.
    pub fn edge_vector(&self, graph: &CoreGraph) -> Result<Vec<f64>> {
        let mut x = vec![0.0; graph.edge_count()];
        for ends in self.edges() {
            let index = graph.find(ends).ok_or_else(|| {
                Error::invalid_input(format!("tour edge {} is not a core edge", ends))
            })?;
            x[index.get()] = 1.0;
        }
        Ok(x)
    }

    /// The node sequence starting at node 0, oriented towards the smaller
    /// neighbour. Two tours describe the same cycle iff these agree.
    pub fn canonical(&self) -> Vec<usize> {
        let n = self.nodes.len();
        if n == 0 {
            return Vec::new();
        }
        let start = self.perm[0];
        let forward = self.node_at(start + 1) <= self.node_at(start + n - 1);
        (0..n)
            .map(|k| {
                if forward {
                    self.node_at(start + k)
                } else {
                    self.node_at(start + n - k)
                }
            })
            .collect()
    }
}

impl std::fmt::Display for Tour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tour(length: {}, nodes: {:?})", self.length, self.nodes)
    }
}
