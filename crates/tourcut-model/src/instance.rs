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

//! Symmetric TSP instances.
//!
//! The solver only needs three things from an instance: the number of nodes,
//! an integral symmetric distance, and a bounded neighbour list per node for
//! candidate edges and partial pricing.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tourcut_core::error::{Error, Result};

/// A symmetric TSP instance with integral edge lengths.
pub trait Instance {
    /// Number of nodes.
    fn node_count(&self) -> usize;

    /// Length of the edge `{u, v}`. Must be symmetric.
    fn distance(&self, u: usize, v: usize) -> i64;

    /// The `k` nodes closest to `node`, nearest first, ties by node index.
    fn nearest(&self, node: usize, k: usize) -> Vec<usize> {
        let mut others: Vec<usize> = (0..self.node_count()).filter(|&v| v != node).collect();
        others.sort_by_key(|&v| (self.distance(node, v), v));
        others.truncate(k);
        others
    }
}

/// A dense row-major distance matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatrixInstance {
    node_count: usize,
    distances: Vec<i64>,
}

impl MatrixInstance {
    /// Creates an instance from a row-major `n * n` matrix.
    ///
    /// The matrix must be symmetric with a zero diagonal and non-negative
    /// entries.
    pub fn new(node_count: usize, distances: Vec<i64>) -> Result<Self> {
        if distances.len() != node_count * node_count {
            return Err(Error::invalid_input(format!(
                "distance matrix has {} entries, expected {}",
                distances.len(),
                node_count * node_count
            )));
        }
        for u in 0..node_count {
            if distances[u * node_count + u] != 0 {
                return Err(Error::invalid_input(format!(
                    "non-zero diagonal entry at node {}",
                    u
                )));
            }
            for v in (u + 1)..node_count {
                let d = distances[u * node_count + v];
                if d != distances[v * node_count + u] {
                    return Err(Error::invalid_input(format!(
                        "asymmetric distance between {} and {}",
                        u, v
                    )));
                }
                if d < 0 {
                    return Err(Error::invalid_input(format!(
                        "negative distance between {} and {}",
                        u, v
                    )));
                }
            }
        }
        Ok(Self {
            node_count,
            distances,
        })
    }

    /// Builds the matrix from a distance function over `u < v`.
    pub fn from_fn<F>(node_count: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> i64,
    {
        let mut distances = vec![0; node_count * node_count];
        for u in 0..node_count {
            for v in (u + 1)..node_count {
                let d = f(u, v);
                distances[u * node_count + v] = d;
                distances[v * node_count + u] = d;
            }
        }
        Self::new(node_count, distances)
    }
}

impl Instance for MatrixInstance {
    #[inline]
    fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    fn distance(&self, u: usize, v: usize) -> i64 {
        self.distances[u * self.node_count + v]
    }
}

/// Points in the plane with distances rounded to the nearest integer.
#[derive(Clone, Debug, PartialEq)]
pub struct EuclideanInstance {
    points: Vec<(f64, f64)>,
}

impl EuclideanInstance {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Uniform random points in `[0, side)^2`, reproducible from `seed`.
    pub fn random(node_count: usize, side: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points = (0..node_count)
            .map(|_| (rng.random_range(0.0..side), rng.random_range(0.0..side)))
            .collect();
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

impl Instance for EuclideanInstance {
    #[inline]
    fn node_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    fn distance(&self, u: usize, v: usize) -> i64 {
        let (ux, uy) = self.points[u];
        let (vx, vy) = self.points[v];
        let dx = ux - vx;
        let dy = uy - vy;
        ((dx * dx + dy * dy).sqrt() + 0.5) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_instance_accessors() {
        let inst = MatrixInstance::new(3, vec![0, 1, 2, 1, 0, 3, 2, 3, 0]).unwrap();
        assert_eq!(inst.node_count(), 3);
        assert_eq!(inst.distance(0, 2), 2);
        assert_eq!(inst.distance(2, 1), 3);
    }

    #[test]
    fn test_matrix_instance_rejects_bad_input() {
        assert!(matches!(
            MatrixInstance::new(2, vec![0, 1, 1]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            MatrixInstance::new(2, vec![0, 1, 2, 0]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            MatrixInstance::new(2, vec![1, 1, 1, 0]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            MatrixInstance::new(2, vec![0, -1, -1, 0]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_from_fn_is_symmetric() {
        let inst = MatrixInstance::from_fn(4, |u, v| (u + 2 * v) as i64).unwrap();
        for u in 0..4 {
            for v in 0..4 {
                assert_eq!(inst.distance(u, v), inst.distance(v, u));
            }
        }
        assert_eq!(inst.distance(1, 3), 7);
    }

    #[test]
    fn test_nearest_orders_by_distance_then_index() {
        let inst = MatrixInstance::from_fn(5, |u, v| if u == 0 { 10 - v as i64 } else { 1 })
            .unwrap();
        assert_eq!(inst.nearest(0, 2), vec![4, 3]);
        // Node 1 sees distance 9 to node 0 and 1 to everyone else.
        assert_eq!(inst.nearest(1, 3), vec![2, 3, 4]);
    }

    #[test]
    fn test_euclidean_rounding() {
        let inst = EuclideanInstance::new(vec![(0.0, 0.0), (3.0, 4.0), (1.0, 1.0)]);
        assert_eq!(inst.distance(0, 1), 5);
        assert_eq!(inst.distance(0, 2), 1);
        assert_eq!(inst.distance(1, 0), 5);
    }

    #[test]
    fn test_random_instance_is_reproducible() {
        let a = EuclideanInstance::random(20, 100.0, 7);
        let b = EuclideanInstance::random(20, 100.0, 7);
        let c = EuclideanInstance::random(20, 100.0, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.points().iter().all(|&(x, y)| (0.0..100.0).contains(&x) && (0.0..100.0).contains(&y)));
    }
}
