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

//! # Tourcut Model
//!
//! The problem side of the branch-and-cut engine: what is being solved and
//! which edges the LP currently knows about.
//!
//! * **`instance`**: The `Instance` trait (node count, integral distances,
//!   nearest-neighbour queries) with a dense matrix and a rounded Euclidean
//!   implementation.
//! * **`graph`**: The core edge set (`CoreGraph`): normalized endpoint pairs,
//!   edge lookup and adjacency, with deletion that reports the renumbering.
//! * **`tour`**: Hamiltonian cycles with their inverse permutation and length.
//! * **`heuristics`**: Nearest-neighbour construction and 2-opt improvement
//!   for the starting tour and the k-nearest candidate edge set.
//! * **`index`**: `EdgeIndex`, the typed LP column / core edge index.

pub mod graph;
pub mod heuristics;
pub mod index;
pub mod instance;
pub mod tour;
