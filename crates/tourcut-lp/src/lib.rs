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

//! # Tourcut LP
//!
//! The linear-programming side of the engine.
//!
//! * **`engine`**: The `LpEngine` contract (solve, query and basis calls)
//!   together with rows, bases and solve limits.
//! * **`dense`**: `DenseSimplex`, a dense bounded-variable primal/dual
//!   simplex implementing the contract.
//! * **`relaxation`**: `Relaxation`, the manager owning the core edge set and
//!   the live LP: degree rows, cut rows, column and row mutations with
//!   centralized renumbering, the tour basis and pivot classification.
//! * **`support`**: The support graph of an LP solution, its components and
//!   the cut values used by separation.
//! * **`index`**: `RowIndex`, the typed LP row index.

pub mod dense;
pub mod engine;
pub mod index;
pub mod relaxation;
pub mod support;
