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

//! # Tourcut Core
//!
//! Foundational pieces shared by every crate of the tourcut branch-and-cut
//! TSP engine.
//!
//! ## Modules
//!
//! - `algorithm`: Small graph algorithms used across crates, currently a
//!   disjoint-set forest for component labelling.
//! - `error`: The single error type (`Error`) and `Result` alias. Errors are
//!   classified into recoverable LP failures, skippable separation failures,
//!   fatal cache consistency violations and budget exhaustion.
//! - `math`: Closed tour-position segments `[start, end]` with overlap,
//!   adjacency and merge queries, the building block of clique encodings.
//! - `tolerance`: Floating-point tolerances used when reading LP solutions
//!   (zero tests, integrality tests, cut violation thresholds).
//! - `utils`: Phantom-tagged, strongly typed indices (`TypedIndex<T>`) so that
//!   node, edge, row, clique and tree indices cannot be mixed up.

pub mod algorithm;
pub mod error;
pub mod math;
pub mod tolerance;
pub mod utils;
