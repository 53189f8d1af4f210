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

//! # Tourcut Cuts
//!
//! Cutting planes for the TSP relaxation.
//!
//! * **`clique`**: The clique bank, content-addressed node subsets keyed
//!   against a saved tour, shared by reference count.
//! * **`tooth`**: The tooth bank, light teeth relative to the current
//!   reference tour, invalidated by epoch.
//! * **`hypergraph`**: Subtour, blossom, comb and domino-parity cuts as node
//!   subsets, their coefficients and persisted records.
//! * **`store`**: The cut store, the cuts that own LP rows.
//! * **`pool`**: Pruned cuts kept for re-pricing, with JSON persistence.
//! * **`sep`**: The separation routines and the engine that runs them.

pub mod clique;
pub mod hypergraph;
pub mod index;
pub mod pool;
pub mod sep;
pub mod store;
pub mod tooth;
