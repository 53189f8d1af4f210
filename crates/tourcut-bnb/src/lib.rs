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

//! Tourcut-BnB: branch-and-cut search for the symmetric TSP
//!
//! Drives an LP relaxation over a core edge set to optimality. Cutting
//! planes tighten the relaxation, pricing grows the core when an edge
//! outside it could lower the bound, and strong branching splits the
//! search on a fractional edge when neither helps.
//!
//! Core flow
//! - Build a `tourcut_lp::relaxation::Relaxation` over a candidate edge set
//!   and instate a reference tour.
//! - Wrap it in `bnb::BranchAndCut` with a `bnb::BnbConfig` and a cut pool.
//! - Call `solve` with an instance, a shared incumbent and a monitor.
//!
//! Guarantees
//! - Node bounds never decrease from parent to child and never exceed the
//!   length of any tour that respects the node's clamps.
//! - A node is pruned only when its bound is within `PRUNE_GAP` of the
//!   incumbent; lengths are integral, so nothing better is lost.
//! - Nodes that run out of budget are reported, never silently dropped.
//!
//! Module map
//! - `bnb`: the driver and its search session.
//! - `cutting`: the cutting loop and its pivot statistics.
//! - `pricer`: reduced-cost pricing and feasibility recovery.
//! - `branching`: strong-branching candidate selection.
//! - `tree`: branch nodes and the open stack.
//! - `branch_tour`: clamp-respecting tours and their compressed form.
//! - `workspace`: the relaxation bundled with its cuts, pool and teeth.
//! - `config`: tunables for cutting, pricing and branching.

pub mod bnb;
pub mod branch_tour;
pub mod branching;
pub mod config;
pub mod cutting;
pub mod pricer;
pub mod tree;
pub mod workspace;
