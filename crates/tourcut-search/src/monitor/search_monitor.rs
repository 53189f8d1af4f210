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

//! Search monitoring interface
//!
//! Declares the `SearchMonitor` trait that observes a branch-and-cut run and
//! may stop it through `SearchCommand`. Every callback receives the running
//! `SolverStatistics`.
//!
//! Lifecycle
//! - enter → {step → pivot → cuts → prune | branch} → incumbent → exit
//! - `search_command` is polled between pivots and between nodes.
//!
//! Monitors are single-threaded and must stay cheap; they never block the
//! solver.

use crate::stats::SolverStatistics;
use tourcut_model::graph::EndPts;
use tourcut_model::tour::Tour;

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum SearchCommand {
    #[default]
    Continue,
    Terminate(String),
}

impl std::fmt::Display for SearchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchCommand::Continue => write!(f, "Continue"),
            SearchCommand::Terminate(reason) => write!(f, "Terminate: {}", reason),
        }
    }
}

/// Why a branch node was closed without branching.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PruneReason {
    /// The node bound is not below the incumbent.
    BoundDominated,
    /// No tour satisfies the node's clamps.
    Infeasible,
    /// The node ran out of budget and stays unresolved.
    Budget,
}

impl std::fmt::Display for PruneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneReason::BoundDominated => write!(f, "BoundDominated"),
            PruneReason::Infeasible => write!(f, "Infeasible"),
            PruneReason::Budget => write!(f, "Budget"),
        }
    }
}

/// Where the search stands when a step begins.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct SearchProgress {
    /// Depth of the node being processed.
    pub depth: u64,
    /// Nodes waiting in the tree, the current one excluded.
    pub open_nodes: usize,
    /// Smallest bound over the open nodes and the current one.
    pub lower_bound: f64,
    /// Incumbent length, `i64::MAX` if none.
    pub upper_bound: i64,
}

pub trait SearchMonitor {
    fn name(&self) -> &str;
    /// Called once before the root node.
    fn on_enter_search(&mut self, node_count: usize, statistics: &SolverStatistics);
    /// Called once after the last node.
    fn on_exit_search(&mut self, statistics: &SolverStatistics);
    /// Called before each node is processed.
    fn on_step(&mut self, progress: &SearchProgress, statistics: &SolverStatistics);
    /// Called when a strictly shorter tour was installed.
    fn on_incumbent_found(&mut self, tour: &Tour, statistics: &SolverStatistics);
    /// Called when a node is closed without branching.
    fn on_node_pruned(&mut self, depth: u64, reason: PruneReason, statistics: &SolverStatistics);
    /// Called after each simplex call of the cutting loop with the objective.
    fn on_pivot(&mut self, _objective: f64, _statistics: &SolverStatistics) {}
    /// Called after a batch of cuts was installed.
    fn on_cuts_added(&mut self, _count: usize, _statistics: &SolverStatistics) {}
    /// Called when a node branches on `edge`.
    fn on_branch(&mut self, _edge: EndPts, _depth: u64, _statistics: &SolverStatistics) {}
    fn search_command(&mut self, _statistics: &SolverStatistics) -> SearchCommand {
        SearchCommand::Continue
    }
}

impl std::fmt::Debug for dyn SearchMonitor + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SearchMonitor({})", self.name())
    }
}

impl std::fmt::Display for dyn SearchMonitor + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SearchMonitor({})", self.name())
    }
}
