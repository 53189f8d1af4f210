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

use crate::monitor::search_monitor::{PruneReason, SearchCommand, SearchMonitor, SearchProgress};
use crate::stats::SolverStatistics;
use tourcut_model::tour::Tour;

/// Stops the search after `limit` processed branch nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLimitMonitor {
    limit: u64,
}

impl NodeLimitMonitor {
    #[inline]
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    #[inline]
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl SearchMonitor for NodeLimitMonitor {
    fn name(&self) -> &str {
        "NodeLimitMonitor"
    }

    fn on_enter_search(&mut self, _node_count: usize, _statistics: &SolverStatistics) {}
    fn on_exit_search(&mut self, _statistics: &SolverStatistics) {}
    fn on_step(&mut self, _progress: &SearchProgress, _statistics: &SolverStatistics) {}
    fn on_incumbent_found(&mut self, _tour: &Tour, _statistics: &SolverStatistics) {}
    fn on_node_pruned(&mut self, _depth: u64, _reason: PruneReason, _statistics: &SolverStatistics) {
    }

    fn search_command(&mut self, statistics: &SolverStatistics) -> SearchCommand {
        if statistics.nodes_processed >= self.limit {
            SearchCommand::Terminate(format!("node limit of {} reached", self.limit))
        } else {
            SearchCommand::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_limit_counts_processed_nodes() {
        let mut monitor = NodeLimitMonitor::new(2);
        let mut stats = SolverStatistics::default();
        stats.on_node_processed(0);
        assert_eq!(monitor.search_command(&stats), SearchCommand::Continue);
        stats.on_node_processed(1);
        assert_eq!(
            monitor.search_command(&stats),
            SearchCommand::Terminate("node limit of 2 reached".to_string())
        );
    }
}
