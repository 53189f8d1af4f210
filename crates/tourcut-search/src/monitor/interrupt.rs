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
use std::sync::atomic::{AtomicBool, Ordering};
use tourcut_model::tour::Tour;

/// Stops the search once the shared flag is raised, e.g. by a signal
/// handler or another thread.
#[derive(Debug, Clone)]
pub struct InterruptMonitor<'a> {
    stop_flag: &'a AtomicBool,
}

impl<'a> InterruptMonitor<'a> {
    #[inline(always)]
    pub fn new(stop_flag: &'a AtomicBool) -> Self {
        Self { stop_flag }
    }
}

impl SearchMonitor for InterruptMonitor<'_> {
    fn name(&self) -> &str {
        "InterruptMonitor"
    }

    fn on_enter_search(&mut self, _node_count: usize, _statistics: &SolverStatistics) {}
    fn on_exit_search(&mut self, _statistics: &SolverStatistics) {}
    fn on_step(&mut self, _progress: &SearchProgress, _statistics: &SolverStatistics) {}
    fn on_incumbent_found(&mut self, _tour: &Tour, _statistics: &SolverStatistics) {}
    fn on_node_pruned(&mut self, _depth: u64, _reason: PruneReason, _statistics: &SolverStatistics) {
    }

    fn search_command(&mut self, _statistics: &SolverStatistics) -> SearchCommand {
        if self.stop_flag.load(Ordering::Relaxed) {
            SearchCommand::Terminate("Interrupt signal received".to_string())
        } else {
            SearchCommand::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_follows_flag() {
        let flag = AtomicBool::new(false);
        let mut monitor = InterruptMonitor::new(&flag);
        let stats = SolverStatistics::default();
        assert_eq!(monitor.search_command(&stats), SearchCommand::Continue);
        flag.store(true, Ordering::Relaxed);
        match monitor.search_command(&stats) {
            SearchCommand::Terminate(reason) => assert_eq!(reason, "Interrupt signal received"),
            other => panic!("expected Terminate, got {:?}", other),
        }
    }
}
