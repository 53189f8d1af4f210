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

//! Fan-out monitor.
//!
//! `CompositeMonitor` forwards every event to its children in insertion
//! order. `search_command` short-circuits on the first non-`Continue`
//! answer, so stricter stop conditions belong first.

use crate::monitor::search_monitor::{PruneReason, SearchCommand, SearchMonitor, SearchProgress};
use crate::stats::SolverStatistics;
use tourcut_model::graph::EndPts;
use tourcut_model::tour::Tour;

pub struct CompositeMonitor<'a> {
    monitors: Vec<Box<dyn SearchMonitor + 'a>>,
}

impl Default for CompositeMonitor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeMonitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.monitors.iter()).finish()
    }
}

impl<'a> CompositeMonitor<'a> {
    #[inline(always)]
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            monitors: Vec::with_capacity(capacity),
        }
    }

    #[inline(always)]
    pub fn add_monitor<M>(&mut self, monitor: M)
    where
        M: SearchMonitor + 'a,
    {
        self.monitors.push(Box::new(monitor));
    }

    #[inline(always)]
    pub fn add_monitor_boxed(&mut self, monitor: Box<dyn SearchMonitor + 'a>) {
        self.monitors.push(monitor);
    }

    #[inline(always)]
    pub fn monitors(&self) -> &[Box<dyn SearchMonitor + 'a>] {
        &self.monitors
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl<'a> FromIterator<Box<dyn SearchMonitor + 'a>> for CompositeMonitor<'a> {
    fn from_iter<I: IntoIterator<Item = Box<dyn SearchMonitor + 'a>>>(iter: I) -> Self {
        Self {
            monitors: iter.into_iter().collect(),
        }
    }
}

impl SearchMonitor for CompositeMonitor<'_> {
    fn name(&self) -> &str {
        "CompositeMonitor"
    }

    fn on_enter_search(&mut self, node_count: usize, statistics: &SolverStatistics) {
        for m in &mut self.monitors {
            m.on_enter_search(node_count, statistics);
        }
    }

    fn on_exit_search(&mut self, statistics: &SolverStatistics) {
        for m in &mut self.monitors {
            m.on_exit_search(statistics);
        }
    }

    fn on_step(&mut self, progress: &SearchProgress, statistics: &SolverStatistics) {
        for m in &mut self.monitors {
            m.on_step(progress, statistics);
        }
    }

    fn on_incumbent_found(&mut self, tour: &Tour, statistics: &SolverStatistics) {
        for m in &mut self.monitors {
            m.on_incumbent_found(tour, statistics);
        }
    }

    fn on_node_pruned(&mut self, depth: u64, reason: PruneReason, statistics: &SolverStatistics) {
        for m in &mut self.monitors {
            m.on_node_pruned(depth, reason, statistics);
        }
    }

    fn on_pivot(&mut self, objective: f64, statistics: &SolverStatistics) {
        for m in &mut self.monitors {
            m.on_pivot(objective, statistics);
        }
    }

    fn on_cuts_added(&mut self, count: usize, statistics: &SolverStatistics) {
        for m in &mut self.monitors {
            m.on_cuts_added(count, statistics);
        }
    }

    fn on_branch(&mut self, edge: EndPts, depth: u64, statistics: &SolverStatistics) {
        for m in &mut self.monitors {
            m.on_branch(edge, depth, statistics);
        }
    }

    fn search_command(&mut self, statistics: &SolverStatistics) -> SearchCommand {
        for m in &mut self.monitors {
            let command = m.search_command(statistics);
            if command != SearchCommand::Continue {
                return command;
            }
        }
        SearchCommand::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::interrupt::InterruptMonitor;
    use crate::monitor::no_op::NoOperationMonitor;
    use crate::monitor::node_limit::NodeLimitMonitor;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Counter {
        events: usize,
    }

    impl SearchMonitor for &mut Counter {
        fn name(&self) -> &str {
            "Counter"
        }
        fn on_enter_search(&mut self, _: usize, _: &SolverStatistics) {
            self.events += 1;
        }
        fn on_exit_search(&mut self, _: &SolverStatistics) {
            self.events += 1;
        }
        fn on_step(&mut self, _: &SearchProgress, _: &SolverStatistics) {
            self.events += 1;
        }
        fn on_incumbent_found(&mut self, _: &Tour, _: &SolverStatistics) {
            self.events += 1;
        }
        fn on_node_pruned(&mut self, _: u64, _: PruneReason, _: &SolverStatistics) {
            self.events += 1;
        }
        fn on_cuts_added(&mut self, _: usize, _: &SolverStatistics) {
            self.events += 1;
        }
    }

    #[test]
    fn test_events_fan_out_to_all_children() {
        let mut a = Counter::default();
        let mut b = Counter::default();
        {
            let mut composite = CompositeMonitor::with_capacity(2);
            composite.add_monitor(&mut a);
            composite.add_monitor(&mut b);
            let stats = SolverStatistics::default();
            composite.on_enter_search(5, &stats);
            composite.on_cuts_added(3, &stats);
            composite.on_pivot(1.0, &stats);
            composite.on_exit_search(&stats);
            assert_eq!(composite.len(), 2);
        }
        assert_eq!(a.events, 3);
        assert_eq!(b.events, 3);
    }

    #[test]
    fn test_first_terminate_wins() {
        let flag = AtomicBool::new(true);
        let mut composite = CompositeMonitor::new();
        composite.add_monitor(NoOperationMonitor::new());
        composite.add_monitor(InterruptMonitor::new(&flag));
        composite.add_monitor(NodeLimitMonitor::new(0));
        let stats = SolverStatistics::default();
        assert_eq!(
            composite.search_command(&stats),
            SearchCommand::Terminate("Interrupt signal received".to_string())
        );
        flag.store(false, Ordering::Relaxed);
        assert_eq!(
            composite.search_command(&stats),
            SearchCommand::Terminate("node limit of 0 reached".to_string())
        );
    }
}
