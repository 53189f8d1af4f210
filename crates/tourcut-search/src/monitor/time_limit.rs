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

//! # Time limit monitor
//!
//! Enforces a wall-clock budget. The clock is read only when
//! `steps & clock_check_mask == 0`; steps are counted per node and per
//! pivot, both of which are expensive, so the default mask is small.

use crate::monitor::search_monitor::{PruneReason, SearchCommand, SearchMonitor, SearchProgress};
use crate::stats::SolverStatistics;
use std::time::{Duration, Instant};
use tourcut_model::tour::Tour;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLimitMonitor {
    clock_check_mask: u64,
    steps: u64,
    time_limit: Duration,
    start_time: Instant,
    expired: bool,
}

impl TimeLimitMonitor {
    /// Check the clock every 8 steps.
    const DEFAULT_CLOCK_CHECK_MASK: u64 = 0x7;

    #[inline]
    pub fn new(time_limit: Duration) -> Self {
        Self::with_clock_check_mask(time_limit, Self::DEFAULT_CLOCK_CHECK_MASK)
    }

    #[inline]
    pub fn with_clock_check_mask(time_limit: Duration, clock_check_mask: u64) -> Self {
        Self {
            clock_check_mask,
            steps: 0,
            time_limit,
            start_time: Instant::now(),
            expired: false,
        }
    }

    #[inline]
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    #[inline(always)]
    fn tick(&mut self) {
        self.steps = self.steps.wrapping_add(1);
    }
}

impl SearchMonitor for TimeLimitMonitor {
    fn name(&self) -> &str {
        "TimeLimitMonitor"
    }

    fn on_enter_search(&mut self, _node_count: usize, _statistics: &SolverStatistics) {
        self.start_time = Instant::now();
        self.steps = 0;
        self.expired = false;
    }

    fn on_exit_search(&mut self, _statistics: &SolverStatistics) {}

    #[inline(always)]
    fn on_step(&mut self, _progress: &SearchProgress, _statistics: &SolverStatistics) {
        self.tick();
    }

    fn on_incumbent_found(&mut self, _tour: &Tour, _statistics: &SolverStatistics) {}

    fn on_node_pruned(&mut self, _depth: u64, _reason: PruneReason, _statistics: &SolverStatistics) {
    }

    #[inline(always)]
    fn on_pivot(&mut self, _objective: f64, _statistics: &SolverStatistics) {
        self.tick();
    }

    fn search_command(&mut self, _statistics: &SolverStatistics) -> SearchCommand {
        if !self.expired
            && (self.steps & self.clock_check_mask) == 0
            && self.start_time.elapsed() >= self.time_limit
        {
            self.expired = true;
        }
        if self.expired {
            SearchCommand::Terminate("time limit reached".to_string())
        } else {
            SearchCommand::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_terminates_on_check() {
        let mut monitor = TimeLimitMonitor::with_clock_check_mask(Duration::ZERO, 0);
        let stats = SolverStatistics::default();
        monitor.on_enter_search(4, &stats);
        assert_eq!(
            monitor.search_command(&stats),
            SearchCommand::Terminate("time limit reached".to_string())
        );
    }

    #[test]
    fn test_clock_is_only_read_on_mask_boundaries() {
        let mut monitor = TimeLimitMonitor::with_clock_check_mask(Duration::ZERO, 0x3);
        let stats = SolverStatistics::default();
        monitor.on_enter_search(4, &stats);
        monitor.on_pivot(10.0, &stats);
        assert_eq!(monitor.search_command(&stats), SearchCommand::Continue);
        for _ in 0..3 {
            monitor.on_pivot(10.0, &stats);
        }
        assert!(matches!(
            monitor.search_command(&stats),
            SearchCommand::Terminate(_)
        ));
        // Once expired it stays expired.
        monitor.on_pivot(10.0, &stats);
        assert!(matches!(
            monitor.search_command(&stats),
            SearchCommand::Terminate(_)
        ));
    }

    #[test]
    fn test_generous_limit_continues() {
        let mut monitor = TimeLimitMonitor::with_clock_check_mask(Duration::from_secs(3600), 0);
        let stats = SolverStatistics::default();
        monitor.on_enter_search(4, &stats);
        monitor.on_step(&SearchProgress::default(), &stats);
        assert_eq!(monitor.search_command(&stats), SearchCommand::Continue);
    }
}
