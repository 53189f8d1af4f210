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

//! Progress table through the `log` facade.
//!
//! Prints a header when the search starts and one line per interval at
//! `info` level. Incumbent improvements are always logged.

use crate::monitor::search_monitor::{PruneReason, SearchMonitor, SearchProgress};
use crate::stats::SolverStatistics;
use std::time::{Duration, Instant};
use tourcut_model::tour::Tour;

#[derive(Debug, Clone)]
pub struct LogMonitor {
    start_time: Instant,
    last_log_time: Instant,
    log_interval: Duration,
    lines: u64,
}

impl LogMonitor {
    pub fn new(log_interval: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            last_log_time: Instant::now(),
            log_interval,
            lines: 0,
        }
    }

    /// Progress lines written so far.
    #[inline]
    pub fn lines(&self) -> u64 {
        self.lines
    }

    fn print_header(&self) {
        log::info!(
            "{:<9} | {:<8} | {:<6} | {:<6} | {:<14} | {:<14} | {:<8} | {:<8}",
            "Elapsed",
            "Nodes",
            "Depth",
            "Open",
            "Lower Bound",
            "Best Tour",
            "Pivots",
            "Cuts"
        );
        log::info!("{}", "-".repeat(100));
    }

    fn log_line(&mut self, progress: &SearchProgress, stats: &SolverStatistics) {
        let now = Instant::now();
        let elapsed = format!("{:.1}s", now.duration_since(self.start_time).as_secs_f32());
        let best = match progress.upper_bound {
            i64::MAX => "Inf".to_string(),
            ub => ub.to_string(),
        };
        log::info!(
            "{:<9} | {:<8} | {:<6} | {:<6} | {:<14.2} | {:<14} | {:<8} | {:<8}",
            elapsed,
            stats.nodes_processed,
            progress.depth,
            progress.open_nodes,
            progress.lower_bound,
            best,
            stats.pivots,
            stats.total_cuts_added()
        );
        self.last_log_time = now;
        self.lines += 1;
    }
}

impl Default for LogMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl std::fmt::Display for LogMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LogMonitor(log_interval: {:?})", self.log_interval)
    }
}

impl SearchMonitor for LogMonitor {
    fn name(&self) -> &str {
        "LogMonitor"
    }

    fn on_enter_search(&mut self, node_count: usize, _statistics: &SolverStatistics) {
        self.start_time = Instant::now();
        self.last_log_time = self.start_time;
        self.lines = 0;
        log::info!("branch-and-cut on {} nodes", node_count);
        self.print_header();
    }

    fn on_exit_search(&mut self, statistics: &SolverStatistics) {
        log::info!("{}", "-".repeat(100));
        log::info!(
            "search finished after {} nodes in {:.2?}",
            statistics.nodes_processed,
            statistics.time_total
        );
    }

    fn on_step(&mut self, progress: &SearchProgress, statistics: &SolverStatistics) {
        // The root line is always printed.
        if statistics.nodes_processed == 0 || self.last_log_time.elapsed() >= self.log_interval {
            self.log_line(progress, statistics);
        }
    }

    fn on_incumbent_found(&mut self, tour: &Tour, statistics: &SolverStatistics) {
        log::info!(
            "new incumbent of length {} after {} nodes",
            tour.length(),
            statistics.nodes_processed
        );
    }

    fn on_node_pruned(&mut self, depth: u64, reason: PruneReason, _statistics: &SolverStatistics) {
        log::debug!("node at depth {} pruned: {}", depth, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_line_is_always_written() {
        let mut monitor = LogMonitor::new(Duration::from_secs(3600));
        let mut stats = SolverStatistics::default();
        monitor.on_enter_search(10, &stats);
        monitor.on_step(&SearchProgress::default(), &stats);
        assert_eq!(monitor.lines(), 1);
        stats.on_node_processed(0);
        monitor.on_step(&SearchProgress::default(), &stats);
        assert_eq!(monitor.lines(), 1);
    }

    #[test]
    fn test_zero_interval_logs_every_step() {
        let mut monitor = LogMonitor::new(Duration::ZERO);
        let mut stats = SolverStatistics::default();
        monitor.on_enter_search(10, &stats);
        for depth in 0..3 {
            stats.on_node_processed(depth);
            monitor.on_step(&SearchProgress::default(), &stats);
        }
        assert_eq!(monitor.lines(), 3);
    }
}
