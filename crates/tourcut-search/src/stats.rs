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

use std::time::Duration;

/// Labels of the per-kind cut counters, in counter order.
pub const CUT_KIND_LABELS: [&str; 4] = ["subtour", "blossom", "comb", "domino-parity"];

/// Counters collected during one branch-and-cut run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolverStatistics {
    /// Simplex calls issued by the cutting loop and pricing.
    pub pivots: u64,
    /// Separation rounds that ran at least one routine.
    pub cut_rounds: u64,
    /// Cuts installed, indexed like `CUT_KIND_LABELS`.
    pub cuts_added: [u64; 4],
    /// Cuts moved from the LP into the pool by aging.
    pub cuts_pruned: u64,
    pub edges_added: u64,
    pub edges_removed: u64,
    /// Nodes processed, the root included.
    pub nodes_processed: u64,
    /// Children created by branching.
    pub branch_nodes: u64,
    pub max_depth: u64,
    pub prunings_bound: u64,
    pub prunings_infeasible: u64,
    pub prunings_budget: u64,
    pub incumbent_updates: u64,
    /// LP failures that were retried from the tour basis.
    pub lp_recoveries: u64,
    pub basis_clones: u64,
    pub basis_clone_bytes: u64,
    /// Bound of the root node after cutting and pricing.
    pub root_lower_bound: f64,
    pub time_total: Duration,
}

impl SolverStatistics {
    #[inline]
    pub fn on_pivot(&mut self) {
        self.pivots = self.pivots.saturating_add(1);
    }

    #[inline]
    pub fn on_cut_round(&mut self) {
        self.cut_rounds = self.cut_rounds.saturating_add(1);
    }

    /// Records `count` installed cuts of the kind at `kind_index`.
    #[inline]
    pub fn on_cuts_added(&mut self, kind_index: usize, count: u64) {
        if let Some(slot) = self.cuts_added.get_mut(kind_index) {
            *slot = slot.saturating_add(count);
        }
    }

    #[inline]
    pub fn on_cuts_pruned(&mut self, count: u64) {
        self.cuts_pruned = self.cuts_pruned.saturating_add(count);
    }

    #[inline]
    pub fn on_edges_added(&mut self, count: u64) {
        self.edges_added = self.edges_added.saturating_add(count);
    }

    #[inline]
    pub fn on_edges_removed(&mut self, count: u64) {
        self.edges_removed = self.edges_removed.saturating_add(count);
    }

    #[inline]
    pub fn on_node_processed(&mut self, depth: u64) {
        self.nodes_processed = self.nodes_processed.saturating_add(1);
        self.max_depth = self.max_depth.max(depth);
    }

    #[inline]
    pub fn on_branch(&mut self, children: u64) {
        self.branch_nodes = self.branch_nodes.saturating_add(children);
    }

    #[inline]
    pub fn on_pruning_bound(&mut self) {
        self.prunings_bound = self.prunings_bound.saturating_add(1);
    }

    #[inline]
    pub fn on_pruning_infeasible(&mut self) {
        self.prunings_infeasible = self.prunings_infeasible.saturating_add(1);
    }

    #[inline]
    pub fn on_pruning_budget(&mut self) {
        self.prunings_budget = self.prunings_budget.saturating_add(1);
    }

    #[inline]
    pub fn on_incumbent_update(&mut self) {
        self.incumbent_updates = self.incumbent_updates.saturating_add(1);
    }

    #[inline]
    pub fn on_lp_recovery(&mut self) {
        self.lp_recoveries = self.lp_recoveries.saturating_add(1);
    }

    /// Records one saved basis of `bytes` heap bytes.
    #[inline]
    pub fn on_basis_clone(&mut self, bytes: usize) {
        self.basis_clones = self.basis_clones.saturating_add(1);
        self.basis_clone_bytes = self.basis_clone_bytes.saturating_add(bytes as u64);
    }

    #[inline]
    pub fn set_root_lower_bound(&mut self, bound: f64) {
        self.root_lower_bound = bound;
    }

    #[inline]
    pub fn set_total_time(&mut self, duration: Duration) {
        self.time_total = duration;
    }

    #[inline]
    pub fn total_cuts_added(&self) -> u64 {
        self.cuts_added.iter().sum()
    }
}

impl std::fmt::Display for SolverStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Branch-and-cut statistics:")?;
        writeln!(f, "  Pivots:                {}", self.pivots)?;
        writeln!(f, "  Cut rounds:            {}", self.cut_rounds)?;
        for (label, count) in CUT_KIND_LABELS.iter().zip(self.cuts_added) {
            writeln!(f, "  Cuts added ({:<13}): {}", label, count)?;
        }
        writeln!(f, "  Cuts pruned:           {}", self.cuts_pruned)?;
        writeln!(f, "  Edges added:           {}", self.edges_added)?;
        writeln!(f, "  Edges removed:         {}", self.edges_removed)?;
        writeln!(f, "  Nodes processed:       {}", self.nodes_processed)?;
        writeln!(f, "  Branch nodes:          {}", self.branch_nodes)?;
        writeln!(f, "  Max depth:             {}", self.max_depth)?;
        writeln!(f, "  Prunings (bound):      {}", self.prunings_bound)?;
        writeln!(f, "  Prunings (infeasible): {}", self.prunings_infeasible)?;
        writeln!(f, "  Prunings (budget):     {}", self.prunings_budget)?;
        writeln!(f, "  Incumbent updates:     {}", self.incumbent_updates)?;
        writeln!(f, "  LP recoveries:         {}", self.lp_recoveries)?;
        writeln!(
            f,
            "  Basis clones:          {} ({} bytes)",
            self.basis_clones, self.basis_clone_bytes
        )?;
        writeln!(f, "  Root lower bound:      {:.2}", self.root_lower_bound)?;
        writeln!(f, "  Total time:            {:.2?}", self.time_total)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut stats = SolverStatistics::default();
        stats.on_pivot();
        stats.on_pivot();
        stats.on_cuts_added(0, 3);
        stats.on_cuts_added(3, 1);
        stats.on_cuts_added(7, 5);
        stats.on_node_processed(4);
        stats.on_node_processed(2);
        stats.on_basis_clone(128);
        stats.on_basis_clone(64);
        assert_eq!(stats.pivots, 2);
        assert_eq!(stats.cuts_added, [3, 0, 0, 1]);
        assert_eq!(stats.total_cuts_added(), 4);
        assert_eq!(stats.nodes_processed, 2);
        assert_eq!(stats.max_depth, 4);
        assert_eq!(stats.basis_clones, 2);
        assert_eq!(stats.basis_clone_bytes, 192);
    }

    #[test]
    fn test_display_lists_every_cut_kind() {
        let mut stats = SolverStatistics::default();
        stats.on_cuts_added(1, 2);
        let text = stats.to_string();
        for label in CUT_KIND_LABELS {
            assert!(text.contains(label));
        }
        assert!(text.contains("Cuts added (blossom      ): 2"));
    }
}
