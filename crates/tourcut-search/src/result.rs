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

use crate::stats::SolverStatistics;
use tourcut_model::tour::Tour;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverResult {
    /// A tour whose length equals the proven lower bound.
    Optimal(Tour),
    /// A tour without an optimality proof.
    Feasible(Tour),
    /// The run ended before any tour was known.
    Unknown,
}

impl SolverResult {
    #[inline]
    pub fn tour(&self) -> Option<&Tour> {
        match self {
            SolverResult::Optimal(t) | SolverResult::Feasible(t) => Some(t),
            SolverResult::Unknown => None,
        }
    }
}

impl std::fmt::Display for SolverResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverResult::Optimal(tour) => write!(f, "Optimal(length={})", tour.length()),
            SolverResult::Feasible(tour) => write!(f, "Feasible(length={})", tour.length()),
            SolverResult::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// Every node was resolved.
    OptimalityProven,
    /// A monitor or budget stopped the search.
    Aborted(String),
    /// A fatal error stopped the search; the string is its diagnostic.
    Failed(String),
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::OptimalityProven => write!(f, "Optimality Proven"),
            TerminationReason::Aborted(reason) => write!(f, "Aborted: {}", reason),
            TerminationReason::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}

/// The final report of a run: the tour, a proven lower bound and why the
/// run stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub result: SolverResult,
    pub reason: TerminationReason,
    pub lower_bound: f64,
    pub statistics: SolverStatistics,
}

impl SolverOutcome {
    /// An optimal outcome; the bound is the tour length.
    pub fn optimal(tour: Tour, statistics: SolverStatistics) -> Self {
        Self {
            lower_bound: tour.length() as f64,
            result: SolverResult::Optimal(tour),
            reason: TerminationReason::OptimalityProven,
            statistics,
        }
    }

    /// An outcome without a proof. The reported bound is capped at the tour
    /// length.
    pub fn unresolved(
        tour: Option<Tour>,
        lower_bound: f64,
        reason: TerminationReason,
        statistics: SolverStatistics,
    ) -> Self {
        let (result, lower_bound) = match tour {
            Some(t) => {
                let bound = lower_bound.min(t.length() as f64);
                (SolverResult::Feasible(t), bound)
            }
            None => (SolverResult::Unknown, lower_bound),
        };
        Self {
            result,
            reason,
            lower_bound,
            statistics,
        }
    }

    #[inline]
    pub fn is_optimal(&self) -> bool {
        matches!(self.result, SolverResult::Optimal(_))
    }

    #[inline]
    pub fn has_tour(&self) -> bool {
        self.result.tour().is_some()
    }

    #[inline]
    pub fn tour(&self) -> Option<&Tour> {
        self.result.tour()
    }

    /// Relative gap `(length - bound) / length`, `None` without a tour.
    pub fn gap(&self) -> Option<f64> {
        let tour = self.result.tour()?;
        let length = tour.length() as f64;
        if length <= 0.0 {
            return Some(0.0);
        }
        Some(((length - self.lower_bound) / length).max(0.0))
    }
}

impl std::fmt::Display for SolverOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}], lower bound {:.2}",
            self.result, self.reason, self.lower_bound
        )?;
        if let Some(gap) = self.gap() {
            write!(f, ", gap {:.4}%", gap * 100.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tour(length: i64) -> Tour {
        Tour::with_length(vec![0, 1, 2, 3, 4], length).unwrap()
    }

    #[test]
    fn test_optimal_outcome_has_zero_gap() {
        let outcome = SolverOutcome::optimal(tour(120), SolverStatistics::default());
        assert!(outcome.is_optimal());
        assert_eq!(outcome.lower_bound, 120.0);
        assert_eq!(outcome.gap(), Some(0.0));
        assert_eq!(
            outcome.to_string(),
            "Optimal(length=120) [Optimality Proven], lower bound 120.00, gap 0.0000%"
        );
    }

    #[test]
    fn test_unresolved_bound_never_exceeds_tour() {
        let outcome = SolverOutcome::unresolved(
            Some(tour(100)),
            104.5,
            TerminationReason::Aborted("node limit".into()),
            SolverStatistics::default(),
        );
        assert!(!outcome.is_optimal());
        assert!(outcome.has_tour());
        assert_eq!(outcome.lower_bound, 100.0);

        let outcome = SolverOutcome::unresolved(
            Some(tour(100)),
            90.0,
            TerminationReason::Aborted("time limit".into()),
            SolverStatistics::default(),
        );
        assert!((outcome.gap().unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_without_tour() {
        let outcome = SolverOutcome::unresolved(
            None,
            0.0,
            TerminationReason::Failed("cache consistency violated".into()),
            SolverStatistics::default(),
        );
        assert_eq!(outcome.result, SolverResult::Unknown);
        assert!(outcome.gap().is_none());
    }
}
