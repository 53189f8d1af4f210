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

//! Branching edge selection by strong branching.
//!
//! Candidates are the fractional core edges closest to one half, ties by
//! lower edge index. Each candidate is evaluated on a private clone of the
//! relaxation: clamp down, re-optimize with a bounded dual simplex, then
//! clamp up. With more than one thread the clones are spread over scoped
//! worker threads; nothing shared is touched until every result is in.

use crate::config::BranchConfig;
use crate::tree::BranchDirection;
use tourcut_core::error::{Error, Result};
use tourcut_core::tolerance::{EPS_INTEGRAL, is_fractional};
use tourcut_lp::engine::{LpEngine, SolveStatus};
use tourcut_lp::relaxation::Relaxation;
use tourcut_model::graph::EndPts;
use tourcut_model::index::EdgeIndex;
use tourcut_search::stats::SolverStatistics;

/// Return code reported when a strong-branching worker panicked.
const CODE_WORKER_PANIC: i32 = 20;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BranchCandidate {
    pub index: EdgeIndex,
    pub ends: EndPts,
    pub x: f64,
}

/// Objective of both children after a bounded re-optimization.
/// `f64::INFINITY` marks a child whose LP is infeasible.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct StrongBranch {
    pub candidate: BranchCandidate,
    pub down: f64,
    pub up: f64,
    pub score: f64,
}

impl StrongBranch {
    #[inline]
    pub fn bound(&self, direction: BranchDirection) -> f64 {
        match direction {
            BranchDirection::Down => self.down,
            BranchDirection::Up => self.up,
        }
    }
}

/// `(10 * min + max) / 11` of the two degradations.
#[inline]
pub fn degradation_score(d_down: f64, d_up: f64) -> f64 {
    let (lo, hi) = if d_down <= d_up {
        (d_down, d_up)
    } else {
        (d_up, d_down)
    };
    (10.0 * lo + hi) / 11.0
}

#[inline]
fn distance_to_half(x: f64) -> f64 {
    (x - 0.5).abs()
}

/// The fractional edges of `x` closest to one half, at most `k`.
pub fn candidates<E: LpEngine>(lp: &Relaxation<E>, k: usize) -> Vec<BranchCandidate> {
    let x = lp.x();
    let mut found: Vec<BranchCandidate> = x
        .iter()
        .enumerate()
        .filter(|&(_, &v)| is_fractional(v, EPS_INTEGRAL))
        .map(|(j, &v)| {
            let index = EdgeIndex::new(j);
            BranchCandidate {
                index,
                ends: lp.graph().edge(index).ends,
                x: v,
            }
        })
        .collect();
    found.sort_by(|a, b| {
        distance_to_half(a.x)
            .total_cmp(&distance_to_half(b.x))
            .then(a.index.cmp(&b.index))
    });
    found.truncate(k);
    found
}

fn evaluate<E: LpEngine>(
    mut lp: Relaxation<E>,
    candidate: BranchCandidate,
    iteration_limit: u64,
) -> Result<(f64, f64)> {
    lp.set_iteration_limit(Some(iteration_limit));
    let basis = lp.save_basis();
    let bounds = lp.col_bounds(candidate.index);
    let mut values = [0.0; 2];
    let directions = [BranchDirection::Down, BranchDirection::Up];
    for (slot, direction) in directions.into_iter().enumerate() {
        lp.restore_basis(&basis)?;
        let (lb, ub) = direction.bounds();
        lp.set_col_bounds(candidate.index, lb, ub)?;
        values[slot] = match lp.dual_pivot()? {
            SolveStatus::Infeasible => f64::INFINITY,
            SolveStatus::Unbounded => {
                return Err(Error::lp_solve("strong_branch", 11));
            }
            _ => lp.objective_value(),
        };
        lp.set_col_bounds(candidate.index, bounds.0, bounds.1)?;
    }
    Ok((values[0], values[1]))
}

#[derive(Clone, Debug, Default)]
pub struct Brancher {
    config: BranchConfig,
}

impl Brancher {
    pub fn new(config: BranchConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &BranchConfig {
        &self.config
    }

    /// Strong-branches the top candidates of the optimal LP in `lp` and
    /// returns the best one, or `None` if `x` is integral.
    pub fn select<E: LpEngine>(
        &self,
        lp: &Relaxation<E>,
        stats: &mut SolverStatistics,
    ) -> Result<Option<StrongBranch>> {
        let cands = candidates(lp, self.config.candidates);
        if cands.is_empty() {
            return Ok(None);
        }
        let base = lp.objective_value();
        let limit = self.config.strong_iteration_limit;

        let bytes = lp.save_basis().allocated_bytes();
        let jobs: Vec<(Relaxation<E>, BranchCandidate)> = cands
            .iter()
            .map(|&c| {
                stats.on_basis_clone(bytes);
                (lp.clone(), c)
            })
            .collect();
        let results = self.run_jobs(jobs, limit)?;

        let mut best: Option<StrongBranch> = None;
        for (candidate, result) in cands.into_iter().zip(results) {
            let (down, up) = match result {
                Ok(values) => values,
                Err(e) if e.is_node_recoverable() => {
                    log::warn!("strong branching on {} failed: {}", candidate.ends, e);
                    (base, base)
                }
                Err(e) => return Err(e),
            };
            let score = degradation_score((down - base).max(0.0), (up - base).max(0.0));
            log::trace!(
                "strong branch {} x={:.3}: down {:.3}, up {:.3}, score {:.3}",
                candidate.ends,
                candidate.x,
                down,
                up,
                score
            );
            let better = match &best {
                None => true,
                Some(b) => {
                    score > b.score || (score == b.score && candidate.index < b.candidate.index)
                }
            };
            if better {
                best = Some(StrongBranch {
                    candidate,
                    down,
                    up,
                    score,
                });
            }
        }
        Ok(best)
    }

    fn run_jobs<E: LpEngine>(
        &self,
        jobs: Vec<(Relaxation<E>, BranchCandidate)>,
        limit: u64,
    ) -> Result<Vec<Result<(f64, f64)>>> {
        let threads = self.config.threads.max(1);
        if threads == 1 || jobs.len() <= 1 {
            return Ok(jobs
                .into_iter()
                .map(|(lp, c)| evaluate(lp, c, limit))
                .collect());
        }

        let chunk = jobs.len().div_ceil(threads);
        let mut batches = Vec::with_capacity(threads);
        let mut rest = jobs;
        while !rest.is_empty() {
            let tail = rest.split_off(chunk.min(rest.len()));
            batches.push(std::mem::replace(&mut rest, tail));
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = batches
                .into_iter()
                .map(|batch| {
                    scope.spawn(move || {
                        batch
                            .into_iter()
                            .map(|(lp, c)| evaluate(lp, c, limit))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            let mut results = Vec::new();
            for handle in handles {
                match handle.join() {
                    Ok(batch) => results.extend(batch),
                    Err(_) => return Err(Error::lp_solve("strong_branch", CODE_WORKER_PANIC)),
                }
            }
            Ok(results)
        })
    }
}
