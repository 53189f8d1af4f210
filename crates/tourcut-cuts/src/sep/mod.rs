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

//! Separation.
//!
//! Every routine is a variant of the closed enum `Separator` and answers
//! the same question: which cuts does the current support graph violate?
//! `SeparationEngine` runs the configured routines in order and applies the
//! acceptance policy.

mod blossom;
mod comb;
mod connect;
mod consec;
mod domino;
mod exact;
mod exact_blossom;
mod meta;
mod segment;

use crate::hypergraph::ExpandedCut;
use crate::pool::CutPool;
use crate::store::CutStore;
use crate::tooth::ToothBank;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tourcut_core::error::{Error, Result};
use tourcut_core::tolerance::EPS_CUT;
use tourcut_lp::support::SupportGraph;
use tourcut_model::tour::Tour;

pub use domino::{ChosenTooth, HandleTeeth, select_teeth};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum MetaKind {
    Tighten,
    Teething,
    Handling,
    Decker,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Separator {
    Segment,
    Connect,
    ExactSubtour,
    Blossom,
    /// Padberg-Rao odd minimum cuts.
    ExactBlossom,
    Comb,
    DominoParity,
    /// Combs over tour intervals with greedily chosen light teeth.
    Consec1,
    Pool,
    /// `Tighten` over the handles of pooled cuts.
    PoolTighten,
    Meta(MetaKind),
}

impl Separator {
    pub fn name(&self) -> &'static str {
        match self {
            Separator::Segment => "segment",
            Separator::Connect => "connect",
            Separator::ExactSubtour => "exact-subtour",
            Separator::Blossom => "blossom",
            Separator::ExactBlossom => "exact-blossom",
            Separator::Comb => "comb",
            Separator::DominoParity => "domino-parity",
            Separator::Consec1 => "consec1",
            Separator::Pool => "pool",
            Separator::PoolTighten => "pool-tighten",
            Separator::Meta(MetaKind::Tighten) => "tighten",
            Separator::Meta(MetaKind::Teething) => "teething",
            Separator::Meta(MetaKind::Handling) => "handling",
            Separator::Meta(MetaKind::Decker) => "decker",
        }
    }

    /// The cuts this routine finds for `ctx`. Candidates may still contain
    /// duplicates or cuts below the violation threshold.
    pub fn separate(
        &self,
        ctx: &mut SeparationContext<'_>,
        config: &SeparationConfig,
    ) -> Result<Vec<CandidateCut>> {
        let found = match self {
            Separator::Segment => segment::separate(ctx)?,
            Separator::Connect => connect::separate(ctx)?,
            Separator::ExactSubtour => exact::separate(ctx)?,
            Separator::Blossom => blossom::separate(ctx)?,
            Separator::ExactBlossom => exact_blossom::separate(ctx)?,
            Separator::Comb => comb::separate(ctx, config)?,
            Separator::DominoParity => domino::separate(ctx, config)?,
            Separator::Consec1 => consec::separate(ctx, config)?,
            Separator::Pool => ctx.pool.separate(ctx.support, config.min_violation),
            Separator::PoolTighten => meta::separate_pool_tighten(ctx, config)?,
            Separator::Meta(kind) => meta::separate(*kind, ctx, config)?,
        };
        Ok(found
            .into_iter()
            .map(|(cut, violation)| CandidateCut {
                cut,
                violation,
                routine: *self,
            })
            .collect())
    }
}

impl std::fmt::Display for Separator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum AcceptancePolicy {
    /// Return the cuts of the first routine that finds any.
    #[default]
    FirstFound,
    /// Run every routine and keep the most violated cuts overall.
    BestOfAll,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    pub routines: Vec<Separator>,
    pub acceptance: AcceptancePolicy,
    pub max_cuts_per_round: usize,
    pub tooth_body_limit: usize,
    pub handle_candidate_limit: usize,
    pub min_violation: f64,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            routines: vec![
                Separator::Connect,
                Separator::Segment,
                Separator::ExactSubtour,
                Separator::Pool,
                Separator::Blossom,
                Separator::ExactBlossom,
                Separator::Comb,
                Separator::DominoParity,
                Separator::Meta(MetaKind::Tighten),
                Separator::Meta(MetaKind::Teething),
                Separator::Meta(MetaKind::Handling),
                Separator::Meta(MetaKind::Decker),
                Separator::PoolTighten,
                Separator::Consec1,
            ],
            acceptance: AcceptancePolicy::FirstFound,
            max_cuts_per_round: 50,
            tooth_body_limit: 8,
            handle_candidate_limit: 40,
            min_violation: EPS_CUT,
        }
    }
}

impl SeparationConfig {
    pub fn with_routines(mut self, routines: Vec<Separator>) -> Self {
        self.routines = routines;
        self
    }

    pub fn with_acceptance(mut self, acceptance: AcceptancePolicy) -> Self {
        self.acceptance = acceptance;
        self
    }

    pub fn with_max_cuts_per_round(mut self, max_cuts: usize) -> Self {
        self.max_cuts_per_round = max_cuts;
        self
    }

    pub fn with_tooth_body_limit(mut self, limit: usize) -> Self {
        self.tooth_body_limit = limit;
        self
    }

    pub fn with_handle_candidate_limit(mut self, limit: usize) -> Self {
        self.handle_candidate_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.routines.is_empty() {
            return Err(Error::invalid_input("no separation routines configured"));
        }
        if self.max_cuts_per_round == 0 {
            return Err(Error::invalid_input("max_cuts_per_round must be positive"));
        }
        if self.tooth_body_limit == 0 {
            return Err(Error::invalid_input("tooth_body_limit must be positive"));
        }
        if !(self.min_violation > 0.0) {
            return Err(Error::invalid_input("min_violation must be positive"));
        }
        Ok(())
    }
}

/// A violated cut and the routine that found it.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateCut {
    pub cut: ExpandedCut,
    pub violation: f64,
    pub routine: Separator,
}

/// What the routines see of the current LP solution.
pub struct SeparationContext<'a> {
    pub support: &'a SupportGraph,
    pub tour: &'a Tour,
    pub store: &'a CutStore,
    pub pool: &'a CutPool,
    teeth: &'a mut ToothBank,
    teeth_collected: bool,
}

impl<'a> SeparationContext<'a> {
    /// `teeth` must already be synced with `tour`.
    pub fn new(
        support: &'a SupportGraph,
        tour: &'a Tour,
        store: &'a CutStore,
        pool: &'a CutPool,
        teeth: &'a mut ToothBank,
    ) -> Self {
        Self {
            support,
            tour,
            store,
            pool,
            teeth,
            teeth_collected: false,
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.support.node_count()
    }

    /// Collects the light teeth of the support graph on first use.
    pub(crate) fn collect_teeth(&mut self, body_limit: usize) -> Result<()> {
        if self.teeth.tour_nodes() != self.tour.nodes() {
            return Err(Error::cache_consistency(
                "tooth bank is keyed against a different tour",
            ));
        }
        if !self.teeth_collected {
            self.teeth.collect_light(self.support, body_limit);
            self.teeth_collected = true;
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn teeth(&self) -> &ToothBank {
        &*self.teeth
    }
}

#[derive(Clone, Debug, Default)]
pub struct SeparationEngine {
    config: SeparationConfig,
}

impl SeparationEngine {
    pub fn new(config: SeparationConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &SeparationConfig {
        &self.config
    }

    #[inline]
    pub fn routines(&self) -> &[Separator] {
        &self.config.routines
    }

    /// Runs one routine and keeps its new, sufficiently violated cuts, most
    /// violated first. A `Separation` error is logged and yields no cuts;
    /// any other error is returned.
    pub fn run_routine(
        &self,
        routine: Separator,
        ctx: &mut SeparationContext<'_>,
    ) -> Result<Vec<CandidateCut>> {
        let found = match routine.separate(ctx, &self.config) {
            Ok(found) => found,
            Err(e @ Error::Separation { .. }) => {
                log::warn!("skipping {}: {}", routine, e);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let mut seen = FxHashSet::default();
        let mut kept: Vec<CandidateCut> = found
            .into_iter()
            .filter(|c| c.violation > self.config.min_violation)
            .filter(|c| !ctx.store.contains(&c.cut))
            .filter(|c| seen.insert(c.cut.to_record().key()))
            .collect();
        kept.sort_by(|a, b| b.violation.total_cmp(&a.violation));
        kept.truncate(self.config.max_cuts_per_round);
        if !kept.is_empty() {
            log::debug!(
                "{} found {} cuts, max violation {:.4}",
                routine,
                kept.len(),
                kept[0].violation
            );
        }
        Ok(kept)
    }

    /// Runs the configured routines under the acceptance policy.
    pub fn separate(&self, ctx: &mut SeparationContext<'_>) -> Result<Vec<CandidateCut>> {
        match self.config.acceptance {
            AcceptancePolicy::FirstFound => {
                for &routine in &self.config.routines {
                    let found = self.run_routine(routine, ctx)?;
                    if !found.is_empty() {
                        return Ok(found);
                    }
                }
                Ok(Vec::new())
            }
            AcceptancePolicy::BestOfAll => {
                let mut all = Vec::new();
                let mut seen = FxHashSet::default();
                for &routine in &self.config.routines {
                    for cand in self.run_routine(routine, ctx)? {
                        if seen.insert(cand.cut.to_record().key()) {
                            all.push(cand);
                        }
                    }
                }
                // Stable: ties keep routine order, then discovery order.
                all.sort_by(|a, b| b.violation.total_cmp(&a.violation));
                all.truncate(self.config.max_cuts_per_round);
                Ok(all)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::hypergraph::CutKind;
    use tourcut_model::graph::{CoreGraph, EndPts};
    use tourcut_model::instance::MatrixInstance;

    /// Support graph from `(u, v, x)` triples.
    pub(crate) fn support(n: usize, edges: &[(usize, usize, f64)]) -> SupportGraph {
        let mut g = CoreGraph::new(n);
        let mut x = Vec::new();
        for &(u, v, val) in edges {
            g.add_edge(EndPts::new(u, v), 1);
            x.push(val);
        }
        SupportGraph::new(&g, &x)
    }

    pub(crate) fn tour(order: Vec<usize>) -> Tour {
        let inst = MatrixInstance::from_fn(order.len(), |_, _| 1).unwrap();
        Tour::new(order, &inst).unwrap()
    }

    pub(crate) fn prism_support() -> SupportGraph {
        support(
            6,
            &[
                (0, 1, 0.5),
                (1, 2, 0.5),
                (0, 2, 0.5),
                (3, 4, 0.5),
                (4, 5, 0.5),
                (3, 5, 0.5),
                (0, 3, 1.0),
                (1, 4, 1.0),
                (2, 5, 1.0),
            ],
        )
    }

    /// The prism with every edge fractional. The fractional subgraph is one
    /// component without teeth at one, yet the triangle handle with the
    /// three rungs as teeth is violated by 0.7.
    pub(crate) fn soft_prism() -> SupportGraph {
        support(
            6,
            &[
                (0, 1, 0.55),
                (1, 2, 0.55),
                (0, 2, 0.55),
                (3, 4, 0.55),
                (4, 5, 0.55),
                (3, 5, 0.55),
                (0, 3, 0.9),
                (1, 4, 0.9),
                (2, 5, 0.9),
            ],
        )
    }

    pub(crate) fn two_triangles() -> SupportGraph {
        support(
            6,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
            ],
        )
    }

    /// Runs `routines` against `support` with an empty store and pool.
    pub(crate) fn run(
        support: &SupportGraph,
        order: Vec<usize>,
        config: SeparationConfig,
    ) -> Result<Vec<CandidateCut>> {
        let t = tour(order);
        let store = CutStore::new(&t);
        let pool = CutPool::new();
        let mut teeth = ToothBank::new(&t);
        let mut ctx = SeparationContext::new(support, &t, &store, &pool, &mut teeth);
        SeparationEngine::new(config).separate(&mut ctx)
    }

    #[test]
    fn test_first_found_stops_at_first_routine() {
        let config = SeparationConfig::default()
            .with_routines(vec![Separator::Connect, Separator::ExactSubtour]);
        let found = run(&two_triangles(), vec![0, 1, 2, 3, 4, 5], config).unwrap();
        assert!(!found.is_empty());
        assert!(found.iter().all(|c| c.routine == Separator::Connect));
        assert!(found.iter().all(|c| c.cut.kind() == CutKind::Subtour));
    }

    #[test]
    fn test_best_of_all_deduplicates_across_routines() {
        let config = SeparationConfig::default()
            .with_routines(vec![Separator::Connect, Separator::ExactSubtour])
            .with_acceptance(AcceptancePolicy::BestOfAll);
        let found = run(&two_triangles(), vec![0, 1, 2, 3, 4, 5], config).unwrap();
        let mut keys: Vec<_> = found.iter().map(|c| c.cut.to_record().key()).collect();
        let before = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), before);
        assert_eq!(found[0].routine, Separator::Connect);
    }

    #[test]
    fn test_nothing_found_is_not_an_error() {
        let cycle = support(
            4,
            &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (0, 3, 1.0)],
        );
        let found = run(&cycle, vec![0, 1, 2, 3], SeparationConfig::default()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_stale_tooth_bank_is_fatal() {
        let t = tour(vec![0, 1, 2, 5, 4, 3]);
        let other = tour(vec![0, 1, 2, 3, 4, 5]);
        let store = CutStore::new(&t);
        let pool = CutPool::new();
        let mut teeth = ToothBank::new(&other);
        let support = prism_support();
        let mut ctx = SeparationContext::new(&support, &t, &store, &pool, &mut teeth);
        let engine = SeparationEngine::new(
            SeparationConfig::default().with_routines(vec![Separator::DominoParity]),
        );
        assert!(matches!(
            engine.separate(&mut ctx),
            Err(Error::CacheConsistency(_))
        ));
    }

    #[test]
    fn test_config_serde_and_validate() {
        let config = SeparationConfig::default()
            .with_routines(vec![Separator::Segment, Separator::Meta(MetaKind::Decker)])
            .with_max_cuts_per_round(7);
        let json = serde_json::to_string(&config).unwrap();
        let back: SeparationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        let partial: SeparationConfig = serde_json::from_str("{\"max_cuts_per_round\": 3}").unwrap();
        assert_eq!(partial.max_cuts_per_round, 3);
        assert_eq!(partial.acceptance, AcceptancePolicy::FirstFound);
        assert!(SeparationConfig::default().with_routines(vec![]).validate().is_err());
        assert!(SeparationConfig::default().validate().is_ok());
    }
}
