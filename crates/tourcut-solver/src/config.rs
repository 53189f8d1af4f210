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

//! Top-level solver configuration.
//!
//! A `SolverConfig` bundles the run-level settings (seed, candidate graph,
//! limits, cut pool file) with the tunables of every subsystem. Missing
//! JSON fields fall back to their defaults, so a partial file such as
//!
//! ```json
//! { "seed": 7, "node_limit": 500, "branching": { "threads": 4 } }
//! ```
//!
//! is a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tourcut_bnb::bnb::BnbConfig;
use tourcut_bnb::config::{BranchConfig, CuttingConfig, PricingConfig};
use tourcut_core::error::{Error, Result};
use tourcut_cuts::sep::SeparationConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Seed of the randomized starting-tour restarts.
    pub seed: u64,
    /// Nearest-neighbour starts tried for the initial tour.
    pub restarts: usize,
    /// Neighbours per node in the initial core edge set.
    pub candidate_k: usize,
    pub node_limit: Option<u64>,
    /// Wall-clock limit in seconds.
    pub time_limit_secs: Option<f64>,
    /// Seconds between progress lines of the log monitor.
    pub log_interval_secs: f64,
    /// Cut pool loaded before the run, if the file exists, and saved after.
    pub pool_path: Option<PathBuf>,
    pub cutting: CuttingConfig,
    pub pricing: PricingConfig,
    pub branching: BranchConfig,
    pub separation: SeparationConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            restarts: 4,
            candidate_k: 8,
            node_limit: None,
            time_limit_secs: None,
            log_interval_secs: 5.0,
            pool_path: None,
            cutting: CuttingConfig::default(),
            pricing: PricingConfig::default(),
            branching: BranchConfig::default(),
            separation: SeparationConfig::default(),
        }
    }
}

impl SolverConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn with_candidate_k(mut self, k: usize) -> Self {
        self.candidate_k = k;
        self
    }

    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = Some(limit.as_secs_f64());
        self
    }

    pub fn with_pool_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.pool_path = Some(path.into());
        self
    }

    pub fn with_cutting(mut self, cutting: CuttingConfig) -> Self {
        self.cutting = cutting;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_branching(mut self, branching: BranchConfig) -> Self {
        self.branching = branching;
        self
    }

    pub fn with_separation(mut self, separation: SeparationConfig) -> Self {
        self.separation = separation;
        self
    }

    #[inline]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs_f64)
    }

    #[inline]
    pub fn log_interval(&self) -> Duration {
        Duration::from_secs_f64(self.log_interval_secs)
    }

    /// The branch-and-cut part of the configuration.
    pub fn bnb_config(&self) -> BnbConfig {
        BnbConfig {
            cutting: self.cutting.clone(),
            pricing: self.pricing.clone(),
            branching: self.branching.clone(),
            separation: self.separation.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.restarts == 0 {
            return Err(Error::invalid_input("restarts must be positive"));
        }
        if self.candidate_k == 0 {
            return Err(Error::invalid_input("candidate_k must be positive"));
        }
        if let Some(secs) = self.time_limit_secs
            && !(secs.is_finite() && secs >= 0.0)
        {
            return Err(Error::invalid_input(format!(
                "time_limit_secs must be a non-negative number, got {}",
                secs
            )));
        }
        if !(self.log_interval_secs.is_finite() && self.log_interval_secs >= 0.0) {
            return Err(Error::invalid_input(format!(
                "log_interval_secs must be a non-negative number, got {}",
                self.log_interval_secs
            )));
        }
        self.bnb_config().validate()
    }
}
