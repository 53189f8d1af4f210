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

//! Configuration of the cutting loop, the pricer and branching.

use serde::{Deserialize, Serialize};
use tourcut_core::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuttingConfig {
    /// Restart from the first routine once one pivot closes this share of
    /// the gap between the first pivot and the tour.
    pub ph_ratio: f64,
    /// Repeat a full pass over the routines while it closes at least this
    /// share of the gap.
    pub first_last_ratio: f64,
    /// Cuts loose for more than this many pivot-backs leave the LP.
    pub cut_age_limit: u32,
    /// Edges at zero with positive reduced cost for more than this many
    /// pivot-backs leave the core.
    pub edge_age_limit: u32,
    /// Pivots allowed per node before it is left unresolved.
    pub max_rounds: usize,
}

impl Default for CuttingConfig {
    fn default() -> Self {
        Self {
            ph_ratio: 0.1,
            first_last_ratio: 0.01,
            cut_age_limit: 10,
            edge_age_limit: 20,
            max_rounds: 500,
        }
    }
}

impl CuttingConfig {
    pub fn with_ph_ratio(mut self, ratio: f64) -> Self {
        self.ph_ratio = ratio;
        self
    }

    pub fn with_first_last_ratio(mut self, ratio: f64) -> Self {
        self.first_last_ratio = ratio;
        self
    }

    pub fn with_cut_age_limit(mut self, limit: u32) -> Self {
        self.cut_age_limit = limit;
        self
    }

    pub fn with_edge_age_limit(mut self, limit: u32) -> Self {
        self.edge_age_limit = limit;
        self
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ph_ratio) {
            return Err(Error::invalid_input(format!(
                "ph_ratio must lie in [0, 1], got {}",
                self.ph_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.first_last_ratio) {
            return Err(Error::invalid_input(format!(
                "first_last_ratio must lie in [0, 1], got {}",
                self.first_last_ratio
            )));
        }
        if self.max_rounds == 0 {
            return Err(Error::invalid_input("max_rounds must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub enabled: bool,
    /// Nearest neighbours per node covered by the partial scan.
    pub partial_neighbors: usize,
    /// Most edges added per pricing call.
    pub gen_max: usize,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            partial_neighbors: 10,
            gen_max: 100,
        }
    }
}

impl PricingConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_partial_neighbors(mut self, k: usize) -> Self {
        self.partial_neighbors = k;
        self
    }

    pub fn with_gen_max(mut self, gen_max: usize) -> Self {
        self.gen_max = gen_max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.gen_max == 0 {
            return Err(Error::invalid_input("gen_max must be positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchConfig {
    /// Candidates evaluated by strong branching.
    pub candidates: usize,
    /// Dual simplex iterations per strong-branch direction.
    pub strong_iteration_limit: u64,
    /// Worker threads for strong branching; 1 evaluates inline.
    pub threads: usize,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            candidates: 5,
            strong_iteration_limit: 100,
            threads: 1,
        }
    }
}

impl BranchConfig {
    pub fn with_candidates(mut self, k: usize) -> Self {
        self.candidates = k;
        self
    }

    pub fn with_strong_iteration_limit(mut self, limit: u64) -> Self {
        self.strong_iteration_limit = limit;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.candidates == 0 {
            return Err(Error::invalid_input("at least one branching candidate is required"));
        }
        if self.threads == 0 {
            return Err(Error::invalid_input("threads must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CuttingConfig::default().validate().is_ok());
        assert!(PricingConfig::default().validate().is_ok());
        assert!(BranchConfig::default().validate().is_ok());
        assert_eq!(CuttingConfig::default().ph_ratio, 0.1);
        assert_eq!(CuttingConfig::default().first_last_ratio, 0.01);
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        assert!(CuttingConfig::default().with_ph_ratio(1.5).validate().is_err());
        assert!(CuttingConfig::default().with_max_rounds(0).validate().is_err());
        assert!(PricingConfig::default().with_gen_max(0).validate().is_err());
        assert!(BranchConfig::default().with_threads(0).validate().is_err());
        assert!(BranchConfig::default().with_candidates(0).validate().is_err());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: PricingConfig = serde_json::from_str(r#"{"gen_max": 7}"#).unwrap();
        assert_eq!(config.gen_max, 7);
        assert!(config.enabled);
        assert_eq!(config.partial_neighbors, 10);
    }
}
