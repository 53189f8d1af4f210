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

//! Error type shared by all tourcut crates.
//!
//! The variants follow how the search reacts to them:
//!
//! - `LpSolve` is recoverable. The caller retries from a fresh basis or
//!   aborts the current branch node.
//! - `Separation` is logged and the failing routine is skipped for the
//!   current LP solution.
//! - `CacheConsistency` is fatal. It means a clique or tooth handle was used
//!   after release, a reference count underflowed, or two live entries
//!   describe the same node subset.
//! - `BudgetExceeded` is non-fatal. The node stays unresolved and the run
//!   reports the proven gap.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("LP engine call `{call}` failed with return code {code}")]
    LpSolve { call: &'static str, code: i32 },
    #[error("separation routine `{routine}` failed: {message}")]
    Separation {
        routine: &'static str,
        message: String,
    },
    #[error("cache consistency violated: {0}")]
    CacheConsistency(String),
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn lp_solve(call: &'static str, code: i32) -> Self {
        Self::LpSolve { call, code }
    }

    pub fn separation(routine: &'static str, message: impl Into<String>) -> Self {
        Self::Separation {
            routine,
            message: message.into(),
        }
    }

    pub fn cache_consistency(message: impl Into<String>) -> Self {
        Self::CacheConsistency(message.into())
    }

    pub fn budget_exceeded(message: impl Into<String>) -> Self {
        Self::BudgetExceeded(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns `true` for errors that must abort the whole run.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CacheConsistency(_))
    }

    /// Returns `true` for errors the search handles at node level.
    #[inline]
    pub fn is_node_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LpSolve { .. } | Self::Separation { .. } | Self::BudgetExceeded(_)
        )
    }
}
