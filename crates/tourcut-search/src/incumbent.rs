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

//! # Shared incumbent tour
//!
//! Holds the best tour found so far. The length is mirrored in an
//! `AtomicI64` so that bound checks never lock; the tour itself sits behind
//! a `Mutex` and is the source of truth. A candidate is installed only when
//! it is strictly shorter than the current incumbent.
//!
//! ```rust
//! use tourcut_search::incumbent::SharedIncumbent;
//! use tourcut_model::tour::Tour;
//!
//! let inc = SharedIncumbent::new();
//! let tour = Tour::with_length(vec![0, 1, 2], 30).unwrap();
//! assert!(inc.try_install(&tour));
//! assert_eq!(inc.upper_bound(), 30);
//! ```

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use tourcut_model::tour::Tour;

/// The best known tour, shareable between threads and portfolio callers.
///
/// `upper_bound` starts at `i64::MAX`, meaning no tour is installed. It is
/// read and written with `Ordering::Relaxed`; it only short-circuits
/// obviously worse candidates, the mutex decides.
#[derive(Debug)]
pub struct SharedIncumbent {
    upper_bound: AtomicI64,
    tour: Mutex<Option<Tour>>,
}

impl Default for SharedIncumbent {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SharedIncumbent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upper_bound() {
            i64::MAX => write!(f, "Incumbent(none)"),
            ub => write!(f, "Incumbent(length: {})", ub),
        }
    }
}

impl SharedIncumbent {
    #[inline]
    pub fn new() -> Self {
        Self {
            upper_bound: AtomicI64::new(i64::MAX),
            tour: Mutex::new(None),
        }
    }

    /// An incumbent seeded with `tour`.
    #[inline]
    pub fn with_tour(tour: Tour) -> Self {
        Self {
            upper_bound: AtomicI64::new(tour.length()),
            tour: Mutex::new(Some(tour)),
        }
    }

    /// Length of the incumbent, `i64::MAX` if there is none.
    #[inline]
    pub fn upper_bound(&self) -> i64 {
        self.upper_bound.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn has_tour(&self) -> bool {
        self.upper_bound() != i64::MAX
    }

    /// A copy of the incumbent tour, if any.
    pub fn snapshot(&self) -> Option<Tour> {
        let guard = self.tour.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Installs `candidate` if it is strictly shorter than the incumbent.
    pub fn try_install(&self, candidate: &Tour) -> bool {
        let length = candidate.length();
        if length >= self.upper_bound() {
            return false;
        }

        let mut guard = self.tour.lock().unwrap_or_else(|e| e.into_inner());
        // The atomic may be stale; the guarded tour decides.
        if guard.as_ref().is_some_and(|t| length >= t.length()) {
            return false;
        }
        *guard = Some(candidate.clone());
        self.upper_bound.store(length, Ordering::Relaxed);
        true
    }

    /// Consumes the holder and returns the tour.
    pub fn into_inner(self) -> Option<Tour> {
        self.tour.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::SharedIncumbent;
    use std::sync::Arc;
    use std::thread;
    use tourcut_model::tour::Tour;

    fn tour(length: i64) -> Tour {
        Tour::with_length(vec![0, 1, 2, 3], length).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let inc = SharedIncumbent::new();
        assert_eq!(inc.upper_bound(), i64::MAX);
        assert!(!inc.has_tour());
        assert!(inc.snapshot().is_none());
        assert_eq!(inc.to_string(), "Incumbent(none)");
    }

    #[test]
    fn test_only_strict_improvements_are_installed() {
        let inc = SharedIncumbent::with_tour(tour(100));
        assert_eq!(inc.upper_bound(), 100);
        assert!(!inc.try_install(&tour(100)));
        assert!(!inc.try_install(&tour(140)));
        assert!(inc.try_install(&tour(90)));
        assert_eq!(inc.upper_bound(), 90);
        assert_eq!(inc.snapshot().unwrap().length(), 90);
        assert_eq!(inc.into_inner().unwrap().length(), 90);
    }

    #[test]
    fn test_concurrent_installs_keep_minimum() {
        let inc = Arc::new(SharedIncumbent::new());
        let lengths = [300, 200, 400, 50, 120, 75, 500, 60, 90];
        let handles: Vec<_> = lengths
            .iter()
            .map(|&len| {
                let inc = Arc::clone(&inc);
                thread::spawn(move || inc.try_install(&tour(len)))
            })
            .collect();
        let installed: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(installed.iter().any(|&b| b));
        assert_eq!(inc.upper_bound(), 50);
        assert_eq!(inc.snapshot().unwrap().length(), 50);
    }
}
