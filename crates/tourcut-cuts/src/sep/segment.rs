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

//! Subtour cuts over intervals of the reference tour.
//!
//! For every start position the interval is grown one node at a time and
//! `x(delta(S))` is updated incrementally. Intervals never wrap; a wrapping
//! interval has a non-wrapping complement with the same cut value.

use super::SeparationContext;
use crate::hypergraph::ExpandedCut;
use tourcut_core::error::Result;
use tourcut_core::tolerance::EPS_CUT;

pub(super) fn separate(ctx: &SeparationContext<'_>) -> Result<Vec<(ExpandedCut, f64)>> {
    let n = ctx.node_count();
    let nodes = ctx.tour.nodes();
    let support = ctx.support;
    let mut found = Vec::new();
    if n < 4 {
        return Ok(found);
    }

    let mut in_set = vec![false; n];
    for start in 0..n - 1 {
        let mut cut = 0.0;
        let mut best: Option<(usize, f64)> = None;
        for end in start..n - 1 {
            let v = nodes[end];
            for &(w, x) in support.neighbors(v) {
                if in_set[w] {
                    cut -= x;
                } else {
                    cut += x;
                }
            }
            in_set[v] = true;
            if end > start && cut < 2.0 - EPS_CUT && best.is_none_or(|(_, c)| cut < c) {
                best = Some((end, cut));
            }
        }
        for p in start..n - 1 {
            in_set[nodes[p]] = false;
        }
        if let Some((end, value)) = best {
            found.push((ExpandedCut::subtour(n, &nodes[start..=end])?, 2.0 - value));
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{prism_support, run, support, two_triangles};
    use super::super::{SeparationConfig, Separator};
    use crate::hypergraph::CutKind;

    fn config() -> SeparationConfig {
        SeparationConfig::default().with_routines(vec![Separator::Segment])
    }

    #[test]
    fn test_finds_interval_subtour() {
        let found = run(&two_triangles(), vec![0, 1, 2, 3, 4, 5], config()).unwrap();
        assert!(!found.is_empty());
        let best = &found[0];
        assert_eq!(best.cut.kind(), CutKind::Subtour);
        assert!((best.violation - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_misses_subtours_that_are_not_intervals() {
        // Triangles {0, 2, 4} and {1, 3, 5} interleave along the tour.
        let interleaved = support(
            6,
            &[
                (0, 2, 1.0),
                (2, 4, 1.0),
                (0, 4, 1.0),
                (1, 3, 1.0),
                (3, 5, 1.0),
                (1, 5, 1.0),
            ],
        );
        let found = run(&interleaved, vec![0, 1, 2, 3, 4, 5], config()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_prism_has_no_violated_interval() {
        let found = run(&prism_support(), vec![0, 1, 2, 5, 4, 3], config()).unwrap();
        assert!(found.is_empty());
    }
}
