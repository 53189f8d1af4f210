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

//! Subtour cuts from the components of a disconnected support graph.

use super::SeparationContext;
use crate::hypergraph::ExpandedCut;
use fixedbitset::FixedBitSet;
use tourcut_core::error::Result;

pub(super) fn separate(ctx: &SeparationContext<'_>) -> Result<Vec<(ExpandedCut, f64)>> {
    let support = ctx.support;
    if support.is_connected() {
        return Ok(Vec::new());
    }
    let n = ctx.node_count();
    let mut components = support.components();
    // The last component is the complement of the others.
    components.pop();
    components
        .iter()
        .map(|nodes| {
            let mut set = FixedBitSet::with_capacity(n);
            set.extend(nodes.iter().copied());
            let violation = 2.0 - support.cut_value(&set);
            Ok((ExpandedCut::subtour(n, nodes)?, violation))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::tests::{prism_support, run, support};
    use super::super::{SeparationConfig, Separator};

    fn config() -> SeparationConfig {
        SeparationConfig::default().with_routines(vec![Separator::Connect])
    }

    #[test]
    fn test_three_components_give_two_cuts() {
        let s = support(
            9,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
                (6, 7, 1.0),
                (7, 8, 1.0),
                (6, 8, 1.0),
            ],
        );
        let found = run(&s, (0..9).collect(), config()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| (c.violation - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_connected_support_yields_nothing() {
        let found = run(&prism_support(), vec![0, 1, 2, 5, 4, 3], config()).unwrap();
        assert!(found.is_empty());
    }
}
