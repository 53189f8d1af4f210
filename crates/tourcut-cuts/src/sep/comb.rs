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

//! Combs with light teeth.
//!
//! A light tooth `(t, S)` with `t` in the handle and `S` outside it gives
//! the comb tooth `{t} + S` with `x(delta({t} + S)) = 3 + slack - x(E(t:S))`,
//! so the teeth chosen by gain for a domino also make the comb tight. The
//! handles are the same candidates the domino-parity routine uses.

use super::domino::{HandleTeeth, handle_candidates, select_teeth};
use super::{SeparationConfig, SeparationContext};
use crate::hypergraph::ExpandedCut;
use crate::tooth::ToothBank;
use fixedbitset::FixedBitSet;
use tourcut_core::error::Result;
use tourcut_lp::support::SupportGraph;

/// The comb of `handle` with greedily chosen teeth, if it is violated.
pub(super) fn cut_for_handle(
    bank: &ToothBank,
    support: &SupportGraph,
    handle: &FixedBitSet,
) -> Result<Option<(ExpandedCut, f64)>> {
    let teeth = select_teeth(bank, support, handle, HandleTeeth::Comb);
    if teeth.len() < 3 {
        return Ok(None);
    }
    let handle_nodes: Vec<usize> = handle.ones().collect();
    let tooth_sets: Vec<Vec<usize>> = teeth
        .into_iter()
        .map(|t| {
            let mut nodes = t.body;
            nodes.push(t.root);
            nodes.sort_unstable();
            nodes
        })
        .collect();
    let cut = ExpandedCut::comb(support.node_count(), &handle_nodes, &tooth_sets)?;
    let violation = cut.violation(support);
    Ok((violation > 0.0).then_some((cut, violation)))
}

pub(super) fn separate(
    ctx: &mut SeparationContext<'_>,
    config: &SeparationConfig,
) -> Result<Vec<(ExpandedCut, f64)>> {
    ctx.collect_teeth(config.tooth_body_limit)?;
    let mut found = Vec::new();
    for handle in handle_candidates(ctx, config.handle_candidate_limit) {
        if let Some(hit) = cut_for_handle(ctx.teeth(), ctx.support, &handle)? {
            found.push(hit);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{prism_support, run, support};
    use super::super::{SeparationConfig, Separator};
    use crate::hypergraph::CutKind;

    fn config() -> SeparationConfig {
        SeparationConfig::default().with_routines(vec![Separator::Comb])
    }

    #[test]
    fn test_prism_comb_from_light_teeth() {
        let found = run(&prism_support(), vec![0, 1, 2, 5, 4, 3], config()).unwrap();
        assert!(!found.is_empty());
        // Two-node teeth make the comb a blossom.
        assert_eq!(found[0].cut.kind(), CutKind::Blossom);
        assert!((found[0].violation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_comb_with_wider_teeth() {
        // Handle {0, 1, 2} at one half; teeth {0, 3, 4}, {1, 5, 6} and
        // {2, 7, 8} each cross twice.
        let s = support(
            9,
            &[
                (0, 1, 0.5),
                (1, 2, 0.5),
                (0, 2, 0.5),
                (0, 3, 1.0),
                (1, 5, 1.0),
                (2, 7, 1.0),
                (3, 4, 1.0),
                (5, 6, 1.0),
                (7, 8, 1.0),
                (4, 6, 0.5),
                (4, 8, 0.5),
                (6, 8, 0.5),
            ],
        );
        let found = run(&s, vec![0, 1, 2, 7, 8, 6, 5, 4, 3], config()).unwrap();
        assert!(found.iter().all(|c| c.violation > 0.0));
        assert!(
            found
                .iter()
                .any(|c| c.cut.kind() == CutKind::Comb && c.violation > 1.0 - 1e-9)
        );
    }
}
