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

//! The branch tree.
//!
//! Nodes live in an arena indexed by [`NodeIndex`] and point to their parent
//! by index. Open nodes wait on a LIFO stack, so the search is depth-first;
//! siblings are pushed worst estimate first so the more promising child is
//! explored next.
//!
//! A closed node whose subtree is fully closed is released: its basis and
//! tour are dropped and its slot is reused by the next push. Ancestors of an
//! open node are never released, so [`SearchTree::clamps`] stays valid.

use crate::branch_tour::CompressedTour;
use tourcut_core::utils::index::{TypedIndex, TypedIndexTag};
use tourcut_lp::relaxation::SavedBasis;
use tourcut_model::graph::EndPts;
use tourcut_model::tour::Tour;
use tourcut_search::monitor::search_monitor::PruneReason;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeIndexTag;

impl TypedIndexTag for NodeIndexTag {
    const NAME: &'static str = "NodeIndex";
}

pub type NodeIndex = TypedIndex<NodeIndexTag>;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BranchDirection {
    /// `x_e = 0`.
    Down,
    /// `x_e = 1`.
    Up,
}

impl BranchDirection {
    /// Column bounds that clamp the edge.
    #[inline]
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            BranchDirection::Down => (0.0, 0.0),
            BranchDirection::Up => (1.0, 1.0),
        }
    }
}

impl std::fmt::Display for BranchDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchDirection::Down => write!(f, "Down"),
            BranchDirection::Up => write!(f, "Up"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeStatus {
    NeedsCut,
    NeedsPrice,
    NeedsRecover,
    NeedsBranch,
    Pruned(PruneReason),
    /// Branched, or resolved by a tour.
    Done,
}

impl NodeStatus {
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, NodeStatus::Pruned(_) | NodeStatus::Done)
    }
}

#[derive(Clone, Debug)]
pub struct BranchNode {
    pub parent: Option<NodeIndex>,
    pub branch: Option<(EndPts, BranchDirection)>,
    pub depth: u64,
    /// The basis the node's LP starts from; dropped once the node closes.
    pub basis: Option<SavedBasis>,
    /// Lower bound on any tour below this node.
    pub bound: f64,
    /// Strong-branching estimate used to order siblings.
    pub estimate: f64,
    /// A tour respecting the node's clamps, if one was found.
    pub tour: Option<CompressedTour>,
    pub status: NodeStatus,
    /// Children not yet released.
    live_children: usize,
}

/// A child about to be pushed.
#[derive(Clone, Debug)]
pub struct ChildSpec {
    pub branch: (EndPts, BranchDirection),
    pub estimate: f64,
    pub basis: Option<SavedBasis>,
    pub tour: Option<CompressedTour>,
}

#[derive(Clone, Debug)]
pub struct SearchTree {
    nodes: Vec<BranchNode>,
    open: Vec<NodeIndex>,
    /// Released slots, reused before the arena grows.
    free: Vec<NodeIndex>,
    live: usize,
    base: Vec<usize>,
    base_perm: Vec<usize>,
}

impl SearchTree {
    /// Creates an empty tree whose branch tours compress against `base`.
    pub fn new(base: &Tour) -> Self {
        Self {
            nodes: Vec::new(),
            open: Vec::new(),
            free: Vec::new(),
            live: 0,
            base: base.nodes().to_vec(),
            base_perm: base.perm().to_vec(),
        }
    }

    #[inline]
    pub fn base(&self) -> &[usize] {
        &self.base
    }

    #[inline]
    pub fn base_perm(&self) -> &[usize] {
        &self.base_perm
    }

    /// Nodes not yet released.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Arena slots allocated so far, live or free.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    fn alloc(&mut self, node: BranchNode) -> NodeIndex {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                self.nodes[index.get()] = node;
                index
            }
            None => {
                self.nodes.push(node);
                NodeIndex::new(self.nodes.len() - 1)
            }
        }
    }

    /// Frees a closed leaf and every ancestor it leaves childless.
    fn release(&mut self, index: NodeIndex) {
        let mut current = Some(index);
        while let Some(i) = current {
            let node = &mut self.nodes[i.get()];
            node.basis = None;
            node.tour = None;
            let parent = node.parent;
            self.free.push(i);
            self.live -= 1;
            current = parent.filter(|&p| {
                let parent = &mut self.nodes[p.get()];
                parent.live_children -= 1;
                parent.live_children == 0 && parent.status.is_closed()
            });
        }
    }

    /// Nodes that are live may be read at any time; a released slot keeps
    /// its last status and bound until the slot is reused.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> &BranchNode {
        &self.nodes[index.get()]
    }

    #[inline]
    pub fn node_mut(&mut self, index: NodeIndex) -> &mut BranchNode {
        &mut self.nodes[index.get()]
    }

    pub fn push_root(
        &mut self,
        bound: f64,
        basis: Option<SavedBasis>,
        tour: Option<CompressedTour>,
    ) -> NodeIndex {
        let index = self.alloc(BranchNode {
            parent: None,
            branch: None,
            depth: 0,
            basis,
            bound,
            estimate: bound,
            tour,
            status: NodeStatus::NeedsCut,
            live_children: 0,
        });
        self.open.push(index);
        index
    }

    /// Adds the children of `parent` and marks it done. Each child starts
    /// with the parent's bound; the child with the better estimate is
    /// popped first.
    pub fn push_children(
        &mut self,
        parent: NodeIndex,
        mut children: Vec<ChildSpec>,
    ) -> Vec<NodeIndex> {
        let (depth, bound) = {
            let p = self.node_mut(parent);
            p.status = NodeStatus::Done;
            p.basis = None;
            p.live_children += children.len();
            (p.depth + 1, p.bound)
        };
        // Worst first onto the stack.
        children.sort_by(|a, b| b.estimate.total_cmp(&a.estimate));
        let mut indices = Vec::with_capacity(children.len());
        for child in children {
            let index = self.alloc(BranchNode {
                parent: Some(parent),
                branch: Some(child.branch),
                depth,
                basis: child.basis,
                bound,
                estimate: child.estimate.max(bound),
                tour: child.tour,
                status: NodeStatus::NeedsCut,
                live_children: 0,
            });
            self.open.push(index);
            indices.push(index);
        }
        indices
    }

    /// Raises the bound of `index`; bounds never decrease.
    pub fn raise_bound(&mut self, index: NodeIndex, bound: f64) {
        let node = self.node_mut(index);
        if bound > node.bound {
            node.bound = bound;
        }
    }

    /// Closes a node and frees its basis; a closed leaf is released.
    pub fn close(&mut self, index: NodeIndex, status: NodeStatus) {
        let node = self.node_mut(index);
        let was_closed = node.status.is_closed();
        node.status = status;
        if !status.is_closed() || was_closed {
            return;
        }
        node.basis = None;
        if node.live_children == 0 {
            self.release(index);
        }
    }

    #[inline]
    pub fn pop(&mut self) -> Option<NodeIndex> {
        self.open.pop()
    }

    /// Every branching decision from the root down to `index`, root first.
    pub fn clamps(&self, index: NodeIndex) -> Vec<(EndPts, BranchDirection)> {
        let mut path = Vec::with_capacity(self.node(index).depth as usize);
        let mut current = Some(index);
        while let Some(i) = current {
            let node = self.node(i);
            if let Some(branch) = node.branch {
                path.push(branch);
            }
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// The smallest bound over the open nodes.
    pub fn min_open_bound(&self) -> Option<f64> {
        self.open
            .iter()
            .map(|&i| self.node(i).bound)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Removes every open node whose bound is not below `cutoff` and
    /// returns them.
    pub fn prune_open(&mut self, cutoff: f64) -> Vec<NodeIndex> {
        let (keep, pruned): (Vec<NodeIndex>, Vec<NodeIndex>) = self
            .open
            .iter()
            .partition(|&&i| self.nodes[i.get()].bound < cutoff);
        self.open = keep;
        for &i in &pruned {
            self.close(i, NodeStatus::Pruned(PruneReason::BoundDominated));
        }
        pruned
    }

    /// Bytes held by saved bases.
    pub fn basis_bytes(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| n.basis.as_ref())
            .map(SavedBasis::allocated_bytes)
            .sum()
    }
}

impl std::fmt::Display for SearchTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SearchTree(nodes: {}, open: {})",
            self.live,
            self.open.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourcut_lp::relaxation::{NewEdge, Relaxation};
    use tourcut_model::instance::{Instance, MatrixInstance};

    fn prism_like() -> MatrixInstance {
        MatrixInstance::from_fn(6, |u, v| if (u < 3) == (v < 3) { 2 } else { 5 }).unwrap()
    }

    fn tree() -> SearchTree {
        let inst = MatrixInstance::from_fn(5, |u, v| (u + v) as i64).unwrap();
        SearchTree::new(&Tour::new(vec![0, 1, 2, 3, 4], &inst).unwrap())
    }

    fn child(u: usize, v: usize, dir: BranchDirection, estimate: f64) -> ChildSpec {
        ChildSpec {
            branch: (EndPts::new(u, v), dir),
            estimate,
            basis: None,
            tour: None,
        }
    }

    #[test]
    fn test_children_inherit_parent_bound() {
        let mut t = tree();
        let root = t.push_root(10.0, None, None);
        assert_eq!(t.pop(), Some(root));
        t.raise_bound(root, 12.0);
        let kids = t.push_children(
            root,
            vec![
                child(0, 1, BranchDirection::Down, 11.0),
                child(0, 1, BranchDirection::Up, 15.0),
            ],
        );
        for &k in &kids {
            assert!(t.node(k).bound >= t.node(root).bound);
            assert_eq!(t.node(k).depth, 1);
            assert_eq!(t.node(k).parent, Some(root));
        }
        assert_eq!(t.node(root).status, NodeStatus::Done);
        // The estimate below the parent bound is lifted to it.
        let down = kids.iter().find(|&&k| t.node(k).branch.unwrap().1 == BranchDirection::Down);
        assert_eq!(t.node(*down.unwrap()).estimate, 12.0);
    }

    #[test]
    fn test_better_estimate_popped_first() {
        let mut t = tree();
        let root = t.push_root(0.0, None, None);
        t.pop();
        t.push_children(
            root,
            vec![
                child(2, 3, BranchDirection::Down, 3.0),
                child(2, 3, BranchDirection::Up, 7.0),
            ],
        );
        let first = t.pop().unwrap();
        assert_eq!(t.node(first).branch.unwrap().1, BranchDirection::Down);
        let second = t.pop().unwrap();
        assert_eq!(t.node(second).branch.unwrap().1, BranchDirection::Up);
        assert_eq!(t.pop(), None);
    }

    #[test]
    fn test_clamps_follow_the_path() {
        let mut t = tree();
        let root = t.push_root(0.0, None, None);
        t.pop();
        t.push_children(
            root,
            vec![
                child(0, 1, BranchDirection::Down, 1.0),
                child(0, 1, BranchDirection::Up, 2.0),
            ],
        );
        let a = t.pop().unwrap();
        t.push_children(
            a,
            vec![
                child(3, 4, BranchDirection::Up, 5.0),
                child(3, 4, BranchDirection::Down, 6.0),
            ],
        );
        let b = t.pop().unwrap();
        assert_eq!(
            t.clamps(b),
            vec![
                (EndPts::new(0, 1), BranchDirection::Down),
                (EndPts::new(3, 4), BranchDirection::Up),
            ]
        );
        assert_eq!(t.clamps(root), vec![]);
        assert_eq!(t.open_count(), 2);
    }

    #[test]
    fn test_prune_open_and_min_bound() {
        let mut t = tree();
        let root = t.push_root(0.0, None, None);
        t.pop();
        t.raise_bound(root, 5.0);
        let kids = t.push_children(
            root,
            vec![
                child(0, 1, BranchDirection::Down, 5.0),
                child(0, 1, BranchDirection::Up, 9.0),
            ],
        );
        t.raise_bound(kids[0], 20.0);
        assert_eq!(t.min_open_bound(), Some(5.0));
        let pruned = t.prune_open(10.0);
        assert_eq!(pruned, vec![kids[0]]);
        assert_eq!(t.open_count(), 1);
        assert_eq!(
            t.node(kids[0]).status,
            NodeStatus::Pruned(PruneReason::BoundDominated)
        );
        assert_eq!(t.to_string(), "SearchTree(nodes: 2, open: 1)");
    }

    #[test]
    fn test_closed_subtrees_are_released_and_reused() {
        let inst = prism_like();
        let mut lp = Relaxation::new(6).unwrap();
        let edges: Vec<NewEdge> = (0..6)
            .flat_map(|u| ((u + 1)..6).map(move |v| (u, v)))
            .map(|(u, v)| NewEdge::new(EndPts::new(u, v), inst.distance(u, v)))
            .collect();
        lp.add_edges(&edges).unwrap();
        let saved = lp.save_basis();

        let mut t = tree();
        let root = t.push_root(0.0, Some(saved.clone()), None);
        t.pop();
        let with_basis = |u, v, dir| ChildSpec {
            basis: Some(saved.clone()),
            ..child(u, v, dir, 1.0)
        };
        let kids = t.push_children(
            root,
            vec![
                with_basis(0, 1, BranchDirection::Down),
                with_basis(0, 1, BranchDirection::Up),
            ],
        );
        assert_eq!(t.len(), 3);
        assert!(t.basis_bytes() > 0);

        let first = t.pop().unwrap();
        t.close(first, NodeStatus::Done);
        assert_eq!(t.len(), 2);
        // The root still has a live child.
        let popped = t.pop().unwrap();
        assert_eq!(t.clamps(popped).len(), 1);

        let second = kids.iter().copied().find(|&k| k != first).unwrap();
        t.close(second, NodeStatus::Pruned(PruneReason::Infeasible));
        // Closing twice must not release twice.
        t.close(second, NodeStatus::Pruned(PruneReason::Infeasible));
        assert!(t.is_empty());
        assert_eq!(t.basis_bytes(), 0);
        assert_eq!(t.slot_count(), 3);

        let reused = t.push_root(5.0, None, None);
        assert!(reused.get() < 3);
        assert_eq!(t.slot_count(), 3);
        assert_eq!(t.len(), 1);
        assert_eq!(t.node(reused).status, NodeStatus::NeedsCut);
        assert_eq!(t.node(reused).depth, 0);
    }
}
