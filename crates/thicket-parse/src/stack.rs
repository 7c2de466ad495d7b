//! The graph-structured stack shared by all parse versions.
//!
//! Nodes live in an arena and only ever point down, so versions that forked
//! from a common prefix share it, and versions that reach the same state at
//! the same position can be merged by giving one node several links.

use la_arena::{Arena, Idx};
use smallvec::{SmallVec, smallvec};
use thicket_grammar::StateId;
use thicket_span::Length;
use thicket_tree::GreenNode;

/// Most paths a single pop enumerates.
pub(crate) const MAX_POP_PATHS: usize = 16;

pub(crate) type NodeId = Idx<StackNode>;

#[derive(Debug)]
pub(crate) struct StackNode {
    pub(crate) state: StateId,
    /// Absolute position after the subtree on the link that reached it.
    pub(crate) position: Length,
    pub(crate) links: SmallVec<[StackLink; 2]>,
    pub(crate) error_cost: u32,
    pub(crate) dynamic_precedence: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct StackLink {
    pub(crate) node: NodeId,
    pub(crate) subtree: GreenNode,
}

/// One way down the stack, with the subtrees it crossed in text order.
#[derive(Debug)]
pub(crate) struct StackPath {
    pub(crate) base: NodeId,
    pub(crate) subtrees: Vec<GreenNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PopCount {
    /// Pops this many subtrees that are not extras, with the extras between
    /// and above them.
    Children(usize),
    /// Pops this many subtrees of any kind.
    Subtrees(usize),
    /// Pops down to the bottom.
    All,
}

#[derive(Default)]
pub(crate) struct Stack {
    nodes: Arena<StackNode>,
}

impl Stack {
    pub(crate) fn base(&mut self, state: StateId) -> NodeId {
        self.nodes.alloc(StackNode {
            state,
            position: Length::ZERO,
            links: SmallVec::new(),
            error_cost: 0,
            dynamic_precedence: 0,
        })
    }

    pub(crate) fn push(&mut self, below: NodeId, subtree: GreenNode, state: StateId) -> NodeId {
        let base = &self.nodes[below];
        let node = StackNode {
            state,
            position: base.position + subtree.total(),
            error_cost: base.error_cost + subtree.error_cost(),
            dynamic_precedence: base.dynamic_precedence + subtree.dynamic_precedence(),
            links: smallvec![StackLink { node: below, subtree }],
        };
        self.nodes.alloc(node)
    }

    pub(crate) fn get(&self, node: NodeId) -> &StackNode {
        &self.nodes[node]
    }

    /// Gives `into` every link of `from` it does not have yet.
    pub(crate) fn merge(&mut self, into: NodeId, from: NodeId) {
        if into == from {
            return;
        }
        let links = self.nodes[from].links.clone();
        let target = &mut self.nodes[into];
        for link in links {
            let known = target
                .links
                .iter()
                .any(|existing| existing.node == link.node && existing.subtree.ptr_eq(&link.subtree));
            if !known {
                target.links.push(link);
            }
        }
    }

    /// Enumerates the ways of popping `count` from `top`, depth first along
    /// links in order, stopping after [`MAX_POP_PATHS`].
    pub(crate) fn pop(&self, top: NodeId, count: PopCount) -> Vec<StackPath> {
        let remaining = match count {
            PopCount::Children(n) | PopCount::Subtrees(n) => n,
            PopCount::All => usize::MAX,
        };
        let mut paths = Vec::new();
        let mut work = vec![(top, remaining, Vec::new())];
        while let Some((node, remaining, mut subtrees)) = work.pop() {
            let links = &self.nodes[node].links;
            if remaining == 0 || (count == PopCount::All && links.is_empty()) {
                subtrees.reverse();
                paths.push(StackPath { base: node, subtrees });
                if paths.len() == MAX_POP_PATHS {
                    break;
                }
                continue;
            }
            for link in links.iter().rev() {
                let counted = match count {
                    PopCount::Children(_) => !link.subtree.is_extra(),
                    PopCount::Subtrees(_) | PopCount::All => true,
                };
                let mut subtrees = subtrees.clone();
                subtrees.push(link.subtree.clone());
                let next = if counted && count != PopCount::All { remaining - 1 } else { remaining };
                work.push((link.node, next, subtrees));
            }
        }
        paths
    }

    /// States reached by popping one, two, ... subtrees along first links.
    pub(crate) fn states_below(&self, top: NodeId, limit: usize) -> Vec<StateId> {
        let mut states = Vec::new();
        let mut node = top;
        while states.len() < limit {
            let Some(link) = self.nodes[node].links.first() else {
                break;
            };
            node = link.node;
            states.push(self.nodes[node].state);
        }
        states
    }

    /// The subtree on the first link of `node`.
    pub(crate) fn top_subtree(&self, node: NodeId) -> Option<&StackLink> {
        match self.nodes[node].links.as_slice() {
            [link] => Some(link),
            _ => None,
        }
    }
}
