use std::sync::Arc;

use thicket_span::{Length, TextSize};
use thicket_tree::GreenNode;

/// Walks an edited old tree in step with the parser, offering the subtrees
/// that start where the parser currently is.
pub(crate) struct ReusableNodes {
    /// Ancestors of the current node with the index of the child on the path.
    parents: Vec<(GreenNode, usize)>,
    /// The current node and the position where its padding starts.
    current: Option<(GreenNode, Length)>,
    /// Scanner state in effect before the current node.
    external_state: Option<Arc<[u8]>>,
}

/// Old subtrees starting at one position, outermost first, ending with the
/// leaf that holds the first token.
#[derive(Debug, Clone)]
pub(crate) struct Candidates {
    pub(crate) nodes: Vec<GreenNode>,
    /// Scanner state in effect before the first token.
    pub(crate) external_state: Option<Arc<[u8]>>,
}

impl Candidates {
    pub(crate) fn leaf(&self) -> Option<&GreenNode> {
        self.nodes.last()
    }
}

impl ReusableNodes {
    /// Starts below `root`, which holds the end of input and so is never
    /// reusable itself.
    pub(crate) fn new(root: &GreenNode) -> Self {
        let mut reusable = Self {
            parents: Vec::new(),
            current: Some((root.clone(), Length::ZERO)),
            external_state: None,
        };
        reusable.descend();
        reusable
    }

    /// Moves past the current node.
    fn skip(&mut self) {
        let Some((node, position)) = self.current.take() else {
            return;
        };
        if let Some(state) = node.external_state() {
            self.external_state = Some(state.clone());
        }
        let end = position + node.total();
        while let Some((parent, index)) = self.parents.last_mut() {
            *index += 1;
            if let Some(sibling) = parent.children().get(*index) {
                self.current = Some((sibling.clone(), end));
                return;
            }
            self.parents.pop();
        }
    }

    fn descend(&mut self) {
        let Some((node, position)) = self.current.take() else {
            return;
        };
        match node.children().first() {
            Some(first) => {
                self.current = Some((first.clone(), position));
                self.parents.push((node, 0));
            }
            None => {
                self.current = Some((node, position));
                self.skip();
            }
        }
    }

    /// Advances to `position` and returns the subtrees starting there.
    pub(crate) fn candidates_at(&mut self, position: TextSize) -> Option<Candidates> {
        loop {
            let (node, start) = self.current.as_ref()?;
            let start = start.bytes;
            let end = start + node.total().bytes;
            if end <= position {
                self.skip();
            } else if start < position {
                if node.is_leaf() {
                    self.skip();
                } else {
                    self.descend();
                }
            } else if start == position {
                return Some(self.spine(node.clone()));
            } else {
                return None;
            }
        }
    }

    fn spine(&self, mut node: GreenNode) -> Candidates {
        let mut nodes = Vec::new();
        loop {
            let first = node.children().first().cloned();
            nodes.push(node);
            match first {
                Some(child) if !child.total().is_empty() => node = child,
                Some(_) => {
                    nodes.clear();
                    break;
                }
                None => break,
            }
        }
        Candidates { nodes, external_state: self.external_state.clone() }
    }
}
