use thicket_span::Length;

use crate::{GreenNode, Node, Tree};

#[derive(Clone, Copy)]
struct Entry<'tree> {
    green: &'tree GreenNode,
    /// Absolute position where the node's padding starts.
    position: Length,
    /// Index among the parent's raw children.
    index: usize,
}

/// A stateful walker over the visible nodes below some starting node.
///
/// Hidden nodes stay on the internal stack so moving between siblings can
/// cross them, but the cursor only ever rests on visible nodes.
#[derive(Clone)]
pub struct TreeCursor<'tree> {
    tree: &'tree Tree,
    start: Entry<'tree>,
    start_is_root: bool,
    /// Descendants of `start` down to the current node.
    stack: Vec<Entry<'tree>>,
}

impl<'tree> TreeCursor<'tree> {
    pub(crate) fn new(node: Node<'tree>) -> Self {
        Self {
            tree: node.tree,
            start: Entry { green: node.green, position: node.position, index: 0 },
            start_is_root: node.is_root,
            stack: Vec::new(),
        }
    }

    pub fn reset(&mut self, node: Node<'tree>) {
        *self = Self::new(node);
    }

    pub fn node(&self) -> Node<'tree> {
        let (is_root, entry) = match self.stack.last() {
            Some(entry) => (false, *entry),
            None => (self.start_is_root, self.start),
        };
        Node { tree: self.tree, green: entry.green, position: entry.position, is_root }
    }

    /// Number of visible ancestors between the current node and the node the
    /// cursor started from.
    pub fn depth(&self) -> usize {
        self.stack.iter().filter(|entry| entry.green.is_visible()).count()
    }

    pub fn goto_first_child(&mut self) -> bool {
        let position = self.top().position;
        self.enter(0, position)
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        let saved = self.stack.clone();
        while let Some(entry) = self.stack.pop() {
            if self.enter(entry.index + 1, entry.position + entry.green.total()) {
                return true;
            }
            if self.stack.last().is_none_or(|top| top.green.is_visible()) {
                break;
            }
        }
        self.stack = saved;
        false
    }

    pub fn goto_parent(&mut self) -> bool {
        if self.stack.pop().is_none() {
            return false;
        }
        while self.stack.last().is_some_and(|top| !top.green.is_visible()) {
            self.stack.pop();
        }
        true
    }

    /// Moves to the first child that ends after `byte` and returns its index.
    pub fn goto_first_child_for_byte(&mut self, byte: usize) -> Option<usize> {
        if !self.goto_first_child() {
            return None;
        }
        let mut index = 0;
        loop {
            if self.node().end_byte() > byte {
                return Some(index);
            }
            if !self.goto_next_sibling() {
                self.goto_parent();
                return None;
            }
            index += 1;
        }
    }

    /// Moves to the child spanning `start..end`. An empty range on the
    /// boundary between two children selects the right one.
    pub fn goto_child_for_byte_range(&mut self, start: usize, end: usize) -> bool {
        if !self.goto_first_child() {
            return false;
        }
        let mut chosen = None;
        loop {
            let node = self.node();
            if node.start_byte() > start {
                break;
            }
            if end <= node.end_byte() {
                chosen = Some(self.stack.clone());
                if !(start == end && node.end_byte() == start) {
                    break;
                }
            }
            if !self.goto_next_sibling() {
                break;
            }
        }
        match chosen {
            Some(stack) => {
                self.stack = stack;
                true
            }
            None => {
                self.goto_parent();
                false
            }
        }
    }

    /// Moves to the smallest node spanning `start..end`. Returns `false`
    /// without moving when the range is not inside the current node.
    pub fn goto_descendant_for_byte_range(&mut self, start: usize, end: usize) -> bool {
        let node = self.node();
        if start < node.start_byte() || end > node.end_byte() || start > end {
            return false;
        }
        while self.goto_child_for_byte_range(start, end) {}
        true
    }

    /// Pushes the first visible node among the raw children of the top entry
    /// from `index` on, looking through hidden children.
    fn enter(&mut self, index: usize, mut position: Length) -> bool {
        let parent = self.top();
        for (index, child) in parent.green.children().iter().enumerate().skip(index) {
            self.stack.push(Entry { green: child, position, index });
            if child.is_visible() || self.enter(0, position) {
                return true;
            }
            self.stack.pop();
            position += child.total();
        }
        false
    }

    fn top(&self) -> Entry<'tree> {
        self.stack.last().copied().unwrap_or(self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent<'tree> {
    Enter(Node<'tree>),
    Leave(Node<'tree>),
}

/// Preorder traversal of the visible nodes below a starting node.
pub struct Preorder<'tree> {
    cursor: TreeCursor<'tree>,
    entering: bool,
    descended: bool,
    finished: bool,
}

impl<'tree> Preorder<'tree> {
    pub(crate) fn new(start: Node<'tree>) -> Self {
        Self { cursor: start.walk(), entering: true, descended: false, finished: false }
    }

    /// Skips the children of the node that was just entered.
    pub fn skip_subtree(&mut self) {
        if self.descended {
            self.cursor.goto_parent();
            self.entering = false;
            self.descended = false;
        }
    }
}

impl<'tree> Iterator for Preorder<'tree> {
    type Item = WalkEvent<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let node = self.cursor.node();
        if self.entering {
            self.descended = self.cursor.goto_first_child();
            self.entering = self.descended;
            return Some(WalkEvent::Enter(node));
        }

        self.descended = false;
        if self.cursor.depth() == 0 {
            self.finished = true;
        } else if self.cursor.goto_next_sibling() {
            self.entering = true;
        } else {
            self.cursor.goto_parent();
        }
        Some(WalkEvent::Leave(node))
    }
}
