use std::fmt;
use std::ops::Range;

use thicket_grammar::{Language, Symbol};
use thicket_span::{Length, Point};

use crate::{GreenNode, Preorder, TreeCursor};

/// A parsed syntax tree.
///
/// Cheap to clone and safe to share between threads. Editing produces a new
/// tree that shares every untouched subtree with this one.
#[derive(Clone)]
pub struct Tree {
    root: GreenNode,
    language: Language,
}

impl Tree {
    pub fn new(root: GreenNode, language: Language) -> Self {
        Self { root, language }
    }

    pub fn root_node(&self) -> Node<'_> {
        Node { tree: self, green: &self.root, position: Length::ZERO, is_root: true }
    }

    pub fn root_green(&self) -> &GreenNode {
        &self.root
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Length of the text the tree was parsed from.
    pub fn len(&self) -> Length {
        self.root.total()
    }

    pub fn is_empty(&self) -> bool {
        self.root.total().is_empty()
    }

    pub fn walk(&self) -> TreeCursor<'_> {
        self.root_node().walk()
    }

    pub fn to_sexp(&self) -> String {
        self.root_node().to_sexp()
    }
}

/// The full dump with ranges, one visible node per line.
impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::dump::write_tree(self.root_node(), f)
    }
}

/// A positioned view of a visible node.
#[derive(Clone, Copy)]
pub struct Node<'tree> {
    pub(crate) tree: &'tree Tree,
    pub(crate) green: &'tree GreenNode,
    /// Absolute position where the node's padding starts.
    pub(crate) position: Length,
    pub(crate) is_root: bool,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.green.ptr_eq(other.green) && self.position == other.position
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind(), self.byte_range())
    }
}

impl<'tree> Node<'tree> {
    pub fn tree(&self) -> &'tree Tree {
        self.tree
    }

    pub fn green(&self) -> &'tree GreenNode {
        self.green
    }

    pub fn symbol(&self) -> Symbol {
        self.green.symbol()
    }

    pub fn kind(&self) -> &'tree str {
        self.tree.language.symbol_name(self.green.symbol())
    }

    pub fn is_named(&self) -> bool {
        self.green.is_named()
    }

    pub fn is_extra(&self) -> bool {
        self.green.is_extra()
    }

    pub fn is_error(&self) -> bool {
        self.green.is_error()
    }

    pub fn is_missing(&self) -> bool {
        self.green.is_missing()
    }

    pub fn has_error(&self) -> bool {
        self.green.has_error()
    }

    pub fn has_changes(&self) -> bool {
        self.green.has_changes()
    }

    fn start(&self) -> Length {
        if self.is_root { Length::ZERO } else { self.position + self.green.padding() }
    }

    fn end(&self) -> Length {
        self.position + self.green.total()
    }

    pub fn start_byte(&self) -> usize {
        self.start().to_usize()
    }

    pub fn end_byte(&self) -> usize {
        self.end().to_usize()
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte()..self.end_byte()
    }

    pub fn start_point(&self) -> Point {
        self.start().extent
    }

    pub fn end_point(&self) -> Point {
        self.end().extent
    }

    /// Identity that is stable across tree versions for shared subtrees.
    pub fn id(&self) -> usize {
        self.green.id()
    }

    pub fn utf8_text<'text>(&self, source: &'text [u8]) -> Result<&'text str, std::str::Utf8Error> {
        std::str::from_utf8(&source[self.byte_range()])
    }

    pub fn child_count(&self) -> usize {
        self.green.visible_child_count()
    }

    pub fn named_child_count(&self) -> usize {
        self.green.named_child_count()
    }

    pub fn children(&self) -> Children<'tree> {
        Children::new(*self)
    }

    pub fn named_children(&self) -> impl Iterator<Item = Node<'tree>> + use<'tree> {
        self.children().filter(Node::is_named)
    }

    pub fn child(&self, index: usize) -> Option<Node<'tree>> {
        self.children().nth(index)
    }

    pub fn named_child(&self, index: usize) -> Option<Node<'tree>> {
        self.named_children().nth(index)
    }

    pub fn walk(&self) -> TreeCursor<'tree> {
        TreeCursor::new(*self)
    }

    pub fn preorder(&self) -> Preorder<'tree> {
        Preorder::new(*self)
    }

    /// Finds the parent by descending from the root.
    pub fn parent(&self) -> Option<Node<'tree>> {
        if self.is_root {
            return None;
        }
        find_parent(self.tree.root_node(), self)
    }

    pub fn next_sibling(&self) -> Option<Node<'tree>> {
        let mut siblings = self.parent()?.children();
        siblings.by_ref().find(|sibling| sibling == self)?;
        siblings.next()
    }

    pub fn prev_sibling(&self) -> Option<Node<'tree>> {
        let mut previous = None;
        for sibling in self.parent()?.children() {
            if sibling == *self {
                return previous;
            }
            previous = Some(sibling);
        }
        None
    }

    /// The smallest node inside this one that spans `start..end`.
    pub fn descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'tree>> {
        let mut cursor = self.walk();
        cursor.goto_descendant_for_byte_range(start, end).then(|| cursor.node())
    }

    /// The smallest named node inside this one that spans `start..end`.
    pub fn named_descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'tree>> {
        if start < self.start_byte() || end > self.end_byte() {
            return None;
        }
        let mut cursor = self.walk();
        let mut found = self.is_named().then_some(*self);
        while cursor.goto_child_for_byte_range(start, end) {
            let node = cursor.node();
            if node.is_named() {
                found = Some(node);
            }
        }
        found
    }

    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        crate::dump::write_sexp(*self, &mut out);
        out
    }
}

fn find_parent<'tree>(candidate: Node<'tree>, target: &Node<'tree>) -> Option<Node<'tree>> {
    let target_end = target.end();
    for child in candidate.children() {
        if child == *target {
            return Some(candidate);
        }
        let contains = child.position.bytes <= target.position.bytes
            && target_end.bytes <= child.end().bytes;
        if contains
            && !child.green.is_leaf()
            && let Some(parent) = find_parent(child, target)
        {
            return Some(parent);
        }
    }
    None
}

/// Iterates the visible children of a node, flattening hidden ones.
pub struct Children<'tree> {
    tree: &'tree Tree,
    /// Hidden nodes being flattened, with the index of their next child and
    /// the position where it starts.
    stack: Vec<(&'tree GreenNode, usize, Length)>,
}

impl<'tree> Children<'tree> {
    fn new(node: Node<'tree>) -> Self {
        Self { tree: node.tree, stack: vec![(node.green, 0, node.position)] }
    }
}

impl<'tree> Iterator for Children<'tree> {
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let &mut (green, ref mut index, ref mut position) = self.stack.last_mut()?;
            let Some(child) = green.children().get(*index) else {
                self.stack.pop();
                continue;
            };
            let child_position = *position;
            *index += 1;
            *position += child.total();

            if child.is_visible() {
                return Some(Node {
                    tree: self.tree,
                    green: child,
                    position: child_position,
                    is_root: false,
                });
            }
            if !child.is_leaf() {
                self.stack.push((child, 0, child_position));
            }
        }
    }
}
