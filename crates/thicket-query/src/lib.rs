//! Structural search over syntax trees.
//!
//! A query is a list of S-expression patterns over node kinds. Matching a
//! pattern against a node checks its kind, then looks for its child patterns
//! among the node's children, in order but not necessarily adjacent.

mod pattern;


use std::ops::Range;

use smallvec::SmallVec;
use thicket_grammar::Language;
use thicket_tree::{Node, WalkEvent};
use thiserror::Error;

use crate::pattern::{Matcher, Pattern, PatternParser};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct QueryError {
    pub offset: usize,
    pub kind: QueryErrorKind,
}

impl QueryError {
    pub(crate) fn new(offset: usize, kind: QueryErrorKind) -> Self {
        Self { offset, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryErrorKind {
    #[error("invalid query syntax")]
    Syntax,
    #[error("unknown node type `{0}`")]
    NodeType(String),
    #[error("unclosed parenthesis")]
    UnclosedParen,
    #[error("capture without a name")]
    InvalidCapture,
}

/// Compiled patterns for one language.
#[derive(Debug, Clone)]
pub struct Query {
    patterns: Vec<Pattern>,
    capture_names: Vec<String>,
}

impl Query {
    pub fn new(language: &Language, source: &str) -> Result<Self, QueryError> {
        let (patterns, capture_names) = PatternParser::new(language, source).parse()?;
        Ok(Self { patterns, capture_names })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Capture names by capture index.
    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }

    pub fn capture_index_for_name(&self, name: &str) -> Option<u32> {
        self.capture_names.iter().position(|capture| capture == name).map(|index| index as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCapture<'tree> {
    pub index: u32,
    pub node: Node<'tree>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch<'tree> {
    pub pattern_index: usize,
    pub captures: Vec<QueryCapture<'tree>>,
}

/// Runs queries over a tree.
#[derive(Debug, Clone, Default)]
pub struct QueryCursor {
    byte_range: Option<Range<usize>>,
}

impl QueryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only nodes overlapping `range` are tried as match roots.
    pub fn set_byte_range(&mut self, range: Range<usize>) -> &mut Self {
        self.byte_range = Some(range);
        self
    }

    /// Every match below and including `node`, in preorder of the matched
    /// nodes and then in pattern order.
    pub fn matches<'tree>(&mut self, query: &Query, node: Node<'tree>) -> Vec<QueryMatch<'tree>> {
        let mut matches = Vec::new();
        let mut preorder = node.preorder();
        while let Some(event) = preorder.next() {
            let WalkEvent::Enter(node) = event else {
                continue;
            };
            if let Some(range) = &self.byte_range
                && !overlaps(range, &node.byte_range())
            {
                preorder.skip_subtree();
                continue;
            }

            for (pattern_index, pattern) in query.patterns.iter().enumerate() {
                let mut captures = Vec::new();
                if match_node(pattern, node, &mut captures) {
                    matches.push(QueryMatch { pattern_index, captures });
                }
            }
        }
        tracing::trace!(patterns = query.patterns.len(), matches = matches.len(), "ran query");
        matches
    }
}

fn overlaps(range: &Range<usize>, node: &Range<usize>) -> bool {
    if node.is_empty() {
        return range.start <= node.start && node.start <= range.end;
    }
    node.start < range.end && range.start < node.end
}

fn accepts(matcher: &Matcher, node: Node<'_>) -> bool {
    match matcher {
        Matcher::Any => true,
        Matcher::AnyNamed => node.is_named(),
        Matcher::Symbol(symbol) => node.symbol() == *symbol,
        Matcher::Error => node.is_error(),
        Matcher::Missing(symbol) => node.is_missing() && symbol.is_none_or(|symbol| node.symbol() == symbol),
    }
}

fn match_node<'tree>(pattern: &Pattern, node: Node<'tree>, captures: &mut Vec<QueryCapture<'tree>>) -> bool {
    if !accepts(&pattern.matcher, node) {
        return false;
    }
    let mark = captures.len();
    if let Some(index) = pattern.capture {
        captures.push(QueryCapture { index, node });
    }
    if pattern.children.is_empty() {
        return true;
    }

    let children: SmallVec<[Node<'tree>; 8]> = node.children().collect();
    if match_children(&pattern.children, &children, captures) {
        return true;
    }
    captures.truncate(mark);
    false
}

/// Matches `patterns` against a subsequence of `children`, trying the
/// leftmost placement first.
fn match_children<'tree>(
    patterns: &[Pattern],
    children: &[Node<'tree>],
    captures: &mut Vec<QueryCapture<'tree>>,
) -> bool {
    let Some((first, rest)) = patterns.split_first() else {
        return true;
    };
    for (index, &child) in children.iter().enumerate() {
        if first.named_only && !child.is_named() {
            continue;
        }
        let mark = captures.len();
        if match_node(first, child, captures) && match_children(rest, &children[index + 1..], captures) {
            return true;
        }
        captures.truncate(mark);
    }
    false
}
