//! Syntax errors of a parsed tree as renderable diagnostics.

use std::fmt::Display;

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
pub use text_size::TextRange;
use text_size::TextSize;
use thicket_tree::{Node, Tree, WalkEvent};


/// Longest excerpt of skipped text quoted in a message.
const EXCERPT_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    message: String,
    range: TextRange,
}

impl Diagnostic {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn error(message: impl Into<String>, range: TextRange) -> Self {
        Self { message: message.into(), range }
    }

    pub fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
    ) -> impl Display + 'a {
        let message = Level::Error.title(&self.message).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(Level::Error.span(self.range.into()).label("here"))
                .fold(true),
        );
        renderer.render(message)
    }
}

/// Reports every `ERROR` and `MISSING` node of `tree` in text order.
///
/// An error node is reported once, nothing inside it is.
pub fn diagnostics(tree: &Tree, text: &[u8]) -> Vec<Diagnostic> {
    let root = tree.root_node();
    if !root.has_error() {
        return Vec::new();
    }

    let mut diagnostics = Vec::new();
    let mut preorder = root.preorder();
    while let Some(event) = preorder.next() {
        let WalkEvent::Enter(node) = event else {
            continue;
        };
        if node.is_missing() {
            diagnostics.push(Diagnostic::error(format!("missing `{}`", node.kind()), range(node)));
        } else if node.is_error() {
            diagnostics.push(unexpected(node, text));
            preorder.skip_subtree();
        } else if !node.has_error() {
            preorder.skip_subtree();
        }
    }

    if diagnostics.is_empty() {
        diagnostics.push(Diagnostic::error("syntax error", range(root)));
    }
    diagnostics
}

fn unexpected(node: Node<'_>, text: &[u8]) -> Diagnostic {
    let skipped = text.get(node.byte_range()).map(String::from_utf8_lossy).unwrap_or_default();
    let skipped = skipped.trim();
    let message = match skipped.lines().next() {
        Some(line) if !line.is_empty() => format!("unexpected `{}`", excerpt(line)),
        _ => "syntax error".to_owned(),
    };
    Diagnostic::error(message, range(node))
}

fn excerpt(line: &str) -> String {
    match line.char_indices().nth(EXCERPT_LEN) {
        Some((end, _)) => format!("{}...", &line[..end]),
        None => line.to_owned(),
    }
}

fn range(node: Node<'_>) -> TextRange {
    let range = node.byte_range();
    TextRange::new(TextSize::new(range.start as u32), TextSize::new(range.end as u32))
}
