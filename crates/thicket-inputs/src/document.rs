use std::ops::Range;

use camino::{Utf8Path, Utf8PathBuf};
use line_index::LineIndex;
use thicket_span::{Length, Point, TextSize};
use thicket_tree::InputEdit;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("range {start}..{end} is outside a document of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// A named text buffer that reports every change as an [`InputEdit`].
#[derive(Debug, Clone)]
pub struct Document {
    path: Utf8PathBuf,
    text: String,
    line_index: LineIndex,
}

impl Document {
    pub fn new(path: impl Into<Utf8PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_index = LineIndex::new(&text);
        Self { path: path.into(), text, line_index }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Row and byte column of `offset`.
    pub fn point(&self, offset: usize) -> Point {
        point(&self.line_index, offset)
    }

    /// Replaces `range` with `replacement` and describes the change.
    pub fn replace(&mut self, range: Range<usize>, replacement: &str) -> Result<InputEdit, DocumentError> {
        let Range { start, end } = range;
        if start > end || end > self.text.len() {
            return Err(DocumentError::OutOfBounds { start, end, len: self.text.len() });
        }
        if let Some(offset) = [start, end].into_iter().find(|&offset| !self.text.is_char_boundary(offset)) {
            return Err(DocumentError::NotCharBoundary(offset));
        }

        let edit = edit_between(&self.line_index, &self.text, start, end, replacement);
        self.text.replace_range(start..end, replacement);
        self.line_index = LineIndex::new(&self.text);
        Ok(edit)
    }
}

fn point(index: &LineIndex, offset: usize) -> Point {
    let position = index.line_col(TextSize::new(offset as u32));
    Point::new(position.line, position.col)
}

fn edit_between(
    index: &LineIndex,
    text: &str,
    start: usize,
    end: usize,
    replacement: &str,
) -> InputEdit {
    let start = start.min(text.len());
    let end = end.clamp(start, text.len());
    let start_point = point(index, start);
    let inserted = Length::new(TextSize::new(start as u32), start_point) + Length::of(replacement.as_bytes());
    InputEdit {
        start_byte: start,
        old_end_byte: end,
        new_end_byte: start + replacement.len(),
        start_point,
        old_end_point: point(index, end),
        new_end_point: inserted.extent,
    }
}
