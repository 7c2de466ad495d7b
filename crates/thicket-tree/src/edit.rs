use thicket_span::{Length, Point, TextSize};
use thiserror::Error;

use crate::green::GreenNodeData;
use crate::{GreenNode, NodeFlags, Tree};

/// A single text replacement, in coordinates before and after the change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(
        "invalid edit range: start {start}, old end {old_end}, new end {new_end} for a tree of {len} bytes"
    )]
    InvalidEditRange { start: usize, old_end: usize, new_end: usize, len: usize },
}

impl InputEdit {
    fn start(&self) -> Length {
        Length::new(TextSize::new(self.start_byte as u32), self.start_point)
    }

    fn old_end(&self) -> Length {
        Length::new(TextSize::new(self.old_end_byte as u32), self.old_end_point)
    }

    fn new_end(&self) -> Length {
        Length::new(TextSize::new(self.new_end_byte as u32), self.new_end_point)
    }

    /// Maps a position in the old text to the new one. Positions inside the
    /// replaced range collapse onto its new end.
    pub fn map(&self, position: Length) -> Length {
        if position.bytes <= self.start().bytes {
            position
        } else if position.bytes >= self.old_end().bytes {
            self.new_end() + (position - self.old_end())
        } else {
            self.new_end()
        }
    }

    fn validate(&self, len: usize) -> Result<(), EditError> {
        let ordered = self.start_byte <= self.old_end_byte
            && self.old_end_byte <= len
            && self.start_byte <= self.new_end_byte
            && self.start_point <= self.old_end_point
            && self.start_point <= self.new_end_point;
        if ordered {
            Ok(())
        } else {
            Err(EditError::InvalidEditRange {
                start: self.start_byte,
                old_end: self.old_end_byte,
                new_end: self.new_end_byte,
                len,
            })
        }
    }
}

impl Tree {
    /// Applies `edit`, returning a tree whose positions match the new text.
    ///
    /// Nodes whose text or lexical lookahead overlaps the edit are copied and
    /// marked as changed; every other node is shared with `self`.
    pub fn edit(&self, edit: &InputEdit) -> Result<Self, EditError> {
        edit.validate(self.len().to_usize())?;
        let root = edit_node(self.root_green(), Length::ZERO, edit, Spine::Last(self.len()));
        tracing::debug!(
            start = edit.start_byte,
            old_end = edit.old_end_byte,
            new_end = edit.new_end_byte,
            "edited tree"
        );
        Ok(Self::new(root, self.language().clone()))
    }
}

/// Whether a node is the last one along the right edge of the tree, which
/// owns text appended after the old end.
#[derive(Clone, Copy)]
enum Spine {
    Last(Length),
    Inner,
}

fn edit_node(green: &GreenNode, position: Length, edit: &InputEdit, spine: Spine) -> GreenNode {
    let start = edit.start_byte as u32;
    let old_end = edit.old_end_byte as u32;
    let padded_start = u32::from(position.bytes);
    let end = u32::from((position + green.total()).bytes);
    let examined_end = end + green.lookahead_bytes();
    let appended = matches!(spine, Spine::Last(len) if u32::from(len.bytes) == start);

    let before = examined_end <= start && !appended;
    let after = padded_start > start && padded_start >= old_end;
    if before || after {
        return green.clone();
    }

    let mut data = green.data().shallow_clone();
    data.flags |= NodeFlags::HAS_CHANGES;
    if green.is_leaf() {
        let content_start = position + green.padding();
        let new_start = edit.map(position);
        let new_end = if appended { edit.new_end() } else { edit.map(position + green.total()) };
        // Zero-width leaves keep their width and take the new text as padding.
        let new_content_start = if appended && green.size().is_empty() {
            new_end
        } else {
            edit.map(content_start)
        };
        data.padding = new_content_start - new_start;
        data.size = new_end - new_content_start;
    } else {
        let mut child_position = position;
        let last = green.children().len().saturating_sub(1);
        let children: Vec<GreenNode> = green
            .children()
            .iter()
            .enumerate()
            .map(|(i, child)| {
                let child_spine = if i == last { spine } else { Spine::Inner };
                let edited = edit_node(child, child_position, edit, child_spine);
                child_position += child.total();
                edited
            })
            .collect();
        data.children = children.into_boxed_slice();
        data.resize();
    }
    GreenNode::from_data(data)
}

impl GreenNodeData {
    /// Recomputes padding and size after children changed length.
    fn resize(&mut self) {
        let total: Length = self.children.iter().map(GreenNode::total).sum();
        self.padding = self.children.first().map_or(Length::ZERO, GreenNode::padding);
        self.size = total - self.padding;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insertion(at: usize, text: &[u8]) -> InputEdit {
        let point = Point::new(0, at as u32);
        let inserted = Length::of(text);
        InputEdit {
            start_byte: at,
            old_end_byte: at,
            new_end_byte: at + text.len(),
            start_point: point,
            old_end_point: point,
            new_end_point: (Length::new(TextSize::new(at as u32), point) + inserted).extent,
        }
    }

    #[test]
    fn positions_map_around_the_edit() {
        let edit = InputEdit {
            start_byte: 2,
            old_end_byte: 5,
            new_end_byte: 3,
            start_point: Point::new(0, 2),
            old_end_point: Point::new(0, 5),
            new_end_point: Point::new(0, 3),
        };
        let at = |byte: u32| Length::new(TextSize::new(byte), Point::new(0, byte));
        assert_eq!(edit.map(at(1)), at(1));
        assert_eq!(edit.map(at(2)), at(2));
        assert_eq!(edit.map(at(4)), at(3));
        assert_eq!(edit.map(at(7)), at(5));
    }

    #[test]
    fn insertion_grows_points() {
        let edit = insertion(1, b"a\nbc");
        assert_eq!(edit.new_end_point, Point::new(1, 2));
    }

    #[test]
    fn backwards_edit_is_rejected() {
        let edit = InputEdit {
            start_byte: 4,
            old_end_byte: 2,
            new_end_byte: 4,
            start_point: Point::new(0, 4),
            old_end_point: Point::new(0, 2),
            new_end_point: Point::new(0, 4),
        };
        assert_eq!(
            edit.validate(10),
            Err(EditError::InvalidEditRange { start: 4, old_end: 2, new_end: 4, len: 10 })
        );
        assert!(insertion(11, b"x").validate(10).is_err());
        assert!(insertion(10, b"x").validate(10).is_ok());
    }
}
