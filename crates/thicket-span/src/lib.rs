//! Byte and row/column positions shared by every stage of the engine.
//!
//! Offsets are byte based. Rows are separated by `\n` and columns count bytes
//! since the last newline, so no encoding assumptions leak into positions.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

pub use text_size::{TextRange, TextSize};

/// A zero-based row/column coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const ZERO: Self = Self { row: 0, column: 0 };

    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// The size of a span of text, both in bytes and as a row/column extent.
///
/// Adding lengths behaves like concatenating the text they measure: when the
/// right-hand side crosses a newline its column replaces ours, otherwise the
/// columns add up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Length {
    pub bytes: TextSize,
    pub extent: Point,
}

impl Length {
    pub const ZERO: Self = Self { bytes: TextSize::new(0), extent: Point::ZERO };

    pub const fn new(bytes: TextSize, extent: Point) -> Self {
        Self { bytes, extent }
    }

    /// Measures `text`.
    pub fn of(text: &[u8]) -> Self {
        let mut extent = Point::ZERO;
        for &byte in text {
            if byte == b'\n' {
                extent.row += 1;
                extent.column = 0;
            } else {
                extent.column += 1;
            }
        }
        Self { bytes: TextSize::new(text.len() as u32), extent }
    }

    /// Measures the first `len` bytes of `text` after `start`.
    pub fn of_range(text: &[u8], start: usize, len: usize) -> Self {
        Self::of(&text[start..start + len])
    }

    pub fn is_empty(self) -> bool {
        self.bytes == TextSize::new(0)
    }

    /// Returns `self - other`, clamped at zero when `other` is larger.
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.bytes >= self.bytes { Self::ZERO } else { self - other }
    }

    pub fn to_usize(self) -> usize {
        u32::from(self.bytes) as usize
    }
}

impl Add for Length {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let extent = if rhs.extent.row > 0 {
            Point::new(self.extent.row + rhs.extent.row, rhs.extent.column)
        } else {
            Point::new(self.extent.row, self.extent.column + rhs.extent.column)
        };
        Self { bytes: self.bytes + rhs.bytes, extent }
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Length {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let extent = if self.extent.row > rhs.extent.row {
            Point::new(self.extent.row - rhs.extent.row, self.extent.column)
        } else {
            Point::new(0, self.extent.column.saturating_sub(rhs.extent.column))
        };
        Self { bytes: self.bytes - rhs.bytes, extent }
    }
}

impl std::iter::Sum for Length {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_text() {
        let length = Length::of(b"ab\ncde\nf");
        assert_eq!(length.bytes, TextSize::new(8));
        assert_eq!(length.extent, Point::new(2, 1));
    }

    #[test]
    fn add_matches_concatenation() {
        let left = Length::of(b"foo\nba");
        let right = Length::of(b"r baz");
        assert_eq!(left + right, Length::of(b"foo\nbar baz"));

        let right = Length::of(b"r\nq");
        assert_eq!(left + right, Length::of(b"foo\nbar\nq"));
    }

    #[test]
    fn sub_undoes_add() {
        let prefix = Length::of(b"x\nyy");
        let whole = Length::of(b"x\nyyzz\nw");
        assert_eq!(whole - prefix, Length::of(b"zz\nw"));

        let whole = Length::of(b"x\nyyzz");
        assert_eq!(whole - prefix, Length::of(b"zz"));
        assert_eq!(prefix.saturating_sub(whole), Length::ZERO);
    }
}
