use std::cell::Cell;

use thicket_grammar::ScanCursor;

pub(crate) const EOF_CHAR: char = '\0';

/// Decodes the character at the start of `bytes`. Invalid UTF-8 decodes as a
/// single replacement character one byte wide.
pub(crate) fn decode_char(bytes: &[u8]) -> Option<(char, usize)> {
    let &first = bytes.first()?;
    let width = match first {
        0x00..=0x7f => return Some((first as char, 1)),
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Some((char::REPLACEMENT_CHARACTER, 1)),
    };
    match bytes.get(..width).map(std::str::from_utf8) {
        Some(Ok(text)) => text.chars().next().map(|ch| (ch, width)),
        _ => Some((char::REPLACEMENT_CHARACTER, 1)),
    }
}

/// The cursor an external scanner drives.
///
/// Besides moving through the text it remembers the furthest byte the
/// scanner looked at, which becomes part of the token's lookahead.
pub(crate) struct Cursor<'text> {
    text: &'text [u8],
    pos: usize,
    token_start: usize,
    marked_end: Option<usize>,
    examined: Cell<usize>,
}

impl<'text> Cursor<'text> {
    pub(crate) fn new(text: &'text [u8], pos: usize) -> Self {
        Self { text, pos, token_start: pos, marked_end: None, examined: Cell::new(pos) }
    }

    pub(crate) fn token_start(&self) -> usize {
        self.token_start
    }

    pub(crate) fn token_end(&self) -> usize {
        self.marked_end.unwrap_or(self.pos).max(self.token_start)
    }

    pub(crate) fn examined(&self) -> usize {
        self.examined.get()
    }

    fn peek(&self) -> Option<(char, usize)> {
        let peeked = decode_char(&self.text[self.pos..]);
        let end = self.pos + peeked.map_or(1, |(_, width)| width);
        self.examined.set(self.examined.get().max(end));
        peeked
    }
}

impl ScanCursor for Cursor<'_> {
    fn lookahead(&self) -> char {
        self.peek().map_or(EOF_CHAR, |(ch, _)| ch)
    }

    fn advance(&mut self, skip: bool) {
        let Some((_, width)) = self.peek() else {
            return;
        };
        self.pos += width;
        if skip && self.marked_end.is_none() {
            self.token_start = self.pos;
        }
    }

    fn mark_end(&mut self) {
        self.marked_end = Some(self.pos);
    }

    fn column(&self) -> u32 {
        let line_start = self.text[..self.pos]
            .iter()
            .rposition(|&byte| byte == b'\n')
            .map_or(0, |newline| newline + 1);
        (self.pos - line_start) as u32
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }
}
