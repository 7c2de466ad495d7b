//! Byte-oriented regular expressions used by lexical rules.
//!
//! The dialect covers what token definitions need: literals, `.`, classes,
//! the `\d \w \s` shorthands, groups, alternation and the usual quantifiers.
//! Anchors, look-around and Unicode properties are rejected.

use std::fmt;

use thiserror::Error;

const MAX_REPETITION: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct PatternError {
    pub offset: usize,
    pub kind: PatternErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternErrorKind {
    UnexpectedEnd,
    UnclosedGroup,
    UnclosedClass,
    UnmatchedParen,
    EmptyClass,
    InvalidRange,
    InvalidEscape(char),
    InvalidRepetition,
    NothingToRepeat,
    Unsupported(&'static str),
}

impl fmt::Display for PatternErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => f.write_str("unexpected end of pattern"),
            Self::UnclosedGroup => f.write_str("unclosed group"),
            Self::UnclosedClass => f.write_str("unclosed character class"),
            Self::UnmatchedParen => f.write_str("unmatched `)`"),
            Self::EmptyClass => f.write_str("character class matches nothing"),
            Self::InvalidRange => f.write_str("invalid character range"),
            Self::InvalidEscape(ch) => write!(f, "invalid escape `\\{ch}`"),
            Self::InvalidRepetition => f.write_str("invalid repetition bounds"),
            Self::NothingToRepeat => f.write_str("quantifier without operand"),
            Self::Unsupported(what) => write!(f, "unsupported {what}"),
        }
    }
}

/// Parsed pattern. Everything is expressed over bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Hir {
    Empty,
    Literal(Vec<u8>),
    /// Sorted, non-overlapping inclusive byte ranges.
    Class(Vec<(u8, u8)>),
    Concat(Vec<Hir>),
    Alternation(Vec<Hir>),
    Repeat { hir: Box<Hir>, min: u32, max: Option<u32> },
}

pub(crate) fn parse(pattern: &str, case_insensitive: bool) -> Result<Hir, PatternError> {
    let mut parser = Parser {
        chars: pattern.char_indices().collect(),
        pos: 0,
        len: pattern.len(),
        case_insensitive,
    };
    let hir = parser.alternation()?;
    match parser.peek() {
        None => Ok(hir),
        Some(')') => Err(parser.error(PatternErrorKind::UnmatchedParen)),
        Some(_) => Err(parser.error(PatternErrorKind::UnexpectedEnd)),
    }
}

/// A class member before it is lowered to bytes.
enum ClassItem {
    Range(char, char),
    Bytes(Vec<(u8, u8)>),
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
    case_insensitive: bool,
}

impl Parser {
    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |&(offset, _)| offset)
    }

    fn error(&self, kind: PatternErrorKind) -> PatternError {
        PatternError { offset: self.offset(), kind }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, ch)| ch)
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.pos + 1).map(|&(_, ch)| ch)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn alternation(&mut self) -> Result<Hir, PatternError> {
        let mut branches = vec![self.concat()?];
        while self.eat('|') {
            branches.push(self.concat()?);
        }
        Ok(if branches.len() == 1 { branches.remove(0) } else { Hir::Alternation(branches) })
    }

    fn concat(&mut self) -> Result<Hir, PatternError> {
        let mut items = Vec::new();
        while let Some(ch) = self.peek() {
            if ch == '|' || ch == ')' {
                break;
            }
            let atom = self.atom()?;
            items.push(self.quantified(atom)?);
        }
        Ok(match items.len() {
            0 => Hir::Empty,
            1 => items.remove(0),
            _ => Hir::Concat(items),
        })
    }

    fn quantified(&mut self, mut hir: Hir) -> Result<Hir, PatternError> {
        loop {
            let (min, max) = match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    (0, None)
                }
                Some('+') => {
                    self.pos += 1;
                    (1, None)
                }
                Some('?') => {
                    self.pos += 1;
                    (0, Some(1))
                }
                Some('{') if self.peek_second().is_some_and(|ch| ch.is_ascii_digit()) => {
                    self.pos += 1;
                    self.bounds()?
                }
                _ => return Ok(hir),
            };
            // Lazy markers do not change longest-match semantics.
            self.eat('?');
            hir = Hir::Repeat { hir: Box::new(hir), min, max };
        }
    }

    fn bounds(&mut self) -> Result<(u32, Option<u32>), PatternError> {
        let min = self.number()?;
        let max = if self.eat(',') {
            if self.peek() == Some('}') { None } else { Some(self.number()?) }
        } else {
            Some(min)
        };
        if !self.eat('}') {
            return Err(self.error(PatternErrorKind::InvalidRepetition));
        }
        if max.is_some_and(|max| max < min) || min > MAX_REPETITION || max > Some(MAX_REPETITION)
        {
            return Err(self.error(PatternErrorKind::InvalidRepetition));
        }
        Ok((min, max))
    }

    fn number(&mut self) -> Result<u32, PatternError> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(digit) = self.peek().and_then(|ch| ch.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(digit);
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(PatternErrorKind::InvalidRepetition));
        }
        Ok(value)
    }

    fn atom(&mut self) -> Result<Hir, PatternError> {
        let Some(ch) = self.bump() else {
            return Err(self.error(PatternErrorKind::UnexpectedEnd));
        };
        match ch {
            '(' => {
                if self.peek() == Some('?') {
                    if self.peek_second() == Some(':') {
                        self.pos += 2;
                    } else {
                        return Err(self.error(PatternErrorKind::Unsupported("group flag")));
                    }
                }
                let inner = self.alternation()?;
                if !self.eat(')') {
                    return Err(self.error(PatternErrorKind::UnclosedGroup));
                }
                Ok(inner)
            }
            '[' => self.class(),
            '.' => Ok(any_char_except_newline()),
            '\\' => {
                let item = self.escape()?;
                Ok(match item {
                    ClassItem::Range(ch, _) => self.literal(ch),
                    ClassItem::Bytes(ranges) => Hir::Class(ranges),
                })
            }
            '*' | '+' | '?' => Err(self.error(PatternErrorKind::NothingToRepeat)),
            '^' | '$' => Err(self.error(PatternErrorKind::Unsupported("anchor"))),
            ch => Ok(self.literal(ch)),
        }
    }

    fn literal(&self, ch: char) -> Hir {
        if self.case_insensitive && ch.is_ascii_alphabetic() {
            let lower = ch.to_ascii_lowercase() as u8;
            let upper = ch.to_ascii_uppercase() as u8;
            return Hir::Class(normalize(vec![(lower, lower), (upper, upper)]));
        }
        let mut buf = [0; 4];
        Hir::Literal(ch.encode_utf8(&mut buf).as_bytes().to_vec())
    }

    /// Parses the escape after a backslash. Single characters come back as a
    /// degenerate range so that classes can use them as range endpoints.
    fn escape(&mut self) -> Result<ClassItem, PatternError> {
        let Some(ch) = self.bump() else {
            return Err(self.error(PatternErrorKind::UnexpectedEnd));
        };
        let single = |ch: char| -> Result<ClassItem, PatternError> { Ok(ClassItem::Range(ch, ch)) };
        match ch {
            'd' => Ok(ClassItem::Bytes(DIGIT.to_vec())),
            'w' => Ok(ClassItem::Bytes(WORD.to_vec())),
            's' => Ok(ClassItem::Bytes(SPACE.to_vec())),
            'D' => Ok(ClassItem::Bytes(complement(DIGIT))),
            'W' => Ok(ClassItem::Bytes(complement(WORD))),
            'S' => Ok(ClassItem::Bytes(complement(SPACE))),
            'n' => single('\n'),
            'r' => single('\r'),
            't' => single('\t'),
            'f' => single('\x0C'),
            'v' => single('\x0B'),
            '0' => single('\0'),
            'x' => {
                let value = self.hex_digits(2)?;
                Ok(ClassItem::Bytes(vec![(value as u8, value as u8)]))
            }
            'u' => {
                let value =
                    if self.eat('{') { self.hex_until_brace()? } else { self.hex_digits(4)? };
                match char::from_u32(value) {
                    Some(ch) => single(ch),
                    None => Err(self.error(PatternErrorKind::InvalidEscape('u'))),
                }
            }
            'b' | 'B' | 'A' | 'z' => Err(self.error(PatternErrorKind::Unsupported("assertion"))),
            'p' | 'P' => Err(self.error(PatternErrorKind::Unsupported("Unicode class"))),
            ch if ch.is_ascii_alphanumeric() => Err(self.error(PatternErrorKind::InvalidEscape(ch))),
            ch => single(ch),
        }
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, PatternError> {
        let mut value = 0;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|ch| ch.to_digit(16))
                .ok_or_else(|| self.error(PatternErrorKind::InvalidEscape('x')))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn hex_until_brace(&mut self) -> Result<u32, PatternError> {
        let mut value: u32 = 0;
        loop {
            match self.bump() {
                Some('}') => return Ok(value),
                Some(ch) => {
                    let digit = ch
                        .to_digit(16)
                        .ok_or_else(|| self.error(PatternErrorKind::InvalidEscape('u')))?;
                    value = value.saturating_mul(16).saturating_add(digit);
                }
                None => return Err(self.error(PatternErrorKind::UnexpectedEnd)),
            }
        }
    }

    fn class(&mut self) -> Result<Hir, PatternError> {
        let negated = self.eat('^');
        let mut items = Vec::new();
        let mut first = true;
        loop {
            let Some(ch) = self.bump() else {
                return Err(self.error(PatternErrorKind::UnclosedClass));
            };
            let item = match ch {
                ']' if !first => break,
                '\\' => self.escape()?,
                ch => ClassItem::Range(ch, ch),
            };
            first = false;

            let item = match item {
                ClassItem::Range(start, _)
                    if self.peek() == Some('-') && !matches!(self.peek_second(), Some(']') | None) =>
                {
                    self.pos += 1;
                    let end = match self.bump() {
                        Some('\\') => match self.escape()? {
                            ClassItem::Range(end, _) => end,
                            ClassItem::Bytes(_) => {
                                return Err(self.error(PatternErrorKind::InvalidRange));
                            }
                        },
                        Some(end) => end,
                        None => return Err(self.error(PatternErrorKind::UnclosedClass)),
                    };
                    if end < start {
                        return Err(self.error(PatternErrorKind::InvalidRange));
                    }
                    ClassItem::Range(start, end)
                }
                item => item,
            };
            items.push(item);
        }
        self.lower_class(items, negated)
    }

    fn lower_class(&self, items: Vec<ClassItem>, negated: bool) -> Result<Hir, PatternError> {
        let mut ranges = Vec::new();
        let mut wide = Vec::new();
        for item in items {
            match item {
                ClassItem::Bytes(bytes) => ranges.extend(bytes),
                ClassItem::Range(start, end) if end.is_ascii() => {
                    ranges.push((start as u8, end as u8));
                    if self.case_insensitive {
                        for ch in start..=end {
                            if ch.is_ascii_alphabetic() {
                                let other = if ch.is_ascii_lowercase() {
                                    ch.to_ascii_uppercase()
                                } else {
                                    ch.to_ascii_lowercase()
                                } as u8;
                                ranges.push((other, other));
                            }
                        }
                    }
                }
                ClassItem::Range(start, end) if start == end && !negated => wide.push(start),
                ClassItem::Range(..) => {
                    return Err(self.error(PatternErrorKind::Unsupported("non-ASCII class range")));
                }
            }
        }

        let mut ranges = normalize(ranges);
        if negated {
            ranges = complement(&ranges);
        }
        if ranges.is_empty() && wide.is_empty() {
            return Err(self.error(PatternErrorKind::EmptyClass));
        }
        if wide.is_empty() {
            return Ok(Hir::Class(ranges));
        }

        let mut branches = Vec::new();
        if !ranges.is_empty() {
            branches.push(Hir::Class(ranges));
        }
        for ch in wide {
            let mut buf = [0; 4];
            branches.push(Hir::Literal(ch.encode_utf8(&mut buf).as_bytes().to_vec()));
        }
        Ok(Hir::Alternation(branches))
    }
}

const DIGIT: &[(u8, u8)] = &[(b'0', b'9')];
const WORD: &[(u8, u8)] = &[(b'0', b'9'), (b'A', b'Z'), (b'_', b'_'), (b'a', b'z')];
const SPACE: &[(u8, u8)] = &[(b'\t', b'\r'), (b' ', b' ')];

/// Sorts and merges overlapping or adjacent ranges.
fn normalize(mut ranges: Vec<(u8, u8)>) -> Vec<(u8, u8)> {
    ranges.sort_unstable();
    let mut merged: Vec<(u8, u8)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if u16::from(start) <= u16::from(last.1) + 1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Complements normalized ranges over the whole byte space.
fn complement(ranges: &[(u8, u8)]) -> Vec<(u8, u8)> {
    let ranges = normalize(ranges.to_vec());
    let mut result = Vec::new();
    let mut next: u16 = 0;
    for (start, end) in ranges {
        if u16::from(start) > next {
            result.push((next as u8, start - 1));
        }
        next = u16::from(end) + 1;
    }
    if next <= 0xFF {
        result.push((next as u8, 0xFF));
    }
    result
}

/// `.`: any UTF-8 encoded character except `\n`, or any single stray byte.
fn any_char_except_newline() -> Hir {
    let continuation = || Hir::Class(vec![(0x80, 0xBF)]);
    Hir::Alternation(vec![
        Hir::Class(vec![(0x00, 0x09), (0x0B, 0x7F)]),
        Hir::Concat(vec![Hir::Class(vec![(0xC2, 0xDF)]), continuation()]),
        Hir::Concat(vec![Hir::Class(vec![(0xE0, 0xEF)]), continuation(), continuation()]),
        Hir::Concat(vec![
            Hir::Class(vec![(0xF0, 0xF4)]),
            continuation(),
            continuation(),
            continuation(),
        ]),
        Hir::Class(vec![(0x80, 0xFF)]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_sequences() {
        assert_eq!(parse("ab", false), Ok(Hir::Concat(vec![
            Hir::Literal(b"a".to_vec()),
            Hir::Literal(b"b".to_vec()),
        ])));
        assert_eq!(parse("\\+", false), Ok(Hir::Literal(b"+".to_vec())));
    }

    #[test]
    fn classes_and_complements() {
        assert_eq!(parse("[0-9a-f]", false), Ok(Hir::Class(vec![(b'0', b'9'), (b'a', b'f')])));
        assert_eq!(
            parse("[^\"]", false),
            Ok(Hir::Class(vec![(0x00, b'"' - 1), (b'"' + 1, 0xFF)]))
        );
        assert_eq!(parse("[-a]", false), Ok(Hir::Class(vec![(b'-', b'-'), (b'a', b'a')])));
        assert_eq!(parse("[]]", false), Ok(Hir::Class(vec![(b']', b']')])));
    }

    #[test]
    fn repetition_bounds() {
        assert_eq!(
            parse("a{2,3}", false),
            Ok(Hir::Repeat { hir: Box::new(Hir::Literal(b"a".to_vec())), min: 2, max: Some(3) })
        );
        assert_eq!(parse("a{,", false).map(|_| ()), Ok(()));
        assert_eq!(parse("a{3,2}", false).unwrap_err().kind, PatternErrorKind::InvalidRepetition);
    }

    #[test]
    fn rejected_syntax() {
        assert_eq!(parse("(ab", false).unwrap_err().kind, PatternErrorKind::UnclosedGroup);
        assert_eq!(parse("ab)", false).unwrap_err().kind, PatternErrorKind::UnmatchedParen);
        assert_eq!(parse("[ab", false).unwrap_err().kind, PatternErrorKind::UnclosedClass);
        assert_eq!(parse("*a", false).unwrap_err().kind, PatternErrorKind::NothingToRepeat);
        assert_eq!(parse("^a", false).unwrap_err().kind, PatternErrorKind::Unsupported("anchor"));
        assert_eq!(parse("\\q", false).unwrap_err().kind, PatternErrorKind::InvalidEscape('q'));
    }

    #[test]
    fn case_insensitive_letters() {
        assert_eq!(parse("a", true), Ok(Hir::Class(vec![(b'A', b'A'), (b'a', b'a')])));
    }
}
