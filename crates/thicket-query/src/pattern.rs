//! Parser for the pattern syntax.
//!
//! ```text
//! ; a comment
//! (statement (expr "+" @plus) @sum)
//! (ERROR) @error
//! (MISSING ")")
//! ```

use thicket_grammar::{Language, Symbol};

use crate::{QueryError, QueryErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Matcher {
    /// `_`, any visible node.
    Any,
    /// `(_)`, any named node.
    AnyNamed,
    /// `(kind)` or `"literal"`.
    Symbol(Symbol),
    /// `(ERROR)`.
    Error,
    /// `(MISSING)`, optionally narrowed to one token.
    Missing(Option<Symbol>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pattern {
    pub(crate) matcher: Matcher,
    pub(crate) children: Vec<Pattern>,
    pub(crate) capture: Option<u32>,
    /// Anonymous siblings are passed over when looking for this pattern.
    pub(crate) named_only: bool,
}

pub(crate) struct PatternParser<'a> {
    language: &'a Language,
    source: &'a str,
    pos: usize,
    captures: Vec<String>,
}

impl<'a> PatternParser<'a> {
    pub(crate) fn new(language: &'a Language, source: &'a str) -> Self {
        Self { language, source, pos: 0, captures: Vec::new() }
    }

    /// Parses every top-level pattern and returns them with the capture
    /// names in order of first appearance.
    pub(crate) fn parse(mut self) -> Result<(Vec<Pattern>, Vec<String>), QueryError> {
        let mut patterns = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek().is_none() {
                break;
            }
            patterns.push(self.pattern()?);
        }
        Ok((patterns, self.captures))
    }

    fn pattern(&mut self) -> Result<Pattern, QueryError> {
        let start = self.pos;
        let (matcher, children) = match self.peek() {
            Some('(') => {
                self.pos += 1;
                self.parenthesized(start)?
            }
            Some('"') => {
                let text = self.literal()?;
                (Matcher::Symbol(self.symbol(&text, false, start)?), Vec::new())
            }
            Some(_) => {
                if self.identifier() != "_" {
                    return Err(QueryError::new(start, QueryErrorKind::Syntax));
                }
                (Matcher::Any, Vec::new())
            }
            None => return Err(QueryError::new(start, QueryErrorKind::Syntax)),
        };

        let named_only = match &matcher {
            Matcher::Any | Matcher::Missing(_) => false,
            Matcher::AnyNamed | Matcher::Error => true,
            Matcher::Symbol(symbol) => self.language.metadata(*symbol).named,
        };
        let capture = self.capture()?;
        Ok(Pattern { matcher, children, capture, named_only })
    }

    /// The rest of a pattern after its `(`.
    fn parenthesized(&mut self, open: usize) -> Result<(Matcher, Vec<Pattern>), QueryError> {
        self.skip_trivia();
        let name_start = self.pos;
        let name = self.identifier();
        let matcher = match name {
            "" => return Err(QueryError::new(name_start, QueryErrorKind::Syntax)),
            "_" => Matcher::AnyNamed,
            "ERROR" => Matcher::Error,
            "MISSING" => {
                self.skip_trivia();
                let token_start = self.pos;
                let token = match self.peek() {
                    Some('"') => {
                        let text = self.literal()?;
                        Some(self.symbol(&text, false, token_start)?)
                    }
                    Some(ch) if is_identifier_char(ch) => {
                        let name = self.identifier();
                        Some(self.symbol(name, true, token_start)?)
                    }
                    _ => None,
                };
                Matcher::Missing(token)
            }
            name => Matcher::Symbol(self.symbol(name, true, name_start)?),
        };

        let mut children = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(')') => {
                    self.pos += 1;
                    return Ok((matcher, children));
                }
                None => return Err(QueryError::new(open, QueryErrorKind::UnclosedParen)),
                Some(_) if matches!(matcher, Matcher::Missing(_)) => {
                    return Err(QueryError::new(self.pos, QueryErrorKind::Syntax));
                }
                Some(_) => children.push(self.pattern()?),
            }
        }
    }

    fn capture(&mut self) -> Result<Option<u32>, QueryError> {
        self.skip_trivia();
        if self.peek() != Some('@') {
            return Ok(None);
        }
        let at = self.pos;
        self.pos += 1;
        let name = self.identifier();
        if name.is_empty() {
            return Err(QueryError::new(at, QueryErrorKind::InvalidCapture));
        }
        let index = match self.captures.iter().position(|existing| existing == name) {
            Some(index) => index,
            None => {
                self.captures.push(name.to_owned());
                self.captures.len() - 1
            }
        };
        Ok(Some(index as u32))
    }

    /// A `"..."` literal with `\"`, `\\`, `\n` and `\t` escapes.
    fn literal(&mut self) -> Result<String, QueryError> {
        let open = self.pos;
        self.pos += 1;
        let mut text = String::new();
        let source = self.source;
        let mut chars = source[self.pos..].char_indices();
        while let Some((offset, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(text);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, escaped @ ('"' | '\\'))) => text.push(escaped),
                    _ => return Err(QueryError::new(self.pos + offset, QueryErrorKind::Syntax)),
                },
                ch => text.push(ch),
            }
        }
        Err(QueryError::new(open, QueryErrorKind::Syntax))
    }

    fn identifier(&mut self) -> &'a str {
        let source = self.source;
        let rest = &source[self.pos..];
        let len = rest.find(|ch| !is_identifier_char(ch)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn symbol(&self, name: &str, named: bool, offset: usize) -> Result<Symbol, QueryError> {
        self.language
            .symbol_for_name(name, named)
            .ok_or_else(|| QueryError::new(offset, QueryErrorKind::NodeType(name.to_owned())))
    }

    fn skip_trivia(&mut self) {
        loop {
            let source = self.source;
            let rest = &source[self.pos..];
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if !trimmed.starts_with(';') {
                return;
            }
            self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}
