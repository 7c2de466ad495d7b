//! Context-aware lexing driven by a [`Language`]'s lexical automaton.
//!
//! The parser asks for one token at a time, passing the lexical mode of the
//! state it is in, so only tokens the parser can use are considered. Lexing
//! never fails: bytes no rule matches become an `ERROR` token.

mod cursor;

use std::sync::Arc;

use cursor::{Cursor, decode_char};
use thicket_grammar::{
    ExternalScanner, Language, LexModeId, LexMatch, MatchScratch, Symbol,
};
use thicket_span::Length;

/// One lexed token, positioned relative to where lexing started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: Symbol,
    /// Skipped text before the token.
    pub padding: Length,
    pub size: Length,
    /// Bytes past the end of the token the lexer looked at to decide on it.
    pub lookahead_bytes: u32,
    pub is_error: bool,
    /// Scanner snapshot taken after an external token.
    pub external_state: Option<Arc<[u8]>>,
}

impl Token {
    pub fn is_external(&self) -> bool {
        self.external_state.is_some()
    }

    pub fn is_end(&self) -> bool {
        self.symbol == Symbol::END
    }

    /// Padding and size together.
    pub fn total(&self) -> Length {
        self.padding + self.size
    }
}

/// An external scanner together with the state it must resume from.
pub struct External<'a> {
    pub scanner: &'a mut dyn ExternalScanner,
    pub state: &'a [u8],
}

pub struct Lexer<'text> {
    language: Language,
    text: &'text [u8],
    scratch: MatchScratch,
    serialized: Vec<u8>,
}

impl<'text> Lexer<'text> {
    pub fn new(language: &Language, text: &'text [u8]) -> Self {
        Self {
            language: language.clone(),
            text,
            scratch: MatchScratch::default(),
            serialized: Vec::new(),
        }
    }

    pub fn text(&self) -> &'text [u8] {
        self.text
    }

    /// Lexes the next token at `position` with the tokens valid in `mode`.
    pub fn lex(&mut self, position: Length, mode: LexModeId, external: Option<External<'_>>) -> Token {
        let start = position.to_usize().min(self.text.len());
        let mut examined = start;

        if let Some(external) = external
            && self.language.lex_mode_info(mode).has_externals()
        {
            match self.scan_external(start, mode, external) {
                Ok(token) => return token,
                Err(scanned) => examined = examined.max(scanned),
            }
        }

        self.lex_internal(start, Some(mode.index()), examined)
    }

    /// Lexes the whole text with every rule valid, as if no parser context
    /// were available.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0;
        loop {
            let token = self.lex_internal(position, None, position);
            position += token.total().to_usize();
            let end = token.is_end();
            tokens.push(token);
            if end {
                return tokens;
            }
        }
    }

    /// Runs the external scanner. On rejection returns how far it looked so
    /// the token lexed instead still accounts for it.
    fn scan_external(
        &mut self,
        start: usize,
        mode: LexModeId,
        external: External<'_>,
    ) -> Result<Token, usize> {
        let External { scanner, state } = external;
        let valid = &self.language.lex_mode_info(mode).external_valid;

        scanner.deserialize(state);
        let mut cursor = Cursor::new(self.text, start);
        let scanned = scanner.scan(&mut cursor, valid);
        let examined = cursor.examined();

        let Some(index) = scanned.filter(|&index| valid.get(index).copied().unwrap_or(false))
        else {
            scanner.deserialize(state);
            return Err(examined);
        };
        let Some(symbol) = self.language.external_symbol(index) else {
            scanner.deserialize(state);
            return Err(examined);
        };

        self.serialized.clear();
        scanner.serialize(&mut self.serialized);
        let (token_start, token_end) = (cursor.token_start(), cursor.token_end());
        if token_start == token_end && self.serialized.as_slice() == state {
            tracing::trace!(
                symbol = self.language.symbol_name(symbol),
                start,
                "rejected empty external token that left the scanner unchanged"
            );
            scanner.deserialize(state);
            return Err(examined);
        }

        tracing::trace!(symbol = self.language.symbol_name(symbol), token_start, token_end, "external token");
        Ok(Token {
            symbol,
            padding: Length::of(&self.text[start..token_start]),
            size: Length::of(&self.text[token_start..token_end]),
            lookahead_bytes: examined.saturating_sub(token_end) as u32,
            is_error: false,
            external_state: Some(Arc::from(self.serialized.as_slice())),
        })
    }

    fn lex_internal(&mut self, start: usize, mode: Option<usize>, mut examined: usize) -> Token {
        let mut pos = start;
        loop {
            if pos >= self.text.len() {
                return self.token(Symbol::END, start, pos, pos, examined.max(pos + 1), false);
            }

            let found = self.longest_match(pos, mode);
            examined = examined.max(pos + found.examined);
            if let Some((rule, len)) = found.matched {
                match self.language.automaton().rule_symbol(rule) {
                    None => pos += len,
                    Some(symbol) => {
                        return self.token(symbol, start, pos, pos + len, examined, false);
                    }
                }
                continue;
            }

            if mode.is_some() {
                let found = self.longest_match(pos, None);
                examined = examined.max(pos + found.examined);
                if let Some((rule, len)) = found.matched {
                    match self.language.automaton().rule_symbol(rule) {
                        None => pos += len,
                        Some(symbol) => {
                            return self.token(symbol, start, pos, pos + len, examined, false);
                        }
                    }
                    continue;
                }
            }

            return self.error_token(start, pos, examined);
        }
    }

    /// Consumes characters from `pos` until some rule matches again, and
    /// wraps them into an `ERROR` token.
    fn error_token(&mut self, start: usize, pos: usize, mut examined: usize) -> Token {
        let mut end = pos;
        while let Some((_, width)) = decode_char(&self.text[end..]) {
            end += width;
            if end >= self.text.len() {
                break;
            }
            let found = self.longest_match(end, None);
            examined = examined.max(end + found.examined);
            if found.matched.is_some() {
                break;
            }
        }
        tracing::trace!(start = pos, end, "no viable token");
        self.token(Symbol::ERROR, start, pos, end, examined.max(end), true)
    }

    fn longest_match(&mut self, pos: usize, mode: Option<usize>) -> LexMatch {
        let automaton = self.language.automaton();
        automaton.longest_match(automaton.start(mode), &self.text[pos..], &mut self.scratch)
    }

    fn token(
        &self,
        symbol: Symbol,
        start: usize,
        token_start: usize,
        token_end: usize,
        examined: usize,
        is_error: bool,
    ) -> Token {
        Token {
            symbol,
            padding: Length::of(&self.text[start..token_start]),
            size: Length::of(&self.text[token_start..token_end]),
            lookahead_bytes: examined.saturating_sub(token_end) as u32,
            is_error,
            external_state: None,
        }
    }
}

#[cfg(test)]
mod tests;
