use expect_test::{Expect, expect};
use thicket_grammar::{ExternalScanner, Language, LexModeId, ScanCursor, Symbol};
use thicket_span::Length;

use crate::{External, Lexer};

const TABLE: &str = r#"{
  "version": 2,
  "name": "tokens",
  "symbols": [
    { "name": "end", "type": "terminal" },
    { "name": "ERROR", "type": "terminal", "visible": true, "named": true },
    { "name": "identifier", "type": "terminal", "visible": true, "named": true },
    { "name": "number", "type": "terminal", "visible": true, "named": true },
    { "name": "if", "type": "terminal", "visible": true },
    { "name": "=", "type": "terminal", "visible": true },
    { "name": "comment", "type": "terminal", "visible": true, "named": true, "extra": true },
    { "name": "percent", "type": "external", "visible": true, "named": true },
    { "name": "program", "type": "non_terminal", "visible": true, "named": true }
  ],
  "start_symbol": 8,
  "productions": [],
  "lex_rules": [
    { "symbol": 2, "pattern": "[a-zA-Z_]\\w*" },
    { "symbol": 3, "pattern": "\\d+" },
    { "symbol": 4, "pattern": "if", "priority": 1 },
    { "symbol": 5, "pattern": "=", "priority": 1 },
    { "symbol": 6, "pattern": "//[^\\n]*" },
    { "pattern": "\\s+" }
  ],
  "lex_modes": [
    { "tokens": [2, 3, 4, 6], "externals": [7] },
    { "tokens": [5, 6] },
    { "tokens": [4] }
  ],
  "external_tokens": [7],
  "states": [{ "lex_mode": 0 }, { "lex_mode": 1 }, { "lex_mode": 2 }]
}"#;

fn language() -> Language {
    Language::load(TABLE.as_bytes()).unwrap()
}

fn check_tokens(text: &[u8], expect: Expect) {
    let language = language();
    let tokens = Lexer::new(&language, text).tokenize();
    let actual: String = tokens
        .iter()
        .map(|token| {
            format!(
                "{} {}+{} lookahead={}\n",
                language.symbol_name(token.symbol),
                u32::from(token.padding.bytes),
                u32::from(token.size.bytes),
                token.lookahead_bytes
            )
        })
        .collect();
    expect.assert_eq(&actual);
}

#[test]
fn tokenize_records_lookahead() {
    check_tokens(
        b"if x = 42 // hi",
        expect![[r#"
            if 0+2 lookahead=1
            identifier 1+1 lookahead=1
            = 1+1 lookahead=0
            number 1+2 lookahead=1
            comment 1+5 lookahead=1
            end 0+0 lookahead=1
        "#]],
    );
}

#[test]
fn unmatched_bytes_become_one_error_token() {
    check_tokens(
        b"@@ x",
        expect![[r#"
            ERROR 0+2 lookahead=2
            identifier 1+1 lookahead=1
            end 0+0 lookahead=1
        "#]],
    );
    check_tokens(
        b"\xff\xfex",
        expect![[r#"
            ERROR 0+2 lookahead=2
            identifier 0+1 lookahead=1
            end 0+0 lookahead=1
        "#]],
    );
}

#[test]
fn mode_limits_candidates() {
    let language = language();
    let mut lexer = Lexer::new(&language, b"ifx");

    let token = lexer.lex(Length::ZERO, LexModeId(0), None);
    assert_eq!(language.symbol_name(token.symbol), "identifier");
    assert_eq!(u32::from(token.size.bytes), 3);

    let token = lexer.lex(Length::ZERO, LexModeId(2), None);
    assert_eq!(language.symbol_name(token.symbol), "if");
    assert_eq!(u32::from(token.size.bytes), 2);
    assert_eq!(token.lookahead_bytes, 0);
}

#[test]
fn invalid_token_falls_back_to_every_rule() {
    let language = language();
    let mut lexer = Lexer::new(&language, b"  42");
    let token = lexer.lex(Length::ZERO, LexModeId(1), None);
    assert_eq!(language.symbol_name(token.symbol), "number");
    assert!(!token.is_error);
    assert_eq!(token.padding, Length::of(b"  "));
}

#[test]
fn lexing_resumes_at_any_offset() {
    let language = language();
    let text = b"a\n  bc";
    let mut lexer = Lexer::new(&language, text);
    let token = lexer.lex(Length::of(b"a"), LexModeId(0), None);
    assert_eq!(token.padding, Length::of(b"\n  "));
    assert_eq!(token.size, Length::of(b"bc"));
    assert_eq!(token.symbol, Symbol(2));
}

#[derive(Default)]
struct Percent {
    count: u8,
}

impl ExternalScanner for Percent {
    fn scan(&mut self, cursor: &mut dyn ScanCursor, valid: &[bool]) -> Option<usize> {
        if !valid[0] {
            return None;
        }
        match cursor.lookahead() {
            '%' => {
                while cursor.lookahead() == '%' {
                    cursor.advance(false);
                }
                self.count += 1;
                Some(0)
            }
            'x' => Some(0),
            _ => None,
        }
    }

    fn serialize(&self, buffer: &mut Vec<u8>) {
        if self.count > 0 {
            buffer.push(self.count);
        }
    }

    fn deserialize(&mut self, state: &[u8]) {
        self.count = state.first().copied().unwrap_or(0);
    }
}

#[test]
fn external_tokens_carry_scanner_state() {
    let language = language();
    let mut scanner = Percent::default();
    let mut lexer = Lexer::new(&language, b"%%% x");

    let token = lexer.lex(
        Length::ZERO,
        LexModeId(0),
        Some(External { scanner: &mut scanner, state: &[2] }),
    );
    assert_eq!(language.symbol_name(token.symbol), "percent");
    assert_eq!(u32::from(token.size.bytes), 3);
    assert_eq!(token.lookahead_bytes, 1);
    assert_eq!(token.external_state.as_deref(), Some(&[3][..]));
}

#[test]
fn empty_external_token_without_state_change_is_rejected() {
    let language = language();
    let mut scanner = Percent::default();
    let mut lexer = Lexer::new(&language, b"x");

    let token = lexer.lex(
        Length::ZERO,
        LexModeId(0),
        Some(External { scanner: &mut scanner, state: &[] }),
    );
    assert_eq!(language.symbol_name(token.symbol), "identifier");
    assert!(!token.is_external());
}

#[test]
fn scanner_only_runs_when_externals_are_valid() {
    let language = language();
    let mut scanner = Percent::default();
    let mut lexer = Lexer::new(&language, b"%%");

    let token = lexer.lex(
        Length::ZERO,
        LexModeId(1),
        Some(External { scanner: &mut scanner, state: &[] }),
    );
    assert!(token.is_error);
    assert_eq!(u32::from(token.size.bytes), 2);
}
