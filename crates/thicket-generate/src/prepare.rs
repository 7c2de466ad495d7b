//! Turns a [`Grammar`] into numbered symbols, lexical rules and flat
//! productions.
//!
//! Symbols are numbered in a fixed order: `end`, `ERROR`, rules whose whole
//! body is a token, externals, tokens written inline in other rules, the
//! remaining rules, and finally the helpers created while flattening:
//! repetitions and aliases.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;
use thicket_grammar::{LexRule, Symbol, SymbolInfo, SymbolType};

use crate::GenerateError;
use crate::grammar::{Grammar, PrecedenceValue, Rule};

/// Most alternatives a single rule may expand into.
const MAX_ALTERNATIVES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) symbol: Symbol,
    pub(crate) precedence: Option<i32>,
    pub(crate) associativity: Option<Associativity>,
}

impl Step {
    fn new(symbol: Symbol) -> Self {
        Self { symbol, precedence: None, associativity: None }
    }

    pub(crate) fn precedence(&self) -> i32 {
        self.precedence.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlatProduction {
    pub(crate) symbol: Symbol,
    pub(crate) steps: Vec<Step>,
    pub(crate) dynamic_precedence: i32,
    /// Relabels its single step as `symbol`.
    pub(crate) rename: bool,
}

#[derive(Debug)]
pub(crate) struct PreparedGrammar {
    pub(crate) symbols: Vec<SymbolInfo>,
    pub(crate) start: Symbol,
    pub(crate) productions: Vec<FlatProduction>,
    pub(crate) lex_rules: Vec<LexRule>,
    pub(crate) external_tokens: Vec<Symbol>,
}

impl PreparedGrammar {
    pub(crate) fn is_terminal(&self, symbol: Symbol) -> bool {
        self.symbols[symbol.index()].is_terminal()
    }

    pub(crate) fn is_extra(&self, symbol: Symbol) -> bool {
        self.symbols[symbol.index()].extra
    }

    /// Every symbol in order. `push_symbol` keeps the count addressable.
    pub(crate) fn all_symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        (0..self.symbols.len()).filter_map(|index| u16::try_from(index).ok().map(Symbol))
    }

    /// Extras written as rules, which are parsed rather than lexed.
    pub(crate) fn nonterminal_extras(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.all_symbols().filter(|&symbol| self.is_extra(symbol) && !self.is_terminal(symbol))
    }
}

pub(crate) fn prepare(grammar: &Grammar) -> Result<PreparedGrammar, GenerateError> {
    let Some((start_name, start_rule)) = grammar.rules.first() else {
        return Err(GenerateError::EmptyGrammar);
    };
    if start_rule.is_token() {
        return Err(GenerateError::Unsupported(format!(
            "start rule `{start_name}` is a single token"
        )));
    }

    let mut preparer = Preparer::default();
    preparer.push_symbol("end", SymbolType::Terminal, false, false)?;
    preparer.push_symbol("ERROR", SymbolType::Terminal, true, true)?;

    for (name, rule) in &grammar.rules {
        if rule.is_token() {
            preparer.named_token(name, rule)?;
        }
    }
    for external in &grammar.externals {
        preparer.external(external)?;
    }
    for (name, rule) in &grammar.rules {
        if !rule.is_token() {
            preparer.collect_inline_tokens(name, rule)?;
        }
    }
    for name in grammar.rules.keys() {
        if !preparer.names.contains_key(name) {
            let symbol = preparer.push_symbol(name, SymbolType::NonTerminal, is_visible(name), true)?;
            preparer.names.insert(name.clone(), symbol);
        }
    }
    for extra in &grammar.extras {
        preparer.extra(extra)?;
    }

    for (name, rule) in &grammar.rules {
        let symbol = preparer.names[name];
        // Rules shadowed by an external of the same name are never expanded.
        if rule.is_token() || preparer.symbols[symbol.index()].is_terminal() {
            continue;
        }
        for alternative in preparer.flatten(name, rule)? {
            preparer.add_production(symbol, alternative, false);
        }
    }

    let start = preparer.names[start_name];
    tracing::debug!(
        symbols = preparer.symbols.len(),
        productions = preparer.productions.len(),
        tokens = preparer.lex_rules.len(),
        "prepared grammar"
    );
    Ok(PreparedGrammar {
        symbols: preparer.symbols,
        start,
        productions: preparer.productions,
        lex_rules: preparer.lex_rules,
        external_tokens: preparer.external_tokens,
    })
}

fn is_visible(name: &str) -> bool {
    !name.starts_with('_')
}

fn integer(value: &PrecedenceValue) -> Result<i32, GenerateError> {
    match value {
        PrecedenceValue::Integer(value) => Ok(*value),
        PrecedenceValue::Name(name) => {
            Err(GenerateError::Unsupported(format!("named precedence `{name}`")))
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Alternative {
    steps: Vec<Step>,
    dynamic_precedence: i32,
}

impl Alternative {
    fn single(symbol: Symbol) -> Self {
        Self { steps: vec![Step::new(symbol)], dynamic_precedence: 0 }
    }

    fn concat(&self, tail: &Self) -> Self {
        let mut steps = self.steps.clone();
        steps.extend(tail.steps.iter().cloned());
        let dynamic_precedence =
            if tail.dynamic_precedence != 0 { tail.dynamic_precedence } else { self.dynamic_precedence };
        Self { steps, dynamic_precedence }
    }
}

/// A token body rendered in the lexer's pattern syntax.
#[derive(Debug, Default)]
struct TokenPattern {
    pattern: String,
    case_insensitive: bool,
    priority: Option<i32>,
}

impl TokenPattern {
    fn compile(rule: &Rule) -> Result<Self, GenerateError> {
        let mut token = Self::default();
        token.write(rule)?;
        Ok(token)
    }

    fn write(&mut self, rule: &Rule) -> Result<(), GenerateError> {
        match rule {
            Rule::Blank => {}
            Rule::String { value } => escape_into(value, &mut self.pattern),
            Rule::Pattern { value, flags } => {
                if flags.as_deref().is_some_and(|flags| flags.contains('i')) {
                    self.case_insensitive = true;
                }
                let _ = write!(self.pattern, "(?:{value})");
            }
            Rule::Seq { members } => {
                for member in members {
                    self.write(member)?;
                }
            }
            Rule::Choice { members } => {
                self.pattern.push_str("(?:");
                for (index, member) in members.iter().enumerate() {
                    if index > 0 {
                        self.pattern.push('|');
                    }
                    self.write(member)?;
                }
                self.pattern.push(')');
            }
            Rule::Repeat { content } | Rule::Repeat1 { content } => {
                self.pattern.push_str("(?:");
                self.write(content)?;
                self.pattern.push(')');
                self.pattern.push(if matches!(rule, Rule::Repeat { .. }) { '*' } else { '+' });
            }
            Rule::Prec { value, content }
            | Rule::PrecLeft { value, content }
            | Rule::PrecRight { value, content } => {
                if self.priority.is_none() {
                    self.priority = Some(integer(value)?);
                }
                self.write(content)?;
            }
            Rule::PrecDynamic { content, .. }
            | Rule::Token { content }
            | Rule::ImmediateToken { content }
            | Rule::Field { content, .. }
            | Rule::Alias { content, .. } => self.write(content)?,
            Rule::Symbol { name } => {
                return Err(GenerateError::Unsupported(format!(
                    "symbol `{name}` inside a token"
                )));
            }
        }
        Ok(())
    }

    fn into_rule(self, symbol: Option<Symbol>, body: &Rule) -> LexRule {
        let default_priority = i32::from(matches!(token_body(body), Rule::String { .. }));
        LexRule {
            symbol,
            pattern: self.pattern,
            priority: self.priority.unwrap_or(default_priority),
            case_insensitive: self.case_insensitive,
        }
    }
}

/// Strips the wrappers that do not change what a token matches.
fn token_body(rule: &Rule) -> &Rule {
    match rule {
        Rule::Token { content }
        | Rule::ImmediateToken { content }
        | Rule::Field { content, .. }
        | Rule::Alias { content, .. } => token_body(content),
        rule => rule,
    }
}

fn escape_into(text: &str, pattern: &mut String) {
    for ch in text.chars() {
        if ch.is_ascii_punctuation() {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
}

#[derive(Default)]
struct Preparer {
    symbols: Vec<SymbolInfo>,
    lex_rules: Vec<LexRule>,
    external_tokens: Vec<Symbol>,
    productions: Vec<FlatProduction>,
    /// Named rules and externals.
    names: FxHashMap<String, Symbol>,
    /// Tokens by pattern, so that equal tokens written in several places
    /// share a symbol.
    tokens: FxHashMap<(String, bool), Symbol>,
    hidden_tokens: FxHashMap<String, u32>,
    repeats: FxHashMap<String, u32>,
    /// Symbols created for alias names that are not rules, by name and
    /// namedness.
    aliases: FxHashMap<(String, bool), Symbol>,
}

impl Preparer {
    fn push_symbol(
        &mut self,
        name: &str,
        kind: SymbolType,
        visible: bool,
        named: bool,
    ) -> Result<Symbol, GenerateError> {
        let symbol = Symbol(narrow(self.symbols.len(), "symbols")?);
        self.symbols.push(SymbolInfo { name: name.to_owned(), kind, visible, named, extra: false });
        Ok(symbol)
    }

    fn lookup(&self, name: &str) -> Result<Symbol, GenerateError> {
        self.names.get(name).copied().ok_or_else(|| GenerateError::UndefinedSymbol(name.to_owned()))
    }

    fn named_token(&mut self, name: &str, rule: &Rule) -> Result<(), GenerateError> {
        let token = TokenPattern::compile(rule)?;
        let symbol = self.push_symbol(name, SymbolType::Terminal, is_visible(name), true)?;
        self.names.insert(name.to_owned(), symbol);
        self.tokens.entry((token.pattern.clone(), token.case_insensitive)).or_insert(symbol);
        self.lex_rules.push(token.into_rule(Some(symbol), rule));
        Ok(())
    }

    fn external(&mut self, rule: &Rule) -> Result<(), GenerateError> {
        let symbol = match rule {
            Rule::Symbol { name } => {
                let symbol = self.push_symbol(name, SymbolType::External, is_visible(name), true)?;
                self.names.insert(name.clone(), symbol);
                symbol
            }
            Rule::String { value } => {
                let token = TokenPattern::compile(rule)?;
                let symbol = self.push_symbol(value, SymbolType::External, true, false)?;
                self.tokens.entry((token.pattern, token.case_insensitive)).or_insert(symbol);
                symbol
            }
            _ => return Err(GenerateError::Unsupported("external that is not a symbol or string".to_owned())),
        };
        self.external_tokens.push(symbol);
        Ok(())
    }

    fn collect_inline_tokens(&mut self, owner: &str, rule: &Rule) -> Result<(), GenerateError> {
        match rule {
            Rule::String { .. } | Rule::Pattern { .. } | Rule::Token { .. } | Rule::ImmediateToken { .. } => {
                self.inline_token(owner, rule)?;
            }
            Rule::Blank | Rule::Symbol { .. } => {}
            Rule::Seq { members } | Rule::Choice { members } => {
                for member in members {
                    self.collect_inline_tokens(owner, member)?;
                }
            }
            Rule::Repeat { content }
            | Rule::Repeat1 { content }
            | Rule::Prec { content, .. }
            | Rule::PrecLeft { content, .. }
            | Rule::PrecRight { content, .. }
            | Rule::PrecDynamic { content, .. }
            | Rule::Field { content, .. }
            | Rule::Alias { content, .. } => self.collect_inline_tokens(owner, content)?,
        }
        Ok(())
    }

    /// The symbol of a token written inside `owner`, created on first use.
    fn inline_token(&mut self, owner: &str, rule: &Rule) -> Result<Symbol, GenerateError> {
        let token = TokenPattern::compile(rule)?;
        let key = (token.pattern.clone(), token.case_insensitive);
        if let Some(&symbol) = self.tokens.get(&key) {
            return Ok(symbol);
        }
        let symbol = match token_body(rule) {
            Rule::String { value } => self.push_symbol(value, SymbolType::Terminal, true, false)?,
            _ => {
                let count = self.hidden_tokens.entry(owner.to_owned()).or_default();
                *count += 1;
                let name = format!("{owner}_token{count}");
                self.push_symbol(&name, SymbolType::Terminal, false, true)?
            }
        };
        self.tokens.insert(key, symbol);
        self.lex_rules.push(token.into_rule(Some(symbol), rule));
        Ok(symbol)
    }

    fn extra(&mut self, rule: &Rule) -> Result<(), GenerateError> {
        if let Rule::Symbol { name } = rule {
            let symbol = self.lookup(name)?;
            self.symbols[symbol.index()].extra = true;
            return Ok(());
        }
        let token = TokenPattern::compile(rule)?;
        self.lex_rules.push(token.into_rule(None, rule));
        Ok(())
    }

    fn flatten(&mut self, owner: &str, rule: &Rule) -> Result<Vec<Alternative>, GenerateError> {
        let alternatives = match rule {
            Rule::Blank => vec![Alternative::default()],
            Rule::String { .. } | Rule::Pattern { .. } | Rule::Token { .. } | Rule::ImmediateToken { .. } => {
                vec![Alternative::single(self.inline_token(owner, rule)?)]
            }
            Rule::Symbol { name } => vec![Alternative::single(self.lookup(name)?)],
            Rule::Seq { members } => {
                let mut alternatives = vec![Alternative::default()];
                for member in members {
                    let tails = self.flatten(owner, member)?;
                    if alternatives.len() * tails.len() > MAX_ALTERNATIVES {
                        return Err(too_many_alternatives(owner));
                    }
                    alternatives = alternatives
                        .iter()
                        .flat_map(|head| tails.iter().map(move |tail| head.concat(tail)))
                        .collect();
                }
                alternatives
            }
            Rule::Choice { members } => {
                let mut alternatives = Vec::new();
                for member in members {
                    alternatives.extend(self.flatten(owner, member)?);
                }
                alternatives
            }
            Rule::Repeat { content } => {
                vec![Alternative::default(), Alternative::single(self.repeat(owner, content)?)]
            }
            Rule::Repeat1 { content } => vec![Alternative::single(self.repeat(owner, content)?)],
            Rule::Prec { value, content } => self.with_precedence(owner, value, None, content)?,
            Rule::PrecLeft { value, content } => {
                self.with_precedence(owner, value, Some(Associativity::Left), content)?
            }
            Rule::PrecRight { value, content } => {
                self.with_precedence(owner, value, Some(Associativity::Right), content)?
            }
            Rule::PrecDynamic { value, content } => {
                let mut alternatives = self.flatten(owner, content)?;
                for alternative in &mut alternatives {
                    if alternative.dynamic_precedence == 0 {
                        alternative.dynamic_precedence = *value;
                    }
                }
                alternatives
            }
            Rule::Field { content, .. } => self.flatten(owner, content)?,
            Rule::Alias { value, named, content } => {
                vec![Alternative::single(self.alias(owner, value, *named, content)?)]
            }
        };
        if alternatives.len() > MAX_ALTERNATIVES {
            return Err(too_many_alternatives(owner));
        }
        Ok(alternatives)
    }

    fn with_precedence(
        &mut self,
        owner: &str,
        value: &PrecedenceValue,
        associativity: Option<Associativity>,
        content: &Rule,
    ) -> Result<Vec<Alternative>, GenerateError> {
        let precedence = integer(value)?;
        let mut alternatives = self.flatten(owner, content)?;
        for step in alternatives.iter_mut().flat_map(|alternative| &mut alternative.steps) {
            if step.precedence.is_none() {
                step.precedence = Some(precedence);
                step.associativity = associativity;
            }
        }
        Ok(alternatives)
    }

    /// Creates the hidden left-recursive rule `aux: aux content | content`.
    fn repeat(&mut self, owner: &str, content: &Rule) -> Result<Symbol, GenerateError> {
        let count = self.repeats.entry(owner.to_owned()).or_default();
        *count += 1;
        let name = format!("{owner}_repeat{count}");
        let symbol = self.push_symbol(&name, SymbolType::NonTerminal, false, false)?;
        for alternative in self.flatten(owner, content)? {
            if alternative.steps.is_empty() {
                continue;
            }
            self.add_production(symbol, Alternative::single(symbol).concat(&alternative), false);
            self.add_production(symbol, alternative, false);
        }
        Ok(symbol)
    }

    /// The symbol standing for `content` shown as `value`.
    ///
    /// A single symbol or token is renamed in place. Anything longer becomes
    /// a node of its own. A named alias that matches a rule's name shares
    /// that rule's symbol.
    fn alias(&mut self, owner: &str, value: &str, named: bool, content: &Rule) -> Result<Symbol, GenerateError> {
        let existing = self
            .names
            .get(value)
            .copied()
            .filter(|symbol| named && !self.symbols[symbol.index()].is_terminal());
        let alias = match existing.or_else(|| self.aliases.get(&(value.to_owned(), named)).copied()) {
            Some(alias) => alias,
            None => {
                let alias = self.push_symbol(value, SymbolType::NonTerminal, true, named)?;
                self.aliases.insert((value.to_owned(), named), alias);
                alias
            }
        };

        let target = match content {
            Rule::Symbol { name } => Some(self.lookup(name)?),
            rule if rule.is_token() => Some(self.inline_token(owner, rule)?),
            _ => None,
        };
        match target {
            Some(target) if target == alias => {}
            Some(target) => self.add_production(alias, Alternative::single(target), true),
            None => {
                for alternative in self.flatten(owner, content)? {
                    self.add_production(alias, alternative, false);
                }
            }
        }
        Ok(alias)
    }

    fn add_production(&mut self, symbol: Symbol, alternative: Alternative, rename: bool) {
        let production = FlatProduction {
            symbol,
            steps: alternative.steps,
            dynamic_precedence: alternative.dynamic_precedence,
            rename,
        };
        if !self.productions.contains(&production) {
            self.productions.push(production);
        }
    }
}

/// Narrows a table index, failing once the table outgrows 16-bit ids.
pub(crate) fn narrow(index: usize, what: &'static str) -> Result<u16, GenerateError> {
    u16::try_from(index).map_err(|_| GenerateError::TooLarge { what, count: index + 1 })
}

fn too_many_alternatives(owner: &str) -> GenerateError {
    GenerateError::Unsupported(format!("rule `{owner}` expands to too many alternatives"))
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use expect_test::expect;

    use super::*;

    fn prepared(json: &str) -> PreparedGrammar {
        prepare(&serde_json::from_str(json).unwrap()).unwrap()
    }

    fn dump(grammar: &PreparedGrammar) -> String {
        let name = |symbol: Symbol| grammar.symbols[symbol.index()].name.clone();
        let mut out = String::new();
        for rule in &grammar.lex_rules {
            let symbol = rule.symbol.map_or_else(|| "(skip)".to_owned(), name);
            writeln!(out, "{symbol} = {} @{}", rule.pattern, rule.priority).unwrap();
        }
        for production in &grammar.productions {
            let steps: Vec<_> = production
                .steps
                .iter()
                .map(|step| match step.precedence {
                    Some(precedence) => format!("{}:{precedence}", name(step.symbol)),
                    None => name(step.symbol),
                })
                .collect();
            let arrow = if production.rename { "=>" } else { "->" };
            writeln!(out, "{} {arrow} {}", name(production.symbol), steps.join(" ")).unwrap();
        }
        out
    }

    #[test]
    fn extracts_tokens_and_flattens_rules() {
        let grammar = prepared(
            r#"{
              "name": "list",
              "rules": {
                "list": { "type": "SEQ", "members": [
                  { "type": "STRING", "value": "[" },
                  { "type": "REPEAT", "content": { "type": "CHOICE", "members": [
                    { "type": "SYMBOL", "name": "number" },
                    { "type": "PATTERN", "value": "[a-z]+" }
                  ]}},
                  { "type": "STRING", "value": "]" }
                ]},
                "number": { "type": "PATTERN", "value": "\\d+" }
              }
            }"#,
        );
        expect![[r#"
            number = (?:\d+) @0
            [ = \[ @1
            list_token1 = (?:[a-z]+) @0
            ] = \] @1
            (skip) = (?:\s) @0
            list_repeat1 -> list_repeat1 number
            list_repeat1 -> number
            list_repeat1 -> list_repeat1 list_token1
            list_repeat1 -> list_token1
            list -> [ ]
            list -> [ list_repeat1 ]
        "#]]
        .assert_eq(&dump(&grammar));
        assert_eq!(grammar.start, Symbol(6));
    }

    #[test]
    fn precedence_marks_unset_steps() {
        let grammar = prepared(
            r#"{
              "name": "prec",
              "extras": [],
              "rules": {
                "expr": { "type": "CHOICE", "members": [
                  { "type": "PREC_LEFT", "value": 1, "content": { "type": "SEQ", "members": [
                    { "type": "SYMBOL", "name": "expr" },
                    { "type": "PREC", "value": 5, "content": { "type": "STRING", "value": "+" } },
                    { "type": "SYMBOL", "name": "expr" }
                  ]}},
                  { "type": "TOKEN", "content": { "type": "PREC", "value": 3, "content": { "type": "PATTERN", "value": "\\d+" } } }
                ]}
              }
            }"#,
        );
        expect![[r#"
            + = \+ @1
            expr_token1 = (?:\d+) @3
            expr -> expr:1 +:5 expr:1
            expr -> expr_token1
        "#]]
        .assert_eq(&dump(&grammar));
        assert_eq!(grammar.productions[0].steps[0].associativity, Some(Associativity::Left));
        assert_eq!(grammar.productions[0].steps[1].associativity, None);
    }

    #[test]
    fn rejects_what_it_cannot_express() {
        let check = |json: &str, expected: &str| {
            let grammar: Grammar = serde_json::from_str(json).unwrap();
            assert_eq!(prepare(&grammar).unwrap_err().to_string(), expected);
        };
        check(r#"{ "name": "empty", "rules": {} }"#, "grammar has no rules");
        check(
            r#"{ "name": "undefined", "rules": { "a": { "type": "SYMBOL", "name": "b" } } }"#,
            "undefined symbol `b`",
        );
        check(
            r#"{ "name": "named", "rules": { "a": { "type": "PREC", "value": "sum",
                 "content": { "type": "STRING", "value": "x" } } } }"#,
            "unsupported: named precedence `sum`",
        );
        check(
            r#"{ "name": "nested", "rules": { "a": { "type": "TOKEN",
                 "content": { "type": "SYMBOL", "name": "a" } } } }"#,
            "unsupported: symbol `a` inside a token",
        );
    }

    #[test]
    fn aliases_rename_single_symbols() {
        let grammar = prepared(
            r#"{
              "name": "alias",
              "rules": {
                "program": { "type": "REPEAT1", "content": { "type": "CHOICE", "members": [
                  { "type": "ALIAS", "value": "name", "named": true, "content": { "type": "SYMBOL", "name": "_word" } },
                  { "type": "ALIAS", "value": "keyword", "named": true, "content": { "type": "STRING", "value": "let" } },
                  { "type": "ALIAS", "value": "unit", "named": true, "content": { "type": "SEQ", "members": [
                    { "type": "STRING", "value": "(" }, { "type": "STRING", "value": ")" }
                  ]}},
                  { "type": "ALIAS", "value": "program", "named": true, "content": { "type": "SYMBOL", "name": "_word" } }
                ]}},
                "_word": { "type": "PATTERN", "value": "[a-z]+" }
              }
            }"#,
        );
        expect![[r#"
            _word = (?:[a-z]+) @0
            let = let @1
            ( = \( @1
            ) = \) @1
            (skip) = (?:\s) @0
            name => _word
            keyword => let
            unit -> ( )
            program => _word
            program_repeat1 -> program_repeat1 name
            program_repeat1 -> name
            program_repeat1 -> program_repeat1 keyword
            program_repeat1 -> keyword
            program_repeat1 -> program_repeat1 unit
            program_repeat1 -> unit
            program_repeat1 -> program_repeat1 program
            program_repeat1 -> program
            program -> program_repeat1
        "#]]
        .assert_eq(&dump(&grammar));

        let info = |name: &str| grammar.symbols.iter().find(|info| info.name == name).unwrap();
        assert!(info("name").visible && info("name").named);
        assert_eq!(info("keyword").kind, SymbolType::NonTerminal);
        assert_eq!(grammar.symbols.iter().filter(|info| info.name == "program").count(), 1);
    }

    #[test]
    fn rules_can_be_extras() {
        let grammar = prepared(
            r#"{
              "name": "comments",
              "extras": [{ "type": "PATTERN", "value": "\\s" }, { "type": "SYMBOL", "name": "comment" }],
              "rules": {
                "program": { "type": "REPEAT", "content": { "type": "STRING", "value": "x" } },
                "comment": { "type": "SEQ", "members": [
                  { "type": "STRING", "value": "/-" },
                  { "type": "PATTERN", "value": "[a-z ]*" },
                  { "type": "STRING", "value": "-/" }
                ]}
              }
            }"#,
        );
        let comment = grammar.symbols.iter().position(|info| info.name == "comment").unwrap();
        assert!(grammar.symbols[comment].extra);
        assert_eq!(grammar.nonterminal_extras().collect::<Vec<_>>(), [Symbol(comment as u16)]);
    }
}
