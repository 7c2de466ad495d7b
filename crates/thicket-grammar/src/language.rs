use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::table::VersionHeader;
use crate::{
    Action, ExternalScanner, GrammarTable, LANGUAGE_VERSION, LanguageError, LexAutomaton,
    LexModeId, MIN_COMPATIBLE_LANGUAGE_VERSION, Production, ProductionId, ScannerFactory, StateId,
    Symbol, SymbolInfo, SymbolSet, SymbolType,
};

/// Tokens the lexer may produce in a group of parse states.
#[derive(Debug, Clone)]
pub struct LexMode {
    pub tokens: SymbolSet,
    pub externals: SymbolSet,
    /// `externals` as a mask indexed by external token, in the shape
    /// [`ExternalScanner::scan`] expects.
    pub external_valid: Box<[bool]>,
}

impl LexMode {
    pub fn has_externals(&self) -> bool {
        self.external_valid.iter().any(|&valid| valid)
    }
}

struct ParseState {
    lex_mode: LexModeId,
    /// Terminals with at least one action, in ascending order.
    terminals: Box<[Symbol]>,
    actions: FxHashMap<Symbol, SmallVec<[Action; 1]>>,
    gotos: FxHashMap<Symbol, StateId>,
}

struct LanguageData {
    version: u32,
    name: String,
    symbols: Vec<SymbolInfo>,
    start_symbol: Symbol,
    productions: Vec<Production>,
    lex_modes: Vec<LexMode>,
    external_tokens: Vec<Symbol>,
    states: Vec<ParseState>,
    automaton: LexAutomaton,
    scanner: Option<ScannerFactory>,
}

/// A loaded, validated grammar.
///
/// Cheap to clone; all clones share the same tables.
#[derive(Clone)]
pub struct Language(Arc<LanguageData>);

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.0.name)
            .field("version", &self.0.version)
            .field("symbols", &self.0.symbols.len())
            .field("states", &self.0.states.len())
            .finish()
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Language {}

/// Attaches runtime-only pieces, like an external scanner, to a table before
/// it is validated.
pub struct LanguageBuilder {
    table: GrammarTable,
    scanner: Option<ScannerFactory>,
}

impl LanguageBuilder {
    pub fn new(table: GrammarTable) -> Self {
        Self { table, scanner: None }
    }

    /// Reads a serialised table. The version is checked before anything
    /// else, so a table from an unknown future format is reported as such.
    pub fn load(blob: &[u8]) -> Result<Self, LanguageError> {
        let header: VersionHeader = serde_json::from_slice(blob)?;
        check_version(header.version)?;
        Ok(Self::new(serde_json::from_slice(blob)?))
    }

    pub fn external_scanner(mut self, factory: ScannerFactory) -> Self {
        self.scanner = Some(factory);
        self
    }

    pub fn build(self) -> Result<Language, LanguageError> {
        let Self { table, scanner } = self;
        check_version(table.version)?;
        Validator { table: &table }.validate()?;

        if !table.external_tokens.is_empty() && scanner.is_none() {
            tracing::warn!(
                language = %table.name,
                "grammar declares external tokens but no external scanner is attached"
            );
        }

        let lex_modes: Vec<LexMode> = table
            .lex_modes
            .iter()
            .map(|mode| LexMode {
                tokens: mode.tokens.iter().copied().collect(),
                externals: mode.externals.iter().copied().collect(),
                external_valid: table
                    .external_tokens
                    .iter()
                    .map(|symbol| mode.externals.contains(symbol))
                    .collect(),
            })
            .collect();
        let token_sets: Vec<SymbolSet> = lex_modes.iter().map(|mode| mode.tokens.clone()).collect();
        let automaton = LexAutomaton::new(&table.lex_rules, &token_sets)
            .map_err(|(rule, source)| LanguageError::Pattern { rule, source })?;

        let states = table
            .states
            .into_iter()
            .map(|state| {
                let mut terminals: Vec<Symbol> =
                    state.actions.iter().map(|entry| entry.symbol).collect();
                terminals.sort_unstable();
                terminals.dedup();
                let mut actions: FxHashMap<Symbol, SmallVec<[Action; 1]>> = FxHashMap::default();
                for entry in state.actions {
                    actions.entry(entry.symbol).or_default().extend(entry.actions);
                }
                ParseState {
                    lex_mode: state.lex_mode,
                    terminals: terminals.into_boxed_slice(),
                    actions,
                    gotos: state.gotos.iter().map(|goto| (goto.symbol, goto.state)).collect(),
                }
            })
            .collect();

        tracing::debug!(
            language = %table.name,
            symbols = table.symbols.len(),
            rules = automaton.rule_count(),
            "loaded grammar"
        );

        Ok(Language(Arc::new(LanguageData {
            version: table.version,
            name: table.name,
            symbols: table.symbols,
            start_symbol: table.start_symbol,
            productions: table.productions,
            lex_modes,
            external_tokens: table.external_tokens,
            states,
            automaton,
            scanner,
        })))
    }
}

fn check_version(version: u32) -> Result<(), LanguageError> {
    if (MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version) {
        Ok(())
    } else {
        Err(LanguageError::IncompatibleVersion {
            version,
            min: MIN_COMPATIBLE_LANGUAGE_VERSION,
            max: LANGUAGE_VERSION,
        })
    }
}

impl Language {
    pub fn load(blob: &[u8]) -> Result<Self, LanguageError> {
        LanguageBuilder::load(blob)?.build()
    }

    pub fn from_table(table: GrammarTable) -> Result<Self, LanguageError> {
        LanguageBuilder::new(table).build()
    }

    pub fn version(&self) -> u32 {
        self.0.version
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn symbol_count(&self) -> usize {
        self.0.symbols.len()
    }

    pub fn state_count(&self) -> usize {
        self.0.states.len()
    }

    pub fn start_state(&self) -> StateId {
        StateId(0)
    }

    pub fn start_symbol(&self) -> Symbol {
        self.0.start_symbol
    }

    /// Actions for `symbol` in `state`. More than one action is a conflict
    /// the parser explores by forking.
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[Action] {
        self.0.states[state.index()].actions.get(&symbol).map_or(&[], |actions| actions.as_slice())
    }

    /// Terminals that have an action in `state`, in ascending order.
    pub fn expected_symbols(&self, state: StateId) -> &[Symbol] {
        &self.0.states[state.index()].terminals
    }

    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.0.states[state.index()].gotos.get(&symbol).copied()
    }

    pub fn lex_mode(&self, state: StateId) -> LexModeId {
        self.0.states[state.index()].lex_mode
    }

    pub fn lex_mode_info(&self, mode: LexModeId) -> &LexMode {
        &self.0.lex_modes[mode.index()]
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.0.productions[id.index()]
    }

    pub fn metadata(&self, symbol: Symbol) -> &SymbolInfo {
        &self.0.symbols[symbol.index()]
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.0.symbols.get(symbol.index()).map_or("<unknown>", |info| info.name.as_str())
    }

    /// Finds a visible symbol by name. Anonymous tokens like `"+"` share their
    /// text with nothing named, so `named` picks between the two namespaces.
    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<Symbol> {
        self.0
            .symbols
            .iter()
            .position(|info| info.name == name && info.named == named && info.visible)
            .or_else(|| {
                self.0.symbols.iter().position(|info| info.name == name && info.named == named)
            })
            .map(|index| Symbol(index as u16))
    }

    pub fn external_token_count(&self) -> usize {
        self.0.external_tokens.len()
    }

    pub fn external_symbol(&self, index: usize) -> Option<Symbol> {
        self.0.external_tokens.get(index).copied()
    }

    pub fn has_external_scanner(&self) -> bool {
        self.0.scanner.is_some()
    }

    pub fn create_external_scanner(&self) -> Option<Box<dyn ExternalScanner>> {
        self.0.scanner.map(|factory| factory())
    }

    pub fn automaton(&self) -> &LexAutomaton {
        &self.0.automaton
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

struct Validator<'a> {
    table: &'a GrammarTable,
}

impl Validator<'_> {
    fn validate(&self) -> Result<(), LanguageError> {
        let table = self.table;
        if table.symbols.len() < 2 {
            return invalid("missing reserved symbols `end` and `ERROR`");
        }
        if table.symbols.len() > usize::from(u16::MAX) {
            return invalid("too many symbols");
        }
        if table.symbols[Symbol::END.index()].kind != SymbolType::Terminal {
            return invalid("symbol 0 must be the `end` terminal");
        }
        if table.symbols[Symbol::ERROR.index()].name != "ERROR" {
            return invalid("symbol 1 must be `ERROR`");
        }
        if table.states.is_empty() {
            return invalid("no parse states");
        }
        self.nonterminal(table.start_symbol, "start symbol")?;

        for (index, production) in table.productions.iter().enumerate() {
            self.nonterminal(production.symbol, "production")?;
            if production.rename && production.child_count != 1 {
                return invalid(format!("renaming production {index} must have one child"));
            }
        }
        for (index, rule) in table.lex_rules.iter().enumerate() {
            if let Some(symbol) = rule.symbol
                && self.kind(symbol, "lexical rule")? != SymbolType::Terminal
            {
                return invalid(format!("lexical rule {index} produces a non-terminal"));
            }
        }
        for symbol in &table.external_tokens {
            if self.kind(*symbol, "external token")? != SymbolType::External {
                return invalid(format!("external token {} is not external", symbol.0));
            }
        }
        for mode in &table.lex_modes {
            for &symbol in &mode.tokens {
                if self.kind(symbol, "lexical mode")? == SymbolType::NonTerminal {
                    return invalid(format!("lexical mode lists non-terminal {}", symbol.0));
                }
            }
            for symbol in &mode.externals {
                if !table.external_tokens.contains(symbol) {
                    return invalid(format!("lexical mode lists unknown external {}", symbol.0));
                }
            }
        }

        for (index, state) in table.states.iter().enumerate() {
            if state.lex_mode.index() >= table.lex_modes.len() {
                return invalid(format!("state {index} has no lexical mode"));
            }
            for entry in &state.actions {
                if self.kind(entry.symbol, "action")? == SymbolType::NonTerminal {
                    return invalid(format!("state {index} has an action on a non-terminal"));
                }
                for action in &entry.actions {
                    match *action {
                        Action::Shift { state } => self.state(state)?,
                        Action::Reduce { production } => {
                            if production.index() >= table.productions.len() {
                                return invalid(format!(
                                    "state {index} reduces unknown production {}",
                                    production.0
                                ));
                            }
                        }
                        Action::Accept => {}
                    }
                }
            }
            for goto in &state.gotos {
                self.nonterminal(goto.symbol, "goto")?;
                self.state(goto.state)?;
            }
        }
        Ok(())
    }

    fn kind(&self, symbol: Symbol, context: &str) -> Result<SymbolType, LanguageError> {
        match self.table.symbols.get(symbol.index()) {
            Some(info) => Ok(info.kind),
            None => invalid(format!("{context} refers to unknown symbol {}", symbol.0)),
        }
    }

    fn nonterminal(&self, symbol: Symbol, context: &str) -> Result<(), LanguageError> {
        match self.kind(symbol, context)? {
            SymbolType::NonTerminal => Ok(()),
            _ => invalid(format!("{context} symbol {} is not a non-terminal", symbol.0)),
        }
    }

    fn state(&self, state: StateId) -> Result<(), LanguageError> {
        if state.index() < self.table.states.len() {
            Ok(())
        } else {
            invalid(format!("reference to unknown state {}", state.0))
        }
    }
}

fn invalid<T>(message: impl Into<String>) -> Result<T, LanguageError> {
    Err(LanguageError::InvalidTable(message.into()))
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::{ActionEntry, GotoEntry, LexModeTable, LexRule, StateTable};

    fn symbol(name: &str, kind: SymbolType, visible: bool, named: bool) -> SymbolInfo {
        SymbolInfo { name: name.to_owned(), kind, visible, named, extra: false }
    }

    fn shift(state: u16) -> Action {
        Action::Shift { state: StateId(state) }
    }

    fn state(mode: u16, actions: &[(u16, Action)], gotos: &[(u16, u16)]) -> StateTable {
        StateTable {
            lex_mode: LexModeId(mode),
            actions: actions
                .iter()
                .map(|&(symbol, action)| ActionEntry { symbol: Symbol(symbol), actions: vec![action] })
                .collect(),
            gotos: gotos
                .iter()
                .map(|&(symbol, state)| GotoEntry { symbol: Symbol(symbol), state: StateId(state) })
                .collect(),
        }
    }

    /// `expr := NUMBER '+' NUMBER`
    fn sum_table() -> GrammarTable {
        GrammarTable {
            version: LANGUAGE_VERSION,
            name: "sum".to_owned(),
            symbols: vec![
                symbol("end", SymbolType::Terminal, false, true),
                symbol("ERROR", SymbolType::Terminal, true, true),
                symbol("NUMBER", SymbolType::Terminal, true, true),
                symbol("+", SymbolType::Terminal, true, false),
                symbol("expr", SymbolType::NonTerminal, true, true),
            ],
            start_symbol: Symbol(4),
            productions: vec![Production {
                symbol: Symbol(4),
                child_count: 3,
                dynamic_precedence: 0,
                rename: false,
            }],
            lex_rules: vec![
                LexRule {
                    symbol: Some(Symbol(2)),
                    pattern: "[0-9]+".to_owned(),
                    priority: 0,
                    case_insensitive: false,
                },
                LexRule {
                    symbol: Some(Symbol(3)),
                    pattern: "\\+".to_owned(),
                    priority: 1,
                    case_insensitive: false,
                },
                LexRule {
                    symbol: None,
                    pattern: "\\s+".to_owned(),
                    priority: 0,
                    case_insensitive: false,
                },
            ],
            lex_modes: vec![
                LexModeTable { tokens: vec![Symbol(2)], externals: vec![] },
                LexModeTable { tokens: vec![Symbol(3)], externals: vec![] },
                LexModeTable { tokens: vec![Symbol(0)], externals: vec![] },
            ],
            external_tokens: vec![],
            states: vec![
                state(0, &[(2, shift(1))], &[(4, 4)]),
                state(1, &[(3, shift(2))], &[]),
                state(0, &[(2, shift(3))], &[]),
                state(2, &[(0, Action::Reduce { production: ProductionId(0) })], &[]),
                state(2, &[(0, Action::Accept)], &[]),
            ],
        }
    }

    #[test]
    fn load_round_trips_through_json() {
        let json = sum_table().to_json().unwrap();
        let language = Language::load(json.as_bytes()).unwrap();
        assert_eq!(language.name(), "sum");
        assert_eq!(language.actions(StateId(0), Symbol(2)), &[shift(1)]);
        assert!(language.actions(StateId(0), Symbol(3)).is_empty());
        assert_eq!(language.goto(StateId(0), Symbol(4)), Some(StateId(4)));
        assert_eq!(language.expected_symbols(StateId(3)), &[Symbol::END]);
        assert_eq!(language.symbol_for_name("+", false), Some(Symbol(3)));
        assert_eq!(language.symbol_for_name("+", true), None);
        assert_eq!(language.symbol_name(Symbol(4)), "expr");
        assert!(language.create_external_scanner().is_none());
    }

    #[test]
    fn future_version_is_rejected_before_shape_checks() {
        let error = Language::load(br#"{ "version": 99, "whatever": [] }"#).unwrap_err();
        expect!["incompatible grammar table version 99, supported versions are 1..=2"]
            .assert_eq(&error.to_string());
    }

    #[test]
    fn dangling_state_is_rejected() {
        let mut table = sum_table();
        table.states[1].actions[0].actions[0] = shift(40);
        let error = Language::from_table(table).unwrap_err();
        expect!["invalid grammar table: reference to unknown state 40"]
            .assert_eq(&error.to_string());
    }

    #[test]
    fn bad_pattern_names_the_rule() {
        let mut table = sum_table();
        table.lex_rules[0].pattern = "[0-9".to_owned();
        let error = Language::from_table(table).unwrap_err();
        assert!(matches!(error, LanguageError::Pattern { rule: 0, .. }), "{error}");
    }

    #[test]
    fn renaming_production_needs_one_child() {
        let mut table = sum_table();
        table.productions[0].rename = true;
        let error = Language::from_table(table).unwrap_err();
        expect!["invalid grammar table: renaming production 0 must have one child"]
            .assert_eq(&error.to_string());
    }

    #[test]
    fn language_is_shared_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Language>();
    }
}
