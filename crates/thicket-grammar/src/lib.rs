//! Compiled grammar tables.
//!
//! A [`GrammarTable`] is the serialisable output of a grammar compiler: symbols,
//! lexical rules, lexical modes, productions and the LR action table. Loading it
//! produces a [`Language`], an immutable, cheaply clonable handle that every
//! lexer and parser of that language shares.

mod automaton;
mod error;
mod language;
mod pattern;
mod scanner;
mod symbol;
mod table;

/// Lexical automaton compiled from the table's patterns.
pub use automaton::{LexAutomaton, LexMatch, MatchScratch};
/// Errors raised while loading a grammar table.
pub use error::LanguageError;
/// Runtime handle over a validated grammar table.
pub use language::{LexMode, Language, LanguageBuilder};
/// Pattern syntax errors.
pub use pattern::{PatternError, PatternErrorKind};
/// External scanner capability.
pub use scanner::{ExternalScanner, ScanCursor, ScannerFactory};
/// Symbols and symbol sets.
pub use symbol::{Symbol, SymbolInfo, SymbolSet, SymbolType};
/// Serialisable table format.
pub use table::{
    Action, ActionEntry, GotoEntry, GrammarTable, LANGUAGE_VERSION, LexModeId, LexModeTable,
    LexRule, MIN_COMPATIBLE_LANGUAGE_VERSION, Production, ProductionId, StateId, StateTable,
};
