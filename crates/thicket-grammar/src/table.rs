//! Serialisable grammar table format.

use serde::{Deserialize, Serialize};

use crate::{Symbol, SymbolInfo};

/// Format version written by this engine's grammar compiler.
pub const LANGUAGE_VERSION: u32 = 2;
/// Oldest format version this engine still loads.
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub u16);

impl StateId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LexModeId(pub u16);

impl LexModeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductionId(pub u16);

impl ProductionId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One entry of the LR action table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Shift { state: StateId },
    Reduce { production: ProductionId },
    Accept,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub symbol: Symbol,
    pub child_count: u16,
    #[serde(default)]
    pub dynamic_precedence: i16,
    /// The single child takes `symbol` as its kind instead of being wrapped
    /// in a new node. Aliases compile to these.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rename: bool,
}

/// A lexical rule. Rules without a symbol are skipped as padding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexRule {
    #[serde(default)]
    pub symbol: Option<Symbol>,
    pub pattern: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub case_insensitive: bool,
}

/// Tokens valid in a group of parse states.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexModeTable {
    pub tokens: Vec<Symbol>,
    #[serde(default)]
    pub externals: Vec<Symbol>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub symbol: Symbol,
    pub actions: Vec<Action>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GotoEntry {
    pub symbol: Symbol,
    pub state: StateId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTable {
    pub lex_mode: LexModeId,
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
    #[serde(default)]
    pub gotos: Vec<GotoEntry>,
}

/// The complete compiled description of a language.
///
/// Symbol `0` must be `end` and symbol `1` must be `ERROR`. State `0` is the
/// start state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarTable {
    pub version: u32,
    pub name: String,
    pub symbols: Vec<SymbolInfo>,
    pub start_symbol: Symbol,
    pub productions: Vec<Production>,
    pub lex_rules: Vec<LexRule>,
    pub lex_modes: Vec<LexModeTable>,
    #[serde(default)]
    pub external_tokens: Vec<Symbol>,
    pub states: Vec<StateTable>,
}

impl GrammarTable {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Only the version tag, read before the rest of the blob so that tables from
/// a future format still report a version mismatch.
#[derive(Deserialize)]
pub(crate) struct VersionHeader {
    pub(crate) version: u32,
}
