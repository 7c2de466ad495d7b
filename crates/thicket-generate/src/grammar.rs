//! The JSON grammar format: a start rule followed by named rules built from
//! the usual combinators.

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Grammar {
    pub name: String,
    /// Named rules in declaration order. The first one is the start rule.
    pub rules: IndexMap<String, Rule>,
    #[serde(default = "default_extras")]
    pub extras: Vec<Rule>,
    #[serde(default)]
    pub externals: Vec<Rule>,
    /// Expected conflicts. Unresolved conflicts are kept either way.
    #[serde(default)]
    pub conflicts: Vec<Vec<String>>,
    #[serde(default)]
    pub word: Option<String>,
}

fn default_extras() -> Vec<Rule> {
    vec![Rule::Pattern { value: "\\s".to_owned(), flags: None }]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rule {
    Blank,
    String {
        value: String,
    },
    Pattern {
        value: String,
        #[serde(default)]
        flags: Option<String>,
    },
    Symbol {
        name: String,
    },
    Seq {
        members: Vec<Rule>,
    },
    Choice {
        members: Vec<Rule>,
    },
    Repeat {
        content: Box<Rule>,
    },
    Repeat1 {
        content: Box<Rule>,
    },
    Prec {
        value: PrecedenceValue,
        content: Box<Rule>,
    },
    PrecLeft {
        value: PrecedenceValue,
        content: Box<Rule>,
    },
    PrecRight {
        value: PrecedenceValue,
        content: Box<Rule>,
    },
    PrecDynamic {
        value: i32,
        content: Box<Rule>,
    },
    Token {
        content: Box<Rule>,
    },
    ImmediateToken {
        content: Box<Rule>,
    },
    Field {
        name: String,
        content: Box<Rule>,
    },
    Alias {
        value: String,
        #[serde(default)]
        named: bool,
        content: Box<Rule>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PrecedenceValue {
    Integer(i32),
    Name(String),
}

impl Rule {
    /// Whether the rule describes a single token by itself.
    pub(crate) fn is_token(&self) -> bool {
        matches!(
            self,
            Self::String { .. } | Self::Pattern { .. } | Self::Token { .. } | Self::ImmediateToken { .. }
        )
    }
}
