//! Compiles grammars written in the common JSON grammar format into parse
//! tables.
//!
//! Tokens are pulled out into lexical rules, the remaining rules are
//! flattened into productions and an LALR(1) automaton is built over them.
//! Conflicts that precedence and associativity do not settle stay in the
//! table; the parser explores them in parallel.

mod error;
mod grammar;
mod lalr;
mod prepare;
mod table;

use thicket_grammar::{GrammarTable, Language};

pub use crate::error::GenerateError;
pub use crate::grammar::{Grammar, PrecedenceValue, Rule};

/// Compiles a grammar from its JSON form.
pub fn generate(json: &str) -> Result<GrammarTable, GenerateError> {
    let grammar: Grammar = serde_json::from_str(json)?;
    generate_grammar(&grammar)
}

pub fn generate_grammar(grammar: &Grammar) -> Result<GrammarTable, GenerateError> {
    let _span = tracing::debug_span!("generate", grammar = %grammar.name).entered();
    let prepared = prepare::prepare(grammar)?;
    let automaton = lalr::build(&prepared);
    let table = table::emit(&grammar.name, prepared, &automaton)?;
    Language::from_table(table.clone())?;
    Ok(table)
}

/// Compiles and loads a grammar in one go.
pub fn load(json: &str) -> Result<Language, GenerateError> {
    Ok(Language::from_table(generate(json)?)?)
}
