use thicket_grammar::LanguageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid grammar JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("undefined symbol `{0}`")]
    UndefinedSymbol(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("grammar needs {count} {what}, more than a table can address")]
    TooLarge { what: &'static str, count: usize },
    #[error("grammar has no rules")]
    EmptyGrammar,
    #[error("generated table does not load: {0}")]
    Language(#[from] LanguageError),
}
