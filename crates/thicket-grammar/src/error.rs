use thiserror::Error;

use crate::PatternError;

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("incompatible grammar table version {version}, supported versions are {min}..={max}")]
    IncompatibleVersion { version: u32, min: u32, max: u32 },
    #[error("malformed grammar table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid grammar table: {0}")]
    InvalidTable(String),
    #[error("invalid pattern in lexical rule {rule}: {source}")]
    Pattern {
        rule: usize,
        #[source]
        source: PatternError,
    },
}
