use thicket_tree::EditError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no language set on the parser")]
    NoLanguage,
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("old tree covers {expected} bytes but the text has {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("parse exceeded its step or time budget")]
    BudgetExceeded,
}
