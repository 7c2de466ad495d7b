//! Incremental GLR parsing with error recovery.
//!
//! A [`Parser`] turns text into a [`Tree`] for whatever [`Language`] it is
//! given. Conflicts in the grammar are explored in parallel, syntax errors are
//! repaired with the cheapest combination of missing tokens and `ERROR`
//! nodes, and parsing never fails on bad input. Given the edited old tree,
//! every subtree the edit could not have affected is reused as is.

mod error;
mod options;
mod parser;
mod recovery;
mod reuse;
mod stack;


use thicket_grammar::{ExternalScanner, Language};
use thicket_inputs::TextSource;
use thicket_tree::{InputEdit, Tree};

pub use crate::error::ParseError;
pub use crate::options::{ParseStats, ParserOptions};
pub use crate::recovery::{
    DefaultRecovery, ERROR_COST_PER_MISSING_TREE, ERROR_COST_PER_RECOVERY,
    ERROR_COST_PER_SKIPPED_CHAR, ERROR_COST_PER_SKIPPED_LINE, ERROR_COST_PER_SKIPPED_TREE,
    MAX_COST_DIFFERENCE, RecoveryAction, RecoveryContext, RecoveryStrategy, SkipTokenRecovery,
};

pub struct Parser {
    language: Option<Language>,
    scanner: Option<Box<dyn ExternalScanner>>,
    options: ParserOptions,
    recovery: Box<dyn RecoveryStrategy>,
    stats: ParseStats,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            language: None,
            scanner: None,
            options: ParserOptions::default(),
            recovery: Box::new(DefaultRecovery),
            stats: ParseStats::default(),
        }
    }

    /// Switches to `language`, creating a fresh external scanner for it.
    pub fn set_language(&mut self, language: Language) {
        self.scanner = language.create_external_scanner();
        self.language = Some(language);
    }

    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    pub fn set_options(&mut self, options: ParserOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn set_recovery(&mut self, strategy: impl RecoveryStrategy + 'static) {
        self.recovery = Box::new(strategy);
    }

    /// Counters from the most recent call to [`parse`](Self::parse), kept even
    /// when it failed.
    pub fn last_stats(&self) -> ParseStats {
        self.stats
    }

    /// Parses `text`. When `old_tree` is the previous tree with every edit
    /// since applied, unchanged parts of it are reused.
    pub fn parse<T: TextSource + ?Sized>(
        &mut self,
        text: &T,
        old_tree: Option<&Tree>,
    ) -> Result<Tree, ParseError> {
        let language = self.language.clone().ok_or(ParseError::NoLanguage)?;
        let bytes = text.contiguous();
        if let Some(old_tree) = old_tree
            && old_tree.len().to_usize() != bytes.len()
        {
            return Err(ParseError::LengthMismatch {
                expected: old_tree.len().to_usize(),
                actual: bytes.len(),
            });
        }
        let old_root = old_tree.filter(|old_tree| {
            let same = old_tree.language().ptr_eq(&language);
            if !same {
                tracing::debug!("old tree belongs to another language, parsing from scratch");
            }
            same
        });

        let _span = tracing::debug_span!("parse", language = language.name(), len = bytes.len()).entered();
        let scanner = self.scanner.as_deref_mut().map(|scanner| scanner as &mut dyn ExternalScanner);
        let mut driver = parser::Driver::new(
            &language,
            &bytes,
            old_root.map(Tree::root_green),
            &self.options,
            &*self.recovery,
            scanner,
        );
        let result = driver.run();
        self.stats = driver.stats;
        tracing::debug!(
            steps = self.stats.steps,
            lexed = self.stats.lexed_tokens,
            reused = self.stats.reused_nodes,
            versions = self.stats.max_versions,
            "parsed"
        );
        Ok(Tree::new(result?, language))
    }

    /// Applies `edit` to `old_tree` and parses the edited `text` against it.
    pub fn reparse<T: TextSource + ?Sized>(
        &mut self,
        old_tree: &Tree,
        edit: &InputEdit,
        text: &T,
    ) -> Result<Tree, ParseError> {
        let edited = old_tree.edit(edit)?;
        self.parse(text, Some(&edited))
    }
}
