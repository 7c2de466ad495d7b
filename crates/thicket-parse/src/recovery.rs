//! Error recovery.
//!
//! When a version has no action for its lookahead the parser asks a
//! [`RecoveryStrategy`] what to try. Every offered action runs on its own
//! version and the versions compete on error cost, so strategies only decide
//! which repairs are worth exploring.

use thicket_grammar::{Action, Language, StateId, Symbol};

pub const ERROR_COST_PER_RECOVERY: u32 = 500;
pub const ERROR_COST_PER_MISSING_TREE: u32 = 110;
pub const ERROR_COST_PER_SKIPPED_TREE: u32 = 100;
pub const ERROR_COST_PER_SKIPPED_LINE: u32 = 30;
pub const ERROR_COST_PER_SKIPPED_CHAR: u32 = 1;

/// Versions costing this much more than the best one are dropped.
pub const MAX_COST_DIFFERENCE: u32 = 18 * ERROR_COST_PER_SKIPPED_TREE;

/// Recoveries one version may perform without moving forward. Past this only
/// skipping or abandoning is accepted.
pub const MAX_RECOVERIES_PER_POSITION: u32 = 4;

/// How far down the stack recovery looks for a state that accepts the
/// lookahead.
pub const MAX_POP_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Pretends a zero-width token was present before the lookahead.
    InsertMissing(Symbol),
    /// Wraps the top `depth` subtrees in an `ERROR` node.
    PopStack { depth: usize },
    /// Wraps the lookahead in an `ERROR` node and moves past it.
    SkipToken,
    /// Ends the parse with everything so far under an `ERROR` root.
    Abandon,
}

/// What a strategy gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryContext<'a> {
    pub language: &'a Language,
    pub state: StateId,
    pub lookahead: Symbol,
    pub at_end: bool,
    /// States exposed by popping one, two, ... subtrees.
    pub states_below: &'a [StateId],
    /// Whether a missing token may still be inserted here.
    pub can_insert: bool,
}

impl RecoveryContext<'_> {
    /// Whether the lookahead has any action in `state`.
    pub fn accepts_lookahead(&self, state: StateId) -> bool {
        !self.language.actions(state, self.lookahead).is_empty()
    }
}

pub trait RecoveryStrategy: Send {
    /// Actions to try, most promising first. Actions the parser cannot
    /// perform are ignored.
    fn recover(&self, context: &RecoveryContext<'_>) -> Vec<RecoveryAction>;
}

/// Tries a missing token, then popping to a state that accepts the
/// lookahead, then skipping it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRecovery;

impl RecoveryStrategy for DefaultRecovery {
    fn recover(&self, context: &RecoveryContext<'_>) -> Vec<RecoveryAction> {
        let mut actions = Vec::new();
        if context.can_insert
            && let Some(symbol) = insertable_symbol(context)
        {
            actions.push(RecoveryAction::InsertMissing(symbol));
        }
        if let Some(depth) =
            context.states_below.iter().position(|&state| context.accepts_lookahead(state))
        {
            actions.push(RecoveryAction::PopStack { depth: depth + 1 });
        }
        actions.push(if context.at_end { RecoveryAction::Abandon } else { RecoveryAction::SkipToken });
        actions
    }
}

/// The lowest expected token after which the lookahead can be handled.
fn insertable_symbol(context: &RecoveryContext<'_>) -> Option<Symbol> {
    let language = context.language;
    language.expected_symbols(context.state).iter().copied().find(|&symbol| {
        if symbol == Symbol::END || language.metadata(symbol).extra {
            return false;
        }
        language.actions(context.state, symbol).iter().any(|action| match *action {
            Action::Shift { state } => context.accepts_lookahead(state),
            _ => false,
        })
    })
}

/// Only ever skips the offending token, or gives up at the end of input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipTokenRecovery;

impl RecoveryStrategy for SkipTokenRecovery {
    fn recover(&self, context: &RecoveryContext<'_>) -> Vec<RecoveryAction> {
        vec![if context.at_end { RecoveryAction::Abandon } else { RecoveryAction::SkipToken }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUM: &str = r#"{
      "version": 2,
      "name": "sum",
      "symbols": [
        { "name": "end", "type": "terminal" },
        { "name": "ERROR", "type": "terminal", "visible": true, "named": true },
        { "name": "number", "type": "terminal", "visible": true, "named": true },
        { "name": "+", "type": "terminal", "visible": true },
        { "name": "sum", "type": "non_terminal", "visible": true, "named": true }
      ],
      "start_symbol": 4,
      "productions": [{ "symbol": 4, "child_count": 3 }],
      "lex_rules": [
        { "pattern": "\\s+" },
        { "symbol": 2, "pattern": "\\d+" },
        { "symbol": 3, "pattern": "\\+" }
      ],
      "lex_modes": [{ "tokens": [2] }, { "tokens": [3] }, { "tokens": [0] }],
      "states": [
        { "lex_mode": 0, "actions": [{ "symbol": 2, "actions": [{ "type": "shift", "state": 1 }] }],
          "gotos": [{ "symbol": 4, "state": 4 }] },
        { "lex_mode": 1, "actions": [{ "symbol": 3, "actions": [{ "type": "shift", "state": 2 }] }] },
        { "lex_mode": 0, "actions": [{ "symbol": 2, "actions": [{ "type": "shift", "state": 3 }] }] },
        { "lex_mode": 2, "actions": [{ "symbol": 0, "actions": [{ "type": "reduce", "production": 0 }] }] },
        { "lex_mode": 2, "actions": [{ "symbol": 0, "actions": [{ "type": "accept" }] }] }
      ]
    }"#;

    fn context<'a>(
        language: &'a Language,
        state: u16,
        lookahead: Symbol,
        states_below: &'a [StateId],
    ) -> RecoveryContext<'a> {
        RecoveryContext {
            language,
            state: StateId(state),
            lookahead,
            at_end: lookahead == Symbol::END,
            states_below,
            can_insert: true,
        }
    }

    #[test]
    fn default_inserts_the_token_that_unblocks_the_lookahead() {
        let language = Language::load(SUM.as_bytes()).unwrap();
        let actions = DefaultRecovery.recover(&context(&language, 2, Symbol::END, &[]));
        assert_eq!(actions, [RecoveryAction::InsertMissing(Symbol(2)), RecoveryAction::Abandon]);
    }

    #[test]
    fn default_pops_to_a_state_that_accepts_the_lookahead() {
        let language = Language::load(SUM.as_bytes()).unwrap();
        let below = [StateId(1), StateId(0)];
        let actions = DefaultRecovery.recover(&context(&language, 2, Symbol(3), &below));
        assert_eq!(actions, [RecoveryAction::PopStack { depth: 1 }, RecoveryAction::SkipToken]);
    }

    #[test]
    fn skip_strategy_never_repairs() {
        let language = Language::load(SUM.as_bytes()).unwrap();
        let actions = SkipTokenRecovery.recover(&context(&language, 2, Symbol(3), &[]));
        assert_eq!(actions, [RecoveryAction::SkipToken]);
    }
}
