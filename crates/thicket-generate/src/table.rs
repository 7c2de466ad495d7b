//! Emits the parse table from the item sets.

use std::cmp::Ordering;

use indexmap::IndexMap;
use thicket_grammar::{
    Action, ActionEntry, GotoEntry, GrammarTable, LANGUAGE_VERSION, LexModeId, LexModeTable,
    Production, ProductionId, StateId, StateTable, Symbol,
};

use crate::GenerateError;
use crate::lalr::{Automaton, State};
use crate::prepare::{Associativity, PreparedGrammar, narrow};

pub(crate) fn emit(
    name: &str,
    grammar: PreparedGrammar,
    automaton: &Automaton,
) -> Result<GrammarTable, GenerateError> {
    narrow(automaton.states.len().saturating_sub(1), "parse states")?;
    narrow(grammar.productions.len().saturating_sub(1), "productions")?;

    let extras: Vec<Symbol> = grammar
        .all_symbols()
        .filter(|&symbol| grammar.is_extra(symbol) && grammar.is_terminal(symbol))
        .collect();
    let inside_extras = automaton.inside_extras();
    let mut lex_modes: IndexMap<(Vec<Symbol>, Vec<Symbol>), LexModeId> = IndexMap::new();
    let mut conflicts = 0;

    let mut states = Vec::with_capacity(automaton.states.len());
    for (index, state) in automaton.states.iter().enumerate() {
        let mut actions = state_actions(&grammar, automaton, index, state, &mut conflicts)?;
        let mut gotos = Vec::new();
        for &(symbol, target) in &state.transitions {
            if !grammar.is_terminal(symbol) {
                gotos.push(GotoEntry { symbol, state: StateId(narrow(target, "parse states")?) });
            }
        }
        if !inside_extras[index] {
            enter_extras(&grammar, automaton, index, &mut actions, &mut gotos)?;
        }

        let (mut tokens, mut externals) = (Vec::new(), Vec::new());
        for symbol in actions.iter().map(|entry: &ActionEntry| entry.symbol).chain(extras.iter().copied()) {
            let list = if grammar.external_tokens.contains(&symbol) { &mut externals } else { &mut tokens };
            if !list.contains(&symbol) {
                list.push(symbol);
            }
        }
        tokens.sort_unstable();
        externals.sort_unstable();
        let next = LexModeId(narrow(lex_modes.len(), "lexical modes")?);
        let lex_mode = *lex_modes.entry((tokens, externals)).or_insert(next);

        states.push(StateTable { lex_mode, actions, gotos });
    }

    if conflicts > 0 {
        tracing::debug!(conflicts, "conflicts left for the parser to explore");
    }
    tracing::debug!(states = states.len(), lex_modes = lex_modes.len(), "emitted parse table");

    let productions = grammar
        .productions
        .iter()
        .map(|production| {
            Ok(Production {
                symbol: production.symbol,
                child_count: narrow(production.steps.len(), "children in one production")?,
                dynamic_precedence: production.dynamic_precedence.clamp(i16::MIN.into(), i16::MAX.into())
                    as i16,
                rename: production.rename,
            })
        })
        .collect::<Result<_, GenerateError>>()?;

    Ok(GrammarTable {
        version: LANGUAGE_VERSION,
        name: name.to_owned(),
        start_symbol: grammar.start,
        productions,
        lex_modes: lex_modes
            .into_keys()
            .map(|(tokens, externals)| LexModeTable { tokens, externals })
            .collect(),
        symbols: grammar.symbols,
        lex_rules: grammar.lex_rules,
        external_tokens: grammar.external_tokens,
        states,
    })
}

/// Lets `index` start a non-terminal extra on any of its first tokens that
/// the state has no other use for. Finishing the extra returns to `index`.
fn enter_extras(
    grammar: &PreparedGrammar,
    automaton: &Automaton,
    index: usize,
    actions: &mut Vec<ActionEntry>,
    gotos: &mut Vec<GotoEntry>,
) -> Result<(), GenerateError> {
    let here = StateId(narrow(index, "parse states")?);
    for &(extra, start) in &automaton.extra_starts {
        for &(symbol, target) in &automaton.states[start].transitions {
            if grammar.is_terminal(symbol) && !actions.iter().any(|entry| entry.symbol == symbol) {
                let state = StateId(narrow(target, "parse states")?);
                actions.push(ActionEntry { symbol, actions: vec![Action::Shift { state }] });
            }
        }
        if !gotos.iter().any(|goto| goto.symbol == extra) {
            gotos.push(GotoEntry { symbol: extra, state: here });
        }
    }
    actions.sort_by_key(|entry| entry.symbol);
    Ok(())
}

struct Reduction {
    production: usize,
    precedence: i32,
    associativity: Option<Associativity>,
}

fn state_actions(
    grammar: &PreparedGrammar,
    automaton: &Automaton,
    index: usize,
    state: &State,
    conflicts: &mut usize,
) -> Result<Vec<ActionEntry>, GenerateError> {
    let mut reductions: IndexMap<Symbol, Vec<Reduction>> = IndexMap::new();
    let mut accepts = false;
    for (item, lookahead) in &state.items {
        if automaton.next_symbol(*item).is_some() {
            continue;
        }
        if item.production == automaton.augmented {
            accepts = lookahead.contains(Symbol::END);
            continue;
        }
        let last = grammar.productions[item.production].steps.last();
        for symbol in lookahead.iter() {
            reductions.entry(symbol).or_default().push(Reduction {
                production: item.production,
                precedence: last.map_or(0, |step| step.precedence()),
                associativity: last.and_then(|step| step.associativity),
            });
        }
    }

    let mut symbols: Vec<Symbol> = reductions.keys().copied().collect();
    symbols.extend(
        state.transitions.iter().map(|&(symbol, _)| symbol).filter(|&symbol| grammar.is_terminal(symbol)),
    );
    if accepts {
        symbols.push(Symbol::END);
    }
    symbols.sort_unstable();
    symbols.dedup();

    symbols
        .into_iter()
        .map(|symbol| {
            let shift = state.transitions.iter().find(|&&(next, _)| next == symbol).map(|&(_, target)| {
                (target, shift_precedence(grammar, automaton, state, symbol))
            });
            let mut reductions = reductions.swap_remove(&symbol).unwrap_or_default();
            let actions = resolve(shift, &mut reductions, accepts && symbol == Symbol::END)?;
            if actions.len() > 1 {
                *conflicts += 1;
                tracing::debug!(
                    state = index,
                    symbol = %grammar.symbols[symbol.index()].name,
                    actions = actions.len(),
                    "unresolved conflict"
                );
            }
            Ok(ActionEntry { symbol, actions })
        })
        .collect()
}

/// Precedence of shifting `symbol`: the highest one among the items that
/// would shift it.
fn shift_precedence(grammar: &PreparedGrammar, automaton: &Automaton, state: &State, symbol: Symbol) -> i32 {
    state
        .items
        .keys()
        .filter(|item| item.production != automaton.augmented)
        .filter(|item| automaton.next_symbol(**item) == Some(symbol))
        .map(|item| grammar.productions[item.production].steps[item.dot].precedence())
        .max()
        .unwrap_or(0)
}

fn resolve(
    shift: Option<(usize, i32)>,
    reductions: &mut Vec<Reduction>,
    accept: bool,
) -> Result<Vec<Action>, GenerateError> {
    if let Some(highest) = reductions.iter().map(|reduction| reduction.precedence).max() {
        reductions.retain(|reduction| reduction.precedence == highest);
    }

    let mut keep_shift = shift.is_some();
    if let Some((_, shift_precedence)) = shift {
        reductions.retain(|reduction| {
            match reduction.precedence.cmp(&shift_precedence) {
                Ordering::Greater => {
                    keep_shift = false;
                    true
                }
                Ordering::Less => false,
                Ordering::Equal => match reduction.associativity {
                    Some(Associativity::Left) => {
                        keep_shift = false;
                        true
                    }
                    Some(Associativity::Right) => false,
                    None => true,
                },
            }
        });
    }

    let mut actions = Vec::new();
    if let Some((target, _)) = shift
        && keep_shift
    {
        actions.push(Action::Shift { state: StateId(narrow(target, "parse states")?) });
    }
    for reduction in reductions.iter() {
        let production = ProductionId(narrow(reduction.production, "productions")?);
        actions.push(Action::Reduce { production });
    }
    if accept {
        actions.push(Action::Accept);
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduction(production: usize, precedence: i32, associativity: Option<Associativity>) -> Reduction {
        Reduction { production, precedence, associativity }
    }

    #[test]
    fn precedence_and_associativity_settle_conflicts() {
        let shift = Action::Shift { state: StateId(7) };
        let reduce = Action::Reduce { production: ProductionId(3) };

        let left = resolve(Some((7, 1)), &mut vec![reduction(3, 1, Some(Associativity::Left))], false).unwrap();
        assert_eq!(left, [reduce]);
        let right = resolve(Some((7, 1)), &mut vec![reduction(3, 1, Some(Associativity::Right))], false).unwrap();
        assert_eq!(right, [shift]);
        let tighter = resolve(Some((7, 2)), &mut vec![reduction(3, 1, Some(Associativity::Left))], false).unwrap();
        assert_eq!(tighter, [shift]);
        let looser = resolve(Some((7, 0)), &mut vec![reduction(3, 1, None)], false).unwrap();
        assert_eq!(looser, [reduce]);
        let kept = resolve(Some((7, 0)), &mut vec![reduction(3, 0, None)], false).unwrap();
        assert_eq!(kept, [shift, reduce]);
    }

    #[test]
    fn higher_reduction_wins_reduce_reduce() {
        let actions = resolve(None, &mut vec![reduction(1, 0, None), reduction(2, 4, None)], false).unwrap();
        assert_eq!(actions, [Action::Reduce { production: ProductionId(2) }]);
        let actions = resolve(None, &mut vec![reduction(1, 0, None), reduction(2, 0, None)], true).unwrap();
        assert_eq!(
            actions,
            [
                Action::Reduce { production: ProductionId(1) },
                Action::Reduce { production: ProductionId(2) },
                Action::Accept
            ]
        );
    }

    #[test]
    fn oversized_indices_are_reported() {
        let error = resolve(Some((70_000, 0)), &mut Vec::new(), false).unwrap_err();
        assert_eq!(error.to_string(), "grammar needs 70001 parse states, more than a table can address");
        let error = resolve(None, &mut vec![reduction(65_536, 0, None)], false).unwrap_err();
        assert_eq!(error.to_string(), "grammar needs 65537 productions, more than a table can address");
    }
}
