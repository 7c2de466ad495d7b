//! LALR(1) item sets.
//!
//! States are built as canonical LR(1) states whose kernels are merged as
//! soon as their cores agree. Merging widens lookaheads, so a state whose
//! kernel grew is processed again until nothing changes.
//!
//! Every extra written as a rule gets a start state of its own, entered from
//! anywhere its first token shows up. Its reductions accept any lookahead.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use thicket_grammar::{Symbol, SymbolSet};

use crate::prepare::PreparedGrammar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Item {
    pub(crate) production: usize,
    pub(crate) dot: usize,
}

pub(crate) type ItemSet = IndexMap<Item, SymbolSet>;

#[derive(Debug)]
pub(crate) struct State {
    /// The closed item set with final lookaheads.
    pub(crate) items: ItemSet,
    /// Successor states in ascending symbol order.
    pub(crate) transitions: Vec<(Symbol, usize)>,
}

pub(crate) struct Automaton {
    pub(crate) states: Vec<State>,
    /// Index of the production `start' -> start`, one past the grammar's own.
    pub(crate) augmented: usize,
    /// Non-terminal extras with the state their productions start in.
    pub(crate) extra_starts: Vec<(Symbol, usize)>,
    rhs: Vec<Vec<Symbol>>,
}

impl Automaton {
    pub(crate) fn next_symbol(&self, item: Item) -> Option<Symbol> {
        self.rhs[item.production].get(item.dot).copied()
    }

    /// Marks the states reachable from an extra's start state.
    pub(crate) fn inside_extras(&self) -> Vec<bool> {
        let mut inside = vec![false; self.states.len()];
        let mut work: Vec<usize> = self.extra_starts.iter().map(|&(_, state)| state).collect();
        while let Some(state) = work.pop() {
            if std::mem::replace(&mut inside[state], true) {
                continue;
            }
            work.extend(self.states[state].transitions.iter().map(|&(_, target)| target));
        }
        inside
    }
}

pub(crate) fn build(grammar: &PreparedGrammar) -> Automaton {
    let mut builder = Builder::new(grammar);
    let mut kernels: Vec<ItemSet> = Vec::new();
    let mut by_core: FxHashMap<Vec<Item>, usize> = FxHashMap::default();
    let mut transitions: Vec<Vec<(Symbol, usize)>> = Vec::new();

    let start = IndexMap::from([(
        Item { production: builder.augmented, dot: 0 },
        SymbolSet::from_symbols([Symbol::END]),
    )]);
    by_core.insert(core(&start), 0);
    kernels.push(start);
    transitions.push(Vec::new());
    let mut work = vec![0];

    let anything = builder.any_terminal();
    let mut extra_starts = Vec::new();
    for extra in grammar.nonterminal_extras() {
        let kernel: ItemSet = builder.by_symbol[extra.index()]
            .iter()
            .map(|&production| (Item { production, dot: 0 }, anything.clone()))
            .collect();
        if kernel.is_empty() {
            continue;
        }
        let state = kernels.len();
        by_core.insert(core(&kernel), state);
        kernels.push(kernel);
        transitions.push(Vec::new());
        work.push(state);
        extra_starts.push((extra, state));
    }

    while let Some(state) = work.pop() {
        let closure = builder.closure(&kernels[state]);
        let mut successors: IndexMap<Symbol, ItemSet> = IndexMap::new();
        for (item, lookahead) in &closure {
            let Some(symbol) = builder.rhs[item.production].get(item.dot).copied() else {
                continue;
            };
            let advanced = Item { production: item.production, dot: item.dot + 1 };
            successors
                .entry(symbol)
                .or_default()
                .entry(advanced)
                .or_default()
                .union_with(lookahead);
        }
        successors.sort_keys();

        let mut edges = Vec::with_capacity(successors.len());
        for (symbol, kernel) in successors {
            let target = match by_core.get(&core(&kernel)) {
                Some(&target) => {
                    let mut grew = false;
                    for (item, lookahead) in &kernel {
                        if let Some(existing) = kernels[target].get_mut(item) {
                            grew |= existing.union_with(lookahead);
                        }
                    }
                    if grew && !work.contains(&target) {
                        work.push(target);
                    }
                    target
                }
                None => {
                    let target = kernels.len();
                    by_core.insert(core(&kernel), target);
                    kernels.push(kernel);
                    transitions.push(Vec::new());
                    work.push(target);
                    target
                }
            };
            edges.push((symbol, target));
        }
        transitions[state] = edges;
    }

    let states = kernels
        .iter()
        .zip(transitions)
        .map(|(kernel, transitions)| State { items: builder.closure(kernel), transitions })
        .collect::<Vec<_>>();
    tracing::debug!(states = states.len(), "built LALR(1) automaton");
    Automaton {
        states,
        augmented: builder.augmented,
        extra_starts,
        rhs: std::mem::take(&mut builder.rhs),
    }
}

fn core(kernel: &ItemSet) -> Vec<Item> {
    let mut items: Vec<Item> = kernel.keys().copied().collect();
    items.sort_unstable();
    items
}

struct Builder<'g> {
    grammar: &'g PreparedGrammar,
    augmented: usize,
    rhs: Vec<Vec<Symbol>>,
    /// Productions of each non-terminal, indexed by symbol.
    by_symbol: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<SymbolSet>,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g PreparedGrammar) -> Self {
        let mut rhs: Vec<Vec<Symbol>> = grammar
            .productions
            .iter()
            .map(|production| production.steps.iter().map(|step| step.symbol).collect())
            .collect();
        let augmented = rhs.len();
        rhs.push(vec![grammar.start]);

        let mut by_symbol = vec![Vec::new(); grammar.symbols.len()];
        for (index, production) in grammar.productions.iter().enumerate() {
            by_symbol[production.symbol.index()].push(index);
        }

        let mut builder = Self {
            grammar,
            augmented,
            rhs,
            by_symbol,
            nullable: vec![false; grammar.symbols.len()],
            first: vec![SymbolSet::new(); grammar.symbols.len()],
        };
        builder.compute_first_sets();
        builder
    }

    fn compute_first_sets(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for (production, rule) in self.grammar.productions.iter().enumerate() {
                let lhs = rule.symbol.index();
                let mut nullable = true;
                for &symbol in &self.rhs[production] {
                    if self.grammar.is_terminal(symbol) {
                        changed |= self.first[lhs].insert(symbol);
                        nullable = false;
                        break;
                    }
                    let first = self.first[symbol.index()].clone();
                    changed |= self.first[lhs].union_with(&first);
                    if !self.nullable[symbol.index()] {
                        nullable = false;
                        break;
                    }
                }
                if nullable && !self.nullable[lhs] {
                    self.nullable[lhs] = true;
                    changed = true;
                }
            }
        }
    }

    /// Every terminal the lexer can produce, end of input included.
    fn any_terminal(&self) -> SymbolSet {
        SymbolSet::from_symbols(
            self.grammar
                .all_symbols()
                .filter(|&symbol| symbol != Symbol::ERROR && self.grammar.is_terminal(symbol)),
        )
    }

    /// Terminals that can start `symbols` followed by `lookahead`.
    fn first_of(&self, symbols: &[Symbol], lookahead: &SymbolSet) -> SymbolSet {
        let mut first = SymbolSet::new();
        for &symbol in symbols {
            if self.grammar.is_terminal(symbol) {
                first.insert(symbol);
                return first;
            }
            first.union_with(&self.first[symbol.index()]);
            if !self.nullable[symbol.index()] {
                return first;
            }
        }
        first.union_with(lookahead);
        first
    }

    fn closure(&self, kernel: &ItemSet) -> ItemSet {
        let mut items = kernel.clone();
        let mut work: Vec<usize> = (0..items.len()).collect();
        while let Some(index) = work.pop() {
            let (&item, lookahead) = match items.get_index(index) {
                Some(entry) => entry,
                None => continue,
            };
            let rhs = &self.rhs[item.production];
            let Some(&next) = rhs.get(item.dot) else {
                continue;
            };
            if self.grammar.is_terminal(next) {
                continue;
            }
            let follow = self.first_of(&rhs[item.dot + 1..], lookahead);
            for &production in &self.by_symbol[next.index()] {
                let item = Item { production, dot: 0 };
                match items.get_index_of(&item) {
                    Some(existing) => {
                        if items[existing].union_with(&follow) {
                            work.push(existing);
                        }
                    }
                    None => {
                        items.insert(item, follow.clone());
                        work.push(items.len() - 1);
                    }
                }
            }
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::prepare;

    #[test]
    fn merges_states_with_equal_cores() {
        // After "a" "c" and after "b" "c" the items `x: "c" .` and `y: "c" .`
        // have swapped lookaheads. Merging the two states makes them collide.
        let json = r#"{
          "name": "lr1",
          "extras": [],
          "rules": {
            "s": { "type": "CHOICE", "members": [
              { "type": "SEQ", "members": [{ "type": "STRING", "value": "a" }, { "type": "SYMBOL", "name": "x" }, { "type": "STRING", "value": "a" }] },
              { "type": "SEQ", "members": [{ "type": "STRING", "value": "b" }, { "type": "SYMBOL", "name": "x" }, { "type": "STRING", "value": "b" }] },
              { "type": "SEQ", "members": [{ "type": "STRING", "value": "a" }, { "type": "SYMBOL", "name": "y" }, { "type": "STRING", "value": "b" }] },
              { "type": "SEQ", "members": [{ "type": "STRING", "value": "b" }, { "type": "SYMBOL", "name": "y" }, { "type": "STRING", "value": "a" }] }
            ]},
            "x": { "type": "SEQ", "members": [{ "type": "STRING", "value": "c" }] },
            "y": { "type": "SEQ", "members": [{ "type": "STRING", "value": "c" }] }
          }
        }"#;
        let grammar = prepare(&serde_json::from_str(json).unwrap()).unwrap();
        let automaton = build(&grammar);
        let name = |symbol: Symbol| grammar.symbols[symbol.index()].name.as_str();

        let completed: Vec<Vec<(&str, Vec<&str>)>> = automaton
            .states
            .iter()
            .map(|state| {
                state
                    .items
                    .iter()
                    .filter(|(item, _)| {
                        item.production != automaton.augmented && automaton.next_symbol(**item).is_none()
                    })
                    .map(|(item, lookahead)| {
                        let lhs = grammar.productions[item.production].symbol;
                        let mut lookahead: Vec<&str> = lookahead.iter().map(name).collect();
                        lookahead.sort_unstable();
                        (name(lhs), lookahead)
                    })
                    .collect::<Vec<_>>()
            })
            .map(|mut items| {
                items.sort();
                items
            })
            .filter(|items: &Vec<_>| items.len() > 1)
            .collect();
        assert_eq!(completed, [vec![("x", vec!["a", "b"]), ("y", vec!["a", "b"])]]);
        assert_eq!(
            automaton.next_symbol(Item { production: automaton.augmented, dot: 0 }),
            Some(grammar.start)
        );
    }
}
