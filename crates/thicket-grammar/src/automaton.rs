//! Thompson automaton over every lexical rule of a language.
//!
//! All rules share one NFA whose accepting states name the rule they finish.
//! Each lexical mode gets a precomputed start closure that only reaches the
//! rules valid in that mode, so context-aware lexing costs nothing extra per
//! token. The simulator reports exactly how far it had to look, which is what
//! incremental reparsing needs to decide whether a token survived an edit.

use crate::pattern::{self, Hir};
use crate::{LexRule, PatternError, Symbol, SymbolSet};

const MAX_STATES: usize = 1 << 20;

#[derive(Debug, Clone)]
enum State {
    Bytes { ranges: Box<[(u8, u8)]>, next: u32 },
    Split { first: u32, second: u32 },
    Epsilon { next: u32 },
    Match { rule: u32 },
}

#[derive(Debug, Clone)]
struct CompiledRule {
    symbol: Option<Symbol>,
    priority: i32,
    start: u32,
}

/// The longest match found by [`LexAutomaton::longest_match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexMatch {
    /// Index of the winning rule and the number of bytes it matched, if any
    /// rule matched a non-empty prefix.
    pub matched: Option<(usize, usize)>,
    /// Number of bytes inspected from the start position. Reaching the end of
    /// the input counts as inspecting one more byte.
    pub examined: usize,
}

/// Reusable buffers for [`LexAutomaton::longest_match`].
#[derive(Debug, Default)]
pub struct MatchScratch {
    current: StateSet,
    next: StateSet,
    stack: Vec<u32>,
}

#[derive(Debug, Default)]
struct StateSet {
    members: Vec<u32>,
    marked: Vec<bool>,
}

impl StateSet {
    fn reset(&mut self, capacity: usize) {
        if self.marked.len() < capacity {
            self.marked.resize(capacity, false);
        }
        for &member in &self.members {
            self.marked[member as usize] = false;
        }
        self.members.clear();
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LexAutomaton {
    states: Vec<State>,
    rules: Vec<CompiledRule>,
    mode_starts: Vec<Box<[u32]>>,
    error_mode_start: Box<[u32]>,
}

impl LexAutomaton {
    /// Compiles `rules` and the start closure of each mode in `modes`.
    ///
    /// On failure returns the index of the offending rule.
    pub(crate) fn new(
        rules: &[LexRule],
        modes: &[SymbolSet],
    ) -> Result<Self, (usize, PatternError)> {
        let mut compiler = Compiler { states: Vec::new() };
        let mut compiled = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            let hir = pattern::parse(&rule.pattern, rule.case_insensitive)
                .map_err(|error| (index, error))?;
            let accept = compiler.push(State::Match { rule: index as u32 });
            let start = compiler.compile(&hir, accept);
            if compiler.states.len() > MAX_STATES {
                return Err((
                    index,
                    PatternError {
                        offset: 0,
                        kind: crate::PatternErrorKind::Unsupported("pattern size"),
                    },
                ));
            }
            compiled.push(CompiledRule { symbol: rule.symbol, priority: rule.priority, start });
        }

        let mut automaton = Self {
            states: compiler.states,
            rules: compiled,
            mode_starts: Vec::new(),
            error_mode_start: Box::new([]),
        };
        let mut scratch = MatchScratch::default();
        automaton.mode_starts = modes
            .iter()
            .map(|valid| {
                automaton.start_closure(&mut scratch, |symbol| {
                    symbol.is_none_or(|symbol| valid.contains(symbol))
                })
            })
            .collect();
        automaton.error_mode_start = automaton.start_closure(&mut scratch, |_| true);
        Ok(automaton)
    }

    /// Returns the symbol a rule produces, or `None` for skipped padding.
    pub fn rule_symbol(&self, index: usize) -> Option<Symbol> {
        self.rules[index].symbol
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Start closure for a lexical mode, or for the error mode in which every
    /// rule is valid.
    pub fn start(&self, mode: Option<usize>) -> &[u32] {
        match mode.and_then(|mode| self.mode_starts.get(mode)) {
            Some(start) => start,
            None => &self.error_mode_start,
        }
    }

    /// Runs the automaton from `start` over `text`, returning the longest
    /// non-empty match. Equal lengths are decided by priority, then by rule
    /// order.
    pub fn longest_match(&self, start: &[u32], text: &[u8], scratch: &mut MatchScratch) -> LexMatch {
        let capacity = self.states.len();
        scratch.current.reset(capacity);
        scratch.next.reset(capacity);
        for &state in start {
            insert(&mut scratch.current, state);
        }

        let mut matched: Option<(usize, usize)> = None;
        let mut pos = 0;
        loop {
            if pos > 0 {
                for &state in &scratch.current.members {
                    if let State::Match { rule } = self.states[state as usize] {
                        let rule = rule as usize;
                        matched = Some(match matched {
                            Some((best, len)) if len == pos && !self.prefers(rule, best) => {
                                (best, len)
                            }
                            _ => (rule, pos),
                        });
                    }
                }
            }

            let wants_input = scratch
                .current
                .members
                .iter()
                .any(|&state| matches!(self.states[state as usize], State::Bytes { .. }));
            if !wants_input {
                return LexMatch { matched, examined: pos };
            }
            let Some(&byte) = text.get(pos) else {
                return LexMatch { matched, examined: pos + 1 };
            };

            scratch.next.reset(capacity);
            for index in 0..scratch.current.members.len() {
                let state = scratch.current.members[index];
                if let State::Bytes { ranges, next } = &self.states[state as usize]
                    && ranges.iter().any(|&(lo, hi)| lo <= byte && byte <= hi)
                {
                    self.close(&mut scratch.next, &mut scratch.stack, *next);
                }
            }
            pos += 1;
            if scratch.next.is_empty() {
                return LexMatch { matched, examined: pos };
            }
            std::mem::swap(&mut scratch.current, &mut scratch.next);
        }
    }

    fn prefers(&self, candidate: usize, current: usize) -> bool {
        let (a, b) = (&self.rules[candidate], &self.rules[current]);
        a.priority > b.priority || (a.priority == b.priority && candidate < current)
    }

    fn start_closure(
        &self,
        scratch: &mut MatchScratch,
        include: impl Fn(Option<Symbol>) -> bool,
    ) -> Box<[u32]> {
        scratch.current.reset(self.states.len());
        for rule in &self.rules {
            if include(rule.symbol) {
                self.close(&mut scratch.current, &mut scratch.stack, rule.start);
            }
        }
        let mut members = scratch.current.members.clone();
        members.sort_unstable();
        members.into_boxed_slice()
    }

    /// Adds `state` and everything reachable through epsilon edges.
    fn close(&self, set: &mut StateSet, stack: &mut Vec<u32>, state: u32) {
        stack.push(state);
        while let Some(state) = stack.pop() {
            if !insert(set, state) {
                continue;
            }
            match self.states[state as usize] {
                State::Split { first, second } => {
                    stack.push(second);
                    stack.push(first);
                }
                State::Epsilon { next } => stack.push(next),
                State::Bytes { .. } | State::Match { .. } => {}
            }
        }
    }
}

fn insert(set: &mut StateSet, state: u32) -> bool {
    let slot = &mut set.marked[state as usize];
    if *slot {
        return false;
    }
    *slot = true;
    set.members.push(state);
    true
}

struct Compiler {
    states: Vec<State>,
}

impl Compiler {
    fn push(&mut self, state: State) -> u32 {
        self.states.push(state);
        (self.states.len() - 1) as u32
    }

    /// Compiles `hir` so that a successful match continues at `next`, and
    /// returns the entry state.
    fn compile(&mut self, hir: &Hir, next: u32) -> u32 {
        match hir {
            Hir::Empty => next,
            Hir::Literal(bytes) => bytes.iter().rev().fold(next, |next, &byte| {
                self.push(State::Bytes { ranges: Box::new([(byte, byte)]), next })
            }),
            Hir::Class(ranges) => {
                self.push(State::Bytes { ranges: ranges.clone().into_boxed_slice(), next })
            }
            Hir::Concat(items) => items.iter().rev().fold(next, |next, item| self.compile(item, next)),
            Hir::Alternation(branches) => {
                let entries: Vec<u32> =
                    branches.iter().map(|branch| self.compile(branch, next)).collect();
                let mut entries = entries.into_iter().rev();
                let Some(last) = entries.next() else {
                    return next;
                };
                entries.fold(last, |rest, first| self.push(State::Split { first, second: rest }))
            }
            Hir::Repeat { hir, min, max } => {
                let mut entry = match max {
                    None => {
                        let loop_state = self.push(State::Epsilon { next });
                        let body = self.compile(hir, loop_state);
                        self.states[loop_state as usize] = State::Split { first: body, second: next };
                        loop_state
                    }
                    Some(max) => (0..max - min).fold(next, |rest, _| {
                        let body = self.compile(hir, rest);
                        self.push(State::Split { first: body, second: next })
                    }),
                };
                for _ in 0..*min {
                    entry = self.compile(hir, entry);
                }
                entry
            }
        }
    }
}
