//! The GLR driver behind [`Parser::parse`](crate::Parser::parse).
//!
//! Parsing proceeds in rounds. Each round advances every version sitting at
//! the smallest position until it consumes its lookahead, finishes or
//! recovers. Conflicts fork versions, and after each round versions that
//! reached the same configuration are merged and the hopeless ones dropped.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thicket_grammar::{
    Action, ExternalScanner, Language, LexModeId, ProductionId, StateId, Symbol, SymbolInfo,
    SymbolType,
};
use thicket_lexer::{External, Lexer, Token};
use thicket_span::{Length, TextSize};
use thicket_tree::{GreenNode, LeafInfo, NodeFlags, NodeInfo};

use crate::recovery::{
    ERROR_COST_PER_MISSING_TREE, ERROR_COST_PER_RECOVERY, ERROR_COST_PER_SKIPPED_CHAR,
    ERROR_COST_PER_SKIPPED_LINE, ERROR_COST_PER_SKIPPED_TREE, MAX_COST_DIFFERENCE, MAX_POP_DEPTH,
    MAX_RECOVERIES_PER_POSITION, RecoveryAction, RecoveryContext, RecoveryStrategy,
};
use crate::reuse::{Candidates, ReusableNodes};
use crate::stack::{NodeId, PopCount, Stack};
use crate::{ParseError, ParseStats, ParserOptions};

/// How often the clock is consulted, in steps.
const TIMEOUT_CHECK_INTERVAL: u64 = 64;

#[derive(Debug, Clone)]
enum Source {
    Lexed(Token),
    /// The first leaf of `candidates`, offered as the next token.
    Reused { leaf: GreenNode, candidates: Candidates },
}

#[derive(Debug, Clone)]
struct Lookahead {
    symbol: Symbol,
    lex_mode: LexModeId,
    /// Absolute end of everything looked at to produce the token.
    examined_end: TextSize,
    is_end: bool,
    source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Active,
    Halted,
}

#[derive(Debug, Clone)]
struct Head {
    node: NodeId,
    status: Status,
    lookahead: Option<Lookahead>,
    /// Mode for the next token after a reused node, which must be the mode
    /// that node's lookahead was lexed in.
    lex_mode_override: Option<LexModeId>,
    external_state: Option<Arc<[u8]>>,
    missing_at: Option<TextSize>,
    recovery_position: TextSize,
    recoveries: u32,
    processed: bool,
}

pub(crate) struct Driver<'p> {
    language: &'p Language,
    options: &'p ParserOptions,
    recovery: &'p dyn RecoveryStrategy,
    scanner: Option<&'p mut dyn ExternalScanner>,
    lexer: Lexer<'p>,
    stack: Stack,
    heads: Vec<Head>,
    tokens: FxHashMap<(TextSize, LexModeId, Option<Arc<[u8]>>), Token>,
    reusable: Option<ReusableNodes>,
    finished: Option<GreenNode>,
    pub(crate) stats: ParseStats,
    started: Instant,
}

impl<'p> Driver<'p> {
    pub(crate) fn new(
        language: &'p Language,
        text: &'p [u8],
        old_root: Option<&GreenNode>,
        options: &'p ParserOptions,
        recovery: &'p dyn RecoveryStrategy,
        scanner: Option<&'p mut dyn ExternalScanner>,
    ) -> Self {
        let mut stack = Stack::default();
        let base = stack.base(language.start_state());
        let head = Head {
            node: base,
            status: Status::Active,
            lookahead: None,
            lex_mode_override: None,
            external_state: None,
            missing_at: None,
            recovery_position: TextSize::new(0),
            recoveries: 0,
            processed: false,
        };
        Self {
            language,
            options,
            recovery,
            scanner,
            lexer: Lexer::new(language, text),
            stack,
            heads: vec![head],
            tokens: FxHashMap::default(),
            reusable: old_root.filter(|_| options.reuse).map(ReusableNodes::new),
            finished: None,
            stats: ParseStats { max_versions: 1, ..ParseStats::default() },
            started: Instant::now(),
        }
    }

    pub(crate) fn run(&mut self) -> Result<GreenNode, ParseError> {
        loop {
            let position = self
                .heads
                .iter()
                .filter(|head| head.status == Status::Active)
                .map(|head| self.stack.get(head.node).position.bytes)
                .min();
            let Some(position) = position else {
                break;
            };

            let mut index = 0;
            while index < self.heads.len() {
                let head = &self.heads[index];
                if head.status == Status::Active
                    && !head.processed
                    && self.stack.get(head.node).position.bytes == position
                {
                    self.advance(index)?;
                    self.heads[index].processed = true;
                }
                index += 1;
            }
            self.condense();
        }

        match self.finished.take() {
            Some(root) => Ok(root),
            None => {
                tracing::warn!("every parse version halted, returning an error tree");
                Ok(self.fallback_root())
            }
        }
    }

    fn tick(&mut self) -> Result<(), ParseError> {
        self.stats.steps += 1;
        if let Some(max_steps) = self.options.max_steps
            && self.stats.steps > max_steps
        {
            return Err(ParseError::BudgetExceeded);
        }
        if let Some(timeout) = self.options.timeout
            && self.stats.steps % TIMEOUT_CHECK_INTERVAL == 0
            && self.started.elapsed() > timeout
        {
            return Err(ParseError::BudgetExceeded);
        }
        Ok(())
    }

    fn state(&self, index: usize) -> StateId {
        self.stack.get(self.heads[index].node).state
    }

    fn position(&self, index: usize) -> Length {
        self.stack.get(self.heads[index].node).position
    }

    fn active_count(&self) -> usize {
        self.heads.iter().filter(|head| head.status == Status::Active).count()
    }

    fn fork(&mut self, index: usize) -> usize {
        let mut head = self.heads[index].clone();
        head.status = Status::Active;
        head.processed = false;
        self.heads.push(head);
        self.heads.len() - 1
    }

    /// Runs one version until it consumes its lookahead, finishes or
    /// recovers.
    fn advance(&mut self, index: usize) -> Result<(), ParseError> {
        loop {
            self.tick()?;
            let lookahead = self.lookahead(index);
            let state = self.state(index);
            let actions: SmallVec<[Action; 2]> =
                self.language.actions(state, lookahead.symbol).iter().copied().collect();

            let Some((&first, rest)) = actions.split_first() else {
                if !lookahead.is_end && self.language.metadata(lookahead.symbol).extra {
                    self.shift(index, state, &lookahead, true);
                } else {
                    self.recover(index, &lookahead);
                }
                return Ok(());
            };

            for &action in rest {
                let fork = self.fork(index);
                self.apply(fork, action, &lookahead);
            }
            if !self.apply(index, first, &lookahead) {
                return Ok(());
            }
        }
    }

    /// Returns whether the version should keep going at the same position.
    fn apply(&mut self, index: usize, action: Action, lookahead: &Lookahead) -> bool {
        match action {
            Action::Shift { state } => {
                self.shift(index, state, lookahead, false);
                false
            }
            Action::Reduce { production } => {
                self.reduce(index, production, lookahead);
                self.heads[index].status == Status::Active
            }
            Action::Accept => {
                self.accept(index, lookahead);
                false
            }
        }
    }

    fn lookahead(&mut self, index: usize) -> Lookahead {
        if let Some(lookahead) = &self.heads[index].lookahead {
            return lookahead.clone();
        }
        let lookahead = self.next_lookahead(index);
        self.heads[index].lookahead = Some(lookahead.clone());
        lookahead
    }

    fn next_lookahead(&mut self, index: usize) -> Lookahead {
        let single = self.active_count() == 1;
        let head = &self.heads[index];
        let top = self.stack.get(head.node);
        let position = top.position;
        let mode = head.lex_mode_override.unwrap_or_else(|| self.language.lex_mode(top.state));
        let external_state = head.external_state.clone();

        if let Some(reusable) = &mut self.reusable
            && let Some(candidates) = reusable.candidates_at(position.bytes)
            && single
            && let Some(leaf) = candidates.leaf().cloned()
            && leaf_is_reusable(self.language, &leaf, mode)
            && candidates.external_state == external_state
        {
            tracing::trace!(
                symbol = self.language.symbol_name(leaf.symbol()),
                position = u32::from(position.bytes),
                "reusing token"
            );
            return Lookahead {
                symbol: leaf.symbol(),
                lex_mode: mode,
                examined_end: position.bytes
                    + leaf.total().bytes
                    + TextSize::new(leaf.lookahead_bytes()),
                is_end: false,
                source: Source::Reused { leaf, candidates },
            };
        }

        let key = (position.bytes, mode, external_state);
        let token = match self.tokens.get(&key) {
            Some(token) => token.clone(),
            None => {
                let state = key.2.as_deref().unwrap_or_default();
                let external = self.scanner.as_deref_mut().map(|scanner| External { scanner, state });
                let token = self.lexer.lex(position, mode, external);
                if !token.is_end() {
                    self.stats.lexed_tokens += 1;
                }
                tracing::trace!(
                    symbol = self.language.symbol_name(token.symbol),
                    position = u32::from(position.bytes),
                    mode = mode.0,
                    "lexed token"
                );
                self.tokens.insert(key, token.clone());
                token
            }
        };
        Lookahead {
            symbol: token.symbol,
            lex_mode: mode,
            examined_end: position.bytes + token.total().bytes + TextSize::new(token.lookahead_bytes),
            is_end: token.is_end(),
            source: Source::Lexed(token),
        }
    }

    /// The lookahead as a single leaf pushed from `state`.
    fn lookahead_leaf(&self, lookahead: &Lookahead, state: StateId, extra: bool) -> GreenNode {
        match &lookahead.source {
            Source::Lexed(token) => {
                let mut flags = if token.is_error {
                    NodeFlags::ERROR
                } else {
                    visibility(self.language.metadata(token.symbol))
                };
                flags.set(NodeFlags::EXTRA, extra);
                GreenNode::new_leaf(LeafInfo {
                    symbol: token.symbol,
                    flags,
                    padding: token.padding,
                    size: token.size,
                    lookahead_bytes: token.lookahead_bytes,
                    parse_state: state,
                    lex_mode: lookahead.lex_mode,
                    error_cost: 0,
                    external_state: token.external_state.clone(),
                })
            }
            Source::Reused { leaf, .. } => adopt_leaf(leaf, state, extra),
        }
    }

    fn shift(&mut self, index: usize, next: StateId, lookahead: &Lookahead, extra: bool) {
        let state = self.state(index);
        if let Source::Reused { candidates, .. } = &lookahead.source
            && !extra
            && self.active_count() == 1
            && let Some((node, goto)) = self.reusable_ancestor(state, candidates)
        {
            tracing::trace!(
                symbol = self.language.symbol_name(node.symbol()),
                bytes = u32::from(node.total().bytes),
                "reusing node"
            );
            self.stats.reused_nodes += 1;
            self.stats.reused_bytes += node.total().to_usize();
            let head = &mut self.heads[index];
            head.node = self.stack.push(head.node, node.clone(), goto);
            head.lookahead = None;
            head.lex_mode_override = Some(node.lookahead_lex_mode());
            if let Some(external_state) = node.external_state() {
                head.external_state = Some(external_state.clone());
            }
            return;
        }

        let leaf = self.lookahead_leaf(lookahead, state, extra);
        if matches!(lookahead.source, Source::Reused { .. }) {
            self.stats.reused_nodes += 1;
            self.stats.reused_bytes += leaf.total().to_usize();
        }
        let head = &mut self.heads[index];
        if let Some(external_state) = leaf.external_state() {
            head.external_state = Some(external_state.clone());
        }
        head.node = self.stack.push(head.node, leaf, if extra { state } else { next });
        head.lookahead = None;
        head.lex_mode_override = None;
    }

    /// The largest old node starting with the reused token that was pushed
    /// from `state` and may be pushed whole.
    fn reusable_ancestor(&self, state: StateId, candidates: &Candidates) -> Option<(GreenNode, StateId)> {
        let (_, ancestors) = candidates.nodes.split_last()?;
        ancestors.iter().find_map(|node| {
            let reusable = node.parse_state() == state
                && !node.is_extra()
                && !node.has_changes()
                && !node.has_error()
                && !node.is_fragile();
            if !reusable {
                return None;
            }
            let goto = self.language.goto(state, node.symbol())?;
            Some((node.clone(), goto))
        })
    }

    fn reduce(&mut self, index: usize, production: ProductionId, lookahead: &Lookahead) {
        let production = *self.language.production(production);
        let paths =
            self.stack.pop(self.heads[index].node, PopCount::Children(production.child_count.into()));
        let info = self.language.metadata(production.symbol);
        let is_extra = info.extra;
        let mut flags = visibility(info);
        if is_extra {
            flags |= NodeFlags::EXTRA;
        }
        if self.active_count() > 1 || paths.len() > 1 {
            flags |= NodeFlags::FRAGILE;
        }

        let mut reduced: Vec<(NodeId, GreenNode, Vec<GreenNode>)> = Vec::new();
        for path in paths {
            let mut children = path.subtrees;
            let last_child = children.iter().rposition(|child| !child.is_extra()).map_or(0, |i| i + 1);
            let trailing = children.split_off(last_child);

            let base = self.stack.get(path.base);
            let renamed = match children.as_slice() {
                [child] if production.rename => Some(child.renamed(production.symbol, flags)),
                _ => None,
            };
            let node = renamed.unwrap_or_else(|| {
                GreenNode::new_node(
                    NodeInfo {
                        symbol: production.symbol,
                        flags,
                        parse_state: base.state,
                        lookahead_lex_mode: lookahead.lex_mode,
                        dynamic_precedence: production.dynamic_precedence.into(),
                        error_cost: 0,
                    },
                    children,
                )
            });
            // The lookahead decided this reduction, so it counts as examined.
            let end = (base.position + node.total()).bytes;
            let node = node.with_lookahead_bytes(
                u32::from(lookahead.examined_end).saturating_sub(u32::from(end)),
            );

            match reduced.iter_mut().find(|(base, ..)| *base == path.base) {
                Some(entry) => {
                    if compare_trees(&node, &entry.1) == Ordering::Less {
                        entry.1 = node;
                        entry.2 = trailing;
                    }
                }
                None => reduced.push((path.base, node, trailing)),
            }
        }

        if reduced.is_empty() {
            self.heads[index].status = Status::Halted;
            return;
        }
        for (i, (base, node, trailing)) in reduced.into_iter().enumerate() {
            let target = if i == 0 { index } else { self.fork(index) };
            let Some(goto) = self.language.goto(self.stack.get(base).state, node.symbol()) else {
                tracing::debug!(symbol = self.language.symbol_name(node.symbol()), "no goto after reduce");
                self.heads[target].status = Status::Halted;
                continue;
            };
            let mut top = self.stack.push(base, node, goto);
            for extra in trailing {
                top = self.stack.push(top, extra, goto);
            }
            let head = &mut self.heads[target];
            head.node = top;
            head.status = Status::Active;
            if is_extra {
                // The lookahead was lexed for the extra's own state, relex it
                // for the state the extra returned to.
                head.lookahead = None;
            }
        }
    }

    fn accept(&mut self, index: usize, lookahead: &Lookahead) {
        let end = self.lookahead_leaf(lookahead, self.state(index), false);
        for path in self.stack.pop(self.heads[index].node, PopCount::All) {
            if let Some(root) = build_root(path.subtrees, end.clone()) {
                self.offer_finished(root);
            }
        }
        self.heads[index].status = Status::Halted;
    }

    fn offer_finished(&mut self, root: GreenNode) {
        let better = match &self.finished {
            Some(current) => compare_trees(&root, current) == Ordering::Less,
            None => true,
        };
        if better {
            tracing::debug!(cost = root.error_cost(), "finished parse version");
            self.finished = Some(root);
        }
    }

    fn recover(&mut self, index: usize, lookahead: &Lookahead) {
        let position = self.position(index).bytes;
        let state = self.state(index);
        let states_below = self.stack.states_below(self.heads[index].node, MAX_POP_DEPTH);

        let head = &mut self.heads[index];
        if head.recovery_position != position {
            head.recovery_position = position;
            head.recoveries = 0;
        }
        let limited = head.recoveries >= MAX_RECOVERIES_PER_POSITION;
        let context = RecoveryContext {
            language: self.language,
            state,
            lookahead: lookahead.symbol,
            at_end: lookahead.is_end,
            states_below: &states_below,
            can_insert: !limited && head.missing_at != Some(position),
        };

        let mut actions: Vec<RecoveryAction> = self
            .recovery
            .recover(&context)
            .into_iter()
            .filter(|action| is_possible(&context, *action, limited))
            .collect();
        actions.dedup();
        if actions.is_empty() {
            actions.push(if context.at_end { RecoveryAction::Abandon } else { RecoveryAction::SkipToken });
        }
        tracing::debug!(
            state = state.0,
            lookahead = self.language.symbol_name(lookahead.symbol),
            position = u32::from(position),
            ?actions,
            "recovering"
        );

        for &action in &actions[1..] {
            let fork = self.fork(index);
            self.perform(fork, action, lookahead);
        }
        self.perform(index, actions[0], lookahead);
    }

    fn perform(&mut self, index: usize, action: RecoveryAction, lookahead: &Lookahead) {
        let state = self.state(index);
        let top = self.heads[index].node;
        self.heads[index].recoveries += 1;
        match action {
            RecoveryAction::InsertMissing(symbol) => {
                let next = self.language.actions(state, symbol).iter().find_map(|action| match *action {
                    Action::Shift { state } => Some(state),
                    _ => None,
                });
                let Some(next) = next else {
                    self.heads[index].status = Status::Halted;
                    return;
                };
                let leaf = GreenNode::new_leaf(LeafInfo {
                    symbol,
                    flags: visibility(self.language.metadata(symbol)) | NodeFlags::MISSING,
                    padding: Length::ZERO,
                    size: Length::ZERO,
                    lookahead_bytes: 0,
                    parse_state: state,
                    lex_mode: lookahead.lex_mode,
                    error_cost: ERROR_COST_PER_RECOVERY + ERROR_COST_PER_MISSING_TREE,
                    external_state: None,
                });
                let position = self.stack.get(top).position.bytes;
                let head = &mut self.heads[index];
                head.node = self.stack.push(top, leaf, next);
                head.missing_at = Some(position);
            }
            RecoveryAction::PopStack { depth } => {
                let Some(path) = self.stack.pop(top, PopCount::Subtrees(depth)).into_iter().next() else {
                    self.heads[index].status = Status::Halted;
                    return;
                };
                let base_state = self.stack.get(path.base).state;
                let error = error_node(path.subtrees, base_state, lookahead.lex_mode);
                self.heads[index].node = self.stack.push(path.base, error, base_state);
            }
            RecoveryAction::SkipToken => {
                let leaf = self.lookahead_leaf(lookahead, state, false);
                let mut below = top;
                let mut skipped = Vec::new();
                if let Some(link) = self.stack.top_subtree(top)
                    && link.subtree.is_error()
                    && link.subtree.is_extra()
                {
                    below = link.node;
                    skipped.extend(link.subtree.children().iter().cloned());
                }
                let below_state = self.stack.get(below).state;
                let external_state = leaf.external_state().cloned();
                skipped.push(leaf);
                let error = error_node(skipped, below_state, lookahead.lex_mode);

                let head = &mut self.heads[index];
                head.node = self.stack.push(below, error, below_state);
                head.lookahead = None;
                head.lex_mode_override = None;
                if external_state.is_some() {
                    head.external_state = external_state;
                }
            }
            RecoveryAction::Abandon => {
                let end = self.lookahead_leaf(lookahead, state, false);
                for path in self.stack.pop(top, PopCount::All) {
                    let mut children = path.subtrees;
                    children.push(end.clone());
                    let root = GreenNode::new_node(
                        NodeInfo {
                            symbol: Symbol::ERROR,
                            flags: NodeFlags::VISIBLE | NodeFlags::NAMED | NodeFlags::ERROR,
                            parse_state: self.language.start_state(),
                            lookahead_lex_mode: lookahead.lex_mode,
                            dynamic_precedence: 0,
                            error_cost: skip_cost(&children),
                        },
                        children,
                    );
                    self.offer_finished(root);
                }
                self.heads[index].status = Status::Halted;
            }
        }
    }

    fn condense(&mut self) {
        self.heads.retain(|head| head.status == Status::Active);
        self.stats.max_versions = self.stats.max_versions.max(self.heads.len());

        let mut i = 0;
        while i < self.heads.len() {
            let mut j = i + 1;
            while j < self.heads.len() {
                if self.mergeable(i, j) {
                    let from = self.heads.remove(j);
                    self.stack.merge(self.heads[i].node, from.node);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }

        let stack = &self.stack;
        let cost = |head: &Head| stack.get(head.node).error_cost;
        if let Some(best) = self.heads.iter().map(cost).min() {
            let finished = self.finished.as_ref().map(GreenNode::error_cost);
            self.heads.retain(|head| {
                let cost = cost(head);
                cost <= best.saturating_add(MAX_COST_DIFFERENCE)
                    && finished.is_none_or(|finished| cost <= finished)
            });
        }

        let max_versions = self.options.max_versions.max(1);
        if self.heads.len() > max_versions {
            self.heads.sort_by_key(|head| {
                let node = stack.get(head.node);
                (node.error_cost, std::cmp::Reverse(node.dynamic_precedence))
            });
            self.heads.truncate(max_versions);
        }

        for head in &mut self.heads {
            head.processed = false;
        }
    }

    fn mergeable(&self, i: usize, j: usize) -> bool {
        let (a, b) = (&self.heads[i], &self.heads[j]);
        let (top_a, top_b) = (self.stack.get(a.node), self.stack.get(b.node));
        top_a.state == top_b.state
            && top_a.position == top_b.position
            && top_a.error_cost == top_b.error_cost
            && a.lex_mode_override == b.lex_mode_override
            && a.external_state == b.external_state
    }

    /// The tree returned when no version survived: the whole text under one
    /// `ERROR` node.
    fn fallback_root(&self) -> GreenNode {
        let text = self.lexer.text();
        let leaf = GreenNode::new_leaf(LeafInfo {
            symbol: Symbol::ERROR,
            flags: NodeFlags::ERROR,
            padding: Length::ZERO,
            size: Length::of(text),
            lookahead_bytes: 1,
            parse_state: self.language.start_state(),
            lex_mode: self.language.lex_mode(self.language.start_state()),
            error_cost: 0,
            external_state: None,
        });
        GreenNode::new_node(
            NodeInfo {
                symbol: Symbol::ERROR,
                flags: NodeFlags::VISIBLE | NodeFlags::NAMED | NodeFlags::ERROR,
                parse_state: self.language.start_state(),
                lookahead_lex_mode: leaf.lex_mode(),
                dynamic_precedence: 0,
                error_cost: skip_cost(std::slice::from_ref(&leaf)),
            },
            vec![leaf],
        )
    }
}

fn visibility(info: &SymbolInfo) -> NodeFlags {
    let mut flags = NodeFlags::empty();
    flags.set(NodeFlags::VISIBLE, info.visible);
    flags.set(NodeFlags::NAMED, info.named);
    flags
}

fn leaf_is_reusable(language: &Language, leaf: &GreenNode, mode: LexModeId) -> bool {
    // Renamed tokens carry a non-terminal symbol the lexer never produces.
    language.metadata(leaf.symbol()).kind != SymbolType::NonTerminal
        && leaf.is_leaf()
        && !leaf.has_changes()
        && !leaf.has_error()
        && !leaf.is_fragile()
        && !leaf.size().is_empty()
        && leaf.lex_mode() == mode
}

/// An old leaf recorded as pushed from `state`, keeping its identity when
/// nothing about it differs.
fn adopt_leaf(leaf: &GreenNode, state: StateId, extra: bool) -> GreenNode {
    if leaf.is_extra() == extra {
        return leaf.with_parse_state(state);
    }
    let mut flags = leaf.flags();
    flags.set(NodeFlags::EXTRA, extra);
    GreenNode::new_leaf(LeafInfo {
        symbol: leaf.symbol(),
        flags,
        padding: leaf.padding(),
        size: leaf.size(),
        lookahead_bytes: leaf.lookahead_bytes(),
        parse_state: state,
        lex_mode: leaf.lex_mode(),
        error_cost: leaf.error_cost(),
        external_state: leaf.external_state().cloned(),
    })
}

fn is_possible(context: &RecoveryContext<'_>, action: RecoveryAction, limited: bool) -> bool {
    match action {
        RecoveryAction::InsertMissing(symbol) => {
            context.can_insert
                && symbol.index() < context.language.symbol_count()
                && context.language.metadata(symbol).kind != SymbolType::NonTerminal
                && context
                    .language
                    .actions(context.state, symbol)
                    .iter()
                    .any(|action| matches!(action, Action::Shift { .. }))
        }
        RecoveryAction::PopStack { depth } => {
            !limited && depth > 0 && depth <= context.states_below.len()
        }
        RecoveryAction::SkipToken => !context.at_end,
        RecoveryAction::Abandon => context.at_end,
    }
}

fn skip_cost(skipped: &[GreenNode]) -> u32 {
    let mut cost = ERROR_COST_PER_RECOVERY;
    for tree in skipped {
        let size = tree.size();
        cost += ERROR_COST_PER_SKIPPED_TREE
            + ERROR_COST_PER_SKIPPED_CHAR * u32::from(size.bytes)
            + ERROR_COST_PER_SKIPPED_LINE * size.extent.row;
    }
    cost
}

fn error_node(children: Vec<GreenNode>, state: StateId, lex_mode: LexModeId) -> GreenNode {
    let cost = skip_cost(&children);
    GreenNode::new_node(
        NodeInfo {
            symbol: Symbol::ERROR,
            flags: NodeFlags::VISIBLE | NodeFlags::NAMED | NodeFlags::ERROR | NodeFlags::EXTRA,
            parse_state: state,
            lookahead_lex_mode: lex_mode,
            dynamic_precedence: 0,
            error_cost: cost,
        },
        children,
    )
}

/// Lifts the start symbol's node into the root: its children, the extras
/// around it and the end-of-input leaf.
fn build_root(subtrees: Vec<GreenNode>, end: GreenNode) -> Option<GreenNode> {
    let start = subtrees.iter().position(|subtree| !subtree.is_extra())?;
    let node = &subtrees[start];

    let mut children = Vec::with_capacity(subtrees.len() + node.children().len());
    children.extend(subtrees[..start].iter().cloned());
    children.extend(node.children().iter().cloned());
    children.extend(subtrees[start + 1..].iter().cloned());
    children.push(end);

    let inner_cost: u32 = node.children().iter().map(GreenNode::error_cost).sum();
    let inner_precedence: i32 = node.children().iter().map(GreenNode::dynamic_precedence).sum();
    let info = NodeInfo {
        symbol: node.symbol(),
        flags: node.flags() & (NodeFlags::VISIBLE | NodeFlags::NAMED),
        parse_state: node.parse_state(),
        lookahead_lex_mode: node.lookahead_lex_mode(),
        dynamic_precedence: node.dynamic_precedence() - inner_precedence,
        error_cost: node.error_cost().saturating_sub(inner_cost),
    };
    Some(GreenNode::new_node(info, children))
}

/// Orders competing trees for the same text, preferred first: fewer errors,
/// then higher dynamic precedence, then a fixed structural order.
pub(crate) fn compare_trees(a: &GreenNode, b: &GreenNode) -> Ordering {
    a.error_cost()
        .cmp(&b.error_cost())
        .then_with(|| b.dynamic_precedence().cmp(&a.dynamic_precedence()))
        .then_with(|| compare_structure(a, b))
}

fn compare_structure(a: &GreenNode, b: &GreenNode) -> Ordering {
    if a.ptr_eq(b) {
        return Ordering::Equal;
    }
    a.symbol()
        .cmp(&b.symbol())
        .then_with(|| a.children().len().cmp(&b.children().len()))
        .then_with(|| {
            a.children()
                .iter()
                .zip(b.children())
                .map(|(a, b)| compare_structure(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        })
}
