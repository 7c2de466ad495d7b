use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use thicket_grammar::{LexModeId, StateId, Symbol};
use thicket_span::Length;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        const VISIBLE = 1 << 0;
        const NAMED = 1 << 1;
        const EXTRA = 1 << 2;
        /// An `ERROR` node or token.
        const ERROR = 1 << 3;
        /// Zero-width placeholder inserted by error recovery.
        const MISSING = 1 << 4;
        /// Some descendant is an error or missing node.
        const HAS_ERROR = 1 << 5;
        /// Built while several stack versions were alive.
        const FRAGILE = 1 << 6;
        /// Touched by an edit since it was parsed.
        const HAS_CHANGES = 1 << 7;
    }
}

pub(crate) struct GreenNodeData {
    pub(crate) symbol: Symbol,
    pub(crate) flags: NodeFlags,
    pub(crate) padding: Length,
    pub(crate) size: Length,
    pub(crate) lookahead_bytes: u32,
    pub(crate) parse_state: StateId,
    pub(crate) lex_mode: LexModeId,
    pub(crate) lookahead_lex_mode: LexModeId,
    pub(crate) error_cost: u32,
    pub(crate) dynamic_precedence: i32,
    pub(crate) external_state: Option<Arc<[u8]>>,
    pub(crate) visible_child_count: u32,
    pub(crate) named_child_count: u32,
    pub(crate) children: Box<[GreenNode]>,
}

/// An immutable, position-independent subtree.
///
/// Cloning is a reference count bump. Untouched subtrees are shared between
/// tree versions, so pointer identity tells whether a node was reused.
#[derive(Clone)]
pub struct GreenNode(triomphe::Arc<GreenNodeData>);

/// Everything a token leaf records about how it was lexed.
#[derive(Debug, Clone)]
pub struct LeafInfo {
    pub symbol: Symbol,
    pub flags: NodeFlags,
    pub padding: Length,
    pub size: Length,
    pub lookahead_bytes: u32,
    pub parse_state: StateId,
    pub lex_mode: LexModeId,
    pub error_cost: u32,
    pub external_state: Option<Arc<[u8]>>,
}

/// Header of an interior node; sizes and counts come from its children.
#[derive(Debug, Clone, Copy)]
pub struct NodeInfo {
    pub symbol: Symbol,
    pub flags: NodeFlags,
    pub parse_state: StateId,
    pub lookahead_lex_mode: LexModeId,
    pub dynamic_precedence: i32,
    /// Cost added on top of the children's.
    pub error_cost: u32,
}

impl GreenNode {
    pub fn new_leaf(info: LeafInfo) -> Self {
        let mut flags = info.flags;
        if flags.intersects(NodeFlags::ERROR | NodeFlags::MISSING) {
            flags |= NodeFlags::HAS_ERROR;
        }
        Self(triomphe::Arc::new(GreenNodeData {
            symbol: info.symbol,
            flags,
            padding: info.padding,
            size: info.size,
            lookahead_bytes: info.lookahead_bytes,
            parse_state: info.parse_state,
            lex_mode: info.lex_mode,
            lookahead_lex_mode: info.lex_mode,
            error_cost: info.error_cost,
            dynamic_precedence: 0,
            external_state: info.external_state,
            visible_child_count: 0,
            named_child_count: 0,
            children: Box::default(),
        }))
    }

    pub fn new_node(info: NodeInfo, children: Vec<Self>) -> Self {
        let mut data = GreenNodeData {
            symbol: info.symbol,
            flags: info.flags,
            padding: Length::ZERO,
            size: Length::ZERO,
            lookahead_bytes: 0,
            parse_state: info.parse_state,
            lex_mode: info.lookahead_lex_mode,
            lookahead_lex_mode: info.lookahead_lex_mode,
            error_cost: info.error_cost,
            dynamic_precedence: info.dynamic_precedence,
            external_state: None,
            visible_child_count: 0,
            named_child_count: 0,
            children: children.into_boxed_slice(),
        };
        data.summarize();
        Self(triomphe::Arc::new(data))
    }

    pub(crate) fn from_data(data: GreenNodeData) -> Self {
        Self(triomphe::Arc::new(data))
    }

    pub(crate) fn data(&self) -> &GreenNodeData {
        &self.0
    }

    pub fn symbol(&self) -> Symbol {
        self.0.symbol
    }

    pub fn flags(&self) -> NodeFlags {
        self.0.flags
    }

    pub fn is_visible(&self) -> bool {
        self.0.flags.contains(NodeFlags::VISIBLE)
    }

    pub fn is_named(&self) -> bool {
        self.0.flags.contains(NodeFlags::NAMED)
    }

    pub fn is_extra(&self) -> bool {
        self.0.flags.contains(NodeFlags::EXTRA)
    }

    pub fn is_error(&self) -> bool {
        self.0.flags.contains(NodeFlags::ERROR)
    }

    pub fn is_missing(&self) -> bool {
        self.0.flags.contains(NodeFlags::MISSING)
    }

    pub fn has_error(&self) -> bool {
        self.0.flags.contains(NodeFlags::HAS_ERROR)
    }

    pub fn has_changes(&self) -> bool {
        self.0.flags.contains(NodeFlags::HAS_CHANGES)
    }

    pub fn is_fragile(&self) -> bool {
        self.0.flags.contains(NodeFlags::FRAGILE)
    }

    pub fn is_leaf(&self) -> bool {
        self.0.children.is_empty()
    }

    pub fn padding(&self) -> Length {
        self.0.padding
    }

    pub fn size(&self) -> Length {
        self.0.size
    }

    /// Padding plus size.
    pub fn total(&self) -> Length {
        self.0.padding + self.0.size
    }

    pub fn lookahead_bytes(&self) -> u32 {
        self.0.lookahead_bytes
    }

    /// The state the parser was in when this node was pushed.
    pub fn parse_state(&self) -> StateId {
        self.0.parse_state
    }

    /// Lexical mode of the first token inside this node.
    pub fn lex_mode(&self) -> LexModeId {
        self.0.lex_mode
    }

    /// Lexical mode of the token that followed this node when it was built.
    pub fn lookahead_lex_mode(&self) -> LexModeId {
        self.0.lookahead_lex_mode
    }

    pub fn error_cost(&self) -> u32 {
        self.0.error_cost
    }

    pub fn dynamic_precedence(&self) -> i32 {
        self.0.dynamic_precedence
    }

    /// Scanner snapshot after the last external token inside this node.
    pub fn external_state(&self) -> Option<&Arc<[u8]>> {
        self.0.external_state.as_ref()
    }

    pub fn children(&self) -> &[Self] {
        &self.0.children
    }

    /// Number of visible children once hidden children are flattened.
    pub fn visible_child_count(&self) -> usize {
        self.0.visible_child_count as usize
    }

    pub fn named_child_count(&self) -> usize {
        self.0.named_child_count as usize
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        triomphe::Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared allocation.
    pub fn id(&self) -> usize {
        triomphe::Arc::as_ptr(&self.0) as usize
    }

    /// A copy of this node with extra flags set.
    pub fn with_flags(&self, flags: NodeFlags) -> Self {
        if self.0.flags.contains(flags) {
            return self.clone();
        }
        let mut data = self.0.shallow_clone();
        data.flags |= flags;
        Self::from_data(data)
    }

    /// A copy of this node shown as `symbol`. `flags` replace its visibility
    /// and add to the rest.
    pub fn renamed(&self, symbol: Symbol, flags: NodeFlags) -> Self {
        let mut data = self.0.shallow_clone();
        data.symbol = symbol;
        data.flags.remove(NodeFlags::VISIBLE | NodeFlags::NAMED);
        data.flags |= flags;
        Self::from_data(data)
    }

    /// A copy of this node recorded as pushed from `state`.
    pub fn with_parse_state(&self, state: StateId) -> Self {
        if self.0.parse_state == state {
            return self.clone();
        }
        let mut data = self.0.shallow_clone();
        data.parse_state = state;
        Self::from_data(data)
    }

    /// Widens the lookahead so that at least `bytes` past the end count as
    /// examined. Fresh nodes are updated in place.
    pub fn with_lookahead_bytes(mut self, bytes: u32) -> Self {
        if bytes <= self.0.lookahead_bytes {
            return self;
        }
        if let Some(data) = triomphe::Arc::get_mut(&mut self.0) {
            data.lookahead_bytes = bytes;
            return self;
        }
        let mut data = self.0.shallow_clone();
        data.lookahead_bytes = bytes;
        Self::from_data(data)
    }
}

impl GreenNodeData {
    pub(crate) fn shallow_clone(&self) -> Self {
        Self {
            symbol: self.symbol,
            flags: self.flags,
            padding: self.padding,
            size: self.size,
            lookahead_bytes: self.lookahead_bytes,
            parse_state: self.parse_state,
            lex_mode: self.lex_mode,
            lookahead_lex_mode: self.lookahead_lex_mode,
            error_cost: self.error_cost,
            dynamic_precedence: self.dynamic_precedence,
            external_state: self.external_state.clone(),
            visible_child_count: self.visible_child_count,
            named_child_count: self.named_child_count,
            children: self.children.clone(),
        }
    }

    /// Recomputes everything an interior node derives from its children.
    pub(crate) fn summarize(&mut self) {
        let Some(first) = self.children.first() else {
            return;
        };
        self.padding = first.padding();
        self.lex_mode = first.lex_mode();

        let mut total = Length::ZERO;
        let mut examined_end = 0u32;
        for child in &self.children {
            total += child.total();
            examined_end = examined_end.max(u32::from(total.bytes) + child.lookahead_bytes());

            self.error_cost += child.error_cost();
            self.dynamic_precedence += child.dynamic_precedence();
            if child.flags().intersects(NodeFlags::HAS_ERROR | NodeFlags::ERROR | NodeFlags::MISSING) {
                self.flags |= NodeFlags::HAS_ERROR;
            }
            if child.external_state().is_some() {
                self.external_state = child.external_state().cloned();
            }
            if child.is_visible() {
                self.visible_child_count += 1;
                if child.is_named() {
                    self.named_child_count += 1;
                }
            } else {
                self.visible_child_count += child.visible_child_count() as u32;
                self.named_child_count += child.named_child_count() as u32;
            }
        }
        self.size = total - self.padding;
        self.lookahead_bytes = examined_end.saturating_sub(u32::from(total.bytes));
    }
}

impl fmt::Debug for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenNode")
            .field("symbol", &self.0.symbol)
            .field("flags", &self.0.flags)
            .field("padding", &self.0.padding.bytes)
            .field("size", &self.0.size.bytes)
            .field("children", &self.0.children.len())
            .finish()
    }
}
