use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a terminal, external or nonterminal symbol.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub u16);

impl Symbol {
    /// End of input.
    pub const END: Self = Self(0);
    /// Error nodes produced by recovery and unmatched bytes.
    pub const ERROR: Self = Self(1);

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    Terminal,
    NonTerminal,
    External,
}

/// Static metadata describing one symbol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SymbolType,
    /// Visible symbols show up when navigating a tree; hidden ones are
    /// flattened into their parent.
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub named: bool,
    /// Extras may appear between any two symbols, like comments.
    #[serde(default)]
    pub extra: bool,
}

impl SymbolInfo {
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, SymbolType::NonTerminal)
    }
}

/// Growable bitset of symbols.
#[derive(Clone, Debug, Default)]
pub struct SymbolSet {
    bits: Vec<u64>,
}

impl PartialEq for SymbolSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for SymbolSet {}

impl std::hash::Hash for SymbolSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl SymbolSet {
    const BITS_PER_SLOT: usize = u64::BITS as usize;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut set = Self::new();
        for symbol in symbols {
            set.insert(symbol);
        }
        set
    }

    /// Inserts `symbol`, returning `true` if it was not present.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        let (slot, mask) = Self::locate(symbol);
        if slot >= self.bits.len() {
            self.bits.resize(slot + 1, 0);
        }
        let fresh = self.bits[slot] & mask == 0;
        self.bits[slot] |= mask;
        fresh
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        let (slot, mask) = Self::locate(symbol);
        self.bits.get(slot).is_some_and(|bits| bits & mask != 0)
    }

    /// Adds every member of `other`, returning `true` if anything changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if self.bits.len() < other.bits.len() {
            self.bits.resize(other.bits.len(), 0);
        }
        let mut changed = false;
        for (slot, &bits) in self.bits.iter_mut().zip(&other.bits) {
            let merged = *slot | bits;
            changed |= merged != *slot;
            *slot = merged;
        }
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&bits| bits == 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|bits| bits.count_ones() as usize).sum()
    }

    /// Iterates members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.bits.iter().enumerate().flat_map(|(slot, &bits)| {
            (0..Self::BITS_PER_SLOT)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| Symbol((slot * Self::BITS_PER_SLOT + bit) as u16))
        })
    }

    fn significant(&self) -> &[u64] {
        let len = self.bits.iter().rposition(|&bits| bits != 0).map_or(0, |last| last + 1);
        &self.bits[..len]
    }

    fn locate(symbol: Symbol) -> (usize, u64) {
        let index = symbol.index();
        (index / Self::BITS_PER_SLOT, 1 << (index % Self::BITS_PER_SLOT))
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self::from_symbols(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_membership() {
        let mut set = SymbolSet::from_symbols([Symbol(3), Symbol(70)]);
        assert!(set.contains(Symbol(3)));
        assert!(set.contains(Symbol(70)));
        assert!(!set.contains(Symbol(4)));
        assert!(!set.contains(Symbol(700)));

        assert!(!set.insert(Symbol(3)));
        assert!(set.insert(Symbol(5)));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Symbol(3), Symbol(5), Symbol(70)]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn union_reports_change() {
        let mut left = SymbolSet::from_symbols([Symbol(1)]);
        let right = SymbolSet::from_symbols([Symbol(1), Symbol(200)]);
        assert!(left.union_with(&right));
        assert!(!left.union_with(&right));
        assert_eq!(left, right);
    }
}
