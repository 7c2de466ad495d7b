//! Immutable, structurally shared syntax trees.
//!
//! [`GreenNode`]s know their size but not their position, so an edit only
//! copies the path from the root to the damaged nodes and shares the rest.
//! [`Node`] and [`TreeCursor`] add absolute positions on top while navigating.

mod cursor;
mod dump;
mod edit;
mod green;
mod node;

/// Visible-node navigation.
pub use cursor::{Preorder, TreeCursor, WalkEvent};
/// Edits applied to an existing tree.
pub use edit::{EditError, InputEdit};
/// Position-independent tree storage.
pub use green::{GreenNode, LeafInfo, NodeFlags, NodeInfo};
/// Positioned views over a tree.
pub use node::{Children, Node, Tree};
