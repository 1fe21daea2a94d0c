//! Content-tree model consumed by the treespan engine.
//!
//! The engine never assumes a concrete document representation. Instead it
//! talks to the host tree through the [`ContentTree`] trait: navigation, node
//! classification, computed style lookup and a small set of mutation
//! primitives. [`ArenaTree`] is the reference implementation, an arena-backed
//! in-memory tree that hosts can use directly and that the engine's test
//! suites build their fixtures on.

pub mod arena;

pub use arena::{ArenaTree, NodeId};

use std::borrow::Cow;
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Structural classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Leaf node owning a mutable run of text.
    CharacterData,
    /// Interior node owning an ordered child list.
    Container,
    /// The single top node of a tree. Behaves like a container.
    Root,
}

impl NodeKind {
    pub fn is_character_data(self) -> bool {
        matches!(self, NodeKind::CharacterData)
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Container | NodeKind::Root)
    }
}

/// How a container participates in visual layout.
///
/// This is the engine's view of the host's computed `display` value, reduced
/// to the roles that affect the visible character sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayRole {
    /// Flows with surrounding text; contributes no break of its own.
    Inline,
    /// Starts and ends a line box; contributes virtual newlines.
    Block,
    /// Table cell; contributes a virtual tab between cells.
    TableCell,
    /// A forced line break element (`<br>` analogue).
    LineBreak,
    /// Not rendered at all; the node and its whole subtree are skipped.
    Hidden,
}

/// Whitespace collapsing policy for character data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhiteSpaceMode {
    /// Runs of space/tab/newline collapse to a single space.
    Normal,
    /// Collapses like [`WhiteSpaceMode::Normal`]; wrapping is a layout
    /// concern the engine does not model.
    Nowrap,
    /// Every character is preserved literally, newlines included.
    Pre,
    /// Newlines are preserved, spaces and tabs collapse.
    PreLine,
}

/// Computed style facts the engine needs about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub display: DisplayRole,
    pub white_space: WhiteSpaceMode,
}

impl NodeStyle {
    pub fn new(display: DisplayRole, white_space: WhiteSpaceMode) -> Self {
        Self {
            display,
            white_space,
        }
    }

    pub fn block() -> Self {
        Self::new(DisplayRole::Block, WhiteSpaceMode::Normal)
    }

    pub fn inline() -> Self {
        Self::new(DisplayRole::Inline, WhiteSpaceMode::Normal)
    }

    pub fn table_cell() -> Self {
        Self::new(DisplayRole::TableCell, WhiteSpaceMode::Normal)
    }

    pub fn line_break() -> Self {
        Self::new(DisplayRole::LineBreak, WhiteSpaceMode::Normal)
    }

    pub fn hidden() -> Self {
        Self::new(DisplayRole::Hidden, WhiteSpaceMode::Normal)
    }

    pub fn with_white_space(mut self, mode: WhiteSpaceMode) -> Self {
        self.white_space = mode;
        self
    }
}

/// The interface the engine requires from a host content tree.
///
/// Offsets into character data are *character* indices, not byte indices;
/// implementations over UTF-8 storage must translate. Child offsets are plain
/// child-list indices. Mutation primitives move already-detached nodes; a
/// node handed to [`ContentTree::insert_child`] must not currently have a
/// parent, and [`ContentTree::remove_child`] detaches without destroying, so
/// extracted subtrees stay addressable.
pub trait ContentTree {
    /// Opaque node handle. Engine-side caches key off it but store their
    /// facts in their own arenas, so only identity semantics are required.
    type NodeId: Copy + Eq + Hash + Debug;

    fn root(&self) -> Self::NodeId;

    /// Whether the handle belongs to this tree. Handles from another tree
    /// must answer `false`; the engine turns that into a wrong-document
    /// error instead of resolving a foreign node.
    fn contains(&self, node: Self::NodeId) -> bool;

    fn kind(&self, node: Self::NodeId) -> NodeKind;

    /// Element name for containers (`"#text"` for character data). Feeds the
    /// structural checksum and debug output, nothing else.
    fn name(&self, node: Self::NodeId) -> Cow<'_, str>;

    fn parent(&self, node: Self::NodeId) -> Option<Self::NodeId>;

    fn child_count(&self, node: Self::NodeId) -> usize;

    fn child(&self, node: Self::NodeId, index: usize) -> Option<Self::NodeId>;

    /// Index of `node` within its parent's child list.
    ///
    /// The default implementation is a sibling scan; hosts with cheaper
    /// bookkeeping should override it.
    fn node_index(&self, node: Self::NodeId) -> usize {
        let parent = self
            .parent(node)
            .expect("node_index called on a parentless node");
        for i in 0..self.child_count(parent) {
            if self.child(parent, i) == Some(node) {
                return i;
            }
        }
        unreachable!("node not found in its own parent's child list")
    }

    fn next_sibling(&self, node: Self::NodeId) -> Option<Self::NodeId> {
        let parent = self.parent(node)?;
        self.child(parent, self.node_index(node) + 1)
    }

    fn prev_sibling(&self, node: Self::NodeId) -> Option<Self::NodeId> {
        let parent = self.parent(node)?;
        let index = self.node_index(node);
        if index == 0 {
            None
        } else {
            self.child(parent, index - 1)
        }
    }

    /// Character count of a character-data node; 0 for containers.
    fn text_len(&self, node: Self::NodeId) -> usize;

    /// Read a character range out of a character-data node.
    fn text_slice(&self, node: Self::NodeId, range: std::ops::Range<usize>) -> Cow<'_, str>;

    fn style(&self, node: Self::NodeId) -> NodeStyle;

    // Mutation primitives.

    fn create_character_data(&mut self, text: &str) -> Self::NodeId;

    fn create_container(&mut self, name: &str, style: NodeStyle) -> Self::NodeId;

    /// Insert a detached node under `parent` at `index`.
    fn insert_child(&mut self, parent: Self::NodeId, index: usize, child: Self::NodeId);

    /// Detach and return the child at `index`.
    fn remove_child(&mut self, parent: Self::NodeId, index: usize) -> Self::NodeId;

    fn set_text(&mut self, node: Self::NodeId, text: &str);

    /// Replace a character range of a character-data node with `replacement`.
    fn splice_text(&mut self, node: Self::NodeId, range: std::ops::Range<usize>, replacement: &str);

    /// Clone a node (and its subtree when `deep`) into a new detached node.
    fn clone_node(&mut self, node: Self::NodeId, deep: bool) -> Self::NodeId;
}
