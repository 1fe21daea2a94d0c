//! The text-position engine.
//!
//! Everything here answers one deceptively simple question: for a position in
//! the tree, what is the visible character immediately preceding it once
//! whitespace collapsing and block-boundary line breaks are accounted for?
//! Character iteration, word movement, visible-text extraction and text
//! search are all built on that primitive.
//!
//! All state lives in an explicit [`TextSession`] threaded into every call;
//! there is no ambient global. A session assumes the tree does not mutate
//! structurally while it is alive. That is a usage contract, not something
//! the engine can detect: end the session, mutate, then open a fresh one.

pub mod character;
pub mod iter;
pub mod motion;
pub mod words;
pub(crate) mod wrapper;

use std::collections::HashMap;

use tracing::trace;
use treespan_tree::ContentTree;
use uuid::Uuid;

use crate::error::Result;
use crate::position::{Position, validate_position};
use crate::text::character::ResolvedChar;
use crate::text::wrapper::{NodeWrapper, WrapperId};

pub use iter::{CharIter, Direction, VisibleChar};
pub use motion::{Bookmark, CharacterRange, FindOptions, MotionOptions, SearchTerm, Unit};
pub use words::{Token, TokenStream, WordOptions};

/// Options deciding which borderline collapsible characters are exposed.
///
/// Different consumers need different collapsing: caret movement usually
/// wants trailing spaces hidden, while exact visible-text extraction of
/// editable regions may want them kept. The finalized character for a
/// position is cached per option signature, so mixing option sets within a
/// session is cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharacterOptions {
    /// Expose a collapsible space even when the next rendered thing is a
    /// forced line break element.
    pub include_space_before_br: bool,
    /// Expose a collapsible space at the end of a block's content (or of the
    /// whole tree).
    pub include_block_content_trailing_space: bool,
    /// Expose a collapsible space preceding a preserved newline in
    /// `pre-line` content.
    pub include_pre_line_trailing_space: bool,
}

impl CharacterOptions {
    pub(crate) fn signature(self) -> u8 {
        u8::from(self.include_space_before_br)
            | u8::from(self.include_block_content_trailing_space) << 1
            | u8::from(self.include_pre_line_trailing_space) << 2
    }
}

/// A scope for text-position queries over one consistent tree snapshot.
///
/// Owns the node-wrapper arena and the resolved/finalized character caches.
/// Cheap to create; spanning several related queries with one session is
/// what makes the lazy character resolution pay off.
pub struct TextSession<'t, T: ContentTree> {
    pub(crate) tree: &'t T,
    id: Uuid,
    pub(crate) wrappers: Vec<NodeWrapper<T::NodeId>>,
    pub(crate) by_node: HashMap<T::NodeId, WrapperId>,
    pub(crate) resolved: HashMap<(WrapperId, usize), ResolvedChar>,
    pub(crate) finalized: HashMap<(WrapperId, usize, u8), Option<char>>,
}

impl<'t, T: ContentTree> TextSession<'t, T> {
    pub fn new(tree: &'t T) -> Self {
        let id = Uuid::new_v4();
        trace!(session = %id, "opening text session");
        Self {
            tree,
            id,
            wrappers: Vec::new(),
            by_node: HashMap::new(),
            resolved: HashMap::new(),
            finalized: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tree(&self) -> &'t T {
        self.tree
    }

    /// Validate and adopt a (node, offset) pair as a position.
    pub fn position(&self, node: T::NodeId, offset: usize) -> Result<Position<T::NodeId>> {
        let pos = Position::new(node, offset);
        validate_position(self.tree, pos)?;
        Ok(pos)
    }
}
