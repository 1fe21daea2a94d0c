//! Range, position and visible-text engine for in-memory content trees.
//!
//! The engine addresses, compares and mutates arbitrary spans of a host
//! content tree, and computes the tree's *visible* character sequence
//! (whitespace collapsing and block-boundary line breaks included) so that
//! "move one character", "move one word", "find text" and "save a cursor
//! across edits" all behave the way a user expects.
//!
//! The host tree is consumed through the [`treespan_tree::ContentTree`]
//! trait; nothing here assumes a concrete document representation or a
//! rendering pipeline.
//!
//! ## Layers
//!
//! - [`position`]: (node, offset) points and their total document order.
//! - [`range`]: ordered boundary pairs; containment, extraction, insertion,
//!   boundary splitting that repairs externally held positions.
//! - [`text`]: sessions, visible-character resolution, character and word
//!   iteration, movement, expansion and search.
//! - [`serialize`]: structural paths plus a shape checksum for persisting
//!   positions and ranges.
//!
//! ## Sessions
//!
//! Any call spanning multiple position reads should be wrapped in a
//! [`TextSession`] so per-node facts are computed once; entry points that
//! take no session (such as [`Range::text`]) open a disposable one per call.
//! A session must be discarded once the tree mutates structurally.

pub mod error;
pub mod position;
pub mod range;
pub mod serialize;
pub mod text;

pub use error::{EngineError, Result};
pub use position::{
    Position, compare_positions, position_after, position_before, validate_position,
};
pub use range::{BoundaryComparison, Range, RangeIterator, nodes_in_range};
pub use serialize::{
    can_deserialize_range, deserialize_position, deserialize_range, serialize_position,
    serialize_range, shape_checksum,
};
pub use text::{
    Bookmark, CharIter, CharacterOptions, CharacterRange, Direction, FindOptions, MotionOptions,
    SearchTerm, TextSession, Token, TokenStream, Unit, VisibleChar, WordOptions,
};
