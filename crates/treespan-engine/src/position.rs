//! Positions: (node, offset) points and their document-order comparison.
//!
//! A position addresses the gap before a character (in character data) or
//! before a child (in containers). Positions are snapshots; structural
//! mutation elsewhere can invalidate them and callers are expected to
//! revalidate with [`validate_position`] after external edits.

use std::cmp::Ordering;
use std::collections::HashSet;

use treespan_tree::ContentTree;

use crate::error::{EngineError, Result};

/// A point in a content tree: the gap at `offset` inside `node`.
///
/// For character data the offset is a character index in `0..=len`; for
/// containers it is a child index in `0..=child_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position<N> {
    pub node: N,
    pub offset: usize,
}

impl<N> Position<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Largest valid offset inside `node`.
pub(crate) fn max_offset<T: ContentTree>(tree: &T, node: T::NodeId) -> usize {
    if tree.kind(node).is_character_data() {
        tree.text_len(node)
    } else {
        tree.child_count(node)
    }
}

/// Check that a position denotes a real point in `tree`.
pub fn validate_position<T: ContentTree>(tree: &T, pos: Position<T::NodeId>) -> Result<()> {
    if !tree.contains(pos.node) {
        return Err(EngineError::WrongDocument);
    }
    let max = max_offset(tree, pos.node);
    if pos.offset > max {
        return Err(EngineError::IndexSize {
            offset: pos.offset,
            max,
        });
    }
    Ok(())
}

/// The boundary immediately before `node`, as a (parent, child-index) point.
pub fn position_before<T: ContentTree>(tree: &T, node: T::NodeId) -> Result<Position<T::NodeId>> {
    let parent = tree
        .parent(node)
        .ok_or_else(|| EngineError::usage("node has no parent to take a boundary in"))?;
    Ok(Position::new(parent, tree.node_index(node)))
}

/// The boundary immediately after `node`.
pub fn position_after<T: ContentTree>(tree: &T, node: T::NodeId) -> Result<Position<T::NodeId>> {
    let parent = tree
        .parent(node)
        .ok_or_else(|| EngineError::usage("node has no parent to take a boundary in"))?;
    Ok(Position::new(parent, tree.node_index(node) + 1))
}

/// Whether `ancestor` is `node` or one of its ancestors.
pub(crate) fn is_or_is_ancestor<T: ContentTree>(
    tree: &T,
    ancestor: T::NodeId,
    node: T::NodeId,
) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if n == ancestor {
            return true;
        }
        current = tree.parent(n);
    }
    false
}

/// The ancestor-or-self of `node` whose parent is `ancestor`, i.e. the child
/// of `ancestor` on the path down to `node`. `None` when `node == ancestor`
/// or when `ancestor` is not an ancestor at all.
pub(crate) fn path_child<T: ContentTree>(
    tree: &T,
    node: T::NodeId,
    ancestor: T::NodeId,
) -> Option<T::NodeId> {
    if node == ancestor {
        return None;
    }
    let mut current = node;
    loop {
        match tree.parent(current) {
            Some(p) if p == ancestor => return Some(current),
            Some(p) => current = p,
            None => return None,
        }
    }
}

/// Nearest common ancestor of two nodes, if they share one.
pub(crate) fn common_ancestor_of<T: ContentTree>(
    tree: &T,
    a: T::NodeId,
    b: T::NodeId,
) -> Option<T::NodeId> {
    let mut seen = HashSet::new();
    let mut current = Some(a);
    while let Some(n) = current {
        seen.insert(n);
        current = tree.parent(n);
    }
    let mut current = Some(b);
    while let Some(n) = current {
        if seen.contains(&n) {
            return Some(n);
        }
        current = tree.parent(n);
    }
    None
}

/// Total document-order comparison of two positions.
///
/// Consistent with pre-order traversal: a container boundary sorts before
/// every point strictly inside the child it precedes. Positions in disjoint
/// subtrees (no common ancestor) are a usage error, not an ordering.
pub fn compare_positions<T: ContentTree>(
    tree: &T,
    a: Position<T::NodeId>,
    b: Position<T::NodeId>,
) -> Result<Ordering> {
    validate_position(tree, a)?;
    validate_position(tree, b)?;

    if a.node == b.node {
        return Ok(a.offset.cmp(&b.offset));
    }

    // b lives inside a child of a.node.
    if let Some(child) = path_child(tree, b.node, a.node) {
        let index = tree.node_index(child);
        return Ok(if a.offset <= index {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }

    // Symmetric case.
    if let Some(child) = path_child(tree, a.node, b.node) {
        let index = tree.node_index(child);
        return Ok(if b.offset <= index {
            Ordering::Greater
        } else {
            Ordering::Less
        });
    }

    let root = common_ancestor_of(tree, a.node, b.node)
        .ok_or_else(|| EngineError::usage("positions share no common ancestor"))?;
    let child_a = path_child(tree, a.node, root).expect("a is a strict descendant of root");
    let child_b = path_child(tree, b.node, root).expect("b is a strict descendant of root");
    Ok(tree.node_index(child_a).cmp(&tree.node_index(child_b)))
}
