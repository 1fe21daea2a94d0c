//! Subtree walk over the nodes a range covers.
//!
//! The iterator yields the *top-level* nodes of the range: every node fully
//! inside it plus the containers its boundaries cut through. A partially
//! covered container must be recursed into via [`RangeIterator::subrange`]
//! instead of being treated as fully selected. The following sibling is
//! captured before the current node is handed out, so visitors may detach
//! the current node mid-walk.

use std::fmt::Debug;
use std::hash::Hash;

use treespan_tree::ContentTree;

use crate::error::Result;
use crate::position::{Position, is_or_is_ancestor, max_offset, path_child};
use crate::range::Range;

pub struct RangeIterator<N> {
    start: Position<N>,
    end: Position<N>,
    last: Option<N>,
    next: Option<N>,
}

impl<N: Copy + Eq + Hash + Debug> RangeIterator<N> {
    pub fn new<T: ContentTree<NodeId = N>>(tree: &T, range: &Range<N>) -> Result<Self> {
        let start = range.start_position();
        let end = range.end_position();

        if range.is_collapsed() {
            return Ok(Self {
                start,
                end,
                last: None,
                next: None,
            });
        }

        // A range whose both boundaries sit in one character-data node covers
        // exactly that node.
        if start.node == end.node && tree.kind(start.node).is_character_data() {
            return Ok(Self {
                start,
                end,
                last: Some(start.node),
                next: Some(start.node),
            });
        }

        let root = range.common_ancestor(tree)?;
        let first = if start.node == root {
            tree.child(root, start.offset)
        } else {
            path_child(tree, start.node, root)
        };
        let last = if end.node == root {
            tree.child(root, end.offset - 1)
        } else {
            path_child(tree, end.node, root)
        };

        Ok(Self {
            start,
            end,
            last,
            next: first,
        })
    }

    /// Yield the next top-level node, pre-capturing its following sibling.
    pub fn next<T: ContentTree<NodeId = N>>(&mut self, tree: &T) -> Option<N> {
        let current = self.next?;
        self.next = if Some(current) == self.last {
            None
        } else {
            tree.next_sibling(current)
        };
        Some(current)
    }

    /// True when `node` is a container with a range boundary strictly inside
    /// it; the caller must recurse through [`RangeIterator::subrange`].
    pub fn is_partially_selected<T: ContentTree<NodeId = N>>(&self, tree: &T, node: N) -> bool {
        tree.kind(node).is_container()
            && (is_or_is_ancestor(tree, node, self.start.node)
                || is_or_is_ancestor(tree, node, self.end.node))
    }

    /// The synthetic sub-range scoped to a partially selected container:
    /// boundaries clamped to the node's own extent except where the outer
    /// range's boundary lies inside it.
    pub fn subrange<T: ContentTree<NodeId = N>>(&self, tree: &T, node: N) -> Range<N> {
        let start = if is_or_is_ancestor(tree, node, self.start.node) {
            self.start
        } else {
            Position::new(node, 0)
        };
        let end = if is_or_is_ancestor(tree, node, self.end.node) {
            self.end
        } else {
            Position::new(node, max_offset(tree, node))
        };
        Range::from_positions(start, end)
    }

    /// The character span the range selects inside a boundary character-data
    /// node, or `None` for other nodes.
    pub fn selected_text_span<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
        node: N,
    ) -> Option<std::ops::Range<usize>> {
        if !tree.kind(node).is_character_data() {
            return None;
        }
        if node != self.start.node && node != self.end.node {
            return None;
        }
        let sel_start = if node == self.start.node {
            self.start.offset
        } else {
            0
        };
        let sel_end = if node == self.end.node {
            self.end.offset
        } else {
            tree.text_len(node)
        };
        Some(sel_start..sel_end)
    }
}

/// Collect the nodes of `range` matching `predicate`.
///
/// Fully covered nodes are reported along with their whole subtree;
/// partially covered containers are reported themselves and recursed into,
/// so only the covered part of their subtree is visited.
pub fn nodes_in_range<T, F>(tree: &T, range: &Range<T::NodeId>, predicate: F) -> Result<Vec<T::NodeId>>
where
    T: ContentTree,
    F: Fn(&T, T::NodeId) -> bool,
{
    fn collect_subtree<T: ContentTree>(
        tree: &T,
        node: T::NodeId,
        predicate: &impl Fn(&T, T::NodeId) -> bool,
        out: &mut Vec<T::NodeId>,
    ) {
        if predicate(tree, node) {
            out.push(node);
        }
        for i in 0..tree.child_count(node) {
            if let Some(child) = tree.child(node, i) {
                collect_subtree(tree, child, predicate, out);
            }
        }
    }

    fn walk<T: ContentTree>(
        tree: &T,
        iter: &mut RangeIterator<T::NodeId>,
        predicate: &impl Fn(&T, T::NodeId) -> bool,
        out: &mut Vec<T::NodeId>,
    ) -> Result<()> {
        while let Some(node) = iter.next(tree) {
            if iter.is_partially_selected(tree, node) {
                if predicate(tree, node) {
                    out.push(node);
                }
                let sub = iter.subrange(tree, node);
                let mut sub_iter = RangeIterator::new(tree, &sub)?;
                walk(tree, &mut sub_iter, predicate, out)?;
            } else {
                collect_subtree(tree, node, predicate, out);
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    let mut iter = RangeIterator::new(tree, range)?;
    walk(tree, &mut iter, &predicate, &mut out)?;
    Ok(out)
}
