//! Ranges: ordered boundary pairs and the structural operations over them.
//!
//! A range is a snapshot of two positions with `start <= end` in document
//! order. Mutating operations (`delete_contents`, `extract_contents`,
//! `insert_node`, `split_boundaries`) change the tree synchronously and then
//! update the range's own boundaries; external positions are only repaired
//! when explicitly passed to [`Range::split_boundaries`].

pub mod iterator;

use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;
use treespan_tree::{ContentTree, NodeStyle};

use crate::error::{EngineError, Result};
use crate::position::{
    Position, common_ancestor_of, compare_positions, is_or_is_ancestor, max_offset,
    position_before, position_after, validate_position,
};

pub use iterator::{RangeIterator, nodes_in_range};

/// Which pair of boundary points to compare between two ranges.
///
/// Named `(self point, other point)`: `StartToEnd` compares `self.start`
/// against `other.end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryComparison {
    StartToStart,
    StartToEnd,
    EndToStart,
    EndToEnd,
}

/// An ordered pair of positions denoting a span of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range<N> {
    start: Position<N>,
    end: Position<N>,
    detached: bool,
}

impl<N: Copy + Eq + Hash + Debug> Range<N> {
    /// A range collapsed at the very start of the tree.
    pub fn new<T: ContentTree<NodeId = N>>(tree: &T) -> Self {
        let at = Position::new(tree.root(), 0);
        Self {
            start: at,
            end: at,
            detached: false,
        }
    }

    pub(crate) fn from_positions(start: Position<N>, end: Position<N>) -> Self {
        Self {
            start,
            end,
            detached: false,
        }
    }

    pub fn start_position(&self) -> Position<N> {
        self.start
    }

    pub fn end_position(&self) -> Position<N> {
        self.end
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Mark the range unusable; every subsequent operation fails with
    /// [`EngineError::InvalidState`].
    pub fn detach(&mut self) {
        self.detached = true;
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.detached {
            Err(EngineError::InvalidState)
        } else {
            Ok(())
        }
    }

    /// Both boundaries still denote real points in `tree`. Ranges are
    /// snapshots; callers revalidate after external mutation.
    pub fn is_valid_for<T: ContentTree<NodeId = N>>(&self, tree: &T) -> bool {
        !self.detached
            && validate_position(tree, self.start).is_ok()
            && validate_position(tree, self.end).is_ok()
            && matches!(
                compare_positions(tree, self.start, self.end),
                Ok(Ordering::Less | Ordering::Equal)
            )
    }

    pub fn set_start<T: ContentTree<NodeId = N>>(
        &mut self,
        tree: &T,
        node: N,
        offset: usize,
    ) -> Result<()> {
        self.ensure_usable()?;
        let pos = Position::new(node, offset);
        validate_position(tree, pos)?;
        self.start = pos;
        // Keep the ordering invariant: a start moved past the end collapses
        // the range, as does an end boundary invalidated by outside edits.
        if validate_position(tree, self.end).is_err()
            || compare_positions(tree, pos, self.end)? == Ordering::Greater
        {
            self.end = pos;
        }
        Ok(())
    }

    pub fn set_end<T: ContentTree<NodeId = N>>(
        &mut self,
        tree: &T,
        node: N,
        offset: usize,
    ) -> Result<()> {
        self.ensure_usable()?;
        let pos = Position::new(node, offset);
        validate_position(tree, pos)?;
        self.end = pos;
        if validate_position(tree, self.start).is_err()
            || compare_positions(tree, self.start, pos)? == Ordering::Greater
        {
            self.start = pos;
        }
        Ok(())
    }

    pub fn set_start_and_end<T: ContentTree<NodeId = N>>(
        &mut self,
        tree: &T,
        start_node: N,
        start_offset: usize,
        end_node: N,
        end_offset: usize,
    ) -> Result<()> {
        self.ensure_usable()?;
        let start = Position::new(start_node, start_offset);
        let end = Position::new(end_node, end_offset);
        validate_position(tree, start)?;
        validate_position(tree, end)?;
        if compare_positions(tree, start, end)? == Ordering::Greater {
            return Err(EngineError::usage("start position is after end position"));
        }
        self.start = start;
        self.end = end;
        Ok(())
    }

    pub fn collapse(&mut self, to_start: bool) -> Result<()> {
        self.ensure_usable()?;
        if to_start {
            self.end = self.start;
        } else {
            self.start = self.end;
        }
        Ok(())
    }

    /// Select `node` itself: boundaries just before and just after it.
    pub fn select_node<T: ContentTree<NodeId = N>>(&mut self, tree: &T, node: N) -> Result<()> {
        self.ensure_usable()?;
        if !tree.contains(node) {
            return Err(EngineError::WrongDocument);
        }
        self.start = position_before(tree, node)?;
        self.end = position_after(tree, node)?;
        Ok(())
    }

    /// Select everything inside `node`.
    pub fn select_node_contents<T: ContentTree<NodeId = N>>(
        &mut self,
        tree: &T,
        node: N,
    ) -> Result<()> {
        self.ensure_usable()?;
        if !tree.contains(node) {
            return Err(EngineError::WrongDocument);
        }
        self.start = Position::new(node, 0);
        self.end = Position::new(node, max_offset(tree, node));
        Ok(())
    }

    /// Nearest container holding both boundaries.
    pub fn common_ancestor<T: ContentTree<NodeId = N>>(&self, tree: &T) -> Result<N> {
        self.ensure_usable()?;
        common_ancestor_of(tree, self.start.node, self.end.node)
            .ok_or_else(|| EngineError::usage("range boundaries share no common ancestor"))
    }

    pub fn compare_boundary_points<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
        how: BoundaryComparison,
        other: &Range<N>,
    ) -> Result<Ordering> {
        self.ensure_usable()?;
        other.ensure_usable()?;
        let (ours, theirs) = match how {
            BoundaryComparison::StartToStart => (self.start, other.start),
            BoundaryComparison::StartToEnd => (self.start, other.end),
            BoundaryComparison::EndToStart => (self.end, other.start),
            BoundaryComparison::EndToEnd => (self.end, other.end),
        };
        compare_positions(tree, ours, theirs)
    }

    /// Strict intersection; ranges that merely touch do not intersect.
    pub fn intersects<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
        other: &Range<N>,
    ) -> Result<bool> {
        self.ensure_usable()?;
        other.ensure_usable()?;
        Ok(
            compare_positions(tree, self.start, other.end)? == Ordering::Less
                && compare_positions(tree, other.start, self.end)? == Ordering::Less,
        )
    }

    /// The overlapping span, if any.
    pub fn intersection<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
        other: &Range<N>,
    ) -> Result<Option<Range<N>>> {
        if !self.intersects(tree, other)? {
            return Ok(None);
        }
        let start = if compare_positions(tree, self.start, other.start)? == Ordering::Less {
            other.start
        } else {
            self.start
        };
        let end = if compare_positions(tree, self.end, other.end)? == Ordering::Less {
            self.end
        } else {
            other.end
        };
        Ok(Some(Range::from_positions(start, end)))
    }

    /// The combined span of two overlapping or touching ranges.
    pub fn union<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
        other: &Range<N>,
    ) -> Result<Range<N>> {
        self.ensure_usable()?;
        other.ensure_usable()?;
        let disjoint = compare_positions(tree, self.end, other.start)? == Ordering::Less
            || compare_positions(tree, other.end, self.start)? == Ordering::Less;
        if disjoint {
            return Err(EngineError::usage(
                "cannot union ranges that neither overlap nor touch",
            ));
        }
        let start = if compare_positions(tree, self.start, other.start)? == Ordering::Greater {
            other.start
        } else {
            self.start
        };
        let end = if compare_positions(tree, self.end, other.end)? == Ordering::Less {
            other.end
        } else {
            self.end
        };
        Ok(Range::from_positions(start, end))
    }

    /// Whether `node` lies entirely inside the range.
    pub fn contains_node<T: ContentTree<NodeId = N>>(&self, tree: &T, node: N) -> Result<bool> {
        self.ensure_usable()?;
        let before = position_before(tree, node)?;
        let after = position_after(tree, node)?;
        Ok(
            compare_positions(tree, self.start, before)? != Ordering::Greater
                && compare_positions(tree, after, self.end)? != Ordering::Greater,
        )
    }

    /// Whether all *text* of `node` lies inside the range. Unlike
    /// [`Range::contains_node`] this ignores container edges, so a range
    /// covering a container's character data but not its boundaries counts.
    pub fn contains_node_text<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
        node: N,
    ) -> Result<bool> {
        self.ensure_usable()?;
        let mut first_text = None;
        let mut last_text = None;
        collect_text_extent(tree, node, &mut first_text, &mut last_text);
        match (first_text, last_text) {
            (Some(first), Some(last)) => {
                let start = Position::new(first, 0);
                let end = Position::new(last, tree.text_len(last));
                Ok(
                    compare_positions(tree, self.start, start)? != Ordering::Greater
                        && compare_positions(tree, end, self.end)? != Ordering::Greater,
                )
            }
            // No character data: fall back to containing the node's contents.
            _ => {
                let start = Position::new(node, 0);
                let end = Position::new(node, max_offset(tree, node));
                Ok(
                    compare_positions(tree, self.start, start)? != Ordering::Greater
                        && compare_positions(tree, end, self.end)? != Ordering::Greater,
                )
            }
        }
    }

    pub fn contains_range<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
        other: &Range<N>,
    ) -> Result<bool> {
        self.ensure_usable()?;
        other.ensure_usable()?;
        Ok(
            compare_positions(tree, self.start, other.start)? != Ordering::Greater
                && compare_positions(tree, other.end, self.end)? != Ordering::Greater,
        )
    }

    /// Copy the covered content into a new detached fragment container.
    pub fn clone_contents<T: ContentTree<NodeId = N>>(&self, tree: &mut T) -> Result<N> {
        self.ensure_usable()?;
        let fragment = create_fragment(tree);
        let mut iter = RangeIterator::new(tree, self)?;
        clone_into(tree, &mut iter, fragment)?;
        Ok(fragment)
    }

    /// Move the covered content into a new detached fragment container,
    /// collapsing the range at the cut point.
    pub fn extract_contents<T: ContentTree<NodeId = N>>(&mut self, tree: &mut T) -> Result<N> {
        self.ensure_usable()?;
        debug!(start = ?self.start, end = ?self.end, "extracting range contents");
        let collapse_to = self.removal_collapse_point(tree)?;
        let fragment = create_fragment(tree);
        let mut iter = RangeIterator::new(tree, self)?;
        extract_into(tree, &mut iter, Some(fragment))?;
        self.start = collapse_to;
        self.end = collapse_to;
        Ok(fragment)
    }

    /// Delete the covered content, collapsing the range at the cut point.
    pub fn delete_contents<T: ContentTree<NodeId = N>>(&mut self, tree: &mut T) -> Result<()> {
        self.ensure_usable()?;
        debug!(start = ?self.start, end = ?self.end, "deleting range contents");
        let collapse_to = self.removal_collapse_point(tree)?;
        let mut iter = RangeIterator::new(tree, self)?;
        extract_into(tree, &mut iter, None)?;
        self.start = collapse_to;
        self.end = collapse_to;
        Ok(())
    }

    /// Where the range collapses once its contents are removed. Computed
    /// before mutation: the start boundary survives every removal except
    /// when the start node is a character-data node removed wholesale, in
    /// which case the boundary before it is used.
    fn removal_collapse_point<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
    ) -> Result<Position<N>> {
        let Position { node, offset } = self.start;
        let fully_removed = tree.kind(node).is_character_data()
            && offset == 0
            && !self.is_collapsed()
            && (self.end.node != node || self.end.offset == tree.text_len(node));
        if fully_removed {
            position_before(tree, node)
        } else {
            Ok(self.start)
        }
    }

    /// Insert a detached node at the range's start boundary, splitting a
    /// character-data boundary when the insertion point falls inside one.
    /// The range grows to start immediately before the inserted node.
    pub fn insert_node<T: ContentTree<NodeId = N>>(&mut self, tree: &mut T, node: N) -> Result<()> {
        self.ensure_usable()?;
        if !tree.contains(node) {
            return Err(EngineError::WrongDocument);
        }
        if is_or_is_ancestor(tree, node, self.start.node) {
            return Err(EngineError::hierarchy(
                "cannot insert a node into its own subtree",
            ));
        }
        if tree.parent(node).is_some() {
            return Err(EngineError::hierarchy(
                "node to insert must be detached from its parent",
            ));
        }

        let Position {
            node: at_node,
            offset,
        } = self.start;
        let (parent, index) = if tree.kind(at_node).is_character_data() {
            let parent = tree.parent(at_node).ok_or_else(|| {
                EngineError::usage("cannot insert at a boundary inside a parentless node")
            })?;
            let node_index = tree.node_index(at_node);
            if offset == 0 {
                (parent, node_index)
            } else if offset == tree.text_len(at_node) {
                (parent, node_index + 1)
            } else {
                self.split_at_start_boundary(tree, &mut [])?;
                (parent, node_index + 1)
            }
        } else {
            (at_node, offset)
        };

        // A container end boundary strictly past the insertion point gains a
        // sibling; node-anchored boundaries need no repair.
        if self.end.node == parent && self.end.offset > index {
            self.end.offset += 1;
        }
        tree.insert_child(parent, index, node);
        self.start = position_before(tree, node)?;
        if compare_positions(tree, self.start, self.end)? == Ordering::Greater {
            self.end = self.start;
        }
        Ok(())
    }

    /// Split character-data nodes exactly at both boundaries so structural
    /// edges align with the range. Positions in `preserve` that referenced a
    /// split node (or a boundary in its parent) are repaired in place; the
    /// range's own boundaries always are.
    pub fn split_boundaries<T: ContentTree<NodeId = N>>(
        &mut self,
        tree: &mut T,
        preserve: &mut [Position<N>],
    ) -> Result<()> {
        self.ensure_usable()?;
        debug!(start = ?self.start, end = ?self.end, "splitting range boundaries");

        let Position {
            node: end_node,
            offset: end_offset,
        } = self.end;
        if tree.kind(end_node).is_character_data()
            && end_offset > 0
            && end_offset < tree.text_len(end_node)
        {
            self.split_character_data(tree, end_node, end_offset, preserve)?;
            // The end boundary now sits at the seam: the end of the kept
            // head node, flush against the new tail sibling.
        }

        self.split_at_start_boundary(tree, preserve)?;
        Ok(())
    }

    fn split_at_start_boundary<T: ContentTree<NodeId = N>>(
        &mut self,
        tree: &mut T,
        preserve: &mut [Position<N>],
    ) -> Result<()> {
        let Position {
            node: start_node,
            offset: start_offset,
        } = self.start;
        if tree.kind(start_node).is_character_data()
            && start_offset > 0
            && start_offset < tree.text_len(start_node)
        {
            let tail = self.split_character_data(tree, start_node, start_offset, preserve)?;
            self.start = Position::new(tail, 0);
        }
        Ok(())
    }

    /// Split a character-data node at `index`: the original keeps the head,
    /// a new sibling receives the tail. Repairs `preserve` and the range's
    /// own boundaries: points in the tail shift into the new node, points in
    /// the parent past the split gain a sibling.
    fn split_character_data<T: ContentTree<NodeId = N>>(
        &mut self,
        tree: &mut T,
        node: N,
        index: usize,
        preserve: &mut [Position<N>],
    ) -> Result<N> {
        let parent = tree
            .parent(node)
            .ok_or_else(|| EngineError::usage("cannot split a parentless node"))?;
        let node_index = tree.node_index(node);
        let len = tree.text_len(node);

        let tail_text = tree.text_slice(node, index..len).into_owned();
        tree.splice_text(node, index..len, "");
        let tail = tree.create_character_data(&tail_text);
        tree.insert_child(parent, node_index + 1, tail);

        let repair = |p: &mut Position<N>| {
            if p.node == node && p.offset > index {
                *p = Position::new(tail, p.offset - index);
            } else if p.node == parent && p.offset > node_index {
                p.offset += 1;
            }
        };
        for p in preserve.iter_mut() {
            repair(p);
        }
        repair(&mut self.start);
        repair(&mut self.end);

        Ok(tail)
    }
}

fn create_fragment<T: ContentTree>(tree: &mut T) -> T::NodeId {
    tree.create_container("#fragment", NodeStyle::block())
}

fn append<T: ContentTree>(tree: &mut T, parent: T::NodeId, child: T::NodeId) {
    let at = tree.child_count(parent);
    tree.insert_child(parent, at, child);
}

fn clone_into<T: ContentTree>(
    tree: &mut T,
    iter: &mut RangeIterator<T::NodeId>,
    dest: T::NodeId,
) -> Result<()> {
    while let Some(node) = iter.next(tree) {
        if let Some(span) = iter.selected_text_span(tree, node) {
            if span.is_empty() {
                continue;
            }
            let text = tree.text_slice(node, span).into_owned();
            let copy = tree.create_character_data(&text);
            append(tree, dest, copy);
        } else if iter.is_partially_selected(tree, node) {
            let shell = tree.clone_node(node, false);
            append(tree, dest, shell);
            let sub = iter.subrange(tree, node);
            let mut sub_iter = RangeIterator::new(tree, &sub)?;
            clone_into(tree, &mut sub_iter, shell)?;
        } else {
            let copy = tree.clone_node(node, true);
            append(tree, dest, copy);
        }
    }
    Ok(())
}

/// Shared removal walk: with a destination the covered content is moved into
/// it (extract), without one it is discarded (delete).
fn extract_into<T: ContentTree>(
    tree: &mut T,
    iter: &mut RangeIterator<T::NodeId>,
    dest: Option<T::NodeId>,
) -> Result<()> {
    while let Some(node) = iter.next(tree) {
        let span = iter.selected_text_span(tree, node);
        if span.as_ref().is_some_and(std::ops::Range::is_empty) {
            continue;
        }
        let partial_text = span
            .as_ref()
            .is_some_and(|s| s.start > 0 || s.end < tree.text_len(node));
        if let Some(span) = span.filter(|_| partial_text) {
            if let Some(dest) = dest {
                let text = tree.text_slice(node, span.clone()).into_owned();
                let copy = tree.create_character_data(&text);
                append(tree, dest, copy);
            }
            tree.splice_text(node, span, "");
        } else if iter.is_partially_selected(tree, node) {
            let sub = iter.subrange(tree, node);
            let mut sub_iter = RangeIterator::new(tree, &sub)?;
            let shell = if let Some(dest) = dest {
                let shell = tree.clone_node(node, false);
                append(tree, dest, shell);
                Some(shell)
            } else {
                None
            };
            extract_into(tree, &mut sub_iter, shell)?;
        } else {
            let parent = tree
                .parent(node)
                .ok_or_else(|| EngineError::usage("covered node has no parent"))?;
            let index = tree.node_index(node);
            let removed = tree.remove_child(parent, index);
            if let Some(dest) = dest {
                append(tree, dest, removed);
            }
        }
    }
    Ok(())
}

fn collect_text_extent<T: ContentTree>(
    tree: &T,
    node: T::NodeId,
    first: &mut Option<T::NodeId>,
    last: &mut Option<T::NodeId>,
) {
    if tree.kind(node).is_character_data() {
        if first.is_none() {
            *first = Some(node);
        }
        *last = Some(node);
        return;
    }
    for i in 0..tree.child_count(node) {
        if let Some(child) = tree.child(node, i) {
            collect_text_extent(tree, child, first, last);
        }
    }
}
