//! Character iteration over the visible stream.

use treespan_tree::{ContentTree, DisplayRole};

use crate::error::Result;
use crate::position::{Position, validate_position};
use crate::text::{CharacterOptions, TextSession};

/// Iteration skips hidden subtrees wholesale, so a bound inside one would
/// never be reached. Clamp it to the equivalent boundary just outside the
/// topmost hidden ancestor; nothing inside renders, so the character stream
/// is unchanged.
fn clamp_out_of_hidden<T: ContentTree>(
    tree: &T,
    pos: Position<T::NodeId>,
    direction: Direction,
) -> Position<T::NodeId> {
    let mut top_hidden = None;
    let mut current = Some(pos.node);
    while let Some(n) = current {
        if tree.style(n).display == DisplayRole::Hidden {
            top_hidden = Some(n);
        }
        current = tree.parent(n);
    }
    let Some(hidden) = top_hidden else {
        return pos;
    };
    let Some(parent) = tree.parent(hidden) else {
        // A hidden root renders nothing anywhere; the bound is moot.
        return pos;
    };
    let index = tree.node_index(hidden);
    match direction {
        Direction::Forward => Position::new(parent, index),
        Direction::Backward => Position::new(parent, index + 1),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One visible character: the character itself, the position it belongs to
/// (the caret just after it) and the position just before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleChar<N> {
    pub ch: char,
    /// The position whose resolved character this is; a caret here sits
    /// immediately after the character.
    pub pos: Position<N>,
    /// The adjacent position on the other side of the character.
    pub pre: Position<N>,
}

/// Walks the visible character stream in either direction, skipping
/// positions that resolve to nothing.
///
/// Carries a single-slot rewind buffer: exactly one consumed character can
/// be pushed back with [`CharIter::rewind`]. The word tokenizer's merge
/// logic depends on that being exactly one slot.
#[derive(Debug, Clone)]
pub struct CharIter<N> {
    pos: Position<N>,
    bound: Option<Position<N>>,
    direction: Direction,
    opts: CharacterOptions,
    pending: Option<VisibleChar<N>>,
    last: Option<VisibleChar<N>>,
}

impl<N: Copy + Eq + std::hash::Hash + std::fmt::Debug> CharIter<N> {
    /// Start iterating at `from`. A forward iterator yields the characters
    /// of positions after `from` up to and including `bound`; a backward
    /// iterator yields the characters of positions from `from` down to just
    /// after `bound`. Without a bound, iteration runs to the tree edge.
    pub fn new<T: ContentTree<NodeId = N>>(
        session: &TextSession<'_, T>,
        from: Position<N>,
        bound: Option<Position<N>>,
        direction: Direction,
        opts: CharacterOptions,
    ) -> Result<Self> {
        validate_position(session.tree, from)?;
        if let Some(b) = bound {
            validate_position(session.tree, b)?;
        }
        // Both endpoints get the same clamping, so a span lying entirely
        // inside hidden content degenerates to an empty iteration.
        let from = clamp_out_of_hidden(session.tree, from, direction);
        let bound = bound.map(|b| clamp_out_of_hidden(session.tree, b, direction));
        Ok(Self {
            pos: from,
            bound,
            direction,
            opts,
            pending: None,
            last: None,
        })
    }

    /// Current iteration position: the caret after (forward) or before
    /// (backward) everything consumed so far.
    pub fn position(&self) -> Position<N> {
        self.pos
    }

    pub fn next<T: ContentTree<NodeId = N>>(
        &mut self,
        session: &mut TextSession<'_, T>,
    ) -> Option<VisibleChar<N>> {
        if let Some(vc) = self.pending.take() {
            self.last = Some(vc);
            return Some(vc);
        }
        let vc = match self.direction {
            Direction::Forward => self.next_forward(session),
            Direction::Backward => self.next_backward(session),
        };
        if vc.is_some() {
            self.last = vc;
        }
        vc
    }

    fn next_forward<T: ContentTree<NodeId = N>>(
        &mut self,
        session: &mut TextSession<'_, T>,
    ) -> Option<VisibleChar<N>> {
        loop {
            if Some(self.pos) == self.bound {
                return None;
            }
            let pre = self.pos;
            let p = session.next_position(self.pos)?;
            self.pos = p;
            if let Some(ch) = session.visible_char_at(p, self.opts) {
                return Some(VisibleChar { ch, pos: p, pre });
            }
        }
    }

    fn next_backward<T: ContentTree<NodeId = N>>(
        &mut self,
        session: &mut TextSession<'_, T>,
    ) -> Option<VisibleChar<N>> {
        loop {
            if Some(self.pos) == self.bound {
                return None;
            }
            let at = self.pos;
            let ch = session.visible_char_at(at, self.opts);
            let Some(prev) = session.prev_position(at) else {
                return None;
            };
            self.pos = prev;
            if let Some(ch) = ch {
                return Some(VisibleChar {
                    ch,
                    pos: at,
                    pre: prev,
                });
            }
        }
    }

    /// Push the most recently consumed character back; the next call to
    /// [`CharIter::next`] returns it again. At most one character can be
    /// outstanding; returns whether anything was pushed back.
    pub fn rewind(&mut self) -> bool {
        match self.last.take() {
            Some(vc) if self.pending.is_none() => {
                self.pending = Some(vc);
                true
            }
            _ => false,
        }
    }
}
