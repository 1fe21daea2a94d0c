//! Character classification and resolution.
//!
//! Each position owns at most one candidate character: the character
//! immediately preceding it. Resolution happens in three phases, per
//! position, all cached in the session:
//!
//! 1. *Prepopulate* from purely local context: the preceding character-data
//!    character classified under the node's whitespace mode, a forced line
//!    break crossing a `LineBreak` element, or nothing.
//! 2. *Resolve lazily* the virtual space a container boundary contributes: a
//!    block with rendered content yields a virtual newline, a table cell a
//!    virtual tab, an inline container forwards to its last (or first)
//!    rendered descendant. Lazy because it may require scanning descendants.
//! 3. *Finalize* under caller-supplied [`CharacterOptions`], which decide
//!    whether borderline collapsible characters are exposed. Finalization
//!    looks backward (runs of collapsible spaces collapse onto their first
//!    member, virtual newlines collapse onto an already-rendered break) and
//!    forward (trailing spaces before a break or at end of content drop
//!    unless the matching option keeps them).

use treespan_tree::{ContentTree, DisplayRole, NodeKind, WhiteSpaceMode};

use crate::position::Position;
use crate::text::{CharacterOptions, TextSession};

/// Classified candidate character of a position, before finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolvedChar {
    Empty,
    /// Renders unconditionally.
    NonSpace(char),
    /// Literal whitespace under `pre`/`pre-line`; renders unconditionally.
    UncollapsibleSpace(char),
    /// Candidate collapsed space; renders as `' '` when it survives.
    CollapsibleSpace,
    /// `\n` from a forced line break element; renders unconditionally.
    ForcedBreak,
    /// Virtual `\n` from a block boundary; renders only between content.
    BlockBreak,
    /// Virtual `\t` after a table cell; renders only when content follows.
    CellTab,
}

use ResolvedChar::*;

/// Classify one character-data character under a whitespace mode.
pub(crate) fn classify_char(ch: char, mode: WhiteSpaceMode) -> ResolvedChar {
    match mode {
        WhiteSpaceMode::Pre => match ch {
            '\n' | '\r' => UncollapsibleSpace('\n'),
            ' ' | '\t' => UncollapsibleSpace(ch),
            c => NonSpace(c),
        },
        WhiteSpaceMode::PreLine => match ch {
            '\n' | '\r' => UncollapsibleSpace('\n'),
            ' ' | '\t' => CollapsibleSpace,
            c => NonSpace(c),
        },
        WhiteSpaceMode::Normal | WhiteSpaceMode::Nowrap => match ch {
            ' ' | '\t' | '\n' | '\r' => CollapsibleSpace,
            c => NonSpace(c),
        },
    }
}

impl<'t, T: ContentTree> TextSession<'t, T> {
    /// Phases 1 and 2: the classified candidate character of a position.
    pub(crate) fn resolved_char(&mut self, pos: Position<T::NodeId>) -> ResolvedChar {
        let wid = self.wrapper_id(pos.node);
        if let Some(&rc) = self.resolved.get(&(wid, pos.offset)) {
            return rc;
        }

        let (kind, hidden, white_space) = {
            let w = self.wrapper(wid);
            (w.kind, w.hidden, w.white_space)
        };

        let rc = if hidden {
            Empty
        } else if kind == NodeKind::CharacterData {
            if pos.offset == 0 {
                Empty
            } else {
                let ch = self
                    .wrapper(wid)
                    .text
                    .as_ref()
                    .and_then(|t| t.get(pos.offset - 1))
                    .copied();
                match ch {
                    Some(c) => classify_char(c, white_space),
                    None => Empty,
                }
            }
        } else {
            let mut rc = Empty;
            if pos.offset > 0
                && let Some(prev) = self.tree.child(pos.node, pos.offset - 1)
            {
                rc = self.trailing_char(prev);
            }
            if rc == Empty
                && let Some(next) = self.tree.child(pos.node, pos.offset)
            {
                rc = self.leading_char(next);
            }
            rc
        };

        self.resolved.insert((wid, pos.offset), rc);
        rc
    }

    /// The virtual character a node contributes after its end.
    fn trailing_char(&mut self, node: T::NodeId) -> ResolvedChar {
        if self.is_hidden(node) {
            return Empty;
        }
        let wid = self.wrapper_id(node);
        let (kind, display) = {
            let w = self.wrapper(wid);
            (w.kind, w.display)
        };
        if kind == NodeKind::CharacterData {
            return Empty;
        }
        match display {
            DisplayRole::LineBreak => ForcedBreak,
            DisplayRole::TableCell => CellTab,
            DisplayRole::Block => {
                if self.has_rendered_content(node) {
                    BlockBreak
                } else {
                    Empty
                }
            }
            DisplayRole::Inline => match self.last_visible_child(node) {
                Some(child) => self.trailing_char(child),
                None => Empty,
            },
            DisplayRole::Hidden => Empty,
        }
    }

    /// The virtual character a node contributes before its start.
    fn leading_char(&mut self, node: T::NodeId) -> ResolvedChar {
        if self.is_hidden(node) {
            return Empty;
        }
        let wid = self.wrapper_id(node);
        let (kind, display) = {
            let w = self.wrapper(wid);
            (w.kind, w.display)
        };
        if kind == NodeKind::CharacterData {
            return Empty;
        }
        match display {
            DisplayRole::Block => {
                if self.has_rendered_content(node) {
                    BlockBreak
                } else {
                    Empty
                }
            }
            DisplayRole::Inline => match self.first_visible_child(node) {
                Some(child) => self.leading_char(child),
                None => Empty,
            },
            _ => Empty,
        }
    }

    fn first_visible_child(&mut self, node: T::NodeId) -> Option<T::NodeId> {
        for i in 0..self.tree.child_count(node) {
            let child = self.tree.child(node, i)?;
            if !self.is_hidden(child) {
                return Some(child);
            }
        }
        None
    }

    fn last_visible_child(&mut self, node: T::NodeId) -> Option<T::NodeId> {
        for i in (0..self.tree.child_count(node)).rev() {
            let child = self.tree.child(node, i)?;
            if !self.is_hidden(child) {
                return Some(child);
            }
        }
        None
    }

    /// Whether a subtree contains anything that renders: a non-collapsible
    /// character or a forced line break. Cached per wrapper.
    pub(crate) fn has_rendered_content(&mut self, node: T::NodeId) -> bool {
        let wid = self.wrapper_id(node);
        if let Some(v) = self.wrapper(wid).rendered_content {
            return v;
        }
        let (kind, display, hidden, white_space) = {
            let w = self.wrapper(wid);
            (w.kind, w.display, w.hidden, w.white_space)
        };
        let v = if hidden {
            false
        } else if kind == NodeKind::CharacterData {
            let text = self.wrapper(wid).text.clone().unwrap_or_default();
            text.iter().any(|&c| {
                matches!(
                    classify_char(c, white_space),
                    NonSpace(_) | UncollapsibleSpace(_)
                )
            })
        } else if display == DisplayRole::LineBreak {
            true
        } else {
            let count = self.tree.child_count(node);
            let mut found = false;
            for i in 0..count {
                if let Some(child) = self.tree.child(node, i)
                    && self.has_rendered_content(child)
                {
                    found = true;
                    break;
                }
            }
            found
        };
        self.wrapper_mut(wid).rendered_content = Some(v);
        v
    }

    /// Next position in document order, skipping hidden subtrees wholesale.
    pub(crate) fn next_position(
        &mut self,
        pos: Position<T::NodeId>,
    ) -> Option<Position<T::NodeId>> {
        let node = pos.node;
        if self.tree.kind(node).is_character_data() {
            if pos.offset < self.cached_text_len(node) {
                return Some(Position::new(node, pos.offset + 1));
            }
        } else if pos.offset < self.tree.child_count(node) {
            let child = self.tree.child(node, pos.offset)?;
            if self.is_hidden(child) {
                return Some(Position::new(node, pos.offset + 1));
            }
            return Some(Position::new(child, 0));
        }
        let parent = self.tree.parent(node)?;
        Some(Position::new(parent, self.tree.node_index(node) + 1))
    }

    /// Previous position in document order; exact mirror of
    /// [`TextSession::next_position`].
    pub(crate) fn prev_position(
        &mut self,
        pos: Position<T::NodeId>,
    ) -> Option<Position<T::NodeId>> {
        let node = pos.node;
        if pos.offset > 0 {
            if self.tree.kind(node).is_character_data() {
                return Some(Position::new(node, pos.offset - 1));
            }
            let child = self.tree.child(node, pos.offset - 1)?;
            if self.is_hidden(child) {
                return Some(Position::new(node, pos.offset - 1));
            }
            let end = if self.tree.kind(child).is_character_data() {
                self.cached_text_len(child)
            } else {
                self.tree.child_count(child)
            };
            return Some(Position::new(child, end));
        }
        let parent = self.tree.parent(node)?;
        Some(Position::new(parent, self.tree.node_index(node)))
    }

    /// Phase 3: the finalized visible character of a position under the
    /// given options, or `None` when nothing renders there.
    pub(crate) fn visible_char_at(
        &mut self,
        pos: Position<T::NodeId>,
        opts: CharacterOptions,
    ) -> Option<char> {
        let wid = self.wrapper_id(pos.node);
        let key = (wid, pos.offset, opts.signature());
        if let Some(&c) = self.finalized.get(&key) {
            return c;
        }
        let rc = self.resolved_char(pos);
        let c = match rc {
            Empty => None,
            NonSpace(c) | UncollapsibleSpace(c) => Some(c),
            ForcedBreak => Some('\n'),
            CollapsibleSpace | BlockBreak | CellTab => {
                let prev = self.previous_rendered_char(pos, opts);
                self.finalize_contextual(pos, rc, prev, opts)
            }
        };
        self.finalized.insert(key, c);
        c
    }

    /// Finalize a context-dependent candidate given the previous rendered
    /// character.
    fn finalize_contextual(
        &mut self,
        pos: Position<T::NodeId>,
        rc: ResolvedChar,
        prev: Option<char>,
        opts: CharacterOptions,
    ) -> Option<char> {
        match rc {
            CollapsibleSpace => match prev {
                // Collapses at content start, after another space, and at
                // the start of a line or cell.
                None | Some(' ' | '\n' | '\t') => None,
                Some(_) => {
                    if self.space_renders(pos, opts) {
                        Some(' ')
                    } else {
                        None
                    }
                }
            },
            BlockBreak => {
                if prev.is_none() || prev == Some('\n') {
                    None
                } else if self.content_follows(pos) {
                    Some('\n')
                } else {
                    None
                }
            }
            CellTab => {
                if self.content_follows(pos) {
                    Some('\t')
                } else {
                    None
                }
            }
            _ => unreachable!("only context-dependent kinds reach finalize_contextual"),
        }
    }

    /// The finalized character nearest before `pos`.
    ///
    /// Walks backward collecting context-dependent candidates until an
    /// unconditional character (or the tree start) anchors the chain, then
    /// finalizes the candidates oldest-first. Iterative on purpose: a long
    /// run of collapsible spaces must not recurse once per character.
    pub(crate) fn previous_rendered_char(
        &mut self,
        pos: Position<T::NodeId>,
        opts: CharacterOptions,
    ) -> Option<char> {
        let sig = opts.signature();
        let mut pending: Vec<(Position<T::NodeId>, ResolvedChar)> = Vec::new();
        let mut cursor = pos;
        let mut base: Option<char> = None;

        loop {
            let Some(p) = self.prev_position(cursor) else {
                break;
            };
            cursor = p;
            let wid = self.wrapper_id(p.node);
            if let Some(&cached) = self.finalized.get(&(wid, p.offset, sig)) {
                if cached.is_some() {
                    base = cached;
                    break;
                }
                continue;
            }
            match self.resolved_char(p) {
                Empty => continue,
                NonSpace(c) | UncollapsibleSpace(c) => {
                    self.finalized.insert((wid, p.offset, sig), Some(c));
                    base = Some(c);
                    break;
                }
                ForcedBreak => {
                    self.finalized.insert((wid, p.offset, sig), Some('\n'));
                    base = Some('\n');
                    break;
                }
                rc @ (CollapsibleSpace | BlockBreak | CellTab) => pending.push((p, rc)),
            }
        }

        for (p, rc) in pending.into_iter().rev() {
            let rendered = self.finalize_contextual(p, rc, base, opts);
            let wid = self.wrapper_id(p.node);
            self.finalized.insert((wid, p.offset, sig), rendered);
            if rendered.is_some() {
                base = rendered;
            }
        }
        base
    }

    /// Forward check for a collapsible space: what does it precede?
    fn space_renders(&mut self, pos: Position<T::NodeId>, opts: CharacterOptions) -> bool {
        let mut cursor = pos;
        while let Some(p) = self.next_position(cursor) {
            cursor = p;
            match self.resolved_char(p) {
                Empty | CollapsibleSpace => {}
                NonSpace(_) => return true,
                UncollapsibleSpace(c) => {
                    return if c == '\n' {
                        opts.include_pre_line_trailing_space
                    } else {
                        true
                    };
                }
                ForcedBreak => return opts.include_space_before_br,
                BlockBreak | CellTab => return opts.include_block_content_trailing_space,
            }
        }
        opts.include_block_content_trailing_space
    }

    /// Forward check for virtual breaks: does any real content follow?
    fn content_follows(&mut self, pos: Position<T::NodeId>) -> bool {
        let mut cursor = pos;
        while let Some(p) = self.next_position(cursor) {
            cursor = p;
            match self.resolved_char(p) {
                NonSpace(_) | UncollapsibleSpace(_) | ForcedBreak => return true,
                _ => {}
            }
        }
        false
    }
}
