//! Movement, expansion, search and character-offset addressing.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use treespan_tree::ContentTree;

use crate::error::{EngineError, Result};
use crate::position::{Position, compare_positions, max_offset, validate_position};
use crate::range::Range;
use crate::text::iter::{CharIter, Direction, VisibleChar};
use crate::text::words::{TokenStream, WordOptions};
use crate::text::{CharacterOptions, TextSession};

/// Granularity of movement and expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Character,
    Word,
}

/// Options shared by movement and expansion calls.
#[derive(Debug, Clone, Default)]
pub struct MotionOptions {
    pub characters: CharacterOptions,
    pub words: WordOptions,
}

/// What to search for.
#[derive(Debug, Clone)]
pub enum SearchTerm {
    Literal(String),
    Pattern(Regex),
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub backward: bool,
    pub case_sensitive: bool,
    /// Reject matches embedded in larger words, judged by the word matcher.
    pub whole_words_only: bool,
    /// Continue from the far end of the tree back to the starting point
    /// when nothing is found ahead. Bounded: the stream is never scanned
    /// twice.
    pub wrap: bool,
    pub characters: CharacterOptions,
    pub words: WordOptions,
}

/// A span of visible characters relative to some container, the persistable
/// form of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRange {
    pub start: usize,
    pub end: usize,
}

/// A range expressed as visible character offsets within a container node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark<N> {
    pub container: N,
    pub range: CharacterRange,
}

impl<'t, T: ContentTree> TextSession<'t, T> {
    /// The visible character sequence covered by `range`.
    pub fn visible_text(&mut self, range: &Range<T::NodeId>) -> Result<String> {
        range.ensure_usable()?;
        let mut iter = CharIter::new(
            self,
            range.start_position(),
            Some(range.end_position()),
            Direction::Forward,
            CharacterOptions::default(),
        )?;
        let mut out = String::new();
        while let Some(vc) = iter.next(self) {
            out.push(vc.ch);
        }
        Ok(out)
    }

    /// The visible character sequence of a node's contents.
    pub fn visible_text_of_node(&mut self, node: T::NodeId) -> Result<String> {
        let mut range = Range::new(self.tree);
        range.select_node_contents(self.tree, node)?;
        self.visible_text(&range)
    }

    /// The visible character immediately following `pos`, with the position
    /// it belongs to.
    pub fn char_after(
        &mut self,
        pos: Position<T::NodeId>,
        opts: CharacterOptions,
    ) -> Result<Option<VisibleChar<T::NodeId>>> {
        let mut iter = CharIter::new(self, pos, None, Direction::Forward, opts)?;
        Ok(iter.next(self))
    }

    /// The visible character immediately preceding `pos`: the character
    /// attributed to the position itself when it renders, otherwise the
    /// nearest rendered character behind it.
    pub fn char_before(
        &mut self,
        pos: Position<T::NodeId>,
        opts: CharacterOptions,
    ) -> Result<Option<char>> {
        validate_position(self.tree, pos)?;
        if let Some(ch) = self.visible_char_at(pos, opts) {
            return Ok(Some(ch));
        }
        Ok(self.previous_rendered_char(pos, opts))
    }

    /// Move a position by up to `count` characters or words, negative counts
    /// moving backward. Returns the landing position and the signed count
    /// actually moved, which is smaller in magnitude when content runs out.
    pub fn move_position_by(
        &mut self,
        pos: Position<T::NodeId>,
        unit: Unit,
        count: isize,
        opts: &MotionOptions,
    ) -> Result<(Position<T::NodeId>, isize)> {
        validate_position(self.tree, pos)?;
        if count == 0 {
            return Ok((pos, 0));
        }
        let backward = count < 0;
        let steps = count.unsigned_abs();
        let mut landed = pos;
        let mut moved = 0isize;

        match unit {
            Unit::Character => {
                let direction = if backward {
                    Direction::Backward
                } else {
                    Direction::Forward
                };
                let mut iter = CharIter::new(self, pos, None, direction, opts.characters)?;
                for _ in 0..steps {
                    let Some(vc) = iter.next(self) else { break };
                    landed = if backward { vc.pre } else { vc.pos };
                    moved += 1;
                }
            }
            Unit::Word => {
                let mut stream = TokenStream::new(self, pos, opts.characters, &opts.words)?;
                'words: for _ in 0..steps {
                    loop {
                        let token = if backward {
                            stream.previous_start_token(self)
                        } else {
                            stream.next_end_token(self)
                        };
                        let Some(token) = token else { break 'words };
                        if token.is_word {
                            landed = if backward {
                                token.start_position()
                            } else {
                                token.end_position()
                            };
                            moved += 1;
                            break;
                        }
                    }
                }
            }
        }
        Ok((landed, if backward { -moved } else { moved }))
    }

    /// Expand a range outward to word boundaries. Returns whether anything
    /// changed. `Unit::Character` expansion is the identity.
    pub fn expand(
        &mut self,
        range: &mut Range<T::NodeId>,
        unit: Unit,
        opts: &MotionOptions,
    ) -> Result<bool> {
        range.ensure_usable()?;
        if unit == Unit::Character {
            return Ok(false);
        }
        let mut changed = false;

        // Pull the start back to the front of the word containing it.
        let start = range.start_position();
        let mut stream = TokenStream::new(self, start, opts.characters, &opts.words)?;
        if let Some(token) = stream.next_end_token(self)
            && token.is_word
        {
            let token_start = token.start_position();
            if compare_positions(self.tree, token_start, start)? == Ordering::Less {
                range.set_start(self.tree, token_start.node, token_start.offset)?;
                changed = true;
            }
        }

        // Push the end forward to the back of the word containing it.
        let end = range.end_position();
        let mut stream = TokenStream::new(self, end, opts.characters, &opts.words)?;
        if let Some(token) = stream.previous_start_token(self)
            && token.is_word
        {
            let token_end = token.end_position();
            if compare_positions(self.tree, token_end, end)? == Ordering::Greater {
                range.set_end(self.tree, token_end.node, token_end.offset)?;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Search the visible character stream for `term`.
    ///
    /// Forward search starts at the range's start boundary, backward search
    /// at its end boundary. On a hit the range is moved onto the match and
    /// `true` is returned; otherwise the range is untouched.
    pub fn find_text(
        &mut self,
        range: &mut Range<T::NodeId>,
        term: &SearchTerm,
        opts: &FindOptions,
    ) -> Result<bool> {
        range.ensure_usable()?;
        debug!(backward = opts.backward, "searching visible text");
        let root = self.tree.root();
        let tree_start = Position::new(root, 0);

        let hit = if opts.backward {
            let origin = range.end_position();
            match self.scan_last(tree_start, Some(origin), term, opts)? {
                Some(hit) => Some(hit),
                None if opts.wrap => self.scan_last(origin, None, term, opts)?,
                None => None,
            }
        } else {
            let origin = range.start_position();
            match self.scan_forward(origin, None, term, opts)? {
                Some(hit) => Some(hit),
                None if opts.wrap => self.scan_forward(tree_start, Some(origin), term, opts)?,
                None => None,
            }
        };

        match hit {
            Some((start, end)) => {
                range.set_start_and_end(self.tree, start.node, start.offset, end.node, end.offset)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Express a range as visible character offsets within `container`.
    pub fn to_character_range(
        &mut self,
        range: &Range<T::NodeId>,
        container: T::NodeId,
    ) -> Result<CharacterRange> {
        range.ensure_usable()?;
        let container_start = self.position(container, 0)?;
        let container_end = Position::new(container, max_offset(self.tree, container));
        if compare_positions(self.tree, container_start, range.start_position())?
            == Ordering::Greater
            || compare_positions(self.tree, range.end_position(), container_end)?
                == Ordering::Greater
        {
            return Err(EngineError::usage(
                "range is not contained in the bookmark container",
            ));
        }

        let mut start = 0;
        let mut iter = CharIter::new(
            self,
            container_start,
            Some(range.start_position()),
            Direction::Forward,
            CharacterOptions::default(),
        )?;
        while iter.next(self).is_some() {
            start += 1;
        }

        let mut len = 0;
        let mut iter = CharIter::new(
            self,
            range.start_position(),
            Some(range.end_position()),
            Direction::Forward,
            CharacterOptions::default(),
        )?;
        while iter.next(self).is_some() {
            len += 1;
        }
        Ok(CharacterRange {
            start,
            end: start + len,
        })
    }

    /// The position after `offset` visible characters of `container`'s
    /// content. Clamps at the end of content.
    pub fn position_at_character_offset(
        &mut self,
        container: T::NodeId,
        offset: usize,
    ) -> Result<Position<T::NodeId>> {
        let mut pos = self.position(container, 0)?;
        let bound = Position::new(container, max_offset(self.tree, container));
        let mut iter = CharIter::new(
            self,
            pos,
            Some(bound),
            Direction::Forward,
            CharacterOptions::default(),
        )?;
        for _ in 0..offset {
            let Some(vc) = iter.next(self) else { break };
            pos = vc.pos;
        }
        Ok(pos)
    }

    /// Inverse of [`TextSession::to_character_range`].
    pub fn range_from_character_range(
        &mut self,
        container: T::NodeId,
        cr: CharacterRange,
    ) -> Result<Range<T::NodeId>> {
        if cr.end < cr.start {
            return Err(EngineError::usage("character range ends before it starts"));
        }
        let start = self.position_at_character_offset(container, cr.start)?;
        let end = self.position_at_character_offset(container, cr.end)?;
        Ok(Range::from_positions(start, end))
    }

    fn fold_char(ch: char, case_sensitive: bool) -> char {
        if case_sensitive {
            ch
        } else {
            ch.to_lowercase().next().unwrap_or(ch)
        }
    }

    /// Judge a candidate match against word boundaries: the characters on
    /// both sides must be absent or rejected by the word matcher.
    fn whole_word_ok(
        words: &WordOptions,
        before: Option<char>,
        after: Option<char>,
    ) -> bool {
        !before.is_some_and(|c| words.is_word_char(c)) && !after.is_some_and(|c| words.is_word_char(c))
    }

    /// Incremental forward scan for the match nearest to `from`.
    fn scan_forward(
        &mut self,
        from: Position<T::NodeId>,
        bound: Option<Position<T::NodeId>>,
        term: &SearchTerm,
        opts: &FindOptions,
    ) -> Result<Option<(Position<T::NodeId>, Position<T::NodeId>)>> {
        let mut iter = CharIter::new(self, from, bound, Direction::Forward, opts.characters)?;
        // One character of context behind the origin keeps whole-word
        // verdicts honest for matches flush against the scan start.
        let before_origin = if opts.whole_words_only {
            let mut back =
                CharIter::new(self, from, None, Direction::Backward, opts.characters)?;
            back.next(self).map(|vc| vc.ch)
        } else {
            None
        };

        let mut chars: Vec<VisibleChar<T::NodeId>> = Vec::new();
        let mut hay = String::new();

        let span = |chars: &[VisibleChar<T::NodeId>], s: usize, e: usize| {
            (chars[s].pre, chars[e - 1].pos)
        };

        match term {
            SearchTerm::Literal(raw) => {
                let needle: Vec<char> = raw
                    .chars()
                    .map(|c| Self::fold_char(c, opts.case_sensitive))
                    .collect();
                if needle.is_empty() {
                    return Ok(None);
                }
                let mut folded: Vec<char> = Vec::new();
                // A match awaiting its one-character lookahead for the
                // whole-word verdict.
                let mut candidate: Option<usize> = None;
                loop {
                    let vc = iter.next(self);
                    if let Some(vc) = vc {
                        folded.push(Self::fold_char(vc.ch, opts.case_sensitive));
                        chars.push(vc);
                    }
                    if let Some(s) = candidate.take() {
                        let e = s + needle.len();
                        let before = if s == 0 {
                            before_origin
                        } else {
                            Some(chars[s - 1].ch)
                        };
                        let after = chars.get(e).map(|vc| vc.ch);
                        if Self::whole_word_ok(&opts.words, before, after) {
                            return Ok(Some(span(&chars, s, e)));
                        }
                    }
                    if vc.is_none() {
                        return Ok(None);
                    }
                    if folded.len() >= needle.len()
                        && folded[folded.len() - needle.len()..] == needle[..]
                    {
                        let s = folded.len() - needle.len();
                        if opts.whole_words_only {
                            candidate = Some(s);
                        } else {
                            return Ok(Some(span(&chars, s, folded.len())));
                        }
                    }
                }
            }
            SearchTerm::Pattern(re) => {
                let re = Self::effective_pattern(re, opts)?;
                // Byte offset of each pushed char within `hay`, and the
                // floor past rejected matches so they are not re-found.
                let mut char_bytes: Vec<usize> = Vec::new();
                let mut search_from = 0;
                loop {
                    let vc = iter.next(self);
                    let at_end = vc.is_none();
                    if let Some(vc) = vc {
                        char_bytes.push(hay.len());
                        hay.push(vc.ch);
                        chars.push(vc);
                    }
                    if let Some(m) = re.find_at(&hay, search_from) {
                        // A match flush with the buffer tail may still grow;
                        // accept it only once a character follows.
                        if m.end() < hay.len() || at_end {
                            let s = char_bytes.partition_point(|&b| b < m.start());
                            let e = char_bytes.partition_point(|&b| b < m.end());
                            if s < e {
                                let before = if s == 0 {
                                    before_origin
                                } else {
                                    Some(chars[s - 1].ch)
                                };
                                let after = chars.get(e).map(|vc| vc.ch);
                                if !opts.whole_words_only
                                    || Self::whole_word_ok(&opts.words, before, after)
                                {
                                    return Ok(Some(span(&chars, s, e)));
                                }
                            }
                            // Judged with full context and rejected; resume
                            // past its first character.
                            search_from = char_bytes
                                .get(s + 1)
                                .copied()
                                .unwrap_or_else(|| hay.len());
                        }
                    }
                    if at_end {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Full scan of `from..bound` keeping the match nearest the bound; this
    /// is how backward search is answered.
    fn scan_last(
        &mut self,
        from: Position<T::NodeId>,
        bound: Option<Position<T::NodeId>>,
        term: &SearchTerm,
        opts: &FindOptions,
    ) -> Result<Option<(Position<T::NodeId>, Position<T::NodeId>)>> {
        let mut iter = CharIter::new(self, from, bound, Direction::Forward, opts.characters)?;
        let mut chars: Vec<VisibleChar<T::NodeId>> = Vec::new();
        let mut hay = String::new();
        let mut char_bytes: Vec<usize> = Vec::new();
        while let Some(vc) = iter.next(self) {
            char_bytes.push(hay.len());
            hay.push(vc.ch);
            chars.push(vc);
        }

        let word_check = |s: usize, e: usize| -> bool {
            if !opts.whole_words_only {
                return true;
            }
            let before = s.checked_sub(1).map(|i| chars[i].ch);
            let after = chars.get(e).map(|vc| vc.ch);
            Self::whole_word_ok(&opts.words, before, after)
        };

        match term {
            SearchTerm::Literal(raw) => {
                let needle: Vec<char> = raw
                    .chars()
                    .map(|c| Self::fold_char(c, opts.case_sensitive))
                    .collect();
                if needle.is_empty() || chars.len() < needle.len() {
                    return Ok(None);
                }
                let folded: Vec<char> = chars
                    .iter()
                    .map(|vc| Self::fold_char(vc.ch, opts.case_sensitive))
                    .collect();
                for s in (0..=folded.len() - needle.len()).rev() {
                    let e = s + needle.len();
                    if folded[s..e] == needle[..] && word_check(s, e) {
                        return Ok(Some((chars[s].pre, chars[e - 1].pos)));
                    }
                }
                Ok(None)
            }
            SearchTerm::Pattern(re) => {
                let re = Self::effective_pattern(re, opts)?;
                let mut last = None;
                for m in re.find_iter(&hay) {
                    let s = char_bytes.partition_point(|&b| b < m.start());
                    let e = char_bytes.partition_point(|&b| b < m.end());
                    if s < e && word_check(s, e) {
                        last = Some((chars[s].pre, chars[e - 1].pos));
                    }
                }
                Ok(last)
            }
        }
    }

    fn effective_pattern(re: &Regex, opts: &FindOptions) -> Result<Regex> {
        if opts.case_sensitive {
            Ok(re.clone())
        } else {
            Regex::new(&format!("(?i:{})", re.as_str()))
                .map_err(|e| EngineError::usage(format!("search pattern: {e}")))
        }
    }
}

impl<N: Copy + Eq + Hash + Debug> Range<N> {
    /// The visible text covered by the range, computed through a disposable
    /// text session.
    pub fn text<T: ContentTree<NodeId = N>>(&self, tree: &T) -> Result<String> {
        TextSession::new(tree).visible_text(self)
    }

    /// Express the range as visible character offsets relative to
    /// `container` (the tree root when omitted).
    pub fn bookmark<T: ContentTree<NodeId = N>>(
        &self,
        tree: &T,
        container: Option<N>,
    ) -> Result<Bookmark<N>> {
        let container = container.unwrap_or_else(|| tree.root());
        let range = TextSession::new(tree).to_character_range(self, container)?;
        Ok(Bookmark { container, range })
    }

    /// Restore boundaries from a bookmark taken earlier.
    pub fn move_to_bookmark<T: ContentTree<NodeId = N>>(
        &mut self,
        tree: &T,
        bookmark: &Bookmark<N>,
    ) -> Result<()> {
        let restored = TextSession::new(tree)
            .range_from_character_range(bookmark.container, bookmark.range)?;
        *self = restored;
        Ok(())
    }
}
