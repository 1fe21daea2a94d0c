//! Word tokenization over the visible character stream.
//!
//! A token stream is anchored at a position and pulls characters in both
//! directions on demand, re-tokenizing as the window grows: a token's true
//! boundary is only known once enough surrounding context has been fetched
//! (an apostrophe may or may not glue two word runs together, for example).

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;
use treespan_tree::ContentTree;

use crate::error::Result;
use crate::position::Position;
use crate::text::iter::{CharIter, Direction, VisibleChar};
use crate::text::{CharacterOptions, TextSession};

/// Letters/digits with embedded apostrophes.
static DEFAULT_WORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}\p{N}]+)*").expect("default word regex"));

/// How many characters of context beyond a token boundary make it final.
/// The default word pattern can only extend a word through an apostrophe
/// followed by a word character, so two characters suffice; custom patterns
/// with longer bridges should not rely on incremental tokenization.
const LOOKAROUND_MARGIN: usize = 2;

/// Pluggable word matching.
#[derive(Debug, Clone)]
pub struct WordOptions {
    /// Matches word runs within the visible character stream.
    pub word_regex: Regex,
    /// Whether a word token absorbs the spaces immediately following it.
    pub include_trailing_space: bool,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            word_regex: DEFAULT_WORD_REGEX.clone(),
            include_trailing_space: false,
        }
    }
}

impl WordOptions {
    pub(crate) fn is_word_char(&self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.word_regex.is_match(ch.encode_utf8(&mut buf))
    }
}

/// A contiguous run of visible characters tagged word or non-word.
#[derive(Debug, Clone)]
pub struct Token<N> {
    pub chars: Vec<VisibleChar<N>>,
    pub is_word: bool,
}

impl<N: Copy> Token<N> {
    /// Caret position at the front of the token.
    pub fn start_position(&self) -> Position<N> {
        self.chars.first().expect("token is never empty").pre
    }

    /// Caret position at the back of the token.
    pub fn end_position(&self) -> Position<N> {
        self.chars.last().expect("token is never empty").pos
    }
}

/// Token spans over a char buffer: (start, end, is_word) in char indices,
/// covering the buffer completely.
fn tokenize(text: &str, word_regex: &Regex) -> Vec<(usize, usize, bool)> {
    let total = text.chars().count();
    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (ci, (bi, _)) in text.char_indices().enumerate() {
        byte_to_char[bi] = ci;
    }
    byte_to_char[text.len()] = total;

    let mut spans = Vec::new();
    let mut prev_end = 0;
    for m in word_regex.find_iter(text) {
        let start = byte_to_char[m.start()];
        let end = byte_to_char[m.end()];
        if start > prev_end {
            spans.push((prev_end, start, false));
        }
        spans.push((start, end, true));
        prev_end = end;
    }
    if prev_end < total {
        spans.push((prev_end, total, false));
    }
    spans
}

/// Bidirectional, incrementally re-tokenized token provider.
pub struct TokenStream<N> {
    forward: CharIter<N>,
    backward: CharIter<N>,
    buf: VecDeque<VisibleChar<N>>,
    /// Consumption point for forward token pulls (char index into `buf`).
    fwd_cursor: usize,
    /// Consumption point for backward token pulls.
    bwd_cursor: usize,
    fwd_done: bool,
    bwd_done: bool,
    opts: WordOptions,
}

impl<N: Copy + Eq + std::hash::Hash + std::fmt::Debug> TokenStream<N> {
    pub fn new<T: ContentTree<NodeId = N>>(
        session: &TextSession<'_, T>,
        anchor: Position<N>,
        character_opts: CharacterOptions,
        word_opts: &WordOptions,
    ) -> Result<Self> {
        Ok(Self {
            forward: CharIter::new(session, anchor, None, Direction::Forward, character_opts)?,
            backward: CharIter::new(session, anchor, None, Direction::Backward, character_opts)?,
            buf: VecDeque::new(),
            fwd_cursor: 0,
            bwd_cursor: 0,
            fwd_done: false,
            bwd_done: false,
            opts: word_opts.clone(),
        })
    }

    fn fetch_forward<T: ContentTree<NodeId = N>>(&mut self, session: &mut TextSession<'_, T>) {
        match self.forward.next(session) {
            Some(vc) => self.buf.push_back(vc),
            None => self.fwd_done = true,
        }
    }

    fn fetch_backward<T: ContentTree<NodeId = N>>(&mut self, session: &mut TextSession<'_, T>) {
        match self.backward.next(session) {
            Some(vc) => {
                self.buf.push_front(vc);
                self.fwd_cursor += 1;
                self.bwd_cursor += 1;
            }
            None => self.bwd_done = true,
        }
    }

    fn buffer_text(&self) -> String {
        self.buf.iter().map(|vc| vc.ch).collect()
    }

    fn token_at(&self, start: usize, end: usize, is_word: bool) -> Token<N> {
        Token {
            chars: self.buf.iter().skip(start).take(end - start).copied().collect(),
            is_word,
        }
    }

    /// The next token whose end lies past everything already consumed
    /// forward; fetches and re-tokenizes until its boundaries are stable.
    pub fn next_end_token<T: ContentTree<NodeId = N>>(
        &mut self,
        session: &mut TextSession<'_, T>,
    ) -> Option<Token<N>> {
        loop {
            let text = self.buffer_text();
            let spans = tokenize(&text, &self.opts.word_regex);
            match spans.iter().copied().find(|&(_, end, _)| end > self.fwd_cursor) {
                Some((start, end, is_word)) => {
                    let end_stable =
                        self.fwd_done || self.buf.len().saturating_sub(end) >= LOOKAROUND_MARGIN;
                    let start_stable = self.bwd_done || start >= LOOKAROUND_MARGIN;
                    if end_stable && start_stable {
                        let mut end = end;
                        if is_word && self.opts.include_trailing_space {
                            end = self.absorb_trailing_space(session, end);
                        }
                        self.fwd_cursor = end;
                        return Some(self.token_at(start, end, is_word));
                    }
                    if !end_stable {
                        self.fetch_forward(session);
                    } else {
                        self.fetch_backward(session);
                    }
                }
                None => {
                    if self.fwd_done {
                        return None;
                    }
                    self.fetch_forward(session);
                }
            }
        }
    }

    /// The previous token whose start lies before everything already
    /// consumed backward.
    pub fn previous_start_token<T: ContentTree<NodeId = N>>(
        &mut self,
        session: &mut TextSession<'_, T>,
    ) -> Option<Token<N>> {
        loop {
            let text = self.buffer_text();
            let spans = tokenize(&text, &self.opts.word_regex);
            match spans
                .iter()
                .rev()
                .copied()
                .find(|&(start, _, _)| start < self.bwd_cursor)
            {
                Some((start, end, is_word)) => {
                    let end_stable =
                        self.fwd_done || self.buf.len().saturating_sub(end) >= LOOKAROUND_MARGIN;
                    let start_stable = self.bwd_done || start >= LOOKAROUND_MARGIN;
                    if end_stable && start_stable {
                        self.bwd_cursor = start;
                        return Some(self.token_at(start, end, is_word));
                    }
                    if !start_stable {
                        self.fetch_backward(session);
                    } else {
                        self.fetch_forward(session);
                    }
                }
                None => {
                    if self.bwd_done {
                        return None;
                    }
                    self.fetch_backward(session);
                }
            }
        }
    }

    fn absorb_trailing_space<T: ContentTree<NodeId = N>>(
        &mut self,
        session: &mut TextSession<'_, T>,
        mut end: usize,
    ) -> usize {
        loop {
            if end < self.buf.len() {
                if self.buf[end].ch == ' ' {
                    end += 1;
                } else {
                    break;
                }
            } else if self.fwd_done {
                break;
            } else {
                self.fetch_forward(session);
            }
        }
        end
    }
}
