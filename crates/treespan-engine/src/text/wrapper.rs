//! Per-session node fact cache.
//!
//! Wrappers are stored in an arena owned by the session and indexed by a
//! small integer id handed out on first sight of a node. All cached facts
//! (kind, style, text content, renderedness) live here rather than on the
//! host node, so the engine depends only on handle identity.

use treespan_tree::{ContentTree, DisplayRole, NodeKind, WhiteSpaceMode};

use crate::text::TextSession;

/// Index into a session's wrapper arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct WrapperId(pub(crate) u32);

pub(crate) struct NodeWrapper<N> {
    pub(crate) node: N,
    pub(crate) kind: NodeKind,
    pub(crate) display: DisplayRole,
    pub(crate) white_space: WhiteSpaceMode,
    /// Self or an ancestor has `DisplayRole::Hidden`; nothing in here
    /// renders.
    pub(crate) hidden: bool,
    /// Character content, fetched once. `None` for containers.
    pub(crate) text: Option<Vec<char>>,
    /// Lazily computed: does the subtree contain anything that renders?
    pub(crate) rendered_content: Option<bool>,
}

impl<'t, T: ContentTree> TextSession<'t, T> {
    /// Wrapper id for `node`, assigning one on first sight.
    pub(crate) fn wrapper_id(&mut self, node: T::NodeId) -> WrapperId {
        if let Some(&id) = self.by_node.get(&node) {
            return id;
        }
        let kind = self.tree.kind(node);
        let style = self.tree.style(node);
        let hidden = {
            let mut current = Some(node);
            let mut hidden = false;
            while let Some(n) = current {
                if self.tree.style(n).display == DisplayRole::Hidden {
                    hidden = true;
                    break;
                }
                current = self.tree.parent(n);
            }
            hidden
        };
        let text = if kind.is_character_data() {
            let len = self.tree.text_len(node);
            Some(self.tree.text_slice(node, 0..len).chars().collect())
        } else {
            None
        };
        let id = WrapperId(u32::try_from(self.wrappers.len()).expect("wrapper arena overflow"));
        self.wrappers.push(NodeWrapper {
            node,
            kind,
            display: style.display,
            white_space: style.white_space,
            hidden,
            text,
            rendered_content: None,
        });
        self.by_node.insert(node, id);
        id
    }

    pub(crate) fn wrapper(&self, id: WrapperId) -> &NodeWrapper<T::NodeId> {
        &self.wrappers[id.0 as usize]
    }

    pub(crate) fn wrapper_mut(&mut self, id: WrapperId) -> &mut NodeWrapper<T::NodeId> {
        &mut self.wrappers[id.0 as usize]
    }

    /// Character count of a character-data node, from the cache.
    pub(crate) fn cached_text_len(&mut self, node: T::NodeId) -> usize {
        let id = self.wrapper_id(node);
        self.wrapper(id).text.as_ref().map_or(0, Vec::len)
    }

    pub(crate) fn is_hidden(&mut self, node: T::NodeId) -> bool {
        let id = self.wrapper_id(node);
        self.wrapper(id).hidden
    }
}
