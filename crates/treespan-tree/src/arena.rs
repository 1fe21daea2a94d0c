//! Arena-backed reference implementation of [`ContentTree`].

use std::borrow::Cow;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{ContentTree, DisplayRole, NodeKind, NodeStyle, WhiteSpaceMode};

/// Process-global tree stamp so handles from different trees never alias.
static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(1);

/// Handle into an [`ArenaTree`].
///
/// Carries the owning tree's stamp, which is what lets
/// [`ArenaTree::contains`] reject handles that were minted by another tree
/// rather than silently resolving an unrelated node at the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    tree: u32,
    index: u32,
}

struct NodeData {
    kind: NodeKind,
    name: String,
    /// Text content for character data, empty for containers.
    text: String,
    style: NodeStyle,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory content tree with slab storage.
///
/// Nodes live in a flat `Vec`; removal only detaches, so extracted fragments
/// and clones remain addressable for the lifetime of the tree. Character
/// offsets are character indices throughout, matching the engine's position
/// model.
pub struct ArenaTree {
    id: u32,
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl ArenaTree {
    /// Create a tree whose root container has the given name.
    pub fn new(root_name: &str) -> Self {
        let id = NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed);
        let root = NodeId { tree: id, index: 0 };
        let nodes = vec![NodeData {
            kind: NodeKind::Root,
            name: root_name.to_string(),
            text: String::new(),
            style: NodeStyle::block(),
            parent: None,
            children: Vec::new(),
        }];
        Self { id, nodes, root }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let index = u32::try_from(self.nodes.len()).expect("arena node count exceeds u32");
        self.nodes.push(data);
        NodeId {
            tree: self.id,
            index,
        }
    }

    fn node(&self, id: NodeId) -> &NodeData {
        assert_eq!(id.tree, self.id, "node handle from a different tree");
        &self.nodes[id.index as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        assert_eq!(id.tree, self.id, "node handle from a different tree");
        &mut self.nodes[id.index as usize]
    }

    /// Append a new container under `parent` and return its handle.
    pub fn append_container(&mut self, parent: NodeId, name: &str, style: NodeStyle) -> NodeId {
        let child = self.create_container(name, style);
        let at = self.child_count(parent);
        self.insert_child(parent, at, child);
        child
    }

    /// Append a new character-data node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let child = self.create_character_data(text);
        let at = self.child_count(parent);
        self.insert_child(parent, at, child);
        child
    }

    /// Append a forced line break element under `parent`.
    pub fn append_line_break(&mut self, parent: NodeId) -> NodeId {
        self.append_container(parent, "br", NodeStyle::line_break())
    }

    fn clone_rec(&mut self, source: NodeId, deep: bool) -> NodeId {
        let src = self.node(source);
        let data = NodeData {
            kind: src.kind,
            name: src.name.clone(),
            text: src.text.clone(),
            style: src.style,
            parent: None,
            children: Vec::new(),
        };
        // A clone of the root is an ordinary container.
        let data = NodeData {
            kind: if data.kind == NodeKind::Root {
                NodeKind::Container
            } else {
                data.kind
            },
            ..data
        };
        let child_count = src.children.len();
        let copy = self.alloc(data);
        if deep {
            for i in 0..child_count {
                let child = self.node(source).children[i];
                let child_copy = self.clone_rec(child, true);
                self.node_mut(child_copy).parent = Some(copy);
                self.node_mut(copy).children.push(child_copy);
            }
        }
        copy
    }

    /// Effective whitespace mode for character data: inherited from the
    /// nearest ancestor container, the way computed style would be.
    fn inherited_white_space(&self, id: NodeId) -> WhiteSpaceMode {
        let mut current = self.node(id).parent;
        while let Some(p) = current {
            let data = self.node(p);
            if data.kind.is_container() {
                return data.style.white_space;
            }
            current = data.parent;
        }
        WhiteSpaceMode::Normal
    }
}

impl ContentTree for ArenaTree {
    type NodeId = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn contains(&self, node: NodeId) -> bool {
        node.tree == self.id && (node.index as usize) < self.nodes.len()
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.node(node).kind
    }

    fn name(&self, node: NodeId) -> Cow<'_, str> {
        Cow::Borrowed(&self.node(node).name)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn child_count(&self, node: NodeId) -> usize {
        self.node(node).children.len()
    }

    fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.node(node).children.get(index).copied()
    }

    fn text_len(&self, node: NodeId) -> usize {
        self.node(node).text.chars().count()
    }

    fn text_slice(&self, node: NodeId, range: std::ops::Range<usize>) -> Cow<'_, str> {
        let text: String = self
            .node(node)
            .text
            .chars()
            .skip(range.start)
            .take(range.end.saturating_sub(range.start))
            .collect();
        Cow::Owned(text)
    }

    fn style(&self, node: NodeId) -> NodeStyle {
        let data = self.node(node);
        match data.kind {
            NodeKind::CharacterData => NodeStyle {
                display: DisplayRole::Inline,
                white_space: self.inherited_white_space(node),
            },
            _ => data.style,
        }
    }

    fn create_character_data(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData {
            kind: NodeKind::CharacterData,
            name: "#text".to_string(),
            text: text.to_string(),
            style: NodeStyle::inline(),
            parent: None,
            children: Vec::new(),
        })
    }

    fn create_container(&mut self, name: &str, style: NodeStyle) -> NodeId {
        self.alloc(NodeData {
            kind: NodeKind::Container,
            name: name.to_string(),
            text: String::new(),
            style,
            parent: None,
            children: Vec::new(),
        })
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        assert!(
            self.node(child).parent.is_none(),
            "insert_child requires a detached node"
        );
        assert!(
            self.node(parent).kind.is_container(),
            "insert_child target must be a container"
        );
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.insert(index, child);
    }

    fn remove_child(&mut self, parent: NodeId, index: usize) -> NodeId {
        let child = self.node_mut(parent).children.remove(index);
        self.node_mut(child).parent = None;
        child
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        debug_assert!(self.node(node).kind.is_character_data());
        self.node_mut(node).text = text.to_string();
    }

    fn splice_text(&mut self, node: NodeId, range: std::ops::Range<usize>, replacement: &str) {
        let data = self.node(node);
        let prefix: String = data.text.chars().take(range.start).collect();
        let suffix: String = data.text.chars().skip(range.end).collect();
        let mut text = prefix;
        text.push_str(replacement);
        text.push_str(&suffix);
        self.node_mut(node).text = text;
    }

    fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId {
        self.clone_rec(node, deep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (ArenaTree, NodeId, NodeId) {
        let mut tree = ArenaTree::new("doc");
        let root = tree.root();
        let para = tree.append_container(root, "p", NodeStyle::block());
        let text = tree.append_text(para, "hello world");
        (tree, para, text)
    }

    #[test]
    fn navigation_and_kinds() {
        let (tree, para, text) = sample();

        assert_eq!(tree.kind(tree.root()), NodeKind::Root);
        assert_eq!(tree.kind(para), NodeKind::Container);
        assert_eq!(tree.kind(text), NodeKind::CharacterData);
        assert_eq!(tree.parent(text), Some(para));
        assert_eq!(tree.child(para, 0), Some(text));
        assert_eq!(tree.node_index(para), 0);
        assert_eq!(tree.next_sibling(text), None);
    }

    #[test]
    fn character_offsets_are_char_indices() {
        let mut tree = ArenaTree::new("doc");
        let root = tree.root();
        let text = tree.append_text(root, "héllo wörld");

        assert_eq!(tree.text_len(text), 11);
        assert_eq!(tree.text_slice(text, 1..5), "éllo");

        tree.splice_text(text, 6..11, "earth");
        assert_eq!(tree.text_slice(text, 0..11), "héllo earth");
    }

    #[test]
    fn text_nodes_inherit_white_space_mode() {
        let mut tree = ArenaTree::new("doc");
        let root = tree.root();
        let pre = tree.append_container(
            root,
            "pre",
            NodeStyle::block().with_white_space(WhiteSpaceMode::Pre),
        );
        let text = tree.append_text(pre, "  a\nb");

        assert_eq!(tree.style(text).white_space, WhiteSpaceMode::Pre);
        assert_eq!(tree.style(text).display, DisplayRole::Inline);
    }

    #[test]
    fn remove_child_detaches_without_destroying() {
        let (mut tree, para, text) = sample();

        let removed = tree.remove_child(para, 0);
        assert_eq!(removed, text);
        assert_eq!(tree.parent(text), None);
        assert_eq!(tree.child_count(para), 0);
        // The detached node still answers queries.
        assert_eq!(tree.text_slice(text, 0..5), "hello");
    }

    #[test]
    fn deep_clone_copies_subtree() {
        let (mut tree, para, _text) = sample();

        let copy = tree.clone_node(para, true);
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.child_count(copy), 1);
        let copied_text = tree.child(copy, 0).unwrap();
        assert_eq!(tree.text_slice(copied_text, 0..11), "hello world");
    }

    #[test]
    fn handles_from_another_tree_are_not_contained() {
        let (tree_a, _, _) = sample();
        let (tree_b, para_b, _) = sample();

        assert!(!tree_a.contains(para_b));
        assert!(tree_b.contains(para_b));
    }
}
