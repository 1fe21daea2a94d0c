//! Visible-text extraction: whitespace collapsing, block boundaries, forced
//! breaks, hidden subtrees.

use pretty_assertions::assert_eq;
use treespan_engine::{CharacterOptions, Range, TextSession};
use treespan_tree::{ArenaTree, ContentTree, NodeStyle, WhiteSpaceMode};

fn root_text(tree: &ArenaTree) -> String {
    let mut range = Range::new(tree);
    range.select_node_contents(tree, tree.root()).unwrap();
    range.text(tree).unwrap()
}

#[test]
fn collapses_space_runs_in_normal_mode() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p, "a  \t b");

    assert_eq!(root_text(&tree), "a b");
}

#[test]
fn drops_leading_and_trailing_collapsible_space() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p, "  padded  ");

    assert_eq!(root_text(&tree), "padded");
}

#[test]
fn single_collapsed_space_across_inline_boundary() {
    // paragraph("One ", bold("two"), " three"): the trailing space of the
    // first run and the inter-node boundary must be the same single space.
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    let one = tree.append_text(p, "One ");
    let bold = tree.append_container(p, "b", NodeStyle::inline());
    let two = tree.append_text(bold, "two");
    tree.append_text(p, " three");

    assert_eq!(root_text(&tree), "One two three");

    // The same collapsed space is reported whether the point query is made
    // from the text run or from the boundary positions around it.
    let mut session = TextSession::new(&tree);
    let opts = CharacterOptions::default();
    let after_space = session.position(one, 4).unwrap();
    let at_bold = session.position(bold, 0).unwrap();
    let in_two = session.position(two, 0).unwrap();
    assert_eq!(session.char_before(after_space, opts).unwrap(), Some(' '));
    assert_eq!(session.char_before(at_bold, opts).unwrap(), Some(' '));
    assert_eq!(session.char_before(in_two, opts).unwrap(), Some(' '));
}

#[test]
fn block_boundaries_become_single_newlines() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p1 = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p1, "alpha");
    let p2 = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p2, "beta");

    assert_eq!(root_text(&tree), "alpha\nbeta");
}

#[test]
fn nested_block_closes_collapse_to_one_newline() {
    // outer(inner("a")), sibling("b"): closing two blocks still yields a
    // single break between "a" and "b".
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let outer = tree.append_container(root, "div", NodeStyle::block());
    let inner = tree.append_container(outer, "div", NodeStyle::block());
    tree.append_text(inner, "a");
    let sibling = tree.append_container(root, "div", NodeStyle::block());
    tree.append_text(sibling, "b");

    assert_eq!(root_text(&tree), "a\nb");
}

#[test]
fn inline_text_then_block_gets_a_break() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    tree.append_text(root, "x");
    let div = tree.append_container(root, "div", NodeStyle::block());
    tree.append_text(div, "a");

    assert_eq!(root_text(&tree), "x\na");
}

#[test]
fn empty_blocks_contribute_nothing() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    tree.append_text(root, "x");
    tree.append_container(root, "div", NodeStyle::block());
    tree.append_text(root, "y");

    assert_eq!(root_text(&tree), "xy");
}

#[test]
fn whitespace_only_text_between_blocks_disappears() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p1 = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p1, "a");
    tree.append_text(root, "\n  ");
    let p2 = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p2, "b");

    assert_eq!(root_text(&tree), "a\nb");
}

#[test]
fn pre_preserves_literal_whitespace_while_normal_collapses() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p, "a  b\n");
    let pre = tree.append_container(
        root,
        "pre",
        NodeStyle::block().with_white_space(WhiteSpaceMode::Pre),
    );
    tree.append_text(pre, "x\n y");

    assert_eq!(root_text(&tree), "a b\nx\n y");
}

#[test]
fn pre_line_preserves_newlines_but_collapses_spaces() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(
        root,
        "p",
        NodeStyle::block().with_white_space(WhiteSpaceMode::PreLine),
    );
    tree.append_text(p, "c \nd");

    assert_eq!(root_text(&tree), "c\nd");
}

#[test]
fn pre_line_trailing_space_option_keeps_the_space() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(
        root,
        "p",
        NodeStyle::block().with_white_space(WhiteSpaceMode::PreLine),
    );
    let text = tree.append_text(p, "c \nd");

    let opts = CharacterOptions {
        include_pre_line_trailing_space: true,
        ..CharacterOptions::default()
    };
    let mut session = TextSession::new(&tree);
    let pos = session.position(text, 2).unwrap();
    assert_eq!(session.char_before(pos, opts).unwrap(), Some(' '));
    let pos = session.position(text, 2).unwrap();
    assert_eq!(
        session
            .char_before(pos, CharacterOptions::default())
            .unwrap(),
        Some('c'),
        "without the option the trailing space collapses away"
    );
}

#[test]
fn forced_line_breaks_always_render() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p, "x");
    tree.append_line_break(p);
    tree.append_text(p, "y");

    assert_eq!(root_text(&tree), "x\ny");
}

#[test]
fn space_before_br_is_option_gated() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    let text = tree.append_text(p, "x ");
    tree.append_line_break(p);
    tree.append_text(p, "y");

    assert_eq!(root_text(&tree), "x\ny");

    let mut session = TextSession::new(&tree);
    let pos = session.position(text, 2).unwrap();
    let opts = CharacterOptions {
        include_space_before_br: true,
        ..CharacterOptions::default()
    };
    assert_eq!(session.char_before(pos, opts).unwrap(), Some(' '));
}

#[test]
fn block_content_trailing_space_is_option_gated() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    let text = tree.append_text(p, "end ");

    let mut session = TextSession::new(&tree);
    let pos = session.position(text, 4).unwrap();
    assert_eq!(
        session
            .char_before(pos, CharacterOptions::default())
            .unwrap(),
        Some('d')
    );
    let opts = CharacterOptions {
        include_block_content_trailing_space: true,
        ..CharacterOptions::default()
    };
    assert_eq!(session.char_before(pos, opts).unwrap(), Some(' '));
}

#[test]
fn table_cells_are_separated_by_tabs() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let row = tree.append_container(root, "row", NodeStyle::block());
    let c1 = tree.append_container(row, "cell", NodeStyle::table_cell());
    tree.append_text(c1, "a");
    let c2 = tree.append_container(row, "cell", NodeStyle::table_cell());
    tree.append_text(c2, "b");

    assert_eq!(root_text(&tree), "a\tb");
}

#[test]
fn hidden_subtrees_are_skipped_wholesale() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p, "a");
    let hidden = tree.append_container(p, "span", NodeStyle::hidden());
    tree.append_text(hidden, "ZZZ");
    tree.append_text(p, "b");

    assert_eq!(root_text(&tree), "ab");
}

#[test]
fn range_text_respects_boundaries_inside_text_runs() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    let one = tree.append_text(p, "One ");
    let bold = tree.append_container(p, "b", NodeStyle::inline());
    let two = tree.append_text(bold, "two");
    tree.append_text(p, " three");

    let mut range = Range::new(&tree);
    range.set_start_and_end(&tree, one, 4, two, 2).unwrap();
    assert_eq!(range.text(&tree).unwrap(), "tw");

    range.set_start_and_end(&tree, one, 3, two, 3).unwrap();
    assert_eq!(range.text(&tree).unwrap(), " two");
}

#[test]
fn visible_text_of_node_reads_one_subtree() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p1 = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p1, "only  this");
    let p2 = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p2, "not this");

    let mut session = TextSession::new(&tree);
    assert_eq!(session.visible_text_of_node(p1).unwrap(), "only this");
}
