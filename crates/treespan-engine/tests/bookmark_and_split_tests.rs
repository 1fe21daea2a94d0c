//! Saving cursors across structural edits: boundary splitting, bookmarks,
//! and character-range addressing.

use pretty_assertions::assert_eq;
use treespan_engine::{CharacterRange, Position, Range, TextSession};
use treespan_tree::{ArenaTree, ContentTree, NodeId, NodeStyle};

fn one_paragraph(text: &str) -> (ArenaTree, NodeId, NodeId) {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    let t = tree.append_text(p, text);
    (tree, p, t)
}

#[test]
fn split_boundaries_preserves_visible_text() {
    let (mut tree, _p, t) = one_paragraph("One two three");
    let mut range = Range::new(&tree);
    range.set_start_and_end(&tree, t, 4, t, 7).unwrap();
    let before = range.text(&tree).unwrap();
    assert_eq!(before, "two");

    range.split_boundaries(&mut tree, &mut []).unwrap();

    // Boundaries now sit on node edges and the covered text is unchanged.
    assert_eq!(range.start_position().offset, 0);
    assert_eq!(range.text(&tree).unwrap(), before);

    let whole = {
        let mut r = Range::new(&tree);
        r.select_node_contents(&tree, tree.root()).unwrap();
        r.text(&tree).unwrap()
    };
    assert_eq!(whole, "One two three");
}

#[test]
fn bookmark_survives_boundary_splitting() {
    let (mut tree, _p, t) = one_paragraph("One two three");
    let mut range = Range::new(&tree);
    range.set_start_and_end(&tree, t, 4, t, 7).unwrap();

    let bookmark = range.bookmark(&tree, None).unwrap();
    assert_eq!(bookmark.range, CharacterRange { start: 4, end: 7 });

    // Structural churn that keeps the visible text identical.
    let mut splitter = Range::new(&tree);
    splitter.set_start_and_end(&tree, t, 2, t, 9).unwrap();
    splitter.split_boundaries(&mut tree, &mut []).unwrap();

    let mut restored = Range::new(&tree);
    restored.move_to_bookmark(&tree, &bookmark).unwrap();
    assert_eq!(restored.text(&tree).unwrap(), "two");
}

#[test]
fn character_range_round_trip() {
    let (tree, p, t) = one_paragraph("One two three");
    let mut session = TextSession::new(&tree);

    let mut range = Range::new(&tree);
    range.set_start_and_end(&tree, t, 4, t, 7).unwrap();
    let cr = session.to_character_range(&range, p).unwrap();
    assert_eq!(cr, CharacterRange { start: 4, end: 7 });

    let restored = session.range_from_character_range(p, cr).unwrap();
    assert_eq!(restored.start_position(), Position::new(t, 4));
    assert_eq!(restored.end_position(), Position::new(t, 7));
}

#[test]
fn character_offsets_count_visible_characters_not_stored_ones() {
    // Collapsed whitespace does not inflate character offsets.
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p = tree.append_container(root, "p", NodeStyle::block());
    let t1 = tree.append_text(p, "a   b ");
    let t2 = tree.append_text(p, " c");

    let mut session = TextSession::new(&tree);
    let mut range = Range::new(&tree);
    // Selects the "b" run plus the collapsed gap around it.
    range.set_start_and_end(&tree, t1, 4, t2, 1).unwrap();
    let cr = session.to_character_range(&range, p).unwrap();

    // Visible text is "a b c": "b" sits at offsets 2..3, the selection
    // covers "b " (the trailing run collapses to one space).
    assert_eq!(session.visible_text_of_node(p).unwrap(), "a b c");
    assert_eq!(cr, CharacterRange { start: 2, end: 4 });
}

#[test]
fn bookmark_of_caret_is_collapsed() {
    let (tree, p, t) = one_paragraph("hello");
    let mut range = Range::new(&tree);
    range.set_start_and_end(&tree, t, 3, t, 3).unwrap();

    let bookmark = range.bookmark(&tree, Some(p)).unwrap();
    assert_eq!(bookmark.range, CharacterRange { start: 3, end: 3 });

    let mut restored = Range::new(&tree);
    restored.move_to_bookmark(&tree, &bookmark).unwrap();
    assert!(restored.is_collapsed());
    assert_eq!(restored.start_position(), Position::new(t, 3));
}

#[test]
fn character_offset_clamps_at_end_of_content() {
    let (tree, p, t) = one_paragraph("ab");
    let mut session = TextSession::new(&tree);
    let pos = session.position_at_character_offset(p, 99).unwrap();
    assert_eq!(pos, Position::new(t, 2));
}

#[test]
fn bookmark_outside_container_is_rejected() {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let p1 = tree.append_container(root, "p", NodeStyle::block());
    tree.append_text(p1, "one");
    let p2 = tree.append_container(root, "p", NodeStyle::block());
    let t2 = tree.append_text(p2, "two");

    let mut range = Range::new(&tree);
    range.set_start_and_end(&tree, t2, 0, t2, 3).unwrap();
    assert!(range.bookmark(&tree, Some(p1)).is_err());
}
