//! Structural serialization of positions and ranges.
//!
//! A position serializes as the `/`-joined sibling indices leading from a
//! designated root down to its node, suffixed with `:offset`. A range is two
//! such positions joined by `,`, optionally followed by `{checksum}`: a
//! CRC32 over the root subtree's shape (kind, name, child count, pre-order).
//! Deserialization refuses to trust indices against a tree whose shape has
//! drifted: that is a [`EngineError::ChecksumMismatch`], never a silently
//! wrong position.

use treespan_tree::{ContentTree, NodeKind};

use crate::error::{EngineError, Result};
use crate::position::{Position, compare_positions, validate_position};
use crate::range::Range;

pub fn serialize_position<T: ContentTree>(
    tree: &T,
    pos: Position<T::NodeId>,
    root: T::NodeId,
) -> Result<String> {
    validate_position(tree, pos)?;
    if !tree.contains(root) {
        return Err(EngineError::WrongDocument);
    }
    let mut indices = Vec::new();
    let mut current = pos.node;
    while current != root {
        let parent = tree
            .parent(current)
            .ok_or_else(|| EngineError::usage("position is not under the serialization root"))?;
        indices.push(tree.node_index(current));
        current = parent;
    }
    indices.reverse();
    let path = indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/");
    Ok(format!("{path}:{}", pos.offset))
}

pub fn deserialize_position<T: ContentTree>(
    tree: &T,
    serialized: &str,
    root: T::NodeId,
) -> Result<Position<T::NodeId>> {
    let (path, offset) = serialized
        .rsplit_once(':')
        .ok_or_else(|| EngineError::usage("malformed serialized position"))?;
    let offset: usize = offset
        .parse()
        .map_err(|_| EngineError::usage("malformed serialized position offset"))?;

    let mut node = root;
    if !path.is_empty() {
        for segment in path.split('/') {
            let index: usize = segment
                .parse()
                .map_err(|_| EngineError::usage("malformed serialized position path"))?;
            node = tree
                .child(node, index)
                .ok_or_else(|| EngineError::usage("serialized path does not match the tree"))?;
        }
    }
    let pos = Position::new(node, offset);
    validate_position(tree, pos)?;
    Ok(pos)
}

/// CRC32 over the pre-order kind/name/child-count sequence of a subtree.
pub fn shape_checksum<T: ContentTree>(tree: &T, root: T::NodeId) -> u32 {
    fn walk<T: ContentTree>(tree: &T, node: T::NodeId, hasher: &mut crc32fast::Hasher) {
        let tag = match tree.kind(node) {
            NodeKind::CharacterData => b'c',
            NodeKind::Container => b'e',
            NodeKind::Root => b'r',
        };
        hasher.update(&[tag]);
        hasher.update(tree.name(node).as_bytes());
        let count = tree.child_count(node);
        hasher.update(&(count as u32).to_le_bytes());
        for i in 0..count {
            if let Some(child) = tree.child(node, i) {
                walk(tree, child, hasher);
            }
        }
    }
    let mut hasher = crc32fast::Hasher::new();
    walk(tree, root, &mut hasher);
    hasher.finalize()
}

pub fn serialize_range<T: ContentTree>(
    tree: &T,
    range: &Range<T::NodeId>,
    root: Option<T::NodeId>,
    omit_checksum: bool,
) -> Result<String> {
    range.ensure_usable()?;
    let root = root.unwrap_or_else(|| tree.root());
    let start = serialize_position(tree, range.start_position(), root)?;
    let end = serialize_position(tree, range.end_position(), root)?;
    if omit_checksum {
        Ok(format!("{start},{end}"))
    } else {
        Ok(format!(
            "{start},{end}{{{:08x}}}",
            shape_checksum(tree, root)
        ))
    }
}

fn parse_serialized_range(serialized: &str) -> Result<(&str, &str, Option<u32>)> {
    let (body, checksum) = match serialized.rfind('{') {
        Some(brace) => {
            let checksum = serialized[brace + 1..]
                .strip_suffix('}')
                .ok_or_else(|| EngineError::usage("malformed serialized range checksum"))?;
            let checksum = u32::from_str_radix(checksum, 16)
                .map_err(|_| EngineError::usage("malformed serialized range checksum"))?;
            (&serialized[..brace], Some(checksum))
        }
        None => (serialized, None),
    };
    let (start, end) = body
        .split_once(',')
        .ok_or_else(|| EngineError::usage("malformed serialized range"))?;
    Ok((start, end, checksum))
}

/// Whether a serialized range can be trusted against the current tree:
/// parseable, and carrying no checksum or a matching one.
pub fn can_deserialize_range<T: ContentTree>(
    tree: &T,
    serialized: &str,
    root: Option<T::NodeId>,
) -> bool {
    let root = root.unwrap_or_else(|| tree.root());
    match parse_serialized_range(serialized) {
        Ok((_, _, Some(stored))) => stored == shape_checksum(tree, root),
        Ok((_, _, None)) => true,
        Err(_) => false,
    }
}

pub fn deserialize_range<T: ContentTree>(
    tree: &T,
    serialized: &str,
    root: Option<T::NodeId>,
) -> Result<Range<T::NodeId>> {
    let root = root.unwrap_or_else(|| tree.root());
    let (start, end, checksum) = parse_serialized_range(serialized)?;
    if let Some(stored) = checksum {
        let computed = shape_checksum(tree, root);
        if stored != computed {
            return Err(EngineError::ChecksumMismatch { stored, computed });
        }
    }
    let start = deserialize_position(tree, start, root)?;
    let end = deserialize_position(tree, end, root)?;
    if compare_positions(tree, start, end)? == std::cmp::Ordering::Greater {
        return Err(EngineError::usage("serialized range is inverted"));
    }
    Ok(Range::from_positions(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use treespan_tree::{ArenaTree, ContentTree, NodeId, NodeStyle};

    // doc > p("alpha", em("beta")), p("gamma")
    fn fixture() -> (ArenaTree, [NodeId; 6]) {
        let mut tree = ArenaTree::new("doc");
        let root = tree.root();
        let p1 = tree.append_container(root, "p", NodeStyle::block());
        let alpha = tree.append_text(p1, "alpha");
        let em = tree.append_container(p1, "em", NodeStyle::inline());
        let beta = tree.append_text(em, "beta");
        let p2 = tree.append_container(root, "p", NodeStyle::block());
        let gamma = tree.append_text(p2, "gamma");
        (tree, [p1, alpha, em, beta, p2, gamma])
    }

    #[test]
    fn position_round_trip() {
        let (tree, [_, _, _, beta, ..]) = fixture();
        let root = tree.root();
        let pos = Position::new(beta, 2);

        let s = serialize_position(&tree, pos, root).unwrap();
        assert_eq!(s, "0/1/0:2");
        assert_eq!(deserialize_position(&tree, &s, root).unwrap(), pos);
    }

    #[test]
    fn root_position_serializes_with_empty_path() {
        let (tree, _) = fixture();
        let root = tree.root();
        let pos = Position::new(root, 1);

        let s = serialize_position(&tree, pos, root).unwrap();
        assert_eq!(s, ":1");
        assert_eq!(deserialize_position(&tree, &s, root).unwrap(), pos);
    }

    #[test]
    fn collapsed_range_round_trip() {
        let (tree, [_, alpha, ..]) = fixture();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 3, alpha, 3).unwrap();

        let s = serialize_range(&tree, &range, None, false).unwrap();
        let restored = deserialize_range(&tree, &s, None).unwrap();
        assert_eq!(restored.start_position(), range.start_position());
        assert_eq!(restored.end_position(), range.end_position());
        assert!(restored.is_collapsed());
    }

    #[test]
    fn sibling_text_run_range_round_trip() {
        // Spans from the first paragraph's text run into the second's.
        let (tree, [_, alpha, _, _, _, gamma]) = fixture();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 1, gamma, 4).unwrap();

        let s = serialize_range(&tree, &range, None, false).unwrap();
        let restored = deserialize_range(&tree, &s, None).unwrap();
        assert_eq!(restored.start_position(), range.start_position());
        assert_eq!(restored.end_position(), range.end_position());
    }

    #[test]
    fn nested_container_range_round_trip() {
        let (tree, [p1, _, _, beta, p2, _]) = fixture();
        let _ = (p1, p2);
        let mut range = Range::new(&tree);
        let root = tree.root();
        range.set_start_and_end(&tree, beta, 0, root, 2).unwrap();

        let s = serialize_range(&tree, &range, None, false).unwrap();
        let restored = deserialize_range(&tree, &s, None).unwrap();
        assert_eq!(restored.start_position(), range.start_position());
        assert_eq!(restored.end_position(), range.end_position());
    }

    #[test]
    fn checksum_detects_shape_drift() {
        let (mut tree, [_, alpha, ..]) = fixture();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 0, alpha, 5).unwrap();
        let s = serialize_range(&tree, &range, None, false).unwrap();

        assert!(can_deserialize_range(&tree, &s, None));

        // Structural drift: a new container changes the shape sequence.
        let root = tree.root();
        tree.append_container(root, "p", NodeStyle::block());

        assert!(!can_deserialize_range(&tree, &s, None));
        let err = deserialize_range(&tree, &s, None).unwrap_err();
        assert!(matches!(err, EngineError::ChecksumMismatch { .. }));
    }

    #[test]
    fn omitted_checksum_is_trusted() {
        let (mut tree, [_, alpha, ..]) = fixture();
        let mut range = Range::new(&tree);
        range.set_start_and_end(&tree, alpha, 0, alpha, 5).unwrap();
        let s = serialize_range(&tree, &range, None, true).unwrap();
        assert!(!s.contains('{'));

        let root = tree.root();
        tree.append_container(root, "p", NodeStyle::block());

        // Without a checksum there is nothing to refuse on.
        assert!(can_deserialize_range(&tree, &s, None));
        assert!(deserialize_range(&tree, &s, None).is_ok());
    }

    #[test]
    fn text_edits_do_not_change_the_shape() {
        let (mut tree, [_, alpha, ..]) = fixture();
        let before = shape_checksum(&tree, tree.root());
        tree.splice_text(alpha, 0..2, "AL");
        assert_eq!(shape_checksum(&tree, tree.root()), before);
    }

    #[test]
    fn malformed_inputs_are_usage_errors() {
        let (tree, _) = fixture();
        let root = tree.root();
        for bad in ["", "0/1", "x:1", "0:y", "0:1,"] {
            let err = match bad.contains(',') {
                true => deserialize_range(&tree, bad, None).unwrap_err(),
                false => deserialize_position(&tree, bad, root).unwrap_err(),
            };
            assert!(
                matches!(err, EngineError::Usage(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn stale_path_into_missing_child_fails_cleanly() {
        let (tree, _) = fixture();
        let root = tree.root();
        assert!(matches!(
            deserialize_position(&tree, "5/0:0", root),
            Err(EngineError::Usage(_))
        ));
        assert!(matches!(
            deserialize_position(&tree, "0/0:99", root),
            Err(EngineError::IndexSize { .. })
        ));
    }
}
