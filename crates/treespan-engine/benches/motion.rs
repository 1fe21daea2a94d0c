use criterion::{Criterion, criterion_group, criterion_main};
use treespan_engine::{
    FindOptions, MotionOptions, Range, SearchTerm, TextSession, Unit, compare_positions,
};
use treespan_tree::{ArenaTree, ContentTree, NodeId, NodeStyle};

/// A document of `paragraphs` blocks, each holding a few text runs and an
/// inline span, wide enough to exercise the position caches.
fn generate_tree(paragraphs: usize) -> (ArenaTree, Vec<NodeId>) {
    let mut tree = ArenaTree::new("doc");
    let root = tree.root();
    let mut texts = Vec::new();
    for i in 0..paragraphs {
        let p = tree.append_container(root, "p", NodeStyle::block());
        texts.push(tree.append_text(p, &format!("paragraph {i} opens with words ")));
        let em = tree.append_container(p, "em", NodeStyle::inline());
        texts.push(tree.append_text(em, "emphasised middle"));
        texts.push(tree.append_text(p, " and then trails off here"));
    }
    (tree, texts)
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");
    let (tree, texts) = generate_tree(100);
    let a = treespan_engine::Position::new(texts[3], 2);
    let b = treespan_engine::Position::new(texts[250], 5);

    group.bench_function("compare_positions", |bench| {
        bench.iter(|| {
            let ord = compare_positions(
                &tree,
                std::hint::black_box(a),
                std::hint::black_box(b),
            )
            .unwrap();
            std::hint::black_box(ord);
        });
    });
    group.finish();
}

fn bench_visible_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("visible_text");
    group.sample_size(10);
    let (tree, _) = generate_tree(100);

    group.bench_function("whole_tree", |bench| {
        bench.iter(|| {
            let mut range = Range::new(&tree);
            range.select_node_contents(&tree, tree.root()).unwrap();
            let text = range.text(&tree).unwrap();
            std::hint::black_box(text);
        });
    });
    group.finish();
}

fn bench_motion_and_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion");
    group.sample_size(10);
    let (tree, texts) = generate_tree(100);

    group.bench_function("move_50_words", |bench| {
        bench.iter(|| {
            let mut session = TextSession::new(&tree);
            let pos = session.position(texts[0], 0).unwrap();
            let moved = session
                .move_position_by(pos, Unit::Word, 50, &MotionOptions::default())
                .unwrap();
            std::hint::black_box(moved);
        });
    });

    group.bench_function("find_text_deep", |bench| {
        bench.iter(|| {
            let mut session = TextSession::new(&tree);
            let mut range = Range::new(&tree);
            let found = session
                .find_text(
                    &mut range,
                    &SearchTerm::Literal("paragraph 87".into()),
                    &FindOptions::default(),
                )
                .unwrap();
            std::hint::black_box(found);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compare,
    bench_visible_text,
    bench_motion_and_search
);
criterion_main!(benches);
