//! Integration tests: outline text → tree → outline text.

use mm_core::model::Canvas;
use mm_core::snapshot::{Snapshot, Transform};
use mm_core::tree::TreeModel;
use mm_core::{check_tree, emit_outline, emit_snapshot_outline, parse_outline};
use pretty_assertions::assert_eq;

const JOB_SEARCH: &str = include_str!("fixtures/job_search.outline");

fn titles(tree: &TreeModel) -> Vec<String> {
    tree.pre_order()
        .into_iter()
        .filter_map(|id| tree.get(id).map(|n| n.title.clone()))
        .collect()
}

#[test]
fn fixture_parses_into_valid_tree() {
    let tree = parse_outline(JOB_SEARCH, Canvas::default()).unwrap();
    assert!(check_tree(&tree).is_empty());
    assert_eq!(tree.len(), 9);
    assert_eq!(tree.depth(), 2);
    assert_eq!(tree.leaf_count(), 6);

    let root = tree.root_node().unwrap();
    assert_eq!(root.title, "Land a backend role");
    assert_eq!(root.color_tag.as_str(), "purple");
}

#[test]
fn emit_then_parse_keeps_content_and_order() {
    let tree = parse_outline(JOB_SEARCH, Canvas::default()).unwrap();
    let text = emit_outline(&tree);
    let again = parse_outline(&text, Canvas::default()).unwrap();

    assert_eq!(titles(&again), titles(&tree));
    assert_eq!(emit_outline(&again), text);

    let done: Vec<String> = again
        .nodes()
        .filter(|n| n.completed)
        .map(|n| n.title.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    assert_eq!(done, vec!["Initech", "Rewrite summary", "Update resume"]);
}

#[test]
fn snapshot_outline_parses_back() {
    let tree = parse_outline(JOB_SEARCH, Canvas::default()).unwrap();
    let snap = Snapshot::capture(&tree, "Job search 2026", Transform::default());
    let text = emit_snapshot_outline(&snap);
    assert!(text.starts_with("# Job search 2026\n"));

    let again = parse_outline(&text, Canvas::default()).unwrap();
    assert_eq!(titles(&again), titles(&tree));
}
