//! Emitter: mind map → indented outline text.
//!
//! ```text
//! - [ ] Launch plan #blue
//!   - [x] Hire designer #green
//!   - [ ] Write copy #red
//! ```
//!
//! Two spaces per level, pre-order, children in stored order. The output
//! parses back through `parse_outline` with titles, completion flags,
//! color tags and child order intact.

use crate::id::NodeId;
use crate::model::Node;
use crate::snapshot::Snapshot;
use crate::tree::TreeModel;
use std::collections::HashMap;
use std::fmt::Write;

/// Emit a live tree as outline text.
#[must_use]
pub fn emit_outline(tree: &TreeModel) -> String {
    let depths = tree.depths();
    let mut out = String::with_capacity(tree.len() * 32);
    for id in tree.pre_order() {
        if let Some(node) = tree.get(id) {
            emit_item(&mut out, node, depths.get(&id).copied().unwrap_or(0));
        }
    }
    out
}

/// Emit a frozen snapshot as outline text.
#[must_use]
pub fn emit_snapshot_outline(snapshot: &Snapshot) -> String {
    // Snapshot nodes are in pre-order, so parents are seen before children.
    let mut depths: HashMap<NodeId, usize> = HashMap::with_capacity(snapshot.nodes().len());
    let mut out = String::with_capacity(snapshot.nodes().len() * 32);
    let _ = writeln!(out, "# {}", one_line(snapshot.title()));
    for node in snapshot.nodes() {
        let depth = node
            .parent
            .and_then(|p| depths.get(&p))
            .map_or(0, |d| d + 1);
        depths.insert(node.id, depth);
        emit_item(&mut out, node, depth);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn emit_item(out: &mut String, node: &Node, depth: usize) {
    indent(out, depth);
    let mark = if node.completed { 'x' } else { ' ' };
    let _ = write!(out, "- [{mark}] {}", one_line(&node.title));
    let tag: String = node
        .color_tag
        .as_str()
        .chars()
        .filter(|c| is_tag_char(*c))
        .collect();
    if !tag.is_empty() {
        let _ = write!(out, " #{tag}");
    }
    out.push('\n');
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
