//! Structural diagnostics for mind maps.
//!
//! Reports invariant violations without modifying the tree. A healthy tree
//! produces no diagnostics; `TreeModel` commands keep it that way, and
//! `TreeModel::from_nodes` repairs loaded data into that state.

use crate::id::NodeId;
use crate::tree::TreeModel;
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use std::collections::HashSet;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// A single structural problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The node this diagnostic refers to, if any.
    pub node_id: Option<NodeId>,
    /// Human-readable message.
    pub message: String,
    /// Short rule identifier (e.g. "single-root", "cycle").
    pub rule: &'static str,
}

impl Diagnostic {
    fn new(node_id: Option<NodeId>, rule: &'static str, message: String) -> Self {
        Self {
            node_id,
            message,
            rule,
        }
    }
}

// ─── Public API ──────────────────────────────────────────────────────────

/// Run every structural rule and collect the findings.
#[must_use]
pub fn check_tree(tree: &TreeModel) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    check_single_root(tree, &mut diags);
    check_links(tree, &mut diags);
    check_acyclic(tree, &mut diags);
    check_reachable(tree, &mut diags);
    check_positions(tree, &mut diags);
    diags.sort_by(|a, b| a.rule.cmp(b.rule).then(a.node_id.cmp(&b.node_id)));
    diags
}

// ─── Rules ───────────────────────────────────────────────────────────────

fn check_single_root(tree: &TreeModel, diags: &mut Vec<Diagnostic>) {
    if tree.is_empty() {
        return;
    }
    let roots: Vec<NodeId> = tree.nodes().filter(|n| n.is_root).map(|n| n.id).collect();
    match roots.len() {
        0 => diags.push(Diagnostic::new(
            None,
            "single-root",
            "map has nodes but no root".into(),
        )),
        1 => {
            if tree.root() != Some(roots[0]) {
                diags.push(Diagnostic::new(
                    Some(roots[0]),
                    "single-root",
                    "root flag disagrees with the model's root handle".into(),
                ));
            }
        }
        n => {
            for id in roots {
                diags.push(Diagnostic::new(
                    Some(id),
                    "single-root",
                    format!("one of {n} nodes flagged as root"),
                ));
            }
        }
    }
}

fn check_links(tree: &TreeModel, diags: &mut Vec<Diagnostic>) {
    for node in tree.nodes() {
        match node.parent {
            None if !node.is_root => diags.push(Diagnostic::new(
                Some(node.id),
                "parent-link",
                "non-root node has no parent".into(),
            )),
            Some(_) if node.is_root => diags.push(Diagnostic::new(
                Some(node.id),
                "parent-link",
                "root node has a parent".into(),
            )),
            Some(p) => match tree.get(p) {
                None => diags.push(Diagnostic::new(
                    Some(node.id),
                    "parent-link",
                    format!("parent {p} does not exist"),
                )),
                Some(parent) => {
                    let listed = parent.children.iter().filter(|c| **c == node.id).count();
                    if listed != 1 {
                        diags.push(Diagnostic::new(
                            Some(node.id),
                            "parent-link",
                            format!("listed {listed} times under parent {p}"),
                        ));
                    }
                }
            },
            None => {}
        }

        let mut seen = HashSet::new();
        for child in &node.children {
            if !seen.insert(*child) {
                continue;
            }
            match tree.get(*child) {
                None => diags.push(Diagnostic::new(
                    Some(node.id),
                    "child-link",
                    format!("child {child} does not exist"),
                )),
                Some(c) if c.parent != Some(node.id) => diags.push(Diagnostic::new(
                    Some(node.id),
                    "child-link",
                    format!("child {child} names a different parent"),
                )),
                Some(_) => {}
            }
        }
    }
}

fn check_acyclic(tree: &TreeModel, diags: &mut Vec<Diagnostic>) {
    let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::new();
    for node in tree.nodes() {
        graph.add_node(node.id);
        if let Some(p) = node.parent {
            graph.add_edge(p, node.id, ());
        }
    }
    if is_cyclic_directed(&graph) {
        diags.push(Diagnostic::new(
            None,
            "acyclic",
            "parent links form a cycle".into(),
        ));
    }
}

fn check_reachable(tree: &TreeModel, diags: &mut Vec<Diagnostic>) {
    let reachable: HashSet<NodeId> = tree.pre_order().into_iter().collect();
    for node in tree.nodes() {
        if !reachable.contains(&node.id) {
            diags.push(Diagnostic::new(
                Some(node.id),
                "reachable",
                "node cannot be reached from the root".into(),
            ));
        }
    }
}

fn check_positions(tree: &TreeModel, diags: &mut Vec<Diagnostic>) {
    for node in tree.nodes() {
        if !node.position.is_finite() {
            diags.push(Diagnostic::new(
                Some(node.id),
                "finite-position",
                format!("position {:?} is not finite", node.position),
            ));
        }
    }
}
