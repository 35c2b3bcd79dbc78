//! Auto-arrange: a one-shot top-down tree layout.
//!
//! Leaves are laid out left to right at a uniform spacing, every internal
//! node sits at the midpoint of its first and last child, and each tree
//! level gets its own row. Spacing shrinks (down to a floor) when the tree
//! would overflow the canvas, and the finished layout is translated so its
//! bounding box is centered on the canvas.

use crate::id::NodeId;
use crate::model::*;
use crate::tree::TreeModel;
use serde::Deserialize;
use std::collections::HashMap;

/// Spacing policy for `arrange`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal distance between adjacent leaves before scaling.
    pub base_spacing: f32,
    /// Leaves are never packed closer than this.
    pub min_spacing: f32,
    /// Share of the canvas width the leaf row may occupy.
    pub width_fraction: f32,
    /// Vertical distance between levels before scaling.
    pub base_level_gap: f32,
    pub min_level_gap: f32,
    pub height_fraction: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            base_spacing: 260.0,
            min_spacing: 160.0,
            width_fraction: 0.85,
            base_level_gap: 180.0,
            min_level_gap: 110.0,
            height_fraction: 0.85,
        }
    }
}

/// Output of `arrange`: a position for every reachable node plus the
/// spacing that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrangement {
    /// Positions in pre-order.
    pub positions: Vec<(NodeId, Point)>,
    pub node_spacing: f32,
    pub level_gap: f32,
    pub leaf_count: usize,
    pub depth: usize,
}

impl Arrangement {
    pub fn position_of(&self, id: NodeId) -> Option<Point> {
        self.positions
            .iter()
            .find_map(|(n, p)| (*n == id).then_some(*p))
    }

    pub fn to_map(&self) -> HashMap<NodeId, Point> {
        self.positions.iter().copied().collect()
    }
}

/// Spacing along one axis: `base`, shrunk so `steps × spacing` fits inside
/// `fraction × extent`, but never below `floor`.
fn scaled_spacing(steps: usize, base: f32, floor: f32, extent: f32, fraction: f32) -> f32 {
    if steps == 0 {
        return base;
    }
    let needed = steps as f32 * base;
    let available = extent * fraction;
    if needed > available {
        (available / steps as f32).max(floor)
    } else {
        base
    }
}

/// Compute a fresh position for every node reachable from the root.
///
/// Deterministic for a given tree shape and child order; running it again
/// on its own output reproduces the same positions.
#[must_use]
pub fn arrange(tree: &TreeModel, canvas: Canvas, config: &LayoutConfig) -> Arrangement {
    let order = tree.pre_order();
    let depths = tree.depths();
    let leaf_count = order
        .iter()
        .filter(|id| tree.children(**id).is_empty())
        .count();
    let depth = depths.values().copied().max().unwrap_or(0);

    let node_spacing = scaled_spacing(
        leaf_count.saturating_sub(1),
        config.base_spacing,
        config.min_spacing,
        canvas.width,
        config.width_fraction,
    );
    let level_gap = scaled_spacing(
        depth,
        config.base_level_gap,
        config.min_level_gap,
        canvas.height,
        config.height_fraction,
    );

    let xs = assign_x(tree, node_spacing);

    let raw: Vec<(NodeId, Point)> = order
        .iter()
        .map(|id| {
            let x = xs.get(id).copied().unwrap_or(0.0);
            let y = depths.get(id).copied().unwrap_or(0) as f32 * level_gap;
            (*id, Point::new(x, y))
        })
        .collect();

    let positions = match Bounds::of_points(raw.iter().map(|(_, p)| *p)) {
        Some(bounds) => {
            let from = bounds.center();
            let to = canvas.center();
            let (dx, dy) = (to.x - from.x, to.y - from.y);
            raw.into_iter()
                .map(|(id, p)| (id, p.offset(dx, dy)))
                .collect()
        }
        None => raw,
    };

    log::info!(
        "arranged {} nodes: {leaf_count} leaves, depth {depth}, spacing {node_spacing}, level gap {level_gap}",
        positions.len()
    );

    Arrangement {
        positions,
        node_spacing,
        level_gap,
        leaf_count,
        depth,
    }
}

/// Post-order x assignment with a running leaf cursor.
///
/// Walks with an explicit stack: each node is pushed once to expand its
/// children and once more to be placed after they are done.
fn assign_x(tree: &TreeModel, spacing: f32) -> HashMap<NodeId, f32> {
    let mut xs: HashMap<NodeId, f32> = HashMap::with_capacity(tree.len());
    let Some(root) = tree.root() else {
        return xs;
    };

    let mut cursor = 0.0f32;
    let mut expanded = std::collections::HashSet::with_capacity(tree.len());
    let mut stack: Vec<(NodeId, bool)> = vec![(root, false)];

    while let Some((id, children_done)) = stack.pop() {
        if children_done {
            let placed: Vec<f32> = tree
                .children(id)
                .iter()
                .filter_map(|c| xs.get(c).copied())
                .collect();
            let x = match (placed.first(), placed.last()) {
                (Some(first), Some(last)) => (first + last) / 2.0,
                _ => {
                    cursor += spacing;
                    cursor
                }
            };
            xs.insert(id, x);
            continue;
        }
        if !expanded.insert(id) {
            continue;
        }
        stack.push((id, true));
        for child in tree.children(id).iter().rev() {
            stack.push((*child, false));
        }
    }
    xs
}
