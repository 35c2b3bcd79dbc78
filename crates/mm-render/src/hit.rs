//! Hit testing: canvas point → node lookup.
//!
//! Nodes are painted in pre-order, so the last painted node is on top.
//! Walking pre-order in reverse finds the topmost node at a point.

use kurbo::{Rect, RoundedRect, Shape};
use mm_core::id::NodeId;
use mm_core::model::Point;
use mm_core::tree::TreeModel;

/// Node card size in canvas units; positions are card centers.
pub const NODE_WIDTH: f64 = 140.0;
pub const NODE_HEIGHT: f64 = 56.0;
pub const CORNER_RADIUS: f64 = 12.0;

/// Card rectangle for a node centered at `center`.
#[must_use]
pub fn node_rect(center: Point) -> Rect {
    Rect::from_center_size(
        (f64::from(center.x), f64::from(center.y)),
        (NODE_WIDTH, NODE_HEIGHT),
    )
}

/// Rounded card outline, as painted.
#[must_use]
pub fn node_shape(center: Point) -> RoundedRect {
    node_rect(center).to_rounded_rect(CORNER_RADIUS)
}

/// Find the topmost node whose card contains the canvas point `at`.
/// Returns `None` for the empty canvas.
pub fn hit_test(tree: &TreeModel, at: Point) -> Option<NodeId> {
    let probe = kurbo::Point::new(f64::from(at.x), f64::from(at.y));
    let hit = tree.pre_order().into_iter().rev().find(|id| {
        tree.get(*id)
            .is_some_and(|node| node_shape(node.position).contains(probe))
    });
    log::trace!("hit_test ({}, {}) → {hit:?}", at.x, at.y);
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::model::Canvas;
    use pretty_assertions::assert_eq;

    #[test]
    fn hits_node_card() {
        let mut tree = TreeModel::new(Canvas::default());
        let root = tree.ensure_root();
        let center = tree.get(root).unwrap().position;

        assert_eq!(hit_test(&tree, center), Some(root));
        assert_eq!(hit_test(&tree, center.offset(60.0, 20.0)), Some(root));
        assert_eq!(hit_test(&tree, center.offset(0.0, 40.0)), None);
    }

    #[test]
    fn rounded_corner_is_not_a_hit() {
        let mut tree = TreeModel::new(Canvas::default());
        let root = tree.ensure_root();
        let center = tree.get(root).unwrap().position;
        // Just inside the bounding rect, outside the corner arc.
        let corner = center.offset(69.5, 27.5);
        assert_eq!(hit_test(&tree, corner), None);
    }

    #[test]
    fn topmost_node_wins_on_overlap() {
        let mut tree = TreeModel::new(Canvas::default());
        let root = tree.ensure_root();
        let child = tree.add_child(root).unwrap();
        let center = tree.get(root).unwrap().position;
        tree.move_to(child, center.offset(30.0, 0.0));

        assert_eq!(hit_test(&tree, center.offset(20.0, 0.0)), Some(child));
        assert_eq!(hit_test(&tree, center.offset(-60.0, 0.0)), Some(root));
    }

    #[test]
    fn empty_tree_never_hits() {
        let tree = TreeModel::new(Canvas::default());
        assert_eq!(hit_test(&tree, Point::new(1500.0, 1000.0)), None);
    }
}
