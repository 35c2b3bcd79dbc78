//! SVG rendering of a frozen snapshot.
//!
//! Output is in canvas coordinates with a padded `viewBox` around every
//! node card. Edges are cubic Béziers from parent to child, painted
//! before nodes so cards cover edge ends.

use crate::hit::{CORNER_RADIUS, NODE_HEIGHT, NODE_WIDTH, node_rect};
use kurbo::{BezPath, Rect};
use mm_core::id::NodeId;
use mm_core::model::{Node, Point};
use mm_core::snapshot::Snapshot;
use std::collections::HashMap;
use std::fmt::Write;

const PAD: f64 = 32.0;
const FONT_SIZE: f64 = 15.0;

/// Fill and stroke for a color tag. Unknown tags render gray.
fn palette(tag: &str) -> (&'static str, &'static str) {
    match tag {
        "blue" => ("#DBEAFE", "#2563EB"),
        "green" => ("#DCFCE7", "#16A34A"),
        "red" => ("#FEE2E2", "#DC2626"),
        "orange" => ("#FFEDD5", "#EA580C"),
        "yellow" => ("#FEF9C3", "#CA8A04"),
        "purple" => ("#F3E8FF", "#9333EA"),
        "pink" => ("#FCE7F3", "#DB2777"),
        _ => ("#F3F4F6", "#6B7280"),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Edge curve leaving the parent vertically and entering the child
/// vertically.
fn edge_path(from: Point, to: Point) -> BezPath {
    let (x0, y0) = (f64::from(from.x), f64::from(from.y));
    let (x1, y1) = (f64::from(to.x), f64::from(to.y));
    let mid = (y0 + y1) / 2.0;
    let mut path = BezPath::new();
    path.move_to((x0, y0));
    path.curve_to((x0, mid), (x1, mid), (x1, y1));
    path
}

fn card_bounds(nodes: &[Node]) -> Option<Rect> {
    nodes
        .iter()
        .map(|n| node_rect(n.position))
        .reduce(|acc, r| acc.union(r))
}

/// Render `snapshot` as a standalone SVG document.
#[must_use]
pub fn render_svg(snapshot: &Snapshot) -> String {
    let nodes = snapshot.nodes();
    let frame = card_bounds(nodes)
        .unwrap_or(Rect::new(0.0, 0.0, 800.0, 600.0))
        .inflate(PAD, PAD);

    let mut svg = String::with_capacity(256 + nodes.len() * 320);
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"{x} {y} {w} {h}\">",
        x = frame.x0,
        y = frame.y0,
        w = frame.width(),
        h = frame.height(),
    );
    let _ = writeln!(svg, "<title>{}</title>", escape(snapshot.title()));
    svg.push_str("<style>\n");
    svg.push_str("  text { font-family: Inter, system-ui, sans-serif; }\n");
    svg.push_str("  .edge { fill: none; stroke: #9CA3AF; stroke-width: 2; }\n");
    svg.push_str("  .done text { text-decoration: line-through; }\n");
    svg.push_str("</style>\n");

    let positions: HashMap<NodeId, Point> = nodes.iter().map(|n| (n.id, n.position)).collect();
    svg.push_str("<g class=\"edges\">\n");
    for (parent, child) in snapshot.edges() {
        let (Some(p), Some(c)) = (positions.get(parent), positions.get(child)) else {
            continue;
        };
        let _ = writeln!(
            svg,
            "  <path class=\"edge\" d=\"{}\" />",
            edge_path(*p, *c).to_svg()
        );
    }
    svg.push_str("</g>\n");

    svg.push_str("<g class=\"nodes\">\n");
    for node in nodes {
        render_node(&mut svg, node);
    }
    svg.push_str("</g>\n</svg>\n");

    log::debug!("rendered {} nodes to svg ({} bytes)", nodes.len(), svg.len());
    svg
}

fn render_node(out: &mut String, node: &Node) {
    let r = node_rect(node.position);
    let (fill, stroke) = palette(node.color_tag.as_str());
    let stroke_width = if node.is_root { 3.0 } else { 1.5 };
    let class = if node.completed { " class=\"done\" opacity=\"0.6\"" } else { "" };

    let _ = writeln!(out, "  <g id=\"{}\"{class}>", escape(node.id.as_str()));
    let _ = writeln!(
        out,
        "    <rect x=\"{}\" y=\"{}\" width=\"{NODE_WIDTH}\" height=\"{NODE_HEIGHT}\" rx=\"{CORNER_RADIUS}\" ry=\"{CORNER_RADIUS}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\" />",
        r.x0, r.y0
    );
    let center = r.center();
    let _ = writeln!(
        out,
        "    <text x=\"{}\" y=\"{}\" font-size=\"{FONT_SIZE}\" fill=\"#111827\" text-anchor=\"middle\" dominant-baseline=\"central\">{}</text>",
        center.x,
        center.y,
        escape(&node.title)
    );
    out.push_str("  </g>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::model::{Canvas, ColorTag};
    use mm_core::snapshot::Transform;
    use mm_core::tree::TreeModel;
    use pretty_assertions::assert_eq;

    fn sample() -> Snapshot {
        let mut tree = TreeModel::new(Canvas::default());
        let root = tree.ensure_root();
        tree.set_title(root, "Tom & Jerry <3");
        let child = tree.add_child(root).unwrap();
        tree.set_completed(child, true);
        tree.set_color(child, ColorTag::new("green"));
        Snapshot::capture(&tree, "Cartoons", Transform::default())
    }

    #[test]
    fn escapes_titles() {
        let svg = render_svg(&sample());
        assert!(svg.contains(">Tom &amp; Jerry &lt;3</text>"));
        assert!(svg.contains("<title>Cartoons</title>"));
    }

    #[test]
    fn one_card_per_node_and_one_curve_per_edge() {
        let svg = render_svg(&sample());
        assert_eq!(svg.matches("<rect ").count(), 2);
        assert_eq!(svg.matches("class=\"edge\"").count(), 1);
        // kurbo emits the cubic segment as `C`.
        assert!(svg.contains(" C"));
    }

    #[test]
    fn completed_and_tagged_nodes_are_styled() {
        let svg = render_svg(&sample());
        assert!(svg.contains("class=\"done\""));
        assert!(svg.contains("fill=\"#DCFCE7\" stroke=\"#16A34A\""));
        assert!(svg.contains("stroke-width=\"3\""));
    }

    #[test]
    fn view_box_covers_all_cards() {
        let mut tree = TreeModel::new(Canvas::default());
        let root = tree.ensure_root();
        tree.move_to(root, Point::new(100.0, 200.0));
        let snap = Snapshot::capture(&tree, "One", Transform::default());
        let svg = render_svg(&snap);
        // card 30..170 × 172..228, padded by 32
        assert!(svg.contains("viewBox=\"-2 140 204 120\""), "{svg}");
    }

    #[test]
    fn long_chain_draws_every_edge_between_its_endpoints() {
        let mut tree = TreeModel::new(Canvas::default());
        let mut last = tree.ensure_root();
        for _ in 0..3000 {
            last = tree.add_child(last).unwrap();
        }
        let snap = Snapshot::capture(&tree, "Chain", Transform::default());
        let svg = render_svg(&snap);
        assert_eq!(svg.matches("class=\"edge\"").count(), 3000);

        let parent = tree.parent(last).unwrap();
        let expected = edge_path(
            tree.get(parent).unwrap().position,
            tree.get(last).unwrap().position,
        )
        .to_svg();
        assert!(svg.contains(&expected));
    }

    #[test]
    fn empty_snapshot_still_renders() {
        let tree = TreeModel::new(Canvas::default());
        let snap = Snapshot::capture(&tree, "", Transform::default());
        let svg = render_svg(&snap);
        assert!(svg.starts_with("<svg "));
        assert!(svg.ends_with("</svg>\n"));
        assert_eq!(svg.matches("<rect ").count(), 0);
    }
}
