pub mod hit;
pub mod svg;

pub use hit::{NODE_HEIGHT, NODE_WIDTH, hit_test, node_rect};
pub use svg::render_svg;
