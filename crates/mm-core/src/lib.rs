pub mod check;
pub mod emitter;
pub mod id;
pub mod layout;
pub mod model;
pub mod parser;
pub mod snapshot;
pub mod tree;

pub use check::{Diagnostic, check_tree};
pub use emitter::{emit_outline, emit_snapshot_outline};
pub use id::NodeId;
pub use layout::{Arrangement, LayoutConfig, arrange};
pub use model::{Bounds, Canvas, ColorTag, MapId, Node, Point};
pub use parser::{ParseError, parse_outline};
pub use snapshot::{Snapshot, Transform};
pub use tree::{Removal, TreeModel};
