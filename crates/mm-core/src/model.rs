//! Core data model for mind maps.
//!
//! A map is a tree of `Node` values stored in a flat arena (see `tree.rs`).
//! Parent and child links are plain `NodeId`s, never references, so the
//! arena owns every node and edges are just data.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ─── Geometry ────────────────────────────────────────────────────────────

/// A point (or vector) in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Logical canvas bounds. The canvas is much larger than the viewport;
/// new roots and auto-arranged maps are centered on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 3000.0,
            height: 2000.0,
        }
    }
}

impl Canvas {
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Axis-aligned bounding box over a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Bounding box of `points`. `None` when empty.
    pub fn of_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut b = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            b.min_x = b.min_x.min(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_x = b.max_x.max(p.x);
            b.max_y = b.max_y.max(p.y);
        }
        Some(b)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

// ─── Identity ────────────────────────────────────────────────────────────

/// Names one mind map in the node store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(pub String);

impl MapId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque style token. Carries no structural meaning; renderers map it to
/// whatever palette they like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorTag(pub String);

impl ColorTag {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ColorTag {
    fn default() -> Self {
        Self("blue".into())
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// One idea bubble on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable unique id, never reused within a map.
    pub id: NodeId,

    pub title: String,

    /// Center of the bubble in canvas space.
    pub position: Point,

    pub completed: bool,

    pub color_tag: ColorTag,

    /// Exactly one node per map is the root.
    pub is_root: bool,

    /// Absent iff `is_root`.
    pub parent: Option<NodeId>,

    /// Ordered children. Order drives layout and radial fan-out.
    pub children: SmallVec<[NodeId; 4]>,
}

impl Node {
    pub fn new(id: NodeId, title: impl Into<String>, position: Point) -> Self {
        Self {
            id,
            title: title.into(),
            position,
            completed: false,
            color_tag: ColorTag::default(),
            is_root: false,
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
