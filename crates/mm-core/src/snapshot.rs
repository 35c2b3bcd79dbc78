//! Frozen snapshots handed to renderers and the export pipeline.
//!
//! A `Snapshot` owns copies of every node and edge taken at one instant,
//! so a render running elsewhere never observes later edits to the live
//! tree.

use crate::id::NodeId;
use crate::model::{Bounds, Node, Point};
use crate::tree::TreeModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Viewport transform at snapshot time: `screen = canvas × scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f32,
    pub offset: Point,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Point::ZERO,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotData {
    title: String,
    nodes: Vec<Node>,
    edges: Vec<(NodeId, NodeId)>,
    transform: Transform,
}

/// Immutable, cheaply clonable copy of a map.
#[derive(Debug, Clone)]
pub struct Snapshot {
    data: Arc<SnapshotData>,
}

impl Snapshot {
    /// Freeze `tree` as it is right now. Nodes are listed in pre-order.
    pub fn capture(tree: &TreeModel, title: &str, transform: Transform) -> Self {
        let nodes = tree
            .pre_order()
            .into_iter()
            .filter_map(|id| tree.get(id).cloned())
            .collect();
        Self {
            data: Arc::new(SnapshotData {
                title: title.to_string(),
                nodes,
                edges: tree.edges(),
                transform,
            }),
        }
    }

    pub fn title(&self) -> &str {
        &self.data.title
    }

    pub fn nodes(&self) -> &[Node] {
        &self.data.nodes
    }

    /// `(parent, child)` pairs.
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.data.edges
    }

    pub fn transform(&self) -> Transform {
        self.data.transform
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.data.nodes.iter().find(|n| n.id == id)
    }

    /// Bounding box of node centers. `None` for an empty map.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of_points(self.data.nodes.iter().map(|n| n.position))
    }

    /// MessagePack encoding for out-of-process renderers.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(&*self.data)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        let data: SnapshotData = rmp_serde::from_slice(bytes)?;
        Ok(Self {
            data: Arc::new(data),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&*self.data)
    }
}
