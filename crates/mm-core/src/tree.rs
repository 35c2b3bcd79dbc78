//! The node arena and its structural command methods.
//!
//! `TreeModel` is the only place that writes `parent`/`children`, so the
//! invariants (one root, consistent back-links, no cycles, finite positions)
//! are enforced here and nowhere else. Every command is a no-op on a missing
//! id; the only rejected command is deleting the root.

use crate::id::NodeId;
use crate::model::*;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Distance from the anchor at which a new child is first placed.
pub const CHILD_RADIUS: f32 = 180.0;

/// Angular step between successive children of the same anchor, in degrees.
pub const FAN_OUT_STEP_DEG: f32 = 60.0;

pub const ROOT_TITLE: &str = "Central idea";
pub const CHILD_TITLE: &str = "New idea";

const ID_PREFIX: &str = "node";

/// What `delete_node` took out of the tree, so callers can persist it.
#[derive(Debug, Clone)]
pub struct Removal {
    pub removed: Node,
    /// The deleted node's former parent, which adopted its children.
    pub parent: NodeId,
    /// Children moved under `parent`, in their original order.
    pub reparented: SmallVec<[NodeId; 4]>,
}

/// A mind map: flat id-keyed arena of nodes plus the root handle.
#[derive(Debug, Clone)]
pub struct TreeModel {
    nodes: HashMap<NodeId, Node>,
    root: Option<NodeId>,
    canvas: Canvas,
    /// Next sequence number for `node_N` ids. Only ever grows.
    next_seq: u64,
}

impl TreeModel {
    /// An empty map. Call `ensure_root` before adding children.
    #[must_use]
    pub fn new(canvas: Canvas) -> Self {
        Self {
            nodes: HashMap::new(),
            root: None,
            canvas,
            next_seq: 1,
        }
    }

    /// Build a model from nodes fetched from a store, repairing anything
    /// that would violate the structural invariants.
    #[must_use]
    pub fn from_nodes(canvas: Canvas, nodes: Vec<Node>) -> Self {
        let mut tree = Self::new(canvas);
        for node in nodes {
            if let Some(seq) = node.id.sequence(ID_PREFIX) {
                tree.next_seq = tree.next_seq.max(seq + 1);
            }
            if tree.nodes.insert(node.id, node).is_some() {
                log::warn!("duplicate node record in loaded map, keeping the last one");
            }
        }
        tree.repair();
        tree
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Create the root at the canvas center if the map has none.
    /// Returns the root id either way.
    pub fn ensure_root(&mut self) -> NodeId {
        if let Some(root) = self.root {
            return root;
        }
        let id = self.fresh_id();
        let mut node = Node::new(id, ROOT_TITLE, self.canvas.center());
        node.is_root = true;
        self.nodes.insert(id, node);
        self.root = Some(id);
        log::debug!("created root {id}");
        id
    }

    /// Append a new child to `anchor`, fanned out radially by the anchor's
    /// current child count. `None` if the anchor does not exist.
    pub fn add_child(&mut self, anchor: NodeId) -> Option<NodeId> {
        let Some(anchor_node) = self.nodes.get(&anchor) else {
            log::debug!("add_child: no node {anchor}");
            return None;
        };
        let index = anchor_node.children.len();
        let angle = (index as f32 * FAN_OUT_STEP_DEG).to_radians();
        let position = anchor_node
            .position
            .offset(CHILD_RADIUS * angle.cos(), CHILD_RADIUS * angle.sin());

        let id = self.fresh_id();
        let mut node = Node::new(id, CHILD_TITLE, position);
        node.parent = Some(anchor);
        self.nodes.insert(id, node);
        if let Some(anchor_node) = self.nodes.get_mut(&anchor) {
            anchor_node.children.push(id);
        }
        Some(id)
    }

    /// Delete a non-root node, handing its children to its former parent.
    /// Deleting the root or a missing id does nothing.
    pub fn delete_node(&mut self, id: NodeId) -> Option<Removal> {
        if self.root == Some(id) {
            log::debug!("delete_node: refusing to delete root {id}");
            return None;
        }
        let parent = self.nodes.get(&id)?.parent.or(self.root)?;
        let removed = self.nodes.remove(&id)?;

        for child in &removed.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = Some(parent);
            }
        }
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|c| *c != id);
            parent_node
                .children
                .extend(removed.children.iter().copied());
        }

        Some(Removal {
            parent,
            reparented: removed.children.clone(),
            removed,
        })
    }

    /// Remove every node, the root included.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    pub fn set_title(&mut self, id: NodeId, title: &str) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.title != title => {
                node.title = title.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn set_completed(&mut self, id: NodeId, completed: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.completed != completed => {
                node.completed = completed;
                true
            }
            _ => false,
        }
    }

    /// Flip the completion flag. Returns the new value.
    pub fn toggle_completed(&mut self, id: NodeId) -> Option<bool> {
        let node = self.nodes.get_mut(&id)?;
        node.completed = !node.completed;
        Some(node.completed)
    }

    pub fn set_color(&mut self, id: NodeId, tag: ColorTag) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.color_tag != tag => {
                node.color_tag = tag;
                true
            }
            _ => false,
        }
    }

    /// Place a node at an absolute canvas position. Non-finite positions
    /// are rejected.
    pub fn move_to(&mut self, id: NodeId, position: Point) -> bool {
        if !position.is_finite() {
            log::debug!("move_to: rejecting non-finite position for {id}");
            return false;
        }
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Translate a node by a canvas-space delta.
    pub fn move_by(&mut self, id: NodeId, dx: f32, dy: f32) -> bool {
        let Some(current) = self.nodes.get(&id).map(|n| n.position) else {
            return false;
        };
        self.move_to(id, current.offset(dx, dy))
    }

    /// Write a batch of positions (e.g. an auto-arrange result).
    /// Returns how many nodes were moved.
    pub fn apply_positions<I>(&mut self, positions: I) -> usize
    where
        I: IntoIterator<Item = (NodeId, Point)>,
    {
        positions
            .into_iter()
            .filter(|(id, p)| self.move_to(*id, *p))
            .count()
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.root.and_then(|r| self.nodes.get(&r))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in arbitrary order. Use `pre_order` for a stable order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Ordered children of `id`; empty for leaves and missing ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Edge count from the root to `id`.
    pub fn depth_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(&id)?;
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
            if depth > self.nodes.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Whether `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        if ancestor == descendant {
            return false;
        }
        let mut current = descendant;
        for _ in 0..self.nodes.len() {
            match self.parent(current) {
                Some(p) if p == ancestor => return true,
                Some(p) => current = p,
                None => return false,
            }
        }
        false
    }

    /// Depth-first pre-order from the root, children in stored order.
    /// Iterative, and never visits a node twice.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let Some(root) = self.root else {
            return out;
        };
        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Edge depth of every node reachable from the root.
    pub fn depths(&self) -> HashMap<NodeId, usize> {
        let mut depths = HashMap::with_capacity(self.nodes.len());
        let Some(root) = self.root else {
            return depths;
        };
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if depths.contains_key(&id) {
                continue;
            }
            depths.insert(id, depth);
            for child in self.children(id) {
                stack.push((*child, depth + 1));
            }
        }
        depths
    }

    /// Number of reachable nodes without children.
    pub fn leaf_count(&self) -> usize {
        self.pre_order()
            .into_iter()
            .filter(|id| self.nodes.get(id).is_some_and(Node::is_leaf))
            .count()
    }

    /// Maximum root-to-leaf edge count. 0 for a lone root or empty map.
    pub fn depth(&self) -> usize {
        self.depths().into_values().max().unwrap_or(0)
    }

    /// `(parent, child)` pairs in pre-order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.pre_order()
            .into_iter()
            .flat_map(|id| self.children(id).iter().map(move |c| (id, *c)))
            .collect()
    }

    /// Ids, in pre-order, of nodes that differ from `records` or are missing
    /// from them. After `from_nodes`, these are the nodes repair touched.
    pub fn changed_from(&self, records: &[Node]) -> Vec<NodeId> {
        let before: HashMap<NodeId, &Node> = records.iter().map(|n| (n.id, n)).collect();
        self.pre_order()
            .into_iter()
            .filter(|id| before.get(id).copied() != self.nodes.get(id))
            .collect()
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn fresh_id(&mut self) -> NodeId {
        loop {
            let id = NodeId::numbered(ID_PREFIX, self.next_seq);
            self.next_seq += 1;
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    /// Bring loaded data back in line with the invariants.
    fn repair(&mut self) {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort();

        // One root: the first flagged node, else the first parentless one.
        let flagged: Vec<NodeId> = ids
            .iter()
            .copied()
            .filter(|id| self.nodes[id].is_root)
            .collect();
        let root = flagged.first().copied().or_else(|| {
            let promoted = ids
                .iter()
                .copied()
                .find(|id| self.nodes[id].parent.is_none())
                .or_else(|| ids.first().copied());
            if let Some(p) = promoted {
                log::warn!("loaded map has no root, promoting {p}");
            }
            promoted
        });
        let Some(root) = root else {
            self.root = None;
            return;
        };
        for extra in flagged.iter().skip(1) {
            log::warn!("loaded map has extra root {extra}, demoting it");
            if let Some(node) = self.nodes.get_mut(extra) {
                node.is_root = false;
                node.parent = None;
            }
        }
        if let Some(node) = self.nodes.get_mut(&root) {
            node.is_root = true;
            node.parent = None;
        }
        self.root = Some(root);

        // Dangling or self parents become orphans.
        for id in &ids {
            let bad = match self.nodes[id].parent {
                Some(p) => p == *id || !self.nodes.contains_key(&p),
                None => false,
            };
            if bad {
                log::warn!("node {id} points at a missing parent");
                if let Some(node) = self.nodes.get_mut(id) {
                    node.parent = None;
                }
            }
        }

        // Child lists keep only ids whose parent agrees, once each.
        for id in &ids {
            let kept: SmallVec<[NodeId; 4]> = {
                let mut seen = HashSet::new();
                self.nodes[id]
                    .children
                    .iter()
                    .copied()
                    .filter(|c| {
                        *c != *id
                            && self.nodes.get(c).is_some_and(|n| n.parent == Some(*id))
                            && seen.insert(*c)
                    })
                    .collect()
            };
            if let Some(node) = self.nodes.get_mut(id)
                && kept.len() != node.children.len()
            {
                log::warn!("node {id} lists stale or duplicate children");
                node.children = kept;
            }
        }

        // Parents missing a back-link get one appended.
        for id in &ids {
            if let Some(p) = self.nodes[id].parent
                && !self.nodes[&p].children.contains(id)
                && let Some(parent) = self.nodes.get_mut(&p)
            {
                parent.children.push(*id);
            }
        }

        // Orphans hang off the root.
        for id in &ids {
            if *id != root && self.nodes[id].parent.is_none() {
                log::warn!("reattaching orphan {id} under the root");
                self.attach_to_root(*id, root);
            }
        }

        // Whatever is still unreachable sits on a cycle; cut it open.
        loop {
            let reachable: HashSet<NodeId> = self.pre_order().into_iter().collect();
            let Some(stray) = ids.iter().copied().find(|id| !reachable.contains(id)) else {
                break;
            };
            log::warn!("breaking parent cycle at {stray}");
            if let Some(old) = self.nodes[&stray].parent
                && let Some(old_parent) = self.nodes.get_mut(&old)
            {
                old_parent.children.retain(|c| *c != stray);
            }
            self.attach_to_root(stray, root);
        }

        let center = self.canvas.center();
        for node in self.nodes.values_mut() {
            if !node.position.is_finite() {
                log::warn!("resetting non-finite position of {}", node.id);
                node.position = center;
            }
        }
    }

    fn attach_to_root(&mut self, id: NodeId, root: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(root);
        }
        if let Some(root_node) = self.nodes.get_mut(&root) {
            root_node.children.push(id);
        }
    }
}

impl Default for TreeModel {
    fn default() -> Self {
        Self::new(Canvas::default())
    }
}
