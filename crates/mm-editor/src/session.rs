//! One open mind map.
//!
//! `MindMapSession` owns the tree, the viewport and the interaction
//! controller for a map, applies the mutations the controller produces and
//! writes every change through to the `NodeStore`. Store writes are
//! best-effort: a failure is logged and the in-memory model keeps the
//! change.

use crate::config::SessionConfig;
use crate::export::{self, ExportError, ExportSink, Exported, Renderer};
use crate::input::InputEvent;
use crate::interaction::{
    Command, CommandOutcome, InteractionController, InteractionState, PendingConfirmation,
    TreeMutation,
};
use crate::shortcuts::ShortcutMap;
use crate::store::NodeStore;
use crate::viewport::{ViewportController, ViewportSize};
use mm_core::id::NodeId;
use mm_core::layout::arrange;
use mm_core::model::{MapId, Point};
use mm_core::snapshot::Snapshot;
use mm_core::tree::TreeModel;
use std::sync::Arc;

pub struct MindMapSession {
    map: MapId,
    title: String,
    tree: TreeModel,
    viewport: ViewportController,
    interaction: InteractionController,
    store: Box<dyn NodeStore + Send>,
    config: SessionConfig,
}

impl MindMapSession {
    /// Load `map` from `store`, repair it, write repaired nodes back, make
    /// sure it has a root and center the view on that root.
    pub fn open(
        map: MapId,
        title: &str,
        store: Box<dyn NodeStore + Send>,
        config: SessionConfig,
    ) -> Self {
        let nodes = store.fetch_all(&map).unwrap_or_else(|e| {
            log::warn!("could not load map {map}: {e}; starting empty");
            Vec::new()
        });
        let loaded = nodes.len();
        let tree = TreeModel::from_nodes(config.canvas, nodes.clone());
        let repaired = tree.changed_from(&nodes);
        let viewport = ViewportController::new(config.viewport_size);

        let mut session = Self {
            map,
            title: title.to_string(),
            tree,
            viewport,
            interaction: InteractionController::new(),
            store,
            config,
        };
        if !repaired.is_empty() {
            log::warn!(
                "writing back {} repaired nodes of map {}",
                repaired.len(),
                session.map
            );
        }
        for id in repaired {
            session.persist_update(id);
        }
        session.ensure_root();
        log::info!(
            "opened map {} ({loaded} stored nodes, {} in tree)",
            session.map,
            session.tree.len()
        );
        session
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn map_id(&self) -> &MapId {
        &self.map
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.interaction.selected()
    }

    pub fn state(&self) -> InteractionState {
        self.interaction.state()
    }

    pub fn pending(&self) -> Option<PendingConfirmation> {
        self.interaction.pending()
    }

    /// Node position in screen space, for drawing.
    pub fn screen_position(&self, id: NodeId) -> Option<Point> {
        self.tree
            .get(id)
            .map(|n| self.viewport.canvas_to_screen(n.position))
    }

    // ─── Input ──────────────────────────────────────────────────────────

    /// Feed one input event through the interaction controller. Returns
    /// whether anything visible changed.
    pub fn handle_event(&mut self, event: InputEvent) -> bool {
        if let InputEvent::Key {
            key,
            ctrl,
            shift,
            alt,
            meta,
        } = &event
        {
            return match ShortcutMap::resolve(key, *ctrl, *shift, *alt, *meta) {
                Some(action) => self.command(action.command()) != CommandOutcome::Ignored,
                None => false,
            };
        }

        let hit = match event {
            InputEvent::PointerDown { x, y } => {
                let at = self.viewport.screen_to_canvas(Point::new(x, y));
                mm_render::hit_test(&self.tree, at)
            }
            _ => None,
        };

        let before = (self.interaction.state(), self.viewport.transform());
        let mutations = self.interaction.handle(&event, hit, &mut self.viewport);
        let mut changed = before != (self.interaction.state(), self.viewport.transform());
        for mutation in mutations {
            changed |= self.apply(mutation);
        }
        changed
    }

    /// Run a command against the current selection.
    pub fn command(&mut self, command: Command) -> CommandOutcome {
        let dispatch = self
            .interaction
            .command(command, &self.tree, &mut self.viewport);
        for mutation in dispatch.mutations {
            self.apply(mutation);
        }
        dispatch.outcome
    }

    /// Advance viewport animation. Returns `true` while still animating.
    pub fn tick(&mut self, elapsed_ms: f32) -> bool {
        self.viewport.tick(elapsed_ms)
    }

    pub fn resize(&mut self, size: ViewportSize) {
        self.viewport.resize(size);
    }

    // ─── Mutations ──────────────────────────────────────────────────────

    fn ensure_root(&mut self) -> NodeId {
        let created = self.tree.root().is_none();
        let root = self.tree.ensure_root();
        if created {
            self.persist_create(root);
        }
        if let Some(node) = self.tree.get(root) {
            self.viewport.center_on(node.position);
        }
        root
    }

    /// Apply one mutation to the tree and write it through. Returns whether
    /// the tree changed.
    fn apply(&mut self, mutation: TreeMutation) -> bool {
        log::trace!("apply {mutation:?}");
        match mutation {
            TreeMutation::MoveNode { id, dx, dy } => {
                let moved = self.tree.move_by(id, dx, dy);
                if moved {
                    self.persist_update(id);
                }
                moved
            }
            TreeMutation::AddChild { anchor } => match self.tree.add_child(anchor) {
                Some(id) => {
                    self.persist_create(id);
                    self.persist_update(anchor);
                    self.interaction.select(id);
                    true
                }
                None => false,
            },
            TreeMutation::DeleteNode { id } => match self.tree.delete_node(id) {
                Some(removal) => {
                    self.persist_delete(id);
                    self.persist_update(removal.parent);
                    for child in &removal.reparented {
                        self.persist_update(*child);
                    }
                    self.interaction.sync_with(&self.tree);
                    true
                }
                None => false,
            },
            TreeMutation::SetTitle { id, title } => {
                let changed = self.tree.set_title(id, &title);
                if changed {
                    self.persist_update(id);
                }
                changed
            }
            TreeMutation::ToggleCompleted { id } => {
                let changed = self.tree.toggle_completed(id).is_some();
                if changed {
                    self.persist_update(id);
                }
                changed
            }
            TreeMutation::SetColor { id, tag } => {
                let changed = self.tree.set_color(id, tag);
                if changed {
                    self.persist_update(id);
                }
                changed
            }
            TreeMutation::AutoArrange => {
                let arrangement = arrange(&self.tree, self.tree.canvas(), &self.config.layout);
                let ids: Vec<NodeId> = arrangement.positions.iter().map(|(id, _)| *id).collect();
                self.tree.apply_positions(arrangement.positions);
                for id in ids {
                    self.persist_update(id);
                }
                if let Some(root) = self.tree.root_node() {
                    self.interaction.select(root.id);
                    self.viewport.center_on(root.position);
                }
                true
            }
            TreeMutation::ClearMap => {
                let ids = self.tree.pre_order();
                self.tree.clear();
                for id in ids {
                    self.persist_delete(id);
                }
                self.interaction.reset();
                self.ensure_root();
                log::info!("cleared map {}", self.map);
                true
            }
        }
    }

    fn persist_create(&mut self, id: NodeId) {
        if let Some(node) = self.tree.get(id)
            && let Err(e) = self.store.create(&self.map, node)
        {
            log::warn!("store create {id} failed: {e}");
        }
    }

    fn persist_update(&mut self, id: NodeId) {
        if let Some(node) = self.tree.get(id)
            && let Err(e) = self.store.update(&self.map, node)
        {
            log::warn!("store update {id} failed: {e}");
        }
    }

    fn persist_delete(&mut self, id: NodeId) {
        if let Err(e) = self.store.delete(&self.map, id) {
            log::warn!("store delete {id} failed: {e}");
        }
    }

    // ─── Export ─────────────────────────────────────────────────────────

    /// Frozen copy of the map and the current viewport transform.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.tree, &self.title, self.viewport.transform())
    }

    /// Snapshot now and export with the configured timeout.
    pub async fn export(
        &self,
        renderer: Arc<dyn Renderer>,
        sink: &mut dyn ExportSink,
    ) -> Result<Exported, ExportError> {
        let snapshot = self.snapshot();
        export::export(snapshot, renderer, sink, self.config.export_timeout()).await
    }
}
