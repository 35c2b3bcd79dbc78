//! Interaction state machine.
//!
//! Translates pointer gestures and commands into `TreeMutation`s, viewport
//! updates and selection changes. The controller never touches the tree
//! directly: it reads it to resolve targets and returns mutations for the
//! session to apply.
//!
//! | Gesture                  | Result                                   |
//! |--------------------------|------------------------------------------|
//! | tap node                 | `NodeSelected(id)`                       |
//! | tap empty canvas         | `Idle`, selection cleared                |
//! | drag node                | `DraggingNode(id)`, `MoveNode` per frame |
//! | drag empty canvas        | `PanningCanvas`, viewport pan            |
//! | pinch                    | `Pinching`, viewport zoom                |

use crate::input::InputEvent;
use crate::viewport::ViewportController;
use mm_core::id::NodeId;
use mm_core::model::ColorTag;
use mm_core::tree::TreeModel;

/// Screen distance a press may travel and still count as a tap.
pub const TAP_SLOP: f32 = 4.0;
/// Duration of the center-on-root animation.
pub const CENTER_ANIMATION_MS: f32 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    NodeSelected(NodeId),
    DraggingNode(NodeId),
    PanningCanvas,
    Pinching,
}

/// A change to the tree, applied by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeMutation {
    /// Move by a canvas-space delta.
    MoveNode { id: NodeId, dx: f32, dy: f32 },
    AddChild { anchor: NodeId },
    DeleteNode { id: NodeId },
    SetTitle { id: NodeId, title: String },
    ToggleCompleted { id: NodeId },
    SetColor { id: NodeId, tag: ColorTag },
    AutoArrange,
    ClearMap,
}

/// User-level commands from menus, buttons and shortcuts.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddChild,
    Delete,
    /// Asks for confirmation before running.
    AutoArrange,
    Confirm,
    Cancel,
    ToggleCompleted,
    SetTitle(String),
    SetColor(ColorTag),
    ZoomIn,
    ZoomOut,
    CenterOnRoot,
    Deselect,
    /// Asks for confirmation before running.
    ClearMap,
}

/// Destructive command waiting for `Confirm` or `Cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirmation {
    AutoArrange,
    ClearMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    NeedsConfirmation,
    Ignored,
}

/// What a command produced: the outcome plus mutations to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub outcome: CommandOutcome,
    pub mutations: Vec<TreeMutation>,
}

impl Dispatch {
    fn applied(mutations: Vec<TreeMutation>) -> Self {
        Self {
            outcome: CommandOutcome::Applied,
            mutations,
        }
    }

    fn only(outcome: CommandOutcome) -> Self {
        Self {
            outcome,
            mutations: Vec::new(),
        }
    }
}

/// An active press: where it started, where it was last seen, and what
/// was under it at the start.
#[derive(Debug, Clone, Copy)]
struct Press {
    origin: (f32, f32),
    last: (f32, f32),
    hit: Option<NodeId>,
    dragging: bool,
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    state: InteractionState,
    selected: Option<NodeId>,
    pending: Option<PendingConfirmation>,
    press: Option<Press>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            state: InteractionState::Idle,
            selected: None,
            pending: None,
            press: None,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn pending(&self) -> Option<PendingConfirmation> {
        self.pending
    }

    /// Select `id`, e.g. a freshly added child.
    pub fn select(&mut self, id: NodeId) {
        self.selected = Some(id);
        if !self.is_gesturing() {
            self.state = InteractionState::NodeSelected(id);
        }
    }

    /// Drop the selection if its node no longer exists.
    pub fn sync_with(&mut self, tree: &TreeModel) {
        if let Some(id) = self.selected
            && !tree.contains(id)
        {
            log::trace!("selected node {id} is gone");
            self.selected = None;
            self.press = None;
            self.state = InteractionState::Idle;
        }
    }

    /// Back to `Idle` with nothing selected or pending.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn is_gesturing(&self) -> bool {
        matches!(
            self.state,
            InteractionState::DraggingNode(_)
                | InteractionState::PanningCanvas
                | InteractionState::Pinching
        )
    }

    fn settle(&mut self) {
        self.state = match self.selected {
            Some(id) => InteractionState::NodeSelected(id),
            None => InteractionState::Idle,
        };
    }

    // ─── Gestures ───────────────────────────────────────────────────────

    /// Handle a pointer or pinch event. `hit` is the node under the pointer
    /// (only consulted on `PointerDown`). Key events are ignored here; the
    /// session resolves them to commands.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        hit: Option<NodeId>,
        viewport: &mut ViewportController,
    ) -> Vec<TreeMutation> {
        match event {
            InputEvent::PointerDown { x, y } => {
                if self.state == InteractionState::Pinching {
                    return vec![];
                }
                // The previous gesture lost its release.
                if self.state == InteractionState::PanningCanvas {
                    viewport.end_pan();
                }
                if self.is_gesturing() {
                    log::trace!("pointer down during {:?}, closing it", self.state);
                    self.settle();
                }
                self.press = Some(Press {
                    origin: (*x, *y),
                    last: (*x, *y),
                    hit,
                    dragging: false,
                });
                vec![]
            }
            InputEvent::PointerMove { x, y } => self.drag_to(*x, *y, viewport),
            InputEvent::PointerUp { x, y } => {
                let mutations = self.drag_to(*x, *y, viewport);
                let Some(press) = self.press.take() else {
                    return mutations;
                };
                if press.dragging {
                    if self.state == InteractionState::PanningCanvas {
                        viewport.end_pan();
                    }
                } else {
                    // Tap: node hits take priority over the canvas.
                    self.selected = press.hit;
                    log::trace!("tap selected {:?}", press.hit);
                }
                self.settle();
                mutations
            }
            InputEvent::Pinch { magnification } => {
                if self.state != InteractionState::Pinching {
                    if self.state == InteractionState::PanningCanvas {
                        viewport.end_pan();
                    }
                    self.press = None;
                    self.state = InteractionState::Pinching;
                }
                viewport.pinch_zoom(*magnification);
                vec![]
            }
            InputEvent::PinchEnd => {
                if self.state == InteractionState::Pinching {
                    viewport.end_pinch();
                    self.settle();
                }
                vec![]
            }
            InputEvent::Key { .. } => vec![],
        }
    }

    fn drag_to(&mut self, x: f32, y: f32, viewport: &mut ViewportController) -> Vec<TreeMutation> {
        let Some(press) = self.press.as_mut() else {
            return vec![];
        };

        if !press.dragging {
            let travelled = (x - press.origin.0).hypot(y - press.origin.1);
            if travelled <= TAP_SLOP {
                return vec![];
            }
            press.dragging = true;
            match press.hit {
                Some(id) => {
                    self.selected = Some(id);
                    self.state = InteractionState::DraggingNode(id);
                }
                None => {
                    viewport.begin_pan();
                    self.state = InteractionState::PanningCanvas;
                }
            }
            log::trace!("drag started: {:?}", self.state);
        }

        let (dx, dy) = (x - press.last.0, y - press.last.1);
        press.last = (x, y);
        if dx == 0.0 && dy == 0.0 {
            return vec![];
        }

        match self.state {
            InteractionState::DraggingNode(id) => {
                let (dx, dy) = viewport.screen_delta_to_canvas(dx, dy);
                vec![TreeMutation::MoveNode { id, dx, dy }]
            }
            InteractionState::PanningCanvas => {
                viewport.pan(dx, dy);
                vec![]
            }
            _ => vec![],
        }
    }

    // ─── Commands ───────────────────────────────────────────────────────

    /// Run a command against the current selection.
    pub fn command(
        &mut self,
        command: Command,
        tree: &TreeModel,
        viewport: &mut ViewportController,
    ) -> Dispatch {
        self.sync_with(tree);
        log::trace!("command {command:?} with selection {:?}", self.selected);

        match command {
            Command::AddChild => match self.selected.or(tree.root()) {
                Some(anchor) => Dispatch::applied(vec![TreeMutation::AddChild { anchor }]),
                None => Dispatch::only(CommandOutcome::Ignored),
            },
            Command::Delete => match self.selected {
                Some(id) if tree.root() != Some(id) => {
                    self.selected = None;
                    self.press = None;
                    self.state = InteractionState::Idle;
                    Dispatch::applied(vec![TreeMutation::DeleteNode { id }])
                }
                _ => {
                    log::debug!("delete ignored: no deletable selection");
                    Dispatch::only(CommandOutcome::Ignored)
                }
            },
            Command::AutoArrange => {
                if tree.is_empty() {
                    return Dispatch::only(CommandOutcome::Ignored);
                }
                self.pending = Some(PendingConfirmation::AutoArrange);
                Dispatch::only(CommandOutcome::NeedsConfirmation)
            }
            Command::ClearMap => {
                self.pending = Some(PendingConfirmation::ClearMap);
                Dispatch::only(CommandOutcome::NeedsConfirmation)
            }
            Command::Confirm => match self.pending.take() {
                Some(PendingConfirmation::AutoArrange) => {
                    Dispatch::applied(vec![TreeMutation::AutoArrange])
                }
                Some(PendingConfirmation::ClearMap) => {
                    self.selected = None;
                    self.press = None;
                    self.state = InteractionState::Idle;
                    Dispatch::applied(vec![TreeMutation::ClearMap])
                }
                None => Dispatch::only(CommandOutcome::Ignored),
            },
            Command::Cancel => match self.pending.take() {
                Some(_) => Dispatch::only(CommandOutcome::Applied),
                None => Dispatch::only(CommandOutcome::Ignored),
            },
            Command::ToggleCompleted => self.on_selected(|id| TreeMutation::ToggleCompleted { id }),
            Command::SetTitle(title) => self.on_selected(|id| TreeMutation::SetTitle { id, title }),
            Command::SetColor(tag) => self.on_selected(|id| TreeMutation::SetColor { id, tag }),
            Command::ZoomIn => Self::view_change(viewport.zoom_in()),
            Command::ZoomOut => Self::view_change(viewport.zoom_out()),
            Command::CenterOnRoot => match tree.root_node() {
                Some(root) => {
                    viewport.animate_center_on(root.position, CENTER_ANIMATION_MS);
                    Dispatch::only(CommandOutcome::Applied)
                }
                None => Dispatch::only(CommandOutcome::Ignored),
            },
            Command::Deselect => {
                let had_prompt = self.pending.take().is_some();
                let had_selection = self.selected.take().is_some();
                if !self.is_gesturing() {
                    self.state = InteractionState::Idle;
                }
                Self::view_change(had_prompt || had_selection)
            }
        }
    }

    fn on_selected(&self, make: impl FnOnce(NodeId) -> TreeMutation) -> Dispatch {
        match self.selected {
            Some(id) => Dispatch::applied(vec![make(id)]),
            None => Dispatch::only(CommandOutcome::Ignored),
        }
    }

    fn view_change(changed: bool) -> Dispatch {
        Dispatch::only(if changed {
            CommandOutcome::Applied
        } else {
            CommandOutcome::Ignored
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::model::Canvas;
    use pretty_assertions::assert_eq;

    fn setup() -> (TreeModel, NodeId, NodeId, ViewportController) {
        let mut tree = TreeModel::new(Canvas::default());
        let root = tree.ensure_root();
        let child = tree.add_child(root).unwrap();
        (tree, root, child, ViewportController::default())
    }

    #[test]
    fn tap_selects_node_and_tap_on_canvas_clears() {
        let (_, _, child, mut vp) = setup();
        let mut ic = InteractionController::new();

        ic.handle(&InputEvent::from_pointer_down(10.0, 10.0), Some(child), &mut vp);
        ic.handle(&InputEvent::from_pointer_up(11.0, 12.0), None, &mut vp);
        assert_eq!(ic.state(), InteractionState::NodeSelected(child));
        assert_eq!(ic.selected(), Some(child));

        ic.handle(&InputEvent::from_pointer_down(500.0, 500.0), None, &mut vp);
        ic.handle(&InputEvent::from_pointer_up(500.0, 500.0), None, &mut vp);
        assert_eq!(ic.state(), InteractionState::Idle);
        assert_eq!(ic.selected(), None);
    }

    #[test]
    fn drag_node_emits_scaled_moves() {
        let (_, _, child, mut vp) = setup();
        vp.zoom(1.0); // scale 2
        let mut ic = InteractionController::new();

        ic.handle(&InputEvent::from_pointer_down(100.0, 100.0), Some(child), &mut vp);
        let first = ic.handle(&InputEvent::from_pointer_move(110.0, 104.0), None, &mut vp);
        assert_eq!(ic.state(), InteractionState::DraggingNode(child));
        assert_eq!(
            first,
            vec![TreeMutation::MoveNode {
                id: child,
                dx: 5.0,
                dy: 2.0
            }]
        );
        let last = ic.handle(&InputEvent::from_pointer_up(120.0, 104.0), None, &mut vp);
        assert_eq!(
            last,
            vec![TreeMutation::MoveNode {
                id: child,
                dx: 5.0,
                dy: 0.0
            }]
        );
        // Released node stays selected.
        assert_eq!(ic.state(), InteractionState::NodeSelected(child));
    }

    #[test]
    fn small_wobble_is_still_a_tap() {
        let (_, _, child, mut vp) = setup();
        let mut ic = InteractionController::new();
        ic.handle(&InputEvent::from_pointer_down(0.0, 0.0), Some(child), &mut vp);
        let moved = ic.handle(&InputEvent::from_pointer_move(2.0, 3.0), None, &mut vp);
        assert!(moved.is_empty());
        assert_eq!(ic.state(), InteractionState::Idle);
        ic.handle(&InputEvent::from_pointer_up(2.0, 3.0), None, &mut vp);
        assert_eq!(ic.state(), InteractionState::NodeSelected(child));
    }

    #[test]
    fn drag_on_canvas_pans_without_mutations() {
        let (_, _, _, mut vp) = setup();
        let mut ic = InteractionController::new();
        ic.handle(&InputEvent::from_pointer_down(0.0, 0.0), None, &mut vp);
        let out = ic.handle(&InputEvent::from_pointer_move(30.0, -40.0), None, &mut vp);
        assert!(out.is_empty());
        assert_eq!(ic.state(), InteractionState::PanningCanvas);
        assert!(vp.is_panning());
        ic.handle(&InputEvent::from_pointer_up(30.0, -40.0), None, &mut vp);
        assert!(!vp.is_panning());
        assert_eq!(vp.offset().x, 30.0);
        assert_eq!(vp.offset().y, -40.0);
        assert_eq!(ic.state(), InteractionState::Idle);
    }

    #[test]
    fn press_after_lost_release_ends_the_pan() {
        let (_, _, child, mut vp) = setup();
        let mut ic = InteractionController::new();
        ic.handle(&InputEvent::from_pointer_down(0.0, 0.0), None, &mut vp);
        ic.handle(&InputEvent::from_pointer_move(30.0, 0.0), None, &mut vp);
        assert!(vp.is_panning());

        // No PointerUp: the next press starts a node drag.
        ic.handle(&InputEvent::from_pointer_down(50.0, 50.0), Some(child), &mut vp);
        assert!(!vp.is_panning());
        assert_eq!(ic.state(), InteractionState::Idle);
        let out = ic.handle(&InputEvent::from_pointer_move(60.0, 50.0), None, &mut vp);
        assert_eq!(ic.state(), InteractionState::DraggingNode(child));
        assert_eq!(
            out,
            vec![TreeMutation::MoveNode {
                id: child,
                dx: 10.0,
                dy: 0.0
            }]
        );
        assert!(!vp.is_panning());
        assert_eq!(vp.offset().x, 30.0);
    }

    #[test]
    fn pinch_zooms_and_restores_selection_state() {
        let (_, _, child, mut vp) = setup();
        let mut ic = InteractionController::new();
        ic.select(child);
        ic.handle(&InputEvent::Pinch { magnification: 1.5 }, None, &mut vp);
        assert_eq!(ic.state(), InteractionState::Pinching);
        assert_eq!(vp.scale(), 1.5);
        ic.handle(&InputEvent::PinchEnd, None, &mut vp);
        assert_eq!(ic.state(), InteractionState::NodeSelected(child));
    }

    #[test]
    fn add_child_anchors_on_selection_or_root() {
        let (tree, root, child, mut vp) = setup();
        let mut ic = InteractionController::new();
        let d = ic.command(Command::AddChild, &tree, &mut vp);
        assert_eq!(d.mutations, vec![TreeMutation::AddChild { anchor: root }]);

        ic.select(child);
        let d = ic.command(Command::AddChild, &tree, &mut vp);
        assert_eq!(d.mutations, vec![TreeMutation::AddChild { anchor: child }]);
    }

    #[test]
    fn delete_rejects_root_and_clears_selection() {
        let (tree, root, child, mut vp) = setup();
        let mut ic = InteractionController::new();

        assert_eq!(
            ic.command(Command::Delete, &tree, &mut vp).outcome,
            CommandOutcome::Ignored
        );
        ic.select(root);
        assert_eq!(
            ic.command(Command::Delete, &tree, &mut vp).outcome,
            CommandOutcome::Ignored
        );

        ic.select(child);
        let d = ic.command(Command::Delete, &tree, &mut vp);
        assert_eq!(d.mutations, vec![TreeMutation::DeleteNode { id: child }]);
        assert_eq!(ic.selected(), None);
        assert_eq!(ic.state(), InteractionState::Idle);
    }

    #[test]
    fn auto_arrange_waits_for_confirmation() {
        let (tree, _, _, mut vp) = setup();
        let mut ic = InteractionController::new();

        let d = ic.command(Command::AutoArrange, &tree, &mut vp);
        assert_eq!(d.outcome, CommandOutcome::NeedsConfirmation);
        assert!(d.mutations.is_empty());
        assert_eq!(ic.pending(), Some(PendingConfirmation::AutoArrange));

        let d = ic.command(Command::Confirm, &tree, &mut vp);
        assert_eq!(d.mutations, vec![TreeMutation::AutoArrange]);
        assert_eq!(ic.pending(), None);

        ic.command(Command::AutoArrange, &tree, &mut vp);
        assert_eq!(
            ic.command(Command::Cancel, &tree, &mut vp).outcome,
            CommandOutcome::Applied
        );
        assert_eq!(
            ic.command(Command::Confirm, &tree, &mut vp).outcome,
            CommandOutcome::Ignored
        );
    }

    #[test]
    fn field_edits_need_a_selection() {
        let (tree, _, child, mut vp) = setup();
        let mut ic = InteractionController::new();
        assert_eq!(
            ic.command(Command::ToggleCompleted, &tree, &mut vp).outcome,
            CommandOutcome::Ignored
        );
        ic.select(child);
        let d = ic.command(Command::SetTitle("Plan B".into()), &tree, &mut vp);
        assert_eq!(
            d.mutations,
            vec![TreeMutation::SetTitle {
                id: child,
                title: "Plan B".into()
            }]
        );
    }

    #[test]
    fn stale_selection_is_dropped() {
        let (mut tree, _, child, mut vp) = setup();
        let mut ic = InteractionController::new();
        ic.select(child);
        tree.delete_node(child);
        let d = ic.command(Command::ToggleCompleted, &tree, &mut vp);
        assert_eq!(d.outcome, CommandOutcome::Ignored);
        assert_eq!(ic.state(), InteractionState::Idle);
    }

    #[test]
    fn zoom_commands_report_clamping() {
        let (tree, _, _, mut vp) = setup();
        let mut ic = InteractionController::new();
        for _ in 0..20 {
            ic.command(Command::ZoomIn, &tree, &mut vp);
        }
        assert_eq!(
            ic.command(Command::ZoomIn, &tree, &mut vp).outcome,
            CommandOutcome::Ignored
        );
        assert_eq!(
            ic.command(Command::ZoomOut, &tree, &mut vp).outcome,
            CommandOutcome::Applied
        );
    }
}
