//! Viewport: pan/zoom state and the screen ↔ canvas mapping.
//!
//! `screen = canvas × scale + offset`, with `offset` in screen units.
//! The controller knows nothing about the tree; callers hand it canvas
//! points to center on.

use mm_core::model::Point;
use mm_core::snapshot::Transform;
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f32 = 0.4;
pub const MAX_SCALE: f32 = 3.0;
/// Scale change per zoom-in / zoom-out command.
pub const ZOOM_STEP: f32 = 0.2;

/// Size of the visible window, in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl ViewportSize {
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// In-flight `animate_center_on`. The target offset is recomputed from the
/// current scale on every tick so a zoom mid-animation still lands exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CenterAnimation {
    target: Point,
    start_offset: Point,
    elapsed_ms: f32,
    duration_ms: f32,
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    scale: f32,
    offset: Point,
    size: ViewportSize,
    /// Scale at the start of the current pinch.
    gesture_base_scale: f32,
    panning: bool,
    animation: Option<CenterAnimation>,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportSize::default())
    }
}

fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

impl ViewportController {
    #[must_use]
    pub fn new(size: ViewportSize) -> Self {
        Self {
            scale: 1.0,
            offset: Point::ZERO,
            size,
            gesture_base_scale: 1.0,
            panning: false,
            animation: None,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn transform(&self) -> Transform {
        Transform {
            scale: self.scale,
            offset: self.offset,
        }
    }

    pub fn resize(&mut self, size: ViewportSize) {
        if size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0
        {
            self.size = size;
        } else {
            log::debug!("ignoring viewport resize to {size:?}");
        }
    }

    // ─── Zoom ───────────────────────────────────────────────────────────

    /// Add `delta` to the scale, clamped. Returns whether the scale changed.
    pub fn zoom(&mut self, delta: f32) -> bool {
        if !delta.is_finite() {
            return false;
        }
        let before = self.scale;
        self.scale = clamp_scale(self.scale + delta);
        self.gesture_base_scale = self.scale;
        self.scale != before
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom(-ZOOM_STEP)
    }

    /// Scale relative to the pinch start.
    pub fn pinch_zoom(&mut self, magnification: f32) {
        if !magnification.is_finite() || magnification <= 0.0 {
            log::debug!("ignoring pinch magnification {magnification}");
            return;
        }
        self.scale = clamp_scale(self.gesture_base_scale * magnification);
    }

    /// Commit the pinched scale as the base for the next pinch.
    pub fn end_pinch(&mut self) {
        self.gesture_base_scale = self.scale;
    }

    // ─── Pan ────────────────────────────────────────────────────────────

    pub fn begin_pan(&mut self) {
        self.panning = true;
        self.animation = None;
    }

    /// Shift the view by a screen-space delta.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() && dy.is_finite() {
            self.offset = self.offset.offset(dx, dy);
        }
    }

    pub fn end_pan(&mut self) {
        self.panning = false;
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    // ─── Centering ──────────────────────────────────────────────────────

    fn offset_centering(&self, point: Point) -> Point {
        let center = self.size.center();
        Point::new(
            center.x - point.x * self.scale,
            center.y - point.y * self.scale,
        )
    }

    /// Place canvas `point` exactly at the viewport center.
    pub fn center_on(&mut self, point: Point) {
        if !point.is_finite() {
            log::debug!("ignoring center_on non-finite point");
            return;
        }
        self.animation = None;
        self.offset = self.offset_centering(point);
    }

    /// Ease toward centering `point` over `duration_ms`; drive with `tick`.
    pub fn animate_center_on(&mut self, point: Point, duration_ms: f32) {
        if !point.is_finite() {
            return;
        }
        if duration_ms.is_nan() || duration_ms <= 0.0 {
            self.center_on(point);
            return;
        }
        self.animation = Some(CenterAnimation {
            target: point,
            start_offset: self.offset,
            elapsed_ms: 0.0,
            duration_ms,
        });
    }

    /// Advance a running animation. Returns `true` while still animating.
    pub fn tick(&mut self, elapsed_ms: f32) -> bool {
        let Some(mut anim) = self.animation else {
            return false;
        };
        anim.elapsed_ms += elapsed_ms.max(0.0);
        let goal = self.offset_centering(anim.target);
        if anim.elapsed_ms >= anim.duration_ms {
            self.offset = goal;
            self.animation = None;
            return false;
        }
        let t = ease_out_cubic(anim.elapsed_ms / anim.duration_ms);
        self.offset = Point::new(
            anim.start_offset.x + (goal.x - anim.start_offset.x) * t,
            anim.start_offset.y + (goal.y - anim.start_offset.y) * t,
        );
        self.animation = Some(anim);
        true
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    // ─── Mapping ────────────────────────────────────────────────────────

    pub fn canvas_to_screen(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.offset.x,
            p.y * self.scale + self.offset.y,
        )
    }

    pub fn screen_to_canvas(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset.x) / self.scale,
            (p.y - self.offset.y) / self.scale,
        )
    }

    /// Convert a screen-space movement into canvas units.
    pub fn screen_delta_to_canvas(&self, dx: f32, dy: f32) -> (f32, f32) {
        (dx / self.scale, dy / self.scale)
    }
}
