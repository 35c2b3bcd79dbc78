//! Input abstraction layer.
//!
//! Normalizes mouse, touch and trackpad gestures into a unified
//! `InputEvent` enum. Pointer coordinates are in screen space.

/// A normalized input event from any pointing device or keyboard.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start).
    PointerDown { x: f32, y: f32 },

    /// Pointer moved while pressed or hovering.
    PointerMove { x: f32, y: f32 },

    /// Pointer released.
    PointerUp { x: f32, y: f32 },

    /// Pinch in progress. `magnification` is relative to the gesture start
    /// (1.0 = unchanged, >1 = zoom in).
    Pinch { magnification: f32 },

    /// Pinch finished.
    PinchEnd,

    /// Keyboard shortcut.
    Key {
        key: String,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    },
}

impl InputEvent {
    pub fn from_pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn from_pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn from_pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp { x, y }
    }

    /// A key press with no modifiers.
    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    /// A key press with ⌘ (or Ctrl) held.
    pub fn command_key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: true,
        }
    }
}
