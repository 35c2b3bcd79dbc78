//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s, which the
//! session turns into interaction `Command`s.

use crate::interaction::Command;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    AddChild,
    Delete,
    ToggleCompleted,
    AutoArrange,
    /// Remove every node (⌘Delete). Asks for confirmation.
    ClearMap,

    // ── Prompt ──
    Confirm,

    // ── View ──
    ZoomIn,
    ZoomOut,
    CenterOnRoot,

    // ── UI ──
    Deselect,
}

impl ShortcutAction {
    pub fn command(self) -> Command {
        match self {
            Self::AddChild => Command::AddChild,
            Self::Delete => Command::Delete,
            Self::ToggleCompleted => Command::ToggleCompleted,
            Self::AutoArrange => Command::AutoArrange,
            Self::ClearMap => Command::ClearMap,
            Self::Confirm => Command::Confirm,
            Self::ZoomIn => Command::ZoomIn,
            Self::ZoomOut => Command::ZoomOut,
            Self::CenterOnRoot => Command::CenterOnRoot,
            Self::Deselect => Command::Deselect,
        }
    }
}

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘; elsewhere `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"x"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        _alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        if cmd && shift {
            return None;
        }

        if cmd {
            return match key {
                "l" | "L" => Some(ShortcutAction::AutoArrange),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::CenterOnRoot),
                "Delete" | "Backspace" => Some(ShortcutAction::ClearMap),
                _ => None,
            };
        }

        if shift {
            return None;
        }

        // ── Single keys (no modifiers) ──
        match key {
            "Tab" => Some(ShortcutAction::AddChild),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            "x" | "X" => Some(ShortcutAction::ToggleCompleted),
            "Enter" => Some(ShortcutAction::Confirm),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_edit_keys() {
        assert_eq!(
            ShortcutMap::resolve("Tab", false, false, false, false),
            Some(ShortcutAction::AddChild)
        );
        assert_eq!(
            ShortcutMap::resolve("x", false, false, false, false),
            Some(ShortcutAction::ToggleCompleted)
        );
        assert_eq!(
            ShortcutMap::resolve("Enter", false, false, false, false),
            Some(ShortcutAction::Confirm)
        );
    }

    #[test]
    fn resolve_delete() {
        assert_eq!(
            ShortcutMap::resolve("Delete", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        // ⌘Backspace clears the whole map
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, false, false, true),
            Some(ShortcutAction::ClearMap)
        );
    }

    #[test]
    fn resolve_view_keys() {
        // Cmd+= and Ctrl+= both zoom in
        assert_eq!(
            ShortcutMap::resolve("=", false, false, false, true),
            Some(ShortcutAction::ZoomIn)
        );
        assert_eq!(
            ShortcutMap::resolve("=", true, false, false, false),
            Some(ShortcutAction::ZoomIn)
        );
        assert_eq!(
            ShortcutMap::resolve("-", false, false, false, true),
            Some(ShortcutAction::ZoomOut)
        );
        assert_eq!(
            ShortcutMap::resolve("0", false, false, false, true),
            Some(ShortcutAction::CenterOnRoot)
        );
        assert_eq!(
            ShortcutMap::resolve("l", false, false, false, true),
            Some(ShortcutAction::AutoArrange)
        );
    }

    #[test]
    fn resolve_escape() {
        assert_eq!(
            ShortcutMap::resolve("Escape", false, false, false, false),
            Some(ShortcutAction::Deselect)
        );
    }

    #[test]
    fn unbound_keys_return_none() {
        assert_eq!(ShortcutMap::resolve("q", false, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("l", false, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("x", false, true, false, false), None);
        assert_eq!(ShortcutMap::resolve("l", false, true, false, true), None);
    }

    #[test]
    fn actions_map_to_commands() {
        assert_eq!(ShortcutAction::AutoArrange.command(), Command::AutoArrange);
        assert_eq!(ShortcutAction::Deselect.command(), Command::Deselect);
    }
}
