//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The map lives
//! in Rust so the WASM bridge and native hosts agree on it.

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Abandon the current drag or connection draft.
    Cancel,
    /// Delete the selected block or connection.
    Delete,
    /// Split the selected stack back into its blocks.
    Unstack,
    BringToFront,
}

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘; elsewhere `ctrl` plays the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"g"`, `"Delete"`).
    /// Returns `None` if the combo has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, _alt: bool, meta: bool) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        if cmd && shift {
            return match key {
                "g" | "G" => Some(ShortcutAction::Unstack),
                "]" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return None;
        }

        match key {
            "Escape" => Some(ShortcutAction::Cancel),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            _ => None,
        }
    }
}
