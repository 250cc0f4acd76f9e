//! Keyboard shortcut registry.
//!
//! Bindings are keyed by `(lowercased key, ctrl, shift, alt)`. Meta is folded
//! into ctrl so one binding covers both platforms. Dispatch is refused while
//! focus sits in a text field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::KeyModifiers;
use crate::tool::Tool;

/// A modifier combination plus key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortcutKey {
    /// Lowercased key name.
    pub key: String,
    /// Ctrl or Meta.
    pub ctrl: bool,
    /// Shift.
    pub shift: bool,
    /// Alt.
    pub alt: bool,
}

impl ShortcutKey {
    /// Build a key, lowercasing the key name.
    #[must_use]
    pub fn new(key: &str, ctrl: bool, shift: bool, alt: bool) -> Self {
        Self {
            key: key.to_lowercase(),
            ctrl,
            shift,
            alt,
        }
    }

    /// Plain key with no modifiers.
    #[must_use]
    pub fn plain(key: &str) -> Self {
        Self::new(key, false, false, false)
    }

    /// Ctrl (or Meta) + key.
    #[must_use]
    pub fn ctrl(key: &str) -> Self {
        Self::new(key, true, false, false)
    }

    /// Key from a keyboard event.
    #[must_use]
    pub fn from_event(key: &str, modifiers: KeyModifiers) -> Self {
        Self::new(key, modifiers.primary(), modifiers.shift, modifiers.alt)
    }
}

impl std::fmt::Display for ShortcutKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ctrl {
            f.write_str("ctrl+")?;
        }
        if self.shift {
            f.write_str("shift+")?;
        }
        if self.alt {
            f.write_str("alt+")?;
        }
        f.write_str(&self.key)
    }
}

/// Handlers keyed by modifier combination.
#[derive(Debug, Clone)]
pub struct ShortcutRegistry<H> {
    bindings: HashMap<ShortcutKey, H>,
}

impl<H> Default for ShortcutRegistry<H> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<H> ShortcutRegistry<H> {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler`, replacing any earlier binding. Returns the key to
    /// pass to [`ShortcutRegistry::unregister`].
    pub fn register(&mut self, key: ShortcutKey, handler: H) -> ShortcutKey {
        if self.bindings.insert(key.clone(), handler).is_some() {
            tracing::debug!(shortcut = %key, "Replaced shortcut binding");
        }
        key
    }

    /// Remove a binding by key alone.
    pub fn unregister(&mut self, key: &ShortcutKey) -> Option<H> {
        self.bindings.remove(key)
    }

    /// Handler for a key press, unless focus is in a text field.
    #[must_use]
    pub fn dispatch(&self, key: &str, modifiers: KeyModifiers, in_text_input: bool) -> Option<&H> {
        if in_text_input {
            return None;
        }
        self.bindings.get(&ShortcutKey::from_event(key, modifiers))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Editor commands reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Undo the last change.
    Undo,
    /// Redo the last undone change.
    Redo,
    /// Zoom in one step.
    ZoomIn,
    /// Zoom out one step.
    ZoomOut,
    /// Back to 100% and no pan.
    ResetZoom,
    /// Show or hide the grid.
    ToggleGrid,
    /// Abort the current gesture and clear the selection.
    Cancel,
    /// Remove selected elements.
    DeleteSelected,
    /// Select every element.
    SelectAll,
    /// Copy the selection to the editor clipboard.
    Copy,
    /// Paste the clipboard, offset from the last paste.
    Paste,
    /// Copy and paste the selection in one step.
    Duplicate,
    /// Ask the host to export.
    Export,
    /// Switch tool.
    SelectTool(Tool),
}

impl ShortcutRegistry<Command> {
    /// Registry preloaded with the default editor bindings.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ShortcutKey::ctrl("z"), Command::Undo);
        registry.register(ShortcutKey::ctrl("y"), Command::Redo);
        registry.register(ShortcutKey::new("z", true, true, false), Command::Redo);
        registry.register(ShortcutKey::plain("+"), Command::ZoomIn);
        // '+' usually arrives with shift held.
        registry.register(ShortcutKey::new("+", false, true, false), Command::ZoomIn);
        registry.register(ShortcutKey::plain("="), Command::ZoomIn);
        registry.register(ShortcutKey::plain("-"), Command::ZoomOut);
        registry.register(ShortcutKey::plain("0"), Command::ResetZoom);
        registry.register(ShortcutKey::plain("g"), Command::ToggleGrid);
        registry.register(ShortcutKey::plain("escape"), Command::Cancel);
        registry.register(ShortcutKey::plain("delete"), Command::DeleteSelected);
        registry.register(ShortcutKey::plain("backspace"), Command::DeleteSelected);
        registry.register(ShortcutKey::ctrl("a"), Command::SelectAll);
        registry.register(ShortcutKey::ctrl("c"), Command::Copy);
        registry.register(ShortcutKey::ctrl("v"), Command::Paste);
        registry.register(ShortcutKey::ctrl("d"), Command::Duplicate);
        registry.register(ShortcutKey::ctrl("e"), Command::Export);
        for tool in Tool::ALL {
            registry.register(ShortcutKey::plain(tool.shortcut()), Command::SelectTool(tool));
        }
        registry
    }
}
