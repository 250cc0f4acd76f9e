//! Input events for canvas interaction.
//!
//! Pointer coordinates are client (window) pixels; the editor maps them into
//! canvas space with the current origin, pan and zoom.

use serde::{Deserialize, Serialize};

use crate::coords::Position;

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    #[serde(default)]
    pub shift: bool,
    /// Control key pressed.
    #[serde(default)]
    pub ctrl: bool,
    /// Alt/Option key pressed.
    #[serde(default)]
    pub alt: bool,
    /// Meta/Command key pressed.
    #[serde(default)]
    pub meta: bool,
}

impl KeyModifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Control only.
    pub const CTRL: Self = Self {
        shift: false,
        ctrl: true,
        alt: false,
        meta: false,
    };

    /// Control or Command, the platform "primary" modifier.
    #[must_use]
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// All input events the canvas can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Button pressed over the canvas.
    PointerDown {
        /// Client X coordinate.
        x: f64,
        /// Client Y coordinate.
        y: f64,
        /// Mouse button (0 = left, 1 = middle, 2 = right).
        #[serde(default)]
        button: u8,
    },

    /// Pointer moved.
    PointerMove {
        /// Client X coordinate.
        x: f64,
        /// Client Y coordinate.
        y: f64,
    },

    /// Button released.
    PointerUp {
        /// Client X coordinate.
        x: f64,
        /// Client Y coordinate.
        y: f64,
    },

    /// Pointer left the canvas or capture was lost.
    PointerLeave,

    /// Keyboard event.
    Key {
        /// Key name as reported by the platform, e.g. `"z"`, `"Escape"`, `" "`.
        key: String,
        /// Whether the key is pressed.
        pressed: bool,
        /// Active modifier keys.
        #[serde(default)]
        modifiers: KeyModifiers,
        /// Focus is inside a text field; shortcuts must not fire.
        #[serde(default)]
        in_text_input: bool,
    },

    /// Mouse wheel or trackpad scroll.
    Wheel {
        /// Client X coordinate.
        x: f64,
        /// Client Y coordinate.
        y: f64,
        /// Horizontal scroll delta.
        delta_x: f64,
        /// Vertical scroll delta.
        delta_y: f64,
        /// Active modifier keys.
        #[serde(default)]
        modifiers: KeyModifiers,
    },
}

impl InputEvent {
    /// Left-button press.
    #[must_use]
    pub fn down(x: f64, y: f64) -> Self {
        Self::PointerDown { x, y, button: 0 }
    }

    /// Pointer move.
    #[must_use]
    pub fn moved(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    /// Pointer release.
    #[must_use]
    pub fn up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    /// Key press outside any text field.
    #[must_use]
    pub fn key(key: &str, modifiers: KeyModifiers) -> Self {
        Self::Key {
            key: key.to_string(),
            pressed: true,
            modifiers,
            in_text_input: false,
        }
    }

    /// Key release.
    #[must_use]
    pub fn key_up(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            pressed: false,
            modifiers: KeyModifiers::NONE,
            in_text_input: false,
        }
    }

    /// Client position of a pointer or wheel event.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y }
            | Self::Wheel { x, y, .. } => Some(Position::new(*x, *y)),
            Self::PointerLeave | Self::Key { .. } => None,
        }
    }
}
