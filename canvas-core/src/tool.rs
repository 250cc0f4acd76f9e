//! Editing tools.

use serde::{Deserialize, Serialize};

/// How the terrain tool lays down a patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushMode {
    /// Drag out a rectangle.
    #[default]
    Rectangle,
    /// Drag out a circle.
    Circle,
    /// Click to place a straight trail of the catalog length.
    Path,
    /// Freehand trail.
    Brush,
}

/// The active editing tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Select, drag and resize elements.
    #[default]
    Select,
    /// Pan the view.
    Move,
    /// Draw plain rectangles.
    Rectangle,
    /// Draw plain circles.
    Circle,
    /// Paint terrain from the active terrain entry.
    Terrain,
    /// Place the active plant.
    Plant,
    /// Remove elements by clicking them.
    Delete,
}

impl Tool {
    /// Tool bound to a single-letter shortcut.
    #[must_use]
    pub fn from_shortcut(key: &str) -> Option<Self> {
        Some(match key {
            "s" => Self::Select,
            "m" => Self::Move,
            "r" => Self::Rectangle,
            "c" => Self::Circle,
            "t" => Self::Terrain,
            "p" => Self::Plant,
            "d" => Self::Delete,
            _ => return None,
        })
    }

    /// The shortcut letter for this tool.
    #[must_use]
    pub fn shortcut(self) -> &'static str {
        match self {
            Self::Select => "s",
            Self::Move => "m",
            Self::Rectangle => "r",
            Self::Circle => "c",
            Self::Terrain => "t",
            Self::Plant => "p",
            Self::Delete => "d",
        }
    }

    /// All tools in toolbar order.
    pub const ALL: [Self; 7] = [
        Self::Select,
        Self::Move,
        Self::Rectangle,
        Self::Circle,
        Self::Terrain,
        Self::Plant,
        Self::Delete,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_letters_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_shortcut(tool.shortcut()), Some(tool));
        }
        assert_eq!(Tool::from_shortcut("x"), None);
    }
}
