//! Zoom and pan state.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use crate::coords::{screen_to_canvas, Position};

/// Zoom limits and step, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    /// Lowest zoom percentage.
    pub min: f64,
    /// Highest zoom percentage.
    pub max: f64,
    /// Increment for zoom in/out.
    pub step: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
            step: ZOOM_STEP,
        }
    }
}

/// Current zoom percentage and pan offset.
///
/// `pan_offset` is in screen pixels and is applied before the zoom scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    /// Zoom percentage (100 = 1:1).
    pub zoom: f64,
    /// Pan offset in screen pixels.
    pub pan_offset: Position,
    /// Lowest zoom percentage.
    pub min_zoom: f64,
    /// Highest zoom percentage.
    pub max_zoom: f64,
    /// Increment for zoom in/out.
    pub zoom_step: f64,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

impl ZoomState {
    /// Create a zoom state at 100% with no pan.
    #[must_use]
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            zoom: DEFAULT_ZOOM.clamp(limits.min, limits.max),
            pan_offset: Position::default(),
            min_zoom: limits.min,
            max_zoom: limits.max,
            zoom_step: limits.step,
        }
    }

    /// Zoom as a scale factor.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.zoom / 100.0
    }

    /// Set the zoom percentage, clamped to the limits. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.zoom
    }

    /// Step the zoom up.
    pub fn zoom_in(&mut self) -> f64 {
        self.set_zoom(self.zoom + self.zoom_step)
    }

    /// Step the zoom down.
    pub fn zoom_out(&mut self) -> f64 {
        self.set_zoom(self.zoom - self.zoom_step)
    }

    /// Whether zooming in would change anything.
    #[must_use]
    pub fn can_zoom_in(&self) -> bool {
        self.zoom < self.max_zoom
    }

    /// Whether zooming out would change anything.
    #[must_use]
    pub fn can_zoom_out(&self) -> bool {
        self.zoom > self.min_zoom
    }

    /// Back to 100% and no pan.
    pub fn reset(&mut self) {
        self.set_zoom(DEFAULT_ZOOM);
        self.pan_offset = Position::default();
    }

    /// Shift the pan offset by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_offset.x += dx;
        self.pan_offset.y += dy;
    }

    /// Zoom to `new_zoom` keeping the canvas point under `anchor` in place.
    ///
    /// `anchor` is screen-local (already relative to the canvas origin).
    pub fn zoom_at(&mut self, anchor: Position, new_zoom: f64) -> f64 {
        let before = screen_to_canvas(anchor, Position::default(), self.zoom, self.pan_offset);
        let applied = self.set_zoom(new_zoom);
        let scale = applied / 100.0;
        self.pan_offset = Position::new(anchor.x - before.x * scale, anchor.y - before.y * scale);
        applied
    }

    /// Display label, e.g. `"125%"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}%", self.zoom.round())
    }
}
