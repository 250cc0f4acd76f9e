//! Per-document canvas settings.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_REAL_HEIGHT_M, DEFAULT_REAL_WIDTH_M, GRID_SIZE_METERS};
use crate::coords::Size;
use crate::metrics::{calculate_canvas_metrics, CanvasMetrics, RealSize};

/// Plot dimensions, grid flags and the derived scale.
///
/// `pixels_per_meter` is never set directly: it follows from the canvas pixel
/// size and the plot size, and is recomputed by every setter that touches
/// either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    width_meters: f64,
    height_meters: f64,
    grid_size_meters: f64,
    show_grid: bool,
    snap_to_grid: bool,
    canvas_px: Size,
    pixels_per_meter: f64,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self::new(
            Size::new(1000.0, 600.0),
            RealSize::new(DEFAULT_REAL_WIDTH_M, DEFAULT_REAL_HEIGHT_M),
        )
    }
}

impl CanvasSettings {
    /// Settings for a `real`-sized plot drawn on a `canvas_px` canvas.
    #[must_use]
    pub fn new(canvas_px: Size, real: RealSize) -> Self {
        let mut settings = Self {
            width_meters: real.width,
            height_meters: real.height,
            grid_size_meters: GRID_SIZE_METERS,
            show_grid: true,
            snap_to_grid: false,
            canvas_px,
            pixels_per_meter: 1.0,
        };
        settings.recompute();
        settings
    }

    pub(crate) fn recompute(&mut self) {
        self.pixels_per_meter = self.metrics().pixels_per_meter;
    }

    /// Scale and grid metrics for the current sizes.
    #[must_use]
    pub fn metrics(&self) -> CanvasMetrics {
        calculate_canvas_metrics(
            self.canvas_px,
            Some(self.real_size()),
            RealSize::new(DEFAULT_REAL_WIDTH_M, DEFAULT_REAL_HEIGHT_M),
        )
    }

    /// Plot size in metres.
    #[must_use]
    pub fn real_size(&self) -> RealSize {
        RealSize::new(self.width_meters, self.height_meters)
    }

    /// Canvas size in pixels.
    #[must_use]
    pub fn canvas_px(&self) -> Size {
        self.canvas_px
    }

    /// Current scale.
    #[must_use]
    pub fn pixels_per_meter(&self) -> f64 {
        self.pixels_per_meter
    }

    /// Grid cell size in pixels.
    #[must_use]
    pub fn grid_size_pixels(&self) -> f64 {
        self.grid_size_meters * self.pixels_per_meter
    }

    /// Grid cell size in metres.
    #[must_use]
    pub fn grid_size_meters(&self) -> f64 {
        self.grid_size_meters
    }

    /// Whether the grid is drawn.
    #[must_use]
    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    /// Whether positions snap to the grid.
    #[must_use]
    pub fn snap_to_grid(&self) -> bool {
        self.snap_to_grid
    }

    /// Resize the plot. Returns the new scale. Non-positive sizes are ignored.
    pub fn set_real_size(&mut self, real: RealSize) -> f64 {
        if real.width > 0.0 && real.height > 0.0 {
            self.width_meters = real.width;
            self.height_meters = real.height;
            self.recompute();
        } else {
            tracing::warn!(?real, "Ignoring non-positive plot size");
        }
        self.pixels_per_meter
    }

    /// Resize the canvas. Returns the new scale. Non-positive sizes are ignored.
    pub fn set_canvas_px(&mut self, canvas_px: Size) -> f64 {
        if canvas_px.width > 0.0 && canvas_px.height > 0.0 {
            self.canvas_px = canvas_px;
            self.recompute();
        } else {
            tracing::warn!(?canvas_px, "Ignoring non-positive canvas size");
        }
        self.pixels_per_meter
    }

    /// Show or hide the grid.
    pub fn set_show_grid(&mut self, show: bool) {
        self.show_grid = show;
    }

    /// Flip grid visibility. Returns the new value.
    pub fn toggle_grid(&mut self) -> bool {
        self.show_grid = !self.show_grid;
        self.show_grid
    }

    /// Enable or disable snapping.
    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.snap_to_grid = snap;
    }
}
