//! Coordinate spaces and the transforms between them.
//!
//! Three spaces are in play:
//!
//! ```text
//! client (browser px) ──(- origin rect)──► screen-local ──(- pan, / zoom)──► canvas-local px
//!                                                                        ──(/ ppm)──► metres
//! ```
//!
//! Pan is applied in screen space *before* the zoom scale. Any renderer that
//! draws the plan must composite `translate(pan) scale(zoom)` in that order,
//! otherwise hit-testing drifts away from what is on screen.

use serde::{Deserialize, Serialize};

use crate::consts::VIEWPORT_BUFFER_PX;

/// A point in screen or canvas-local pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Component-wise sum.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in canvas-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Bounds {
    /// Create bounds from origin and extent.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x && pos.x <= self.right() && pos.y >= self.y && pos.y <= self.bottom()
    }

    /// Separating-axis overlap test. Touching edges count as overlapping.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }

    /// Grow the rectangle by `amount` on every side.
    #[must_use]
    pub fn expand(&self, amount: f64) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }
}

/// Convert a client (browser) position to canvas-local pixels.
///
/// `origin` is the top-left of the canvas element on screen, `zoom_percent`
/// is 100 for 1:1 and `pan` is in screen pixels.
#[must_use]
pub fn screen_to_canvas(
    client: Position,
    origin: Position,
    zoom_percent: f64,
    pan: Position,
) -> Position {
    let scale = zoom_percent / 100.0;
    Position::new(
        (client.x - origin.x - pan.x) / scale,
        (client.y - origin.y - pan.y) / scale,
    )
}

/// Inverse of [`screen_to_canvas`].
#[must_use]
pub fn canvas_to_screen(
    canvas: Position,
    origin: Position,
    zoom_percent: f64,
    pan: Position,
) -> Position {
    let scale = zoom_percent / 100.0;
    Position::new(
        canvas.x * scale + pan.x + origin.x,
        canvas.y * scale + pan.y + origin.y,
    )
}

/// Round each axis to the nearest multiple of `grid_size_px` when enabled.
#[must_use]
pub fn snap_to_grid(pos: Position, grid_size_px: f64, enabled: bool) -> Position {
    if !enabled || grid_size_px <= 0.0 || !grid_size_px.is_finite() {
        return pos;
    }
    Position::new(
        (pos.x / grid_size_px).round() * grid_size_px,
        (pos.y / grid_size_px).round() * grid_size_px,
    )
}

/// Metres to pixels at the given scale.
#[must_use]
pub fn meters_to_pixels(meters: f64, pixels_per_meter: f64) -> f64 {
    meters * pixels_per_meter
}

/// Pixels to metres at the given scale.
#[must_use]
pub fn pixels_to_meters(pixels: f64, pixels_per_meter: f64) -> f64 {
    pixels / pixels_per_meter
}

/// Visible canvas-space rectangle for a canvas of `canvas_px` on screen.
#[must_use]
pub fn calculate_viewport(canvas_px: Size, zoom_percent: f64, pan: Position) -> Bounds {
    let scale = zoom_percent / 100.0;
    Bounds::new(
        -pan.x / scale,
        -pan.y / scale,
        canvas_px.width / scale,
        canvas_px.height / scale,
    )
}

/// Whether `rect` overlaps `viewport` grown by `buffer` pixels.
#[must_use]
pub fn rect_in_viewport(rect: &Bounds, viewport: &Bounds, buffer: f64) -> bool {
    rect.intersects(&viewport.expand(buffer))
}

/// Whether `rect` overlaps the viewport with the default render buffer.
#[must_use]
pub fn rect_near_viewport(rect: &Bounds, viewport: &Bounds) -> bool {
    rect_in_viewport(rect, viewport, VIEWPORT_BUFFER_PX)
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Position, b: Position) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Smallest rectangle containing every point. Empty input yields zero bounds.
#[must_use]
pub fn points_bounds(points: &[Position]) -> Bounds {
    let Some(first) = points.first() else {
        return Bounds::default();
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

/// Shortest distance from `point` to the segment `a`-`b`.
#[must_use]
pub fn distance_to_segment(point: Position, a: Position, b: Position) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(point, a);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    distance(point, Position::new(a.x + t * dx, a.y + t * dy))
}
