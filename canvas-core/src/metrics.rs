//! Real-world units: spacing strings, pixels-per-metre and grid metrics.

use serde::{Deserialize, Serialize};

use crate::consts::GRID_SIZE_METERS;
use crate::coords::Size;

/// A size in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealSize {
    /// Width in metres.
    pub width: f64,
    /// Height in metres.
    pub height: f64,
}

impl RealSize {
    /// Create a new real-world size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Pixel size at the given scale.
    #[must_use]
    pub fn to_pixels(self, pixels_per_meter: f64) -> Size {
        Size::new(
            self.width * pixels_per_meter,
            self.height * pixels_per_meter,
        )
    }

    /// Real-world size of a pixel extent at the given scale.
    #[must_use]
    pub fn from_pixels(size: Size, pixels_per_meter: f64) -> Self {
        Self::new(size.width / pixels_per_meter, size.height / pixels_per_meter)
    }
}

impl Default for RealSize {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Parse a catalog spacing/size string into metres.
///
/// Accepts `"30x30cm"`, `"1x1m"`, `"2x3"` (metres), `"50cm"` and `"2m"`.
/// Anything else logs a warning and yields 1m × 1m.
#[must_use]
pub fn parse_spacing(spacing: &str) -> RealSize {
    if let Some(size) = try_parse_spacing(spacing) {
        return size;
    }
    tracing::warn!("Unrecognized spacing format: {spacing:?}, defaulting to 1x1m");
    RealSize::default()
}

fn try_parse_spacing(spacing: &str) -> Option<RealSize> {
    let compact: String = spacing
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let (body, unit, explicit_unit) = if let Some(body) = compact.strip_suffix("cm") {
        (body, 0.01, true)
    } else if let Some(body) = compact.strip_suffix('m') {
        (body, 1.0, true)
    } else {
        (compact.as_str(), 1.0, false)
    };

    let mut dims = body.split(['x', '×']);
    let first = parse_dimension(dims.next()?)?;
    let size = match dims.next() {
        Some(second) => RealSize::new(first, parse_dimension(second)?),
        // A bare number has no unit to anchor it.
        None if explicit_unit => RealSize::new(first, first),
        None => return None,
    };
    if dims.next().is_some() {
        return None;
    }

    Some(RealSize::new(size.width * unit, size.height * unit))
}

fn parse_dimension(text: &str) -> Option<f64> {
    let value: f64 = text.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Human-readable size, e.g. `"30cm"`, `"2m"` or `"1m×50cm"`.
#[must_use]
pub fn format_real_size(size: RealSize) -> String {
    fn one(value: f64) -> String {
        if value < 1.0 {
            format!("{}cm", (value * 100.0 * 100.0).round() / 100.0)
        } else {
            format!("{value}m")
        }
    }

    if (size.width - size.height).abs() < f64::EPSILON {
        one(size.width)
    } else {
        format!("{}×{}", one(size.width), one(size.height))
    }
}

/// Scale and grid metrics derived from the canvas element and plot size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasMetrics {
    /// Uniform scale fitting the plot into the canvas.
    pub pixels_per_meter: f64,
    /// Grid cell size in metres.
    pub grid_size_meters: f64,
    /// Grid cell size in pixels.
    pub grid_size_pixels: f64,
    /// Whole grid cells across.
    pub max_horizontal_grids: u32,
    /// Whole grid cells down.
    pub max_vertical_grids: u32,
}

/// Compute the pixels-per-metre scale and grid for a canvas.
///
/// `requested` wins over `fallback` when present. The scale is the smaller of
/// the two axis ratios so the whole plot fits without distortion.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn calculate_canvas_metrics(
    canvas_px: Size,
    requested: Option<RealSize>,
    fallback: RealSize,
) -> CanvasMetrics {
    let real = requested.unwrap_or(fallback);
    let pixels_per_meter = (canvas_px.width / real.width).min(canvas_px.height / real.height);

    CanvasMetrics {
        pixels_per_meter,
        grid_size_meters: GRID_SIZE_METERS,
        grid_size_pixels: GRID_SIZE_METERS * pixels_per_meter,
        max_horizontal_grids: (real.width / GRID_SIZE_METERS).floor().max(0.0) as u32,
        max_vertical_grids: (real.height / GRID_SIZE_METERS).floor().max(0.0) as u32,
    }
}
