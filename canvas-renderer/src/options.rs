//! Export options.

use std::fmt;
use std::str::FromStr;

use garden_core::geometry::get_element_bounds;
use garden_core::{Bounds, Scene};

use crate::error::{RenderError, RenderResult};

/// Largest supported scale multiplier.
pub const MAX_SCALE: u32 = 8;

/// Export output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// PNG image.
    #[default]
    Png,
    /// JPEG image, composited onto the background colour.
    Jpeg,
    /// The SVG intermediate as UTF-8 bytes.
    Svg,
}

impl ExportFormat {
    /// Conventional file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Svg => "svg",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            other => Err(RenderError::UnknownFormat(other.to_string())),
        }
    }
}

/// Configuration for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Pixel multiplier, 1 to 8.
    pub scale: u32,
    /// Output format.
    pub format: ExportFormat,
    /// Canvas-space area to export. `None` exports the whole plot.
    pub region: Option<Bounds>,
    /// Background colour as RGBA bytes.
    pub background: [u8; 4],
    /// JPEG quality 1-100.
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: 2,
            format: ExportFormat::Png,
            region: None,
            background: [255, 255, 255, 255],
            jpeg_quality: 90,
        }
    }
}

impl ExportOptions {
    /// Check the scale multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidScale`] outside 1..=8.
    pub fn validate(&self) -> RenderResult<()> {
        if (1..=MAX_SCALE).contains(&self.scale) {
            Ok(())
        } else {
            Err(RenderError::InvalidScale(self.scale))
        }
    }

    /// Canvas-space area this export covers.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptySelection`] if the region has no area.
    pub fn resolve_region(&self, scene: &Scene) -> RenderResult<Bounds> {
        let region = self.region.unwrap_or_else(|| plot_bounds(scene));
        if region.width > 0.0 && region.height > 0.0 {
            Ok(region)
        } else {
            Err(RenderError::EmptySelection)
        }
    }
}

/// The whole plot in canvas pixels.
#[must_use]
pub fn plot_bounds(scene: &Scene) -> Bounds {
    let size = scene
        .settings()
        .real_size()
        .to_pixels(scene.settings().pixels_per_meter());
    Bounds::new(0.0, 0.0, size.width, size.height)
}

/// Union of the selected elements' bounds, for "export selection".
///
/// # Errors
///
/// Returns [`RenderError::EmptySelection`] if nothing is selected.
pub fn selection_bounds(scene: &Scene) -> RenderResult<Bounds> {
    let ppm = scene.settings().pixels_per_meter();
    scene
        .selected_elements()
        .map(|e| get_element_bounds(e, ppm))
        .reduce(|a, b| {
            let x = a.x.min(b.x);
            let y = a.y.min(b.y);
            Bounds::new(x, y, a.right().max(b.right()) - x, a.bottom().max(b.bottom()) - y)
        })
        .ok_or(RenderError::EmptySelection)
}
