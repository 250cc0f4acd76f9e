//! Plan export to image formats.
//!
//! Renders a [`Scene`] to PNG or JPEG through the SVG intermediate and the
//! resvg/tiny-skia rasterisation pipeline.

use garden_core::Scene;
use image::ImageEncoder;

use crate::error::{RenderError, RenderResult};
use crate::guard::ExportLock;
use crate::options::{ExportFormat, ExportOptions};
use crate::svg::render_svg;

/// Exports plans, one at a time.
#[derive(Debug, Default)]
pub struct SceneExporter {
    lock: ExportLock,
}

impl SceneExporter {
    /// Create an idle exporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an export is running.
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.lock.is_busy()
    }

    /// Export `scene` as described by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Busy`] if another export is running,
    /// [`RenderError::InvalidScale`] or [`RenderError::EmptySelection`] for bad
    /// options, and [`RenderError::Export`] if rasterising or encoding fails.
    pub fn export(&self, scene: &Scene, options: &ExportOptions) -> RenderResult<Vec<u8>> {
        let _guard = self.lock.try_acquire()?;
        options.validate()?;
        let region = options.resolve_region(scene)?;
        tracing::info!(
            format = %options.format,
            scale = options.scale,
            elements = scene.element_count(),
            "Exporting plan"
        );

        let svg = render_svg(scene, region, options)?;
        match options.format {
            ExportFormat::Svg => Ok(svg.into_bytes()),
            ExportFormat::Png => rasterize_svg(&svg)?
                .encode_png()
                .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}"))),
            ExportFormat::Jpeg => encode_jpeg(&rasterize_svg(&svg)?, options),
        }
    }
}

/// Flatten onto the background and encode as JPEG.
fn encode_jpeg(pixmap: &tiny_skia::Pixmap, options: &ExportOptions) -> RenderResult<Vec<u8>> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let bg = options.background;
    let mut rgb = Vec::with_capacity(pixmap.data().len() / 4 * 3);
    // tiny-skia stores premultiplied RGBA.
    for pixel in pixmap.data().chunks_exact(4) {
        let inv = 255 - u16::from(pixel[3]);
        for channel in 0..3 {
            let value = u16::from(pixel[channel]) + u16::from(bg[channel]) * inv / 255;
            rgb.push(u8::try_from(value.min(255)).unwrap_or(u8::MAX));
        }
    }

    let mut buf = std::io::Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
        &mut buf,
        options.jpeg_quality.clamp(1, 100),
    );
    encoder
        .write_image(&rgb, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;

    Ok(buf.into_inner())
}

/// Rasterise an SVG string to a tiny-skia pixmap.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rasterize_svg(svg: &str) -> RenderResult<tiny_skia::Pixmap> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| RenderError::Export(format!("SVG parsing failed: {e}")))?;

    let px_w = tree.size().width().ceil() as u32;
    let px_h = tree.size().height().ceil() as u32;

    let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
        .ok_or_else(|| RenderError::Export("Failed to create pixmap".to_string()))?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    Ok(pixmap)
}
