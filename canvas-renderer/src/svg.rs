//! SVG intermediate for exports.
//!
//! The plan is drawn in canvas space and the `viewBox` selects the exported
//! region, so the same markup serves whole-plot and region exports. Hover and
//! selection styling is never drawn.

use std::fmt::{self, Write};

use garden_core::coords::rect_in_viewport;
use garden_core::geometry::get_element_bounds;
use garden_core::{Bounds, Element, ElementKind, Scene, TerrainShape};

use crate::error::RenderResult;
use crate::options::{plot_bounds, ExportOptions};

/// Major grid lines fall on every fifth minor line.
const MAJOR_GRID_EVERY: usize = 5;
const MINOR_GRID: &str = "stroke=\"#cbd5e1\" stroke-opacity=\"0.5\" stroke-width=\"1\"";
const MAJOR_GRID: &str = "stroke=\"#94a3b8\" stroke-opacity=\"0.8\" stroke-width=\"2\"";
const SHAPE_FILL: &str = "#e2e8f0";
const SHAPE_STROKE: &str = "#64748b";

/// Render `scene` as SVG covering `region` at `options.scale`.
///
/// # Errors
///
/// Returns [`crate::RenderError::Markup`] if formatting the markup fails.
pub fn render_svg(scene: &Scene, region: Bounds, options: &ExportOptions) -> RenderResult<String> {
    let mut svg = String::with_capacity(4096);
    write_document(&mut svg, scene, region, options)?;
    Ok(svg)
}

fn write_document(
    svg: &mut String,
    scene: &Scene,
    region: Bounds,
    options: &ExportOptions,
) -> fmt::Result {
    let (out_w, out_h) = output_size(region, options.scale);
    write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"{} {} {} {}\">",
        region.x, region.y, region.width, region.height,
    )?;

    let bg = options.background;
    write!(
        svg,
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"rgb({},{},{})\" fill-opacity=\"{}\"/>",
        region.x,
        region.y,
        region.width,
        region.height,
        bg[0],
        bg[1],
        bg[2],
        f64::from(bg[3]) / 255.0,
    )?;

    if scene.settings().show_grid() {
        render_grid(svg, scene)?;
    }

    let ppm = scene.settings().pixels_per_meter();
    for element in scene.elements() {
        if rect_in_viewport(&get_element_bounds(element, ppm), &region, 0.0) {
            render_element(svg, element, ppm)?;
        }
    }

    svg.push_str("</svg>");
    Ok(())
}

/// Output pixel size for `region` at `scale`, at least 1×1.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn output_size(region: Bounds, scale: u32) -> (u32, u32) {
    let scale = f64::from(scale);
    let w = (region.width * scale).round().max(1.0) as u32;
    let h = (region.height * scale).round().max(1.0) as u32;
    (w, h)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn render_grid(svg: &mut String, scene: &Scene) -> fmt::Result {
    let step = scene.settings().grid_size_pixels();
    if step <= 0.0 || !step.is_finite() {
        return Ok(());
    }
    let plot = plot_bounds(scene);

    let columns = (plot.width / step + 1e-9).floor() as usize;
    for i in 0..=columns {
        let x = i as f64 * step;
        let style = if i % MAJOR_GRID_EVERY == 0 { MAJOR_GRID } else { MINOR_GRID };
        write!(
            svg,
            "<line x1=\"{x}\" y1=\"0\" x2=\"{x}\" y2=\"{}\" {style}/>",
            plot.height,
        )?;
    }

    let rows = (plot.height / step + 1e-9).floor() as usize;
    for i in 0..=rows {
        let y = i as f64 * step;
        let style = if i % MAJOR_GRID_EVERY == 0 { MAJOR_GRID } else { MINOR_GRID };
        write!(
            svg,
            "<line x1=\"0\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" {style}/>",
            plot.width,
        )?;
    }
    Ok(())
}

fn render_element(svg: &mut String, element: &Element, ppm: f64) -> fmt::Result {
    let mut attrs = String::new();
    if element.opacity < 1.0 {
        write!(attrs, " opacity=\"{}\"", element.opacity.max(0.0))?;
    }
    if element.rotation.abs() > f64::EPSILON {
        let center = get_element_bounds(element, ppm).center();
        write!(
            attrs,
            " transform=\"rotate({} {} {})\"",
            element.rotation, center.x, center.y,
        )?;
    }

    match &element.kind {
        ElementKind::Plant { entry } => {
            let size = entry.real_size().to_pixels(ppm);
            let radius = size.width.max(size.height) / 2.0;
            let color = escape_xml(&entry.color);
            write!(
                svg,
                "<g{attrs}><circle cx=\"{}\" cy=\"{}\" r=\"{radius}\" fill=\"{color}\" fill-opacity=\"0.25\" stroke=\"{color}\" stroke-width=\"2\"/>\
                 <circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{color}\"/></g>",
                element.x,
                element.y,
                element.x,
                element.y,
                radius.min(4.0),
            )?;
        }
        ElementKind::Rectangle { width, height } => {
            write!(
                svg,
                "<rect x=\"{}\" y=\"{}\" width=\"{width}\" height=\"{height}\" fill=\"{SHAPE_FILL}\" stroke=\"{SHAPE_STROKE}\" stroke-width=\"2\"{attrs}/>",
                element.x, element.y,
            )?;
        }
        ElementKind::Circle { radius } => {
            write!(
                svg,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{radius}\" fill=\"{SHAPE_FILL}\" stroke=\"{SHAPE_STROKE}\" stroke-width=\"2\"{attrs}/>",
                element.x + radius,
                element.y + radius,
            )?;
        }
        ElementKind::Terrain { entry, shape } => {
            let color = escape_xml(&entry.color);
            match shape {
                TerrainShape::Rect { width, height, .. } => {
                    write!(
                        svg,
                        "<rect x=\"{}\" y=\"{}\" width=\"{width}\" height=\"{height}\" fill=\"{color}\" fill-opacity=\"0.6\"{attrs}/>",
                        element.x, element.y,
                    )?;
                }
                TerrainShape::Circle { radius, .. } => {
                    write!(
                        svg,
                        "<circle cx=\"{}\" cy=\"{}\" r=\"{radius}\" fill=\"{color}\" fill-opacity=\"0.6\"{attrs}/>",
                        element.x + radius,
                        element.y + radius,
                    )?;
                }
                TerrainShape::Path {
                    points, thickness, ..
                } => {
                    if points.is_empty() {
                        return Ok(());
                    }
                    let mut coords = String::new();
                    for p in points {
                        write!(coords, "{},{} ", p.x, p.y)?;
                    }
                    write!(
                        svg,
                        "<polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{thickness}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"{attrs}/>",
                        coords.trim_end(),
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use garden_core::{CanvasSettings, CatalogEntry, Position, RealSize, Size};

    fn scene() -> Scene {
        let mut settings = CanvasSettings::new(Size::new(1000.0, 800.0), RealSize::new(50.0, 30.0));
        settings.set_show_grid(false);
        Scene::new(settings)
    }

    fn entry(color: &str, size: &str) -> CatalogEntry {
        CatalogEntry {
            id: "bed".to_string(),
            name: "Bed".to_string(),
            category: "ground".to_string(),
            color: color.to_string(),
            size: size.to_string(),
            description: String::new(),
        }
    }

    fn svg_for(scene: &Scene) -> String {
        let options = ExportOptions {
            scale: 1,
            ..ExportOptions::default()
        };
        render_svg(scene, plot_bounds(scene), &options).expect("svg")
    }

    #[test]
    fn test_empty_plot() {
        let svg = svg_for(&scene());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("width=\"1000\""));
        assert!(svg.contains("height=\"600\""));
        assert!(!svg.contains("<line"));
    }

    #[test]
    fn test_formatter_errors_become_markup_errors() {
        let err = crate::RenderError::from(fmt::Error);
        assert!(matches!(err, crate::RenderError::Markup(_)));
        assert_eq!(err.to_string(), "SVG markup could not be written");
    }

    #[test]
    fn test_scale_multiplies_output_not_viewbox() {
        let scene = scene();
        let options = ExportOptions {
            scale: 3,
            ..ExportOptions::default()
        };
        let svg = render_svg(&scene, Bounds::new(10.0, 20.0, 100.0, 50.0), &options).expect("svg");
        assert!(svg.contains("width=\"300\""));
        assert!(svg.contains("height=\"150\""));
        assert!(svg.contains("viewBox=\"10 20 100 50\""));
    }

    #[test]
    fn test_grid_lines() {
        let mut scene = scene();
        scene.set_show_grid(true);
        let svg = svg_for(&scene);
        // 40 px grid over 1000 × 600: 26 columns and 16 rows.
        assert_eq!(svg.matches("<line").count(), 26 + 16);
        assert_eq!(svg.matches("#94a3b8").count(), 6 + 4);
    }

    #[test]
    fn test_elements_in_paint_order() {
        let mut scene = scene();
        scene.add_element(Element::rectangle(Position::new(10.0, 10.0), 30.0, 20.0));
        scene.add_element(Element::circle(Position::new(100.0, 100.0), 15.0));
        let svg = svg_for(&scene);

        let rect = svg.find("<rect x=\"10\"").expect("rect drawn");
        let circle = svg.find("<circle cx=\"115\" cy=\"115\" r=\"15\"").expect("circle drawn");
        assert!(rect < circle);
    }

    #[test]
    fn test_terrain_uses_catalog_colour() {
        let mut scene = scene();
        let ppm = scene.settings().pixels_per_meter();
        scene.add_element(Element::terrain_rect(
            entry("#16a34a", "2x1m"),
            Position::new(0.0, 0.0),
            RealSize::new(2.0, 1.0),
            ppm,
        ));
        scene.add_element(
            Element::terrain_path(
                entry("#a8a29e", "1m"),
                vec![Position::new(0.0, 100.0), Position::new(50.0, 100.0)],
                20.0,
                ppm,
            )
            .expect("trail"),
        );
        let svg = svg_for(&scene);
        assert!(svg.contains("width=\"40\" height=\"20\" fill=\"#16a34a\""));
        assert!(svg.contains("<polyline points=\"0,100 50,100\""));
        assert!(svg.contains("stroke-width=\"20\""));
    }

    #[test]
    fn test_plant_spacing_circle() {
        let mut scene = scene();
        scene.add_element(Element::plant(
            entry("#22c55e", "50cm"),
            Position::new(200.0, 200.0),
        ));
        let svg = svg_for(&scene);
        assert!(svg.contains("<circle cx=\"200\" cy=\"200\" r=\"5\""));
    }

    #[test]
    fn test_region_skips_outside_elements() {
        let mut scene = scene();
        scene.add_element(Element::rectangle(Position::new(10.0, 10.0), 30.0, 20.0));
        scene.add_element(Element::rectangle(Position::new(700.0, 500.0), 30.0, 20.0));
        let options = ExportOptions {
            scale: 1,
            ..ExportOptions::default()
        };
        let svg = render_svg(&scene, Bounds::new(0.0, 0.0, 100.0, 100.0), &options).expect("svg");
        assert!(svg.contains("<rect x=\"10\""));
        assert!(!svg.contains("<rect x=\"700\""));
    }

    #[test]
    fn test_selection_is_not_styled() {
        let mut scene = scene();
        let id = scene.add_element(Element::rectangle(Position::new(10.0, 10.0), 30.0, 20.0));
        let plain = svg_for(&scene);
        scene.select(id).expect("select");
        scene.set_hovered(Some(id));
        assert_eq!(svg_for(&scene), plain);
    }

    #[test]
    fn test_rotation_and_opacity() {
        let mut scene = scene();
        let mut rect = Element::rectangle(Position::new(0.0, 0.0), 20.0, 10.0);
        rect.rotation = 45.0;
        rect.opacity = 0.5;
        scene.add_element(rect);
        let svg = svg_for(&scene);
        assert!(svg.contains("opacity=\"0.5\""));
        assert!(svg.contains("transform=\"rotate(45 10 5)\""));
    }

    #[test]
    fn test_xml_escaping() {
        let mut scene = scene();
        let ppm = scene.settings().pixels_per_meter();
        scene.add_element(Element::terrain_rect(
            entry("\"><script>", "1m"),
            Position::new(0.0, 0.0),
            RealSize::new(1.0, 1.0),
            ppm,
        ));
        let svg = svg_for(&scene);
        assert!(svg.contains("&quot;&gt;&lt;script&gt;"));
        assert!(!svg.contains("<script>"));
    }
}
