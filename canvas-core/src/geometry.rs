//! Bounds, hit-testing and resize math for plan elements.

use serde::{Deserialize, Serialize};

use crate::consts::{HANDLE_SIZE_PX, PATH_HIT_TOLERANCE_PX, PLANT_HIT_RADIUS_PX};
use crate::coords::{distance, distance_to_segment, points_bounds, Bounds, Position};
use crate::element::{Element, ElementKind, TerrainShape};
use crate::metrics::RealSize;

/// One of the four corner resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    /// Top-left.
    Nw,
    /// Top-right.
    Ne,
    /// Bottom-left.
    Sw,
    /// Bottom-right.
    Se,
}

impl ResizeHandle {
    /// Handles in hit-priority order.
    pub const ALL: [Self; 4] = [Self::Nw, Self::Ne, Self::Sw, Self::Se];

    /// The corner of `bounds` this handle sits on.
    #[must_use]
    pub fn corner(self, bounds: &Bounds) -> Position {
        match self {
            Self::Nw => Position::new(bounds.x, bounds.y),
            Self::Ne => Position::new(bounds.right(), bounds.y),
            Self::Sw => Position::new(bounds.x, bounds.bottom()),
            Self::Se => Position::new(bounds.right(), bounds.bottom()),
        }
    }

    /// Cursor name shown while hovering this handle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Nw | Self::Se => "nwse-resize",
            Self::Ne | Self::Sw => "nesw-resize",
        }
    }
}

/// Axis-aligned bounding box of an element in canvas pixels.
#[must_use]
pub fn get_element_bounds(element: &Element, pixels_per_meter: f64) -> Bounds {
    match &element.kind {
        ElementKind::Plant { entry } => {
            let size = entry.real_size().to_pixels(pixels_per_meter);
            Bounds::new(
                element.x - size.width / 2.0,
                element.y - size.height / 2.0,
                size.width,
                size.height,
            )
        }
        ElementKind::Circle { radius }
        | ElementKind::Terrain {
            shape: TerrainShape::Circle { radius, .. },
            ..
        } => Bounds::new(element.x, element.y, radius * 2.0, radius * 2.0),
        ElementKind::Rectangle { width, height }
        | ElementKind::Terrain {
            shape: TerrainShape::Rect { width, height, .. },
            ..
        } => Bounds::new(element.x, element.y, *width, *height),
        ElementKind::Terrain {
            shape: TerrainShape::Path { points, .. },
            ..
        } => points_bounds(points),
    }
}

/// Whether `pos` hits `element`.
///
/// Plants use a fixed click radius around their centre; circles are tested
/// against the circle inscribed in their bounding box; rectangles use
/// inclusive bounds; trails accept points within a few pixels of a segment.
#[must_use]
pub fn is_point_in_element(pos: Position, element: &Element) -> bool {
    match &element.kind {
        ElementKind::Plant { .. } => distance(pos, element.position()) <= PLANT_HIT_RADIUS_PX,
        ElementKind::Circle { radius }
        | ElementKind::Terrain {
            shape: TerrainShape::Circle { radius, .. },
            ..
        } => {
            let center = Position::new(element.x + radius, element.y + radius);
            distance(pos, center) <= *radius
        }
        ElementKind::Rectangle { width, height }
        | ElementKind::Terrain {
            shape: TerrainShape::Rect { width, height, .. },
            ..
        } => Bounds::new(element.x, element.y, *width, *height).contains(pos),
        ElementKind::Terrain {
            shape: TerrainShape::Path { points, .. },
            ..
        } => match points.as_slice() {
            [] => false,
            [only] => distance(pos, *only) <= PATH_HIT_TOLERANCE_PX,
            _ => points
                .windows(2)
                .any(|w| distance_to_segment(pos, w[0], w[1]) <= PATH_HIT_TOLERANCE_PX),
        },
    }
}

/// Topmost element under `pos`. Later elements are drawn on top and win.
#[must_use]
pub fn find_element_at_position(pos: Position, elements: &[Element]) -> Option<&Element> {
    elements.iter().rev().find(|e| is_point_in_element(pos, e))
}

/// Corner handle of a selected element under `pos`, using the default hit zone.
#[must_use]
pub fn detect_resize_handle(
    pos: Position,
    element: &Element,
    pixels_per_meter: f64,
) -> Option<ResizeHandle> {
    detect_resize_handle_with(pos, element, pixels_per_meter, HANDLE_SIZE_PX)
}

/// Corner handle of a selected element under `pos`.
///
/// Unselected elements and trails have no handles. When hit zones overlap the
/// first match in nw, ne, sw, se order wins.
#[must_use]
pub fn detect_resize_handle_with(
    pos: Position,
    element: &Element,
    pixels_per_meter: f64,
    handle_size: f64,
) -> Option<ResizeHandle> {
    if !element.selected || element.is_path() {
        return None;
    }
    let bounds = get_element_bounds(element, pixels_per_meter);
    ResizeHandle::ALL.into_iter().find(|handle| {
        let corner = handle.corner(&bounds);
        (pos.x - corner.x).abs() <= handle_size && (pos.y - corner.y).abs() <= handle_size
    })
}

/// Resize `original` by dragging `handle` by `(dx, dy)`.
///
/// The opposite corner stays fixed. Width and height are clamped to
/// `min_size` independently, and a clamped axis grows away from the anchor.
#[must_use]
pub fn calculate_new_bounds(
    original: Bounds,
    handle: ResizeHandle,
    dx: f64,
    dy: f64,
    min_size: f64,
) -> Bounds {
    let (left, top, right, bottom) = (original.x, original.y, original.right(), original.bottom());

    let (x, width) = match handle {
        ResizeHandle::Nw | ResizeHandle::Sw => {
            let width = (original.width - dx).max(min_size);
            (right - width, width)
        }
        ResizeHandle::Ne | ResizeHandle::Se => (left, (original.width + dx).max(min_size)),
    };
    let (y, height) = match handle {
        ResizeHandle::Nw | ResizeHandle::Ne => {
            let height = (original.height - dy).max(min_size);
            (bottom - height, height)
        }
        ResizeHandle::Sw | ResizeHandle::Se => (top, (original.height + dy).max(min_size)),
    };

    Bounds::new(x, y, width, height)
}

/// Map resized bounds back onto an element.
///
/// Plants keep their spacing and move their centre; circles take the largest
/// circle fitting the bounds; rectangles copy the bounds. Terrain patches also
/// write the new real-world size so pixels stay `metres × pixels_per_meter`.
/// Trails are returned unchanged.
#[must_use]
pub fn update_element_from_bounds(
    element: &Element,
    bounds: Bounds,
    pixels_per_meter: f64,
) -> Element {
    let mut updated = element.clone();
    match &mut updated.kind {
        ElementKind::Plant { .. } => {
            let center = bounds.center();
            updated.x = center.x;
            updated.y = center.y;
        }
        ElementKind::Circle { radius } => {
            *radius = bounds.width.min(bounds.height) / 2.0;
            updated.x = bounds.x;
            updated.y = bounds.y;
        }
        ElementKind::Rectangle { width, height } => {
            *width = bounds.width;
            *height = bounds.height;
            updated.x = bounds.x;
            updated.y = bounds.y;
        }
        ElementKind::Terrain { shape, .. } => match shape {
            TerrainShape::Circle { radius, real } => {
                *radius = bounds.width.min(bounds.height) / 2.0;
                let diameter_m = *radius * 2.0 / pixels_per_meter;
                *real = RealSize::new(diameter_m, diameter_m);
                updated.x = bounds.x;
                updated.y = bounds.y;
            }
            TerrainShape::Rect {
                width,
                height,
                real,
            } => {
                *width = bounds.width;
                *height = bounds.height;
                *real = RealSize::new(
                    bounds.width / pixels_per_meter,
                    bounds.height / pixels_per_meter,
                );
                updated.x = bounds.x;
                updated.y = bounds.y;
            }
            TerrainShape::Path { .. } => {}
        },
    }
    updated
}
