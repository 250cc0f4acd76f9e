//! Plan elements - plants, terrain patches and plain shapes.
//!
//! Each [`ElementKind`] variant carries only the fields meaningful for it, so a
//! circle without a radius or a rectangle with a path cannot be built.
//!
//! Anchor conventions differ per variant and the geometry module relies on them:
//!
//! | Kind | `(x, y)` is |
//! |------|-------------|
//! | plant | centre |
//! | rectangle, terrain rect | top-left |
//! | circle, terrain circle | bounding-box top-left |
//! | terrain path | first path point |

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::CatalogEntry;
use crate::coords::{Position, Size};
use crate::metrics::RealSize;

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry of a terrain patch.
///
/// `real` is the authoritative size in metres; pixel extents are a cache of
/// `real × pixels_per_meter` refreshed by [`Element::rescale`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "brush", rename_all = "lowercase")]
pub enum TerrainShape {
    /// Rectangular patch anchored at its top-left.
    Rect {
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
        /// Size in metres.
        real: RealSize,
    },
    /// Circular patch anchored at its bounding-box top-left.
    Circle {
        /// Radius in pixels.
        radius: f64,
        /// Diameter in metres on both axes.
        real: RealSize,
    },
    /// Brushed or placed trail.
    Path {
        /// Ordered polyline in canvas pixels.
        points: Vec<Position>,
        /// Stroke width in pixels.
        thickness: f64,
        /// Stroke width (`width`) and length (`height`) in metres.
        real: RealSize,
    },
}

/// The type of content an element contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// A plant placed from the catalog, sized by its spacing.
    Plant {
        /// Copy of the catalog entry's display attributes.
        entry: CatalogEntry,
    },
    /// A plain rectangle.
    Rectangle {
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
    },
    /// A plain circle.
    Circle {
        /// Radius in pixels.
        radius: f64,
    },
    /// A terrain patch or trail.
    Terrain {
        /// Copy of the catalog entry's display attributes.
        entry: CatalogEntry,
        /// Patch geometry.
        shape: TerrainShape,
    },
}

impl ElementKind {
    /// Short type name: `plant`, `terrain`, `rectangle` or `circle`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Plant { .. } => "plant",
            Self::Rectangle { .. } => "rectangle",
            Self::Circle { .. } => "circle",
            Self::Terrain { .. } => "terrain",
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn path_length(points: &[Position]) -> f64 {
    points
        .windows(2)
        .map(|w| crate::coords::distance(w[0], w[1]))
        .sum()
}

/// Scale a polyline about its first point.
fn scale_about_first(points: &mut [Position], ratio: f64) {
    let Some(&origin) = points.first() else {
        return;
    };
    for p in points {
        p.x = origin.x + (p.x - origin.x) * ratio;
        p.y = origin.y + (p.y - origin.y) * ratio;
    }
}

/// A plan element with content and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Anchor x; meaning depends on the kind.
    pub x: f64,
    /// Anchor y; meaning depends on the kind.
    pub y: f64,
    /// Element content.
    #[serde(flatten)]
    pub kind: ElementKind,
    /// Whether this element is selected.
    #[serde(default, skip_serializing)]
    pub selected: bool,
    /// Whether the pointer is over this element.
    #[serde(default, skip_serializing)]
    pub hovered: bool,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Opacity from 0.0 to 1.0.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Element {
    /// Create a new element with the given kind at `(x, y)`.
    #[must_use]
    pub fn new(kind: ElementKind, x: f64, y: f64) -> Self {
        Self {
            id: ElementId::new(),
            x,
            y,
            kind,
            selected: false,
            hovered: false,
            rotation: 0.0,
            opacity: 1.0,
        }
    }

    /// A plant centred on `center`.
    #[must_use]
    pub fn plant(entry: CatalogEntry, center: Position) -> Self {
        Self::new(ElementKind::Plant { entry }, center.x, center.y)
    }

    /// A rectangle with its top-left at `origin`.
    #[must_use]
    pub fn rectangle(origin: Position, width: f64, height: f64) -> Self {
        Self::new(ElementKind::Rectangle { width, height }, origin.x, origin.y)
    }

    /// A circle whose bounding box starts at `origin`.
    #[must_use]
    pub fn circle(origin: Position, radius: f64) -> Self {
        Self::new(ElementKind::Circle { radius }, origin.x, origin.y)
    }

    /// A rectangular terrain patch sized from its real-world footprint.
    #[must_use]
    pub fn terrain_rect(
        entry: CatalogEntry,
        origin: Position,
        real: RealSize,
        pixels_per_meter: f64,
    ) -> Self {
        let px = real.to_pixels(pixels_per_meter);
        let shape = TerrainShape::Rect {
            width: px.width,
            height: px.height,
            real,
        };
        Self::new(ElementKind::Terrain { entry, shape }, origin.x, origin.y)
    }

    /// A circular terrain patch whose diameter is the smaller real-world side.
    #[must_use]
    pub fn terrain_circle(
        entry: CatalogEntry,
        origin: Position,
        real: RealSize,
        pixels_per_meter: f64,
    ) -> Self {
        let diameter = real.width.min(real.height);
        let shape = TerrainShape::Circle {
            radius: diameter * pixels_per_meter / 2.0,
            real: RealSize::new(diameter, diameter),
        };
        Self::new(ElementKind::Terrain { entry, shape }, origin.x, origin.y)
    }

    /// A terrain trail following `points`. Returns `None` for an empty path.
    #[must_use]
    pub fn terrain_path(
        entry: CatalogEntry,
        points: Vec<Position>,
        thickness: f64,
        pixels_per_meter: f64,
    ) -> Option<Self> {
        let first = *points.first()?;
        let shape = TerrainShape::Path {
            real: RealSize::new(
                thickness / pixels_per_meter,
                path_length(&points) / pixels_per_meter,
            ),
            points,
            thickness,
        };
        Some(Self::new(
            ElementKind::Terrain { entry, shape },
            first.x,
            first.y,
        ))
    }

    /// Anchor position.
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Move the anchor to `pos`. Path points travel with it.
    pub fn set_position(&mut self, pos: Position) {
        let dx = pos.x - self.x;
        let dy = pos.y - self.y;
        if let ElementKind::Terrain {
            shape: TerrainShape::Path { points, .. },
            ..
        } = &mut self.kind
        {
            for p in points {
                p.x += dx;
                p.y += dy;
            }
        }
        self.x = pos.x;
        self.y = pos.y;
    }

    /// Builder-style [`Element::set_position`].
    #[must_use]
    pub fn at(mut self, pos: Position) -> Self {
        self.set_position(pos);
        self
    }

    /// The polyline of a terrain path, if this is one.
    #[must_use]
    pub fn path(&self) -> Option<&[Position]> {
        match &self.kind {
            ElementKind::Terrain {
                shape: TerrainShape::Path { points, .. },
                ..
            } => Some(points),
            _ => None,
        }
    }

    /// Replace the polyline of a terrain path and refresh its real length.
    /// No-op for other kinds or an empty polyline.
    pub fn set_path(&mut self, new_points: Vec<Position>, pixels_per_meter: f64) {
        let Some(first) = new_points.first().copied() else {
            return;
        };
        if let ElementKind::Terrain {
            shape: TerrainShape::Path { points, real, .. },
            ..
        } = &mut self.kind
        {
            real.height = path_length(&new_points) / pixels_per_meter;
            *points = new_points;
            self.x = first.x;
            self.y = first.y;
        }
    }

    /// Authoritative real-world size for terrain elements.
    #[must_use]
    pub fn real_size(&self) -> Option<RealSize> {
        match &self.kind {
            ElementKind::Terrain { shape, .. } => Some(match shape {
                TerrainShape::Rect { real, .. }
                | TerrainShape::Circle { real, .. }
                | TerrainShape::Path { real, .. } => *real,
            }),
            _ => None,
        }
    }

    /// Pixel extent of a terrain patch (`None` for other kinds).
    #[must_use]
    pub fn terrain_pixel_size(&self) -> Option<Size> {
        match &self.kind {
            ElementKind::Terrain { shape, .. } => match shape {
                TerrainShape::Rect { width, height, .. } => Some(Size::new(*width, *height)),
                TerrainShape::Circle { radius, .. } => Some(Size::new(radius * 2.0, radius * 2.0)),
                TerrainShape::Path { .. } => None,
            },
            _ => None,
        }
    }

    /// Recompute cached pixel extents from real-world sizes.
    ///
    /// Trails keep their first point and stretch so their pixel length is
    /// the stored length in metres times `pixels_per_meter`.
    pub fn rescale(&mut self, pixels_per_meter: f64) {
        if let ElementKind::Terrain { shape, .. } = &mut self.kind {
            match shape {
                TerrainShape::Rect {
                    width,
                    height,
                    real,
                } => {
                    *width = real.width * pixels_per_meter;
                    *height = real.height * pixels_per_meter;
                }
                TerrainShape::Circle { radius, real } => {
                    *radius = real.width.min(real.height) * pixels_per_meter / 2.0;
                }
                TerrainShape::Path {
                    points,
                    thickness,
                    real,
                } => {
                    *thickness = real.width * pixels_per_meter;
                    let current = path_length(points);
                    if current > 0.0 {
                        let ratio = real.height * pixels_per_meter / current;
                        if (ratio - 1.0).abs() > 1e-9 {
                            scale_about_first(points, ratio);
                        }
                    }
                }
            }
        }
    }

    /// Whether this element is a terrain trail.
    #[must_use]
    pub fn is_path(&self) -> bool {
        self.path().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::entry;

    #[test]
    fn test_terrain_rect_pixels_follow_scale() {
        let mut el = Element::terrain_rect(
            entry("4x2m"),
            Position::new(0.0, 0.0),
            RealSize::new(4.0, 2.0),
            10.0,
        );
        assert_eq!(el.terrain_pixel_size(), Some(Size::new(40.0, 20.0)));

        el.rescale(25.0);
        assert_eq!(el.terrain_pixel_size(), Some(Size::new(100.0, 50.0)));
        assert_eq!(el.real_size(), Some(RealSize::new(4.0, 2.0)));
    }

    #[test]
    fn test_terrain_circle_uses_smaller_side() {
        let mut el = Element::terrain_circle(
            entry("3x2m"),
            Position::new(5.0, 5.0),
            RealSize::new(3.0, 2.0),
            10.0,
        );
        assert_eq!(el.terrain_pixel_size(), Some(Size::new(20.0, 20.0)));
        el.rescale(20.0);
        assert_eq!(el.terrain_pixel_size(), Some(Size::new(40.0, 40.0)));
    }

    #[test]
    fn test_path_moves_with_anchor() {
        let points = vec![Position::new(10.0, 10.0), Position::new(40.0, 50.0)];
        let mut el = Element::terrain_path(entry("1m"), points, 20.0, 10.0).expect("non-empty");
        assert_eq!(el.position(), Position::new(10.0, 10.0));
        assert_eq!(el.real_size(), Some(RealSize::new(2.0, 5.0)));

        el.set_position(Position::new(15.0, 0.0));
        let moved = el.path().expect("is a path");
        assert_eq!(moved[0], Position::new(15.0, 0.0));
        assert_eq!(moved[1], Position::new(45.0, 40.0));
    }

    #[test]
    fn test_set_path_updates_length() {
        let points = vec![Position::new(0.0, 0.0), Position::new(30.0, 0.0)];
        let mut el = Element::terrain_path(entry("1m"), points, 10.0, 10.0).expect("non-empty");
        el.set_path(
            vec![
                Position::new(5.0, 5.0),
                Position::new(5.0, 45.0),
                Position::new(35.0, 45.0),
            ],
            10.0,
        );
        assert_eq!(el.position(), Position::new(5.0, 5.0));
        assert_eq!(el.real_size(), Some(RealSize::new(1.0, 7.0)));

        el.set_path(Vec::new(), 10.0);
        assert_eq!(el.path().map(<[Position]>::len), Some(3));
    }

    #[test]
    fn test_trail_rescale_follows_metres() {
        let points = vec![
            Position::new(100.0, 100.0),
            Position::new(200.0, 100.0),
            Position::new(200.0, 140.0),
        ];
        let mut el = Element::terrain_path(entry("1m"), points, 20.0, 20.0).expect("non-empty");
        assert_eq!(el.real_size(), Some(RealSize::new(1.0, 7.0)));

        el.rescale(10.0);
        assert_eq!(
            el.path(),
            Some(
                &[
                    Position::new(100.0, 100.0),
                    Position::new(150.0, 100.0),
                    Position::new(150.0, 120.0),
                ][..]
            )
        );
        assert_eq!(el.real_size(), Some(RealSize::new(1.0, 7.0)));
        assert_eq!(el.position(), Position::new(100.0, 100.0));

        // Same scale again is a no-op.
        let before = el.clone();
        el.rescale(10.0);
        assert_eq!(el, before);
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(Element::terrain_path(entry("1m"), Vec::new(), 20.0, 10.0).is_none());
    }

    #[test]
    fn test_serde_shape_and_transient_flags() {
        let mut el = Element::circle(Position::new(1.0, 2.0), 5.0);
        el.selected = true;
        el.hovered = true;

        let json = serde_json::to_value(&el).expect("serialize");
        assert_eq!(json["type"], "circle");
        assert_eq!(json["radius"], 5.0);
        assert!(json.get("selected").is_none());
        assert!(json.get("hovered").is_none());

        let back: Element = serde_json::from_value(json).expect("deserialize");
        assert!(!back.selected);
        assert_eq!(back.kind, el.kind);
        assert!((back.opacity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_terrain_serde_tags() {
        let el = Element::terrain_rect(
            entry("1x1m"),
            Position::new(0.0, 0.0),
            RealSize::new(1.0, 1.0),
            20.0,
        );
        let json = serde_json::to_value(&el).expect("serialize");
        assert_eq!(json["type"], "terrain");
        assert_eq!(json["shape"]["brush"], "rect");
    }
}
