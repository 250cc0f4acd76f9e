//! Shared numeric constants for the garden canvas.

use std::time::Duration;

// ── Grid & scale ────────────────────────────────────────────────

/// Each grid square covers 2m × 2m.
pub const GRID_SIZE_METERS: f64 = 2.0;

/// Real-world plot size used when none is configured, in metres.
pub const DEFAULT_REAL_WIDTH_M: f64 = 50.0;

/// Real-world plot size used when none is configured, in metres.
pub const DEFAULT_REAL_HEIGHT_M: f64 = 30.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Half-width of the square hit zone around each resize handle, in pixels.
pub const HANDLE_SIZE_PX: f64 = 8.0;

/// Click radius for plants. Fixed so tiny seedlings stay clickable.
pub const PLANT_HIT_RADIUS_PX: f64 = 20.0;

/// Tolerance for clicking on a terrain path, in pixels.
pub const PATH_HIT_TOLERANCE_PX: f64 = 6.0;

/// Extra margin around the viewport when culling.
pub const VIEWPORT_BUFFER_PX: f64 = 100.0;

// ── Gestures ────────────────────────────────────────────────────

/// Minimum width/height a resize can shrink an element to.
pub const MIN_ELEMENT_SIZE_PX: f64 = 20.0;

/// Minimum extent of a freshly drawn rectangle or circle.
pub const MIN_SHAPE_SIZE_PX: f64 = 10.0;

/// Minimum spacing between consecutive brushed path points.
pub const PATH_DISTANCE_THRESHOLD_PX: f64 = 5.0;

/// Default brush thickness for terrain paths, in pixels.
pub const DEFAULT_BRUSH_THICKNESS_PX: f64 = 20.0;

/// Length of a click-placed terrain path when the catalog gives none.
pub const DEFAULT_PATH_LENGTH_M: f64 = 5.0;

/// Offset applied to each paste so copies do not sit on their source.
pub const PASTE_OFFSET_PX: f64 = 20.0;

// ── Timing ──────────────────────────────────────────────────────

/// Pointer-move throttle during drag, resize and pan (one 60Hz frame).
pub const POINTER_THROTTLE: Duration = Duration::from_millis(16);

/// Trailing-edge debounce for history commits.
pub const HISTORY_DEBOUNCE: Duration = Duration::from_millis(500);

/// Maximum number of undo steps kept.
pub const MAX_HISTORY_SIZE: usize = 50;

// ── Zoom ────────────────────────────────────────────────────────

/// Zoom percentage at which one canvas pixel is one screen pixel.
pub const DEFAULT_ZOOM: f64 = 100.0;

/// Lowest zoom percentage.
pub const MIN_ZOOM: f64 = 10.0;

/// Highest zoom percentage.
pub const MAX_ZOOM: f64 = 400.0;

/// Zoom increment for keyboard and button zooming.
pub const ZOOM_STEP: f64 = 10.0;

// ── Worker ──────────────────────────────────────────────────────

/// Element count above which culling is handed to the worker.
pub const CULL_THRESHOLD: usize = 200;

/// Douglas-Peucker tolerance applied to brushed terrain paths.
pub const PATH_SIMPLIFY_TOLERANCE_PX: f64 = 1.5;
