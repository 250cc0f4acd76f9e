//! Editor tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    CULL_THRESHOLD, HANDLE_SIZE_PX, MIN_ELEMENT_SIZE_PX, MIN_SHAPE_SIZE_PX,
    PATH_DISTANCE_THRESHOLD_PX, PATH_SIMPLIFY_TOLERANCE_PX, POINTER_THROTTLE,
};
use crate::error::CanvasResult;
use crate::history::HistoryConfig;
use crate::zoom::ZoomLimits;

/// Configuration for [`crate::Editor`]. Every field has a default, so a
/// partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo history settings.
    pub history: HistoryConfig,
    /// Minimum interval between handled pointer moves during a gesture.
    pub pointer_throttle_ms: u64,
    /// Minimum distance between consecutive brush points.
    pub path_distance_threshold: f64,
    /// Half-width of the resize handle hit zone.
    pub handle_size: f64,
    /// Smallest width/height a resize can produce.
    pub min_element_size: f64,
    /// Smallest width/height a drawn shape is committed with.
    pub min_shape_size: f64,
    /// Zoom limits.
    pub zoom: ZoomLimits,
    /// Element count above which visibility is computed by the worker.
    pub cull_threshold: usize,
    /// Douglas-Peucker tolerance for brushed trails.
    pub path_tolerance: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            #[allow(clippy::cast_possible_truncation)]
            pointer_throttle_ms: POINTER_THROTTLE.as_millis() as u64,
            path_distance_threshold: PATH_DISTANCE_THRESHOLD_PX,
            handle_size: HANDLE_SIZE_PX,
            min_element_size: MIN_ELEMENT_SIZE_PX,
            min_shape_size: MIN_SHAPE_SIZE_PX,
            zoom: ZoomLimits::default(),
            cull_threshold: CULL_THRESHOLD,
            path_tolerance: PATH_SIMPLIFY_TOLERANCE_PX,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON config.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pointer throttle as a duration.
    #[must_use]
    pub fn pointer_throttle(&self) -> Duration {
        Duration::from_millis(self.pointer_throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EditorConfig::from_json(r#"{"handle_size": 12.0, "history": {"max_size": 5}}"#)
                .expect("valid config");
        assert!((config.handle_size - 12.0).abs() < f64::EPSILON);
        assert_eq!(config.history.max_size, 5);
        assert_eq!(config.history.debounce_ms, 500);
        assert_eq!(config.pointer_throttle(), Duration::from_millis(16));
        assert_eq!(config.cull_threshold, 200);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(EditorConfig::from_json("{handle_size: }").is_err());
    }
}
