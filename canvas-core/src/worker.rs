//! Background compute worker.
//!
//! A dedicated thread answers JSON requests shaped `{type, payload}` with
//! `{type, result, error?}`. Two request types exist:
//!
//! - `calculateElements`: elements whose bounds touch a viewport
//! - `optimizePath`: Douglas-Peucker simplification of a polyline
//!
//! A failing request (unknown type, bad payload, even a panic) is answered
//! with `result: null` and an error message; the thread keeps serving.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::coords::{distance_to_segment, Bounds, Position};
use crate::element::Element;
use crate::error::{CanvasError, CanvasResult};
use crate::geometry::get_element_bounds;

/// Request type for viewport culling.
pub const CALCULATE_ELEMENTS: &str = "calculateElements";

/// Request type for path simplification.
pub const OPTIMIZE_PATH: &str = "optimizePath";

/// A message to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Request type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific arguments.
    #[serde(default)]
    pub payload: Value,
}

/// A reply from the worker, correlated to its request by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Request type this answers.
    #[serde(rename = "type")]
    pub kind: String,
    /// Result value, `null` on error.
    pub result: Value,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    fn ok(kind: &str, result: Value) -> Self {
        Self {
            kind: kind.to_string(),
            result,
            error: None,
        }
    }

    fn failed(kind: &str, error: String) -> Self {
        Self {
            kind: kind.to_string(),
            result: Value::Null,
            error: Some(error),
        }
    }

    /// Decode the result, turning a reported failure into an error.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Worker`] if the worker reported an error and
    /// [`CanvasError::Serialization`] if the result has the wrong shape.
    pub fn into_result<T: serde::de::DeserializeOwned>(self) -> CanvasResult<T> {
        if let Some(error) = self.error {
            return Err(CanvasError::Worker(format!("{}: {error}", self.kind)));
        }
        Ok(serde_json::from_value(self.result)?)
    }
}

/// Arguments of a `calculateElements` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateElementsPayload {
    /// Snapshot of the elements.
    pub elements: Vec<Element>,
    /// Visible canvas-space rectangle.
    pub viewport: Bounds,
    /// Zoom percentage, informational.
    #[serde(default)]
    pub zoom: f64,
    /// Scale used to size plants.
    #[serde(default = "default_ppm")]
    pub pixels_per_meter: f64,
}

fn default_ppm() -> f64 {
    1.0
}

/// Arguments of an `optimizePath` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizePathPayload {
    /// Polyline to simplify.
    pub path: Vec<Position>,
    /// Maximum deviation in pixels.
    pub tolerance: f64,
}

impl WorkerRequest {
    /// Build a `calculateElements` request.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn calculate_elements(payload: &CalculateElementsPayload) -> CanvasResult<Self> {
        Ok(Self {
            kind: CALCULATE_ELEMENTS.to_string(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Build an `optimizePath` request.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn optimize_path(path: &[Position], tolerance: f64) -> CanvasResult<Self> {
        Ok(Self {
            kind: OPTIMIZE_PATH.to_string(),
            payload: serde_json::to_value(OptimizePathPayload {
                path: path.to_vec(),
                tolerance,
            })?,
        })
    }
}

/// Simplify a polyline with Douglas-Peucker.
///
/// Paths of two points or fewer come back unchanged. Distances are measured to
/// the chord segment, so points beyond an endpoint count their distance to it.
#[must_use]
pub fn simplify_path(points: &[Position], tolerance: f64) -> Vec<Position> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    mark_kept(points, 0, points.len() - 1, tolerance, &mut keep);

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

fn mark_kept(points: &[Position], start: usize, end: usize, tolerance: f64, keep: &mut [bool]) {
    let mut max_distance = 0.0;
    let mut max_index = start;
    for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
        let d = distance_to_segment(*point, points[start], points[end]);
        if d > max_distance {
            max_distance = d;
            max_index = i;
        }
    }

    if max_distance > tolerance {
        keep[max_index] = true;
        mark_kept(points, start, max_index, tolerance, keep);
        mark_kept(points, max_index, end, tolerance, keep);
    }
}

/// Elements whose bounding box is not entirely outside `viewport`.
#[must_use]
pub fn calculate_visible_elements(
    elements: &[Element],
    viewport: &Bounds,
    pixels_per_meter: f64,
) -> Vec<Element> {
    elements
        .iter()
        .filter(|e| get_element_bounds(e, pixels_per_meter).intersects(viewport))
        .cloned()
        .collect()
}

/// Answer one request. Never panics.
#[must_use]
pub fn handle_message(request: &WorkerRequest) -> WorkerResponse {
    match catch_unwind(AssertUnwindSafe(|| dispatch(request))) {
        Ok(Ok(result)) => WorkerResponse::ok(&request.kind, result),
        Ok(Err(error)) => {
            tracing::warn!(kind = %request.kind, %error, "Worker request failed");
            WorkerResponse::failed(&request.kind, error)
        }
        Err(payload) => {
            let message = if let Some(message) = payload.downcast_ref::<&str>() {
                (*message).to_string()
            } else if let Some(message) = payload.downcast_ref::<String>() {
                message.clone()
            } else {
                "Unknown error".to_string()
            };
            tracing::warn!(kind = %request.kind, %message, "Worker request panicked");
            WorkerResponse::failed(&request.kind, message)
        }
    }
}

fn dispatch(request: &WorkerRequest) -> Result<Value, String> {
    match request.kind.as_str() {
        CALCULATE_ELEMENTS => {
            let payload: CalculateElementsPayload = decode(&request.payload)?;
            let visible = calculate_visible_elements(
                &payload.elements,
                &payload.viewport,
                payload.pixels_per_meter,
            );
            tracing::debug!(
                total = payload.elements.len(),
                visible = visible.len(),
                zoom = payload.zoom,
                "Culled elements"
            );
            serde_json::to_value(visible).map_err(|e| e.to_string())
        }
        OPTIMIZE_PATH => {
            let payload: OptimizePathPayload = decode(&request.payload)?;
            if !payload.tolerance.is_finite() || payload.tolerance < 0.0 {
                return Err(format!("Invalid tolerance: {}", payload.tolerance));
            }
            let simplified = simplify_path(&payload.path, payload.tolerance);
            serde_json::to_value(simplified).map_err(|e| e.to_string())
        }
        other => Err(format!("Unknown message type: {other}")),
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, String> {
    T::deserialize(payload).map_err(|e| format!("Invalid payload: {e}"))
}

struct Job {
    request: WorkerRequest,
    responder: oneshot::Sender<WorkerResponse>,
}

/// Handle to the worker thread. Dropping it stops and joins the thread.
pub struct Worker {
    sender: Option<mpsc::UnboundedSender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("running", &self.is_running())
            .finish()
    }
}

impl Worker {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn a thread.
    pub fn spawn() -> CanvasResult<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let handle = thread::Builder::new()
            .name("canvas-worker".to_string())
            .spawn(move || {
                tracing::debug!("Canvas worker started");
                while let Some(job) = receiver.blocking_recv() {
                    let response = handle_message(&job.request);
                    if job.responder.send(response).is_err() {
                        tracing::debug!(kind = %job.request.kind, "Requester went away");
                    }
                }
                tracing::debug!("Canvas worker stopped");
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Whether the worker still accepts requests.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sender.as_ref().is_some_and(|s| !s.is_closed())
    }

    /// Queue a request without waiting. The reply arrives on the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Worker`] if the worker has stopped.
    pub fn post(&self, request: WorkerRequest) -> CanvasResult<oneshot::Receiver<WorkerResponse>> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| CanvasError::Worker("worker is shut down".to_string()))?;
        let (responder, receiver) = oneshot::channel();
        sender
            .send(Job { request, responder })
            .map_err(|_| CanvasError::Worker("worker thread is gone".to_string()))?;
        Ok(receiver)
    }

    /// Send a request and wait for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Worker`] if the worker has stopped.
    pub async fn call(&self, request: WorkerRequest) -> CanvasResult<WorkerResponse> {
        let receiver = self.post(request)?;
        receiver
            .await
            .map_err(|_| CanvasError::Worker("worker dropped the request".to_string()))
    }

    /// Stop accepting requests and join the thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Canvas worker thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::entry;

    fn p(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn test_collinear_path_collapses_to_endpoints() {
        let line: Vec<Position> = (0..20).map(|i| p(f64::from(i) * 3.0, f64::from(i))).collect();
        let simplified = simplify_path(&line, 0.01);
        assert_eq!(simplified, vec![line[0], line[19]]);
    }

    #[test]
    fn test_short_paths_unchanged() {
        let two = vec![p(0.0, 0.0), p(5.0, 5.0)];
        assert_eq!(simplify_path(&two, 100.0), two);
        assert!(simplify_path(&[], 1.0).is_empty());
    }

    #[test]
    fn test_corner_survives() {
        let path = vec![p(0.0, 0.0), p(5.0, 0.1), p(10.0, 0.0), p(10.0, 5.0), p(10.0, 10.0)];
        let simplified = simplify_path(&path, 1.0);
        assert_eq!(simplified, vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)]);
    }

    #[test]
    fn test_culling_by_axis() {
        let viewport = Bounds::new(100.0, 100.0, 200.0, 200.0);
        let inside = Element::rectangle(p(150.0, 150.0), 10.0, 10.0);
        let partial = Element::rectangle(p(90.0, 290.0), 20.0, 20.0);
        let left = Element::rectangle(p(0.0, 150.0), 50.0, 10.0);
        let right = Element::rectangle(p(301.0, 150.0), 10.0, 10.0);
        let above = Element::circle(p(150.0, 0.0), 10.0);
        let below = Element::rectangle(p(150.0, 400.0), 10.0, 10.0);
        let trail = Element::terrain_path(entry("1m"), vec![p(0.0, 0.0), p(120.0, 120.0)], 5.0, 20.0)
            .expect("path");

        let elements = vec![
            inside.clone(),
            partial.clone(),
            left,
            right,
            above,
            below,
            trail.clone(),
        ];
        let visible: Vec<_> = calculate_visible_elements(&elements, &viewport, 20.0)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(visible, vec![inside.id, partial.id, trail.id]);
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let response = handle_message(&WorkerRequest {
            kind: "renderTiles".to_string(),
            payload: Value::Null,
        });
        assert_eq!(response.kind, "renderTiles");
        assert_eq!(response.result, Value::Null);
        assert_eq!(
            response.error.as_deref(),
            Some("Unknown message type: renderTiles")
        );
    }

    #[test]
    fn test_bad_payload_is_reported() {
        let response = handle_message(&WorkerRequest {
            kind: OPTIMIZE_PATH.to_string(),
            payload: serde_json::json!({"path": "nope"}),
        });
        assert!(response
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Invalid payload")));

        let response = handle_message(&WorkerRequest {
            kind: OPTIMIZE_PATH.to_string(),
            payload: serde_json::json!({"path": [], "tolerance": -1.0}),
        });
        assert!(response.error.is_some());
    }

    #[test]
    fn test_wire_format() {
        let request = WorkerRequest::optimize_path(&[p(0.0, 0.0), p(1.0, 1.0)], 1.5)
            .expect("request");
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["type"], OPTIMIZE_PATH);
        assert_eq!(json["payload"]["tolerance"], 1.5);

        let response = handle_message(&request);
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["type"], OPTIMIZE_PATH);
        assert!(json.get("error").is_none());
        let path: Vec<Position> = response.into_result().expect("ok");
        assert_eq!(path.len(), 2);
    }
}
