//! Tool-driven interaction state machine.
//!
//! The [`Editor`] turns [`InputEvent`]s into scene mutations. It owns the
//! scene, the undo history, the zoom state and an optional background
//! [`Worker`]. All timing is driven by the `now` the caller passes in, so the
//! host decides where the clock comes from.
//!
//! ```text
//!            pointer down                 pointer move            pointer up
//!   Idle ─────────────────► Drawing ───────────────────► Drawing ──────────► commit
//!     │                     Brushing                     (+ point)
//!     │                     Dragging                     (snap, move)
//!     │                     Resizing                     (clamp bounds)
//!     │                     Panning                      (pan offset)
//!     └◄──────────────── Escape / tool change / leave (cancel, restore) ◄──────┘
//! ```

use std::collections::HashSet;
use std::time::Instant;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::catalog::CatalogEntry;
use crate::config::EditorConfig;
use crate::consts::{DEFAULT_BRUSH_THICKNESS_PX, DEFAULT_PATH_LENGTH_M, PASTE_OFFSET_PX};
use crate::coords::{
    calculate_viewport, distance, screen_to_canvas, snap_to_grid, Bounds, Position, Size,
};
use crate::element::{Element, ElementId, ElementKind};
use crate::event::{InputEvent, KeyModifiers};
use crate::geometry::{
    calculate_new_bounds, detect_resize_handle_with, get_element_bounds,
    update_element_from_bounds, ResizeHandle,
};
use crate::history::History;
use crate::metrics::RealSize;
use crate::scene::Scene;
use crate::shortcuts::{Command, ShortcutRegistry};
use crate::sync::{diff_operations, Operation, SyncRepository};
use crate::timer::Throttle;
use crate::tool::{BrushMode, Tool};
use crate::worker::{CalculateElementsPayload, Worker, WorkerRequest, WorkerResponse};
use crate::zoom::ZoomState;

/// Something the host should react to after an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// The canvas needs repainting.
    Redraw,
    /// A change was recorded in the undo history.
    Committed,
    /// The gesture in progress was aborted.
    Cancelled,
    /// The selection changed.
    SelectionChanged,
    /// A different tool is active.
    ToolChanged(Tool),
    /// The zoom percentage changed.
    ZoomChanged(f64),
    /// The grid was shown or hidden.
    GridToggled(bool),
    /// The user asked for an export.
    ExportRequested,
}

/// The gesture in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Nothing in progress.
    Idle,
    /// Dragging out a rectangle, circle or terrain patch.
    Drawing {
        /// Snapped canvas point where the drag began.
        start: Position,
        /// The element as it was created on pointer down.
        template: Element,
        /// Provisional element shown while dragging.
        element: Element,
    },
    /// Painting a freehand terrain trail.
    Brushing {
        /// Provisional trail.
        element: Element,
        /// Last recorded point.
        last: Position,
    },
    /// Moving an element.
    Dragging {
        /// Element being moved.
        id: ElementId,
        /// Pointer position relative to the element anchor.
        offset: Position,
    },
    /// Dragging a corner handle.
    Resizing {
        /// Element being resized.
        id: ElementId,
        /// Handle being dragged.
        handle: ResizeHandle,
        /// Canvas point where the drag began.
        start: Position,
        /// Element bounds when the drag began.
        original: Bounds,
    },
    /// Panning the view.
    Panning {
        /// Last client position.
        last: Position,
    },
}

impl Gesture {
    /// Short state name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Drawing { .. } => "drawing",
            Self::Brushing { .. } => "terrain-path-drawing",
            Self::Dragging { .. } => "dragging",
            Self::Resizing { .. } => "resizing",
            Self::Panning { .. } => "panning",
        }
    }
}

/// Work posted to the background worker, with what it was computed from.
#[derive(Debug)]
enum Job {
    OptimizePath {
        id: ElementId,
        requested: Vec<Position>,
    },
    Cull {
        sent: HashSet<ElementId>,
    },
}

impl Job {
    fn name(&self) -> &'static str {
        match self {
            Self::OptimizePath { .. } => "optimizePath",
            Self::Cull { .. } => "calculateElements",
        }
    }
}

/// Outcome of the last cull.
///
/// Only elements the worker was asked about can be culled. Anything added
/// since is drawn until the next reply covers it.
#[derive(Debug)]
struct Culled {
    sent: HashSet<ElementId>,
    visible: HashSet<ElementId>,
}

impl Culled {
    fn shows(&self, element: &Element) -> bool {
        element.selected || self.visible.contains(&element.id) || !self.sent.contains(&element.id)
    }
}

/// Interactive plan editor.
#[derive(Debug)]
pub struct Editor {
    scene: Scene,
    history: History<Vec<Element>>,
    zoom: ZoomState,
    config: EditorConfig,
    shortcuts: ShortcutRegistry<Command>,
    tool: Tool,
    brush: BrushMode,
    active_plant: Option<CatalogEntry>,
    active_terrain: Option<CatalogEntry>,
    origin: Position,
    gesture: Gesture,
    space_held: bool,
    hovered_handle: Option<ResizeHandle>,
    throttle: Throttle,
    worker: Option<Worker>,
    in_flight: Vec<(Job, oneshot::Receiver<WorkerResponse>)>,
    ready: Vec<(Job, WorkerResponse)>,
    culled: Option<Culled>,
    cull_stale: bool,
    clipboard: Vec<Element>,
    sync: Option<Box<dyn SyncRepository>>,
}

impl Editor {
    /// Create an editor over `scene`. The history starts at its elements.
    #[must_use]
    pub fn new(scene: Scene, config: EditorConfig) -> Self {
        Self {
            history: History::with_config(scene.elements().to_vec(), config.history),
            zoom: ZoomState::new(config.zoom),
            throttle: Throttle::new(config.pointer_throttle()),
            shortcuts: ShortcutRegistry::with_defaults(),
            scene,
            config,
            tool: Tool::default(),
            brush: BrushMode::default(),
            active_plant: None,
            active_terrain: None,
            origin: Position::default(),
            gesture: Gesture::Idle,
            space_held: false,
            hovered_handle: None,
            worker: None,
            in_flight: Vec::new(),
            ready: Vec::new(),
            culled: None,
            cull_stale: false,
            clipboard: Vec::new(),
            sync: None,
        }
    }

    /// Attach a background worker for trail simplification and culling.
    #[must_use]
    pub fn with_worker(mut self, worker: Worker) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Detach the worker, dropping any replies still in flight.
    pub fn detach_worker(&mut self) -> Option<Worker> {
        self.in_flight.clear();
        self.ready.clear();
        self.culled = None;
        self.cull_stale = false;
        self.worker.take()
    }

    /// Record every committed change, undo and redo as sync operations.
    #[must_use]
    pub fn with_sync(mut self, repository: impl SyncRepository + 'static) -> Self {
        self.sync = Some(Box::new(repository));
        self
    }

    /// Detach the sync repository.
    pub fn detach_sync(&mut self) -> Option<Box<dyn SyncRepository>> {
        self.sync.take()
    }

    /// Repository receiving sync operations, if one is attached.
    #[must_use]
    pub fn sync_repository(&self) -> Option<&dyn SyncRepository> {
        self.sync.as_deref()
    }

    /// The plan being edited.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Undo history.
    #[must_use]
    pub fn history(&self) -> &History<Vec<Element>> {
        &self.history
    }

    /// Zoom and pan.
    #[must_use]
    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Keyboard bindings, open for host-specific additions.
    pub fn shortcuts_mut(&mut self) -> &mut ShortcutRegistry<Command> {
        &mut self.shortcuts
    }

    /// Active tool.
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Active terrain brush mode.
    #[must_use]
    pub fn brush_mode(&self) -> BrushMode {
        self.brush
    }

    /// Current gesture.
    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Provisional element being drawn, not yet part of the scene.
    #[must_use]
    pub fn preview(&self) -> Option<&Element> {
        match &self.gesture {
            Gesture::Drawing { element, .. } | Gesture::Brushing { element, .. } => Some(element),
            _ => None,
        }
    }

    /// IDs the worker reported as visible, when culling is active.
    #[must_use]
    pub fn visible_ids(&self) -> Option<&HashSet<ElementId>> {
        self.culled.as_ref().map(|culled| &culled.visible)
    }

    /// Elements to paint, in paint order.
    ///
    /// Once the worker has culled a large scene only visible elements are
    /// returned. Selected elements and elements the last cull did not cover
    /// are always included.
    pub fn render_elements(&self) -> impl Iterator<Item = &Element> {
        let culled = self.culled.as_ref();
        self.scene.elements().iter().filter(move |e| match culled {
            Some(culled) => culled.shows(e),
            None => true,
        })
    }

    /// Elements waiting to be pasted.
    #[must_use]
    pub fn clipboard(&self) -> &[Element] {
        &self.clipboard
    }

    /// Switch tools, aborting any gesture in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        self.cancel_gesture();
        debug!(from = ?self.tool, to = ?tool, "Tool changed");
        self.tool = tool;
    }

    /// Choose how the terrain tool paints.
    pub fn set_brush_mode(&mut self, mode: BrushMode) {
        self.brush = mode;
    }

    /// Plant placed by the plant tool.
    pub fn set_active_plant(&mut self, entry: Option<CatalogEntry>) {
        self.active_plant = entry;
    }

    /// Terrain painted by the terrain tool.
    pub fn set_active_terrain(&mut self, entry: Option<CatalogEntry>) {
        self.active_terrain = entry;
    }

    /// Screen position of the canvas's top-left corner.
    pub fn set_origin(&mut self, origin: Position) {
        self.origin = origin;
    }

    /// Zoom in place, keeping the pan.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        let applied = self.zoom.set_zoom(zoom);
        self.request_cull();
        applied
    }

    /// Back to 100% and no pan.
    pub fn reset_zoom(&mut self) {
        self.zoom.reset();
        self.request_cull();
    }

    /// Resize the canvas. Terrain keeps its size in metres.
    ///
    /// Returns the new pixels-per-metre.
    pub fn set_canvas_px(&mut self, canvas_px: Size) -> f64 {
        self.cancel_gesture();
        let ppm = self.scene.set_canvas_px(canvas_px);
        debug!(width = canvas_px.width, height = canvas_px.height, ppm, "Canvas resized");
        self.request_cull();
        ppm
    }

    /// Change the plot's real size. Terrain keeps its size in metres.
    ///
    /// Returns the new pixels-per-metre.
    pub fn set_real_size(&mut self, real: RealSize) -> f64 {
        self.cancel_gesture();
        let ppm = self.scene.set_real_size(real);
        debug!(width = real.width, height = real.height, ppm, "Plot resized");
        self.request_cull();
        ppm
    }

    /// Turn snap-to-grid on or off.
    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.scene.set_snap_to_grid(snap);
    }

    /// Show or hide the grid.
    pub fn set_show_grid(&mut self, show: bool) {
        self.scene.set_show_grid(show);
    }

    /// Client coordinates to canvas coordinates.
    #[must_use]
    pub fn to_canvas(&self, client: Position) -> Position {
        screen_to_canvas(client, self.origin, self.zoom.zoom, self.zoom.pan_offset)
    }

    fn snap(&self, pos: Position) -> Position {
        snap_to_grid(
            pos,
            self.scene.settings().grid_size_pixels(),
            self.scene.settings().snap_to_grid(),
        )
    }

    fn ppm(&self) -> f64 {
        self.scene.settings().pixels_per_meter()
    }

    /// Handle one input event at time `now`.
    pub fn process_event(&mut self, event: &InputEvent, now: Instant) -> Vec<Action> {
        self.history.tick(now);
        match event {
            InputEvent::PointerDown { x, y, button } => {
                self.pointer_down(Position::new(*x, *y), *button, now)
            }
            InputEvent::PointerMove { x, y } => self.pointer_move(Position::new(*x, *y), now),
            InputEvent::PointerUp { x, y } => self.pointer_up(Position::new(*x, *y), now),
            InputEvent::PointerLeave => {
                let mut actions = Vec::new();
                if self.scene.set_hovered(None) {
                    actions.push(Action::Redraw);
                }
                self.hovered_handle = None;
                if self.cancel_gesture() {
                    actions.extend([Action::Cancelled, Action::Redraw]);
                }
                actions
            }
            InputEvent::Key {
                key,
                pressed,
                modifiers,
                in_text_input,
            } => self.key(key, *pressed, *modifiers, *in_text_input, now),
            InputEvent::Wheel {
                x,
                y,
                delta_x,
                delta_y,
                modifiers,
            } => self.wheel(Position::new(*x, *y), *delta_x, *delta_y, *modifiers),
        }
    }

    /// Advance time-based state without input.
    ///
    /// Settles a pending history burst and collects worker replies.
    pub fn tick(&mut self, now: Instant) -> Vec<Action> {
        self.history.tick(now);
        self.poll_worker(now)
    }

    fn pointer_down(&mut self, client: Position, button: u8, now: Instant) -> Vec<Action> {
        if !matches!(self.gesture, Gesture::Idle) {
            self.cancel_gesture();
        }
        self.throttle.reset();

        if button == 1 || self.space_held || self.tool == Tool::Move {
            self.gesture = Gesture::Panning { last: client };
            return Vec::new();
        }
        if button != 0 {
            return Vec::new();
        }

        let pos = self.to_canvas(client);
        match self.tool {
            Tool::Select => self.begin_select(pos),
            Tool::Rectangle => {
                let start = self.snap(pos);
                self.begin_drawing(start, Element::rectangle(start, 0.0, 0.0))
            }
            Tool::Circle => {
                let start = self.snap(pos);
                self.begin_drawing(start, Element::circle(start, 0.0))
            }
            Tool::Terrain => self.begin_terrain(pos, now),
            Tool::Plant => {
                let Some(entry) = self.active_plant.clone() else {
                    debug!("Plant tool used with no active plant");
                    return Vec::new();
                };
                self.scene.add_element(Element::plant(entry, self.snap(pos)));
                self.commit(now)
            }
            Tool::Delete => match self.scene.element_at(pos) {
                Some(id) => match self.scene.remove_element(&id) {
                    Ok(_) => self.commit(now),
                    Err(e) => {
                        warn!("Delete failed: {e}");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            },
            Tool::Move => Vec::new(),
        }
    }

    fn begin_select(&mut self, pos: Position) -> Vec<Action> {
        let ppm = self.ppm();
        let handle_size = self.config.handle_size;
        let handle_hit = self.scene.elements().iter().rev().find_map(|e| {
            detect_resize_handle_with(pos, e, ppm, handle_size)
                .map(|handle| (e.id, handle, get_element_bounds(e, ppm)))
        });
        if let Some((id, handle, original)) = handle_hit {
            self.gesture = Gesture::Resizing {
                id,
                handle,
                start: pos,
                original,
            };
            return Vec::new();
        }

        let before = self.scene.selected_ids();
        let mut actions = Vec::new();
        match self.scene.element_at(pos) {
            Some(id) => {
                if before != [id] {
                    if let Err(e) = self.scene.select_only(id) {
                        warn!("Select failed: {e}");
                        return actions;
                    }
                }
                if let Some(element) = self.scene.get_element(id) {
                    self.gesture = Gesture::Dragging {
                        id,
                        offset: pos.sub(element.position()),
                    };
                }
            }
            None => self.scene.deselect_all(),
        }
        if self.scene.selected_ids() != before {
            actions.extend([Action::SelectionChanged, Action::Redraw]);
        }
        actions
    }

    fn begin_drawing(&mut self, start: Position, template: Element) -> Vec<Action> {
        self.gesture = Gesture::Drawing {
            start,
            element: template.clone(),
            template,
        };
        vec![Action::Redraw]
    }

    fn begin_terrain(&mut self, pos: Position, now: Instant) -> Vec<Action> {
        let Some(entry) = self.active_terrain.clone() else {
            debug!("Terrain tool used with no active terrain");
            return Vec::new();
        };
        let ppm = self.ppm();
        let real = entry.real_size();
        match self.brush {
            BrushMode::Rectangle => {
                let start = self.snap(pos);
                self.begin_drawing(start, Element::terrain_rect(entry, start, real, ppm))
            }
            BrushMode::Circle => {
                let start = self.snap(pos);
                self.begin_drawing(start, Element::terrain_circle(entry, start, real, ppm))
            }
            BrushMode::Path => {
                let start = self.snap(pos);
                let length_m = if real.height > real.width {
                    real.height
                } else {
                    DEFAULT_PATH_LENGTH_M
                };
                let end = Position::new(start.x + length_m * ppm, start.y);
                match Element::terrain_path(entry, vec![start, end], real.width * ppm, ppm) {
                    Some(trail) => {
                        self.scene.add_element(trail);
                        self.commit(now)
                    }
                    None => Vec::new(),
                }
            }
            BrushMode::Brush => {
                match Element::terrain_path(entry, vec![pos], DEFAULT_BRUSH_THICKNESS_PX, ppm) {
                    Some(element) => {
                        self.gesture = Gesture::Brushing { element, last: pos };
                        vec![Action::Redraw]
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    fn pointer_move(&mut self, client: Position, now: Instant) -> Vec<Action> {
        match self.gesture {
            Gesture::Idle => self.hover(client),
            Gesture::Drawing { .. } | Gesture::Brushing { .. } => {
                let pos = self.to_canvas(client);
                self.update_drawing(pos);
                vec![Action::Redraw]
            }
            Gesture::Dragging { .. } | Gesture::Resizing { .. } | Gesture::Panning { .. } => {
                if !self.throttle.ready(now) {
                    return Vec::new();
                }
                self.update_manipulation(client);
                vec![Action::Redraw]
            }
        }
    }

    fn hover(&mut self, client: Position) -> Vec<Action> {
        if self.tool != Tool::Select && self.tool != Tool::Delete {
            return Vec::new();
        }
        let pos = self.to_canvas(client);
        let ppm = self.ppm();
        let handle_size = self.config.handle_size;
        self.hovered_handle = self
            .scene
            .elements()
            .iter()
            .rev()
            .find_map(|e| detect_resize_handle_with(pos, e, ppm, handle_size));
        let hovered = self.scene.element_at(pos);
        if self.scene.set_hovered(hovered) {
            vec![Action::Redraw]
        } else {
            Vec::new()
        }
    }

    fn update_drawing(&mut self, pos: Position) {
        let snapped = self.snap(pos);
        let ppm = self.ppm();
        let min_shape = self.config.min_shape_size;
        let threshold = self.config.path_distance_threshold;
        match &mut self.gesture {
            Gesture::Drawing {
                start,
                template,
                element,
            } => {
                *element = shape_from_drag(template, *start, snapped, ppm, min_shape);
            }
            Gesture::Brushing { element, last } => {
                if distance(pos, *last) > threshold {
                    let mut points = element.path().map(<[Position]>::to_vec).unwrap_or_default();
                    points.push(pos);
                    element.set_path(points, ppm);
                    *last = pos;
                }
            }
            _ => {}
        }
    }

    fn update_manipulation(&mut self, client: Position) {
        let pos = self.to_canvas(client);
        match self.gesture {
            Gesture::Dragging { id, offset } => {
                let target = self.snap(pos.sub(offset));
                if let Some(element) = self.scene.get_element_mut(id) {
                    element.set_position(target);
                }
            }
            Gesture::Resizing {
                id,
                handle,
                start,
                original,
            } => {
                let bounds = calculate_new_bounds(
                    original,
                    handle,
                    pos.x - start.x,
                    pos.y - start.y,
                    self.config.min_element_size,
                );
                let ppm = self.ppm();
                if let Some(element) = self.scene.get_element_mut(id) {
                    *element = update_element_from_bounds(element, bounds, ppm);
                }
            }
            Gesture::Panning { last } => {
                self.zoom.pan_by(client.x - last.x, client.y - last.y);
                self.gesture = Gesture::Panning { last: client };
            }
            _ => {}
        }
    }

    fn pointer_up(&mut self, client: Position, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.gesture {
            Gesture::Idle => return actions,
            Gesture::Drawing { .. } | Gesture::Brushing { .. } => {
                let pos = self.to_canvas(client);
                self.update_drawing(pos);
            }
            _ => self.update_manipulation(client),
        }
        self.throttle.reset();

        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Drawing {
                start, template, ..
            } => {
                let end = self.snap(self.to_canvas(client));
                let element = finish_shape(
                    &template,
                    start,
                    end,
                    self.ppm(),
                    self.config.min_shape_size,
                );
                self.scene.add_element(element);
                actions.extend(self.commit(now));
            }
            Gesture::Brushing { element, .. } => {
                if element.path().map_or(0, <[Position]>::len) < 2 {
                    debug!("Discarding single-point trail");
                    actions.push(Action::Redraw);
                } else {
                    let id = self.scene.add_element(element);
                    actions.extend(self.commit(now));
                    self.request_optimize(id);
                }
            }
            Gesture::Dragging { .. } | Gesture::Resizing { .. } => {
                actions.push(Action::Redraw);
                actions.extend(self.commit(now));
            }
            Gesture::Panning { .. } => {
                self.request_cull();
                actions.push(Action::Redraw);
            }
            Gesture::Idle => {}
        }
        actions
    }

    fn key(
        &mut self,
        key: &str,
        pressed: bool,
        modifiers: KeyModifiers,
        in_text_input: bool,
        now: Instant,
    ) -> Vec<Action> {
        if in_text_input {
            return Vec::new();
        }
        if key == " " || key.eq_ignore_ascii_case("space") {
            self.space_held = pressed;
            return Vec::new();
        }
        if !pressed {
            return Vec::new();
        }
        match self.shortcuts.dispatch(key, modifiers, in_text_input).copied() {
            Some(command) => self.execute(command, now),
            None => Vec::new(),
        }
    }

    fn wheel(
        &mut self,
        client: Position,
        delta_x: f64,
        delta_y: f64,
        modifiers: KeyModifiers,
    ) -> Vec<Action> {
        if modifiers.primary() {
            if delta_y.abs() < f64::EPSILON {
                return Vec::new();
            }
            let anchor = client.sub(self.origin);
            let target = self.zoom.zoom - delta_y.signum() * self.zoom.zoom_step;
            let before = self.zoom.zoom;
            let applied = self.zoom.zoom_at(anchor, target);
            self.request_cull();
            if (applied - before).abs() < f64::EPSILON {
                return Vec::new();
            }
            vec![Action::ZoomChanged(applied), Action::Redraw]
        } else {
            self.zoom.pan_by(-delta_x, -delta_y);
            self.request_cull();
            vec![Action::Redraw]
        }
    }

    /// Run an editor command.
    pub fn execute(&mut self, command: Command, now: Instant) -> Vec<Action> {
        debug!(?command, "Executing command");
        match command {
            Command::Undo => redraw_if(self.undo()),
            Command::Redo => redraw_if(self.redo()),
            Command::ZoomIn => {
                let zoom = self.zoom.zoom_in();
                self.request_cull();
                vec![Action::ZoomChanged(zoom), Action::Redraw]
            }
            Command::ZoomOut => {
                let zoom = self.zoom.zoom_out();
                self.request_cull();
                vec![Action::ZoomChanged(zoom), Action::Redraw]
            }
            Command::ResetZoom => {
                self.reset_zoom();
                vec![Action::ZoomChanged(self.zoom.zoom), Action::Redraw]
            }
            Command::ToggleGrid => {
                let shown = self.scene.toggle_grid();
                vec![Action::GridToggled(shown), Action::Redraw]
            }
            Command::Cancel => {
                let mut actions = Vec::new();
                if self.cancel_gesture() {
                    actions.push(Action::Cancelled);
                }
                if !self.scene.selected_ids().is_empty() {
                    self.scene.deselect_all();
                    actions.push(Action::SelectionChanged);
                }
                actions.push(Action::Redraw);
                actions
            }
            Command::DeleteSelected => self.delete_selected(now),
            Command::SelectAll => {
                self.select_all();
                vec![Action::SelectionChanged, Action::Redraw]
            }
            Command::Copy => {
                self.copy_selection();
                Vec::new()
            }
            Command::Paste => self.paste(now),
            Command::Duplicate => self.duplicate(now),
            Command::Export => vec![Action::ExportRequested],
            Command::SelectTool(tool) => {
                self.set_tool(tool);
                vec![Action::ToolChanged(tool), Action::Redraw]
            }
        }
    }

    /// Abort the current gesture. Returns whether one was in progress.
    ///
    /// Provisional shapes are discarded. A half-finished drag or resize is
    /// rolled back to the last committed state, keeping the selection.
    pub fn cancel_gesture(&mut self) -> bool {
        self.throttle.reset();
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => false,
            Gesture::Drawing { .. } | Gesture::Brushing { .. } | Gesture::Panning { .. } => true,
            Gesture::Dragging { .. } | Gesture::Resizing { .. } => {
                self.restore_present();
                true
            }
        }
    }

    /// Record the scene in the history.
    fn commit(&mut self, now: Instant) -> Vec<Action> {
        let before = self.sync.is_some().then(|| self.history.present().clone());
        let changed = self.history.set_at(self.scene.elements().to_vec(), now);
        if let Some(before) = before {
            self.record_sync(&before);
        }
        self.request_cull();
        if changed {
            vec![Action::Committed, Action::Redraw]
        } else {
            vec![Action::Redraw]
        }
    }

    /// Queue the difference between `before` and the scene for syncing.
    fn record_sync(&mut self, before: &[Element]) {
        let Some(repository) = self.sync.as_mut() else {
            return;
        };
        let operations = diff_operations(before, self.scene.elements(), Operation::now());
        if operations.is_empty() {
            return;
        }
        debug!(count = operations.len(), "Queueing sync operations");
        for op in operations {
            if let Err(e) = repository.enqueue(op) {
                warn!("Could not queue sync operation: {e}");
                return;
            }
        }
    }

    fn restore_present(&mut self) {
        let selected: HashSet<ElementId> = self.scene.selected_ids().into_iter().collect();
        let ppm = self.ppm();
        let mut elements = self.history.present().clone();
        for element in &mut elements {
            element.selected = selected.contains(&element.id);
            element.hovered = false;
            element.rescale(ppm);
        }
        self.scene.set_elements(elements);
    }

    /// Step back one change. Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        let before = self.sync.is_some().then(|| self.scene.elements().to_vec());
        if !self.history.undo() {
            return false;
        }
        self.restore_present();
        if let Some(before) = before {
            self.record_sync(&before);
        }
        self.request_cull();
        true
    }

    /// Re-apply one undone change. Returns whether anything changed.
    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        let before = self.sync.is_some().then(|| self.scene.elements().to_vec());
        if !self.history.redo() {
            return false;
        }
        self.restore_present();
        if let Some(before) = before {
            self.record_sync(&before);
        }
        self.request_cull();
        true
    }

    /// Remove every selected element as one change.
    pub fn delete_selected(&mut self, now: Instant) -> Vec<Action> {
        self.cancel_gesture();
        let removed = self.scene.remove_selected();
        if removed.is_empty() {
            return Vec::new();
        }
        debug!(count = removed.len(), "Deleted selected elements");
        let mut actions = vec![Action::SelectionChanged];
        actions.extend(self.commit(now));
        actions
    }

    /// Select every element.
    pub fn select_all(&mut self) {
        self.scene.select_all();
    }

    /// Copy the selected elements to the clipboard. Returns how many were
    /// copied. An empty selection leaves the clipboard as it was.
    pub fn copy_selection(&mut self) -> usize {
        let copied: Vec<Element> = self.scene.selected_elements().cloned().collect();
        if !copied.is_empty() {
            debug!(count = copied.len(), "Copied selection");
            self.clipboard = copied;
        }
        self.clipboard.len()
    }

    /// Paste the clipboard as one change and select the copies.
    ///
    /// Each paste lands [`PASTE_OFFSET_PX`] further along than the last.
    pub fn paste(&mut self, now: Instant) -> Vec<Action> {
        self.cancel_gesture();
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        let offset = Position::new(PASTE_OFFSET_PX, PASTE_OFFSET_PX);
        for element in &mut self.clipboard {
            let pos = element.position().add(offset);
            element.set_position(pos);
        }
        let copies = self.clipboard.clone();
        self.place_copies(copies, now)
    }

    /// Copy and paste the selection in one change, leaving the clipboard alone.
    pub fn duplicate(&mut self, now: Instant) -> Vec<Action> {
        self.cancel_gesture();
        let offset = Position::new(PASTE_OFFSET_PX, PASTE_OFFSET_PX);
        let copies: Vec<Element> = self
            .scene
            .selected_elements()
            .map(|e| {
                let pos = e.position().add(offset);
                e.clone().at(pos)
            })
            .collect();
        if copies.is_empty() {
            return Vec::new();
        }
        self.place_copies(copies, now)
    }

    fn place_copies(&mut self, copies: Vec<Element>, now: Instant) -> Vec<Action> {
        self.scene.deselect_all();
        debug!(count = copies.len(), "Placing copies");
        for mut element in copies {
            element.id = ElementId::new();
            element.selected = true;
            element.hovered = false;
            self.scene.add_element(element);
        }
        let mut actions = vec![Action::SelectionChanged];
        actions.extend(self.commit(now));
        actions
    }

    /// Current pointer cursor name.
    #[must_use]
    pub fn cursor(&self) -> &'static str {
        match &self.gesture {
            Gesture::Panning { .. } | Gesture::Dragging { .. } => "grabbing",
            Gesture::Resizing { handle, .. } => handle.cursor(),
            Gesture::Drawing { .. } | Gesture::Brushing { .. } => "crosshair",
            Gesture::Idle if self.space_held => "grab",
            Gesture::Idle => match self.tool {
                Tool::Move => "grab",
                Tool::Select => match self.hovered_handle {
                    Some(handle) => handle.cursor(),
                    None if self.scene.elements().iter().any(|e| e.hovered) => "pointer",
                    None => "default",
                },
                Tool::Delete => "pointer",
                Tool::Plant => "copy",
                Tool::Rectangle | Tool::Circle | Tool::Terrain => "crosshair",
            },
        }
    }

    fn post(&mut self, job: Job, request: WorkerRequest) {
        let Some(worker) = &self.worker else {
            return;
        };
        match worker.post(request) {
            Ok(receiver) => self.in_flight.push((job, receiver)),
            Err(e) => warn!("Worker request failed: {e}"),
        }
    }

    fn request_optimize(&mut self, id: ElementId) {
        if self.worker.is_none() {
            return;
        }
        let Some(path) = self.scene.get_element(id).and_then(Element::path) else {
            return;
        };
        match WorkerRequest::optimize_path(path, self.config.path_tolerance) {
            Ok(request) => {
                let requested = path.to_vec();
                self.post(Job::OptimizePath { id, requested }, request);
            }
            Err(e) => warn!("Could not build optimizePath request: {e}"),
        }
    }

    fn request_cull(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if self.scene.element_count() <= self.config.cull_threshold {
            self.culled = None;
            self.cull_stale = false;
            return;
        }
        if self
            .in_flight
            .iter()
            .any(|(job, _)| matches!(job, Job::Cull { .. }))
        {
            self.cull_stale = true;
            return;
        }
        self.cull_stale = false;
        let sent = self.scene.elements().iter().map(|e| e.id).collect();
        let payload = CalculateElementsPayload {
            elements: self.scene.elements().to_vec(),
            viewport: calculate_viewport(
                self.scene.settings().canvas_px(),
                self.zoom.zoom,
                self.zoom.pan_offset,
            ),
            zoom: self.zoom.zoom,
            pixels_per_meter: self.ppm(),
        };
        match WorkerRequest::calculate_elements(&payload) {
            Ok(request) => self.post(Job::Cull { sent }, request),
            Err(e) => warn!("Could not build calculateElements request: {e}"),
        }
    }

    /// Collect finished worker replies and apply them.
    ///
    /// Replies that arrive mid-gesture are held until the gesture ends. A
    /// cull asked for while another was in flight is posted once that one
    /// lands.
    pub fn poll_worker(&mut self, now: Instant) -> Vec<Action> {
        for (job, mut receiver) in std::mem::take(&mut self.in_flight) {
            match receiver.try_recv() {
                Ok(response) => self.ready.push((job, response)),
                Err(TryRecvError::Empty) => self.in_flight.push((job, receiver)),
                Err(TryRecvError::Closed) => warn!(job = job.name(), "Worker dropped a request"),
            }
        }
        if !matches!(self.gesture, Gesture::Idle) {
            return Vec::new();
        }

        let mut actions = Vec::new();
        for (job, response) in std::mem::take(&mut self.ready) {
            match job {
                Job::OptimizePath { id, requested } => {
                    actions.extend(self.apply_optimized(id, &requested, response, now));
                }
                Job::Cull { sent } => match response.into_result::<Vec<Element>>() {
                    Ok(_) if self.scene.element_count() <= self.config.cull_threshold => {
                        self.culled = None;
                    }
                    Ok(visible) => {
                        let visible = visible.into_iter().map(|e| e.id).collect();
                        self.culled = Some(Culled { sent, visible });
                        actions.push(Action::Redraw);
                    }
                    Err(e) => warn!("Culling failed: {e}"),
                },
            }
        }
        if self.cull_stale {
            self.request_cull();
        }
        actions
    }

    /// Swap in a simplified trail.
    ///
    /// If the trail was moved while the worker ran, the simplified points
    /// follow it. Any other edit wins over the stale reply.
    fn apply_optimized(
        &mut self,
        id: ElementId,
        requested: &[Position],
        response: WorkerResponse,
        now: Instant,
    ) -> Vec<Action> {
        let simplified = match response.into_result::<Vec<Position>>() {
            Ok(path) => path,
            Err(e) => {
                warn!("Path optimisation failed: {e}");
                return Vec::new();
            }
        };
        let ppm = self.ppm();
        let Some(element) = self.scene.get_element_mut(id) else {
            debug!(%id, "Optimised trail no longer exists");
            return Vec::new();
        };
        let Some(current) = element.path() else {
            return Vec::new();
        };
        if simplified.len() < 2 || simplified.len() == current.len() {
            return Vec::new();
        }
        let Some(shift) = translation(requested, current) else {
            debug!(%id, "Trail was reshaped while simplifying, keeping the edit");
            return Vec::new();
        };
        let path = simplified.into_iter().map(|p| p.add(shift)).collect();
        debug!(%id, "Applying simplified trail");
        element.set_path(path, ppm);
        self.commit(now)
    }
}

/// The single offset that carries every point of `from` onto `to`, if any.
fn translation(from: &[Position], to: &[Position]) -> Option<Position> {
    if from.len() != to.len() {
        return None;
    }
    let shift = to.first()?.sub(*from.first()?);
    let uniform = from.iter().zip(to).all(|(a, b)| {
        let d = b.sub(*a);
        (d.x - shift.x).abs() < 1e-9 && (d.y - shift.y).abs() < 1e-9
    });
    uniform.then_some(shift)
}

fn redraw_if(changed: bool) -> Vec<Action> {
    if changed {
        vec![Action::Redraw]
    } else {
        Vec::new()
    }
}

/// Bounds spanned by a drag from `start` to `end`.
fn drag_bounds(start: Position, end: Position) -> Bounds {
    Bounds::new(
        start.x.min(end.x),
        start.y.min(end.y),
        (end.x - start.x).abs(),
        (end.y - start.y).abs(),
    )
}

/// Largest square centred in `bounds`.
fn circle_bounds(bounds: Bounds) -> Bounds {
    let diameter = bounds.width.min(bounds.height);
    let center = bounds.center();
    Bounds::new(
        center.x - diameter / 2.0,
        center.y - diameter / 2.0,
        diameter,
        diameter,
    )
}

fn is_circle(element: &Element) -> bool {
    match &element.kind {
        ElementKind::Circle { .. } => true,
        ElementKind::Terrain { shape, .. } => {
            matches!(shape, crate::element::TerrainShape::Circle { .. })
        }
        _ => false,
    }
}

/// Provisional shape for a drag in progress.
///
/// Terrain keeps its catalog footprint until the drag covers at least
/// `min_shape` on one axis.
fn shape_from_drag(
    template: &Element,
    start: Position,
    end: Position,
    ppm: f64,
    min_shape: f64,
) -> Element {
    let bounds = drag_bounds(start, end);
    let terrain = matches!(template.kind, ElementKind::Terrain { .. });
    if terrain && bounds.width < min_shape && bounds.height < min_shape {
        return template.clone();
    }
    let bounds = if is_circle(template) {
        circle_bounds(bounds)
    } else {
        bounds
    };
    update_element_from_bounds(template, bounds, ppm)
}

/// Final shape for a finished drag, with each side at least `min_shape`.
fn finish_shape(
    template: &Element,
    start: Position,
    end: Position,
    ppm: f64,
    min_shape: f64,
) -> Element {
    let raw = drag_bounds(start, end);
    let terrain = matches!(template.kind, ElementKind::Terrain { .. });
    if terrain && raw.width < min_shape && raw.height < min_shape {
        return template.clone();
    }
    let bounds = if is_circle(template) {
        let fitted = circle_bounds(raw);
        if fitted.width < min_shape {
            let center = raw.center();
            Bounds::new(
                center.x - min_shape / 2.0,
                center.y - min_shape / 2.0,
                min_shape,
                min_shape,
            )
        } else {
            fitted
        }
    } else {
        Bounds::new(
            raw.x,
            raw.y,
            raw.width.max(min_shape),
            raw.height.max(min_shape),
        )
    };
    update_element_from_bounds(template, bounds, ppm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Size;
    use crate::metrics::RealSize;
    use crate::settings::CanvasSettings;
    use crate::test_support::entry;
    use std::time::Duration;

    fn editor() -> Editor {
        // 1000 px over 50 m: 20 px per metre.
        let scene = Scene::new(CanvasSettings::new(
            Size::new(1000.0, 800.0),
            RealSize::new(50.0, 30.0),
        ));
        Editor::new(scene, EditorConfig::default())
    }

    fn drag(editor: &mut Editor, from: (f64, f64), to: (f64, f64), t0: Instant) -> Vec<Action> {
        let mut actions = editor.process_event(&InputEvent::down(from.0, from.1), t0);
        actions.extend(editor.process_event(
            &InputEvent::moved(to.0, to.1),
            t0 + Duration::from_millis(20),
        ));
        actions.extend(editor.process_event(
            &InputEvent::up(to.0, to.1),
            t0 + Duration::from_millis(40),
        ));
        actions
    }

    #[test]
    fn test_draw_rectangle_commits() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let actions = drag(&mut editor, (10.0, 10.0), (60.0, 40.0), Instant::now());

        assert!(actions.contains(&Action::Committed));
        let el = &editor.scene().elements()[0];
        assert_eq!(
            get_element_bounds(el, 20.0),
            Bounds::new(10.0, 10.0, 50.0, 30.0)
        );
        assert!(editor.history().can_undo());
        assert!(matches!(editor.gesture(), Gesture::Idle));
    }

    #[test]
    fn test_tiny_rectangle_is_clamped() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (10.0, 10.0), (12.0, 11.0), Instant::now());

        let el = &editor.scene().elements()[0];
        assert_eq!(
            get_element_bounds(el, 20.0),
            Bounds::new(10.0, 10.0, 10.0, 10.0)
        );
    }

    #[test]
    fn test_drawing_backwards_normalises() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (60.0, 40.0), (10.0, 10.0), Instant::now());

        let el = &editor.scene().elements()[0];
        assert_eq!(
            get_element_bounds(el, 20.0),
            Bounds::new(10.0, 10.0, 50.0, 30.0)
        );
    }

    #[test]
    fn test_draw_circle_fits_drag() {
        let mut editor = editor();
        editor.set_tool(Tool::Circle);
        drag(&mut editor, (0.0, 0.0), (40.0, 20.0), Instant::now());

        let el = &editor.scene().elements()[0];
        assert_eq!(el.kind, ElementKind::Circle { radius: 10.0 });
        assert_eq!(el.position(), Position::new(10.0, 0.0));
    }

    #[test]
    fn test_preview_while_drawing() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        editor.process_event(&InputEvent::down(0.0, 0.0), t0);
        editor.process_event(&InputEvent::moved(30.0, 30.0), t0);

        assert!(editor.scene().is_empty());
        assert!(editor.preview().is_some());
        assert_eq!(editor.cursor(), "crosshair");
    }

    #[test]
    fn test_escape_discards_drawing() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        editor.process_event(&InputEvent::down(0.0, 0.0), t0);
        editor.process_event(&InputEvent::moved(30.0, 30.0), t0);
        let actions = editor.process_event(&InputEvent::key("Escape", KeyModifiers::NONE), t0);

        assert!(actions.contains(&Action::Cancelled));
        assert!(editor.preview().is_none());
        assert!(editor.scene().is_empty());
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_drag_moves_selected_element() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        editor.set_tool(Tool::Select);

        let t1 = t0 + Duration::from_secs(1);
        let actions = drag(&mut editor, (20.0, 20.0), (120.0, 70.0), t1);

        assert!(actions.contains(&Action::SelectionChanged));
        assert!(actions.contains(&Action::Committed));
        let el = &editor.scene().elements()[0];
        assert!(el.selected);
        assert_eq!(el.position(), Position::new(110.0, 60.0));
    }

    #[test]
    fn test_pointer_moves_are_throttled_while_dragging() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        editor.set_tool(Tool::Select);

        let t1 = t0 + Duration::from_secs(1);
        editor.process_event(&InputEvent::down(20.0, 20.0), t1);
        assert_eq!(
            editor.process_event(&InputEvent::moved(30.0, 20.0), t1),
            vec![Action::Redraw]
        );
        assert!(editor
            .process_event(&InputEvent::moved(40.0, 20.0), t1 + Duration::from_millis(5))
            .is_empty());
        assert_eq!(
            editor.scene().elements()[0].position(),
            Position::new(20.0, 10.0)
        );
    }

    #[test]
    fn test_resize_via_handle() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        let id = editor.scene().elements()[0].id;
        editor.set_tool(Tool::Select);

        // Select, then grab the se corner.
        drag(&mut editor, (30.0, 30.0), (30.0, 30.0), t0 + Duration::from_secs(1));
        let actions = drag(&mut editor, (60.0, 60.0), (80.0, 70.0), t0 + Duration::from_secs(2));

        assert!(actions.contains(&Action::Committed));
        assert_eq!(
            editor.scene().element_bounds(id),
            Some(Bounds::new(10.0, 10.0, 70.0, 60.0))
        );
    }

    #[test]
    fn test_escape_rolls_back_drag() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        editor.set_tool(Tool::Select);

        editor.process_event(&InputEvent::down(20.0, 20.0), t0);
        editor.process_event(&InputEvent::moved(200.0, 200.0), t0);
        editor.process_event(&InputEvent::key("Escape", KeyModifiers::NONE), t0);

        let el = &editor.scene().elements()[0];
        assert_eq!(el.position(), Position::new(10.0, 10.0));
        assert!(!el.selected);
    }

    #[test]
    fn test_click_empty_canvas_deselects() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        editor.select_all();
        editor.set_tool(Tool::Select);

        let actions = editor.process_event(&InputEvent::down(500.0, 500.0), t0);
        assert!(actions.contains(&Action::SelectionChanged));
        assert!(editor.scene().selected_ids().is_empty());
    }

    #[test]
    fn test_plant_tool_places_centred_plant() {
        let mut editor = editor();
        editor.set_tool(Tool::Plant);
        let t0 = Instant::now();
        assert!(editor
            .process_event(&InputEvent::down(50.0, 50.0), t0)
            .is_empty());

        editor.set_active_plant(Some(entry("1m")));
        let actions = editor.process_event(&InputEvent::down(50.0, 50.0), t0);
        assert!(actions.contains(&Action::Committed));
        assert_eq!(
            editor.scene().elements()[0].position(),
            Position::new(50.0, 50.0)
        );
        assert_eq!(editor.cursor(), "copy");
    }

    #[test]
    fn test_terrain_click_keeps_catalog_size() {
        let mut editor = editor();
        editor.set_tool(Tool::Terrain);
        editor.set_active_terrain(Some(entry("2x1m")));
        drag(&mut editor, (100.0, 100.0), (102.0, 101.0), Instant::now());

        let el = &editor.scene().elements()[0];
        assert_eq!(el.real_size(), Some(RealSize::new(2.0, 1.0)));
        assert_eq!(
            get_element_bounds(el, 20.0),
            Bounds::new(100.0, 100.0, 40.0, 20.0)
        );
    }

    #[test]
    fn test_terrain_drag_sets_real_size() {
        let mut editor = editor();
        editor.set_tool(Tool::Terrain);
        editor.set_active_terrain(Some(entry("2x1m")));
        drag(&mut editor, (100.0, 100.0), (200.0, 160.0), Instant::now());

        let el = &editor.scene().elements()[0];
        assert_eq!(el.real_size(), Some(RealSize::new(5.0, 3.0)));
    }

    #[test]
    fn test_terrain_path_click_places_trail() {
        let mut editor = editor();
        editor.set_tool(Tool::Terrain);
        editor.set_brush_mode(BrushMode::Path);
        editor.set_active_terrain(Some(entry("1x3m")));
        let actions = editor.process_event(&InputEvent::down(100.0, 100.0), Instant::now());

        assert!(actions.contains(&Action::Committed));
        let el = &editor.scene().elements()[0];
        assert_eq!(
            el.path(),
            Some(&[Position::new(100.0, 100.0), Position::new(160.0, 100.0)][..])
        );
    }

    #[test]
    fn test_brush_records_spaced_points() {
        let mut editor = editor();
        editor.set_tool(Tool::Terrain);
        editor.set_brush_mode(BrushMode::Brush);
        editor.set_active_terrain(Some(entry("1m")));
        let t0 = Instant::now();

        editor.process_event(&InputEvent::down(0.0, 0.0), t0);
        editor.process_event(&InputEvent::moved(2.0, 0.0), t0);
        editor.process_event(&InputEvent::moved(10.0, 0.0), t0);
        editor.process_event(&InputEvent::moved(12.0, 0.0), t0);
        editor.process_event(&InputEvent::moved(20.0, 0.0), t0);
        assert_eq!(
            editor.preview().and_then(Element::path).map(<[Position]>::len),
            Some(3)
        );
        let actions = editor.process_event(&InputEvent::up(20.0, 0.0), t0);

        assert!(actions.contains(&Action::Committed));
        assert_eq!(
            editor.scene().elements()[0].path().map(<[Position]>::len),
            Some(3)
        );
    }

    #[test]
    fn test_single_point_brush_is_discarded() {
        let mut editor = editor();
        editor.set_tool(Tool::Terrain);
        editor.set_brush_mode(BrushMode::Brush);
        editor.set_active_terrain(Some(entry("1m")));
        let t0 = Instant::now();

        editor.process_event(&InputEvent::down(0.0, 0.0), t0);
        editor.process_event(&InputEvent::up(1.0, 0.0), t0);
        assert!(editor.scene().is_empty());
    }

    #[test]
    fn test_delete_tool_removes_hit() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        editor.set_tool(Tool::Delete);

        assert!(editor
            .process_event(&InputEvent::down(500.0, 500.0), t0)
            .is_empty());
        let actions = editor.process_event(&InputEvent::down(20.0, 20.0), t0);
        assert!(actions.contains(&Action::Committed));
        assert!(editor.scene().is_empty());
    }

    #[test]
    fn test_undo_redo_shortcuts() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        assert_eq!(editor.scene().element_count(), 1);

        editor.process_event(&InputEvent::key("z", KeyModifiers::CTRL), t0);
        assert!(editor.scene().is_empty());

        let shift_ctrl = KeyModifiers {
            shift: true,
            ..KeyModifiers::CTRL
        };
        editor.process_event(&InputEvent::key("Z", shift_ctrl), t0);
        assert_eq!(editor.scene().element_count(), 1);
    }

    #[test]
    fn test_shortcuts_ignored_in_text_input() {
        let mut editor = editor();
        let event = InputEvent::Key {
            key: "r".to_string(),
            pressed: true,
            modifiers: KeyModifiers::NONE,
            in_text_input: true,
        };
        assert!(editor.process_event(&event, Instant::now()).is_empty());
        assert_eq!(editor.tool(), Tool::Select);

        let actions = editor.process_event(&InputEvent::key("r", KeyModifiers::NONE), Instant::now());
        assert_eq!(actions[0], Action::ToolChanged(Tool::Rectangle));
        assert_eq!(editor.tool(), Tool::Rectangle);
    }

    #[test]
    fn test_delete_key_removes_selection() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        drag(&mut editor, (100.0, 100.0), (160.0, 160.0), t0 + Duration::from_secs(1));
        editor.process_event(&InputEvent::key("a", KeyModifiers::CTRL), t0);
        assert_eq!(editor.scene().selected_ids().len(), 2);

        let actions = editor.process_event(&InputEvent::key("Delete", KeyModifiers::NONE), t0);
        assert!(actions.contains(&Action::SelectionChanged));
        assert!(editor.scene().is_empty());
    }

    #[test]
    fn test_space_pans() {
        let mut editor = editor();
        let t0 = Instant::now();
        editor.process_event(&InputEvent::key(" ", KeyModifiers::NONE), t0);
        assert_eq!(editor.cursor(), "grab");

        editor.process_event(&InputEvent::down(100.0, 100.0), t0);
        assert_eq!(editor.cursor(), "grabbing");
        editor.process_event(&InputEvent::moved(130.0, 80.0), t0);
        editor.process_event(&InputEvent::up(130.0, 80.0), t0);

        assert_eq!(editor.zoom().pan_offset, Position::new(30.0, -20.0));
        editor.process_event(&InputEvent::key_up(" "), t0);
        assert_eq!(editor.cursor(), "default");
    }

    #[test]
    fn test_wheel_zoom_and_pan() {
        let mut editor = editor();
        let t0 = Instant::now();
        let zoom = InputEvent::Wheel {
            x: 0.0,
            y: 0.0,
            delta_x: 0.0,
            delta_y: -100.0,
            modifiers: KeyModifiers::CTRL,
        };
        let actions = editor.process_event(&zoom, t0);
        assert_eq!(actions[0], Action::ZoomChanged(110.0));

        let scroll = InputEvent::Wheel {
            x: 0.0,
            y: 0.0,
            delta_x: 5.0,
            delta_y: 10.0,
            modifiers: KeyModifiers::NONE,
        };
        editor.process_event(&scroll, t0);
        assert_eq!(editor.zoom().pan_offset, Position::new(-5.0, -10.0));
    }

    #[test]
    fn test_grid_toggle_and_export_shortcuts() {
        let mut editor = editor();
        let t0 = Instant::now();
        let actions = editor.process_event(&InputEvent::key("g", KeyModifiers::NONE), t0);
        assert_eq!(actions[0], Action::GridToggled(false));
        let actions = editor.process_event(&InputEvent::key("e", KeyModifiers::CTRL), t0);
        assert_eq!(actions, vec![Action::ExportRequested]);
    }

    #[test]
    fn test_pointer_leave_cancels() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        editor.process_event(&InputEvent::down(0.0, 0.0), t0);
        let actions = editor.process_event(&InputEvent::PointerLeave, t0);
        assert!(actions.contains(&Action::Cancelled));
        assert!(editor.scene().is_empty());
    }

    #[test]
    fn test_hover_cursor() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        editor.set_tool(Tool::Select);

        let actions = editor.process_event(&InputEvent::moved(30.0, 30.0), t0);
        assert_eq!(actions, vec![Action::Redraw]);
        assert_eq!(editor.cursor(), "pointer");

        editor.process_event(&InputEvent::down(30.0, 30.0), t0);
        editor.process_event(&InputEvent::up(30.0, 30.0), t0);
        editor.process_event(&InputEvent::moved(60.0, 60.0), t0);
        assert_eq!(editor.cursor(), "nwse-resize");
    }

    #[test]
    fn test_resize_clamps_both_axes() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        let id = editor.scene().elements()[0].id;
        editor.set_tool(Tool::Select);

        drag(&mut editor, (30.0, 30.0), (30.0, 30.0), t0 + Duration::from_secs(1));
        let actions = drag(
            &mut editor,
            (60.0, 60.0),
            (-200.0, -200.0),
            t0 + Duration::from_secs(2),
        );

        // The se handle cannot cross the nw corner.
        assert!(actions.contains(&Action::Committed));
        assert_eq!(
            editor.scene().element_bounds(id),
            Some(Bounds::new(10.0, 10.0, 20.0, 20.0))
        );
    }

    #[test]
    fn test_resizing_plot_keeps_terrain_in_metres() {
        let mut editor = editor();
        editor.set_tool(Tool::Terrain);
        editor.set_active_terrain(Some(entry("2x1m")));
        drag(&mut editor, (100.0, 100.0), (102.0, 101.0), Instant::now());

        // 800 px over 10 m limits the scale to 80 px per metre.
        let ppm = editor.set_real_size(RealSize::new(10.0, 10.0));
        assert!((ppm - 80.0).abs() < f64::EPSILON);
        let el = &editor.scene().elements()[0];
        assert_eq!(el.real_size(), Some(RealSize::new(2.0, 1.0)));
        assert_eq!(
            get_element_bounds(el, ppm),
            Bounds::new(100.0, 100.0, 160.0, 80.0)
        );

        let ppm = editor.set_canvas_px(Size::new(500.0, 500.0));
        assert!((ppm - 50.0).abs() < f64::EPSILON);
        assert_eq!(
            get_element_bounds(&editor.scene().elements()[0], ppm),
            Bounds::new(100.0, 100.0, 100.0, 50.0)
        );
    }

    #[test]
    fn test_snap_setting_applies_to_drawing() {
        let mut editor = editor();
        editor.set_snap_to_grid(true);
        editor.set_show_grid(false);
        assert!(editor.scene().settings().snap_to_grid());
        assert!(!editor.scene().settings().show_grid());

        let grid = editor.scene().settings().grid_size_pixels();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (grid + 3.0, 3.0), (grid * 3.0 + 2.0, grid * 2.0 - 1.0), Instant::now());
        assert_eq!(
            editor.scene().elements()[0].position(),
            Position::new(grid, 0.0)
        );
    }

    #[test]
    fn test_edits_are_queued_for_sync() {
        use crate::sync::MemoryRepository;

        let mut editor = editor().with_sync(MemoryRepository::new());
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        editor.set_tool(Tool::Select);
        drag(&mut editor, (30.0, 30.0), (130.0, 30.0), t0 + Duration::from_secs(1));
        editor.process_event(
            &InputEvent::key("Delete", KeyModifiers::NONE),
            t0 + Duration::from_secs(2),
        );
        editor.process_event(
            &InputEvent::key("z", KeyModifiers::CTRL),
            t0 + Duration::from_secs(3),
        );

        let queue = editor
            .sync_repository()
            .expect("repository")
            .load()
            .expect("load");
        let kinds: Vec<&str> = queue
            .pending()
            .map(|op| match op {
                Operation::Add { .. } => "add",
                Operation::Update { .. } => "update",
                Operation::Remove { .. } => "remove",
            })
            .collect();
        assert_eq!(kinds, ["add", "update", "remove", "add"]);

        let id = editor.scene().elements()[0].id;
        assert!(queue.pending().all(|op| op.element_id() == id));
        match queue.pending().nth(1) {
            Some(Operation::Update { element, .. }) => {
                assert_eq!(element.position(), Position::new(110.0, 10.0));
                assert!(!element.selected);
            }
            other => panic!("expected an update, got {other:?}"),
        };
    }

    #[test]
    fn test_selection_alone_is_not_synced() {
        use crate::sync::MemoryRepository;

        let mut editor = editor().with_sync(MemoryRepository::new());
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        editor.process_event(&InputEvent::key("a", KeyModifiers::CTRL), t0);
        editor.process_event(&InputEvent::key("Escape", KeyModifiers::NONE), t0);

        let queue = editor.sync_repository().expect("repository").load().expect("load");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_copy_paste_cascades() {
        let mut editor = editor();
        editor.set_tool(Tool::Rectangle);
        let t0 = Instant::now();
        drag(&mut editor, (10.0, 10.0), (60.0, 60.0), t0);
        let original = editor.scene().elements()[0].id;
        editor.set_tool(Tool::Select);
        drag(&mut editor, (30.0, 30.0), (30.0, 30.0), t0 + Duration::from_secs(1));

        let t1 = t0 + Duration::from_secs(2);
        assert!(editor
            .process_event(&InputEvent::key("c", KeyModifiers::CTRL), t1)
            .is_empty());
        assert_eq!(editor.clipboard().len(), 1);

        let actions = editor.process_event(&InputEvent::key("v", KeyModifiers::CTRL), t1);
        assert!(actions.contains(&Action::Committed));
        assert!(actions.contains(&Action::SelectionChanged));
        let pasted = &editor.scene().elements()[1];
        assert_ne!(pasted.id, original);
        assert!(pasted.selected);
        assert_eq!(pasted.position(), Position::new(30.0, 30.0));
        assert!(!editor.scene().elements()[0].selected);

        let t2 = t1 + Duration::from_secs(1);
        editor.process_event(&InputEvent::key("v", KeyModifiers::CTRL), t2);
        let ids: HashSet<ElementId> = editor.scene().elements().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(
            editor.scene().elements()[2].position(),
            Position::new(50.0, 50.0)
        );
        assert_eq!(editor.scene().selected_ids().len(), 1);

        editor.process_event(
            &InputEvent::key("z", KeyModifiers::CTRL),
            t2 + Duration::from_secs(1),
        );
        assert_eq!(editor.scene().element_count(), 2);
    }

    #[test]
    fn test_translation_requires_uniform_shift() {
        let from = [Position::new(0.0, 0.0), Position::new(10.0, 5.0)];
        let moved = [Position::new(3.0, -2.0), Position::new(13.0, 3.0)];
        let stretched = [Position::new(0.0, 0.0), Position::new(20.0, 10.0)];

        assert_eq!(translation(&from, &from), Some(Position::new(0.0, 0.0)));
        assert_eq!(translation(&from, &moved), Some(Position::new(3.0, -2.0)));
        assert_eq!(translation(&from, &stretched), None);
        assert_eq!(translation(&from, &moved[..1]), None);
        assert_eq!(translation(&[], &[]), None);
    }

    #[test]
    fn test_paste_with_empty_clipboard_is_noop() {
        let mut editor = editor();
        assert_eq!(editor.copy_selection(), 0);
        assert!(editor.paste(Instant::now()).is_empty());
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_duplicate_leaves_clipboard_alone() {
        let mut editor = editor();
        editor.set_tool(Tool::Circle);
        let t0 = Instant::now();
        drag(&mut editor, (0.0, 0.0), (40.0, 40.0), t0);
        editor.select_all();

        let actions = editor.process_event(&InputEvent::key("d", KeyModifiers::CTRL), t0);
        assert!(actions.contains(&Action::Committed));
        assert!(editor.clipboard().is_empty());
        assert_eq!(editor.tool(), Tool::Circle);

        let copy = &editor.scene().elements()[1];
        assert_eq!(copy.kind, ElementKind::Circle { radius: 20.0 });
        assert_eq!(copy.position(), Position::new(20.0, 20.0));
        assert_eq!(editor.scene().selected_ids(), vec![copy.id]);
    }
}
