//! The plan document: settings plus elements in paint order.

use serde::{Deserialize, Serialize};

use crate::coords::{rect_in_viewport, Bounds, Position, Size};
use crate::geometry::{find_element_at_position, get_element_bounds};
use crate::metrics::RealSize;
use crate::settings::CanvasSettings;
use crate::{CanvasError, CanvasResult, Element, ElementId};

/// A plan containing all canvas elements.
///
/// Elements are kept in paint order: the last element is drawn on top and
/// wins hit-tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    settings: CanvasSettings,
    /// Elements in paint order.
    #[serde(default)]
    elements: Vec<Element>,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new(settings: CanvasSettings) -> Self {
        Self {
            settings,
            elements: Vec::new(),
        }
    }

    /// Plot size, grid and scale.
    ///
    /// Read-only: scale changes go through [`Scene::set_real_size`] and
    /// [`Scene::set_canvas_px`] so element pixels keep following metres.
    #[must_use]
    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    /// Show or hide the grid.
    pub fn set_show_grid(&mut self, show: bool) {
        self.settings.set_show_grid(show);
    }

    /// Flip grid visibility and return the new state.
    pub fn toggle_grid(&mut self) -> bool {
        self.settings.toggle_grid()
    }

    /// Turn grid snapping on or off.
    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.settings.set_snap_to_grid(snap);
    }

    /// Add an element on top of the others.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = element.id;
        self.elements.push(element);
        id
    }

    /// Remove an element from the scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn remove_element(&mut self, id: &ElementId) -> CanvasResult<Element> {
        let index = self
            .elements
            .iter()
            .position(|e| e.id == *id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        Ok(self.elements.remove(index))
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get_element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Get a mutable reference to an element by ID.
    pub fn get_element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Replace an element in place, keeping its paint position.
    ///
    /// # Errors
    ///
    /// Returns an error if no element has the same ID.
    pub fn replace_element(&mut self, element: Element) -> CanvasResult<()> {
        let slot = self
            .get_element_mut(element.id)
            .ok_or_else(|| CanvasError::ElementNotFound(element.id.to_string()))?;
        *slot = element;
        Ok(())
    }

    /// All elements in paint order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Replace every element, e.g. when restoring an undo snapshot.
    pub fn set_elements(&mut self, elements: Vec<Element>) {
        self.elements = elements;
    }

    /// Topmost element under a canvas-space point.
    #[must_use]
    pub fn element_at(&self, pos: Position) -> Option<ElementId> {
        find_element_at_position(pos, &self.elements).map(|e| e.id)
    }

    /// Canvas-space bounds of an element.
    #[must_use]
    pub fn element_bounds(&self, id: ElementId) -> Option<Bounds> {
        self.get_element(id)
            .map(|e| get_element_bounds(e, self.settings.pixels_per_meter()))
    }

    /// Select an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn select(&mut self, id: ElementId) -> CanvasResult<()> {
        let element = self
            .get_element_mut(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        element.selected = true;
        Ok(())
    }

    /// Select exactly one element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found; the selection is then empty.
    pub fn select_only(&mut self, id: ElementId) -> CanvasResult<()> {
        self.deselect_all();
        self.select(id)
    }

    /// Select every element.
    pub fn select_all(&mut self) {
        for element in &mut self.elements {
            element.selected = true;
        }
    }

    /// Deselect all elements.
    pub fn deselect_all(&mut self) {
        for element in &mut self.elements {
            element.selected = false;
        }
    }

    /// IDs of selected elements in paint order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<ElementId> {
        self.selected_elements().map(|e| e.id).collect()
    }

    /// Get currently selected elements.
    pub fn selected_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.selected)
    }

    /// Remove all selected elements and return them.
    pub fn remove_selected(&mut self) -> Vec<Element> {
        let (removed, kept): (Vec<Element>, Vec<Element>) = std::mem::take(&mut self.elements)
            .into_iter()
            .partition(|e| e.selected);
        self.elements = kept;
        removed
    }

    /// Mark only `id` as hovered. Returns whether anything changed.
    pub fn set_hovered(&mut self, id: Option<ElementId>) -> bool {
        let mut changed = false;
        for element in &mut self.elements {
            let hovered = Some(element.id) == id;
            changed |= element.hovered != hovered;
            element.hovered = hovered;
        }
        changed
    }

    /// Rescale every element to the settings' current pixels-per-metre.
    fn rescale_elements(&mut self) {
        let ppm = self.settings.pixels_per_meter();
        for element in &mut self.elements {
            element.rescale(ppm);
        }
    }

    /// Resize the plot, rescaling terrain so pixels follow metres.
    pub fn set_real_size(&mut self, real: RealSize) -> f64 {
        let ppm = self.settings.set_real_size(real);
        self.rescale_elements();
        ppm
    }

    /// Resize the canvas, rescaling terrain so pixels follow metres.
    pub fn set_canvas_px(&mut self, canvas_px: Size) -> f64 {
        let ppm = self.settings.set_canvas_px(canvas_px);
        self.rescale_elements();
        ppm
    }

    /// Elements whose bounds come within `buffer` pixels of `viewport`.
    pub fn visible_elements<'a>(
        &'a self,
        viewport: &'a Bounds,
        buffer: f64,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        let ppm = self.settings.pixels_per_meter();
        self.elements
            .iter()
            .filter(move |e| rect_in_viewport(&get_element_bounds(e, ppm), viewport, buffer))
    }

    /// Get the number of elements in the scene.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Serialize the scene to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string_pretty(self).map_err(CanvasError::Serialization)
    }

    /// Deserialize a scene from JSON, rescaling terrain to the stored settings.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let mut scene: Self = serde_json::from_str(json).map_err(CanvasError::Serialization)?;
        scene.settings.recompute();
        scene.rescale_elements();
        Ok(scene)
    }
}
