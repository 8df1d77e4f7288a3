//! The editor controller: one object that owns the diagram, the drill-down
//! context, and the viewport, and keeps the derived render state current.
//!
//! Every mutating call recomputes visibility, arrow geometry, and the
//! no-detail flags from scratch before returning. This is linear in the
//! number of elements and flows, so there is no dirty tracking.

use crate::config::EditorConfig;
use crate::viewport::Viewport;
use dfd_core::exchange::{Document, export_document, parse_document};
use dfd_core::hierarchy::can_add;
use dfd_core::{
    ArrowGeometry, ContextInfo, Diagram, DiagramError, Element, ElementId, ElementKind, Flow,
    FlowId, FormatError, LayoutConfig, Point, Position, ViewContext, VisibleSet, arrow_geometry,
    compute_visible_set,
};
use std::collections::{HashMap, HashSet};

/// What the rendering surface needs after each change.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub visible: VisibleSet,
    /// Arrow geometry for every visible flow.
    pub arrows: HashMap<FlowId, ArrowGeometry>,
    /// Processes without a sub-diagram.
    pub no_detail: HashSet<ElementId>,
}

pub struct DiagramEditor {
    diagram: Diagram,
    context: ViewContext,
    viewport: Viewport,
    config: EditorConfig,
    render: RenderState,
}

impl DiagramEditor {
    pub fn new(config: EditorConfig, viewport: Viewport) -> Self {
        let mut diagram = Diagram::new();
        diagram.set_title(config.title.as_str());
        let mut editor = Self {
            diagram,
            context: ViewContext::new(),
            viewport,
            config,
            render: RenderState::default(),
        };
        editor.refresh();
        editor
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render
    }

    // ─── Shapes ──────────────────────────────────────────────────────────

    /// Add a shape to the current context, centered in the visible canvas.
    pub fn add_element(
        &mut self,
        kind: ElementKind,
        label: impl Into<String>,
    ) -> Result<ElementId, DiagramError> {
        let position = self.viewport.content_center();
        self.add_element_at(kind, label, position)
    }

    pub fn add_element_at(
        &mut self,
        kind: ElementKind,
        label: impl Into<String>,
        position: Position,
    ) -> Result<ElementId, DiagramError> {
        let parent = self.context.current();
        let id = self
            .diagram
            .create_element(kind, label, parent, Some(position))?;
        self.refresh();
        Ok(id)
    }

    /// Whether the toolbar should offer `kind` at the current level.
    pub fn can_add(&self, kind: ElementKind) -> bool {
        can_add(kind, self.context.level())
    }

    /// Delete a shape together with its sub-diagram and their flows. If the
    /// drill-down path ran through it, the view falls back to the level
    /// above it.
    pub fn delete_element(&mut self, id: ElementId) -> Option<Element> {
        let removed = self.diagram.delete_element(id)?;
        if self.context.retain_existing(&self.diagram) {
            log::debug!("deleted {id} was on the context path; now at level {}", self.context.level());
        }
        self.refresh();
        Some(removed)
    }

    pub fn move_element(&mut self, id: ElementId, position: Position) -> Result<(), DiagramError> {
        self.diagram.move_element(id, position)?;
        self.refresh();
        Ok(())
    }

    pub fn rename_element(
        &mut self,
        id: ElementId,
        label: impl Into<String>,
    ) -> Result<(), DiagramError> {
        self.diagram.rename_element(id, label)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.diagram.set_title(title);
    }

    // ─── Flows ───────────────────────────────────────────────────────────

    /// Connect two shapes. `Ok(None)` when they are already connected in
    /// that direction.
    pub fn add_flow(
        &mut self,
        from: ElementId,
        to: ElementId,
        label: impl Into<String>,
    ) -> Result<Option<FlowId>, DiagramError> {
        let id = self.diagram.create_flow(from, to, label)?;
        if id.is_some() {
            self.refresh();
        }
        Ok(id)
    }

    pub fn delete_flow(&mut self, from: ElementId, to: ElementId) -> Option<Flow> {
        let removed = self.diagram.delete_flow(from, to)?;
        self.refresh();
        Some(removed)
    }

    pub fn set_flow_label(&mut self, id: FlowId, label: impl Into<String>) -> Result<(), DiagramError> {
        self.diagram.set_flow_label(id, label)
    }

    /// Arrow geometry for one flow, whether or not it is currently visible.
    pub fn compute_arrow(&self, id: FlowId) -> Option<ArrowGeometry> {
        let flow = self.diagram.flow(id)?;
        self.arrow_for(flow)
    }

    fn arrow_for(&self, flow: &Flow) -> Option<ArrowGeometry> {
        let metrics = &self.config.metrics;
        let from = metrics.shape_of(self.diagram.element(flow.from)?);
        let to = metrics.shape_of(self.diagram.element(flow.to)?);
        Some(arrow_geometry(&from, &to))
    }

    // ─── Navigation ──────────────────────────────────────────────────────

    /// Drill into a process's sub-diagram.
    pub fn enter_process(&mut self, id: ElementId) -> Result<(), DiagramError> {
        let element = self
            .diagram
            .element(id)
            .ok_or(DiagramError::UnknownElement(id))?;
        if !element.is_process() {
            return Err(DiagramError::NotAProcess(id));
        }
        self.context.enter(id);
        self.refresh();
        Ok(())
    }

    /// Go up one level. Returns `false` at the top level.
    pub fn exit_to_parent(&mut self) -> bool {
        if !self.context.exit() {
            return false;
        }
        self.refresh();
        true
    }

    pub fn current_context(&self) -> ContextInfo {
        self.context.info(&self.diagram)
    }

    /// Fresh visibility projection for the current context.
    pub fn compute_visible_set(&self) -> VisibleSet {
        compute_visible_set(&self.diagram, &self.context)
    }

    pub fn is_no_detail(&self, id: ElementId) -> bool {
        self.render.no_detail.contains(&id)
    }

    // ─── Import / export ─────────────────────────────────────────────────

    pub fn export_document(&self) -> Document {
        export_document(&self.diagram)
    }

    pub fn export_json(&self) -> Result<String, FormatError> {
        dfd_core::emit_document(&self.diagram)
    }

    /// Replace the diagram with the contents of an exchange file. On error
    /// nothing changes.
    pub fn import_json(&mut self, text: &str) -> Result<(), FormatError> {
        let doc = parse_document(text)?;
        self.import_document(&doc)
    }

    pub fn import_document(&mut self, doc: &Document) -> Result<(), FormatError> {
        let title = self.diagram.title().to_string();
        self.diagram.load(doc, &self.import_layout())?;
        if self.diagram.title().is_empty() {
            self.diagram.set_title(title);
        }
        self.context.reset();
        self.viewport.reset();
        self.refresh();
        log::debug!(
            "import finished: {} element(s), {} flow(s)",
            self.diagram.element_count(),
            self.diagram.flows().len()
        );
        Ok(())
    }

    /// The grid wraps at the visible canvas width.
    fn import_layout(&self) -> LayoutConfig {
        let mut layout = self.config.layout;
        if self.viewport.width > 0.0 {
            layout.canvas_width = self.viewport.width;
        }
        layout
    }

    /// Remove every shape and flow and return to the top level.
    pub fn clear_all(&mut self) {
        self.diagram.clear();
        self.context.reset();
        self.refresh();
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn zoom_at(&mut self, x: f32, y: f32, delta_y: f32) {
        let limits = self.config.zoom;
        self.viewport.zoom_at(x, y, delta_y, &limits);
        self.refresh();
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.viewport.pan_by(dx, dy);
        self.refresh();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.refresh();
    }

    pub fn screen_to_content(&self, x: f32, y: f32) -> Point {
        self.viewport.screen_to_content(Point::new(x, y))
    }

    // ─── Derived state ───────────────────────────────────────────────────

    /// Recompute visibility, arrows for visible flows, and no-detail flags.
    fn refresh(&mut self) {
        let visible = compute_visible_set(&self.diagram, &self.context);

        let arrows: HashMap<FlowId, ArrowGeometry> = self
            .diagram
            .flows()
            .iter()
            .filter(|f| visible.contains_flow(f.id))
            .filter_map(|f| self.arrow_for(f).map(|a| (f.id, a)))
            .collect();

        let no_detail = self
            .diagram
            .elements()
            .filter(|e| e.is_process() && !self.diagram.has_children(e.id))
            .map(|e| e.id)
            .collect();

        log::trace!(
            "refresh: {} visible element(s), {} arrow(s)",
            visible.elements.len(),
            arrows.len()
        );
        self.render = RenderState {
            visible,
            arrows,
            no_detail,
        };
    }
}

impl Default for DiagramEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default(), Viewport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_shapes_land_in_viewport_center() {
        let mut editor = DiagramEditor::new(EditorConfig::default(), Viewport::new(800.0, 600.0));
        let p1 = editor.add_element(ElementKind::Process, "A").unwrap();
        assert_eq!(
            editor.diagram().element(p1).unwrap().position,
            Position::new(300.0, 400.0)
        );
    }

    #[test]
    fn refresh_tracks_no_detail_processes() {
        let mut editor = DiagramEditor::default();
        let p1 = editor.add_element(ElementKind::Process, "A").unwrap();
        assert!(editor.is_no_detail(p1));

        editor.enter_process(p1).unwrap();
        let p2 = editor.add_element(ElementKind::Process, "A.1").unwrap();
        assert!(!editor.is_no_detail(p1));
        assert!(editor.is_no_detail(p2));
    }

    #[test]
    fn arrows_follow_moves() {
        let mut editor = DiagramEditor::default();
        let a = editor
            .add_element_at(ElementKind::Process, "A", Position::new(0.0, 0.0))
            .unwrap();
        let b = editor
            .add_element_at(ElementKind::Process, "B", Position::new(0.0, 300.0))
            .unwrap();
        let flow = editor.add_flow(a, b, "x").unwrap().unwrap();
        let before = editor.render_state().arrows[&flow];

        editor.move_element(b, Position::new(0.0, 600.0)).unwrap();
        let after = editor.render_state().arrows[&flow];
        assert!(after.length > before.length);
        assert_eq!(editor.compute_arrow(flow), Some(after));
    }

    #[test]
    fn entering_a_non_process_fails() {
        let mut editor = DiagramEditor::default();
        let e1 = editor.add_element(ElementKind::Entity, "Customer").unwrap();
        assert_eq!(editor.enter_process(e1), Err(DiagramError::NotAProcess(e1)));
        assert_eq!(editor.current_context().level, 0);
    }

    #[test]
    fn deleting_the_entered_process_returns_to_its_parent() {
        let mut editor = DiagramEditor::default();
        let p1 = editor.add_element(ElementKind::Process, "A").unwrap();
        editor.enter_process(p1).unwrap();
        editor.delete_element(p1);
        assert_eq!(editor.current_context().level, 0);
    }

    #[test]
    fn failed_import_changes_nothing() {
        let mut editor = DiagramEditor::default();
        let p1 = editor.add_element(ElementKind::Process, "A").unwrap();
        editor.enter_process(p1).unwrap();

        assert!(matches!(
            editor.import_json(r#"{"nothing": 1}"#),
            Err(FormatError::MissingContext)
        ));
        assert_eq!(editor.diagram().element_count(), 1);
        assert_eq!(editor.current_context().level, 1);
    }

    #[test]
    fn import_keeps_title_when_file_has_none() {
        let mut editor = DiagramEditor::default();
        editor.set_title("Billing");
        editor
            .import_json(r#"{"context": {"process": [{"id": "p1", "label": "A"}]}}"#)
            .unwrap();
        assert_eq!(editor.diagram().title(), "Billing");
    }
}
