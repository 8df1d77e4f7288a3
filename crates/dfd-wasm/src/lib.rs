//! WASM bridge for the DFD editor. Exposes the Rust diagram engine to the
//! page script.
//!
//! Compiled via `wasm-pack build --target web`. Pointer handling, drawing,
//! menus, and file dialogs stay in JavaScript; every call here is a data
//! operation followed by a render-state refresh the page can read back.

use dfd_core::{ElementId, ElementKind, FlowId, Position, parse_document};
use dfd_editor::{DiagramEditor, EditorConfig, Viewport};
use serde_json::json;
use wasm_bindgen::prelude::*;

/// The main WASM-facing canvas controller.
#[wasm_bindgen]
pub struct DfdCanvas {
    editor: DiagramEditor,
}

#[wasm_bindgen]
impl DfdCanvas {
    /// Create a controller for a canvas of the given size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_config(width, height, "{}")
    }

    /// Like `new`, with a JSON `EditorConfig`. Unreadable config falls back
    /// to the defaults.
    pub fn with_config(width: f64, height: f64, config_json: &str) -> Self {
        console_error_panic_hook_setup();
        let config = EditorConfig::from_json(config_json).unwrap_or_else(|e| {
            log::warn!("ignoring editor config: {e}");
            EditorConfig::default()
        });
        let viewport = Viewport::new(width as f32, height as f32);
        Self {
            editor: DiagramEditor::new(config, viewport),
        }
    }

    // ─── Shapes ──────────────────────────────────────────────────────────

    /// Add a shape in the current context at the canvas center.
    /// `kind` is `process`, `datastore`, or `entity`; an empty label uses
    /// the kind's default. Returns the new ID, or an empty string.
    pub fn add_element(&mut self, kind: &str, label: &str) -> String {
        let Some(kind) = ElementKind::from_name(kind) else {
            return String::new();
        };
        let label = label_or_default(kind, label);
        match self.editor.add_element(kind, label) {
            Ok(id) => id.to_string(),
            Err(e) => {
                log::warn!("add_element: {e}");
                String::new()
            }
        }
    }

    /// Add a shape with its top-left corner at content coordinates.
    pub fn add_element_at(&mut self, kind: &str, label: &str, left: f32, top: f32) -> String {
        let Some(kind) = ElementKind::from_name(kind) else {
            return String::new();
        };
        let label = label_or_default(kind, label);
        match self.editor.add_element_at(kind, label, Position::new(top, left)) {
            Ok(id) => id.to_string(),
            Err(e) => {
                log::warn!("add_element_at: {e}");
                String::new()
            }
        }
    }

    pub fn can_add(&self, kind: &str) -> bool {
        ElementKind::from_name(kind).is_some_and(|k| self.editor.can_add(k))
    }

    pub fn delete_element(&mut self, id: &str) -> bool {
        ElementId::try_existing(id).is_some_and(|id| self.editor.delete_element(id).is_some())
    }

    pub fn move_element(&mut self, id: &str, left: f32, top: f32) -> bool {
        ElementId::try_existing(id).is_some_and(|id| {
            self.editor
                .move_element(id, Position::new(top, left))
                .is_ok()
        })
    }

    pub fn rename_element(&mut self, id: &str, label: &str) -> bool {
        ElementId::try_existing(id)
            .is_some_and(|id| self.editor.rename_element(id, label.trim()).is_ok())
    }

    pub fn set_title(&mut self, title: &str) {
        self.editor.set_title(title.trim());
    }

    pub fn get_title(&self) -> String {
        self.editor.diagram().title().to_string()
    }

    // ─── Flows ───────────────────────────────────────────────────────────

    /// Connect two shapes. Returns the new flow ID, or an empty string when
    /// the pair is already connected or an endpoint is unknown.
    pub fn add_flow(&mut self, from: &str, to: &str, label: &str) -> String {
        let (Some(from_id), Some(to_id)) =
            (ElementId::try_existing(from), ElementId::try_existing(to))
        else {
            log::warn!("add_flow: unknown endpoint in {from} -> {to}");
            return String::new();
        };
        match self.editor.add_flow(from_id, to_id, label) {
            Ok(Some(id)) => id.to_string(),
            Ok(None) => String::new(),
            Err(e) => {
                log::warn!("add_flow: {e}");
                String::new()
            }
        }
    }

    pub fn delete_flow(&mut self, from: &str, to: &str) -> bool {
        match (ElementId::try_existing(from), ElementId::try_existing(to)) {
            (Some(from), Some(to)) => self.editor.delete_flow(from, to).is_some(),
            _ => false,
        }
    }

    pub fn set_flow_label(&mut self, flow_id: &str, label: &str) -> bool {
        FlowId::try_existing(flow_id)
            .is_some_and(|id| self.editor.set_flow_label(id, label.trim()).is_ok())
    }

    /// Arrow geometry for one flow as JSON, or `null`.
    pub fn arrow_json(&self, flow_id: &str) -> String {
        FlowId::try_existing(flow_id)
            .and_then(|id| self.editor.compute_arrow(id))
            .and_then(|a| serde_json::to_string(&a).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    // ─── Navigation ──────────────────────────────────────────────────────

    pub fn enter_process(&mut self, id: &str) -> bool {
        ElementId::try_existing(id).is_some_and(|id| self.editor.enter_process(id).is_ok())
    }

    pub fn exit_to_parent(&mut self) -> bool {
        self.editor.exit_to_parent()
    }

    /// `{"level":1,"processId":"p1","label":"..."}`
    pub fn current_context_json(&self) -> String {
        serde_json::to_string(&self.editor.current_context()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Text for the level indicator, e.g. `Level 1: Take order`.
    pub fn level_label(&self) -> String {
        self.editor.current_context().to_string()
    }

    /// Everything the page needs to redraw: visible shapes with their
    /// no-detail flag, visible arrows with labels, and the context.
    pub fn render_state_json(&self) -> String {
        let diagram = self.editor.diagram();
        let state = self.editor.render_state();

        let shapes: Vec<serde_json::Value> = diagram
            .elements()
            .filter(|e| state.visible.contains_element(e.id))
            .map(|e| {
                json!({
                    "id": e.id,
                    "kind": e.kind,
                    "label": e.label,
                    "top": e.position.top,
                    "left": e.position.left,
                    "noDetail": state.no_detail.contains(&e.id),
                })
            })
            .collect();

        let arrows: Vec<serde_json::Value> = diagram
            .flows()
            .iter()
            .filter_map(|f| state.arrows.get(&f.id).map(|a| (f, a)))
            .map(|(f, a)| {
                json!({
                    "id": f.id,
                    "from": f.from,
                    "to": f.to,
                    "label": f.label,
                    "geometry": a,
                })
            })
            .collect();

        json!({
            "title": diagram.title(),
            "context": self.editor.current_context(),
            "shapes": shapes,
            "arrows": arrows,
        })
        .to_string()
    }

    // ─── Import / export ─────────────────────────────────────────────────

    /// Load exchange-file text. Returns `{"ok":true}` or
    /// `{"ok":false,"error":"..."}`; on error nothing changes.
    pub fn import_json(&mut self, text: &str) -> String {
        match self.editor.import_json(text) {
            Ok(()) => json!({ "ok": true }).to_string(),
            Err(e) => json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }

    /// Pretty-printed exchange file for download.
    pub fn export_json(&self) -> String {
        self.editor.export_json().unwrap_or_else(|e| {
            log::warn!("export failed: {e}");
            String::new()
        })
    }

    pub fn clear_all(&mut self) {
        self.editor.clear_all();
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    /// Wheel zoom around the cursor (canvas-relative pixels).
    pub fn zoom_at(&mut self, x: f32, y: f32, delta_y: f32) {
        self.editor.zoom_at(x, y, delta_y);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.editor.pan_by(dx, dy);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.editor.resize(width as f32, height as f32);
    }

    /// CSS transform for the content layer.
    pub fn css_transform(&self) -> String {
        self.editor.viewport().css_transform()
    }

    /// Convert a canvas-relative pointer position to content space: `[x, y]`.
    pub fn screen_to_content(&self, x: f32, y: f32) -> Vec<f32> {
        let p = self.editor.screen_to_content(x, y);
        vec![p.x, p.y]
    }
}

fn label_or_default(kind: ElementKind, label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        kind.default_label().to_string()
    } else {
        label.to_string()
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("DFD WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone validation (no canvas needed) ────────────────────────────

/// Check exchange-file text before importing it.
/// Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(source: &str) -> String {
    match parse_document(source) {
        Ok(_) => json!({ "ok": true }).to_string(),
        Err(e) => json!({ "ok": false, "error": e.to_string() }).to_string(),
    }
}
