//! JSON exchange format: nested export and flattening import.
//!
//! ```json
//! { "context": {
//!     "description": "...",
//!     "process": [ { "id": "p1", "label": "...", "top": "120px", "left": "40px",
//!                    "process": [ ...nested... ] } ],
//!     "external-entity": [ { "id": "e1", "label": "...", "parent": "root" } ],
//!     "data-store": [ { "id": "s1", "label": "...", "parent": "p1" } ],
//!     "data-flow": [ { "from": "e1", "to": "p1", "label": "..." } ] } }
//! ```
//!
//! Processes nest by containment; entities and data stores are flat lists
//! with an optional `parent`. Older files list several destinations in one
//! flow record (`"to": ["p1", "p2"]`); both shapes are accepted.

use crate::error::FormatError;
use crate::id::{ElementId, ROOT};
use crate::layout::{GridPlacer, LayoutConfig};
use crate::model::{Diagram, Element, ElementKind, Position};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

// ─── File types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub context: ContextDoc,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextDoc {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub process: Vec<ProcessDoc>,
    #[serde(rename = "external-entity", default, deserialize_with = "nullable")]
    pub external_entity: Vec<ShapeDoc>,
    #[serde(rename = "data-store", default, deserialize_with = "nullable")]
    pub data_store: Vec<ShapeDoc>,
    #[serde(rename = "data-flow", default, deserialize_with = "nullable")]
    pub data_flow: Vec<FlowDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDoc {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<Coord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Coord>,
    /// Sub-processes of this process's detail diagram.
    #[serde(default, deserialize_with = "nullable")]
    pub process: Vec<ProcessDoc>,
}

/// An external entity or data store record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDoc {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Enclosing process; absent means `root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<Coord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Coord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDoc {
    pub from: String,
    pub to: FlowTargets,
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

/// `"to": "p2"` or the older grouped form `"to": ["p2", "e1"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowTargets {
    One(String),
    Many(Vec<String>),
}

impl FlowTargets {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let targets = match self {
            FlowTargets::One(to) => std::slice::from_ref(to),
            FlowTargets::Many(to) => to.as_slice(),
        };
        targets.iter().map(String::as_str)
    }
}

/// A CSS-style pixel coordinate: `"120px"`, `"120"`, or a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coord {
    Text(String),
    Number(f32),
}

impl Coord {
    pub fn px(value: f32) -> Self {
        Coord::Text(format!("{value}px"))
    }

    /// Numeric value, or `None` when the text is not a finite number.
    pub fn value(&self) -> Option<f32> {
        let v = match self {
            Coord::Number(n) => *n,
            Coord::Text(s) => {
                let s = s.trim();
                let s = s.strip_suffix("px").unwrap_or(s).trim_end();
                s.parse::<f32>().ok()?
            }
        };
        v.is_finite().then_some(v)
    }
}

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Parse / emit ────────────────────────────────────────────────────────

/// Parse exchange-file text. The `context` object is checked before the
/// rest of the structure.
pub fn parse_document(text: &str) -> Result<Document, FormatError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    document_from_value(value)
}

pub fn document_from_value(value: serde_json::Value) -> Result<Document, FormatError> {
    if !value.get("context").is_some_and(serde_json::Value::is_object) {
        return Err(FormatError::MissingContext);
    }
    serde_json::from_value(value).map_err(|e| FormatError::Malformed(e.to_string()))
}

/// Pretty-printed export of the whole diagram.
pub fn emit_document(diagram: &Diagram) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(&export_document(diagram))?)
}

// ─── Export ──────────────────────────────────────────────────────────────

/// Build the nested file form of a diagram.
pub fn export_document(diagram: &Diagram) -> Document {
    let process = diagram
        .elements()
        .filter(|e| e.is_process() && e.parent.is_root())
        .map(|e| export_process(diagram, e))
        .collect();

    let flat = |kind: ElementKind| -> Vec<ShapeDoc> {
        diagram
            .elements()
            .filter(|e| e.kind == kind)
            .map(|e| ShapeDoc {
                id: e.id.to_string(),
                label: e.label.clone(),
                description: e.description.clone(),
                parent: Some(e.parent.to_string()),
                top: Some(Coord::px(e.position.top)),
                left: Some(Coord::px(e.position.left)),
            })
            .collect()
    };

    let data_flow = diagram
        .flows()
        .iter()
        .map(|f| FlowDoc {
            from: f.from.to_string(),
            to: FlowTargets::One(f.to.to_string()),
            label: f.label.clone(),
            description: f.description.clone(),
        })
        .collect();

    Document {
        context: ContextDoc {
            title: diagram.title().to_string(),
            description: diagram.description().to_string(),
            process,
            external_entity: flat(ElementKind::Entity),
            data_store: flat(ElementKind::DataStore),
            data_flow,
        },
    }
}

fn export_process(diagram: &Diagram, element: &Element) -> ProcessDoc {
    let process = diagram
        .children(element.id)
        .into_iter()
        .filter_map(|id| diagram.element(id))
        .filter(|child| child.is_process())
        .map(|child| export_process(diagram, child))
        .collect();

    ProcessDoc {
        id: element.id.to_string(),
        label: element.label.clone(),
        description: element.description.clone(),
        top: Some(Coord::px(element.position.top)),
        left: Some(Coord::px(element.position.left)),
        process,
    }
}

// ─── Import ──────────────────────────────────────────────────────────────

impl Diagram {
    /// Replace this diagram with the contents of `doc`.
    ///
    /// The new diagram is built on the side and swapped in only when the
    /// whole document is well-formed, so a rejected file leaves `self`
    /// untouched. Element counters are derived from the file's IDs; the flow
    /// counter carries on from this diagram's value.
    pub fn load(&mut self, doc: &Document, layout: &LayoutConfig) -> Result<(), FormatError> {
        let loaded = import_document(doc, layout, self.counters().flow)?;
        *self = loaded;
        Ok(())
    }
}

/// Flatten a nested document into a fresh diagram.
pub fn import_document(
    doc: &Document,
    layout: &LayoutConfig,
    flow_counter: u32,
) -> Result<Diagram, FormatError> {
    let ctx = &doc.context;
    let mut diagram = Diagram::new();
    diagram.counters_mut().flow = flow_counter;
    diagram.set_title(ctx.title.as_str());
    diagram.set_description(ctx.description.as_str());

    let mut seen = HashSet::new();
    check_process_ids(&ctx.process, &mut seen)?;
    for shape in ctx.external_entity.iter().chain(&ctx.data_store) {
        check_id(&shape.id, &mut seen)?;
    }
    for id in &seen {
        diagram.counters_mut().observe(id);
    }
    // A parent that names no process in the file still reserves its ID.
    for parent in ctx
        .external_entity
        .iter()
        .chain(&ctx.data_store)
        .filter_map(|shape| shape.parent.as_deref())
    {
        diagram.counters_mut().observe(parent);
    }

    let mut grid = GridPlacer::new(*layout);
    place_processes(&mut diagram, &ctx.process, ElementId::root(), &mut grid);
    for (kind, shapes) in [
        (ElementKind::Entity, &ctx.external_entity),
        (ElementKind::DataStore, &ctx.data_store),
    ] {
        for shape in shapes {
            let parent = resolve_parent(&diagram, &shape.id, shape.parent.as_deref());
            let position =
                resolve_position(&shape.id, shape.top.as_ref(), shape.left.as_ref(), &mut grid);
            let mut element = Element::new(
                ElementId::intern(&shape.id),
                kind,
                shape.label.as_str(),
                parent,
                position,
            );
            element.description = shape.description.clone();
            diagram.insert_element(element);
        }
    }

    let mut skipped = 0usize;
    for record in &ctx.data_flow {
        let from = ElementId::intern(&record.from);
        for to in record.to.iter() {
            let to = ElementId::intern(to);
            match diagram.create_flow(from, to, record.label.as_str()) {
                Ok(Some(id)) => diagram.set_flow_description(id, record.description.clone()),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("skipping data flow {from} -> {to}: {e}");
                    skipped += 1;
                }
            }
        }
    }

    log::debug!(
        "imported {} element(s), {} flow(s), skipped {skipped} flow(s)",
        diagram.element_count(),
        diagram.flows().len()
    );
    Ok(diagram)
}

fn check_id(id: &str, seen: &mut HashSet<String>) -> Result<(), FormatError> {
    if id.is_empty() || id == ROOT {
        return Err(FormatError::InvalidId(id.to_string()));
    }
    if !seen.insert(id.to_string()) {
        return Err(FormatError::DuplicateId(id.to_string()));
    }
    Ok(())
}

fn check_process_ids(processes: &[ProcessDoc], seen: &mut HashSet<String>) -> Result<(), FormatError> {
    for p in processes {
        check_id(&p.id, seen)?;
        check_process_ids(&p.process, seen)?;
    }
    Ok(())
}

/// Depth-first, parents before their children.
fn place_processes(
    diagram: &mut Diagram,
    processes: &[ProcessDoc],
    parent: ElementId,
    grid: &mut GridPlacer,
) {
    for p in processes {
        let id = ElementId::intern(&p.id);
        let position = resolve_position(&p.id, p.top.as_ref(), p.left.as_ref(), grid);
        let mut element = Element::new(id, ElementKind::Process, p.label.as_str(), parent, position);
        element.description = p.description.clone();
        diagram.insert_element(element);
        place_processes(diagram, &p.process, id, grid);
    }
}

/// Entities and data stores sit in a process's sub-diagram only when that
/// process was imported; anything else is placed at `root`.
fn resolve_parent(diagram: &Diagram, id: &str, parent: Option<&str>) -> ElementId {
    let Some(parent) = parent.filter(|p| !p.is_empty() && *p != ROOT) else {
        return ElementId::root();
    };
    let parent_id = ElementId::intern(parent);
    if diagram.element(parent_id).is_some_and(Element::is_process) {
        parent_id
    } else {
        log::warn!("`{id}` names unknown process `{parent}` as parent, placing it at root");
        ElementId::root()
    }
}

/// Explicit coordinates win; anything missing comes from the next grid slot.
fn resolve_position(
    id: &str,
    top: Option<&Coord>,
    left: Option<&Coord>,
    grid: &mut GridPlacer,
) -> Position {
    let top_v = top.and_then(Coord::value);
    let left_v = left.and_then(Coord::value);
    if let (Some(top), Some(left)) = (top_v, left_v) {
        return Position::new(top, left);
    }
    if (top.is_some() && top_v.is_none()) || (left.is_some() && left_v.is_none()) {
        log::warn!("unreadable coordinates on `{id}`, using auto-layout");
    }
    let slot = grid.next_slot();
    Position::new(top_v.unwrap_or(slot.top), left_v.unwrap_or(slot.left))
}
