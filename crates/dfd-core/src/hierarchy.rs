//! Drill-down navigation and level-based visibility.
//!
//! The view context is a stack of process IDs starting at `root`. Its top is
//! the process whose sub-diagram is on screen; `level` is the stack depth
//! minus one. Visibility is a read-only projection of the diagram for a
//! given context and is recomputed from scratch whenever anything changes.

use crate::id::{ElementId, FlowId};
use crate::model::{Diagram, Element, ElementKind};
use serde::Serialize;
use smallvec::{SmallVec, smallvec};
use std::collections::HashSet;
use std::fmt;

// ─── View context ────────────────────────────────────────────────────────

/// Stack of entered processes, bottom is always `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewContext {
    stack: SmallVec<[ElementId; 4]>,
}

impl ViewContext {
    pub fn new() -> Self {
        Self {
            stack: smallvec![ElementId::root()],
        }
    }

    /// Drill into a process. The caller checks that `process` is a process.
    pub fn enter(&mut self, process: ElementId) {
        self.stack.push(process);
        log::debug!("entered {process}, level {}", self.level());
    }

    /// Return to the parent level. At the top level this does nothing and
    /// returns `false`.
    pub fn exit(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        let left = self.stack.pop();
        log::debug!("left {left:?}, level {}", self.level());
        true
    }

    pub fn reset(&mut self) {
        self.stack.truncate(1);
    }

    /// Depth below the top-level diagram; 0 at the top.
    pub fn level(&self) -> usize {
        self.stack.len() - 1
    }

    /// The process whose sub-diagram is shown, or `root`.
    pub fn current(&self) -> ElementId {
        self.stack[self.stack.len() - 1]
    }

    /// The whole drill-down path, starting at `root`.
    pub fn path(&self) -> &[ElementId] {
        &self.stack
    }

    /// Drop every level from the first process that no longer exists in
    /// `diagram` upward. Returns `true` if the stack changed.
    pub fn retain_existing(&mut self, diagram: &Diagram) -> bool {
        let cut = self
            .stack
            .iter()
            .skip(1)
            .position(|id| !diagram.contains(*id))
            .map(|i| i + 1);
        match cut {
            Some(at) => {
                self.stack.truncate(at);
                true
            }
            None => false,
        }
    }

    /// Summary for the level indicator.
    pub fn info(&self, diagram: &Diagram) -> ContextInfo {
        let process_id = self.current();
        let label = if process_id.is_root() {
            String::new()
        } else {
            diagram
                .element(process_id)
                .map(|e| e.label.clone())
                .unwrap_or_default()
        };
        ContextInfo {
            level: self.level(),
            process_id,
            label,
        }
    }
}

impl Default for ViewContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the user currently is in the process tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    pub level: usize,
    pub process_id: ElementId,
    /// Label of the entered process; empty at the top level.
    pub label: String,
}

impl fmt::Display for ContextInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {}", self.level)?;
        if !self.process_id.is_root() {
            write!(f, ": {}", self.label)?;
        }
        Ok(())
    }
}

/// Whether a new element of `kind` may be added at `level`. Data stores only
/// make sense inside a process.
pub fn can_add(kind: ElementKind, level: usize) -> bool {
    match kind {
        ElementKind::DataStore => level >= 1,
        ElementKind::Process | ElementKind::Entity => true,
    }
}

// ─── Visibility ──────────────────────────────────────────────────────────

/// Level visibility rule for one element.
///
/// 1. Direct children of the context are shown, except data stores at level 0.
/// 2. Entities declared at `root` are shown on every level.
/// 3. Below the top level every data store is shown, whichever process it
///    belongs to.
/// 4. Everything else is hidden.
pub fn is_element_visible(element: &Element, context: ElementId, level: usize) -> bool {
    if element.parent == context {
        return !(element.kind == ElementKind::DataStore && level == 0);
    }
    match element.kind {
        ElementKind::Entity => element.parent.is_root(),
        ElementKind::DataStore => level >= 1,
        ElementKind::Process => false,
    }
}

/// IDs on screen for one context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    pub elements: HashSet<ElementId>,
    pub flows: HashSet<FlowId>,
}

impl VisibleSet {
    pub fn contains_element(&self, id: ElementId) -> bool {
        self.elements.contains(&id)
    }

    pub fn contains_flow(&self, id: FlowId) -> bool {
        self.flows.contains(&id)
    }

    /// Element IDs as sorted strings, for stable output.
    pub fn sorted_elements(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.elements.iter().map(|id| id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn sorted_flows(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.flows.iter().map(|id| id.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

/// Evaluate the visibility rules for every element, then keep the flows
/// whose two endpoints are both visible.
pub fn compute_visible_set(diagram: &Diagram, view: &ViewContext) -> VisibleSet {
    let context = view.current();
    let level = view.level();

    let elements: HashSet<ElementId> = diagram
        .elements()
        .filter(|e| is_element_visible(e, context, level))
        .map(|e| e.id)
        .collect();

    let flows = diagram
        .flows()
        .iter()
        .filter(|f| elements.contains(&f.from) && elements.contains(&f.to))
        .map(|f| f.id)
        .collect();

    VisibleSet { elements, flows }
}
