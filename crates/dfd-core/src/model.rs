//! Diagram data model: elements, data flows, and the registry that owns them.
//!
//! Containment is a tree rooted at the `root` sentinel. Processes may hold a
//! nested sub-diagram; the registry keeps parent → child edges for live
//! processes in a `StableDiGraph` so child queries do not scan every element.
//! Every element's `parent` is `root` or a live process, and each non-root
//! parent has exactly one edge to its child, so the edges and the `parent`
//! fields always describe the same tree.

use crate::error::{DiagramError, Result};
use crate::id::{ElementId, FlowId, split_counter};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ─── Elements ────────────────────────────────────────────────────────────

/// The three node kinds of a data-flow diagram. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Process,
    DataStore,
    Entity,
}

impl ElementKind {
    pub const ALL: [ElementKind; 3] = [
        ElementKind::Process,
        ElementKind::DataStore,
        ElementKind::Entity,
    ];

    /// ID prefix used when minting (`p1`, `s1`, `e1`).
    pub const fn tag(self) -> char {
        match self {
            ElementKind::Process => 'p',
            ElementKind::DataStore => 's',
            ElementKind::Entity => 'e',
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementKind::Process => "process",
            ElementKind::DataStore => "data-store",
            ElementKind::Entity => "entity",
        }
    }

    /// Parse a kind name. Accepts the exchange-file bucket names and the
    /// short forms used by the page toolbar.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "process" => Some(ElementKind::Process),
            "data-store" | "datastore" | "store" => Some(ElementKind::DataStore),
            "entity" | "external-entity" => Some(ElementKind::Entity),
            _ => None,
        }
    }

    /// Label given to freshly added shapes.
    pub const fn default_label(self) -> &'static str {
        match self {
            ElementKind::Process => "New process",
            ElementKind::DataStore => "New data store",
            ElementKind::Entity => "New entity",
        }
    }
}

/// Top-left corner of a shape in un-zoomed content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub top: f32,
    pub left: f32,
}

impl Position {
    pub const fn new(top: f32, left: f32) -> Self {
        Self { top, left }
    }
}

/// Where a shape lands when the caller gives no position.
pub const DEFAULT_POSITION: Position = Position::new(100.0, 100.0);

/// A diagram node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub label: String,
    pub description: String,
    /// Enclosing process, or the `root` sentinel.
    pub parent: ElementId,
    pub position: Position,
}

impl Element {
    pub fn new(
        id: ElementId,
        kind: ElementKind,
        label: impl Into<String>,
        parent: ElementId,
        position: Position,
    ) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            description: String::new(),
            parent,
            position,
        }
    }

    pub fn is_process(&self) -> bool {
        self.kind == ElementKind::Process
    }
}

// ─── Flows ───────────────────────────────────────────────────────────────

/// A directed, labeled data flow between two elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub id: FlowId,
    pub from: ElementId,
    pub to: ElementId,
    pub label: String,
    pub description: String,
}

// ─── ID counters ─────────────────────────────────────────────────────────

/// Next number to mint for each ID family. Only ever grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub process: u32,
    pub entity: u32,
    pub data_store: u32,
    pub flow: u32,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            process: 1,
            entity: 1,
            data_store: 1,
            flow: 1,
        }
    }
}

impl Counters {
    fn slot_mut(&mut self, kind: ElementKind) -> &mut u32 {
        match kind {
            ElementKind::Process => &mut self.process,
            ElementKind::DataStore => &mut self.data_store,
            ElementKind::Entity => &mut self.entity,
        }
    }

    /// The number the next element of `kind` will receive.
    pub fn peek(&self, kind: ElementKind) -> u32 {
        match kind {
            ElementKind::Process => self.process,
            ElementKind::DataStore => self.data_store,
            ElementKind::Entity => self.entity,
        }
    }

    fn mint(&mut self, kind: ElementKind) -> String {
        let slot = self.slot_mut(kind);
        let n = *slot;
        *slot = slot.saturating_add(1);
        format!("{}{n}", kind.tag())
    }

    fn mint_flow(&mut self) -> String {
        let n = self.flow;
        self.flow = self.flow.saturating_add(1);
        format!("flow{n}")
    }

    /// Raise the counter selected by the ID's prefix letter so that it is
    /// strictly greater than the ID's numeric suffix. IDs without a known
    /// prefix or without a numeric suffix are ignored.
    pub fn observe(&mut self, id: &str) {
        let Some((tag, n)) = split_counter(id) else {
            return;
        };
        let kind = match tag {
            'p' => ElementKind::Process,
            'e' => ElementKind::Entity,
            's' => ElementKind::DataStore,
            _ => return,
        };
        let slot = self.slot_mut(kind);
        if n >= *slot {
            *slot = n.saturating_add(1);
        }
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

/// The whole diagram: elements, flows, ID counters, and display title.
#[derive(Debug, Clone)]
pub struct Diagram {
    /// Elements, with parent → child edges between live processes and their children.
    graph: StableDiGraph<Element, ()>,

    /// Index from ElementId → NodeIndex for fast lookup.
    id_index: HashMap<ElementId, NodeIndex>,

    flows: Vec<Flow>,

    counters: Counters,

    /// Canvas title shown above the diagram.
    title: String,

    /// Free-text description of the whole system (`context.description`).
    description: String,
}

impl Diagram {
    /// Create an empty diagram with fresh counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            flows: Vec::new(),
            counters: Counters::default(),
            title: String::new(),
            description: String::new(),
        }
    }

    /// Look up an element by ID.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        let idx = self
            .id_index
            .get(&id)
            .copied()
            .ok_or(DiagramError::UnknownElement(id))?;
        Ok(&mut self.graph[idx])
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// All elements in storage order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn element_count(&self) -> usize {
        self.id_index.len()
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows.iter().find(|f| f.id == id)
    }

    /// The flow for an ordered `(from, to)` pair, if any.
    pub fn flow_between(&self, from: ElementId, to: ElementId) -> Option<&Flow> {
        self.flows.iter().find(|f| f.from == from && f.to == to)
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub(crate) fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    // ─── Elements ────────────────────────────────────────────────────────

    /// Add a new element under `parent` and return its minted ID.
    ///
    /// `parent` must be `root` or an existing process. Without a position the
    /// shape is placed at [`DEFAULT_POSITION`].
    pub fn create_element(
        &mut self,
        kind: ElementKind,
        label: impl Into<String>,
        parent: ElementId,
        position: Option<Position>,
    ) -> Result<ElementId> {
        self.check_parent(parent)?;
        let id = self.mint_element_id(kind);
        let element = Element::new(
            id,
            kind,
            label,
            parent,
            position.unwrap_or(DEFAULT_POSITION),
        );
        self.insert_element(element);
        log::debug!("created {} {id} under {parent}", kind.name());
        Ok(id)
    }

    fn check_parent(&self, parent: ElementId) -> Result<()> {
        if parent.is_root() {
            return Ok(());
        }
        match self.element(parent) {
            None => Err(DiagramError::UnknownParent(parent)),
            Some(p) if !p.is_process() => Err(DiagramError::ParentNotProcess(parent)),
            Some(_) => Ok(()),
        }
    }

    /// Mint the next ID for `kind`, skipping any that are already taken.
    fn mint_element_id(&mut self, kind: ElementKind) -> ElementId {
        loop {
            let id = ElementId::intern(&self.counters.mint(kind));
            if !self.contains(id) {
                return id;
            }
        }
    }

    /// Store an element as-is, linking it under its parent process. The
    /// caller guarantees the ID is unused and the parent is `root` or an
    /// already stored process.
    pub(crate) fn insert_element(&mut self, element: Element) -> NodeIndex {
        let id = element.id;
        let parent = element.parent;
        let idx = self.graph.add_node(element);
        self.id_index.insert(id, idx);
        if let Some(&parent_idx) = self.id_index.get(&parent)
            && self.graph[parent_idx].is_process()
        {
            self.graph.add_edge(parent_idx, idx, ());
        }
        idx
    }

    /// Remove an element and every flow that starts or ends at it. Deleting
    /// a process takes its whole sub-diagram with it, so no element is ever
    /// left pointing at a parent that no longer exists. Returns the element
    /// named by `id`.
    pub fn delete_element(&mut self, id: ElementId) -> Option<Element> {
        let idx = self.id_index.get(&id).copied()?;

        let mut subtree = Vec::new();
        let mut dfs = Dfs::new(&self.graph, idx);
        while let Some(n) = dfs.next(&self.graph) {
            subtree.push(n);
        }
        let removed: HashSet<ElementId> = subtree.iter().map(|&n| self.graph[n].id).collect();
        for gone in &removed {
            self.id_index.remove(gone);
        }

        let before = self.flows.len();
        self.flows
            .retain(|f| !removed.contains(&f.from) && !removed.contains(&f.to));
        log::debug!(
            "deleted {id} with {} nested element(s) and {} flow(s)",
            removed.len() - 1,
            before - self.flows.len()
        );

        for &n in subtree.iter().filter(|&&n| n != idx) {
            self.graph.remove_node(n);
        }
        self.graph.remove_node(idx)
    }

    pub fn rename_element(&mut self, id: ElementId, label: impl Into<String>) -> Result<()> {
        self.element_mut(id)?.label = label.into();
        Ok(())
    }

    pub fn set_element_description(
        &mut self,
        id: ElementId,
        description: impl Into<String>,
    ) -> Result<()> {
        self.element_mut(id)?.description = description.into();
        Ok(())
    }

    pub fn move_element(&mut self, id: ElementId, position: Position) -> Result<()> {
        self.element_mut(id)?.position = position;
        Ok(())
    }

    /// Whether any element lives inside `id`'s sub-diagram. Processes without
    /// children are the "no-detail" leaves.
    pub fn has_children(&self, id: ElementId) -> bool {
        if id.is_root() {
            return self.elements().any(|e| e.parent.is_root());
        }
        self.id_index.get(&id).is_some_and(|&idx| {
            self.graph
                .neighbors_directed(idx, Direction::Outgoing)
                .next()
                .is_some()
        })
    }

    /// Direct children of `id` (or of the top level for `root`) in storage order.
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        if id.is_root() {
            return self
                .elements()
                .filter(|e| e.parent.is_root())
                .map(|e| e.id)
                .collect();
        }
        let Some(&idx) = self.id_index.get(&id) else {
            return Vec::new();
        };
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        children.sort();
        children.into_iter().map(|c| self.graph[c].id).collect()
    }

    // ─── Flows ───────────────────────────────────────────────────────────

    /// Connect two elements. Returns `Ok(None)` when the ordered pair is
    /// already connected; the existing flow is left untouched.
    pub fn create_flow(
        &mut self,
        from: ElementId,
        to: ElementId,
        label: impl Into<String>,
    ) -> Result<Option<FlowId>> {
        for end in [from, to] {
            if !self.contains(end) {
                return Err(DiagramError::UnknownElement(end));
            }
        }
        if self.flow_between(from, to).is_some() {
            log::debug!("flow {from} -> {to} already exists");
            return Ok(None);
        }
        let id = self.mint_flow_id();
        self.flows.push(Flow {
            id,
            from,
            to,
            label: label.into(),
            description: String::new(),
        });
        Ok(Some(id))
    }

    fn mint_flow_id(&mut self) -> FlowId {
        loop {
            let id = FlowId::intern(&self.counters.mint_flow());
            if self.flow(id).is_none() {
                return id;
            }
        }
    }

    /// Remove the flow for an ordered pair, if present.
    pub fn delete_flow(&mut self, from: ElementId, to: ElementId) -> Option<Flow> {
        let pos = self
            .flows
            .iter()
            .position(|f| f.from == from && f.to == to)?;
        Some(self.flows.remove(pos))
    }

    pub fn set_flow_label(&mut self, id: FlowId, label: impl Into<String>) -> Result<()> {
        let flow = self
            .flows
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(DiagramError::UnknownFlow(id))?;
        flow.label = label.into();
        Ok(())
    }

    pub(crate) fn set_flow_description(&mut self, id: FlowId, description: String) {
        if let Some(flow) = self.flows.iter_mut().find(|f| f.id == id) {
            flow.description = description;
        }
    }

    /// Remove every element and flow. Counters and title are kept, so IDs
    /// minted afterwards never repeat earlier ones.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.id_index.clear();
        self.flows.clear();
    }
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn root() -> ElementId {
        ElementId::root()
    }

    #[test]
    fn ids_are_minted_per_kind() {
        let mut d = Diagram::new();
        let p = d
            .create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        let e = d
            .create_element(ElementKind::Entity, "Customer", root(), None)
            .unwrap();
        let p2 = d
            .create_element(ElementKind::Process, "B", p, None)
            .unwrap();
        let s = d
            .create_element(ElementKind::DataStore, "Orders", p, None)
            .unwrap();

        assert_eq!(p.as_str(), "p1");
        assert_eq!(e.as_str(), "e1");
        assert_eq!(p2.as_str(), "p2");
        assert_eq!(s.as_str(), "s1");
        assert_eq!(d.element(p2).unwrap().parent, p);
        assert_eq!(d.element(p).unwrap().position, DEFAULT_POSITION);
    }

    #[test]
    fn parent_must_be_existing_process() {
        let mut d = Diagram::new();
        let e = d
            .create_element(ElementKind::Entity, "Bank", root(), None)
            .unwrap();
        let missing = ElementId::intern("p404");

        assert_eq!(
            d.create_element(ElementKind::Process, "x", missing, None),
            Err(DiagramError::UnknownParent(missing))
        );
        assert_eq!(
            d.create_element(ElementKind::Process, "x", e, None),
            Err(DiagramError::ParentNotProcess(e))
        );
        assert_eq!(d.element_count(), 1);
    }

    #[test]
    fn duplicate_flow_is_absorbed() {
        let mut d = Diagram::new();
        let a = d
            .create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        let b = d
            .create_element(ElementKind::Process, "B", root(), None)
            .unwrap();

        let first = d.create_flow(a, b, "order").unwrap();
        let second = d.create_flow(a, b, "other label").unwrap();

        assert_eq!(first.map(|f| f.as_str().to_string()), Some("flow1".into()));
        assert_eq!(second, None);
        assert_eq!(d.flows().len(), 1);
        assert_eq!(d.flows()[0].label, "order");

        // The reverse direction is a different pair.
        assert!(d.create_flow(b, a, "").unwrap().is_some());
        assert_eq!(d.flows().len(), 2);
    }

    #[test]
    fn flow_endpoints_must_exist() {
        let mut d = Diagram::new();
        let a = d
            .create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        let ghost = ElementId::intern("e99");
        assert_eq!(
            d.create_flow(a, ghost, ""),
            Err(DiagramError::UnknownElement(ghost))
        );
    }

    #[test]
    fn delete_element_cascades_to_flows() {
        let mut d = Diagram::new();
        let a = d
            .create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        let b = d
            .create_element(ElementKind::Entity, "B", root(), None)
            .unwrap();
        let c = d
            .create_element(ElementKind::Entity, "C", root(), None)
            .unwrap();
        d.create_flow(a, b, "").unwrap();
        d.create_flow(b, a, "").unwrap();
        d.create_flow(b, c, "").unwrap();

        let removed = d.delete_element(a).unwrap();
        assert_eq!(removed.id, a);
        assert!(d.element(a).is_none());
        assert_eq!(d.flows().len(), 1);
        assert!(d.flows().iter().all(|f| d.contains(f.from) && d.contains(f.to)));
        assert!(d.delete_element(a).is_none());
    }

    #[test]
    fn delete_flow_by_pair() {
        let mut d = Diagram::new();
        let a = d
            .create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        let b = d
            .create_element(ElementKind::Process, "B", root(), None)
            .unwrap();
        d.create_flow(a, b, "x").unwrap();

        assert!(d.delete_flow(b, a).is_none());
        assert_eq!(d.delete_flow(a, b).map(|f| f.label), Some("x".into()));
        assert!(d.flows().is_empty());
    }

    #[test]
    fn has_children_tracks_sub_diagrams() {
        let mut d = Diagram::new();
        let p1 = d
            .create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        let p2 = d
            .create_element(ElementKind::Process, "B", root(), None)
            .unwrap();
        assert!(!d.has_children(p1));

        let child = d
            .create_element(ElementKind::Process, "A.1", p1, None)
            .unwrap();
        assert!(d.has_children(p1));
        assert!(!d.has_children(p2));
        assert!(d.has_children(root()));
        assert_eq!(d.children(p1), vec![child]);
        assert_eq!(d.children(root()), vec![p1, p2]);

        d.delete_element(child);
        assert!(!d.has_children(p1));
    }

    #[test]
    fn deleting_a_process_removes_its_sub_diagram() {
        let mut d = Diagram::new();
        let e1 = d
            .create_element(ElementKind::Entity, "Customer", root(), None)
            .unwrap();
        let p1 = d
            .create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        let p2 = d
            .create_element(ElementKind::Process, "A.1", p1, None)
            .unwrap();
        let p3 = d
            .create_element(ElementKind::Process, "A.1.1", p2, None)
            .unwrap();
        let s1 = d
            .create_element(ElementKind::DataStore, "Orders", p2, None)
            .unwrap();
        d.create_flow(e1, p3, "order").unwrap();
        d.create_flow(p3, s1, "").unwrap();

        let removed = d.delete_element(p1).unwrap();
        assert_eq!(removed.id, p1);
        for gone in [p1, p2, p3, s1] {
            assert!(!d.contains(gone), "{gone} survived");
        }
        assert!(d.flows().is_empty());
        assert_eq!(d.children(root()), vec![e1]);
        assert_eq!(d.element_count(), 1);
    }

    #[test]
    fn every_parent_is_root_or_a_live_process() {
        let mut d = Diagram::new();
        let p1 = d
            .create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        let p2 = d
            .create_element(ElementKind::Process, "B", p1, None)
            .unwrap();
        d.create_element(ElementKind::DataStore, "Orders", p2, None)
            .unwrap();
        d.create_element(ElementKind::Process, "C", root(), None)
            .unwrap();
        d.delete_element(p2);

        for e in d.elements() {
            assert!(
                e.parent.is_root() || d.element(e.parent).is_some_and(Element::is_process),
                "{} has dangling parent {}",
                e.id,
                e.parent
            );
        }
        for e in d.elements().filter(|e| e.is_process()) {
            let by_field = d.elements().any(|c| c.parent == e.id);
            assert_eq!(d.has_children(e.id), by_field, "{}", e.id);
        }
    }

    #[test]
    fn counters_observe_prefixed_ids() {
        let mut c = Counters::default();
        c.observe("p7");
        c.observe("p3");
        c.observe("e2");
        c.observe("s10");
        c.observe("x99");
        c.observe("flow40");
        assert_eq!(c.process, 8);
        assert_eq!(c.entity, 3);
        assert_eq!(c.data_store, 11);
        assert_eq!(c.flow, 1);
    }

    #[test]
    fn clear_keeps_counters_and_title() {
        let mut d = Diagram::new();
        d.set_title("Order system");
        d.create_element(ElementKind::Process, "A", root(), None)
            .unwrap();
        d.clear();
        assert_eq!(d.element_count(), 0);
        assert_eq!(d.title(), "Order system");
        let next = d
            .create_element(ElementKind::Process, "B", root(), None)
            .unwrap();
        assert_eq!(next.as_str(), "p2");
    }

    #[test]
    fn edits_report_unknown_targets() {
        let mut d = Diagram::new();
        let ghost = ElementId::intern("p77");
        assert_eq!(
            d.rename_element(ghost, "x"),
            Err(DiagramError::UnknownElement(ghost))
        );
        let flow = FlowId::intern("flow77");
        assert_eq!(
            d.set_flow_label(flow, "x"),
            Err(DiagramError::UnknownFlow(flow))
        );
    }
}
