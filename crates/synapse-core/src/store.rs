use std::collections::HashSet;

use log::debug;
use serde_json::Value;
use tokio::sync::watch;

use crate::changes::{ElementId, GraphChange};
use crate::history::{GraphSnapshot, History, DEFAULT_HISTORY_LIMIT};
use crate::id::new_id;
use crate::model::{Anchor, DiagramState, Edge, EdgeData, Node, Selection, Viewport};
use crate::patch;
use crate::Result;

/// Lowest z-order a newly added service takes.
pub const SERVICE_LAYER: i64 = 10;
/// Highest z-order a newly added group takes.
pub const GROUP_LAYER: i64 = -1;
/// z-order assigned by [`DocumentStore::send_to_back`].
pub const BACK_LAYER: i64 = -5;
/// Canvas offset of a duplicate relative to its original.
pub const DUPLICATE_OFFSET: f64 = 20.0;
pub const COPY_SUFFIX: &str = " (Copy)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Owner of the live document and the only place it is mutated.
///
/// Every operation runs to completion or leaves the document untouched.
/// Structural mutations (anything that changes the node or edge sets) push
/// the pre-mutation graph onto the undo history. Structural and viewport
/// changes are published to [`subscribe`](Self::subscribe) receivers such as
/// autosave. Selection changes are neither recorded nor published.
#[derive(Debug)]
pub struct DocumentStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    viewport: Viewport,
    selection: Selection,
    history: History,
    /// `Some(recorded)` while a [`batch`](Self::batch) is open.
    batch: Option<bool>,
    changes: watch::Sender<DiagramState>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let (changes, _) = watch::channel(DiagramState::default());
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport: Viewport::default(),
            selection: Selection::default(),
            history: History::new(config.history_limit),
            batch: None,
            changes,
        }
    }

    // --- Reads ---

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index(id).map(|i| &self.nodes[i])
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index(id).map(|i| &self.edges[i])
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Nodes in paint order: ascending z-order, ties in insertion order.
    pub fn render_order(&self) -> Vec<&Node> {
        let mut ordered: Vec<&Node> = self.nodes.iter().collect();
        ordered.sort_by_key(|n| n.z_order);
        ordered
    }

    pub fn graph_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Copy of everything that gets persisted.
    pub fn diagram_state(&self) -> DiagramState {
        DiagramState {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            viewport: self.viewport,
        }
    }

    /// Watch the persisted slice. The receiver starts at the current state and
    /// is notified after every structural or viewport change.
    pub fn subscribe(&self) -> watch::Receiver<DiagramState> {
        let current = self.diagram_state();
        self.changes.send_if_modified(|state| {
            if *state == current {
                false
            } else {
                *state = current;
                true
            }
        });
        self.changes.subscribe()
    }

    // --- Nodes ---

    /// Insert a node. Groups go below every existing node, services above
    /// every group. The caller supplies a fresh ID.
    pub fn add_node(&mut self, mut node: Node) {
        debug_assert!(
            self.node_index(&node.id).is_none(),
            "duplicate node id {}",
            node.id
        );
        node.z_order = self.insertion_z_order(&node);
        self.checkpoint();
        let saturated = matches!(node.z_order, i64::MIN | i64::MAX);
        self.nodes.push(node);
        if saturated {
            repair_z_order(&mut self.nodes);
        }
        self.publish();
    }

    /// Shallow-merge a JSON object into the node's variant data. Unknown IDs
    /// are ignored; a patch that does not fit the variant is rejected and
    /// nothing changes.
    pub fn update_node(&mut self, id: &str, patch: Value) -> Result<()> {
        let patch = patch::as_object(patch)?;
        let Some(idx) = self.node_index(id) else {
            return Ok(());
        };
        let data = self.nodes[idx].data.patched(&patch)?;
        if data != self.nodes[idx].data {
            self.checkpoint();
            self.nodes[idx].data = data;
            self.publish();
        }
        Ok(())
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) {
        if self.node_index(id).is_none() {
            return;
        }
        self.checkpoint();
        self.drop_node(id);
        self.publish();
    }

    /// Clone a node under a new ID, offset so it does not sit on top of the
    /// original, and make it the only selected node. Returns the new ID.
    pub fn duplicate_node(&mut self, id: &str) -> Option<String> {
        let idx = self.node_index(id)?;
        let mut copy = self.nodes[idx].clone();
        copy.id = new_id();
        copy.position = copy.position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        copy.selected = true;
        let label = copy.data.label_mut();
        if !label.is_empty() {
            label.push_str(COPY_SUFFIX);
        }
        let copy_id = copy.id.clone();

        self.checkpoint();
        for node in &mut self.nodes {
            node.selected = false;
        }
        self.nodes.push(copy);
        self.selection = Selection {
            node: Some(copy_id.clone()),
            edge: None,
        };
        self.publish();
        Some(copy_id)
    }

    /// Raise the node above every other node. Array position is untouched.
    pub fn bring_to_front(&mut self, id: &str) {
        let Some(idx) = self.node_index(id) else {
            return;
        };
        let others_top = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, n)| n.z_order)
            .max();
        let Some(top) = others_top else {
            return;
        };
        if self.nodes[idx].z_order > top {
            return;
        }
        self.set_z_order(idx, top.max(0).saturating_add(1));
    }

    pub fn send_to_back(&mut self, id: &str) {
        if let Some(idx) = self.node_index(id) {
            self.set_z_order(idx, BACK_LAYER);
        }
    }

    // --- Edges ---

    pub fn add_edge(&mut self, edge: Edge) {
        self.add_edges([edge]);
    }

    /// Append edges as one mutation. Endpoints are not checked here so that
    /// batches can be assembled in any order; `load_state` drops dangling ones.
    pub fn add_edges(&mut self, edges: impl IntoIterator<Item = Edge>) {
        let edges: Vec<Edge> = edges.into_iter().collect();
        if edges.is_empty() {
            return;
        }
        self.checkpoint();
        self.edges.extend(edges);
        self.publish();
    }

    pub fn update_edge(&mut self, id: &str, patch: Value) -> Result<()> {
        let patch = patch::as_object(patch)?;
        let Some(idx) = self.edge_index(id) else {
            return Ok(());
        };
        let data = patch::merge(&self.edges[idx].data, &patch)?;
        if data != self.edges[idx].data {
            self.checkpoint();
            self.edges[idx].data = data;
            self.publish();
        }
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) {
        if self.edge_index(id).is_none() {
            return;
        }
        self.checkpoint();
        self.drop_edge(id);
        self.publish();
    }

    /// Create an edge with default styling between two nodes. Self-loops are
    /// allowed. An identical connection (same endpoints and anchors) is not
    /// added twice; `None` is returned in that case.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_anchor: Option<Anchor>,
        target_anchor: Option<Anchor>,
    ) -> Option<String> {
        let exists = self.edges.iter().any(|e| {
            e.source == source
                && e.target == target
                && e.source_anchor == source_anchor
                && e.target_anchor == target_anchor
        });
        if exists {
            return None;
        }
        let edge = Edge {
            id: new_id(),
            source: source.to_string(),
            target: target.to_string(),
            source_anchor,
            target_anchor,
            data: EdgeData::default(),
            selected: false,
        };
        let id = edge.id.clone();
        self.add_edges([edge]);
        Some(id)
    }

    // --- Canvas deltas ---

    /// Apply direct-manipulation deltas in order. The whole batch forms at
    /// most one undo checkpoint, and only if a structural delta hits an
    /// existing element.
    pub fn on_graph_change(&mut self, changes: impl IntoIterator<Item = GraphChange>) {
        let mut structural = false;
        for change in changes {
            if !structural && change.is_structural() && self.change_applies(&change) {
                self.checkpoint();
                structural = true;
            }
            self.apply_change(change);
        }
        if structural {
            self.publish();
        }
    }

    fn change_applies(&self, change: &GraphChange) -> bool {
        match change {
            GraphChange::Move { id, .. } | GraphChange::Resize { id, .. } => {
                self.node_index(id).is_some()
            }
            GraphChange::Select { target, .. } | GraphChange::Remove { target } => match target {
                ElementId::Node(id) => self.node_index(id).is_some(),
                ElementId::Edge(id) => self.edge_index(id).is_some(),
            },
        }
    }

    fn apply_change(&mut self, change: GraphChange) {
        match change {
            GraphChange::Move { id, position } => {
                if let Some(idx) = self.node_index(&id) {
                    self.nodes[idx].position = position;
                }
            }
            GraphChange::Resize { id, size } => {
                if let Some(idx) = self.node_index(&id) {
                    self.nodes[idx].size = Some(size);
                }
            }
            GraphChange::Select { target: ElementId::Node(id), selected } => {
                if let Some(idx) = self.node_index(&id) {
                    self.nodes[idx].selected = selected;
                }
            }
            GraphChange::Select { target: ElementId::Edge(id), selected } => {
                if let Some(idx) = self.edge_index(&id) {
                    self.edges[idx].selected = selected;
                }
            }
            GraphChange::Remove { target: ElementId::Node(id) } => self.drop_node(&id),
            GraphChange::Remove { target: ElementId::Edge(id) } => self.drop_edge(&id),
        }
    }

    // --- Selection and viewport ---

    /// Select a node (or nothing); always clears the edge selection.
    pub fn set_selected_node(&mut self, id: Option<&str>) {
        self.selection = Selection {
            node: id.map(str::to_string),
            edge: None,
        };
    }

    /// Select an edge (or nothing); always clears the node selection.
    pub fn set_selected_edge(&mut self, id: Option<&str>) {
        self.selection = Selection {
            node: None,
            edge: id.map(str::to_string),
        };
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.publish();
        }
    }

    // --- Whole document ---

    /// Replace the document wholesale. The input is repaired rather than
    /// rejected: groups are pushed behind services, dangling edges dropped,
    /// selection cleared. A missing viewport becomes the default one.
    pub fn load_state(&mut self, nodes: Vec<Node>, edges: Vec<Edge>, viewport: Option<Viewport>) {
        let graph = sanitize(GraphSnapshot { nodes, edges });
        self.checkpoint();
        self.nodes = graph.nodes;
        self.edges = graph.edges;
        self.viewport = viewport.unwrap_or_default().sanitized();
        self.selection = Selection::default();
        self.publish();
    }

    pub fn load(&mut self, state: DiagramState) {
        self.load_state(state.nodes, state.edges, Some(state.viewport));
    }

    /// Empty the graph and selection. The viewport stays where it is.
    pub fn clear_all(&mut self) {
        self.selection = Selection::default();
        if self.nodes.is_empty() && self.edges.is_empty() {
            return;
        }
        self.checkpoint();
        self.nodes.clear();
        self.edges.clear();
        self.publish();
    }

    // --- History ---

    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let current = self.graph_snapshot();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    /// Returns `false` when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let current = self.graph_snapshot();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Run several mutations as one undo step.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.batch.is_some() {
            return f(self);
        }
        self.batch = Some(false);
        let out = f(self);
        self.batch = None;
        out
    }

    // --- Internals ---

    fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().rposition(|n| n.id == id)
    }

    fn edge_index(&self, id: &str) -> Option<usize> {
        self.edges.iter().rposition(|e| e.id == id)
    }

    fn insertion_z_order(&self, node: &Node) -> i64 {
        if node.is_group() {
            let bottom = self.nodes.iter().map(|n| n.z_order).min();
            bottom.map_or(GROUP_LAYER, |z| z.saturating_sub(1).min(GROUP_LAYER))
        } else {
            let top_group = self.nodes.iter().filter(|n| n.is_group()).map(|n| n.z_order).max();
            match top_group {
                Some(z) if z >= SERVICE_LAYER => z.saturating_add(1),
                _ => SERVICE_LAYER,
            }
        }
    }

    fn set_z_order(&mut self, idx: usize, z: i64) {
        if self.nodes[idx].z_order == z {
            return;
        }
        self.checkpoint();
        self.nodes[idx].z_order = z;
        self.publish();
    }

    fn drop_node(&mut self, id: &str) {
        self.nodes.retain(|n| n.id != id);
        self.edges.retain(|e| !e.touches(id));
        self.prune_selection();
    }

    fn drop_edge(&mut self, id: &str) {
        self.edges.retain(|e| e.id != id);
        self.prune_selection();
    }

    fn prune_selection(&mut self) {
        let node_gone = self
            .selection
            .node
            .as_deref()
            .is_some_and(|id| self.node_index(id).is_none());
        if node_gone {
            self.selection.node = None;
        }
        let edge_gone = self
            .selection
            .edge
            .as_deref()
            .is_some_and(|id| self.edge_index(id).is_none());
        if edge_gone {
            self.selection.edge = None;
        }
    }

    fn restore(&mut self, graph: GraphSnapshot) {
        self.nodes = graph.nodes;
        self.edges = graph.edges;
        self.prune_selection();
        self.publish();
    }

    fn checkpoint(&mut self) {
        match self.batch {
            Some(true) => return,
            Some(false) => self.batch = Some(true),
            None => {}
        }
        let before = self.graph_snapshot();
        self.history.record(before);
    }

    fn publish(&self) {
        if self.changes.receiver_count() > 0 {
            self.changes.send_replace(self.diagram_state());
        }
    }
}

/// The repairs `load_state` applies: clear transient selection flags, push
/// every group below the lowest service, drop edges whose endpoints are
/// missing. A graph that needs no repair comes back unchanged.
pub fn sanitize(mut graph: GraphSnapshot) -> GraphSnapshot {
    for node in &mut graph.nodes {
        node.selected = false;
    }
    for edge in &mut graph.edges {
        edge.selected = false;
    }
    if repair_z_order(&mut graph.nodes) {
        debug!("moved groups behind services");
    }

    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let before = graph.edges.len();
    graph
        .edges
        .retain(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()));
    let dropped = before - graph.edges.len();
    if dropped > 0 {
        debug!("dropped {dropped} dangling edge(s)");
    }
    graph
}

/// Put every group below the lowest service, keeping relative order inside
/// each class. Groups are shifted down as a block; when that would leave the
/// i64 range both classes are re-ranked onto their insertion layers instead.
/// Returns whether anything moved.
fn repair_z_order(nodes: &mut [Node]) -> bool {
    let groups = || nodes.iter().filter(|n| n.is_group()).map(|n| n.z_order);
    let (Some(top_group), Some(bottom_group)) = (groups().max(), groups().min()) else {
        return false;
    };
    let Some(bottom_service) = nodes.iter().filter(|n| !n.is_group()).map(|n| n.z_order).min() else {
        return false;
    };
    if top_group < bottom_service {
        return false;
    }

    let shift = top_group
        .checked_sub(bottom_service)
        .and_then(|d| d.checked_add(1))
        .filter(|shift| bottom_group.checked_sub(*shift).is_some());
    match shift {
        Some(shift) => {
            for node in nodes.iter_mut().filter(|n| n.is_group()) {
                node.z_order -= shift;
            }
        }
        None => rerank(nodes),
    }
    true
}

/// Dense-rank z-orders per class: groups onto `..=GROUP_LAYER`, services
/// onto `SERVICE_LAYER..`. Equal values stay equal.
fn rerank(nodes: &mut [Node]) {
    let levels = |group: bool| {
        let mut zs: Vec<i64> = nodes
            .iter()
            .filter(|n| n.is_group() == group)
            .map(|n| n.z_order)
            .collect();
        zs.sort_unstable();
        zs.dedup();
        zs
    };
    let group_levels = levels(true);
    let service_levels = levels(false);
    let rank = |levels: &[i64], z: i64| levels.binary_search(&z).unwrap_or_else(|i| i) as i64;

    for node in nodes.iter_mut() {
        node.z_order = if node.is_group() {
            let below_top = group_levels.len() as i64 - 1 - rank(&group_levels, node.z_order);
            GROUP_LAYER - below_top
        } else {
            SERVICE_LAYER + rank(&service_levels, node.z_order)
        };
    }
}
