use std::borrow::Cow;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::icons::{self, IconDescriptor};
use crate::patch;
use crate::Result;

// --- Geometry ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Camera transform of the canvas. Never part of undo history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, zoom: 1.0 }
    }
}

impl Viewport {
    /// Map a point in widget space to canvas units.
    pub fn screen_to_canvas(&self, point: Position) -> Position {
        Position::new((point.x - self.x) / self.zoom, (point.y - self.y) / self.zoom)
    }

    /// Replace a zoom that is zero, negative or not finite with 1.
    pub fn sanitized(self) -> Self {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self
        } else {
            Self { zoom: 1.0, ..self }
        }
    }
}

// --- Enumerations ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Active,
    Warning,
    Error,
    #[default]
    Idle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    Cyan,
    Purple,
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EdgeColor {
    #[default]
    Cyan,
    Purple,
    Green,
    Red,
    Yellow,
    Blue,
    Orange,
    Pink,
    White,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    #[default]
    Default,
    Straight,
    Step,
    Smoothstep,
}

/// Connection slot on a node: one of four sides, acting as source or target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopSource,
    TopTarget,
    RightSource,
    RightTarget,
    BottomSource,
    BottomTarget,
    LeftSource,
    LeftTarget,
}

// --- Node data ---

/// A metadata value: free text or a number. Integers are kept apart from
/// floats so `8080` is written back as `8080`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum MetaValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        MetaValue::Number(n)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Integer(n)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceData {
    pub label: String,
    /// Key into the icon catalog; unknown keys render with the default icon.
    #[serde(rename = "icon", default = "default_icon_key")]
    pub icon_key: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, MetaValue>,
    /// Keys this build does not model, kept so they round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_icon_key() -> String {
    icons::DEFAULT_ICON.to_string()
}

impl ServiceData {
    pub fn new(label: impl Into<String>, icon_key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon_key: icon_key.into(),
            status: NodeStatus::default(),
            description: None,
            metadata: IndexMap::new(),
            extra: Map::new(),
        }
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn icon(&self) -> &'static IconDescriptor {
        icons::resolve(&self.icon_key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupData {
    pub label: String,
    #[serde(default)]
    pub color: GroupColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GroupData {
    pub fn new(label: impl Into<String>, color: GroupColor) -> Self {
        Self {
            label: label.into(),
            color,
            description: None,
            extra: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Service,
    Group,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Service(ServiceData),
    Group(GroupData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Service(_) => NodeKind::Service,
            NodeData::Group(_) => NodeKind::Group,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NodeData::Service(d) => &d.label,
            NodeData::Group(d) => &d.label,
        }
    }

    pub fn label_mut(&mut self) -> &mut String {
        match self {
            NodeData::Service(d) => &mut d.label,
            NodeData::Group(d) => &mut d.label,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            NodeData::Service(d) => d.description.as_deref(),
            NodeData::Group(d) => d.description.as_deref(),
        }
    }

    fn to_value(&self) -> Value {
        let value = match self {
            NodeData::Service(d) => serde_json::to_value(d),
            NodeData::Group(d) => serde_json::to_value(d),
        };
        value.unwrap_or_default()
    }

    fn from_value(kind: NodeKind, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            NodeKind::Service => NodeData::Service(serde_json::from_value(value)?),
            NodeKind::Group => NodeData::Group(serde_json::from_value(value)?),
        })
    }

    /// Shallow-merge `patch` over this data, keeping the variant.
    pub fn patched(&self, patch: &Map<String, Value>) -> Result<Self> {
        match self {
            NodeData::Service(d) => patch::merge(d, patch).map(NodeData::Service),
            NodeData::Group(d) => patch::merge(d, patch).map(NodeData::Group),
        }
    }
}

// --- Nodes ---

/// A vertex of the diagram. On the wire the variant is carried by `type`
/// (`service` / `group`) and its fields live under `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRepr", into = "NodeRepr")]
pub struct Node {
    pub id: String,
    pub position: Position,
    pub size: Option<Size>,
    /// Render-order hint; higher draws later.
    pub z_order: i64,
    /// Transient UI flag.
    pub selected: bool,
    pub data: NodeData,
}

impl Node {
    pub fn service(id: impl Into<String>, position: Position, data: ServiceData) -> Self {
        Self::with_data(id, position, NodeData::Service(data))
    }

    pub fn group(id: impl Into<String>, position: Position, data: GroupData) -> Self {
        Self::with_data(id, position, NodeData::Group(data))
    }

    fn with_data(id: impl Into<String>, position: Position, data: NodeData) -> Self {
        Self {
            id: id.into(),
            position,
            size: None,
            z_order: 0,
            selected: false,
            data,
        }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.data, NodeData::Group(_))
    }

    pub fn label(&self) -> &str {
        self.data.label()
    }

    pub fn as_service(&self) -> Option<&ServiceData> {
        match &self.data {
            NodeData::Service(d) => Some(d),
            NodeData::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupData> {
        match &self.data {
            NodeData::Group(d) => Some(d),
            NodeData::Service(_) => None,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[schemars(rename = "Node")]
struct NodeRepr {
    id: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default)]
    position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<Size>,
    #[serde(rename = "zIndex", default)]
    z_order: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    selected: bool,
    /// Variant fields, shaped by `type`.
    data: Value,
    /// Older files keep the size as measured `width`/`height` on the node or
    /// inside `style`. Read only when `size` is absent.
    #[serde(default, skip_serializing)]
    width: Option<f64>,
    #[serde(default, skip_serializing)]
    height: Option<f64>,
    #[serde(default, skip_serializing)]
    style: Option<Value>,
}

impl NodeRepr {
    fn legacy_size(&self) -> Option<Size> {
        if let (Some(width), Some(height)) = (self.width, self.height) {
            return Some(Size::new(width, height));
        }
        let style = self.style.as_ref()?;
        let width = style.get("width")?.as_f64()?;
        let height = style.get("height")?.as_f64()?;
        Some(Size::new(width, height))
    }
}

impl TryFrom<NodeRepr> for Node {
    type Error = serde_json::Error;

    fn try_from(repr: NodeRepr) -> std::result::Result<Self, Self::Error> {
        let size = repr.size.or_else(|| repr.legacy_size());
        Ok(Node {
            data: NodeData::from_value(repr.kind, repr.data)?,
            id: repr.id,
            position: repr.position,
            size,
            z_order: repr.z_order,
            selected: repr.selected,
        })
    }
}

impl From<Node> for NodeRepr {
    fn from(node: Node) -> Self {
        NodeRepr {
            kind: node.data.kind(),
            data: node.data.to_value(),
            id: node.id,
            position: node.position,
            size: node.size,
            z_order: node.z_order,
            selected: node.selected,
            width: None,
            height: None,
            style: None,
        }
    }
}

impl JsonSchema for Node {
    fn schema_name() -> Cow<'static, str> {
        NodeRepr::schema_name()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        NodeRepr::json_schema(generator)
    }
}

// --- Edges ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default)]
    pub color: EdgeColor,
    #[serde(default = "default_true")]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub path_style: PathStyle,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EdgeData {
    fn default() -> Self {
        Self {
            color: EdgeColor::Cyan,
            animated: true,
            label: None,
            path_style: PathStyle::Default,
            extra: Map::new(),
        }
    }
}

impl EdgeData {
    pub fn colored(color: EdgeColor) -> Self {
        Self { color, ..Self::default() }
    }
}

/// A directed connection between two node IDs. Edges never own nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "sourceHandle", default, skip_serializing_if = "Option::is_none")]
    pub source_anchor: Option<Anchor>,
    #[serde(rename = "targetHandle", default, skip_serializing_if = "Option::is_none")]
    pub target_anchor: Option<Anchor>,
    #[serde(default)]
    pub data: EdgeData,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_anchor: None,
            target_anchor: None,
            data: EdgeData::default(),
            selected: false,
        }
    }

    pub fn with_data(mut self, data: EdgeData) -> Self {
        self.data = data;
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

// --- Document slices ---

/// Selected element. At most one of the two is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub node: Option<String>,
    pub edge: Option<String>,
}

/// The persisted slice of a document: everything except selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramState {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub viewport: Viewport,
}
