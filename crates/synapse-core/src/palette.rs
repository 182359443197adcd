//! Palette drag payloads and what dropping one onto the canvas does.

use serde::{Deserialize, Serialize};

use crate::icons::{IconDescriptor, DEFAULT_ICON};
use crate::id::new_id;
use crate::model::{GroupColor, GroupData, Node, NodeStatus, Position, ServiceData, Size};
use crate::store::DocumentStore;
use crate::templates;
use crate::{Error, Result};

/// Clipboard format the palette writes and the canvas reads.
pub const DRAG_MIME: &str = "application/synapse";
pub const DEFAULT_GRID_SIZE: f64 = 16.0;
pub const GROUP_DROP_SIZE: Size = Size::new(400.0, 300.0);
pub const SERVICE_DROP_SIZE: Size = Size::new(280.0, 180.0);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DragKind {
    #[default]
    Service,
    Group,
    Template,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    #[serde(default)]
    pub icon: String,
    pub label: String,
    #[serde(default, alias = "type")]
    pub kind: DragKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl DragPayload {
    /// Payload for a catalog entry; entries with a template ID drop as templates.
    pub fn from_icon(descriptor: &IconDescriptor) -> Self {
        Self {
            icon: descriptor.key.to_string(),
            label: descriptor.name.to_string(),
            kind: if descriptor.template_id.is_some() {
                DragKind::Template
            } else {
                DragKind::Service
            },
            template_id: descriptor.template_id.map(str::to_string),
        }
    }

    pub fn group(label: impl Into<String>) -> Self {
        Self {
            icon: DEFAULT_ICON.to_string(),
            label: label.into(),
            kind: DragKind::Group,
            template_id: None,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Malformed(format!("drag payload: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Round each coordinate to the nearest grid line, halves rounding up.
pub fn snap_to_grid(point: Position, grid: f64) -> Position {
    if grid.is_nan() || grid <= 0.0 {
        return point;
    }
    let snap = |v: f64| (v / grid + 0.5).floor() * grid;
    Position::new(snap(point.x), snap(point.y))
}

/// Handle a drop at `at` (canvas coordinates). Groups and services become a
/// single selected node; templates are expanded with their corner on the
/// snapped point. Everything lands in one undo checkpoint. Returns the IDs of
/// the inserted nodes.
pub fn apply_drop(
    store: &mut DocumentStore,
    payload: &DragPayload,
    at: Position,
    grid: f64,
) -> Result<Vec<String>> {
    let at = snap_to_grid(at, grid);
    let node = match payload.kind {
        DragKind::Template => {
            let id = payload
                .template_id
                .as_deref()
                .ok_or_else(|| Error::Malformed("template drop without a templateId".into()))?;
            return templates::instantiate(store, id, at);
        }
        DragKind::Group => Node::group(
            new_id(),
            at,
            GroupData::new(payload.label.clone(), GroupColor::Cyan).with_description(""),
        )
        .with_size(GROUP_DROP_SIZE),
        DragKind::Service => {
            let icon = if payload.icon.is_empty() {
                DEFAULT_ICON
            } else {
                payload.icon.as_str()
            };
            let mut data = ServiceData::new(payload.label.clone(), icon).with_status(NodeStatus::Idle);
            data.description = Some(String::new());
            Node::service(new_id(), at, data).with_size(SERVICE_DROP_SIZE)
        }
    };

    let id = node.id.clone();
    store.batch(|store| {
        store.add_node(node);
        store.set_selected_node(Some(&id));
    });
    Ok(vec![id])
}
