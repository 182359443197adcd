use serde::{Deserialize, Serialize};

use crate::model::{Position, Size};

/// Address of a node or an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ElementId {
    Node(String),
    Edge(String),
}

/// One delta reported by the canvas for direct manipulation: dragging,
/// resizing, marquee or click selection, and keyboard deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphChange {
    Move { id: String, position: Position },
    Resize { id: String, size: Size },
    Select { target: ElementId, selected: bool },
    Remove { target: ElementId },
}

impl GraphChange {
    pub fn move_node(id: impl Into<String>, position: Position) -> Self {
        GraphChange::Move { id: id.into(), position }
    }

    pub fn resize_node(id: impl Into<String>, size: Size) -> Self {
        GraphChange::Resize { id: id.into(), size }
    }

    pub fn select(target: ElementId, selected: bool) -> Self {
        GraphChange::Select { target, selected }
    }

    pub fn remove(target: ElementId) -> Self {
        GraphChange::Remove { target }
    }

    /// Selection toggles are not structural and never reach undo history.
    pub fn is_structural(&self) -> bool {
        !matches!(self, GraphChange::Select { .. })
    }
}
