use std::collections::VecDeque;

use crate::model::{Edge, Node};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// The structural slice of a document. Viewport and selection are never
/// captured, so panning or selecting cannot create an undo checkpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Bounded undo/redo log of deep snapshots.
///
/// `past` holds the states to return to on undo (oldest first) and is capped
/// at `limit`; pushing beyond the cap evicts the oldest entry. `future` holds
/// the states undone since the last mutation and is discarded on the next one.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<GraphSnapshot>,
    future: Vec<GraphSnapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            future: Vec::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record the state as it was before a structural mutation.
    pub fn record(&mut self, before: GraphSnapshot) {
        self.future.clear();
        self.push_past(before);
    }

    /// Step back: returns the state to restore, taking `current` onto the
    /// redo stack. `None` when there is nothing to undo.
    pub fn undo(&mut self, current: GraphSnapshot) -> Option<GraphSnapshot> {
        let previous = self.past.pop_back()?;
        self.future.push(current);
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: GraphSnapshot) -> Option<GraphSnapshot> {
        let next = self.future.pop()?;
        self.push_past(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    fn push_past(&mut self, snapshot: GraphSnapshot) {
        if self.limit == 0 {
            return;
        }
        while self.past.len() >= self.limit {
            self.past.pop_front();
        }
        self.past.push_back(snapshot);
    }
}
