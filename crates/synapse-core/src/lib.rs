//! Document model and state engine for Synapse architecture diagrams.
//!
//! [`DocumentStore`] owns the live graph and is the only way to mutate it;
//! undo history, template expansion and the saved-file contract all hang off
//! it. Nothing here performs I/O.

pub mod changes;
pub mod error;
pub mod format;
pub mod history;
pub mod icons;
pub mod id;
pub mod model;
pub mod palette;
mod patch;
pub mod store;
pub mod templates;

pub use changes::{ElementId, GraphChange};
pub use error::{Error, Result};
pub use format::{parse_saved_state, SavedState, FORMAT_VERSION};
pub use history::{GraphSnapshot, History};
pub use id::new_id;
pub use model::*;
pub use store::{sanitize, DocumentStore, StoreConfig};
