//! Durable storage for Synapse documents: the autosave slot, debounced
//! autosave, `.syn` import/export and user settings.

pub mod autosave;
pub mod error;
pub mod files;
pub mod session;
pub mod settings;
pub mod slot;

pub use autosave::Autosave;
pub use error::{PersistError, Result};
pub use session::Session;
pub use settings::{read_settings, Settings};
pub use slot::{FileSlot, MemorySlot, StateSlot, STORAGE_KEY};
