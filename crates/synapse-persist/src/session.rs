use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use synapse_core::DocumentStore;

use crate::autosave::Autosave;
use crate::error::Result;
use crate::files;
use crate::settings::{read_settings, Settings};
use crate::slot::{self, FileSlot, StateSlot};

/// Application context: the live document, the slot it autosaves to and the
/// task doing the saving. Everything that edits the document goes through
/// [`store_mut`](Self::store_mut).
pub struct Session {
    store: DocumentStore,
    slot: Arc<dyn StateSlot>,
    settings: Settings,
    autosave: Autosave,
}

impl Session {
    /// Restore whatever the slot holds and start autosaving. A slot that
    /// cannot be read or parsed leaves an empty document. History starts
    /// empty either way.
    pub async fn open(slot: Arc<dyn StateSlot>, settings: Settings) -> Self {
        let mut store = DocumentStore::with_config(settings.store_config());
        match slot::restore(slot.as_ref()).await {
            Ok(Some(saved)) => {
                store.load(saved.into_diagram());
                store.clear_history();
                info!(
                    "session: restored {} nodes and {} edges",
                    store.nodes().len(),
                    store.edges().len()
                );
            }
            Ok(None) => debug!("session: nothing saved, starting empty"),
            Err(e) => warn!("session: could not restore saved document: {e}"),
        }
        let autosave = Autosave::spawn(store.subscribe(), slot.clone(), settings.autosave_delay());
        Self {
            store,
            slot,
            settings,
            autosave,
        }
    }

    /// Open with `~/.synapse/settings.json` and the file slot it points at.
    pub async fn open_default() -> Self {
        let settings = read_settings();
        let slot = Arc::new(FileSlot::new(settings.storage_dir()));
        Self::open(slot, settings).await
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Delete the durable copy and empty the document.
    pub async fn reset(&mut self) -> Result<()> {
        self.slot.clear().await?;
        self.store.clear_all();
        Ok(())
    }

    pub async fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        files::export_to_dir(dir, self.store.diagram_state()).await
    }

    /// Replace the document with a file's contents. A rejected file leaves
    /// the document as it was.
    pub async fn import_from(&mut self, path: &Path) -> Result<()> {
        let saved = files::import_from_path(path).await?;
        self.store.load(saved.into_diagram());
        Ok(())
    }

    /// Write any pending change and stop autosaving.
    pub async fn shutdown(self) {
        self.autosave.shutdown().await;
    }
}
