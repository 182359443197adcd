use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use synapse_core::format::{parse_saved_state, SavedState};
use synapse_core::DiagramState;
use tokio::fs;

use crate::error::{PersistError, Result};

/// Name of the single durable entry.
pub const STORAGE_KEY: &str = "synapse-state";

/// A durable key-value slot holding one serialized [`SavedState`].
#[async_trait]
pub trait StateSlot: Send + Sync {
    /// `None` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<String>>;
    async fn store(&self, contents: &str) -> Result<()>;
    /// Clearing an empty slot is not an error.
    async fn clear(&self) -> Result<()>;
}

/// Serialize the document with the current timestamp and store it.
pub async fn save(slot: &dyn StateSlot, state: DiagramState) -> Result<()> {
    let saved = SavedState::capture(state, Utc::now());
    let json = serde_json::to_string(&saved)?;
    slot.store(&json).await
}

/// Read and parse the slot. An empty slot is `Ok(None)`.
pub async fn restore(slot: &dyn StateSlot) -> Result<Option<SavedState>> {
    match slot.load().await? {
        Some(text) => Ok(Some(parse_saved_state(&text)?)),
        None => Ok(None),
    }
}

// --- File-backed slot ---

/// Stores the slot as `<dir>/synapse-state.json`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{STORAGE_KEY}.json"))
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(format!(".{STORAGE_KEY}.json.tmp"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl StateSlot for FileSlot {
    async fn load(&self) -> Result<Option<String>> {
        let path = self.path();
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::io(&path)(e)),
        }
    }

    /// Write to a temp file and rename it over the slot, so readers only
    /// ever see a complete document.
    async fn store(&self, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(PersistError::io(&self.dir))?;
        let tmp = self.tmp_path();
        fs::write(&tmp, contents).await.map_err(PersistError::io(&tmp))?;
        let path = self.path();
        fs::rename(&tmp, &path).await.map_err(PersistError::io(&path))
    }

    async fn clear(&self) -> Result<()> {
        let path = self.path();
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::io(&path)(e)),
        }
    }
}

// --- In-memory slot ---

#[derive(Debug, Default)]
pub struct MemorySlot {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    contents: Option<String>,
    writes: usize,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                contents: Some(contents.into()),
                writes: 0,
            }),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.lock().contents.clone()
    }

    /// Number of completed `store` calls.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StateSlot for MemorySlot {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.contents())
    }

    async fn store(&self, contents: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.contents = Some(contents.to_string());
        inner.writes += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.lock().contents = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::{Node, Position, ServiceData};

    fn state() -> DiagramState {
        DiagramState {
            nodes: vec![Node::service("a", Position::new(1.0, 2.0), ServiceData::new("A", "Server"))],
            ..DiagramState::default()
        }
    }

    #[tokio::test]
    async fn file_slot_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("data"));
        assert!(slot.load().await.unwrap().is_none());

        save(&slot, state()).await.unwrap();
        assert!(slot.path().exists());
        assert!(!slot.tmp_path().exists());
        let restored = restore(&slot).await.unwrap().unwrap();
        assert_eq!(restored.into_diagram(), state());

        slot.clear().await.unwrap();
        assert!(restore(&slot).await.unwrap().is_none());
        slot.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_slot_is_a_format_error() {
        let slot = MemorySlot::with_contents("{\"nodes\": [");
        assert!(matches!(restore(&slot).await, Err(PersistError::Format(_))));
    }

    #[tokio::test]
    async fn memory_slot_counts_writes() {
        let slot = MemorySlot::new();
        save(&slot, state()).await.unwrap();
        save(&slot, state()).await.unwrap();
        assert_eq!(slot.writes(), 2);
        assert!(slot.contents().unwrap().contains("\"formatVersion\":1"));
    }
}
