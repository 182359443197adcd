use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use synapse_core::history::DEFAULT_HISTORY_LIMIT;
use synapse_core::palette::DEFAULT_GRID_SIZE;
use synapse_core::StoreConfig;

use crate::error::{PersistError, Result};

pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1000;

/// User preferences from `settings.json`. Every field is optional on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub autosave_delay_ms: u64,
    pub history_limit: usize,
    pub grid_size: f64,
    /// Where the autosave slot lives; defaults to [`synapse_dir`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            grid_size: DEFAULT_GRID_SIZE,
            storage_dir: None,
        }
    }
}

impl Settings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(synapse_dir)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            history_limit: self.history_limit,
        }
    }
}

/// Resolve the per-user data directory (~/.synapse/).
pub fn synapse_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".synapse")
}

fn settings_path() -> PathBuf {
    synapse_dir().join("settings.json")
}

pub fn read_settings() -> Settings {
    read_settings_from(&settings_path())
}

/// A missing or unreadable file yields defaults.
pub fn read_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    match fs::read_to_string(path).map(|s| serde_json::from_str(&s)) {
        Ok(Ok(settings)) => settings,
        Ok(Err(e)) => {
            log::warn!("settings: ignoring {}: {e}", path.display());
            Settings::default()
        }
        Err(e) => {
            log::warn!("settings: cannot read {}: {e}", path.display());
            Settings::default()
        }
    }
}

pub fn write_settings(settings: &Settings) -> Result<()> {
    write_settings_to(&settings_path(), settings)
}

pub fn write_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(PersistError::io(dir))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).map_err(PersistError::io(path))
}
