use std::path::{Path, PathBuf};

use chrono::Utc;
use synapse_core::format::{export_file_name, parse_saved_state, SavedState};
use synapse_core::DiagramState;
use tokio::fs;

use crate::error::{PersistError, Result};

/// Write the document into `dir` as a dated `.syn` file and return its path.
/// An export from the same day replaces the earlier one.
pub async fn export_to_dir(dir: &Path, state: DiagramState) -> Result<PathBuf> {
    let now = Utc::now();
    let json = SavedState::capture(state, now).to_json_pretty()?;
    fs::create_dir_all(dir).await.map_err(PersistError::io(dir))?;
    let path = dir.join(export_file_name(now.date_naive()));
    fs::write(&path, json).await.map_err(PersistError::io(&path))?;
    log::info!("exported diagram to {}", path.display());
    Ok(path)
}

/// Read and validate a user-supplied file. Nothing is loaded here; the
/// caller hands the result to the store.
pub async fn import_from_path(path: &Path) -> Result<SavedState> {
    let text = fs::read_to_string(path).await.map_err(PersistError::io(path))?;
    Ok(parse_saved_state(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::{Edge, Node, Position, ServiceData, Viewport};

    #[tokio::test]
    async fn export_then_import_returns_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let state = DiagramState {
            nodes: vec![
                Node::service("a", Position::new(0.0, 0.0), ServiceData::new("A", "Zap")),
                Node::service("b", Position::new(9.0, 9.0), ServiceData::new("B", "Bell")),
            ],
            edges: vec![Edge::new("e", "a", "b")],
            viewport: Viewport { x: 3.0, y: 4.0, zoom: 2.0 },
        };

        let path = export_to_dir(dir.path(), state.clone()).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("synapse-diagram-") && name.ends_with(".syn"));

        let imported = import_from_path(&path).await.unwrap();
        assert_eq!(imported.into_diagram(), state);
    }

    #[tokio::test]
    async fn import_failures_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.syn");
        assert!(matches!(import_from_path(&missing).await, Err(PersistError::Io { .. })));

        let bad = dir.path().join("bad.syn");
        std::fs::write(&bad, r#"{"nodes":[],"edges":[],"formatVersion":7}"#).unwrap();
        assert!(matches!(
            import_from_path(&bad).await,
            Err(PersistError::Format(synapse_core::Error::UnsupportedVersion(_)))
        ));
    }
}
