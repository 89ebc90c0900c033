//! Snapshots of the last emitted manifest, one per stack

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::Snapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::paths;

// ============================================================================
// State Structures
// ============================================================================

/// A snapshot as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSnapshot {
    pub stack: String,
    pub emitted_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

impl SavedSnapshot {
    pub fn new(stack: &str, snapshot: Snapshot) -> Self {
        Self {
            stack: stack.to_string(),
            emitted_at: Utc::now(),
            snapshot,
        }
    }
}

/// Directory of saved snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store under the resolved state directory
    pub fn open() -> Result<Self> {
        Ok(Self::at(paths::state_dir()?))
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self, stack: &str) -> PathBuf {
        paths::snapshot_file(&self.dir, stack)
    }

    /// Load a stack's snapshot, or `None` if nothing was emitted yet
    pub fn load(&self, stack: &str) -> Result<Option<SavedSnapshot>> {
        paths::check_stack_name(stack)?;
        let path = self.path(stack);

        if !path.exists() {
            log::debug!("No snapshot for stack '{}' at {}", stack, path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;

        // Properties may hold nulls, which TOML cannot represent
        let saved: SavedSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;

        log::debug!("Loaded snapshot from {}", path.display());
        Ok(Some(saved))
    }

    /// Save a stack's snapshot, replacing the previous one
    pub fn save(&self, saved: &SavedSnapshot) -> Result<PathBuf> {
        paths::check_stack_name(&saved.stack)?;
        let path = self.path(&saved.stack);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create snapshot directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(saved).context("Failed to serialize snapshot")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write snapshot file: {}", path.display()))?;

        log::debug!("Saved snapshot to {}", path.display());
        Ok(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StackConfig;
    use crate::stack;
    use declarative::{DeploymentPlan, Manifest};
    use tempfile::TempDir;

    fn dev_snapshot() -> Snapshot {
        let graph = stack::build(&StackConfig::example("dev")).unwrap();
        let plan = DeploymentPlan::from_graph(&graph).unwrap();
        Snapshot::from_manifest(&Manifest::build(&graph, &plan)).unwrap()
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::at(temp.path().to_path_buf());
        assert!(store.load("dev").unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::at(temp.path().to_path_buf());

        let saved = SavedSnapshot::new("dev", dev_snapshot());
        let path = store.save(&saved).unwrap();
        assert!(path.ends_with("snapshots/dev.json"));

        let loaded = store.load("dev").unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(store.load("prod").unwrap().is_none());
    }

    #[test]
    fn test_stack_name_cannot_leave_the_store() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::at(temp.path().join("state"));
        let saved = SavedSnapshot::new("../escaped", Snapshot::default());
        assert!(store.save(&saved).is_err());
        assert!(store.load("../escaped").is_err());
        assert!(!temp.path().join("escaped.json").exists());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::at(temp.path().to_path_buf());
        let path = store.path("dev");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(store.load("dev").is_err());
    }
}
