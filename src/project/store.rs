use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{lenient, ProjectSnapshot};
use crate::error::EngineError;

const KEY_PREFIX: &str = "beatz_project_";
const INDEX_FILE: &str = "beatz_projects_list.json";

/// One row of the saved-projects index
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub key: String,
    pub name: String,
    pub timestamp: String,
    #[serde(deserialize_with = "lenient::f32")]
    pub bpm: f32,
}

/// Directory of saved snapshots, one JSON file per key, plus an index file.
/// Last write wins.
pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create project store {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn project_path(&self, key: &str) -> Result<PathBuf> {
        let valid = key
            .strip_prefix(KEY_PREFIX)
            .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()));
        if !valid {
            return Err(EngineError::not_found("project", key).into());
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn write_index(&self, entries: &[ProjectEntry]) -> Result<()> {
        let path = self.dir.join(INDEX_FILE);
        let json = serde_json::to_string_pretty(entries).context("Failed to serialize project list")?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Saved projects, oldest first
    pub fn list(&self) -> Result<Vec<ProjectEntry>> {
        let path = self.dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Store a snapshot under a fresh key and add it to the index
    pub fn save(&self, snapshot: &ProjectSnapshot) -> Result<String> {
        let mut millis = Utc::now().timestamp_millis();
        let (key, path) = loop {
            let key = format!("{}{}", KEY_PREFIX, millis);
            let path = self.project_path(&key)?;
            if !path.exists() {
                break (key, path);
            }
            millis += 1;
        };

        let json = serde_json::to_string(snapshot).context("Failed to serialize project")?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

        let mut entries = self.list()?;
        entries.push(ProjectEntry {
            key: key.clone(),
            name: snapshot.name.clone(),
            timestamp: snapshot.timestamp.clone(),
            bpm: snapshot.settings.bpm,
        });
        self.write_index(&entries)?;
        tracing::info!(%key, name = %snapshot.name, "project saved");
        Ok(key)
    }

    pub fn load(&self, key: &str) -> Result<ProjectSnapshot> {
        let path = self.project_path(key)?;
        if !path.exists() {
            return Err(EngineError::not_found("project", key).into());
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let snapshot = serde_json::from_str(&json)
            .map_err(|e| EngineError::malformed(e.to_string()))
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(snapshot)
    }

    /// Remove a project and its index entry. Returns false if it was not saved.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let path = self.project_path(key)?;
        let existed = path.exists();
        if existed {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
        let mut entries = self.list()?;
        let before = entries.len();
        entries.retain(|e| e.key != key);
        if entries.len() != before {
            self.write_index(&entries)?;
        }
        if existed {
            tracing::info!(%key, "project deleted");
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Engine;
    use crate::config::EngineConfig;

    fn snapshot(name: &str, bpm: f32) -> ProjectSnapshot {
        let mut engine = Engine::with_seed(EngineConfig::default(), 1);
        engine.set_bpm(bpm).unwrap();
        engine.gather_state(name)
    }

    #[test]
    fn save_list_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(dir.path().join("projects")).unwrap();
        assert!(store.list().unwrap().is_empty());

        let first = store.save(&snapshot("one", 90.0)).unwrap();
        let second = store.save(&snapshot("two", 140.0)).unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("beatz_project_"));

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "one");
        assert_eq!(entries[1].bpm, 140.0);

        let loaded = store.load(&second).unwrap();
        assert_eq!(loaded.name, "two");
        assert_eq!(loaded.settings.bpm, 140.0);

        assert!(store.delete(&first).unwrap());
        assert!(!store.delete(&first).unwrap());
        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, second);
    }

    #[test]
    fn unknown_keys_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::open(dir.path()).unwrap();
        for key in ["beatz_project_1", "../etc/passwd", "beatz_project_"] {
            let err = store.load(key).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<EngineError>(), Some(EngineError::NotFound { .. })),
                "{}",
                key
            );
        }
    }
}
