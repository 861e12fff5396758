//! Durable storage for the rule map.
//!
//! The store hands the full map to the persistence layer after every
//! mutation; there is no incremental format.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::model::RuleMap;
use crate::error::StoreError;

/// Persistence collaborator injected into the [`RuleStore`](super::RuleStore).
#[async_trait]
pub trait RulePersistence: Send + Sync {
    /// Load the stored rules. Missing storage is an empty map, not an error.
    async fn load(&self) -> Result<RuleMap, StoreError>;

    /// Rewrite the stored rules in full.
    async fn save(&self, rules: &RuleMap) -> Result<(), StoreError>;
}

// ── JSON file ───────────────────────────────────────────────────────

/// Rules file on disk, pretty-printed JSON keyed by monitored channel id.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RulePersistence for JsonFilePersistence {
    async fn load(&self) -> Result<RuleMap, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No rules file found, starting empty");
                return Ok(RuleMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let rules: RuleMap =
            serde_json::from_str(&raw).map_err(|e| StoreError::Malformed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(
            path = %self.path.display(),
            channels = rules.len(),
            "Loaded rules file"
        );
        Ok(rules)
    }

    async fn save(&self, rules: &RuleMap) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        rules.serialize(&mut ser)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.temp_path();
        fs::write(&tmp, &buf).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = buf.len(), "Rules file written");
        Ok(())
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// Persistence that keeps the last saved map in memory.
///
/// Used when no durable storage is wanted and in tests.
#[derive(Default)]
pub struct MemoryPersistence {
    saved: Mutex<Option<RuleMap>>,
    saves: Mutex<usize>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an initial map, as if loaded from storage.
    pub fn with_rules(rules: RuleMap) -> Self {
        Self {
            saved: Mutex::new(Some(rules)),
            saves: Mutex::new(0),
        }
    }

    /// The most recently saved map, if any save happened or a seed was given.
    pub async fn snapshot(&self) -> Option<RuleMap> {
        self.saved.lock().await.clone()
    }

    /// Number of `save` calls so far.
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl RulePersistence for MemoryPersistence {
    async fn load(&self) -> Result<RuleMap, StoreError> {
        Ok(self.saved.lock().await.clone().unwrap_or_default())
    }

    async fn save(&self, rules: &RuleMap) -> Result<(), StoreError> {
        *self.saved.lock().await = Some(rules.clone());
        *self.saves.lock().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::{ChannelId, Rule};

    fn sample() -> RuleMap {
        let mut map = RuleMap::new();
        map.insert(
            ChannelId(100),
            vec![Rule::new(ChannelId(200), ["rocket"], ["scrubbed"])],
        );
        map
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path().join("rules.json"));
        store.save(&sample()).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, sample());
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn saved_file_uses_four_space_indent_and_string_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let store = JsonFilePersistence::new(&path);
        store.save(&sample()).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"100\": ["));
        assert!(text.contains("\"target_channel\": 200"));
    }

    #[tokio::test]
    async fn loads_file_written_by_hand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"100": [{"target_channel": 200, "include_keywords": ["rocket"], "exclude_keywords": []}]}"#,
        )
        .unwrap();

        let loaded = JsonFilePersistence::new(&path).load().await.unwrap();
        let rules = &loaded[&ChannelId(100)];
        assert_eq!(rules[0].target_channel, ChannelId(200));
        assert!(rules[0].exclude_keywords.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFilePersistence::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/rules.json");
        JsonFilePersistence::new(&path).save(&sample()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn memory_persistence_records_saves() {
        let mem = MemoryPersistence::new();
        assert!(mem.load().await.unwrap().is_empty());
        mem.save(&sample()).await.unwrap();
        assert_eq!(mem.save_count().await, 1);
        assert_eq!(mem.snapshot().await, Some(sample()));
    }
}
