//! Output snapshot storage
//!
//! A snapshot pins the projected outputs of one suite file. It lives at
//! `<snapshot_dir>/<suite id>.json` and carries the member names to drop or
//! mask before comparison alongside the content itself.

use crate::{GoldenError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// A stored output snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Suite id the snapshot belongs to
    pub name: String,

    pub metadata: SnapshotMetadata,

    /// Projected outputs, one entry per group
    pub content: Value,

    /// Member names removed at any depth before comparison
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_fields: Vec<String>,

    /// Members whose values vary between runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volatile_fields: Vec<VolatileField>,
}

/// Snapshot metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Snapshot format version
    pub version: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Output format the content was projected in
    pub output_format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A member masked when its value matches a pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatileField {
    /// Member name, matched at any depth
    pub field: String,

    /// Regular expression the value must match
    pub pattern: String,
}

impl Snapshot {
    pub fn new(name: impl Into<String>, output_format: &str, content: Value) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            metadata: SnapshotMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
                output_format: output_format.to_string(),
                description: None,
            },
            content,
            ignore_fields: Vec::new(),
            volatile_fields: Vec::new(),
        }
    }
}

/// Manages snapshot storage and retrieval
pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new(snapshot_dir: impl AsRef<Path>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.snapshot_dir.join(format!("{}.json", name))
    }

    /// Load a snapshot by suite id
    pub fn load(&self, name: &str) -> Result<Snapshot> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(GoldenError::SnapshotMismatch(format!("Snapshot '{}' not found", name)));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save a snapshot, creating parent directories as needed
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.path_for(&snapshot.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
        Ok(())
    }

    /// Replace the content of an existing snapshot, keeping a backup of the old file
    pub fn update(&self, name: &str, content: Value) -> Result<Snapshot> {
        let mut snapshot = self.load(name)?;
        self.backup(name)?;
        snapshot.content = content;
        snapshot.metadata.updated_at = Utc::now();
        self.save(&snapshot)?;
        Ok(snapshot)
    }

    /// Create and save a new snapshot
    pub fn create(&self, name: &str, output_format: &str, content: Value) -> Result<Snapshot> {
        let snapshot = Snapshot::new(name, output_format, content);
        self.save(&snapshot)?;
        Ok(snapshot)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Delete a snapshot
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Copy the current snapshot file next to itself with a timestamp suffix
    fn backup(&self, name: &str) -> Result<PathBuf> {
        let path = self.path_for(name);
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let backup = path.with_extension(format!("json.{}.bak", stamp));
        fs::copy(&path, &backup)?;
        Ok(backup)
    }
}

/// Sort object members recursively
pub fn normalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k.clone(), normalize_json(v))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_json).collect()),
        other => other.clone(),
    }
}

/// Remove the named members at any depth
pub fn apply_ignores(value: &mut Value, fields: &[String]) {
    if fields.is_empty() {
        return;
    }
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !fields.contains(key));
            map.values_mut().for_each(|member| apply_ignores(member, fields));
        }
        Value::Array(items) => items.iter_mut().for_each(|item| apply_ignores(item, fields)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(temp_dir.path());

        let content = json!([{"description": "g", "tests": [{"description": "t", "output": {"valid": true}}]}]);
        manager.create("draft7/ref", "basic", content.clone()).unwrap();

        assert!(manager.exists("draft7/ref"));
        let loaded = manager.load("draft7/ref").unwrap();
        assert_eq!(loaded.name, "draft7/ref");
        assert_eq!(loaded.metadata.output_format, "basic");
        assert_eq!(loaded.content, content);

        manager.delete("draft7/ref").unwrap();
        assert!(!manager.exists("draft7/ref"));
        assert!(manager.load("draft7/ref").is_err());
    }

    #[test]
    fn test_update_keeps_backup() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(temp_dir.path());
        manager.create("output/person", "basic", json!({"valid": false})).unwrap();

        let updated = manager.update("output/person", json!({"valid": true})).unwrap();
        assert_eq!(updated.content, json!({"valid": true}));

        let backups = fs::read_dir(temp_dir.path().join("output"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_apply_ignores_at_any_depth() {
        let mut value = json!({
            "absoluteKeywordLocation": "x",
            "details": [{"absoluteKeywordLocation": "y", "keywordLocation": "/type"}]
        });
        apply_ignores(&mut value, &["absoluteKeywordLocation".to_string()]);
        assert_eq!(value, json!({"details": [{"keywordLocation": "/type"}]}));
    }

    #[test]
    fn test_normalize_json_sorts_members() {
        let value = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let text = serde_json::to_string(&normalize_json(&value)).unwrap();
        assert_eq!(text, r#"{"a":{"c":3,"d":2},"b":1}"#);
    }
}
