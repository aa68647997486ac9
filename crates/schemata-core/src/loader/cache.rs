//! Modification-time aware cache for documents read from disk
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::loader::error::{LoaderError, LoaderResult};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A cached document with the file metadata it was read under
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The parsed document
    pub content: Arc<Value>,
    /// When this entry was cached
    pub cached_at: SystemTime,
    /// File modification time when cached
    pub file_mtime: SystemTime,
}

impl CacheEntry {
    pub fn new(content: Arc<Value>, file_mtime: SystemTime) -> Self {
        Self {
            content,
            cached_at: SystemTime::now(),
            file_mtime,
        }
    }

    /// Whether the entry still reflects the file on disk
    pub fn is_valid(&self, current_mtime: SystemTime, max_age: Option<Duration>) -> bool {
        if current_mtime > self.file_mtime {
            return false;
        }

        match (max_age, self.cached_at.elapsed()) {
            (Some(max_age), Ok(elapsed)) => elapsed <= max_age,
            _ => true,
        }
    }
}

/// Configuration for cache behavior
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction
    pub max_entries: usize,
    /// Maximum age for cache entries
    pub max_age: Option<Duration>,
    /// Whether to cache at all
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            max_age: Some(Duration::from_secs(3600)),
            enabled: true,
        }
    }
}

/// LRU cache of parsed documents keyed by canonical path
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: HashMap<PathBuf, CacheEntry>,
    config: CacheConfig,
    access_order: Vec<PathBuf>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            access_order: Vec::new(),
        }
    }

    /// A cached document if present and not stale
    pub fn get(&mut self, path: &Path) -> LoaderResult<Option<Arc<Value>>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let canonical_path = canonicalize(path)?;
        let entry_valid = match self.entries.get(&canonical_path) {
            Some(entry) => entry.is_valid(modified(path)?, self.config.max_age),
            None => false,
        };

        if entry_valid {
            self.touch(&canonical_path);
            Ok(self.entries.get(&canonical_path).map(|entry| entry.content.clone()))
        } else {
            self.remove_path(&canonical_path);
            Ok(None)
        }
    }

    /// Cache a parsed document
    pub fn put(&mut self, path: &Path, content: Arc<Value>) -> LoaderResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let canonical_path = canonicalize(path)?;
        let entry = CacheEntry::new(content, modified(path)?);

        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&canonical_path) {
            self.evict_lru();
        }

        self.entries.insert(canonical_path.clone(), entry);
        self.touch(&canonical_path);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
    }

    fn evict_lru(&mut self) {
        if let Some(oldest_path) = self.access_order.first().cloned() {
            self.remove_path(&oldest_path);
        }
    }

    fn touch(&mut self, path: &PathBuf) {
        self.access_order.retain(|p| p != path);
        self.access_order.push(path.clone());
    }

    fn remove_path(&mut self, path: &PathBuf) {
        self.entries.remove(path);
        self.access_order.retain(|p| p != path);
    }
}

fn canonicalize(path: &Path) -> LoaderResult<PathBuf> {
    path.canonicalize().map_err(|e| LoaderError::io_error(path.to_path_buf(), e))
}

fn modified(path: &Path) -> LoaderResult<SystemTime> {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| LoaderError::io_error(path.to_path_buf(), e))
}
