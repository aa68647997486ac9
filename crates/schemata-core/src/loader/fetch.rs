//! File-backed fetch hook
//!
//! Maps absolute URIs onto files below a root directory. `file://` URIs are
//! served directly; other URIs are served only when they start with the
//! configured prefix, with the remainder taken as a relative path.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::error::BoxError;
use crate::loader::cache::{CacheConfig, DocumentCache};
use crate::loader::error::{LoaderError, LoaderResult};
use crate::loader::parser::SchemaParser;
use crate::registry::Fetch;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};
use url::Url;

/// Serves schema documents from a directory tree
#[derive(Debug)]
pub struct FileFetcher {
    root: PathBuf,
    prefix: Option<Url>,
    parser: SchemaParser,
    cache: Mutex<DocumentCache>,
}

impl FileFetcher {
    /// Serve `file://` URIs below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: None,
            parser: SchemaParser::new(),
            cache: Mutex::new(DocumentCache::new()),
        }
    }

    /// Additionally serve URIs starting with `prefix` from `root`
    pub fn with_prefix(mut self, prefix: Url) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Replace the cache configuration
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = Mutex::new(DocumentCache::with_config(config));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the document a URI maps to; `Ok(None)` when the URI is out of scope
    /// or the file does not exist
    pub fn load(&self, uri: &Url) -> LoaderResult<Option<Arc<Value>>> {
        let Some(path) = self.path_for(uri)? else {
            trace!(uri = %uri, "URI outside fetcher scope");
            return Ok(None);
        };
        if !path.exists() {
            debug!(uri = %uri, path = %path.display(), "no file for URI");
            return Ok(None);
        }
        self.check_contained(uri, &path)?;

        let document = match self.load_cached(&path) {
            Ok(document) => document,
            Err(error) if error.is_recoverable() => {
                warn!(path = %path.display(), error = %error, "document cache unavailable, reading from disk");
                Arc::new(self.parser.parse_file(&path)?)
            }
            Err(error) => return Err(error),
        };
        debug!(uri = %uri, path = %path.display(), "loaded schema document");
        Ok(Some(document))
    }

    fn load_cached(&self, path: &Path) -> LoaderResult<Arc<Value>> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| LoaderError::cache_error("cache lock poisoned"))?;
        if let Some(cached) = cache.get(path)? {
            trace!(path = %path.display(), "document cache hit");
            return Ok(cached);
        }
        let document = Arc::new(self.parser.parse_file(path)?);
        cache.put(path, document.clone())?;
        Ok(document)
    }

    fn path_for(&self, uri: &Url) -> LoaderResult<Option<PathBuf>> {
        if uri.scheme() == "file" {
            return Ok(uri.to_file_path().ok());
        }
        let Some(prefix) = &self.prefix else {
            return Ok(None);
        };
        let Some(relative) = uri.as_str().strip_prefix(prefix.as_str()) else {
            return Ok(None);
        };
        let relative = relative.split(['#', '?']).next().unwrap_or_default();
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
        {
            return Err(LoaderError::path_traversal(uri.as_str(), self.root.clone()));
        }
        Ok(Some(self.root.join(relative)))
    }

    fn check_contained(&self, uri: &Url, path: &Path) -> LoaderResult<()> {
        let canonical_root = self
            .root
            .canonicalize()
            .map_err(|e| LoaderError::io_error(self.root.clone(), e))?;
        let canonical_path = path
            .canonicalize()
            .map_err(|e| LoaderError::io_error(path.to_path_buf(), e))?;
        if canonical_path.starts_with(&canonical_root) {
            Ok(())
        } else {
            Err(LoaderError::path_traversal(uri.as_str(), self.root.clone()))
        }
    }
}

impl Fetch for FileFetcher {
    fn fetch(&self, uri: &Url) -> Result<Option<Value>, BoxError> {
        Ok(self.load(uri)?.map(|document| document.as_ref().clone()))
    }
}
