//! Schema registry
//!
//! Maps absolute URIs (optionally with a pointer or anchor fragment) to built
//! schema nodes, and keeps raw documents that are built on first use. The
//! registry is append-mostly and safe to share between threads: a build
//! holds the write lock from start to commit, so concurrent builds of the
//! same document publish exactly once and readers never see half a graph.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

pub(crate) mod state;

use crate::build::{Builder, Frame, SchemaId, SchemaNode};
use crate::dialect::{meta, Dialect, VocabularyRegistry};
use crate::error::{BoxError, ResolutionError, SchemaError};
use crate::graph::SchemaGraph;
use crate::json::json_equal;
use crate::keyword::KeywordHandler;
use crate::uri::{self, Fragment, SchemaUri};
use serde_json::Value;
use state::RegistryState;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};
use url::Url;

/// Caller-supplied hook for documents that are not registered
///
/// Returning `Ok(None)` means "no such document".
pub trait Fetch: Send + Sync {
    fn fetch(&self, uri: &Url) -> Result<Option<Value>, BoxError>;
}

impl<F> Fetch for F
where
    F: Fn(&Url) -> Result<Option<Value>, BoxError> + Send + Sync,
{
    fn fetch(&self, uri: &Url) -> Result<Option<Value>, BoxError> {
        self(uri)
    }
}

/// URI-addressed store of built schemas and raw documents
pub struct SchemaRegistry {
    state: RwLock<RegistryState>,
    vocabularies: Arc<VocabularyRegistry>,
    fetcher: RwLock<Option<Arc<dyn Fetch>>>,
}

impl SchemaRegistry {
    /// An isolated registry using the shared vocabulary registry
    pub fn new() -> Self {
        Self::with_vocabularies(VocabularyRegistry::shared())
    }

    /// An isolated registry using a specific vocabulary registry
    pub fn with_vocabularies(vocabularies: Arc<VocabularyRegistry>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            vocabularies,
            fetcher: RwLock::new(None),
        }
    }

    /// The process-wide default registry
    pub fn global() -> Arc<SchemaRegistry> {
        static GLOBAL: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SchemaRegistry::new())).clone()
    }

    pub fn vocabularies(&self) -> &Arc<VocabularyRegistry> {
        &self.vocabularies
    }

    /// Install the fetch hook for unregistered documents
    pub fn set_fetcher(&self, fetcher: impl Fetch + 'static) {
        *self.fetcher.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(fetcher));
    }

    pub fn has_fetcher(&self) -> bool {
        self.fetcher().is_some()
    }

    /// Register a raw document under an absolute URI
    ///
    /// First writer wins: registering different content under a known URI is
    /// ignored with a warning and returns `false`.
    pub fn register(&self, uri: &str, document: Value) -> Result<bool, SchemaError> {
        let url = uri::parse_absolute(uri)?;
        let base = uri::base_of(&url);
        let mut state = self.write();
        if let Some(existing) = state.raw_document(&base) {
            if !json_equal(&existing, &document) {
                warn!(uri = %base, "document already registered with different content; keeping the first");
            }
            return Ok(false);
        }
        debug!(uri = %base, "registered schema document");
        state.documents.insert(base, Arc::new(document));
        Ok(true)
    }

    /// Whether a document or resource is known under `uri`
    pub fn contains(&self, uri: &str) -> bool {
        match uri::parse_absolute(uri) {
            Ok(url) => self.read().raw_document(&uri::base_of(&url)).is_some(),
            Err(_) => false,
        }
    }

    /// Resolve an absolute URI to a graph, building on demand
    pub fn resolve(self: &Arc<Self>, uri: &str) -> Result<SchemaGraph, ResolutionError> {
        let url = uri::parse_absolute(uri).map_err(|e| ResolutionError::unresolved(uri, e.to_string()))?;
        let id = self.resolve_uri(&SchemaUri::from_url(&url))?;
        SchemaGraph::from_node(self.clone(), id)
    }

    /// Number of built nodes, for diagnostics
    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    /// A fresh registry sharing this registry's vocabularies and fetch hook
    pub fn scratch(&self) -> SchemaRegistry {
        Self {
            state: RwLock::new(RegistryState::default()),
            vocabularies: self.vocabularies.clone(),
            fetcher: RwLock::new(self.fetcher()),
        }
    }

    pub(crate) fn node(&self, id: SchemaId) -> Option<Arc<SchemaNode>> {
        self.read().node(id)
    }

    pub(crate) fn dynamic_anchor(&self, base: &str, name: &str) -> Option<SchemaId> {
        self.read()
            .dynamic_anchors
            .get(&(base.to_string(), name.to_string()))
            .copied()
    }

    pub(crate) fn has_recursive_anchor(&self, base: &str) -> bool {
        self.read().recursive_anchors.contains(base)
    }

    pub(crate) fn resource_root(&self, base: &str) -> Option<SchemaId> {
        self.read().resource(base).map(|resource| resource.root)
    }

    /// Raw value at `uri` without building it: registered documents,
    /// embedded meta-schemas or the fetch hook
    pub(crate) fn raw_value(&self, uri: &SchemaUri) -> Result<Value, ResolutionError> {
        let document = self.document(&uri.base)?;
        match &uri.fragment {
            Fragment::None => Ok(document.as_ref().clone()),
            Fragment::Pointer(pointer) => {
                pointer
                    .evaluate(&document)
                    .cloned()
                    .ok_or_else(|| ResolutionError::PointerNotFound {
                        base: uri.base.clone(),
                        pointer: pointer.to_string(),
                    })
            }
            Fragment::Anchor(name) => Err(ResolutionError::UnsupportedReference {
                reference: uri.to_string(),
                reason: format!("anchor '{}' cannot address raw data", name),
            }),
        }
    }

    /// Build a document into this registry and commit it
    pub(crate) fn build_document(
        &self,
        document: &Value,
        base: Url,
        dialect: Arc<Dialect>,
        overrides: &[Arc<dyn KeywordHandler>],
    ) -> Result<SchemaId, SchemaError> {
        let fetcher = self.fetcher();
        let mut state = self.write();
        let (root, staging) = {
            let mut builder = Builder::new(&state, &self.vocabularies, overrides, fetcher);
            let root = builder.build_root(document, Frame::new(base, dialect))?;
            (root, builder.finish())
        };
        state.commit(staging);
        Ok(root)
    }

    /// The dialect a `$schema` value selects in this registry
    pub(crate) fn dialect_for(&self, schema_uri: &str) -> Result<Arc<Dialect>, SchemaError> {
        let fetcher = self.fetcher();
        let state = self.read();
        Builder::new(&state, &self.vocabularies, &[], fetcher).dialect_for(schema_uri)
    }

    /// Resolve a reference to a node, building whatever is needed
    pub(crate) fn resolve_uri(&self, uri: &SchemaUri) -> Result<SchemaId, ResolutionError> {
        if let Some(id) = self.read().lookup(uri) {
            return Ok(id);
        }
        trace!(reference = %uri, "resolving reference lazily");

        for _ in 0..2 {
            if let Some(id) = self.read().lookup(uri) {
                return Ok(id);
            }
            let resource = self.read().resource(&uri.base).cloned();
            if let Some(resource) = resource {
                return match &uri.fragment {
                    Fragment::None => Ok(resource.root),
                    Fragment::Anchor(name) => Err(ResolutionError::AnchorNotFound {
                        base: uri.base.clone(),
                        name: name.clone(),
                    }),
                    Fragment::Pointer(pointer) => {
                        let value = pointer
                            .evaluate(&resource.raw)
                            .ok_or_else(|| ResolutionError::PointerNotFound {
                                base: uri.base.clone(),
                                pointer: pointer.to_string(),
                            })?
                            .clone();
                        self.build_fragment(uri, &value, resource.dialect.clone())
                    }
                };
            }

            let document = self.document(&uri.base)?;
            let base = uri::parse_absolute(&uri.base).map_err(|e| ResolutionError::unresolved(uri.to_string(), e.to_string()))?;
            let dialect = self.vocabularies.default_dialect();
            self.build_document(&document, base, dialect, &[])
                .map_err(|source| ResolutionError::Build {
                    uri: uri.base.clone(),
                    source: Box::new(source),
                })?;
        }
        Err(ResolutionError::unresolved(uri.to_string(), "document built but target not found"))
    }

    /// Build a subtree of a known resource that was not reached by the
    /// resource's own build (e.g. under an unknown keyword)
    fn build_fragment(&self, uri: &SchemaUri, value: &Value, dialect: Arc<Dialect>) -> Result<SchemaId, ResolutionError> {
        let Fragment::Pointer(pointer) = &uri.fragment else {
            return Err(ResolutionError::unresolved(uri.to_string(), "not a pointer fragment"));
        };
        let base = uri::parse_absolute(&uri.base).map_err(|e| ResolutionError::unresolved(uri.to_string(), e.to_string()))?;
        let fetcher = self.fetcher();
        let mut state = self.write();
        if let Some(id) = state.lookup(uri) {
            return Ok(id);
        }
        let staging = {
            let mut builder = Builder::new(&state, &self.vocabularies, &[], fetcher);
            builder
                .build_root(value, Frame::at(base, pointer.clone(), dialect))
                .map_err(|source| ResolutionError::Build {
                    uri: uri.to_string(),
                    source: Box::new(source),
                })?;
            builder.finish()
        };
        state.commit(staging);
        debug!(reference = %uri, "built schema fragment on demand");
        state
            .lookup(uri)
            .ok_or_else(|| ResolutionError::unresolved(uri.to_string(), "fragment build did not register the target"))
    }

    /// Raw document for a base: registered, embedded, or fetched (and then kept)
    fn document(&self, base: &str) -> Result<Arc<Value>, ResolutionError> {
        if let Some(document) = self.read().raw_document(base) {
            return Ok(document);
        }
        if let Some(document) = meta::document(base) {
            let document = document.map_err(|e| ResolutionError::FetchFailed {
                uri: base.to_string(),
                source: Box::new(e),
            })?;
            self.write().documents.entry(base.to_string()).or_insert(document.clone());
            return Ok(document);
        }

        let fetcher = self.fetcher().ok_or_else(|| ResolutionError::NoFetcher { uri: base.to_string() })?;
        let url = uri::parse_absolute(base).map_err(|e| ResolutionError::unresolved(base, e.to_string()))?;
        let fetched = fetcher
            .fetch(&url)
            .map_err(|source| ResolutionError::FetchFailed {
                uri: base.to_string(),
                source,
            })?
            .ok_or_else(|| ResolutionError::unresolved(base, "fetch hook returned no document"))?;
        debug!(uri = %base, "fetched schema document");
        let document = Arc::new(fetched);
        let mut state = self.write();
        Ok(state.documents.entry(base.to_string()).or_insert(document).clone())
    }

    fn fetcher(&self) -> Option<Arc<dyn Fetch>> {
        self.fetcher.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("SchemaRegistry")
            .field("nodes", &state.nodes.len())
            .field("resources", &state.resources.len())
            .field("documents", &state.documents.len())
            .field("has_fetcher", &self.has_fetcher())
            .finish()
    }
}
