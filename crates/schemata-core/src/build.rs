//! Schema building
//!
//! Turns raw schema JSON into immutable [`SchemaNode`]s stored in a registry
//! arena and addressed by [`SchemaId`] handles. `$id` changes the base URI
//! lexically for a subtree; every node is registered under its JSON pointer
//! relative to each enclosing resource so pointer references resolve by
//! lookup. References become handles after a link pass, which is how cyclic
//! schemas end up as finite graphs with back-edges.
//!
//! A build writes into a [`Staging`] area only; the registry commits it in
//! one step, so a failing build leaves nothing behind.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::dialect::{meta, Dialect, VocabularyRegistry};
use crate::error::SchemaError;
use crate::json::JsonPointer;
use crate::keyword::{KeywordHandler, KeywordNode};
use crate::keywords::UnknownKeyword;
use crate::registry::state::{RegistryState, ResourceInfo, Staging};
use crate::registry::Fetch;
use crate::uri::{self, Fragment, SchemaUri};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace, warn};
use url::Url;

/// Handle of a built schema node inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) usize);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Boolean or keyword-bearing schema
#[derive(Debug)]
pub enum SchemaKind {
    Bool(bool),
    Object(Vec<KeywordNode>),
}

/// One built schema object, immutable once committed
#[derive(Debug)]
pub struct SchemaNode {
    pub(crate) id: SchemaId,
    pub(crate) kind: SchemaKind,
    pub(crate) location: String,
    pub(crate) base: String,
    pub(crate) dialect: Arc<Dialect>,
    pub(crate) declares_dialect: bool,
}

impl SchemaNode {
    pub fn id(&self) -> SchemaId {
        self.id
    }

    /// Absolute location: innermost resource base plus pointer fragment
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Base URI of the innermost enclosing resource
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    /// Whether this node carries its own `$schema`
    pub fn declares_dialect(&self) -> bool {
        self.declares_dialect
    }

    /// Keyword nodes in evaluation order; empty for boolean schemas
    pub fn keywords(&self) -> &[KeywordNode] {
        match &self.kind {
            SchemaKind::Object(keywords) => keywords,
            SchemaKind::Bool(_) => &[],
        }
    }

    pub fn keyword(&self, name: &str) -> Option<&KeywordNode> {
        self.keywords().iter().find(|keyword| keyword.name == name)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            SchemaKind::Bool(value) => Some(value),
            SchemaKind::Object(_) => None,
        }
    }
}

/// A reference target, linked to a node handle once resolvable
#[derive(Debug)]
pub struct ReferenceTarget {
    uri: SchemaUri,
    resolved: OnceLock<SchemaId>,
}

impl ReferenceTarget {
    pub fn new(uri: SchemaUri) -> Self {
        Self {
            uri,
            resolved: OnceLock::new(),
        }
    }

    pub fn uri(&self) -> &SchemaUri {
        &self.uri
    }

    /// The linked handle, if linking already happened
    pub fn resolved(&self) -> Option<SchemaId> {
        self.resolved.get().copied()
    }

    pub(crate) fn link(&self, id: SchemaId) {
        // A concurrent evaluation may have linked it first; both agree
        let _ = self.resolved.set(id);
    }
}

/// Lexical position while building one schema object
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub base: Url,
    pub location: JsonPointer,
    /// Enclosing resources, innermost last: base and document pointer of its root
    pub resources: Vec<(String, JsonPointer)>,
    pub dialect: Arc<Dialect>,
}

impl Frame {
    pub fn new(base: Url, dialect: Arc<Dialect>) -> Self {
        Self::at(base, JsonPointer::root(), dialect)
    }

    /// A frame for a subtree found at `location` inside the resource `base`
    pub fn at(base: Url, location: JsonPointer, dialect: Arc<Dialect>) -> Self {
        let resources = vec![(uri::base_of(&base), JsonPointer::root())];
        Self {
            base,
            location,
            resources,
            dialect,
        }
    }

    /// Absolute location of the current pointer relative to the innermost resource
    pub fn absolute_location(&self) -> String {
        match self.resources.last() {
            Some((base, root)) => {
                let relative = self.location.strip_prefix(root).unwrap_or_else(|| self.location.clone());
                format!("{}#{}", base, relative)
            }
            None => format!("{}#{}", self.base, self.location),
        }
    }

    fn resource_base(&self) -> String {
        self.resources
            .last()
            .map(|(base, _)| base.clone())
            .unwrap_or_else(|| uri::base_of(&self.base))
    }

    fn is_resource_root(&self) -> bool {
        self.resources.last().map(|(_, root)| *root == self.location).unwrap_or(true)
    }
}

/// Operations keyword handlers may call back into while building
pub(crate) trait NodeBuilder {
    fn build_node(&mut self, value: &Value, frame: Frame) -> Result<SchemaId, SchemaError>;
    fn register_anchor(&mut self, base: &str, name: &str, id: SchemaId, dynamic: bool) -> Result<(), SchemaError>;
    fn register_recursive_anchor(&mut self, base: &str);
    fn register_reference(&mut self, target: Arc<ReferenceTarget>);
    fn vocabularies(&self) -> &VocabularyRegistry;
}

/// Context handed to keyword handlers at build time
pub struct BuildContext<'b> {
    builder: &'b mut dyn NodeBuilder,
    frame: &'b Frame,
    object: &'b Map<String, Value>,
    keyword: &'b str,
    current: SchemaId,
}

impl<'b> BuildContext<'b> {
    /// Current base URI, after any `$id` on this schema object
    pub fn base(&self) -> &Url {
        &self.frame.base
    }

    /// Base of the innermost enclosing resource, without fragment
    pub fn resource_base(&self) -> String {
        self.frame.resource_base()
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.frame.dialect
    }

    /// Handle of the schema object owning this keyword
    pub fn current(&self) -> SchemaId {
        self.current
    }

    /// Raw value of a sibling keyword in the same schema object
    pub fn sibling(&self, name: &str) -> Option<&Value> {
        self.object.get(name)
    }

    /// Absolute location of this keyword, for error messages
    pub fn location(&self) -> String {
        self.frame.absolute_location() + "/" + &escape_segment(self.keyword)
    }

    pub fn vocabularies(&self) -> &VocabularyRegistry {
        self.builder.vocabularies()
    }

    /// An `InvalidKeywordValue` error for this keyword
    pub fn invalid(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::invalid_value(self.keyword, self.location(), reason)
    }

    /// Build a nested schema found at `keyword/segments...`
    pub fn subschema(&mut self, value: &Value, segments: &[&str]) -> Result<SchemaId, SchemaError> {
        let mut frame = self.frame.clone();
        frame.location.push(self.keyword);
        for segment in segments {
            frame.location.push(*segment);
        }
        self.builder.build_node(value, frame)
    }

    /// Record a plain-name anchor for the current schema object
    pub fn register_anchor(&mut self, name: &str) -> Result<(), SchemaError> {
        let base = uri::base_of(&self.frame.base);
        self.builder.register_anchor(&base, name, self.current, false)
    }

    /// Record a dynamic anchor, which also acts as a plain-name anchor
    pub fn register_dynamic_anchor(&mut self, name: &str) -> Result<(), SchemaError> {
        let base = uri::base_of(&self.frame.base);
        self.builder.register_anchor(&base, name, self.current, true)
    }

    /// Mark the current resource as `$recursiveAnchor: true`
    pub fn register_recursive_anchor(&mut self) {
        let base = self.frame.resource_base();
        self.builder.register_recursive_anchor(&base);
    }

    /// Queue a reference for linking after the build
    pub fn register_reference(&mut self, target: Arc<ReferenceTarget>) {
        self.builder.register_reference(target);
    }
}

/// Escape one JSON pointer segment
pub(crate) fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Builds documents into a staging area on top of a registry snapshot
pub(crate) struct Builder<'r> {
    state: &'r RegistryState,
    staging: Staging,
    vocabularies: &'r VocabularyRegistry,
    overrides: &'r [Arc<dyn KeywordHandler>],
    fetcher: Option<Arc<dyn Fetch>>,
}

impl<'r> Builder<'r> {
    pub fn new(
        state: &'r RegistryState,
        vocabularies: &'r VocabularyRegistry,
        overrides: &'r [Arc<dyn KeywordHandler>],
        fetcher: Option<Arc<dyn Fetch>>,
    ) -> Self {
        Self {
            staging: Staging::new(state.next_id()),
            state,
            vocabularies,
            overrides,
            fetcher,
        }
    }

    /// Build, link and hand back the staged nodes for commit
    pub fn finish(mut self) -> Staging {
        let pending = std::mem::take(&mut self.staging.pending);
        let mut linked = 0;
        for target in &pending {
            if let Some(id) = self.lookup(target.uri()) {
                target.link(id);
                linked += 1;
            } else {
                trace!(reference = %target.uri(), "reference left for lazy resolution");
            }
        }
        debug!(
            nodes = self.staging.len(),
            references = pending.len(),
            linked,
            "schema build staged"
        );
        self.staging
    }

    /// Find an already built node, staged or committed
    pub fn lookup(&self, uri: &SchemaUri) -> Option<SchemaId> {
        self.staging.lookup(uri).or_else(|| self.state.lookup(uri))
    }

    /// The dialect a `$schema` URI selects, deriving it from a meta-schema's
    /// `$vocabulary` when the URI is not a registered dialect
    pub fn dialect_for(&self, schema_uri: &str) -> Result<Arc<Dialect>, SchemaError> {
        self.dialect_for_depth(schema_uri, 0)
    }

    fn dialect_for_depth(&self, schema_uri: &str, depth: usize) -> Result<Arc<Dialect>, SchemaError> {
        if let Some(dialect) = self.vocabularies.dialect(schema_uri) {
            return Ok(dialect);
        }
        if depth > 8 {
            return Err(SchemaError::UnknownDialect {
                uri: schema_uri.to_string(),
                reason: "meta-schema chain is too deep".to_string(),
            });
        }
        let url = uri::parse_absolute(schema_uri)?;
        let base = uri::base_of(&url);
        let document = self.raw_document(&base, &url)?.ok_or_else(|| SchemaError::UnknownDialect {
            uri: schema_uri.to_string(),
            reason: "not a registered dialect and no meta-schema document is available".to_string(),
        })?;

        // A meta-schema without $vocabulary uses the vocabularies of its own meta-schema
        let parent = match document.get("$schema").and_then(Value::as_str) {
            Some(parent) if uri::base_of(&uri::parse_absolute(parent)?) != base => {
                self.dialect_for_depth(parent, depth + 1)?
            }
            _ => self.vocabularies.default_dialect(),
        };
        match document.get("$vocabulary").and_then(Value::as_object) {
            Some(vocabularies) => self.vocabularies.derive_dialect(&base, vocabularies, &parent),
            None => Ok(self.vocabularies.alias_dialect(&base, &parent)),
        }
    }

    /// Raw document for `base`, from the registry, the embedded meta-schemas,
    /// or the fetch hook
    fn raw_document(&self, base: &str, url: &Url) -> Result<Option<Arc<Value>>, SchemaError> {
        if let Some(document) = self.staging.raw_resource(base).or_else(|| self.state.raw_document(base)) {
            return Ok(Some(document));
        }
        if let Some(document) = meta::document(base) {
            return document.map(Some).map_err(|e| SchemaError::UnknownDialect {
                uri: base.to_string(),
                reason: format!("embedded meta-schema is not valid JSON: {}", e),
            });
        }
        let Some(fetcher) = &self.fetcher else {
            return Ok(None);
        };
        let fetched = fetcher.fetch(url).map_err(|e| SchemaError::UnknownDialect {
            uri: base.to_string(),
            reason: format!("fetching meta-schema failed: {}", e),
        })?;
        Ok(fetched.map(Arc::new))
    }

    /// Build a document (or a subtree of one) and register its starting base as a resource
    pub fn build_root(&mut self, value: &Value, frame: Frame) -> Result<SchemaId, SchemaError> {
        let (base, root) = frame.resources[0].clone();
        let fallback = frame.dialect.clone();
        let id = self.build_node(value, frame)?;
        // a root $schema switches the dialect the resource is recorded under
        let dialect = self
            .staging
            .node(id)
            .map(|node| node.dialect().clone())
            .unwrap_or(fallback);
        if root.is_root() && self.state.resource(&base).is_none() && !self.staging.resources.contains_key(&base) {
            self.staging.resources.insert(
                base,
                ResourceInfo {
                    root: id,
                    raw: Arc::new(value.clone()),
                    dialect,
                },
            );
        }
        Ok(id)
    }

    fn handler_for(&self, dialect: &Dialect, name: &str) -> Option<(usize, Arc<dyn KeywordHandler>)> {
        if let Some(handler) = self.overrides.iter().find(|handler| handler.name() == name) {
            let order = dialect.keyword_order(name).unwrap_or(usize::MAX);
            return Some((order, handler.clone()));
        }
        dialect.keyword(name)
    }

    fn register_locations(&mut self, frame: &Frame, id: SchemaId) {
        for (base, root) in &frame.resources {
            if let Some(relative) = frame.location.strip_prefix(root) {
                let key = (base.clone(), relative);
                if !self.state.has_location(&key) {
                    self.staging.locations.entry(key).or_insert(id);
                }
            }
        }
    }

    fn build_object(&mut self, map: &Map<String, Value>, value: &Value, mut frame: Frame) -> Result<SchemaId, SchemaError> {
        let resource_root = frame.is_resource_root();

        // $schema decides how $ref and $id below are read, so it is looked up first
        let declared = match map.get("$schema").and_then(Value::as_str) {
            Some(schema_uri) if resource_root || map.contains_key("$id") => Some(self.dialect_for(schema_uri)?),
            _ => None,
        };
        let effective = declared.clone().unwrap_or_else(|| frame.dialect.clone());

        // $id establishes a new resource unless $ref overrides its siblings
        let ref_overrides = effective.ref_overrides_siblings() && map.contains_key("$ref");
        let mut new_resource = false;
        if !ref_overrides {
            if let Some(Value::String(id)) = map.get("$id") {
                let legacy_anchor = effective.legacy_id_anchors() && id.starts_with('#');
                if !legacy_anchor {
                    let url = uri::resolve(&frame.base, id)?;
                    let has_fragment = url.fragment().is_some_and(|fragment| !fragment.is_empty());
                    if has_fragment && !effective.legacy_id_anchors() {
                        return Err(SchemaError::invalid_value(
                            "$id",
                            frame.absolute_location(),
                            "identifiers must not contain a non-empty fragment",
                        ));
                    }
                    let base = uri::base_of(&url);
                    let mut base_url = url;
                    base_url.set_fragment(None);
                    frame.base = base_url;
                    if frame.resources.last().map(|(b, _)| b != &base).unwrap_or(true) {
                        frame.resources.push((base, frame.location.clone()));
                    }
                    new_resource = true;
                }
            }
        }

        // $schema only applies at resource roots
        let mut declares_dialect = false;
        if resource_root || new_resource {
            if let Some(dialect) = declared {
                frame.dialect = dialect;
                declares_dialect = true;
            }
        }
        if let Some(vocabularies) = map.get("$vocabulary").and_then(Value::as_object) {
            frame.dialect = self.vocabularies.extend_dialect(&frame.dialect, vocabularies)?;
        }

        if new_resource {
            let base = frame.resource_base();
            if let Some(existing) = self.state.resource(&base) {
                if crate::json::json_equal(&existing.raw, value) {
                    trace!(base = %base, "resource already built; reusing");
                    let id = existing.root;
                    self.register_locations(&frame, id);
                    return Ok(id);
                }
                warn!(base = %base, "resource already registered with different content; first registration wins");
            }
            if self.staging.resources.contains_key(&base) {
                return Err(SchemaError::DuplicateResource { uri: base });
            }
        }

        let id = self.staging.reserve();
        self.register_locations(&frame, id);
        if new_resource {
            let base = frame.resource_base();
            if self.state.resource(&base).is_none() {
                self.staging.resources.insert(
                    base,
                    ResourceInfo {
                        root: id,
                        raw: Arc::new(value.clone()),
                        dialect: frame.dialect.clone(),
                    },
                );
            }
        }

        let mut handlers: Vec<(i32, usize, &String, &Value, Arc<dyn KeywordHandler>)> = Vec::with_capacity(map.len());
        for (name, raw) in map {
            if ref_overrides && name != "$ref" {
                continue;
            }
            let (order, handler) = match self.handler_for(&frame.dialect, name) {
                Some(found) => found,
                None if frame.dialect.rejects_unknown_keywords() => {
                    return Err(SchemaError::UnknownKeyword {
                        keyword: name.clone(),
                        location: frame.absolute_location(),
                        dialect: frame.dialect.id().to_string(),
                    });
                }
                None => (usize::MAX, UnknownKeyword::shared()),
            };
            handlers.push((handler.priority(), order, name, raw, handler));
        }
        handlers.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

        let mut keywords = Vec::with_capacity(handlers.len());
        for (priority, _, name, raw, handler) in handlers {
            let mut ctx = BuildContext {
                builder: self,
                frame: &frame,
                object: map,
                keyword: name,
                current: id,
            };
            let state = handler.validate_value(raw, &ctx)?;
            let subschemas = handler.build_subschemas(raw, &state, &mut ctx)?;
            keywords.push(KeywordNode {
                name: name.clone(),
                raw: raw.clone(),
                state,
                subschemas,
                handler,
                priority,
            });
        }

        self.staging.store(SchemaNode {
            id,
            kind: SchemaKind::Object(keywords),
            location: frame.absolute_location(),
            base: frame.resource_base(),
            dialect: frame.dialect.clone(),
            declares_dialect,
        });
        if new_resource {
            debug!(base = %frame.resource_base(), dialect = %frame.dialect.id(), "built schema resource");
        }
        Ok(id)
    }
}

impl NodeBuilder for Builder<'_> {
    fn build_node(&mut self, value: &Value, frame: Frame) -> Result<SchemaId, SchemaError> {
        match value {
            Value::Bool(flag) => {
                let id = self.staging.reserve();
                self.register_locations(&frame, id);
                self.staging.store(SchemaNode {
                    id,
                    kind: SchemaKind::Bool(*flag),
                    location: frame.absolute_location(),
                    base: frame.resource_base(),
                    dialect: frame.dialect.clone(),
                    declares_dialect: false,
                });
                Ok(id)
            }
            Value::Object(map) => self.build_object(map, value, frame),
            other => Err(SchemaError::invalid_value(
                frame.location.last().unwrap_or("<root>"),
                frame.absolute_location(),
                format!("a schema must be an object or a boolean, found {}", crate::json::describe(other)),
            )),
        }
    }

    fn register_anchor(&mut self, base: &str, name: &str, id: SchemaId, dynamic: bool) -> Result<(), SchemaError> {
        let key = (base.to_string(), name.to_string());
        if self.state.anchor(&key).is_some() {
            return Ok(());
        }
        match self.staging.anchors.get(&key) {
            Some(existing) if *existing != id => {
                return Err(SchemaError::DuplicateAnchor {
                    base: base.to_string(),
                    name: name.to_string(),
                });
            }
            _ => {
                self.staging.anchors.insert(key.clone(), id);
            }
        }
        if dynamic {
            self.staging.dynamic_anchors.insert(key, id);
        }
        Ok(())
    }

    fn register_recursive_anchor(&mut self, base: &str) {
        self.staging.recursive_anchors.insert(base.to_string());
    }

    fn register_reference(&mut self, target: Arc<ReferenceTarget>) {
        self.staging.pending.push(target);
    }

    fn vocabularies(&self) -> &VocabularyRegistry {
        self.vocabularies
    }
}

/// Look up a pointer or anchor inside a set of tables
pub(crate) fn fragment_key(uri: &SchemaUri) -> Option<(String, JsonPointer)> {
    match &uri.fragment {
        Fragment::None => Some((uri.base.clone(), JsonPointer::root())),
        Fragment::Pointer(pointer) => Some((uri.base.clone(), pointer.clone())),
        Fragment::Anchor(_) => None,
    }
}
