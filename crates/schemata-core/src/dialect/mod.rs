//! Vocabularies and dialects
//!
//! A [`Vocabulary`] is a named set of keyword handlers. A [`Dialect`] is an
//! ordered set of vocabularies plus a few behavioral switches, identified by
//! its meta-schema URI. The [`VocabularyRegistry`] maps URIs to both and can
//! derive new dialects from a meta-schema's `$vocabulary`.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

pub mod meta;
pub mod standard;

use crate::error::SchemaError;
use crate::keyword::KeywordHandler;
use crate::keywords::format::FormatRegistry;
use crate::registry::SchemaRegistry;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, warn};

/// A named set of keyword handlers
#[derive(Debug, Clone)]
pub struct Vocabulary {
    id: String,
    keywords: Vec<Arc<dyn KeywordHandler>>,
}

impl Vocabulary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keyword(mut self, handler: Arc<dyn KeywordHandler>) -> Self {
        self.keywords.push(handler);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn keywords(&self) -> &[Arc<dyn KeywordHandler>] {
        &self.keywords
    }
}

/// An ordered vocabulary set identified by a meta-schema URI
#[derive(Clone)]
pub struct Dialect {
    id: String,
    vocabularies: Vec<Arc<Vocabulary>>,
    keywords: HashMap<String, (usize, Arc<dyn KeywordHandler>)>,
    reject_unknown_keywords: bool,
    ref_overrides_siblings: bool,
    legacy_id_anchors: bool,
}

impl Dialect {
    pub fn builder(id: impl Into<String>) -> DialectBuilder {
        DialectBuilder {
            id: normalize(&id.into()),
            vocabularies: Vec::new(),
            reject_unknown_keywords: false,
            ref_overrides_siblings: false,
            legacy_id_anchors: false,
        }
    }

    /// The meta-schema URI, without empty fragment
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vocabularies(&self) -> &[Arc<Vocabulary>] {
        &self.vocabularies
    }

    pub fn has_vocabulary(&self, id: &str) -> bool {
        self.vocabularies.iter().any(|vocabulary| vocabulary.id() == id)
    }

    /// The handler registered for a keyword name
    pub fn handler(&self, name: &str) -> Option<&Arc<dyn KeywordHandler>> {
        self.keywords.get(name).map(|(_, handler)| handler)
    }

    pub(crate) fn keyword(&self, name: &str) -> Option<(usize, Arc<dyn KeywordHandler>)> {
        self.keywords.get(name).map(|(order, handler)| (*order, handler.clone()))
    }

    pub(crate) fn keyword_order(&self, name: &str) -> Option<usize> {
        self.keywords.get(name).map(|(order, _)| *order)
    }

    /// Unknown keywords are build errors instead of annotations
    pub fn rejects_unknown_keywords(&self) -> bool {
        self.reject_unknown_keywords
    }

    /// `$ref` makes every sibling keyword inert (draft-07 and earlier)
    pub fn ref_overrides_siblings(&self) -> bool {
        self.ref_overrides_siblings
    }

    /// `$id: "#name"` declares an anchor (draft-07 and earlier)
    pub fn legacy_id_anchors(&self) -> bool {
        self.legacy_id_anchors
    }

    /// A builder preloaded with this dialect's switches and vocabularies
    pub fn to_builder(&self, id: impl Into<String>) -> DialectBuilder {
        DialectBuilder {
            id: normalize(&id.into()),
            vocabularies: self.vocabularies.clone(),
            reject_unknown_keywords: self.reject_unknown_keywords,
            ref_overrides_siblings: self.ref_overrides_siblings,
            legacy_id_anchors: self.legacy_id_anchors,
        }
    }
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("id", &self.id)
            .field(
                "vocabularies",
                &self.vocabularies.iter().map(|vocabulary| vocabulary.id()).collect::<Vec<_>>(),
            )
            .field("reject_unknown_keywords", &self.reject_unknown_keywords)
            .finish()
    }
}

/// Builder for [`Dialect`]
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    id: String,
    vocabularies: Vec<Arc<Vocabulary>>,
    reject_unknown_keywords: bool,
    ref_overrides_siblings: bool,
    legacy_id_anchors: bool,
}

impl DialectBuilder {
    /// Append a vocabulary; a later vocabulary's handler replaces an earlier
    /// one for the same keyword name
    pub fn vocabulary(mut self, vocabulary: Arc<Vocabulary>) -> Self {
        if !self.vocabularies.iter().any(|existing| existing.id() == vocabulary.id()) {
            self.vocabularies.push(vocabulary);
        }
        self
    }

    pub fn reject_unknown_keywords(mut self, reject: bool) -> Self {
        self.reject_unknown_keywords = reject;
        self
    }

    pub fn ref_overrides_siblings(mut self, overrides: bool) -> Self {
        self.ref_overrides_siblings = overrides;
        self
    }

    pub fn legacy_id_anchors(mut self, legacy: bool) -> Self {
        self.legacy_id_anchors = legacy;
        self
    }

    pub fn build(self) -> Dialect {
        let mut keywords: HashMap<String, (usize, Arc<dyn KeywordHandler>)> = HashMap::new();
        let mut next = 0;
        for vocabulary in &self.vocabularies {
            for handler in vocabulary.keywords() {
                match keywords.get_mut(handler.name()) {
                    Some(entry) => entry.1 = handler.clone(),
                    None => {
                        keywords.insert(handler.name().to_string(), (next, handler.clone()));
                        next += 1;
                    }
                }
            }
        }
        Dialect {
            id: self.id,
            vocabularies: self.vocabularies,
            keywords,
            reject_unknown_keywords: self.reject_unknown_keywords,
            ref_overrides_siblings: self.ref_overrides_siblings,
            legacy_id_anchors: self.legacy_id_anchors,
        }
    }
}

/// A packaged extension that registers vocabularies, dialects and documents
pub trait VocabularyPlugin {
    fn name(&self) -> &str;

    fn install(&self, vocabularies: &VocabularyRegistry, schemas: &SchemaRegistry) -> Result<(), SchemaError>;
}

/// URI-keyed vocabularies and dialects, with the format checkers they use
pub struct VocabularyRegistry {
    vocabularies: RwLock<HashMap<String, Arc<Vocabulary>>>,
    dialects: RwLock<HashMap<String, Arc<Dialect>>>,
    default_dialect: RwLock<Arc<Dialect>>,
    formats: FormatRegistry,
}

impl VocabularyRegistry {
    /// A registry with every standard vocabulary and dialect; 2020-12 is the default
    pub fn new() -> Self {
        let registry = Self::empty();
        standard::install(&registry);
        registry
    }

    /// A registry with no vocabularies, for fully custom dialects
    pub fn empty() -> Self {
        Self {
            vocabularies: RwLock::new(HashMap::new()),
            dialects: RwLock::new(HashMap::new()),
            default_dialect: RwLock::new(Arc::new(Dialect::builder(EMPTY_DIALECT).build())),
            formats: FormatRegistry::new(),
        }
    }

    /// The process-wide default registry
    pub fn shared() -> Arc<VocabularyRegistry> {
        static SHARED: OnceLock<Arc<VocabularyRegistry>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(VocabularyRegistry::new())).clone()
    }

    pub fn register_vocabulary(&self, vocabulary: Vocabulary) -> Arc<Vocabulary> {
        let vocabulary = Arc::new(vocabulary);
        debug!(vocabulary = %vocabulary.id(), keywords = vocabulary.keywords().len(), "registered vocabulary");
        write(&self.vocabularies).insert(vocabulary.id().to_string(), vocabulary.clone());
        vocabulary
    }

    pub fn vocabulary(&self, id: &str) -> Option<Arc<Vocabulary>> {
        read(&self.vocabularies).get(id).cloned()
    }

    pub fn register_dialect(&self, dialect: Dialect) -> Arc<Dialect> {
        let dialect = Arc::new(dialect);
        debug!(dialect = %dialect.id(), "registered dialect");
        write(&self.dialects).insert(dialect.id().to_string(), dialect.clone());
        dialect
    }

    /// A registered (or previously derived) dialect
    pub fn dialect(&self, id: &str) -> Option<Arc<Dialect>> {
        read(&self.dialects).get(&normalize(id)).cloned()
    }

    pub fn default_dialect(&self) -> Arc<Dialect> {
        read(&self.default_dialect).clone()
    }

    /// Make a registered dialect the default for documents without `$schema`
    pub fn set_default_dialect(&self, id: &str) -> Result<(), SchemaError> {
        let dialect = self.dialect(id).ok_or_else(|| SchemaError::UnknownDialect {
            uri: id.to_string(),
            reason: "not registered".to_string(),
        })?;
        *write(&self.default_dialect) = dialect;
        Ok(())
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Install a plugin into this registry and a schema registry
    pub fn install(&self, plugin: &dyn VocabularyPlugin, schemas: &SchemaRegistry) -> Result<(), SchemaError> {
        debug!(plugin = %plugin.name(), "installing vocabulary plugin");
        plugin.install(self, schemas)
    }

    /// Derive and memoize the dialect of a meta-schema from its `$vocabulary`
    pub(crate) fn derive_dialect(
        &self,
        id: &str,
        declared: &Map<String, Value>,
        parent: &Dialect,
    ) -> Result<Arc<Dialect>, SchemaError> {
        if let Some(existing) = self.dialect(id) {
            return Ok(existing);
        }
        let mut builder = Dialect::builder(id)
            .reject_unknown_keywords(parent.rejects_unknown_keywords())
            .ref_overrides_siblings(parent.ref_overrides_siblings())
            .legacy_id_anchors(parent.legacy_id_anchors());

        // Core identifiers are always available
        for core in parent.vocabularies().iter().filter(|v| v.id().ends_with("/vocab/core")) {
            builder = builder.vocabulary(core.clone());
        }
        for vocabulary in self.resolve_vocabularies(declared)? {
            builder = builder.vocabulary(vocabulary);
        }
        Ok(self.register_dialect(builder.build()))
    }

    /// A dialect extended with the vocabularies a subtree's `$vocabulary` adds
    pub(crate) fn extend_dialect(&self, dialect: &Arc<Dialect>, declared: &Map<String, Value>) -> Result<Arc<Dialect>, SchemaError> {
        let added: Vec<_> = self
            .resolve_vocabularies(declared)?
            .into_iter()
            .filter(|vocabulary| !dialect.has_vocabulary(vocabulary.id()))
            .collect();
        if added.is_empty() {
            return Ok(dialect.clone());
        }
        let builder = added
            .into_iter()
            .fold(dialect.to_builder(dialect.id()), |builder, vocabulary| builder.vocabulary(vocabulary));
        Ok(Arc::new(builder.build()))
    }

    /// Record that a meta-schema without `$vocabulary` behaves like its own meta-schema
    pub(crate) fn alias_dialect(&self, id: &str, parent: &Arc<Dialect>) -> Arc<Dialect> {
        write(&self.dialects).insert(normalize(id), parent.clone());
        parent.clone()
    }

    fn resolve_vocabularies(&self, declared: &Map<String, Value>) -> Result<Vec<Arc<Vocabulary>>, SchemaError> {
        let mut resolved = Vec::new();
        for (uri, required) in declared {
            match self.vocabulary(uri) {
                Some(vocabulary) => resolved.push(vocabulary),
                None if required.as_bool().unwrap_or(false) => {
                    return Err(SchemaError::UnknownVocabulary { uri: uri.clone() });
                }
                None => warn!(vocabulary = %uri, "ignoring unknown optional vocabulary"),
            }
        }
        Ok(resolved)
    }
}

impl Default for VocabularyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VocabularyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dialects: Vec<_> = read(&self.dialects).keys().cloned().collect();
        dialects.sort();
        f.debug_struct("VocabularyRegistry")
            .field("vocabularies", &read(&self.vocabularies).len())
            .field("dialects", &dialects)
            .finish()
    }
}

const EMPTY_DIALECT: &str = "urn:schemata:dialect:empty";

/// Strip an empty trailing fragment so `...schema#` and `...schema` agree
pub(crate) fn normalize(uri: &str) -> String {
    uri.strip_suffix('#').unwrap_or(uri).to_string()
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_dialects_registered() {
        let registry = VocabularyRegistry::new();
        for id in [
            standard::DRAFT_06,
            standard::DRAFT_07,
            standard::DRAFT_2019_09,
            standard::DRAFT_2020_12,
        ] {
            assert!(registry.dialect(id).is_some(), "missing {}", id);
        }
        assert!(registry.dialect("http://json-schema.org/draft-07/schema#").is_some());
        assert_eq!(registry.default_dialect().id(), standard::DRAFT_2020_12);
    }

    #[test]
    fn test_dialect_switches() {
        let registry = VocabularyRegistry::new();
        let draft7 = registry.dialect(standard::DRAFT_07).unwrap();
        assert!(draft7.ref_overrides_siblings());
        assert!(draft7.legacy_id_anchors());
        assert!(draft7.handler("$dynamicRef").is_none());

        let modern = registry.dialect(standard::DRAFT_2020_12).unwrap();
        assert!(!modern.ref_overrides_siblings());
        assert!(modern.handler("prefixItems").is_some());
        assert!(modern.handler("$recursiveRef").is_none());
    }

    #[test]
    fn test_derive_dialect_from_vocabulary() {
        let registry = VocabularyRegistry::new();
        let parent = registry.default_dialect();
        let declared = json!({
            "https://json-schema.org/draft/2020-12/vocab/core": true,
            "https://json-schema.org/draft/2020-12/vocab/applicator": true,
            "https://example.com/vocab/optional-extra": false
        });
        let dialect = registry
            .derive_dialect("https://example.com/meta/no-validation", declared.as_object().unwrap(), &parent)
            .unwrap();
        assert!(dialect.handler("properties").is_some());
        assert!(dialect.handler("minimum").is_none());
        assert!(registry.dialect("https://example.com/meta/no-validation").is_some());
    }

    #[test]
    fn test_unknown_required_vocabulary_is_error() {
        let registry = VocabularyRegistry::new();
        let parent = registry.default_dialect();
        let declared = json!({"https://example.com/vocab/required-extra": true});
        let err = registry
            .derive_dialect("https://example.com/meta/strict", declared.as_object().unwrap(), &parent)
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownVocabulary { .. }));
    }

    #[test]
    fn test_later_vocabulary_replaces_handler() {
        let registry = VocabularyRegistry::new();
        let modern = registry.dialect(standard::DRAFT_2020_12).unwrap();
        let assertion = registry.vocabulary(standard::VOCAB_FORMAT_ASSERTION).unwrap();
        let asserting = modern.to_builder("https://example.com/meta/asserting").vocabulary(assertion.clone()).build();
        let format = asserting.handler("format").unwrap();
        assert!(Arc::ptr_eq(format, &assertion.keywords()[0]));
        assert_eq!(asserting.keyword_order("format"), modern.keyword_order("format"));
    }
}
