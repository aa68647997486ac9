//! Data vocabulary: schemas assembled from instance or external data
//!
//! `data` maps keyword names to references. Each reference is resolved when
//! an instance is evaluated, and the resolved values form a schema that is
//! built on the fly and applied to the current instance:
//!
//! - `/a/b` is a JSON pointer into the root instance
//! - `1/a` (a relative JSON pointer) is not supported
//! - anything else is a URI resolved through the schema registry
//!
//! `optionalData` works the same but skips references that do not resolve.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::build::BuildContext;
use crate::dialect::{standard, Vocabulary, VocabularyPlugin, VocabularyRegistry};
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::graph::SchemaGraph;
use crate::json::JsonPointer;
use crate::keyword::{KeywordHandler, KeywordNode, KeywordOutcome, KeywordState};
use crate::options::BuildOptions;
use crate::registry::SchemaRegistry;
use crate::uri::{self, SchemaUri};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Vocabulary URI of the data keywords
pub const VOCAB_DATA: &str = "https://schemata.dev/vocab/data";

/// Meta-schema (and dialect) URI: 2020-12 plus the data vocabulary
pub const META_DATA: &str = "https://schemata.dev/meta/data";

/// Installs the data vocabulary, its dialect and its meta-schema
#[derive(Debug, Default)]
pub struct DataVocabulary;

impl VocabularyPlugin for DataVocabulary {
    fn name(&self) -> &str {
        "data"
    }

    fn install(&self, vocabularies: &VocabularyRegistry, schemas: &SchemaRegistry) -> Result<(), SchemaError> {
        let base = vocabularies
            .dialect(standard::DRAFT_2020_12)
            .ok_or_else(|| SchemaError::UnknownDialect {
                uri: standard::DRAFT_2020_12.to_string(),
                reason: "the data vocabulary extends 2020-12, which is not registered".to_string(),
            })?;
        let vocabulary = vocabularies.register_vocabulary(
            Vocabulary::new(VOCAB_DATA)
                .with_keyword(Arc::new(DataKeyword::required()))
                .with_keyword(Arc::new(DataKeyword::optional())),
        );
        vocabularies.register_dialect(base.to_builder(META_DATA).vocabulary(vocabulary).build());
        schemas.register(META_DATA, meta_schema())?;
        Ok(())
    }
}

/// The meta-schema document for [`META_DATA`]
pub fn meta_schema() -> Value {
    let reference = json!({ "type": "string" });
    json!({
        "$schema": standard::DRAFT_2020_12,
        "$id": META_DATA,
        "$vocabulary": {
            (standard::VOCAB_CORE): true,
            (standard::VOCAB_APPLICATOR): true,
            (standard::VOCAB_UNEVALUATED): true,
            (standard::VOCAB_VALIDATION): true,
            (standard::VOCAB_META_DATA): true,
            (standard::VOCAB_FORMAT_ANNOTATION): true,
            (standard::VOCAB_CONTENT): true,
            (VOCAB_DATA): true
        },
        "$dynamicAnchor": "meta",
        "title": "Data vocabulary meta-schema",
        "allOf": [{ "$ref": standard::DRAFT_2020_12 }],
        "properties": {
            "data": { "type": "object", "additionalProperties": reference },
            "optionalData": { "type": "object", "additionalProperties": reference }
        }
    })
}

/// A `data` reference, classified at build time
#[derive(Debug, Clone, PartialEq)]
enum DataReference {
    /// Into the root instance
    Pointer(JsonPointer),
    /// Relative to the current instance location
    Relative(String),
    /// A document or document fragment, possibly relative
    Uri(String),
}

impl DataReference {
    fn classify(text: &str) -> Option<Self> {
        if text.is_empty() || text.starts_with('/') {
            return JsonPointer::parse(text).map(Self::Pointer);
        }
        if text.starts_with(|c: char| c.is_ascii_digit()) {
            return Some(Self::Relative(text.to_string()));
        }
        Some(Self::Uri(text.to_string()))
    }
}

/// `data` and `optionalData`
#[derive(Debug)]
pub struct DataKeyword {
    optional: bool,
}

impl DataKeyword {
    /// `data`: every reference must resolve
    pub fn required() -> Self {
        Self { optional: false }
    }

    /// `optionalData`: unresolvable references are left out
    pub fn optional() -> Self {
        Self { optional: true }
    }

    fn resolve(&self, reference: &DataReference, ctx: &EvalContext<'_>) -> Result<Value, ResolutionError> {
        match reference {
            DataReference::Pointer(pointer) => {
                pointer
                    .evaluate(ctx.root_instance())
                    .cloned()
                    .ok_or_else(|| ResolutionError::PointerNotFound {
                        base: "instance".to_string(),
                        pointer: pointer.to_string(),
                    })
            }
            DataReference::Relative(text) => Err(ResolutionError::UnsupportedReference {
                reference: text.clone(),
                reason: "relative JSON pointers are not supported in data references".to_string(),
            }),
            DataReference::Uri(text) => {
                let base = ctx.options().default_base_uri.as_deref().unwrap_or(ctx.schema().base());
                let base = uri::parse_absolute(base).map_err(|e| ResolutionError::unresolved(text.as_str(), e.to_string()))?;
                let target =
                    SchemaUri::resolve(&base, text).map_err(|e| ResolutionError::unresolved(text.as_str(), e.to_string()))?;
                ctx.registry().raw_value(&target)
            }
        }
    }

    /// Build the assembled schema in a scratch registry
    fn build(&self, schema: &Value, ctx: &EvalContext<'_>) -> Result<SchemaGraph, ResolutionError> {
        let mut options = BuildOptions::new()
            .with_registry(Arc::new(ctx.registry().scratch()))
            .with_dialect(ctx.schema().dialect().id());
        if let Some(base) = &ctx.options().default_base_uri {
            options = options.with_base_uri(base.clone());
        }
        SchemaGraph::build(schema, &options).map_err(|source| ResolutionError::Build {
            uri: ctx.schema().location().to_string(),
            source: Box::new(source),
        })
    }
}

impl KeywordHandler for DataKeyword {
    fn name(&self) -> &str {
        if self.optional {
            "optionalData"
        } else {
            "data"
        }
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let map = value
            .as_object()
            .ok_or_else(|| ctx.invalid("expected an object of keyword references"))?;
        let mut references = Vec::with_capacity(map.len());
        for (keyword, reference) in map {
            let reference = reference
                .as_str()
                .and_then(DataReference::classify)
                .ok_or_else(|| ctx.invalid(format!("reference for '{}' must be a JSON pointer or URI", keyword)))?;
            references.push((keyword.clone(), reference));
        }
        Ok(KeywordState::new(references))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let Some(references) = node.state().get::<Vec<(String, DataReference)>>() else {
            return Ok(KeywordOutcome::pass());
        };
        let mut schema = Map::new();
        for (keyword, reference) in references {
            match self.resolve(reference, ctx) {
                Ok(value) => {
                    schema.insert(keyword.clone(), value);
                }
                Err(ResolutionError::UnsupportedReference { reference, reason }) => {
                    return Err(ResolutionError::UnsupportedReference { reference, reason });
                }
                Err(error) if self.optional => {
                    debug!(keyword = %keyword, error = %error, "skipping unresolved optional data reference");
                }
                Err(error) => return Err(error),
            }
        }
        let graph = self.build(&Value::Object(schema), ctx)?;
        let result = ctx.evaluate_graph(&graph)?;
        Ok(KeywordOutcome::from_details(result.valid, vec![result]).absorb_valid_details())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_references() {
        assert_eq!(
            DataReference::classify("/limits/max"),
            Some(DataReference::Pointer(JsonPointer::from_segments(["limits", "max"])))
        );
        assert_eq!(DataReference::classify(""), Some(DataReference::Pointer(JsonPointer::root())));
        assert_eq!(DataReference::classify("1/max"), Some(DataReference::Relative("1/max".to_string())));
        assert_eq!(
            DataReference::classify("limits.json#/max"),
            Some(DataReference::Uri("limits.json#/max".to_string()))
        );
    }

    #[test]
    fn test_meta_schema_declares_data_vocabulary() {
        let meta = meta_schema();
        assert_eq!(meta["$id"], META_DATA);
        assert_eq!(meta["$vocabulary"][VOCAB_DATA], true);
    }
}
