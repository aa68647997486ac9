//! Unit tests for dialects and vocabularies
//!
//! Covers the legacy drafts, dialects derived from a meta-schema's
//! `$vocabulary`, format assertion, cross-dialect evaluation, keyword
//! overrides, meta-schema validation and the data vocabulary plugin.

use schemata_core::dialect::standard;
use schemata_core::keywords::data::{DataVocabulary, META_DATA};
use schemata_core::{
    BuildContext, BuildOptions, EvalContext, EvaluationOptions, KeywordHandler, KeywordNode, KeywordOutcome,
    KeywordState, ResolutionError, SchemaError, SchemaGraph, SchemaRegistry, VocabularyRegistry,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::new())
}

fn build_with(options: BuildOptions, schema: Value) -> SchemaGraph {
    SchemaGraph::build(&schema, &options).unwrap()
}

fn build(schema: Value) -> SchemaGraph {
    build_with(BuildOptions::new().with_registry(registry()), schema)
}

fn valid(schema: &SchemaGraph, instance: Value) -> bool {
    schema.is_valid(&instance).unwrap()
}

#[cfg(test)]
mod legacy_drafts {
    use super::*;

    #[test]
    fn test_draft7_ref_overrides_siblings() {
        let schema = build(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "definitions": {"i": {"type": "integer"}},
            "$ref": "#/definitions/i",
            "maximum": 1
        }));
        assert_eq!(schema.dialect().id(), standard::DRAFT_07);
        assert!(valid(&schema, json!(5)));
        assert!(!valid(&schema, json!("x")));
    }

    #[test]
    fn test_draft7_legacy_id_anchor() {
        let schema = build(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "definitions": {"positive": {"$id": "#positive", "minimum": 0}},
            "properties": {"x": {"$ref": "#positive"}}
        }));
        assert!(valid(&schema, json!({"x": 1})));
        assert!(!valid(&schema, json!({"x": -1})));
    }

    #[test]
    fn test_draft7_root_declared_dialect_governs_ref_and_id() {
        // declared through $schema only; the build options carry no dialect
        let schema = build(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$id": "#root",
            "definitions": {"i": {"type": "integer"}},
            "properties": {
                "self": {"$ref": "#root"},
                "n": {"allOf": [{"$ref": "#/definitions/i", "maximum": 1}]}
            }
        }));
        assert_eq!(schema.dialect().id(), standard::DRAFT_07);
        assert!(valid(&schema, json!({"n": 5})));
        assert!(valid(&schema, json!({"self": {"n": 5}})));
        assert!(!valid(&schema, json!({"self": {"n": "x"}})));

        let with_option = build_with(
            BuildOptions::new().with_registry(registry()).with_dialect(standard::DRAFT_07),
            json!({"definitions": {"i": {"type": "integer"}}, "$ref": "#/definitions/i", "maximum": 1}),
        );
        let declared = build(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "definitions": {"i": {"type": "integer"}},
            "$ref": "#/definitions/i",
            "maximum": 1
        }));
        assert_eq!(valid(&with_option, json!(5)), valid(&declared, json!(5)));
    }

    #[test]
    fn test_embedded_draft7_resource_inside_2020_document() {
        let schema = build(json!({
            "$id": "https://example.com/outer.json",
            "properties": {
                "legacy": {
                    "$schema": "http://json-schema.org/draft-07/schema#",
                    "$id": "https://example.com/legacy.json",
                    "definitions": {"s": {"type": "string"}},
                    "allOf": [{"$ref": "#/definitions/s", "minLength": 10}]
                }
            }
        }));
        assert!(valid(&schema, json!({"legacy": "short"})));
        assert!(!valid(&schema, json!({"legacy": 3})));
    }

    #[test]
    fn test_draft7_array_items_and_dependencies() {
        let schema = build(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "items": [{"type": "integer"}],
            "additionalItems": false,
            "dependencies": {"a": ["b"], "c": {"required": ["d"]}}
        }));
        assert!(valid(&schema, json!([1])));
        assert!(!valid(&schema, json!([1, 2])));
        assert!(valid(&schema, json!({"a": 1, "b": 2})));
        assert!(!valid(&schema, json!({"a": 1})));
        assert!(!valid(&schema, json!({"c": 1})));
    }

    #[test]
    fn test_draft6_keywords() {
        let schema = build(json!({
            "$schema": "http://json-schema.org/draft-06/schema#",
            "exclusiveMinimum": 0,
            "const": 3
        }));
        assert!(valid(&schema, json!(3)));
        assert!(!valid(&schema, json!(4)));
    }

    #[test]
    fn test_unknown_dialect_is_rejected() {
        let options = BuildOptions::new().with_registry(registry());
        let err = SchemaGraph::build(&json!({"$schema": "https://example.com/no-such-dialect"}), &options).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownDialect { .. }));
    }
}

#[cfg(test)]
mod derived_dialects {
    use super::*;

    #[test]
    fn test_meta_schema_without_validation_vocabulary() {
        let registry = registry();
        registry
            .register(
                "https://example.com/meta/applicator-only",
                json!({
                    "$schema": standard::DRAFT_2020_12,
                    "$id": "https://example.com/meta/applicator-only",
                    "$vocabulary": {
                        (standard::VOCAB_CORE): true,
                        (standard::VOCAB_APPLICATOR): true
                    }
                }),
            )
            .unwrap();
        let schema = build_with(
            BuildOptions::new().with_registry(registry),
            json!({
                "$schema": "https://example.com/meta/applicator-only",
                "type": "string",
                "properties": {"a": false}
            }),
        );
        assert!(valid(&schema, json!(5)));
        assert!(!valid(&schema, json!({"a": 1})));
    }

    #[test]
    fn test_unknown_required_vocabulary_is_rejected() {
        let registry = registry();
        registry
            .register(
                "https://example.com/meta/unknown-required",
                json!({
                    "$id": "https://example.com/meta/unknown-required",
                    "$vocabulary": {
                        (standard::VOCAB_CORE): true,
                        "https://example.com/vocab/unknown": true
                    }
                }),
            )
            .unwrap();
        let options = BuildOptions::new().with_registry(registry);
        let err = SchemaGraph::build(&json!({"$schema": "https://example.com/meta/unknown-required"}), &options).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownVocabulary { ref uri } if uri == "https://example.com/vocab/unknown"));
    }

    #[test]
    fn test_unknown_optional_vocabulary_is_ignored() {
        let registry = registry();
        registry
            .register(
                "https://example.com/meta/unknown-optional",
                json!({
                    "$id": "https://example.com/meta/unknown-optional",
                    "$vocabulary": {
                        (standard::VOCAB_CORE): true,
                        (standard::VOCAB_VALIDATION): true,
                        "https://example.com/vocab/unknown": false
                    }
                }),
            )
            .unwrap();
        let schema = build_with(
            BuildOptions::new().with_registry(registry),
            json!({"$schema": "https://example.com/meta/unknown-optional", "type": "integer"}),
        );
        assert!(valid(&schema, json!(1)));
        assert!(!valid(&schema, json!("1")));
    }

    #[test]
    fn test_strict_dialect_rejects_unknown_keywords() {
        let vocabularies = Arc::new(VocabularyRegistry::new());
        let modern = vocabularies.dialect(standard::DRAFT_2020_12).unwrap();
        vocabularies.register_dialect(
            modern
                .to_builder("https://example.com/dialect/strict")
                .reject_unknown_keywords(true)
                .build(),
        );
        let registry = Arc::new(SchemaRegistry::with_vocabularies(vocabularies));
        let options = BuildOptions::new()
            .with_registry(registry)
            .with_dialect("https://example.com/dialect/strict");

        let err = SchemaGraph::build(&json!({"type": "string", "colour": "red"}), &options).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownKeyword { ref keyword, .. } if keyword == "colour"));
        assert!(SchemaGraph::build(&json!({"type": "string"}), &options).is_ok());
    }

    #[test]
    fn test_unknown_keywords_are_annotations_by_default() {
        let schema = build(json!({"colour": "red"}));
        let result = schema.evaluate_tree(&json!(1), &EvaluationOptions::new()).unwrap();
        assert!(result.valid);
        assert!(result.annotations().iter().any(|node| node.annotation == Some(json!("red"))));
    }
}

#[cfg(test)]
mod formats {
    use super::*;

    fn email_schema() -> SchemaGraph {
        build(json!({"format": "email"}))
    }

    #[test]
    fn test_format_annotates_by_default() {
        let schema = email_schema();
        assert!(valid(&schema, json!("not an email")));
        let result = schema.evaluate_tree(&json!("a@b.c"), &EvaluationOptions::new()).unwrap();
        assert!(result.annotations().iter().any(|node| node.annotation == Some(json!("email"))));
    }

    #[test]
    fn test_format_validation_option() {
        let schema = email_schema();
        let options = EvaluationOptions::new().with_format_validation(true);
        assert!(schema.evaluate_tree(&json!("a@b.c"), &options).unwrap().valid);
        assert!(!schema.evaluate_tree(&json!("not an email"), &options).unwrap().valid);
        assert!(schema.evaluate_tree(&json!(42), &options).unwrap().valid);
    }

    #[test]
    fn test_format_assertion_vocabulary() {
        let registry = registry();
        registry
            .register(
                "https://example.com/meta/format-assertion",
                json!({
                    "$schema": standard::DRAFT_2020_12,
                    "$id": "https://example.com/meta/format-assertion",
                    "$vocabulary": {
                        (standard::VOCAB_CORE): true,
                        (standard::VOCAB_FORMAT_ASSERTION): true
                    }
                }),
            )
            .unwrap();
        let schema = build_with(
            BuildOptions::new().with_registry(registry),
            json!({"$schema": "https://example.com/meta/format-assertion", "format": "ipv4"}),
        );
        assert!(valid(&schema, json!("10.0.0.1")));
        assert!(!valid(&schema, json!("10.0.0.256")));
    }

    #[test]
    fn test_unknown_format_passes() {
        let schema = build(json!({"format": "no-such-format"}));
        let options = EvaluationOptions::new().with_format_validation(true);
        assert!(schema.evaluate_tree(&json!("anything"), &options).unwrap().valid);
    }

    #[test]
    fn test_custom_format_checker() {
        let vocabularies = Arc::new(VocabularyRegistry::new());
        vocabularies.formats().register("even-length", |value: &str| value.len() % 2 == 0);
        let registry = Arc::new(SchemaRegistry::with_vocabularies(vocabularies));
        let schema = build_with(BuildOptions::new().with_registry(registry), json!({"format": "even-length"}));
        let options = EvaluationOptions::new().with_format_validation(true);
        assert!(schema.evaluate_tree(&json!("ab"), &options).unwrap().valid);
        assert!(!schema.evaluate_tree(&json!("abc"), &options).unwrap().valid);
    }
}

#[cfg(test)]
mod cross_dialect {
    use super::*;

    #[test]
    fn test_evaluate_as_other_dialect() {
        let schema = build_with(
            BuildOptions::new()
                .with_registry(registry())
                .with_dialect(standard::DRAFT_2019_09),
            json!({"items": [{"type": "integer"}]}),
        );
        assert!(!valid(&schema, json!(["x"])));

        let options = EvaluationOptions::new().with_evaluate_as(standard::DRAFT_2020_12);
        assert!(schema.evaluate_tree(&json!(["x"]), &options).unwrap().valid);
    }

    #[test]
    fn test_evaluate_as_keeps_declared_dialect() {
        let schema = build(json!({
            "$schema": standard::DRAFT_2019_09,
            "items": [{"type": "integer"}]
        }));
        let options = EvaluationOptions::new().with_evaluate_as(standard::DRAFT_2020_12);
        assert!(!schema.evaluate_tree(&json!(["x"]), &options).unwrap().valid);
    }
}

#[cfg(test)]
mod overrides {
    use super::*;

    /// `maxLength` counted in bytes instead of characters
    #[derive(Debug)]
    struct ByteLength;

    impl KeywordHandler for ByteLength {
        fn name(&self) -> &str {
            "maxLength"
        }

        fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
            let limit = value.as_u64().ok_or_else(|| ctx.invalid("expected a non-negative integer"))?;
            Ok(KeywordState::new(limit as usize))
        }

        fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
            let (Some(limit), Some(text)) = (node.state().get::<usize>(), ctx.instance().as_str()) else {
                return Ok(KeywordOutcome::pass());
            };
            Ok(KeywordOutcome::check(text.len() <= *limit, || format!("more than {} bytes", limit)))
        }
    }

    #[test]
    fn test_keyword_override_replaces_handler() {
        let schema = json!({"maxLength": 2});
        let standard = build(schema.clone());
        assert!(valid(&standard, json!("éé")));

        let options = BuildOptions::new()
            .with_registry(registry())
            .with_keyword_override(Arc::new(ByteLength));
        let overridden = build_with(options, schema);
        assert!(!valid(&overridden, json!("éé")));
        assert!(valid(&overridden, json!("ab")));
    }
}

#[cfg(test)]
mod meta_validation {
    use super::*;

    #[test]
    fn test_meta_schema_validation_rejects_invalid_documents() {
        let document = json!({"title": 5});
        assert!(SchemaGraph::build(&document, &BuildOptions::new().with_registry(registry())).is_ok());

        let options = BuildOptions::new()
            .with_registry(registry())
            .with_meta_schema_validation(true);
        let err = SchemaGraph::build(&document, &options).unwrap_err();
        match err {
            SchemaError::MetaSchemaValidation { meta_schema, errors } => {
                assert_eq!(meta_schema, standard::DRAFT_2020_12);
                assert!(!errors.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_meta_schema_validation_accepts_valid_documents() {
        let options = BuildOptions::new()
            .with_registry(registry())
            .with_meta_schema_validation(true);
        let document = json!({
            "$schema": standard::DRAFT_2020_12,
            "type": "object",
            "properties": {"a": {"type": "string", "minLength": 1}}
        });
        assert!(SchemaGraph::build(&document, &options).is_ok());
    }
}

#[cfg(test)]
mod data_vocabulary {
    use super::*;

    fn data_registry() -> Arc<SchemaRegistry> {
        let vocabularies = Arc::new(VocabularyRegistry::new());
        let registry = Arc::new(SchemaRegistry::with_vocabularies(vocabularies.clone()));
        vocabularies.install(&DataVocabulary, &registry).unwrap();
        registry
    }

    fn data_schema(registry: &Arc<SchemaRegistry>, keyword: &str, reference: &str) -> SchemaGraph {
        build_with(
            BuildOptions::new().with_registry(registry.clone()),
            json!({
                "$schema": META_DATA,
                "$id": "https://example.com/data-schema.json",
                "properties": {"value": {(keyword): {"maximum": reference}}}
            }),
        )
    }

    #[test]
    fn test_pointer_into_instance() {
        let schema = data_schema(&data_registry(), "data", "/limit");
        assert!(valid(&schema, json!({"limit": 5, "value": 3})));
        assert!(!valid(&schema, json!({"limit": 5, "value": 7})));
    }

    #[test]
    fn test_missing_pointer_target() {
        let schema = data_schema(&data_registry(), "data", "/limit");
        let err = schema.is_valid(&json!({"value": 7})).unwrap_err();
        assert!(matches!(err, ResolutionError::PointerNotFound { .. }));
    }

    #[test]
    fn test_uri_into_registered_document() {
        let registry = data_registry();
        registry
            .register("https://example.com/limits.json", json!({"max": 3}))
            .unwrap();
        let schema = data_schema(&registry, "data", "limits.json#/max");
        assert!(valid(&schema, json!({"value": 3})));
        assert!(!valid(&schema, json!({"value": 4})));
    }

    #[test]
    fn test_relative_pointer_is_unsupported() {
        let schema = data_schema(&data_registry(), "data", "1/limit");
        let err = schema.is_valid(&json!({"limit": 5, "value": 3})).unwrap_err();
        assert!(matches!(err, ResolutionError::UnsupportedReference { .. }));

        let optional = data_schema(&data_registry(), "optionalData", "1/limit");
        assert!(optional.is_valid(&json!({"limit": 5, "value": 3})).is_err());
    }

    #[test]
    fn test_optional_data_skips_missing_references() {
        let schema = data_schema(&data_registry(), "optionalData", "/limit");
        assert!(valid(&schema, json!({"value": 100})));
        assert!(!valid(&schema, json!({"limit": 5, "value": 100})));
    }

    #[test]
    fn test_data_keywords_need_the_plugin() {
        let schema = build(json!({"data": {"maximum": "/limit"}}));
        assert!(valid(&schema, json!({"limit": 0})));
    }

    #[test]
    fn test_self_feeding_data_hits_depth_limit() {
        let options = BuildOptions::new().with_registry(data_registry());
        let schema = build_with(options, json!({"$schema": META_DATA, "data": {"data": "/d"}}));
        let instance = json!({"d": {"data": "/d"}});
        let err = schema
            .evaluate_tree(&instance, &EvaluationOptions::new().with_max_depth(8))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::DepthExceeded { max_depth: 8, .. }));
    }

    #[test]
    fn test_invalid_data_value_is_rejected() {
        let options = BuildOptions::new().with_registry(data_registry());
        let err = SchemaGraph::build(&json!({"$schema": META_DATA, "data": {"maximum": 5}}), &options).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKeywordValue { .. }));
    }
}
