//! Unit tests for identifiers and references
//!
//! Covers `$ref` against `$defs`, anchors and other resources, dynamic and
//! recursive references, cyclic graphs, the recursion and depth guards,
//! lazy resolution through the fetch hook and sharing graphs and registries
//! across threads.

use schemata_core::{BuildOptions, EvaluationOptions, Fetch, ResolutionError, SchemaError, SchemaGraph, SchemaRegistry};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::new())
}

fn build_in(registry: &Arc<SchemaRegistry>, schema: Value) -> SchemaGraph {
    let options = BuildOptions::new().with_registry(registry.clone());
    SchemaGraph::build(&schema, &options).unwrap()
}

fn valid(schema: &SchemaGraph, instance: Value) -> bool {
    schema.is_valid(&instance).unwrap()
}

#[cfg(test)]
mod static_references {
    use super::*;

    #[test]
    fn test_ref_into_defs() {
        let schema = build_in(&registry(), json!({
            "$defs": {"foo": {"type": "integer"}},
            "$ref": "#/$defs/foo"
        }));
        assert!(valid(&schema, json!(5)));
        assert!(!valid(&schema, json!("s")));
    }

    #[test]
    fn test_ref_to_anchor() {
        let schema = build_in(&registry(), json!({
            "$defs": {"positive": {"$anchor": "positive", "exclusiveMinimum": 0}},
            "items": {"$ref": "#positive"}
        }));
        assert!(valid(&schema, json!([1, 2])));
        assert!(!valid(&schema, json!([1, 0])));
    }

    #[test]
    fn test_ref_to_embedded_resource() {
        let schema = build_in(&registry(), json!({
            "$id": "https://example.com/root.json",
            "$defs": {
                "name": {
                    "$id": "name.json",
                    "type": "string",
                    "minLength": 1
                }
            },
            "properties": {"name": {"$ref": "name.json"}}
        }));
        assert!(valid(&schema, json!({"name": "n"})));
        assert!(!valid(&schema, json!({"name": ""})));
    }

    #[test]
    fn test_ref_between_built_documents() {
        let registry = registry();
        build_in(&registry, json!({
            "$id": "https://example.com/address.json",
            "type": "object",
            "required": ["city"]
        }));
        let person = build_in(&registry, json!({
            "$id": "https://example.com/person.json",
            "properties": {"address": {"$ref": "address.json"}}
        }));
        assert!(valid(&person, json!({"address": {"city": "Oslo"}})));
        assert!(!valid(&person, json!({"address": {}})));
    }

    #[test]
    fn test_ref_to_registered_raw_document() {
        let registry = registry();
        registry
            .register("https://example.com/limits.json", json!({"$defs": {"small": {"maximum": 3}}}))
            .unwrap();
        let schema = build_in(&registry, json!({"$ref": "https://example.com/limits.json#/$defs/small"}));
        assert!(valid(&schema, json!(3)));
        assert!(!valid(&schema, json!(4)));
    }

    #[test]
    fn test_percent_encoded_pointer() {
        let schema = build_in(&registry(), json!({
            "$defs": {"a b": {"type": "boolean"}, "c/d": {"type": "null"}},
            "properties": {
                "x": {"$ref": "#/$defs/a%20b"},
                "y": {"$ref": "#/$defs/c~1d"}
            }
        }));
        assert!(valid(&schema, json!({"x": true, "y": null})));
        assert!(!valid(&schema, json!({"x": 1})));
        assert!(!valid(&schema, json!({"y": 1})));
    }

    #[test]
    fn test_unresolvable_reference_is_an_evaluation_error() {
        let schema = build_in(&registry(), json!({"$ref": "https://example.com/missing.json"}));
        let err = schema.is_valid(&json!(1)).unwrap_err();
        assert!(matches!(err, ResolutionError::NoFetcher { .. }));
    }

    #[test]
    fn test_fragment_in_id_is_rejected() {
        let options = BuildOptions::new().with_registry(registry());
        let err = SchemaGraph::build(&json!({"$id": "https://example.com/a#frag"}), &options).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKeywordValue { .. }));
    }

    #[test]
    fn test_duplicate_anchor_is_rejected() {
        let options = BuildOptions::new().with_registry(registry());
        let err = SchemaGraph::build(
            &json!({"$defs": {"a": {"$anchor": "x"}, "b": {"$anchor": "x"}}}),
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateAnchor { .. }));
    }

    #[test]
    fn test_failed_build_leaves_registry_untouched() {
        let registry = registry();
        let before = registry.node_count();
        let options = BuildOptions::new().with_registry(registry.clone());
        let result = SchemaGraph::build(
            &json!({"$id": "https://example.com/broken.json", "properties": {"a": {"minimum": "x"}}}),
            &options,
        );
        assert!(result.is_err());
        assert_eq!(registry.node_count(), before);
        assert!(!registry.contains("https://example.com/broken.json"));
    }
}

#[cfg(test)]
mod cycles {
    use super::*;

    #[test]
    fn test_recursive_tree_schema() {
        let schema = build_in(&registry(), json!({
            "$id": "https://example.com/tree.json",
            "type": "object",
            "properties": {
                "value": {"type": "integer"},
                "children": {"type": "array", "items": {"$ref": "#"}}
            }
        }));
        assert!(valid(&schema, json!({"value": 1, "children": [{"value": 2, "children": []}]})));
        assert!(!valid(&schema, json!({"value": 1, "children": [{"value": "2"}]})));
    }

    #[test]
    fn test_self_reference_without_progress_is_detected() {
        let schema = build_in(&registry(), json!({"$ref": "#"}));
        let err = schema.is_valid(&json!(1)).unwrap_err();
        assert!(matches!(err, ResolutionError::InfiniteRecursion { .. }));
    }

    #[test]
    fn test_mutual_reference_without_progress_is_detected() {
        let schema = build_in(&registry(), json!({
            "$defs": {
                "a": {"$ref": "#/$defs/b"},
                "b": {"$ref": "#/$defs/a"}
            },
            "$ref": "#/$defs/a"
        }));
        let err = schema.is_valid(&json!({})).unwrap_err();
        assert!(matches!(err, ResolutionError::InfiniteRecursion { .. }));
    }

    #[test]
    fn test_depth_limit() {
        let schema = build_in(&registry(), json!({"items": {"$ref": "#"}}));
        let mut instance = json!(1);
        for _ in 0..20 {
            instance = json!([instance]);
        }
        assert!(valid(&schema, instance.clone()));

        let options = EvaluationOptions::new().with_max_depth(10);
        let err = schema.evaluate_tree(&instance, &options).unwrap_err();
        assert!(matches!(err, ResolutionError::DepthExceeded { .. }));
    }

    fn linked_list(levels: usize) -> Value {
        let mut instance = json!({});
        for _ in 0..levels {
            instance = json!({"next": instance});
        }
        instance
    }

    #[test]
    fn test_depth_counts_instance_nesting_not_ref_hops() {
        // Each level passes through `properties` and `$ref`; only the property counts
        let deep = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let schema = build_in(&registry(), json!({
                    "type": "object",
                    "properties": {"next": {"$ref": "#"}}
                }));
                schema.is_valid(&linked_list(200))
            })
            .unwrap()
            .join()
            .unwrap();
        assert!(deep.unwrap());
    }

    #[test]
    fn test_depth_limit_is_exact_for_instance_nesting() {
        let schema = build_in(&registry(), json!({
            "type": "object",
            "properties": {"next": {"$ref": "#"}}
        }));
        let options = EvaluationOptions::new().with_max_depth(5);
        assert!(schema.evaluate_tree(&linked_list(5), &options).unwrap().valid);

        let err = schema.evaluate_tree(&linked_list(6), &options).unwrap_err();
        assert!(matches!(err, ResolutionError::DepthExceeded { max_depth: 5, .. }));
    }
}

#[cfg(test)]
mod concurrency {
    use super::*;
    use schemata_core::OutputFormat;
    use std::sync::Barrier;

    #[test]
    fn test_shared_graph_evaluates_identically_across_threads() {
        let schema = build_in(&registry(), json!({
            "$id": "https://example.com/tree",
            "type": "object",
            "properties": {
                "value": {"type": "integer"},
                "children": {"type": "array", "items": {"$ref": "#"}}
            },
            "unevaluatedProperties": false
        }));
        let instance = json!({
            "value": 1,
            "children": [{"value": 2, "children": []}, {"value": "3", "extra": true}]
        });
        let options = EvaluationOptions::new().with_output_format(OutputFormat::Detailed);
        let expected = schema.evaluate(&instance, &options).unwrap();

        let outputs: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| schema.evaluate(&instance, &options).unwrap()))
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });
        assert!(!expected.valid);
        for output in outputs {
            assert_eq!(output, expected);
        }
    }

    #[test]
    fn test_concurrent_registration_keeps_first_writer() {
        let uri = "https://example.com/contested.json";
        for _ in 0..20 {
            let registry = registry();
            let barrier = Barrier::new(2);
            let inserted: Vec<bool> = std::thread::scope(|scope| {
                let documents = [json!({"type": "integer"}), json!({"type": "string"})];
                let handles: Vec<_> = documents
                    .into_iter()
                    .map(|document| {
                        let registry = &registry;
                        let barrier = &barrier;
                        scope.spawn(move || {
                            barrier.wait();
                            registry.register(uri, document).unwrap()
                        })
                    })
                    .collect();
                handles.into_iter().map(|handle| handle.join().unwrap()).collect()
            });
            assert_eq!(inserted.iter().filter(|won| **won).count(), 1);

            let integer_won = inserted[0];
            let graph = registry.resolve(uri).unwrap();
            assert_eq!(valid(&graph, json!(1)), integer_won);
            assert_eq!(valid(&graph, json!("s")), !integer_won);
            // Re-registering either document never replaces the winner
            assert!(!registry.register(uri, json!({"type": "integer"})).unwrap());
            assert!(!registry.register(uri, json!({"type": "string"})).unwrap());
        }
    }
}

#[cfg(test)]
mod dynamic_references {
    use super::*;

    fn base_schema() -> Value {
        json!({
            "$id": "https://example.com/base",
            "$dynamicRef": "#extend",
            "$defs": {
                "extend": {"$dynamicAnchor": "extend", "type": "string"}
            }
        })
    }

    #[test]
    fn test_outermost_dynamic_anchor_wins() {
        let registry = registry();
        let base = build_in(&registry, base_schema());
        let derived = build_in(&registry, json!({
            "$id": "https://example.com/derived",
            "$ref": "base",
            "$defs": {
                "x": {"$dynamicAnchor": "extend", "type": "integer"}
            }
        }));

        assert!(valid(&base, json!("s")));
        assert!(!valid(&base, json!(5)));
        assert!(valid(&derived, json!(5)));
        assert!(!valid(&derived, json!("s")));
    }

    #[test]
    fn test_plain_anchor_target_is_static() {
        let registry = registry();
        build_in(&registry, json!({
            "$id": "https://example.com/static-base",
            "$dynamicRef": "#extend",
            "$defs": {"extend": {"$anchor": "extend", "type": "string"}}
        }));
        let derived = build_in(&registry, json!({
            "$id": "https://example.com/static-derived",
            "$ref": "static-base",
            "$defs": {"x": {"$dynamicAnchor": "extend", "type": "integer"}}
        }));
        assert!(valid(&derived, json!("s")));
        assert!(!valid(&derived, json!(5)));
    }

    #[test]
    fn test_generic_list_extension() {
        let registry = registry();
        build_in(&registry, json!({
            "$id": "https://example.com/list",
            "type": "array",
            "items": {"$dynamicRef": "#item"},
            "$defs": {"item": {"$dynamicAnchor": "item"}}
        }));
        let strings = build_in(&registry, json!({
            "$id": "https://example.com/string-list",
            "$ref": "list",
            "$defs": {"item": {"$dynamicAnchor": "item", "type": "string"}}
        }));
        assert!(valid(&strings, json!(["a", "b"])));
        assert!(!valid(&strings, json!(["a", 1])));
    }

    #[test]
    fn test_recursive_ref_2019() {
        let registry = registry();
        build_in(&registry, json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/tree-2019",
            "$recursiveAnchor": true,
            "type": "object",
            "properties": {"children": {"type": "array", "items": {"$recursiveRef": "#"}}}
        }));
        let strict = build_in(&registry, json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/strict-tree-2019",
            "$recursiveAnchor": true,
            "$ref": "tree-2019",
            "unevaluatedProperties": false,
            "properties": {"name": {"type": "string"}}
        }));
        assert!(valid(&strict, json!({"name": "a", "children": [{"name": "b"}]})));
        assert!(!valid(&strict, json!({"name": "a", "children": [{"nickname": "b"}]})));
    }
}

#[cfg(test)]
mod fetching {
    use super::*;
    use schemata_core::error::BoxError;

    /// A fetch hook serving one document and counting its calls
    fn counting_fetch(calls: Arc<AtomicUsize>) -> impl Fetch + 'static {
        move |uri: &Url| -> Result<Option<Value>, BoxError> {
            calls.fetch_add(1, Ordering::SeqCst);
            match uri.as_str() {
                "https://remote.example/positive.json" => Ok(Some(json!({"exclusiveMinimum": 0}))),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_fetch_hook_is_used_once() {
        let registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.set_fetcher(counting_fetch(calls.clone()));
        let schema = build_in(&registry, json!({"items": {"$ref": "https://remote.example/positive.json"}}));

        assert!(valid(&schema, json!([1, 2, 3])));
        assert!(!valid(&schema, json!([1, -2])));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fetch_hook_without_document() {
        let registry = registry();
        registry.set_fetcher(counting_fetch(Arc::new(AtomicUsize::new(0))));
        let schema = build_in(&registry, json!({"$ref": "https://remote.example/absent.json"}));
        assert!(schema.is_valid(&json!(1)).is_err());
    }

    #[test]
    fn test_embedded_meta_schemas_resolve_offline() {
        let schema = build_in(&registry(), json!({"$ref": "https://json-schema.org/draft/2020-12/schema"}));
        assert!(valid(&schema, json!({"type": "string"})));
        assert!(!valid(&schema, json!({"type": 12})));
    }
}
