//! Property-based tests for schema evaluation
//!
//! These tests check that evaluation is total, deterministic and consistent
//! across output formats for a wide range of instances.

use proptest::prelude::*;
use schemata_core::{BuildOptions, EvaluationOptions, OutputFormat, SchemaGraph, SchemaRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

/// Strategy for generating random JSON values with controlled complexity
fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
        "[a-zA-Z0-9 ]{0,50}".prop_map(Value::String),
    ];

    leaf.prop_recursive(
        3,  // max depth
        10, // max size
        5,  // items per collection
        |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                proptest::collection::hash_map("[a-zA-Z_][a-zA-Z0-9_]{0,20}", inner, 0..5)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        },
    )
}

/// Strategy for objects drawing keys from a small fixed set
fn record_strategy() -> impl Strategy<Value = Value> {
    proptest::collection::hash_map(
        prop_oneof![Just("id"), Just("name"), Just("tags"), Just("extra")],
        any::<i64>().prop_map(|n| json!(n)),
        0..4,
    )
    .prop_map(|m| Value::Object(m.into_iter().map(|(k, v)| (k.to_string(), v)).collect()))
}

/// A schema touching most applicators, references and assertions
fn rich_schema() -> SchemaGraph {
    let options = BuildOptions::new().with_registry(Arc::new(SchemaRegistry::new()));
    SchemaGraph::build(
        &json!({
            "$id": "https://example.com/rich.json",
            "$defs": {
                "node": {
                    "anyOf": [
                        {"type": ["null", "boolean", "number"]},
                        {"type": "string", "maxLength": 20},
                        {"type": "array", "items": {"$ref": "#/$defs/node"}},
                        {"type": "object", "additionalProperties": {"$ref": "#/$defs/node"}}
                    ]
                }
            },
            "allOf": [{"$ref": "#/$defs/node"}],
            "if": {"type": "object"},
            "then": {"maxProperties": 3},
            "else": {"not": {"const": 0}},
            "oneOf": [{"type": "array", "minItems": 2}, {"not": {"type": "array"}}],
            "unevaluatedItems": {"type": ["integer", "string", "array", "object", "null", "boolean", "number"]}
        }),
        &options,
    )
    .unwrap()
}

fn evaluate(schema: &SchemaGraph, instance: &Value, format: OutputFormat) -> Value {
    let options = EvaluationOptions::new().with_output_format(format);
    serde_json::to_value(schema.evaluate(instance, &options).unwrap()).unwrap()
}

proptest! {
    /// Property: evaluation never fails or panics on any JSON instance
    #[test]
    fn prop_evaluation_is_total(input in json_value_strategy()) {
        let schema = rich_schema();
        for format in [OutputFormat::Flag, OutputFormat::Basic, OutputFormat::Detailed, OutputFormat::Verbose] {
            let options = EvaluationOptions::new().with_output_format(format);
            prop_assert!(schema.evaluate(&input, &options).is_ok());
        }
    }

    /// Property: every output format agrees on validity
    #[test]
    fn prop_formats_agree_on_validity(input in json_value_strategy()) {
        let schema = rich_schema();
        let valid = schema.is_valid(&input).unwrap();
        for format in [OutputFormat::Flag, OutputFormat::Basic, OutputFormat::Detailed, OutputFormat::Verbose] {
            prop_assert_eq!(&evaluate(&schema, &input, format)["valid"], &json!(valid));
        }
    }

    /// Property: the flag format never carries details
    #[test]
    fn prop_flag_has_no_details(input in json_value_strategy()) {
        let output = evaluate(&rich_schema(), &input, OutputFormat::Flag);
        prop_assert_eq!(output.as_object().map(|o| o.len()), Some(1));
    }

    /// Property: evaluating twice yields identical output
    #[test]
    fn prop_evaluation_deterministic(input in json_value_strategy()) {
        let schema = rich_schema();
        let first = evaluate(&schema, &input, OutputFormat::Verbose);
        let second = evaluate(&schema, &input, OutputFormat::Verbose);
        prop_assert_eq!(first, second);
    }

    /// Property: a serialized and reparsed instance evaluates identically
    #[test]
    fn prop_reparsed_instance_identical(input in json_value_strategy()) {
        let schema = rich_schema();
        let reparsed: Value = serde_json::from_str(&serde_json::to_string(&input).unwrap()).unwrap();
        prop_assert_eq!(
            evaluate(&schema, &input, OutputFormat::Basic),
            evaluate(&schema, &reparsed, OutputFormat::Basic)
        );
    }

    /// Property: basic output lists errors exactly when the instance is invalid
    #[test]
    fn prop_basic_errors_iff_invalid(input in json_value_strategy()) {
        let output = evaluate(&rich_schema(), &input, OutputFormat::Basic);
        let has_errors = output["details"]
            .as_array()
            .map(|units| units.iter().any(|unit| unit.get("errors").is_some()))
            .unwrap_or(false);
        prop_assert_eq!(has_errors, output["valid"] == json!(false));
    }

    /// Property: `type: integer` accepts every integer and no string
    #[test]
    fn prop_integer_type(n in any::<i64>(), s in "[a-z0-9]{0,10}") {
        let schema = SchemaGraph::build(
            &json!({"type": "integer"}),
            &BuildOptions::new().with_registry(Arc::new(SchemaRegistry::new())),
        ).unwrap();
        prop_assert!(schema.is_valid(&json!(n)).unwrap());
        prop_assert!(!schema.is_valid(&json!(s)).unwrap());
    }

    /// Property: numeric bounds agree with plain comparison
    #[test]
    fn prop_numeric_bounds(value in -1000i64..1000, low in -1000i64..1000, high in -1000i64..1000) {
        let schema = SchemaGraph::build(
            &json!({"minimum": low, "exclusiveMaximum": high}),
            &BuildOptions::new().with_registry(Arc::new(SchemaRegistry::new())),
        ).unwrap();
        prop_assert_eq!(schema.is_valid(&json!(value)).unwrap(), value >= low && value < high);
    }

    /// Property: unevaluatedProperties false admits exactly the declared keys
    #[test]
    fn prop_unevaluated_properties_closed(record in record_strategy()) {
        let schema = SchemaGraph::build(
            &json!({
                "allOf": [{"properties": {"id": {}}}],
                "properties": {"name": {}},
                "unevaluatedProperties": false
            }),
            &BuildOptions::new().with_registry(Arc::new(SchemaRegistry::new())),
        ).unwrap();
        let expected = record
            .as_object()
            .map(|o| o.keys().all(|k| k == "id" || k == "name"))
            .unwrap_or(true);
        prop_assert_eq!(schema.is_valid(&record).unwrap(), expected);
    }
}
