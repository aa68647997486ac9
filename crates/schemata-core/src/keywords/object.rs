//! Object applicators: `properties`, `patternProperties`,
//! `additionalProperties` and `propertyNames`
//!
//! Each annotates with the property names it evaluated and claims them in
//! its coverage.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use super::{build_schema_map, build_single, expect_schema};
use crate::build::BuildContext;
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::keyword::{priority, Coverage, KeywordHandler, KeywordNode, KeywordOutcome, KeywordState, Subschemas};
use crate::result::EvaluationResult;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

/// Compile a `patternProperties` key or `pattern` value
pub(crate) fn compile_pattern(keyword: &str, pattern: &str) -> Result<Regex, SchemaError> {
    Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
        keyword: keyword.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

/// Outcome of applying schemas to named properties
fn property_outcome(details: Vec<EvaluationResult>, evaluated: Vec<String>) -> KeywordOutcome {
    let valid = details.iter().all(|detail| detail.valid);
    let mut coverage = Coverage::new();
    for name in &evaluated {
        coverage.claim_property(name.as_str());
    }
    let annotation = Value::Array(evaluated.into_iter().map(Value::String).collect());
    KeywordOutcome::from_details(valid, details)
        .with_annotation(annotation)
        .with_coverage(coverage)
}

/// `properties`
#[derive(Debug)]
pub struct PropertiesKeyword;

impl KeywordHandler for PropertiesKeyword {
    fn name(&self) -> &str {
        "properties"
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        build_schema_map(value, ctx)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let Some(object) = ctx.instance().as_object() else {
            return Ok(KeywordOutcome::pass());
        };
        let mut details = Vec::new();
        let mut evaluated = Vec::new();
        for (name, id) in node.subschemas().map() {
            if let Some(value) = object.get(name) {
                details.push(ctx.evaluate_child(*id, &[name.as_str()], value, name)?);
                evaluated.push(name.clone());
            }
        }
        Ok(property_outcome(details, evaluated))
    }
}

/// `patternProperties`
#[derive(Debug)]
pub struct PatternPropertiesKeyword;

impl KeywordHandler for PatternPropertiesKeyword {
    fn name(&self) -> &str {
        "patternProperties"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let map = value.as_object().ok_or_else(|| ctx.invalid("expected an object of schemas"))?;
        let patterns = map
            .keys()
            .map(|pattern| compile_pattern(self.name(), pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(KeywordState::new(patterns))
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        build_schema_map(value, ctx)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let Some(object) = ctx.instance().as_object() else {
            return Ok(KeywordOutcome::pass());
        };
        let Some(patterns) = node.state().get::<Vec<Regex>>() else {
            return Ok(KeywordOutcome::pass());
        };
        let mut details = Vec::new();
        let mut evaluated = Vec::new();
        for (name, value) in object {
            let mut matched = false;
            for (regex, (pattern, id)) in patterns.iter().zip(node.subschemas().map()) {
                if regex.is_match(name) {
                    details.push(ctx.evaluate_child(*id, &[pattern.as_str()], value, name)?);
                    matched = true;
                }
            }
            if matched {
                evaluated.push(name.clone());
            }
        }
        Ok(property_outcome(details, evaluated))
    }
}

/// Names and patterns of the sibling `properties`/`patternProperties`
#[derive(Debug)]
struct Declared {
    names: HashSet<String>,
    patterns: Vec<Regex>,
}

impl Declared {
    fn covers(&self, name: &str) -> bool {
        self.names.contains(name) || self.patterns.iter().any(|regex| regex.is_match(name))
    }
}

/// `additionalProperties`: properties no sibling `properties` or
/// `patternProperties` declares, decided at build time
#[derive(Debug)]
pub struct AdditionalPropertiesKeyword;

impl KeywordHandler for AdditionalPropertiesKeyword {
    fn name(&self) -> &str {
        "additionalProperties"
    }

    fn priority(&self) -> i32 {
        priority::DEPENDENT
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        expect_schema(value, ctx)?;
        let names = ctx
            .sibling("properties")
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        let patterns = match ctx.sibling("patternProperties").and_then(Value::as_object) {
            Some(map) => map
                .keys()
                .map(|pattern| compile_pattern("patternProperties", pattern))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        Ok(KeywordState::new(Declared { names, patterns }))
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        build_single(value, ctx)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Some(object), Some(id)) = (ctx.instance().as_object(), node.subschemas().single()) else {
            return Ok(KeywordOutcome::pass());
        };
        let declared = node.state().get::<Declared>();
        let mut details = Vec::new();
        let mut evaluated = Vec::new();
        for (name, value) in object {
            if declared.is_some_and(|declared| declared.covers(name)) {
                continue;
            }
            details.push(ctx.evaluate_child(id, &[], value, name)?);
            evaluated.push(name.clone());
        }
        Ok(property_outcome(details, evaluated))
    }
}

/// `propertyNames`
#[derive(Debug)]
pub struct PropertyNamesKeyword;

impl KeywordHandler for PropertyNamesKeyword {
    fn name(&self) -> &str {
        "propertyNames"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        expect_schema(value, ctx)?;
        Ok(KeywordState::none())
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        build_single(value, ctx)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Some(object), Some(id)) = (ctx.instance().as_object(), node.subschemas().single()) else {
            return Ok(KeywordOutcome::pass());
        };
        let mut details = Vec::with_capacity(object.len());
        for name in object.keys() {
            let key = Value::String(name.clone());
            details.push(ctx.evaluate_child(id, &[], &key, name)?);
        }
        let valid = details.iter().all(|detail| detail.valid);
        Ok(KeywordOutcome::from_details(valid, details))
    }
}
