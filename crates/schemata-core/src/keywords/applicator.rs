//! In-place applicators: combinators, conditionals and dependencies
//!
//! Every subschema is evaluated, with no short-circuit, so annotations and
//! coverage from all passing branches reach `unevaluated*`.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use super::{build_schema_list, build_schema_map, build_single, evaluate_each_in_place, expect_schema, quoted_list, string_array};
use crate::build::BuildContext;
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::keyword::{priority, KeywordHandler, KeywordNode, KeywordOutcome, KeywordState, Subschemas};
use serde_json::Value;

/// `allOf`
#[derive(Debug)]
pub struct AllOfKeyword;

impl KeywordHandler for AllOfKeyword {
    fn name(&self) -> &str {
        "allOf"
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        build_schema_list(value, ctx, false)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let details = evaluate_each_in_place(node, ctx)?;
        let valid = details.iter().all(|detail| detail.valid);
        Ok(KeywordOutcome::from_details(valid, details).absorb_valid_details())
    }
}

/// `anyOf`
#[derive(Debug)]
pub struct AnyOfKeyword;

impl KeywordHandler for AnyOfKeyword {
    fn name(&self) -> &str {
        "anyOf"
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        build_schema_list(value, ctx, false)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let details = evaluate_each_in_place(node, ctx)?;
        let valid = details.iter().any(|detail| detail.valid);
        Ok(KeywordOutcome::from_details(valid, details).absorb_valid_details())
    }
}

/// `oneOf`
#[derive(Debug)]
pub struct OneOfKeyword;

impl KeywordHandler for OneOfKeyword {
    fn name(&self) -> &str {
        "oneOf"
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        build_schema_list(value, ctx, false)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let details = evaluate_each_in_place(node, ctx)?;
        let matched = details.iter().filter(|detail| detail.valid).count();
        let outcome = KeywordOutcome::from_details(matched == 1, details).absorb_valid_details();
        if matched == 1 {
            return Ok(outcome);
        }
        Ok(outcome.with_error(ctx.message("oneOf", &[("received", matched.to_string())])))
    }
}

/// `not`
#[derive(Debug)]
pub struct NotKeyword;

impl KeywordHandler for NotKeyword {
    fn name(&self) -> &str {
        "not"
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
        let Some(id) = node.subschemas().single() else {
            return Ok(KeywordOutcome::pass());
        };
        let result = ctx.evaluate_in_place(id, &[])?;
        let valid = !result.valid;
        let outcome = KeywordOutcome::from_details(valid, vec![result]);
        if valid {
            return Ok(outcome);
        }
        Ok(outcome.with_error(ctx.message("not", &[])))
    }
}

/// `if`: never fails; its result selects `then` or `else`
#[derive(Debug)]
pub struct IfKeyword;

impl KeywordHandler for IfKeyword {
    fn name(&self) -> &str {
        "if"
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
        let Some(id) = node.subschemas().single() else {
            return Ok(KeywordOutcome::pass());
        };
        let condition = ctx.evaluate_in_place(id, &[])?;
        Ok(KeywordOutcome::from_details(true, vec![condition]).absorb_valid_details())
    }
}

/// Outcome of the sibling `if` condition, if one was evaluated
fn condition(ctx: &EvalContext<'_>) -> Option<bool> {
    ctx.sibling("if")
        .and_then(|result| result.details.first())
        .map(|condition| condition.valid)
}

fn conditional(node: &KeywordNode, ctx: &EvalContext<'_>, when: bool) -> Result<KeywordOutcome, ResolutionError> {
    let Some(id) = node.subschemas().single() else {
        return Ok(KeywordOutcome::pass());
    };
    if condition(ctx) != Some(when) {
        return Ok(KeywordOutcome::pass());
    }
    let result = ctx.evaluate_in_place(id, &[])?;
    Ok(KeywordOutcome::from_details(result.valid, vec![result]).absorb_valid_details())
}

/// `then`
#[derive(Debug)]
pub struct ThenKeyword;

impl KeywordHandler for ThenKeyword {
    fn name(&self) -> &str {
        "then"
    }

    fn priority(&self) -> i32 {
        priority::DEPENDENT
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
        conditional(node, ctx, true)
    }
}

/// `else`
#[derive(Debug)]
pub struct ElseKeyword;

impl KeywordHandler for ElseKeyword {
    fn name(&self) -> &str {
        "else"
    }

    fn priority(&self) -> i32 {
        priority::DEPENDENT
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
        conditional(node, ctx, false)
    }
}

/// `dependentSchemas`
#[derive(Debug)]
pub struct DependentSchemasKeyword;

impl KeywordHandler for DependentSchemasKeyword {
    fn name(&self) -> &str {
        "dependentSchemas"
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
        for (property, id) in node.subschemas().map() {
            if object.contains_key(property) {
                details.push(ctx.evaluate_in_place(*id, &[property.as_str()])?);
            }
        }
        let valid = details.iter().all(|detail| detail.valid);
        Ok(KeywordOutcome::from_details(valid, details).absorb_valid_details())
    }
}

/// One entry of draft-07 `dependencies`
#[derive(Debug)]
enum Dependency {
    Properties(Vec<String>),
    Schema,
}

/// draft-07 `dependencies`: property lists or schemas
#[derive(Debug)]
pub struct DependenciesKeyword;

impl KeywordHandler for DependenciesKeyword {
    fn name(&self) -> &str {
        "dependencies"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let map = value.as_object().ok_or_else(|| ctx.invalid("expected an object"))?;
        let mut dependencies = Vec::with_capacity(map.len());
        for (property, dependency) in map {
            let dependency = match dependency {
                Value::Array(_) => Dependency::Properties(string_array(dependency, ctx)?),
                Value::Object(_) | Value::Bool(_) => Dependency::Schema,
                _ => return Err(ctx.invalid(format!("dependency '{}' must be an array or a schema", property))),
            };
            dependencies.push((property.clone(), dependency));
        }
        Ok(KeywordState::new(dependencies))
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        let mut entries = Vec::new();
        if let Some(map) = value.as_object() {
            for (property, dependency) in map {
                if !dependency.is_array() {
                    entries.push((property.clone(), ctx.subschema(dependency, &[property.as_str()])?));
                }
            }
        }
        Ok(Subschemas::Map(entries))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let Some(object) = ctx.instance().as_object() else {
            return Ok(KeywordOutcome::pass());
        };
        let Some(dependencies) = node.state().get::<Vec<(String, Dependency)>>() else {
            return Ok(KeywordOutcome::pass());
        };
        let mut details = Vec::new();
        let mut errors = Vec::new();
        for (property, dependency) in dependencies {
            if !object.contains_key(property) {
                continue;
            }
            match dependency {
                Dependency::Properties(required) => {
                    let missing: Vec<&str> = required
                        .iter()
                        .filter(|name| !object.contains_key(name.as_str()))
                        .map(String::as_str)
                        .collect();
                    if !missing.is_empty() {
                        errors.push(ctx.message(
                            "dependentRequired",
                            &[("property", format!("\"{}\"", property)), ("missing", quoted_list(missing))],
                        ));
                    }
                }
                Dependency::Schema => {
                    if let Some(id) = node.subschemas().get(property) {
                        details.push(ctx.evaluate_in_place(id, &[property.as_str()])?);
                    }
                }
            }
        }
        let valid = errors.is_empty() && details.iter().all(|detail| detail.valid);
        let outcome = KeywordOutcome::from_details(valid, details).absorb_valid_details();
        if errors.is_empty() {
            return Ok(outcome);
        }
        Ok(outcome.with_error(errors.join("; ")))
    }
}
