//! Array applicators: `prefixItems`, `items` (both forms),
//! `additionalItems` and `contains`
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use super::{build_schema_list, build_single, evaluate_items_from, expect_schema, indexed, non_negative_integer};
use crate::build::{BuildContext, SchemaId};
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::keyword::{priority, Coverage, KeywordHandler, KeywordNode, KeywordOutcome, KeywordState, Subschemas};
use crate::result::EvaluationResult;
use serde_json::Value;

/// Annotation for positional keywords: `true` when every item was
/// evaluated, otherwise the largest evaluated index
fn positional_annotation(evaluated: usize, len: usize) -> Value {
    if evaluated >= len {
        Value::Bool(true)
    } else {
        Value::from(evaluated.saturating_sub(1))
    }
}

fn all_valid(details: &[EvaluationResult]) -> bool {
    details.iter().all(|detail| detail.valid)
}

/// Apply a list of schemas to the leading items
fn evaluate_tuple(node: &KeywordNode, items: &[Value], ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
    let schemas = node.subschemas().list();
    let mut details = Vec::new();
    for ((_, segment, item), id) in indexed(items).zip(schemas) {
        details.push(ctx.evaluate_child(*id, &[segment.as_str()], item, &segment)?);
    }
    let evaluated = details.len();
    let mut coverage = Coverage::new();
    coverage.claim_items_up_to(evaluated);
    let outcome = KeywordOutcome::from_details(all_valid(&details), details).with_coverage(coverage);
    if evaluated == 0 {
        return Ok(outcome);
    }
    Ok(outcome.with_annotation(positional_annotation(evaluated, items.len())))
}

/// Apply one schema to every item from `start` on
fn evaluate_rest(id: SchemaId, items: &[Value], start: usize, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
    let details = evaluate_items_from(id, items, start, ctx)?;
    let applied = !details.is_empty();
    let outcome = KeywordOutcome::from_details(all_valid(&details), details);
    if !applied {
        return Ok(outcome);
    }
    let mut coverage = Coverage::new();
    coverage.claim_all_items();
    Ok(outcome.with_annotation(Value::Bool(true)).with_coverage(coverage))
}

/// 2020-12 `prefixItems`
#[derive(Debug)]
pub struct PrefixItemsKeyword;

impl KeywordHandler for PrefixItemsKeyword {
    fn name(&self) -> &str {
        "prefixItems"
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
        match ctx.instance().as_array() {
            Some(items) => evaluate_tuple(node, items, ctx),
            None => Ok(KeywordOutcome::pass()),
        }
    }
}

/// 2020-12 `items`: every item after the sibling `prefixItems`
#[derive(Debug)]
pub struct ItemsKeyword;

impl KeywordHandler for ItemsKeyword {
    fn name(&self) -> &str {
        "items"
    }

    fn priority(&self) -> i32 {
        priority::DEPENDENT
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        expect_schema(value, ctx)?;
        let prefix = ctx.sibling("prefixItems").and_then(Value::as_array).map_or(0, Vec::len);
        Ok(KeywordState::new(prefix))
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
        let (Some(items), Some(id)) = (ctx.instance().as_array(), node.subschemas().single()) else {
            return Ok(KeywordOutcome::pass());
        };
        let prefix = node.state().get::<usize>().copied().unwrap_or(0);
        evaluate_rest(id, items, prefix, ctx)
    }
}

/// draft-07/2019-09 `items`: one schema for all items, or a tuple
#[derive(Debug)]
pub struct LegacyItemsKeyword;

impl KeywordHandler for LegacyItemsKeyword {
    fn name(&self) -> &str {
        "items"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        match value {
            Value::Array(_) | Value::Object(_) | Value::Bool(_) => Ok(KeywordState::none()),
            _ => Err(ctx.invalid("expected a schema or an array of schemas")),
        }
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        match value {
            Value::Array(_) => build_schema_list(value, ctx, true),
            _ => build_single(value, ctx),
        }
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let Some(items) = ctx.instance().as_array() else {
            return Ok(KeywordOutcome::pass());
        };
        match node.subschemas().single() {
            Some(id) => evaluate_rest(id, items, 0, ctx),
            None => evaluate_tuple(node, items, ctx),
        }
    }
}

/// draft-07/2019-09 `additionalItems`: items past an array-form `items`
#[derive(Debug)]
pub struct AdditionalItemsKeyword;

impl KeywordHandler for AdditionalItemsKeyword {
    fn name(&self) -> &str {
        "additionalItems"
    }

    fn priority(&self) -> i32 {
        priority::DEPENDENT
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        expect_schema(value, ctx)?;
        // Without a tuple-form sibling there is nothing "additional"
        Ok(match ctx.sibling("items").and_then(Value::as_array) {
            Some(tuple) => KeywordState::new(tuple.len()),
            None => KeywordState::none(),
        })
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
        let (Some(items), Some(id), Some(start)) = (
            ctx.instance().as_array(),
            node.subschemas().single(),
            node.state().get::<usize>().copied(),
        ) else {
            return Ok(KeywordOutcome::pass());
        };
        evaluate_rest(id, items, start, ctx)
    }
}

/// `contains`
///
/// Drafts differ in two ways: whether a sibling `minContains` replaces the
/// "at least one" rule, and whether matched items count as evaluated for
/// `unevaluatedItems`.
#[derive(Debug)]
pub struct ContainsKeyword {
    honors_min_contains: bool,
    claims_items: bool,
}

impl ContainsKeyword {
    pub fn new(honors_min_contains: bool, claims_items: bool) -> Self {
        Self {
            honors_min_contains,
            claims_items,
        }
    }
}

impl KeywordHandler for ContainsKeyword {
    fn name(&self) -> &str {
        "contains"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        expect_schema(value, ctx)?;
        let minimum = match ctx.sibling("minContains") {
            Some(min) if self.honors_min_contains => non_negative_integer(min, ctx)?,
            _ => 1,
        };
        Ok(KeywordState::new(minimum))
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
        let (Some(items), Some(id)) = (ctx.instance().as_array(), node.subschemas().single()) else {
            return Ok(KeywordOutcome::pass());
        };
        let minimum = node.state().get::<u64>().copied().unwrap_or(1);
        let details = evaluate_items_from(id, items, 0, ctx)?;
        let matched: Vec<usize> = details
            .iter()
            .enumerate()
            .filter(|(_, detail)| detail.valid)
            .map(|(index, _)| index)
            .collect();

        let mut coverage = Coverage::new();
        if self.claims_items {
            for index in &matched {
                coverage.claim_item(*index);
            }
        }
        let annotation = if matched.len() == items.len() {
            Value::Bool(true)
        } else {
            Value::from(matched.clone())
        };
        let count = matched.len() as u64;
        let valid = count >= minimum;
        let outcome = KeywordOutcome::from_details(valid, details)
            .with_annotation(annotation)
            .with_coverage(coverage);
        if valid {
            return Ok(outcome);
        }
        let error = if minimum == 1 {
            ctx.message("contains", &[])
        } else {
            ctx.message(
                "minContains",
                &[("limit", minimum.to_string()), ("received", count.to_string())],
            )
        };
        Ok(outcome.with_error(error))
    }
}

/// Number of items the sibling `contains` matched, from its annotation
pub(crate) fn contains_matches(ctx: &EvalContext<'_>) -> Option<usize> {
    let contains = ctx.sibling("contains")?;
    match contains.annotation.as_ref()? {
        Value::Bool(true) => ctx.instance().as_array().map(Vec::len),
        Value::Array(indices) => Some(indices.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_annotation() {
        assert_eq!(positional_annotation(3, 3), Value::Bool(true));
        assert_eq!(positional_annotation(2, 5), Value::from(1));
    }
}
