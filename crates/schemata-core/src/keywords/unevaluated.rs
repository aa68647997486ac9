//! `unevaluatedProperties` and `unevaluatedItems`
//!
//! Both run after every other keyword of their schema object and apply
//! their subschema to whatever the passing siblings (and the in-place
//! subschemas they applied) did not claim.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use super::{build_single, expect_schema, indexed};
use crate::build::BuildContext;
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::keyword::{priority, Coverage, KeywordHandler, KeywordNode, KeywordOutcome, KeywordState, Subschemas};
use serde_json::Value;

/// `unevaluatedProperties`
#[derive(Debug)]
pub struct UnevaluatedPropertiesKeyword;

impl KeywordHandler for UnevaluatedPropertiesKeyword {
    fn name(&self) -> &str {
        "unevaluatedProperties"
    }

    fn priority(&self) -> i32 {
        priority::UNEVALUATED
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
        let claimed = ctx.sibling_coverage();
        let mut details = Vec::new();
        let mut coverage = Coverage::new();
        let mut evaluated = Vec::new();
        for (name, value) in object {
            if claimed.covers_property(name) {
                continue;
            }
            details.push(ctx.evaluate_child(id, &[], value, name)?);
            coverage.claim_property(name.as_str());
            evaluated.push(Value::String(name.clone()));
        }
        let valid = details.iter().all(|detail| detail.valid);
        Ok(KeywordOutcome::from_details(valid, details)
            .with_annotation(Value::Array(evaluated))
            .with_coverage(coverage))
    }
}

/// `unevaluatedItems`
#[derive(Debug)]
pub struct UnevaluatedItemsKeyword;

impl KeywordHandler for UnevaluatedItemsKeyword {
    fn name(&self) -> &str {
        "unevaluatedItems"
    }

    fn priority(&self) -> i32 {
        priority::UNEVALUATED
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
        let (Some(items), Some(id)) = (ctx.instance().as_array(), node.subschemas().single()) else {
            return Ok(KeywordOutcome::pass());
        };
        let claimed = ctx.sibling_coverage();
        let mut details = Vec::new();
        let mut coverage = Coverage::new();
        for (index, segment, item) in indexed(items) {
            if claimed.covers_item(index) {
                continue;
            }
            details.push(ctx.evaluate_child(id, &[], item, &segment)?);
            coverage.claim_item(index);
        }
        let valid = details.iter().all(|detail| detail.valid);
        let applied = !details.is_empty();
        let outcome = KeywordOutcome::from_details(valid, details).with_coverage(coverage);
        if !applied {
            return Ok(outcome);
        }
        Ok(outcome.with_annotation(Value::Bool(true)))
    }
}
