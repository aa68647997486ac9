//! `$ref`, `$dynamicRef` and `$recursiveRef`
//!
//! All three resolve their URI against the base in effect at build time and
//! queue it for linking. Static references follow the linked handle; the
//! dynamic kinds recompute their target from the scope on every evaluation.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::build::{BuildContext, ReferenceTarget, SchemaId};
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::keyword::{KeywordHandler, KeywordNode, KeywordOutcome, KeywordState, Subschemas};
use crate::uri::SchemaUri;
use serde_json::Value;
use std::sync::Arc;

/// How a reference picks its target at evaluation time
#[derive(Debug, Clone, Copy)]
enum Resolution {
    Static,
    Dynamic,
    Recursive,
}

fn validate_reference(value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
    let text = value.as_str().ok_or_else(|| ctx.invalid("expected a URI-reference string"))?;
    let target = SchemaUri::resolve(ctx.base(), text)?;
    Ok(KeywordState::new(Arc::new(ReferenceTarget::new(target))))
}

fn register_reference(state: &KeywordState, ctx: &mut BuildContext<'_>) -> Result<Subschemas, SchemaError> {
    if let Some(target) = state.get::<Arc<ReferenceTarget>>() {
        ctx.register_reference(target.clone());
    }
    Ok(Subschemas::None)
}

fn follow(node: &KeywordNode, ctx: &EvalContext<'_>, resolution: Resolution) -> Result<KeywordOutcome, ResolutionError> {
    let target = node
        .state()
        .get::<Arc<ReferenceTarget>>()
        .ok_or_else(|| ResolutionError::unresolved(node.raw().to_string(), "reference was not parsed"))?;
    let id: SchemaId = match resolution {
        Resolution::Static => ctx.resolve(target)?,
        Resolution::Dynamic => ctx.resolve_dynamic(target)?,
        Resolution::Recursive => ctx.resolve_recursive(target)?,
    };
    let result = ctx.follow_reference(id)?;
    Ok(KeywordOutcome::from_details(result.valid, vec![result]).absorb_valid_details())
}

/// `$ref`
#[derive(Debug)]
pub struct RefKeyword;

impl KeywordHandler for RefKeyword {
    fn name(&self) -> &str {
        "$ref"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        validate_reference(value, ctx)
    }

    fn build_subschemas(
        &self,
        _value: &Value,
        state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        register_reference(state, ctx)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        follow(node, ctx, Resolution::Static)
    }
}

/// `$dynamicRef`
#[derive(Debug)]
pub struct DynamicRefKeyword;

impl KeywordHandler for DynamicRefKeyword {
    fn name(&self) -> &str {
        "$dynamicRef"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        validate_reference(value, ctx)
    }

    fn build_subschemas(
        &self,
        _value: &Value,
        state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        register_reference(state, ctx)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        follow(node, ctx, Resolution::Dynamic)
    }
}

/// `$recursiveRef`
#[derive(Debug)]
pub struct RecursiveRefKeyword;

impl KeywordHandler for RecursiveRefKeyword {
    fn name(&self) -> &str {
        "$recursiveRef"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        validate_reference(value, ctx)
    }

    fn build_subschemas(
        &self,
        _value: &Value,
        state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        register_reference(state, ctx)
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        follow(node, ctx, Resolution::Recursive)
    }
}
