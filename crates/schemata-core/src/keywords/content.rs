//! Content vocabulary
//!
//! `contentMediaType` and `contentEncoding` are plain annotations.
//! `contentSchema` is built as a subschema so references into it resolve,
//! but it is only annotated, never applied to the decoded content.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use super::{build_single, expect_schema};
use crate::build::BuildContext;
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::keyword::{KeywordHandler, KeywordNode, KeywordOutcome, KeywordState, Subschemas};
use serde_json::Value;

/// `contentSchema`
#[derive(Debug)]
pub struct ContentSchemaKeyword;

impl KeywordHandler for ContentSchemaKeyword {
    fn name(&self) -> &str {
        "contentSchema"
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
        if !ctx.instance().is_string() {
            return Ok(KeywordOutcome::pass());
        }
        Ok(KeywordOutcome::pass().with_annotation(node.raw().clone()))
    }
}
