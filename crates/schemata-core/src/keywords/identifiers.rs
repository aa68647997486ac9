//! Core identifier keywords: `$schema`, `$vocabulary`, `$id`, anchors,
//! `$comment` and definitions
//!
//! Identifiers do their work at build time; evaluation passes without
//! annotations.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use super::build_schema_map;
use crate::build::BuildContext;
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::keyword::{priority, KeywordHandler, KeywordNode, KeywordOutcome, KeywordState, Subschemas};
use crate::uri;
use serde_json::Value;

/// `$schema`: the dialect switch itself happens in the builder
#[derive(Debug)]
pub struct SchemaKeyword;

impl KeywordHandler for SchemaKeyword {
    fn name(&self) -> &str {
        "$schema"
    }

    fn priority(&self) -> i32 {
        priority::IDENTIFIER
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let text = value.as_str().ok_or_else(|| ctx.invalid("expected a URI string"))?;
        uri::parse_absolute(text)?;
        Ok(KeywordState::none())
    }

    fn evaluate(&self, _node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass())
    }
}

/// `$vocabulary`: URI to required flag
#[derive(Debug)]
pub struct VocabularyKeyword;

impl KeywordHandler for VocabularyKeyword {
    fn name(&self) -> &str {
        "$vocabulary"
    }

    fn priority(&self) -> i32 {
        priority::IDENTIFIER
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let map = value.as_object().ok_or_else(|| ctx.invalid("expected an object"))?;
        for (vocabulary, required) in map {
            uri::parse_absolute(vocabulary)?;
            if !required.is_boolean() {
                return Err(ctx.invalid(format!("value for '{}' must be a boolean", vocabulary)));
            }
        }
        Ok(KeywordState::none())
    }

    fn evaluate(&self, _node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass())
    }
}

/// `$id`; a legacy `#name` identifier declares a plain-name anchor
#[derive(Debug)]
pub struct IdKeyword;

impl KeywordHandler for IdKeyword {
    fn name(&self) -> &str {
        "$id"
    }

    fn priority(&self) -> i32 {
        priority::IDENTIFIER
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let text = value.as_str().ok_or_else(|| ctx.invalid("expected a URI-reference string"))?;
        if !ctx.dialect().legacy_id_anchors() {
            return Ok(KeywordState::none());
        }
        let anchor = match text.split_once('#') {
            Some((_, fragment)) if !fragment.is_empty() && !fragment.starts_with('/') => fragment,
            _ => return Ok(KeywordState::none()),
        };
        if !is_anchor_name(anchor, true) {
            return Err(ctx.invalid(format!("'{}' is not a valid anchor name", anchor)));
        }
        Ok(KeywordState::new(anchor.to_string()))
    }

    fn build_subschemas(
        &self,
        _value: &Value,
        state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        if let Some(anchor) = state.get::<String>() {
            ctx.register_anchor(anchor)?;
        }
        Ok(Subschemas::None)
    }

    fn evaluate(&self, _node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass())
    }
}

/// `$anchor`
#[derive(Debug)]
pub struct AnchorKeyword;

impl KeywordHandler for AnchorKeyword {
    fn name(&self) -> &str {
        "$anchor"
    }

    fn priority(&self) -> i32 {
        priority::IDENTIFIER
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        anchor_value(value, ctx, true)
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        if let Some(name) = value.as_str() {
            ctx.register_anchor(name)?;
        }
        Ok(Subschemas::None)
    }

    fn evaluate(&self, _node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass())
    }
}

/// `$dynamicAnchor`
#[derive(Debug)]
pub struct DynamicAnchorKeyword;

impl KeywordHandler for DynamicAnchorKeyword {
    fn name(&self) -> &str {
        "$dynamicAnchor"
    }

    fn priority(&self) -> i32 {
        priority::IDENTIFIER
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        anchor_value(value, ctx, false)
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        if let Some(name) = value.as_str() {
            ctx.register_dynamic_anchor(name)?;
        }
        Ok(Subschemas::None)
    }

    fn evaluate(&self, _node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass())
    }
}

/// `$recursiveAnchor`
#[derive(Debug)]
pub struct RecursiveAnchorKeyword;

impl KeywordHandler for RecursiveAnchorKeyword {
    fn name(&self) -> &str {
        "$recursiveAnchor"
    }

    fn priority(&self) -> i32 {
        priority::IDENTIFIER
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        value.as_bool().ok_or_else(|| ctx.invalid("expected a boolean"))?;
        Ok(KeywordState::none())
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        if value.as_bool() == Some(true) {
            ctx.register_recursive_anchor();
        }
        Ok(Subschemas::None)
    }

    fn evaluate(&self, _node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass())
    }
}

/// `$comment`
#[derive(Debug)]
pub struct CommentKeyword;

impl KeywordHandler for CommentKeyword {
    fn name(&self) -> &str {
        "$comment"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        value.as_str().ok_or_else(|| ctx.invalid("expected a string"))?;
        Ok(KeywordState::none())
    }

    fn evaluate(&self, _node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass())
    }
}

/// `$defs` and draft-07 `definitions`: schemas built for reference only
#[derive(Debug)]
pub struct DefinitionsKeyword {
    name: &'static str,
}

impl DefinitionsKeyword {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl KeywordHandler for DefinitionsKeyword {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        priority::IDENTIFIER
    }

    fn build_subschemas(
        &self,
        value: &Value,
        _state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        build_schema_map(value, ctx)
    }

    fn evaluate(&self, _node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass())
    }
}

fn anchor_value(value: &Value, ctx: &BuildContext<'_>, allow_colon: bool) -> Result<KeywordState, SchemaError> {
    let name = value.as_str().ok_or_else(|| ctx.invalid("expected an anchor name"))?;
    if !is_anchor_name(name, allow_colon) {
        return Err(ctx.invalid(format!("'{}' is not a valid anchor name", name)));
    }
    Ok(KeywordState::none())
}

/// `[A-Za-z_][-A-Za-z0-9._]*`, plus `:` where older drafts allowed it
pub(crate) fn is_anchor_name(name: &str, allow_colon: bool) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') || (allow_colon && c == ':'))
}
