//! Standard keyword handlers
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

pub mod applicator;
pub mod array;
pub mod content;
pub mod data;
pub mod format;
pub mod identifiers;
pub mod object;
pub mod reference;
pub mod unevaluated;
pub mod validation;

use crate::build::{BuildContext, SchemaId};
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::keyword::{KeywordHandler, KeywordNode, KeywordOutcome, Subschemas};
use crate::result::EvaluationResult;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Keywords no vocabulary defines: carried as annotations
#[derive(Debug, Default)]
pub struct UnknownKeyword;

impl UnknownKeyword {
    pub fn shared() -> Arc<dyn KeywordHandler> {
        static SHARED: OnceLock<Arc<dyn KeywordHandler>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(UnknownKeyword)).clone()
    }
}

impl KeywordHandler for UnknownKeyword {
    fn name(&self) -> &str {
        ""
    }

    fn evaluate(&self, node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass().with_annotation(node.raw().clone()))
    }
}

/// A keyword whose value is its annotation (`title`, `default`, ...)
#[derive(Debug)]
pub struct AnnotationKeyword {
    name: &'static str,
}

impl AnnotationKeyword {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl KeywordHandler for AnnotationKeyword {
    fn name(&self) -> &str {
        self.name
    }

    fn evaluate(&self, node: &KeywordNode, _ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::pass().with_annotation(node.raw().clone()))
    }
}

/// Build every value of an object as a schema, keyed by property name
pub(crate) fn build_schema_map(value: &Value, ctx: &mut BuildContext<'_>) -> Result<Subschemas, SchemaError> {
    let map = value.as_object().ok_or_else(|| ctx.invalid("expected an object of schemas"))?;
    let mut entries = Vec::with_capacity(map.len());
    for (name, schema) in map {
        entries.push((name.clone(), ctx.subschema(schema, &[name.as_str()])?));
    }
    Ok(Subschemas::Map(entries))
}

/// Build every element of an array as a schema
pub(crate) fn build_schema_list(value: &Value, ctx: &mut BuildContext<'_>, allow_empty: bool) -> Result<Subschemas, SchemaError> {
    let items = value.as_array().ok_or_else(|| ctx.invalid("expected an array of schemas"))?;
    if items.is_empty() && !allow_empty {
        return Err(ctx.invalid("expected a non-empty array of schemas"));
    }
    let mut ids = Vec::with_capacity(items.len());
    for (index, schema) in items.iter().enumerate() {
        ids.push(ctx.subschema(schema, &[index.to_string().as_str()])?);
    }
    Ok(Subschemas::List(ids))
}

/// Build the keyword value itself as a schema
pub(crate) fn build_single(value: &Value, ctx: &mut BuildContext<'_>) -> Result<Subschemas, SchemaError> {
    Ok(Subschemas::Single(ctx.subschema(value, &[])?))
}

/// Reject anything but a schema (object or boolean)
pub(crate) fn expect_schema(value: &Value, ctx: &BuildContext<'_>) -> Result<(), SchemaError> {
    match value {
        Value::Object(_) | Value::Bool(_) => Ok(()),
        _ => Err(ctx.invalid("expected a schema")),
    }
}

/// A non-negative integer; `2.0` counts as `2`
pub(crate) fn non_negative_integer(value: &Value, ctx: &BuildContext<'_>) -> Result<u64, SchemaError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        _ => Err(ctx.invalid("expected a non-negative integer")),
    }
}

/// Parse an array of strings
pub(crate) fn string_array(value: &Value, ctx: &BuildContext<'_>) -> Result<Vec<String>, SchemaError> {
    let items = value.as_array().ok_or_else(|| ctx.invalid("expected an array of strings"))?;
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.as_str().ok_or_else(|| ctx.invalid("expected an array of strings"))?;
        out.push(item.to_string());
    }
    Ok(out)
}

/// Apply every listed subschema to the current instance
pub(crate) fn evaluate_each_in_place(node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<Vec<EvaluationResult>, ResolutionError> {
    node.subschemas()
        .list()
        .iter()
        .enumerate()
        .map(|(index, id)| ctx.evaluate_in_place(*id, &[index.to_string().as_str()]))
        .collect()
}

/// Render a list of names for messages: `"a", "b"`
pub(crate) fn quoted_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Array instances paired with their index segment
pub(crate) fn indexed(items: &[Value]) -> impl Iterator<Item = (usize, String, &Value)> {
    items.iter().enumerate().map(|(index, item)| (index, index.to_string(), item))
}

/// Apply `id` to the array items starting at `start`
pub(crate) fn evaluate_items_from(
    id: SchemaId,
    items: &[Value],
    start: usize,
    ctx: &EvalContext<'_>,
) -> Result<Vec<EvaluationResult>, ResolutionError> {
    indexed(items)
        .skip(start)
        .map(|(_, segment, item)| ctx.evaluate_child(id, &[], item, &segment))
        .collect()
}
