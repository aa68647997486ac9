//! Output formats
//!
//! Pure projections of the full [`EvaluationResult`] tree:
//! - `flag`: validity only, never any details
//! - `basic`/`list`: one flat list of units carrying errors (when invalid)
//!   or annotations (when valid)
//! - `detailed`: the tree pruned to the nodes that explain the outcome,
//!   with single-child chains collapsed
//! - `verbose`/`hierarchical`: the whole tree, one unit per schema and keyword
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::options::OutputFormat;
use crate::result::EvaluationResult;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Key used for messages that belong to a schema rather than a keyword
const SCHEMA_KEY: &str = "";

/// One output unit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Output>>,
}

impl Output {
    /// Project a result tree onto an output format
    pub fn project(result: &EvaluationResult, format: OutputFormat) -> Self {
        match format {
            OutputFormat::Flag => Self::flag(result.valid),
            OutputFormat::Basic => Self::basic(result),
            OutputFormat::Detailed => Self::detailed(result),
            OutputFormat::Verbose => Self::verbose(result),
        }
    }

    fn flag(valid: bool) -> Self {
        Self {
            valid,
            keyword_location: None,
            absolute_keyword_location: None,
            instance_location: None,
            errors: None,
            annotations: None,
            details: None,
        }
    }

    /// A unit for one node, without details
    fn unit(node: &EvaluationResult) -> Self {
        let key = node.keyword.clone().unwrap_or_else(|| SCHEMA_KEY.to_string());
        let errors = match (&node.error, node.valid) {
            (Some(error), false) => Some(BTreeMap::from([(key.clone(), error.clone())])),
            _ => None,
        };
        let annotations = match (&node.annotation, node.valid) {
            (Some(annotation), true) => Some(BTreeMap::from([(key, annotation.clone())])),
            _ => None,
        };
        Self {
            valid: node.valid,
            keyword_location: Some(node.evaluation_path.to_string()),
            absolute_keyword_location: Some(node.schema_location.clone()),
            instance_location: Some(node.instance_location.to_string()),
            errors,
            annotations,
            details: None,
        }
    }

    fn basic(result: &EvaluationResult) -> Self {
        let units: Vec<Output> = if result.valid {
            result.annotations().into_iter().map(Self::unit).collect()
        } else {
            result.errors().into_iter().map(Self::unit).collect()
        };
        let mut root = Self::unit(result);
        root.errors = None;
        root.annotations = None;
        root.details = (!units.is_empty()).then_some(units);
        root
    }

    fn detailed(result: &EvaluationResult) -> Self {
        let mut root = Self::unit(result);
        let children: Vec<Output> = result
            .details
            .iter()
            .filter_map(|child| Self::pruned(child, result.valid))
            .collect();
        root.details = (!children.is_empty()).then_some(children);
        root
    }

    /// Keep nodes matching the overall outcome that carry (or lead to) a
    /// message or annotation; a node with nothing of its own and a single
    /// surviving child is replaced by that child
    fn pruned(node: &EvaluationResult, keep_valid: bool) -> Option<Self> {
        if node.valid != keep_valid {
            return None;
        }
        let children: Vec<Output> = node
            .details
            .iter()
            .filter_map(|child| Self::pruned(child, keep_valid))
            .collect();
        let unit = Self::unit(node);
        let has_own = unit.errors.is_some() || unit.annotations.is_some();
        match (has_own, children.len()) {
            (false, 0) => None,
            (false, 1) => children.into_iter().next(),
            (_, 0) => Some(unit),
            _ => Some(Self {
                details: Some(children),
                ..unit
            }),
        }
    }

    fn verbose(node: &EvaluationResult) -> Self {
        let mut unit = Self::unit(node);
        if !node.details.is_empty() {
            unit.details = Some(node.details.iter().map(Self::verbose).collect());
        }
        unit
    }

    /// Every unit in this output, depth first
    pub fn units(&self) -> Vec<&Output> {
        let mut out = vec![self];
        for detail in self.details.iter().flatten() {
            out.extend(detail.units());
        }
        out
    }
}
