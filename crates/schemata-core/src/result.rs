//! The evaluation result tree
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::json::JsonPointer;
use crate::keyword::Coverage;
use serde::Serialize;
use serde_json::Value;

/// One node of the result tree
///
/// Schema-level nodes have no `keyword`; their details are the keyword
/// nodes of that schema object. Keyword nodes carry their own error or
/// annotation and the results of any subschemas they applied.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Keyword path from the evaluation root, through references
    pub evaluation_path: JsonPointer,
    /// Absolute URI of the schema location that produced this node
    pub schema_location: String,
    pub instance_location: JsonPointer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<EvaluationResult>,
    #[serde(skip)]
    pub(crate) coverage: Coverage,
}

impl EvaluationResult {
    /// Evaluated properties and items claimed under this node
    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    /// Depth-first iterator over this node and all descendants
    pub fn iter(&self) -> impl Iterator<Item = &EvaluationResult> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.details.iter().rev());
            Some(next)
        })
    }

    /// Every node that carries an error message, skipping failures inside
    /// passing subtrees (a failed `if` condition, the subschema of a passing `not`)
    pub fn errors(&self) -> Vec<&EvaluationResult> {
        fn collect<'a>(node: &'a EvaluationResult, out: &mut Vec<&'a EvaluationResult>) {
            if node.valid {
                return;
            }
            if node.error.is_some() {
                out.push(node);
            }
            for detail in &node.details {
                collect(detail, out);
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }

    /// Annotations of valid keyword nodes, the way a parent would collect them
    pub fn annotations(&self) -> Vec<&EvaluationResult> {
        fn collect<'a>(node: &'a EvaluationResult, out: &mut Vec<&'a EvaluationResult>) {
            if !node.valid {
                return;
            }
            if node.annotation.is_some() {
                out.push(node);
            }
            for detail in &node.details {
                collect(detail, out);
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }
}
