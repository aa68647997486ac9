//! The keyword handler contract
//!
//! A keyword handler is a stateless singleton registered under a keyword
//! name by a vocabulary. Building a schema object asks the handler to
//! validate the raw keyword value and to build any nested subschemas; the
//! result is an immutable [`KeywordNode`]. Evaluating asks the handler for
//! a [`KeywordOutcome`] given an [`EvalContext`].
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

mod coverage;

pub use coverage::Coverage;

use crate::build::{BuildContext, SchemaId};
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::result::EvaluationResult;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Evaluation order buckets; lower runs first, ties keep registration order
pub mod priority {
    /// Identifiers, anchors and definitions
    pub const IDENTIFIER: i32 = -100;
    /// Keywords with no ordering dependency
    pub const DEFAULT: i32 = 0;
    /// Keywords reading finished sibling results (`then`, `additionalProperties`, ...)
    pub const DEPENDENT: i32 = 10;
    /// `unevaluatedProperties` / `unevaluatedItems`
    pub const UNEVALUATED: i32 = 1000;
}

/// A keyword handler
pub trait KeywordHandler: Send + Sync + fmt::Debug {
    /// The keyword name this handler is registered under
    fn name(&self) -> &str;

    /// Evaluation priority within one schema object
    fn priority(&self) -> i32 {
        priority::DEFAULT
    }

    /// Reject malformed keyword values and produce the parsed form
    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let _ = (value, ctx);
        Ok(KeywordState::none())
    }

    /// Build nested schemas owned by this keyword
    fn build_subschemas(
        &self,
        value: &Value,
        state: &KeywordState,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Subschemas, SchemaError> {
        let _ = (value, state, ctx);
        Ok(Subschemas::None)
    }

    /// Evaluate the keyword against the current instance
    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError>;
}

/// Handler-specific parsed form of a keyword value
#[derive(Clone, Default)]
pub struct KeywordState(Option<Arc<dyn Any + Send + Sync>>);

impl KeywordState {
    /// No parsed state; the handler works from the raw value
    pub fn none() -> Self {
        Self(None)
    }

    /// Wrap a parsed value
    pub fn new<T: Any + Send + Sync>(state: T) -> Self {
        Self(Some(Arc::new(state)))
    }

    /// Wrap an already shared parsed value
    pub fn from_arc<T: Any + Send + Sync>(state: Arc<T>) -> Self {
        Self(Some(state))
    }

    /// Borrow the parsed value as `T`
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|state| state.downcast_ref::<T>())
    }
}

impl fmt::Debug for KeywordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("KeywordState(..)"),
            None => f.write_str("KeywordState(None)"),
        }
    }
}

/// Subschemas owned by a keyword node
#[derive(Debug, Clone, Default)]
pub enum Subschemas {
    #[default]
    None,
    /// `not`, `items`, `additionalProperties`, ...
    Single(SchemaId),
    /// `allOf`, `prefixItems`, ...
    List(Vec<SchemaId>),
    /// `properties`, `$defs`, `dependentSchemas`, ...
    Map(Vec<(String, SchemaId)>),
}

impl Subschemas {
    pub fn single(&self) -> Option<SchemaId> {
        match self {
            Self::Single(id) => Some(*id),
            _ => None,
        }
    }

    pub fn list(&self) -> &[SchemaId] {
        match self {
            Self::List(ids) => ids,
            _ => &[],
        }
    }

    pub fn map(&self) -> &[(String, SchemaId)] {
        match self {
            Self::Map(entries) => entries,
            _ => &[],
        }
    }

    /// Look up a named subschema
    pub fn get(&self, name: &str) -> Option<SchemaId> {
        self.map().iter().find(|(key, _)| key == name).map(|(_, id)| *id)
    }

    /// Every owned schema handle
    pub fn ids(&self) -> Vec<SchemaId> {
        match self {
            Self::None => Vec::new(),
            Self::Single(id) => vec![*id],
            Self::List(ids) => ids.clone(),
            Self::Map(entries) => entries.iter().map(|(_, id)| *id).collect(),
        }
    }
}

/// One instantiated keyword within one schema object
#[derive(Debug, Clone)]
pub struct KeywordNode {
    pub(crate) name: String,
    pub(crate) raw: Value,
    pub(crate) state: KeywordState,
    pub(crate) subschemas: Subschemas,
    pub(crate) handler: Arc<dyn KeywordHandler>,
    pub(crate) priority: i32,
}

impl KeywordNode {
    /// The keyword name as written in the schema
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw keyword value
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The handler-produced parsed value
    pub fn state(&self) -> &KeywordState {
        &self.state
    }

    pub fn subschemas(&self) -> &Subschemas {
        &self.subschemas
    }

    pub fn handler(&self) -> &Arc<dyn KeywordHandler> {
        &self.handler
    }

    /// The evaluation order bucket this keyword was sorted into
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// What one keyword contributes to its schema's result
#[derive(Debug, Clone, Default)]
pub struct KeywordOutcome {
    pub valid: bool,
    pub annotation: Option<Value>,
    pub error: Option<String>,
    pub details: Vec<EvaluationResult>,
    pub coverage: Coverage,
}

impl KeywordOutcome {
    /// A passing outcome with nothing attached
    pub fn pass() -> Self {
        Self {
            valid: true,
            ..Default::default()
        }
    }

    /// A failing outcome with a message
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Pass, or fail with the lazily built message
    pub fn check(valid: bool, error: impl FnOnce() -> String) -> Self {
        if valid {
            Self::pass()
        } else {
            Self::fail(error())
        }
    }

    /// Validity from child results, with no message of its own
    pub fn from_details(valid: bool, details: Vec<EvaluationResult>) -> Self {
        Self {
            valid,
            details,
            ..Default::default()
        }
    }

    pub fn with_annotation(mut self, annotation: Value) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    /// Merge the coverage of every valid in-place child result
    pub fn absorb_valid_details(mut self) -> Self {
        for detail in &self.details {
            if detail.valid {
                self.coverage.merge(&detail.coverage);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SchemaGraph;
    use crate::options::BuildOptions;
    use crate::registry::SchemaRegistry;
    use serde_json::json;

    #[test]
    fn test_keywords_are_stored_in_priority_order() {
        let options = BuildOptions::new().with_registry(Arc::new(SchemaRegistry::new()));
        let schema = json!({
            "unevaluatedProperties": false,
            "additionalProperties": {"type": "string"},
            "properties": {"a": true},
            "$defs": {"x": true}
        });
        let graph = SchemaGraph::build(&schema, &options).unwrap();
        let root = graph.registry().node(graph.root()).unwrap();

        let order: Vec<(&str, i32)> = root
            .keywords()
            .iter()
            .map(|keyword| (keyword.name(), keyword.priority()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("$defs", priority::IDENTIFIER),
                ("properties", priority::DEFAULT),
                ("additionalProperties", priority::DEPENDENT),
                ("unevaluatedProperties", priority::UNEVALUATED),
            ]
        );
    }
}
