//! Built schema graphs: the build and evaluate entry points
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::build::SchemaId;
use crate::dialect::Dialect;
use crate::error::{Error, ResolutionError, SchemaError};
use crate::evaluate::{Evaluator, Position};
use crate::json::JsonPointer;
use crate::options::{BuildOptions, EvaluationOptions, OutputFormat};
use crate::output::Output;
use crate::registry::SchemaRegistry;
use crate::result::EvaluationResult;
use crate::uri::{self, SchemaUri};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A built schema: a root handle into a registry
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    registry: Arc<SchemaRegistry>,
    root: SchemaId,
    base_uri: String,
    dialect: Arc<Dialect>,
}

impl SchemaGraph {
    /// Build a schema document into the options' registry
    pub fn build(document: &Value, options: &BuildOptions) -> Result<Self, SchemaError> {
        let registry = options.registry.clone();
        let dialect = match &options.dialect {
            Some(uri) => registry.dialect_for(uri)?,
            None => registry.vocabularies().default_dialect(),
        };
        let base = match &options.base_uri {
            Some(base) => uri::parse_absolute(base)?,
            None => uri::generate_base(None)?,
        };

        if options.validate_against_meta_schema {
            validate_against_meta_schema(&registry, document, &dialect)?;
        }

        let root = registry.build_document(document, base, dialect, &options.keyword_overrides)?;
        let graph = Self::from_node(registry, root).map_err(|e| SchemaError::MetaSchema(Box::new(e)))?;
        debug!(base = %graph.base_uri, dialect = %graph.dialect.id(), "schema graph built");
        Ok(graph)
    }

    /// Parse JSON text and build it
    pub fn from_json_str(text: &str, options: &BuildOptions) -> Result<Self, Error> {
        let document: Value = serde_json::from_str(text)?;
        Ok(Self::build(&document, options)?)
    }

    pub(crate) fn from_node(registry: Arc<SchemaRegistry>, root: SchemaId) -> Result<Self, ResolutionError> {
        let node = registry
            .node(root)
            .ok_or_else(|| ResolutionError::unresolved(root.to_string(), "schema handle is not registered"))?;
        Ok(Self {
            base_uri: node.base().to_string(),
            dialect: node.dialect().clone(),
            registry,
            root,
        })
    }

    /// Evaluate an instance and project the result onto the requested output format
    pub fn evaluate(&self, instance: &Value, options: &EvaluationOptions) -> Result<Output, ResolutionError> {
        let result = self.evaluate_tree(instance, options)?;
        Ok(Output::project(&result, options.output_format))
    }

    /// Evaluate an instance and return the full result tree
    pub fn evaluate_tree(&self, instance: &Value, options: &EvaluationOptions) -> Result<EvaluationResult, ResolutionError> {
        let evaluator = Evaluator::new(&self.registry, options, instance)?;
        let root = JsonPointer::root();
        evaluator.evaluate_schema(self.root, instance, Position::root(&root))
    }

    /// Validity only, with default options
    pub fn is_valid(&self, instance: &Value) -> Result<bool, ResolutionError> {
        let options = EvaluationOptions::default();
        Ok(self.evaluate_tree(instance, &options)?.valid)
    }

    pub fn root(&self) -> SchemaId {
        self.root
    }

    /// Base URI of the root resource
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }
}

/// Evaluate the raw document against the meta-schema of its dialect
fn validate_against_meta_schema(registry: &Arc<SchemaRegistry>, document: &Value, dialect: &Dialect) -> Result<(), SchemaError> {
    let meta_uri = document
        .get("$schema")
        .and_then(Value::as_str)
        .unwrap_or_else(|| dialect.id());
    let url = uri::parse_absolute(meta_uri)?;
    let meta = registry
        .resolve_uri(&SchemaUri::from_url(&url))
        .map_err(|e| SchemaError::MetaSchema(Box::new(e)))?;
    let meta = SchemaGraph::from_node(registry.clone(), meta).map_err(|e| SchemaError::MetaSchema(Box::new(e)))?;

    let options = EvaluationOptions::default().with_output_format(OutputFormat::Basic);
    let result = meta
        .evaluate_tree(document, &options)
        .map_err(|e| SchemaError::MetaSchema(Box::new(e)))?;
    if result.valid {
        return Ok(());
    }
    let errors = result
        .errors()
        .into_iter()
        .map(|node| format!("{}: {}", node.instance_location, node.error.as_deref().unwrap_or_default()))
        .collect();
    Err(SchemaError::MetaSchemaValidation {
        meta_schema: meta_uri.to_string(),
        errors,
    })
}
