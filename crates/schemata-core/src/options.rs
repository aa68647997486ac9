//! Build and evaluation options
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::keyword::KeywordHandler;
use crate::messages::{MessageCatalog, DEFAULT_CULTURE};
use crate::registry::SchemaRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default limit on how deep into the instance evaluation may descend
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Shape of the evaluation output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Validity only
    #[default]
    Flag,
    /// Flattened list of error or annotation units
    #[serde(alias = "list")]
    Basic,
    /// Pruned tree of failing (or annotating) nodes
    Detailed,
    /// Full result tree
    #[serde(alias = "hierarchical")]
    Verbose,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Basic => "basic",
            Self::Detailed => "detailed",
            Self::Verbose => "verbose",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flag" => Ok(Self::Flag),
            "basic" | "list" => Ok(Self::Basic),
            "detailed" => Ok(Self::Detailed),
            "verbose" | "hierarchical" => Ok(Self::Verbose),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Options for building a schema graph
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Dialect for documents that declare no `$schema`
    pub dialect: Option<String>,
    /// Registry that receives the built resources
    pub registry: Arc<SchemaRegistry>,
    /// Handlers that replace the dialect's handler for the same keyword name
    pub keyword_overrides: Vec<Arc<dyn KeywordHandler>>,
    /// Base URI for documents without `$id`; a unique one is generated otherwise
    pub base_uri: Option<String>,
    /// Check the document against its meta-schema after building
    pub validate_against_meta_schema: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            dialect: None,
            registry: SchemaRegistry::global(),
            keyword_overrides: Vec::new(),
            base_uri: None,
            validate_against_meta_schema: false,
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_keyword_override(mut self, handler: Arc<dyn KeywordHandler>) -> Self {
        self.keyword_overrides.push(handler);
        self
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn with_meta_schema_validation(mut self, enabled: bool) -> Self {
        self.validate_against_meta_schema = enabled;
        self
    }
}

/// Options for one evaluation
#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    pub output_format: OutputFormat,
    /// Make `format` assert regardless of dialect
    pub require_format_validation: bool,
    /// Dialect applied to schema nodes that declare no `$schema`
    pub evaluate_as: Option<String>,
    /// Base for relative URIs in `data` references and for schemas built
    /// while evaluating
    pub default_base_uri: Option<String>,
    /// Culture for error messages
    pub culture: String,
    pub messages: Arc<MessageCatalog>,
    /// Instance nesting limit for one evaluation. Only descending into an
    /// array item or property value, or into a `data` schema, counts;
    /// `$ref` chains at one location are bounded by the recursion guard
    /// instead.
    pub max_depth: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            require_format_validation: false,
            evaluate_as: None,
            default_base_uri: None,
            culture: DEFAULT_CULTURE.to_string(),
            messages: MessageCatalog::shared(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EvaluationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_format_validation(mut self, required: bool) -> Self {
        self.require_format_validation = required;
        self
    }

    pub fn with_evaluate_as(mut self, dialect: impl Into<String>) -> Self {
        self.evaluate_as = Some(dialect.into());
        self
    }

    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = culture.into();
        self
    }

    pub fn with_messages(mut self, messages: Arc<MessageCatalog>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_default_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.default_base_uri = Some(base_uri.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("flag".parse::<OutputFormat>().unwrap(), OutputFormat::Flag);
        assert_eq!("List".parse::<OutputFormat>().unwrap(), OutputFormat::Basic);
        assert_eq!("hierarchical".parse::<OutputFormat>().unwrap(), OutputFormat::Verbose);
        assert!("tree".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Detailed.to_string(), "detailed");
    }

    #[test]
    fn test_output_format_serde() {
        let format: OutputFormat = serde_json::from_str("\"hierarchical\"").unwrap();
        assert_eq!(format, OutputFormat::Verbose);
        assert_eq!(serde_json::to_string(&OutputFormat::Basic).unwrap(), "\"basic\"");
    }

    #[test]
    fn test_defaults() {
        let options = EvaluationOptions::default();
        assert_eq!(options.output_format, OutputFormat::Flag);
        assert_eq!(options.culture, "en");
        assert!(!options.require_format_validation);
        assert!(!BuildOptions::default().validate_against_meta_schema);
    }
}
