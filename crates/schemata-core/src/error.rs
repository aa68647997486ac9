//! Error types for building and evaluating schemas
//!
//! Two fatal classes are kept apart so callers can tell "the schema or its
//! environment is broken" from "the instance is invalid":
//! - [`SchemaError`] is raised while building a graph.
//! - [`ResolutionError`] is raised while evaluating, because some reference
//!   resolution is necessarily deferred until an instance is walked.
//!
//! Validation failures are never errors; they are `valid: false` nodes in the
//! result tree.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::loader::LoaderError;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error used by fetch hooks and plugins
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Schema structure errors raised during build
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A keyword's raw value has the wrong shape
    #[error("Invalid value for keyword '{keyword}' at '{location}': {reason}")]
    InvalidKeywordValue {
        keyword: String,
        location: String,
        reason: String,
    },

    /// A keyword the active dialect does not know, under a strict dialect
    #[error("Unknown keyword '{keyword}' at '{location}' is not allowed by dialect '{dialect}'")]
    UnknownKeyword {
        keyword: String,
        location: String,
        dialect: String,
    },

    /// `$schema` names a meta-schema that is neither a known dialect nor resolvable
    #[error("Unknown dialect '{uri}': {reason}")]
    UnknownDialect { uri: String, reason: String },

    /// A meta-schema requires a vocabulary this engine does not implement
    #[error("Required vocabulary '{uri}' is not registered")]
    UnknownVocabulary { uri: String },

    /// Two resources in one build claim the same base URI
    #[error("Duplicate schema resource '{uri}'")]
    DuplicateResource { uri: String },

    /// Two anchors with the same name inside one resource
    #[error("Duplicate anchor '{name}' in resource '{base}'")]
    DuplicateAnchor { base: String, name: String },

    /// A URI that cannot be parsed or resolved against its base
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A `pattern`/`patternProperties` expression the regex engine rejects
    #[error("Invalid regular expression '{pattern}' in keyword '{keyword}': {source}")]
    InvalidPattern {
        keyword: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The schema document failed validation against its own meta-schema
    #[error("Schema does not conform to meta-schema '{meta_schema}': {}", .errors.join("; "))]
    MetaSchemaValidation {
        meta_schema: String,
        errors: Vec<String>,
    },

    /// `$schema` could be resolved but loading it failed
    #[error("Failed to resolve meta-schema: {0}")]
    MetaSchema(#[source] Box<ResolutionError>),
}

impl SchemaError {
    /// Create an invalid keyword value error
    pub fn invalid_value(
        keyword: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidKeywordValue {
            keyword: keyword.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid URI error
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}

/// Reference resolution errors raised during evaluation
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// No registered or fetchable document contains the reference target
    #[error("Failed to resolve reference '{reference}': {reason}")]
    UnresolvedReference { reference: String, reason: String },

    /// A JSON pointer fragment does not exist in the target document
    #[error("Pointer '{pointer}' not found in '{base}'")]
    PointerNotFound { base: String, pointer: String },

    /// A plain-name fragment names no anchor in the target resource
    #[error("Anchor '{name}' not found in '{base}'")]
    AnchorNotFound { base: String, name: String },

    /// The target document is not registered and there is no fetch hook
    #[error("Document '{uri}' is not registered and no fetch hook is configured")]
    NoFetcher { uri: String },

    /// The fetch hook failed or returned nothing
    #[error("Failed to fetch '{uri}': {source}")]
    FetchFailed {
        uri: String,
        #[source]
        source: BoxError,
    },

    /// A document was found but could not be built into a schema
    #[error("Failed to build referenced schema '{uri}': {source}")]
    Build {
        uri: String,
        #[source]
        source: Box<SchemaError>,
    },

    /// The same schema was re-entered for the same instance location through references
    #[error("Infinite recursion detected at '{evaluation_path}' (instance '{instance_location}')")]
    InfiniteRecursion {
        evaluation_path: String,
        instance_location: String,
    },

    /// Evaluation descended into the instance deeper than the configured limit
    #[error("Maximum evaluation depth {max_depth} exceeded at '{evaluation_path}'")]
    DepthExceeded {
        max_depth: usize,
        evaluation_path: String,
    },

    /// A reference form that is intentionally not supported
    #[error("Unsupported reference '{reference}': {reason}")]
    UnsupportedReference { reference: String, reason: String },
}

impl ResolutionError {
    /// Create an unresolved reference error
    pub fn unresolved(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

impl From<SchemaError> for ResolutionError {
    fn from(error: SchemaError) -> Self {
        Self::Build {
            uri: String::from("<inline>"),
            source: Box::new(error),
        }
    }
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed schema (build time)
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Broken reference or environment (evaluation time)
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Schema or instance text is not JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File loading failed
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

impl Error {
    /// Whether this is a build-time structure error
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Whether this is an evaluation-time resolution error
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let schema: Error = SchemaError::invalid_value("type", "#", "must be a string or array").into();
        assert!(schema.is_schema_error());
        assert!(!schema.is_resolution_error());

        let resolution: Error = ResolutionError::unresolved("other.json", "not registered").into();
        assert!(resolution.is_resolution_error());
        assert!(resolution.to_string().contains("other.json"));
    }

    #[test]
    fn test_meta_schema_error_lists_failures() {
        let err = SchemaError::MetaSchemaValidation {
            meta_schema: "https://json-schema.org/draft/2020-12/schema".to_string(),
            errors: vec!["/type: bad".to_string(), "/minimum: bad".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("/type: bad; /minimum: bad"));
    }
}
