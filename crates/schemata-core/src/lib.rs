//! Schemata Core - JSON Schema build and evaluate engine
//!
//! This crate turns raw JSON Schema documents into immutable schema graphs
//! and evaluates JSON instances against them:
//! - **Build**: parse a document under a dialect, validate keyword values,
//!   register identifiers and anchors, and commit everything atomically into
//!   a [`SchemaRegistry`]
//! - **Evaluate**: walk an instance through the graph, resolving static,
//!   dynamic and recursive references, and produce an [`EvaluationResult`]
//!   tree that can be projected onto the standard output formats
//!
//! ## Features
//!
//! - **Dialects**: draft-06, draft-07, 2019-09 and 2020-12, plus custom
//!   dialects derived from a meta-schema's `$vocabulary`
//! - **Vocabularies**: pluggable keyword handlers, installed as plugins
//!   (see [`keywords::data::DataVocabulary`])
//! - **Output formats**: flag, basic/list, detailed, verbose/hierarchical
//! - **Localized messages**: per-culture error templates
//! - **File loading**: JSON/YAML documents through a confined, cached fetch hook
//!
//! ## Quick Start
//!
//! ```rust
//! use schemata_core::{BuildOptions, EvaluationOptions, OutputFormat, SchemaGraph};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "$schema": "https://json-schema.org/draft/2020-12/schema",
//!     "type": "object",
//!     "properties": { "name": { "type": "string" } },
//!     "required": ["name"]
//! });
//! let graph = SchemaGraph::build(&schema, &BuildOptions::new())?;
//!
//! let options = EvaluationOptions::new().with_output_format(OutputFormat::Basic);
//! let output = graph.evaluate(&json!({ "name": 42 }), &options)?;
//! assert!(!output.valid);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

pub mod build;
pub mod dialect;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod json;
pub mod keyword;
pub mod keywords;
pub mod loader;
pub mod messages;
pub mod options;
pub mod output;
pub mod registry;
pub mod result;
pub mod uri;

// Re-export commonly used types for convenience
pub use build::{BuildContext, ReferenceTarget, SchemaId, SchemaNode};
pub use dialect::{Dialect, DialectBuilder, Vocabulary, VocabularyPlugin, VocabularyRegistry};
pub use error::{Error, ResolutionError, Result, SchemaError};
pub use evaluate::EvalContext;
pub use graph::SchemaGraph;
pub use json::{JsonPointer, JsonType};
pub use keyword::{priority, Coverage, KeywordHandler, KeywordNode, KeywordOutcome, KeywordState, Subschemas};
pub use keywords::format::FormatRegistry;
pub use loader::{CacheConfig, FileFetcher, LoaderError};
pub use messages::MessageCatalog;
pub use options::{BuildOptions, EvaluationOptions, OutputFormat};
pub use output::Output;
pub use registry::{Fetch, SchemaRegistry};
pub use result::EvaluationResult;
