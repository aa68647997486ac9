//! Schema document loading from disk
//!
//! - YAML and JSON parsing
//! - A file-backed fetch hook with path traversal checks
//! - An mtime-aware LRU cache of parsed documents
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use schemata_core::loader::FileFetcher;
//! use schemata_core::SchemaRegistry;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SchemaRegistry::new());
//! let fetcher = FileFetcher::new("schemas")
//!     .with_prefix(url::Url::parse("https://example.com/schemas/")?);
//! registry.set_fetcher(fetcher);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

pub mod cache;
pub mod error;
pub mod fetch;
pub mod parser;

pub use cache::{CacheConfig, DocumentCache};
pub use error::{LoaderError, LoaderResult};
pub use fetch::FileFetcher;
pub use parser::{Format, SchemaParser};

use serde_json::Value;
use std::path::Path;

/// Read a schema or instance document, detecting YAML or JSON from the extension
pub fn load_document(path: impl AsRef<Path>) -> LoaderResult<Value> {
    SchemaParser::new().parse_file(path.as_ref())
}
