//! Conformance and golden output testing for the Schemata engine
//!
//! The corpus holds suite files shaped like the JSON-Schema-Test-Suite: an
//! array of groups, each with a schema and instances labelled valid or
//! invalid. Every suite is run through the public build/evaluate API, and the
//! projected outputs can be pinned as snapshots so output changes show up as
//! diffs.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

pub mod corpus;
pub mod diff;
pub mod runner;
pub mod snapshot;

use schemata_core::OutputFormat;
use std::path::PathBuf;
use thiserror::Error;

pub use corpus::{CorpusManager, SuiteFile, TestCase, TestGroup};
pub use diff::{DiffEngine, DiffOptions};
pub use runner::{GoldenTestRunner, TestResult};
pub use snapshot::{Snapshot, SnapshotManager};

/// Golden test error types
#[derive(Debug, Error)]
pub enum GoldenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] schemata_core::Error),

    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    #[error("Corpus error: {0}")]
    CorpusError(String),

    #[error("Test failed: {0}")]
    TestFailed(String),
}

pub type Result<T> = std::result::Result<T, GoldenError>;

/// Configuration for golden tests
#[derive(Debug, Clone)]
pub struct GoldenConfig {
    /// Root directory of the suite files
    pub corpus_dir: PathBuf,

    /// Directory for output snapshots
    pub snapshot_dir: PathBuf,

    /// Whether to rewrite snapshots that differ
    pub update_snapshots: bool,

    /// Whether to create missing snapshots
    pub create_missing: bool,

    /// Output format the snapshots are taken in
    pub output_format: OutputFormat,

    /// Diff options
    pub diff_options: DiffOptions,

    /// Verbose output
    pub verbose: bool,
}

impl Default for GoldenConfig {
    fn default() -> Self {
        let update_snapshots = std::env::var("UPDATE_GOLDEN")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            corpus_dir: PathBuf::from("../../golden-corpus"),
            snapshot_dir: PathBuf::from("../../golden-corpus/snapshots"),
            update_snapshots,
            create_missing: update_snapshots,
            output_format: OutputFormat::Basic,
            diff_options: DiffOptions::default(),
            verbose: false,
        }
    }
}

impl GoldenConfig {
    /// Create config from environment and defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(corpus_dir) = std::env::var("GOLDEN_CORPUS_DIR") {
            config.corpus_dir = PathBuf::from(corpus_dir);
        }

        if let Ok(snapshot_dir) = std::env::var("GOLDEN_SNAPSHOT_DIR") {
            config.snapshot_dir = PathBuf::from(snapshot_dir);
        }

        if let Ok(verbose) = std::env::var("GOLDEN_VERBOSE") {
            config.verbose = verbose == "1" || verbose.to_lowercase() == "true";
        }

        config
    }

    /// Directory served to suites as `http://localhost:1234/`
    pub fn remotes_dir(&self) -> PathBuf {
        self.corpus_dir.join("remotes")
    }
}

/// Macro for defining a golden test over one suite file
#[macro_export]
macro_rules! golden_test {
    ($name:ident, $suite:expr) => {
        #[test]
        fn $name() {
            use $crate::{GoldenConfig, GoldenTestRunner};

            let config = GoldenConfig::from_env();
            let runner = GoldenTestRunner::new(config);

            if let Err(e) = runner.run_suite($suite) {
                panic!("Golden suite failed: {}: {}", $suite, e);
            }
        }
    };
}

/// Macro for running every suite whose name or category matches a pattern
#[macro_export]
macro_rules! golden_test_batch {
    ($name:ident, $pattern:expr) => {
        #[test]
        fn $name() {
            use $crate::{GoldenConfig, GoldenTestRunner};

            let config = GoldenConfig::from_env();
            let runner = GoldenTestRunner::new(config);

            if let Err(e) = runner.run_batch($pattern) {
                panic!("Golden batch failed: {}: {}", $pattern, e);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        let config = GoldenConfig::from_env();
        assert!(!config.corpus_dir.as_os_str().is_empty());
        assert!(!config.snapshot_dir.as_os_str().is_empty());
        assert_eq!(config.output_format, OutputFormat::Basic);
        assert!(config.remotes_dir().ends_with("remotes"));
    }
}
