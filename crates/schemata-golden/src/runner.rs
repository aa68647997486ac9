//! Golden test runner for executing suite files

use crate::{
    corpus::{CorpusManager, SuiteFile},
    diff::DiffEngine,
    snapshot::{apply_ignores, Snapshot, SnapshotManager},
    GoldenConfig, GoldenError, Result,
};
use colored::*;
use schemata_core::{BuildOptions, EvaluationOptions, FileFetcher, OutputFormat, SchemaGraph, SchemaRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Prefix under which `remotes/` is served to suites
pub const REMOTES_PREFIX: &str = "http://localhost:1234/";

/// Base URI of a group schema that declares no `$id`
const GROUP_BASE: &str = "https://golden.schemata.test/";

/// Result of running one suite file
#[derive(Debug)]
pub struct TestResult {
    /// Suite id
    pub name: String,

    pub passed: bool,

    /// Number of instances evaluated
    pub tests_run: usize,

    /// Instances whose validity did not match, or groups that failed to build
    pub failures: Vec<String>,

    /// Error message if failed
    pub error: Option<String>,

    /// Diff output if the snapshot comparison failed
    pub diff: Option<String>,

    /// Execution time in milliseconds
    pub duration_ms: u64,

    /// Whether the snapshot was created or updated
    pub updated: bool,
}

impl TestResult {
    fn failed(name: &str, error: String, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            tests_run: 0,
            failures: Vec::new(),
            error: Some(error),
            diff: None,
            duration_ms,
            updated: false,
        }
    }

    /// Print the test result
    pub fn print(&self, verbose: bool) {
        let status = if self.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };

        println!("{} {} ({} tests, {}ms)", status, self.name, self.tests_run, self.duration_ms);

        for failure in &self.failures {
            println!("  {} {}", "-".red(), failure);
        }

        if let Some(ref error) = self.error {
            println!("  {}: {}", "Error".red(), error);
        }

        if verbose || !self.passed {
            if let Some(ref diff) = self.diff {
                println!("{}", diff);
            }
        }

        if self.updated {
            println!("  {}", "Snapshot updated".yellow());
        }
    }
}

/// What evaluating a suite produced
struct SuiteRun {
    tests_run: usize,
    failures: Vec<String>,
    content: Value,
}

/// Runner for golden tests
pub struct GoldenTestRunner {
    config: GoldenConfig,
    corpus_manager: CorpusManager,
    snapshot_manager: SnapshotManager,
}

impl GoldenTestRunner {
    pub fn new(config: GoldenConfig) -> Self {
        let corpus_manager = CorpusManager::new(&config.corpus_dir);
        let snapshot_manager = SnapshotManager::new(&config.snapshot_dir);

        Self {
            config,
            corpus_manager,
            snapshot_manager,
        }
    }

    /// Run one suite by its `category/name` id
    pub fn run_suite(&self, id: &str) -> Result<TestResult> {
        let start = Instant::now();
        let result = match self.corpus_manager.load_by_id(id) {
            Ok(suite) => self.execute_suite(&suite, start),
            Err(e) => TestResult::failed(id, e.to_string(), start.elapsed().as_millis() as u64),
        };

        if self.config.verbose {
            result.print(true);
        }

        if result.passed {
            Ok(result)
        } else {
            Err(GoldenError::TestFailed(format!(
                "Suite '{}' failed: {}",
                id,
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("{} failure(s)", result.failures.len()))
            )))
        }
    }

    /// Run every suite whose name or category contains `pattern` (`*` runs all)
    pub fn run_batch(&self, pattern: &str) -> Result<Vec<TestResult>> {
        let suites = self.corpus_manager.discover_suites()?;

        let filtered: Vec<SuiteFile> = if pattern == "*" {
            suites
        } else {
            suites
                .into_iter()
                .filter(|s| s.name.contains(pattern) || s.category.contains(pattern))
                .collect()
        };

        if filtered.is_empty() {
            return Err(GoldenError::CorpusError(format!("No suites found matching pattern '{}'", pattern)));
        }

        println!("Running {} suites...\n", filtered.len());

        let mut results = Vec::new();
        let mut failed = 0;
        for suite in &filtered {
            let result = self.execute_suite(suite, Instant::now());
            if !result.passed {
                failed += 1;
            }
            result.print(self.config.verbose);
            results.push(result);
        }

        let tests: usize = results.iter().map(|r| r.tests_run).sum();
        println!("\n{}", "=== Test Summary ===".bold());
        println!(
            "{}: {} suites passed, {} failed ({} tests)",
            "Results".bold(),
            (results.len() - failed).to_string().green(),
            failed.to_string().red(),
            tests
        );

        if failed > 0 {
            Err(GoldenError::TestFailed(format!("{} suite(s) failed", failed)))
        } else {
            Ok(results)
        }
    }

    fn execute_suite(&self, suite: &SuiteFile, start: Instant) -> TestResult {
        let name = suite.id();
        let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

        let snapshot = if self.snapshot_manager.exists(&name) {
            match self.snapshot_manager.load(&name) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => return TestResult::failed(&name, e.to_string(), elapsed(start)),
            }
        } else {
            None
        };
        let format = match &snapshot {
            Some(snapshot) => match snapshot.metadata.output_format.parse::<OutputFormat>() {
                Ok(format) => format,
                Err(e) => return TestResult::failed(&name, e, elapsed(start)),
            },
            None => self.config.output_format,
        };

        let run = match self.evaluate_suite(suite, format) {
            Ok(run) => run,
            Err(e) => return TestResult::failed(&name, e.to_string(), elapsed(start)),
        };

        let (diff, updated, error) = match self.check_snapshot(&name, snapshot, format, &run.content) {
            Ok((diff, updated)) => (diff, updated, None),
            Err(e) => (None, false, Some(e.to_string())),
        };
        let snapshot_ok = error.is_none() && (diff.is_none() || updated);

        TestResult {
            passed: run.failures.is_empty() && snapshot_ok,
            name,
            tests_run: run.tests_run,
            failures: run.failures,
            error: error.or_else(|| (!snapshot_ok).then(|| "Snapshot mismatch".to_string())),
            diff,
            duration_ms: elapsed(start),
            updated,
        }
    }

    /// Build each group on a fresh registry and evaluate its instances
    fn evaluate_suite(&self, suite: &SuiteFile, format: OutputFormat) -> Result<SuiteRun> {
        let prefix = Url::parse(REMOTES_PREFIX)
            .map_err(|e| GoldenError::CorpusError(format!("Invalid remotes prefix: {}", e)))?;
        let evaluation = EvaluationOptions::new().with_output_format(format);

        let mut run = SuiteRun {
            tests_run: 0,
            failures: Vec::new(),
            content: Value::Array(Vec::new()),
        };
        let mut groups = Vec::new();

        for (index, group) in suite.groups.iter().enumerate() {
            let registry = Arc::new(SchemaRegistry::new());
            registry.set_fetcher(FileFetcher::new(self.config.remotes_dir()).with_prefix(prefix.clone()));

            let mut options = BuildOptions::new()
                .with_registry(registry)
                .with_base_uri(format!("{}{}/{}.json", GROUP_BASE, suite.id(), index));
            if let Some(dialect) = suite.dialect() {
                options = options.with_dialect(dialect);
            }

            let graph = match SchemaGraph::build(&group.schema, &options) {
                Ok(graph) => graph,
                Err(e) => {
                    run.failures.push(format!("{}: schema failed to build: {}", group.description, e));
                    continue;
                }
            };

            let mut tests = Vec::new();
            for case in &group.tests {
                run.tests_run += 1;
                match graph.evaluate(&case.data, &evaluation) {
                    Ok(output) => {
                        if output.valid != case.valid {
                            run.failures.push(format!(
                                "{} / {}: expected {}, got {}",
                                group.description,
                                case.description,
                                validity(case.valid),
                                validity(output.valid)
                            ));
                        }
                        tests.push(json!({
                            "description": case.description,
                            "output": serde_json::to_value(&output)?,
                        }));
                    }
                    Err(e) => run
                        .failures
                        .push(format!("{} / {}: evaluation failed: {}", group.description, case.description, e)),
                }
            }
            groups.push(json!({"description": group.description, "tests": tests}));
        }

        run.content = Value::Array(groups);
        Ok(run)
    }

    /// Compare against the stored snapshot; returns the diff and whether the snapshot was written
    fn check_snapshot(
        &self,
        name: &str,
        snapshot: Option<Snapshot>,
        format: OutputFormat,
        actual: &Value,
    ) -> Result<(Option<String>, bool)> {
        let Some(snapshot) = snapshot else {
            if self.config.create_missing || self.config.update_snapshots {
                self.snapshot_manager.create(name, format.as_str(), actual.clone())?;
                return Ok((None, true));
            }
            return Ok((None, false));
        };

        let mut diff_engine = DiffEngine::new(self.config.diff_options.clone());
        for volatile in &snapshot.volatile_fields {
            diff_engine.add_volatile_pattern(&volatile.field, &volatile.pattern)?;
        }

        let mut expected = snapshot.content.clone();
        let mut current = actual.clone();
        apply_ignores(&mut expected, &snapshot.ignore_fields);
        apply_ignores(&mut current, &snapshot.ignore_fields);

        let diff_result = diff_engine.compare(&expected, &current);
        if diff_result.matches {
            Ok((None, false))
        } else if self.config.update_snapshots {
            self.snapshot_manager.update(name, actual.clone())?;
            Ok((Some(diff_result.diff_output), true))
        } else {
            Ok((Some(diff_result.diff_output), false))
        }
    }

    /// Initialize the corpus with a sample suite
    pub fn init_corpus(&self) -> Result<()> {
        self.corpus_manager.init_corpus()
    }

    /// List all suite ids
    pub fn list_suites(&self) -> Result<Vec<String>> {
        Ok(self.corpus_manager.discover_suites()?.iter().map(SuiteFile::id).collect())
    }

    /// Print corpus statistics
    pub fn get_statistics(&self) -> Result<()> {
        let stats = self.corpus_manager.get_statistics()?;
        stats.print();
        Ok(())
    }
}

fn validity(valid: bool) -> &'static str {
    if valid {
        "valid"
    } else {
        "invalid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffOptions;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &TempDir) -> GoldenConfig {
        GoldenConfig {
            corpus_dir: root.path().to_path_buf(),
            snapshot_dir: root.path().join("snapshots"),
            update_snapshots: false,
            create_missing: false,
            output_format: OutputFormat::Basic,
            diff_options: DiffOptions {
                colored: false,
                ..Default::default()
            },
            verbose: false,
        }
    }

    fn write_suite(root: &TempDir, id: &str, suite: Value) {
        let path = root.path().join(format!("{}.json", id));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&suite).unwrap()).unwrap();
    }

    #[test]
    fn test_runner_runs_sample_corpus() {
        let temp_dir = TempDir::new().unwrap();
        let runner = GoldenTestRunner::new(config(&temp_dir));
        runner.init_corpus().unwrap();

        assert_eq!(runner.list_suites().unwrap(), vec!["draft2020-12/sample".to_string()]);
        let results = runner.run_batch("*").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tests_run, 2);
        assert!(!results[0].updated);
    }

    #[test]
    fn test_wrong_expectation_fails() {
        let temp_dir = TempDir::new().unwrap();
        write_suite(
            &temp_dir,
            "draft2020-12/minimum",
            json!([{
                "description": "minimum",
                "schema": {"minimum": 3},
                "tests": [{"description": "below", "data": 1, "valid": true}]
            }]),
        );

        let runner = GoldenTestRunner::new(config(&temp_dir));
        assert!(runner.run_suite("draft2020-12/minimum").is_err());
        assert!(runner.run_batch("minimum").is_err());
        assert!(runner.run_batch("no-such-suite").is_err());
    }

    #[test]
    fn test_remote_refs_are_served_from_remotes() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("remotes")).unwrap();
        fs::write(temp_dir.path().join("remotes/integer.json"), r#"{"type": "integer"}"#).unwrap();
        write_suite(
            &temp_dir,
            "draft2020-12/refRemote",
            json!([{
                "description": "remote ref",
                "schema": {"$ref": "http://localhost:1234/integer.json"},
                "tests": [
                    {"description": "remote ref valid", "data": 1, "valid": true},
                    {"description": "remote ref invalid", "data": "a", "valid": false}
                ]
            }]),
        );

        let runner = GoldenTestRunner::new(config(&temp_dir));
        let result = runner.run_suite("draft2020-12/refRemote").unwrap();
        assert_eq!(result.tests_run, 2);
    }

    #[test]
    fn test_snapshot_created_then_compared() {
        let temp_dir = TempDir::new().unwrap();
        write_suite(
            &temp_dir,
            "output/type",
            json!([{
                "description": "type",
                "schema": {"type": "string"},
                "tests": [{"description": "number", "data": 1, "valid": false}]
            }]),
        );

        let mut creating = config(&temp_dir);
        creating.create_missing = true;
        let created = GoldenTestRunner::new(creating).run_suite("output/type").unwrap();
        assert!(created.updated);

        let runner = GoldenTestRunner::new(config(&temp_dir));
        let rerun = runner.run_suite("output/type").unwrap();
        assert!(!rerun.updated);

        // a tampered snapshot no longer matches
        let manager = SnapshotManager::new(temp_dir.path().join("snapshots"));
        let mut snapshot = manager.load("output/type").unwrap();
        snapshot.content[0]["tests"][0]["output"]["valid"] = json!(true);
        manager.save(&snapshot).unwrap();
        assert!(runner.run_suite("output/type").is_err());
    }
}
