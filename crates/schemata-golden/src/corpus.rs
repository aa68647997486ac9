//! Suite file discovery and loading
//!
//! A suite file is a JSON array of groups in the JSON-Schema-Test-Suite
//! shape. Its category is the directory it sits in relative to the corpus
//! root, and a category named after a draft (`draft7`, `draft2020-12`, ...)
//! selects that dialect for schemas without `$schema`.

use crate::{GoldenError, Result};
use schemata_core::dialect::standard;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories below the corpus root that never hold suites
const RESERVED_DIRS: &[&str] = &["remotes", "snapshots"];

/// One instance and its expected validity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub description: String,

    /// The instance
    pub data: Value,

    pub valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A schema and the instances checked against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestGroup {
    pub description: String,

    pub schema: Value,

    pub tests: Vec<TestCase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A loaded suite file
#[derive(Debug, Clone)]
pub struct SuiteFile {
    /// File stem
    pub name: String,

    /// Directory relative to the corpus root, `/`-separated
    pub category: String,

    pub path: PathBuf,

    pub groups: Vec<TestGroup>,
}

impl SuiteFile {
    /// `category/name`, also the suite's snapshot name
    pub fn id(&self) -> String {
        if self.category.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.category, self.name)
        }
    }

    /// Dialect implied by the category, if it names a draft
    pub fn dialect(&self) -> Option<&'static str> {
        let draft = self.category.split('/').next().unwrap_or_default();
        match draft {
            "draft6" => Some(standard::DRAFT_06),
            "draft7" => Some(standard::DRAFT_07),
            "draft2019-09" => Some(standard::DRAFT_2019_09),
            "draft2020-12" => Some(standard::DRAFT_2020_12),
            _ => None,
        }
    }

    pub fn test_count(&self) -> usize {
        self.groups.iter().map(|group| group.tests.len()).sum()
    }
}

/// Manages the suite corpus
pub struct CorpusManager {
    corpus_dir: PathBuf,
}

impl CorpusManager {
    pub fn new(corpus_dir: impl AsRef<Path>) -> Self {
        Self {
            corpus_dir: corpus_dir.as_ref().to_path_buf(),
        }
    }

    /// Discover every suite file below the corpus root, sorted by id
    pub fn discover_suites(&self) -> Result<Vec<SuiteFile>> {
        let mut suites = Vec::new();

        if !self.corpus_dir.exists() {
            return Ok(suites);
        }

        let walker = WalkDir::new(&self.corpus_dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() != 1
                    || !entry.file_type().is_dir()
                    || !RESERVED_DIRS.iter().any(|reserved| entry.file_name() == *reserved)
            });

        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.load_suite(path) {
                Ok(suite) => suites.push(suite),
                Err(e) => eprintln!("Warning: Failed to load suite {:?}: {}", path, e),
            }
        }

        suites.sort_by_key(SuiteFile::id);
        Ok(suites)
    }

    /// Load one suite file
    pub fn load_suite(&self, path: &Path) -> Result<SuiteFile> {
        let content = fs::read_to_string(path)?;
        let groups: Vec<TestGroup> = serde_json::from_str(&content)?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GoldenError::CorpusError(format!("Suite path has no file name: {:?}", path)))?
            .to_string();
        let category = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.corpus_dir).ok())
            .map(|relative| {
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();

        Ok(SuiteFile {
            name,
            category,
            path: path.to_path_buf(),
            groups,
        })
    }

    /// Load a suite by its `category/name` id
    pub fn load_by_id(&self, id: &str) -> Result<SuiteFile> {
        let path = self.corpus_dir.join(format!("{}.json", id));
        if !path.exists() {
            return Err(GoldenError::CorpusError(format!("Suite '{}' not found at {:?}", id, path)));
        }
        self.load_suite(&path)
    }

    /// Filter suites by category prefix
    pub fn filter_by_category(&self, suites: Vec<SuiteFile>, category: &str) -> Vec<SuiteFile> {
        suites
            .into_iter()
            .filter(|s| category == "*" || s.category == category || s.category.starts_with(&format!("{}/", category)))
            .collect()
    }

    /// Create the corpus layout with a sample suite
    pub fn init_corpus(&self) -> Result<()> {
        for dir in ["draft7", "draft2019-09", "draft2020-12", "output", "remotes"] {
            fs::create_dir_all(self.corpus_dir.join(dir))?;
        }
        self.create_sample_suite()
    }

    fn create_sample_suite(&self) -> Result<()> {
        let groups = vec![TestGroup {
            description: "integer type".to_string(),
            schema: serde_json::json!({"type": "integer"}),
            tests: vec![
                TestCase {
                    description: "an integer is an integer".to_string(),
                    data: serde_json::json!(1),
                    valid: true,
                    comment: None,
                },
                TestCase {
                    description: "a string is not an integer".to_string(),
                    data: serde_json::json!("foo"),
                    valid: false,
                    comment: None,
                },
            ],
            comment: None,
        }];
        let path = self.corpus_dir.join("draft2020-12/sample.json");
        fs::write(path, serde_json::to_string_pretty(&groups)?)?;
        Ok(())
    }

    /// Categories holding at least one suite
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = self.discover_suites()?.into_iter().map(|s| s.category).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    /// Get statistics about the corpus
    pub fn get_statistics(&self) -> Result<CorpusStatistics> {
        let suites = self.discover_suites()?;

        let mut stats = CorpusStatistics {
            total_suites: suites.len(),
            ..Default::default()
        };

        for suite in suites {
            stats.total_groups += suite.groups.len();
            stats.total_tests += suite.test_count();
            *stats.tests_by_category.entry(suite.category.clone()).or_insert(0) += suite.test_count();
        }

        Ok(stats)
    }
}

/// Statistics about the corpus
#[derive(Debug, Default)]
pub struct CorpusStatistics {
    pub total_suites: usize,
    pub total_groups: usize,
    pub total_tests: usize,
    pub tests_by_category: BTreeMap<String, usize>,
}

impl CorpusStatistics {
    /// Print statistics to stdout
    pub fn print(&self) {
        println!("=== Corpus Statistics ===");
        println!("Suites: {}", self.total_suites);
        println!("Groups: {}", self.total_groups);
        println!("Tests: {}", self.total_tests);

        if !self.tests_by_category.is_empty() {
            println!("\nTests by category:");
            for (category, count) in &self.tests_by_category {
                println!("  {}: {}", category, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_corpus_manager_init() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());

        manager.init_corpus().unwrap();

        assert!(temp_dir.path().join("draft7").exists());
        assert!(temp_dir.path().join("remotes").exists());
        assert!(temp_dir.path().join("draft2020-12/sample.json").exists());
    }

    #[test]
    fn test_discover_suites_skips_reserved_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());
        manager.init_corpus().unwrap();
        fs::write(temp_dir.path().join("remotes/integer.json"), r#"{"type": "integer"}"#).unwrap();

        let suites = manager.discover_suites().unwrap();
        assert_eq!(suites.len(), 1);
        assert_eq!(suites[0].id(), "draft2020-12/sample");
        assert_eq!(suites[0].dialect(), Some(standard::DRAFT_2020_12));
        assert_eq!(suites[0].test_count(), 2);
    }

    #[test]
    fn test_load_by_id_and_statistics() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());
        manager.init_corpus().unwrap();

        let suite = manager.load_by_id("draft2020-12/sample").unwrap();
        assert_eq!(suite.groups[0].description, "integer type");
        assert!(manager.load_by_id("draft7/absent").is_err());

        let stats = manager.get_statistics().unwrap();
        assert_eq!(stats.total_suites, 1);
        assert_eq!(stats.total_tests, 2);
        assert_eq!(manager.list_categories().unwrap(), vec!["draft2020-12".to_string()]);
    }

    #[test]
    fn test_filter_by_category() {
        let suite = |category: &str| SuiteFile {
            name: "s".to_string(),
            category: category.to_string(),
            path: PathBuf::new(),
            groups: Vec::new(),
        };
        let manager = CorpusManager::new(".");
        let filtered = manager.filter_by_category(vec![suite("draft7"), suite("draft7/optional"), suite("output")], "draft7");
        assert_eq!(filtered.len(), 2);
        assert_eq!(manager.filter_by_category(vec![suite("output")], "*").len(), 1);
    }
}
