//! Structural comparison of evaluation outputs
//!
//! Outputs are compared as JSON values. Differences are reported as JSON
//! pointers plus a line diff of the pretty-printed documents. Volatile
//! members (generated base URIs, for instance) can be masked by name with a
//! regular expression before comparing.

use crate::{GoldenError, Result};
use colored::*;
use regex::Regex;
use schemata_core::JsonPointer;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeSet;

const MASK: &str = "***MASKED***";

/// Options for diff comparison
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Whether to use colored output
    pub colored: bool,

    /// Unchanged lines kept around each change
    pub context_lines: usize,

    /// Whether to normalize JSON before comparison
    pub normalize: bool,

    /// Tolerance for floating point comparison
    pub float_tolerance: f64,

    /// Maximum diff lines to show (0 = unlimited)
    pub max_diff_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            colored: true,
            context_lines: 3,
            normalize: true,
            float_tolerance: 1e-9,
            max_diff_lines: 100,
        }
    }
}

/// Result of a diff operation
#[derive(Debug)]
pub struct DiffResult {
    pub matches: bool,

    /// Human-readable diff output
    pub diff_output: String,

    pub summary: DiffSummary,
}

/// Summary of diff changes
#[derive(Debug, Default)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,

    /// Pointers to the values that differ
    pub differing_paths: Vec<String>,
}

/// Engine for comparing output documents
pub struct DiffEngine {
    options: DiffOptions,
    volatile: Vec<(String, Regex)>,
}

impl DiffEngine {
    pub fn new(options: DiffOptions) -> Self {
        Self {
            options,
            volatile: Vec::new(),
        }
    }

    /// Mask string members named `member`, at any depth, whose value matches `pattern`
    pub fn add_volatile_pattern(&mut self, member: &str, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern)
            .map_err(|e| GoldenError::CorpusError(format!("Invalid volatile pattern '{}': {}", pattern, e)))?;
        self.volatile.push((member.to_string(), regex));
        Ok(())
    }

    /// Compare two documents
    pub fn compare(&self, expected: &Value, actual: &Value) -> DiffResult {
        let prepare = |value: &Value| {
            let mut value = if self.options.normalize {
                crate::snapshot::normalize_json(value)
            } else {
                value.clone()
            };
            self.mask(&mut value);
            value
        };
        let expected = prepare(expected);
        let actual = prepare(actual);

        if self.values_match(&expected, &actual) {
            return DiffResult {
                matches: true,
                diff_output: String::new(),
                summary: DiffSummary::default(),
            };
        }

        let expected_text = pretty(&expected);
        let actual_text = pretty(&actual);
        let mut summary = DiffSummary::default();
        self.collect_paths(&expected, &actual, JsonPointer::root(), &mut summary.differing_paths);
        for change in TextDiff::from_lines(&expected_text, &actual_text).iter_all_changes() {
            match change.tag() {
                ChangeTag::Delete => summary.removed += 1,
                ChangeTag::Insert => summary.added += 1,
                ChangeTag::Equal => {}
            }
        }

        DiffResult {
            matches: false,
            diff_output: self.render(&expected_text, &actual_text),
            summary,
        }
    }

    fn values_match(&self, expected: &Value, actual: &Value) -> bool {
        match (expected, actual) {
            (Value::Object(exp), Value::Object(act)) => {
                exp.len() == act.len()
                    && exp
                        .iter()
                        .all(|(key, value)| act.get(key).is_some_and(|other| self.values_match(value, other)))
            }
            (Value::Array(exp), Value::Array(act)) => {
                exp.len() == act.len() && exp.iter().zip(act).all(|(a, b)| self.values_match(a, b))
            }
            (Value::Number(exp), Value::Number(act)) => match (exp.as_f64(), act.as_f64()) {
                (Some(a), Some(b)) if !(exp.is_i64() && act.is_i64()) => (a - b).abs() <= self.options.float_tolerance,
                _ => exp == act,
            },
            _ => expected == actual,
        }
    }

    fn collect_paths(&self, expected: &Value, actual: &Value, at: JsonPointer, paths: &mut Vec<String>) {
        match (expected, actual) {
            (Value::Object(exp), Value::Object(act)) => {
                let keys: BTreeSet<&String> = exp.keys().chain(act.keys()).collect();
                for key in keys {
                    let child = at.join(key.as_str());
                    match (exp.get(key), act.get(key)) {
                        (Some(a), Some(b)) if !self.values_match(a, b) => self.collect_paths(a, b, child, paths),
                        (Some(_), None) => paths.push(format!("{} (missing in actual)", child)),
                        (None, Some(_)) => paths.push(format!("{} (extra in actual)", child)),
                        _ => {}
                    }
                }
            }
            (Value::Array(exp), Value::Array(act)) => {
                for (index, (a, b)) in exp.iter().zip(act).enumerate() {
                    if !self.values_match(a, b) {
                        self.collect_paths(a, b, at.join(index.to_string()), paths);
                    }
                }
                if exp.len() != act.len() {
                    paths.push(format!("{} (length {} vs {})", at, exp.len(), act.len()));
                }
            }
            _ => paths.push(at.to_string()),
        }
    }

    fn mask(&self, value: &mut Value) {
        if self.volatile.is_empty() {
            return;
        }
        match value {
            Value::Object(map) => {
                for (key, member) in map.iter_mut() {
                    let volatile = match member {
                        Value::String(text) => self
                            .volatile
                            .iter()
                            .any(|(name, pattern)| name == key && pattern.is_match(text)),
                        _ => false,
                    };
                    if volatile {
                        *member = Value::String(MASK.to_string());
                    } else {
                        self.mask(member);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.mask(item)),
            _ => {}
        }
    }

    fn render(&self, expected: &str, actual: &str) -> String {
        let diff = TextDiff::from_lines(expected, actual);
        let mut output = String::new();
        if self.options.colored {
            output.push_str(&"=== Output Diff ===\n".bold().to_string());
        } else {
            output.push_str("=== Output Diff ===\n");
        }

        let mut shown = 0;
        for group in diff.grouped_ops(self.options.context_lines) {
            for op in group {
                for change in diff.iter_changes(&op) {
                    if self.options.max_diff_lines > 0 && shown >= self.options.max_diff_lines {
                        output.push_str("... (diff truncated) ...\n");
                        return output;
                    }
                    let line = match (change.tag(), self.options.colored) {
                        (ChangeTag::Delete, true) => format!("-{}", change).red().to_string(),
                        (ChangeTag::Insert, true) => format!("+{}", change).green().to_string(),
                        (ChangeTag::Delete, false) => format!("-{}", change),
                        (ChangeTag::Insert, false) => format!("+{}", change),
                        (ChangeTag::Equal, _) => format!(" {}", change),
                    };
                    output.push_str(&line);
                    shown += 1;
                }
            }
        }
        output
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn plain() -> DiffEngine {
        DiffEngine::new(DiffOptions {
            colored: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_identical_outputs_match() {
        let output = json!({"valid": false, "details": [{"keywordLocation": "/type", "instanceLocation": ""}]});
        let result = plain().compare(&output, &output.clone());
        assert!(result.matches);
        assert!(result.diff_output.is_empty());
    }

    #[test]
    fn test_float_tolerance() {
        let engine = DiffEngine::new(DiffOptions {
            float_tolerance: 0.001,
            ..Default::default()
        });
        assert!(engine.compare(&json!({"x": 0.1}), &json!({"x": 0.1004})).matches);
        assert!(!engine.compare(&json!({"x": 1}), &json!({"x": 2})).matches);
    }

    #[test]
    fn test_differing_paths_are_pointers() {
        let expected = json!({"valid": false, "details": [{"instanceLocation": "/a"}]});
        let actual = json!({"valid": false, "details": [{"instanceLocation": "/b"}], "extra": 1});
        let result = plain().compare(&expected, &actual);

        assert!(!result.matches);
        assert_eq!(
            result.summary.differing_paths,
            vec!["/details/0/instanceLocation".to_string(), "/extra (extra in actual)".to_string()]
        );
        assert!(result.diff_output.contains("-      \"instanceLocation\": \"/a\""));
        assert_eq!(result.summary.added, 2);
    }

    #[test]
    fn test_volatile_members_are_masked_at_any_depth() {
        let mut engine = plain();
        engine
            .add_volatile_pattern("absoluteKeywordLocation", r"^urn:uuid:")
            .unwrap();
        let first = json!({"details": [{"absoluteKeywordLocation": "urn:uuid:1111#/type"}]});
        let second = json!({"details": [{"absoluteKeywordLocation": "urn:uuid:2222#/type"}]});
        assert!(engine.compare(&first, &second).matches);

        let fixed = json!({"details": [{"absoluteKeywordLocation": "https://example.com/a#/type"}]});
        let other = json!({"details": [{"absoluteKeywordLocation": "https://example.com/b#/type"}]});
        assert!(!engine.compare(&fixed, &other).matches);
    }

    #[test]
    fn test_invalid_volatile_pattern() {
        assert!(plain().add_volatile_pattern("x", "(").is_err());
    }
}
