//! `format` and the named format checkers behind it
//!
//! `format` always annotates. It only asserts under the format-assertion
//! vocabulary or when evaluation options require it, and an unknown format
//! name always passes.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::error::ResolutionError;
use crate::evaluate::EvalContext;
use crate::keyword::{KeywordHandler, KeywordNode, KeywordOutcome};
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, RwLock};
use url::Url;

/// A format checker
pub type FormatCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Named format checkers, shared by every dialect of a vocabulary registry
pub struct FormatRegistry {
    checks: RwLock<HashMap<String, FormatCheck>>,
}

impl FormatRegistry {
    /// A registry with the built-in formats
    pub fn new() -> Self {
        let registry = Self::empty();
        for (name, check) in BUILTIN {
            registry.register(name, *check);
        }
        registry
    }

    /// A registry without any formats
    pub fn empty() -> Self {
        Self {
            checks: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace a format checker
    pub fn register<F>(&self, name: &str, check: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let mut checks = self.checks.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        checks.insert(name.to_string(), Arc::new(check));
    }

    /// Whether a checker is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Check `value` against a named format; `None` for unknown formats
    pub fn check(&self, name: &str, value: &str) -> Option<bool> {
        self.get(name).map(|check| check(value))
    }

    fn get(&self, name: &str) -> Option<FormatCheck> {
        let checks = self.checks.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        checks.get(name).cloned()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let checks = self.checks.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<&String> = checks.keys().collect();
        names.sort();
        f.debug_struct("FormatRegistry").field("formats", &names).finish()
    }
}

/// `format`
#[derive(Debug)]
pub struct FormatKeyword {
    assert: bool,
}

impl FormatKeyword {
    /// Annotation-only `format` (2019-09, 2020-12 format-annotation)
    pub fn annotation() -> Self {
        Self { assert: false }
    }

    /// Asserting `format` (2020-12 format-assertion)
    pub fn assertion() -> Self {
        Self { assert: true }
    }
}

impl KeywordHandler for FormatKeyword {
    fn name(&self) -> &str {
        "format"
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let annotation = node.raw().clone();
        if !self.assert && !ctx.options().require_format_validation {
            return Ok(KeywordOutcome::pass().with_annotation(annotation));
        }
        let (Some(format), Some(text)) = (node.raw().as_str(), ctx.instance().as_str()) else {
            return Ok(KeywordOutcome::pass().with_annotation(annotation));
        };
        let valid = ctx.registry().vocabularies().formats().check(format, text).unwrap_or(true);
        if !valid {
            tracing::debug!(format, "value does not match format");
        }
        Ok(KeywordOutcome::check(valid, || ctx.message("format", &[("format", format.to_string())]))
            .with_annotation(annotation))
    }
}

const BUILTIN: &[(&str, fn(&str) -> bool)] = &[
    ("date-time", is_date_time),
    ("date", is_date),
    ("time", is_time),
    ("duration", is_duration),
    ("email", is_email),
    ("idn-email", is_email),
    ("hostname", is_hostname),
    ("idn-hostname", is_idn_hostname),
    ("ipv4", is_ipv4),
    ("ipv6", is_ipv6),
    ("uri", is_uri),
    ("iri", is_uri),
    ("uri-reference", is_uri_reference),
    ("iri-reference", is_uri_reference),
    ("uri-template", is_uri_template),
    ("uuid", is_uuid),
    ("regex", is_regex),
    ("json-pointer", is_json_pointer),
    ("relative-json-pointer", is_relative_json_pointer),
];

fn is_date_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

fn is_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_time(value: &str) -> bool {
    // chrono only parses full timestamps
    DateTime::parse_from_rfc3339(&format!("1970-01-01T{}", value)).is_ok()
}

/// ISO 8601 durations: `P3D`, `PT1H30M`, `P2W`
fn is_duration(value: &str) -> bool {
    let Some(rest) = value.strip_prefix('P') else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    if let Some(weeks) = rest.strip_suffix('W') {
        return !weeks.is_empty() && weeks.bytes().all(|b| b.is_ascii_digit());
    }
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return false;
            }
            (date, Some(time))
        }
        None => (rest, None),
    };
    components_in_order(date, &['Y', 'M', 'D']) && time.map_or(true, |time| components_in_order(time, &['H', 'M', 'S']))
}

/// `<digits><unit>` pairs with units in the given order, each at most once
fn components_in_order(text: &str, units: &[char]) -> bool {
    let mut next = 0;
    let mut digits = 0;
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits += 1;
            continue;
        }
        let Some(position) = units[next..].iter().position(|unit| *unit == c) else {
            return false;
        };
        if digits == 0 {
            return false;
        }
        next += position + 1;
        digits = 0;
    }
    digits == 0
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        return literal.parse::<Ipv4Addr>().is_ok()
            || literal.strip_prefix("IPv6:").is_some_and(|ip| ip.parse::<Ipv6Addr>().is_ok());
    }
    !domain.starts_with('.') && !domain.ends_with('.') && !domain.contains("..")
}

fn is_hostname(value: &str) -> bool {
    let value = value.strip_suffix('.').unwrap_or(value);
    !value.is_empty()
        && value.len() <= 253
        && value.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

fn is_idn_hostname(value: &str) -> bool {
    let value = value.strip_suffix('.').unwrap_or(value);
    !value.is_empty()
        && value.split('.').all(|label| {
            !label.is_empty()
                && label.chars().count() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

fn is_ipv4(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

fn is_uri(value: &str) -> bool {
    !value.contains(char::is_whitespace) && Url::parse(value).is_ok()
}

fn is_uri_reference(value: &str) -> bool {
    if value.contains(char::is_whitespace) || value.contains('\\') {
        return false;
    }
    let Ok(base) = Url::parse("https://reference.invalid/") else {
        return false;
    };
    base.join(value).is_ok()
}

fn is_uri_template(value: &str) -> bool {
    let mut open = false;
    for c in value.chars() {
        match c {
            '{' if open => return false,
            '{' => open = true,
            '}' if !open => return false,
            '}' => open = false,
            _ => {}
        }
    }
    !open
}

fn is_uuid(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 36
        && [8, 13, 18, 23].iter().all(|index| bytes[*index] == b'-')
        && uuid::Uuid::parse_str(value).is_ok()
}

fn is_regex(value: &str) -> bool {
    Regex::new(value).is_ok()
}

fn is_json_pointer(value: &str) -> bool {
    (value.is_empty() || value.starts_with('/')) && escapes_are_valid(value)
}

/// `~` is only followed by `0` or `1`
fn escapes_are_valid(value: &str) -> bool {
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0') | Some('1')) {
            return false;
        }
    }
    true
}

/// `<non-negative integer>` then `#` or a JSON pointer
fn is_relative_json_pointer(value: &str) -> bool {
    let digits = value.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && value.starts_with('0')) {
        return false;
    }
    let rest = &value[digits..];
    rest == "#" || is_json_pointer(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_formats() {
        let formats = FormatRegistry::new();
        let cases = [
            ("date-time", "2024-02-29T10:00:00Z", true),
            ("date-time", "2024-02-29 10:00:00", false),
            ("date", "2024-02-29", true),
            ("date", "2023-02-29", false),
            ("time", "23:59:59+01:00", true),
            ("time", "25:00:00Z", false),
            ("duration", "P1Y2M3DT4H5M6S", true),
            ("duration", "PT", false),
            ("duration", "P2W", true),
            ("duration", "P1D2Y", false),
            ("email", "joe.bloggs@example.com", true),
            ("email", "joe..bloggs@example.com", false),
            ("hostname", "www.example.com", true),
            ("hostname", "-bad-.example", false),
            ("ipv4", "192.168.0.1", true),
            ("ipv4", "256.1.1.1", false),
            ("ipv6", "::1", true),
            ("ipv6", "12345::", false),
            ("uri", "https://example.com/a?b#c", true),
            ("uri", "//example.com", false),
            ("uri-reference", "../relative#frag", true),
            ("uri-reference", "\\\\WINDOWS\\share", false),
            ("uri-template", "http://example.com/{id}", true),
            ("uri-template", "http://example.com/{id", false),
            ("uuid", "2eb8aa08-aa98-11ea-b4aa-73b441d16380", true),
            ("uuid", "2eb8aa08aa9811eab4aa73b441d16380", false),
            ("regex", "^[a-z]+$", true),
            ("regex", "(unclosed", false),
            ("json-pointer", "/a~1b/c~0", true),
            ("json-pointer", "/a~2", false),
            ("relative-json-pointer", "1/foo", true),
            ("relative-json-pointer", "0#", true),
            ("relative-json-pointer", "01/a", false),
        ];
        for (format, value, expected) in cases {
            assert_eq!(formats.check(format, value), Some(expected), "{} {:?}", format, value);
        }
    }

    #[test]
    fn test_unknown_format_is_none() {
        assert_eq!(FormatRegistry::new().check("no-such-format", "x"), None);
    }

    #[test]
    fn test_register_replaces_builtin() {
        let formats = FormatRegistry::new();
        formats.register("ipv4", |value| value == "localhost");
        assert_eq!(formats.check("ipv4", "localhost"), Some(true));
        assert_eq!(formats.check("ipv4", "127.0.0.1"), Some(false));
        assert!(!FormatRegistry::empty().contains("ipv4"));
    }
}
