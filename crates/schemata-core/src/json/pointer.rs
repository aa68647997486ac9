//! JSON Pointer (RFC 6901) used for instance locations, evaluation paths and
//! reference fragments
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A parsed JSON pointer
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The empty pointer, addressing the whole document
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a pointer string such as `/properties/a~1b`
    ///
    /// Returns `None` when the text is neither empty nor starts with `/`.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return Some(Self::root());
        }
        let rest = text.strip_prefix('/')?;
        let segments = rest
            .split('/')
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
            .collect();
        Some(Self { segments })
    }

    /// Build a pointer from already-decoded segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// A new pointer with one more segment
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// A new pointer with every segment of `other` appended
    pub fn extend(&self, other: &JsonPointer) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Append a segment in place
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// The decoded segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this is the root pointer
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, if any
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the pointer has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The remainder of this pointer after `prefix`, if `prefix` is a prefix
    pub fn strip_prefix(&self, prefix: &JsonPointer) -> Option<JsonPointer> {
        if self.segments.starts_with(&prefix.segments) {
            Some(Self {
                segments: self.segments[prefix.segments.len()..].to_vec(),
            })
        } else {
            None
        }
    }

    /// Resolve this pointer inside `document`
    pub fn evaluate<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(parse_index(segment)?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Array indices in pointers have no sign and no leading zeros
fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || (segment.len() > 1 && segment.starts_with('0')) {
        return None;
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<usize> for JsonPointer {
    fn from(index: usize) -> Self {
        Self::root().join(index.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_display_escapes() {
        let pointer = JsonPointer::parse("/a~1b/c~0d/0").unwrap();
        assert_eq!(pointer.segments(), &["a/b", "c~d", "0"]);
        assert_eq!(pointer.to_string(), "/a~1b/c~0d/0");
        assert!(JsonPointer::parse("no-slash").is_none());
        assert!(JsonPointer::parse("").unwrap().is_root());
    }

    #[test]
    fn test_evaluate() {
        let doc = json!({"$defs": {"foo": {"type": "integer"}}, "list": [10, 20]});
        let pointer = JsonPointer::parse("/$defs/foo/type").unwrap();
        assert_eq!(pointer.evaluate(&doc), Some(&json!("integer")));
        assert_eq!(JsonPointer::parse("/list/1").unwrap().evaluate(&doc), Some(&json!(20)));
        assert_eq!(JsonPointer::parse("/list/01").unwrap().evaluate(&doc), None);
        assert_eq!(JsonPointer::parse("/missing").unwrap().evaluate(&doc), None);
    }

    #[test]
    fn test_strip_prefix() {
        let full = JsonPointer::parse("/$defs/inner/properties/a").unwrap();
        let prefix = JsonPointer::parse("/$defs/inner").unwrap();
        assert_eq!(full.strip_prefix(&prefix).unwrap().to_string(), "/properties/a");
        assert!(prefix.strip_prefix(&full).is_none());
    }
}
