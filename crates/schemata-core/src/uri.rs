//! URI handling for schema identifiers and references
//!
//! Every identifier and reference is resolved to an absolute [`Url`] and then
//! split into a fragment-free base (the registry key) and a fragment that is
//! either a JSON pointer or a plain-name anchor.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::error::SchemaError;
use crate::json::JsonPointer;
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Base used for documents that declare no `$id`
pub const DEFAULT_BASE_URI: &str = "https://schemata.local/";

/// The fragment part of a schema reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// No fragment, or an empty one: the resource root
    None,
    /// A JSON pointer fragment (`#/$defs/foo`)
    Pointer(JsonPointer),
    /// A plain-name fragment (`#foo`)
    Anchor(String),
}

/// An absolute reference split into base and fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaUri {
    pub base: String,
    pub fragment: Fragment,
}

impl SchemaUri {
    /// Split an absolute URL
    pub fn from_url(url: &Url) -> Self {
        let mut base = url.clone();
        base.set_fragment(None);
        let fragment = match url.fragment() {
            None | Some("") => Fragment::None,
            Some(raw) => {
                let decoded = percent_decode(raw);
                if decoded.starts_with('/') {
                    match JsonPointer::parse(&decoded) {
                        Some(pointer) => Fragment::Pointer(pointer),
                        None => Fragment::Anchor(decoded),
                    }
                } else {
                    Fragment::Anchor(decoded)
                }
            }
        };
        Self {
            base: base.into(),
            fragment,
        }
    }

    /// Resolve `reference` against `base` and split it
    pub fn resolve(base: &Url, reference: &str) -> Result<Self, SchemaError> {
        Ok(Self::from_url(&resolve(base, reference)?))
    }

    /// The resource root of this reference
    pub fn root(&self) -> Self {
        Self {
            base: self.base.clone(),
            fragment: Fragment::None,
        }
    }
}

impl fmt::Display for SchemaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fragment {
            Fragment::None => write!(f, "{}", self.base),
            Fragment::Pointer(pointer) => write!(f, "{}#{}", self.base, pointer),
            Fragment::Anchor(name) => write!(f, "{}#{}", self.base, name),
        }
    }
}

/// Resolve a possibly relative reference against a base URL
pub fn resolve(base: &Url, reference: &str) -> Result<Url, SchemaError> {
    base.join(reference)
        .map_err(|e| SchemaError::invalid_uri(reference, format!("cannot resolve against '{}': {}", base, e)))
}

/// Parse an absolute URI
pub fn parse_absolute(text: &str) -> Result<Url, SchemaError> {
    Url::parse(text).map_err(|e| SchemaError::invalid_uri(text, e.to_string()))
}

/// A fresh base URI for an anonymous document
pub fn generate_base(prefix: Option<&Url>) -> Result<Url, SchemaError> {
    let name = format!("schema-{}", Uuid::new_v4());
    match prefix {
        Some(prefix) => resolve(prefix, &name),
        None => parse_absolute(&format!("{}{}", DEFAULT_BASE_URI, name)),
    }
}

/// The fragment-free form of a URL, as used for registry keys
pub fn base_of(url: &Url) -> String {
    let mut base = url.clone();
    base.set_fragment(None);
    base.into()
}

/// Decode `%XX` escapes; malformed escapes are kept literally
pub fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_fragment() {
        let base = Url::parse("https://example.com/schemas/root.json").unwrap();
        let uri = SchemaUri::resolve(&base, "other.json#/$defs/a").unwrap();
        assert_eq!(uri.base, "https://example.com/schemas/other.json");
        assert_eq!(uri.fragment, Fragment::Pointer(JsonPointer::parse("/$defs/a").unwrap()));

        let anchor = SchemaUri::resolve(&base, "#item").unwrap();
        assert_eq!(anchor.base, "https://example.com/schemas/root.json");
        assert_eq!(anchor.fragment, Fragment::Anchor("item".to_string()));

        let root = SchemaUri::resolve(&base, "#").unwrap();
        assert_eq!(root.fragment, Fragment::None);
    }

    #[test]
    fn test_urn_base_accepts_fragments() {
        let base = Url::parse("urn:uuid:deadbeef-1234-ffff-ffff-4321feebdaed").unwrap();
        let uri = SchemaUri::resolve(&base, "#/$defs/bar").unwrap();
        assert_eq!(uri.base, "urn:uuid:deadbeef-1234-ffff-ffff-4321feebdaed");
    }

    #[test]
    fn test_percent_decoded_pointer() {
        let base = Url::parse("https://example.com/root.json").unwrap();
        let uri = SchemaUri::resolve(&base, "#/$defs/percent%25field").unwrap();
        assert_eq!(
            uri.fragment,
            Fragment::Pointer(JsonPointer::parse("/$defs/percent%field").unwrap())
        );
    }

    #[test]
    fn test_generated_bases_are_unique() {
        let first = generate_base(None).unwrap();
        assert_ne!(first, generate_base(None).unwrap());
        assert!(first.as_str().starts_with(DEFAULT_BASE_URI));
    }
}
