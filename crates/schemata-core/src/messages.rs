//! Localizable error message templates
//!
//! Templates use `{name}` placeholders. Lookup falls back from the full
//! culture (`fr-CA`) to its language (`fr`) and then to English, one key at a
//! time, so partial catalogs are fine.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Culture every lookup finally falls back to
pub const DEFAULT_CULTURE: &str = "en";

const ENGLISH: &[(&str, &str)] = &[
    ("false-schema", "All values fail against the false schema"),
    ("type", "Value is {received} but should be {expected}"),
    ("enum", "Value should match one of the values specified by the enum"),
    ("const", "Expected {expected}"),
    ("minimum", "{received} is less than {limit}"),
    ("exclusiveMinimum", "{received} is less than or equal to {limit}"),
    ("maximum", "{received} is greater than {limit}"),
    ("exclusiveMaximum", "{received} is greater than or equal to {limit}"),
    ("multipleOf", "{received} is not a multiple of {divisor}"),
    ("minLength", "Value should be at least {limit} characters"),
    ("maxLength", "Value should be at most {limit} characters"),
    ("pattern", "The string value does not match the required regular expression {pattern}"),
    ("minItems", "Value should have at least {limit} items"),
    ("maxItems", "Value should have at most {limit} items"),
    ("uniqueItems", "Found duplicates at indices {first} and {second}"),
    ("contains", "No items match the contains schema"),
    ("minContains", "Value should contain at least {limit} matching items, found {received}"),
    ("maxContains", "Value should contain at most {limit} matching items, found {received}"),
    ("minProperties", "Value should have at least {limit} properties"),
    ("maxProperties", "Value should have at most {limit} properties"),
    ("required", "Required properties {missing} are not present"),
    ("dependentRequired", "Property {property} requires properties {missing}"),
    ("format", "Value does not match format \"{format}\""),
    ("oneOf", "Expected exactly one matching subschema but found {received}"),
    ("not", "Value should not validate against the schema in \"not\""),
];

/// Message templates per culture
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    cultures: HashMap<String, HashMap<String, String>>,
}

impl MessageCatalog {
    /// A catalog with the built-in English templates
    pub fn new() -> Self {
        let english = ENGLISH
            .iter()
            .map(|(key, template)| (key.to_string(), template.to_string()))
            .collect();
        let mut cultures = HashMap::new();
        cultures.insert(DEFAULT_CULTURE.to_string(), english);
        Self { cultures }
    }

    /// The process-wide default catalog
    pub fn shared() -> Arc<MessageCatalog> {
        static SHARED: OnceLock<Arc<MessageCatalog>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(MessageCatalog::new())).clone()
    }

    /// Add or replace templates for a culture
    pub fn with_messages<I, K, V>(mut self, culture: &str, messages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entry = self.cultures.entry(culture.to_lowercase()).or_default();
        for (key, template) in messages {
            entry.insert(key.into(), template.into());
        }
        self
    }

    /// The raw template for `key`, with culture fallback
    pub fn template(&self, culture: &str, key: &str) -> Option<&str> {
        let culture = culture.to_lowercase();
        let language = culture.split(['-', '_']).next().unwrap_or_default();
        let found = [culture.as_str(), language, DEFAULT_CULTURE]
            .into_iter()
            .filter_map(|candidate| self.cultures.get(candidate))
            .find_map(|messages| messages.get(key))
            .map(String::as_str);
        found
    }

    /// Render `key` with `{name}` placeholders replaced
    pub fn format(&self, culture: &str, key: &str, args: &[(&str, String)]) -> String {
        let Some(template) = self.template(culture, key) else {
            return key.to_string();
        };
        args.iter().fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new()
    }
}
