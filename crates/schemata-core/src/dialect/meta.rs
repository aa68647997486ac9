//! Embedded meta-schema documents
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use serde_json::Value;
use std::sync::Arc;

const DOCUMENTS: &[(&str, &str)] = &[
    (
        "http://json-schema.org/draft-06/schema",
        include_str!("../../meta/draft-06/schema.json"),
    ),
    (
        "http://json-schema.org/draft-07/schema",
        include_str!("../../meta/draft-07/schema.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/schema",
        include_str!("../../meta/2019-09/schema.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/core",
        include_str!("../../meta/2019-09/meta/core.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/applicator",
        include_str!("../../meta/2019-09/meta/applicator.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/validation",
        include_str!("../../meta/2019-09/meta/validation.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/meta-data",
        include_str!("../../meta/2019-09/meta/meta-data.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/format",
        include_str!("../../meta/2019-09/meta/format.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/content",
        include_str!("../../meta/2019-09/meta/content.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/schema",
        include_str!("../../meta/2020-12/schema.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/core",
        include_str!("../../meta/2020-12/meta/core.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/applicator",
        include_str!("../../meta/2020-12/meta/applicator.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/unevaluated",
        include_str!("../../meta/2020-12/meta/unevaluated.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/validation",
        include_str!("../../meta/2020-12/meta/validation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/meta-data",
        include_str!("../../meta/2020-12/meta/meta-data.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-annotation",
        include_str!("../../meta/2020-12/meta/format-annotation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-assertion",
        include_str!("../../meta/2020-12/meta/format-assertion.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/content",
        include_str!("../../meta/2020-12/meta/content.json"),
    ),
];

/// The embedded meta-schema for a base URI, parsed on each call
pub fn document(base: &str) -> Option<Result<Arc<Value>, serde_json::Error>> {
    let base = base.strip_suffix('#').unwrap_or(base);
    DOCUMENTS
        .iter()
        .find(|(uri, _)| *uri == base)
        .map(|(_, text)| serde_json::from_str(text).map(Arc::new))
}

/// Base URIs of every embedded meta-schema
pub fn uris() -> impl Iterator<Item = &'static str> {
    DOCUMENTS.iter().map(|(uri, _)| *uri)
}
