//! The standard vocabularies and dialects: draft-06, draft-07, 2019-09 and 2020-12
//!
//! Every handler is created once per registry and shared by all vocabularies
//! that list it, so two dialects agree on a keyword exactly when they hold
//! the same handler.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use super::{Dialect, Vocabulary, VocabularyRegistry};
use crate::keyword::KeywordHandler;
use crate::keywords::applicator::{
    AllOfKeyword, AnyOfKeyword, DependenciesKeyword, DependentSchemasKeyword, ElseKeyword, IfKeyword, NotKeyword,
    OneOfKeyword, ThenKeyword,
};
use crate::keywords::array::{AdditionalItemsKeyword, ContainsKeyword, ItemsKeyword, LegacyItemsKeyword, PrefixItemsKeyword};
use crate::keywords::content::ContentSchemaKeyword;
use crate::keywords::format::FormatKeyword;
use crate::keywords::identifiers::{
    AnchorKeyword, CommentKeyword, DefinitionsKeyword, DynamicAnchorKeyword, IdKeyword, RecursiveAnchorKeyword,
    SchemaKeyword, VocabularyKeyword,
};
use crate::keywords::object::{AdditionalPropertiesKeyword, PatternPropertiesKeyword, PropertiesKeyword, PropertyNamesKeyword};
use crate::keywords::reference::{DynamicRefKeyword, RecursiveRefKeyword, RefKeyword};
use crate::keywords::unevaluated::{UnevaluatedItemsKeyword, UnevaluatedPropertiesKeyword};
use crate::keywords::validation::{
    Bound, ConstKeyword, ContainsBoundKeyword, CountKeyword, Counted, DependentRequiredKeyword, EnumKeyword,
    LengthKeyword, MultipleOfKeyword, NumericBoundKeyword, PatternKeyword, RequiredKeyword, TypeKeyword,
    UniqueItemsKeyword,
};
use crate::keywords::AnnotationKeyword;
use std::sync::Arc;

pub const DRAFT_06: &str = "http://json-schema.org/draft-06/schema";
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema";
pub const DRAFT_2019_09: &str = "https://json-schema.org/draft/2019-09/schema";
pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

pub const VOCAB_CORE: &str = "https://json-schema.org/draft/2020-12/vocab/core";
pub const VOCAB_APPLICATOR: &str = "https://json-schema.org/draft/2020-12/vocab/applicator";
pub const VOCAB_UNEVALUATED: &str = "https://json-schema.org/draft/2020-12/vocab/unevaluated";
pub const VOCAB_VALIDATION: &str = "https://json-schema.org/draft/2020-12/vocab/validation";
pub const VOCAB_META_DATA: &str = "https://json-schema.org/draft/2020-12/vocab/meta-data";
pub const VOCAB_FORMAT_ANNOTATION: &str = "https://json-schema.org/draft/2020-12/vocab/format-annotation";
pub const VOCAB_FORMAT_ASSERTION: &str = "https://json-schema.org/draft/2020-12/vocab/format-assertion";
pub const VOCAB_CONTENT: &str = "https://json-schema.org/draft/2020-12/vocab/content";

pub const VOCAB_2019_CORE: &str = "https://json-schema.org/draft/2019-09/vocab/core";
pub const VOCAB_2019_APPLICATOR: &str = "https://json-schema.org/draft/2019-09/vocab/applicator";
pub const VOCAB_2019_VALIDATION: &str = "https://json-schema.org/draft/2019-09/vocab/validation";
pub const VOCAB_2019_META_DATA: &str = "https://json-schema.org/draft/2019-09/vocab/meta-data";
pub const VOCAB_2019_FORMAT: &str = "https://json-schema.org/draft/2019-09/vocab/format";
pub const VOCAB_2019_CONTENT: &str = "https://json-schema.org/draft/2019-09/vocab/content";

/// Pseudo-vocabularies for the drafts that predate `$vocabulary`
pub const VOCAB_DRAFT_06: &str = "https://schemata.dev/vocab/draft-06";
pub const VOCAB_DRAFT_07: &str = "https://schemata.dev/vocab/draft-07";

fn shared(handler: impl KeywordHandler + 'static) -> Arc<dyn KeywordHandler> {
    Arc::new(handler)
}

/// Register the standard vocabularies and dialects and make 2020-12 the default
pub(crate) fn install(registry: &VocabularyRegistry) {
    // Core
    let schema = shared(SchemaKeyword);
    let vocabulary = shared(VocabularyKeyword);
    let id = shared(IdKeyword);
    let anchor = shared(AnchorKeyword);
    let dynamic_anchor = shared(DynamicAnchorKeyword);
    let recursive_anchor = shared(RecursiveAnchorKeyword);
    let reference = shared(RefKeyword);
    let dynamic_ref = shared(DynamicRefKeyword);
    let recursive_ref = shared(RecursiveRefKeyword);
    let defs = shared(DefinitionsKeyword::new("$defs"));
    let definitions = shared(DefinitionsKeyword::new("definitions"));
    let comment = shared(CommentKeyword);

    // Applicators
    let all_of = shared(AllOfKeyword);
    let any_of = shared(AnyOfKeyword);
    let one_of = shared(OneOfKeyword);
    let not = shared(NotKeyword);
    let if_ = shared(IfKeyword);
    let then = shared(ThenKeyword);
    let else_ = shared(ElseKeyword);
    let dependent_schemas = shared(DependentSchemasKeyword);
    let dependencies = shared(DependenciesKeyword);
    let properties = shared(PropertiesKeyword);
    let pattern_properties = shared(PatternPropertiesKeyword);
    let additional_properties = shared(AdditionalPropertiesKeyword);
    let property_names = shared(PropertyNamesKeyword);
    let prefix_items = shared(PrefixItemsKeyword);
    let items = shared(ItemsKeyword);
    let legacy_items = shared(LegacyItemsKeyword);
    let additional_items = shared(AdditionalItemsKeyword);
    let contains = shared(ContainsKeyword::new(true, true));
    let contains_2019 = shared(ContainsKeyword::new(true, false));
    let contains_legacy = shared(ContainsKeyword::new(false, false));
    let unevaluated_items = shared(UnevaluatedItemsKeyword);
    let unevaluated_properties = shared(UnevaluatedPropertiesKeyword);

    // Validation
    let type_ = shared(TypeKeyword);
    let enum_ = shared(EnumKeyword);
    let const_ = shared(ConstKeyword);
    let multiple_of = shared(MultipleOfKeyword);
    let maximum = shared(NumericBoundKeyword::new(Bound::Maximum));
    let exclusive_maximum = shared(NumericBoundKeyword::new(Bound::ExclusiveMaximum));
    let minimum = shared(NumericBoundKeyword::new(Bound::Minimum));
    let exclusive_minimum = shared(NumericBoundKeyword::new(Bound::ExclusiveMinimum));
    let max_length = shared(LengthKeyword::new(true));
    let min_length = shared(LengthKeyword::new(false));
    let pattern = shared(PatternKeyword);
    let max_items = shared(CountKeyword::new(Counted::Items, true));
    let min_items = shared(CountKeyword::new(Counted::Items, false));
    let unique_items = shared(UniqueItemsKeyword);
    let max_contains = shared(ContainsBoundKeyword::new(true));
    let min_contains = shared(ContainsBoundKeyword::new(false));
    let max_properties = shared(CountKeyword::new(Counted::Properties, true));
    let min_properties = shared(CountKeyword::new(Counted::Properties, false));
    let required = shared(RequiredKeyword);
    let dependent_required = shared(DependentRequiredKeyword);

    // Meta-data, format and content
    let title = shared(AnnotationKeyword::new("title"));
    let description = shared(AnnotationKeyword::new("description"));
    let default = shared(AnnotationKeyword::new("default"));
    let deprecated = shared(AnnotationKeyword::new("deprecated"));
    let read_only = shared(AnnotationKeyword::new("readOnly"));
    let write_only = shared(AnnotationKeyword::new("writeOnly"));
    let examples = shared(AnnotationKeyword::new("examples"));
    let format_annotation = shared(FormatKeyword::annotation());
    let format_assertion = shared(FormatKeyword::assertion());
    let content_encoding = shared(AnnotationKeyword::new("contentEncoding"));
    let content_media_type = shared(AnnotationKeyword::new("contentMediaType"));
    let content_schema = shared(ContentSchemaKeyword);

    let validation = [
        &type_,
        &const_,
        &enum_,
        &multiple_of,
        &maximum,
        &exclusive_maximum,
        &minimum,
        &exclusive_minimum,
        &max_length,
        &min_length,
        &pattern,
        &max_items,
        &min_items,
        &unique_items,
        &max_contains,
        &min_contains,
        &max_properties,
        &min_properties,
        &required,
        &dependent_required,
    ];
    let meta_data = [&title, &description, &default, &deprecated, &read_only, &write_only, &examples];
    let content = [&content_encoding, &content_media_type, &content_schema];

    // 2020-12
    let core_2020 = registry.register_vocabulary(vocab(
        VOCAB_CORE,
        [
            &schema,
            &vocabulary,
            &id,
            &anchor,
            &dynamic_anchor,
            &reference,
            &dynamic_ref,
            &defs,
            &comment,
        ],
    ));
    let applicator_2020 = registry.register_vocabulary(vocab(
        VOCAB_APPLICATOR,
        [
            &prefix_items,
            &items,
            &contains,
            &additional_properties,
            &properties,
            &pattern_properties,
            &dependent_schemas,
            &property_names,
            &if_,
            &then,
            &else_,
            &all_of,
            &any_of,
            &one_of,
            &not,
        ],
    ));
    let unevaluated_2020 =
        registry.register_vocabulary(vocab(VOCAB_UNEVALUATED, [&unevaluated_items, &unevaluated_properties]));
    let validation_2020 = registry.register_vocabulary(vocab(VOCAB_VALIDATION, validation));
    let meta_data_2020 = registry.register_vocabulary(vocab(VOCAB_META_DATA, meta_data));
    let format_2020 = registry.register_vocabulary(vocab(VOCAB_FORMAT_ANNOTATION, [&format_annotation]));
    registry.register_vocabulary(vocab(VOCAB_FORMAT_ASSERTION, [&format_assertion]));
    let content_2020 = registry.register_vocabulary(vocab(VOCAB_CONTENT, content));

    registry.register_dialect(
        Dialect::builder(DRAFT_2020_12)
            .vocabulary(core_2020)
            .vocabulary(applicator_2020)
            .vocabulary(unevaluated_2020)
            .vocabulary(validation_2020)
            .vocabulary(meta_data_2020)
            .vocabulary(format_2020)
            .vocabulary(content_2020)
            .build(),
    );

    // 2019-09
    let core_2019 = registry.register_vocabulary(vocab(
        VOCAB_2019_CORE,
        [
            &schema,
            &vocabulary,
            &id,
            &anchor,
            &recursive_anchor,
            &reference,
            &recursive_ref,
            &defs,
            &comment,
        ],
    ));
    let applicator_2019 = registry.register_vocabulary(vocab(
        VOCAB_2019_APPLICATOR,
        [
            &additional_items,
            &unevaluated_items,
            &legacy_items,
            &contains_2019,
            &additional_properties,
            &unevaluated_properties,
            &properties,
            &pattern_properties,
            &dependent_schemas,
            &property_names,
            &if_,
            &then,
            &else_,
            &all_of,
            &any_of,
            &one_of,
            &not,
        ],
    ));
    let validation_2019 = registry.register_vocabulary(vocab(VOCAB_2019_VALIDATION, validation));
    let meta_data_2019 = registry.register_vocabulary(vocab(VOCAB_2019_META_DATA, meta_data));
    let format_2019 = registry.register_vocabulary(vocab(VOCAB_2019_FORMAT, [&format_annotation]));
    let content_2019 = registry.register_vocabulary(vocab(VOCAB_2019_CONTENT, content));

    registry.register_dialect(
        Dialect::builder(DRAFT_2019_09)
            .vocabulary(core_2019)
            .vocabulary(applicator_2019)
            .vocabulary(validation_2019)
            .vocabulary(meta_data_2019)
            .vocabulary(format_2019)
            .vocabulary(content_2019)
            .build(),
    );

    // draft-07 and draft-06 share everything except comments, conditionals
    // and a few annotations
    let draft_06_keywords = [
        &schema,
        &id,
        &reference,
        &definitions,
        &title,
        &description,
        &default,
        &examples,
        &multiple_of,
        &maximum,
        &exclusive_maximum,
        &minimum,
        &exclusive_minimum,
        &max_length,
        &min_length,
        &pattern,
        &additional_items,
        &legacy_items,
        &max_items,
        &min_items,
        &unique_items,
        &contains_legacy,
        &max_properties,
        &min_properties,
        &required,
        &additional_properties,
        &properties,
        &pattern_properties,
        &dependencies,
        &property_names,
        &const_,
        &enum_,
        &type_,
        &format_annotation,
        &all_of,
        &any_of,
        &one_of,
        &not,
    ];
    let draft_07_extra = [
        &comment,
        &if_,
        &then,
        &else_,
        &read_only,
        &write_only,
        &content_encoding,
        &content_media_type,
    ];

    let draft_06 = registry.register_vocabulary(vocab(VOCAB_DRAFT_06, draft_06_keywords));
    let draft_07 = registry.register_vocabulary(vocab(
        VOCAB_DRAFT_07,
        draft_06_keywords.into_iter().chain(draft_07_extra),
    ));
    for (uri, vocabulary) in [(DRAFT_06, draft_06), (DRAFT_07, draft_07)] {
        registry.register_dialect(
            Dialect::builder(uri)
                .vocabulary(vocabulary)
                .ref_overrides_siblings(true)
                .legacy_id_anchors(true)
                .build(),
        );
    }

    // A freshly created registry always has this dialect
    let _ = registry.set_default_dialect(DRAFT_2020_12);
}

fn vocab<'h>(id: &str, handlers: impl IntoIterator<Item = &'h Arc<dyn KeywordHandler>>) -> Vocabulary {
    handlers
        .into_iter()
        .fold(Vocabulary::new(id), |vocabulary, handler| vocabulary.with_keyword(handler.clone()))
}
