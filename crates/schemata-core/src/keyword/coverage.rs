//! Evaluated-location bookkeeping for `unevaluatedProperties`/`unevaluatedItems`
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use std::collections::BTreeSet;

/// Property names and array indices of the current instance claimed by
/// successful keywords
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    properties: BTreeSet<String>,
    all_properties: bool,
    items: BTreeSet<usize>,
    all_items: bool,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim_property(&mut self, name: impl Into<String>) {
        self.properties.insert(name.into());
    }

    pub fn claim_all_properties(&mut self) {
        self.all_properties = true;
    }

    pub fn claim_item(&mut self, index: usize) {
        self.items.insert(index);
    }

    /// Claim indices `0..count`
    pub fn claim_items_up_to(&mut self, count: usize) {
        self.items.extend(0..count);
    }

    pub fn claim_all_items(&mut self) {
        self.all_items = true;
    }

    pub fn covers_property(&self, name: &str) -> bool {
        self.all_properties || self.properties.contains(name)
    }

    pub fn covers_item(&self, index: usize) -> bool {
        self.all_items || self.items.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        !self.all_properties && !self.all_items && self.properties.is_empty() && self.items.is_empty()
    }

    /// Union with another coverage
    pub fn merge(&mut self, other: &Coverage) {
        self.all_properties |= other.all_properties;
        self.all_items |= other.all_items;
        self.properties.extend(other.properties.iter().cloned());
        self.items.extend(other.items.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_cover() {
        let mut left = Coverage::new();
        left.claim_property("a");
        left.claim_items_up_to(2);

        let mut right = Coverage::new();
        right.claim_property("b");
        right.claim_item(5);

        left.merge(&right);
        assert!(left.covers_property("a") && left.covers_property("b"));
        assert!(!left.covers_property("c"));
        assert!(left.covers_item(1) && left.covers_item(5));
        assert!(!left.covers_item(2));

        left.claim_all_items();
        assert!(left.covers_item(99));
    }
}
