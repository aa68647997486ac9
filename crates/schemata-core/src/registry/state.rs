//! Registry tables and the staging area a build writes into
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::build::{fragment_key, ReferenceTarget, SchemaId, SchemaNode};
use crate::dialect::Dialect;
use crate::json::JsonPointer;
use crate::uri::{Fragment, SchemaUri};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub(crate) type LocationKey = (String, JsonPointer);
pub(crate) type AnchorKey = (String, String);

/// A schema resource: a subtree with its own base URI
#[derive(Debug, Clone)]
pub(crate) struct ResourceInfo {
    pub root: SchemaId,
    pub raw: Arc<Value>,
    pub dialect: Arc<Dialect>,
}

/// Committed registry contents
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    pub nodes: Vec<Arc<SchemaNode>>,
    pub locations: HashMap<LocationKey, SchemaId>,
    pub anchors: HashMap<AnchorKey, SchemaId>,
    pub dynamic_anchors: HashMap<AnchorKey, SchemaId>,
    pub recursive_anchors: HashSet<String>,
    pub resources: HashMap<String, ResourceInfo>,
    /// Raw documents registered but not necessarily built
    pub documents: HashMap<String, Arc<Value>>,
}

impl RegistryState {
    pub fn next_id(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: SchemaId) -> Option<Arc<SchemaNode>> {
        self.nodes.get(id.0).cloned()
    }

    pub fn lookup(&self, uri: &SchemaUri) -> Option<SchemaId> {
        match &uri.fragment {
            Fragment::Anchor(name) => self.anchors.get(&(uri.base.clone(), name.clone())).copied(),
            _ => fragment_key(uri).and_then(|key| self.locations.get(&key).copied()),
        }
    }

    pub fn has_location(&self, key: &LocationKey) -> bool {
        self.locations.contains_key(key)
    }

    pub fn anchor(&self, key: &AnchorKey) -> Option<SchemaId> {
        self.anchors.get(key).copied()
    }

    pub fn resource(&self, base: &str) -> Option<&ResourceInfo> {
        self.resources.get(base)
    }

    /// Raw JSON for `base`: a registered document or a built resource
    pub fn raw_document(&self, base: &str) -> Option<Arc<Value>> {
        self.documents
            .get(base)
            .cloned()
            .or_else(|| self.resources.get(base).map(|resource| resource.raw.clone()))
    }

    /// Append a finished staging area; ids were reserved from `next_id`
    pub fn commit(&mut self, staging: Staging) {
        debug_assert_eq!(staging.first_id, self.nodes.len());
        self.nodes.extend(staging.nodes.into_iter().flatten());
        for (key, id) in staging.locations {
            self.locations.entry(key).or_insert(id);
        }
        for (key, id) in staging.anchors {
            self.anchors.entry(key).or_insert(id);
        }
        for (key, id) in staging.dynamic_anchors {
            self.dynamic_anchors.entry(key).or_insert(id);
        }
        self.recursive_anchors.extend(staging.recursive_anchors);
        for (base, resource) in staging.resources {
            self.resources.entry(base).or_insert(resource);
        }
    }
}

/// Uncommitted output of one build
#[derive(Debug, Default)]
pub(crate) struct Staging {
    first_id: usize,
    nodes: Vec<Option<Arc<SchemaNode>>>,
    pub locations: HashMap<LocationKey, SchemaId>,
    pub anchors: HashMap<AnchorKey, SchemaId>,
    pub dynamic_anchors: HashMap<AnchorKey, SchemaId>,
    pub recursive_anchors: HashSet<String>,
    pub resources: HashMap<String, ResourceInfo>,
    pub pending: Vec<Arc<ReferenceTarget>>,
}

impl Staging {
    pub fn new(first_id: usize) -> Self {
        Self {
            first_id,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Reserve a handle before the node's children are built
    pub fn reserve(&mut self) -> SchemaId {
        self.nodes.push(None);
        SchemaId(self.first_id + self.nodes.len() - 1)
    }

    pub fn store(&mut self, node: SchemaNode) {
        let index = node.id.0 - self.first_id;
        self.nodes[index] = Some(Arc::new(node));
    }

    pub fn node(&self, id: SchemaId) -> Option<&Arc<SchemaNode>> {
        id.0.checked_sub(self.first_id)
            .and_then(|index| self.nodes.get(index))
            .and_then(Option::as_ref)
    }

    pub fn lookup(&self, uri: &SchemaUri) -> Option<SchemaId> {
        match &uri.fragment {
            Fragment::Anchor(name) => self.anchors.get(&(uri.base.clone(), name.clone())).copied(),
            _ => fragment_key(uri).and_then(|key| self.locations.get(&key).copied()),
        }
    }

    pub fn raw_resource(&self, base: &str) -> Option<Arc<Value>> {
        self.resources.get(base).map(|resource| resource.raw.clone())
    }
}
