//! Schema evaluation
//!
//! Walks a built graph against an instance and produces the full
//! [`EvaluationResult`] tree. Keywords of one schema object run in priority
//! order and each sees the finished results of the keywords before it.
//!
//! The dynamic scope is an immutable linked list of resource bases threaded
//! through the recursion: a frame is pushed whenever evaluation enters a
//! schema node whose resource differs from the current one. `$dynamicRef`
//! and `$recursiveRef` read it outermost first.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use crate::build::{escape_segment, ReferenceTarget, SchemaId, SchemaKind, SchemaNode};
use crate::dialect::Dialect;
use crate::error::ResolutionError;
use crate::graph::SchemaGraph;
use crate::json::JsonPointer;
use crate::keyword::{Coverage, KeywordHandler, KeywordNode, KeywordOutcome};
use crate::options::EvaluationOptions;
use crate::registry::SchemaRegistry;
use crate::result::EvaluationResult;
use crate::uri::Fragment;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// One frame of the dynamic scope
#[derive(Debug)]
pub(crate) struct Scope<'a> {
    base: &'a str,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Resource bases from the outermost frame inwards
    fn outermost_first(&self) -> Vec<&str> {
        let mut bases = Vec::new();
        let mut frame = Some(self);
        while let Some(current) = frame {
            bases.push(current.base);
            frame = current.parent;
        }
        bases.reverse();
        bases
    }
}

/// (schema, instance location) pairs entered through references
#[derive(Debug)]
pub(crate) struct RefChain<'a> {
    schema: SchemaId,
    instance_location: &'a JsonPointer,
    parent: Option<&'a RefChain<'a>>,
}

/// Per-evaluation shared state
pub(crate) struct Evaluator<'a> {
    registry: &'a SchemaRegistry,
    options: &'a EvaluationOptions,
    root_instance: &'a Value,
    evaluate_as: Option<Arc<Dialect>>,
}

/// Where in the instance, the evaluation path and the scope a schema is applied
pub(crate) struct Position<'p> {
    pub instance_location: &'p JsonPointer,
    pub evaluation_path: JsonPointer,
    pub scope: Option<&'p Scope<'p>>,
    pub refs: Option<&'p RefChain<'p>>,
    /// Instance nesting level; in-place applicators and `$ref` hops keep it
    pub depth: usize,
}

impl<'p> Position<'p> {
    pub fn root(instance_location: &'p JsonPointer) -> Self {
        Self {
            instance_location,
            evaluation_path: JsonPointer::root(),
            scope: None,
            refs: None,
            depth: 0,
        }
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        options: &'a EvaluationOptions,
        root_instance: &'a Value,
    ) -> Result<Self, ResolutionError> {
        let evaluate_as = match &options.evaluate_as {
            Some(uri) => Some(registry.dialect_for(uri)?),
            None => None,
        };
        Ok(Self {
            registry,
            options,
            root_instance,
            evaluate_as,
        })
    }

    /// Apply schema `id` to `instance`
    pub fn evaluate_schema(
        &self,
        id: SchemaId,
        instance: &Value,
        position: Position<'_>,
    ) -> Result<EvaluationResult, ResolutionError> {
        if position.depth > self.options.max_depth {
            return Err(ResolutionError::DepthExceeded {
                max_depth: self.options.max_depth,
                evaluation_path: position.evaluation_path.to_string(),
            });
        }
        let node = self
            .registry
            .node(id)
            .ok_or_else(|| ResolutionError::unresolved(id.to_string(), "schema handle is not registered"))?;

        let pushed;
        let scope: &Scope<'_> = match position.scope {
            Some(top) if top.base == node.base() => top,
            parent => {
                pushed = Scope {
                    base: node.base(),
                    parent,
                };
                &pushed
            }
        };

        let mut result = EvaluationResult {
            valid: true,
            keyword: None,
            evaluation_path: position.evaluation_path.clone(),
            schema_location: node.location().to_string(),
            instance_location: position.instance_location.clone(),
            annotation: None,
            error: None,
            details: Vec::new(),
            coverage: Coverage::new(),
        };

        match &node.kind {
            SchemaKind::Bool(true) => {}
            SchemaKind::Bool(false) => {
                result.valid = false;
                result.error = Some(self.message("false-schema", &[]));
            }
            SchemaKind::Object(keywords) => {
                let mut details: Vec<EvaluationResult> = Vec::with_capacity(keywords.len());
                for keyword in keywords {
                    let keyword_path = position.evaluation_path.join(keyword.name());
                    let outcome = if self.is_active(&node, keyword) {
                        let ctx = EvalContext {
                            evaluator: self,
                            schema: &node,
                            instance,
                            instance_location: position.instance_location,
                            evaluation_path: &keyword_path,
                            scope,
                            refs: position.refs,
                            siblings: &details,
                            depth: position.depth,
                        };
                        keyword.handler.evaluate(keyword, &ctx)?
                    } else {
                        KeywordOutcome::pass().with_annotation(keyword.raw.clone())
                    };
                    details.push(EvaluationResult {
                        valid: outcome.valid,
                        keyword: Some(keyword.name.clone()),
                        evaluation_path: keyword_path,
                        schema_location: format!("{}/{}", node.location(), escape_segment(keyword.name())),
                        instance_location: position.instance_location.clone(),
                        annotation: outcome.annotation,
                        error: outcome.error,
                        details: outcome.details,
                        coverage: outcome.coverage,
                    });
                }
                result.valid = details.iter().all(|detail| detail.valid);
                if result.valid {
                    for detail in &details {
                        result.coverage.merge(&detail.coverage);
                    }
                }
                result.details = details;
            }
        }
        Ok(result)
    }

    /// Under `evaluate_as`, keywords of nodes without their own `$schema`
    /// only run if the target dialect maps their name to the same handler
    fn is_active(&self, node: &SchemaNode, keyword: &KeywordNode) -> bool {
        let Some(dialect) = &self.evaluate_as else {
            return true;
        };
        if node.declares_dialect() {
            return true;
        }
        dialect
            .handler(keyword.name())
            .map(|handler| same_handler(handler, keyword.handler()))
            .unwrap_or(false)
    }

    fn message(&self, key: &str, args: &[(&str, String)]) -> String {
        self.options.messages.format(&self.options.culture, key, args)
    }
}

fn same_handler(left: &Arc<dyn KeywordHandler>, right: &Arc<dyn KeywordHandler>) -> bool {
    std::ptr::eq(Arc::as_ptr(left) as *const (), Arc::as_ptr(right) as *const ())
}

/// Context handed to keyword handlers at evaluation time
pub struct EvalContext<'a> {
    evaluator: &'a Evaluator<'a>,
    schema: &'a SchemaNode,
    instance: &'a Value,
    instance_location: &'a JsonPointer,
    evaluation_path: &'a JsonPointer,
    scope: &'a Scope<'a>,
    refs: Option<&'a RefChain<'a>>,
    siblings: &'a [EvaluationResult],
    depth: usize,
}

impl<'a> EvalContext<'a> {
    /// The instance value this schema object is applied to
    pub fn instance(&self) -> &'a Value {
        self.instance
    }

    pub fn instance_location(&self) -> &JsonPointer {
        self.instance_location
    }

    /// Path of the current keyword from the evaluation root
    pub fn evaluation_path(&self) -> &JsonPointer {
        self.evaluation_path
    }

    /// The whole instance document
    pub fn root_instance(&self) -> &'a Value {
        self.evaluator.root_instance
    }

    /// The schema object owning the current keyword
    pub fn schema(&self) -> &SchemaNode {
        self.schema
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.evaluator.registry
    }

    pub fn options(&self) -> &EvaluationOptions {
        self.evaluator.options
    }

    /// Finished result of an earlier keyword in the same schema object
    pub fn sibling(&self, name: &str) -> Option<&EvaluationResult> {
        self.siblings
            .iter()
            .find(|result| result.keyword.as_deref() == Some(name))
    }

    /// Union of what the successful earlier keywords evaluated
    pub fn sibling_coverage(&self) -> Coverage {
        let mut coverage = Coverage::new();
        for sibling in self.siblings.iter().filter(|sibling| sibling.valid) {
            coverage.merge(&sibling.coverage);
        }
        coverage
    }

    /// Render a localized message
    pub fn message(&self, key: &str, args: &[(&str, String)]) -> String {
        self.evaluator.message(key, args)
    }

    /// Apply a subschema to the current instance
    pub fn evaluate_in_place(&self, id: SchemaId, segments: &[&str]) -> Result<EvaluationResult, ResolutionError> {
        self.evaluate_at(id, segments, self.instance, self.instance_location.clone(), self.depth)
    }

    /// Apply a subschema to a child of the current instance
    pub fn evaluate_child(
        &self,
        id: SchemaId,
        segments: &[&str],
        instance: &Value,
        instance_segment: &str,
    ) -> Result<EvaluationResult, ResolutionError> {
        self.evaluate_at(id, segments, instance, self.instance_location.join(instance_segment), self.depth + 1)
    }

    fn evaluate_at(
        &self,
        id: SchemaId,
        segments: &[&str],
        instance: &Value,
        instance_location: JsonPointer,
        depth: usize,
    ) -> Result<EvaluationResult, ResolutionError> {
        let mut evaluation_path = self.evaluation_path.clone();
        for segment in segments {
            evaluation_path.push(*segment);
        }
        self.evaluator.evaluate_schema(
            id,
            instance,
            Position {
                instance_location: &instance_location,
                evaluation_path,
                scope: Some(self.scope),
                refs: self.refs,
                depth,
            },
        )
    }

    /// Apply a reference target to the current instance, refusing to
    /// re-enter a schema already entered for this instance location
    pub fn follow_reference(&self, id: SchemaId) -> Result<EvaluationResult, ResolutionError> {
        let mut link = self.refs;
        while let Some(entry) = link {
            if entry.schema == id && entry.instance_location == self.instance_location {
                return Err(ResolutionError::InfiniteRecursion {
                    evaluation_path: self.evaluation_path.to_string(),
                    instance_location: self.instance_location.to_string(),
                });
            }
            link = entry.parent;
        }
        let chain = RefChain {
            schema: id,
            instance_location: self.instance_location,
            parent: self.refs,
        };
        self.evaluator.evaluate_schema(
            id,
            self.instance,
            Position {
                instance_location: self.instance_location,
                evaluation_path: self.evaluation_path.clone(),
                scope: Some(self.scope),
                refs: Some(&chain),
                depth: self.depth,
            },
        )
    }

    /// The handle a static reference points to, resolving lazily
    pub fn resolve(&self, target: &ReferenceTarget) -> Result<SchemaId, ResolutionError> {
        if let Some(id) = target.resolved() {
            return Ok(id);
        }
        let id = self.registry().resolve_uri(target.uri())?;
        target.link(id);
        Ok(id)
    }

    /// `$dynamicRef`: the static target, unless it is a dynamic anchor, in
    /// which case the outermost scope frame declaring the same dynamic
    /// anchor wins
    pub fn resolve_dynamic(&self, target: &ReferenceTarget) -> Result<SchemaId, ResolutionError> {
        let static_id = self.resolve(target)?;
        let Fragment::Anchor(name) = &target.uri().fragment else {
            return Ok(static_id);
        };
        if self.registry().dynamic_anchor(&target.uri().base, name) != Some(static_id) {
            return Ok(static_id);
        }
        for base in self.scope.outermost_first() {
            if let Some(id) = self.registry().dynamic_anchor(base, name) {
                trace!(anchor = %name, base = %base, "dynamic reference resolved through scope");
                return Ok(id);
            }
        }
        Ok(static_id)
    }

    /// `$recursiveRef`: the static target, unless its resource declares
    /// `$recursiveAnchor: true`, in which case the outermost such resource in
    /// scope wins
    pub fn resolve_recursive(&self, target: &ReferenceTarget) -> Result<SchemaId, ResolutionError> {
        let static_id = self.resolve(target)?;
        let registry = self.registry();
        let Some(node) = registry.node(static_id) else {
            return Ok(static_id);
        };
        if !registry.has_recursive_anchor(node.base()) || registry.resource_root(node.base()) != Some(static_id) {
            return Ok(static_id);
        }
        for base in self.scope.outermost_first() {
            if registry.has_recursive_anchor(base) {
                if let Some(root) = registry.resource_root(base) {
                    trace!(base = %base, "recursive reference resolved through scope");
                    return Ok(root);
                }
            }
        }
        Ok(static_id)
    }

    /// Evaluate another graph against the current instance, nesting its
    /// result under the current keyword
    pub fn evaluate_graph(&self, graph: &SchemaGraph) -> Result<EvaluationResult, ResolutionError> {
        let evaluator = Evaluator::new(graph.registry(), self.evaluator.options, self.evaluator.root_instance)?;
        evaluator.evaluate_schema(
            graph.root(),
            self.instance,
            Position {
                instance_location: self.instance_location,
                evaluation_path: self.evaluation_path.clone(),
                scope: None,
                refs: None,
                // the nested graph has no ref chain to catch a cycle, so it counts as a level
                depth: self.depth + 1,
            },
        )
    }
}
