// SPDX-License-Identifier: Apache-2.0
//! Diff engine: orchestrates graph building and change appenders.
//!
//! [`DiffEngine::compare_graphs`] iterates the union of global ids present in
//! either graph (new-graph discovery order first, then old-only ids) and
//! applies the registered appenders per id in their fixed order, so the
//! resulting change list is deterministic and grouped per affected id.

use thiserror::Error;

use crate::appenders::{default_appenders, Appender, NodePair};
use crate::change::Diff;
use crate::graph::{GraphBuildError, GraphBuilder, LiveGraph};
use crate::metamodel::{DomainObject, TypeClassifier, TypeKind};

/// Error raised by a compare pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// The compared root is a bare primitive value; only entity or
    /// value-object-rooted graphs are diffable as top-level subjects.
    #[error("cannot diff a bare primitive root of type `{type_name}`")]
    UnsupportedRoot {
        /// Declared type name of the rejected root.
        type_name: String,
    },
    /// Graph construction failed for one of the compared objects.
    #[error(transparent)]
    GraphBuild(#[from] GraphBuildError),
}

/// Graph-to-graph diff engine with a pluggable appender registry.
pub struct DiffEngine<'a> {
    classifier: &'a dyn TypeClassifier,
    appenders: Vec<Appender>,
}

impl<'a> DiffEngine<'a> {
    /// Constructs an engine with the default appender registry.
    #[must_use]
    pub fn new(classifier: &'a dyn TypeClassifier) -> Self {
        Self {
            classifier,
            appenders: default_appenders(),
        }
    }

    /// Constructs an engine with a custom appender registry.
    ///
    /// Appenders run in the given order for every node pair; output order is
    /// only deterministic if the registry order is fixed.
    #[must_use]
    pub fn with_appenders(classifier: &'a dyn TypeClassifier, appenders: Vec<Appender>) -> Self {
        Self {
            classifier,
            appenders,
        }
    }

    /// Compares two built graphs (or one graph against absence).
    #[must_use]
    pub fn compare_graphs(&self, old: Option<&LiveGraph>, new: &LiveGraph) -> Diff {
        let mut ids: Vec<&crate::ident::GlobalId> = new.ids_in_discovery_order().iter().collect();
        if let Some(old_graph) = old {
            ids.extend(
                old_graph
                    .ids_in_discovery_order()
                    .iter()
                    .filter(|id| !new.contains(id)),
            );
        }

        let mut changes = Vec::new();
        for id in ids {
            let pair = NodePair {
                id,
                left: old.and_then(|g| g.node(id)),
                right: new.node(id),
            };
            for appender in &self.appenders {
                changes.extend(appender(&pair));
            }
        }
        Diff::new(changes)
    }

    /// Compares two live objects by building both graphs first.
    pub fn compare(
        &self,
        old: &dyn DomainObject,
        new: &dyn DomainObject,
    ) -> Result<Diff, DiffError> {
        self.guard_root(old)?;
        self.guard_root(new)?;
        let builder = GraphBuilder::new(self.classifier);
        let old_graph = builder.build(old)?;
        let new_graph = builder.build(new)?;
        Ok(self.compare_graphs(Some(&old_graph), &new_graph))
    }

    /// Produces the initial diff of a first-time object: every reachable
    /// node yields a new-object change.
    pub fn initial(&self, object: &dyn DomainObject) -> Result<Diff, DiffError> {
        self.guard_root(object)?;
        let graph = GraphBuilder::new(self.classifier).build(object)?;
        Ok(self.compare_graphs(None, &graph))
    }

    fn guard_root(&self, object: &dyn DomainObject) -> Result<(), DiffError> {
        let type_name = object.type_name();
        if self.classifier.classify(type_name) == TypeKind::Primitive {
            return Err(DiffError::UnsupportedRoot {
                type_name: type_name.to_owned(),
            });
        }
        Ok(())
    }
}
