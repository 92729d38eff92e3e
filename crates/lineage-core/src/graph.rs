// SPDX-License-Identifier: Apache-2.0
//! Live-object traversal: [`GraphBuilder`] and the resulting [`LiveGraph`].
//!
//! The builder performs one synchronous depth-first pass from each declared
//! root, classifying identity for every reachable object and materializing
//! its properties into [`CdoNode`] state. Cycle policy: an id is recorded in
//! the visited set before its properties are read, so an already-visited node
//! is referenced but never re-expanded. Traversal order follows the
//! classifier's declared property order and is therefore deterministic.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::ident::{classify_object, GlobalId, IdentityError, OwnerContext, PropertyPath};
use crate::metamodel::{DomainObject, PropertyValue, TypeClassifier};
use crate::node::{CdoNode, NodeValue};

/// Error raised while building a graph from live objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphBuildError {
    /// Identity classification failed for a reachable object.
    #[error("identity classification failed at `{path}`: {source}")]
    Identity {
        /// Structural path that led to the offending object.
        path: PropertyPath,
        /// Underlying identity failure.
        #[source]
        source: IdentityError,
    },
}

/// In-memory node graph produced by one traversal pass.
///
/// Nodes are keyed by [`GlobalId`]; `order` preserves discovery order, which
/// drives diff output ordering. Every `Ref` target present in node state also
/// has a graph entry unless it denotes a dangling reference (possible only in
/// graphs rebuilt from partial snapshot history).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveGraph {
    nodes: BTreeMap<GlobalId, CdoNode>,
    order: Vec<GlobalId>,
    roots: Vec<GlobalId>,
}

impl LiveGraph {
    /// Builds a graph directly from prepared nodes, preserving input order.
    ///
    /// Used when rehydrating the prior state from persisted snapshots.
    #[must_use]
    pub fn from_nodes(nodes: impl IntoIterator<Item = CdoNode>) -> Self {
        let mut graph = Self::default();
        for node in nodes {
            graph.insert(node);
        }
        graph
    }

    fn insert(&mut self, node: CdoNode) {
        if !self.nodes.contains_key(&node.global_id) {
            self.order.push(node.global_id.clone());
        }
        self.nodes.insert(node.global_id.clone(), node);
    }

    /// Returns the node for `id`, if present.
    #[must_use]
    pub fn node(&self, id: &GlobalId) -> Option<&CdoNode> {
        self.nodes.get(id)
    }

    /// Returns `true` if the graph contains a node for `id`.
    #[must_use]
    pub fn contains(&self, id: &GlobalId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in discovery order.
    #[must_use]
    pub fn ids_in_discovery_order(&self) -> &[GlobalId] {
        &self.order
    }

    /// Declared root ids, in the order they were built.
    #[must_use]
    pub fn roots(&self) -> &[GlobalId] {
        &self.roots
    }

    /// Iterates nodes in discovery order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &CdoNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Computes a canonical digest of the entire graph state.
    ///
    /// Nodes are folded in ascending `GlobalId` order; per node, properties
    /// follow the state map's ascending key order. Two graphs with equal
    /// digests hold identical node state, so an unchanged-object check can
    /// compare digests instead of running a full diff.
    #[must_use]
    pub fn canonical_digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"LINEAGE_GRAPH_V1\0");
        hasher.update(&(self.nodes.len() as u64).to_le_bytes());
        for (id, node) in &self.nodes {
            let rendered = id.to_string();
            hasher.update(&(rendered.len() as u64).to_le_bytes());
            hasher.update(rendered.as_bytes());
            hasher.update(&(node.state.len() as u64).to_le_bytes());
            for (name, value) in &node.state {
                hasher.update(&(name.len() as u64).to_le_bytes());
                hasher.update(name.as_bytes());
                value.hash_into(&mut hasher);
            }
        }
        *hasher.finalize().as_bytes()
    }
}

/// Depth-first graph builder over live domain objects.
pub struct GraphBuilder<'a> {
    classifier: &'a dyn TypeClassifier,
}

impl<'a> GraphBuilder<'a> {
    /// Constructs a builder using `classifier` for identity and properties.
    #[must_use]
    pub fn new(classifier: &'a dyn TypeClassifier) -> Self {
        Self { classifier }
    }

    /// Builds the graph reachable from a single root.
    pub fn build(&self, root: &dyn DomainObject) -> Result<LiveGraph, GraphBuildError> {
        self.build_many(&[root])
    }

    /// Builds the graph reachable from several roots in one pass.
    ///
    /// Roots share one visited set: an object reachable from two roots
    /// yields exactly one node.
    pub fn build_many(&self, roots: &[&dyn DomainObject]) -> Result<LiveGraph, GraphBuildError> {
        let mut graph = LiveGraph::default();
        let mut visited: FxHashSet<GlobalId> = FxHashSet::default();
        for root in roots {
            let id = self.visit(*root, &OwnerContext::root(), &mut graph, &mut visited)?;
            graph.roots.push(id);
        }
        Ok(graph)
    }

    fn visit(
        &self,
        object: &dyn DomainObject,
        ctx: &OwnerContext,
        graph: &mut LiveGraph,
        visited: &mut FxHashSet<GlobalId>,
    ) -> Result<GlobalId, GraphBuildError> {
        let id = classify_object(self.classifier, object, ctx).map_err(|source| {
            GraphBuildError::Identity {
                path: ctx.path.clone(),
                source,
            }
        })?;
        if !visited.insert(id.clone()) {
            // Already discovered: reference it, do not re-expand.
            return Ok(id);
        }
        graph.order.push(id.clone());

        // Entity boundaries reset the value-object owner context.
        let (child_owner, base_path) = if id.is_instance() {
            (Some(id.clone()), PropertyPath::root())
        } else {
            (ctx.owner.clone(), ctx.path.clone())
        };

        let mut state = BTreeMap::new();
        for def in self.classifier.properties(object.type_name()) {
            let value = object.property(&def.name);
            let path = base_path.child(&def.name);
            let child_ctx = OwnerContext {
                owner: child_owner.clone(),
                path,
            };
            if let Some(materialized) = self.materialize(value, &child_ctx, graph, visited)? {
                state.insert(def.name, materialized);
            }
        }
        graph.nodes.insert(id.clone(), CdoNode::new(id.clone(), state));
        Ok(id)
    }

    fn materialize(
        &self,
        value: PropertyValue,
        ctx: &OwnerContext,
        graph: &mut LiveGraph,
        visited: &mut FxHashSet<GlobalId>,
    ) -> Result<Option<NodeValue>, GraphBuildError> {
        match value {
            PropertyValue::Absent => Ok(None),
            PropertyValue::Atom(a) => Ok(Some(NodeValue::Atom(a))),
            PropertyValue::Object(o) => {
                let child = self.visit(o.as_ref(), ctx, graph, visited)?;
                Ok(Some(NodeValue::Ref(child)))
            }
            PropertyValue::List(vs) => {
                let mut out = Vec::with_capacity(vs.len());
                for (ix, v) in vs.into_iter().enumerate() {
                    let element_ctx = OwnerContext {
                        owner: ctx.owner.clone(),
                        path: ctx.path.index(ix),
                    };
                    if let Some(m) = self.materialize(v, &element_ctx, graph, visited)? {
                        out.push(m);
                    }
                }
                Ok(Some(NodeValue::List(out)))
            }
            PropertyValue::Set(vs) => {
                // Set elements have no stable position; the host's iteration
                // order still indexes value-object paths deterministically.
                let mut out = std::collections::BTreeSet::new();
                for (ix, v) in vs.into_iter().enumerate() {
                    let element_ctx = OwnerContext {
                        owner: ctx.owner.clone(),
                        path: ctx.path.index(ix),
                    };
                    if let Some(m) = self.materialize(v, &element_ctx, graph, visited)? {
                        out.insert(m);
                    }
                }
                Ok(Some(NodeValue::Set(out)))
            }
            PropertyValue::Map(kvs) => {
                let mut out = BTreeMap::new();
                for (k, v) in kvs {
                    let entry_ctx = OwnerContext {
                        owner: ctx.owner.clone(),
                        path: ctx.path.key(&k),
                    };
                    if let Some(m) = self.materialize(v, &entry_ctx, graph, visited)? {
                        out.insert(k, m);
                    }
                }
                Ok(Some(NodeValue::Map(out)))
            }
        }
    }
}
