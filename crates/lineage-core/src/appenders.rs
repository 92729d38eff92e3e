// SPDX-License-Identifier: Apache-2.0
//! Change appenders: one pure detector per change category.
//!
//! Appenders are plain functions over a [`NodePair`], registered in a fixed,
//! documented order (see [`default_appenders`]) so that diff output is
//! deterministic. Each appender filters for its own category; a single node
//! pair may yield several changes, one per differing property, all sharing
//! the pair's global id.

use std::collections::BTreeSet;

use crate::change::{Change, ContainerEntries};
use crate::containers::{diff_list, diff_map, diff_set};
use crate::ident::GlobalId;
use crate::node::{CdoNode, NodeValue};

/// Two corresponding nodes sharing one global id; absence on one side
/// signals creation or removal.
#[derive(Clone, Copy, Debug)]
pub struct NodePair<'a> {
    /// The shared global id.
    pub id: &'a GlobalId,
    /// Node from the old graph, if present.
    pub left: Option<&'a CdoNode>,
    /// Node from the new graph, if present.
    pub right: Option<&'a CdoNode>,
}

/// A registered change detector: pure function of a node pair.
pub type Appender = for<'a> fn(&NodePair<'a>) -> Vec<Change>;

/// The default appender registry, in invocation order:
/// new-object, object-removed, value, reference, container.
#[must_use]
pub fn default_appenders() -> Vec<Appender> {
    vec![
        new_object_appender,
        object_removed_appender,
        value_change_appender,
        reference_change_appender,
        container_change_appender,
    ]
}

/// Emits [`Change::NewObject`] when only the right node exists.
///
/// No per-property changes accompany a new object; its appearance already
/// implies every recorded property value is new.
pub fn new_object_appender(pair: &NodePair<'_>) -> Vec<Change> {
    if pair.left.is_none() && pair.right.is_some() {
        vec![Change::NewObject {
            id: pair.id.clone(),
        }]
    } else {
        Vec::new()
    }
}

/// Emits [`Change::ObjectRemoved`] when only the left node exists.
pub fn object_removed_appender(pair: &NodePair<'_>) -> Vec<Change> {
    if pair.left.is_some() && pair.right.is_none() {
        vec![Change::ObjectRemoved {
            id: pair.id.clone(),
        }]
    } else {
        Vec::new()
    }
}

fn property_union<'a>(left: &'a CdoNode, right: &'a CdoNode) -> BTreeSet<&'a str> {
    left.state
        .keys()
        .chain(right.state.keys())
        .map(String::as_str)
        .collect()
}

/// Emits [`Change::Value`] for scalar properties that differ by value.
///
/// A side whose value is not an atom (reference or container, a host-model
/// kind mismatch) is treated as absent for this category; the other
/// category's appender reports its own side.
pub fn value_change_appender(pair: &NodePair<'_>) -> Vec<Change> {
    let (Some(left), Some(right)) = (pair.left, pair.right) else {
        return Vec::new();
    };
    let mut changes = Vec::new();
    for property in property_union(left, right) {
        let l = left.property(property).and_then(NodeValue::as_atom);
        let r = right.property(property).and_then(NodeValue::as_atom);
        if l != r && (l.is_some() || r.is_some()) {
            changes.push(Change::Value {
                id: pair.id.clone(),
                property: property.to_owned(),
                left: l.cloned(),
                right: r.cloned(),
            });
        }
    }
    changes
}

/// Emits [`Change::Reference`] for single-reference properties whose
/// referenced global ids differ.
///
/// Only ids are compared; deep differences in the referenced node surface as
/// separate changes for that node itself.
pub fn reference_change_appender(pair: &NodePair<'_>) -> Vec<Change> {
    let (Some(left), Some(right)) = (pair.left, pair.right) else {
        return Vec::new();
    };
    let mut changes = Vec::new();
    for property in property_union(left, right) {
        let l = left.property(property).and_then(NodeValue::as_ref_id);
        let r = right.property(property).and_then(NodeValue::as_ref_id);
        if l != r && (l.is_some() || r.is_some()) {
            changes.push(Change::Reference {
                id: pair.id.clone(),
                property: property.to_owned(),
                left: l.cloned(),
                right: r.cloned(),
            });
        }
    }
    changes
}

/// Emits [`Change::Container`] for collection properties, delegating to the
/// matching container difference algorithm.
///
/// A container paired with an absent (or differently-kinded) other side is
/// diffed against the empty container of its own kind, so its elements
/// surface as all-added or all-removed entries.
pub fn container_change_appender(pair: &NodePair<'_>) -> Vec<Change> {
    let (Some(left), Some(right)) = (pair.left, pair.right) else {
        return Vec::new();
    };
    let mut changes = Vec::new();
    for property in property_union(left, right) {
        let l = left.property(property);
        let r = right.property(property);
        for entries in container_entries(l, r) {
            if !entries.is_empty() {
                changes.push(Change::Container {
                    id: pair.id.clone(),
                    property: property.to_owned(),
                    entries,
                });
            }
        }
    }
    changes
}

fn container_entries(left: Option<&NodeValue>, right: Option<&NodeValue>) -> Vec<ContainerEntries> {
    use NodeValue::{List, Map, Set};
    match (left, right) {
        (Some(List(l)), Some(List(r))) => vec![ContainerEntries::List(diff_list(l, r))],
        (Some(Set(l)), Some(Set(r))) => vec![ContainerEntries::Set(diff_set(l, r))],
        (Some(Map(l)), Some(Map(r))) => vec![ContainerEntries::Map(diff_map(l, r))],
        (l, r) => {
            // Kind mismatch or one-sided container: each container side is
            // diffed against the empty container of its own kind.
            let mut out = Vec::new();
            match l {
                Some(List(xs)) => out.push(ContainerEntries::List(diff_list(xs, &[]))),
                Some(Set(xs)) => out.push(ContainerEntries::Set(diff_set(xs, &BTreeSet::new()))),
                Some(Map(xs)) => {
                    out.push(ContainerEntries::Map(diff_map(xs, &std::collections::BTreeMap::new())));
                }
                _ => {}
            }
            match r {
                Some(List(xs)) => out.push(ContainerEntries::List(diff_list(&[], xs))),
                Some(Set(xs)) => out.push(ContainerEntries::Set(diff_set(&BTreeSet::new(), xs))),
                Some(Map(xs)) => {
                    out.push(ContainerEntries::Map(diff_map(&std::collections::BTreeMap::new(), xs)));
                }
                _ => {}
            }
            out
        }
    }
}
