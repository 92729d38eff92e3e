// SPDX-License-Identifier: Apache-2.0
//! The change taxonomy: [`Change`], container entries, and [`Diff`].
//!
//! `Change` is a closed tagged union; consumers match exhaustively instead of
//! dispatching through a visitor hierarchy, so adding a change kind is a
//! compile-visible event everywhere changes are processed.

use crate::ident::{Atom, GlobalId};
use crate::node::NodeValue;

/// One edit-script entry for an ordered sequence.
///
/// `Inserted`/`Moved` indices refer to the right (new) sequence; `Removed`
/// indices refer to the left (old) sequence.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ListEntry {
    /// Element present only in the right sequence.
    Inserted {
        /// Position in the right sequence.
        index: usize,
        /// The inserted element.
        value: NodeValue,
    },
    /// Element present only in the left sequence.
    Removed {
        /// Position in the left sequence.
        index: usize,
        /// The removed element.
        value: NodeValue,
    },
    /// Equal element present in both sequences at different positions.
    Moved {
        /// Position in the left sequence.
        from: usize,
        /// Position in the right sequence.
        to: usize,
        /// The moved element.
        value: NodeValue,
    },
}

/// One symmetric-difference entry for an unordered collection.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetEntry {
    /// Element present only in the right collection.
    Added {
        /// The added element.
        value: NodeValue,
    },
    /// Element present only in the left collection.
    Removed {
        /// The removed element.
        value: NodeValue,
    },
}

/// One key-union entry for an atom-keyed mapping.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MapEntry {
    /// Key present only in the right mapping.
    Added {
        /// The added key.
        key: Atom,
        /// Value under the added key.
        value: NodeValue,
    },
    /// Key present only in the left mapping.
    Removed {
        /// The removed key.
        key: Atom,
        /// Value under the removed key.
        value: NodeValue,
    },
    /// Key present in both mappings with differing values.
    ValueChanged {
        /// The shared key.
        key: Atom,
        /// Value on the left side.
        left: NodeValue,
        /// Value on the right side.
        right: NodeValue,
    },
}

/// Typed entry list of one container change, closed per container semantics.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerEntries {
    /// Edit script for an ordered sequence.
    List(Vec<ListEntry>),
    /// Symmetric difference for an unordered collection.
    Set(Vec<SetEntry>),
    /// Key-union difference for an atom-keyed mapping.
    Map(Vec<MapEntry>),
}

impl ContainerEntries {
    /// Returns `true` if the entry list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(es) => es.is_empty(),
            Self::Set(es) => es.is_empty(),
            Self::Map(es) => es.is_empty(),
        }
    }
}

/// Immutable result of comparing two corresponding nodes (or one against
/// absence).
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Change {
    /// Object present on the right side only.
    NewObject {
        /// Affected node id.
        id: GlobalId,
    },
    /// Object present on the left side only.
    ObjectRemoved {
        /// Affected node id.
        id: GlobalId,
    },
    /// Scalar property value differs under value-semantic equality.
    Value {
        /// Affected node id.
        id: GlobalId,
        /// Name of the changed property.
        property: String,
        /// Value on the left side, if any.
        left: Option<Atom>,
        /// Value on the right side, if any.
        right: Option<Atom>,
    },
    /// Single-reference property points at a different global id.
    Reference {
        /// Affected node id.
        id: GlobalId,
        /// Name of the changed property.
        property: String,
        /// Referenced id on the left side, if any.
        left: Option<GlobalId>,
        /// Referenced id on the right side, if any.
        right: Option<GlobalId>,
    },
    /// Collection-typed property differs; entries carry the typed script.
    Container {
        /// Affected node id.
        id: GlobalId,
        /// Name of the changed property.
        property: String,
        /// Typed add/remove/move records.
        entries: ContainerEntries,
    },
}

impl Change {
    /// The global id of the affected node.
    #[must_use]
    pub fn affected_id(&self) -> &GlobalId {
        match self {
            Self::NewObject { id }
            | Self::ObjectRemoved { id }
            | Self::Value { id, .. }
            | Self::Reference { id, .. }
            | Self::Container { id, .. } => id,
        }
    }

    /// The affected property name, for property-level changes.
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        match self {
            Self::NewObject { .. } | Self::ObjectRemoved { .. } => None,
            Self::Value { property, .. }
            | Self::Reference { property, .. }
            | Self::Container { property, .. } => Some(property),
        }
    }
}

/// Ordered sequence of changes from one compare pass.
///
/// Changes are grouped per affected id in graph discovery order; order
/// across distinct objects carries no semantic weight beyond that grouping.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diff {
    changes: Vec<Change>,
}

impl Diff {
    /// Constructs a diff from an already-ordered change list.
    #[must_use]
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    /// Returns `true` if the diff holds no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// All changes in order.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Changes affecting one global id, preserving order.
    pub fn changes_for<'a>(&'a self, id: &'a GlobalId) -> impl Iterator<Item = &'a Change> {
        self.changes.iter().filter(move |c| c.affected_id() == id)
    }
}

impl IntoIterator for Diff {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
