// SPDX-License-Identifier: Apache-2.0
//! Materialized node state: [`NodeValue`] and [`CdoNode`].
//!
//! One shape serves two roles: it is the per-property state of a node in a
//! traversal graph, and it is the persisted state of a snapshot. References
//! are explicit [`NodeValue::Ref`] variants, never host-object aliases, so a
//! graph of nodes has no ownership cycles regardless of cycles in the live
//! objects it was built from.

use std::collections::{BTreeMap, BTreeSet};

use crate::ident::{Atom, GlobalId};

/// Materialized value of one node property.
///
/// `Eq`/`Ord` are structural; `Set` and `Map` use ordered containers so that
/// iteration order (and therefore diff and digest output) is deterministic.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeValue {
    /// A primitive value.
    Atom(Atom),
    /// A reference to another node, by global id.
    Ref(GlobalId),
    /// An ordered sequence of values.
    List(Vec<NodeValue>),
    /// An unordered collection of values.
    Set(BTreeSet<NodeValue>),
    /// An atom-keyed mapping of values.
    Map(BTreeMap<Atom, NodeValue>),
}

impl NodeValue {
    /// Returns the referenced global id for `Ref` values.
    #[must_use]
    pub fn as_ref_id(&self) -> Option<&GlobalId> {
        match self {
            Self::Ref(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the atom for `Atom` values.
    #[must_use]
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Self::Atom(a) => Some(a),
            _ => None,
        }
    }

    /// Visits every global id referenced from this value, containers included.
    pub fn for_each_ref<'a>(&'a self, f: &mut impl FnMut(&'a GlobalId)) {
        match self {
            Self::Atom(_) => {}
            Self::Ref(id) => f(id),
            Self::List(vs) => {
                for v in vs {
                    v.for_each_ref(f);
                }
            }
            Self::Set(vs) => {
                for v in vs {
                    v.for_each_ref(f);
                }
            }
            Self::Map(kvs) => {
                for v in kvs.values() {
                    v.for_each_ref(f);
                }
            }
        }
    }

    /// Feeds a canonical encoding of this value into `hasher`.
    ///
    /// Tags are single domain bytes; lengths are 8-byte little-endian. The
    /// encoding is part of the graph digest contract: changing it changes
    /// every digest and must be treated as a breaking change.
    pub(crate) fn hash_into(&self, hasher: &mut blake3::Hasher) {
        match self {
            Self::Atom(a) => {
                hasher.update(b"A");
                hash_atom(hasher, a);
            }
            Self::Ref(id) => {
                hasher.update(b"R");
                hash_str(hasher, &id.to_string());
            }
            Self::List(vs) => {
                hasher.update(b"L");
                hasher.update(&(vs.len() as u64).to_le_bytes());
                for v in vs {
                    v.hash_into(hasher);
                }
            }
            Self::Set(vs) => {
                hasher.update(b"S");
                hasher.update(&(vs.len() as u64).to_le_bytes());
                for v in vs {
                    v.hash_into(hasher);
                }
            }
            Self::Map(kvs) => {
                hasher.update(b"M");
                hasher.update(&(kvs.len() as u64).to_le_bytes());
                for (k, v) in kvs {
                    hash_atom(hasher, k);
                    v.hash_into(hasher);
                }
            }
        }
    }
}

impl From<Atom> for NodeValue {
    fn from(value: Atom) -> Self {
        Self::Atom(value)
    }
}

impl From<GlobalId> for NodeValue {
    fn from(value: GlobalId) -> Self {
        Self::Ref(value)
    }
}

fn hash_atom(hasher: &mut blake3::Hasher, atom: &Atom) {
    match atom {
        Atom::Bool(v) => {
            hasher.update(b"b");
            hasher.update(&[u8::from(*v)]);
        }
        Atom::Int(v) => {
            hasher.update(b"i");
            hasher.update(&v.to_le_bytes());
        }
        Atom::Text(v) => {
            hasher.update(b"t");
            hash_str(hasher, v);
        }
        Atom::Bytes(v) => {
            hasher.update(b"y");
            hasher.update(&(v.len() as u64).to_le_bytes());
            hasher.update(v);
        }
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// One vertex of a traversal pass: identity plus materialized state.
///
/// Built fresh per traversal and owned exclusively by the graph that produced
/// it; later passes rebuild nodes, they never mutate prior graphs.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CdoNode {
    /// Structural identity of this node.
    pub global_id: GlobalId,
    /// Property name to materialized value; absent properties are omitted.
    pub state: BTreeMap<String, NodeValue>,
}

impl CdoNode {
    /// Constructs a node from its id and state.
    #[must_use]
    pub fn new(global_id: GlobalId, state: BTreeMap<String, NodeValue>) -> Self {
        Self { global_id, state }
    }

    /// Returns the value of the named property, if recorded.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&NodeValue> {
        self.state.get(name)
    }

    /// Returns every global id this node references, in property order.
    #[must_use]
    pub fn outgoing_refs(&self) -> Vec<&GlobalId> {
        let mut out = Vec::new();
        for value in self.state.values() {
            value.for_each_ref(&mut |id| out.push(id));
        }
        out
    }
}
