// SPDX-License-Identifier: Apache-2.0
//! Container difference algorithms: list edit scripts, set symmetric
//! difference, and map key-union diffs.
//!
//! All three are pure functions over already-materialized [`NodeValue`]
//! collections; they hold no state and are safe to unit-test in isolation.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::change::{ListEntry, MapEntry, SetEntry};
use crate::ident::Atom;
use crate::node::NodeValue;

/// Computes a move-preferring edit script between two ordered sequences.
///
/// Equal elements (by value, or by referenced global id for `Ref` values)
/// are matched first-unmatched-left to first-unmatched-right in ascending
/// index order, so when duplicates exist the earliest-index move wins.
/// A matched pair at identical indices emits nothing; at differing indices
/// it emits [`ListEntry::Moved`]. Unmatched right occurrences emit
/// `Inserted`, unmatched left occurrences emit `Removed`.
///
/// Emission order: the right sequence is walked first (inserts and moves by
/// rising right index), then removes follow by rising left index.
#[must_use]
pub fn diff_list(left: &[NodeValue], right: &[NodeValue]) -> Vec<ListEntry> {
    let mut left_occurrences: BTreeMap<&NodeValue, VecDeque<usize>> = BTreeMap::new();
    for (ix, value) in left.iter().enumerate() {
        left_occurrences.entry(value).or_default().push_back(ix);
    }

    let mut matched_left = vec![false; left.len()];
    let mut entries = Vec::new();

    for (right_ix, value) in right.iter().enumerate() {
        let matched = match left_occurrences.entry(value) {
            Entry::Occupied(mut slot) => slot.get_mut().pop_front(),
            Entry::Vacant(_) => None,
        };
        match matched {
            Some(left_ix) => {
                matched_left[left_ix] = true;
                if left_ix != right_ix {
                    entries.push(ListEntry::Moved {
                        from: left_ix,
                        to: right_ix,
                        value: value.clone(),
                    });
                }
            }
            None => entries.push(ListEntry::Inserted {
                index: right_ix,
                value: value.clone(),
            }),
        }
    }

    for (left_ix, value) in left.iter().enumerate() {
        if !matched_left[left_ix] {
            entries.push(ListEntry::Removed {
                index: left_ix,
                value: value.clone(),
            });
        }
    }

    entries
}

/// Computes the symmetric difference of two unordered collections.
///
/// Elements only in `right` are `Added`, elements only in `left` are
/// `Removed`; there are no moves. Entries are emitted in ascending element
/// order, additions first.
#[must_use]
pub fn diff_set(left: &BTreeSet<NodeValue>, right: &BTreeSet<NodeValue>) -> Vec<SetEntry> {
    let mut entries = Vec::new();
    for value in right.difference(left) {
        entries.push(SetEntry::Added {
            value: value.clone(),
        });
    }
    for value in left.difference(right) {
        entries.push(SetEntry::Removed {
            value: value.clone(),
        });
    }
    entries
}

/// Computes the key-union difference of two atom-keyed mappings.
///
/// Keys in both mappings emit [`MapEntry::ValueChanged`] only when the
/// associated values differ (references compare by id, scalars by value);
/// one-sided keys emit `Added`/`Removed`. Entries follow ascending key
/// order over the union.
#[must_use]
pub fn diff_map(left: &BTreeMap<Atom, NodeValue>, right: &BTreeMap<Atom, NodeValue>) -> Vec<MapEntry> {
    let keys: BTreeSet<&Atom> = left.keys().chain(right.keys()).collect();
    let mut entries = Vec::new();
    for key in keys {
        match (left.get(key), right.get(key)) {
            (Some(l), Some(r)) => {
                if l != r {
                    entries.push(MapEntry::ValueChanged {
                        key: key.clone(),
                        left: l.clone(),
                        right: r.clone(),
                    });
                }
            }
            (Some(l), None) => entries.push(MapEntry::Removed {
                key: key.clone(),
                value: l.clone(),
            }),
            (None, Some(r)) => entries.push(MapEntry::Added {
                key: key.clone(),
                value: r.clone(),
            }),
            (None, None) => {}
        }
    }
    entries
}
