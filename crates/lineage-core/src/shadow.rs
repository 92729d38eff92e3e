// SPDX-License-Identifier: Apache-2.0
//! Shadow reconstruction: depth-bounded rehydration of historical state.
//!
//! A shadow is a read-only materialization of one object as it stood at a
//! reference commit, rebuilt from persisted snapshots. References resolve to
//! the latest snapshot at or before the root snapshot's commit; resolution
//! stops at the configured depth, leaving [`ShadowValue::Unresolved`]
//! markers rather than failing. A terminal target always resolves to
//! [`ShadowValue::Deleted`], never to partially-rebuilt state.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::commit::CommitId;
use crate::ident::{Atom, GlobalId};
use crate::node::NodeValue;
use crate::repository::{CommitRef, SnapshotStore, StorageError};
use crate::snapshot::CdoSnapshot;

/// Error raised during shadow reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShadowError {
    /// A required reference has no snapshot at or before the reference
    /// commit. This signals a gap or corruption in persisted history and is
    /// reported, never silently ignored.
    #[error("no snapshot for `{id}` at or before commit {at}")]
    DanglingReference {
        /// The unresolvable reference target.
        id: GlobalId,
        /// The reference commit of the reconstruction.
        at: CommitId,
    },
    /// The snapshot store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Rehydrated value of one shadow property.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ShadowValue {
    /// A primitive value copied from the snapshot.
    Atom(Atom),
    /// A fully resolved referenced object.
    Object(Box<ShadowNode>),
    /// The referenced object was deleted at or before the reference commit.
    Deleted(GlobalId),
    /// Reference left unresolved: depth exhausted, or a cycle back onto the
    /// active resolution path.
    Unresolved(GlobalId),
    /// An ordered sequence of rehydrated values.
    List(Vec<ShadowValue>),
    /// An unordered collection of rehydrated values, in canonical order.
    Set(Vec<ShadowValue>),
    /// An atom-keyed mapping of rehydrated values, in key order.
    Map(Vec<(Atom, ShadowValue)>),
}

/// One rehydrated node of a shadow.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ShadowNode {
    /// Identity of the rehydrated object.
    pub global_id: GlobalId,
    /// Commit of the snapshot this node was rebuilt from.
    pub commit_id: CommitId,
    /// Rehydrated property state.
    pub state: BTreeMap<String, ShadowValue>,
}

impl ShadowNode {
    /// Returns the rehydrated value of the named property, if recorded.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&ShadowValue> {
        self.state.get(name)
    }
}

/// Read-only historical object view built from snapshots.
///
/// Constructed per query; never persisted, never mutated after
/// construction; owns no identity beyond the snapshot it was built from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Shadow {
    /// The object existed at the reference commit.
    Object(ShadowNode),
    /// The object was already deleted at the reference commit.
    Deleted(GlobalId),
}

impl Shadow {
    /// Returns the root node for live shadows.
    #[must_use]
    pub fn node(&self) -> Option<&ShadowNode> {
        match self {
            Self::Object(node) => Some(node),
            Self::Deleted(_) => None,
        }
    }

    /// Returns `true` if the object was deleted at the reference commit.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }
}

/// Rebuilds shadows from a snapshot store.
pub struct ShadowReconstructor<'a, S: SnapshotStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SnapshotStore + ?Sized> ShadowReconstructor<'a, S> {
    /// Constructs a reconstructor reading from `store`.
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Rebuilds the historical object rooted at `root`.
    ///
    /// `depth_limit` bounds reference resolution: it is the number of
    /// reference hops from the root that may be followed; the root itself is
    /// always materialized. Resolved snapshots are cached per
    /// reconstruction, so each referenced id costs at most one store read.
    pub fn reconstruct(
        &self,
        root: &CdoSnapshot,
        depth_limit: usize,
    ) -> Result<Shadow, ShadowError> {
        if root.is_terminal() {
            return Ok(Shadow::Deleted(root.global_id.clone()));
        }
        let mut cache: BTreeMap<GlobalId, CdoSnapshot> = BTreeMap::new();
        let mut path: Vec<GlobalId> = Vec::new();
        let node = self.build_node(root, depth_limit, root.commit_id, &mut path, &mut cache)?;
        Ok(Shadow::Object(node))
    }

    fn build_node(
        &self,
        snapshot: &CdoSnapshot,
        depth: usize,
        at: CommitId,
        path: &mut Vec<GlobalId>,
        cache: &mut BTreeMap<GlobalId, CdoSnapshot>,
    ) -> Result<ShadowNode, ShadowError> {
        path.push(snapshot.global_id.clone());
        let mut state = BTreeMap::new();
        for (name, value) in &snapshot.state {
            let resolved = self.resolve_value(value, depth, at, path, cache)?;
            state.insert(name.clone(), resolved);
        }
        path.pop();
        Ok(ShadowNode {
            global_id: snapshot.global_id.clone(),
            commit_id: snapshot.commit_id,
            state,
        })
    }

    fn resolve_value(
        &self,
        value: &NodeValue,
        depth: usize,
        at: CommitId,
        path: &mut Vec<GlobalId>,
        cache: &mut BTreeMap<GlobalId, CdoSnapshot>,
    ) -> Result<ShadowValue, ShadowError> {
        match value {
            NodeValue::Atom(a) => Ok(ShadowValue::Atom(a.clone())),
            NodeValue::Ref(id) => self.resolve_ref(id, depth, at, path, cache),
            NodeValue::List(vs) => {
                let mut out = Vec::with_capacity(vs.len());
                for v in vs {
                    out.push(self.resolve_value(v, depth, at, path, cache)?);
                }
                Ok(ShadowValue::List(out))
            }
            NodeValue::Set(vs) => {
                let mut out = Vec::with_capacity(vs.len());
                for v in vs {
                    out.push(self.resolve_value(v, depth, at, path, cache)?);
                }
                Ok(ShadowValue::Set(out))
            }
            NodeValue::Map(kvs) => {
                let mut out = Vec::with_capacity(kvs.len());
                for (k, v) in kvs {
                    out.push((k.clone(), self.resolve_value(v, depth, at, path, cache)?));
                }
                Ok(ShadowValue::Map(out))
            }
        }
    }

    fn resolve_ref(
        &self,
        id: &GlobalId,
        depth: usize,
        at: CommitId,
        path: &mut Vec<GlobalId>,
        cache: &mut BTreeMap<GlobalId, CdoSnapshot>,
    ) -> Result<ShadowValue, ShadowError> {
        if depth == 0 {
            return Ok(ShadowValue::Unresolved(id.clone()));
        }
        if path.contains(id) {
            // A shadow is an immutable tree; a reference back onto the
            // active resolution path cannot alias its ancestor.
            return Ok(ShadowValue::Unresolved(id.clone()));
        }

        let snapshot = match cache.get(id) {
            Some(s) => s.clone(),
            None => {
                let fetched = self
                    .store
                    .snapshot_at(id, &CommitRef::Commit(at))?
                    .ok_or_else(|| ShadowError::DanglingReference {
                        id: id.clone(),
                        at,
                    })?;
                cache.insert(id.clone(), fetched.clone());
                fetched
            }
        };

        if snapshot.is_terminal() {
            return Ok(ShadowValue::Deleted(id.clone()));
        }
        let node = self.build_node(&snapshot, depth - 1, at, path, cache)?;
        Ok(ShadowValue::Object(Box::new(node)))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::commit::Commit;
    use crate::change::Diff;
    use crate::node::NodeValue;
    use crate::repository::InMemorySnapshotStore;
    use crate::snapshot::SnapshotKind;

    fn persist(store: &InMemorySnapshotStore, snapshots: Vec<CdoSnapshot>, millis: u64) {
        let id = snapshots[0].commit_id;
        store
            .persist(&Commit {
                id,
                author: "ann".to_owned(),
                timestamp_millis: millis,
                properties: BTreeMap::new(),
                snapshots,
                changes: Diff::default(),
            })
            .unwrap();
    }

    fn snapshot_with(
        id: &GlobalId,
        commit: CommitId,
        version: u64,
        entries: &[(&str, NodeValue)],
    ) -> CdoSnapshot {
        let kind = if version == 1 {
            SnapshotKind::Initial
        } else {
            SnapshotKind::Update
        };
        let state = entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        CdoSnapshot::new(id.clone(), commit, kind, version, state)
    }

    #[test]
    fn references_resolve_at_or_before_reference_commit() {
        let store = InMemorySnapshotStore::new();
        let ann = GlobalId::instance("Person", 1);
        let bob = GlobalId::instance("Person", 2);

        persist(
            &store,
            vec![snapshot_with(
                &bob,
                CommitId::new(1, 0),
                1,
                &[("name", NodeValue::Atom(Atom::text("Bob")))],
            )],
            10,
        );
        persist(
            &store,
            vec![snapshot_with(
                &ann,
                CommitId::new(2, 0),
                1,
                &[("boss", NodeValue::Ref(bob.clone()))],
            )],
            20,
        );
        // Later state of bob must not leak into a reconstruction at commit 2.
        persist(
            &store,
            vec![snapshot_with(
                &bob,
                CommitId::new(3, 0),
                2,
                &[("name", NodeValue::Atom(Atom::text("Robert")))],
            )],
            30,
        );

        let root = store
            .snapshot_at(&ann, &CommitRef::Commit(CommitId::new(2, 0)))
            .unwrap()
            .unwrap();
        let shadow = ShadowReconstructor::new(&store)
            .reconstruct(&root, 4)
            .unwrap();

        let node = shadow.node().unwrap();
        match node.property("boss").unwrap() {
            ShadowValue::Object(boss) => {
                assert_eq!(boss.commit_id, CommitId::new(1, 0));
                assert_eq!(
                    boss.property("name"),
                    Some(&ShadowValue::Atom(Atom::text("Bob")))
                );
            }
            other => unreachable!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn depth_exhaustion_leaves_unresolved_markers() {
        let store = InMemorySnapshotStore::new();
        let ann = GlobalId::instance("Person", 1);
        let bob = GlobalId::instance("Person", 2);

        persist(
            &store,
            vec![
                snapshot_with(
                    &ann,
                    CommitId::new(1, 0),
                    1,
                    &[("boss", NodeValue::Ref(bob.clone()))],
                ),
                snapshot_with(&bob, CommitId::new(1, 0), 1, &[]),
            ],
            10,
        );

        let root = store.latest(&ann).unwrap().unwrap();
        let shadow = ShadowReconstructor::new(&store)
            .reconstruct(&root, 0)
            .unwrap();
        assert_eq!(
            shadow.node().unwrap().property("boss"),
            Some(&ShadowValue::Unresolved(bob))
        );
    }

    #[test]
    fn terminal_target_resolves_to_deleted_marker() {
        let store = InMemorySnapshotStore::new();
        let ann = GlobalId::instance("Person", 1);
        let bob = GlobalId::instance("Person", 2);

        persist(
            &store,
            vec![snapshot_with(
                &bob,
                CommitId::new(1, 0),
                1,
                &[("name", NodeValue::Atom(Atom::text("Bob")))],
            )],
            10,
        );
        persist(
            &store,
            vec![CdoSnapshot::terminal(bob.clone(), CommitId::new(2, 0), 2)],
            20,
        );
        persist(
            &store,
            vec![snapshot_with(
                &ann,
                CommitId::new(3, 0),
                1,
                &[("boss", NodeValue::Ref(bob.clone()))],
            )],
            30,
        );

        let root = store.latest(&ann).unwrap().unwrap();
        let shadow = ShadowReconstructor::new(&store)
            .reconstruct(&root, 4)
            .unwrap();
        // Never stale field values: the terminal snapshot masks commit 1.
        assert_eq!(
            shadow.node().unwrap().property("boss"),
            Some(&ShadowValue::Deleted(bob))
        );
    }

    #[test]
    fn missing_required_snapshot_is_a_dangling_reference() {
        let store = InMemorySnapshotStore::new();
        let ann = GlobalId::instance("Person", 1);
        let ghost = GlobalId::instance("Person", 99);

        persist(
            &store,
            vec![snapshot_with(
                &ann,
                CommitId::new(1, 0),
                1,
                &[("boss", NodeValue::Ref(ghost.clone()))],
            )],
            10,
        );

        let root = store.latest(&ann).unwrap().unwrap();
        let err = ShadowReconstructor::new(&store)
            .reconstruct(&root, 4)
            .unwrap_err();
        assert_eq!(
            err,
            ShadowError::DanglingReference {
                id: ghost,
                at: CommitId::new(1, 0)
            }
        );
    }

    #[test]
    fn cyclic_references_terminate_with_unresolved_marker() {
        let store = InMemorySnapshotStore::new();
        let ann = GlobalId::instance("Person", 1);

        persist(
            &store,
            vec![snapshot_with(
                &ann,
                CommitId::new(1, 0),
                1,
                &[("next", NodeValue::Ref(ann.clone()))],
            )],
            10,
        );

        let root = store.latest(&ann).unwrap().unwrap();
        let shadow = ShadowReconstructor::new(&store)
            .reconstruct(&root, 10)
            .unwrap();
        assert_eq!(
            shadow.node().unwrap().property("next"),
            Some(&ShadowValue::Unresolved(ann))
        );
    }

    #[test]
    fn terminal_root_reconstructs_as_deleted() {
        let store = InMemorySnapshotStore::new();
        let ann = GlobalId::instance("Person", 1);
        let root = CdoSnapshot::terminal(ann.clone(), CommitId::new(5, 0), 3);
        let shadow = ShadowReconstructor::new(&store)
            .reconstruct(&root, 4)
            .unwrap();
        assert_eq!(shadow, Shadow::Deleted(ann));
        assert!(shadow.is_deleted());
    }
}
