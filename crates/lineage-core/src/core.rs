// SPDX-License-Identifier: Apache-2.0
//! The audit facade: one entry point wiring classifier, engine, and store.
//!
//! [`Lineage`] owns the commit sequence and the storage handle; everything
//! else is constructed per call. All methods take `&self`, so one instance
//! can be shared across threads when the classifier and store allow it.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::change::Diff;
use crate::commit::{Commit, CommitFactory, CommitSequence};
use crate::diff::{DiffEngine, DiffError};
use crate::graph::{GraphBuildError, GraphBuilder};
use crate::ident::{classify_object, GlobalId, IdentityError, OwnerContext};
use crate::metamodel::{DomainObject, TypeClassifier, TypeKind};
use crate::repository::{CommitRef, SnapshotStore, StorageError};
use crate::shadow::{Shadow, ShadowError, ShadowReconstructor};
use crate::snapshot::CdoSnapshot;

/// Error raised by a commit operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// A committed root is a bare primitive value.
    #[error("cannot commit a bare primitive root of type `{type_name}`")]
    UnsupportedRoot {
        /// Declared type name of the rejected root.
        type_name: String,
    },
    /// Identity classification failed for the deletion target.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// Graph construction failed for one of the committed roots.
    #[error(transparent)]
    GraphBuild(#[from] GraphBuildError),
    /// The snapshot store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Facade over the full audit pipeline.
///
/// Construct once per domain model and storage backend; the instance issues
/// commit ids from its own [`CommitSequence`].
pub struct Lineage<C: TypeClassifier, S: SnapshotStore> {
    classifier: C,
    store: S,
    sequence: CommitSequence,
}

impl<C: TypeClassifier, S: SnapshotStore> Lineage<C, S> {
    /// Constructs a facade whose commit numbering starts at 1.
    #[must_use]
    pub fn new(classifier: C, store: S) -> Self {
        Self::with_sequence(classifier, store, CommitSequence::new())
    }

    /// Constructs a facade resuming numbering from an existing sequence.
    #[must_use]
    pub fn with_sequence(classifier: C, store: S, sequence: CommitSequence) -> Self {
        Self {
            classifier,
            store,
            sequence,
        }
    }

    /// Returns the storage handle.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Compares two live object graphs without touching storage.
    pub fn compare(
        &self,
        old: &dyn DomainObject,
        new: &dyn DomainObject,
    ) -> Result<Diff, DiffError> {
        DiffEngine::new(&self.classifier).compare(old, new)
    }

    /// Produces the initial diff of a first-time object graph.
    pub fn initial(&self, object: &dyn DomainObject) -> Result<Diff, DiffError> {
        DiffEngine::new(&self.classifier).initial(object)
    }

    /// Commits the current state of the graphs rooted at `roots`.
    ///
    /// Builds the live graph, diffs it against the latest persisted snapshot
    /// of every reachable node, and persists one commit holding the diff and
    /// the touched snapshots. An unchanged graph yields an empty commit,
    /// which is returned but never persisted; its id is consumed either way.
    pub fn commit(
        &self,
        author: &str,
        properties: BTreeMap<String, String>,
        roots: &[&dyn DomainObject],
    ) -> Result<Commit, CommitError> {
        for root in roots {
            self.guard_root(*root)?;
        }
        let graph = GraphBuilder::new(&self.classifier).build_many(roots)?;

        let mut prior = Vec::new();
        for id in graph.ids_in_discovery_order() {
            if let Some(snapshot) = self.store.latest(id)? {
                prior.push(snapshot);
            }
        }

        let factory = CommitFactory::new(&self.classifier, &self.sequence);
        let commit = factory.create(author, properties, &prior, &graph);
        if commit.is_empty() {
            #[cfg(feature = "telemetry")]
            crate::telemetry::commit_skipped(commit.id);
            return Ok(commit);
        }
        self.store.persist(&commit)?;
        #[cfg(feature = "telemetry")]
        crate::telemetry::commit_persisted(
            commit.id,
            commit.snapshots.len(),
            commit.changes.len(),
        );
        Ok(commit)
    }

    /// Shallow-deletes a live object: classifies its identity and records a
    /// terminal snapshot for it. Reachable children are untouched.
    pub fn commit_shallow_delete(
        &self,
        author: &str,
        properties: BTreeMap<String, String>,
        object: &dyn DomainObject,
    ) -> Result<Commit, CommitError> {
        let id = classify_object(&self.classifier, object, &OwnerContext::root())?;
        self.commit_shallow_delete_by_id(author, properties, id)
    }

    /// Shallow-deletes by global id, without needing the live object.
    ///
    /// Deleting an id with no history, or one already deleted, still
    /// succeeds and appends another terminal snapshot.
    pub fn commit_shallow_delete_by_id(
        &self,
        author: &str,
        properties: BTreeMap<String, String>,
        id: GlobalId,
    ) -> Result<Commit, CommitError> {
        let prior = self.store.latest(&id)?;
        let factory = CommitFactory::new(&self.classifier, &self.sequence);
        let commit = factory.create_terminal(author, properties, id, prior.as_ref());
        self.store.persist(&commit)?;
        #[cfg(feature = "telemetry")]
        crate::telemetry::commit_persisted(
            commit.id,
            commit.snapshots.len(),
            commit.changes.len(),
        );
        Ok(commit)
    }

    /// Returns the latest persisted snapshot for `id`.
    pub fn latest_snapshot(&self, id: &GlobalId) -> Result<Option<CdoSnapshot>, StorageError> {
        self.store.latest(id)
    }

    /// Returns the latest snapshot for `id` at or before `at`.
    pub fn historical_snapshot(
        &self,
        id: &GlobalId,
        at: &CommitRef,
    ) -> Result<Option<CdoSnapshot>, StorageError> {
        self.store.snapshot_at(id, at)
    }

    /// Rebuilds the historical object rooted at `id` as of `at`.
    ///
    /// Returns `None` when no snapshot exists at or before the reference
    /// point. Reference resolution is bounded by `depth_limit` hops.
    pub fn reconstruct_shadow(
        &self,
        id: &GlobalId,
        at: &CommitRef,
        depth_limit: usize,
    ) -> Result<Option<Shadow>, ShadowError> {
        let Some(root) = self.store.snapshot_at(id, at)? else {
            return Ok(None);
        };
        let shadow = ShadowReconstructor::new(&self.store).reconstruct(&root, depth_limit)?;
        #[cfg(feature = "telemetry")]
        crate::telemetry::shadow_built(id, root.commit_id);
        Ok(Some(shadow))
    }

    fn guard_root(&self, object: &dyn DomainObject) -> Result<(), CommitError> {
        let type_name = object.type_name();
        if self.classifier.classify(type_name) == TypeKind::Primitive {
            return Err(CommitError::UnsupportedRoot {
                type_name: type_name.to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::change::Change;
    use crate::ident::Atom;
    use crate::metamodel::{PropertyDef, PropertyValue, TypeKind, ValueKind};
    use crate::repository::InMemorySnapshotStore;
    use crate::snapshot::SnapshotKind;

    struct TestClassifier;

    impl TypeClassifier for TestClassifier {
        fn classify(&self, type_name: &str) -> TypeKind {
            match type_name {
                "Person" => TypeKind::Entity,
                "i64" => TypeKind::Primitive,
                _ => TypeKind::ValueObject,
            }
        }

        fn properties(&self, type_name: &str) -> Vec<PropertyDef> {
            match type_name {
                "Person" => vec![
                    PropertyDef::new("id", ValueKind::Atom),
                    PropertyDef::new("name", ValueKind::Atom),
                ],
                _ => vec![],
            }
        }

        fn declared_id(&self, object: &dyn DomainObject) -> Option<Atom> {
            match object.property("id") {
                PropertyValue::Atom(a) => Some(a),
                _ => None,
            }
        }
    }

    struct TestObj {
        type_name: &'static str,
        fields: RefCell<std::collections::BTreeMap<String, PropertyValue>>,
    }

    impl TestObj {
        fn new(type_name: &'static str) -> Rc<Self> {
            Rc::new(Self {
                type_name,
                fields: RefCell::new(std::collections::BTreeMap::new()),
            })
        }

        fn set(&self, name: &str, value: PropertyValue) {
            self.fields.borrow_mut().insert(name.to_owned(), value);
        }
    }

    impl DomainObject for TestObj {
        fn type_name(&self) -> &str {
            self.type_name
        }

        fn property(&self, name: &str) -> PropertyValue {
            self.fields
                .borrow()
                .get(name)
                .cloned()
                .unwrap_or(PropertyValue::Absent)
        }
    }

    fn person(id: i64, name: &str) -> Rc<TestObj> {
        let p = TestObj::new("Person");
        p.set("id", PropertyValue::Atom(Atom::Int(id)));
        p.set("name", PropertyValue::Atom(Atom::text(name)));
        p
    }

    fn facade() -> Lineage<TestClassifier, InMemorySnapshotStore> {
        Lineage::new(TestClassifier, InMemorySnapshotStore::new())
    }

    #[test]
    fn commit_then_mutate_then_commit_records_one_value_change() {
        let lineage = facade();
        let ann = person(1, "Ann");

        let first = lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();
        assert_eq!(first.snapshots[0].kind, SnapshotKind::Initial);

        ann.set("name", PropertyValue::Atom(Atom::text("Annie")));
        let second = lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();

        assert_eq!(second.changes.len(), 1);
        assert_eq!(
            second.changes.changes()[0],
            Change::Value {
                id: GlobalId::instance("Person", 1),
                property: "name".to_owned(),
                left: Some(Atom::text("Ann")),
                right: Some(Atom::text("Annie")),
            }
        );
        assert_eq!(second.snapshots[0].version, 2);
    }

    #[test]
    fn unchanged_commit_is_not_persisted() {
        let lineage = facade();
        let ann = person(1, "Ann");

        lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();
        let before = lineage.store().snapshot_count();
        let second = lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();

        assert!(second.is_empty());
        assert_eq!(lineage.store().snapshot_count(), before);
    }

    #[test]
    fn primitive_root_is_rejected() {
        let lineage = facade();
        let bare = TestObj::new("i64");
        let err = lineage
            .commit("ann", BTreeMap::new(), &[bare.as_ref()])
            .unwrap_err();
        assert_eq!(
            err,
            CommitError::UnsupportedRoot {
                type_name: "i64".to_owned()
            }
        );
    }

    #[test]
    fn shallow_delete_appends_terminal_snapshot() {
        let lineage = facade();
        let ann = person(1, "Ann");
        lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();

        let delete = lineage
            .commit_shallow_delete("ann", BTreeMap::new(), ann.as_ref())
            .unwrap();
        assert!(delete.snapshots[0].is_terminal());
        assert_eq!(delete.snapshots[0].version, 2);

        let latest = lineage
            .latest_snapshot(&GlobalId::instance("Person", 1))
            .unwrap()
            .unwrap();
        assert!(latest.is_terminal());
    }

    #[test]
    fn recommit_after_delete_is_a_fresh_initial() {
        let lineage = facade();
        let ann = person(1, "Ann");
        lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();
        lineage
            .commit_shallow_delete("ann", BTreeMap::new(), ann.as_ref())
            .unwrap();

        let third = lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();
        assert_eq!(third.snapshots[0].kind, SnapshotKind::Initial);
        assert_eq!(third.snapshots[0].version, 3);
        assert!(matches!(third.changes.changes()[0], Change::NewObject { .. }));
    }

    #[test]
    fn historical_snapshot_resolves_by_commit() {
        let lineage = facade();
        let ann = person(1, "Ann");
        let first = lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();
        ann.set("name", PropertyValue::Atom(Atom::text("Annie")));
        lineage.commit("ann", BTreeMap::new(), &[ann.as_ref()]).unwrap();

        let id = GlobalId::instance("Person", 1);
        let at_first = lineage
            .historical_snapshot(&id, &CommitRef::Commit(first.id))
            .unwrap()
            .unwrap();
        assert_eq!(
            at_first.state.get("name"),
            Some(&crate::node::NodeValue::Atom(Atom::text("Ann")))
        );
    }
}
