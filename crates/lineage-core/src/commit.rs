// SPDX-License-Identifier: Apache-2.0
//! Commit model: sequenced, authored, immutable units of persisted diffs.
//!
//! [`CommitSequence`] is the single piece of shared mutable state in the
//! core: an atomic counter advanced with one increment-and-read operation so
//! concurrent commits never share an id and ids are strictly increasing in
//! assignment order. Nothing here claims wall-clock ordering; timestamps are
//! advisory metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::change::{Change, Diff};
use crate::diff::DiffEngine;
use crate::graph::LiveGraph;
use crate::ident::GlobalId;
use crate::metamodel::TypeClassifier;
use crate::snapshot::{graph_from_snapshots, CdoSnapshot, SnapshotKind};

/// Monotonic commit identifier: integer major plus integer minor.
///
/// The minor component is non-zero only when one logical operation yields
/// several commits (e.g. cascading initial commits); ordering is
/// lexicographic over `(major, minor)`. Rendered as `"major.minor"` with a
/// two-digit minor, e.g. `3.00`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommitId {
    /// Globally sequenced major component.
    pub major: u64,
    /// Sub-sequence within one logical operation; usually 0.
    pub minor: u32,
}

impl CommitId {
    /// Constructs a commit id.
    #[must_use]
    pub fn new(major: u64, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// Injectable atomic commit counter.
///
/// `next` is a single fetch-and-add: two concurrent callers always receive
/// distinct, strictly increasing values with no duplicates or gaps.
#[derive(Debug, Default)]
pub struct CommitSequence {
    counter: AtomicU64,
}

impl CommitSequence {
    /// Constructs a sequence starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a sequence whose next value is `next`.
    ///
    /// Used to resume numbering above an existing persisted history.
    #[must_use]
    pub fn starting_at(next: u64) -> Self {
        Self {
            counter: AtomicU64::new(next.saturating_sub(1)),
        }
    }

    /// Atomically advances the counter and returns the new value.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the most recently issued value (0 if none yet).
    #[must_use]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Immutable, persisted unit: a sequenced diff with its snapshots.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Commit {
    /// Monotonic commit id.
    pub id: CommitId,
    /// Author recorded for this commit.
    pub author: String,
    /// Milliseconds since the Unix epoch at creation; advisory only.
    pub timestamp_millis: u64,
    /// Free-form commit properties.
    pub properties: BTreeMap<String, String>,
    /// Snapshots captured by this commit, in new-graph discovery order.
    pub snapshots: Vec<CdoSnapshot>,
    /// The structural diff this commit records.
    pub changes: Diff,
}

impl Commit {
    /// Returns `true` if the commit captured no snapshots.
    ///
    /// Callers are expected to skip persisting empty commits; the id has
    /// already been consumed either way.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Builds commits from graphs and prior snapshots.
pub struct CommitFactory<'a> {
    classifier: &'a dyn TypeClassifier,
    sequence: &'a CommitSequence,
}

impl<'a> CommitFactory<'a> {
    /// Constructs a factory drawing ids from `sequence`.
    #[must_use]
    pub fn new(classifier: &'a dyn TypeClassifier, sequence: &'a CommitSequence) -> Self {
        Self {
            classifier,
            sequence,
        }
    }

    /// Creates a commit by diffing `new_graph` against the graph implied by
    /// `prior` snapshots (none for first-time objects).
    ///
    /// One snapshot is emitted per node touched by the diff: new objects get
    /// `Initial` snapshots, property-changed objects get `Update` snapshots.
    /// Terminal priors contribute no state, so a deleted object committed
    /// again becomes a fresh `Initial`.
    #[must_use]
    pub fn create(
        &self,
        author: &str,
        properties: BTreeMap<String, String>,
        prior: &[CdoSnapshot],
        new_graph: &LiveGraph,
    ) -> Commit {
        let old_graph = graph_from_snapshots(prior.iter());
        let diff = DiffEngine::new(self.classifier)
            .compare_graphs(if prior.is_empty() { None } else { Some(&old_graph) }, new_graph);

        let id = CommitId::new(self.sequence.next(), 0);

        let mut new_ids: BTreeSet<&GlobalId> = BTreeSet::new();
        let mut updated_ids: BTreeSet<&GlobalId> = BTreeSet::new();
        for change in &diff {
            match change {
                Change::NewObject { id } => {
                    new_ids.insert(id);
                }
                Change::Value { id, .. }
                | Change::Reference { id, .. }
                | Change::Container { id, .. } => {
                    updated_ids.insert(id);
                }
                Change::ObjectRemoved { .. } => {}
            }
        }

        let prior_versions: BTreeMap<&GlobalId, u64> =
            prior.iter().map(|s| (&s.global_id, s.version)).collect();

        let mut snapshots = Vec::new();
        for node_id in new_graph.ids_in_discovery_order() {
            let kind = if new_ids.contains(node_id) {
                SnapshotKind::Initial
            } else if updated_ids.contains(node_id) {
                SnapshotKind::Update
            } else {
                continue;
            };
            let Some(node) = new_graph.node(node_id) else {
                continue;
            };
            let version = prior_versions.get(node_id).map_or(1, |v| v + 1);
            snapshots.push(CdoSnapshot::new(
                node_id.clone(),
                id,
                kind,
                version,
                node.state.clone(),
            ));
        }

        Commit {
            id,
            author: author.to_owned(),
            timestamp_millis: now_millis(),
            properties,
            snapshots,
            changes: diff,
        }
    }

    /// Creates a terminal (shallow delete) commit for `global_id`.
    ///
    /// Not preceded by any diff against the object's own state; the commit
    /// carries one terminal snapshot and an object-removed change. Deleting
    /// an already-deleted object is not a failure: it simply appends another
    /// terminal snapshot.
    #[must_use]
    pub fn create_terminal(
        &self,
        author: &str,
        properties: BTreeMap<String, String>,
        global_id: GlobalId,
        prior: Option<&CdoSnapshot>,
    ) -> Commit {
        let id = CommitId::new(self.sequence.next(), 0);
        let version = prior.map_or(1, |s| s.version + 1);
        let snapshot = CdoSnapshot::terminal(global_id.clone(), id, version);
        Commit {
            id,
            author: author.to_owned(),
            timestamp_millis: now_millis(),
            properties,
            snapshots: vec![snapshot],
            changes: Diff::new(vec![Change::ObjectRemoved { id: global_id }]),
        }
    }
}
