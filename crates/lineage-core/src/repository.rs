// SPDX-License-Identifier: Apache-2.0
//! Snapshot store contract and the in-memory reference store.
//!
//! The core consumes durable storage through this narrow persist/read
//! surface; concrete backends live outside the core. Reads resolve the
//! single latest snapshot at or before a reference point, which is the only
//! ordering a backend must honor.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::commit::{Commit, CommitId};
use crate::ident::GlobalId;
use crate::snapshot::CdoSnapshot;

/// Reference point for historical reads.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommitRef {
    /// At or before the given commit id.
    Commit(CommitId),
    /// At or before the given wall-clock instant (Unix milliseconds).
    Time(u64),
}

/// Opaque failure surfaced by a storage backend, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend reported a failure.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Durable keyed storage for commits and their snapshots.
///
/// Implementations must be append-only per global id and must never reorder
/// snapshots relative to their commit ids. The core never retries a failed
/// call; resilience policy belongs to the backend.
pub trait SnapshotStore {
    /// Persists a commit with all of its snapshots, atomically.
    fn persist(&self, commit: &Commit) -> Result<(), StorageError>;

    /// Returns the latest snapshot recorded for `id`, if any.
    fn latest(&self, id: &GlobalId) -> Result<Option<CdoSnapshot>, StorageError>;

    /// Returns the single latest snapshot for `id` at or before `at`.
    fn snapshot_at(&self, id: &GlobalId, at: &CommitRef)
        -> Result<Option<CdoSnapshot>, StorageError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for &S {
    fn persist(&self, commit: &Commit) -> Result<(), StorageError> {
        (**self).persist(commit)
    }

    fn latest(&self, id: &GlobalId) -> Result<Option<CdoSnapshot>, StorageError> {
        (**self).latest(id)
    }

    fn snapshot_at(
        &self,
        id: &GlobalId,
        at: &CommitRef,
    ) -> Result<Option<CdoSnapshot>, StorageError> {
        (**self).snapshot_at(id, at)
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    by_id: BTreeMap<GlobalId, Vec<CdoSnapshot>>,
    commit_times: BTreeMap<CommitId, u64>,
}

/// In-memory, append-only snapshot store.
///
/// The reference implementation of [`SnapshotStore`]: suitable for tests and
/// for embedding where durability is not required. Snapshots per id are kept
/// sorted by commit id even when commits are persisted out of order by
/// concurrent callers.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    inner: Mutex<StoreInner>,
}

impl InMemorySnapshotStore {
    /// Constructs an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total number of snapshots held, across all ids.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.lock().by_id.values().map(Vec::len).sum()
    }

    /// All snapshots recorded for `id`, oldest first.
    #[must_use]
    pub fn history(&self, id: &GlobalId) -> Vec<CdoSnapshot> {
        self.lock().by_id.get(id).cloned().unwrap_or_default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn persist(&self, commit: &Commit) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.commit_times.insert(commit.id, commit.timestamp_millis);
        for snapshot in &commit.snapshots {
            let bucket = inner.by_id.entry(snapshot.global_id.clone()).or_default();
            let pos = bucket.partition_point(|s| s.commit_id <= snapshot.commit_id);
            bucket.insert(pos, snapshot.clone());
        }
        Ok(())
    }

    fn latest(&self, id: &GlobalId) -> Result<Option<CdoSnapshot>, StorageError> {
        Ok(self.lock().by_id.get(id).and_then(|b| b.last().cloned()))
    }

    fn snapshot_at(
        &self,
        id: &GlobalId,
        at: &CommitRef,
    ) -> Result<Option<CdoSnapshot>, StorageError> {
        let inner = self.lock();
        let Some(bucket) = inner.by_id.get(id) else {
            return Ok(None);
        };
        let found = match at {
            CommitRef::Commit(commit_id) => bucket
                .iter()
                .rev()
                .find(|s| s.commit_id <= *commit_id),
            CommitRef::Time(millis) => bucket.iter().rev().find(|s| {
                inner
                    .commit_times
                    .get(&s.commit_id)
                    .is_some_and(|t| *t <= *millis)
            }),
        };
        Ok(found.cloned())
    }
}
