// SPDX-License-Identifier: Apache-2.0
//! Durable per-node state: [`CdoSnapshot`] and its kind taxonomy.
//!
//! A snapshot is the versioned state of one node as captured by one commit.
//! For a fixed global id, snapshots are totally ordered by commit id; the
//! shadow reconstructor only ever combines snapshots at or before its query's
//! reference point.

use std::collections::BTreeMap;

use crate::commit::CommitId;
use crate::graph::LiveGraph;
use crate::ident::GlobalId;
use crate::node::{CdoNode, NodeValue};

/// Lifecycle kind of a snapshot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SnapshotKind {
    /// First captured state of an object.
    Initial,
    /// Subsequent state of an already-tracked object.
    Update,
    /// Shallow delete: the object is considered gone; state is empty.
    Terminal,
}

/// The durable, versioned state of one node.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CdoSnapshot {
    /// Identity of the captured node.
    pub global_id: GlobalId,
    /// Commit that captured this snapshot.
    pub commit_id: CommitId,
    /// Lifecycle kind.
    pub kind: SnapshotKind,
    /// Per-id ordinal, starting at 1 for the initial snapshot.
    pub version: u64,
    /// Captured property state; empty for terminal snapshots.
    pub state: BTreeMap<String, NodeValue>,
}

impl CdoSnapshot {
    /// Constructs a snapshot.
    #[must_use]
    pub fn new(
        global_id: GlobalId,
        commit_id: CommitId,
        kind: SnapshotKind,
        version: u64,
        state: BTreeMap<String, NodeValue>,
    ) -> Self {
        Self {
            global_id,
            commit_id,
            kind,
            version,
            state,
        }
    }

    /// Constructs a terminal snapshot with empty state.
    #[must_use]
    pub fn terminal(global_id: GlobalId, commit_id: CommitId, version: u64) -> Self {
        Self::new(
            global_id,
            commit_id,
            SnapshotKind::Terminal,
            version,
            BTreeMap::new(),
        )
    }

    /// Returns `true` for terminal (shallow delete) snapshots.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind == SnapshotKind::Terminal
    }

    /// Converts this snapshot back into a node carrying the same state.
    #[must_use]
    pub fn to_node(&self) -> CdoNode {
        CdoNode::new(self.global_id.clone(), self.state.clone())
    }
}

/// Rebuilds a graph from persisted snapshots.
///
/// Terminal snapshots are skipped: a deleted object contributes no prior
/// state, so re-committing it later surfaces as a fresh new-object change.
/// Node order follows the input order.
#[must_use]
pub fn graph_from_snapshots<'a>(snapshots: impl IntoIterator<Item = &'a CdoSnapshot>) -> LiveGraph {
    LiveGraph::from_nodes(
        snapshots
            .into_iter()
            .filter(|s| !s.is_terminal())
            .map(CdoSnapshot::to_node),
    )
}
