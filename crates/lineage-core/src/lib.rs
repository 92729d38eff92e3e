// SPDX-License-Identifier: Apache-2.0
//! lineage-core: object-graph auditing with versioned snapshots.
//!
//! The crate diffs live object graphs against their persisted history,
//! records changes as commits of versioned snapshots, and rebuilds
//! historical object state on demand. Host models plug in through the
//! [`TypeClassifier`] and [`DomainObject`] seams; storage plugs in through
//! [`SnapshotStore`].
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod appenders;
mod change;
/// CBOR wire codec for commits and snapshots.
#[cfg(feature = "serde")]
pub mod codec;
mod commit;
mod containers;
mod core;
mod diff;
mod graph;
mod ident;
mod metamodel;
mod node;
mod repository;
mod shadow;
mod snapshot;
#[cfg(feature = "telemetry")]
mod telemetry;

// Re-exports for stable public API
/// Change detectors and the pluggable appender registry.
pub use appenders::{
    container_change_appender, default_appenders, new_object_appender, object_removed_appender,
    reference_change_appender, value_change_appender, Appender, NodePair,
};
/// The change taxonomy and diff result type.
pub use change::{Change, ContainerEntries, Diff, ListEntry, MapEntry, SetEntry};
/// Commit model: ids, the atomic sequence, and the commit factory.
pub use commit::{Commit, CommitFactory, CommitId, CommitSequence};
/// Container difference algorithms (list edit script, set and map diffs).
pub use containers::{diff_list, diff_map, diff_set};
/// The audit facade and its commit error type.
pub use self::core::{CommitError, Lineage};
/// Graph-to-graph diff engine.
pub use diff::{DiffEngine, DiffError};
/// Live-object traversal and the resulting node graph.
pub use graph::{GraphBuildError, GraphBuilder, LiveGraph};
/// Structural identity: atoms, paths, and global ids.
pub use ident::{
    classify_object, Atom, GlobalId, IdentityError, InstanceId, OwnerContext, PropertyPath,
    UnboundedValueObjectId, ValueObjectId,
};
/// Injected metamodel seams for host types.
pub use metamodel::{
    DomainObject, ObjectHandle, PropertyDef, PropertyValue, TypeClassifier, TypeKind, ValueKind,
};
/// Materialized node state.
pub use node::{CdoNode, NodeValue};
/// Snapshot storage contract and the in-memory reference store.
pub use repository::{CommitRef, InMemorySnapshotStore, SnapshotStore, StorageError};
/// Shadow reconstruction of historical object state.
pub use shadow::{Shadow, ShadowError, ShadowNode, ShadowReconstructor, ShadowValue};
/// Versioned per-node snapshots.
pub use snapshot::{graph_from_snapshots, CdoSnapshot, SnapshotKind};
