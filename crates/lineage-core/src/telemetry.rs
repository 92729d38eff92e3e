// SPDX-License-Identifier: Apache-2.0

// Telemetry helpers for JSONL logging when the `telemetry` feature is enabled.
// Manually formats JSON to avoid non-deterministic serde_json dependency.

use crate::commit::CommitId;
use crate::ident::GlobalId;

fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}

fn emit(kind: &str, commit: CommitId, snapshots: usize, changes: usize) {
    use std::io::Write as _;
    // Manually format JSON to avoid serde_json dependency
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"commit_id":"{}","event":"{}","snapshots":{},"changes":{}}}"#,
        ts_micros(),
        commit,
        kind,
        snapshots,
        changes
    );
    let _ = out.write_all(b"\n");
}

/// Emits a telemetry event when a commit is persisted.
///
/// Logs the commit id with snapshot and change counts as a JSON line to
/// stdout when the `telemetry` feature is enabled. Best-effort: I/O errors
/// are ignored and timestamps fall back to 0 on clock errors.
pub fn commit_persisted(commit: CommitId, snapshots: usize, changes: usize) {
    emit("commit_persisted", commit, snapshots, changes);
}

/// Emits a telemetry event when an empty commit is skipped.
///
/// Logs the consumed commit id as a JSON line to stdout when the `telemetry`
/// feature is enabled. Best-effort: I/O errors are ignored and timestamps
/// fall back to 0 on clock errors.
pub fn commit_skipped(commit: CommitId) {
    emit("commit_skipped", commit, 0, 0);
}

/// Emits a telemetry event when a shadow reconstruction completes.
///
/// Logs the root id and reference commit as a JSON line to stdout when the
/// `telemetry` feature is enabled. Best-effort: I/O errors are ignored and
/// timestamps fall back to 0 on clock errors.
pub fn shadow_built(root: &GlobalId, at: CommitId) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"event":"shadow_built","root":"{}","at":"{}"}}"#,
        ts_micros(),
        root,
        at
    );
    let _ = out.write_all(b"\n");
}
