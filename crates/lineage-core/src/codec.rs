// SPDX-License-Identifier: Apache-2.0
//! CBOR wire codec for persisted records, behind the `serde` feature.
//!
//! Commits and snapshots encode to deterministic CBOR: every map in the data
//! model is a `BTreeMap`, so serialization order is fixed by key order and
//! equal values always produce equal bytes.

use thiserror::Error;

use crate::commit::Commit;
use crate::snapshot::CdoSnapshot;

/// Error raised while encoding or decoding a persisted record.
#[derive(Debug, Error)]
pub enum CodecError {
    /// CBOR serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
    /// CBOR deserialization failed.
    #[error("decode failed: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),
}

/// Encodes a snapshot to CBOR bytes.
pub fn encode_snapshot(snapshot: &CdoSnapshot) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(snapshot, &mut buf)?;
    Ok(buf)
}

/// Decodes a snapshot from CBOR bytes.
pub fn decode_snapshot(bytes: &[u8]) -> Result<CdoSnapshot, CodecError> {
    Ok(ciborium::from_reader(bytes)?)
}

/// Encodes a full commit, snapshots and changes included, to CBOR bytes.
pub fn encode_commit(commit: &Commit) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(commit, &mut buf)?;
    Ok(buf)
}

/// Decodes a commit from CBOR bytes.
pub fn decode_commit(bytes: &[u8]) -> Result<Commit, CodecError> {
    Ok(ciborium::from_reader(bytes)?)
}
