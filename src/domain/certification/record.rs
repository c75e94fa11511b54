use crate::crypto::hashing::FileDigest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the blob store to an uploaded payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(String);

impl StorageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof that a file's digest and storage id were anchored on the ledger.
///
/// Built once when the attestation succeeds and replaced wholesale by the
/// next attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationRecord {
    pub file_name: String,
    pub storage_id: StorageId,
    pub digest: FileDigest,
    pub ledger_transaction_id: String,
}
