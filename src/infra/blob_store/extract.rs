//! Tolerant extraction of the store-assigned identifier.
//!
//! The publisher answers in several shapes depending on whether the blob was
//! newly created or already known. Probes are tried in order; first match wins.

use crate::domain::certification::StorageId;
use serde_json::Value;

/// Field paths that may hold the blob identifier, in priority order.
pub const IDENTIFIER_PROBES: &[&[&str]] = &[
    &["newlyCreated", "blobObject", "blobId"],
    &["alreadyCertified", "blobId"],
    &["blobId"],
    &["id"],
    &["blob", "id"],
];

fn lookup(response: &Value, path: &[&str]) -> Option<String> {
    let mut node = response;
    for key in path {
        node = node.get(*key)?;
    }
    match node {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the identifier found by the first path that matches.
pub fn extract_storage_id(response: &Value) -> Option<StorageId> {
    IDENTIFIER_PROBES
        .iter()
        .find_map(|path| lookup(response, path))
        .map(StorageId::new)
}
