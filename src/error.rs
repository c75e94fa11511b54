//! Error kinds surfaced by the certification workflow.
//!
//! Each stage classifies its own failures at the point they happen; nothing
//! downstream inspects messages to decide what went wrong.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const MIB: f64 = 1024.0 * 1024.0;

fn mib(bytes: &u64) -> String {
    format!("{:.2} MiB", *bytes as f64 / MIB)
}

fn secs(duration: &Duration) -> u64 {
    duration.as_secs()
}

fn signer_message(message: &Option<String>) -> &str {
    match message.as_deref() {
        Some(m) if !m.trim().is_empty() => m,
        _ => "Transaction failed",
    }
}

/// The fingerprint could not be computed because the payload was unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to calculate file hash: {reason}")]
pub struct HashingFailure {
    pub reason: String,
}

impl HashingFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failures of a single upload attempt against the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("File is too large: {size} bytes ({}) exceeds the {} limit", mib(.size), mib(.limit))]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error(
        "Upload timeout after {}s: the {size}-byte ({}) file did not finish uploading",
        secs(.timeout),
        mib(.size)
    )]
    UploadTimeout { size: u64, timeout: Duration },

    #[error("Upload failed: blob store answered {status}. {body}")]
    StoreRejected { status: u16, body: String },

    #[error("Invalid JSON response: {body}")]
    InvalidStoreResponse { body: String },

    #[error("Blob ID not found in response. Response structure: {response}")]
    IdentifierMissing { response: String },

    #[error("Network error - could not connect to the blob store: {reason}")]
    NetworkUnavailable { reason: String },
}

/// Failures of the attestation (ledger stamping) stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttestError {
    #[error("File, hash, or wallet not ready for stamping: {missing}")]
    NotReady { missing: &'static str },

    /// Carries the signing collaborator's message verbatim when it gave one.
    #[error("{}", signer_message(.message))]
    TransactionFailed { message: Option<String> },
}

/// Anything that can end up in the request's `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Hashing(#[from] HashingFailure),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Attestation(#[from] AttestError),

    /// An operation was invoked outside its preconditions.
    #[error("{0}")]
    Validation(String),
}

/// Flat tag for every error kind, stable for display and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    HashingFailure,
    PayloadTooLarge,
    UploadTimeout,
    StoreRejected,
    InvalidStoreResponse,
    IdentifierMissing,
    NetworkUnavailable,
    NotReady,
    TransactionFailed,
    Validation,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Hashing(_) => ErrorKind::HashingFailure,
            Self::Upload(e) => match e {
                UploadError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
                UploadError::UploadTimeout { .. } => ErrorKind::UploadTimeout,
                UploadError::StoreRejected { .. } => ErrorKind::StoreRejected,
                UploadError::InvalidStoreResponse { .. } => ErrorKind::InvalidStoreResponse,
                UploadError::IdentifierMissing { .. } => ErrorKind::IdentifierMissing,
                UploadError::NetworkUnavailable { .. } => ErrorKind::NetworkUnavailable,
            },
            Self::Attestation(e) => match e {
                AttestError::NotReady { .. } => ErrorKind::NotReady,
                AttestError::TransactionFailed { .. } => ErrorKind::TransactionFailed,
            },
            Self::Validation(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_size_and_timeout() {
        let err = UploadError::UploadTimeout {
            size: 62_914_560,
            timeout: Duration::from_secs(150),
        };
        let msg = err.to_string();
        assert!(msg.to_lowercase().contains("timeout"));
        assert!(msg.contains("62914560"));
        assert!(msg.contains("60.00 MiB"));
        assert!(msg.contains("150s"));
    }

    #[test]
    fn signer_message_is_verbatim_or_generic() {
        let verbatim = AttestError::TransactionFailed {
            message: Some("User rejected the request".into()),
        };
        assert_eq!(verbatim.to_string(), "User rejected the request");

        let generic = AttestError::TransactionFailed { message: None };
        assert_eq!(generic.to_string(), "Transaction failed");

        let blank = AttestError::TransactionFailed {
            message: Some("  ".into()),
        };
        assert_eq!(blank.to_string(), "Transaction failed");
    }

    #[test]
    fn kinds_follow_variants() {
        let err: WorkflowError = UploadError::PayloadTooLarge { size: 2, limit: 1 }.into();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
        let err: WorkflowError = AttestError::NotReady { missing: "wallet" }.into();
        assert_eq!(err.kind(), ErrorKind::NotReady);
        assert_eq!(
            WorkflowError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
    }
}
