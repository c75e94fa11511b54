//! Workflow states and the snapshot observers see.

use crate::domain::certification::{CertificationRecord, CertificationRequest};
use crate::error::ErrorKind;
use serde::Serialize;
use std::fmt;

/// The single finite-state variable of a certification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    Hashing,
    Uploading,
    Stamping,
    Success,
    Error,
}

impl WorkflowState {
    /// True while a stage's work is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Hashing | Self::Uploading | Self::Stamping)
    }

    /// States from which upload and stamp operations may start.
    pub fn accepts_operations(self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Hashing => "hashing",
            Self::Uploading => "uploading",
            Self::Stamping => "stamping",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// What a dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The operation started; its result arrives as an event.
    Started,
    /// Another stage is in flight; nothing happened.
    Ignored,
    /// Preconditions failed; the reason is also stored as `last_error`.
    Rejected(String),
}

/// Consistent view of the workflow for any observer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WorkflowStatus {
    pub state: WorkflowState,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub digest: Option<String>,
    pub storage_id: Option<String>,
    pub last_error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub record: Option<CertificationRecord>,
}

impl WorkflowStatus {
    pub(crate) fn capture(
        state: WorkflowState,
        request: &CertificationRequest,
        record: Option<&CertificationRecord>,
    ) -> Self {
        Self {
            state,
            file_name: request.file().map(|f| f.name().to_string()),
            file_size: request.file().map(|f| f.size()),
            digest: request.digest().map(|d| d.to_string()),
            storage_id: request.storage_id().map(|s| s.to_string()),
            last_error: request.last_error().map(|e| e.to_string()),
            error_kind: request.last_error().map(|e| e.kind()),
            record: record.cloned(),
        }
    }
}
