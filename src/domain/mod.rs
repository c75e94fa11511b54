//! Certification data model and workflow states.

pub mod certification;
pub mod workflow;

pub use certification::{CertificationRecord, CertificationRequest, SelectedFile, StorageId};
pub use workflow::{Dispatch, WorkflowState, WorkflowStatus};
