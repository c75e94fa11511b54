pub mod app;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;

// Convenience re-exports (keeps call-sites clean)
pub use app::attestation::{AttestationSubmitter, PendingAttestation};
pub use app::workflow_controller::WorkflowController;
pub use crypto::hashing::{digest_bytes, FileDigest};
pub use domain::{
    CertificationRecord, CertificationRequest, Dispatch, SelectedFile, StorageId, WorkflowState,
    WorkflowStatus,
};
pub use error::{AttestError, ErrorKind, HashingFailure, UploadError, WorkflowError};
pub use infra::blob_store::{BlobTransport, HttpBlobStore, UploadCoordinator, UploadLimits};
pub use infra::config::CertifierConfig;
pub use infra::solana;
