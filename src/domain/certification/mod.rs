//! Data model of a certification attempt.

mod record;
mod request;

pub use record::{CertificationRecord, StorageId};
pub use request::{CertificationRequest, PayloadSource, SelectedFile, DEFAULT_CONTENT_TYPE};
