//! The per-attempt Certification Request and the file it is about.

use crate::crypto::hashing::FileDigest;
use crate::domain::certification::StorageId;
use crate::error::WorkflowError;
use bytes::Bytes;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Content type sent when the caller did not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Where a selected file's bytes come from.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    Memory(Bytes),
    Path(PathBuf),
}

impl fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(bytes) => write!(f, "{} in-memory bytes", bytes.len()),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A file chosen by the user (drag-drop, picker or programmatic).
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    size: u64,
    mime_type: Option<String>,
    source: PayloadSource,
}

impl SelectedFile {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: None,
            source: PayloadSource::Memory(bytes),
        }
    }

    /// Describes a file on disk. Only metadata is read here; the bytes are
    /// read by the fingerprint stage.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;
        Ok(Self {
            name,
            size: metadata.len(),
            mime_type: None,
            source: PayloadSource::Path(path.to_path_buf()),
        })
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        self.mime_type = (!mime_type.trim().is_empty()).then_some(mime_type);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// `Content-Type` for the upload.
    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn source(&self) -> &PayloadSource {
        &self.source
    }
}

/// Everything one certification attempt knows about its file.
///
/// `digest` and `storage_id` only ever describe the file currently held in
/// `file`; selecting another file builds a fresh request.
#[derive(Debug, Default)]
pub struct CertificationRequest {
    pub(crate) file: Option<SelectedFile>,
    /// Bytes that were fingerprinted, kept for the upload stage unless they
    /// exceed the upload ceiling.
    pub(crate) payload: Option<Bytes>,
    pub(crate) digest: Option<FileDigest>,
    /// Number of bytes the digest covers.
    pub(crate) hashed_size: u64,
    pub(crate) storage_id: Option<StorageId>,
    pub(crate) last_error: Option<WorkflowError>,
}

impl CertificationRequest {
    pub fn for_file(file: SelectedFile) -> Self {
        Self {
            file: Some(file),
            ..Self::default()
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn digest(&self) -> Option<&FileDigest> {
        self.digest.as_ref()
    }

    pub fn storage_id(&self) -> Option<&StorageId> {
        self.storage_id.as_ref()
    }

    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.last_error.as_ref()
    }
}
