//! Upload Coordinator: one bounded-time write of a payload to the blob store.
//!
//! Each call is a single attempt. No retries, no chunking; the identifier
//! returned is authoritative for that call only.

pub mod extract;
pub mod http;

use crate::domain::certification::StorageId;
use crate::error::UploadError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use extract::{extract_storage_id, IDENTIFIER_PROBES};
pub use http::HttpBlobStore;

pub const MIB: u64 = 1024 * 1024;
/// Largest accepted payload (inclusive).
pub const MAX_UPLOAD_BYTES: u64 = 50 * MIB;
pub const BASE_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra allowance per started MiB of payload.
pub const UPLOAD_TIMEOUT_PER_MIB: Duration = Duration::from_secs(2);

/// Size ceiling and size-proportional timeout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: u64,
    pub base_timeout: Duration,
    pub timeout_per_mib: Duration,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            base_timeout: BASE_UPLOAD_TIMEOUT,
            timeout_per_mib: UPLOAD_TIMEOUT_PER_MIB,
        }
    }
}

impl UploadLimits {
    /// Wall-clock budget for a payload of `size` bytes.
    pub fn timeout_for(&self, size: u64) -> Duration {
        let started_mib = size.div_ceil(MIB);
        let extra = u32::try_from(started_mib).unwrap_or(u32::MAX);
        self.base_timeout
            .saturating_add(self.timeout_per_mib.saturating_mul(extra))
    }
}

/// Raw answer of the store to a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReply {
    pub status: u16,
    pub body: String,
}

impl StoreReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure, classified where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The store could not be reached or the connection broke.
    Unreachable(String),
    /// The transport gave up on its own deadline.
    TimedOut,
}

/// The write half of the blob store API.
#[async_trait]
pub trait BlobTransport: Send + Sync {
    async fn put_blob(
        &self,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoreReply, TransportFailure>;
}

/// Validates, sends and interprets a single upload.
#[derive(Clone)]
pub struct UploadCoordinator {
    transport: Arc<dyn BlobTransport>,
    limits: UploadLimits,
}

impl UploadCoordinator {
    pub fn new(transport: Arc<dyn BlobTransport>, limits: UploadLimits) -> Self {
        Self { transport, limits }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Uploads `payload` and returns the store-assigned identifier.
    ///
    /// Oversized payloads are refused before any network call. The request is
    /// dropped (and so aborted) once the size-derived deadline passes.
    pub async fn upload(
        &self,
        payload: Bytes,
        content_type: &str,
    ) -> Result<StorageId, UploadError> {
        let size = payload.len() as u64;
        if size > self.limits.max_bytes {
            return Err(self.oversized(size));
        }

        let timeout = self.limits.timeout_for(size);
        tracing::info!(
            size,
            content_type,
            timeout_secs = timeout.as_secs(),
            "uploading payload to blob store"
        );

        let started = Instant::now();
        let put = self.transport.put_blob(payload, content_type);
        let reply = match tokio::time::timeout(timeout, put).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(TransportFailure::TimedOut)) | Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(size, elapsed_ms, "upload timed out");
                return Err(UploadError::UploadTimeout { size, timeout });
            }
            Ok(Err(TransportFailure::Unreachable(reason))) => {
                tracing::warn!(size, %reason, "blob store unreachable");
                return Err(UploadError::NetworkUnavailable { reason });
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(status = reply.status, elapsed_ms, "blob store replied");
        interpret_reply(reply)
    }

    /// Refusal for a payload of `size` bytes above the ceiling. Never touches
    /// the network.
    pub fn oversized(&self, size: u64) -> UploadError {
        tracing::warn!(size, limit = self.limits.max_bytes, "payload refused before upload");
        UploadError::PayloadTooLarge {
            size,
            limit: self.limits.max_bytes,
        }
    }
}

fn interpret_reply(reply: StoreReply) -> Result<StorageId, UploadError> {
    if !reply.is_success() {
        tracing::warn!(status = reply.status, body = %reply.body, "blob store rejected upload");
        return Err(UploadError::StoreRejected {
            status: reply.status,
            body: reply.body,
        });
    }

    let parsed: serde_json::Value = serde_json::from_str(&reply.body)
        .map_err(|_| UploadError::InvalidStoreResponse { body: reply.body.clone() })?;

    match extract_storage_id(&parsed) {
        Some(id) => {
            tracing::info!(storage_id = %id, "upload successful");
            Ok(id)
        }
        None => {
            let response =
                serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| reply.body.clone());
            tracing::warn!(%response, "blob id not found in store response");
            Err(UploadError::IdentifierMissing { response })
        }
    }
}
