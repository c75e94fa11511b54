//! Workflow Controller: the only writer of workflow state.
//!
//! Dispatch methods validate preconditions, move the state machine and start
//! the stage's work on the runtime. Results come back as events on an internal
//! channel; the owner drives the loop with [`WorkflowController::next_event`]
//! or [`WorkflowController::settle`]. Every dispatch bumps a generation
//! counter. The stage still running is aborted and any result it already
//! produced is dropped, so a reset or a new file selection is never
//! overwritten by older work.
//!
//! Dispatches spawn tokio tasks and must run inside a tokio runtime.

use crate::app::attestation::AttestationSubmitter;
use crate::crypto::hashing::{fingerprint_source, Fingerprint};
use crate::domain::certification::{
    CertificationRecord, CertificationRequest, SelectedFile, StorageId,
};
use crate::domain::workflow::{Dispatch, WorkflowState, WorkflowStatus};
use crate::error::{AttestError, HashingFailure, UploadError, WorkflowError};
use crate::infra::blob_store::{BlobTransport, UploadCoordinator};
use crate::infra::config::CertifierConfig;
use crate::infra::solana::WalletSigner;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

#[derive(Debug)]
enum StageOutcome {
    Hashed(Result<Fingerprint, HashingFailure>),
    Uploaded(Result<StorageId, UploadError>),
    Stamped(Result<String, AttestError>),
    /// The stage task died before producing a result.
    Crashed(String),
}

#[derive(Debug)]
struct StageEvent {
    generation: u64,
    outcome: StageOutcome,
}

pub struct WorkflowController {
    uploader: UploadCoordinator,
    submitter: AttestationSubmitter,
    request: CertificationRequest,
    record: Option<CertificationRecord>,
    state: WorkflowState,
    generation: u64,
    /// Set by `upload_and_stamp`: a successful upload goes straight to stamping.
    stamp_after_upload: bool,
    /// Work of the current generation, if any is running.
    stage: Option<AbortHandle>,
    events_tx: mpsc::UnboundedSender<StageEvent>,
    events_rx: mpsc::UnboundedReceiver<StageEvent>,
    status_tx: watch::Sender<WorkflowStatus>,
}

impl WorkflowController {
    pub fn new(uploader: UploadCoordinator, submitter: AttestationSubmitter) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(WorkflowStatus::default());
        Self {
            uploader,
            submitter,
            request: CertificationRequest::default(),
            record: None,
            state: WorkflowState::Idle,
            generation: 0,
            stamp_after_upload: false,
            stage: None,
            events_tx,
            events_rx,
            status_tx,
        }
    }

    pub fn with_config(
        config: &CertifierConfig,
        transport: Arc<dyn BlobTransport>,
        signer: Arc<dyn WalletSigner>,
    ) -> Self {
        Self::new(
            UploadCoordinator::new(transport, config.limits),
            AttestationSubmitter::new(config.program_id, signer),
        )
    }

    /// Live status feed for observers.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> WorkflowStatus {
        WorkflowStatus::capture(self.state, &self.request, self.record.as_ref())
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn request(&self) -> &CertificationRequest {
        &self.request
    }

    pub fn record(&self) -> Option<&CertificationRecord> {
        self.record.as_ref()
    }

    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.request.last_error()
    }

    /// Replaces the current file and starts fingerprinting it. Always allowed;
    /// anything still in flight for the previous file is abandoned.
    pub fn select_file(&mut self, file: SelectedFile) -> Dispatch {
        let generation = self.next_generation();
        tracing::info!(file_name = file.name(), size = file.size(), "file selected");

        let source = file.source().clone();
        let keep_up_to = self.uploader.limits().max_bytes;
        self.request = CertificationRequest::for_file(file);
        self.record = None;
        self.stamp_after_upload = false;
        self.enter(WorkflowState::Hashing);

        self.spawn_stage(generation, async move {
            let hashed =
                tokio::task::spawn_blocking(move || fingerprint_source(&source, keep_up_to))
                    .await
                .unwrap_or_else(|e| {
                    Err(HashingFailure::new(format!("hashing task failed: {}", e)))
                });
            StageOutcome::Hashed(hashed)
        });
        Dispatch::Started
    }

    /// Clears the file, its results and any record; back to `Idle`.
    pub fn reset(&mut self) {
        self.next_generation();
        self.request = CertificationRequest::default();
        self.record = None;
        self.stamp_after_upload = false;
        tracing::info!("workflow reset");
        self.enter(WorkflowState::Idle);
    }

    /// Upload only. Needs a selected file with its digest.
    pub fn upload(&mut self) -> Dispatch {
        if let Some(dispatch) = self.gate(false, false) {
            return dispatch;
        }
        self.begin_upload(false)
    }

    /// Stamp only. Needs file, digest, storage id and an active wallet.
    pub fn stamp(&mut self) -> Dispatch {
        if let Some(dispatch) = self.gate(true, true) {
            return dispatch;
        }
        self.begin_stamp()
    }

    /// Upload, then stamp the fresh storage id without further input.
    pub fn upload_and_stamp(&mut self) -> Dispatch {
        if let Some(dispatch) = self.gate(true, false) {
            return dispatch;
        }
        self.begin_upload(true)
    }

    /// Waits for one stage result, applies it and returns the resulting state.
    pub async fn next_event(&mut self) -> WorkflowState {
        if let Some(event) = self.events_rx.recv().await {
            self.apply(event);
        }
        self.state
    }

    /// Processes results until no stage is in flight.
    pub async fn settle(&mut self) -> WorkflowStatus {
        while self.state.is_in_flight() {
            self.next_event().await;
        }
        self.status()
    }

    fn next_generation(&mut self) -> u64 {
        if let Some(stage) = self.stage.take() {
            if !stage.is_finished() {
                tracing::debug!(generation = self.generation, "aborting superseded stage");
                stage.abort();
            }
        }
        self.generation += 1;
        self.generation
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }

    fn enter(&mut self, state: WorkflowState) {
        tracing::debug!(from = %self.state, to = %state, "workflow transition");
        self.state = state;
        self.publish();
    }

    fn fail(&mut self, error: WorkflowError) {
        tracing::warn!(kind = ?error.kind(), error = %error, "certification step failed");
        self.request.last_error = Some(error);
        self.enter(WorkflowState::Error);
    }

    fn reject(&mut self, reason: &str) -> Dispatch {
        tracing::info!(state = %self.state, %reason, "operation rejected");
        self.request.last_error = Some(WorkflowError::Validation(reason.to_string()));
        self.publish();
        Dispatch::Rejected(reason.to_string())
    }

    /// `None` when the operation may start.
    fn gate(&mut self, needs_identity: bool, needs_storage_id: bool) -> Option<Dispatch> {
        if self.state.is_in_flight() {
            tracing::debug!(state = %self.state, "operation already in flight, ignoring");
            return Some(Dispatch::Ignored);
        }
        let reason = if !self.state.accepts_operations() {
            "Certification already completed; select a new file or reset to start again"
        } else if self.request.file.is_none() {
            "Please select a file first"
        } else if self.request.digest.is_none() {
            "File hash has not been calculated; select the file again"
        } else if needs_storage_id && self.request.storage_id.is_none() {
            "Please upload the file to the blob store first"
        } else if needs_identity && self.submitter.active_identity().is_none() {
            "Please connect your wallet"
        } else {
            return None;
        };
        Some(self.reject(reason))
    }

    fn begin_upload(&mut self, then_stamp: bool) -> Dispatch {
        let Some(file) = self.request.file.as_ref() else {
            return self.reject("Please select a file first");
        };
        let content_type = file.content_type().to_string();
        // Only payloads above the upload ceiling are left unretained by hashing.
        let staged = self
            .request
            .payload
            .clone()
            .ok_or_else(|| self.uploader.oversized(self.request.hashed_size));

        let generation = self.next_generation();
        self.request.last_error = None;
        self.request.storage_id = None;
        self.stamp_after_upload = then_stamp;
        self.enter(WorkflowState::Uploading);

        let uploader = self.uploader.clone();
        self.spawn_stage(generation, async move {
            let uploaded = match staged {
                Ok(payload) => uploader.upload(payload, &content_type).await,
                Err(refused) => Err(refused),
            };
            StageOutcome::Uploaded(uploaded)
        });
        Dispatch::Started
    }

    fn begin_stamp(&mut self) -> Dispatch {
        let generation = self.next_generation();
        self.request.last_error = None;
        self.stamp_after_upload = false;
        self.enter(WorkflowState::Stamping);

        let submitted = match (
            self.request.file.as_ref(),
            self.request.digest.as_ref(),
            self.request.storage_id.as_ref(),
        ) {
            (Some(file), Some(digest), Some(storage_id)) => {
                self.submitter
                    .submit(storage_id.as_str(), digest.as_str(), file.name())
            }
            _ => Err(AttestError::NotReady {
                missing: "file, hash or storage id",
            }),
        };

        match submitted {
            Ok(pending) => {
                self.spawn_stage(generation, async move {
                    StageOutcome::Stamped(pending.finality().await)
                });
            }
            Err(e) => self.fail(e.into()),
        }
        Dispatch::Started
    }

    fn spawn_stage<F>(&mut self, generation: u64, stage: F)
    where
        F: Future<Output = StageOutcome> + Send + 'static,
    {
        let work = tokio::spawn(stage);
        self.stage = Some(work.abort_handle());

        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => return,
                Err(e) => StageOutcome::Crashed(e.to_string()),
            };
            // The controller may already be gone; nothing left to notify then.
            let _ = events.send(StageEvent { generation, outcome });
        });
    }

    fn apply(&mut self, event: StageEvent) {
        if event.generation != self.generation {
            tracing::debug!(
                event_generation = event.generation,
                current_generation = self.generation,
                "discarding stale stage result"
            );
            return;
        }

        match (self.state, event.outcome) {
            (WorkflowState::Hashing, StageOutcome::Hashed(Ok(fingerprint))) => {
                tracing::info!(
                    digest = %fingerprint.digest,
                    size = fingerprint.size,
                    retained = fingerprint.payload.is_some(),
                    "file hash calculated"
                );
                self.request.digest = Some(fingerprint.digest);
                self.request.hashed_size = fingerprint.size;
                self.request.payload = fingerprint.payload;
                self.enter(WorkflowState::Idle);
            }
            (WorkflowState::Hashing, StageOutcome::Hashed(Err(e))) => self.fail(e.into()),
            (WorkflowState::Uploading, StageOutcome::Uploaded(Ok(storage_id))) => {
                tracing::info!(%storage_id, "upload stored");
                self.request.storage_id = Some(storage_id);
                if std::mem::take(&mut self.stamp_after_upload) {
                    self.begin_stamp();
                } else {
                    self.enter(WorkflowState::Idle);
                }
            }
            (WorkflowState::Uploading, StageOutcome::Uploaded(Err(e))) => {
                self.stamp_after_upload = false;
                self.fail(e.into());
            }
            (WorkflowState::Stamping, StageOutcome::Stamped(Ok(transaction_id))) => {
                self.complete(transaction_id);
            }
            (WorkflowState::Stamping, StageOutcome::Stamped(Err(e))) => self.fail(e.into()),
            (WorkflowState::Hashing, StageOutcome::Crashed(reason)) => {
                self.fail(HashingFailure::new(reason).into());
            }
            (WorkflowState::Uploading, StageOutcome::Crashed(reason)) => {
                self.stamp_after_upload = false;
                self.fail(UploadError::NetworkUnavailable { reason }.into());
            }
            (WorkflowState::Stamping, StageOutcome::Crashed(reason)) => {
                self.fail(AttestError::TransactionFailed { message: Some(reason) }.into());
            }
            (state, _) => {
                tracing::debug!(%state, "stage result does not match current state, ignoring");
            }
        }
    }

    fn complete(&mut self, transaction_id: String) {
        let (Some(file), Some(digest), Some(storage_id)) = (
            self.request.file.as_ref(),
            self.request.digest.clone(),
            self.request.storage_id.clone(),
        ) else {
            self.fail(
                AttestError::NotReady {
                    missing: "file, hash or storage id",
                }
                .into(),
            );
            return;
        };

        let record = CertificationRecord {
            file_name: file.name().to_string(),
            storage_id,
            digest,
            ledger_transaction_id: transaction_id,
        };
        tracing::info!(
            file_name = %record.file_name,
            storage_id = %record.storage_id,
            transaction = %record.ledger_transaction_id,
            "file certified"
        );
        self.record = Some(record);
        self.enter(WorkflowState::Success);
    }
}
