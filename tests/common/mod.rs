//! Shared harness: a scripted blob store and a scripted wallet.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use file_stamp::infra::blob_store::{BlobTransport, StoreReply, TransportFailure};
use file_stamp::solana::{SigningOutcome, SigningReply, WalletSigner};
use file_stamp::{CertifierConfig, WorkflowController};
use solana_program::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_stamp=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// What the scripted store does for one upload.
pub enum Behavior {
    Reply(u16, String),
    Fail(TransportFailure),
    /// Never answers.
    Hang,
    /// Waits for the gate, then replies.
    Gated(Arc<Notify>, u16, String),
}

pub fn ok_json(body: &str) -> Behavior {
    Behavior::Reply(200, body.to_string())
}

#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub size: usize,
    pub content_type: String,
}

/// Blob store double. Behaviours are consumed in order; once the script runs
/// out every upload is answered with `{"blobId":"default-blob"}`.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Behavior>>,
    calls: AtomicUsize,
    cancelled: AtomicUsize,
    puts: Mutex<Vec<RecordedPut>>,
}

/// Counts an upload as cancelled if it is dropped before answering.
struct Unanswered<'a>(&'a AtomicUsize);

impl Drop for Unanswered<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub fn new(script: Vec<Behavior>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
            puts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Uploads dropped by the caller before the store answered.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobTransport for ScriptedTransport {
    async fn put_blob(
        &self,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoreReply, TransportFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let unanswered = Unanswered(&self.cancelled);
        self.puts.lock().unwrap().push(RecordedPut {
            size: body.len(),
            content_type: content_type.to_string(),
        });
        let behavior = self.script.lock().unwrap().pop_front();
        let reply = match behavior {
            Some(Behavior::Reply(status, body)) => Ok(StoreReply { status, body }),
            Some(Behavior::Fail(failure)) => Err(failure),
            Some(Behavior::Hang) => std::future::pending().await,
            Some(Behavior::Gated(gate, status, body)) => {
                gate.notified().await;
                Ok(StoreReply { status, body })
            }
            None => Ok(StoreReply {
                status: 200,
                body: r#"{"blobId":"default-blob"}"#.to_string(),
            }),
        };
        std::mem::forget(unanswered);
        reply
    }
}

/// Wallet double. Scripted outcomes are answered immediately; without one the
/// reply is held until the test releases it.
pub struct ScriptedSigner {
    identity: Mutex<Option<Pubkey>>,
    outcomes: Mutex<VecDeque<SigningOutcome>>,
    held: Mutex<VecDeque<SigningReply>>,
    submissions: Mutex<Vec<(Transaction, String)>>,
}

impl ScriptedSigner {
    pub fn with_identity(identity: Option<Pubkey>, outcomes: Vec<SigningOutcome>) -> Arc<Self> {
        Arc::new(Self {
            identity: Mutex::new(identity),
            outcomes: Mutex::new(outcomes.into()),
            held: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
        })
    }

    /// Connected wallet that answers with `outcomes`, then holds.
    pub fn answering(outcomes: Vec<SigningOutcome>) -> Arc<Self> {
        Self::with_identity(Some(Pubkey::new_unique()), outcomes)
    }

    /// Connected wallet that holds every request.
    pub fn holding() -> Arc<Self> {
        Self::answering(Vec::new())
    }

    pub fn disconnected() -> Arc<Self> {
        Self::with_identity(None, Vec::new())
    }

    pub fn set_identity(&self, identity: Option<Pubkey>) {
        *self.identity.lock().unwrap() = identity;
    }

    pub fn submissions(&self) -> Vec<(Transaction, String)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn held(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    pub fn release_next(&self, outcome: SigningOutcome) {
        let reply = self
            .held
            .lock()
            .unwrap()
            .pop_front()
            .expect("no held signing request");
        reply.send(outcome);
    }
}

impl WalletSigner for ScriptedSigner {
    fn active_identity(&self) -> Option<Pubkey> {
        *self.identity.lock().unwrap()
    }

    fn sign_and_execute(&self, transaction: Transaction, network: &str, reply: SigningReply) {
        self.submissions
            .lock()
            .unwrap()
            .push((transaction, network.to_string()));
        let scripted = self.outcomes.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => reply.send(outcome),
            None => self.held.lock().unwrap().push_back(reply),
        }
    }
}

pub fn executed(digest: &str) -> SigningOutcome {
    SigningOutcome::Executed {
        digest: digest.to_string(),
    }
}

pub fn controller(
    transport: Arc<ScriptedTransport>,
    signer: Arc<ScriptedSigner>,
) -> WorkflowController {
    WorkflowController::with_config(&CertifierConfig::default(), transport, signer)
}

/// Instruction data of the `stamp_file` call in a submitted transaction.
pub fn stamp_data(transaction: &Transaction) -> Vec<u8> {
    transaction
        .message
        .instructions
        .last()
        .expect("transaction without instructions")
        .data
        .clone()
}

/// Deterministic, non-repeating test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Lets spawned stage tasks run until `done` holds.
pub async fn run_until(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..1_000 {
        if done() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    done()
}

/// Temporary file removed on drop.
pub struct TempFile {
    pub path: PathBuf,
}

impl TempFile {
    pub fn new(name: &str, contents: &[u8]) -> Self {
        let file = Self::empty(name);
        std::fs::write(&file.path, contents).unwrap();
        file
    }

    /// Sparse file of `len` zero bytes; nothing is written to disk.
    pub fn sparse(name: &str, len: u64) -> Self {
        let file = Self::empty(name);
        std::fs::OpenOptions::new()
            .write(true)
            .open(&file.path)
            .unwrap()
            .set_len(len)
            .unwrap();
        file
    }

    fn empty(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "file-stamp-test-{}-{}",
            std::process::id(),
            name.replace('.', "_")
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::File::create(&path).unwrap();
        Self { path }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        if let Some(dir) = self.path.parent() {
            let _ = std::fs::remove_dir(dir);
        }
    }
}
