//! Attestation Submitter: builds the `stamp_file` transaction and hands it to
//! the wallet. Its contract ends once the wallet accepted the request; the
//! terminal outcome arrives through the returned [`PendingAttestation`].

use crate::error::AttestError;
use crate::infra::solana::signer::{SigningOutcome, SigningReply, WalletSigner};
use crate::infra::solana::transaction::{build_stamp_transaction, TARGET_NETWORK};
use solana_program::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Clone)]
pub struct AttestationSubmitter {
    program_id: Pubkey,
    signer: Arc<dyn WalletSigner>,
}

impl AttestationSubmitter {
    pub fn new(program_id: Pubkey, signer: Arc<dyn WalletSigner>) -> Self {
        Self { program_id, signer }
    }

    /// Account that would sign right now, if any.
    pub fn active_identity(&self) -> Option<Pubkey> {
        self.signer.active_identity()
    }

    /// Submits one stamp transaction for signing.
    ///
    /// Fails with `NotReady`, without contacting the wallet, when an input is
    /// empty or no wallet account is active.
    pub fn submit(
        &self,
        storage_id: &str,
        digest: &str,
        file_name: &str,
    ) -> Result<PendingAttestation, AttestError> {
        if storage_id.is_empty() {
            return Err(AttestError::NotReady { missing: "storage id" });
        }
        if digest.is_empty() {
            return Err(AttestError::NotReady { missing: "file hash" });
        }
        if file_name.is_empty() {
            return Err(AttestError::NotReady { missing: "file name" });
        }
        let authority = self
            .signer
            .active_identity()
            .ok_or(AttestError::NotReady { missing: "wallet" })?;

        let transaction =
            build_stamp_transaction(&self.program_id, &authority, storage_id, digest, file_name);
        let (reply, outcome) = SigningReply::channel();

        tracing::info!(
            %storage_id,
            %digest,
            %file_name,
            %authority,
            network = TARGET_NETWORK,
            "submitting stamp transaction for signing"
        );
        self.signer.sign_and_execute(transaction, TARGET_NETWORK, reply);

        Ok(PendingAttestation { outcome })
    }
}

/// Handle on a transaction the wallet is working on.
#[derive(Debug)]
pub struct PendingAttestation {
    outcome: oneshot::Receiver<SigningOutcome>,
}

impl PendingAttestation {
    /// Waits for the wallet's single answer and returns the transaction digest.
    pub async fn finality(self) -> Result<String, AttestError> {
        match self.outcome.await {
            Ok(SigningOutcome::Executed { digest }) => Ok(digest),
            Ok(SigningOutcome::Failed { message }) => {
                Err(AttestError::TransactionFailed { message })
            }
            Err(_) => {
                tracing::warn!("wallet dropped the signing request without answering");
                Err(AttestError::TransactionFailed { message: None })
            }
        }
    }
}
