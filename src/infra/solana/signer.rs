//! Wallet-signing collaborator.
//!
//! A signer receives a built transaction plus the network it must land on, and
//! reports exactly one outcome through the [`SigningReply`] it was handed.

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::pubkey::Pubkey;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signer::{
        keypair::{read_keypair_file, Keypair},
        Signer,
    },
    transaction::Transaction,
};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Terminal result of one signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningOutcome {
    /// Finalised; carries the transaction digest (signature).
    Executed { digest: String },
    /// Rejected or failed; carries the collaborator's message if it had one.
    Failed { message: Option<String> },
}

/// One-shot reply handle. Consuming it is the only way to answer, so each
/// request is answered at most once; dropping it counts as a failure.
#[derive(Debug)]
pub struct SigningReply(oneshot::Sender<SigningOutcome>);

impl SigningReply {
    pub fn channel() -> (Self, oneshot::Receiver<SigningOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }

    pub fn succeed(self, digest: impl Into<String>) {
        self.send(SigningOutcome::Executed {
            digest: digest.into(),
        });
    }

    pub fn fail(self, message: Option<String>) {
        self.send(SigningOutcome::Failed { message });
    }

    pub fn send(self, outcome: SigningOutcome) {
        if self.0.send(outcome).is_err() {
            tracing::debug!("signing outcome dropped: nobody is waiting for it");
        }
    }
}

/// The user's wallet as seen by the attestation stage.
pub trait WalletSigner: Send + Sync {
    /// Account that would sign, if a wallet is connected.
    fn active_identity(&self) -> Option<Pubkey>;

    /// Signs and submits `transaction` on `network`, answering through `reply`
    /// asynchronously. Must not block.
    fn sign_and_execute(&self, transaction: Transaction, network: &str, reply: SigningReply);
}

/// Signs with a local keypair file and submits through an RPC node.
pub struct KeypairSigner {
    keypair: Arc<Keypair>,
    client: Arc<RpcClient>,
    network: String,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair, rpc_url: String, network: impl Into<String>) -> Self {
        let client = RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed());
        Self {
            keypair: Arc::new(keypair),
            client: Arc::new(client),
            network: network.into(),
        }
    }

    /// Loads the keypair from `path` (a leading `~` is expanded).
    pub fn from_keypair_file(
        path: &str,
        rpc_url: String,
        network: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let expanded = shellexpand::tilde(path).to_string();
        let keypair = read_keypair_file(&expanded)
            .map_err(|e| anyhow::anyhow!("Failed to read keypair file {}: {}", expanded, e))?;
        Ok(Self::new(keypair, rpc_url, network))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

impl WalletSigner for KeypairSigner {
    fn active_identity(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    fn sign_and_execute(&self, mut transaction: Transaction, network: &str, reply: SigningReply) {
        if network != self.network {
            reply.fail(Some(format!(
                "Wallet is connected to {}, transaction targets {}",
                self.network, network
            )));
            return;
        }

        let keypair = Arc::clone(&self.keypair);
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            let recent_blockhash = match client.get_latest_blockhash().await {
                Ok(hash) => hash,
                Err(e) => {
                    reply.fail(Some(format!("Failed to fetch recent blockhash: {}", e)));
                    return;
                }
            };
            if let Err(e) = transaction.try_sign(&[&*keypair], recent_blockhash) {
                reply.fail(Some(format!("Failed to sign transaction: {}", e)));
                return;
            }
            match client.send_and_confirm_transaction(&transaction).await {
                Ok(signature) => {
                    tracing::info!(%signature, "stamp transaction confirmed");
                    reply.succeed(signature.to_string());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stamp transaction failed");
                    reply.fail(Some(e.to_string()));
                }
            }
        });
    }
}

/// No wallet connected: there is no identity and every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedWallet;

impl WalletSigner for DisconnectedWallet {
    fn active_identity(&self) -> Option<Pubkey> {
        None
    }

    fn sign_and_execute(&self, _transaction: Transaction, _network: &str, reply: SigningReply) {
        reply.fail(Some("Wallet not connected".to_string()));
    }
}
