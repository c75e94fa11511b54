//! Centralized configuration (environment variables + defaults).

use crate::infra::blob_store::http::{DEFAULT_AGGREGATOR_URL, DEFAULT_PUBLISHER_URL};
use crate::infra::blob_store::UploadLimits;
use crate::infra::solana::transaction::default_program_id;
use solana_program::pubkey::Pubkey;
use std::str::FromStr;

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_KEYPAIR_PATH: &str = "~/.config/solana/id.json";

/// Program exposing `stamp_file` (optional, falls back to the built-in id).
pub fn stamp_program_id() -> anyhow::Result<Pubkey> {
    match std::env::var("STAMP_PROGRAM_ID") {
        Ok(v) if !v.trim().is_empty() => Pubkey::from_str(v.trim())
            .map_err(|e| anyhow::anyhow!("STAMP_PROGRAM_ID is not a valid pubkey: {}", e)),
        _ => Ok(default_program_id()),
    }
}

/// Solana RPC URL used by the keypair signer.
pub fn solana_rpc_url() -> String {
    std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string())
}

/// Keypair file used by the keypair signer.
pub fn keypair_path() -> String {
    std::env::var("SOLANA_KEYPAIR_PATH").unwrap_or_else(|_| DEFAULT_KEYPAIR_PATH.to_string())
}

/// Endpoints and limits of one certification context.
#[derive(Debug, Clone)]
pub struct CertifierConfig {
    pub publisher_url: String,
    pub aggregator_url: String,
    /// Storage duration requested from the publisher; store default when unset.
    pub epochs: Option<u32>,
    pub limits: UploadLimits,
    pub program_id: Pubkey,
}

impl Default for CertifierConfig {
    fn default() -> Self {
        Self {
            publisher_url: DEFAULT_PUBLISHER_URL.to_string(),
            aggregator_url: DEFAULT_AGGREGATOR_URL.to_string(),
            epochs: None,
            limits: UploadLimits::default(),
            program_id: default_program_id(),
        }
    }
}

impl CertifierConfig {
    /// Defaults with `STAMP_PROGRAM_ID` applied.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            program_id: stamp_program_id()?,
            ..Self::default()
        })
    }
}
