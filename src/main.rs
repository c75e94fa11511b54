//! `file-stamp`: fingerprint a file, store it in the blob store and stamp the
//! result on the ledger.

use clap::{Parser, Subcommand};
use file_stamp::infra::config;
use file_stamp::infra::logging::init_logging;
use file_stamp::infra::solana::transaction::{build_stamp_transaction, encode_transaction};
use file_stamp::solana::{DisconnectedWallet, KeypairSigner, WalletSigner, TARGET_NETWORK};
use file_stamp::{
    digest_bytes, CertifierConfig, Dispatch, FileDigest, HttpBlobStore, SelectedFile,
    WorkflowController, WorkflowState, WorkflowStatus,
};
use solana_program::pubkey::Pubkey;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "file-stamp", version, about = "Certify files on Walrus + Solana")]
struct Cli {
    /// Print the final status as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the SHA-256 fingerprint of a file.
    Hash { file: PathBuf },
    /// Upload a file to the blob store without stamping it.
    Upload {
        file: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
    /// Upload a file and stamp it on the ledger.
    Certify {
        file: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
    /// Download a stored blob by id.
    Fetch {
        blob_id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print an unsigned stamp transaction (base64) for an external wallet.
    ExportTx {
        blob_id: String,
        digest: String,
        file_name: String,
        #[arg(long)]
        authority: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_logging("file_stamp=info");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("> Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = CertifierConfig::from_env()?;

    match cli.command {
        Command::Hash { file } => {
            let bytes = tokio::fs::read(&file).await?;
            println!("{}  {}", digest_bytes(&bytes), file.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Upload { file, mime } => {
            run_workflow(&config, file, mime, false, cli.json).await
        }
        Command::Certify { file, mime } => {
            run_workflow(&config, file, mime, true, cli.json).await
        }
        Command::Fetch { blob_id, output } => {
            let store =
                HttpBlobStore::new(&config.publisher_url, &config.aggregator_url, config.epochs)?;
            let bytes = store.read_blob(&blob_id).await?;
            tokio::fs::write(&output, &bytes).await?;
            println!("> Wrote {} bytes to {}", bytes.len(), output.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::ExportTx {
            blob_id,
            digest,
            file_name,
            authority,
        } => {
            let authority = Pubkey::from_str(&authority)
                .map_err(|e| anyhow::anyhow!("--authority is not a valid pubkey: {}", e))?;
            let digest = FileDigest::parse(&digest)
                .ok_or_else(|| anyhow::anyhow!("digest must be 64 hex characters"))?;
            let tx = build_stamp_transaction(
                &config.program_id,
                &authority,
                &blob_id,
                digest.as_str(),
                &file_name,
            );
            println!("{}", encode_transaction(&tx)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn wallet(stamp: bool) -> anyhow::Result<Arc<dyn WalletSigner>> {
    let path = config::keypair_path();
    match KeypairSigner::from_keypair_file(&path, config::solana_rpc_url(), TARGET_NETWORK) {
        Ok(signer) => {
            println!("> Wallet: {}", signer.pubkey());
            Ok(Arc::new(signer))
        }
        Err(e) if !stamp => {
            tracing::debug!(error = %e, "no wallet for upload-only run");
            Ok(Arc::new(DisconnectedWallet))
        }
        Err(e) => Err(e),
    }
}

async fn run_workflow(
    config: &CertifierConfig,
    path: PathBuf,
    mime: Option<String>,
    stamp: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let store = HttpBlobStore::new(&config.publisher_url, &config.aggregator_url, config.epochs)?;
    let blob_urls = store.clone();
    let mut controller = WorkflowController::with_config(config, Arc::new(store), wallet(stamp)?);

    let mut updates = controller.subscribe();
    let progress = tokio::spawn(async move {
        let mut last = WorkflowState::Idle;
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().state;
            if state != last {
                eprintln!("> {}", state);
                last = state;
            }
        }
    });

    let mut file = SelectedFile::from_path(&path)?;
    if let Some(mime) = mime {
        file = file.with_mime_type(mime);
    }
    controller.select_file(file);
    let hashed = controller.settle().await;

    if hashed.state == WorkflowState::Idle {
        let dispatch = if stamp {
            controller.upload_and_stamp()
        } else {
            controller.upload()
        };
        if let Dispatch::Rejected(reason) = dispatch {
            anyhow::bail!(reason);
        }
    }
    let status = controller.settle().await;
    drop(controller);
    let _ = progress.await;

    report(&status, &blob_urls, json)?;
    Ok(match status.state {
        WorkflowState::Error => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn report(status: &WorkflowStatus, store: &HttpBlobStore, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }

    if let Some(name) = &status.file_name {
        println!("File Name:   {}", name);
    }
    if let Some(digest) = &status.digest {
        println!("File Hash:   {}", digest);
    }
    if let Some(storage_id) = &status.storage_id {
        println!("Blob ID:     {}", storage_id);
        println!("Blob URL:    {}", store.blob_url(storage_id));
    }
    if let Some(record) = &status.record {
        println!("Transaction: {}", record.ledger_transaction_id);
        println!(
            "Explorer:    https://explorer.solana.com/tx/{}?cluster=devnet",
            record.ledger_transaction_id
        );
        println!("> Certified!");
    }
    if let Some(error) = &status.last_error {
        eprintln!("> Error: {}", error);
    }
    Ok(())
}
