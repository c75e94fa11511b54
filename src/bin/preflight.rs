use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::keypair::read_keypair_file;
use solana_sdk::signer::Signer;

use file_stamp::crypto::hashing::EMPTY_DIGEST;
use file_stamp::infra::config;
use file_stamp::infra::logging::init_logging;
use file_stamp::solana::build_stamp_transaction;
use file_stamp::CertifierConfig;

const LOW_BALANCE_LAMPORTS: u64 = 10_000_000;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight\n\
         \n\
         Checks the wallet, the stamp program and the blob store before a certify run.\n\
         \n\
         Optional env vars:\n\
           STAMP_PROGRAM_ID, SOLANA_RPC_URL, SOLANA_KEYPAIR_PATH\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging("file_stamp=info");

    if std::env::args().skip(1).any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    let certifier = CertifierConfig::from_env()?;
    let rpc_url = config::solana_rpc_url();
    let wallet_path = shellexpand::tilde(&config::keypair_path()).to_string();

    println!("> Preflight:");
    println!("  SOLANA_RPC_URL={}", rpc_url);
    println!("  STAMP_PROGRAM_ID={}", certifier.program_id);
    println!("  Publisher: {}", certifier.publisher_url);
    println!("  Aggregator: {}", certifier.aggregator_url);

    let wallet = read_keypair_file(&wallet_path)
        .map_err(|e| anyhow::anyhow!("Failed to read wallet {}: {}", wallet_path, e))?;
    let client = RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed());

    let version = client.get_version().await?;
    println!("  RPC version: {}", version.solana_core);

    let lamports = client.get_balance(&wallet.pubkey()).await?;
    println!("  Wallet: {}", wallet.pubkey());
    println!("  Wallet balance: {} lamports (~{:.6} SOL)", lamports, lamports as f64 / 1e9);
    if lamports < LOW_BALANCE_LAMPORTS {
        eprintln!("  Warning: wallet balance looks low; stamp transactions may fail.");
    }

    let program = client
        .get_account(&certifier.program_id)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Stamp program {} not found on cluster ({})",
                certifier.program_id,
                e
            )
        })?;
    if !program.executable {
        anyhow::bail!(
            "Account {} exists but is not executable; deploy file_stamp_program first",
            certifier.program_id
        );
    }
    println!("  Stamp program is deployed and executable.");

    // Dry run of a stamp for the empty file; nothing is sent.
    let mut dry_run = build_stamp_transaction(
        &certifier.program_id,
        &wallet.pubkey(),
        "preflight",
        EMPTY_DIGEST,
        "preflight.txt",
    );
    let blockhash = client.get_latest_blockhash().await?;
    dry_run.try_sign(&[&wallet], blockhash)?;
    let simulation = client.simulate_transaction(&dry_run).await?.value;
    if let Some(err) = simulation.err {
        for line in simulation.logs.unwrap_or_default() {
            eprintln!("    {}", line);
        }
        anyhow::bail!("stamp_file simulation failed: {}", err);
    }
    println!(
        "  stamp_file simulation OK ({} compute units).",
        simulation.units_consumed.unwrap_or_default()
    );

    let aggregator = reqwest::get(&certifier.aggregator_url)
        .await
        .map_err(|e| {
            anyhow::anyhow!("Aggregator {} unreachable: {}", certifier.aggregator_url, e)
        })?;
    println!("  Aggregator answered {}.", aggregator.status());

    println!("> Preflight OK.");
    Ok(())
}
