// Everything that talks to the Solana ledger.

pub mod signer;
pub mod transaction;

pub use signer::{DisconnectedWallet, KeypairSigner, SigningOutcome, SigningReply, WalletSigner};
pub use transaction::{build_stamp_transaction, default_program_id, TARGET_NETWORK};
