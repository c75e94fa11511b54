// Builds the ledger transaction that stamps a file's storage id, digest and name.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_sdk::{compute_budget::ComputeBudgetInstruction, transaction::Transaction};

/// Program that exposes `stamp_file` when `STAMP_PROGRAM_ID` is not set.
pub const DEFAULT_PROGRAM_ID: Pubkey =
    solana_program::pubkey!("2kkPhkhR9kEkzFjUMWKYzk47NKEvCR2icena3gP5UF2c");

/// Network every stamp transaction targets.
pub const TARGET_NETWORK: &str = "solana:devnet";

/// Fixed compute budget attached to every stamp transaction.
pub const STAMP_COMPUTE_UNIT_LIMIT: u32 = 200_000;

// Discriminator for stamp_file: sha256("global:stamp_file")[..8]
pub const STAMP_FILE_DISCRIMINATOR: [u8; 8] = [78, 164, 166, 163, 73, 60, 66, 242];

pub fn default_program_id() -> Pubkey {
    DEFAULT_PROGRAM_ID
}

fn push_bytes_arg(data: &mut Vec<u8>, arg: &[u8]) {
    data.extend_from_slice(&(arg.len() as u32).to_le_bytes());
    data.extend_from_slice(arg);
}

/// Instruction data: discriminator followed by three length-prefixed byte arrays.
pub fn encode_stamp_args(storage_id: &[u8], digest: &[u8], file_name: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + 12 + storage_id.len() + digest.len() + file_name.len());
    data.extend_from_slice(&STAMP_FILE_DISCRIMINATOR);
    push_bytes_arg(&mut data, storage_id);
    push_bytes_arg(&mut data, digest);
    push_bytes_arg(&mut data, file_name);
    data
}

/// The `stamp_file(storage_id, digest, file_name)` call, signed by `authority`.
pub fn stamp_instruction(
    program_id: &Pubkey,
    authority: &Pubkey,
    storage_id: &str,
    digest: &str,
    file_name: &str,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(*authority, true)],
        data: encode_stamp_args(storage_id.as_bytes(), digest.as_bytes(), file_name.as_bytes()),
    }
}

/// Unsigned transaction paid for by `authority`. The signer fills in the
/// blockhash and signature.
pub fn build_stamp_transaction(
    program_id: &Pubkey,
    authority: &Pubkey,
    storage_id: &str,
    digest: &str,
    file_name: &str,
) -> Transaction {
    let instructions = [
        ComputeBudgetInstruction::set_compute_unit_limit(STAMP_COMPUTE_UNIT_LIMIT),
        stamp_instruction(program_id, authority, storage_id, digest, file_name),
    ];
    Transaction::new_with_payer(&instructions, Some(authority))
}

/// Base64 of the wire encoding, the form browser wallets accept.
pub fn encode_transaction(transaction: &Transaction) -> anyhow::Result<String> {
    let wire = bincode::serialize(transaction)?;
    Ok(STANDARD.encode(wire))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    #[test]
    fn discriminator_matches_anchor_sighash() {
        let hash = Sha256::digest(b"global:stamp_file");
        assert_eq!(&hash[..8], &STAMP_FILE_DISCRIMINATOR);
    }

    #[test]
    fn default_program_id_matches_deployed_program() {
        assert_ne!(default_program_id(), Pubkey::default());
        assert_eq!(
            default_program_id().to_string(),
            "2kkPhkhR9kEkzFjUMWKYzk47NKEvCR2icena3gP5UF2c"
        );
    }

    #[test]
    fn args_are_length_prefixed_in_order() {
        let data = encode_stamp_args(b"blob", b"ab", b"x.txt");
        assert_eq!(&data[..8], &STAMP_FILE_DISCRIMINATOR);
        assert_eq!(&data[8..12], &4u32.to_le_bytes());
        assert_eq!(&data[12..16], b"blob");
        assert_eq!(&data[16..20], &2u32.to_le_bytes());
        assert_eq!(&data[20..22], b"ab");
        assert_eq!(&data[22..26], &5u32.to_le_bytes());
        assert_eq!(&data[26..], b"x.txt");
    }

    #[test]
    fn transaction_carries_budget_then_stamp() {
        let program_id = default_program_id();
        let authority = Pubkey::new_unique();
        let tx = build_stamp_transaction(&program_id, &authority, "blob-42", "ff", "a.txt");
        let message = &tx.message;
        assert_eq!(message.instructions.len(), 2);
        assert_eq!(message.account_keys[0], authority);
        let stamp = &message.instructions[1];
        assert_eq!(message.account_keys[stamp.program_id_index as usize], program_id);
        assert_eq!(&stamp.data[..8], &STAMP_FILE_DISCRIMINATOR);
        assert!(!encode_transaction(&tx).unwrap().is_empty());
    }
}
