// Solana program that records file certifications as events.
use anchor_lang::prelude::*;

declare_id!("2kkPhkhR9kEkzFjUMWKYzk47NKEvCR2icena3gP5UF2c");

#[program]
pub mod file_stamp_program {
    use super::*;

    pub fn stamp_file(
        ctx: Context<StampFile>,
        blob_id: Vec<u8>,
        file_hash: Vec<u8>,
        file_name: Vec<u8>,
    ) -> Result<()> {
        require!(!blob_id.is_empty(), StampError::EmptyBlobId);
        require!(file_hash.len() == 64, StampError::InvalidFileHash);
        require!(!file_name.is_empty(), StampError::EmptyFileName);

        emit!(FileStamped {
            authority: ctx.accounts.authority.key(),
            blob_id,
            file_hash,
            file_name,
            timestamp: Clock::get()?.unix_timestamp,
        });
        Ok(())
    }
}

#[derive(Accounts)]
pub struct StampFile<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,
}

#[event]
pub struct FileStamped {
    pub authority: Pubkey,
    pub blob_id: Vec<u8>,
    pub file_hash: Vec<u8>,
    pub file_name: Vec<u8>,
    pub timestamp: i64,
}

#[error_code]
pub enum StampError {
    #[msg("blob id must not be empty")]
    EmptyBlobId,
    #[msg("file hash must be 64 hex characters")]
    InvalidFileHash,
    #[msg("file name must not be empty")]
    EmptyFileName,
}
