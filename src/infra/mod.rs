pub mod blob_store;
pub mod config;
pub mod logging;
pub mod solana;
