// src/blockchain/mod.rs

pub mod abi;
pub mod aggregator;
pub mod amount;
pub mod backend;
pub mod bundler;
pub mod chain;
pub mod client;
pub mod nonce_manager;
pub mod smart_account;
pub mod token_registry;

// Re-export commonly used types
pub use backend::{Backend, EvmBackend};
pub use chain::Network;
pub use client::{ChainClient, EvmClient, ReceiptSummary};
pub use smart_account::{Call, Confirmation, ConfirmationPolicy, SmartAccount, Submitted};

pub use ethers::{
    types::{Address, H256, U256},
    utils::to_checksum,
};
