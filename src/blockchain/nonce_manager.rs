// src/blockchain/nonce_manager.rs

use std::sync::Arc;

use dashmap::DashMap;
use ethers_core::types::{Address, U256};
use tokio::sync::{Mutex, OwnedMutexGuard};

// Serializes user-operation submission per smart account so two concurrent
// tool calls never sign with the same EntryPoint nonce.
#[derive(Debug, Clone, Default)]
pub struct NonceManager {
    // The DashMap allows concurrent access to different accounts.
    nonces: Arc<DashMap<Address, Arc<Mutex<NonceState>>>>,
}

#[derive(Debug, Default)]
struct NonceState {
    next_nonce: Option<U256>,
}

/// Exclusive hold on one account's nonce sequence. Dropping it releases the
/// account for the next submitter.
#[derive(Debug)]
pub struct NonceGuard {
    state: OwnedMutexGuard<NonceState>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other submission for `account` is in flight.
    pub async fn lock(&self, account: Address) -> NonceGuard {
        let account_lock = self
            .nonces
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(NonceState::default())))
            .clone();

        NonceGuard {
            state: account_lock.lock_owned().await,
        }
    }
}

impl NonceGuard {
    /// Nonce to sign with: the EntryPoint's view, unless an operation we
    /// already sent is still sitting in the bundler mempool.
    pub fn reserve(&self, on_chain: U256) -> U256 {
        match self.state.next_nonce {
            Some(cached) if cached > on_chain => cached,
            _ => on_chain,
        }
    }

    /// Record that `used` was accepted by the bundler.
    pub fn commit(&mut self, used: U256) {
        self.state.next_nonce = Some(used + U256::one());
    }
}
