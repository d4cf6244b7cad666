//! Blockchain client module for EVM-compatible networks.
//!
//! `ChainClient` is the read-side seam the tool handlers depend on: native
//! balances, contract reads and receipt lookups. `EvmClient` holds one ethers
//! HTTP provider per configured chain and hands out `RpcChainClient`s.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers_core::abi::{Function, Token};
use ethers_core::types::{
    transaction::eip2718::TypedTransaction, Address, TransactionRequest, H256, U256, U64,
};
use ethers_providers::{Http, Middleware, Provider};

use super::chain::Network;
use crate::error::OperationError;

/// The parts of a transaction receipt the engine reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub transaction_hash: H256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

/// Read/receipt access to one network.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance of the native asset in wei.
    async fn native_balance(&self, address: Address) -> Result<U256, OperationError>;

    /// `eth_call` of `function` on `address` with already-coerced arguments.
    async fn read_contract(
        &self,
        address: Address,
        function: &Function,
        args: &[Token],
    ) -> Result<Vec<Token>, OperationError>;

    /// `Ok(None)` while the transaction is unknown or not yet mined.
    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<ReceiptSummary>, OperationError>;
}

/// Client for interacting with EVM-compatible blockchains
#[derive(Clone)]
pub struct EvmClient {
    providers: HashMap<u64, Arc<Provider<Http>>>,
}

impl EvmClient {
    /// Create a new EvmClient from `chain id -> RPC URL`.
    pub fn new(rpc_urls: &HashMap<u64, String>) -> Self {
        let mut providers = HashMap::new();

        for (chain_id, url) in rpc_urls {
            if let Ok(provider) = Provider::<Http>::try_from(url.as_str()) {
                providers.insert(*chain_id, Arc::new(provider));
            } else {
                tracing::warn!("Failed to create provider for chain {} at {}", chain_id, url);
            }
        }

        Self { providers }
    }

    /// Get a provider for the specified chain
    pub fn get_provider(&self, chain_id: u64) -> Result<Arc<Provider<Http>>> {
        self.providers
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| anyhow!("No provider available for chain: {}", chain_id))
    }

    pub fn client_for(&self, network: &Network) -> Result<RpcChainClient> {
        Ok(RpcChainClient {
            provider: self.get_provider(network.chain_id)?,
        })
    }
}

/// `ChainClient` backed by an ethers HTTP provider.
#[derive(Clone)]
pub struct RpcChainClient {
    provider: Arc<Provider<Http>>,
}

impl RpcChainClient {
    pub fn new(provider: Arc<Provider<Http>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn native_balance(&self, address: Address) -> Result<U256, OperationError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| {
                OperationError::OnChainRead(format!("eth_getBalance for {:?}: {}", address, e))
            })
    }

    async fn read_contract(
        &self,
        address: Address,
        function: &Function,
        args: &[Token],
    ) -> Result<Vec<Token>, OperationError> {
        let data = function
            .encode_input(args)
            .map_err(|e| {
                OperationError::Validation(format!("cannot encode {}: {}", function.name, e))
            })?;
        let tx: TypedTransaction = TransactionRequest::new().to(address).data(data).into();

        let raw = self.provider.call(&tx, None).await.map_err(|e| {
            OperationError::OnChainRead(format!("{} on {:?} failed: {}", function.name, address, e))
        })?;
        if raw.is_empty() && !function.outputs.is_empty() {
            return Err(OperationError::OnChainRead(format!(
                "{} on {:?} returned no data; the address may not be a contract",
                function.name, address
            )));
        }

        function.decode_output(&raw).map_err(|e| {
            OperationError::OnChainRead(format!(
                "cannot decode {} output from {:?}: {}",
                function.name, address, e
            ))
        })
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<ReceiptSummary>, OperationError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| {
                OperationError::OnChainRead(format!("eth_getTransactionReceipt {:?}: {}", hash, e))
            })?;

        Ok(receipt.map(|r| ReceiptSummary {
            transaction_hash: r.transaction_hash,
            success: r.status == Some(U64::one()),
            block_number: r.block_number.map(|b| b.as_u64()),
            gas_used: r.gas_used,
        }))
    }
}

/// Create a provider for the given RPC URL
pub fn create_provider(rpc_url: &str) -> Result<Provider<Http>> {
    Provider::<Http>::try_from(rpc_url).map_err(|e| anyhow!("Failed to create provider: {}", e))
}
