// src/blockchain/backend.rs

use std::str::FromStr;
use std::sync::Arc;

use ethers_core::types::Address;
use ethers_signers::{LocalWallet, Signer};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::bundler::{BundlerEndpoint, BundlerSmartAccount};
use super::chain::Network;
use super::client::{ChainClient, EvmClient};
use super::nonce_manager::NonceManager;
use super::smart_account::{ConfirmationPolicy, SmartAccount};
use crate::config::Config;
use crate::error::OperationError;

/// Connects a validated execution context to live chain and account
/// implementations.
pub trait Backend: Send + Sync {
    fn chain_client(&self, network: &Network) -> Result<Arc<dyn ChainClient>, OperationError>;

    fn smart_account(
        &self,
        network: &Network,
        signing_key: &SecretString,
        account: Address,
    ) -> Result<Arc<dyn SmartAccount>, OperationError>;
}

/// Production backend: ethers HTTP providers plus bundler-submitted user
/// operations.
#[derive(Clone)]
pub struct EvmBackend {
    config: Config,
    evm_client: EvmClient,
    http: Client,
    nonce_manager: NonceManager,
}

impl EvmBackend {
    pub fn new(config: Config, http: Client) -> Self {
        let evm_client = EvmClient::new(&config.chain_rpc_urls);
        Self {
            config,
            evm_client,
            http,
            nonce_manager: NonceManager::new(),
        }
    }

    fn policy(&self) -> ConfirmationPolicy {
        self.config.confirmation_policy()
    }
}

impl Backend for EvmBackend {
    fn chain_client(&self, network: &Network) -> Result<Arc<dyn ChainClient>, OperationError> {
        let client = self
            .evm_client
            .client_for(network)
            .map_err(|e| OperationError::Validation(e.to_string()))?;
        Ok(Arc::new(client))
    }

    fn smart_account(
        &self,
        network: &Network,
        signing_key: &SecretString,
        account: Address,
    ) -> Result<Arc<dyn SmartAccount>, OperationError> {
        let provider = self
            .evm_client
            .get_provider(network.chain_id)
            .map_err(|e| OperationError::Submission(e.to_string()))?;
        let wallet = LocalWallet::from_str(signing_key.expose_secret().trim())
            .map_err(|_| {
                OperationError::Submission(
                    "signing key is not a valid secp256k1 private key".to_string(),
                )
            })?
            .with_chain_id(network.chain_id);

        let endpoint = BundlerEndpoint {
            chain_id: network.chain_id,
            bundler_url: self.config.bundler_url_for(network.chain_id),
            paymaster_url: self.config.paymaster_url_for(network.chain_id),
            entry_point: self.config.entry_point,
            validation_module: self.config.validation_module,
        };

        Ok(Arc::new(BundlerSmartAccount::new(
            self.http.clone(),
            provider,
            endpoint,
            wallet,
            account,
            self.nonce_manager.clone(),
            self.policy(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::chain::CHAIN_BASE;

    #[test]
    fn builds_clients_for_configured_networks() {
        let backend = EvmBackend::new(Config::default(), Client::new());
        let base = Network::by_chain_id(CHAIN_BASE).unwrap();
        assert!(backend.chain_client(base).is_ok());

        let key = SecretString::new(
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".to_string(),
        );
        let account = backend
            .smart_account(base, &key, Address::from_low_u64_be(42))
            .unwrap();
        assert_eq!(account.address(), Address::from_low_u64_be(42));
    }

    #[test]
    fn rejects_malformed_signing_keys() {
        let backend = EvmBackend::new(Config::default(), Client::new());
        let base = Network::by_chain_id(CHAIN_BASE).unwrap();
        let key = SecretString::new("not-a-key".to_string());
        let result = backend.smart_account(base, &key, Address::zero());
        assert!(matches!(result, Err(OperationError::Submission(_))));
    }

    #[test]
    fn missing_rpc_is_reported() {
        let mut config = Config::default();
        config.chain_rpc_urls.clear();
        let backend = EvmBackend::new(config, Client::new());
        let base = Network::by_chain_id(CHAIN_BASE).unwrap();
        assert!(backend.chain_client(base).is_err());
    }
}
