// src/lib.rs

use std::sync::Arc;

use anyhow::Result;

// Re-export modules
pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;

use blockchain::{aggregator::DlnAggregator, backend::EvmBackend};
use tools::{Dispatcher, ExecutionContext, ToolRegistry};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// Tool registry plus the backends every tool runs against
    pub dispatcher: Arc<Dispatcher>,
    /// Context used when a request does not carry its own
    pub default_context: ExecutionContext,
}

impl AppState {
    /// Wire the production backends from configuration.
    pub fn from_config(config: config::Config) -> Result<Self> {
        let http = reqwest::Client::new();
        let dispatcher = Dispatcher::new(
            ToolRegistry::standard()?,
            Arc::new(EvmBackend::new(config.clone(), http.clone())),
            Arc::new(DlnAggregator::new(http, config.swap_aggregator_url.clone())),
        )
        .with_tokens(config.token_registry()?)
        .with_confirmation_policy(config.confirmation_policy());

        Ok(Self::new(config, Arc::new(dispatcher)))
    }

    pub fn new(config: config::Config, dispatcher: Arc<Dispatcher>) -> Self {
        let default_context = ExecutionContext {
            signing_key: config.signing_key.clone(),
            network: Some(config.default_network.clone()),
            smart_account_address: config.smart_account_address.clone(),
        };
        Self {
            config,
            dispatcher,
            default_context,
        }
    }

    pub fn has_default_signer(&self) -> bool {
        self.default_context.signing_key.is_some()
            && self.default_context.smart_account_address.is_some()
    }
}
