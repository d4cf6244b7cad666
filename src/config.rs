// src/config.rs

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use ethers::types::Address;
use secrecy::SecretString;

use crate::blockchain::{
    chain::{Network, NETWORKS},
    smart_account::ConfirmationPolicy,
    token_registry::TokenRegistry,
};

pub const DEFAULT_BUNDLER_URL: &str = "https://bundler.0xgasless.com/{chainId}";
pub const DEFAULT_SWAP_AGGREGATOR_URL: &str = "https://dln.debridge.finance/v1.0/chain";
/// ERC-4337 v0.6 EntryPoint.
pub const DEFAULT_ENTRY_POINT: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// Network used when a call's context omits one.
    pub default_network: String,
    /// chain id -> RPC URL, one entry per supported network.
    pub chain_rpc_urls: HashMap<u64, String>,

    // Account abstraction
    pub bundler_url: String,
    pub paymaster_url: Option<String>,
    pub entry_point: Address,
    pub validation_module: Option<Address>,

    // External services
    pub swap_aggregator_url: String,

    // Confirmation bounds
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,

    /// Raw `TOKEN_REGISTRY` overrides, validated at load time.
    pub token_registry_overrides: Option<String>,

    // Fallback execution context for single-user deployments
    pub signing_key: Option<SecretString>,
    pub smart_account_address: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            default_network: "avalanche".to_string(),
            chain_rpc_urls: NETWORKS
                .iter()
                .map(|n| (n.chain_id, n.default_rpc_url.to_string()))
                .collect(),
            bundler_url: DEFAULT_BUNDLER_URL.to_string(),
            paymaster_url: None,
            entry_point: Address::from_str(DEFAULT_ENTRY_POINT).unwrap_or_default(),
            validation_module: None,
            swap_aggregator_url: DEFAULT_SWAP_AGGREGATOR_URL.to_string(),
            confirmation_timeout: Duration::from_secs(60),
            receipt_poll_interval: Duration::from_millis(2000),
            token_registry_overrides: None,
            signing_key: None,
            smart_account_address: None,
        }
    }
}

fn parse_address(name: &str, value: &str) -> Result<Address> {
    Address::from_str(value.trim()).map_err(|e| anyhow!("{} must be a valid address: {}", name, e))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Returns the names of the networks with a configured RPC endpoint
    pub fn supported_networks(&self) -> Vec<&'static str> {
        NETWORKS
            .iter()
            .filter(|n| self.chain_rpc_urls.contains_key(&n.chain_id))
            .map(|n| n.name)
            .collect()
    }

    pub fn rpc_url(&self, network: &Network) -> Option<&str> {
        self.chain_rpc_urls.get(&network.chain_id).map(String::as_str)
    }

    /// Bundler endpoint for `chain_id`; `{chainId}` in the template is substituted.
    pub fn bundler_url_for(&self, chain_id: u64) -> String {
        self.bundler_url.replace("{chainId}", &chain_id.to_string())
    }

    pub fn paymaster_url_for(&self, chain_id: u64) -> Option<String> {
        self.paymaster_url
            .as_ref()
            .map(|url| url.replace("{chainId}", &chain_id.to_string()))
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: self.confirmation_timeout,
            poll_interval: self.receipt_poll_interval,
        }
    }

    /// Builtin tokens with `TOKEN_REGISTRY` merged on top.
    pub fn token_registry(&self) -> Result<TokenRegistry> {
        let registry = TokenRegistry::builtin();
        match &self.token_registry_overrides {
            Some(raw) => registry.with_overrides_json(raw),
            None => Ok(registry),
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));
        let mut config = Config::default();

        if let Some(port) = get("PORT") {
            config.port = port.parse().context("PORT must be a valid number")?;
        }

        if let Some(network) = get("DEFAULT_NETWORK") {
            let resolved = Network::lookup(&network).ok_or_else(|| {
                anyhow!("DEFAULT_NETWORK '{}' is not a supported network", network)
            })?;
            config.default_network = resolved.name.to_string();
        }

        if let Some(raw) = get("CHAIN_RPC_URLS") {
            let urls: HashMap<String, String> =
                serde_json::from_str(&raw).context("Invalid CHAIN_RPC_URLS JSON format")?;
            for (key, url) in urls {
                let network = Network::lookup(&key).ok_or_else(|| {
                    anyhow!("CHAIN_RPC_URLS key '{}' is not a supported network", key)
                })?;
                config.chain_rpc_urls.insert(network.chain_id, url);
            }
        }

        if let Some(url) = get("RPC_URL") {
            if let Some(network) = Network::lookup(&config.default_network) {
                config.chain_rpc_urls.insert(network.chain_id, url);
            }
        }

        if let Some(url) = get("BUNDLER_URL") {
            config.bundler_url = url;
        }
        config.paymaster_url = get("PAYMASTER_URL");

        if let Some(addr) = get("ENTRY_POINT_ADDRESS") {
            config.entry_point = parse_address("ENTRY_POINT_ADDRESS", &addr)?;
        }
        if let Some(addr) = get("VALIDATION_MODULE_ADDRESS") {
            config.validation_module = Some(parse_address("VALIDATION_MODULE_ADDRESS", &addr)?);
        }

        if let Some(url) = get("SWAP_AGGREGATOR_URL") {
            config.swap_aggregator_url = url.trim_end_matches('/').to_string();
        }

        if let Some(secs) = get("CONFIRMATION_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .context("CONFIRMATION_TIMEOUT_SECS must be a valid number")?;
            config.confirmation_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = get("RECEIPT_POLL_INTERVAL_MS") {
            let ms: u64 = ms.parse().context("RECEIPT_POLL_INTERVAL_MS must be a valid number")?;
            config.receipt_poll_interval = Duration::from_millis(ms.max(1));
        }

        if let Some(raw) = get("TOKEN_REGISTRY") {
            // Fail at startup rather than on the first swap.
            TokenRegistry::builtin().with_overrides_json(&raw)?;
            config.token_registry_overrides = Some(raw);
        }

        config.signing_key = get("SIGNING_KEY").map(SecretString::new);
        config.smart_account_address = get("SMART_ACCOUNT_ADDRESS");

        Ok(config)
    }
}
