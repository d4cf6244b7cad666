// src/blockchain/chain.rs

use serde::Serialize;

pub const CHAIN_AVALANCHE: u64 = 43114;
pub const CHAIN_BASE: u64 = 8453;

/// An EVM network the engine can operate on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    /// Canonical lowercase name, e.g. `avalanche`
    pub name: &'static str,
    pub chain_id: u64,
    /// Symbol of the native gas asset (18 decimals)
    pub native_symbol: &'static str,
    /// Public RPC used when no override is configured
    pub default_rpc_url: &'static str,
}

pub const NETWORKS: &[Network] = &[
    Network {
        name: "avalanche",
        chain_id: CHAIN_AVALANCHE,
        native_symbol: "AVAX",
        default_rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    },
    Network {
        name: "base",
        chain_id: CHAIN_BASE,
        native_symbol: "ETH",
        default_rpc_url: "https://mainnet.base.org",
    },
];

// Normalize common network aliases users (or the intent extractor) might pass.
pub fn normalize_network(input: &str) -> String {
    let mut s = input.trim().to_lowercase();
    s = s.replace([' ', '_'], "-");
    while s.contains("--") {
        s = s.replace("--", "-");
    }

    match s.as_str() {
        "avax"
        | "avalanche-c"
        | "avalanche-c-chain"
        | "c-chain"
        | "avalanche-mainnet"
        | "43114" => "avalanche".to_string(),
        "base-mainnet" | "8453" => "base".to_string(),
        _ => s,
    }
}

impl Network {
    /// Look up a network by name, alias, or decimal chain id.
    pub fn lookup(input: &str) -> Option<&'static Network> {
        let name = normalize_network(input);
        NETWORKS.iter().find(|n| n.name == name)
    }

    pub fn by_chain_id(chain_id: u64) -> Option<&'static Network> {
        NETWORKS.iter().find(|n| n.chain_id == chain_id)
    }
}
