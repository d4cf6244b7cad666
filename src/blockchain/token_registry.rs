// src/blockchain/token_registry.rs

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use ethers_core::types::Address;
use lazy_static::lazy_static;

use super::chain::{CHAIN_AVALANCHE, CHAIN_BASE};

/// Sentinel address aggregators use for a chain's native asset.
pub const NATIVE_SENTINEL: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

lazy_static! {
    static ref NATIVE_SENTINEL_ADDRESS: Address =
        Address::from_str(NATIVE_SENTINEL).unwrap_or_default();

    // Minimal builtin registry; extended through TOKEN_REGISTRY.
    static ref BUILTIN_TOKENS: Vec<(u64, &'static str, &'static str)> = vec![
        (CHAIN_AVALANCHE, "AVAX", NATIVE_SENTINEL),
        // USDC.e on Avalanche C-Chain
        (CHAIN_AVALANCHE, "USDC", "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
        (CHAIN_AVALANCHE, "WETH", "0x49D5c2BdFfac6CE2BFdB6640F4F80f226bc10bAB"),
        (CHAIN_AVALANCHE, "USDT", "0x9702230A8Ea53601f5cd2dc00fDBc13d4dF4A8c7"),
        (CHAIN_BASE, "ETH", NATIVE_SENTINEL),
        (CHAIN_BASE, "USDC", "0x833589fCD6EDB6E08f4c7C32D4f71b54bdA02913"),
        (CHAIN_BASE, "WETH", "0x4200000000000000000000000000000000000006"),
        (CHAIN_BASE, "USDT", "0xfF970A61A04b1cA14834A43f5dE4533eBDDB5CC8"),
    ];
}

/// True for the zero address and the `0xEeee…` sentinel, neither of which is
/// an ERC-20 contract.
pub fn is_native(address: &Address) -> bool {
    address.is_zero() || *address == *NATIVE_SENTINEL_ADDRESS
}

pub fn native_sentinel() -> Address {
    *NATIVE_SENTINEL_ADDRESS
}

/// Static `chain id -> symbol -> address` lookup table.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<u64, HashMap<String, Address>>,
}

impl TokenRegistry {
    /// Registry seeded with the builtin token table.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for (chain_id, symbol, address) in BUILTIN_TOKENS.iter() {
            if let Ok(addr) = Address::from_str(address) {
                registry.insert(*chain_id, symbol, addr);
            }
        }
        registry
    }

    pub fn insert(&mut self, chain_id: u64, symbol: &str, address: Address) {
        self.tokens
            .entry(chain_id)
            .or_default()
            .insert(symbol.trim().to_uppercase(), address);
    }

    /// Merge overrides given as JSON `{"<chainId>": {"<SYMBOL>": "<address>"}}`.
    pub fn with_overrides_json(mut self, raw: &str) -> Result<Self> {
        let parsed: HashMap<String, HashMap<String, String>> =
            serde_json::from_str(raw).context("Invalid TOKEN_REGISTRY JSON format")?;
        for (chain, symbols) in parsed {
            let chain_id: u64 = chain
                .parse()
                .with_context(|| format!("TOKEN_REGISTRY chain id '{}' is not a number", chain))?;
            for (symbol, address) in symbols {
                let addr = Address::from_str(&address).map_err(|e| {
                    anyhow!("TOKEN_REGISTRY address for {} is invalid: {}", symbol, e)
                })?;
                self.insert(chain_id, &symbol, addr);
            }
        }
        Ok(self)
    }

    /// Case-insensitive symbol lookup.
    pub fn resolve(&self, chain_id: u64, symbol: &str) -> Option<Address> {
        self.tokens
            .get(&chain_id)
            .and_then(|m| m.get(&symbol.trim().to_uppercase()))
            .copied()
    }

    /// Resolve every known symbol, silently dropping unknown ones.
    pub fn resolve_all<S: AsRef<str>>(&self, chain_id: u64, symbols: &[S]) -> Vec<Address> {
        symbols
            .iter()
            .filter_map(|s| self.resolve(chain_id, s.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_symbols_case_insensitively() {
        let registry = TokenRegistry::builtin();
        let usdc = registry.resolve(CHAIN_BASE, "usdc").unwrap();
        assert_eq!(
            usdc,
            Address::from_str("0x833589fCD6EDB6E08f4c7C32D4f71b54bdA02913").unwrap()
        );
        assert!(registry.resolve(CHAIN_BASE, "DOGE").is_none());
        assert!(registry.resolve(1, "USDC").is_none());
    }

    #[test]
    fn resolve_all_skips_unknown_symbols() {
        let registry = TokenRegistry::builtin();
        let resolved = registry.resolve_all(CHAIN_AVALANCHE, &["USDC", "NOPE", "weth"]);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn native_assets_are_detected() {
        let registry = TokenRegistry::builtin();
        assert!(is_native(&registry.resolve(CHAIN_AVALANCHE, "AVAX").unwrap()));
        assert!(is_native(&Address::zero()));
        assert!(!is_native(&registry.resolve(CHAIN_AVALANCHE, "USDC").unwrap()));
    }

    #[test]
    fn overrides_extend_and_replace_entries() {
        let registry = TokenRegistry::builtin()
            .with_overrides_json(
                r#"{"8453": {"usdc": "0x0000000000000000000000000000000000000001"},
                    "1": {"DAI": "0x6B175474E89094C44Da98b954EedeAC495271d0F"}}"#,
            )
            .unwrap();
        assert_eq!(
            registry.resolve(CHAIN_BASE, "USDC").unwrap(),
            Address::from_low_u64_be(1)
        );
        assert!(registry.resolve(1, "dai").is_some());
        assert!(TokenRegistry::builtin().with_overrides_json("{\"x\": {}}").is_err());
        assert!(TokenRegistry::builtin()
            .with_overrides_json(r#"{"1": {"BAD": "0x12"}}"#)
            .is_err());
    }
}
