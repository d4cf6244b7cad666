// src/tools/handlers/account.rs

use std::collections::HashSet;
use std::str::FromStr;

use ethers::abi::Token;
use ethers::types::Address;
use tracing::warn;

use super::checksum;
use crate::blockchain::{
    abi::{self, erc20},
    amount::{format_fixed, NATIVE_DECIMALS},
    token_registry::is_native,
};
use crate::error::OperationError;
use crate::tools::args::BalanceArgs;
use crate::tools::dispatcher::Session;

const BALANCE_PLACES: u32 = 6;

pub async fn get_address(session: &Session<'_>) -> Result<String, OperationError> {
    Ok(format!(
        "Smart Account: {}\nNetwork: {}",
        checksum(&session.account),
        session.network.name
    ))
}

/// Native balance plus each requested ERC-20 with a non-zero balance.
///
/// A token that cannot be read (bad address, not a contract, reverting
/// `decimals`) is logged and skipped; it never fails the whole report.
pub async fn get_balance(
    args: BalanceArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    let chain_id = session.network.chain_id;
    let requested_any = !args.token_addresses.is_empty() || !args.token_symbols.is_empty();

    let mut tokens: Vec<Address> = Vec::new();
    for raw in &args.token_addresses {
        match Address::from_str(raw.trim()) {
            Ok(address) => tokens.push(address),
            Err(_) => warn!("Skipping malformed token address '{}'", raw),
        }
    }
    let mut unknown_symbols = Vec::new();
    for symbol in &args.token_symbols {
        match session.tokens.resolve(chain_id, symbol) {
            Some(address) => tokens.push(address),
            None => unknown_symbols.push(symbol.as_str()),
        }
    }

    let mut lines = Vec::new();
    let mut found_requested = false;

    match session.chain.native_balance(session.account).await {
        Ok(balance) => lines.push(format!(
            "{}: {}",
            session.network.native_symbol,
            format_fixed(balance, NATIVE_DECIMALS, BALANCE_PLACES)?
        )),
        Err(e) => warn!("Native balance lookup failed: {}", e),
    }

    let mut seen = HashSet::new();
    for token in tokens {
        if !seen.insert(token) {
            continue;
        }
        if is_native(&token) {
            found_requested = true;
            continue;
        }
        match token_line(session, token).await {
            Ok(Some(line)) => {
                found_requested = true;
                lines.push(line);
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping token {:?}: {}", token, e),
        }
    }

    let header = if requested_any { "Balances:" } else { "All Token Balances:" };
    let mut report = format!("Smart Account: {}\n{}", checksum(&session.account), header);
    for line in &lines {
        report.push('\n');
        report.push_str(line);
    }
    if lines.is_empty() || (requested_any && !found_requested) {
        report.push_str("\nNo balances found for the requested tokens");
    }
    if !unknown_symbols.is_empty() {
        report.push_str(&format!(
            "\nUnknown token symbols on {}: {}",
            session.network.name,
            unknown_symbols.join(", ")
        ));
    }
    Ok(report)
}

// `None` for a zero balance.
async fn token_line(
    session: &Session<'_>,
    token: Address,
) -> Result<Option<String>, OperationError> {
    let balance = abi::first_uint(
        &session
            .read(token, erc20::BALANCE_OF, &[Token::Address(session.account)])
            .await?,
    )?;
    if balance.is_zero() {
        return Ok(None);
    }
    let decimals = session.token_decimals(token).await?;
    let symbol = abi::first_string(&session.read(token, erc20::SYMBOL, &[]).await?)?;
    Ok(Some(format!(
        "{}: {}",
        symbol,
        format_fixed(balance, decimals, BALANCE_PLACES)?
    )))
}
