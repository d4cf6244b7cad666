// src/tools/handlers/token.rs

use ethers::abi::Token;
use ethers::types::{Address, U256};

use super::{checksum, parse_address};
use crate::blockchain::{
    abi::{self, erc20},
    amount::{format_units, parse_units},
    smart_account::Call,
    token_registry::is_native,
};
use crate::error::OperationError;
use crate::tools::args::{ApproveArgs, TokenDetailsArgs};
use crate::tools::dispatcher::{checked_decimals, Session};

/// `approve(spender, amount)` on `token`.
pub(crate) fn approve_call(
    token: Address,
    spender: Address,
    amount: U256,
) -> Result<Call, OperationError> {
    let data = abi::encode_call(erc20::APPROVE, &[Token::Address(spender), Token::Uint(amount)])?;
    Ok(Call::contract(token, data))
}

pub async fn get_token_details(
    args: TokenDetailsArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    let token = session.resolve_token(&args.token_address)?;
    if is_native(&token) {
        return Err(OperationError::Validation(format!(
            "{} is the native asset, not an ERC-20 contract",
            args.token_address
        )));
    }

    let not_a_token = |e: OperationError| {
        OperationError::OnChainRead(format!(
            "{:?} does not look like an ERC-20 token ({})",
            token, e
        ))
    };

    let (name, symbol, decimals, total_supply) = tokio::try_join!(
        session.read(token, erc20::NAME, &[]),
        session.read(token, erc20::SYMBOL, &[]),
        session.read(token, erc20::DECIMALS, &[]),
        session.read(token, erc20::TOTAL_SUPPLY, &[]),
    )
    .map_err(not_a_token)?;
    let decimals = checked_decimals(token, abi::first_uint(&decimals)?)?;

    Ok(format!(
        "Token Details:\nName: {}\nSymbol: {}\nDecimals: {}\nTotal Supply: {}\nAddress: {}\nChain ID: {}",
        abi::first_string(&name)?,
        abi::first_string(&symbol)?,
        decimals,
        format_units(abi::first_uint(&total_supply)?, decimals)?,
        checksum(&token),
        session.network.chain_id
    ))
}

pub async fn approve_token(
    args: ApproveArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    let token = session.resolve_token(&args.token_address)?;
    if is_native(&token) {
        return Err(OperationError::Validation("the native asset cannot be approved".to_string()));
    }
    let spender = parse_address(&args.spender, "spender")?;

    let (amount, shown) = if args.approve_max {
        (U256::MAX, "MAX".to_string())
    } else {
        let human = args.amount.as_deref().ok_or_else(|| {
            OperationError::Validation("amount is required unless approveMax is set".to_string())
        })?;
        let decimals = session.token_decimals(token).await?;
        (parse_units(human, decimals)?, human.trim().to_string())
    };

    let account = session.smart_account()?;
    let submitted = account.send_transaction(vec![approve_call(token, spender, amount)?]).await?;

    Ok(format!(
        "Token approval submitted successfully!\nToken: {}\nSpender: {}\nAmount: {}\nTransaction Hash: {}",
        checksum(&token),
        checksum(&spender),
        shown,
        submitted.hash_or_pending()
    ))
}
