// src/tools/handlers/transfer.rs

use ethers::abi::Token;
use tracing::debug;

use super::{checksum, parse_address};
use crate::blockchain::{
    abi::{self, erc20},
    amount::{parse_units, NATIVE_DECIMALS},
    smart_account::Call,
    token_registry::is_native,
};
use crate::error::OperationError;
use crate::tools::args::TransferArgs;
use crate::tools::dispatcher::Session;

// `eth` is accepted on every network as a name for the native asset.
fn names_native(reference: &str, session: &Session<'_>) -> bool {
    let reference = reference.trim();
    reference.is_empty()
        || reference.eq_ignore_ascii_case("eth")
        || reference.eq_ignore_ascii_case("native")
        || reference.eq_ignore_ascii_case(session.network.native_symbol)
}

pub async fn smart_transfer(
    args: TransferArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    let destination = parse_address(&args.destination, "destination")?;
    let reference = args.token_address.as_deref().unwrap_or("eth");

    let token = if names_native(reference, session) {
        None
    } else {
        Some(session.resolve_token(reference)?).filter(|t| !is_native(t))
    };

    let account = session.smart_account()?;
    match token {
        None => {
            let value = parse_units(&args.amount, NATIVE_DECIMALS)?;
            debug!("Native transfer of {} wei to {:?}", value, destination);
            let submitted = account.send_transaction(vec![Call::native(destination, value)]).await?;
            Ok(format!(
                "Successfully transferred {} {}.\nTransaction submitted! Transaction Hash: {}",
                args.amount.trim(),
                session.network.native_symbol,
                submitted.hash_or_pending()
            ))
        }
        Some(token) => {
            let decimals = session.token_decimals(token).await?;
            let value = parse_units(&args.amount, decimals)?;
            let data = abi::encode_call(
                erc20::TRANSFER,
                &[Token::Address(destination), Token::Uint(value)],
            )?;
            let submitted = account.send_transaction(vec![Call::contract(token, data)]).await?;
            Ok(format!(
                "Successfully transferred {} tokens from contract {} to {}.\nTransaction submitted! Transaction Hash: {}",
                args.amount.trim(),
                checksum(&token),
                checksum(&destination),
                submitted.hash_or_pending()
            ))
        }
    }
}
