// src/tools/handlers/transaction.rs

use std::str::FromStr;

use ethers::types::{H256, U256};

use super::{parse_address, parse_calldata};
use crate::blockchain::{
    amount::{format_units, parse_integer, NATIVE_DECIMALS},
    smart_account::Call,
};
use crate::error::OperationError;
use crate::tools::args::{BatchArgs, RawCallArgs, StatusArgs};
use crate::tools::dispatcher::Session;

fn raw_call(args: &RawCallArgs) -> Result<Call, OperationError> {
    let to = parse_address(&args.to, "to")?;
    let data = parse_calldata(args.data.as_deref())?;
    let value = match args.value.as_deref() {
        Some(v) => parse_integer(v)?,
        None => U256::zero(),
    };
    Ok(Call { to, data, value })
}

pub async fn send_transaction(
    args: RawCallArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    let call = raw_call(&args)?;
    let (to, value) = (args.to.trim().to_string(), call.value);

    let account = session.smart_account()?;
    let submitted = account.send_transaction(vec![call]).await?;

    Ok(format!(
        "Transaction submitted successfully!\nTo: {}\nValue: {} {}\nTransaction Hash: {}\nUse 'get_transaction_status' to check confirmation.",
        to,
        format_units(value, NATIVE_DECIMALS)?,
        session.network.native_symbol,
        submitted.hash_or_pending()
    ))
}

/// All calls go out in one user operation; nothing is submitted if any
/// entry is malformed.
pub async fn batch_transactions(
    args: BatchArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    if args.transactions.is_empty() {
        return Err(OperationError::Validation(
            "transactions must be a non-empty array".to_string(),
        ));
    }
    let calls = args
        .transactions
        .iter()
        .enumerate()
        .map(|(i, tx)| {
            raw_call(tx)
                .map_err(|e| OperationError::Validation(format!("transaction {}: {}", i + 1, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let count = calls.len();

    let account = session.smart_account()?;
    let submitted = account.send_transaction(calls).await?;

    Ok(format!(
        "Batch transaction submitted successfully!\nNumber of transactions: {}\nTransaction Hash: {}",
        count,
        submitted.hash_or_pending()
    ))
}

pub async fn get_transaction_status(
    args: StatusArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    let raw = args.transaction_hash.trim();
    let hash = H256::from_str(raw).map_err(|_| {
        OperationError::Validation(format!("'{}' is not a valid transaction hash", raw))
    })?;

    match session.chain.transaction_receipt(hash).await? {
        None => Ok("Transaction is still pending.".to_string()),
        Some(receipt) if receipt.success => Ok(format!(
            "Transaction confirmed!\nBlock Number: {}\nGas Used: {}\nTransaction Hash: {:?}",
            receipt.block_number.map(|b| b.to_string()).unwrap_or_else(|| "unknown".to_string()),
            receipt.gas_used.map(|g| g.to_string()).unwrap_or_else(|| "unknown".to_string()),
            hash
        )),
        Some(_) => Ok(format!("Transaction failed!\nTransaction Hash: {:?}", hash)),
    }
}
