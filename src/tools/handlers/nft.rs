// src/tools/handlers/nft.rs

use ethers::abi::Token;

use super::{checksum, parse_address};
use crate::blockchain::{
    abi::{self, erc721},
    amount::parse_integer,
    smart_account::Call,
};
use crate::error::OperationError;
use crate::tools::args::{MintNftArgs, TransferNftArgs};
use crate::tools::dispatcher::Session;

pub async fn mint_nft(args: MintNftArgs, session: &Session<'_>) -> Result<String, OperationError> {
    let contract = parse_address(&args.contract_address, "contractAddress")?;
    let to = match args.to.as_deref() {
        Some(to) => parse_address(to, "to")?,
        None => session.account,
    };
    let token_id = parse_integer(args.token_id.as_deref().unwrap_or("1"))?;

    let data = abi::encode_call(erc721::MINT, &[Token::Address(to), Token::Uint(token_id)])?;
    let submitted = session
        .smart_account()?
        .send_transaction(vec![Call::contract(contract, data)])
        .await?;

    Ok(format!(
        "NFT minted successfully!\nContract: {}\nTo: {}\nToken ID: {}\nTransaction Hash: {}",
        checksum(&contract),
        checksum(&to),
        token_id,
        submitted.hash_or_pending()
    ))
}

pub async fn transfer_nft(
    args: TransferNftArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    let contract = parse_address(&args.contract_address, "contractAddress")?;
    let from = match args.from.as_deref() {
        Some(from) => parse_address(from, "from")?,
        None => session.account,
    };
    let to = parse_address(&args.to, "to")?;
    let token_id = parse_integer(&args.token_id)?;

    let data = abi::encode_call(
        erc721::TRANSFER_FROM,
        &[Token::Address(from), Token::Address(to), Token::Uint(token_id)],
    )?;
    let submitted = session
        .smart_account()?
        .send_transaction(vec![Call::contract(contract, data)])
        .await?;

    Ok(format!(
        "NFT transferred successfully!\nContract: {}\nFrom: {}\nTo: {}\nToken ID: {}\nTransaction Hash: {}",
        checksum(&contract),
        checksum(&from),
        checksum(&to),
        token_id,
        submitted.hash_or_pending()
    ))
}
