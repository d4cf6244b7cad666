// src/tools/handlers/mod.rs

pub mod account;
pub mod contract;
pub mod nft;
pub mod swap;
pub mod token;
pub mod transaction;
pub mod transfer;
pub mod units;

use std::str::FromStr;

use ethers::types::{Address, Bytes};
use ethers::utils::to_checksum;

use crate::error::OperationError;

/// Parse a required address argument, naming the field on failure.
pub(crate) fn parse_address(value: &str, field: &str) -> Result<Address, OperationError> {
    Address::from_str(value.trim()).map_err(|_| {
        OperationError::Validation(format!("{} '{}' is not a valid address", field, value))
    })
}

pub(crate) fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

/// Optional 0x calldata; absent or `0x` means empty.
pub(crate) fn parse_calldata(value: Option<&str>) -> Result<Bytes, OperationError> {
    let raw = value.map(str::trim).unwrap_or("");
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|_| OperationError::Validation(format!("data '{}' is not valid hex", raw)))
}
