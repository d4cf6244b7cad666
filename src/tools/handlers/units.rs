// src/tools/handlers/units.rs

use ethers::types::U256;
use serde_json::Value;

use crate::blockchain::amount::{self, parse_integer};
use crate::error::OperationError;
use crate::tools::args::{FromHexArgs, ToHexArgs, UnitsArgs};

pub fn format_units(args: UnitsArgs) -> Result<String, OperationError> {
    let raw = parse_integer(&args.value)?;
    Ok(format!("Formatted Value: {}", amount::format_units(raw, args.decimals)?))
}

pub fn parse_units(args: UnitsArgs) -> Result<String, OperationError> {
    let parsed = amount::parse_units(&args.value, args.decimals)?;
    Ok(format!("Parsed Value (Wei): {}", parsed))
}

/// Numbers become minimal integer hex, booleans `0x1`/`0x0`, strings their
/// UTF-8 bytes.
pub fn to_hex(args: ToHexArgs) -> Result<String, OperationError> {
    let hex = match &args.value {
        Value::Bool(b) => format!("0x{}", u8::from(*b)),
        Value::Number(n) => {
            let value = n
                .as_u64()
                .map(U256::from)
                .or_else(|| U256::from_dec_str(&n.to_string()).ok())
                .ok_or_else(|| {
                    OperationError::Validation(format!("{} is not a non-negative integer", n))
                })?;
            format!("0x{:x}", value)
        }
        Value::String(s) => format!("0x{}", hex::encode(s.as_bytes())),
        other => {
            return Err(OperationError::Validation(format!(
                "cannot convert {} to hex",
                other
            )))
        }
    };
    Ok(format!("Hex: {}", hex))
}

pub fn from_hex(args: FromHexArgs) -> Result<String, OperationError> {
    let raw = args.hex.trim();
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    let invalid = || OperationError::Validation(format!("'{}' is not valid hex", raw));

    let decoded = match args.to.trim().to_lowercase().as_str() {
        "number" | "bigint" => {
            if digits.is_empty() {
                return Err(invalid());
            }
            U256::from_str_radix(digits, 16).map_err(|_| invalid())?.to_string()
        }
        "boolean" => {
            let digits = if digits.is_empty() { "0" } else { digits };
            let value = U256::from_str_radix(digits, 16).map_err(|_| invalid())?;
            if value > U256::one() {
                return Err(OperationError::Validation(format!(
                    "{} is not a boolean (0x0 or 0x1)",
                    raw
                )));
            }
            (!value.is_zero()).to_string()
        }
        "bytes" => {
            let bytes = hex::decode(digits).map_err(|_| invalid())?;
            serde_json::to_string(&bytes).map_err(|e| OperationError::Validation(e.to_string()))?
        }
        "string" => {
            let bytes = hex::decode(digits).map_err(|_| invalid())?;
            String::from_utf8(bytes)
                .map_err(|_| OperationError::Validation(format!("{} is not valid UTF-8", raw)))?
        }
        other => {
            return Err(OperationError::Validation(format!(
                "unsupported target '{}'; use string, number, bigint, boolean or bytes",
                other
            )))
        }
    };
    Ok(format!("Decoded Value: {}", decoded))
}
