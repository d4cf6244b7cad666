// src/blockchain/abi.rs

use std::str::FromStr;

use ethers_core::abi::{Abi, Function, HumanReadableParser, ParamType, Token};
use ethers_core::types::{Address, Bytes, I256, U256};
use ethers_core::utils::to_checksum;
use serde_json::{json, Value};
use thiserror::Error;

use super::amount::parse_integer;

#[derive(Error, Debug)]
pub enum AbiError {
    #[error("could not parse ABI: {0}")]
    Parse(String),
    #[error("function '{0}' not found in ABI")]
    FunctionNotFound(String),
    #[error("arg count mismatch: expected {expected}, got {got}")]
    ArgCount { expected: usize, got: usize },
    #[error("invalid {kind} argument: {value}")]
    InvalidArg { kind: String, value: String },
    #[error("encoding failed: {0}")]
    Encode(String),
    #[error("decoding failed: {0}")]
    Decode(String),
}

/// Fixed ERC-20 fragments used by the balance, approval, transfer and swap tools.
pub mod erc20 {
    pub const NAME: &str = "function name() view returns (string)";
    pub const SYMBOL: &str = "function symbol() view returns (string)";
    pub const DECIMALS: &str = "function decimals() view returns (uint8)";
    pub const TOTAL_SUPPLY: &str = "function totalSupply() view returns (uint256)";
    pub const BALANCE_OF: &str = "function balanceOf(address owner) view returns (uint256)";
    pub const ALLOWANCE: &str =
        "function allowance(address owner, address spender) view returns (uint256)";
    pub const APPROVE: &str = "function approve(address spender, uint256 amount) returns (bool)";
    pub const TRANSFER: &str = "function transfer(address to, uint256 amount) returns (bool)";
}

/// Minimal ERC-721 surface for mint / transfer.
pub mod erc721 {
    pub const MINT: &str = "function mint(address to, uint256 tokenId)";
    pub const TRANSFER_FROM: &str =
        "function transferFrom(address from, address to, uint256 tokenId)";
}

/// Parse a single human-readable function signature.
pub fn function(signature: &str) -> Result<Function, AbiError> {
    HumanReadableParser::parse_function(signature).map_err(|e| AbiError::Parse(e.to_string()))
}

/// Encode a call to one of the fixed fragments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Result<Bytes, AbiError> {
    let func = function(signature)?;
    encode_function(&func, tokens)
}

pub fn encode_function(func: &Function, tokens: &[Token]) -> Result<Bytes, AbiError> {
    func.encode_input(tokens)
        .map(Bytes::from)
        .map_err(|e| AbiError::Encode(e.to_string()))
}

/// Parse a caller-supplied ABI. Accepts a standard JSON ABI, a JSON list of
/// human-readable signatures, or one bare signature.
pub fn parse_abi_input(raw: &str) -> Result<Abi, AbiError> {
    let trimmed = raw.trim();
    if let Ok(abi) = serde_json::from_str::<Abi>(trimmed) {
        return Ok(abi);
    }
    let signatures: Vec<String> = match serde_json::from_str::<Vec<String>>(trimmed) {
        Ok(list) => list,
        Err(_) if !trimmed.starts_with('[') => vec![trimmed.to_string()],
        Err(e) => return Err(AbiError::Parse(e.to_string())),
    };
    let refs: Vec<&str> = signatures.iter().map(String::as_str).collect();
    ethers_core::abi::parse_abi(&refs).map_err(|e| AbiError::Parse(e.to_string()))
}

/// Pick the overload of `name` whose arity matches, falling back to the first.
pub fn find_function<'a>(
    abi: &'a Abi,
    name: &str,
    arg_count: usize,
) -> Result<&'a Function, AbiError> {
    let candidates = abi
        .functions_by_name(name)
        .map_err(|_| AbiError::FunctionNotFound(name.to_string()))?;
    candidates
        .iter()
        .find(|f| f.inputs.len() == arg_count)
        .or_else(|| candidates.first())
        .ok_or_else(|| AbiError::FunctionNotFound(name.to_string()))
}

/// Coerce loosely-typed JSON arguments into ABI tokens for `func`.
pub fn coerce_tokens(func: &Function, args: &[Value]) -> Result<Vec<Token>, AbiError> {
    if func.inputs.len() != args.len() {
        return Err(AbiError::ArgCount {
            expected: func.inputs.len(),
            got: args.len(),
        });
    }
    func.inputs
        .iter()
        .zip(args)
        .map(|(param, value)| coerce_token(&param.kind, value))
        .collect()
}

fn invalid(kind: &ParamType, value: &Value) -> AbiError {
    AbiError::InvalidArg {
        kind: param_type_to_string(kind),
        value: value.to_string(),
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decode_hex(kind: &ParamType, value: &Value) -> Result<Vec<u8>, AbiError> {
    let s = value.as_str().ok_or_else(|| invalid(kind, value))?;
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|_| invalid(kind, value))
}

pub fn coerce_token(kind: &ParamType, value: &Value) -> Result<Token, AbiError> {
    let token = match kind {
        ParamType::Address => {
            let s = value.as_str().ok_or_else(|| invalid(kind, value))?;
            Token::Address(Address::from_str(s).map_err(|_| invalid(kind, value))?)
        }
        ParamType::Uint(_) => {
            let s = value_as_text(value).ok_or_else(|| invalid(kind, value))?;
            Token::Uint(parse_integer(&s).map_err(|_| invalid(kind, value))?)
        }
        ParamType::Int(_) => {
            let s = value_as_text(value).ok_or_else(|| invalid(kind, value))?;
            Token::Int(I256::from_dec_str(&s).map_err(|_| invalid(kind, value))?.into_raw())
        }
        ParamType::Bool => match value {
            Value::Bool(b) => Token::Bool(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Token::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Token::Bool(false),
            _ => return Err(invalid(kind, value)),
        },
        ParamType::String => {
            Token::String(value_as_text(value).ok_or_else(|| invalid(kind, value))?)
        }
        ParamType::Bytes => Token::Bytes(decode_hex(kind, value)?),
        ParamType::FixedBytes(size) => {
            let bytes = decode_hex(kind, value)?;
            if bytes.len() != *size {
                return Err(invalid(kind, value));
            }
            Token::FixedBytes(bytes)
        }
        ParamType::Array(inner) => {
            let items = value.as_array().ok_or_else(|| invalid(kind, value))?;
            Token::Array(
                items
                    .iter()
                    .map(|v| coerce_token(inner, v))
                    .collect::<Result<_, _>>()?,
            )
        }
        ParamType::FixedArray(inner, size) => {
            let items = value.as_array().ok_or_else(|| invalid(kind, value))?;
            if items.len() != *size {
                return Err(invalid(kind, value));
            }
            Token::FixedArray(
                items
                    .iter()
                    .map(|v| coerce_token(inner, v))
                    .collect::<Result<_, _>>()?,
            )
        }
        ParamType::Tuple(components) => {
            let items = value.as_array().ok_or_else(|| invalid(kind, value))?;
            if items.len() != components.len() {
                return Err(invalid(kind, value));
            }
            Token::Tuple(
                components
                    .iter()
                    .zip(items)
                    .map(|(k, v)| coerce_token(k, v))
                    .collect::<Result<_, _>>()?,
            )
        }
    };
    Ok(token)
}

pub fn param_type_to_string(p: &ParamType) -> String {
    match p {
        ParamType::Address => "address".to_string(),
        ParamType::Bytes => "bytes".to_string(),
        ParamType::FixedBytes(n) => format!("bytes{}", n),
        ParamType::Int(n) => format!("int{}", n),
        ParamType::Uint(n) => format!("uint{}", n),
        ParamType::Bool => "bool".to_string(),
        ParamType::String => "string".to_string(),
        ParamType::Array(inner) => format!("{}[]", param_type_to_string(inner)),
        ParamType::FixedArray(inner, n) => format!("{}[{}]", param_type_to_string(inner), n),
        ParamType::Tuple(components) => {
            let inner: Vec<String> = components.iter().map(param_type_to_string).collect();
            format!("({})", inner.join(","))
        }
    }
}

/// JSON rendering of a decoded token. Integers become decimal strings so no
/// precision is lost.
pub fn token_to_json(token: &Token) -> Value {
    match token {
        Token::Address(a) => json!(to_checksum(a, None)),
        Token::Uint(n) => json!(n.to_string()),
        Token::Int(n) => json!(I256::from_raw(*n).to_string()),
        Token::Bool(b) => json!(b),
        Token::String(s) => json!(s),
        Token::Bytes(b) | Token::FixedBytes(b) => json!(format!("0x{}", hex::encode(b))),
        Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => {
            Value::Array(items.iter().map(token_to_json).collect())
        }
    }
}

/// Human-readable form of a call result: primitives verbatim, anything
/// else JSON-stringified.
pub fn display_tokens(tokens: &[Token]) -> String {
    match tokens {
        [single] => match token_to_json(single) {
            Value::String(s) => s,
            other => other.to_string(),
        },
        many => Value::Array(many.iter().map(token_to_json).collect()).to_string(),
    }
}

/// Extract a `uint` from the first output of a call.
pub fn first_uint(tokens: &[Token]) -> Result<U256, AbiError> {
    match tokens.first() {
        Some(Token::Uint(n)) => Ok(*n),
        other => Err(AbiError::Decode(format!("expected uint output, got {:?}", other))),
    }
}

/// Extract a string from the first output; `bytes32`-encoded names are
/// decoded by stripping trailing zero bytes.
pub fn first_string(tokens: &[Token]) -> Result<String, AbiError> {
    match tokens.first() {
        Some(Token::String(s)) => Ok(s.clone()),
        Some(Token::FixedBytes(b)) => {
            String::from_utf8(b.iter().copied().take_while(|c| *c != 0).collect())
                .map_err(|e| AbiError::Decode(e.to_string()))
        }
        other => Err(AbiError::Decode(format!("expected string output, got {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_erc20_transfer_with_known_selector() {
        let to = Address::from_low_u64_be(0xbeef);
        let data = encode_call(
            erc20::TRANSFER,
            &[Token::Address(to), Token::Uint(U256::from(10u64))],
        )
        .unwrap();
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(data.len(), 4 + 64);
    }

    #[test]
    fn approve_selector_matches_standard() {
        let data = encode_call(
            erc20::APPROVE,
            &[Token::Address(Address::zero()), Token::Uint(U256::MAX)],
        )
        .unwrap();
        assert_eq!(hex::encode(&data[..4]), "095ea7b3");
        assert_eq!(&data[36..68], &[0xffu8; 32]);
    }

    #[test]
    fn parses_human_readable_and_json_abis() {
        let human =
            parse_abi_input(r#"["function balanceOf(address) view returns (uint256)"]"#).unwrap();
        assert!(human.function("balanceOf").is_ok());

        let bare = parse_abi_input("function decimals() view returns (uint8)").unwrap();
        assert!(bare.function("decimals").is_ok());

        let json_abi = r#"[{"type":"function","name":"totalSupply","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}]"#;
        assert!(parse_abi_input(json_abi).unwrap().function("totalSupply").is_ok());

        assert!(parse_abi_input("[1, 2]").is_err());
    }

    #[test]
    fn coerces_loose_json_arguments() {
        let abi = parse_abi_input(
            r#"["function setAll(address a, uint256 b, bool c, bytes d, int256 e, uint256[] f)"]"#,
        )
        .unwrap();
        let func = find_function(&abi, "setAll", 6).unwrap();
        let tokens = coerce_tokens(
            func,
            &[
                json!("0x0000000000000000000000000000000000000001"),
                json!(42),
                json!("true"),
                json!("0xdeadbeef"),
                json!("-5"),
                json!(["1", "0x2"]),
            ],
        )
        .unwrap();
        assert_eq!(tokens[1], Token::Uint(U256::from(42u64)));
        assert_eq!(tokens[2], Token::Bool(true));
        assert_eq!(tokens[3], Token::Bytes(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(tokens[4], Token::Int(I256::from_dec_str("-5").unwrap().into_raw()));
        assert_eq!(
            tokens[5],
            Token::Array(vec![Token::Uint(U256::one()), Token::Uint(U256::from(2u64))])
        );
    }

    #[test]
    fn rejects_wrong_arity_and_bad_values() {
        let func = function(erc20::BALANCE_OF).unwrap();
        assert!(matches!(
            coerce_tokens(&func, &[]),
            Err(AbiError::ArgCount { expected: 1, got: 0 })
        ));
        assert!(matches!(
            coerce_tokens(&func, &[json!("not-an-address")]),
            Err(AbiError::InvalidArg { .. })
        ));
    }

    #[test]
    fn displays_primitives_plainly_and_composites_as_json() {
        assert_eq!(display_tokens(&[Token::Uint(U256::from(7u64))]), "7");
        assert_eq!(display_tokens(&[Token::Bool(true)]), "true");
        assert_eq!(
            display_tokens(&[Token::Uint(U256::one()), Token::String("x".into())]),
            r#"["1","x"]"#
        );
    }

    #[test]
    fn reads_bytes32_symbols() {
        let mut raw = b"MKR".to_vec();
        raw.resize(32, 0);
        assert_eq!(first_string(&[Token::FixedBytes(raw)]).unwrap(), "MKR");
    }
}
