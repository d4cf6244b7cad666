//! Typed argument payloads, one per tool.
//!
//! Arguments arrive as loose JSON produced by an LLM, so amounts may be
//! strings or numbers and flags may be `"true"`. The deserializers below
//! accept both and everything is validated here, before any handler runs.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    GetAddress,
    GetBalance(BalanceArgs),
    GetTokenDetails(TokenDetailsArgs),
    ApproveToken(ApproveArgs),
    ReadContract(ReadContractArgs),
    EncodeFunctionData(EncodeArgs),
    SendTransaction(RawCallArgs),
    BatchTransactions(BatchArgs),
    SmartTransfer(TransferArgs),
    GetTransactionStatus(StatusArgs),
    SmartSwap(SwapArgs),
    MintNft(MintNftArgs),
    TransferNft(TransferNftArgs),
    FormatUnits(UnitsArgs),
    ParseUnits(UnitsArgs),
    ToHex(ToHexArgs),
    FromHex(FromHexArgs),
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected a string or number, got {}", other))),
    }
}

fn opt_loose_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("expected a string or number, got {}", other))),
    }
}

fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(de::Error::custom(format!("expected a boolean, got {}", other))),
    }
}

fn loose_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                de::Error::custom(format!("expected a small non-negative integer, got {}", n))
            }),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| {
                de::Error::custom(format!("expected a small non-negative integer, got '{}'", s))
            }),
        other => Err(de::Error::custom(format!("expected an integer, got {}", other))),
    }
}

// A list of strings, also accepting a single string or a comma separated one.
fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let items = match Value::deserialize(deserializer)? {
        Value::Null => vec![],
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(values) => values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                other => Err(de::Error::custom(format!("expected a string, got {}", other))),
            })
            .collect::<Result<Vec<String>, D::Error>>()?,
        other => {
            return Err(de::Error::custom(format!(
                "expected a list of strings, got {}",
                other
            )))
        }
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn default_true() -> bool {
    true
}

fn default_decimals() -> u32 {
    18
}

fn default_hex_target() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceArgs {
    #[serde(default, deserialize_with = "string_list")]
    pub token_addresses: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub token_symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetailsArgs {
    #[serde(alias = "token", alias = "address")]
    pub token_address: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveArgs {
    #[serde(alias = "token")]
    pub token_address: String,
    pub spender: String,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub approve_max: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadContractArgs {
    #[serde(alias = "address")]
    pub contract_address: String,
    #[serde(alias = "abi")]
    pub abi_string: String,
    pub function_name: String,
    #[serde(default, alias = "args")]
    pub args_string: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeArgs {
    #[serde(alias = "abi")]
    pub abi_string: String,
    pub function_name: String,
    #[serde(default, alias = "args")]
    pub args_string: Option<Value>,
}

/// One raw call: destination, optional calldata, optional wei value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCallArgs {
    pub to: String,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub data: Option<String>,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchArgs {
    #[serde(default)]
    pub transactions: Vec<RawCallArgs>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferArgs {
    #[serde(deserialize_with = "loose_string")]
    pub amount: String,
    #[serde(default, alias = "tokenSymbol", alias = "token", deserialize_with = "opt_loose_string")]
    pub token_address: Option<String>,
    #[serde(alias = "recipient", alias = "to")]
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusArgs {
    #[serde(alias = "txHash", alias = "hash")]
    pub transaction_hash: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapArgs {
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub token_in: Option<String>,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub token_out: Option<String>,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub token_in_symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub token_out_symbol: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub amount: String,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub slippage: Option<String>,
    #[serde(default = "default_true", deserialize_with = "loose_bool")]
    pub wait: bool,
    #[serde(default, deserialize_with = "loose_bool")]
    pub approve_max: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintNftArgs {
    #[serde(alias = "contract")]
    pub contract_address: String,
    #[serde(default, alias = "recipient", deserialize_with = "opt_loose_string")]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub token_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferNftArgs {
    #[serde(alias = "contract")]
    pub contract_address: String,
    #[serde(default, deserialize_with = "opt_loose_string")]
    pub from: Option<String>,
    pub to: String,
    #[serde(deserialize_with = "loose_string")]
    pub token_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitsArgs {
    #[serde(deserialize_with = "loose_string")]
    pub value: String,
    #[serde(default = "default_decimals", deserialize_with = "loose_u32")]
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToHexArgs {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromHexArgs {
    pub hex: String,
    #[serde(default = "default_hex_target")]
    pub to: String,
}

/// Positional contract arguments given either as a JSON array or as a
/// string holding one.
pub fn contract_args(raw: Option<&Value>) -> Result<Vec<Value>, String> {
    match raw {
        None | Some(Value::Null) => Ok(vec![]),
        Some(Value::Array(values)) => Ok(values.clone()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(vec![]),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(values)) => Ok(values),
            Ok(single) => Ok(vec![single]),
            Err(e) => Err(format!("argsString is not valid JSON: {}", e)),
        },
        Some(single) => Ok(vec![single.clone()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn swap_args_accept_loose_types_and_defaults() {
        let args: SwapArgs = serde_json::from_value(json!({
            "tokenInSymbol": "USDC",
            "tokenOutSymbol": "WETH",
            "amount": 100,
            "approveMax": "true"
        }))
        .unwrap();
        assert_eq!(args.amount, "100");
        assert!(args.wait);
        assert!(args.approve_max);
        assert!(args.token_in.is_none());

        let err = serde_json::from_value::<SwapArgs>(json!({ "tokenIn": "0x1" })).unwrap_err();
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn balance_lists_accept_arrays_and_strings() {
        let args: BalanceArgs = serde_json::from_value(json!({
            "tokenAddresses": ["0xabc", " "],
            "tokenSymbols": "USDC, weth"
        }))
        .unwrap();
        assert_eq!(args.token_addresses, vec!["0xabc"]);
        assert_eq!(args.token_symbols, vec!["USDC", "weth"]);
        assert_eq!(
            serde_json::from_value::<BalanceArgs>(json!({})).unwrap(),
            BalanceArgs::default()
        );
        assert!(serde_json::from_value::<BalanceArgs>(json!({ "tokenSymbols": [1] })).is_err());
    }

    #[test]
    fn transfer_accepts_aliases() {
        let args: TransferArgs = serde_json::from_value(json!({
            "amount": "0.5",
            "tokenSymbol": "USDC",
            "recipient": "0x0000000000000000000000000000000000000001"
        }))
        .unwrap();
        assert_eq!(args.token_address.as_deref(), Some("USDC"));
        assert!(args.destination.ends_with('1'));
    }

    #[test]
    fn units_decimals_default_and_coerce() {
        let args: UnitsArgs = serde_json::from_value(json!({ "value": "1000" })).unwrap();
        assert_eq!(args.decimals, 18);
        let args: UnitsArgs =
            serde_json::from_value(json!({ "value": 5, "decimals": "6" })).unwrap();
        assert_eq!((args.value.as_str(), args.decimals), ("5", 6));
        assert!(
            serde_json::from_value::<UnitsArgs>(json!({ "value": "1", "decimals": -1 })).is_err()
        );
    }

    #[test]
    fn contract_args_parse_strings_and_arrays() {
        assert_eq!(contract_args(None).unwrap(), Vec::<Value>::new());
        assert_eq!(
            contract_args(Some(&json!("[\"0x1\", 5]"))).unwrap(),
            vec![json!("0x1"), json!(5)]
        );
        assert_eq!(contract_args(Some(&json!(["a"]))).unwrap(), vec![json!("a")]);
        assert_eq!(contract_args(Some(&json!("7"))).unwrap(), vec![json!(7)]);
        assert!(contract_args(Some(&json!("[unclosed"))).is_err());
    }
}
