// src/tools/registry.rs

use std::collections::HashMap;

use serde_json::{json, Value};
use thiserror::Error;

use super::args::ToolCall;
use crate::error::OperationError;

/// Turns raw JSON arguments into a typed [`ToolCall`].
pub type ArgParser = fn(Value) -> Result<ToolCall, serde_json::Error>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
}

/// Everything the dispatcher knows about one tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the arguments object.
    pub parameters: Value,
    /// Prepended to every failure message of this tool.
    pub error_prefix: &'static str,
    parser: ArgParser,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("error_prefix", &self.error_prefix)
            .finish()
    }
}

impl ToolDescriptor {
    pub fn new(
        name: &'static str,
        description: &'static str,
        parameters: Value,
        error_prefix: &'static str,
        parser: ArgParser,
    ) -> Self {
        Self {
            name,
            description,
            parameters,
            error_prefix,
            parser,
        }
    }

    /// Validate `args` (null is treated as `{}`) into a typed call.
    pub fn parse(&self, args: Value) -> Result<ToolCall, OperationError> {
        let args = if args.is_null() { json!({}) } else { args };
        (self.parser)(args)
            .map_err(|e| OperationError::Validation(format!("invalid arguments: {}", e)))
    }

    /// MCP `tools/list` entry.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.parameters,
        })
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tools: Vec<ToolDescriptor>,
}

impl RegistryBuilder {
    pub fn register(mut self, descriptor: ToolDescriptor) -> Result<Self, RegistryError> {
        if self.tools.iter().any(|t| t.name == descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name.to_string()));
        }
        self.tools.push(descriptor);
        Ok(self)
    }

    pub fn build(self) -> ToolRegistry {
        let index = self
            .tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name, i))
            .collect();
        ToolRegistry {
            tools: self.tools,
            index,
        }
    }
}

/// Immutable name -> descriptor table, in registration order.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.tools.iter().map(ToolDescriptor::to_json).collect())
    }

    /// Every tool the engine ships with.
    pub fn standard() -> Result<Self, RegistryError> {
        let mut builder = Self::builder();
        for descriptor in standard_tools() {
            builder = builder.register(descriptor)?;
        }
        Ok(builder.build())
    }
}

fn standard_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "get_address",
            "Get the smart account address for the current network.",
            json!({ "type": "object", "properties": {}, "additionalProperties": false }),
            "Error getting address",
            |_| Ok(ToolCall::GetAddress),
        ),
        ToolDescriptor::new(
            "get_balance",
            "Get native and ERC-20 balances of the smart account. Tokens may be given by address or symbol.",
            json!({
                "type": "object",
                "properties": {
                    "tokenAddresses": {"type": "array", "items": {"type": "string"}, "description": "ERC-20 contract addresses"},
                    "tokenSymbols": {"type": "array", "items": {"type": "string"}, "description": "Token symbols such as USDC or WETH"}
                }
            }),
            "Error getting balances",
            |v| Ok(ToolCall::GetBalance(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "get_token_details",
            "Get name, symbol, decimals and total supply of an ERC-20 token.",
            json!({
                "type": "object",
                "properties": {
                    "tokenAddress": {"type": "string", "description": "Token contract address or symbol"}
                },
                "required": ["tokenAddress"]
            }),
            "Error getting token details",
            |v| Ok(ToolCall::GetTokenDetails(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "approve_token",
            "Approve a spender to move ERC-20 tokens from the smart account.",
            json!({
                "type": "object",
                "properties": {
                    "tokenAddress": {"type": "string", "description": "Token contract address or symbol"},
                    "spender": {"type": "string", "description": "Address allowed to spend"},
                    "amount": {"type": "string", "description": "Human-readable amount, e.g. '1.5'"},
                    "approveMax": {"type": "boolean", "description": "Approve the maximum uint256 amount"}
                },
                "required": ["tokenAddress", "spender"]
            }),
            "Error approving token",
            |v| Ok(ToolCall::ApproveToken(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "read_contract",
            "Call a view function on a contract and return the decoded result.",
            json!({
                "type": "object",
                "properties": {
                    "contractAddress": {"type": "string"},
                    "abiString": {"type": "string", "description": "JSON ABI or JSON list of human-readable signatures"},
                    "functionName": {"type": "string"},
                    "argsString": {"type": "string", "description": "JSON array of arguments"}
                },
                "required": ["contractAddress", "abiString", "functionName"]
            }),
            "Error in read_contract",
            |v| Ok(ToolCall::ReadContract(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "encode_function_data",
            "ABI-encode a function call into calldata.",
            json!({
                "type": "object",
                "properties": {
                    "abiString": {"type": "string"},
                    "functionName": {"type": "string"},
                    "argsString": {"type": "string", "description": "JSON array of arguments"}
                },
                "required": ["abiString", "functionName"]
            }),
            "Error: Failed to encode function data",
            |v| Ok(ToolCall::EncodeFunctionData(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "send_transaction",
            "Send a raw call from the smart account. Gas is sponsored.",
            json!({
                "type": "object",
                "properties": {
                    "to": {"type": "string"},
                    "data": {"type": "string", "description": "0x-prefixed calldata"},
                    "value": {"type": "string", "description": "Value in wei"}
                },
                "required": ["to"]
            }),
            "Error: Failed to send transaction",
            |v| Ok(ToolCall::SendTransaction(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "batch_transactions",
            "Send several calls atomically in a single user operation.",
            json!({
                "type": "object",
                "properties": {
                    "transactions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "to": {"type": "string"},
                                "data": {"type": "string"},
                                "value": {"type": "string"}
                            },
                            "required": ["to"]
                        }
                    }
                },
                "required": ["transactions"]
            }),
            "Error: Failed to send batch transactions",
            |v| Ok(ToolCall::BatchTransactions(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "smart_transfer",
            "Transfer the native asset or an ERC-20 token from the smart account.",
            json!({
                "type": "object",
                "properties": {
                    "amount": {"type": "string", "description": "Human-readable amount"},
                    "tokenAddress": {"type": "string", "description": "Token address or symbol; omit or 'eth' for the native asset"},
                    "destination": {"type": "string", "description": "Recipient address"}
                },
                "required": ["amount", "destination"]
            }),
            "Error transferring the asset",
            |v| Ok(ToolCall::SmartTransfer(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "get_transaction_status",
            "Check whether a transaction has been confirmed.",
            json!({
                "type": "object",
                "properties": {
                    "transactionHash": {"type": "string"}
                },
                "required": ["transactionHash"]
            }),
            "Error checking transaction status",
            |v| Ok(ToolCall::GetTransactionStatus(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "smart_swap",
            "Swap tokens through the aggregator, approving the router first when needed.",
            json!({
                "type": "object",
                "properties": {
                    "tokenIn": {"type": "string", "description": "Input token address"},
                    "tokenOut": {"type": "string", "description": "Output token address"},
                    "tokenInSymbol": {"type": "string"},
                    "tokenOutSymbol": {"type": "string"},
                    "amount": {"type": "string", "description": "Human-readable input amount"},
                    "slippage": {"type": "string", "description": "Slippage percent or 'auto'"},
                    "wait": {"type": "boolean", "description": "Wait for confirmation (default true)"},
                    "approveMax": {"type": "boolean", "description": "Approve the maximum amount when an approval is needed"}
                },
                "required": ["amount"]
            }),
            "Error creating swap order",
            |v| Ok(ToolCall::SmartSwap(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "mint_nft",
            "Mint an ERC-721 token.",
            json!({
                "type": "object",
                "properties": {
                    "contractAddress": {"type": "string"},
                    "to": {"type": "string", "description": "Recipient; defaults to the smart account"},
                    "tokenId": {"type": "string", "description": "Defaults to 1"}
                },
                "required": ["contractAddress"]
            }),
            "Error minting NFT",
            |v| Ok(ToolCall::MintNft(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "transfer_nft",
            "Transfer an ERC-721 token with transferFrom.",
            json!({
                "type": "object",
                "properties": {
                    "contractAddress": {"type": "string"},
                    "from": {"type": "string", "description": "Defaults to the smart account"},
                    "to": {"type": "string"},
                    "tokenId": {"type": "string"}
                },
                "required": ["contractAddress", "to", "tokenId"]
            }),
            "Error transferring NFT",
            |v| Ok(ToolCall::TransferNft(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "format_units",
            "Convert an integer amount in smallest units to a decimal string.",
            json!({
                "type": "object",
                "properties": {
                    "value": {"type": "string"},
                    "decimals": {"type": "number", "description": "Defaults to 18"}
                },
                "required": ["value"]
            }),
            "Error in format_units",
            |v| Ok(ToolCall::FormatUnits(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "parse_units",
            "Convert a decimal string to an integer amount in smallest units.",
            json!({
                "type": "object",
                "properties": {
                    "value": {"type": "string"},
                    "decimals": {"type": "number", "description": "Defaults to 18"}
                },
                "required": ["value"]
            }),
            "Error in parse_units",
            |v| Ok(ToolCall::ParseUnits(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "to_hex",
            "Convert a number, boolean or string to hex.",
            json!({
                "type": "object",
                "properties": {
                    "value": {"type": ["string", "number", "boolean"]}
                },
                "required": ["value"]
            }),
            "Error in to_hex",
            |v| Ok(ToolCall::ToHex(serde_json::from_value(v)?)),
        ),
        ToolDescriptor::new(
            "from_hex",
            "Convert hex to a string, number, bigint, boolean or bytes.",
            json!({
                "type": "object",
                "properties": {
                    "hex": {"type": "string"},
                    "to": {"type": "string", "enum": ["string", "number", "bigint", "boolean", "bytes"]}
                },
                "required": ["hex"]
            }),
            "Error in from_hex",
            |v| Ok(ToolCall::FromHex(serde_json::from_value(v)?)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_lists_every_tool_once() {
        let registry = ToolRegistry::standard().unwrap();
        assert_eq!(registry.len(), 17);
        for name in ["get_balance", "smart_swap", "batch_transactions", "from_hex"] {
            assert!(registry.get(name).is_some(), "{} missing", name);
        }
        assert!(registry.get("create_wallet").is_none());
        assert_eq!(registry.names()[0], "get_address");
        assert_eq!(registry.to_json().as_array().unwrap().len(), 17);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let tool = || {
            ToolDescriptor::new("get_address", "", json!({}), "Error", |_| Ok(ToolCall::GetAddress))
        };
        let result = ToolRegistry::builder().register(tool()).unwrap().register(tool());
        assert_eq!(result.unwrap_err(), RegistryError::DuplicateTool("get_address".into()));
    }

    #[test]
    fn parse_reports_missing_fields_as_validation_errors() {
        let registry = ToolRegistry::standard().unwrap();
        let transfer = registry.get("smart_transfer").unwrap();
        match transfer.parse(json!({ "amount": "1" })) {
            Err(OperationError::Validation(msg)) => assert!(msg.contains("destination"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            registry.get("get_address").unwrap().parse(Value::Null).unwrap(),
            ToolCall::GetAddress
        );
    }

    #[test]
    fn descriptors_serialize_for_tools_list() {
        let registry = ToolRegistry::standard().unwrap();
        let entry = registry.get("transfer_nft").unwrap().to_json();
        assert_eq!(entry["name"], "transfer_nft");
        assert_eq!(entry["inputSchema"]["required"], json!(["contractAddress", "to", "tokenId"]));
    }
}
