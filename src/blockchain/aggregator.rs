//! Swap quote client.
//!
//! The aggregator returns a ready-made transaction (`to`, `data`, `value`)
//! that the smart account executes verbatim; the engine never builds swap
//! calldata itself.

use std::str::FromStr;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::smart_account::Call;
use crate::error::OperationError;

/// Parameters for one quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub chain_id: u64,
    pub token_in: Address,
    pub token_out: Address,
    /// Input amount in smallest units of `token_in`.
    pub amount: U256,
    pub recipient: Address,
    /// Aggregator slippage setting; `None` lets the aggregator pick.
    pub slippage: Option<String>,
}

/// Executable quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub call: Call,
    /// Address that must be allowed to pull `token_in`.
    pub spender: Address,
}

#[async_trait]
pub trait SwapAggregator: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote, OperationError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    tx: Option<QuoteTx>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteTx {
    to: Option<String>,
    data: Option<String>,
    value: Option<serde_json::Value>,
    allowance_target: Option<String>,
}

fn quote_failure(reason: impl Into<String>) -> OperationError {
    OperationError::QuoteFailure(reason.into())
}

fn parse_value(value: Option<&serde_json::Value>) -> Result<U256, OperationError> {
    let parsed = match value {
        None | Some(serde_json::Value::Null) => return Ok(U256::zero()),
        Some(serde_json::Value::String(s)) if s.is_empty() => return Ok(U256::zero()),
        Some(serde_json::Value::String(s)) => match s.strip_prefix("0x") {
            Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
            None => U256::from_dec_str(s).ok(),
        },
        Some(serde_json::Value::Number(n)) => n.as_u64().map(U256::from),
        Some(_) => None,
    };
    parsed.ok_or_else(|| quote_failure("quote carries an invalid transaction value"))
}

impl QuoteTx {
    fn into_quote(self) -> Result<SwapQuote, OperationError> {
        let to = self
            .to
            .as_deref()
            .and_then(|s| Address::from_str(s).ok())
            .ok_or_else(|| quote_failure("Missing transaction data in swap order"))?;
        let data = self
            .data
            .as_deref()
            .and_then(|s| hex::decode(s.trim_start_matches("0x")).ok())
            .ok_or_else(|| quote_failure("Missing transaction data in swap order"))?;
        let value = parse_value(self.value.as_ref())?;
        let spender = self
            .allowance_target
            .as_deref()
            .and_then(|s| Address::from_str(s).ok())
            .unwrap_or(to);

        Ok(SwapQuote {
            call: Call {
                to,
                data: Bytes::from(data),
                value,
            },
            spender,
        })
    }
}

/// deBridge DLN single-chain transaction API.
#[derive(Debug, Clone)]
pub struct DlnAggregator {
    http: Client,
    base_url: String,
}

impl DlnAggregator {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn quote_url(&self, request: &QuoteRequest) -> Result<Url, OperationError> {
        let slippage = request.slippage.clone().unwrap_or_else(|| "auto".to_string());
        Url::parse_with_params(
            &format!("{}/transaction", self.base_url),
            &[
                ("chainId", request.chain_id.to_string()),
                ("tokenIn", format!("{:?}", request.token_in)),
                ("tokenInAmount", request.amount.to_string()),
                ("tokenOut", format!("{:?}", request.token_out)),
                ("tokenOutRecipient", format!("{:?}", request.recipient)),
                ("slippage", slippage),
                ("affiliateFeePercent", "0".to_string()),
            ],
        )
        .map_err(|e| quote_failure(format!("invalid aggregator URL: {}", e)))
    }
}

#[async_trait]
impl SwapAggregator for DlnAggregator {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote, OperationError> {
        let url = self.quote_url(request)?;
        debug!("Requesting swap quote: {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| quote_failure(format!("aggregator unreachable: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| quote_failure(format!("failed to read aggregator response: {}", e)))?;

        let parsed: Option<QuoteResponse> = serde_json::from_str(&body).ok();
        let error_message = parsed.as_ref().and_then(|p| p.error_message.clone());

        if !status.is_success() || error_message.is_some() {
            let reason = error_message
                .unwrap_or_else(|| format!("Bad request (HTTP {})", status.as_u16()));
            warn!("Swap quote rejected: {}", reason);
            return Err(quote_failure(reason));
        }

        parsed
            .and_then(|p| p.tx)
            .ok_or_else(|| quote_failure("Missing transaction data in swap order"))?
            .into_quote()
    }
}
