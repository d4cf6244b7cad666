//! Tool dispatch.
//!
//! The dispatcher validates the per-call execution context once, builds a
//! [`Session`] holding the resolved network, account and collaborators, and
//! runs the typed handler. Handler failures stay typed through
//! [`Dispatcher::execute`]; [`Dispatcher::dispatch`] renders them as
//! `"<prefix>: <reason>"` text for conversational clients.

use std::str::FromStr;
use std::sync::Arc;

use ethers::abi::Token;
use ethers::types::{Address, U256};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};

use super::args::ToolCall;
use super::handlers;
use super::registry::ToolRegistry;
use crate::blockchain::{
    abi,
    aggregator::SwapAggregator,
    amount::{MAX_DECIMALS, NATIVE_DECIMALS},
    backend::Backend,
    chain::Network,
    client::ChainClient,
    smart_account::{ConfirmationPolicy, SmartAccount},
    token_registry::{is_native, TokenRegistry},
};
use crate::error::{DispatchError, OperationError};

/// Who is acting and where. Supplied with every call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    #[serde(default)]
    pub signing_key: Option<SecretString>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub smart_account_address: Option<String>,
}

impl ExecutionContext {
    pub fn new(
        signing_key: impl Into<String>,
        network: impl Into<String>,
        smart_account_address: impl Into<String>,
    ) -> Self {
        Self {
            signing_key: Some(SecretString::new(signing_key.into())),
            network: Some(network.into()),
            smart_account_address: Some(smart_account_address.into()),
        }
    }

    /// Fill fields missing here from `fallback`.
    pub fn or(self, fallback: &ExecutionContext) -> Self {
        Self {
            signing_key: self.signing_key.or_else(|| fallback.signing_key.clone()),
            network: self.network.or_else(|| fallback.network.clone()),
            smart_account_address: self
                .smart_account_address
                .or_else(|| fallback.smart_account_address.clone()),
        }
    }

    fn validate(&self) -> Result<(&'static Network, Address, &SecretString), DispatchError> {
        let invalid = |msg: String| DispatchError::InvalidContext(msg);

        let network_name = self
            .network
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| invalid("network is required".to_string()))?;
        let network = Network::lookup(network_name)
            .ok_or_else(|| invalid(format!("unsupported network '{}'", network_name)))?;

        let signing_key = self
            .signing_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or_else(|| invalid("signing key is required".to_string()))?;

        let account = self
            .smart_account_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| invalid("smart account address is required".to_string()))?;
        let account = Address::from_str(account)
            .map_err(|_| invalid(format!("'{}' is not a valid smart account address", account)))?;

        Ok((network, account, signing_key))
    }
}

/// Per-call view handed to handlers.
pub struct Session<'a> {
    pub network: &'static Network,
    pub account: Address,
    pub chain: Arc<dyn ChainClient>,
    pub tokens: &'a TokenRegistry,
    pub aggregator: &'a dyn SwapAggregator,
    pub confirmation: ConfirmationPolicy,
    backend: &'a dyn Backend,
    signing_key: &'a SecretString,
}

impl<'a> Session<'a> {
    /// Signing account for this call. Built lazily so read-only tools never
    /// touch the signing key.
    pub fn smart_account(&self) -> Result<Arc<dyn SmartAccount>, OperationError> {
        self.backend.smart_account(self.network, self.signing_key, self.account)
    }

    /// Resolve a token reference: a 0x address, or a symbol known for this
    /// network.
    pub fn resolve_token(&self, reference: &str) -> Result<Address, OperationError> {
        let reference = reference.trim();
        if reference.starts_with("0x") || reference.starts_with("0X") {
            return Address::from_str(reference)
                .map_err(|_| {
                    OperationError::Validation(format!(
                        "'{}' is not a valid token address",
                        reference
                    ))
                });
        }
        self.tokens.resolve(self.network.chain_id, reference).ok_or_else(|| {
            OperationError::Validation(format!(
                "unknown token '{}' on {}",
                reference, self.network.name
            ))
        })
    }

    /// Call a read-only function given as a human-readable signature.
    pub async fn read(
        &self,
        contract: Address,
        signature: &str,
        args: &[Token],
    ) -> Result<Vec<Token>, OperationError> {
        let function = abi::function(signature)?;
        self.chain.read_contract(contract, &function, args).await
    }

    /// Live `decimals()` of an ERC-20; 18 for the native asset.
    pub async fn token_decimals(&self, token: Address) -> Result<u32, OperationError> {
        if is_native(&token) {
            return Ok(NATIVE_DECIMALS);
        }
        let raw = abi::first_uint(&self.read(token, abi::erc20::DECIMALS, &[]).await?)?;
        checked_decimals(token, raw)
    }
}

/// Narrow a raw `decimals()` value, rejecting anything the codec cannot handle.
pub(crate) fn checked_decimals(token: Address, raw: U256) -> Result<u32, OperationError> {
    if raw > U256::from(MAX_DECIMALS) {
        return Err(OperationError::OnChainRead(format!(
            "token {:?} reports unsupported decimals {}",
            token, raw
        )));
    }
    Ok(raw.as_u32())
}

pub struct Dispatcher {
    registry: ToolRegistry,
    backend: Arc<dyn Backend>,
    aggregator: Arc<dyn SwapAggregator>,
    tokens: TokenRegistry,
    confirmation: ConfirmationPolicy,
}

impl Dispatcher {
    pub fn new(
        registry: ToolRegistry,
        backend: Arc<dyn Backend>,
        aggregator: Arc<dyn SwapAggregator>,
    ) -> Self {
        Self {
            registry,
            backend,
            aggregator,
            tokens: TokenRegistry::builtin(),
            confirmation: ConfirmationPolicy::default(),
        }
    }

    pub fn with_tokens(mut self, tokens: TokenRegistry) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.confirmation = policy;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run `name` with `args`, keeping the failure kind.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        context: &ExecutionContext,
    ) -> Result<String, DispatchError> {
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;
        let (network, account, signing_key) = context.validate()?;
        let chain = self
            .backend
            .chain_client(network)
            .map_err(|e| {
                DispatchError::InvalidContext(format!("no client for {}: {}", network.name, e))
            })?;

        let session = Session {
            network,
            account,
            chain,
            tokens: &self.tokens,
            aggregator: self.aggregator.as_ref(),
            confirmation: self.confirmation,
            backend: self.backend.as_ref(),
            signing_key,
        };

        info!("Executing tool {} on {} for {:?}", name, network.name, account);
        let result = match descriptor.parse(args) {
            Ok(call) => call.execute(&session).await,
            Err(e) => Err(e),
        };

        result.map_err(|source| {
            error!("Tool {} failed: {}", name, source);
            DispatchError::Operation {
                tool: name.to_string(),
                prefix: descriptor.error_prefix,
                source,
            }
        })
    }

    /// Like [`execute`](Self::execute), but a handler failure becomes the
    /// prefixed message so a conversation can continue.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Value,
        context: &ExecutionContext,
    ) -> Result<String, DispatchError> {
        match self.execute(name, args, context).await {
            Err(err @ DispatchError::Operation { .. }) => {
                debug!("Rendering {} failure as text", name);
                Ok(err.to_string())
            }
            other => other,
        }
    }
}

impl ToolCall {
    pub async fn execute(self, session: &Session<'_>) -> Result<String, OperationError> {
        match self {
            ToolCall::GetAddress => handlers::account::get_address(session).await,
            ToolCall::GetBalance(args) => handlers::account::get_balance(args, session).await,
            ToolCall::GetTokenDetails(args) => {
                handlers::token::get_token_details(args, session).await
            }
            ToolCall::ApproveToken(args) => handlers::token::approve_token(args, session).await,
            ToolCall::ReadContract(args) => handlers::contract::read_contract(args, session).await,
            ToolCall::EncodeFunctionData(args) => handlers::contract::encode_function_data(args),
            ToolCall::SendTransaction(args) => {
                handlers::transaction::send_transaction(args, session).await
            }
            ToolCall::BatchTransactions(args) => {
                handlers::transaction::batch_transactions(args, session).await
            }
            ToolCall::SmartTransfer(args) => {
                handlers::transfer::smart_transfer(args, session).await
            }
            ToolCall::GetTransactionStatus(args) => {
                handlers::transaction::get_transaction_status(args, session).await
            }
            ToolCall::SmartSwap(args) => handlers::swap::smart_swap(args, session).await,
            ToolCall::MintNft(args) => handlers::nft::mint_nft(args, session).await,
            ToolCall::TransferNft(args) => handlers::nft::transfer_nft(args, session).await,
            ToolCall::FormatUnits(args) => handlers::units::format_units(args),
            ToolCall::ParseUnits(args) => handlers::units::parse_units(args),
            ToolCall::ToHex(args) => handlers::units::to_hex(args),
            ToolCall::FromHex(args) => handlers::units::from_hex(args),
        }
    }
}
