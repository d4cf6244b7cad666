// src/blockchain/bundler.rs

use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::{
    abi::{self as ethabi, Token},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, H256, U256},
    utils::keccak256,
};
use ethers_providers::{Http, Middleware, Provider};
use ethers_signers::{LocalWallet, Signer};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::abi;
use super::nonce_manager::NonceManager;
use super::smart_account::{Call, ConfirmationPolicy, SmartAccount, Submitted};
use crate::error::OperationError;

const GET_NONCE: &str = "function getNonce(address sender, uint192 key) view returns (uint256)";
const EXECUTE: &str = "function execute(address dest, uint256 value, bytes func)";
const EXECUTE_BATCH: &str = "function executeBatch(address[] dest, uint256[] value, bytes[] func)";

// Placeholder signature with the right shape for gas estimation.
const DUMMY_SIGNATURE: &str = "fffffffffffffffffffffffffffffff000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";

/// ERC-4337 v0.6 user operation, serialized the way bundlers expect it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// `keccak256(abi.encode(keccak256(pack(op)), entryPoint, chainId))`
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> H256 {
        let packed = ethabi::encode(&[
            Token::Address(self.sender),
            Token::Uint(self.nonce),
            Token::FixedBytes(keccak256(&self.init_code).to_vec()),
            Token::FixedBytes(keccak256(&self.call_data).to_vec()),
            Token::Uint(self.call_gas_limit),
            Token::Uint(self.verification_gas_limit),
            Token::Uint(self.pre_verification_gas),
            Token::Uint(self.max_fee_per_gas),
            Token::Uint(self.max_priority_fee_per_gas),
            Token::FixedBytes(keccak256(&self.paymaster_and_data).to_vec()),
        ]);
        let outer = ethabi::encode(&[
            Token::FixedBytes(keccak256(packed).to_vec()),
            Token::Address(entry_point),
            Token::Uint(U256::from(chain_id)),
        ]);
        H256::from(keccak256(outer))
    }
}

/// Encode the account's calldata: `execute` for one call, `executeBatch`
/// otherwise.
pub fn encode_account_calls(calls: &[Call]) -> Result<Bytes, OperationError> {
    match calls {
        [] => Err(OperationError::Validation("no calls to submit".to_string())),
        [call] => Ok(abi::encode_call(
            EXECUTE,
            &[
                Token::Address(call.to),
                Token::Uint(call.value),
                Token::Bytes(call.data.to_vec()),
            ],
        )?),
        many => Ok(abi::encode_call(
            EXECUTE_BATCH,
            &[
                Token::Array(many.iter().map(|c| Token::Address(c.to)).collect()),
                Token::Array(many.iter().map(|c| Token::Uint(c.value)).collect()),
                Token::Array(many.iter().map(|c| Token::Bytes(c.data.to_vec())).collect()),
            ],
        )?),
    }
}

/// Wrap a raw ECDSA signature for accounts validated by a module.
pub fn wrap_signature(signature: Vec<u8>, validation_module: Option<Address>) -> Bytes {
    match validation_module {
        Some(module) => Bytes::from(ethabi::encode(&[
            Token::Bytes(signature),
            Token::Address(module),
        ])),
        None => Bytes::from(signature),
    }
}

fn parse_quantity(value: &Value) -> Option<U256> {
    match value {
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
            None => U256::from_dec_str(s).ok(),
        },
        Value::Number(n) => n.as_u64().map(U256::from),
        _ => None,
    }
}

fn submission(context: &str) -> impl Fn(String) -> OperationError + '_ {
    move |reason| OperationError::Submission(format!("{}: {}", context, reason))
}

/// Settings shared by every smart account on one network.
#[derive(Debug, Clone)]
pub struct BundlerEndpoint {
    pub chain_id: u64,
    pub bundler_url: String,
    pub paymaster_url: Option<String>,
    pub entry_point: Address,
    pub validation_module: Option<Address>,
}

/// Smart account that submits user operations through a bundler, with
/// optional paymaster sponsorship.
pub struct BundlerSmartAccount {
    http: Client,
    provider: Arc<Provider<Http>>,
    endpoint: BundlerEndpoint,
    wallet: LocalWallet,
    account: Address,
    nonces: NonceManager,
    policy: ConfirmationPolicy,
}

impl BundlerSmartAccount {
    pub fn new(
        http: Client,
        provider: Arc<Provider<Http>>,
        endpoint: BundlerEndpoint,
        wallet: LocalWallet,
        account: Address,
        nonces: NonceManager,
        policy: ConfirmationPolicy,
    ) -> Self {
        Self {
            http,
            provider,
            endpoint,
            wallet,
            account,
            nonces,
            policy,
        }
    }

    async fn rpc(&self, url: &str, method: &str, params: Value) -> Result<Value, String> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response: Value = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("{} request failed: {}", method, e))?
            .json()
            .await
            .map_err(|e| format!("{} returned invalid JSON: {}", method, e))?;

        if let Some(error) = response.get("error") {
            return Err(format!("{} error: {}", method, error));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn entry_point_nonce(&self) -> Result<U256, OperationError> {
        let get_nonce = abi::function(GET_NONCE)?;
        let data = abi::encode_function(
            &get_nonce,
            &[Token::Address(self.account), Token::Uint(U256::zero())],
        )?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.endpoint.entry_point)
            .data(data)
            .into();
        let raw = self
            .provider
            .call(&tx, None)
            .await
            .map_err(|e| OperationError::OnChainRead(format!("EntryPoint.getNonce: {}", e)))?;
        let decoded = get_nonce
            .decode_output(&raw)
            .map_err(|e| OperationError::OnChainRead(format!("EntryPoint.getNonce: {}", e)))?;
        Ok(abi::first_uint(&decoded)?)
    }

    async fn estimate_gas(&self, op: &mut UserOperation) -> Result<(), OperationError> {
        let estimate = self
            .rpc(
                &self.endpoint.bundler_url,
                "eth_estimateUserOperationGas",
                json!([op, self.endpoint.entry_point]),
            )
            .await
            .map_err(submission("gas estimation"))?;

        let field = |name: &str| {
            parse_quantity(&estimate[name])
                .ok_or_else(|| {
                    OperationError::Submission(format!("gas estimation: missing {}", name))
                })
        };
        op.call_gas_limit = field("callGasLimit")?;
        op.verification_gas_limit = field("verificationGasLimit")?;
        op.pre_verification_gas = field("preVerificationGas")?;
        Ok(())
    }

    async fn sponsor(&self, op: &mut UserOperation) -> Result<(), OperationError> {
        let Some(paymaster_url) = self.endpoint.paymaster_url.as_deref() else {
            return Ok(());
        };
        let sponsored = self
            .rpc(
                paymaster_url,
                "pm_sponsorUserOperation",
                json!([op, { "mode": "SPONSORED" }]),
            )
            .await
            .map_err(submission("paymaster sponsorship"))?;

        let paymaster_and_data = sponsored["paymasterAndData"]
            .as_str()
            .and_then(|s| hex::decode(s.trim_start_matches("0x")).ok())
            .ok_or_else(|| {
                OperationError::Submission("paymaster returned no paymasterAndData".to_string())
            })?;
        op.paymaster_and_data = Bytes::from(paymaster_and_data);

        // Sponsors may re-price the limits they are willing to cover.
        if let Some(v) = parse_quantity(&sponsored["callGasLimit"]) {
            op.call_gas_limit = v;
        }
        if let Some(v) = parse_quantity(&sponsored["verificationGasLimit"]) {
            op.verification_gas_limit = v;
        }
        if let Some(v) = parse_quantity(&sponsored["preVerificationGas"]) {
            op.pre_verification_gas = v;
        }
        Ok(())
    }

    async fn sign(&self, op: &mut UserOperation) -> Result<H256, OperationError> {
        let hash = op.hash(self.endpoint.entry_point, self.endpoint.chain_id);
        let signature = self
            .wallet
            .sign_message(hash.as_bytes())
            .await
            .map_err(|e| OperationError::Submission(format!("signing failed: {}", e)))?;
        op.signature = wrap_signature(signature.to_vec(), self.endpoint.validation_module);
        Ok(hash)
    }

    async fn wait_for_inclusion(&self, user_op_hash: H256) -> Option<H256> {
        let poll = async {
            loop {
                match self
                    .rpc(
                        &self.endpoint.bundler_url,
                        "eth_getUserOperationReceipt",
                        json!([format!("{:?}", user_op_hash)]),
                    )
                    .await
                {
                    Ok(receipt) => {
                        let tx_hash = receipt["receipt"]["transactionHash"]
                            .as_str()
                            .and_then(|s| s.parse::<H256>().ok());
                        if tx_hash.is_some() {
                            return tx_hash;
                        }
                    }
                    Err(e) => warn!("User operation receipt lookup failed: {}", e),
                }
                tokio::time::sleep(self.policy.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.policy.timeout, poll).await {
            Ok(tx_hash) => tx_hash,
            Err(_) => {
                warn!(
                    "User operation {:?} not included after {:?}",
                    user_op_hash, self.policy.timeout
                );
                None
            }
        }
    }
}

#[async_trait]
impl SmartAccount for BundlerSmartAccount {
    fn address(&self) -> Address {
        self.account
    }

    async fn send_transaction(&self, calls: Vec<Call>) -> Result<Submitted, OperationError> {
        let call_data = encode_account_calls(&calls)?;

        let mut guard = self.nonces.lock(self.account).await;
        let nonce = guard.reserve(self.entry_point_nonce().await?);

        let (max_fee_per_gas, max_priority_fee_per_gas) = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .map_err(|e| OperationError::Submission(format!("fee estimation: {}", e)))?;

        let dummy = hex::decode(DUMMY_SIGNATURE).unwrap_or_default();
        let mut op = UserOperation {
            sender: self.account,
            nonce,
            call_data,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            signature: wrap_signature(dummy, self.endpoint.validation_module),
            ..UserOperation::default()
        };

        self.estimate_gas(&mut op).await?;
        self.sponsor(&mut op).await?;
        let local_hash = self.sign(&mut op).await?;

        debug!("Sending user operation {:?} with {} call(s)", local_hash, calls.len());
        let accepted = self
            .rpc(
                &self.endpoint.bundler_url,
                "eth_sendUserOperation",
                json!([op, self.endpoint.entry_point]),
            )
            .await
            .map_err(submission("bundler rejected user operation"))?;
        guard.commit(nonce);
        drop(guard);

        let user_op_hash = accepted
            .as_str()
            .and_then(|s| s.parse::<H256>().ok())
            .unwrap_or(local_hash);
        info!("User operation {:?} accepted for {:?}", user_op_hash, self.account);

        let transaction_hash = self.wait_for_inclusion(user_op_hash).await;
        Ok(Submitted {
            user_op_hash: Some(user_op_hash),
            transaction_hash,
        })
    }
}
