//! In-process fakes for the chain, the smart account and the aggregator.
#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ethers_core::abi::{Function, Token};
use ethers_core::types::{Address, Bytes, H256, U256};
use secrecy::SecretString;

use gasless_mcp_server::{
    blockchain::{
        aggregator::{QuoteRequest, SwapAggregator, SwapQuote},
        backend::Backend,
        chain::Network,
        client::{ChainClient, ReceiptSummary},
        smart_account::{Call, ConfirmationPolicy, SmartAccount, Submitted},
    },
    error::OperationError,
    tools::{Dispatcher, ExecutionContext, ToolRegistry},
};

pub const ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";
pub const ROUTER: &str = "0x663dc15d3c1ac63ff12e45ab68fea3f0a883c251";
pub const USDC_BASE: &str = "0x833589fCD6EDB6E08f4c7C32D4f71b54bdA02913";
pub const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub fn addr(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

pub fn units(whole: u64, decimals: usize) -> U256 {
    U256::from(whole) * U256::exp10(decimals)
}

/// Ordered log shared by all fakes, to check cross-component ordering.
pub type Events = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
pub struct FakeToken {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub balance: U256,
    pub allowance: U256,
    pub total_supply: U256,
    pub broken: bool,
}

impl FakeToken {
    pub fn new(symbol: &str, decimals: u32, balance: U256) -> Self {
        Self {
            name: format!("{} Token", symbol),
            symbol: symbol.to_string(),
            decimals,
            balance,
            allowance: U256::zero(),
            total_supply: units(1_000_000, decimals as usize),
            broken: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
    Success,
    Reverted,
    Never,
}

pub struct FakeChain {
    pub native_balance: U256,
    pub tokens: Mutex<HashMap<Address, FakeToken>>,
    pub receipt_mode: Mutex<ReceiptMode>,
    pub events: Events,
}

impl FakeChain {
    pub fn new(events: Events) -> Self {
        Self {
            native_balance: U256::zero(),
            tokens: Mutex::new(HashMap::new()),
            receipt_mode: Mutex::new(ReceiptMode::Success),
            events,
        }
    }

    pub fn add_token(&self, address: Address, token: FakeToken) {
        self.tokens.lock().unwrap().insert(address, token);
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn native_balance(&self, _address: Address) -> Result<U256, OperationError> {
        Ok(self.native_balance)
    }

    async fn read_contract(
        &self,
        address: Address,
        function: &Function,
        _args: &[Token],
    ) -> Result<Vec<Token>, OperationError> {
        self.events.lock().unwrap().push(format!("read:{}", function.name));
        let tokens = self.tokens.lock().unwrap();
        let token = tokens
            .get(&address)
            .filter(|t| !t.broken)
            .ok_or_else(|| OperationError::OnChainRead(format!("{} reverted", function.name)))?;
        let out = match function.name.as_str() {
            "name" => Token::String(token.name.clone()),
            "symbol" => Token::String(token.symbol.clone()),
            "decimals" => Token::Uint(U256::from(token.decimals)),
            "totalSupply" => Token::Uint(token.total_supply),
            "balanceOf" => Token::Uint(token.balance),
            "allowance" => Token::Uint(token.allowance),
            other => return Err(OperationError::OnChainRead(format!("unexpected call {}", other))),
        };
        Ok(vec![out])
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<ReceiptSummary>, OperationError> {
        self.events.lock().unwrap().push("receipt".to_string());
        let mode = *self.receipt_mode.lock().unwrap();
        Ok(match mode {
            ReceiptMode::Never => None,
            ReceiptMode::Success | ReceiptMode::Reverted => Some(ReceiptSummary {
                transaction_hash: hash,
                success: mode == ReceiptMode::Success,
                block_number: Some(1234),
                gas_used: Some(U256::from(21_000)),
            }),
        })
    }
}

pub struct FakeAccount {
    pub address: Address,
    pub submissions: Mutex<Vec<Vec<Call>>>,
    pub with_hash: bool,
    pub events: Events,
}

impl FakeAccount {
    pub fn submissions(&self) -> Vec<Vec<Call>> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmartAccount for FakeAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, calls: Vec<Call>) -> Result<Submitted, OperationError> {
        let mut submissions = self.submissions.lock().unwrap();
        self.events.lock().unwrap().push(format!("submit:{}", calls.len()));
        submissions.push(calls);
        let n = submissions.len() as u64;
        Ok(Submitted {
            user_op_hash: Some(H256::from_low_u64_be(1000 + n)),
            transaction_hash: self.with_hash.then(|| H256::from_low_u64_be(n)),
        })
    }
}

pub struct FakeAggregator {
    pub requests: Mutex<Vec<QuoteRequest>>,
    pub failure: Option<String>,
    pub events: Events,
}

#[async_trait]
impl SwapAggregator for FakeAggregator {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote, OperationError> {
        self.events.lock().unwrap().push("quote".to_string());
        self.requests.lock().unwrap().push(request.clone());
        if let Some(reason) = &self.failure {
            return Err(OperationError::QuoteFailure(reason.clone()));
        }
        Ok(SwapQuote {
            call: Call {
                to: addr(ROUTER),
                data: Bytes::from(vec![0x12, 0x34]),
                value: if request.token_in.is_zero()
                    || format!("{:?}", request.token_in).starts_with("0xeeee")
                {
                    request.amount
                } else {
                    U256::zero()
                },
            },
            spender: addr(ROUTER),
        })
    }
}

pub struct FakeBackend {
    pub chain: Arc<FakeChain>,
    pub account: Arc<FakeAccount>,
}

impl Backend for FakeBackend {
    fn chain_client(&self, _network: &Network) -> Result<Arc<dyn ChainClient>, OperationError> {
        Ok(self.chain.clone())
    }

    fn smart_account(
        &self,
        _network: &Network,
        _signing_key: &SecretString,
        _account: Address,
    ) -> Result<Arc<dyn SmartAccount>, OperationError> {
        Ok(self.account.clone())
    }
}

pub struct Harness {
    pub dispatcher: Dispatcher,
    pub chain: Arc<FakeChain>,
    pub account: Arc<FakeAccount>,
    pub aggregator: Arc<FakeAggregator>,
    pub events: Events,
}

pub struct HarnessBuilder {
    native_balance: U256,
    tokens: Vec<(Address, FakeToken)>,
    receipt_mode: ReceiptMode,
    with_hash: bool,
    quote_failure: Option<String>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            native_balance: U256::zero(),
            tokens: vec![],
            receipt_mode: ReceiptMode::Success,
            with_hash: true,
            quote_failure: None,
        }
    }
}

impl HarnessBuilder {
    pub fn native_balance(mut self, balance: U256) -> Self {
        self.native_balance = balance;
        self
    }

    pub fn token(mut self, address: Address, token: FakeToken) -> Self {
        self.tokens.push((address, token));
        self
    }

    pub fn receipts(mut self, mode: ReceiptMode) -> Self {
        self.receipt_mode = mode;
        self
    }

    pub fn without_tx_hash(mut self) -> Self {
        self.with_hash = false;
        self
    }

    pub fn quote_failure(mut self, reason: &str) -> Self {
        self.quote_failure = Some(reason.to_string());
        self
    }

    pub fn build(self) -> Harness {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let mut chain = FakeChain::new(events.clone());
        chain.native_balance = self.native_balance;
        *chain.receipt_mode.lock().unwrap() = self.receipt_mode;
        for (address, token) in self.tokens {
            chain.add_token(address, token);
        }
        let chain = Arc::new(chain);

        let account = Arc::new(FakeAccount {
            address: addr(ACCOUNT),
            submissions: Mutex::new(vec![]),
            with_hash: self.with_hash,
            events: events.clone(),
        });
        let aggregator = Arc::new(FakeAggregator {
            requests: Mutex::new(vec![]),
            failure: self.quote_failure,
            events: events.clone(),
        });

        let dispatcher = Dispatcher::new(
            ToolRegistry::standard().unwrap(),
            Arc::new(FakeBackend {
                chain: chain.clone(),
                account: account.clone(),
            }),
            aggregator.clone(),
        )
        .with_confirmation_policy(ConfirmationPolicy {
            timeout: Duration::from_millis(60),
            poll_interval: Duration::from_millis(5),
        });

        Harness {
            dispatcher,
            chain,
            account,
            aggregator,
            events,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

pub fn base_context() -> ExecutionContext {
    ExecutionContext::new(TEST_KEY, "base", ACCOUNT)
}

/// Arguments of an `approve(address,uint256)` call.
pub fn decode_approve(call: &Call) -> (Address, U256) {
    assert_eq!(&call.data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
    let decoded = ethers_core::abi::decode(
        &[ethers_core::abi::ParamType::Address, ethers_core::abi::ParamType::Uint(256)],
        &call.data[4..],
    )
    .unwrap();
    match (&decoded[0], &decoded[1]) {
        (Token::Address(a), Token::Uint(v)) => (*a, *v),
        other => panic!("unexpected approve args {:?}", other),
    }
}
