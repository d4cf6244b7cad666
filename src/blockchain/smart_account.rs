//! Smart-account submission seam and receipt confirmation.
//!
//! A tool never signs an EOA transaction directly: every state change is a
//! list of [`Call`]s handed to a [`SmartAccount`], which wraps them into one
//! sponsored user operation. Confirmation is a separate, bounded wait.

use std::time::Duration;

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U256};
use serde::Serialize;
use tracing::{debug, warn};

use super::client::{ChainClient, ReceiptSummary};
use crate::error::OperationError;

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// One call executed by the smart account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Call {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl Call {
    pub fn contract(to: Address, data: Bytes) -> Self {
        Self {
            to,
            data,
            value: U256::zero(),
        }
    }

    pub fn native(to: Address, value: U256) -> Self {
        Self {
            to,
            data: Bytes::default(),
            value,
        }
    }
}

/// What the bundler gave back for one user operation.
///
/// `transaction_hash` is `None` when the bundler accepted the operation but
/// did not include it within the submission bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submitted {
    pub user_op_hash: Option<H256>,
    pub transaction_hash: Option<H256>,
}

impl Submitted {
    /// Full 0x hash for display, or `pending` when not yet known.
    pub fn hash_or_pending(&self) -> String {
        self.transaction_hash
            .map(|h| format!("{:?}", h))
            .unwrap_or_else(|| "pending".to_string())
    }
}

#[async_trait]
pub trait SmartAccount: Send + Sync {
    fn address(&self) -> Address;

    /// Submit `calls` atomically as a single user operation.
    async fn send_transaction(&self, calls: Vec<Call>) -> Result<Submitted, OperationError>;
}

/// Bounds for every receipt wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed(ReceiptSummary),
    Failed(ReceiptSummary),
    /// No receipt within the policy timeout.
    Pending,
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Confirmation::Confirmed(_))
    }
}

/// Outcome of submitting and optionally confirming one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionResult {
    pub transaction_hash: Option<H256>,
    pub confirmed: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

impl SubmissionResult {
    pub fn new(submitted: &Submitted, confirmation: Option<&Confirmation>) -> Self {
        let mut result = Self {
            transaction_hash: submitted.transaction_hash,
            ..Self::default()
        };
        if let Some(Confirmation::Confirmed(receipt)) = confirmation {
            result.confirmed = true;
            result.block_number = receipt.block_number;
            result.gas_used = receipt.gas_used;
        }
        result
    }
}

/// Poll for `hash`'s receipt until it appears or `policy.timeout` elapses.
///
/// RPC errors while polling are treated like "not yet" so a flaky node only
/// costs time, never the result of an already-submitted transaction.
pub async fn wait_for_receipt(
    chain: &dyn ChainClient,
    hash: H256,
    policy: &ConfirmationPolicy,
) -> Confirmation {
    let poll = poll_receipt(chain, hash, policy.poll_interval);
    match tokio::time::timeout(policy.timeout, poll).await {
        Ok(confirmation) => confirmation,
        Err(_) => {
            warn!("No receipt for {:?} after {:?}", hash, policy.timeout);
            Confirmation::Pending
        }
    }
}

async fn poll_receipt(chain: &dyn ChainClient, hash: H256, interval: Duration) -> Confirmation {
    loop {
        match chain.transaction_receipt(hash).await {
            Ok(Some(receipt)) if receipt.success => return Confirmation::Confirmed(receipt),
            Ok(Some(receipt)) => return Confirmation::Failed(receipt),
            Ok(None) => debug!("Receipt for {:?} not available yet", hash),
            Err(e) => warn!("Receipt lookup for {:?} failed: {}", hash, e),
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::abi::{Function, Token};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ReceiptAfter {
        polls_before_receipt: usize,
        success: bool,
        polls: AtomicUsize,
    }

    #[async_trait]
    impl ChainClient for ReceiptAfter {
        async fn native_balance(&self, _: Address) -> Result<U256, OperationError> {
            Ok(U256::zero())
        }

        async fn read_contract(
            &self,
            _: Address,
            _: &Function,
            _: &[Token],
        ) -> Result<Vec<Token>, OperationError> {
            Ok(vec![])
        }

        async fn transaction_receipt(
            &self,
            hash: H256,
        ) -> Result<Option<ReceiptSummary>, OperationError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                return Err(OperationError::OnChainRead("flaky node".into()));
            }
            if n < self.polls_before_receipt {
                return Ok(None);
            }
            Ok(Some(ReceiptSummary {
                transaction_hash: hash,
                success: self.success,
                block_number: Some(12),
                gas_used: Some(U256::from(21_000)),
            }))
        }
    }

    fn fast_policy(timeout_ms: u64) -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn confirms_after_transient_errors_and_empty_polls() {
        let chain = ReceiptAfter {
            polls_before_receipt: 3,
            success: true,
            polls: AtomicUsize::new(0),
        };
        let result = wait_for_receipt(&chain, H256::repeat_byte(1), &fast_policy(1_000)).await;
        match result {
            Confirmation::Confirmed(r) => assert_eq!(r.block_number, Some(12)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn reverted_receipt_is_failed() {
        let chain = ReceiptAfter {
            polls_before_receipt: 1,
            success: false,
            polls: AtomicUsize::new(0),
        };
        let result = wait_for_receipt(&chain, H256::repeat_byte(2), &fast_policy(1_000)).await;
        assert!(matches!(result, Confirmation::Failed(_)));
        assert!(!result.is_confirmed());
    }

    #[tokio::test]
    async fn times_out_as_pending() {
        let chain = ReceiptAfter {
            polls_before_receipt: usize::MAX,
            success: true,
            polls: AtomicUsize::new(0),
        };
        let result = wait_for_receipt(&chain, H256::repeat_byte(3), &fast_policy(40)).await;
        assert_eq!(result, Confirmation::Pending);
    }

    #[test]
    fn submission_result_carries_receipt_fields_only_when_confirmed() {
        let submitted = Submitted {
            user_op_hash: None,
            transaction_hash: Some(H256::repeat_byte(9)),
        };
        let receipt = ReceiptSummary {
            transaction_hash: H256::repeat_byte(9),
            success: true,
            block_number: Some(5),
            gas_used: Some(U256::from(100)),
        };
        let confirmed = SubmissionResult::new(&submitted, Some(&Confirmation::Confirmed(receipt)));
        assert!(confirmed.confirmed);
        assert_eq!(confirmed.block_number, Some(5));

        let pending = SubmissionResult::new(&submitted, Some(&Confirmation::Pending));
        assert!(!pending.confirmed);
        assert_eq!(pending.transaction_hash, Some(H256::repeat_byte(9)));
        assert_eq!(Submitted::default().hash_or_pending(), "pending");
    }
}
