// src/error.rs

use thiserror::Error;

use crate::blockchain::{abi::AbiError, amount::AmountError};

/// Failure inside a single tool handler.
///
/// Handlers return these typed; only the dispatch boundary turns them into
/// the user-facing `"<prefix>: <reason>"` string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Missing or malformed argument.
    #[error("{0}")]
    Validation(String),
    /// The swap aggregator returned an error or a non-2xx status.
    #[error("swap quote failed: {0}")]
    QuoteFailure(String),
    /// A contract read or RPC query reverted or errored.
    #[error("on-chain read failed: {0}")]
    OnChainRead(String),
    /// Signing, user-operation building, or broadcast failed.
    #[error("submission failed: {0}")]
    Submission(String),
    /// A receipt was not observed within the configured bound.
    #[error("transaction {0} not confirmed within the timeout")]
    ConfirmationTimeout(String),
}

impl From<AmountError> for OperationError {
    fn from(err: AmountError) -> Self {
        OperationError::Validation(err.to_string())
    }
}

impl From<AbiError> for OperationError {
    fn from(err: AbiError) -> Self {
        match err {
            AbiError::Decode(msg) => OperationError::OnChainRead(msg),
            other => OperationError::Validation(other.to_string()),
        }
    }
}

/// Failure at the registry / dispatch level.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Error: Unknown tool {0}")]
    UnknownTool(String),
    #[error("Error: Invalid execution context: {0}")]
    InvalidContext(String),
    #[error("{prefix}: {source}")]
    Operation {
        tool: String,
        prefix: &'static str,
        source: OperationError,
    },
}

impl DispatchError {
    /// The handler-level error, if this is one.
    pub fn operation(&self) -> Option<&OperationError> {
        match self {
            DispatchError::Operation { source, .. } => Some(source),
            _ => None,
        }
    }
}
