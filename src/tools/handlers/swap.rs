//! Aggregator swap with just-in-time approval.
//!
//! Order of operations:
//!
//! 1. resolve both tokens and read `tokenIn` decimals
//! 2. request a quote (`QuoteRequested` -> `QuoteReceived`)
//! 3. for ERC-20 input, read the allowance towards the quote's spender
//!    (`AllowanceChecked`) and, if short, submit an approval
//!    (`ApprovalSubmitted`), waiting for its receipt when `wait` is set
//!    (`ApprovalConfirmed`)
//! 4. submit the aggregator transaction (`SwapSubmitted`) and, when `wait`
//!    is set, wait for it (`SwapConfirmed` or `SwapPending`)
//!
//! The swap is never submitted while a required approval is unconfirmed
//! under `wait`.

use ethers::abi::Token;
use ethers::types::{Address, U256};
use tracing::{debug, info, warn};

use super::token::approve_call;
use crate::blockchain::{
    abi::{self, erc20},
    aggregator::QuoteRequest,
    amount::parse_units,
    smart_account::{wait_for_receipt, Confirmation, SubmissionResult, Submitted},
    token_registry::is_native,
};
use crate::error::OperationError;
use crate::tools::args::SwapArgs;
use crate::tools::dispatcher::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    Start,
    QuoteRequested,
    QuoteReceived,
    AllowanceChecked,
    ApprovalSubmitted,
    ApprovalConfirmed,
    SwapSubmitted,
    SwapConfirmed,
    SwapPending,
}

struct SwapRun<'s, 'a> {
    session: &'s Session<'a>,
    state: SwapState,
}

impl<'s, 'a> SwapRun<'s, 'a> {
    fn advance(&mut self, next: SwapState) {
        debug!("swap {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn resolve(
        &self,
        address: Option<&str>,
        symbol: Option<&str>,
        side: &str,
    ) -> Result<Address, OperationError> {
        match (address, symbol) {
            (Some(address), _) => self.session.resolve_token(address),
            (None, Some(symbol)) => self.session.resolve_token(symbol),
            (None, None) => Err(OperationError::Validation(format!(
                "{} or {}Symbol is required",
                side, side
            ))),
        }
    }

    async fn allowance(&self, token: Address, spender: Address) -> Result<U256, OperationError> {
        let owner = self.session.account;
        let raw = self
            .session
            .read(token, erc20::ALLOWANCE, &[Token::Address(owner), Token::Address(spender)])
            .await?;
        Ok(abi::first_uint(&raw)?)
    }

    async fn confirm(&self, submitted: &Submitted) -> Confirmation {
        match submitted.transaction_hash {
            Some(hash) => {
                let chain = self.session.chain.as_ref();
                wait_for_receipt(chain, hash, &self.session.confirmation).await
            }
            None => Confirmation::Pending,
        }
    }
}

pub async fn smart_swap(args: SwapArgs, session: &Session<'_>) -> Result<String, OperationError> {
    let mut run = SwapRun {
        session,
        state: SwapState::Start,
    };

    let token_in = run.resolve(
        args.token_in.as_deref(),
        args.token_in_symbol.as_deref(),
        "tokenIn",
    )?;
    let token_out = run.resolve(
        args.token_out.as_deref(),
        args.token_out_symbol.as_deref(),
        "tokenOut",
    )?;
    if token_in == token_out {
        return Err(OperationError::Validation("tokenIn and tokenOut must differ".to_string()));
    }

    let decimals = session.token_decimals(token_in).await?;
    let amount_in = parse_units(&args.amount, decimals)?;
    if amount_in.is_zero() {
        return Err(OperationError::Validation("amount must be greater than zero".to_string()));
    }

    run.advance(SwapState::QuoteRequested);
    let quote = session
        .aggregator
        .quote(&QuoteRequest {
            chain_id: session.network.chain_id,
            token_in,
            token_out,
            amount: amount_in,
            recipient: session.account,
            slippage: args.slippage.clone(),
        })
        .await?;
    run.advance(SwapState::QuoteReceived);

    let account = session.smart_account()?;
    let mut approval: Option<Submitted> = None;

    if !is_native(&token_in) {
        let allowance = run.allowance(token_in, quote.spender).await?;
        run.advance(SwapState::AllowanceChecked);

        if allowance < amount_in {
            let approve_amount = if args.approve_max { U256::MAX } else { amount_in };
            info!(
                "Allowance {} below {} for spender {:?}; approving {}",
                allowance, amount_in, quote.spender, approve_amount
            );
            let submitted = account
                .send_transaction(vec![approve_call(token_in, quote.spender, approve_amount)?])
                .await?;
            run.advance(SwapState::ApprovalSubmitted);

            if args.wait {
                match run.confirm(&submitted).await {
                    Confirmation::Confirmed(_) => run.advance(SwapState::ApprovalConfirmed),
                    Confirmation::Failed(_) => {
                        return Err(OperationError::Submission(format!(
                            "approval transaction {} reverted; swap not submitted",
                            submitted.hash_or_pending()
                        )))
                    }
                    Confirmation::Pending => {
                        let timeout =
                            OperationError::ConfirmationTimeout(submitted.hash_or_pending());
                        warn!("{}; holding back the swap", timeout);
                        return Ok(format!(
                            "Token approval submitted but not yet confirmed; swap not submitted yet.\nInput: {}\nApproval Transaction Hash: {}\nRetry the swap once the approval is confirmed.",
                            args.amount.trim(),
                            submitted.hash_or_pending()
                        ));
                    }
                }
            }
            approval = Some(submitted);
        }
    }

    let swap = account.send_transaction(vec![quote.call.clone()]).await?;
    run.advance(SwapState::SwapSubmitted);

    let confirmation = if args.wait { Some(run.confirm(&swap).await) } else { None };
    let outcome = SubmissionResult::new(&swap, confirmation.as_ref());
    let tail = match &confirmation {
        Some(Confirmation::Confirmed(_)) => {
            run.advance(SwapState::SwapConfirmed);
            "\nSwap completed and confirmed!"
        }
        Some(Confirmation::Failed(_)) => {
            run.advance(SwapState::SwapPending);
            "\nSwap submitted, but the transaction reverted on-chain."
        }
        Some(Confirmation::Pending) => {
            run.advance(SwapState::SwapPending);
            warn!("{}", OperationError::ConfirmationTimeout(swap.hash_or_pending()));
            "\nSwap submitted."
        }
        None => "\nSwap submitted.",
    };

    let mut report = format!("Swap order submitted successfully!\nInput: {}", args.amount.trim());
    if let Some(approval) = approval {
        report.push_str(&format!("\nApproval Transaction Hash: {}", approval.hash_or_pending()));
    }
    report.push_str(&format!("\nTransaction Hash: {}{}", swap.hash_or_pending(), tail));
    if let (true, Some(block)) = (outcome.confirmed, outcome.block_number) {
        report.push_str(&format!("\nBlock Number: {}", block));
    }
    debug!("swap finished in state {:?}", run.state);
    Ok(report)
}
