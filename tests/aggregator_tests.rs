//! Swap quote client against a mocked aggregator.

use ethers_core::types::{Address, U256};
use mockito::{mock, Matcher};
use serde_json::json;

use gasless_mcp_server::{
    blockchain::aggregator::{DlnAggregator, QuoteRequest, SwapAggregator},
    error::OperationError,
};

const ROUTER: &str = "0x663dc15d3c1ac63ff12e45ab68fea3f0a883c251";

fn aggregator() -> DlnAggregator {
    DlnAggregator::new(reqwest::Client::new(), mockito::server_url())
}

// Each test uses its own amount so the shared mock server can tell them apart.
fn request(amount: u64) -> QuoteRequest {
    QuoteRequest {
        chain_id: 8453,
        token_in: Address::from_low_u64_be(1),
        token_out: Address::from_low_u64_be(2),
        amount: U256::from(amount),
        recipient: Address::from_low_u64_be(3),
        slippage: None,
    }
}

fn amount_matcher(amount: u64) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("chainId".into(), "8453".into()),
        Matcher::UrlEncoded("tokenInAmount".into(), amount.to_string()),
        Matcher::UrlEncoded("slippage".into(), "auto".into()),
    ])
}

#[tokio::test]
async fn quote_returns_executable_call_and_spender() {
    let _m = mock("GET", "/transaction")
        .match_query(amount_matcher(1_000))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "estimation": { "dstChainTokenOut": { "amount": "995" } },
                "tx": {
                    "to": ROUTER,
                    "data": "0xabcdef",
                    "value": "0",
                    "allowanceTarget": "0x0000000000000000000000000000000000000009"
                }
            })
            .to_string(),
        )
        .create();

    let quote = aggregator().quote(&request(1_000)).await.unwrap();
    assert_eq!(quote.call.to, ROUTER.parse::<Address>().unwrap());
    assert_eq!(quote.call.data.to_vec(), vec![0xab, 0xcd, 0xef]);
    assert_eq!(quote.call.value, U256::zero());
    assert_eq!(quote.spender, Address::from_low_u64_be(9));
}

#[tokio::test]
async fn aggregator_error_message_is_surfaced() {
    let _m = mock("GET", "/transaction")
        .match_query(amount_matcher(2_000))
        .with_status(400)
        .with_body(json!({ "errorMessage": "Not enough liquidity" }).to_string())
        .create();

    let err = aggregator().quote(&request(2_000)).await.unwrap_err();
    assert_eq!(err, OperationError::QuoteFailure("Not enough liquidity".to_string()));
    assert_eq!(err.to_string(), "swap quote failed: Not enough liquidity");
}

#[tokio::test]
async fn non_json_failure_reports_the_status() {
    let _m = mock("GET", "/transaction")
        .match_query(amount_matcher(3_000))
        .with_status(502)
        .with_body("upstream down")
        .create();

    let err = aggregator().quote(&request(3_000)).await.unwrap_err();
    assert_eq!(err, OperationError::QuoteFailure("Bad request (HTTP 502)".to_string()));
}

#[tokio::test]
async fn quote_without_transaction_is_rejected() {
    let _m = mock("GET", "/transaction")
        .match_query(amount_matcher(4_000))
        .with_status(200)
        .with_body(json!({ "estimation": {} }).to_string())
        .create();

    let err = aggregator().quote(&request(4_000)).await.unwrap_err();
    assert_eq!(
        err,
        OperationError::QuoteFailure("Missing transaction data in swap order".to_string())
    );
}
