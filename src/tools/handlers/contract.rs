// src/tools/handlers/contract.rs

use super::parse_address;
use crate::blockchain::abi;
use crate::error::OperationError;
use crate::tools::args::{contract_args, EncodeArgs, ReadContractArgs};
use crate::tools::dispatcher::Session;

pub async fn read_contract(
    args: ReadContractArgs,
    session: &Session<'_>,
) -> Result<String, OperationError> {
    let contract = parse_address(&args.contract_address, "contractAddress")?;
    let parsed_abi = abi::parse_abi_input(&args.abi_string)?;
    let call_args = contract_args(args.args_string.as_ref()).map_err(OperationError::Validation)?;
    let function = abi::find_function(&parsed_abi, args.function_name.trim(), call_args.len())?;
    let tokens = abi::coerce_tokens(function, &call_args)?;

    let result = session.chain.read_contract(contract, function, &tokens).await?;
    Ok(format!("Result: {}", abi::display_tokens(&result)))
}

pub fn encode_function_data(args: EncodeArgs) -> Result<String, OperationError> {
    let parsed_abi = abi::parse_abi_input(&args.abi_string)?;
    let call_args = contract_args(args.args_string.as_ref()).map_err(OperationError::Validation)?;
    let function = abi::find_function(&parsed_abi, args.function_name.trim(), call_args.len())?;
    let tokens = abi::coerce_tokens(function, &call_args)?;
    let data = abi::encode_function(function, &tokens)?;
    Ok(format!("Encoded Data: 0x{}", hex::encode(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::args::EncodeArgs;
    use serde_json::json;

    #[test]
    fn encodes_transfer_from_signature_list() {
        let out = encode_function_data(EncodeArgs {
            abi_string: r#"["function transfer(address to, uint256 amount)"]"#.to_string(),
            function_name: "transfer".to_string(),
            args_string: Some(json!("[\"0x0000000000000000000000000000000000000001\", \"10\"]")),
        })
        .unwrap();
        assert!(out.starts_with("Encoded Data: 0xa9059cbb"));
        assert!(out.ends_with("000a"));
    }

    #[test]
    fn unknown_function_is_a_validation_error() {
        let err = encode_function_data(EncodeArgs {
            abi_string: r#"["function transfer(address to, uint256 amount)"]"#.to_string(),
            function_name: "burn".to_string(),
            args_string: None,
        })
        .unwrap_err();
        assert!(matches!(err, OperationError::Validation(_)));
    }
}
