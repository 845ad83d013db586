//! Uniswap V3 `exactInputSingle` through the SwapRouter.

use crate::{parse_address, ExchangeError, ExchangeInterface, SwapRequest};
use alloy::primitives::aliases::{U160, U24};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use bumper_types::{Address, ConfigSchema, Field, FieldType, Schema, Transaction, ValidationError, U256};

sol! {
	interface ISwapRouter {
		struct ExactInputSingleParams {
			address tokenIn;
			address tokenOut;
			uint24 fee;
			address recipient;
			uint256 deadline;
			uint256 amountIn;
			uint256 amountOutMinimum;
			uint160 sqrtPriceLimitX96;
		}

		function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
	}
}

pub const DEFAULT_FEE_TIER: u32 = 3000;
pub const DEFAULT_SWAP_GAS_LIMIT: u64 = 300_000;

pub struct UniswapV3 {
	router: Address,
	weth: Address,
	fee_tier: u32,
	gas_limit: u64,
}

impl UniswapV3 {
	pub fn new(router: Address, weth: Address, fee_tier: u32, gas_limit: u64) -> Self {
		Self {
			router,
			weth,
			fee_tier,
			gas_limit,
		}
	}
}

pub struct UniswapV3Schema;

impl ConfigSchema for UniswapV3Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("router", FieldType::Address),
				Field::new("weth", FieldType::Address),
			],
			vec![
				Field::new(
					"fee_tier",
					FieldType::Integer {
						min: Some(1),
						max: Some(1_000_000),
					},
				),
				Field::new(
					"gas_limit",
					FieldType::Integer {
						min: Some(21_000),
						max: None,
					},
				),
			],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl ExchangeInterface for UniswapV3 {
	fn protocol(&self) -> &str {
		"uniswap-v3"
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(UniswapV3Schema)
	}

	fn build_swap(&self, request: &SwapRequest) -> Result<Transaction, ExchangeError> {
		let params = ISwapRouter::ExactInputSingleParams {
			tokenIn: self.weth,
			tokenOut: request.token,
			fee: U24::from(self.fee_tier),
			recipient: request.recipient,
			deadline: U256::from(request.deadline),
			amountIn: request.amount_in,
			amountOutMinimum: U256::ZERO,
			sqrtPriceLimitX96: U160::ZERO,
		};
		let data = ISwapRouter::exactInputSingleCall { params }.abi_encode();

		Ok(Transaction::call(self.router, data, request.amount_in).with_gas_limit(self.gas_limit))
	}
}

/// Required: `router`, `weth`. Optional: `fee_tier` (default 3000),
/// `gas_limit` (default 300000).
pub fn create_uniswap_v3(
	config: &toml::Value,
) -> Result<Box<dyn ExchangeInterface>, ExchangeError> {
	UniswapV3Schema
		.validate(config)
		.map_err(|e| ExchangeError::Config(e.to_string()))?;

	let fee_tier = config
		.get("fee_tier")
		.and_then(|v| v.as_integer())
		.map(|v| v as u32)
		.unwrap_or(DEFAULT_FEE_TIER);
	let gas_limit = config
		.get("gas_limit")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_SWAP_GAS_LIMIT);

	Ok(Box::new(UniswapV3::new(
		parse_address(config, "router")?,
		parse_address(config, "weth")?,
		fee_tier,
		gas_limit,
	)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::address;

	const ROUTER: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");
	const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

	#[test]
	fn test_build_swap_encodes_exact_input_single() {
		let exchange = UniswapV3::new(ROUTER, WETH, DEFAULT_FEE_TIER, DEFAULT_SWAP_GAS_LIMIT);
		let token = Address::repeat_byte(0x11);
		let recipient = Address::repeat_byte(0x22);
		let amount = U256::from(20_000_000_000_000_000u64);

		let tx = exchange
			.build_swap(&SwapRequest {
				token,
				amount_in: amount,
				recipient,
				deadline: 1_700_000_000,
			})
			.unwrap();

		assert_eq!(tx.to, ROUTER);
		assert_eq!(tx.value, amount);
		assert_eq!(tx.gas_limit, Some(300_000));

		let decoded = ISwapRouter::exactInputSingleCall::abi_decode(&tx.data).unwrap();
		assert_eq!(decoded.params.tokenIn, WETH);
		assert_eq!(decoded.params.tokenOut, token);
		assert_eq!(decoded.params.recipient, recipient);
		assert_eq!(decoded.params.fee, U24::from(3000u32));
		assert_eq!(decoded.params.amountIn, amount);
		assert_eq!(decoded.params.amountOutMinimum, U256::ZERO);
		assert_eq!(decoded.params.deadline, U256::from(1_700_000_000u64));
	}

	#[test]
	fn test_factory_requires_weth() {
		let config: toml::Value =
			toml::from_str("router = \"0xE592427A0AEce92De3Edee1F18E0157C05861564\"").unwrap();
		assert!(matches!(create_uniswap_v3(&config), Err(ExchangeError::Config(_))));
	}
}
