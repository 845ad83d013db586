//! Uniswap V2 `swapExactETHForTokens`, plus a pair-reserve liquidity probe.

use crate::{parse_address, ExchangeError, ExchangeInterface, SwapRequest};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use bumper_delivery::DeliveryService;
use bumper_types::{Address, ConfigSchema, Field, FieldType, Schema, Transaction, ValidationError, U256};

sol! {
	interface IUniswapV2Router02 {
		function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
	}

	interface IUniswapV2Factory {
		function getPair(address tokenA, address tokenB) external view returns (address pair);
	}

	interface IUniswapV2Pair {
		function token0() external view returns (address);
		function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
	}
}

pub const DEFAULT_SWAP_GAS_LIMIT: u64 = 300_000;

pub struct UniswapV2 {
	router: Address,
	factory: Option<Address>,
	weth: Address,
	gas_limit: u64,
}

impl UniswapV2 {
	pub fn new(router: Address, factory: Option<Address>, weth: Address, gas_limit: u64) -> Self {
		Self {
			router,
			factory,
			weth,
			gas_limit,
		}
	}

	async fn read(
		&self,
		delivery: &DeliveryService,
		to: Address,
		data: Vec<u8>,
	) -> Result<Vec<u8>, ExchangeError> {
		delivery
			.call(Transaction::call(to, data, U256::ZERO))
			.await
			.map_err(|e| ExchangeError::Probe(e.to_string()))
	}
}

pub struct UniswapV2Schema;

impl ConfigSchema for UniswapV2Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("router", FieldType::Address),
				Field::new("weth", FieldType::Address),
			],
			vec![
				Field::new("factory", FieldType::Address),
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
impl ExchangeInterface for UniswapV2 {
	fn protocol(&self) -> &str {
		"uniswap-v2"
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(UniswapV2Schema)
	}

	fn build_swap(&self, request: &SwapRequest) -> Result<Transaction, ExchangeError> {
		let data = IUniswapV2Router02::swapExactETHForTokensCall {
			amountOutMin: U256::ZERO,
			path: vec![self.weth, request.token],
			to: request.recipient,
			deadline: U256::from(request.deadline),
		}
		.abi_encode();

		Ok(Transaction::call(self.router, data, request.amount_in).with_gas_limit(self.gas_limit))
	}

	async fn probe_liquidity(
		&self,
		token: Address,
		delivery: &DeliveryService,
	) -> Result<bool, ExchangeError> {
		let Some(factory) = self.factory else {
			return Ok(false);
		};

		let output = self
			.read(
				delivery,
				factory,
				IUniswapV2Factory::getPairCall {
					tokenA: token,
					tokenB: self.weth,
				}
				.abi_encode(),
			)
			.await?;
		let pair = IUniswapV2Factory::getPairCall::abi_decode_returns(&output)
			.map_err(|e| ExchangeError::Probe(format!("getPair: {}", e)))?;
		if pair == Address::ZERO {
			return Ok(false);
		}

		let output = self
			.read(delivery, pair, IUniswapV2Pair::getReservesCall {}.abi_encode())
			.await?;
		let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(&output)
			.map_err(|e| ExchangeError::Probe(format!("getReserves: {}", e)))?;

		let output = self
			.read(delivery, pair, IUniswapV2Pair::token0Call {}.abi_encode())
			.await?;
		let token0 = IUniswapV2Pair::token0Call::abi_decode_returns(&output)
			.map_err(|e| ExchangeError::Probe(format!("token0: {}", e)))?;

		let (token_reserve, weth_reserve) = if token0 == token {
			(reserves.reserve0, reserves.reserve1)
		} else {
			(reserves.reserve1, reserves.reserve0)
		};

		tracing::debug!(%token, %pair, %token_reserve, %weth_reserve, "V2 pair reserves");
		Ok(!token_reserve.is_zero() && !weth_reserve.is_zero())
	}
}

/// Required: `router`, `weth`. Optional: `factory` (enables the liquidity
/// probe), `gas_limit` (default 300000).
pub fn create_uniswap_v2(
	config: &toml::Value,
) -> Result<Box<dyn ExchangeInterface>, ExchangeError> {
	UniswapV2Schema
		.validate(config)
		.map_err(|e| ExchangeError::Config(e.to_string()))?;

	let factory = match config.get("factory") {
		Some(_) => Some(parse_address(config, "factory")?),
		None => None,
	};
	let gas_limit = config
		.get("gas_limit")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_SWAP_GAS_LIMIT);

	Ok(Box::new(UniswapV2::new(
		parse_address(config, "router")?,
		factory,
		parse_address(config, "weth")?,
		gas_limit,
	)))
}
