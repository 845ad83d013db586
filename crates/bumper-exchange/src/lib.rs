//! Exchange adapter: buys the target asset with native currency.
//!
//! Each protocol version implements [`ExchangeInterface`] by building the
//! swap transaction. [`ExchangeService`] submits through the primary protocol
//! and, on any failure, retries once through the fallback. There is no
//! minimum-output protection on either path.

use async_trait::async_trait;
use bumper_account::AccountInterface;
use bumper_delivery::{DeliveryError, DeliveryService};
use bumper_types::{Address, ConfigSchema, Transaction, TransactionHash, U256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod uniswap_v2;
	pub mod uniswap_v3;
}

#[derive(Debug, Error)]
pub enum ExchangeError {
	#[error("Invalid configuration: {0}")]
	Config(String),
	#[error("Swap via {protocol} failed: {source}")]
	Swap {
		protocol: String,
		#[source]
		source: DeliveryError,
	},
	#[error("All exchange protocols failed: {0}")]
	Exhausted(String),
	#[error("Liquidity probe failed: {0}")]
	Probe(String),
}

/// Parameters of one native-to-token swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
	pub token: Address,
	pub amount_in: U256,
	pub recipient: Address,
	/// Unix timestamp after which the router rejects the call.
	pub deadline: u64,
}

/// A swap that made it on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
	pub protocol: String,
	pub tx_hash: TransactionHash,
}

#[async_trait]
pub trait ExchangeInterface: Send + Sync {
	/// Protocol name used in config and in swap outcomes.
	fn protocol(&self) -> &str;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	fn build_swap(&self, request: &SwapRequest) -> Result<Transaction, ExchangeError>;

	/// Whether the protocol can show a liquid market for `token`.
	///
	/// Protocols without a cheap on-chain check report `false`, meaning "no
	/// evidence" rather than "illiquid".
	async fn probe_liquidity(
		&self,
		_token: Address,
		_delivery: &DeliveryService,
	) -> Result<bool, ExchangeError> {
		Ok(false)
	}
}

pub struct ExchangeService {
	primary: Box<dyn ExchangeInterface>,
	fallback: Option<Box<dyn ExchangeInterface>>,
	delivery: Arc<DeliveryService>,
	deadline: Duration,
}

impl ExchangeService {
	pub fn new(
		primary: Box<dyn ExchangeInterface>,
		fallback: Option<Box<dyn ExchangeInterface>>,
		delivery: Arc<DeliveryService>,
		deadline: Duration,
	) -> Self {
		Self {
			primary,
			fallback,
			delivery,
			deadline,
		}
	}

	/// Swaps `amount_in` of native currency from `signer` into `token`.
	pub async fn swap(
		&self,
		signer: &dyn AccountInterface,
		token: Address,
		amount_in: U256,
		recipient: Address,
	) -> Result<SwapReceipt, ExchangeError> {
		let primary_err = match self.attempt(&*self.primary, signer, token, amount_in, recipient).await {
			Ok(receipt) => return Ok(receipt),
			Err(e) => e,
		};

		let Some(fallback) = &self.fallback else {
			return Err(primary_err);
		};

		tracing::warn!(
			account = %signer.address(),
			error = %primary_err,
			"Primary swap failed, falling back to {}",
			fallback.protocol()
		);

		self.attempt(&**fallback, signer, token, amount_in, recipient)
			.await
			.map_err(|fallback_err| {
				ExchangeError::Exhausted(format!("{}; {}", primary_err, fallback_err))
			})
	}

	async fn attempt(
		&self,
		exchange: &dyn ExchangeInterface,
		signer: &dyn AccountInterface,
		token: Address,
		amount_in: U256,
		recipient: Address,
	) -> Result<SwapReceipt, ExchangeError> {
		// Deadline is wall-clock time at issuance of each attempt.
		let deadline = chrono::Utc::now().timestamp().max(0) as u64 + self.deadline.as_secs();
		let request = SwapRequest {
			token,
			amount_in,
			recipient,
			deadline,
		};
		let tx = exchange.build_swap(&request)?;

		let receipt = self
			.delivery
			.deliver(tx, signer)
			.await
			.map_err(|source| ExchangeError::Swap {
				protocol: exchange.protocol().to_string(),
				source,
			})?;

		Ok(SwapReceipt {
			protocol: exchange.protocol().to_string(),
			tx_hash: receipt.hash,
		})
	}

	/// True when any configured protocol shows liquidity for `token`.
	pub async fn is_tradeable(&self, token: Address) -> bool {
		let protocols = std::iter::once(&self.primary).chain(self.fallback.iter());
		for exchange in protocols {
			match exchange.probe_liquidity(token, &self.delivery).await {
				Ok(true) => return true,
				Ok(false) => {}
				Err(e) => {
					tracing::warn!(protocol = exchange.protocol(), error = %e, "Liquidity probe failed")
				}
			}
		}
		false
	}
}

pub(crate) fn parse_address(config: &toml::Value, key: &str) -> Result<Address, ExchangeError> {
	config
		.get(key)
		.and_then(|v| v.as_str())
		.ok_or_else(|| ExchangeError::Config(format!("{} is required", key)))?
		.parse()
		.map_err(|e| ExchangeError::Config(format!("Invalid {}: {}", key, e)))
}
