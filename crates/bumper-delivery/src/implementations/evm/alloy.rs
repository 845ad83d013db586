//! Alloy-based EVM delivery over HTTP JSON-RPC.
//!
//! Transactions arrive unsigned. This provider fills in the chain id, the
//! sender's pending nonce, the node's gas price and (when missing) a gas
//! estimate, has the sending account sign the result, and broadcasts the raw
//! bytes. Keys never reach the provider.

use crate::{DeliveryError, DeliveryInterface};
use alloy::primitives::FixedBytes;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use bumper_account::AccountInterface;
use bumper_types::{
	Address, ConfigSchema, Field, FieldType, Schema, Transaction, TransactionHash,
	TransactionReceipt, ValidationError, U256,
};
use std::time::Duration;

pub struct AlloyDelivery {
	provider: DynProvider,
	chain_id: u64,
	poll_interval: Duration,
	confirmation_timeout: Duration,
}

impl AlloyDelivery {
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		poll_interval: Duration,
		confirmation_timeout: Duration,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::Config(format!("Invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new().connect_http(url).erased();

		Ok(Self {
			provider,
			chain_id,
			poll_interval,
			confirmation_timeout,
		})
	}

	fn receipt_from(receipt: &alloy::rpc::types::TransactionReceipt) -> TransactionReceipt {
		TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
		}
	}
}

pub struct AlloyDeliverySchema;

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(|value| {
					let url = value.as_str().unwrap_or_default();
					if url.starts_with("http://") || url.starts_with("https://") {
						Ok(())
					} else {
						Err("RPC URL must start with http:// or https://".to_string())
					}
				}),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
			vec![
				Field::new(
					"poll_interval_secs",
					FieldType::Integer {
						min: Some(1),
						max: Some(60),
					},
				),
				Field::new(
					"confirmation_timeout_secs",
					FieldType::Integer {
						min: Some(1),
						max: Some(3600),
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	async fn get_balance(&self, address: Address) -> Result<U256, DeliveryError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn submit(
		&self,
		mut tx: Transaction,
		signer: &dyn AccountInterface,
	) -> Result<TransactionHash, DeliveryError> {
		let from = signer.address();
		tx.chain_id = self.chain_id;

		if tx.nonce.is_none() {
			let nonce = self
				.provider
				.get_transaction_count(from)
				.pending()
				.await
				.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))?;
			tx.nonce = Some(nonce);
		}

		if tx.gas_price.is_none() {
			let gas_price = self
				.provider
				.get_gas_price()
				.await
				.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))?;
			tx.gas_price = Some(gas_price);
		}

		if tx.gas_limit.is_none() {
			let mut request: TransactionRequest = tx.clone().into();
			request.from = Some(from);
			let gas = self
				.provider
				.estimate_gas(request)
				.await
				.map_err(|e| DeliveryError::Network(format!("Failed to estimate gas: {}", e)))?;
			tx.gas_limit = Some(gas);
		}

		let signed = signer.sign_transaction(&tx).await?;

		let pending = self
			.provider
			.send_raw_transaction(&signed.0)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		let hash = TransactionHash(pending.tx_hash().0.to_vec());
		tracing::info!(tx_hash = %hash.truncated(), from = %from, "Submitted transaction");

		Ok(hash)
	}

	async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		let request: TransactionRequest = tx.into();
		let output = self
			.provider
			.call(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Call failed: {}", e)))?;
		Ok(output.to_vec())
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let tx_hash = FixedBytes::<32>::from_slice(&hash.0);
		let start_time = tokio::time::Instant::now();

		loop {
			if start_time.elapsed() > self.confirmation_timeout {
				return Err(DeliveryError::Network(format!(
					"Timeout waiting for {} confirmations after {} seconds",
					confirmations,
					self.confirmation_timeout.as_secs()
				)));
			}

			let receipt = match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					tokio::time::sleep(self.poll_interval).await;
					continue;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				}
			};

			let current_block = self.provider.get_block_number().await.map_err(|e| {
				DeliveryError::Network(format!("Failed to get block number: {}", e))
			})?;
			let tx_block = receipt.block_number.unwrap_or(0);

			// The inclusion block counts as the first confirmation.
			if current_block.saturating_sub(tx_block) + 1 >= confirmations {
				return Ok(Self::receipt_from(&receipt));
			}

			tracing::debug!(
				tx_hash = %hash.truncated(),
				"Waiting for {} more confirmations",
				confirmations.saturating_sub(current_block.saturating_sub(tx_block) + 1)
			);
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

/// Factory function to create an HTTP delivery provider from configuration.
///
/// Required: `rpc_url`, `chain_id`. Optional: `poll_interval_secs` (default 3),
/// `confirmation_timeout_secs` (default 600).
pub fn create_http_delivery(
	config: &toml::Value,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema
		.validate(config)
		.map_err(|e| DeliveryError::Config(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DeliveryError::Config("rpc_url is required".into()))?;
	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.ok_or_else(|| DeliveryError::Config("chain_id is required".into()))? as u64;
	let poll_interval = config
		.get("poll_interval_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(3) as u64;
	let confirmation_timeout = config
		.get("confirmation_timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(600) as u64;

	Ok(Box::new(AlloyDelivery::new(
		rpc_url,
		chain_id,
		Duration::from_secs(poll_interval),
		Duration::from_secs(confirmation_timeout),
	)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_schema_rejects_ws_url() {
		let config: toml::Value =
			toml::from_str("rpc_url = \"ws://localhost:8546\"\nchain_id = 1").unwrap();
		assert!(AlloyDeliverySchema.validate(&config).is_err());
	}

	#[test]
	fn test_factory_builds_from_config() {
		let config: toml::Value = toml::from_str(
			"rpc_url = \"http://localhost:8545\"\nchain_id = 31337\npoll_interval_secs = 1",
		)
		.unwrap();
		assert!(create_http_delivery(&config).is_ok());

		let missing: toml::Value = toml::from_str("rpc_url = \"http://localhost:8545\"").unwrap();
		assert!(matches!(
			create_http_delivery(&missing),
			Err(DeliveryError::Config(_))
		));
	}
}
